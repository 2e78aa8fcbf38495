// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Invoice and receipt analysis.

use serde::{Deserialize, Serialize};

use super::text::{StartJobResponse, start_job_members};
use super::{Block, Document, DocumentLocation, DocumentMetadata, Geometry, JobStatus, Warning};
use super::{NotificationChannel, OutputConfig};
use crate::operation::{job_query, operation, paginated};
use crate::validate::{self, Validate, ValidationResult};

/// Page size limit of GetExpenseAnalysis.
pub const MAX_EXPENSE_RESULTS: u32 = 20;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeExpenseRequest {
    pub document: Document,
}

impl AnalyzeExpenseRequest {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeExpenseResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expense_documents: Vec<ExpenseDocument>,
}

/// One invoice or receipt found in the input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseDocument {
    /// 1-based position of this expense in the input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub summary_fields: Vec<ExpenseField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_item_groups: Vec<LineItemGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl ExpenseDocument {
    /// Value text of the first summary field with the given normalised type,
    /// e.g. `"TOTAL"` or `"VENDOR_NAME"`.
    pub fn summary_value(&self, field_type: &str) -> Option<&str> {
        self.summary_fields
            .iter()
            .find(|f| f.type_text() == Some(field_type))
            .and_then(ExpenseField::value_text)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseField {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ExpenseType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_detection: Option<ExpenseDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_detection: Option<ExpenseDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<ExpenseCurrency>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group_properties: Vec<ExpenseGroupProperty>,
}

impl ExpenseField {
    pub fn type_text(&self) -> Option<&str> {
        self.kind.as_ref().and_then(|k| k.text.as_deref())
    }

    pub fn label_text(&self) -> Option<&str> {
        self.label_detection.as_ref().and_then(|d| d.text.as_deref())
    }

    pub fn value_text(&self) -> Option<&str> {
        self.value_detection.as_ref().and_then(|d| d.text.as_deref())
    }
}

/// Normalised field type with its confidence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseCurrency {
    /// ISO 4217 code, e.g. `USD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Groups summary fields that belong together, such as one address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpenseGroupProperty {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItemGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_item_group_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItemFields>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItemFields {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_item_expense_fields: Vec<ExpenseField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartExpenseAnalysisRequest {
    pub document_location: DocumentLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_channel: Option<NotificationChannel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_config: Option<OutputConfig>,
    #[serde(rename = "KMSKeyId", default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
}

impl StartExpenseAnalysisRequest {
    pub fn new(location: DocumentLocation) -> Self {
        Self {
            document_location: location,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetExpenseAnalysisRequest {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetExpenseAnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expense_documents: Vec<ExpenseDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_expense_model_version: Option<String>,
}

operation!(AnalyzeExpenseRequest => AnalyzeExpenseResponse, "AnalyzeExpense");
operation!(StartExpenseAnalysisRequest => StartJobResponse, "StartExpenseAnalysis");
operation!(GetExpenseAnalysisRequest => GetExpenseAnalysisResponse, "GetExpenseAnalysis");
paginated!(GetExpenseAnalysisRequest => GetExpenseAnalysisResponse);
job_query!(GetExpenseAnalysisRequest => GetExpenseAnalysisResponse);

impl Validate for AnalyzeExpenseRequest {
    fn validate(&self) -> ValidationResult {
        validate::document("Document", &self.document)
    }
}

impl Validate for StartExpenseAnalysisRequest {
    fn validate(&self) -> ValidationResult {
        validate::document_location("DocumentLocation", &self.document_location)?;
        start_job_members(
            self.client_request_token.as_ref(),
            self.job_tag.as_ref(),
            self.notification_channel.as_ref(),
            self.output_config.as_ref(),
            self.kms_key_id.as_ref(),
        )
    }
}

impl Validate for GetExpenseAnalysisRequest {
    fn validate(&self) -> ValidationResult {
        validate::job_id("JobId", &self.job_id)?;
        validate::max_results("MaxResults", self.max_results, MAX_EXPENSE_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}
