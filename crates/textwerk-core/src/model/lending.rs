// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mortgage and loan package analysis.  Asynchronous only: pages are
// classified, then routed to the matching extractor.

use serde::{Deserialize, Serialize};

use super::text::{StartJobResponse, start_job_members};
use super::{
    DocumentLocation, DocumentMetadata, ExpenseDocument, Geometry, IdentityDocument, JobStatus,
    NotificationChannel, OutputConfig, SelectionStatus, Warning,
};
use crate::operation::{job_query, operation, paginated};
use crate::validate::{self, Validate, ValidationResult};

/// Page size limit of GetLendingAnalysis.
pub const MAX_LENDING_RESULTS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartLendingAnalysisRequest {
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

impl StartLendingAnalysisRequest {
    pub fn new(location: DocumentLocation) -> Self {
        Self {
            document_location: location,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetLendingAnalysisRequest {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetLendingAnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<LendingResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_lending_model_version: Option<String>,
}

/// Classification and extraction output for one page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LendingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_classification: Option<PageClassification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extractions: Vec<Extraction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageClassification {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_type: Vec<Prediction>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_number: Vec<Prediction>,
}

impl PageClassification {
    /// Highest-confidence page type.
    pub fn best_page_type(&self) -> Option<&str> {
        self.page_type
            .iter()
            .max_by(|a, b| {
                a.confidence
                    .unwrap_or(0.0)
                    .total_cmp(&b.confidence.unwrap_or(0.0))
            })
            .and_then(|p| p.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Prediction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Output of whichever extractor handled the page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Extraction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lending_document: Option<LendingDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expense_document: Option<ExpenseDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_document: Option<IdentityDocument>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LendingDocument {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lending_fields: Vec<LendingField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature_detections: Vec<SignatureDetection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LendingField {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_detection: Option<LendingDetection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value_detections: Vec<LendingDetection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LendingDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<SelectionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignatureDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetLendingAnalysisSummaryRequest {
    pub job_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetLendingAnalysisSummaryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<LendingSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_lending_model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LendingSummary {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_groups: Vec<DocumentGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undetected_document_types: Vec<String>,
}

/// All pages classified as one document type.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentGroup {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub split_documents: Vec<SplitDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detected_signatures: Vec<DetectedSignature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub undetected_signatures: Vec<UndetectedSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SplitDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectedSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UndetectedSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

operation!(StartLendingAnalysisRequest => StartJobResponse, "StartLendingAnalysis");
operation!(GetLendingAnalysisRequest => GetLendingAnalysisResponse, "GetLendingAnalysis");
operation!(
    GetLendingAnalysisSummaryRequest => GetLendingAnalysisSummaryResponse,
    "GetLendingAnalysisSummary"
);
paginated!(GetLendingAnalysisRequest => GetLendingAnalysisResponse);
job_query!(GetLendingAnalysisRequest => GetLendingAnalysisResponse);
job_query!(GetLendingAnalysisSummaryRequest => GetLendingAnalysisSummaryResponse);

impl Validate for StartLendingAnalysisRequest {
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

impl Validate for GetLendingAnalysisRequest {
    fn validate(&self) -> ValidationResult {
        validate::job_id("JobId", &self.job_id)?;
        validate::max_results("MaxResults", self.max_results, MAX_LENDING_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}

impl Validate for GetLendingAnalysisSummaryRequest {
    fn validate(&self) -> ValidationResult {
        validate::job_id("JobId", &self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::JobResult;

    #[test]
    fn best_page_type_prefers_confidence() {
        let classification = PageClassification {
            page_type: vec![
                Prediction {
                    value: Some("PAYSLIPS".into()),
                    confidence: Some(40.0),
                },
                Prediction {
                    value: Some("BANK_STATEMENT".into()),
                    confidence: Some(91.0),
                },
            ],
            page_number: Vec::new(),
        };
        assert_eq!(classification.best_page_type(), Some("BANK_STATEMENT"));
    }

    #[test]
    fn summary_decodes_groups() {
        let json = r#"{
            "JobStatus": "SUCCEEDED",
            "Summary": {
                "DocumentGroups": [{
                    "Type": "PAYSLIPS",
                    "SplitDocuments": [{ "Index": 1, "Pages": [1, 2] }],
                    "DetectedSignatures": [{ "Page": 2 }]
                }],
                "UndetectedDocumentTypes": ["W2"]
            }
        }"#;
        let response: GetLendingAnalysisSummaryResponse =
            serde_json::from_str(json).expect("decode");
        assert_eq!(response.job_status(), Some(&JobStatus::Succeeded));
        let summary = response.summary.expect("summary");
        assert_eq!(summary.document_groups[0].split_documents[0].pages, vec![1, 2]);
        assert_eq!(summary.undetected_document_types, vec!["W2"]);
    }

    #[test]
    fn lending_page_size_is_capped_at_thirty() {
        let request = GetLendingAnalysisRequest {
            job_id: "job-1".into(),
            max_results: Some(31),
            next_token: None,
        };
        assert!(request.validate().is_err());
    }
}
