// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Identity document analysis (passports, driving licences).

use serde::{Deserialize, Serialize};

use super::{Block, Document, DocumentMetadata, ValueType};
use crate::operation::operation;
use crate::validate::{self, Validate, ValidationResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeIdRequest {
    /// Front and, optionally, back of the document.
    pub document_pages: Vec<Document>,
}

impl AnalyzeIdRequest {
    pub fn new(pages: impl Into<Vec<Document>>) -> Self {
        Self {
            document_pages: pages.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeIdResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_documents: Vec<IdentityDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(
        rename = "AnalyzeIDModelVersion",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub analyze_id_model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identity_document_fields: Vec<IdentityDocumentField>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

impl IdentityDocument {
    /// Value of the field with the given normalised name, e.g. `"FIRST_NAME"`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.identity_document_fields
            .iter()
            .find(|f| f.kind.as_ref().map(|k| k.text.as_str()) == Some(name))
            .and_then(|f| f.value_detection.as_ref())
            .map(|v| v.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IdentityDocumentField {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<AnalyzeIdDetections>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_detection: Option<AnalyzeIdDetections>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeIdDetections {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<NormalizedValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Value rewritten to a canonical form, e.g. dates as ISO 8601.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NormalizedValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<ValueType>,
}

operation!(AnalyzeIdRequest => AnalyzeIdResponse, "AnalyzeID");

impl Validate for AnalyzeIdRequest {
    fn validate(&self) -> ValidationResult {
        validate::count("DocumentPages", self.document_pages.len(), 1, 2)?;
        for (i, page) in self.document_pages.iter().enumerate() {
            validate::document(&format!("DocumentPages[{i}]"), page)?;
        }
        Ok(())
    }
}
