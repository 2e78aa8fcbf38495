// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text detection and document analysis, synchronous and asynchronous.

use serde::{Deserialize, Serialize};

use super::{
    AdaptersConfig, Block, Document, DocumentLocation, DocumentMetadata, FeatureType,
    HumanLoopConfig, JobStatus, NotificationChannel, OutputConfig, QueriesConfig, Warning,
};
use crate::error::ValidationError;
use crate::operation::{job_query, operation, paginated};
use crate::validate::{self, Validate, ValidationResult};

/// Page size limit of the Get* document calls.
pub const MAX_DOCUMENT_RESULTS: u32 = 1000;

// ---------------------------------------------------------------------------
// Synchronous
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeDocumentRequest {
    pub document: Document,
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_loop_config: Option<HumanLoopConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_config: Option<QueriesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapters_config: Option<AdaptersConfig>,
}

impl AnalyzeDocumentRequest {
    pub fn new(document: Document, feature_types: impl Into<Vec<FeatureType>>) -> Self {
        Self {
            document,
            feature_types: feature_types.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalyzeDocumentResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_loop_activation_output: Option<HumanLoopActivationOutput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_document_model_version: Option<String>,
}

/// Why (and whether) a human review loop was started.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HumanLoopActivationOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_loop_arn: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub human_loop_activation_reasons: Vec<String>,
    /// JSON document, passed through as a string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub human_loop_activation_conditions_evaluation_results: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectDocumentTextRequest {
    pub document: Document,
}

impl DetectDocumentTextRequest {
    pub fn new(document: Document) -> Self {
        Self { document }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectDocumentTextResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_document_text_model_version: Option<String>,
}

// ---------------------------------------------------------------------------
// Asynchronous
// ---------------------------------------------------------------------------

/// Returned by every Start* operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartJobResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartDocumentAnalysisRequest {
    pub document_location: DocumentLocation,
    pub feature_types: Vec<FeatureType>,
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
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queries_config: Option<QueriesConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapters_config: Option<AdaptersConfig>,
}

impl StartDocumentAnalysisRequest {
    pub fn new(location: DocumentLocation, feature_types: impl Into<Vec<FeatureType>>) -> Self {
        Self {
            document_location: location,
            feature_types: feature_types.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetDocumentAnalysisRequest {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetDocumentAnalysisResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyze_document_model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StartDocumentTextDetectionRequest {
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

impl StartDocumentTextDetectionRequest {
    pub fn new(location: DocumentLocation) -> Self {
        Self {
            document_location: location,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetDocumentTextDetectionRequest {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetDocumentTextDetectionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_metadata: Option<DocumentMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_document_text_model_version: Option<String>,
}

operation!(AnalyzeDocumentRequest => AnalyzeDocumentResponse, "AnalyzeDocument");
operation!(DetectDocumentTextRequest => DetectDocumentTextResponse, "DetectDocumentText");
operation!(StartDocumentAnalysisRequest => StartJobResponse, "StartDocumentAnalysis");
operation!(GetDocumentAnalysisRequest => GetDocumentAnalysisResponse, "GetDocumentAnalysis");
operation!(StartDocumentTextDetectionRequest => StartJobResponse, "StartDocumentTextDetection");
operation!(GetDocumentTextDetectionRequest => GetDocumentTextDetectionResponse, "GetDocumentTextDetection");

paginated!(GetDocumentAnalysisRequest => GetDocumentAnalysisResponse);
paginated!(GetDocumentTextDetectionRequest => GetDocumentTextDetectionResponse);

job_query!(GetDocumentAnalysisRequest => GetDocumentAnalysisResponse);
job_query!(GetDocumentTextDetectionRequest => GetDocumentTextDetectionResponse);

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Feature list rules shared by the sync and async analysis calls.
fn analysis_features(
    feature_types: &[FeatureType],
    queries_config: Option<&QueriesConfig>,
    adapters_config: Option<&AdaptersConfig>,
) -> ValidationResult {
    validate::count("FeatureTypes", feature_types.len(), 1, FeatureType::KNOWN.len())?;
    validate::distinct("FeatureTypes", feature_types)?;

    let wants_queries = feature_types.contains(&FeatureType::Queries);
    match (wants_queries, queries_config) {
        (true, None) => {
            return Err(ValidationError::new(
                "QueriesConfig",
                "is required when QUERIES is requested",
            ));
        }
        (false, Some(_)) => {
            return Err(ValidationError::new(
                "QueriesConfig",
                "is only allowed when QUERIES is requested",
            ));
        }
        (true, Some(config)) => validate::queries_config("QueriesConfig", config)?,
        (false, None) => {}
    }

    if let Some(config) = adapters_config {
        validate::adapters_config("AdaptersConfig", config)?;
    }
    Ok(())
}

/// Members every Start* request shares.
pub(crate) fn start_job_members(
    client_request_token: Option<&String>,
    job_tag: Option<&String>,
    notification_channel: Option<&NotificationChannel>,
    output_config: Option<&OutputConfig>,
    kms_key_id: Option<&String>,
) -> ValidationResult {
    validate::client_request_token("ClientRequestToken", client_request_token)?;
    validate::job_tag("JobTag", job_tag)?;
    validate::notification_channel("NotificationChannel", notification_channel)?;
    validate::output_config("OutputConfig", output_config)?;
    validate::kms_key_id("KMSKeyId", kms_key_id)
}

impl Validate for AnalyzeDocumentRequest {
    fn validate(&self) -> ValidationResult {
        validate::document("Document", &self.document)?;
        analysis_features(
            &self.feature_types,
            self.queries_config.as_ref(),
            self.adapters_config.as_ref(),
        )?;
        validate::human_loop_config("HumanLoopConfig", self.human_loop_config.as_ref())
    }
}

impl Validate for DetectDocumentTextRequest {
    fn validate(&self) -> ValidationResult {
        validate::document("Document", &self.document)
    }
}

impl Validate for StartDocumentAnalysisRequest {
    fn validate(&self) -> ValidationResult {
        validate::document_location("DocumentLocation", &self.document_location)?;
        analysis_features(
            &self.feature_types,
            self.queries_config.as_ref(),
            self.adapters_config.as_ref(),
        )?;
        start_job_members(
            self.client_request_token.as_ref(),
            self.job_tag.as_ref(),
            self.notification_channel.as_ref(),
            self.output_config.as_ref(),
            self.kms_key_id.as_ref(),
        )
    }
}

impl Validate for StartDocumentTextDetectionRequest {
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

impl Validate for GetDocumentAnalysisRequest {
    fn validate(&self) -> ValidationResult {
        validate::job_id("JobId", &self.job_id)?;
        validate::max_results("MaxResults", self.max_results, MAX_DOCUMENT_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}

impl Validate for GetDocumentTextDetectionRequest {
    fn validate(&self) -> ValidationResult {
        validate::job_id("JobId", &self.job_id)?;
        validate::max_results("MaxResults", self.max_results, MAX_DOCUMENT_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}
