// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Custom adapter management: adapters, their trained versions, and listing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AdapterVersionStatus, AutoUpdate, DatasetConfig, FeatureType, OutputConfig, wire};
use crate::operation::{operation, paginated};
use crate::validate::{self, Validate, ValidationResult};

/// Page size limit of the adapter listings.
pub const MAX_ADAPTER_RESULTS: u32 = 1000;

/// Body of operations that return nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmptyResponse {}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAdapterRequest {
    pub adapter_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAdapterResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAdapterVersionRequest {
    pub adapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_request_token: Option<String>,
    pub dataset_config: DatasetConfig,
    #[serde(rename = "KMSKeyId", default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    pub output_config: OutputConfig,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAdapterVersionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAdapterRequest {
    pub adapter_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAdapterResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_name: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAdapterVersionRequest {
    pub adapter_id: String,
    pub adapter_version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAdapterVersionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_version: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdapterVersionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_config: Option<DatasetConfig>,
    #[serde(rename = "KMSKeyId", default, skip_serializing_if = "Option::is_none")]
    pub kms_key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_config: Option<OutputConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evaluation_metrics: Vec<AdapterVersionEvaluationMetric>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

/// Accuracy of a trained version against the base model, per feature.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterVersionEvaluationMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline: Option<EvaluationMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_version: Option<EvaluationMetric>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_type: Option<FeatureType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EvaluationMetric {
    #[serde(rename = "F1Score", default, skip_serializing_if = "Option::is_none")]
    pub f1_score: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateAdapterRequest {
    pub adapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateAdapterResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_name: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<AutoUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteAdapterRequest {
    pub adapter_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeleteAdapterVersionRequest {
    pub adapter_id: String,
    pub adapter_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAdaptersRequest {
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub after_creation_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub before_creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAdaptersResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adapters: Vec<AdapterOverview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterOverview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_name: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_types: Vec<FeatureType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAdapterVersionsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub after_creation_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub before_creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListAdapterVersionsResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub adapter_versions: Vec<AdapterVersionOverview>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdapterVersionOverview {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adapter_version: Option<String>,
    #[serde(
        default,
        with = "wire::epoch_seconds::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature_types: Vec<FeatureType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AdapterVersionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

operation!(CreateAdapterRequest => CreateAdapterResponse, "CreateAdapter");
operation!(CreateAdapterVersionRequest => CreateAdapterVersionResponse, "CreateAdapterVersion");
operation!(GetAdapterRequest => GetAdapterResponse, "GetAdapter");
operation!(GetAdapterVersionRequest => GetAdapterVersionResponse, "GetAdapterVersion");
operation!(UpdateAdapterRequest => UpdateAdapterResponse, "UpdateAdapter");
operation!(DeleteAdapterRequest => EmptyResponse, "DeleteAdapter");
operation!(DeleteAdapterVersionRequest => EmptyResponse, "DeleteAdapterVersion");
operation!(ListAdaptersRequest => ListAdaptersResponse, "ListAdapters");
operation!(ListAdapterVersionsRequest => ListAdapterVersionsResponse, "ListAdapterVersions");

paginated!(ListAdaptersRequest => ListAdaptersResponse);
paginated!(ListAdapterVersionsRequest => ListAdapterVersionsResponse);

fn adapter_features(feature_types: &[FeatureType]) -> ValidationResult {
    validate::count("FeatureTypes", feature_types.len(), 1, FeatureType::KNOWN.len())?;
    validate::distinct("FeatureTypes", feature_types)
}

impl Validate for CreateAdapterRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_name("AdapterName", &self.adapter_name)?;
        validate::client_request_token("ClientRequestToken", self.client_request_token.as_ref())?;
        validate::description("Description", self.description.as_ref())?;
        adapter_features(&self.feature_types)?;
        validate::tags("Tags", &self.tags)
    }
}

impl Validate for CreateAdapterVersionRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)?;
        validate::client_request_token("ClientRequestToken", self.client_request_token.as_ref())?;
        if let Some(manifest) = &self.dataset_config.manifest_s3_object {
            validate::s3_object("DatasetConfig.ManifestS3Object", manifest)?;
        }
        validate::kms_key_id("KMSKeyId", self.kms_key_id.as_ref())?;
        validate::output_config("OutputConfig", Some(&self.output_config))?;
        validate::tags("Tags", &self.tags)
    }
}

impl Validate for GetAdapterRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)
    }
}

impl Validate for GetAdapterVersionRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)?;
        validate::adapter_version("AdapterVersion", &self.adapter_version)
    }
}

impl Validate for UpdateAdapterRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)?;
        validate::description("Description", self.description.as_ref())?;
        if let Some(name) = &self.adapter_name {
            validate::adapter_name("AdapterName", name)?;
        }
        Ok(())
    }
}

impl Validate for DeleteAdapterRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)
    }
}

impl Validate for DeleteAdapterVersionRequest {
    fn validate(&self) -> ValidationResult {
        validate::adapter_id("AdapterId", &self.adapter_id)?;
        validate::adapter_version("AdapterVersion", &self.adapter_version)
    }
}

impl Validate for ListAdaptersRequest {
    fn validate(&self) -> ValidationResult {
        validate::max_results("MaxResults", self.max_results, MAX_ADAPTER_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}

impl Validate for ListAdapterVersionsRequest {
    fn validate(&self) -> ValidationResult {
        if let Some(id) = &self.adapter_id {
            validate::adapter_id("AdapterId", id)?;
        }
        validate::max_results("MaxResults", self.max_results, MAX_ADAPTER_RESULTS)?;
        validate::next_token("NextToken", self.next_token.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn create_adapter_needs_features() {
        let mut request = CreateAdapterRequest {
            adapter_name: "invoices".into(),
            ..CreateAdapterRequest::default()
        };
        assert_eq!(request.validate().unwrap_err().field, "FeatureTypes");
        request.feature_types = vec![FeatureType::Queries];
        assert!(request.validate().is_ok());
    }

    #[test]
    fn listing_encodes_creation_window_as_epoch_seconds() {
        let request = ListAdaptersRequest {
            after_creation_time: Utc.timestamp_opt(1_700_000_000, 0).single(),
            max_results: Some(5),
            ..ListAdaptersRequest::default()
        };
        let json = serde_json::to_value(&request).expect("encode");
        assert_eq!(json["AfterCreationTime"], 1_700_000_000);
        assert_eq!(json["MaxResults"], 5);
        assert!(json.get("NextToken").is_none());
    }

    #[test]
    fn version_metrics_decode() {
        let json = r#"{
            "AdapterId": "abcdefghijkl",
            "AdapterVersion": "1",
            "Status": "ACTIVE",
            "CreationTime": 1700000000.25,
            "EvaluationMetrics": [{
                "FeatureType": "QUERIES",
                "Baseline": { "F1Score": 0.71 },
                "AdapterVersion": { "F1Score": 0.93, "Precision": 0.9, "Recall": 0.95 }
            }]
        }"#;
        let response: GetAdapterVersionResponse = serde_json::from_str(json).expect("decode");
        assert_eq!(response.status, Some(AdapterVersionStatus::Active));
        let metric = &response.evaluation_metrics[0];
        assert_eq!(metric.feature_type, Some(FeatureType::Queries));
        assert_eq!(metric.adapter_version.and_then(|m| m.f1_score), Some(0.93));
        assert!(response.creation_time.is_some());
    }

    #[test]
    fn empty_response_accepts_empty_body() {
        let response: EmptyResponse = serde_json::from_str("{}").expect("decode");
        assert_eq!(response, EmptyResponse {});
    }
}
