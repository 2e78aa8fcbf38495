// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request-side value objects shared by several operations.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::enums::ContentClassifier;
use super::wire;

/// Input document: inline bytes or an S3 object, never both.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Document {
    #[serde(
        default,
        with = "wire::blob::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub bytes: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_object: Option<S3Object>,
}

impl Document {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            s3_object: None,
        }
    }

    pub fn from_s3(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bytes: None,
            s3_object: Some(S3Object::new(bucket, name)),
        }
    }
}

// Document bytes can be megabytes; print their size instead.
impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("bytes", &self.bytes.as_ref().map(|b| format!("<{} bytes>", b.len())))
            .field("s3_object", &self.s3_object)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct S3Object {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Object version, for versioned buckets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl S3Object {
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bucket: Some(bucket.into()),
            name: Some(name.into()),
            version: None,
        }
    }
}

/// Where an asynchronous job reads its input from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentLocation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_object: Option<S3Object>,
}

impl DocumentLocation {
    pub fn s3(bucket: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            s3_object: Some(S3Object::new(bucket, name)),
        }
    }
}

/// SNS topic that receives the job completion status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationChannel {
    #[serde(rename = "SNSTopicArn")]
    pub sns_topic_arn: String,
    #[serde(rename = "RoleArn")]
    pub role_arn: String,
}

/// Where the service also writes job output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputConfig {
    pub s3_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_prefix: Option<String>,
}

/// Route low-confidence results to human review.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HumanLoopConfig {
    pub human_loop_name: String,
    pub flow_definition_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_attributes: Option<HumanLoopDataAttributes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HumanLoopDataAttributes {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content_classifiers: Vec<ContentClassifier>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueriesConfig {
    pub queries: Vec<super::Query>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AdaptersConfig {
    pub adapters: Vec<Adapter>,
}

/// A trained adapter to apply to some pages of the document.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Adapter {
    pub adapter_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
    pub version: String,
}

impl Adapter {
    pub fn new(adapter_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            adapter_id: adapter_id.into(),
            pages: None,
            version: version.into(),
        }
    }

    pub fn with_pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages = Some(pages.into_iter().map(Into::into).collect());
        self
    }
}

/// Training data for a new adapter version.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasetConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_s3_object: Option<S3Object>,
}
