// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resource tagging.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::EmptyResponse;
use crate::operation::operation;
use crate::validate::{self, Validate, ValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagResourceRequest {
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UntagResourceRequest {
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
    pub tag_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTagsForResourceRequest {
    #[serde(rename = "ResourceARN")]
    pub resource_arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListTagsForResourceResponse {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

operation!(TagResourceRequest => EmptyResponse, "TagResource");
operation!(UntagResourceRequest => EmptyResponse, "UntagResource");
operation!(ListTagsForResourceRequest => ListTagsForResourceResponse, "ListTagsForResource");

impl Validate for TagResourceRequest {
    fn validate(&self) -> ValidationResult {
        validate::resource_arn("ResourceARN", &self.resource_arn)?;
        validate::tags("Tags", &self.tags)
    }
}

impl Validate for UntagResourceRequest {
    fn validate(&self) -> ValidationResult {
        validate::resource_arn("ResourceARN", &self.resource_arn)?;
        validate::count("TagKeys", self.tag_keys.len(), 0, validate::MAX_TAGS)?;
        for (i, key) in self.tag_keys.iter().enumerate() {
            validate::tag_key(&format!("TagKeys[{i}]"), key)?;
        }
        Ok(())
    }
}

impl Validate for ListTagsForResourceRequest {
    fn validate(&self) -> ValidationResult {
        validate::resource_arn("ResourceARN", &self.resource_arn)
    }
}
