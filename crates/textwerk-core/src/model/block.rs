// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blocks: the atomic output unit of document analysis, and the small value
// objects they are built from.

use serde::{Deserialize, Serialize};

use super::enums::{BlockType, EntityType, RelationshipType, SelectionStatus, TextType};

/// A piece of detected content: a page, line, word, table cell, etc.
///
/// Which optional members are present depends on `block_type` and on the
/// features that were requested.  `id` is only unique within one response.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<BlockType>,
    /// 0-100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_type: Option<TextType>,
    /// 1-based; CELL and MERGED_CELL only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_span: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entity_types: Vec<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_status: Option<SelectionStatus>,
    /// Page number; only returned by asynchronous operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// The query a QUERY block answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Query>,
}

impl Block {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn is(&self, block_type: &BlockType) -> bool {
        self.block_type.as_ref() == Some(block_type)
    }

    pub fn has_entity_type(&self, entity_type: &EntityType) -> bool {
        self.entity_types.contains(entity_type)
    }

    /// Ids linked from this block by relationships of `kind`, in order.
    pub fn related_ids<'a>(
        &'a self,
        kind: &'a RelationshipType,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.relationships
            .iter()
            .filter(move |r| r.kind.as_ref() == Some(kind))
            .flat_map(|r| r.ids.iter().map(String::as_str))
    }

    /// Whether any table-position member is set.
    pub fn has_table_fields(&self) -> bool {
        self.row_index.is_some()
            || self.column_index.is_some()
            || self.row_span.is_some()
            || self.column_span.is_some()
    }

    /// Members that are present although this block type never carries them.
    ///
    /// `text_detection` selects the stricter rules for text-detection
    /// results, which never include table or form members.
    pub fn shape_violations(&self, text_detection: bool) -> Vec<&'static str> {
        let mut violations = Vec::new();
        let is_cell = self
            .block_type
            .as_ref()
            .is_some_and(BlockType::is_table_cell);

        if self.has_table_fields() && (text_detection || !is_cell) {
            violations.push("table position on a non-cell block");
        }
        if self.selection_status.is_some()
            && (text_detection || !self.is(&BlockType::SelectionElement))
        {
            violations.push("selection status on a non-selection block");
        }
        if text_detection && !self.entity_types.is_empty() {
            violations.push("entity types in a text-detection result");
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=100.0).contains(&confidence) {
                violations.push("confidence outside 0-100");
            }
        }
        violations
    }
}

/// Location of a block on the page, in ratios of the page size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polygon: Vec<Point>,
}

impl Geometry {
    /// Box plus the matching four-corner polygon.
    pub fn from_box(bounding_box: BoundingBox) -> Self {
        let BoundingBox {
            left,
            top,
            width,
            height,
        } = bounding_box;
        Self {
            polygon: vec![
                Point { x: left, y: top },
                Point {
                    x: left + width,
                    y: top,
                },
                Point {
                    x: left + width,
                    y: top + height,
                },
                Point {
                    x: left,
                    y: top + height,
                },
            ],
            bounding_box: Some(bounding_box),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub top: f32,
}

impl BoundingBox {
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let left = self.left.min(other.left);
        let top = self.top.min(other.top);
        BoundingBox {
            left,
            top,
            width: self.right().max(other.right()) - left,
            height: self.bottom().max(other.bottom()) - top,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Typed edge from one block to an ordered list of others.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Relationship {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RelationshipType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

impl Relationship {
    pub fn new(kind: RelationshipType, ids: Vec<String>) -> Self {
        Self {
            kind: Some(kind),
            ids,
        }
    }
}

/// A question asked of the document (QUERIES feature).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Query {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Page selectors, e.g. `["1", "3-5", "7-*"]`; all pages when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<String>>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
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

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
}

/// A non-fatal problem on some pages of an asynchronous job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Warning {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pages: Vec<u32>,
}
