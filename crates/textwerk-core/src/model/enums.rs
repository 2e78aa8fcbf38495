// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Open string enumerations.
//
// The service adds new block types, statuses and feature names without
// notice.  Every enum-like field therefore decodes into either a known
// variant or `Unknown(raw)`, and encodes back to the exact wire string.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! open_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value this client does not know yet, kept verbatim.
            Unknown(String),
        }

        impl $name {
            /// Every variant this client knows about, in declaration order.
            pub const KNOWN: &'static [$name] = &[ $( $name::$variant, )+ ];

            /// Wire representation.
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $wire, )+
                    Self::Unknown(raw) => raw.as_str(),
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Unknown(_))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw {
                    $( $wire => Self::$variant, )+
                    other => Self::Unknown(other.to_owned()),
                }
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                match Self::from(raw.as_str()) {
                    Self::Unknown(_) => Self::Unknown(raw),
                    known => known,
                }
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::from(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                String::deserialize(deserializer).map(Self::from)
            }
        }
    };
}

open_enum! {
    /// Kind of content a [`Block`](super::Block) represents.
    BlockType {
        KeyValueSet => "KEY_VALUE_SET",
        Page => "PAGE",
        Line => "LINE",
        Word => "WORD",
        Table => "TABLE",
        Cell => "CELL",
        SelectionElement => "SELECTION_ELEMENT",
        MergedCell => "MERGED_CELL",
        Title => "TITLE",
        Query => "QUERY",
        QueryResult => "QUERY_RESULT",
        Signature => "SIGNATURE",
        TableTitle => "TABLE_TITLE",
        TableFooter => "TABLE_FOOTER",
        LayoutText => "LAYOUT_TEXT",
        LayoutTitle => "LAYOUT_TITLE",
        LayoutHeader => "LAYOUT_HEADER",
        LayoutFooter => "LAYOUT_FOOTER",
        LayoutSectionHeader => "LAYOUT_SECTION_HEADER",
        LayoutPageNumber => "LAYOUT_PAGE_NUMBER",
        LayoutList => "LAYOUT_LIST",
        LayoutFigure => "LAYOUT_FIGURE",
        LayoutTable => "LAYOUT_TABLE",
        LayoutKeyValue => "LAYOUT_KEY_VALUE",
    }
}

impl BlockType {
    /// Blocks that may carry row/column indices and spans.
    pub fn is_table_cell(&self) -> bool {
        matches!(self, Self::Cell | Self::MergedCell)
    }

    pub fn is_layout(&self) -> bool {
        self.as_str().starts_with("LAYOUT_")
    }
}

open_enum! {
    /// Role of a KEY_VALUE_SET or table-related block.
    EntityType {
        Key => "KEY",
        Value => "VALUE",
        ColumnHeader => "COLUMN_HEADER",
        TableTitle => "TABLE_TITLE",
        TableFooter => "TABLE_FOOTER",
        TableSectionTitle => "TABLE_SECTION_TITLE",
        TableSummary => "TABLE_SUMMARY",
        StructuredTable => "STRUCTURED_TABLE",
        SemiStructuredTable => "SEMI_STRUCTURED_TABLE",
    }
}

open_enum! {
    /// Edge label between two blocks.
    RelationshipType {
        Value => "VALUE",
        Child => "CHILD",
        ComplexFeatures => "COMPLEX_FEATURES",
        MergedCell => "MERGED_CELL",
        Title => "TITLE",
        Answer => "ANSWER",
        Table => "TABLE",
        TableTitle => "TABLE_TITLE",
        TableFooter => "TABLE_FOOTER",
    }
}

open_enum! {
    SelectionStatus {
        Selected => "SELECTED",
        NotSelected => "NOT_SELECTED",
    }
}

open_enum! {
    TextType {
        Handwriting => "HANDWRITING",
        Printed => "PRINTED",
    }
}

open_enum! {
    /// Analysis capability requested from AnalyzeDocument / StartDocumentAnalysis.
    FeatureType {
        Tables => "TABLES",
        Forms => "FORMS",
        Queries => "QUERIES",
        Signatures => "SIGNATURES",
        Layout => "LAYOUT",
    }
}

open_enum! {
    /// Lifecycle state of an asynchronous job.
    JobStatus {
        InProgress => "IN_PROGRESS",
        Succeeded => "SUCCEEDED",
        Failed => "FAILED",
        PartialSuccess => "PARTIAL_SUCCESS",
    }
}

impl JobStatus {
    /// Whether polling can stop.  Unknown statuses are not terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::PartialSuccess)
    }
}

open_enum! {
    /// Data attributes that let human review skip sensitive content.
    ContentClassifier {
        FreeOfPersonallyIdentifiableInformation => "FreeOfPersonallyIdentifiableInformation",
        FreeOfAdultContent => "FreeOfAdultContent",
    }
}

open_enum! {
    /// Normalised value type on identity-document fields.
    ValueType {
        Date => "DATE",
    }
}

open_enum! {
    /// Whether an adapter retrains automatically.
    AutoUpdate {
        Enabled => "ENABLED",
        Disabled => "DISABLED",
    }
}

open_enum! {
    AdapterVersionStatus {
        Active => "ACTIVE",
        AtRisk => "AT_RISK",
        Deprecated => "DEPRECATED",
        CreationError => "CREATION_ERROR",
        CreationInProgress => "CREATION_IN_PROGRESS",
    }
}
