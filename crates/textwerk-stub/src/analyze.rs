// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Turns a parsed synthetic document into service results: Block forests for
// text detection and document analysis, and the expense, identity, and
// lending views derived from the same parse.
//
// Output is deterministic.  Block ids are UUIDs numbered in emission order,
// so they are unique within one response and stable across calls.

use chrono::NaiveDate;
use uuid::Uuid;

use textwerk_core::model::{
    AnalyzeIdDetections, Block, BlockType, BoundingBox, DocumentGroup, EntityType,
    ExpenseCurrency, ExpenseDetection, ExpenseDocument, ExpenseField, ExpenseType, Extraction,
    FeatureType, Geometry, IdentityDocument, IdentityDocumentField, LendingDetection,
    LendingDocument, LendingField, LendingResult, LendingSummary, LineItemFields, LineItemGroup,
    NormalizedValue, PageClassification, Prediction, QueriesConfig, Query, Relationship,
    RelationshipType, SignatureDetection, SplitDocument, TextType, DetectedSignature,
    UndetectedSignature, ValueType,
};
use textwerk_core::validate;

use crate::document::{Line, MERGE_LEFT, Page, SyntheticDocument};

const ID_NAMESPACE: u128 = 0x7465_7874_7765_726b_0000_0000_0000_0000;
const MARGIN: f32 = 0.05;
const USABLE: f32 = 0.9;

const WORD_CONFIDENCE: f32 = 99.4;
const LINE_CONFIDENCE: f32 = 99.1;
const CELL_CONFIDENCE: f32 = 96.5;
const FORM_CONFIDENCE: f32 = 94.8;
const QUERY_CONFIDENCE: f32 = 91.0;
const SIGNATURE_CONFIDENCE: f32 = 97.2;

/// What to emit besides PAGE/LINE/WORD.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub tables: bool,
    pub forms: bool,
    pub signatures: bool,
    pub layout: bool,
    pub queries: Vec<Query>,
    /// Set `Page` on every block, as asynchronous results do.
    pub page_numbers: bool,
}

impl AnalysisOptions {
    /// Plain text detection.
    pub fn text(page_numbers: bool) -> Self {
        Self {
            page_numbers,
            ..Self::default()
        }
    }

    pub fn from_features(
        features: &[FeatureType],
        queries: Option<&QueriesConfig>,
        page_numbers: bool,
    ) -> Self {
        Self {
            tables: features.contains(&FeatureType::Tables),
            forms: features.contains(&FeatureType::Forms),
            signatures: features.contains(&FeatureType::Signatures),
            layout: features.contains(&FeatureType::Layout),
            queries: if features.contains(&FeatureType::Queries) {
                queries.map(|q| q.queries.clone()).unwrap_or_default()
            } else {
                Vec::new()
            },
            page_numbers,
        }
    }
}

/// Blocks for every readable page of `doc`.
pub fn blocks(doc: &SyntheticDocument, options: &AnalysisOptions) -> Vec<Block> {
    let pages: Vec<&Page> = doc.readable_pages().collect();
    blocks_for_pages(&pages, options)
}

fn blocks_for_pages(pages: &[&Page], options: &AnalysisOptions) -> Vec<Block> {
    let mut builder = Builder::default();
    for page in pages {
        builder.page(page, options);
    }
    builder.blocks
}

// ---------------------------------------------------------------------------
// Block builder
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    next_id: u64,
    page: Option<u32>,
}

/// WORD ids of one line, grouped by segment (table cell, field key/value).
type Segments = Vec<Vec<String>>;

impl Builder {
    fn reserve(&mut self) -> String {
        self.next_id += 1;
        Uuid::from_u128(ID_NAMESPACE | u128::from(self.next_id)).to_string()
    }

    fn push(&mut self, id: String, mut block: Block) -> String {
        block.id = Some(id.clone());
        block.page = self.page;
        self.blocks.push(block);
        id
    }

    fn add(&mut self, block: Block) -> String {
        let id = self.reserve();
        self.push(id, block)
    }

    fn page(&mut self, page: &Page, options: &AnalysisOptions) {
        self.page = options.page_numbers.then_some(page.number);
        let page_id = self.reserve();
        let page_pos = self.blocks.len();
        self.blocks.push(Block::default());

        let layout = PageLayout::new(page);
        let mut children = Vec::new();
        let mut line_ids: Vec<Option<String>> = Vec::with_capacity(page.lines.len());
        let mut segments: Vec<Segments> = Vec::with_capacity(page.lines.len());

        for (index, line) in page.lines.iter().enumerate() {
            if matches!(line, Line::Signature) {
                line_ids.push(None);
                segments.push(Vec::new());
                continue;
            }
            let (line_id, words) = self.line(line, layout.line_box(index), layout.char_width);
            children.push(line_id.clone());
            line_ids.push(Some(line_id));
            segments.push(words);
        }

        if options.tables {
            for (start, rows) in page.tables() {
                children.push(self.table(start, &rows, &segments, &layout));
            }
        }
        if options.forms {
            for (index, line) in page.lines.iter().enumerate() {
                if let Line::Field { .. } = line {
                    children.extend(self.key_value(&segments[index], layout.line_box(index)));
                }
            }
        }
        for query in &options.queries {
            if validate::pages_select(query.pages.as_deref(), page.number) {
                children.push(self.query(query, page, &layout));
            }
        }
        if options.signatures {
            for (index, line) in page.lines.iter().enumerate() {
                if matches!(line, Line::Signature) {
                    let mut bbox = layout.line_box(index);
                    bbox.width = bbox.width.min(0.3);
                    children.push(self.add(Block {
                        block_type: Some(BlockType::Signature),
                        confidence: Some(SIGNATURE_CONFIDENCE),
                        geometry: Some(Geometry::from_box(bbox)),
                        ..Block::default()
                    }));
                }
            }
        }
        if options.layout {
            children.extend(self.layout(page, &line_ids, &layout));
        }

        self.blocks[page_pos] = Block {
            block_type: Some(BlockType::Page),
            geometry: Some(Geometry::from_box(BoundingBox {
                width: 1.0,
                height: 1.0,
                left: 0.0,
                top: 0.0,
            })),
            id: Some(page_id),
            relationships: vec![Relationship::new(RelationshipType::Child, children)],
            page: self.page,
            ..Block::default()
        };
    }

    fn line(&mut self, line: &Line, bbox: BoundingBox, char_width: f32) -> (String, Segments) {
        let parts: Vec<String> = match line {
            Line::Text(text) | Line::Title(text) => vec![text.clone()],
            Line::Field { key, value } => vec![format!("{key}:"), value.clone()],
            Line::TableRow(cells) => cells
                .iter()
                .map(|c| if c == MERGE_LEFT { String::new() } else { c.clone() })
                .collect(),
            Line::Signature => Vec::new(),
        };

        let line_id = self.reserve();
        let mut cursor = 0usize;
        let mut word_ids = Vec::new();
        let mut segments = Vec::with_capacity(parts.len());
        for part in &parts {
            let mut segment = Vec::new();
            for word in part.split_whitespace() {
                let chars = word.chars().count();
                let word_box = BoundingBox {
                    width: chars as f32 * char_width,
                    height: bbox.height,
                    left: bbox.left + cursor as f32 * char_width,
                    top: bbox.top,
                };
                cursor += chars + 1;
                let id = self.add(Block {
                    block_type: Some(BlockType::Word),
                    confidence: Some(WORD_CONFIDENCE),
                    text: Some(word.to_owned()),
                    text_type: Some(TextType::Printed),
                    geometry: Some(Geometry::from_box(word_box)),
                    ..Block::default()
                });
                segment.push(id.clone());
                word_ids.push(id);
            }
            segments.push(segment);
        }

        let text = line.display_text();
        let line_box = BoundingBox {
            width: (text.chars().count() as f32 * char_width).min(USABLE),
            ..bbox
        };
        // WORD blocks were pushed first; LINE goes before them.
        let first_word = self.blocks.len() - word_ids.len();
        let mut line_block = Block {
            block_type: Some(BlockType::Line),
            confidence: Some(LINE_CONFIDENCE),
            text: Some(text),
            geometry: Some(Geometry::from_box(line_box)),
            id: Some(line_id.clone()),
            page: self.page,
            ..Block::default()
        };
        if !word_ids.is_empty() {
            line_block.relationships = vec![Relationship::new(RelationshipType::Child, word_ids)];
        }
        self.blocks.insert(first_word, line_block);
        (line_id, segments)
    }

    fn table(
        &mut self,
        start: usize,
        rows: &[&[String]],
        segments: &[Segments],
        layout: &PageLayout,
    ) -> String {
        let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0).max(1);
        let column_width = USABLE / columns as f32;
        let table_id = self.reserve();
        let mut cell_ids = Vec::new();
        let mut merged_ids = Vec::new();
        let mut table_box: Option<BoundingBox> = None;

        for (r, cells) in rows.iter().enumerate() {
            let line_index = start + r;
            let row_box = layout.line_box(line_index);
            table_box = Some(match table_box {
                Some(b) => b.union(&row_box),
                None => row_box,
            });

            let mut row_cell_ids = Vec::with_capacity(columns);
            for c in 0..columns {
                let words = segments[line_index].get(c).cloned().unwrap_or_default();
                let mut cell = Block {
                    block_type: Some(BlockType::Cell),
                    confidence: Some(CELL_CONFIDENCE),
                    row_index: Some(r as u32 + 1),
                    column_index: Some(c as u32 + 1),
                    row_span: Some(1),
                    column_span: Some(1),
                    geometry: Some(Geometry::from_box(BoundingBox {
                        width: column_width,
                        height: row_box.height,
                        left: MARGIN + c as f32 * column_width,
                        top: row_box.top,
                    })),
                    ..Block::default()
                };
                if r == 0 {
                    cell.entity_types = vec![EntityType::ColumnHeader];
                }
                if !words.is_empty() {
                    cell.relationships = vec![Relationship::new(RelationshipType::Child, words)];
                }
                row_cell_ids.push(self.add(cell));
            }

            for (first, span) in merge_runs(cells) {
                let mut merged = Block {
                    block_type: Some(BlockType::MergedCell),
                    confidence: Some(CELL_CONFIDENCE),
                    row_index: Some(r as u32 + 1),
                    column_index: Some(first as u32 + 1),
                    row_span: Some(1),
                    column_span: Some(span as u32),
                    geometry: Some(Geometry::from_box(BoundingBox {
                        width: column_width * span as f32,
                        height: row_box.height,
                        left: MARGIN + first as f32 * column_width,
                        top: row_box.top,
                    })),
                    relationships: vec![Relationship::new(
                        RelationshipType::Child,
                        row_cell_ids[first..first + span].to_vec(),
                    )],
                    ..Block::default()
                };
                if r == 0 {
                    merged.entity_types = vec![EntityType::ColumnHeader];
                }
                merged_ids.push(self.add(merged));
            }
            cell_ids.extend(row_cell_ids);
        }

        let mut relationships = vec![Relationship::new(RelationshipType::Child, cell_ids)];
        if !merged_ids.is_empty() {
            relationships.push(Relationship::new(RelationshipType::MergedCell, merged_ids));
        }
        self.push(
            table_id,
            Block {
                block_type: Some(BlockType::Table),
                confidence: Some(CELL_CONFIDENCE),
                geometry: table_box.map(Geometry::from_box),
                relationships,
                entity_types: vec![EntityType::StructuredTable],
                ..Block::default()
            },
        )
    }

    fn key_value(&mut self, segments: &Segments, bbox: BoundingBox) -> [String; 2] {
        let key_words = segments.first().cloned().unwrap_or_default();
        let value_words = segments.get(1).cloned().unwrap_or_default();
        let key_id = self.reserve();
        let value_id = self.reserve();

        let mut relationships = vec![Relationship::new(RelationshipType::Value, vec![value_id.clone()])];
        if !key_words.is_empty() {
            relationships.push(Relationship::new(RelationshipType::Child, key_words));
        }
        self.push(
            key_id.clone(),
            Block {
                block_type: Some(BlockType::KeyValueSet),
                confidence: Some(FORM_CONFIDENCE),
                geometry: Some(Geometry::from_box(bbox)),
                relationships,
                entity_types: vec![EntityType::Key],
                ..Block::default()
            },
        );

        let mut value = Block {
            block_type: Some(BlockType::KeyValueSet),
            confidence: Some(FORM_CONFIDENCE),
            geometry: Some(Geometry::from_box(bbox)),
            entity_types: vec![EntityType::Value],
            ..Block::default()
        };
        if !value_words.is_empty() {
            value.relationships = vec![Relationship::new(RelationshipType::Child, value_words)];
        }
        self.push(value_id.clone(), value);
        [key_id, value_id]
    }

    fn query(&mut self, query: &Query, page: &Page, layout: &PageLayout) -> String {
        let query_id = self.reserve();
        let mut block = Block {
            block_type: Some(BlockType::Query),
            query: Some(query.clone()),
            ..Block::default()
        };
        if let Some((index, answer)) = answer_query(&query.text, page) {
            let result_id = self.add(Block {
                block_type: Some(BlockType::QueryResult),
                confidence: Some(QUERY_CONFIDENCE),
                text: Some(answer.to_owned()),
                geometry: Some(Geometry::from_box(layout.line_box(index))),
                ..Block::default()
            });
            block.relationships = vec![Relationship::new(RelationshipType::Answer, vec![result_id])];
        }
        self.push(query_id, block)
    }

    fn layout(&mut self, page: &Page, line_ids: &[Option<String>], layout: &PageLayout) -> Vec<String> {
        let mut ids = Vec::new();
        let mut index = 0;
        while index < page.lines.len() {
            let line = &page.lines[index];
            let (block_type, span) = match line {
                Line::Signature => {
                    index += 1;
                    continue;
                }
                Line::Title(_) => (BlockType::LayoutTitle, 1),
                Line::Field { .. } => (BlockType::LayoutKeyValue, 1),
                Line::Text(_) => (BlockType::LayoutText, 1),
                Line::TableRow(_) => {
                    let run = page.lines[index..]
                        .iter()
                        .take_while(|l| matches!(l, Line::TableRow(_)))
                        .count();
                    (BlockType::LayoutTable, run)
                }
            };
            let children: Vec<String> = line_ids[index..index + span]
                .iter()
                .flatten()
                .cloned()
                .collect();
            let bbox = (index + 1..index + span)
                .fold(layout.line_box(index), |b, i| b.union(&layout.line_box(i)));
            ids.push(self.add(Block {
                block_type: Some(block_type),
                confidence: Some(LINE_CONFIDENCE),
                geometry: Some(Geometry::from_box(bbox)),
                relationships: vec![Relationship::new(RelationshipType::Child, children)],
                ..Block::default()
            }));
            index += span;
        }
        ids
    }
}

/// Column runs `(first, span)` joined by merge markers.
fn merge_runs(cells: &[String]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut c = 0;
    while c < cells.len() {
        let span = 1 + cells[c + 1..]
            .iter()
            .take_while(|cell| cell.as_str() == MERGE_LEFT)
            .count();
        if span > 1 {
            runs.push((c, span));
        }
        c += span;
    }
    runs
}

/// The field whose key appears in the question, preferring the longest key.
fn answer_query<'p>(question: &str, page: &'p Page) -> Option<(usize, &'p str)> {
    let question = question.to_lowercase();
    page.lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| match line {
            Line::Field { key, value } if !value.is_empty() => {
                question.contains(&key.to_lowercase()).then_some((index, key.len(), value.as_str()))
            }
            _ => None,
        })
        .max_by_key(|&(_, key_len, _)| key_len)
        .map(|(index, _, value)| (index, value))
}

/// Deterministic page geometry: lines stacked top to bottom in a fixed grid.
struct PageLayout {
    line_pitch: f32,
    char_width: f32,
}

impl PageLayout {
    fn new(page: &Page) -> Self {
        let widest = page
            .lines
            .iter()
            .map(|l| l.display_text().chars().count())
            .max()
            .unwrap_or(0)
            .max(60);
        Self {
            line_pitch: USABLE / page.lines.len().max(25) as f32,
            char_width: USABLE / widest as f32,
        }
    }

    fn line_box(&self, index: usize) -> BoundingBox {
        BoundingBox {
            width: USABLE,
            height: self.line_pitch * 0.8,
            left: MARGIN,
            top: MARGIN + index as f32 * self.line_pitch,
        }
    }
}

// ---------------------------------------------------------------------------
// Expense
// ---------------------------------------------------------------------------

/// One expense document covering every readable page.
pub fn expense_documents(doc: &SyntheticDocument) -> Vec<ExpenseDocument> {
    let pages: Vec<&Page> = doc.readable_pages().collect();
    if pages.is_empty() {
        return Vec::new();
    }
    vec![expense_document(&pages, 1)]
}

fn expense_document(pages: &[&Page], index: u32) -> ExpenseDocument {
    let mut summary_fields = Vec::new();
    let mut line_item_groups = Vec::new();

    for page in pages {
        for (key, value) in page.fields() {
            summary_fields.push(ExpenseField {
                kind: Some(ExpenseType {
                    text: Some(expense_summary_type(key).to_owned()),
                    confidence: Some(FORM_CONFIDENCE),
                }),
                label_detection: Some(detection(key)),
                value_detection: Some(detection(value)),
                page_number: Some(page.number),
                currency: currency_of(value),
                group_properties: Vec::new(),
            });
        }

        for (_, rows) in page.tables() {
            let Some((header, items)) = rows.split_first() else {
                continue;
            };
            if items.is_empty() {
                continue;
            }
            let line_items = items
                .iter()
                .map(|row| {
                    let mut fields: Vec<ExpenseField> = header
                        .iter()
                        .zip(row.iter())
                        .filter(|(_, cell)| !cell.is_empty() && cell.as_str() != MERGE_LEFT)
                        .map(|(label, cell)| ExpenseField {
                            kind: Some(ExpenseType {
                                text: Some(line_item_type(label).to_owned()),
                                confidence: Some(CELL_CONFIDENCE),
                            }),
                            label_detection: Some(detection(label)),
                            value_detection: Some(detection(cell)),
                            page_number: Some(page.number),
                            currency: currency_of(cell),
                            group_properties: Vec::new(),
                        })
                        .collect();
                    fields.push(ExpenseField {
                        kind: Some(ExpenseType {
                            text: Some("EXPENSE_ROW".into()),
                            confidence: Some(CELL_CONFIDENCE),
                        }),
                        value_detection: Some(detection(&Line::TableRow(row.to_vec()).display_text())),
                        page_number: Some(page.number),
                        ..ExpenseField::default()
                    });
                    LineItemFields {
                        line_item_expense_fields: fields,
                    }
                })
                .collect();
            line_item_groups.push(LineItemGroup {
                line_item_group_index: Some(line_item_groups.len() as u32 + 1),
                line_items,
            });
        }
    }

    ExpenseDocument {
        expense_index: Some(index),
        summary_fields,
        line_item_groups,
        blocks: blocks_for_pages(pages, &AnalysisOptions::text(false)),
    }
}

fn detection(text: &str) -> ExpenseDetection {
    ExpenseDetection {
        text: Some(text.to_owned()),
        geometry: None,
        confidence: Some(FORM_CONFIDENCE),
    }
}

fn expense_summary_type(label: &str) -> &'static str {
    match normalize_key(label).as_str() {
        "VENDOR" | "VENDOR_NAME" | "MERCHANT" | "SELLER" => "VENDOR_NAME",
        "TOTAL" | "AMOUNT_DUE" | "BALANCE_DUE" | "GRAND_TOTAL" => "TOTAL",
        "SUBTOTAL" | "SUB_TOTAL" => "SUBTOTAL",
        "TAX" | "VAT" | "SALES_TAX" => "TAX",
        "DATE" | "INVOICE_DATE" | "RECEIPT_DATE" => "INVOICE_RECEIPT_DATE",
        "INVOICE" | "INVOICE_NUMBER" | "INVOICE_NO" | "RECEIPT_NUMBER" => "INVOICE_RECEIPT_ID",
        "DUE_DATE" => "DUE_DATE",
        "PO_NUMBER" => "PO_NUMBER",
        _ => "OTHER",
    }
}

fn line_item_type(label: &str) -> &'static str {
    match normalize_key(label).as_str() {
        "ITEM" | "DESCRIPTION" | "PRODUCT" => "ITEM",
        "QTY" | "QUANTITY" => "QUANTITY",
        "PRICE" | "UNIT_PRICE" | "RATE" => "UNIT_PRICE",
        "AMOUNT" | "TOTAL" | "LINE_TOTAL" => "PRICE",
        "CODE" | "SKU" => "PRODUCT_CODE",
        _ => "OTHER",
    }
}

fn currency_of(value: &str) -> Option<ExpenseCurrency> {
    let code = match value.trim().chars().next()? {
        '$' => "USD",
        '€' => "EUR",
        '£' => "GBP",
        '¥' => "JPY",
        _ => return None,
    };
    Some(ExpenseCurrency {
        code: Some(code.into()),
        confidence: Some(FORM_CONFIDENCE),
    })
}

/// `Date of birth` -> `DATE_OF_BIRTH`.
fn normalize_key(key: &str) -> String {
    key.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_uppercase)
        .collect::<Vec<_>>()
        .join("_")
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Normalised fields reported for every identity document, present or not.
pub const IDENTITY_FIELDS: &[&str] = &[
    "FIRST_NAME",
    "LAST_NAME",
    "MIDDLE_NAME",
    "SUFFIX",
    "ADDRESS",
    "CITY_IN_ADDRESS",
    "ZIP_CODE_IN_ADDRESS",
    "STATE_IN_ADDRESS",
    "COUNTY",
    "DOCUMENT_NUMBER",
    "EXPIRATION_DATE",
    "DATE_OF_BIRTH",
    "STATE_NAME",
    "DATE_OF_ISSUE",
    "CLASS",
    "RESTRICTIONS",
    "ENDORSEMENTS",
    "VETERAN",
    "PLACE_OF_BIRTH",
    "MRZ_CODE",
    "ID_TYPE",
];

const DATE_FIELDS: &[&str] = &["EXPIRATION_DATE", "DATE_OF_BIRTH", "DATE_OF_ISSUE"];

/// Identity fields read from `Key: Value` lines of the first readable page.
pub fn identity_document(doc: &SyntheticDocument, index: u32) -> IdentityDocument {
    let pages: Vec<&Page> = doc.readable_pages().take(1).collect();
    identity_from_pages(&pages, index)
}

fn identity_from_pages(pages: &[&Page], index: u32) -> IdentityDocument {
    let page = pages.first();
    let lookup = |name: &str| -> Option<String> {
        let page = page?;
        if name == "ID_TYPE" {
            let text = page.lowercase_text();
            return Some(if text.contains("passport") {
                "PASSPORT".into()
            } else {
                "DRIVER LICENSE FRONT".into()
            });
        }
        page.fields()
            .find(|(key, _)| identity_field_name(key) == name)
            .map(|(_, value)| value.to_owned())
    };

    let identity_document_fields = IDENTITY_FIELDS
        .iter()
        .map(|&name| {
            let found = lookup(name);
            let normalized_value = found
                .as_deref()
                .filter(|_| DATE_FIELDS.contains(&name))
                .and_then(normalize_date)
                .map(|iso| NormalizedValue {
                    value: Some(iso),
                    value_type: Some(ValueType::Date),
                });
            IdentityDocumentField {
                kind: Some(AnalyzeIdDetections {
                    text: name.to_owned(),
                    normalized_value: None,
                    confidence: Some(99.0),
                }),
                value_detection: Some(AnalyzeIdDetections {
                    confidence: Some(if found.is_some() { 98.0 } else { 99.0 }),
                    text: found.unwrap_or_default(),
                    normalized_value,
                }),
            }
        })
        .collect();

    IdentityDocument {
        document_index: Some(index),
        identity_document_fields,
        blocks: blocks_for_pages(pages, &AnalysisOptions::text(false)),
    }
}

fn identity_field_name(key: &str) -> String {
    let key = normalize_key(key);
    let alias = match key.as_str() {
        "GIVEN_NAME" | "GIVEN_NAMES" | "FORENAME" => "FIRST_NAME",
        "SURNAME" | "FAMILY_NAME" => "LAST_NAME",
        "DOB" | "BIRTH_DATE" => "DATE_OF_BIRTH",
        "EXPIRES" | "EXPIRY" | "EXPIRY_DATE" | "DATE_OF_EXPIRY" => "EXPIRATION_DATE",
        "ISSUED" | "ISSUE_DATE" => "DATE_OF_ISSUE",
        "PASSPORT_NO" | "PASSPORT_NUMBER" | "LICENSE_NUMBER" | "DL_NUMBER" | "ID_NUMBER" => {
            "DOCUMENT_NUMBER"
        }
        "STATE" => "STATE_IN_ADDRESS",
        "CITY" => "CITY_IN_ADDRESS",
        "ZIP" | "ZIP_CODE" | "POSTCODE" => "ZIP_CODE_IN_ADDRESS",
        _ => return key,
    };
    alias.to_owned()
}

/// ISO 8601 at midnight, the way normalised dates are reported.
fn normalize_date(raw: &str) -> Option<String> {
    const FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d %b %Y", "%d %B %Y", "%d.%m.%Y"];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw.trim(), fmt).ok())
        .map(|date| format!("{}T00:00:00", date.format("%Y-%m-%d")))
}

// ---------------------------------------------------------------------------
// Lending
// ---------------------------------------------------------------------------

/// Document types the lending classifier can report.
pub const LENDING_TYPES: &[&str] = &[
    "1003",
    "BANK_STATEMENTS",
    "CHECKS",
    "CREDIT_CARD_STATEMENTS",
    "IDENTITY_DOCUMENT",
    "INVOICES",
    "MORTGAGE_STATEMENTS",
    "PAYSLIPS",
    "RECEIPTS",
    "W2",
];

const UNCLASSIFIED: &str = "UNCLASSIFIED";

const CLASSIFIER: &[(&[&str], &str)] = &[
    (&["uniform residential loan application", "form 1003"], "1003"),
    (&["payslip", "pay stub", "earnings statement"], "PAYSLIPS"),
    (&["bank statement"], "BANK_STATEMENTS"),
    (&["mortgage statement"], "MORTGAGE_STATEMENTS"),
    (&["credit card statement"], "CREDIT_CARD_STATEMENTS"),
    (&["pay to the order of"], "CHECKS"),
    (&["wage and tax statement", "w-2"], "W2"),
    (&["passport", "driver license", "driver's license"], "IDENTITY_DOCUMENT"),
    (&["invoice"], "INVOICES"),
    (&["receipt"], "RECEIPTS"),
];

fn classify(page: &Page) -> &'static str {
    let text = page.lowercase_text();
    CLASSIFIER
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| text.contains(k)))
        .map_or(UNCLASSIFIED, |&(_, kind)| kind)
}

/// Runs of consecutive readable pages with the same classification.
fn split_runs(doc: &SyntheticDocument) -> Vec<(&'static str, Vec<&Page>)> {
    let mut runs: Vec<(&'static str, Vec<&Page>)> = Vec::new();
    for page in doc.readable_pages() {
        let kind = classify(page);
        if let Some((last_kind, pages)) = runs.last_mut() {
            if *last_kind == kind {
                pages.push(page);
                continue;
            }
        }
        runs.push((kind, vec![page]));
    }
    runs
}

/// Per-page classification and extraction.
pub fn lending_results(doc: &SyntheticDocument) -> Vec<LendingResult> {
    let mut results = Vec::new();
    for (kind, pages) in split_runs(doc) {
        for (position, page) in pages.iter().enumerate() {
            let extraction = match kind {
                UNCLASSIFIED => None,
                "IDENTITY_DOCUMENT" => Some(Extraction {
                    identity_document: Some(identity_from_pages(&[*page], 1)),
                    ..Extraction::default()
                }),
                "INVOICES" | "RECEIPTS" => Some(Extraction {
                    expense_document: Some(expense_document(&[*page], 1)),
                    ..Extraction::default()
                }),
                _ => Some(Extraction {
                    lending_document: Some(lending_document(page)),
                    ..Extraction::default()
                }),
            };
            results.push(LendingResult {
                page: Some(page.number),
                page_classification: Some(PageClassification {
                    page_type: vec![Prediction {
                        value: Some(kind.to_owned()),
                        confidence: Some(if kind == UNCLASSIFIED { 55.0 } else { 93.0 }),
                    }],
                    page_number: vec![Prediction {
                        value: Some((position + 1).to_string()),
                        confidence: Some(90.0),
                    }],
                }),
                extractions: extraction.into_iter().collect(),
            });
        }
    }
    results
}

fn lending_document(page: &Page) -> LendingDocument {
    let lending_fields = page
        .fields()
        .map(|(key, value)| LendingField {
            kind: Some(normalize_key(key)),
            key_detection: Some(LendingDetection {
                text: Some(key.to_owned()),
                confidence: Some(FORM_CONFIDENCE),
                ..LendingDetection::default()
            }),
            value_detections: if value.is_empty() {
                Vec::new()
            } else {
                vec![LendingDetection {
                    text: Some(value.to_owned()),
                    confidence: Some(FORM_CONFIDENCE),
                    ..LendingDetection::default()
                }]
            },
        })
        .collect();
    let layout = PageLayout::new(page);
    let signature_detections = page
        .lines
        .iter()
        .enumerate()
        .filter(|(_, line)| matches!(line, Line::Signature))
        .map(|(index, _)| SignatureDetection {
            confidence: Some(SIGNATURE_CONFIDENCE),
            geometry: Some(Geometry::from_box(layout.line_box(index))),
        })
        .collect();
    LendingDocument {
        lending_fields,
        signature_detections,
    }
}

/// Pages grouped by document type, with signature coverage.
pub fn lending_summary(doc: &SyntheticDocument) -> LendingSummary {
    let mut groups: Vec<DocumentGroup> = Vec::new();
    for (kind, pages) in split_runs(doc) {
        if kind == UNCLASSIFIED {
            continue;
        }
        let position = match groups.iter().position(|g| g.kind.as_deref() == Some(kind)) {
            Some(position) => position,
            None => {
                groups.push(DocumentGroup {
                    kind: Some(kind.to_owned()),
                    ..DocumentGroup::default()
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[position];
        group.split_documents.push(SplitDocument {
            index: Some(group.split_documents.len() as u32 + 1),
            pages: pages.iter().map(|p| p.number).collect(),
        });
        for page in &pages {
            if page.has_signature() {
                group.detected_signatures.push(DetectedSignature {
                    page: Some(page.number),
                });
            } else if page
                .fields()
                .any(|(key, value)| value.is_empty() && key.to_lowercase().contains("signature"))
            {
                group.undetected_signatures.push(UndetectedSignature {
                    page: Some(page.number),
                });
            }
        }
    }

    let undetected_document_types = LENDING_TYPES
        .iter()
        .filter(|t| !groups.iter().any(|g| g.kind.as_deref() == Some(**t)))
        .map(|t| (*t).to_owned())
        .collect();
    LendingSummary {
        document_groups: groups,
        undetected_document_types,
    }
}
