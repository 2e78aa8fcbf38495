// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic document format understood by the stub.
//
// A document is UTF-8 text.  Pages are separated by form feed (0x0C) and
// lines by newline.  Each line is classified by its shape:
//
//   | a | b | c |     table row (cells split on `|`; a cell of `<` merges
//                     with the cell to its left)
//   Key: Value        form field
//   [signature]       signature
//   # Heading         title
//   anything else     plain text
//
// Blank lines are dropped.  A page containing `<<unreadable>>` is kept but
// marked unreadable; analysis skips it with a warning.

/// Page separator.
pub const PAGE_BREAK: char = '\u{0c}';

/// Marker that makes a page unreadable.
pub const UNREADABLE_MARKER: &str = "<<unreadable>>";

/// Cell content that extends the cell to its left.
pub const MERGE_LEFT: &str = "<";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Text(String),
    Title(String),
    Field { key: String, value: String },
    TableRow(Vec<String>),
    Signature,
}

impl Line {
    fn classify(raw: &str) -> Option<Self> {
        let line = raw.trim();
        if line.is_empty() {
            return None;
        }
        if line.eq_ignore_ascii_case("[signature]") {
            return Some(Self::Signature);
        }
        if let Some(title) = line.strip_prefix('#') {
            let title = title.trim();
            if !title.is_empty() {
                return Some(Self::Title(title.to_owned()));
            }
        }
        if line.len() >= 2 && line.starts_with('|') && line.ends_with('|') {
            let inner = &line[1..line.len() - 1];
            let cells = inner.split('|').map(|c| c.trim().to_owned()).collect();
            return Some(Self::TableRow(cells));
        }
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            // `http://...` and similar are text, not fields.
            if !key.is_empty() && !value.starts_with("//") && key.split_whitespace().count() <= 4 {
                return Some(Self::Field {
                    key: key.to_owned(),
                    value: value.trim().to_owned(),
                });
            }
        }
        Some(Self::Text(line.to_owned()))
    }

    /// Text as it would appear in a LINE block.  Merge markers are omitted.
    pub fn display_text(&self) -> String {
        match self {
            Self::Text(text) | Self::Title(text) => text.clone(),
            Self::Field { key, value } if value.is_empty() => format!("{key}:"),
            Self::Field { key, value } => format!("{key}: {value}"),
            Self::TableRow(cells) => cells
                .iter()
                .filter(|c| c.as_str() != MERGE_LEFT && !c.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
            Self::Signature => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 1-based.
    pub number: u32,
    pub lines: Vec<Line>,
    pub unreadable: bool,
}

impl Page {
    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Field { key, value } => Some((key.as_str(), value.as_str())),
            _ => None,
        })
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    /// Runs of consecutive table rows, as (first line index, rows).
    pub fn tables(&self) -> Vec<(usize, Vec<&[String]>)> {
        let mut tables = Vec::new();
        let mut current: Option<(usize, Vec<&[String]>)> = None;
        for (index, line) in self.lines.iter().enumerate() {
            match line {
                Line::TableRow(cells) => {
                    if let Some((_, rows)) = current.as_mut() {
                        rows.push(cells.as_slice());
                    } else {
                        current = Some((index, vec![cells.as_slice()]));
                    }
                }
                _ => {
                    if let Some(table) = current.take() {
                        tables.push(table);
                    }
                }
            }
        }
        tables.extend(current);
        tables
    }

    pub fn has_signature(&self) -> bool {
        self.lines.iter().any(|l| matches!(l, Line::Signature))
    }

    /// All text on the page, lower-cased, for keyword matching.
    pub fn lowercase_text(&self) -> String {
        self.lines
            .iter()
            .map(Line::display_text)
            .collect::<Vec<_>>()
            .join("\n")
            .to_lowercase()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticDocument {
    pub pages: Vec<Page>,
}

impl SyntheticDocument {
    /// Parse document bytes.  Fails only on invalid UTF-8 or an empty
    /// document.
    pub fn parse(bytes: &[u8]) -> Result<Self, String> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| format!("document is not valid UTF-8 text: {e}"))?;
        if text.trim().is_empty() {
            return Err("document contains no text".into());
        }

        let pages = text
            .split(PAGE_BREAK)
            .enumerate()
            .map(|(i, raw)| Page {
                number: i as u32 + 1,
                unreadable: raw.contains(UNREADABLE_MARKER),
                lines: raw
                    .lines()
                    .filter(|l| !l.contains(UNREADABLE_MARKER))
                    .filter_map(Line::classify)
                    .collect(),
            })
            .collect();
        Ok(Self { pages })
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn readable_pages(&self) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(|p| !p.unreadable)
    }

    pub fn unreadable_pages(&self) -> Vec<u32> {
        self.pages
            .iter()
            .filter(|p| p.unreadable)
            .map(|p| p.number)
            .collect()
    }
}
