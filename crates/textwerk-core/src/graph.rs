// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Block forest navigation.
//
// A response's blocks reference each other by id.  The references come from
// the network and are treated as untrusted: an id may be repeated, a
// relationship may point at a block that is not in the response, and a
// chain of relationships may loop.  Table cells may carry zero, huge or
// overflowing indices and spans.  None of these panic, recurse forever or
// size an allocation here; `integrity()` reports what was found.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::model::{Block, BlockType, EntityType, RelationshipType};

/// Id index over one response's blocks.
#[derive(Debug)]
pub struct BlockGraph<'a> {
    blocks: &'a [Block],
    index: HashMap<&'a str, usize>,
    duplicate_ids: Vec<String>,
}

/// A relationship whose target id is not present in the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub from: String,
    pub to: String,
}

/// Structural problems found in a block forest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Ids used by more than one block; lookups resolve to the first.
    pub duplicate_ids: Vec<String>,
    pub dangling: Vec<DanglingReference>,
    /// Relationship edges `(from, to)` that close a cycle.
    pub cycles: Vec<(String, String)>,
    /// Table cells left off their grid: a missing or zero index or span, an
    /// extent that overflows, or one reaching past the table's cell count.
    pub malformed_cells: Vec<String>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.duplicate_ids.is_empty()
            && self.dangling.is_empty()
            && self.cycles.is_empty()
            && self.malformed_cells.is_empty()
    }
}

/// One table with its cells placed on a grid.
#[derive(Debug, Clone)]
pub struct TableGrid<'a> {
    pub table: &'a Block,
    pub rows: u32,
    pub columns: u32,
    pub cells: Vec<TableCell<'a>>,
    /// MERGED_CELL regions; their text joins the cells they cover.
    pub merged: Vec<TableCell<'a>>,
    /// CELL and MERGED_CELL children that could not be placed.
    pub rejected: Vec<&'a Block>,
    /// CELL children of the table.  Bounds both grid axes and the grid area.
    capacity: usize,
}

#[derive(Debug, Clone)]
pub struct TableCell<'a> {
    pub block: &'a Block,
    /// 1-based.
    pub row: u32,
    pub column: u32,
    pub row_span: u32,
    pub column_span: u32,
    pub text: String,
}

impl TableCell<'_> {
    pub fn covers(&self, row: u32, column: u32) -> bool {
        row >= self.row
            && row - self.row < self.row_span
            && column >= self.column
            && column - self.column < self.column_span
    }
}

impl<'a> TableGrid<'a> {
    /// The cell covering `(row, column)`, preferring a merged region.
    pub fn cell(&self, row: u32, column: u32) -> Option<&TableCell<'a>> {
        self.merged
            .iter()
            .chain(self.cells.iter())
            .find(|c| c.covers(row, column))
    }

    /// Whether every grid position could hold one of the table's cells.
    pub fn is_consistent(&self) -> bool {
        (self.rows as usize).saturating_mul(self.columns as usize) <= self.capacity
    }

    /// Cell text laid out row by row; spanned positions repeat nothing.
    /// Empty for an inconsistent grid.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        if !self.is_consistent() {
            return Vec::new();
        }
        let mut rows = vec![vec![String::new(); self.columns as usize]; self.rows as usize];
        for cell in &self.cells {
            let r = cell.row.saturating_sub(1) as usize;
            let c = cell.column.saturating_sub(1) as usize;
            if let Some(slot) = rows.get_mut(r).and_then(|row| row.get_mut(c)) {
                *slot = cell.text.clone();
            }
        }
        rows
    }
}

/// A form field: KEY text and the text of its VALUE.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
    pub page: Option<u32>,
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryAnswer {
    pub text: String,
    pub alias: Option<String>,
    /// `None` when the document held no answer.
    pub answer: Option<String>,
    pub confidence: Option<f32>,
    pub page: Option<u32>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

impl<'a> BlockGraph<'a> {
    pub fn new(blocks: &'a [Block]) -> Self {
        let mut index = HashMap::with_capacity(blocks.len());
        let mut duplicate_ids = Vec::new();
        for (pos, block) in blocks.iter().enumerate() {
            if let Some(id) = block.id() {
                if index.contains_key(id) {
                    duplicate_ids.push(id.to_owned());
                } else {
                    index.insert(id, pos);
                }
            }
        }
        debug!(
            blocks = blocks.len(),
            duplicates = duplicate_ids.len(),
            "indexed block graph"
        );
        Self {
            blocks,
            index,
            duplicate_ids,
        }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &'a [Block] {
        self.blocks
    }

    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.index.get(id).map(|&pos| &self.blocks[pos])
    }

    /// PAGE blocks, the roots of the forest, in response order.
    pub fn pages(&self) -> impl Iterator<Item = &'a Block> + '_ {
        self.of_type(BlockType::Page)
    }

    pub fn of_type(&self, block_type: BlockType) -> impl Iterator<Item = &'a Block> + '_ {
        self.blocks.iter().filter(move |b| b.is(&block_type))
    }

    /// Blocks linked from `block` by `kind`, skipping ids that do not resolve.
    pub fn children(&self, block: &Block, kind: &RelationshipType) -> Vec<&'a Block> {
        block
            .related_ids(kind)
            .filter_map(|id| self.get(id))
            .collect()
    }

    /// Everything reachable from `root` through CHILD edges, depth first, each
    /// block at most once.  `root` itself is not included.
    pub fn descendants(&self, root: &Block) -> Vec<&'a Block> {
        let mut seen: HashSet<usize> = HashSet::new();
        if let Some(&pos) = root.id().and_then(|id| self.index.get(id)) {
            seen.insert(pos);
        }

        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.child_positions(root).into_iter().rev().collect();
        while let Some(pos) = stack.pop() {
            if !seen.insert(pos) {
                continue;
            }
            let block = &self.blocks[pos];
            out.push(block);
            stack.extend(self.child_positions(block).into_iter().rev());
        }
        out
    }

    /// The block's own text, or its WORD descendants joined by spaces.
    pub fn text_of(&self, block: &Block) -> String {
        if let Some(text) = &block.text {
            return text.clone();
        }
        self.descendants(block)
            .into_iter()
            .filter(|b| b.is(&BlockType::Word))
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn tables(&self) -> Vec<TableGrid<'a>> {
        self.of_type(BlockType::Table)
            .map(|table| self.table_grid(table))
            .collect()
    }

    fn table_grid(&self, table: &'a Block) -> TableGrid<'a> {
        let candidates: Vec<&'a Block> = self
            .children(table, &RelationshipType::Child)
            .into_iter()
            .filter(|b| b.is(&BlockType::Cell))
            .collect();
        let capacity = candidates.len();
        let limit = u32::try_from(capacity).unwrap_or(u32::MAX);

        let mut rejected = Vec::new();
        let mut cells = Vec::new();
        for block in candidates {
            match self.table_cell(block, None, limit) {
                Some(cell) => cells.push(cell),
                None => rejected.push(block),
            }
        }
        let mut merged = Vec::new();
        for block in self
            .children(table, &RelationshipType::MergedCell)
            .into_iter()
            .filter(|b| b.is(&BlockType::MergedCell))
        {
            let text = self
                .children(block, &RelationshipType::Child)
                .into_iter()
                .map(|cell| self.text_of(cell))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            match self.table_cell(block, Some(text), limit) {
                Some(cell) => merged.push(cell),
                None => rejected.push(block),
            }
        }
        if !rejected.is_empty() {
            warn!(
                table = table.id().unwrap_or_default(),
                rejected = rejected.len(),
                "table cells with unusable indices or spans"
            );
        }

        // Extents of placed cells are within `limit`, so these cannot overflow.
        let rows = cells
            .iter()
            .chain(merged.iter())
            .map(|c| c.row + (c.row_span - 1))
            .max()
            .unwrap_or(0);
        let columns = cells
            .iter()
            .chain(merged.iter())
            .map(|c| c.column + (c.column_span - 1))
            .max()
            .unwrap_or(0);
        TableGrid {
            table,
            rows,
            columns,
            cells,
            merged,
            rejected,
            capacity,
        }
    }

    /// Place `block` if its index and span are present, non-zero, and its
    /// last row and column do not pass `limit`.
    fn table_cell(&self, block: &'a Block, text: Option<String>, limit: u32) -> Option<TableCell<'a>> {
        let row = block.row_index.filter(|&r| r > 0)?;
        let column = block.column_index.filter(|&c| c > 0)?;
        let row_span = block.row_span.unwrap_or(1);
        let column_span = block.column_span.unwrap_or(1);
        let last_row = row.checked_add(row_span.checked_sub(1)?)?;
        let last_column = column.checked_add(column_span.checked_sub(1)?)?;
        if last_row > limit || last_column > limit {
            return None;
        }
        Some(TableCell {
            block,
            row,
            column,
            row_span,
            column_span,
            text: text.unwrap_or_else(|| self.text_of(block)),
        })
    }

    pub fn key_values(&self) -> Vec<KeyValue> {
        self.of_type(BlockType::KeyValueSet)
            .filter(|b| b.has_entity_type(&EntityType::Key))
            .map(|key| {
                let value = self
                    .children(key, &RelationshipType::Value)
                    .into_iter()
                    .map(|v| self.text_of(v))
                    .collect::<Vec<_>>()
                    .join(" ");
                KeyValue {
                    key: self.text_of(key),
                    value,
                    page: key.page,
                    confidence: key.confidence,
                }
            })
            .collect()
    }

    pub fn query_answers(&self) -> Vec<QueryAnswer> {
        self.of_type(BlockType::Query)
            .map(|query| {
                let answer = self
                    .children(query, &RelationshipType::Answer)
                    .into_iter()
                    .find(|b| b.is(&BlockType::QueryResult));
                let asked = query.query.as_ref();
                QueryAnswer {
                    text: asked.map(|q| q.text.clone()).unwrap_or_default(),
                    alias: asked.and_then(|q| q.alias.clone()),
                    answer: answer.and_then(|a| a.text.clone()),
                    confidence: answer.and_then(|a| a.confidence),
                    page: query.page,
                }
            })
            .collect()
    }

    pub fn integrity(&self) -> IntegrityReport {
        let mut dangling = Vec::new();
        for block in self.blocks {
            for relationship in &block.relationships {
                for id in &relationship.ids {
                    if !self.index.contains_key(id.as_str()) {
                        dangling.push(DanglingReference {
                            from: block.id().unwrap_or_default().to_owned(),
                            to: id.clone(),
                        });
                    }
                }
            }
        }

        let cycles = self
            .back_edges()
            .into_iter()
            .map(|(from, to)| {
                (
                    self.blocks[from].id().unwrap_or_default().to_owned(),
                    self.blocks[to].id().unwrap_or_default().to_owned(),
                )
            })
            .collect();

        let malformed_cells = self
            .tables()
            .iter()
            .flat_map(|grid| grid.rejected.iter())
            .map(|b| b.id().unwrap_or_default().to_owned())
            .collect();

        let report = IntegrityReport {
            duplicate_ids: self.duplicate_ids.clone(),
            dangling,
            cycles,
            malformed_cells,
        };
        if !report.is_clean() {
            warn!(
                duplicates = report.duplicate_ids.len(),
                dangling = report.dangling.len(),
                cycles = report.cycles.len(),
                malformed_cells = report.malformed_cells.len(),
                "block relationships are inconsistent"
            );
        }
        report
    }

    fn child_positions(&self, block: &Block) -> Vec<usize> {
        block
            .related_ids(&RelationshipType::Child)
            .filter_map(|id| self.index.get(id).copied())
            .collect()
    }

    fn edge_positions(&self, block: &Block) -> Vec<usize> {
        block
            .relationships
            .iter()
            .flat_map(|r| r.ids.iter())
            .filter_map(|id| self.index.get(id.as_str()).copied())
            .collect()
    }

    /// Iterative three-colour DFS over every relationship type.
    fn back_edges(&self) -> Vec<(usize, usize)> {
        let adjacency: Vec<Vec<usize>> = self.blocks.iter().map(|b| self.edge_positions(b)).collect();
        let mut marks = vec![Mark::Unvisited; self.blocks.len()];
        let mut found = Vec::new();

        for start in 0..self.blocks.len() {
            if marks[start] != Mark::Unvisited {
                continue;
            }
            marks[start] = Mark::OnStack;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                match adjacency[node].get(cursor) {
                    Some(&next) => {
                        frame.1 += 1;
                        match marks[next] {
                            Mark::Unvisited => {
                                marks[next] = Mark::OnStack;
                                stack.push((next, 0));
                            }
                            Mark::OnStack => found.push((node, next)),
                            Mark::Done => {}
                        }
                    }
                    None => {
                        marks[node] = Mark::Done;
                        stack.pop();
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Query, Relationship};

    fn block(kind: BlockType, id: &str) -> Block {
        Block {
            block_type: Some(kind),
            id: Some(id.into()),
            ..Block::default()
        }
    }

    fn word(id: &str, text: &str) -> Block {
        Block {
            text: Some(text.into()),
            ..block(BlockType::Word, id)
        }
    }

    fn with_children(mut b: Block, kind: RelationshipType, ids: &[&str]) -> Block {
        b.relationships.push(Relationship::new(
            kind,
            ids.iter().map(|s| s.to_string()).collect(),
        ));
        b
    }

    fn cell(id: &str, row: u32, col: u32, words: &[&str]) -> Block {
        let mut b = with_children(block(BlockType::Cell, id), RelationshipType::Child, words);
        b.row_index = Some(row);
        b.column_index = Some(col);
        b
    }

    #[test]
    fn descendants_are_depth_first_and_skip_dangling_ids() {
        let blocks = vec![
            with_children(block(BlockType::Page, "p"), RelationshipType::Child, &["l1", "ghost", "l2"]),
            with_children(block(BlockType::Line, "l1"), RelationshipType::Child, &["w1", "w2"]),
            with_children(block(BlockType::Line, "l2"), RelationshipType::Child, &["w3"]),
            word("w1", "hello"),
            word("w2", "there"),
            word("w3", "world"),
        ];
        let graph = BlockGraph::new(&blocks);
        let ids: Vec<_> = graph
            .descendants(&blocks[0])
            .iter()
            .filter_map(|b| b.id())
            .collect();
        assert_eq!(ids, vec!["l1", "w1", "w2", "l2", "w3"]);
        assert_eq!(graph.text_of(&blocks[0]), "hello there world");

        let report = graph.integrity();
        assert_eq!(
            report.dangling,
            vec![DanglingReference {
                from: "p".into(),
                to: "ghost".into()
            }]
        );
    }

    #[test]
    fn cycles_terminate_and_are_reported() {
        let blocks = vec![
            with_children(block(BlockType::Line, "a"), RelationshipType::Child, &["b"]),
            with_children(block(BlockType::Line, "b"), RelationshipType::Child, &["a"]),
            with_children(block(BlockType::Line, "c"), RelationshipType::Child, &["c"]),
        ];
        let graph = BlockGraph::new(&blocks);
        let ids: Vec<_> = graph.descendants(&blocks[0]).iter().filter_map(|b| b.id()).collect();
        assert_eq!(ids, vec!["b"]);
        assert!(graph.descendants(&blocks[2]).is_empty());

        let report = graph.integrity();
        assert_eq!(report.cycles.len(), 2);
        assert!(report.cycles.contains(&("b".into(), "a".into())));
        assert!(report.cycles.contains(&("c".into(), "c".into())));
    }

    #[test]
    fn duplicate_ids_resolve_to_first_block() {
        let blocks = vec![word("w", "first"), word("w", "second")];
        let graph = BlockGraph::new(&blocks);
        assert_eq!(graph.get("w").and_then(|b| b.text.as_deref()), Some("first"));
        assert_eq!(graph.integrity().duplicate_ids, vec!["w".to_string()]);
    }

    #[test]
    fn table_grid_places_cells_and_merged_regions() {
        let mut merged = with_children(block(BlockType::MergedCell, "m"), RelationshipType::Child, &["c11", "c12"]);
        merged.row_index = Some(1);
        merged.column_index = Some(1);
        merged.column_span = Some(2);

        let table = with_children(
            with_children(block(BlockType::Table, "t"), RelationshipType::Child, &["c11", "c12", "c21", "c22"]),
            RelationshipType::MergedCell,
            &["m"],
        );
        let blocks = vec![
            table,
            cell("c11", 1, 1, &["w1"]),
            cell("c12", 1, 2, &["w2"]),
            cell("c21", 2, 1, &["w3"]),
            cell("c22", 2, 2, &[]),
            merged,
            word("w1", "Item"),
            word("w2", "Cost"),
            word("w3", "Tea"),
        ];
        let graph = BlockGraph::new(&blocks);
        let tables = graph.tables();
        assert_eq!(tables.len(), 1);
        let grid = &tables[0];
        assert_eq!((grid.rows, grid.columns), (2, 2));
        assert_eq!(
            grid.to_rows(),
            vec![vec!["Item".to_string(), "Cost".to_string()], vec!["Tea".to_string(), String::new()]]
        );
        assert_eq!(grid.cell(1, 2).map(|c| c.text.as_str()), Some("Item Cost"));
        assert_eq!(grid.cell(2, 1).map(|c| c.text.as_str()), Some("Tea"));
        assert!(grid.cell(3, 1).is_none());
    }

    #[test]
    fn unusable_cell_indices_are_reported_without_panicking() {
        let mut overflowing = cell("huge", u32::MAX, 1, &["w2"]);
        overflowing.row_span = Some(2);
        let mut far = cell("far", 1, 4_000_000_000, &[]);
        far.column_span = Some(1);
        let mut zero_span = cell("flat", 1, 1, &[]);
        zero_span.column_span = Some(0);

        let table = with_children(
            block(BlockType::Table, "t"),
            RelationshipType::Child,
            &["c11", "huge", "far", "flat"],
        );
        let blocks = vec![
            table,
            cell("c11", 1, 1, &["w1"]),
            overflowing,
            far,
            zero_span,
            word("w1", "Total"),
            word("w2", "9.99"),
        ];
        let graph = BlockGraph::new(&blocks);
        let tables = graph.tables();
        let grid = &tables[0];
        assert_eq!((grid.rows, grid.columns), (1, 1));
        assert_eq!(grid.cells.len(), 1);
        assert_eq!(grid.to_rows(), vec![vec!["Total".to_string()]]);
        assert!(grid.cell(u32::MAX, 1).is_none());

        let report = graph.integrity();
        assert!(!report.is_clean());
        assert_eq!(report.malformed_cells, vec!["huge", "far", "flat"]);
    }

    #[test]
    fn grid_larger_than_its_cells_is_not_materialised() {
        let table = with_children(
            block(BlockType::Table, "t"),
            RelationshipType::Child,
            &["a", "b"],
        );
        let blocks = vec![table, cell("a", 1, 1, &[]), cell("b", 2, 2, &[])];
        let graph = BlockGraph::new(&blocks);
        let tables = graph.tables();
        let grid = &tables[0];
        assert_eq!((grid.rows, grid.columns), (2, 2));
        assert!(!grid.is_consistent());
        assert!(grid.to_rows().is_empty());
        assert!(graph.integrity().malformed_cells.is_empty());
    }

    #[test]
    fn key_values_join_value_words() {
        let mut key = with_children(
            with_children(block(BlockType::KeyValueSet, "k"), RelationshipType::Child, &["wk"]),
            RelationshipType::Value,
            &["v"],
        );
        key.entity_types = vec![EntityType::Key];
        key.page = Some(1);
        let mut value = with_children(block(BlockType::KeyValueSet, "v"), RelationshipType::Child, &["wv1", "wv2"]);
        value.entity_types = vec![EntityType::Value];

        let blocks = vec![
            key,
            value,
            word("wk", "Name:"),
            word("wv1", "Ada"),
            word("wv2", "Lovelace"),
        ];
        let graph = BlockGraph::new(&blocks);
        let pairs = graph.key_values();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].key, "Name:");
        assert_eq!(pairs[0].value, "Ada Lovelace");
        assert_eq!(pairs[0].page, Some(1));
    }

    #[test]
    fn query_answers_follow_answer_edges() {
        let mut asked = with_children(block(BlockType::Query, "q"), RelationshipType::Answer, &["r"]);
        asked.query = Some(Query::new("What is the total?").with_alias("TOTAL"));
        let mut unanswered = block(BlockType::Query, "q2");
        unanswered.query = Some(Query::new("Who approved?"));
        let mut result = block(BlockType::QueryResult, "r");
        result.text = Some("$12.50".into());
        result.confidence = Some(88.0);

        let blocks = vec![asked, unanswered, result];
        let graph = BlockGraph::new(&blocks);
        let answers = graph.query_answers();
        assert_eq!(answers[0].alias.as_deref(), Some("TOTAL"));
        assert_eq!(answers[0].answer.as_deref(), Some("$12.50"));
        assert_eq!(answers[1].answer, None);
    }
}
