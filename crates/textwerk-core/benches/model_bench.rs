// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for response decoding, Block graph traversal, and
// request validation in the textwerk-core crate.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use textwerk_core::BlockGraph;
use textwerk_core::model::{
    Block, BlockType, GetDocumentAnalysisRequest, GetDocumentAnalysisResponse, JobStatus,
    Relationship, RelationshipType,
};
use textwerk_core::validate::{self, Validate};

// ---------------------------------------------------------------------------
// Helper: a page of `lines` lines with `words` words each, plus one table
// ---------------------------------------------------------------------------

fn synthetic_blocks(lines: usize, words: usize) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut page_children = Vec::new();

    for l in 0..lines {
        let line_id = format!("line-{l}");
        let mut word_ids = Vec::new();
        for w in 0..words {
            let word_id = format!("word-{l}-{w}");
            blocks.push(Block {
                block_type: Some(BlockType::Word),
                id: Some(word_id.clone()),
                text: Some(format!("w{w}")),
                confidence: Some(99.0),
                ..Block::default()
            });
            word_ids.push(word_id);
        }
        blocks.push(Block {
            block_type: Some(BlockType::Line),
            id: Some(line_id.clone()),
            relationships: vec![Relationship::new(RelationshipType::Child, word_ids)],
            ..Block::default()
        });
        page_children.push(line_id);
    }

    let mut cell_ids = Vec::new();
    for row in 1..=10u32 {
        for col in 1..=4u32 {
            let id = format!("cell-{row}-{col}");
            blocks.push(Block {
                block_type: Some(BlockType::Cell),
                id: Some(id.clone()),
                row_index: Some(row),
                column_index: Some(col),
                relationships: vec![Relationship::new(
                    RelationshipType::Child,
                    vec![format!("word-{}-0", row as usize % lines.max(1))],
                )],
                ..Block::default()
            });
            cell_ids.push(id);
        }
    }
    blocks.push(Block {
        block_type: Some(BlockType::Table),
        id: Some("table".into()),
        relationships: vec![Relationship::new(RelationshipType::Child, cell_ids)],
        ..Block::default()
    });
    page_children.push("table".into());

    blocks.insert(
        0,
        Block {
            block_type: Some(BlockType::Page),
            id: Some("page-1".into()),
            relationships: vec![Relationship::new(RelationshipType::Child, page_children)],
            ..Block::default()
        },
    );
    blocks
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_decode_response(c: &mut Criterion) {
    let response = GetDocumentAnalysisResponse {
        job_status: Some(JobStatus::Succeeded),
        blocks: synthetic_blocks(200, 10),
        ..Default::default()
    };
    let json = serde_json::to_vec(&response).expect("encode");

    c.bench_function("decode GetDocumentAnalysis (2.2k blocks)", |b| {
        b.iter(|| {
            let decoded: GetDocumentAnalysisResponse =
                serde_json::from_slice(black_box(&json)).expect("decode");
            assert_eq!(decoded.blocks.len(), response.blocks.len());
        });
    });
}

fn bench_graph_traversal(c: &mut Criterion) {
    let blocks = synthetic_blocks(200, 10);

    c.bench_function("BlockGraph page text", |b| {
        b.iter(|| {
            let graph = BlockGraph::new(black_box(&blocks));
            let page = graph.pages().next().expect("page");
            black_box(graph.text_of(page));
        });
    });

    c.bench_function("BlockGraph tables + integrity", |b| {
        b.iter(|| {
            let graph = BlockGraph::new(black_box(&blocks));
            let tables = graph.tables();
            assert_eq!(tables[0].rows, 10);
            assert!(graph.integrity().is_clean());
        });
    });
}

fn bench_validation(c: &mut Criterion) {
    let pages: Vec<String> = (1..=50).map(|n| format!("{n}-*")).collect();
    let request = GetDocumentAnalysisRequest {
        job_id: "a".repeat(64),
        max_results: Some(1000),
        next_token: Some("t".repeat(255)),
    };

    c.bench_function("validate 50 page selectors", |b| {
        b.iter(|| validate::pages("Pages", black_box(&pages)).expect("valid"));
    });

    c.bench_function("validate GetDocumentAnalysis", |b| {
        b.iter(|| black_box(&request).validate().expect("valid"));
    });
}

criterion_group!(
    benches,
    bench_decode_response,
    bench_graph_traversal,
    bench_validation
);
criterion_main!(benches);
