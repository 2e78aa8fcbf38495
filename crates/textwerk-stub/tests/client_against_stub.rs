// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The typed client driven against the in-process stub.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use textwerk_client::transport::{Transport, WireRequest, WireResponse};
use textwerk_client::{JobOutcome, TextwerkClient};
use textwerk_core::config::ClientConfig;
use textwerk_core::error::{Result, ServiceError, ServiceErrorKind, TextwerkError};
use textwerk_core::graph::BlockGraph;
use textwerk_core::model::{
    AnalyzeDocumentRequest, BlockType, CreateAdapterRequest, DetectDocumentTextRequest,
    Document, DocumentLocation, FeatureType, GetDocumentAnalysisRequest,
    GetDocumentTextDetectionRequest, GetLendingAnalysisRequest, GetLendingAnalysisSummaryRequest,
    ListAdaptersRequest, QueriesConfig, Query, RelationshipType, StartDocumentAnalysisRequest,
    StartDocumentTextDetectionRequest, StartLendingAnalysisRequest,
};
use textwerk_stub::{InProcessTransport, StubConfig, StubService};

const TWO_PAGES: &str = "# Invoice\nVendor: Acme Ltd\n| Item | Qty | Price |\n| Bolt | 4 | 1.00 |\n| Total | < | 4.00 |\n\x0cThanks for your business\nInvoice Total: 4.00\n";

fn setup(config: StubConfig) -> (TextwerkClient, Arc<InProcessTransport>) {
    let service = Arc::new(StubService::new(config));
    let transport = Arc::new(InProcessTransport::new(service));
    let client_config = ClientConfig {
        poll_interval_ms: 1,
        max_poll_attempts: Some(20),
        ..ClientConfig::with_endpoint("http://stub.invalid")
    };
    let client = TextwerkClient::with_transport(transport.clone(), client_config);
    (client, transport)
}

fn body_of(request: &WireRequest) -> Value {
    serde_json::from_slice(&request.body).expect("request body is JSON")
}

#[tokio::test]
async fn text_detection_has_no_table_members() {
    let (client, _) = setup(StubConfig::default());
    let response = client
        .detect_document_text(&DetectDocumentTextRequest::new(Document::from_bytes(
            TWO_PAGES.as_bytes().to_vec(),
        )))
        .await
        .expect("detect");

    assert_eq!(response.document_metadata.and_then(|m| m.pages), Some(2));
    let graph = BlockGraph::new(&response.blocks);
    assert_eq!(graph.pages().count(), 2);
    assert!(graph.integrity().is_clean());
    for block in &response.blocks {
        assert!(!block.has_table_fields(), "{:?} carries table members", block.block_type);
        assert!(block.shape_violations(true).is_empty());
    }
    assert_eq!(graph.of_type(BlockType::Table).count(), 0);
}

#[tokio::test]
async fn table_analysis_links_cells() {
    let (client, _) = setup(StubConfig::default());
    let response = client
        .analyze_document(&AnalyzeDocumentRequest::new(
            Document::from_bytes(TWO_PAGES.as_bytes().to_vec()),
            [FeatureType::Tables, FeatureType::Forms],
        ))
        .await
        .expect("analyze");

    let graph = BlockGraph::new(&response.blocks);
    assert!(graph.integrity().is_clean());

    let table = graph.of_type(BlockType::Table).next().expect("a table");
    let children: Vec<&str> = table.related_ids(&RelationshipType::Child).collect();
    assert_eq!(children.len(), 9);
    for id in children {
        let cell = graph.get(id).expect("child exists");
        assert!(cell.is(&BlockType::Cell));
        assert!(cell.row_index.is_some() && cell.column_index.is_some());
    }

    let grids = graph.tables();
    assert_eq!(grids[0].rows, 3);
    assert_eq!(grids[0].columns, 3);
    assert_eq!(grids[0].merged.len(), 1);

    let fields = graph.key_values();
    assert!(fields.iter().any(|kv| kv.key == "Vendor" && kv.value == "Acme Ltd"));
}

#[tokio::test]
async fn queries_are_answered_from_fields() {
    let (client, _) = setup(StubConfig::default());
    let mut request = AnalyzeDocumentRequest::new(
        Document::from_bytes(TWO_PAGES.as_bytes().to_vec()),
        [FeatureType::Queries],
    );
    request.queries_config = Some(QueriesConfig {
        queries: vec![Query::new("What is the invoice total?").with_alias("TOTAL")],
    });
    let response = client.analyze_document(&request).await.expect("analyze");

    // Asked once per page; only the second page holds the total.
    let answers = BlockGraph::new(&response.blocks).query_answers();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a.alias.as_deref() == Some("TOTAL")));
    assert_eq!(answers[0].answer, None);
    assert_eq!(answers[1].answer.as_deref(), Some("4.00"));
}

#[tokio::test]
async fn invalid_requests_never_reach_the_wire() {
    let (client, transport) = setup(StubConfig::default());

    let empty_job = client
        .get_document_analysis(&GetDocumentAnalysisRequest::default())
        .await;
    assert!(matches!(empty_job, Err(TextwerkError::Validation(e)) if e.field == "JobId"));

    let zero_page = client
        .list_adapters(&ListAdaptersRequest {
            max_results: Some(0),
            ..Default::default()
        })
        .await;
    assert!(matches!(zero_page, Err(TextwerkError::Validation(e)) if e.field == "MaxResults"));

    let queries_without_config = client
        .analyze_document(&AnalyzeDocumentRequest::new(
            Document::from_bytes(b"x".to_vec()),
            [FeatureType::Queries],
        ))
        .await;
    assert!(matches!(queries_without_config, Err(TextwerkError::Validation(_))));

    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn job_runs_to_completion() {
    let (client, transport) = setup(StubConfig {
        polls_before_complete: 3,
        ..StubConfig::default()
    });
    transport
        .service()
        .put_object("docs", "invoice.txt", TWO_PAGES);

    let started = client
        .start_document_text_detection(&StartDocumentTextDetectionRequest::new(
            DocumentLocation::s3("docs", "invoice.txt"),
        ))
        .await
        .expect("start");
    let job_id = started.job_id.expect("job id");

    let outcome = client
        .wait_for_job::<GetDocumentTextDetectionRequest>(&job_id)
        .await
        .expect("wait");
    assert!(!outcome.is_partial());
    let result = outcome.into_result();
    assert!(result.blocks.iter().all(|b| b.page.is_some()));

    // Start plus three IN_PROGRESS polls plus the final one.
    assert_eq!(transport.request_count(), 5);
}

#[tokio::test]
async fn idempotent_start_returns_same_job() {
    let (client, transport) = setup(StubConfig::default());
    transport.service().put_object("docs", "a.txt", "hello");

    let mut request = StartDocumentAnalysisRequest::new(
        DocumentLocation::s3("docs", "a.txt"),
        [FeatureType::Tables],
    );
    request.client_request_token = Some("retry-safe-1".into());

    let first = client.start_document_analysis(&request).await.expect("first");
    let second = client.start_document_analysis(&request).await.expect("second");
    assert!(first.job_id.is_some());
    assert_eq!(first.job_id, second.job_id);

    request.feature_types = vec![FeatureType::Forms];
    let conflict = client.start_document_analysis(&request).await;
    match conflict {
        Err(TextwerkError::Service(e)) => {
            assert_eq!(e.code, "IdempotentParameterMismatchException");
            assert_eq!(e.kind, ServiceErrorKind::Validation);
        }
        other => panic!("expected a service error, got {other:?}"),
    }
}

#[tokio::test]
async fn partial_success_and_failure_surface() {
    let (client, transport) = setup(StubConfig {
        polls_before_complete: 0,
        ..StubConfig::default()
    });
    let service = transport.service();
    service.put_object("docs", "partial.txt", "Borrower Name: Ada\x0c<<unreadable>>");
    service.put_object("docs", "blank.txt", "<<unreadable>>");

    let partial = client
        .start_lending_analysis(&StartLendingAnalysisRequest::new(DocumentLocation::s3(
            "docs",
            "partial.txt",
        )))
        .await
        .expect("start")
        .job_id
        .expect("job id");
    match client
        .wait_for_job::<GetLendingAnalysisRequest>(&partial)
        .await
        .expect("wait")
    {
        JobOutcome::PartialSuccess { warnings, .. } => {
            assert_eq!(warnings[0].pages, vec![2]);
        }
        other => panic!("expected partial success, got {other:?}"),
    }
    let summary = client
        .wait_for_job::<GetLendingAnalysisSummaryRequest>(&partial)
        .await
        .expect("summary");
    assert!(summary.result().summary.is_some());

    let failed = client
        .start_lending_analysis(&StartLendingAnalysisRequest::new(DocumentLocation::s3(
            "docs", "blank.txt",
        )))
        .await
        .expect("start")
        .job_id
        .expect("job id");
    let err = client
        .wait_for_job::<GetLendingAnalysisRequest>(&failed)
        .await
        .expect_err("job fails");
    assert!(matches!(err, TextwerkError::JobFailed { job_id, .. } if job_id == failed));
}

#[tokio::test]
async fn pagination_forwards_each_token_once() {
    let (client, transport) = setup(StubConfig::default());
    for name in ["alpha", "bravo", "charlie", "delta", "echo"] {
        client
            .create_adapter(&CreateAdapterRequest {
                adapter_name: name.into(),
                feature_types: vec![FeatureType::Queries],
                ..Default::default()
            })
            .await
            .expect("create");
    }
    let before = transport.request_count();

    let mut pages = client.paginate(ListAdaptersRequest {
        max_results: Some(2),
        ..Default::default()
    });
    let all = pages.collect_all().await.expect("pages");
    assert_eq!(all.len(), 3);
    assert_eq!(all.iter().map(|p| p.adapters.len()).sum::<usize>(), 5);

    let sent = &transport.requests()[before..];
    assert_eq!(sent.len(), 3);
    assert!(body_of(&sent[0]).get("NextToken").is_none());
    for (request, previous) in sent[1..].iter().zip(&all) {
        let expected = previous.next_token.as_deref().expect("token");
        assert_eq!(body_of(request)["NextToken"], expected);
        assert_eq!(body_of(request)["MaxResults"], 2);
    }
}

#[tokio::test]
async fn document_pages_cover_every_block() {
    let (client, transport) = setup(StubConfig {
        polls_before_complete: 0,
        ..StubConfig::default()
    });
    transport.service().put_object("docs", "invoice.txt", TWO_PAGES);
    let job_id = client
        .start_document_analysis(&StartDocumentAnalysisRequest::new(
            DocumentLocation::s3("docs", "invoice.txt"),
            [FeatureType::Tables],
        ))
        .await
        .expect("start")
        .job_id
        .expect("job id");

    let whole = client
        .wait_for_job::<GetDocumentAnalysisRequest>(&job_id)
        .await
        .expect("wait")
        .into_result();
    assert!(whole.next_token.is_none());

    let mut pages = client.paginate(GetDocumentAnalysisRequest {
        job_id,
        max_results: Some(4),
        next_token: None,
    });
    let mut blocks = Vec::new();
    while let Some(page) = pages.next_page().await.expect("page") {
        blocks.extend(page.blocks);
    }
    assert_eq!(blocks, whole.blocks);
    assert_eq!(pages.pages_fetched(), whole.blocks.len().div_ceil(4));
}

#[tokio::test]
async fn injected_throttle_maps_to_throttling() {
    let (client, transport) = setup(StubConfig::default());
    transport.inject_error(
        ServiceError::new("ProvisionedThroughputExceededException", "slow down", 400)
            .with_request_id("req-42"),
    );
    let err = client
        .list_adapters(&ListAdaptersRequest::default())
        .await
        .expect_err("throttled");
    match err {
        TextwerkError::Service(e) => {
            assert_eq!(e.kind, ServiceErrorKind::Throttling);
            assert_eq!(e.request_id.as_deref(), Some("req-42"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    // The next call goes through.
    assert!(client.list_adapters(&ListAdaptersRequest::default()).await.is_ok());
}

/// Answers every call with the same canned body.
struct Canned(&'static str);

#[async_trait]
impl Transport for Canned {
    async fn send(&self, _request: WireRequest) -> Result<WireResponse> {
        Ok(WireResponse::new(200, self.0.as_bytes().to_vec()))
    }
}

#[tokio::test]
async fn unknown_block_type_is_preserved() {
    let client = TextwerkClient::with_transport(
        Arc::new(Canned(
            r#"{"Blocks":[{"BlockType":"HOLOGRAM","Id":"b1","Confidence":88.5}],"DocumentMetadata":{"Pages":1}}"#,
        )),
        ClientConfig::default(),
    );
    let response = client
        .detect_document_text(&DetectDocumentTextRequest::new(Document::from_bytes(
            b"x".to_vec(),
        )))
        .await
        .expect("decode");
    assert_eq!(
        response.blocks[0].block_type,
        Some(BlockType::Unknown("HOLOGRAM".into()))
    );
    assert_eq!(response.blocks[0].id(), Some("b1"));
}
