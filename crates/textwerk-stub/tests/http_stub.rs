// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The HTTPS transport pointed at the stub over loopback HTTP.

use std::sync::Arc;

use textwerk_client::TextwerkClient;
use textwerk_client::transport::{HttpTransport, REQUEST_ID_HEADER, Transport, WireRequest};
use textwerk_core::config::ClientConfig;
use textwerk_core::error::{ServiceErrorKind, TextwerkError};
use textwerk_core::model::{
    AnalyzeExpenseRequest, AnalyzeIdRequest, CreateAdapterRequest, CreateAdapterVersionRequest,
    DatasetConfig, DetectDocumentTextRequest, Document, DocumentLocation, FeatureType,
    GetAdapterRequest, GetAdapterVersionRequest, GetDocumentTextDetectionRequest,
    ListAdapterVersionsRequest, ListTagsForResourceRequest, OutputConfig, S3Object,
    StartDocumentTextDetectionRequest, TagResourceRequest, UpdateAdapterRequest,
};
use textwerk_stub::{StubConfig, StubServer, StubService};

async fn start(config: StubConfig) -> (StubServer, Arc<StubService>, TextwerkClient) {
    let service = Arc::new(StubService::new(config));
    let server = StubServer::bind(Arc::clone(&service), ([127, 0, 0, 1], 0).into())
        .await
        .expect("bind");
    let client = TextwerkClient::new(ClientConfig {
        poll_interval_ms: 5,
        max_poll_attempts: Some(10),
        ..ClientConfig::with_endpoint(server.endpoint())
    })
    .expect("client");
    (server, service, client)
}

#[tokio::test]
async fn detect_text_over_http() {
    let (server, _, client) = start(StubConfig::default()).await;

    let response = client
        .detect_document_text(&DetectDocumentTextRequest::new(Document::from_bytes(
            b"first page\x0csecond page".to_vec(),
        )))
        .await
        .expect("detect");
    assert_eq!(response.document_metadata.and_then(|m| m.pages), Some(2));
    assert_eq!(response.detect_document_text_model_version.as_deref(), Some("1.0"));
    let words: Vec<_> = response
        .blocks
        .iter()
        .filter_map(|b| b.text.as_deref())
        .collect();
    assert!(words.contains(&"second"));

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn service_errors_keep_code_and_request_id() {
    let (server, _, client) = start(StubConfig::default()).await;

    let err = client
        .detect_document_text(&DetectDocumentTextRequest::new(Document::from_s3(
            "docs",
            "missing.pdf",
        )))
        .await
        .expect_err("object is missing");
    match err {
        TextwerkError::Service(e) => {
            assert_eq!(e.code, "InvalidS3ObjectException");
            assert_eq!(e.kind, ServiceErrorKind::Validation);
            assert_eq!(e.status, 400);
            assert!(e.request_id.is_some_and(|id| id.starts_with("stub-")));
        }
        other => panic!("unexpected error {other:?}"),
    }

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn raw_transport_sees_headers() {
    let (server, _, _) = start(StubConfig::default()).await;
    let transport =
        HttpTransport::new(&ClientConfig::with_endpoint(server.endpoint())).expect("transport");

    let ok = transport
        .send(WireRequest::new("ListAdapters", b"{}".to_vec()))
        .await
        .expect("send");
    assert_eq!(ok.status, 200);
    assert!(ok.header(REQUEST_ID_HEADER).is_some());

    let unknown = transport
        .send(WireRequest::new("PrintDocument", b"{}".to_vec()))
        .await
        .expect("send");
    assert_eq!(unknown.status, 400);
    assert_eq!(unknown.header("x-amzn-errortype"), Some("UnknownOperationException"));

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn async_job_over_http() {
    let (server, service, client) = start(StubConfig {
        polls_before_complete: 2,
        ..StubConfig::default()
    })
    .await;
    service.put_object("docs", "letter.txt", "Dear reader\nKind regards");

    let job_id = client
        .start_document_text_detection(&StartDocumentTextDetectionRequest::new(
            DocumentLocation::s3("docs", "letter.txt"),
        ))
        .await
        .expect("start")
        .job_id
        .expect("job id");
    let outcome = client
        .wait_for_job::<GetDocumentTextDetectionRequest>(&job_id)
        .await
        .expect("wait");
    assert!(!outcome.result().blocks.is_empty());

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn poll_limit_is_reported() {
    let (server, service, client) = start(StubConfig {
        polls_before_complete: 50,
        ..StubConfig::default()
    })
    .await;
    service.put_object("docs", "slow.txt", "text");

    let job_id = client
        .start_document_text_detection(&StartDocumentTextDetectionRequest::new(
            DocumentLocation::s3("docs", "slow.txt"),
        ))
        .await
        .expect("start")
        .job_id
        .expect("job id");
    let err = client
        .wait_for_job::<GetDocumentTextDetectionRequest>(&job_id)
        .await
        .expect_err("never finishes in time");
    assert!(matches!(err, TextwerkError::PollLimitExceeded { attempts: 10, .. }));

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn expense_and_identity_over_http() {
    let (server, _, client) = start(StubConfig::default()).await;

    let expense = client
        .analyze_expense(&AnalyzeExpenseRequest::new(Document::from_bytes(
            b"Vendor: Acme Ltd\nTotal: $12.50\n| Bolt | 2 | $6.25 |\n".to_vec(),
        )))
        .await
        .expect("expense");
    assert_eq!(expense.expense_documents.len(), 1);
    assert_eq!(
        expense.expense_documents[0].summary_value("TOTAL"),
        Some("$12.50")
    );

    let identity = client
        .analyze_id(&AnalyzeIdRequest::new(vec![Document::from_bytes(
            b"First Name: Ada\nLast Name: Lovelace\nDate of Birth: 1815-12-10\n".to_vec(),
        )]))
        .await
        .expect("identity");
    assert_eq!(identity.identity_documents.len(), 1);
    assert_eq!(identity.identity_documents[0].field("FIRST_NAME"), Some("Ada"));

    server.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn adapter_management_over_http() {
    let (server, service, client) = start(StubConfig::default()).await;
    service.put_object("training", "manifest.jsonl", "{}\n");

    let adapter_id = client
        .create_adapter(&CreateAdapterRequest {
            adapter_name: "receipts".into(),
            feature_types: vec![FeatureType::Queries],
            ..Default::default()
        })
        .await
        .expect("create")
        .adapter_id
        .expect("adapter id");

    let version = client
        .create_adapter_version(&CreateAdapterVersionRequest {
            adapter_id: adapter_id.clone(),
            dataset_config: DatasetConfig {
                manifest_s3_object: Some(S3Object::new("training", "manifest.jsonl")),
            },
            output_config: OutputConfig {
                s3_bucket: "training-output".into(),
                s3_prefix: Some("runs/".into()),
            },
            ..Default::default()
        })
        .await
        .expect("version")
        .adapter_version
        .expect("version id");

    let fetched = client
        .get_adapter_version(&GetAdapterVersionRequest {
            adapter_id: adapter_id.clone(),
            adapter_version: version.clone(),
        })
        .await
        .expect("get version");
    assert!(fetched.creation_time.is_some());
    assert_eq!(
        fetched.output_config.and_then(|o| o.s3_prefix).as_deref(),
        Some("runs/")
    );

    let listed = client
        .list_adapter_versions(&ListAdapterVersionsRequest {
            adapter_id: Some(adapter_id.clone()),
            ..Default::default()
        })
        .await
        .expect("list versions");
    assert_eq!(listed.adapter_versions.len(), 1);

    client
        .update_adapter(&UpdateAdapterRequest {
            adapter_id: adapter_id.clone(),
            description: Some("Receipt totals".into()),
            ..Default::default()
        })
        .await
        .expect("update");

    let arn = service.adapter_arn(&adapter_id);
    client
        .tag_resource(&TagResourceRequest {
            resource_arn: arn.clone(),
            tags: [("stage".to_owned(), "beta".to_owned())].into_iter().collect(),
        })
        .await
        .expect("tag");
    let tags = client
        .list_tags_for_resource(&ListTagsForResourceRequest { resource_arn: arn })
        .await
        .expect("tags");
    assert_eq!(tags.tags.get("stage").map(String::as_str), Some("beta"));

    let adapter = client
        .get_adapter(&GetAdapterRequest { adapter_id })
        .await
        .expect("get adapter");
    assert_eq!(adapter.description.as_deref(), Some("Receipt totals"));
    assert_eq!(adapter.tags.len(), 1);

    server.shutdown().await.expect("shutdown");
}
