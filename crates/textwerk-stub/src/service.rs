// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory implementation of the document analysis service.
//
// `StubService::handle` takes an operation name and a JSON request body and
// returns the wire response the real service would send: a JSON body with a
// request id on success, or an encoded service error.  Documents are the
// synthetic text format parsed by `document`; S3 objects live in an
// in-memory store filled with `put_object`.
//
// Asynchronous jobs report IN_PROGRESS for a configurable number of polls
// before their result becomes visible.  Results are recomputed from the
// stored document on every Get call, which keeps paging deterministic.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use textwerk_client::codec;
use textwerk_client::transport::{REQUEST_ID_HEADER, WireResponse};
use textwerk_core::error::{QuotaDetails, ServiceError};
use textwerk_core::model::wire::epoch_seconds;
use textwerk_core::model::{
    AdapterOverview, AdapterVersionEvaluationMetric, AdapterVersionOverview, AdapterVersionStatus,
    AdaptersConfig, AnalyzeDocumentRequest, AnalyzeDocumentResponse, AnalyzeExpenseRequest,
    AnalyzeExpenseResponse, AnalyzeIdRequest, AnalyzeIdResponse, AutoUpdate, CreateAdapterRequest,
    CreateAdapterResponse, CreateAdapterVersionRequest, CreateAdapterVersionResponse,
    DatasetConfig, DeleteAdapterRequest, DeleteAdapterVersionRequest, DetectDocumentTextRequest,
    DetectDocumentTextResponse, Document, DocumentLocation, DocumentMetadata, EmptyResponse,
    EvaluationMetric, FeatureType, GetAdapterRequest, GetAdapterResponse,
    GetAdapterVersionRequest, GetAdapterVersionResponse, GetDocumentAnalysisRequest,
    GetDocumentAnalysisResponse, GetDocumentTextDetectionRequest,
    GetDocumentTextDetectionResponse, GetExpenseAnalysisRequest, GetExpenseAnalysisResponse,
    GetLendingAnalysisRequest, GetLendingAnalysisResponse, GetLendingAnalysisSummaryRequest,
    GetLendingAnalysisSummaryResponse, HumanLoopActivationOutput, JobStatus,
    ListAdapterVersionsRequest, ListAdapterVersionsResponse, ListAdaptersRequest,
    ListAdaptersResponse, ListTagsForResourceRequest, ListTagsForResourceResponse, OutputConfig,
    S3Object, StartDocumentAnalysisRequest, StartDocumentTextDetectionRequest,
    StartExpenseAnalysisRequest, StartJobResponse, StartLendingAnalysisRequest,
    TagResourceRequest, UntagResourceRequest, UpdateAdapterRequest, UpdateAdapterResponse,
    Warning,
};
use textwerk_core::operation::Operation;
use textwerk_core::validate::{MAX_DOCUMENT_BYTES, MAX_TAGS, Validate};

use crate::analyze::{self, AnalysisOptions};
use crate::document::SyntheticDocument;

// ---------------------------------------------------------------------------
// Error codes
// ---------------------------------------------------------------------------

pub const INVALID_PARAMETER: &str = "InvalidParameterException";
pub const BAD_DOCUMENT: &str = "BadDocumentException";
pub const DOCUMENT_TOO_LARGE: &str = "DocumentTooLargeException";
pub const INVALID_S3_OBJECT: &str = "InvalidS3ObjectException";
pub const INVALID_JOB_ID: &str = "InvalidJobIdException";
pub const IDEMPOTENT_MISMATCH: &str = "IdempotentParameterMismatchException";
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";
pub const CONFLICT: &str = "ConflictException";
pub const QUOTA_EXCEEDED: &str = "ServiceQuotaExceededException";
pub const UNKNOWN_OPERATION: &str = "UnknownOperationException";
pub const INTERNAL_ERROR: &str = "InternalServerError";

const MODEL_VERSION: &str = "1.0";
const UNREADABLE_PAGE_WARNING: &str = "UNREADABLE_PAGE";
const DEFAULT_LIST_RESULTS: u32 = 100;
const DEFAULT_DOCUMENT_RESULTS: u32 = 1000;

type Reply<T> = std::result::Result<T, ServiceError>;

fn fault(code: &str, message: impl Into<String>) -> ServiceError {
    ServiceError::new(code, message, 400)
}

fn internal(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::new(INTERNAL_ERROR, err.to_string(), 500)
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Get calls answered with IN_PROGRESS before a job completes.
    pub polls_before_complete: u32,
    pub region: String,
    /// Account id used in resource ARNs.
    pub account_id: String,
    pub max_adapters: usize,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            polls_before_complete: 1,
            region: "us-east-1".into(),
            account_id: "123456789012".into(),
            max_adapters: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    TextDetection,
    DocumentAnalysis,
    ExpenseAnalysis,
    LendingAnalysis,
}

struct Job {
    kind: JobKind,
    options: AnalysisOptions,
    pending_polls: u32,
    document: std::result::Result<SyntheticDocument, String>,
}

/// What a Get call sees of a job.
enum JobView {
    InProgress,
    Failed(String),
    Done {
        document: SyntheticDocument,
        options: AnalysisOptions,
    },
}

/// First use of a client request token.
struct TokenUse {
    fingerprint: String,
    resource_id: String,
}

struct AdapterRecord {
    name: String,
    description: Option<String>,
    feature_types: Vec<FeatureType>,
    auto_update: AutoUpdate,
    created: DateTime<Utc>,
    versions: BTreeMap<u32, VersionRecord>,
    next_version: u32,
}

struct VersionRecord {
    created: DateTime<Utc>,
    dataset_config: DatasetConfig,
    kms_key_id: Option<String>,
    output_config: OutputConfig,
    status: AdapterVersionStatus,
}

#[derive(Default)]
struct State {
    objects: HashMap<(String, String), Vec<u8>>,
    jobs: HashMap<String, Job>,
    tokens: HashMap<(&'static str, String), TokenUse>,
    adapters: BTreeMap<String, AdapterRecord>,
    adapters_created: u64,
    tags: HashMap<String, BTreeMap<String, String>>,
}

impl State {
    fn object(&self, object: Option<&S3Object>) -> Reply<Vec<u8>> {
        let key = object.map(|o| {
            (
                o.bucket.clone().unwrap_or_default(),
                o.name.clone().unwrap_or_default(),
            )
        });
        key.and_then(|key| self.objects.get(&key).cloned())
            .ok_or_else(|| {
                fault(
                    INVALID_S3_OBJECT,
                    "Unable to get object metadata from S3. Check object key, region and/or access permissions.",
                )
            })
    }

    fn document_bytes(&self, document: &Document) -> Reply<Vec<u8>> {
        match &document.bytes {
            Some(bytes) => Ok(bytes.clone()),
            None => self.object(document.s3_object.as_ref()),
        }
    }

    /// The previous use of `token`, if the request matches it.
    fn replay(
        &self,
        operation: &'static str,
        token: Option<&String>,
        fingerprint: &str,
    ) -> Reply<Option<String>> {
        let Some(token) = token else {
            return Ok(None);
        };
        match self.tokens.get(&(operation, token.clone())) {
            None => Ok(None),
            Some(used) if used.fingerprint == fingerprint => {
                info!(operation, token = %token, "replaying idempotent request");
                Ok(Some(used.resource_id.clone()))
            }
            Some(_) => Err(fault(
                IDEMPOTENT_MISMATCH,
                format!("ClientRequestToken {token} was already used with different parameters"),
            )),
        }
    }

    fn remember(
        &mut self,
        operation: &'static str,
        token: Option<&String>,
        fingerprint: String,
        resource_id: &str,
    ) {
        if let Some(token) = token {
            self.tokens.insert(
                (operation, token.clone()),
                TokenUse {
                    fingerprint,
                    resource_id: resource_id.to_owned(),
                },
            );
        }
    }

    fn adapter(&self, adapter_id: &str) -> Reply<&AdapterRecord> {
        self.adapters
            .get(adapter_id)
            .ok_or_else(|| fault(RESOURCE_NOT_FOUND, format!("adapter {adapter_id} does not exist")))
    }

    fn adapter_mut(&mut self, adapter_id: &str) -> Reply<&mut AdapterRecord> {
        self.adapters
            .get_mut(adapter_id)
            .ok_or_else(|| fault(RESOURCE_NOT_FOUND, format!("adapter {adapter_id} does not exist")))
    }

    fn check_adapters(&self, config: Option<&AdaptersConfig>) -> Reply<()> {
        for adapter in config.map(|c| c.adapters.as_slice()).unwrap_or_default() {
            let record = self.adapter(&adapter.adapter_id)?;
            let exists = adapter
                .version
                .parse::<u32>()
                .is_ok_and(|v| record.versions.contains_key(&v));
            if !exists {
                return Err(fault(
                    RESOURCE_NOT_FOUND,
                    format!(
                        "adapter {} has no version {}",
                        adapter.adapter_id, adapter.version
                    ),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct StubService {
    config: StubConfig,
    state: Mutex<State>,
    requests: AtomicU64,
}

impl std::fmt::Debug for StubService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubService")
            .field("config", &self.config)
            .field("requests", &self.requests.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StubService {
    fn default() -> Self {
        Self::new(StubConfig::default())
    }
}

impl StubService {
    pub fn new(config: StubConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            requests: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &StubConfig {
        &self.config
    }

    /// Store an object that `S3Object` references can resolve.
    pub fn put_object(&self, bucket: &str, name: &str, bytes: impl Into<Vec<u8>>) {
        let bytes = bytes.into();
        debug!(bucket, name, bytes = bytes.len(), "object stored");
        self.state()
            .objects
            .insert((bucket.to_owned(), name.to_owned()), bytes);
    }

    /// Requests handled so far, successful or not.
    pub fn requests_served(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn adapter_arn(&self, adapter_id: &str) -> String {
        format!(
            "arn:aws:textract:{}:{}:/adapters/{adapter_id}",
            self.config.region, self.config.account_id
        )
    }

    pub fn adapter_version_arn(&self, adapter_id: &str, version: &str) -> String {
        format!("{}/{version}", self.adapter_arn(adapter_id))
    }

    /// Answer one request.
    #[instrument(name = "stub", skip(self, body), fields(bytes = body.len()))]
    pub fn handle(&self, operation: &str, body: &[u8]) -> WireResponse {
        let n = self.requests.fetch_add(1, Ordering::Relaxed) + 1;
        let request_id = format!("stub-{n:08}");
        match self.dispatch(operation, body) {
            Ok(body) => {
                debug!(operation, request_id = %request_id, bytes = body.len(), "request served");
                WireResponse::new(200, body).with_header(REQUEST_ID_HEADER, request_id)
            }
            Err(error) => {
                warn!(operation, request_id = %request_id, code = %error.code, message = %error.message, "request rejected");
                codec::encode_error(&error.with_request_id(request_id))
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn dispatch(&self, operation: &str, body: &[u8]) -> Reply<Vec<u8>> {
        match operation {
            "DetectDocumentText" => self.call(body, Self::detect_document_text),
            "AnalyzeDocument" => self.call(body, Self::analyze_document),
            "AnalyzeExpense" => self.call(body, Self::analyze_expense),
            "AnalyzeID" => self.call(body, Self::analyze_id),
            "StartDocumentTextDetection" => self.call(body, Self::start_document_text_detection),
            "GetDocumentTextDetection" => self.call(body, Self::get_document_text_detection),
            "StartDocumentAnalysis" => self.call(body, Self::start_document_analysis),
            "GetDocumentAnalysis" => self.call(body, Self::get_document_analysis),
            "StartExpenseAnalysis" => self.call(body, Self::start_expense_analysis),
            "GetExpenseAnalysis" => self.call(body, Self::get_expense_analysis),
            "StartLendingAnalysis" => self.call(body, Self::start_lending_analysis),
            "GetLendingAnalysis" => self.call(body, Self::get_lending_analysis),
            "GetLendingAnalysisSummary" => self.call(body, Self::get_lending_analysis_summary),
            "CreateAdapter" => self.call(body, Self::create_adapter),
            "CreateAdapterVersion" => self.call(body, Self::create_adapter_version),
            "GetAdapter" => self.call(body, Self::get_adapter),
            "GetAdapterVersion" => self.call(body, Self::get_adapter_version),
            "UpdateAdapter" => self.call(body, Self::update_adapter),
            "DeleteAdapter" => self.call(body, Self::delete_adapter),
            "DeleteAdapterVersion" => self.call(body, Self::delete_adapter_version),
            "ListAdapters" => self.call(body, Self::list_adapters),
            "ListAdapterVersions" => self.call(body, Self::list_adapter_versions),
            "TagResource" => self.call(body, Self::tag_resource),
            "UntagResource" => self.call(body, Self::untag_resource),
            "ListTagsForResource" => self.call(body, Self::list_tags_for_resource),
            other => Err(fault(
                UNKNOWN_OPERATION,
                format!("operation {other} is not supported"),
            )),
        }
    }

    /// Decode, validate, run, encode.
    fn call<R>(&self, body: &[u8], handler: fn(&Self, R) -> Reply<R::Output>) -> Reply<Vec<u8>>
    where
        R: Operation + DeserializeOwned,
        R::Output: Serialize,
    {
        let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            body
        };
        let request: R = serde_json::from_slice(body)
            .map_err(|e| fault(INVALID_PARAMETER, format!("malformed {} request: {e}", R::NAME)))?;
        request
            .validate()
            .map_err(|e| fault(INVALID_PARAMETER, e.to_string()))?;
        let output = handler(self, request)?;
        serde_json::to_vec(&output).map_err(internal)
    }

    // -- Synchronous ------------------------------------------------------

    fn load_document(&self, document: &Document) -> Reply<SyntheticDocument> {
        let bytes = self.state().document_bytes(document)?;
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(fault(
                DOCUMENT_TOO_LARGE,
                format!("document is {} bytes; the limit is {MAX_DOCUMENT_BYTES}", bytes.len()),
            ));
        }
        let parsed = SyntheticDocument::parse(&bytes).map_err(|e| fault(BAD_DOCUMENT, e))?;
        if parsed.readable_pages().next().is_none() {
            return Err(fault(BAD_DOCUMENT, "no page of the document could be read"));
        }
        Ok(parsed)
    }

    fn detect_document_text(
        &self,
        request: DetectDocumentTextRequest,
    ) -> Reply<DetectDocumentTextResponse> {
        let document = self.load_document(&request.document)?;
        Ok(DetectDocumentTextResponse {
            document_metadata: Some(metadata(&document)),
            blocks: analyze::blocks(&document, &AnalysisOptions::text(false)),
            detect_document_text_model_version: Some(MODEL_VERSION.into()),
        })
    }

    fn analyze_document(&self, request: AnalyzeDocumentRequest) -> Reply<AnalyzeDocumentResponse> {
        self.state().check_adapters(request.adapters_config.as_ref())?;
        let document = self.load_document(&request.document)?;
        let options = AnalysisOptions::from_features(
            &request.feature_types,
            request.queries_config.as_ref(),
            false,
        );
        let human_loop_activation_output = request.human_loop_config.as_ref().map(|config| {
            HumanLoopActivationOutput {
                human_loop_arn: Some(format!(
                    "arn:aws:sagemaker:{}:{}:human-loop/{}",
                    self.config.region, self.config.account_id, config.human_loop_name
                )),
                human_loop_activation_reasons: vec!["ConfidenceBelowThreshold".into()],
                human_loop_activation_conditions_evaluation_results: Some("{}".into()),
            }
        });
        Ok(AnalyzeDocumentResponse {
            document_metadata: Some(metadata(&document)),
            blocks: analyze::blocks(&document, &options),
            human_loop_activation_output,
            analyze_document_model_version: Some(MODEL_VERSION.into()),
        })
    }

    fn analyze_expense(&self, request: AnalyzeExpenseRequest) -> Reply<AnalyzeExpenseResponse> {
        let document = self.load_document(&request.document)?;
        Ok(AnalyzeExpenseResponse {
            document_metadata: Some(metadata(&document)),
            expense_documents: analyze::expense_documents(&document),
        })
    }

    fn analyze_id(&self, request: AnalyzeIdRequest) -> Reply<AnalyzeIdResponse> {
        let mut identity_documents = Vec::with_capacity(request.document_pages.len());
        let mut pages = 0;
        for (index, page) in request.document_pages.iter().enumerate() {
            let document = self.load_document(page)?;
            pages += document.page_count();
            identity_documents.push(analyze::identity_document(&document, index as u32 + 1));
        }
        Ok(AnalyzeIdResponse {
            identity_documents,
            document_metadata: Some(DocumentMetadata { pages: Some(pages) }),
            analyze_id_model_version: Some(MODEL_VERSION.into()),
        })
    }

    // -- Asynchronous jobs --------------------------------------------------

    fn start_job<R: Operation>(
        &self,
        request: &R,
        token: Option<&String>,
        location: &DocumentLocation,
        kind: JobKind,
        options: AnalysisOptions,
    ) -> Reply<StartJobResponse> {
        let fingerprint = fingerprint(request)?;
        let mut state = self.state();
        if let Some(job_id) = state.replay(R::NAME, token, &fingerprint)? {
            return Ok(StartJobResponse {
                job_id: Some(job_id),
            });
        }

        let bytes = state.object(location.s3_object.as_ref())?;
        let document = SyntheticDocument::parse(&bytes).and_then(|document| {
            if document.readable_pages().next().is_none() {
                Err("no page of the document could be read".to_owned())
            } else {
                Ok(document)
            }
        });

        let job_id = Uuid::new_v4().simple().to_string();
        info!(operation = R::NAME, job_id = %job_id, "job started");
        state.jobs.insert(
            job_id.clone(),
            Job {
                kind,
                options,
                pending_polls: self.config.polls_before_complete,
                document,
            },
        );
        state.remember(R::NAME, token, fingerprint, &job_id);
        Ok(StartJobResponse {
            job_id: Some(job_id),
        })
    }

    fn poll(&self, job_id: &str, kind: JobKind) -> Reply<JobView> {
        let mut state = self.state();
        let job = state
            .jobs
            .get_mut(job_id)
            .filter(|job| job.kind == kind)
            .ok_or_else(|| fault(INVALID_JOB_ID, format!("job {job_id} does not exist")))?;
        if job.pending_polls > 0 {
            job.pending_polls -= 1;
            return Ok(JobView::InProgress);
        }
        Ok(match &job.document {
            Ok(document) => JobView::Done {
                document: document.clone(),
                options: job.options.clone(),
            },
            Err(reason) => JobView::Failed(reason.clone()),
        })
    }

    fn start_document_text_detection(
        &self,
        request: StartDocumentTextDetectionRequest,
    ) -> Reply<StartJobResponse> {
        self.start_job(
            &request,
            request.client_request_token.as_ref(),
            &request.document_location,
            JobKind::TextDetection,
            AnalysisOptions::text(true),
        )
    }

    fn start_document_analysis(
        &self,
        request: StartDocumentAnalysisRequest,
    ) -> Reply<StartJobResponse> {
        self.state().check_adapters(request.adapters_config.as_ref())?;
        let options = AnalysisOptions::from_features(
            &request.feature_types,
            request.queries_config.as_ref(),
            true,
        );
        self.start_job(
            &request,
            request.client_request_token.as_ref(),
            &request.document_location,
            JobKind::DocumentAnalysis,
            options,
        )
    }

    fn start_expense_analysis(
        &self,
        request: StartExpenseAnalysisRequest,
    ) -> Reply<StartJobResponse> {
        self.start_job(
            &request,
            request.client_request_token.as_ref(),
            &request.document_location,
            JobKind::ExpenseAnalysis,
            AnalysisOptions::default(),
        )
    }

    fn start_lending_analysis(
        &self,
        request: StartLendingAnalysisRequest,
    ) -> Reply<StartJobResponse> {
        self.start_job(
            &request,
            request.client_request_token.as_ref(),
            &request.document_location,
            JobKind::LendingAnalysis,
            AnalysisOptions::default(),
        )
    }

    fn get_document_text_detection(
        &self,
        request: GetDocumentTextDetectionRequest,
    ) -> Reply<GetDocumentTextDetectionResponse> {
        let mut response = GetDocumentTextDetectionResponse {
            detect_document_text_model_version: Some(MODEL_VERSION.into()),
            ..Default::default()
        };
        match self.poll(&request.job_id, JobKind::TextDetection)? {
            JobView::InProgress => response.job_status = Some(JobStatus::InProgress),
            JobView::Failed(reason) => {
                response.job_status = Some(JobStatus::Failed);
                response.status_message = Some(reason);
            }
            JobView::Done { document, options } => {
                let (blocks, next_token) = page_items(
                    &request.job_id,
                    analyze::blocks(&document, &options),
                    request.max_results.unwrap_or(DEFAULT_DOCUMENT_RESULTS),
                    request.next_token.as_deref(),
                )?;
                let completion = Completion::of(&document);
                response.document_metadata = Some(metadata(&document));
                response.blocks = blocks;
                response.next_token = next_token;
                response.job_status = Some(completion.status);
                response.status_message = completion.message;
                response.warnings = completion.warnings;
            }
        }
        Ok(response)
    }

    fn get_document_analysis(
        &self,
        request: GetDocumentAnalysisRequest,
    ) -> Reply<GetDocumentAnalysisResponse> {
        let mut response = GetDocumentAnalysisResponse {
            analyze_document_model_version: Some(MODEL_VERSION.into()),
            ..Default::default()
        };
        match self.poll(&request.job_id, JobKind::DocumentAnalysis)? {
            JobView::InProgress => response.job_status = Some(JobStatus::InProgress),
            JobView::Failed(reason) => {
                response.job_status = Some(JobStatus::Failed);
                response.status_message = Some(reason);
            }
            JobView::Done { document, options } => {
                let (blocks, next_token) = page_items(
                    &request.job_id,
                    analyze::blocks(&document, &options),
                    request.max_results.unwrap_or(DEFAULT_DOCUMENT_RESULTS),
                    request.next_token.as_deref(),
                )?;
                let completion = Completion::of(&document);
                response.document_metadata = Some(metadata(&document));
                response.blocks = blocks;
                response.next_token = next_token;
                response.job_status = Some(completion.status);
                response.status_message = completion.message;
                response.warnings = completion.warnings;
            }
        }
        Ok(response)
    }

    fn get_expense_analysis(
        &self,
        request: GetExpenseAnalysisRequest,
    ) -> Reply<GetExpenseAnalysisResponse> {
        let mut response = GetExpenseAnalysisResponse {
            analyze_expense_model_version: Some(MODEL_VERSION.into()),
            ..Default::default()
        };
        match self.poll(&request.job_id, JobKind::ExpenseAnalysis)? {
            JobView::InProgress => response.job_status = Some(JobStatus::InProgress),
            JobView::Failed(reason) => {
                response.job_status = Some(JobStatus::Failed);
                response.status_message = Some(reason);
            }
            JobView::Done { document, .. } => {
                let (expense_documents, next_token) = page_items(
                    &request.job_id,
                    analyze::expense_documents(&document),
                    request.max_results.unwrap_or(DEFAULT_DOCUMENT_RESULTS),
                    request.next_token.as_deref(),
                )?;
                let completion = Completion::of(&document);
                response.document_metadata = Some(metadata(&document));
                response.expense_documents = expense_documents;
                response.next_token = next_token;
                response.job_status = Some(completion.status);
                response.status_message = completion.message;
                response.warnings = completion.warnings;
            }
        }
        Ok(response)
    }

    fn get_lending_analysis(
        &self,
        request: GetLendingAnalysisRequest,
    ) -> Reply<GetLendingAnalysisResponse> {
        let mut response = GetLendingAnalysisResponse {
            analyze_lending_model_version: Some(MODEL_VERSION.into()),
            ..Default::default()
        };
        match self.poll(&request.job_id, JobKind::LendingAnalysis)? {
            JobView::InProgress => response.job_status = Some(JobStatus::InProgress),
            JobView::Failed(reason) => {
                response.job_status = Some(JobStatus::Failed);
                response.status_message = Some(reason);
            }
            JobView::Done { document, .. } => {
                let (results, next_token) = page_items(
                    &request.job_id,
                    analyze::lending_results(&document),
                    request.max_results.unwrap_or(DEFAULT_DOCUMENT_RESULTS),
                    request.next_token.as_deref(),
                )?;
                let completion = Completion::of(&document);
                response.document_metadata = Some(metadata(&document));
                response.results = results;
                response.next_token = next_token;
                response.job_status = Some(completion.status);
                response.status_message = completion.message;
                response.warnings = completion.warnings;
            }
        }
        Ok(response)
    }

    fn get_lending_analysis_summary(
        &self,
        request: GetLendingAnalysisSummaryRequest,
    ) -> Reply<GetLendingAnalysisSummaryResponse> {
        let mut response = GetLendingAnalysisSummaryResponse {
            analyze_lending_model_version: Some(MODEL_VERSION.into()),
            ..Default::default()
        };
        match self.poll(&request.job_id, JobKind::LendingAnalysis)? {
            JobView::InProgress => response.job_status = Some(JobStatus::InProgress),
            JobView::Failed(reason) => {
                response.job_status = Some(JobStatus::Failed);
                response.status_message = Some(reason);
            }
            JobView::Done { document, .. } => {
                let completion = Completion::of(&document);
                response.document_metadata = Some(metadata(&document));
                response.summary = Some(analyze::lending_summary(&document));
                response.job_status = Some(completion.status);
                response.status_message = completion.message;
                response.warnings = completion.warnings;
            }
        }
        Ok(response)
    }

    // -- Adapters ---------------------------------------------------------

    fn create_adapter(&self, request: CreateAdapterRequest) -> Reply<CreateAdapterResponse> {
        let fingerprint = fingerprint(&request)?;
        let token = request.client_request_token.as_ref();
        let mut state = self.state();
        if let Some(adapter_id) = state.replay(CreateAdapterRequest::NAME, token, &fingerprint)? {
            return Ok(CreateAdapterResponse {
                adapter_id: Some(adapter_id),
            });
        }
        if state.adapters.values().any(|a| a.name == request.adapter_name) {
            return Err(fault(
                CONFLICT,
                format!("an adapter named {} already exists", request.adapter_name),
            ));
        }
        if state.adapters.len() >= self.config.max_adapters {
            return Err(fault(QUOTA_EXCEEDED, "adapter limit reached").with_quota(QuotaDetails {
                resource_type: Some("Adapter".into()),
                quota_code: Some("L-ADAPTERS".into()),
                service_code: Some("textract".into()),
            }));
        }

        state.adapters_created += 1;
        let adapter_id = format!("{:012x}", state.adapters_created);
        state.adapters.insert(
            adapter_id.clone(),
            AdapterRecord {
                name: request.adapter_name.clone(),
                description: request.description.clone(),
                feature_types: request.feature_types.clone(),
                auto_update: request.auto_update.clone().unwrap_or(AutoUpdate::Disabled),
                created: epoch_seconds::now(),
                versions: BTreeMap::new(),
                next_version: 1,
            },
        );
        if !request.tags.is_empty() {
            state
                .tags
                .insert(self.adapter_arn(&adapter_id), request.tags.clone());
        }
        state.remember(CreateAdapterRequest::NAME, token, fingerprint, &adapter_id);
        info!(adapter_id = %adapter_id, name = %request.adapter_name, "adapter created");
        Ok(CreateAdapterResponse {
            adapter_id: Some(adapter_id),
        })
    }

    fn create_adapter_version(
        &self,
        request: CreateAdapterVersionRequest,
    ) -> Reply<CreateAdapterVersionResponse> {
        let fingerprint = fingerprint(&request)?;
        let token = request.client_request_token.as_ref();
        let mut state = self.state();
        if let Some(version) =
            state.replay(CreateAdapterVersionRequest::NAME, token, &fingerprint)?
        {
            return Ok(CreateAdapterVersionResponse {
                adapter_id: Some(request.adapter_id),
                adapter_version: Some(version),
            });
        }
        state.adapter(&request.adapter_id)?;
        state.object(request.dataset_config.manifest_s3_object.as_ref())?;

        let adapter = state.adapter_mut(&request.adapter_id)?;
        let number = adapter.next_version;
        adapter.next_version += 1;
        adapter.versions.insert(
            number,
            VersionRecord {
                created: epoch_seconds::now(),
                dataset_config: request.dataset_config.clone(),
                kms_key_id: request.kms_key_id.clone(),
                output_config: request.output_config.clone(),
                status: AdapterVersionStatus::Active,
            },
        );
        let version = number.to_string();
        if !request.tags.is_empty() {
            state.tags.insert(
                self.adapter_version_arn(&request.adapter_id, &version),
                request.tags.clone(),
            );
        }
        state.remember(CreateAdapterVersionRequest::NAME, token, fingerprint, &version);
        info!(adapter_id = %request.adapter_id, version = %version, "adapter version created");
        Ok(CreateAdapterVersionResponse {
            adapter_id: Some(request.adapter_id),
            adapter_version: Some(version),
        })
    }

    fn get_adapter(&self, request: GetAdapterRequest) -> Reply<GetAdapterResponse> {
        let state = self.state();
        let adapter = state.adapter(&request.adapter_id)?;
        Ok(GetAdapterResponse {
            adapter_id: Some(request.adapter_id.clone()),
            adapter_name: Some(adapter.name.clone()),
            creation_time: Some(adapter.created),
            description: adapter.description.clone(),
            feature_types: adapter.feature_types.clone(),
            auto_update: Some(adapter.auto_update.clone()),
            tags: state
                .tags
                .get(&self.adapter_arn(&request.adapter_id))
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn get_adapter_version(
        &self,
        request: GetAdapterVersionRequest,
    ) -> Reply<GetAdapterVersionResponse> {
        let state = self.state();
        let adapter = state.adapter(&request.adapter_id)?;
        let record = version_of(adapter, &request.adapter_id, &request.adapter_version)?;
        Ok(GetAdapterVersionResponse {
            adapter_id: Some(request.adapter_id.clone()),
            adapter_version: Some(request.adapter_version.clone()),
            creation_time: Some(record.created),
            feature_types: adapter.feature_types.clone(),
            status: Some(record.status.clone()),
            status_message: None,
            dataset_config: Some(record.dataset_config.clone()),
            kms_key_id: record.kms_key_id.clone(),
            output_config: Some(record.output_config.clone()),
            evaluation_metrics: adapter
                .feature_types
                .iter()
                .map(|feature| AdapterVersionEvaluationMetric {
                    baseline: Some(EvaluationMetric {
                        f1_score: Some(0.81),
                        precision: Some(0.84),
                        recall: Some(0.78),
                    }),
                    adapter_version: Some(EvaluationMetric {
                        f1_score: Some(0.93),
                        precision: Some(0.94),
                        recall: Some(0.92),
                    }),
                    feature_type: Some(feature.clone()),
                })
                .collect(),
            tags: state
                .tags
                .get(&self.adapter_version_arn(&request.adapter_id, &request.adapter_version))
                .cloned()
                .unwrap_or_default(),
        })
    }

    fn update_adapter(&self, request: UpdateAdapterRequest) -> Reply<UpdateAdapterResponse> {
        let mut state = self.state();
        if let Some(name) = &request.adapter_name {
            let taken = state
                .adapters
                .iter()
                .any(|(id, a)| *id != request.adapter_id && a.name == *name);
            if taken {
                return Err(fault(CONFLICT, format!("an adapter named {name} already exists")));
            }
        }
        let adapter = state.adapter_mut(&request.adapter_id)?;
        if let Some(name) = request.adapter_name {
            adapter.name = name;
        }
        if let Some(description) = request.description {
            adapter.description = Some(description);
        }
        if let Some(auto_update) = request.auto_update {
            adapter.auto_update = auto_update;
        }
        Ok(UpdateAdapterResponse {
            adapter_id: Some(request.adapter_id),
            adapter_name: Some(adapter.name.clone()),
            creation_time: Some(adapter.created),
            description: adapter.description.clone(),
            feature_types: adapter.feature_types.clone(),
            auto_update: Some(adapter.auto_update.clone()),
        })
    }

    fn delete_adapter(&self, request: DeleteAdapterRequest) -> Reply<EmptyResponse> {
        let mut state = self.state();
        let Some(adapter) = state.adapters.remove(&request.adapter_id) else {
            return Err(fault(
                RESOURCE_NOT_FOUND,
                format!("adapter {} does not exist", request.adapter_id),
            ));
        };
        state.tags.remove(&self.adapter_arn(&request.adapter_id));
        for version in adapter.versions.keys() {
            state.tags.remove(
                &self.adapter_version_arn(&request.adapter_id, &version.to_string()),
            );
        }
        info!(adapter_id = %request.adapter_id, "adapter deleted");
        Ok(EmptyResponse {})
    }

    fn delete_adapter_version(
        &self,
        request: DeleteAdapterVersionRequest,
    ) -> Reply<EmptyResponse> {
        let mut state = self.state();
        let adapter = state.adapter_mut(&request.adapter_id)?;
        let removed = request
            .adapter_version
            .parse::<u32>()
            .ok()
            .and_then(|v| adapter.versions.remove(&v));
        if removed.is_none() {
            return Err(fault(
                RESOURCE_NOT_FOUND,
                format!(
                    "adapter {} has no version {}",
                    request.adapter_id, request.adapter_version
                ),
            ));
        }
        state.tags.remove(&self.adapter_version_arn(
            &request.adapter_id,
            &request.adapter_version,
        ));
        Ok(EmptyResponse {})
    }

    fn list_adapters(&self, request: ListAdaptersRequest) -> Reply<ListAdaptersResponse> {
        let state = self.state();
        let window = CreationWindow {
            after: request.after_creation_time,
            before: request.before_creation_time,
        };
        let adapters: Vec<AdapterOverview> = state
            .adapters
            .iter()
            .filter(|(_, a)| window.contains(a.created))
            .map(|(id, a)| AdapterOverview {
                adapter_id: Some(id.clone()),
                adapter_name: Some(a.name.clone()),
                creation_time: Some(a.created),
                feature_types: a.feature_types.clone(),
            })
            .collect();
        let (adapters, next_token) = page_items(
            "adapters",
            adapters,
            request.max_results.unwrap_or(DEFAULT_LIST_RESULTS),
            request.next_token.as_deref(),
        )?;
        Ok(ListAdaptersResponse {
            adapters,
            next_token,
        })
    }

    fn list_adapter_versions(
        &self,
        request: ListAdapterVersionsRequest,
    ) -> Reply<ListAdapterVersionsResponse> {
        let state = self.state();
        if let Some(adapter_id) = &request.adapter_id {
            state.adapter(adapter_id)?;
        }
        let window = CreationWindow {
            after: request.after_creation_time,
            before: request.before_creation_time,
        };
        let versions: Vec<AdapterVersionOverview> = state
            .adapters
            .iter()
            .filter(|(id, _)| request.adapter_id.as_ref().is_none_or(|wanted| wanted == *id))
            .flat_map(|(id, adapter)| {
                adapter.versions.iter().map(move |(number, version)| (id, adapter, number, version))
            })
            .filter(|(_, _, _, version)| window.contains(version.created))
            .map(|(id, adapter, number, version)| AdapterVersionOverview {
                adapter_id: Some(id.clone()),
                adapter_version: Some(number.to_string()),
                creation_time: Some(version.created),
                feature_types: adapter.feature_types.clone(),
                status: Some(version.status.clone()),
                status_message: None,
            })
            .collect();
        let scope = format!(
            "versions:{}",
            request.adapter_id.as_deref().unwrap_or("*")
        );
        let (adapter_versions, next_token) = page_items(
            &scope,
            versions,
            request.max_results.unwrap_or(DEFAULT_LIST_RESULTS),
            request.next_token.as_deref(),
        )?;
        Ok(ListAdapterVersionsResponse {
            adapter_versions,
            next_token,
        })
    }

    // -- Tags -------------------------------------------------------------

    /// Whether `arn` names an adapter or adapter version that exists.
    fn resource_exists(&self, state: &State, arn: &str) -> bool {
        let prefix = self.adapter_arn("");
        let Some(rest) = arn.strip_prefix(&prefix) else {
            return false;
        };
        let mut parts = rest.split('/');
        let Some(adapter) = parts.next().and_then(|id| state.adapters.get(id)) else {
            return false;
        };
        match (parts.next(), parts.next()) {
            (None, _) => true,
            (Some(version), None) => version
                .parse::<u32>()
                .is_ok_and(|v| adapter.versions.contains_key(&v)),
            _ => false,
        }
    }

    fn require_resource(&self, state: &State, arn: &str) -> Reply<()> {
        if self.resource_exists(state, arn) {
            Ok(())
        } else {
            Err(fault(RESOURCE_NOT_FOUND, format!("resource {arn} does not exist")))
        }
    }

    fn tag_resource(&self, request: TagResourceRequest) -> Reply<EmptyResponse> {
        let mut state = self.state();
        self.require_resource(&state, &request.resource_arn)?;
        let existing = state.tags.get(&request.resource_arn);
        let held = existing.map_or(0, |tags| tags.len());
        let added = request
            .tags
            .keys()
            .filter(|k| existing.is_none_or(|tags| !tags.contains_key(*k)))
            .count();
        if held + added > MAX_TAGS {
            return Err(fault(
                QUOTA_EXCEEDED,
                format!("a resource can carry at most {MAX_TAGS} tags"),
            )
            .with_quota(QuotaDetails {
                resource_type: Some("Tag".into()),
                quota_code: Some("L-TAGS".into()),
                service_code: Some("textract".into()),
            }));
        }
        state
            .tags
            .entry(request.resource_arn)
            .or_default()
            .extend(request.tags);
        Ok(EmptyResponse {})
    }

    fn untag_resource(&self, request: UntagResourceRequest) -> Reply<EmptyResponse> {
        let mut state = self.state();
        self.require_resource(&state, &request.resource_arn)?;
        if let Some(tags) = state.tags.get_mut(&request.resource_arn) {
            for key in &request.tag_keys {
                tags.remove(key);
            }
        }
        Ok(EmptyResponse {})
    }

    fn list_tags_for_resource(
        &self,
        request: ListTagsForResourceRequest,
    ) -> Reply<ListTagsForResourceResponse> {
        let state = self.state();
        self.require_resource(&state, &request.resource_arn)?;
        Ok(ListTagsForResourceResponse {
            tags: state
                .tags
                .get(&request.resource_arn)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn metadata(document: &SyntheticDocument) -> DocumentMetadata {
    DocumentMetadata {
        pages: Some(document.page_count()),
    }
}

/// Terminal status of a completed job.
struct Completion {
    status: JobStatus,
    message: Option<String>,
    warnings: Vec<Warning>,
}

impl Completion {
    fn of(document: &SyntheticDocument) -> Self {
        let unreadable = document.unreadable_pages();
        if unreadable.is_empty() {
            return Self {
                status: JobStatus::Succeeded,
                message: None,
                warnings: Vec::new(),
            };
        }
        Self {
            status: JobStatus::PartialSuccess,
            message: Some(format!("{} page(s) could not be read", unreadable.len())),
            warnings: vec![Warning {
                error_code: Some(UNREADABLE_PAGE_WARNING.into()),
                pages: unreadable,
            }],
        }
    }
}

/// SHA-256 of the request with its idempotency token removed.
fn fingerprint<R: Serialize>(request: &R) -> Reply<String> {
    let mut value = serde_json::to_value(request).map_err(internal)?;
    if let Some(members) = value.as_object_mut() {
        members.remove("ClientRequestToken");
    }
    let canonical = serde_json::to_vec(&value).map_err(internal)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

fn version_of<'a>(
    adapter: &'a AdapterRecord,
    adapter_id: &str,
    version: &str,
) -> Reply<&'a VersionRecord> {
    version
        .parse::<u32>()
        .ok()
        .and_then(|v| adapter.versions.get(&v))
        .ok_or_else(|| {
            fault(
                RESOURCE_NOT_FOUND,
                format!("adapter {adapter_id} has no version {version}"),
            )
        })
}

struct CreationWindow {
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl CreationWindow {
    fn contains(&self, created: DateTime<Utc>) -> bool {
        self.after.is_none_or(|after| created > after)
            && self.before.is_none_or(|before| created < before)
    }
}

/// One page of `items`.  Tokens are opaque hex of `scope:offset` and only
/// valid for the scope that issued them.
fn page_items<T>(
    scope: &str,
    mut items: Vec<T>,
    max_results: u32,
    token: Option<&str>,
) -> Reply<(Vec<T>, Option<String>)> {
    let offset = match token {
        None => 0,
        Some(token) => decode_token(scope, token)
            .filter(|&offset| offset <= items.len())
            .ok_or_else(|| fault(INVALID_PARAMETER, "NextToken is not valid for this request"))?,
    };
    let end = offset.saturating_add(max_results.max(1) as usize).min(items.len());
    let next_token = (end < items.len()).then(|| hex::encode(format!("{scope}:{end}")));
    let page = items.drain(offset..end).collect();
    Ok((page, next_token))
}

fn decode_token(scope: &str, token: &str) -> Option<usize> {
    let raw = String::from_utf8(hex::decode(token).ok()?).ok()?;
    let (issued_for, offset) = raw.rsplit_once(':')?;
    if issued_for != scope {
        return None;
    }
    offset.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use textwerk_core::model::{Adapter, FeatureType, QueriesConfig, Query};

    fn call<R: Serialize + Operation>(service: &StubService, request: &R) -> WireResponse {
        service.handle(R::NAME, &serde_json::to_vec(request).expect("encode"))
    }

    fn ok<R: Operation>(service: &StubService, request: &R) -> R::Output {
        let response = call(service, request);
        assert_eq!(
            response.status,
            200,
            "{}",
            String::from_utf8_lossy(&response.body)
        );
        serde_json::from_slice(&response.body).expect("decode")
    }

    fn error_code(response: &WireResponse) -> String {
        codec::decode_error(response).code
    }

    #[test]
    fn detect_text_inline() {
        let service = StubService::default();
        let response = ok(
            &service,
            &DetectDocumentTextRequest::new(Document::from_bytes(b"Hello\x0cWorld".to_vec())),
        );
        assert_eq!(response.document_metadata, Some(DocumentMetadata { pages: Some(2) }));
        assert!(response.blocks.iter().all(|b| b.page.is_none()));
    }

    #[test]
    fn missing_s3_object_is_rejected() {
        let service = StubService::default();
        let response = call(
            &service,
            &DetectDocumentTextRequest::new(Document::from_s3("bucket", "missing.txt")),
        );
        assert_eq!(response.status, 400);
        assert_eq!(error_code(&response), INVALID_S3_OBJECT);
        assert_eq!(response.header(REQUEST_ID_HEADER), Some("stub-00000001"));
    }

    #[test]
    fn binary_document_is_bad() {
        let service = StubService::default();
        let response = call(
            &service,
            &DetectDocumentTextRequest::new(Document::from_bytes(vec![0xff, 0xd8, 0xff])),
        );
        assert_eq!(error_code(&response), BAD_DOCUMENT);
    }

    #[test]
    fn unknown_operation_and_malformed_body() {
        let service = StubService::default();
        assert_eq!(error_code(&service.handle("ShredDocument", b"{}")), UNKNOWN_OPERATION);
        assert_eq!(
            error_code(&service.handle("GetAdapter", b"{not json")),
            INVALID_PARAMETER
        );
    }

    #[test]
    fn server_side_validation_runs() {
        let service = StubService::default();
        let body = br#"{"Document":{"Bytes":"aGk="},"FeatureTypes":[]}"#;
        assert_eq!(
            error_code(&service.handle("AnalyzeDocument", body)),
            INVALID_PARAMETER
        );
    }

    #[test]
    fn job_in_progress_then_succeeds() {
        let service = StubService::new(StubConfig {
            polls_before_complete: 2,
            ..StubConfig::default()
        });
        service.put_object("docs", "a.txt", "one\x0ctwo");
        let started = ok(
            &service,
            &StartDocumentTextDetectionRequest::new(DocumentLocation::s3("docs", "a.txt")),
        );
        let job_id = started.job_id.expect("job id");

        let get = GetDocumentTextDetectionRequest {
            job_id: job_id.clone(),
            ..Default::default()
        };
        assert_eq!(ok(&service, &get).job_status, Some(JobStatus::InProgress));
        assert_eq!(ok(&service, &get).job_status, Some(JobStatus::InProgress));
        let done = ok(&service, &get);
        assert_eq!(done.job_status, Some(JobStatus::Succeeded));
        assert!(done.blocks.iter().all(|b| b.page.is_some()));
    }

    #[test]
    fn unreadable_pages_give_partial_success() {
        let service = StubService::new(StubConfig {
            polls_before_complete: 0,
            ..StubConfig::default()
        });
        service.put_object("docs", "a.txt", "fine\x0c<<unreadable>>");
        service.put_object("docs", "b.txt", "<<unreadable>>");

        let partial = ok(
            &service,
            &StartExpenseAnalysisRequest::new(DocumentLocation::s3("docs", "a.txt")),
        );
        let response = ok(
            &service,
            &GetExpenseAnalysisRequest {
                job_id: partial.job_id.expect("id"),
                ..Default::default()
            },
        );
        assert_eq!(response.job_status, Some(JobStatus::PartialSuccess));
        assert_eq!(response.warnings[0].pages, vec![2]);

        let failed = ok(
            &service,
            &StartExpenseAnalysisRequest::new(DocumentLocation::s3("docs", "b.txt")),
        );
        let response = ok(
            &service,
            &GetExpenseAnalysisRequest {
                job_id: failed.job_id.expect("id"),
                ..Default::default()
            },
        );
        assert_eq!(response.job_status, Some(JobStatus::Failed));
        assert!(response.status_message.is_some());
    }

    #[test]
    fn job_ids_are_scoped_to_their_operation() {
        let service = StubService::default();
        service.put_object("docs", "a.txt", "text");
        let started = ok(
            &service,
            &StartDocumentTextDetectionRequest::new(DocumentLocation::s3("docs", "a.txt")),
        );
        let response = call(
            &service,
            &GetDocumentAnalysisRequest {
                job_id: started.job_id.expect("id"),
                ..Default::default()
            },
        );
        assert_eq!(error_code(&response), INVALID_JOB_ID);
    }

    #[test]
    fn idempotency_token_replays_or_conflicts() {
        let service = StubService::default();
        service.put_object("docs", "a.txt", "text");
        service.put_object("docs", "b.txt", "other");

        let mut request = StartDocumentTextDetectionRequest::new(DocumentLocation::s3("docs", "a.txt"));
        request.client_request_token = Some("token-1".into());
        let first = ok(&service, &request).job_id;
        let second = ok(&service, &request).job_id;
        assert_eq!(first, second);

        request.document_location = DocumentLocation::s3("docs", "b.txt");
        assert_eq!(error_code(&call(&service, &request)), IDEMPOTENT_MISMATCH);
    }

    #[test]
    fn document_pages_follow_max_results() {
        let service = StubService::new(StubConfig {
            polls_before_complete: 0,
            ..StubConfig::default()
        });
        service.put_object("docs", "a.txt", "one two three");
        let job_id = ok(
            &service,
            &StartDocumentTextDetectionRequest::new(DocumentLocation::s3("docs", "a.txt")),
        )
        .job_id
        .expect("id");

        let mut request = GetDocumentTextDetectionRequest {
            job_id,
            max_results: Some(2),
            next_token: None,
        };
        let mut total = 0;
        let mut calls = 0;
        loop {
            let page = ok(&service, &request);
            calls += 1;
            total += page.blocks.len();
            match page.next_token {
                Some(token) => request.next_token = Some(token),
                None => break,
            }
        }
        // PAGE + LINE + three WORDs.
        assert_eq!(total, 5);
        assert_eq!(calls, 3);
    }

    #[test]
    fn foreign_token_is_rejected() {
        assert!(page_items("job-a", vec![1, 2, 3], 1, None).is_ok());
        let token = hex::encode("job-b:1");
        assert!(page_items("job-a", vec![1, 2, 3], 1, Some(&token)).is_err());
        assert!(page_items("job-a", vec![1, 2, 3], 1, Some("zz")).is_err());
    }

    #[test]
    fn adapter_lifecycle_and_tags() {
        let service = StubService::default();
        service.put_object("train", "manifest.jsonl", "{}");

        let mut create = CreateAdapterRequest {
            adapter_name: "invoices".into(),
            feature_types: vec![FeatureType::Queries],
            ..Default::default()
        };
        create.tags.insert("team".into(), "finance".into());
        let adapter_id = ok(&service, &create).adapter_id.expect("id");
        assert_eq!(adapter_id.len(), 12);
        assert_eq!(error_code(&call(&service, &create)), CONFLICT);

        let version = ok(
            &service,
            &CreateAdapterVersionRequest {
                adapter_id: adapter_id.clone(),
                dataset_config: DatasetConfig {
                    manifest_s3_object: Some(S3Object::new("train", "manifest.jsonl")),
                },
                output_config: OutputConfig {
                    s3_bucket: "out".into(),
                    s3_prefix: None,
                },
                ..Default::default()
            },
        );
        assert_eq!(version.adapter_version.as_deref(), Some("1"));

        let fetched = ok(
            &service,
            &GetAdapterVersionRequest {
                adapter_id: adapter_id.clone(),
                adapter_version: "1".into(),
            },
        );
        assert_eq!(fetched.status, Some(AdapterVersionStatus::Active));
        assert_eq!(fetched.evaluation_metrics.len(), 1);

        let arn = service.adapter_arn(&adapter_id);
        let tags = ok(&service, &ListTagsForResourceRequest { resource_arn: arn.clone() });
        assert_eq!(tags.tags.get("team").map(String::as_str), Some("finance"));
        ok(
            &service,
            &UntagResourceRequest {
                resource_arn: arn.clone(),
                tag_keys: vec!["team".into()],
            },
        );
        assert!(ok(&service, &ListTagsForResourceRequest { resource_arn: arn }).tags.is_empty());

        ok(&service, &DeleteAdapterRequest { adapter_id: adapter_id.clone() });
        let response = call(&service, &GetAdapterRequest { adapter_id });
        assert_eq!(error_code(&response), RESOURCE_NOT_FOUND);
    }

    #[test]
    fn rejected_tagging_leaves_tags_untouched() {
        let service = StubService::default();
        let adapter_id = ok(
            &service,
            &CreateAdapterRequest {
                adapter_name: "receipts".into(),
                feature_types: vec![FeatureType::Tables],
                ..Default::default()
            },
        )
        .adapter_id
        .expect("id");
        let arn = service.adapter_arn(&adapter_id);

        let oversized = TagResourceRequest {
            resource_arn: arn.clone(),
            tags: (0..=MAX_TAGS).map(|i| (format!("k{i}"), "v".into())).collect(),
        };
        let error = service.tag_resource(oversized).expect_err("over quota");
        assert_eq!(error.code, QUOTA_EXCEEDED);
        assert!(!service.state().tags.contains_key(&arn));

        let full = TagResourceRequest {
            resource_arn: arn.clone(),
            tags: (0..MAX_TAGS).map(|i| (format!("k{i}"), "v".into())).collect(),
        };
        ok(&service, &full);
        let mut one_more = TagResourceRequest {
            resource_arn: arn.clone(),
            ..Default::default()
        };
        one_more.tags.insert("k0".into(), "changed".into());
        one_more.tags.insert("extra".into(), "v".into());
        assert_eq!(error_code(&call(&service, &one_more)), QUOTA_EXCEEDED);

        let tags = ok(&service, &ListTagsForResourceRequest { resource_arn: arn }).tags;
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags.get("k0").map(String::as_str), Some("v"));
        assert!(!tags.contains_key("extra"));
    }

    #[test]
    fn creation_times_survive_the_wire() {
        let service = StubService::default();
        let adapter_id = ok(
            &service,
            &CreateAdapterRequest {
                adapter_name: "forms".into(),
                feature_types: vec![FeatureType::Forms],
                ..Default::default()
            },
        )
        .adapter_id
        .expect("id");
        let stored = service
            .state()
            .adapter(&adapter_id)
            .map(|record| record.created)
            .expect("adapter record");
        let fetched = ok(&service, &GetAdapterRequest { adapter_id });
        assert_eq!(fetched.creation_time, Some(stored));
        assert_eq!(stored, epoch_seconds::truncate(stored));
    }

    #[test]
    fn unknown_arn_is_not_found() {
        let service = StubService::default();
        let response = call(
            &service,
            &ListTagsForResourceRequest {
                resource_arn: "arn:aws:textract:us-east-1:123456789012:/adapters/000000000099".into(),
            },
        );
        assert_eq!(error_code(&response), RESOURCE_NOT_FOUND);
    }

    #[test]
    fn analysis_with_unknown_adapter_is_not_found() {
        let service = StubService::default();
        let mut request = AnalyzeDocumentRequest::new(
            Document::from_bytes(b"Total: 5".to_vec()),
            [FeatureType::Queries],
        );
        request.queries_config = Some(QueriesConfig {
            queries: vec![Query::new("What is the total?")],
        });
        request.adapters_config = Some(AdaptersConfig {
            adapters: vec![Adapter::new("000000000042", "1")],
        });
        assert_eq!(error_code(&call(&service, &request)), RESOURCE_NOT_FOUND);
    }

    #[test]
    fn adapter_quota_reports_details() {
        let service = StubService::new(StubConfig {
            max_adapters: 1,
            ..StubConfig::default()
        });
        for (name, expect_ok) in [("first", true), ("second", false)] {
            let response = call(
                &service,
                &CreateAdapterRequest {
                    adapter_name: name.into(),
                    feature_types: vec![FeatureType::Tables],
                    ..Default::default()
                },
            );
            assert_eq!(response.is_success(), expect_ok);
            if !expect_ok {
                let error = codec::decode_error(&response);
                assert_eq!(error.code, QUOTA_EXCEEDED);
                let quota = error.quota.expect("quota");
                assert_eq!(quota.resource_type.as_deref(), Some("Adapter"));
            }
        }
    }
}
