// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed async client for the document-analysis service.
//
// Every call runs the same pipeline:
//   validate -> encode -> transport -> decode (2xx) | decode_error (other)
//
// The client holds no per-call state and never retries; errors reach the
// caller exactly as observed.  See `retry` for caller-side advice.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, instrument};

use textwerk_core::config::ClientConfig;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::model::*;
use textwerk_core::operation::{JobQuery, Operation, Paginated};

use crate::codec;
use crate::paginate::Paginator;
use crate::poll::{self, JobOutcome};
use crate::transport::{HttpTransport, Transport};

/// Async client bound to one endpoint.
///
/// Cloning is cheap; clones share the transport and configuration.
#[derive(Clone)]
pub struct TextwerkClient {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl TextwerkClient {
    /// Create a client that talks HTTPS to `config.endpoint`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over any transport, e.g. an in-process stub.
    pub fn with_transport(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send any operation.  The per-operation methods below delegate here.
    #[instrument(skip_all, fields(operation = R::NAME))]
    pub async fn send<R: Operation>(&self, request: &R) -> Result<R::Output> {
        request.validate()?;
        let wire = codec::encode_request(request)?;
        let response = self.transport.send(wire).await?;

        if response.is_success() {
            let output = codec::decode_response::<R>(&response)?;
            debug!(status = response.status, "call succeeded");
            Ok(output)
        } else {
            let service_error = codec::decode_error(&response);
            error!(
                code = %service_error.code,
                status = service_error.status,
                request_id = service_error.request_id.as_deref().unwrap_or("-"),
                "service returned an error"
            );
            Err(TextwerkError::Service(service_error))
        }
    }

    /// Lazily iterate the pages of a paged operation.
    pub fn paginate<R: Paginated>(&self, request: R) -> Paginator<R> {
        Paginator::new(self.clone(), request)
    }

    /// Poll a job until it leaves IN_PROGRESS, returning its first page.
    pub async fn wait_for_job<R: JobQuery>(&self, job_id: &str) -> Result<JobOutcome<R::Output>> {
        poll::wait(self, R::for_job(job_id), job_id).await
    }

    /// Like `wait_for_job`, polling with a caller-built request (e.g. one
    /// carrying `MaxResults`).
    pub async fn wait_for<R: JobQuery>(&self, request: R) -> Result<JobOutcome<R::Output>> {
        let job_id = job_id_of(&request)?;
        poll::wait(self, request, &job_id).await
    }

    // -- Synchronous analysis --------------------------------------------

    pub async fn analyze_document(
        &self,
        request: &AnalyzeDocumentRequest,
    ) -> Result<AnalyzeDocumentResponse> {
        self.send(request).await
    }

    pub async fn detect_document_text(
        &self,
        request: &DetectDocumentTextRequest,
    ) -> Result<DetectDocumentTextResponse> {
        self.send(request).await
    }

    pub async fn analyze_expense(
        &self,
        request: &AnalyzeExpenseRequest,
    ) -> Result<AnalyzeExpenseResponse> {
        self.send(request).await
    }

    pub async fn analyze_id(&self, request: &AnalyzeIdRequest) -> Result<AnalyzeIdResponse> {
        self.send(request).await
    }

    // -- Asynchronous jobs -----------------------------------------------

    pub async fn start_document_analysis(
        &self,
        request: &StartDocumentAnalysisRequest,
    ) -> Result<StartJobResponse> {
        self.send(request).await
    }

    pub async fn get_document_analysis(
        &self,
        request: &GetDocumentAnalysisRequest,
    ) -> Result<GetDocumentAnalysisResponse> {
        self.send(request).await
    }

    pub async fn start_document_text_detection(
        &self,
        request: &StartDocumentTextDetectionRequest,
    ) -> Result<StartJobResponse> {
        self.send(request).await
    }

    pub async fn get_document_text_detection(
        &self,
        request: &GetDocumentTextDetectionRequest,
    ) -> Result<GetDocumentTextDetectionResponse> {
        self.send(request).await
    }

    pub async fn start_expense_analysis(
        &self,
        request: &StartExpenseAnalysisRequest,
    ) -> Result<StartJobResponse> {
        self.send(request).await
    }

    pub async fn get_expense_analysis(
        &self,
        request: &GetExpenseAnalysisRequest,
    ) -> Result<GetExpenseAnalysisResponse> {
        self.send(request).await
    }

    pub async fn start_lending_analysis(
        &self,
        request: &StartLendingAnalysisRequest,
    ) -> Result<StartJobResponse> {
        self.send(request).await
    }

    pub async fn get_lending_analysis(
        &self,
        request: &GetLendingAnalysisRequest,
    ) -> Result<GetLendingAnalysisResponse> {
        self.send(request).await
    }

    pub async fn get_lending_analysis_summary(
        &self,
        request: &GetLendingAnalysisSummaryRequest,
    ) -> Result<GetLendingAnalysisSummaryResponse> {
        self.send(request).await
    }

    // -- Adapters --------------------------------------------------------

    pub async fn create_adapter(
        &self,
        request: &CreateAdapterRequest,
    ) -> Result<CreateAdapterResponse> {
        self.send(request).await
    }

    pub async fn get_adapter(&self, request: &GetAdapterRequest) -> Result<GetAdapterResponse> {
        self.send(request).await
    }

    pub async fn update_adapter(
        &self,
        request: &UpdateAdapterRequest,
    ) -> Result<UpdateAdapterResponse> {
        self.send(request).await
    }

    pub async fn delete_adapter(&self, request: &DeleteAdapterRequest) -> Result<EmptyResponse> {
        self.send(request).await
    }

    pub async fn list_adapters(&self, request: &ListAdaptersRequest) -> Result<ListAdaptersResponse> {
        self.send(request).await
    }

    pub async fn create_adapter_version(
        &self,
        request: &CreateAdapterVersionRequest,
    ) -> Result<CreateAdapterVersionResponse> {
        self.send(request).await
    }

    pub async fn get_adapter_version(
        &self,
        request: &GetAdapterVersionRequest,
    ) -> Result<GetAdapterVersionResponse> {
        self.send(request).await
    }

    pub async fn delete_adapter_version(
        &self,
        request: &DeleteAdapterVersionRequest,
    ) -> Result<EmptyResponse> {
        self.send(request).await
    }

    pub async fn list_adapter_versions(
        &self,
        request: &ListAdapterVersionsRequest,
    ) -> Result<ListAdapterVersionsResponse> {
        self.send(request).await
    }

    // -- Tags ------------------------------------------------------------

    pub async fn tag_resource(&self, request: &TagResourceRequest) -> Result<EmptyResponse> {
        self.send(request).await
    }

    pub async fn untag_resource(&self, request: &UntagResourceRequest) -> Result<EmptyResponse> {
        self.send(request).await
    }

    pub async fn list_tags_for_resource(
        &self,
        request: &ListTagsForResourceRequest,
    ) -> Result<ListTagsForResourceResponse> {
        self.send(request).await
    }
}

impl fmt::Debug for TextwerkClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextwerkClient")
            .field("endpoint", &self.config.endpoint)
            .field("region", &self.config.region)
            .finish()
    }
}

// `JobQuery` only builds requests from an id; read it back through the wire
// form so any Get* request works with `wait_for`.
fn job_id_of<R: Operation>(request: &R) -> Result<String> {
    let value = serde_json::to_value(request)?;
    value
        .get("JobId")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| TextwerkError::Encode(format!("{} has no JobId", R::NAME)))
}
