// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subcommand arguments and their handlers.  Every handler returns the JSON
// value printed on stdout, so it can be tested without capturing output.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use textwerk_client::retry::{self, RetryConfig, RetryDecision};
use textwerk_client::{JobOutcome, TextwerkClient};
use textwerk_core::config::ClientConfig;
use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::model::{
    Adapter, AdaptersConfig, AnalyzeDocumentRequest, AnalyzeExpenseRequest, AnalyzeIdRequest,
    CreateAdapterRequest, DeleteAdapterRequest, DetectDocumentTextRequest, FeatureType,
    GetAdapterRequest, GetDocumentAnalysisRequest, GetDocumentTextDetectionRequest,
    GetExpenseAnalysisRequest, GetLendingAnalysisRequest, GetLendingAnalysisSummaryRequest,
    ListAdapterVersionsRequest, ListAdaptersRequest, StartDocumentAnalysisRequest,
    StartDocumentTextDetectionRequest, StartExpenseAnalysisRequest, StartLendingAnalysisRequest,
};
use textwerk_core::operation::{JobQuery, Paginated};
use textwerk_stub::{StubConfig, StubServer, StubService};

use crate::services::input::{Input, queries_config};
use crate::services::session::{ConnectOptions, Session, resolve_config};

// ---------------------------------------------------------------------------
// Argument types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeatureArg {
    Tables,
    Forms,
    Queries,
    Signatures,
    Layout,
}

impl From<FeatureArg> for FeatureType {
    fn from(arg: FeatureArg) -> Self {
        match arg {
            FeatureArg::Tables => Self::Tables,
            FeatureArg::Forms => Self::Forms,
            FeatureArg::Queries => Self::Queries,
            FeatureArg::Signatures => Self::Signatures,
            FeatureArg::Layout => Self::Layout,
        }
    }
}

/// Kinds of asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum JobKind {
    Text,
    Analysis,
    Expense,
    Lending,
    /// Grouped summary of a finished lending job.
    LendingSummary,
}

/// Analysis options shared by `analyze` and `start analysis`.
#[derive(Debug, Clone, Default, Args)]
pub struct AnalysisArgs {
    /// Features to extract (comma separated).
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub features: Vec<FeatureArg>,

    /// Question to answer, optionally prefixed with `ALIAS=`.  Implies `queries`.
    #[arg(short, long = "query")]
    pub queries: Vec<String>,

    /// Custom adapter as `ADAPTER_ID:VERSION`.
    #[arg(long = "adapter")]
    pub adapters: Vec<String>,
}

impl AnalysisArgs {
    fn feature_types(&self) -> Vec<FeatureType> {
        let mut features: Vec<FeatureType> = Vec::new();
        for feature in &self.features {
            let feature = FeatureType::from(*feature);
            if !features.contains(&feature) {
                features.push(feature);
            }
        }
        if !self.queries.is_empty() && !features.contains(&FeatureType::Queries) {
            features.push(FeatureType::Queries);
        }
        features
    }

    fn adapters_config(&self) -> Result<Option<AdaptersConfig>> {
        if self.adapters.is_empty() {
            return Ok(None);
        }
        let adapters = self
            .adapters
            .iter()
            .map(|raw| match raw.split_once(':') {
                Some((id, version)) if !id.is_empty() && !version.is_empty() => {
                    Ok(Adapter::new(id, version))
                }
                _ => Err(TextwerkError::Config(format!(
                    "adapter '{raw}' must be ADAPTER_ID:VERSION"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(AdaptersConfig { adapters }))
    }
}

#[derive(Debug, Clone, Args)]
pub struct StartArgs {
    #[arg(value_enum)]
    pub kind: JobKind,

    /// Local file (stub only) or `s3://bucket/key`.
    pub input: Input,

    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Idempotency token; starting twice with the same token returns the same job.
    #[arg(long)]
    pub token: Option<String>,

    /// Free-form tag echoed in completion notifications.
    #[arg(long)]
    pub job_tag: Option<String>,

    /// Poll until the job finishes and print its first page.
    #[arg(long)]
    pub wait: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum AdapterCommand {
    /// List adapters.
    List,
    /// List versions, optionally of one adapter.
    Versions {
        #[arg(long)]
        adapter_id: Option<String>,
    },
    /// Create an adapter.
    Create {
        #[arg(long)]
        name: String,
        #[arg(short, long, value_enum, value_delimiter = ',', required = true)]
        features: Vec<FeatureArg>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show one adapter.
    Get { adapter_id: String },
    /// Delete an adapter.
    Delete { adapter_id: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Write the default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

// ---------------------------------------------------------------------------
// Synchronous analysis
// ---------------------------------------------------------------------------

pub async fn detect(session: &Session, input: &Input) -> Result<Value> {
    let request = DetectDocumentTextRequest::new(input.document()?);
    to_json(session.client().detect_document_text(&request).await?)
}

pub async fn analyze(session: &Session, input: &Input, args: &AnalysisArgs) -> Result<Value> {
    let request = AnalyzeDocumentRequest {
        queries_config: queries_config(&args.queries),
        adapters_config: args.adapters_config()?,
        ..AnalyzeDocumentRequest::new(input.document()?, args.feature_types())
    };
    to_json(session.client().analyze_document(&request).await?)
}

pub async fn expense(session: &Session, input: &Input) -> Result<Value> {
    let request = AnalyzeExpenseRequest::new(input.document()?);
    to_json(session.client().analyze_expense(&request).await?)
}

pub async fn identity(session: &Session, inputs: &[Input]) -> Result<Value> {
    let pages = inputs
        .iter()
        .map(Input::document)
        .collect::<Result<Vec<_>>>()?;
    to_json(session.client().analyze_id(&AnalyzeIdRequest::new(pages)).await?)
}

// ---------------------------------------------------------------------------
// Asynchronous jobs
// ---------------------------------------------------------------------------

pub async fn start(session: &Session, args: &StartArgs) -> Result<Value> {
    let location = session.location(&args.input)?;
    let client = session.client();
    let started = match args.kind {
        JobKind::Text => {
            let request = StartDocumentTextDetectionRequest {
                client_request_token: args.token.clone(),
                job_tag: args.job_tag.clone(),
                ..StartDocumentTextDetectionRequest::new(location)
            };
            client.start_document_text_detection(&request).await?
        }
        JobKind::Analysis => {
            let request = StartDocumentAnalysisRequest {
                client_request_token: args.token.clone(),
                job_tag: args.job_tag.clone(),
                queries_config: queries_config(&args.analysis.queries),
                adapters_config: args.analysis.adapters_config()?,
                ..StartDocumentAnalysisRequest::new(location, args.analysis.feature_types())
            };
            client.start_document_analysis(&request).await?
        }
        JobKind::Expense => {
            let request = StartExpenseAnalysisRequest {
                client_request_token: args.token.clone(),
                job_tag: args.job_tag.clone(),
                ..StartExpenseAnalysisRequest::new(location)
            };
            client.start_expense_analysis(&request).await?
        }
        JobKind::Lending => {
            let request = StartLendingAnalysisRequest {
                client_request_token: args.token.clone(),
                job_tag: args.job_tag.clone(),
                ..StartLendingAnalysisRequest::new(location)
            };
            client.start_lending_analysis(&request).await?
        }
        JobKind::LendingSummary => {
            return Err(TextwerkError::Config(
                "lending-summary is read from a lending job; start `lending` instead".into(),
            ));
        }
    };

    let job_id = started.job_id.ok_or_else(|| TextwerkError::Decode {
        operation: format!("{:?}", args.kind),
        detail: "response carried no JobId".into(),
    })?;
    info!(job_id = %job_id, kind = ?args.kind, "job started");

    if !args.wait {
        return Ok(json!({ "JobId": job_id }));
    }
    let result = wait(session, args.kind, &job_id).await?;
    Ok(json!({ "JobId": job_id, "Result": result }))
}

/// Poll until the job finishes.  Transient failures are retried with
/// backoff; anything else is returned as is.
pub async fn wait(session: &Session, kind: JobKind, job_id: &str) -> Result<Value> {
    let client = session.client();
    match kind {
        JobKind::Text => {
            outcome_json(wait_retrying::<GetDocumentTextDetectionRequest>(client, job_id).await?)
        }
        JobKind::Analysis => {
            outcome_json(wait_retrying::<GetDocumentAnalysisRequest>(client, job_id).await?)
        }
        JobKind::Expense => {
            outcome_json(wait_retrying::<GetExpenseAnalysisRequest>(client, job_id).await?)
        }
        JobKind::Lending => {
            outcome_json(wait_retrying::<GetLendingAnalysisRequest>(client, job_id).await?)
        }
        JobKind::LendingSummary => {
            outcome_json(wait_retrying::<GetLendingAnalysisSummaryRequest>(client, job_id).await?)
        }
    }
}

async fn wait_retrying<R: JobQuery>(
    client: &TextwerkClient,
    job_id: &str,
) -> Result<JobOutcome<R::Output>> {
    let policy = RetryConfig::default();
    let mut attempt = 0;
    loop {
        match client.wait_for_job::<R>(job_id).await {
            Ok(outcome) => return Ok(outcome),
            Err(err) => match retry::should_retry(&err, attempt, &policy) {
                RetryDecision::RetryAfter(delay) => {
                    warn!(job_id, attempt, error = %err, "retrying after {delay:?}");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                RetryDecision::GiveUp(_) | RetryDecision::Exhausted => return Err(err),
            },
        }
    }
}

fn outcome_json<T: Serialize>(outcome: JobOutcome<T>) -> Result<Value> {
    if let JobOutcome::PartialSuccess {
        status_message,
        warnings,
        ..
    } = &outcome
    {
        warn!(
            message = status_message.as_deref().unwrap_or_default(),
            warnings = warnings.len(),
            "job finished with partial success"
        );
    }
    to_json(outcome.into_result())
}

/// Every page of a finished job, as a JSON array.
pub async fn results(
    session: &Session,
    kind: JobKind,
    job_id: &str,
    max_results: Option<u32>,
) -> Result<Value> {
    let client = session.client();
    let job_id = job_id.to_owned();
    match kind {
        JobKind::Text => {
            all_pages(client, GetDocumentTextDetectionRequest {
                job_id,
                max_results,
                next_token: None,
            })
            .await
        }
        JobKind::Analysis => {
            all_pages(client, GetDocumentAnalysisRequest {
                job_id,
                max_results,
                next_token: None,
            })
            .await
        }
        JobKind::Expense => {
            all_pages(client, GetExpenseAnalysisRequest {
                job_id,
                max_results,
                next_token: None,
            })
            .await
        }
        JobKind::Lending => {
            all_pages(client, GetLendingAnalysisRequest {
                job_id,
                max_results,
                next_token: None,
            })
            .await
        }
        JobKind::LendingSummary => {
            let summary = client
                .get_lending_analysis_summary(&GetLendingAnalysisSummaryRequest { job_id })
                .await?;
            Ok(Value::Array(vec![to_json(summary)?]))
        }
    }
}

async fn all_pages<R: Paginated>(client: &TextwerkClient, request: R) -> Result<Value>
where
    R::Output: Serialize,
{
    let mut paginator = client.paginate(request);
    let pages = paginator.collect_all().await?;
    info!(operation = R::NAME, pages = pages.len(), "all pages fetched");
    to_json(pages)
}

// ---------------------------------------------------------------------------
// Adapters
// ---------------------------------------------------------------------------

pub async fn adapters(session: &Session, command: &AdapterCommand) -> Result<Value> {
    let client = session.client();
    match command {
        AdapterCommand::List => {
            let pages = client
                .paginate(ListAdaptersRequest::default())
                .collect_all()
                .await?;
            let adapters: Vec<_> = pages.into_iter().flat_map(|p| p.adapters).collect();
            to_json(adapters)
        }
        AdapterCommand::Versions { adapter_id } => {
            let pages = client
                .paginate(ListAdapterVersionsRequest {
                    adapter_id: adapter_id.clone(),
                    ..ListAdapterVersionsRequest::default()
                })
                .collect_all()
                .await?;
            let versions: Vec<_> = pages.into_iter().flat_map(|p| p.adapter_versions).collect();
            to_json(versions)
        }
        AdapterCommand::Create {
            name,
            features,
            description,
        } => {
            let request = CreateAdapterRequest {
                adapter_name: name.clone(),
                feature_types: features.iter().copied().map(FeatureType::from).collect(),
                description: description.clone(),
                ..CreateAdapterRequest::default()
            };
            to_json(client.create_adapter(&request).await?)
        }
        AdapterCommand::Get { adapter_id } => {
            let request = GetAdapterRequest {
                adapter_id: adapter_id.clone(),
            };
            to_json(client.get_adapter(&request).await?)
        }
        AdapterCommand::Delete { adapter_id } => {
            client
                .delete_adapter(&DeleteAdapterRequest {
                    adapter_id: adapter_id.clone(),
                })
                .await?;
            Ok(json!({ "Deleted": adapter_id }))
        }
    }
}

// ---------------------------------------------------------------------------
// Stub server and configuration
// ---------------------------------------------------------------------------

/// Serve the stub over HTTP until Ctrl-C.
pub async fn serve_stub(addr: SocketAddr, polls_before_complete: u32) -> Result<Value> {
    let service = Arc::new(StubService::new(StubConfig {
        polls_before_complete,
        ..StubConfig::default()
    }));
    let server = StubServer::bind(Arc::clone(&service), addr).await?;
    eprintln!("stub service listening on {}", server.endpoint());

    tokio::signal::ctrl_c().await?;
    let endpoint = server.endpoint();
    server.shutdown().await?;
    Ok(json!({
        "Endpoint": endpoint,
        "RequestsServed": service.requests_served(),
    }))
}

pub fn config(options: &ConnectOptions, command: &ConfigCommand) -> Result<Value> {
    match command {
        ConfigCommand::Show => to_json(resolve_config(options)?),
        ConfigCommand::Init { force } => {
            let path = options.config_path();
            if path.exists() && !force {
                return Err(TextwerkError::Config(format!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                )));
            }
            ClientConfig::default().save(&path)?;
            info!(path = %path.display(), "config written");
            Ok(json!({ "Written": path.display().to_string() }))
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}
