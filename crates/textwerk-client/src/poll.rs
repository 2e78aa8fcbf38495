// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Asynchronous job lifecycle.
//
//   IN_PROGRESS --> SUCCEEDED | PARTIAL_SUCCESS | FAILED
//
// `wait` polls a Get* operation at a fixed interval until the job leaves
// IN_PROGRESS.  Errors from individual polls are returned unmodified.
// Dropping the future stops polling.

use std::time::Duration;

use tracing::{debug, info, warn};

use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::model::{JobStatus, Warning};
use textwerk_core::operation::{JobQuery, JobResult};

use crate::client::TextwerkClient;

/// Terminal, non-failed state of a job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome<T> {
    Succeeded(T),
    /// Some pages could not be processed; `warnings` names them.
    PartialSuccess {
        result: T,
        status_message: Option<String>,
        warnings: Vec<Warning>,
    },
}

impl<T> JobOutcome<T> {
    pub fn result(&self) -> &T {
        match self {
            Self::Succeeded(result) | Self::PartialSuccess { result, .. } => result,
        }
    }

    pub fn into_result(self) -> T {
        match self {
            Self::Succeeded(result) | Self::PartialSuccess { result, .. } => result,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialSuccess { .. })
    }
}

pub(crate) async fn wait<R: JobQuery>(
    client: &TextwerkClient,
    request: R,
    job_id: &str,
) -> Result<JobOutcome<R::Output>> {
    let interval = Duration::from_millis(client.config().poll_interval_ms);
    let limit = client.config().max_poll_attempts;
    if limit == Some(0) {
        return Err(TextwerkError::Config(
            "max poll attempts must be at least 1".into(),
        ));
    }
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        let response = client.send(&request).await?;

        match response.job_status() {
            Some(JobStatus::InProgress) => {
                if limit.is_some_and(|max| attempts >= max) {
                    warn!(job_id, attempts, "job still in progress at poll limit");
                    return Err(TextwerkError::PollLimitExceeded {
                        job_id: job_id.to_owned(),
                        attempts,
                    });
                }
                debug!(job_id, attempts, "job in progress");
                tokio::time::sleep(interval).await;
            }
            Some(JobStatus::Succeeded) => {
                info!(job_id, attempts, "job succeeded");
                return Ok(JobOutcome::Succeeded(response));
            }
            Some(JobStatus::PartialSuccess) => {
                let status_message = response.status_message().map(str::to_owned);
                let warnings = response.warnings().to_vec();
                info!(job_id, attempts, warnings = warnings.len(), "job partially succeeded");
                return Ok(JobOutcome::PartialSuccess {
                    result: response,
                    status_message,
                    warnings,
                });
            }
            Some(JobStatus::Failed) => {
                let status_message = response.status_message().map(str::to_owned);
                info!(job_id, attempts, "job failed");
                return Err(TextwerkError::JobFailed {
                    job_id: job_id.to_owned(),
                    status_message,
                });
            }
            Some(JobStatus::Unknown(status)) => {
                warn!(job_id, status = %status, "unrecognised job status");
                return Err(TextwerkError::UnexpectedJobStatus {
                    job_id: job_id.to_owned(),
                    status: status.clone(),
                });
            }
            None => {
                warn!(job_id, "response carried no job status");
                return Err(TextwerkError::UnexpectedJobStatus {
                    job_id: job_id.to_owned(),
                    status: String::from("<missing>"),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use textwerk_core::config::ClientConfig;
    use textwerk_core::model::{GetDocumentAnalysisRequest, GetDocumentTextDetectionRequest};

    use crate::transport::{Transport, WireRequest, WireResponse};

    /// Answers every poll from a fixed list of status bodies.
    struct Statuses {
        bodies: Mutex<Vec<&'static str>>,
        polls: Mutex<u32>,
    }

    #[async_trait]
    impl Transport for Statuses {
        async fn send(&self, _request: WireRequest) -> Result<WireResponse> {
            *self.polls.lock().expect("lock") += 1;
            let mut bodies = self.bodies.lock().expect("lock");
            let body = if bodies.len() > 1 {
                bodies.remove(0)
            } else {
                bodies[0]
            };
            Ok(WireResponse::new(200, body.as_bytes().to_vec()))
        }
    }

    fn client(bodies: Vec<&'static str>, max_polls: Option<u32>) -> (TextwerkClient, Arc<Statuses>) {
        let transport = Arc::new(Statuses {
            bodies: Mutex::new(bodies),
            polls: Mutex::new(0),
        });
        let config = ClientConfig {
            poll_interval_ms: 1,
            max_poll_attempts: max_polls,
            ..ClientConfig::default()
        };
        (
            TextwerkClient::with_transport(transport.clone(), config),
            transport,
        )
    }

    const IN_PROGRESS: &str = r#"{"JobStatus":"IN_PROGRESS"}"#;

    #[tokio::test]
    async fn polls_until_succeeded() {
        let (client, transport) = client(
            vec![IN_PROGRESS, IN_PROGRESS, r#"{"JobStatus":"SUCCEEDED","Blocks":[{"Id":"p"}]}"#],
            None,
        );
        let outcome = client
            .wait_for_job::<GetDocumentAnalysisRequest>("job-1")
            .await
            .expect("outcome");
        assert!(!outcome.is_partial());
        assert_eq!(outcome.result().blocks.len(), 1);
        assert_eq!(*transport.polls.lock().expect("lock"), 3);
    }

    #[tokio::test]
    async fn partial_success_carries_warnings() {
        let (client, _) = client(
            vec![r#"{"JobStatus":"PARTIAL_SUCCESS","StatusMessage":"page 2 unreadable","Warnings":[{"ErrorCode":"UNREADABLE","Pages":[2]}]}"#],
            None,
        );
        match client
            .wait_for_job::<GetDocumentTextDetectionRequest>("job-2")
            .await
            .expect("outcome")
        {
            JobOutcome::PartialSuccess {
                status_message,
                warnings,
                ..
            } => {
                assert_eq!(status_message.as_deref(), Some("page 2 unreadable"));
                assert_eq!(warnings[0].pages, vec![2]);
            }
            other => panic!("expected partial success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_job_is_an_error() {
        let (client, _) = client(
            vec![r#"{"JobStatus":"FAILED","StatusMessage":"unsupported format"}"#],
            None,
        );
        let err = client
            .wait_for_job::<GetDocumentAnalysisRequest>("job-3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TextwerkError::JobFailed { ref job_id, status_message: Some(ref m) }
                if job_id == "job-3" && m == "unsupported format"
        ));
    }

    #[tokio::test]
    async fn unknown_status_stops_polling() {
        let (client, transport) = client(vec![r#"{"JobStatus":"QUEUED"}"#], None);
        let err = client
            .wait_for_job::<GetDocumentAnalysisRequest>("job-4")
            .await
            .unwrap_err();
        assert!(matches!(err, TextwerkError::UnexpectedJobStatus { ref status, .. } if status == "QUEUED"));
        assert_eq!(*transport.polls.lock().expect("lock"), 1);
    }

    #[tokio::test]
    async fn zero_poll_limit_sends_nothing() {
        let (client, transport) = client(vec![IN_PROGRESS], Some(0));
        let err = client
            .wait_for_job::<GetDocumentAnalysisRequest>("job-6")
            .await
            .unwrap_err();
        assert!(matches!(err, TextwerkError::Config(_)));
        assert_eq!(*transport.polls.lock().expect("lock"), 0);
    }

    #[tokio::test]
    async fn poll_limit_is_enforced() {
        let (client, transport) = client(vec![IN_PROGRESS], Some(3));
        let err = client
            .wait_for_job::<GetDocumentAnalysisRequest>("job-5")
            .await
            .unwrap_err();
        assert!(matches!(err, TextwerkError::PollLimitExceeded { attempts: 3, .. }));
        assert_eq!(*transport.polls.lock().expect("lock"), 3);
    }

    #[tokio::test]
    async fn wait_for_keeps_caller_members() {
        let (client, _) = client(vec![r#"{"JobStatus":"SUCCEEDED"}"#], None);
        let request = GetDocumentAnalysisRequest {
            job_id: "job-6".into(),
            max_results: Some(10),
            next_token: None,
        };
        let outcome = client.wait_for(request).await.expect("outcome");
        assert!(matches!(outcome, JobOutcome::Succeeded(_)));
    }
}
