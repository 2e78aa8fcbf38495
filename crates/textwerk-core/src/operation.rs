// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binding between request types, their wire operation names, and their
// response types.  The client is generic over these traits, so adding an
// operation means adding a request/response pair and one `operation!` line.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::model::{JobStatus, Warning};
use crate::validate::Validate;

/// A request that can be sent to the service.
pub trait Operation: Serialize + Validate + Send + Sync {
    /// Wire name, sent as `X-Amz-Target: Textract.<NAME>`.
    const NAME: &'static str;

    type Output: DeserializeOwned + Send;
}

/// Responses that may continue on another page.
pub trait HasNextToken {
    fn raw_next_token(&self) -> Option<&str>;

    /// The continuation token; an empty token counts as absent.
    fn next_token(&self) -> Option<&str> {
        self.raw_next_token().filter(|t| !t.is_empty())
    }
}

/// Requests whose responses are paged with `NextToken`.
pub trait Paginated: Operation<Output: HasNextToken> + Clone {
    fn next_token(&self) -> Option<&str>;

    /// Replace only the continuation token, leaving every other member alone.
    fn set_next_token(&mut self, token: Option<String>);
}

/// Responses of the Get* calls that report asynchronous job state.
pub trait JobResult {
    fn job_status(&self) -> Option<&JobStatus>;
    fn status_message(&self) -> Option<&str>;
    fn warnings(&self) -> &[Warning];
}

/// Requests that read the state of a job by id.
pub trait JobQuery: Operation<Output: JobResult> {
    fn for_job(job_id: &str) -> Self;
}

/// `operation!(Request => Response, "WireName");`
macro_rules! operation {
    ($request:ty => $response:ty, $name:literal) => {
        impl $crate::operation::Operation for $request {
            const NAME: &'static str = $name;
            type Output = $response;
        }
    };
}

/// `paginated!(Request => Response);` for types with a `next_token` member.
macro_rules! paginated {
    ($request:ty => $response:ty) => {
        impl $crate::operation::HasNextToken for $response {
            fn raw_next_token(&self) -> Option<&str> {
                self.next_token.as_deref()
            }
        }

        impl $crate::operation::Paginated for $request {
            fn next_token(&self) -> Option<&str> {
                self.next_token.as_deref()
            }

            fn set_next_token(&mut self, token: Option<String>) {
                self.next_token = token;
            }
        }
    };
}

/// `job_query!(Request => Response);` for Get* calls keyed by `job_id`.
macro_rules! job_query {
    ($request:ident => $response:ty) => {
        impl $crate::operation::JobResult for $response {
            fn job_status(&self) -> Option<&$crate::model::JobStatus> {
                self.job_status.as_ref()
            }

            fn status_message(&self) -> Option<&str> {
                self.status_message.as_deref()
            }

            fn warnings(&self) -> &[$crate::model::Warning] {
                &self.warnings
            }
        }

        impl $crate::operation::JobQuery for $request {
            fn for_job(job_id: &str) -> Self {
                $request {
                    job_id: job_id.to_owned(),
                    ..Default::default()
                }
            }
        }
    };
}

pub(crate) use {job_query, operation, paginated};
