// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Textwerk.
//
// Every failure a caller can observe falls into one of four groups:
// client-side validation (nothing was sent), server-rejected or server-failed
// requests (`ServiceError`), transport and decoding problems, and
// asynchronous job failures discovered while polling.

use std::fmt;

use thiserror::Error;

/// Top-level error type for all Textwerk operations.
#[derive(Debug, Error)]
pub enum TextwerkError {
    // -- Before the request leaves the process --
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("failed to encode request: {0}")]
    Encode(String),

    // -- Remote service --
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode {operation} response: {detail}")]
    Decode { operation: String, detail: String },

    // -- Asynchronous jobs --
    #[error("job {job_id} failed: {}", .status_message.as_deref().unwrap_or("no status message"))]
    JobFailed {
        job_id: String,
        status_message: Option<String>,
    },

    #[error("job {job_id} reported unexpected status '{status}'")]
    UnexpectedJobStatus { job_id: String, status: String },

    #[error("job {job_id} still in progress after {attempts} polls")]
    PollLimitExceeded { job_id: String, attempts: u32 },

    #[error("pagination error: {0}")]
    Pagination(String),

    // -- Local configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TextwerkError>;

/// Classification of errors for caller-side retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Throttling, timeouts, 5xx: safe to try the same request again later.
    Transient,
    /// The caller must change something first (input, permissions, quota).
    UserAction,
    /// Retrying the same request cannot succeed.
    Permanent,
}

/// A request field that violates a client-side constraint.
///
/// `field` is the dotted path of the offending member as it appears on the
/// wire, e.g. `QueriesConfig.Queries[1].Pages[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Closed set of client-visible service error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    /// The service rejected the input (bad parameters, unreadable document,
    /// idempotency mismatch).
    Validation,
    /// Rate limit or quota exceeded.
    Throttling,
    /// Caller is not authorised for the operation or resource.
    AccessDenied,
    /// Unknown job id, adapter, or resource.
    NotFound,
    /// Internal service failure or an error code this client does not know.
    Service,
}

impl ServiceErrorKind {
    /// Map a raw service error code (e.g. `InvalidJobIdException`) to a kind.
    pub fn from_code(code: &str) -> Self {
        match code {
            "InvalidParameterException"
            | "ValidationException"
            | "BadDocumentException"
            | "DocumentTooLargeException"
            | "UnsupportedDocumentException"
            | "InvalidS3ObjectException"
            | "InvalidKMSKeyException"
            | "IdempotentParameterMismatchException"
            | "ConflictException" => Self::Validation,
            "ThrottlingException"
            | "ProvisionedThroughputExceededException"
            | "LimitExceededException"
            | "HumanLoopQuotaExceededException"
            | "ServiceQuotaExceededException" => Self::Throttling,
            "AccessDeniedException" => Self::AccessDenied,
            "InvalidJobIdException" | "ResourceNotFoundException" => Self::NotFound,
            _ => Self::Service,
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::Throttling => "throttling",
            Self::AccessDenied => "access denied",
            Self::NotFound => "not found",
            Self::Service => "service",
        };
        f.write_str(s)
    }
}

/// Which quota was hit, reported alongside quota-exceeded errors.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuotaDetails {
    pub resource_type: Option<String>,
    pub quota_code: Option<String>,
    pub service_code: Option<String>,
}

/// An error reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} ({kind}, HTTP {status}): {message}")]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    /// Raw error code, e.g. `ThrottlingException`.
    pub code: String,
    pub message: String,
    /// HTTP status of the response that carried the error.
    pub status: u16,
    pub request_id: Option<String>,
    pub quota: Option<QuotaDetails>,
}

impl ServiceError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        let code = code.into();
        Self {
            kind: ServiceErrorKind::from_code(&code),
            code,
            message: message.into(),
            status,
            request_id: None,
            quota: None,
        }
    }

    pub fn with_quota(mut self, quota: QuotaDetails) -> Self {
        self.quota = Some(quota);
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// 5xx responses and unknown codes.
    pub fn is_server_fault(&self) -> bool {
        self.status >= 500 || self.kind == ServiceErrorKind::Service
    }
}
