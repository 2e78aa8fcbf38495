// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command line.
//
// Every technical error is mapped to a one-line summary and a concrete
// suggestion.  The severity decides how the CLI presents it and which exit
// code it uses.

use crate::error::{ServiceError, ServiceErrorKind, TextwerkError};

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Throttling, timeout, service hiccup: trying again later may work.
    Transient,
    /// Something must change first: the request, credentials, or config.
    ActionRequired,
    /// Cannot be fixed by retrying: the document or job itself is bad.
    Permanent,
}

/// A human-readable error with a plain summary and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// One-line summary.
    pub message: String,
    /// What to try next.
    pub suggestion: String,
    /// Whether retrying unchanged may succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn transient(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: true,
            severity: Severity::Transient,
        }
    }

    fn action(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: false,
            severity: Severity::ActionRequired,
        }
    }

    fn permanent(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: false,
            severity: Severity::Permanent,
        }
    }
}

/// Convert a `TextwerkError` into a `HumanError`.
pub fn humanize_error(err: &TextwerkError) -> HumanError {
    match err {
        TextwerkError::Validation(v) => HumanError::action(
            format!("The request is invalid: {} {}.", v.field, v.reason),
            "Fix the named field; nothing was sent to the service.",
        ),

        TextwerkError::Encode(detail) => HumanError::permanent(
            "The request could not be encoded.",
            format!("This is a client bug; please report it. ({detail})"),
        ),

        TextwerkError::Service(service) => humanize_service_error(service),

        TextwerkError::Transport(detail) => {
            let lower = detail.to_ascii_lowercase();
            if lower.contains("timed out") || lower.contains("timeout") {
                HumanError::transient(
                    "The service didn't respond in time.",
                    "Try again, or raise request_timeout_secs in the config.",
                )
            } else if lower.contains("connection refused") || lower.contains("dns") {
                HumanError::action(
                    "Couldn't reach the service endpoint.",
                    "Check the endpoint in your config and your network connection.",
                )
            } else {
                HumanError::transient(
                    "The connection to the service failed.",
                    format!("Try again in a moment. ({detail})"),
                )
            }
        }

        TextwerkError::Decode { operation, .. } => HumanError::permanent(
            format!("The {operation} response was not understood."),
            "The endpoint may not be a document-analysis service, or a proxy altered the response.",
        ),

        TextwerkError::JobFailed { status_message, .. } => HumanError::permanent(
            "The analysis job failed.",
            match status_message {
                Some(message) => format!("The service said: {message}"),
                None => "Check that the input document is readable and supported.".into(),
            },
        ),

        TextwerkError::UnexpectedJobStatus { status, .. } => HumanError::permanent(
            format!("The job reported a status this client doesn't know ('{status}')."),
            "Upgrade textwerk; the service may have added a new job state.",
        ),

        TextwerkError::PollLimitExceeded { attempts, .. } => HumanError::transient(
            format!("The job was still running after {attempts} checks."),
            "Wait a little longer, then fetch the results with the job id.",
        ),

        TextwerkError::Pagination(detail) => HumanError::permanent(
            "The service returned a repeating page sequence.",
            format!("Results were cut short to avoid looping forever. ({detail})"),
        ),

        TextwerkError::Config(detail) => HumanError::action(
            "The configuration is invalid.",
            format!("Edit the config file or environment overrides. ({detail})"),
        ),

        TextwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError::action(
                "The file couldn't be found.",
                "Check the path and try again.",
            ),
            std::io::ErrorKind::PermissionDenied => HumanError::action(
                "Permission denied reading or writing a file.",
                "Check the file permissions.",
            ),
            _ => HumanError::transient(
                "There was a problem reading or writing a file.",
                "Try again. If this keeps happening, check free disk space.",
            ),
        },

        TextwerkError::Serialization(_) => HumanError::permanent(
            "A file or response contained malformed JSON.",
            "Check the file contents; if it came from the service, please report it.",
        ),
    }
}

fn humanize_service_error(err: &ServiceError) -> HumanError {
    match (err.kind, err.code.as_str()) {
        (_, "BadDocumentException") => HumanError::permanent(
            "The service couldn't read this document.",
            "Make sure the file is a valid PDF, TIFF, JPEG or PNG and isn't password protected.",
        ),
        (_, "DocumentTooLargeException") => HumanError::action(
            "The document is too large.",
            "Synchronous calls take up to 10 MB; upload to S3 and start an asynchronous job instead.",
        ),
        (_, "UnsupportedDocumentException") => HumanError::permanent(
            "This document format isn't supported.",
            "Convert it to PDF, TIFF, JPEG or PNG first.",
        ),
        (_, "IdempotentParameterMismatchException") => HumanError::action(
            "That client request token was already used with different parameters.",
            "Use a new token, or resend exactly the original request.",
        ),
        (ServiceErrorKind::Validation, _) => HumanError::action(
            "The service rejected the request.",
            err.message.clone(),
        ),
        (ServiceErrorKind::Throttling, _) => {
            let quota = err
                .quota
                .as_ref()
                .and_then(|q| q.quota_code.as_deref())
                .map(|code| format!(" (quota {code})"))
                .unwrap_or_default();
            HumanError::transient(
                format!("Request rate or quota exceeded{quota}."),
                "Slow down and retry with backoff, or request a quota increase.",
            )
        }
        (ServiceErrorKind::AccessDenied, _) => HumanError::action(
            "Access denied.",
            "Check the credentials your signing proxy uses and their permissions.",
        ),
        (ServiceErrorKind::NotFound, _) => HumanError::action(
            "The job or resource doesn't exist.",
            "Check the id; job results expire after a few days.",
        ),
        (ServiceErrorKind::Service, _) => HumanError::transient(
            "The service had an internal problem.",
            format!("Try again later. ({}: {})", err.code, err.message),
        ),
    }
}
