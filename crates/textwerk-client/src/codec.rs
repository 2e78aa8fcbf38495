// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON-1.1 request encoder and response decoder.
//
// Success bodies decode straight into the operation's output type.  Error
// bodies carry the error code in `__type` (as `namespace#Code`) or in the
// `x-amzn-ErrorType` header (as `Code:extra`), the text in `message` or
// `Message`, and quota metadata on quota errors.

use serde::{Deserialize, Serialize};
use tracing::debug;

use textwerk_core::error::{QuotaDetails, Result, ServiceError, TextwerkError};
use textwerk_core::operation::Operation;

use crate::transport::{ERROR_TYPE_HEADER, REQUEST_ID_HEADER, WireRequest, WireResponse};

/// Code used when neither the body nor the headers name the error.
pub const UNKNOWN_ERROR_CODE: &str = "UnknownError";

/// Serialize a request.  Validation happens before this, in the client.
pub fn encode_request<R: Operation>(request: &R) -> Result<WireRequest> {
    let body = serde_json::to_vec(request)
        .map_err(|e| TextwerkError::Encode(format!("{}: {e}", R::NAME)))?;
    debug!(operation = R::NAME, bytes = body.len(), "encoded request");
    Ok(WireRequest::new(R::NAME, body))
}

/// Decode a 2xx body.  An empty body is treated as `{}`.
pub fn decode_response<R: Operation>(response: &WireResponse) -> Result<R::Output> {
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &response.body
    };
    serde_json::from_slice(body).map_err(|e| TextwerkError::Decode {
        operation: R::NAME.to_owned(),
        detail: e.to_string(),
    })
}

/// Members of an error body.  Anything else in the body is ignored.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "__type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Some services capitalise the member; bodies may carry both spellings.
    #[serde(rename = "Message", default, skip_serializing)]
    pub capitalised_message: Option<String>,
    #[serde(rename = "ResourceType", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(rename = "QuotaCode", default, skip_serializing_if = "Option::is_none")]
    pub quota_code: Option<String>,
    #[serde(rename = "ServiceCode", default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
}

/// Map a non-2xx response to a `ServiceError`.  Never fails: an unreadable
/// body still yields an error carrying the status and a generic code.
pub fn decode_error(response: &WireResponse) -> ServiceError {
    let body: ErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();

    let code = response
        .header(ERROR_TYPE_HEADER)
        .and_then(|raw| raw.split(':').next())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .or_else(|| {
            body.error_type
                .as_deref()
                .and_then(|raw| raw.rsplit('#').next())
                .filter(|c| !c.is_empty())
        })
        .unwrap_or(if response.status >= 500 {
            "InternalServerError"
        } else {
            UNKNOWN_ERROR_CODE
        })
        .to_owned();

    let message = body
        .message
        .clone()
        .or_else(|| body.capitalised_message.clone())
        .unwrap_or_else(|| String::from_utf8_lossy(&response.body).trim().to_owned());

    let mut error = ServiceError::new(code, message, response.status);
    if body.resource_type.is_some() || body.quota_code.is_some() || body.service_code.is_some() {
        error = error.with_quota(QuotaDetails {
            resource_type: body.resource_type,
            quota_code: body.quota_code,
            service_code: body.service_code,
        });
    }
    if let Some(request_id) = response.header(REQUEST_ID_HEADER) {
        error = error.with_request_id(request_id);
    }
    error
}

/// Encode `error` the way the service does.  Used by stub servers.
pub fn encode_error(error: &ServiceError) -> WireResponse {
    let (resource_type, quota_code, service_code) = match &error.quota {
        Some(q) => (
            q.resource_type.clone(),
            q.quota_code.clone(),
            q.service_code.clone(),
        ),
        None => (None, None, None),
    };
    let body = ErrorBody {
        error_type: Some(format!("com.amazonaws.textract#{}", error.code)),
        message: Some(error.message.clone()),
        capitalised_message: None,
        resource_type,
        quota_code,
        service_code,
    };
    let mut response = WireResponse::new(
        error.status,
        serde_json::to_vec(&body).unwrap_or_default(),
    )
    .with_header(ERROR_TYPE_HEADER, error.code.clone());
    if let Some(request_id) = &error.request_id {
        response = response.with_header(REQUEST_ID_HEADER, request_id.clone());
    }
    response
}
