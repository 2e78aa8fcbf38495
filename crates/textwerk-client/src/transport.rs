// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transport seam between the typed client and the network.
//
// A transport moves one encoded request to the service and returns the raw
// response.  It knows nothing about operations or JSON shapes; status codes
// and error bodies are interpreted by the codec.  `HttpTransport` is the
// production implementation; tests swap in an in-process stub.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, instrument};

use textwerk_core::config::ClientConfig;
use textwerk_core::error::{Result, TextwerkError};

/// Content type of every request and response body.
pub const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Header naming the operation, e.g. `Textract.AnalyzeDocument`.
pub const TARGET_HEADER: &str = "x-amz-target";

/// Service prefix of the target header value.
pub const TARGET_PREFIX: &str = "Textract";

pub const REQUEST_ID_HEADER: &str = "x-amzn-requestid";
pub const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

/// An encoded request ready for the wire.
#[derive(Clone)]
pub struct WireRequest {
    /// Operation name, e.g. `AnalyzeDocument`.
    pub operation: String,
    pub body: Vec<u8>,
}

impl WireRequest {
    pub fn new(operation: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            operation: operation.into(),
            body,
        }
    }

    /// Value of the `X-Amz-Target` header.
    pub fn target(&self) -> String {
        format!("{TARGET_PREFIX}.{}", self.operation)
    }
}

// Bodies may hold whole documents; print sizes only.
impl fmt::Debug for WireRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireRequest")
            .field("operation", &self.operation)
            .field("body", &format!("<{} bytes>", self.body.len()))
            .finish()
    }
}

/// A raw response as received from the wire.
#[derive(Debug, Clone, Default)]
pub struct WireResponse {
    pub status: u16,
    /// Header names are stored lower-case.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Case-insensitive header lookup; the first occurrence wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Moves one request to the service and back.
///
/// Implementations must be safe to share between tasks; the client holds
/// one behind an `Arc` and may issue calls concurrently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse>;
}

/// HTTPS transport over `reqwest`.
///
/// Requests are not signed.  Point `endpoint` at a signing proxy, or add the
/// headers it needs through `default_headers`.
pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TextwerkError::Config(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TextwerkError::Config(format!("header value for '{name}': {e}")))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| TextwerkError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, operation = %request.operation))]
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let target = request.target();
        debug!(bytes = request.body.len(), "POST");

        let response = self
            .http
            .post(&self.endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(TARGET_HEADER, target)
            .body(request.body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        debug!(status, bytes = body.len(), "response received");
        Ok(WireResponse {
            status,
            headers,
            body,
        })
    }
}

fn transport_error(err: reqwest::Error) -> TextwerkError {
    if err.is_timeout() {
        TextwerkError::Transport(format!("request timed out: {err}"))
    } else if err.is_connect() {
        TextwerkError::Transport(format!("connection failed: {err}"))
    } else {
        TextwerkError::Transport(err.to_string())
    }
}
