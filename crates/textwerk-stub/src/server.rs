// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Loopback HTTP front end for `StubService`.
//
// The server speaks just enough HTTP/1.1 for the client's `HttpTransport`:
// one POST per connection, the operation named by `X-Amz-Target:
// Textract.<Operation>`, a JSON body of exactly `Content-Length` bytes, and
// a response with `Connection: close`.  The request path is ignored.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use textwerk_client::codec;
use textwerk_client::transport::{JSON_CONTENT_TYPE, TARGET_HEADER, TARGET_PREFIX, WireResponse};
use textwerk_core::error::{Result, ServiceError, TextwerkError};

use crate::service::{INVALID_PARAMETER, StubService, UNKNOWN_OPERATION};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest request accepted.  Inline documents are base64, so this leaves
/// room above the 10 MiB document limit.
const MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

/// Largest header block accepted.
const MAX_HEADER_BYTES: usize = 16 * 1024;

// ---------------------------------------------------------------------------
// Minimal HTTP request parser
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
struct RequestHead {
    content_length: usize,
    /// Operation name from `X-Amz-Target`, without the service prefix.
    operation: Option<String>,
}

/// Parse the header block (everything before the blank line).
fn parse_head(head: &[u8]) -> std::result::Result<RequestHead, String> {
    let text = std::str::from_utf8(head).map_err(|_| "request headers are not UTF-8".to_owned())?;
    let mut lines = text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    if !request_line.starts_with("POST ") {
        return Err(format!("unsupported request line: {request_line}"));
    }

    let mut content_length = 0;
    let mut operation = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value
                .parse()
                .map_err(|_| format!("bad Content-Length: {value}"))?;
        } else if name.eq_ignore_ascii_case(TARGET_HEADER) {
            operation = value
                .strip_prefix(TARGET_PREFIX)
                .and_then(|rest| rest.strip_prefix('.'))
                .map(str::to_owned);
        }
    }
    Ok(RequestHead {
        content_length,
        operation,
    })
}

/// Find the first occurrence of `needle` in `haystack`.
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

// ---------------------------------------------------------------------------
// StubServer
// ---------------------------------------------------------------------------

/// Stub service listening on a TCP socket.
///
/// Dropping the server without calling [`StubServer::shutdown`] leaves the
/// accept loop running until the runtime stops.
pub struct StubServer {
    local_addr: SocketAddr,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<()>>,
    active_connections: Arc<AtomicU32>,
}

impl StubServer {
    /// Bind `addr` and start accepting connections.  Port 0 picks a free
    /// port; see [`StubServer::local_addr`].
    pub async fn bind(service: Arc<StubService>, addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TextwerkError::Transport(format!("bind {addr}: {e}")))?;
        let local_addr = listener.local_addr()?;
        info!(addr = %local_addr, "stub service listening");

        let shutdown_signal = Arc::new(Notify::new());
        let active_connections = Arc::new(AtomicU32::new(0));
        let shutdown = Arc::clone(&shutdown_signal);
        let connections = Arc::clone(&active_connections);
        let task_handle = tokio::spawn(async move {
            Self::accept_loop(listener, shutdown, service, connections).await;
        });

        Ok(Self {
            local_addr,
            shutdown_signal,
            task_handle: Some(task_handle),
            active_connections,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Endpoint URL for `ClientConfig::endpoint`.
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.local_addr)
    }

    pub fn active_connections(&self) -> u32 {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Stop accepting connections and wait for the accept loop to exit.
    /// Connections already being served run to completion.
    pub async fn shutdown(mut self) -> Result<()> {
        info!(addr = %self.local_addr, "stopping stub service");
        self.shutdown_signal.notify_one();
        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|e| TextwerkError::Transport(format!("accept loop: {e}")))?;
        }
        Ok(())
    }

    async fn accept_loop(
        listener: TcpListener,
        shutdown: Arc<Notify>,
        service: Arc<StubService>,
        active_connections: Arc<AtomicU32>,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    debug!("accept loop received shutdown signal");
                    break;
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            debug!(peer = %peer_addr, "incoming connection");
                            let service = Arc::clone(&service);
                            let connections = Arc::clone(&active_connections);
                            tokio::spawn(async move {
                                connections.fetch_add(1, Ordering::Relaxed);
                                if let Err(e) = Self::handle_connection(stream, peer_addr, &service).await {
                                    warn!(peer = %peer_addr, error = %e, "connection handler error");
                                }
                                connections.fetch_sub(1, Ordering::Relaxed);
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }
    }

    /// Read one request, answer it, close.
    async fn handle_connection(
        mut stream: TcpStream,
        peer_addr: SocketAddr,
        service: &StubService,
    ) -> Result<()> {
        let mut buf = Vec::with_capacity(8192);
        let mut chunk = [0u8; 8192];

        let header_end = loop {
            if let Some(end) = find_subsequence(&buf, b"\r\n\r\n") {
                break end;
            }
            if buf.len() > MAX_HEADER_BYTES {
                return reject(&mut stream, INVALID_PARAMETER, "request headers too large", 400).await;
            }
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                debug!(peer = %peer_addr, "connection closed before headers");
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
        };

        let head = match parse_head(&buf[..header_end]) {
            Ok(head) => head,
            Err(reason) => return reject(&mut stream, INVALID_PARAMETER, &reason, 400).await,
        };
        if head.content_length > MAX_REQUEST_BYTES {
            return reject(&mut stream, INVALID_PARAMETER, "request body too large", 413).await;
        }

        let body_start = header_end + 4;
        let mut body = buf.split_off(body_start.min(buf.len()));
        if body.len() < head.content_length {
            let missing = head.content_length - body.len();
            let mut rest = vec![0u8; missing];
            stream.read_exact(&mut rest).await?;
            body.extend_from_slice(&rest);
        }
        body.truncate(head.content_length);

        let Some(operation) = head.operation else {
            return reject(&mut stream, UNKNOWN_OPERATION, "missing X-Amz-Target header", 400).await;
        };
        debug!(peer = %peer_addr, operation = %operation, bytes = body.len(), "request received");

        let response = service.handle(&operation, &body);
        send_response(&mut stream, &response).await?;
        debug!(peer = %peer_addr, status = response.status, "response sent");
        Ok(())
    }
}

impl std::fmt::Debug for StubServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubServer")
            .field("local_addr", &self.local_addr)
            .field("active_connections", &self.active_connections())
            .finish()
    }
}

async fn reject(stream: &mut TcpStream, code: &str, message: &str, status: u16) -> Result<()> {
    warn!(code, message, "rejecting request");
    let response = codec::encode_error(&ServiceError::new(code, message, status));
    send_response(stream, &response).await
}

async fn send_response(stream: &mut TcpStream, response: &WireResponse) -> Result<()> {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {JSON_CONTENT_TYPE}\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason_phrase(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str("\r\n");

    stream.write_all(head.as_bytes()).await?;
    stream.write_all(&response.body).await?;
    stream.flush().await?;
    Ok(())
}
