// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process transport: hands requests straight to a `StubService` and
// records them, so tests can assert on exactly what went over the wire.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use textwerk_client::codec;
use textwerk_client::transport::{Transport, WireRequest, WireResponse};
use textwerk_core::error::{Result, ServiceError};

use crate::service::StubService;

pub struct InProcessTransport {
    service: Arc<StubService>,
    requests: Mutex<Vec<WireRequest>>,
    injected: Mutex<VecDeque<ServiceError>>,
}

impl InProcessTransport {
    pub fn new(service: Arc<StubService>) -> Self {
        Self {
            service,
            requests: Mutex::new(Vec::new()),
            injected: Mutex::new(VecDeque::new()),
        }
    }

    pub fn service(&self) -> &Arc<StubService> {
        &self.service
    }

    /// Every request sent so far, oldest first.
    pub fn requests(&self) -> Vec<WireRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Answer the next request with `error` instead of calling the service.
    pub fn inject_error(&self, error: ServiceError) {
        lock(&self.injected).push_back(error);
    }
}

impl std::fmt::Debug for InProcessTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessTransport")
            .field("requests", &self.request_count())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        lock(&self.requests).push(request.clone());
        if let Some(error) = lock(&self.injected).pop_front() {
            debug!(operation = %request.operation, code = %error.code, "injected error");
            return Ok(codec::encode_error(&error));
        }
        Ok(self.service.handle(&request.operation, &request.body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_requests_and_serves_injected_errors() {
        let transport = InProcessTransport::new(Arc::new(StubService::default()));
        transport.inject_error(ServiceError::new("ThrottlingException", "slow down", 400));

        let first = transport
            .send(WireRequest::new("ListAdapters", b"{}".to_vec()))
            .await
            .expect("send");
        assert_eq!(codec::decode_error(&first).code, "ThrottlingException");

        let second = transport
            .send(WireRequest::new("ListAdapters", b"{}".to_vec()))
            .await
            .expect("send");
        assert!(second.is_success());
        assert_eq!(transport.request_count(), 2);
        assert_eq!(transport.service().requests_served(), 1);
    }
}
