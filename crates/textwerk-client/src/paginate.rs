// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Lazy, strictly sequential iteration over paged operations.
//
// Each follow-up request is the original request with only `NextToken`
// replaced.  The sequence ends after the first page without a token; an
// empty token counts as absent.  A server that hands back a token it has
// already issued gets a `Pagination` error instead of an endless loop.

use std::collections::HashSet;

use tracing::{debug, warn};

use textwerk_core::error::{Result, TextwerkError};
use textwerk_core::operation::{HasNextToken, Paginated};

use crate::client::TextwerkClient;

/// Page-by-page cursor over a paged operation.
///
/// Nothing is sent until `next_page` is awaited.
#[derive(Debug)]
pub struct Paginator<R: Paginated> {
    client: TextwerkClient,
    original: R,
    pending: Option<R>,
    seen_tokens: HashSet<String>,
    pages: usize,
    poisoned: Option<String>,
}

impl<R: Paginated> Paginator<R> {
    pub(crate) fn new(client: TextwerkClient, request: R) -> Self {
        Self {
            client,
            pending: Some(request.clone()),
            original: request,
            seen_tokens: HashSet::new(),
            pages: 0,
            poisoned: None,
        }
    }

    /// Fetch the next page, or `None` once the sequence is exhausted.
    ///
    /// A failed call leaves the cursor where it was, so the same page can
    /// be requested again.
    pub async fn next_page(&mut self) -> Result<Option<R::Output>> {
        if let Some(token) = &self.poisoned {
            return Err(TextwerkError::Pagination(format!(
                "{} repeated NextToken '{token}'",
                R::NAME
            )));
        }
        let Some(request) = self.pending.take() else {
            return Ok(None);
        };

        let page = match self.client.send(&request).await {
            Ok(page) => page,
            Err(err) => {
                self.pending = Some(request);
                return Err(err);
            }
        };
        self.pages += 1;

        match HasNextToken::next_token(&page) {
            None => {
                debug!(operation = R::NAME, pages = self.pages, "last page");
            }
            Some(token) => {
                if !self.seen_tokens.insert(token.to_owned()) {
                    warn!(operation = R::NAME, token, "server repeated a pagination token");
                    self.poisoned = Some(token.to_owned());
                } else {
                    let mut next = request;
                    next.set_next_token(Some(token.to_owned()));
                    self.pending = Some(next);
                }
            }
        }
        Ok(Some(page))
    }

    /// Rewind to the original request.
    pub fn restart(&mut self) {
        self.pending = Some(self.original.clone());
        self.seen_tokens.clear();
        self.pages = 0;
        self.poisoned = None;
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages
    }

    pub fn is_done(&self) -> bool {
        self.pending.is_none() && self.poisoned.is_none()
    }

    /// Drain the remaining pages.
    pub async fn collect_all(&mut self) -> Result<Vec<R::Output>> {
        let mut pages = Vec::new();
        while let Some(page) = self.next_page().await? {
            pages.push(page);
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use textwerk_core::config::ClientConfig;
    use textwerk_core::model::{ListAdaptersRequest, ListAdaptersResponse};

    use crate::transport::{Transport, WireRequest, WireResponse};

    /// Serves `tokens.len() + 1` pages, recording each request body.
    struct Pages {
        tokens: Vec<&'static str>,
        bodies: Mutex<Vec<serde_json::Value>>,
        fail_next: Mutex<bool>,
    }

    #[async_trait]
    impl Transport for Pages {
        async fn send(&self, request: WireRequest) -> Result<WireResponse> {
            {
                let mut fail = self.fail_next.lock().expect("lock");
                if *fail {
                    *fail = false;
                    return Err(TextwerkError::Transport("connection reset".into()));
                }
            }
            let body: serde_json::Value = serde_json::from_slice(&request.body).expect("json");
            let mut bodies = self.bodies.lock().expect("lock");
            let index = bodies.len();
            bodies.push(body);
            let token = self.tokens.get(index).copied();
            let response = match token {
                Some(t) => serde_json::json!({ "Adapters": [{ "AdapterId": format!("a{index}") }], "NextToken": t }),
                None => serde_json::json!({ "Adapters": [{ "AdapterId": format!("a{index}") }] }),
            };
            Ok(WireResponse::new(200, serde_json::to_vec(&response).expect("encode")))
        }
    }

    fn setup(tokens: Vec<&'static str>) -> (TextwerkClient, Arc<Pages>) {
        let transport = Arc::new(Pages {
            tokens,
            bodies: Mutex::new(Vec::new()),
            fail_next: Mutex::new(false),
        });
        (
            TextwerkClient::with_transport(transport.clone(), ClientConfig::default()),
            transport,
        )
    }

    fn request() -> ListAdaptersRequest {
        ListAdaptersRequest {
            max_results: Some(1),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stops_after_last_page_and_threads_tokens() {
        let (client, transport) = setup(vec!["t1", "t2"]);
        let pages: Vec<ListAdaptersResponse> =
            client.paginate(request()).collect_all().await.expect("pages");
        assert_eq!(pages.len(), 3);

        let bodies = transport.bodies.lock().expect("lock");
        assert_eq!(bodies.len(), 3);
        assert!(bodies[0].get("NextToken").is_none());
        assert_eq!(bodies[1]["NextToken"], "t1");
        assert_eq!(bodies[2]["NextToken"], "t2");
        assert!(bodies.iter().all(|b| b["MaxResults"] == 1));
    }

    #[tokio::test]
    async fn empty_token_ends_sequence() {
        let (client, transport) = setup(vec![""]);
        let mut pager = client.paginate(request());
        assert!(pager.next_page().await.expect("page").is_some());
        assert!(pager.next_page().await.expect("end").is_none());
        assert!(pager.is_done());
        assert_eq!(transport.bodies.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn repeated_token_is_an_error() {
        let (client, _) = setup(vec!["same", "same", "same"]);
        let mut pager = client.paginate(request());
        assert!(pager.next_page().await.expect("first").is_some());
        assert!(pager.next_page().await.expect("second").is_some());
        let err = pager.next_page().await.unwrap_err();
        assert!(matches!(err, TextwerkError::Pagination(_)));
    }

    #[tokio::test]
    async fn nothing_is_sent_until_polled() {
        let (client, transport) = setup(vec![]);
        let pager = client.paginate(request());
        assert_eq!(pager.pages_fetched(), 0);
        assert!(transport.bodies.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn failed_page_can_be_retried() {
        let (client, transport) = setup(vec!["t1"]);
        let mut pager = client.paginate(request());
        pager.next_page().await.expect("first");

        *transport.fail_next.lock().expect("lock") = true;
        assert!(pager.next_page().await.is_err());

        let second = pager.next_page().await.expect("retry").expect("page");
        assert_eq!(second.adapters[0].adapter_id.as_deref(), Some("a1"));
        assert_eq!(transport.bodies.lock().expect("lock")[1]["NextToken"], "t1");
    }

    #[tokio::test]
    async fn restart_rewinds_to_original() {
        let (client, transport) = setup(vec!["t1"]);
        let mut pager = client.paginate(request());
        pager.collect_all().await.expect("pages");
        pager.restart();
        assert_eq!(pager.pages_fetched(), 0);
        pager.next_page().await.expect("page");
        let bodies = transport.bodies.lock().expect("lock");
        assert!(bodies[2].get("NextToken").is_none());
    }
}
