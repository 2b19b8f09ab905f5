//! Authenticated JSON client for the resource and audit APIs.
//!
//! Wraps an [`HttpTransport`] with bearer-token injection and a bounded
//! re-authentication retry: a 401/403 triggers one fresh token exchange and
//! one resend of the same request, never more.

use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::graph::auth::Authenticator;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::graph::types::TokenScope;

/// Which failures trigger re-authentication, and how many attempts a single
/// call may make in total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub reauth_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            reauth_statuses: vec![401, 403],
        }
    }
}

impl RetryPolicy {
    /// `attempt` is 1-based.
    pub fn should_reauthenticate(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_attempts && self.reauth_statuses.contains(&status)
    }
}

/// Graph / Management API client bound to one token scope.
pub struct GraphApiClient {
    transport: Arc<dyn HttpTransport>,
    authenticator: Arc<Authenticator>,
    scope: TokenScope,
    base_url: String,
    retry: RetryPolicy,
    access_token: RwLock<Option<String>>,
}

impl GraphApiClient {
    /// Create a client.  No token is fetched until the first request.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        authenticator: Arc<Authenticator>,
        scope: TokenScope,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            authenticator,
            scope,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
            access_token: RwLock::new(None),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn scope(&self) -> TokenScope {
        self.scope
    }

    /// Full URL for an endpoint path.  Absolute URLs (continuation links,
    /// audit content URIs) pass through unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET with optional query parameters.
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GraphResult<serde_json::Value> {
        self.request(HttpMethod::Get, path, query, None).await
    }

    /// POST JSON body.
    pub async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> GraphResult<serde_json::Value> {
        self.request(HttpMethod::Post, path, &[], Some(body)).await
    }

    /// GET returning the whole successful response, headers included.
    pub async fn get_response(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> GraphResult<HttpResponse> {
        self.send(HttpMethod::Get, path, query, None).await
    }

    /// Send one request and parse its JSON body.
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> GraphResult<serde_json::Value> {
        let resp = self.send(method, path, query, body).await?;
        debug!("Response status={} body_len={}", resp.status, resp.body.len());
        resp.json_body()
    }

    /// Send one request, re-authenticating at most once on 401/403.
    /// Only a 2xx response is returned; anything else maps to a `GraphError`.
    pub async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
    ) -> GraphResult<HttpResponse> {
        let url = self.url(path);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let token = self.current_token().await?;

            let mut request = HttpRequest::new(method, url.as_str())
                .bearer(token)
                .query(query);
            if let Some(body) = body {
                request = request.json(body.clone());
            }

            let resp = self.transport.send(&request).await?;
            if resp.is_success() {
                return Ok(resp);
            }

            if self.retry.should_reauthenticate(resp.status, attempt) {
                warn!(
                    "{} {} → {}; re-authenticating (attempt {}/{})",
                    method.as_str(),
                    url,
                    resp.status,
                    attempt,
                    self.retry.max_attempts
                );
                self.reauthenticate().await?;
                continue;
            }

            return Err(GraphError::from_graph_response(resp.status, &resp.body));
        }
    }

    /// Discard the held token and obtain a fresh one.
    pub async fn reauthenticate(&self) -> GraphResult<()> {
        let token = self.authenticator.obtain_token(self.scope).await?;
        *self.access_token.write().await = Some(token.access_token);
        Ok(())
    }

    // ─── Internal ────────────────────────────────────────────────────

    async fn current_token(&self) -> GraphResult<String> {
        if let Some(ref token) = *self.access_token.read().await {
            return Ok(token.clone());
        }
        let token = self.authenticator.obtain_token(self.scope).await?;
        let access = token.access_token.clone();
        *self.access_token.write().await = Some(token.access_token);
        Ok(access)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
