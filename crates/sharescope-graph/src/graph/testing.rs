//! In-memory transport for tests.
//!
//! A `ScriptedTransport` answers every request through a handler closure and
//! records what was sent, so tests can assert on call counts and payloads.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Mutex;

use crate::graph::error::GraphResult;
use crate::graph::transport::{HttpRequest, HttpResponse, HttpTransport};

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        match self.requests.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Requests whose URL contains `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(fragment))
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &HttpRequest) -> GraphResult<HttpResponse> {
        match self.requests.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
        Ok((self.handler)(request))
    }
}

/// Whether `request` is a token exchange.
pub fn is_token_request(request: &HttpRequest) -> bool {
    request.url.contains("/oauth2/v2.0/token")
}

/// A successful token endpoint response.
pub fn token_response(access_token: &str) -> HttpResponse {
    HttpResponse::json(
        200,
        &json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": 3599,
        }),
    )
}

/// A `{ "value": [...] }` page, optionally with a continuation link.
pub fn page(values: serde_json::Value, next_link: Option<&str>) -> HttpResponse {
    let mut body = json!({ "value": values });
    if let Some(next) = next_link {
        body["@odata.nextLink"] = json!(next);
    }
    HttpResponse::json(200, &body)
}
