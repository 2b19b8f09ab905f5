//! JSON `$batch` requests.
//!
//! A batch bundles up to [`MAX_BATCH_REQUESTS`] GETs into one POST.  The
//! backend may answer sub-requests in any order, so responses are looked up
//! by the `id` they were sent with.

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::graph::api_client::GraphApiClient;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::pager::decode_records;

/// Backend limit on sub-requests per batch.
pub const MAX_BATCH_REQUESTS: usize = 20;

/// One sub-request.  `url` is relative to the API version root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub id: String,
    pub method: String,
    pub url: String,
}

impl BatchRequest {
    pub fn get(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            method: "GET".into(),
            url: url.into(),
        }
    }
}

/// One sub-response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchResponse {
    pub id: String,
    pub status: u16,
    pub body: Option<Value>,
}

impl BatchResponse {
    /// The body, when the sub-request succeeded and returned one.
    pub fn usable_body(&self) -> Option<&Value> {
        if !(200..300).contains(&self.status) {
            return None;
        }
        self.body.as_ref().filter(|b| !b.is_null())
    }
}

/// Sub-responses of one batch, keyed by request id.
#[derive(Debug, Clone, Default)]
pub struct BatchResponses {
    by_id: HashMap<String, BatchResponse>,
}

impl BatchResponses {
    /// Sub-responses that do not decode are logged and left out; callers
    /// see them as missing and count the sub-request as unresolved.
    fn from_body(body: &Value) -> Self {
        let records = body["responses"].as_array().map(Vec::as_slice).unwrap_or_default();
        let (responses, _) = decode_records::<BatchResponse>(records, "$batch");
        let by_id = responses.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&BatchResponse> {
        self.by_id.get(id)
    }

    /// Usable body of sub-response `id`, if any.
    pub fn body(&self, id: &str) -> Option<&Value> {
        self.get(id).and_then(BatchResponse::usable_body)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// POST `requests` to `$batch`.  More than [`MAX_BATCH_REQUESTS`]
/// sub-requests is rejected without sending anything.
pub async fn execute_batch(
    client: &GraphApiClient,
    requests: &[BatchRequest],
) -> GraphResult<BatchResponses> {
    if requests.len() > MAX_BATCH_REQUESTS {
        return Err(GraphError::invalid_request(format!(
            "batch of {} requests exceeds the limit of {}",
            requests.len(),
            MAX_BATCH_REQUESTS
        )));
    }

    debug!("$batch with {} requests", requests.len());
    let resp = client.post("$batch", &json!({ "requests": requests })).await?;
    Ok(BatchResponses::from_body(&resp))
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::auth::Authenticator;
    use crate::graph::error::GraphErrorCode;
    use crate::graph::testing::{is_token_request, token_response, ScriptedTransport};
    use crate::graph::transport::{HttpResponse, RequestBody};
    use crate::graph::types::{ClientCredentials, GraphConfig, TokenScope};
    use std::sync::Arc;

    fn client(transport: Arc<ScriptedTransport>) -> GraphApiClient {
        let config = GraphConfig {
            tenant_id: "t".into(),
            ..Default::default()
        };
        let auth = Arc::new(Authenticator::new(
            transport.clone(),
            config.clone(),
            ClientCredentials::new("id", "secret"),
        ));
        GraphApiClient::new(transport, auth, TokenScope::Graph, config.graph_base_url)
    }

    #[test]
    fn test_usable_body() {
        let ok = BatchResponse {
            id: "1".into(),
            status: 200,
            body: Some(json!({ "id": "x" })),
        };
        assert!(ok.usable_body().is_some());

        let missing = BatchResponse {
            id: "1".into(),
            status: 200,
            body: None,
        };
        assert!(missing.usable_body().is_none());

        let failed = BatchResponse {
            id: "1".into(),
            status: 404,
            body: Some(json!({ "error": { "code": "itemNotFound" } })),
        };
        assert!(failed.usable_body().is_none());
    }

    #[test]
    fn test_responses_are_keyed_by_id() {
        let body = json!({
            "responses": [
                { "id": "2", "status": 200, "body": { "name": "second" } },
                { "id": "1", "status": 200, "body": { "name": "first" } }
            ]
        });
        let responses = BatchResponses::from_body(&body);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses.body("1").unwrap()["name"], "first");
        assert_eq!(responses.body("2").unwrap()["name"], "second");
        assert!(responses.get("3").is_none());
    }

    #[test]
    fn test_malformed_sub_response_is_left_out() {
        let body = json!({
            "responses": [
                { "id": "1", "status": 200, "body": { "name": "first" } },
                { "id": "2", "status": "throttled" }
            ]
        });
        let responses = BatchResponses::from_body(&body);
        assert_eq!(responses.len(), 1);
        assert!(responses.body("2").is_none());
    }

    #[tokio::test]
    async fn test_execute_batch_posts_requests() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            if is_token_request(req) {
                return token_response("t");
            }
            HttpResponse::json(
                200,
                &json!({ "responses": [{ "id": "a", "status": 200, "body": {} }] }),
            )
        }));
        let client = client(transport.clone());

        let responses = execute_batch(&client, &[BatchRequest::get("a", "/me")])
            .await
            .unwrap();
        assert!(responses.body("a").is_some());

        let sent = transport.requests_to("$batch");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].body,
            Some(RequestBody::Json(json!({
                "requests": [{ "id": "a", "method": "GET", "url": "/me" }]
            })))
        );
    }

    #[tokio::test]
    async fn test_execute_batch_rejects_oversized_batch() {
        let transport = Arc::new(ScriptedTransport::new(|_| token_response("t")));
        let client = client(transport.clone());

        let requests: Vec<_> = (1..=21)
            .map(|i| BatchRequest::get(i.to_string(), "/me"))
            .collect();
        let err = execute_batch(&client, &requests).await.unwrap_err();
        assert_eq!(err.code, GraphErrorCode::InvalidRequest);
        assert!(transport.requests().is_empty());
    }
}
