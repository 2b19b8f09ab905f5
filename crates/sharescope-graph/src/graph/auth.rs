//! OAuth2 client-credentials authentication.
//!
//! One application identity mints tokens for two APIs: the resource API
//! (`TokenScope::Graph`) and the audit API (`TokenScope::Management`).
//! Callers request the scope matching the endpoint they intend to call.
//!
//! The token endpoint is
//! `{authority}/{tenant}/oauth2/v2.0/token`.

use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;

use crate::graph::error::{GraphError, GraphResult};
use crate::graph::transport::{HttpMethod, HttpRequest, HttpTransport};
use crate::graph::types::{AccessToken, ClientCredentials, GraphConfig, TokenScope};

/// Performs client-credentials exchanges.  Never retries: a failed exchange
/// is an `AuthFailed` error for the caller to handle.
pub struct Authenticator {
    transport: Arc<dyn HttpTransport>,
    config: GraphConfig,
    credentials: ClientCredentials,
}

impl Authenticator {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: GraphConfig,
        credentials: ClientCredentials,
    ) -> Self {
        Self {
            transport,
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Token endpoint URL for the configured tenant.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_host.trim_end_matches('/'),
            self.config.tenant_id,
        )
    }

    /// Exchange the client credentials for a bearer token on `scope`.
    pub async fn obtain_token(&self, scope: TokenScope) -> GraphResult<AccessToken> {
        if self.credentials.client_id.is_empty()
            || self.credentials.secret().is_empty()
            || self.config.tenant_id.is_empty()
        {
            return Err(GraphError::auth(
                "client_id, client_secret, and tenant_id are all required",
            ));
        }

        let scope_string = scope.scope_string(&self.config)?;
        let url = self.token_url();
        debug!("Token request → {} (scope {})", url, scope_string);

        let request = HttpRequest::new(HttpMethod::Post, url).form(&[
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.secret()),
            ("scope", scope_string.as_str()),
        ]);

        let resp = self.transport.send(&request).await?;
        if !resp.is_success() {
            return Err(GraphError::from_token_response(resp.status, &resp.body));
        }

        let token = parse_token_response(&resp.body, scope)?;
        info!("Obtained {:?} token", scope);
        Ok(token)
    }

    /// Whether a resource-API token can be obtained with the current
    /// credentials.
    pub async fn test_connection(&self) -> bool {
        match self.obtain_token(TokenScope::Graph).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Connection test failed: {}", e);
                false
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Internal helpers
// ═══════════════════════════════════════════════════════════════════════

fn parse_token_response(body: &str, scope: TokenScope) -> GraphResult<AccessToken> {
    let v: serde_json::Value = serde_json::from_str(body)?;

    let access_token = v["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| GraphError::auth("No access_token in response"))?
        .to_string();

    let expires_in = v["expires_in"].as_i64().unwrap_or(3600);
    let expires_at = Utc::now() + chrono::Duration::seconds(expires_in);

    debug!("Parsed token, expires in {}s", expires_in);

    Ok(AccessToken {
        access_token,
        token_type: v["token_type"].as_str().unwrap_or("Bearer").to_string(),
        expires_at,
        scope,
    })
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::error::GraphErrorCode;
    use crate::graph::testing::{token_response, ScriptedTransport};
    use crate::graph::transport::{HttpResponse, RequestBody};

    fn config() -> GraphConfig {
        GraphConfig {
            tenant_id: "contoso".into(),
            ..Default::default()
        }
    }

    fn form_value(request: &HttpRequest, key: &str) -> Option<String> {
        match request.body {
            Some(RequestBody::Form(ref fields)) => fields
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    #[test]
    fn test_parse_token_response() {
        let body = r#"{"access_token":"eyJ0eXAi...","token_type":"Bearer","expires_in":3599}"#;
        let token = parse_token_response(body, TokenScope::Graph).unwrap();
        assert_eq!(token.access_token, "eyJ0eXAi...");
        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.scope, TokenScope::Graph);
        assert!(!token.is_expired());
    }

    #[test]
    fn test_parse_token_response_missing_access_token() {
        let result = parse_token_response(r#"{"token_type":"Bearer"}"#, TokenScope::Graph);
        assert_eq!(result.unwrap_err().code, GraphErrorCode::AuthFailed);
    }

    #[test]
    fn test_token_url() {
        let transport = Arc::new(ScriptedTransport::new(|_| HttpResponse::new(500, "")));
        let auth = Authenticator::new(transport, config(), ClientCredentials::new("id", "secret"));
        assert_eq!(
            auth.token_url(),
            "https://login.microsoftonline.com/contoso/oauth2/v2.0/token"
        );
    }

    #[tokio::test]
    async fn test_obtain_token_uses_requested_scope() {
        let transport = Arc::new(ScriptedTransport::new(|_| token_response("mgmt-token")));
        let auth = Authenticator::new(
            transport.clone(),
            config(),
            ClientCredentials::new("id", "secret"),
        );

        let token = auth.obtain_token(TokenScope::Management).await.unwrap();
        assert_eq!(token.access_token, "mgmt-token");

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            form_value(&sent[0], "scope").as_deref(),
            Some("https://manage.office.com/.default")
        );
        assert_eq!(
            form_value(&sent[0], "grant_type").as_deref(),
            Some("client_credentials")
        );
        assert!(sent[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_obtain_token_failure_is_not_retried() {
        let transport = Arc::new(ScriptedTransport::new(|_| {
            HttpResponse::new(400, r#"{"error":"invalid_client","error_description":"bad secret"}"#)
        }));
        let auth = Authenticator::new(
            transport.clone(),
            config(),
            ClientCredentials::new("id", "secret"),
        );

        let err = auth.obtain_token(TokenScope::Graph).await.unwrap_err();
        assert_eq!(err.code, GraphErrorCode::AuthFailed);
        assert_eq!(err.status, Some(400));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_obtain_token_requires_credentials() {
        let transport = Arc::new(ScriptedTransport::new(|_| token_response("t")));
        let auth = Authenticator::new(transport.clone(), config(), ClientCredentials::new("", ""));
        assert!(auth.obtain_token(TokenScope::Graph).await.is_err());
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_test_connection() {
        let ok = Authenticator::new(
            Arc::new(ScriptedTransport::new(|_| token_response("t"))),
            config(),
            ClientCredentials::new("id", "secret"),
        );
        assert!(ok.test_connection().await);

        let failing = Authenticator::new(
            Arc::new(ScriptedTransport::new(|_| HttpResponse::new(401, "{}"))),
            config(),
            ClientCredentials::new("id", "secret"),
        );
        assert!(!failing.test_connection().await);
    }
}
