//! Connected tenant session: the facade the assessment runs against.
//!
//! Holds one resource-API client and one audit-API client sharing a single
//! authenticator, and hands out the inventory, audit, and enrichment
//! helpers as short-lived borrows.

use log::info;
use std::sync::Arc;

use crate::graph::api_client::GraphApiClient;
use crate::graph::assets::AssetLister;
use crate::graph::audit::AuditLogFetcher;
use crate::graph::auth::Authenticator;
use crate::graph::enrich::BatchEnricher;
use crate::graph::error::GraphResult;
use crate::graph::transport::{HttpTransport, ReqwestTransport};
use crate::graph::types::{ClientCredentials, GraphConfig, TokenScope};

pub struct GraphSession {
    config: GraphConfig,
    authenticator: Arc<Authenticator>,
    graph: GraphApiClient,
    management: GraphApiClient,
}

impl GraphSession {
    /// Build a session over `transport` and obtain the initial resource-API
    /// token.  Bad credentials fail here, before any other call is made.
    pub async fn connect(
        config: GraphConfig,
        credentials: ClientCredentials,
        transport: Arc<dyn HttpTransport>,
    ) -> GraphResult<Self> {
        let authenticator = Arc::new(Authenticator::new(
            transport.clone(),
            config.clone(),
            credentials,
        ));
        let graph = GraphApiClient::new(
            transport.clone(),
            authenticator.clone(),
            TokenScope::Graph,
            config.graph_base_url.clone(),
        );
        let management = GraphApiClient::new(
            transport,
            authenticator.clone(),
            TokenScope::Management,
            config.management_base_url.clone(),
        );

        graph.reauthenticate().await?;
        info!("Connected to tenant {}", config.tenant_id);

        Ok(Self {
            config,
            authenticator,
            graph,
            management,
        })
    }

    /// [`GraphSession::connect`] over a real HTTP transport.
    pub async fn connect_http(
        config: GraphConfig,
        credentials: ClientCredentials,
    ) -> GraphResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(&config)?);
        Self::connect(config, credentials, transport).await
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    pub fn graph_client(&self) -> &GraphApiClient {
        &self.graph
    }

    pub fn management_client(&self) -> &GraphApiClient {
        &self.management
    }

    // ─── Sub-module accessors ────────────────────────────────────────

    pub fn assets(&self) -> AssetLister<'_> {
        AssetLister::new(&self.graph)
    }

    pub fn audit(&self) -> AuditLogFetcher<'_> {
        AuditLogFetcher::new(&self.management, self.config.tenant_id.clone())
    }

    pub fn enricher(&self) -> BatchEnricher<'_> {
        BatchEnricher::new(&self.graph)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
