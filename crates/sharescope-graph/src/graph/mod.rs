//! # sharescope-graph: Graph and Management Activity API client
//!
//! Everything the sharing assessment needs from the tenant:
//!
//! - **Authentication** – client-credentials exchange for two token scopes
//!   (resource API and audit API) from one application identity.
//! - **Resilient requests** – bearer injection with a bounded
//!   re-authentication retry on 401/403.
//! - **Inventory** – lazy, restartable pagination over sites, drives, and
//!   users; site analytics; share records.
//! - **Audit** – windowed retrieval of `Audit.SharePoint` content blobs.
//! - **Enrichment** – `$batch` lookups of item detail, permissions, and
//!   sharing links, correlated by sub-request id.

pub mod types;
pub mod error;
pub mod transport;
pub mod auth;
pub mod api_client;
pub mod pager;
pub mod assets;
pub mod audit;
pub mod batch;
pub mod permissions;
pub mod enrich;
pub mod service;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-exports
pub use api_client::{GraphApiClient, RetryPolicy};
pub use assets::{decode_web_url, AssetLister};
pub use audit::{AuditLogFetcher, ContentBlob};
pub use auth::Authenticator;
pub use batch::{BatchRequest, BatchResponse, BatchResponses, MAX_BATCH_REQUESTS};
pub use enrich::BatchEnricher;
pub use error::{GraphError, GraphErrorCode, GraphResult};
pub use pager::{decode_records, Collected, Pager};
pub use service::GraphSession;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, RequestBody,
};
pub use types::*;
