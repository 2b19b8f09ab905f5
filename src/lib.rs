//! sharescope: logging setup and the top-level assessment entry points used
//! by the binary and the integration tests.

use log::info;
use sharescope_assessment::{
    AssessmentConfig, AssessmentError, AssessmentReport, AssessmentResult, AssessmentRun,
    JsonReportRenderer, LogFormat, ReportRenderer,
};
use sharescope_graph::{GraphSession, HttpTransport, ReqwestTransport};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub use sharescope_assessment as assessment;
pub use sharescope_graph as graph;

/// Install the global subscriber.  `RUST_LOG` wins over the configured
/// level; `log` records from the library crates are bridged in.
pub fn init_logging(level: &str, format: LogFormat) -> AssessmentResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AssessmentError::config(format!("invalid log level {:?}: {}", level, e)))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
    };
    result.map_err(|e| AssessmentError::config(format!("logging already initialised: {}", e)))
}

/// Connect over `transport`, run one assessment, and render it.
pub async fn assess_with(
    config: AssessmentConfig,
    transport: Arc<dyn HttpTransport>,
    renderer: &dyn ReportRenderer,
) -> AssessmentResult<(AssessmentReport, PathBuf)> {
    let session =
        GraphSession::connect(config.graph_config(), config.credentials(), transport).await?;
    AssessmentRun::new(&session, config)
        .execute_and_render(renderer)
        .await
}

/// Run one assessment against the live tenant with the JSON renderer.
pub async fn assess(config: AssessmentConfig) -> AssessmentResult<(AssessmentReport, PathBuf)> {
    let transport = Arc::new(ReqwestTransport::new(&config.graph_config())?);
    let (report, path) = assess_with(config, transport, &JsonReportRenderer).await?;
    info!(
        "Assessment of {} complete: {} distinct files, {} bytes exposed",
        report.tenant_id, report.distinct_files, report.tally.total_size
    );
    Ok((report, path))
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════
