//! One end-to-end assessment.
//!
//! Inventory, then seven (by default) daily audit windows reconciled against
//! the drive inventory, then one enrichment batch per distinct accessed
//! file, folded into a [`RiskTally`].  Every step is awaited in turn.

use chrono::{DateTime, Utc};
use futures::{pin_mut, TryStreamExt};
use log::{info, warn};
use sharescope_graph::{EnrichmentOutcome, FileIdentity, GraphSession};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::assessment::aggregate::RiskTally;
use crate::assessment::config::AssessmentConfig;
use crate::assessment::error::AssessmentResult;
use crate::assessment::reconcile::{reconcile, DriveMatcher, ReconciledLog};
use crate::assessment::report::{AssessmentReport, RankedCount, ReportRenderer};
use crate::assessment::types::Inventory;
use crate::assessment::windows::{daily_windows, TimeWindow};

/// Entries kept in the top-actor and top-object rankings.
pub const TOP_N: usize = 10;

pub struct AssessmentRun<'s> {
    session: &'s GraphSession,
    config: AssessmentConfig,
    reference: DateTime<Utc>,
}

impl<'s> AssessmentRun<'s> {
    pub fn new(session: &'s GraphSession, config: AssessmentConfig) -> Self {
        Self {
            session,
            config,
            reference: Utc::now(),
        }
    }

    /// Count windows back from `reference` instead of now.
    pub fn with_reference(mut self, reference: DateTime<Utc>) -> Self {
        self.reference = reference;
        self
    }

    pub fn windows(&self) -> Vec<TimeWindow> {
        daily_windows(
            self.reference,
            self.config.lookback_days,
            self.config.window_overlap_minutes,
        )
    }

    /// Users, sites (with analytics when enabled), and every site's drives.
    pub async fn inventory(&self) -> AssessmentResult<Inventory> {
        let assets = self.session.assets();
        let users = assets.users().collect_counted().await?;
        let sites = assets.sites().collect_counted().await?;
        let mut inventory = Inventory {
            users: users.items,
            sites: sites.items,
            skipped_records: users.skipped + sites.skipped,
            ..Default::default()
        };

        for site in &inventory.sites {
            if self.config.include_site_analytics {
                match assets.site_analytics(&site.id).await {
                    Ok(stats) => {
                        info!(
                            "Site {}: {} actions by {} actors",
                            site.label(),
                            stats.access_action_count,
                            stats.access_actor_count
                        );
                        inventory.site_analytics.push(stats);
                    }
                    Err(e) => warn!("No analytics for site {}: {}", site.id, e),
                }
            }
            let drives = assets.drives(&site.id).collect_counted().await?;
            inventory.skipped_records += drives.skipped;
            inventory.drives.extend(drives.items);
        }
        if inventory.skipped_records > 0 {
            warn!(
                "{} inventory records could not be decoded; events under them stay unmatched",
                inventory.skipped_records
            );
        }

        info!(
            "Inventory: {} users, {} sites, {} drives",
            inventory.user_count(),
            inventory.site_count(),
            inventory.drive_count()
        );
        Ok(inventory)
    }

    /// Fetch and reconcile every window, oldest day last.
    pub async fn collect_events(&self, inventory: &Inventory) -> AssessmentResult<ReconciledLog> {
        let matcher = DriveMatcher::new(&inventory.drives, self.config.drive_match);
        let audit = self.session.audit();
        let mut log = ReconciledLog::default();

        for window in self.windows() {
            let batches = audit.fetch_window(window.start, window.end);
            pin_mut!(batches);
            while let Some(batch) = batches.try_next().await? {
                log = log.apply(reconcile(&batch, &matcher));
            }
        }

        info!(
            "{} file events ({} dropped) across {} actors",
            log.event_count,
            log.dropped,
            log.actor_counts.len()
        );
        Ok(log)
    }

    /// One lookup per identity, in key order.
    pub async fn enrich(
        &self,
        identities: &BTreeSet<FileIdentity>,
    ) -> AssessmentResult<Vec<EnrichmentOutcome>> {
        let enricher = self.session.enricher();
        let mut outcomes = Vec::with_capacity(identities.len());
        for identity in identities {
            outcomes.push(enricher.file_details(identity).await?);
        }
        Ok(outcomes)
    }

    /// Run every phase and assemble the report.
    pub async fn execute(&self) -> AssessmentResult<AssessmentReport> {
        let inventory = self.inventory().await?;
        let log = self.collect_events(&inventory).await?;
        let identities = log.identities();
        info!("{} distinct files accessed", identities.len());

        let outcomes = self.enrich(&identities).await?;
        let tally = outcomes
            .iter()
            .fold(RiskTally::with_events(log.event_count), RiskTally::fold);
        info!(
            "Exposure: {} bytes, {} links, {} grants ({} unresolved)",
            tally.total_size, tally.sharing_links, tally.permissions, tally.unresolved
        );

        Ok(AssessmentReport {
            tenant_id: self.session.config().tenant_id.clone(),
            generated_at: Utc::now(),
            windows: self.windows(),
            site_count: inventory.site_count(),
            drive_count: inventory.drive_count(),
            user_count: inventory.user_count(),
            skipped_records: inventory.skipped_records,
            site_analytics: inventory.site_analytics,
            distinct_files: identities.len(),
            tally,
            top_actors: log.top_actors(TOP_N).into_iter().map(RankedCount::from).collect(),
            top_objects: log.top_objects(TOP_N).into_iter().map(RankedCount::from).collect(),
            unresolved: outcomes
                .iter()
                .filter(|o| o.detail().is_none())
                .map(|o| o.identity().clone())
                .collect(),
        })
    }

    /// [`AssessmentRun::execute`], then render to the configured path.
    pub async fn execute_and_render(
        &self,
        renderer: &dyn ReportRenderer,
    ) -> AssessmentResult<(AssessmentReport, PathBuf)> {
        let report = self.execute().await?;
        let path = renderer.render(&report, &self.config.report_path)?;
        Ok((report, path))
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::error::AssessmentError;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use sharescope_graph::testing::{is_token_request, page, token_response, ScriptedTransport};
    use sharescope_graph::{ClientCredentials, GraphErrorCode, HttpRequest, HttpResponse};
    use std::sync::Arc;

    const OBJECT: &str = "https://contoso.sharepoint.com/sites/Eng/Shared Docs/a.docx";

    fn config() -> AssessmentConfig {
        AssessmentConfig {
            tenant_id: "contoso".into(),
            client_id: "app".into(),
            client_secret: "secret".into(),
            lookback_days: 2,
            ..Default::default()
        }
    }

    fn tenant(req: &HttpRequest) -> HttpResponse {
        if is_token_request(req) {
            return token_response("t");
        }
        let url = req.url.as_str();
        if url.ends_with("/users") {
            page(json!([{ "id": "u1" }, { "id": "u2" }]), None)
        } else if url.ends_with("/sites") {
            page(json!([{ "id": "s1", "name": "Eng" }]), None)
        } else if url.ends_with("/analytics/allTime") {
            HttpResponse::new(404, "")
        } else if url.ends_with("/sites/s1/drives") {
            page(
                json!([{ "id": "drive1", "webUrl": "https://contoso.sharepoint.com/sites/Eng/Shared%20Docs" }]),
                None,
            )
        } else if url.ends_with("/subscriptions/content") {
            HttpResponse::json(200, &json!([{ "contentUri": "https://manage.office.com/blob" }]))
        } else if url.ends_with("/blob") {
            HttpResponse::json(
                200,
                &json!([
                    { "ItemType": "File", "UserId": "ada", "ObjectId": OBJECT,
                      "Site": "s1", "ListId": "l1", "ListItemUniqueId": "i1" },
                    { "ItemType": "Folder", "UserId": "ada", "ObjectId": "x" }
                ]),
            )
        } else if url.ends_with("$batch") {
            HttpResponse::json(
                200,
                &json!({ "responses": [
                    { "id": "permissions", "status": 200, "body": { "value": [
                        { "roles": ["read"], "link": { "type": "view" } }
                    ]}},
                    { "id": "item", "status": 200, "body": { "id": "i1", "size": 10 } }
                ]}),
            )
        } else {
            HttpResponse::new(404, "")
        }
    }

    async fn session(transport: Arc<ScriptedTransport>) -> GraphSession {
        let config = config();
        GraphSession::connect(config.graph_config(), ClientCredentials::new("app", "secret"), transport)
            .await
            .unwrap()
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_execute_two_windows() {
        let transport = Arc::new(ScriptedTransport::new(tenant));
        let session = session(transport.clone()).await;

        let report = AssessmentRun::new(&session, config())
            .with_reference(reference())
            .execute()
            .await
            .unwrap();

        // The same blob is listed for both windows; its events are counted
        // twice but enriched once.
        assert_eq!(report.tally.total_events, 2);
        assert_eq!(report.distinct_files, 1);
        assert_eq!(report.tally.total_size, 10);
        assert_eq!(report.tally.sharing_links, 1);
        assert_eq!(report.tally.permissions, 1);
        assert_eq!(report.user_count, 2);
        assert_eq!(report.drive_count, 1);
        assert!(report.site_analytics.is_empty());
        assert_eq!(report.top_actors[0].key, "ada");
        assert_eq!(transport.requests_to("$batch").len(), 1);
        assert_eq!(transport.requests_to("/subscriptions/content").len(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_inventory_records_are_counted() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            if req.url.ends_with("/sites/s1/drives") {
                page(json!([{ "id": "drive1" }, { "id": 9, "name": "broken" }]), None)
            } else if req.url.ends_with("/users") {
                page(json!([{ "id": "u1" }, "not-a-user"]), None)
            } else {
                tenant(req)
            }
        }));
        let session = session(transport).await;
        let run = AssessmentRun::new(&session, config()).with_reference(reference());

        let inventory = run.inventory().await.unwrap();
        assert_eq!(inventory.drive_count(), 1);
        assert_eq!(inventory.user_count(), 1);
        assert_eq!(inventory.skipped_records, 2);

        let report = run.execute().await.unwrap();
        assert_eq!(report.skipped_records, 2);
    }

    #[tokio::test]
    async fn test_windows_are_requested_most_recent_first() {
        let transport = Arc::new(ScriptedTransport::new(tenant));
        let session = session(transport.clone()).await;

        AssessmentRun::new(&session, config())
            .with_reference(reference())
            .execute()
            .await
            .unwrap();

        let starts: Vec<String> = transport
            .requests_to("/subscriptions/content")
            .iter()
            .filter_map(|r| r.query_value("startTime").map(str::to_string))
            .collect();
        assert_eq!(starts, vec!["2024-03-07T12:00:00", "2024-03-06T12:00:00"]);
    }

    #[tokio::test]
    async fn test_unresolved_identities_are_reported() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            if req.url.ends_with("$batch") {
                return HttpResponse::json(200, &json!({ "responses": [] }));
            }
            tenant(req)
        }));
        let session = session(transport).await;

        let report = AssessmentRun::new(&session, config())
            .with_reference(reference())
            .execute()
            .await
            .unwrap();
        assert_eq!(report.tally.unresolved, 1);
        assert_eq!(report.tally.total_size, 0);
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].drive_id, "drive1");
    }

    #[tokio::test]
    async fn test_audit_failure_aborts_run() {
        let transport = Arc::new(ScriptedTransport::new(|req| {
            if req.url.ends_with("/subscriptions/content") {
                return HttpResponse::new(500, "");
            }
            tenant(req)
        }));
        let session = session(transport).await;

        let err = AssessmentRun::new(&session, config())
            .with_reference(reference())
            .execute()
            .await
            .unwrap_err();
        match err {
            AssessmentError::Graph(e) => assert_eq!(e.code, GraphErrorCode::ServerError),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_and_render() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.report_path = dir.path().join("out.json");

        let transport = Arc::new(ScriptedTransport::new(tenant));
        let session = session(transport).await;
        let (_, path) = AssessmentRun::new(&session, config)
            .with_reference(reference())
            .execute_and_render(&crate::assessment::report::JsonReportRenderer)
            .await
            .unwrap();

        let v: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(v["distinctFiles"], 1);
    }
}
