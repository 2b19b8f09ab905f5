use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sharescope_lib::assessment::{AssessmentConfig, JsonReportRenderer};
use sharescope_lib::graph::testing::{is_token_request, page, token_response, ScriptedTransport};
use sharescope_lib::graph::{HttpRequest, HttpResponse, RequestBody};

fn batch_requests(req: &HttpRequest) -> Vec<Value> {
    match req.body {
        Some(RequestBody::Json(ref body)) => body["requests"].as_array().cloned().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// One site, one drive at `/d1`, and a single audit blob served for the
/// first window only.
fn tenant() -> Arc<ScriptedTransport> {
    let listings = AtomicUsize::new(0);
    Arc::new(ScriptedTransport::new(move |req| {
        if is_token_request(req) {
            return token_response("t");
        }
        let url = req.url.as_str();
        if url.ends_with("/users") {
            page(json!([{ "id": "u1", "displayName": "Ada" }]), None)
        } else if url.ends_with("/sites") {
            page(json!([{ "id": "s1", "name": "Eng" }]), None)
        } else if url.ends_with("/sites/s1/analytics/allTime") {
            HttpResponse::json(200, &json!({ "access": { "actionCount": 4, "actorCount": 1 } }))
        } else if url.ends_with("/sites/s1/drives") {
            page(json!([{ "id": "drive1", "name": "Docs", "webUrl": "/d1" }]), None)
        } else if url.ends_with("/subscriptions/content") {
            if listings.fetch_add(1, Ordering::SeqCst) == 0 {
                HttpResponse::json(200, &json!([{ "contentUri": "https://manage.office.com/blob/1" }]))
            } else {
                HttpResponse::json(200, &json!([]))
            }
        } else if url.ends_with("/blob/1") {
            HttpResponse::json(
                200,
                &json!([
                    { "ItemType": "File", "UserId": "ada", "ObjectId": "/d1/a.txt",
                      "Site": "s1", "ListId": "l1", "ListItemUniqueId": "i1" },
                    { "ItemType": "Folder", "UserId": "ada", "ObjectId": "/d1/sub" }
                ]),
            )
        } else if url.ends_with("$batch") {
            HttpResponse::json(
                200,
                &json!({ "responses": [
                    { "id": "item", "status": 200, "body": { "id": "i1", "name": "a.txt", "size": 512 } },
                    { "id": "permissions", "status": 200, "body": { "value": [
                        { "roles": ["write"], "grantedTo": { "user": { "displayName": "Ada" } } },
                        { "roles": ["read"], "link": { "type": "view", "scope": "anonymous", "webUrl": "https://s/a" } }
                    ]}}
                ]}),
            )
        } else {
            HttpResponse::new(404, "")
        }
    }))
}

fn config(dir: &tempfile::TempDir) -> AssessmentConfig {
    AssessmentConfig {
        tenant_id: "contoso".into(),
        client_id: "app".into(),
        client_secret: "secret".into(),
        report_path: dir.path().join("assessment_report.json"),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_end_to_end_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let transport = tenant();

    let (report, path) =
        sharescope_lib::assess_with(config(&dir), transport.clone(), &JsonReportRenderer)
            .await
            .unwrap();

    assert_eq!(report.site_count, 1);
    assert_eq!(report.drive_count, 1);
    assert_eq!(report.user_count, 1);
    assert_eq!(report.site_analytics[0].access_action_count, 4);
    assert_eq!(report.windows.len(), 7);

    assert_eq!(report.tally.total_events, 1);
    assert_eq!(report.distinct_files, 1);
    assert_eq!(report.tally.resolved, 1);
    assert_eq!(report.tally.unresolved, 0);
    assert_eq!(report.tally.total_size, 512);
    assert_eq!(report.tally.permissions, 2);
    assert_eq!(report.tally.sharing_links, 1);

    // Exactly one enrichment batch with two sub-requests for (s1, l1, i1, drive1).
    let batches = transport.requests_to("$batch");
    assert_eq!(batches.len(), 1);
    let urls: Vec<Value> = batch_requests(&batches[0])
        .iter()
        .map(|r| r["url"].clone())
        .collect();
    assert_eq!(
        urls,
        vec![
            json!("/sites/s1/lists/l1/items/i1/driveItem/permissions"),
            json!("/sites/s1/lists/l1/items/i1/driveItem"),
        ]
    );

    assert_eq!(transport.requests_to("/subscriptions/content").len(), 7);

    let written: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written["tally"]["totalSize"], 512);
    assert_eq!(written["topActors"][0]["key"], "ada");
}

#[tokio::test]
async fn test_reconciled_identity_carries_matched_drive() {
    use sharescope_lib::assessment::AssessmentRun;
    use sharescope_lib::graph::{ClientCredentials, GraphSession};

    let dir = tempfile::tempdir().unwrap();
    let config = config(&dir);
    let session = GraphSession::connect(
        config.graph_config(),
        ClientCredentials::new("app", "secret"),
        tenant(),
    )
    .await
    .unwrap();

    let run = AssessmentRun::new(&session, config);
    let inventory = run.inventory().await.unwrap();
    let log = run.collect_events(&inventory).await.unwrap();

    let identities: Vec<_> = log.identities().into_iter().collect();
    assert_eq!(identities.len(), 1);
    assert_eq!(identities[0].site_id, "s1");
    assert_eq!(identities[0].list_id, "l1");
    assert_eq!(identities[0].list_item_unique_id, "i1");
    assert_eq!(identities[0].drive_id, "drive1");
    assert_eq!(log.dropped, 1);
}
