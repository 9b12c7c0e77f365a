mod common;

use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use church_api::auth::Organization;
use church_api::members::ChurchMember;
use common::TestApp;

/// Signed-in owner of one church holding the named members
fn church(names: &[&str]) -> (TestApp, Organization, Vec<ChurchMember>) {
    let app = TestApp::signed_in("Pastor");
    let org = app.platform.join_organization("Grace Chapel");
    let rows = names
        .iter()
        .map(|name| {
            let identity = app.platform.add_identity(org.id, name);
            app.store.seed(org.id, identity.member_id, name)
        })
        .collect();
    (app, org, rows)
}

fn names(body: &Value) -> Vec<String> {
    body["data"]["page"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn single_membership_is_auto_activated_and_paginates() {
    let (app, org, _) = church(&["Alice", "Bob", "Charlie"]);

    let (status, first) = app.get("/api/members").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.platform.active_organization(), Some(org.id));
    assert_eq!(names(&first), vec!["Alice", "Bob"]);
    assert_eq!(first["data"]["is_done"], json!(false));
    assert_eq!(first["data"]["can_load_more"], json!(true));
    assert!(first["data"].get("pagination").is_none());

    let cursor = first["data"]["continue_cursor"].as_str().unwrap();
    let (status, second) = app.get(&format!("/api/members?cursor={}", cursor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&second), vec!["Charlie"]);
    assert_eq!(second["data"]["is_done"], json!(true));
}

#[tokio::test]
async fn dangling_identities_are_dropped_from_the_page() {
    let (app, _, rows) = church(&["Alice", "Bob", "Charlie"]);
    app.platform.remove_identity(rows[1].organization_member_id);

    let (status, body) = app.get("/api/members?limit=5").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Alice", "Charlie"]);
    assert_eq!(body["data"]["scanned"], json!(3));
}

#[tokio::test]
async fn search_and_totals() {
    let (app, _, _) = church(&["Mary Wanjiku", "Peter Ochieng", "Mary Brown"]);

    let (status, body) = app.get("/api/members?search=mar&limit=5&include_total=true").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Mary Wanjiku", "Mary Brown"]);
    assert_eq!(body["data"]["pagination"]["total"], json!(2));
    assert_eq!(body["data"]["pagination"]["total_pages"], json!(1));
    assert_eq!(body["data"]["pagination"]["has_next"], json!(false));
}

#[tokio::test]
async fn malformed_cursor_is_a_bad_request() {
    let (app, _, _) = church(&["Alice"]);

    let (status, body) = app.get("/api/members?cursor=nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn oversized_cursor_is_a_bad_request() {
    let (app, _, _) = church(&["Alice"]);

    for cursor in ["cffffffffffffffff", "c8000000000000000"] {
        let (status, body) = app.get(&format!("/api/members?cursor={}", cursor)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], json!("BAD_REQUEST"));
    }
}

#[tokio::test]
async fn malformed_query_and_path_use_the_error_envelope() {
    let (app, _, _) = church(&["Alice"]);

    for uri in ["/api/members?limit=abc", "/api/members/not-a-uuid"] {
        let (status, body) = app.get(uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["success"], json!(false), "{}", uri);
        assert_eq!(body["error"]["code"], json!("BAD_REQUEST"), "{}", uri);
    }
}

#[tokio::test]
async fn missing_permission_is_forbidden() {
    let (app, _, _) = church(&["Alice"]);
    app.platform.deny_permissions();

    let (status, body) = app.get("/api/members").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "success": false, "error": "FORBIDDEN" }));
}

#[tokio::test]
async fn member_detail_is_tenant_scoped() {
    let (app, _, rows) = church(&["Alice"]);

    let (status, body) = app.get(&format!("/api/members/{}", rows[0].id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], json!("alice@example.com"));

    let foreign = app.store.seed(Uuid::new_v4(), Uuid::new_v4(), "Mallory");
    for id in [foreign.id, Uuid::new_v4()] {
        let (status, body) = app.get(&format!("/api/members/{}", id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("NOT_FOUND"));
    }
}

#[tokio::test]
async fn milestones_are_listed_per_church_and_per_member() {
    let (app, org, rows) = church(&["Alice"]);
    let baptism = app.store.add_milestone(org.id, "Baptism");
    app.store.add_milestone(org.id, "Membership class");
    app.store.achieve(rows[0].id, &[baptism.id]);

    let (status, body) = app.get("/api/milestones").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.get(&format!("/api/members/{}/milestones", rows[0].id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], json!("Baptism"));
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}
