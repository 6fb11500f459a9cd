/// Router-level tests driving the planner endpoint through `tower::ServiceExt`.
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use agenda_core::db::establish_connection;
use agenda_core::models::SeedData;
use agenda_core::repository::{Repository, SqliteRepository};
use agenda_server::config::Config;
use agenda_server::router::{build_router, PLANNER_PATH};
use agenda_server::state::AppState;

mod helpers;
use helpers::*;

async fn setup_app(config: Config) -> (Router, TempDir) {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("test.db");
    let pool = establish_connection(&db_path.to_string_lossy())
        .await
        .expect("Failed to establish test database connection");

    let repo = SqliteRepository::new(pool);
    let seed: SeedData = serde_json::from_str(&fixture_json()).unwrap();
    repo.seed(seed).await.unwrap();

    let state = Arc::new(AppState::new(repo, config));
    (build_router(state), temp_dir)
}

fn planner_uri(query: &str) -> String {
    format!("{}?{}", PLANNER_PATH, query)
}

const WEEK_QUERY: &str = "type=week&start=2024-01-01T00:00:00.000Z&end=2024-01-08T00:00:00.000Z&timezone=UTC";

fn authed_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-space-id", SPACE_ID)
        .header("x-user-id", USER_ID)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_week_view_buckets() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!("{}&id={}", WEEK_QUERY, GROCERIES_ID));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::OK);

    let buckets = body.as_array().unwrap();
    assert_eq!(buckets.len(), 7);
    assert_eq!(buckets[2]["start"], "2024-01-03T00:00:00.000Z");
    assert_eq!(buckets[2]["end"], "2024-01-03T23:59:59.000Z");

    let dentist = &buckets[2]["entities"][DENTIST_ID];
    assert_eq!(dentist["collectionId"], GROCERIES_ID);
    assert!(dentist["subtasks"].as_object().unwrap().is_empty());

    for (i, bucket) in buckets.iter().enumerate() {
        assert!(bucket["entities"].get(GYM_ID).is_some(), "gym missing from bucket {}", i);
        if i != 2 {
            assert!(bucket["entities"].get(DENTIST_ID).is_none());
        }
    }
}

#[tokio::test]
async fn test_month_view_uses_week_buckets() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!(
        "type=month&start=2024-01-01T00:00:00.000Z&end=2024-01-29T00:00:00.000Z&timezone=UTC&id={}",
        GROCERIES_ID
    ));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let buckets = body.as_array().unwrap();
    assert_eq!(buckets.len(), 4);
    assert_eq!(buckets[1]["start"], "2024-01-08T00:00:00.000Z");
    assert_eq!(buckets[0]["end"], "2024-01-07T23:59:59.000Z");
}

#[tokio::test]
async fn test_preserve_all_occurrences_keys_by_occurrence() {
    let mut config = Config::default();
    config.planner.preserve_all_occurrences = true;
    let (app, _temp_dir) = setup_app(config).await;
    let uri = planner_uri(&format!(
        "type=month&start=2024-01-01T00:00:00.000Z&end=2024-01-08T00:00:00.000Z&timezone=UTC&id={}",
        GROCERIES_ID
    ));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    let entities = body[0]["entities"].as_object().unwrap();
    let gym_entries = entities.keys().filter(|k| k.starts_with(GYM_ID)).count();
    assert_eq!(gym_entries, 7);
    assert!(entities.contains_key(&format!("{}:2024-01-01T07:00:00.000Z", GYM_ID)));
}

#[tokio::test]
async fn test_invalid_type() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!(
        "type=decade&start=2024-01-01&end=2024-01-08&timezone=UTC&id={}",
        GROCERIES_ID
    ));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid `type`");
}

#[tokio::test]
async fn test_missing_parameter() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri("type=week&start=2024-01-01&end=2024-01-08&timezone=UTC");

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("`id`"));
}

#[tokio::test]
async fn test_invalid_timezone() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!(
        "type=week&start=2024-01-01&end=2024-01-08&timezone=Nowhere/City&id={}",
        GROCERIES_ID
    ));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Nowhere/City"));
}

#[tokio::test]
async fn test_identity_required_for_private_access() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!("{}&id={}", WEEK_QUERY, GROCERIES_ID));
    let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("x-space-id"));
}

#[tokio::test]
async fn test_public_invite_token_access() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!("{}&id={}&isPublic=true", WEEK_QUERY, CHORES_TOKEN));
    let request = Request::builder().uri(&uri).body(Body::empty()).unwrap();

    let (status, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    let buckets = body.as_array().unwrap();
    assert_eq!(buckets[3]["entities"][VACUUM_ID]["name"], "Vacuum");
    assert!(buckets.iter().all(|b| b["entities"].get(GYM_ID).is_none()));
}

#[tokio::test]
async fn test_options_allows_any_header() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri(PLANNER_PATH)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-headers").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri(PLANNER_PATH)
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "GET")
        .header("access-control-request-headers", "x-space-id")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_oversized_range_is_a_bad_request() {
    let (app, _temp_dir) = setup_app(Config::default()).await;
    let uri = planner_uri(&format!(
        "type=week&start=1970-01-01T00:00:00.000Z&end=2100-01-01T00:00:00.000Z&timezone=UTC&id={}",
        GROCERIES_ID
    ));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 1000"));
}

#[tokio::test]
async fn test_configured_bucket_limit_applies() {
    let mut config = Config::default();
    config.planner.max_buckets = 3;
    let (app, _temp_dir) = setup_app(config).await;
    let uri = planner_uri(&format!("{}&id={}", WEEK_QUERY, GROCERIES_ID));

    let (status, body) = send(app, authed_get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at most 3"));
}
