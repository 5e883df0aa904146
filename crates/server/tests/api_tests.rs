use axum::body::Body;
use axum::http::{Request, StatusCode};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tower::ServiceExt;

use policyd_core::{ApplicationMonitor, MonitorType, Rule};
use policyd_engine::RuleEngine;
use policyd_executor::ActionRunner;
use policyd_store::RuleStore;

fn test_engine() -> (tempfile::TempDir, RuleEngine) {
    let dir = tempfile::tempdir().unwrap();
    let engine = RuleEngine::new(RuleStore::new(dir.path()), ActionRunner::new(None), 1.0);
    (dir, engine)
}

#[tokio::test]
async fn list_rules_returns_registered_rules() {
    let (_dir, engine) = test_engine();
    let rule = Rule::new(
        "clustermon",
        "high-load",
        ApplicationMonitor::new(MonitorType::Event, "true"),
    );
    engine.add_rule(rule).unwrap();

    let app = policyd_server::router(engine);
    let response = app
        .oneshot(Request::builder().uri("/v1/rules").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let rules: Vec<Rule> = serde_json::from_slice(&body).unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "high-load");
}

#[tokio::test]
async fn get_rule_for_unknown_id_returns_404() {
    let (_dir, engine) = test_engine();
    let app = policyd_server::router(engine);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/rules/nope/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn add_rule_then_enable_disable_round_trips() {
    let (_dir, engine) = test_engine();
    let app = policyd_server::router(engine.clone());

    let rule = Rule::new(
        "clustermon",
        "cpu-high",
        ApplicationMonitor::new(MonitorType::Event, "true"),
    );
    let body = serde_json::to_vec(&rule).unwrap();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/rules")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/rules/clustermon/cpu-high/disable")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!engine.get_rule("clustermon", "cpu-high").unwrap().is_status_enabled());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/rules/clustermon/cpu-high/enable")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(engine.get_rule("clustermon", "cpu-high").unwrap().is_status_enabled());
}

#[tokio::test]
async fn application_data_endpoint_decodes_double_base64() {
    let (dir, engine) = test_engine();
    let marker = dir.path().join("fired");

    let mut monitor = ApplicationMonitor::new(MonitorType::Receive, format!("touch {}", marker.display()));
    monitor.query_command = None;
    let mut rule = Rule::new("clustermon", "receive-rule", monitor);
    rule.conditions.push(policyd_core::Condition::new("/m/v", "==", "go"));
    engine.add_rule(rule).unwrap();

    let app = policyd_server::router(engine);

    let xml = b"<m><v>go</v></m>".to_vec();
    let once = BASE64.encode(&xml);
    let twice = BASE64.encode(once);
    let payload = serde_json::json!({ "data": twice });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/applications/clustermon/data")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&payload).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    tokio::time::sleep(std::time::Duration::from_millis(150)).await;
    assert!(marker.exists());
}
