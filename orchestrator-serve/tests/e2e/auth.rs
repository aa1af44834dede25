use super::common;

#[tokio::test]
async fn e2e_protected_route_rejects_missing_api_key() {
    common::load_dotenv();
    let (state, _db) = common::test_state(Some("secret-key"), "hi").await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/chat"))
        .json(&serde_json::json!({"message": "hello", "session_id": "s1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    handle.abort();
}

#[tokio::test]
async fn e2e_protected_route_accepts_matching_x_api_key_header() {
    common::load_dotenv();
    let (state, _db) = common::test_state(Some("secret-key"), "hello there").await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/chat"))
        .header("x-api-key", "secret-key")
        .json(&serde_json::json!({"message": "hello", "session_id": "s1"}))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let events = common::read_sse_events(resp).await;
    assert!(events.iter().any(|e| matches!(e, orchestrator_protocol::ProtocolEvent::Done)));

    handle.abort();
}

#[tokio::test]
async fn e2e_health_is_exempt_even_with_api_key_configured() {
    common::load_dotenv();
    let (state, _db) = common::test_state(Some("secret-key"), "hi").await;
    let (url, handle) = common::spawn_server(state).await;

    let resp = reqwest::get(format!("{url}/health")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    handle.abort();
}
