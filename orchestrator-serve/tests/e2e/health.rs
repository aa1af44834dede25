use super::common;

#[tokio::test]
async fn e2e_health_reports_ok_without_auth() {
    common::load_dotenv();
    let (state, _db) = common::test_state(Some("secret-key"), "hi").await;
    let (url, handle) = common::spawn_server(state).await;

    let resp = reqwest::get(format!("{url}/health")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["dependencies"]["checkpoint_store"], "ok");
    assert_eq!(body["dependencies"]["tool_gateway"], "unconfigured");

    handle.abort();
}
