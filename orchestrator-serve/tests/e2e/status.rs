use super::common;

#[tokio::test]
async fn e2e_status_returns_404_for_unknown_workflow() {
    common::load_dotenv();
    let (state, _db) = common::test_state(None, "hi").await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{url}/workflows/does-not-exist"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}
