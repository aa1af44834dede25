use super::common;
use orchestrator_protocol::ProtocolEvent;

#[tokio::test]
async fn e2e_chat_qa_message_streams_content_then_done() {
    common::load_dotenv();
    let (state, _db) = common::test_state(None, "general kenobi").await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/chat"))
        .json(&serde_json::json!({"message": "hello there", "session_id": "s1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let events = common::read_sse_events(resp).await;
    assert!(matches!(events.last(), Some(ProtocolEvent::Done)));
    assert!(events.iter().any(|e| matches!(
        e,
        ProtocolEvent::Content { content } if content == "general kenobi"
    )));

    handle.abort();
}

#[tokio::test]
async fn e2e_chat_rejects_empty_message() {
    common::load_dotenv();
    let (state, _db) = common::test_state(None, "hi").await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/chat"))
        .json(&serde_json::json!({"message": "   ", "session_id": "s1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}
