use std::time::Duration;

use super::common;
use orchestrator_protocol::ProtocolEvent;

const PLAN: &str = r#"{"subtasks":[{"id":"t1","role":"feature-dev","description":"deploy to prod"}],"risk_level":"high"}"#;

#[tokio::test]
async fn e2e_execute_suspends_at_approval_gate_then_resumes_on_approval() {
    common::load_dotenv();
    let (state, _db) = common::test_state(None, PLAN).await;
    let (url, handle) = common::spawn_server(state).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{url}/execute"))
        .json(&serde_json::json!({"instruction": "deploy the new release", "session_id": "s1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let events = common::read_sse_events(resp).await;
    assert!(matches!(events.last(), Some(ProtocolEvent::Done)));

    let workflow_id = events
        .iter()
        .find_map(|e| match e {
            ProtocolEvent::Status { workflow_id, .. } => Some(workflow_id.clone()),
            _ => None,
        })
        .expect("at least one status event");

    let approval_id = events
        .iter()
        .find_map(|e| match e {
            ProtocolEvent::ApprovalPending { approval_id, .. } => Some(approval_id.clone()),
            _ => None,
        })
        .expect("workflow should have suspended at the risk gate");

    assert!(events.iter().any(|e| matches!(
        e,
        ProtocolEvent::Subtask { id, .. } if id == "t1"
    )));

    let status: serde_json::Value = client
        .get(format!("{url}/workflows/{workflow_id}"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["status"], "awaiting_approval");

    let decision_resp: serde_json::Value = client
        .post(format!("{url}/approvals/decision"))
        .json(&serde_json::json!({
            "workflow_id": workflow_id,
            "approval_id": approval_id,
            "decision": "approve",
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(decision_resp["resumed"], true);

    let final_status = poll_until_resolved(&client, &url, &workflow_id).await;
    assert_eq!(final_status, "completed");

    handle.abort();
}

async fn poll_until_resolved(client: &reqwest::Client, url: &str, workflow_id: &str) -> String {
    for _ in 0..40 {
        let body: serde_json::Value = client
            .get(format!("{url}/workflows/{workflow_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let status = body["status"].as_str().unwrap_or_default().to_string();
        if status != "awaiting_approval" {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("workflow never resolved past awaiting_approval");
}

#[tokio::test]
async fn e2e_execute_rejects_empty_instruction() {
    common::load_dotenv();
    let (state, _db) = common::test_state(None, PLAN).await;
    let (url, handle) = common::spawn_server(state).await;

    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{url}/execute"))
        .json(&serde_json::json!({"instruction": "", "session_id": "s1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}
