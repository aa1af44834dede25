//! Submit chat stream (§4.1): classifies the message, then dispatches to either
//! the conversational handler (§4.3) or the workflow engine (§4.4).

use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::Sse;
use axum::Json;
use orchestrator_core::{
    classify, ClassifierFlags, Command, ConversationalTurn, OrchestratorError, RoutingMode,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::errors::ApiError;
use crate::sse::sse_response;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub attached_files: Vec<AttachedFile>,
    #[serde(default)]
    pub mode: ChatMode,
}

#[derive(Debug, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatMode {
    #[default]
    Ask,
    Agent,
}

pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>>, ApiError>
{
    if req.message.trim().is_empty() {
        return Err(ApiError::from(OrchestratorError::InvalidArgument(
            "message must not be empty".into(),
        )));
    }

    let flags = ClassifierFlags {
        prompt_enhanced: false,
        mode_agent: req.mode == ChatMode::Agent,
        llm_fallback_enabled: state.config.enable_intent_llm_fallback,
    };
    let classification = classify(&req.message, flags);

    if let Some(Command::Unknown { raw }) = &classification.command {
        return Err(ApiError::from(OrchestratorError::InvalidArgument(format!(
            "unrecognized command: {raw}"
        ))));
    }

    let keepalive = state.config.keepalive_interval;

    let (tx, rx) = mpsc::channel(128);

    if classification.routing_mode == RoutingMode::Workflow {
        let instruction = req.message.clone();
        let session_id = req.session_id.clone();
        tokio::spawn(async move {
            super::execute::run_workflow_to_stream(state, instruction, session_id, tx).await;
        });
    } else {
        let (history, session_version) = state.sessions.get(&req.session_id);
        let mut turn = ConversationalTurn::new(req.message.clone(), history);
        turn.files = req
            .attached_files
            .into_iter()
            .map(|f| (f.name, f.content))
            .collect();

        tokio::spawn(run_conversational_turn(
            state,
            req.session_id,
            session_version,
            turn,
            tx,
        ));
    }

    Ok(sse_response(ReceiverStream::new(rx), keepalive))
}

async fn run_conversational_turn(
    state: AppState,
    session_id: String,
    session_version: u64,
    turn: ConversationalTurn,
    tx: mpsc::Sender<orchestrator_protocol::ProtocolEvent>,
) {
    use orchestrator_core::MessageChunk;
    use orchestrator_protocol::ProtocolEvent;

    let (chunk_tx, mut chunk_rx) = mpsc::channel::<MessageChunk>(128);
    let forward_tx = tx.clone();
    let forwarder = tokio::spawn(async move {
        while let Some(chunk) = chunk_rx.recv().await {
            if forward_tx
                .send(ProtocolEvent::Content { content: chunk.content })
                .await
                .is_err()
            {
                break;
            }
        }
    });

    let outcome = orchestrator_core::handle_conversational_turn(
        turn,
        Arc::clone(&state.llm),
        Arc::clone(&state.tool_source),
        Some(chunk_tx),
    )
    .await;

    let _ = forwarder.await;

    match outcome {
        Ok(outcome) => {
            if let crate::state::ReplaceOutcome::Stale =
                state.sessions.replace(&session_id, session_version, outcome.history)
            {
                tracing::warn!(
                    session_id = %session_id,
                    "session cache write lost the CAS race, another turn updated it first",
                );
            }
            let _ = tx.send(ProtocolEvent::Done).await;
        }
        Err(e) => {
            let _ = tx
                .send(ProtocolEvent::Error {
                    kind: "UNAVAILABLE".to_string(),
                    message: e.to_string(),
                })
                .await;
            let _ = tx.send(ProtocolEvent::Done).await;
        }
    }
}
