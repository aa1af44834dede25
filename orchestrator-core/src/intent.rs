//! Decides how the front door dispatches an incoming chat message: the fast
//! conversational path (`§4.3`-style single LLM call) or the durable workflow graph.
//!
//! [`classify`] is a plain synchronous function of `(&str, ClassifierFlags)`; the LLM
//! fallback used for low-confidence heuristic results is injected by the caller as an
//! async closure, so the deterministic path has no network dependency and is fully
//! unit-testable.

use serde::{Deserialize, Serialize};

/// What the message is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Qa,
    SimpleTask,
    Medium,
    High,
}

/// Which handler should service the classified message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    Conversational,
    Workflow,
}

/// Caller-supplied context the heuristic rules alone can't see.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierFlags {
    pub prompt_enhanced: bool,
    pub mode_agent: bool,
    /// Enables the low-confidence LLM fallback; off by default so classification
    /// stays synchronous unless a caller opts in.
    pub llm_fallback_enabled: bool,
}

/// The parsed form of one of the explicit slash commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Execute { args: String },
    Help,
    Status,
    Cancel,
    /// Leading token started with `/` but didn't match a known command.
    /// Carries the raw head (e.g. `/frobnicate`) so the caller can echo it
    /// back in a synchronous error instead of handing it to the workflow
    /// engine as a literal task instruction.
    Unknown { raw: String },
}

/// Outcome of [`classify`]: the decided intent, confidence, a short rationale for
/// traces, the routing decision, and whether this result should be flagged for
/// offline review.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    pub rationale: String,
    pub routing_mode: RoutingMode,
    pub command: Option<Command>,
    pub review_requested: bool,
}

const CONFIDENCE_THRESHOLD: f32 = 0.75;
const REVIEW_THRESHOLD: f32 = 0.8;

const QA_MARKERS: &[&str] = &[
    "what", "how", "why", "explain", "is there", "are there", "hi", "hello", "hey",
];
const SIMPLE_TASK_MARKERS: &[&str] = &["find", "search", "list", "show", "check"];
const HIGH_MARKERS: &[&str] = &[
    "migrate", "deploy", "refactor the", "rewrite", "across the codebase", "architecture",
];
const MEDIUM_MARKERS: &[&str] = &["implement", "add a", "fix the", "write a test", "create a"];

fn parse_command(trimmed: &str) -> Option<Command> {
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let head = parts.next()?;
    let rest = parts.next().unwrap_or("").trim().to_string();
    match head {
        "/execute" => Some(Command::Execute { args: rest }),
        "/help" => Some(Command::Help),
        "/status" => Some(Command::Status),
        "/cancel" => Some(Command::Cancel),
        _ => Some(Command::Unknown { raw: head.to_string() }),
    }
}

fn leading_tokens(message: &str, n: usize) -> String {
    message
        .split_whitespace()
        .take(n)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn heuristic_classify(message: &str) -> (Intent, f32, String) {
    let lower = message.to_lowercase();

    if let Some(marker) = SIMPLE_TASK_MARKERS.iter().find(|m| lower.contains(**m)) {
        return (
            Intent::SimpleTask,
            0.85,
            format!("matched simple-task marker '{marker}'"),
        );
    }
    if let Some(marker) = QA_MARKERS.iter().find(|m| lower.contains(**m)) {
        return (Intent::Qa, 0.85, format!("matched qa marker '{marker}'"));
    }
    if let Some(marker) = HIGH_MARKERS.iter().find(|m| lower.contains(**m)) {
        return (Intent::High, 0.8, format!("matched high-risk marker '{marker}'"));
    }
    if let Some(marker) = MEDIUM_MARKERS.iter().find(|m| lower.contains(**m)) {
        return (Intent::Medium, 0.8, format!("matched medium marker '{marker}'"));
    }

    (Intent::Medium, 0.5, "no keyword matched; defaulting to medium".to_string())
}

fn routing_mode(intent: Intent, confidence: f32, flags: ClassifierFlags) -> RoutingMode {
    if flags.mode_agent {
        return RoutingMode::Workflow;
    }
    match intent {
        (Intent::Qa | Intent::SimpleTask) if confidence >= CONFIDENCE_THRESHOLD => {
            RoutingMode::Conversational
        }
        _ => RoutingMode::Workflow,
    }
}

/// Classifies `message` with no LLM involvement. Explicit commands and the
/// enhanced-prompt QA override are resolved here; anything else falls through to the
/// keyword heuristic. Confidence below [`CONFIDENCE_THRESHOLD`] is left for the
/// caller to optionally escalate to [`classify_with_llm_fallback`].
pub fn classify(message: &str, flags: ClassifierFlags) -> Classification {
    let trimmed = message.trim();

    if trimmed.starts_with('/') {
        let command = parse_command(trimmed);
        let (intent, confidence, rationale, routing_mode) = match &command {
            Some(Command::Unknown { raw }) => (
                Intent::Qa,
                1.0,
                format!("unrecognized command '{raw}'"),
                RoutingMode::Conversational,
            ),
            Some(_) => (Intent::High, 1.0, "explicit command".to_string(), RoutingMode::Workflow),
            None => (
                Intent::Qa,
                1.0,
                "unrecognized command".to_string(),
                RoutingMode::Conversational,
            ),
        };
        return Classification {
            intent,
            confidence,
            rationale,
            routing_mode,
            command,
            review_requested: false,
        };
    }

    if flags.prompt_enhanced && !flags.mode_agent {
        let head = leading_tokens(trimmed, 10);
        if QA_MARKERS.iter().any(|m| head.contains(m)) {
            return Classification {
                intent: Intent::Qa,
                confidence: 0.95,
                rationale: "prompt_enhanced QA override".to_string(),
                routing_mode: RoutingMode::Conversational,
                command: None,
                review_requested: false,
            };
        }
    }

    let (intent, confidence, rationale) = heuristic_classify(trimmed);
    let routing_mode = routing_mode(intent, confidence, flags);
    Classification {
        intent,
        confidence,
        rationale,
        routing_mode,
        command: None,
        review_requested: confidence < REVIEW_THRESHOLD,
    }
}

/// Reply shape expected from the low-confidence LLM fallback.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmClassification {
    pub intent: Intent,
    pub confidence: f32,
    pub reasoning: String,
}

/// Runs [`classify`], then escalates to `llm_fallback` when the heuristic result is
/// below [`CONFIDENCE_THRESHOLD`] and `flags.llm_fallback_enabled` is set. `llm_fallback`
/// is expected to prompt with a compact system message and parse a `{intent,
/// confidence, reasoning}` JSON reply; any error leaves the heuristic result in place.
pub async fn classify_with_llm_fallback<F, Fut>(
    message: &str,
    flags: ClassifierFlags,
    llm_fallback: F,
) -> Classification
where
    F: FnOnce(&str) -> Fut,
    Fut: std::future::Future<Output = Result<LlmClassification, crate::error::AgentError>>,
{
    let heuristic = classify(message, flags);
    if !flags.llm_fallback_enabled || heuristic.confidence >= CONFIDENCE_THRESHOLD {
        return heuristic;
    }

    match llm_fallback(message).await {
        Ok(resolved) => {
            let routing_mode = routing_mode(resolved.intent, resolved.confidence, flags);
            Classification {
                intent: resolved.intent,
                confidence: resolved.confidence,
                rationale: resolved.reasoning,
                routing_mode,
                command: None,
                review_requested: resolved.confidence < REVIEW_THRESHOLD,
            }
        }
        Err(_) => heuristic,
    }
}
