//! Admin CLI for the orchestrator's durable checkpoint store: list, inspect,
//! cancel, replay, and garbage-collect workflows directly against `DB_URL`,
//! the same database the server's `/workflows/:id` route reads from.

use std::time::{SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use orchestrator_core::ids::WorkflowId;
use orchestrator_core::SqlxCheckpointStore;

const EXIT_OK: i32 = 0;
const EXIT_MISUSE: i32 = 2;
const EXIT_NOT_FOUND: i32 = 3;
const EXIT_CONFLICT: i32 = 4;
const EXIT_OTHER: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "orchestrator-admin")]
#[command(about = "Inspect and manage workflows in the checkpoint store")]
struct Args {
    #[command(subcommand)]
    cmd: Command,

    /// Checkpoint store connection string (default: $DB_URL)
    #[arg(long, env = "DB_URL")]
    db_url: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every known workflow, most recently updated first.
    ListWorkflows,
    /// Print the full stored snapshot for one workflow.
    ShowWorkflow { workflow_id: String },
    /// Force a workflow's status to `cancelled`.
    CancelWorkflow { workflow_id: String },
    /// Rebuild a summary of a workflow from its event log.
    Replay { workflow_id: String },
    /// Delete every workflow last updated more than `older_than` ago.
    Gc {
        /// Age threshold, e.g. "30d", "12h", "45m".
        #[arg(long)]
        older_than: String,
    },
}

#[tokio::main]
async fn main() {
    orchestrator_config::load_and_apply("orchestrator", None::<&std::path::Path>).ok();
    tracing_subscriber::fmt::try_init().ok();

    let args = Args::parse();
    let code = run(args).await;
    std::process::exit(code);
}

async fn run(args: Args) -> i32 {
    let store = match SqlxCheckpointStore::connect(&args.db_url).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("orchestrator-admin: failed to connect to {}: {e}", args.db_url);
            return EXIT_OTHER;
        }
    };

    match args.cmd {
        Command::ListWorkflows => list_workflows(&store).await,
        Command::ShowWorkflow { workflow_id } => show_workflow(&store, &workflow_id).await,
        Command::CancelWorkflow { workflow_id } => cancel_workflow(&store, &workflow_id).await,
        Command::Replay { workflow_id } => replay(&store, &workflow_id).await,
        Command::Gc { older_than } => gc(&store, &older_than).await,
    }
}

async fn list_workflows(store: &SqlxCheckpointStore) -> i32 {
    match store.list_workflows().await {
        Ok(rows) => {
            for row in rows {
                println!(
                    "{}\t{:?}\t{}",
                    row.workflow_id.as_str(),
                    row.status,
                    row.updated_at
                );
            }
            EXIT_OK
        }
        Err(e) => {
            eprintln!("orchestrator-admin: {e}");
            EXIT_OTHER
        }
    }
}

async fn show_workflow(store: &SqlxCheckpointStore, workflow_id: &str) -> i32 {
    let id = WorkflowId::from(workflow_id.to_string());
    match store.load_snapshot(&id).await {
        Ok(Some(state)) => {
            let json = serde_json::to_string_pretty(&state).unwrap_or_default();
            println!("{json}");
            EXIT_OK
        }
        Ok(None) => {
            eprintln!("orchestrator-admin: no such workflow {workflow_id}");
            EXIT_NOT_FOUND
        }
        Err(e) => {
            eprintln!("orchestrator-admin: {e}");
            EXIT_OTHER
        }
    }
}

async fn cancel_workflow(store: &SqlxCheckpointStore, workflow_id: &str) -> i32 {
    let id = WorkflowId::from(workflow_id.to_string());
    match store.cancel_workflow(&id).await {
        Ok(()) => {
            println!("cancelled {workflow_id}");
            EXIT_OK
        }
        Err(orchestrator_core::CheckpointStoreError::NotFound(_)) => {
            eprintln!("orchestrator-admin: no such workflow {workflow_id}");
            EXIT_NOT_FOUND
        }
        Err(e) => {
            eprintln!("orchestrator-admin: {e}");
            EXIT_CONFLICT
        }
    }
}

async fn replay(store: &SqlxCheckpointStore, workflow_id: &str) -> i32 {
    let id = WorkflowId::from(workflow_id.to_string());
    match store.replay(&id).await {
        Ok(summary) => {
            if summary.event_count == 0 {
                eprintln!("orchestrator-admin: no events for {workflow_id}");
                return EXIT_NOT_FOUND;
            }
            println!(
                "{}\tevents={}\tlast_seq={}\tlast_kind={:?}\tsnapshot_status={:?}",
                workflow_id,
                summary.event_count,
                summary.last_seq,
                summary.last_kind,
                summary.snapshot_status
            );
            EXIT_OK
        }
        Err(e) => {
            eprintln!("orchestrator-admin: {e}");
            EXIT_OTHER
        }
    }
}

async fn gc(store: &SqlxCheckpointStore, older_than: &str) -> i32 {
    let age_millis = match parse_duration_millis(older_than) {
        Some(ms) => ms,
        None => {
            eprintln!("orchestrator-admin: invalid --older-than {older_than:?}, expected e.g. 30d/12h/45m");
            return EXIT_MISUSE;
        }
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0);
    let cutoff = now - age_millis;

    match store.gc_older_than(cutoff).await {
        Ok(removed) => {
            println!("removed {removed} workflow(s) older than {older_than}");
            EXIT_OK
        }
        Err(e) => {
            eprintln!("orchestrator-admin: {e}");
            EXIT_OTHER
        }
    }
}

/// Parses a simple `<number><unit>` duration, unit one of `d`/`h`/`m`/`s`.
fn parse_duration_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    let unit = s.chars().last()?;
    let (digits, multiplier_ms) = match unit {
        'd' => (&s[..s.len() - 1], 86_400_000i64),
        'h' => (&s[..s.len() - 1], 3_600_000),
        'm' => (&s[..s.len() - 1], 60_000),
        's' => (&s[..s.len() - 1], 1_000),
        _ => (s, 1_000),
    };
    let n: i64 = digits.parse().ok()?;
    Some(n * multiplier_ms)
}
