//! `kanban`: collaborative task board demo.
//!
//! Runs two replicas of the same board in one process, connected by an
//! in-memory sync link. Both edit the board concurrently, then the merged
//! result is printed. Configuration via CLI flags, environment variables,
//! or config file (`~/.config/kanban/config.toml`).
//!
//! ```bash
//! cargo run --bin kanban -- --author Ana
//!
//! # Machine-readable output
//! KANBAN_REPLICA_ID=laptop cargo run --bin kanban -- --json
//! ```

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use kanban_proto::task::TaskState;
use tracing_appender::non_blocking::WorkerGuard;

use kanban::config::{BoardConfig, CliArgs};
use kanban::model::TaskList;
use kanban::protocol::TaskBoard;
use kanban::store::{ChangeOrigin, Replica};
use kanban::sync;
use kanban::view::{self, TaskCard};

/// How long the demo waits for the two replicas to converge.
const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = CliArgs::parse();

    let config = match BoardConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: ignoring configuration: {e}");
            BoardConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    tracing::info!(replica = %config.replica_id, peer = %config.peer_id, "kanban starting");

    let local = Arc::new(Replica::new(config.replica_id.clone()));
    let peer = Arc::new(Replica::new(config.peer_id.clone()));
    let board = TaskBoard::new(Arc::clone(&local));
    let peer_board = TaskBoard::new(Arc::clone(&peer));

    board.on_change(Box::new(|snapshot: &TaskList, origin: ChangeOrigin| {
        tracing::info!(%origin, tasks = snapshot.len(), "board updated");
    }));

    let (local_sync, peer_sync) = sync::connect(Arc::clone(&local), Arc::clone(&peer));

    run_session(&config, &board, &peer_board).await;

    local_sync.abort();
    peer_sync.abort();

    let snapshot = board.snapshot();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_board(&snapshot);
    }

    tracing::info!("kanban exiting");
    Ok(())
}

/// Initialize file-based logging.
///
/// Logs go to a file so stdout stays clean for the board output. The
/// returned guard must be held until exit to flush buffered lines.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("kanban.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

/// Scripted editing session: both replicas work on the board at once.
async fn run_session(
    config: &BoardConfig,
    board: &TaskBoard<Replica>,
    peer_board: &TaskBoard<Replica>,
) {
    let Ok(first) = board.create_task(&config.author, "Write spec", config.default_stars) else {
        eprintln!("Please fill in both the name and task title.");
        return;
    };
    if let Err(e) = peer_board.create_task("Bo", "Review board layout", 1) {
        tracing::warn!(error = %e, "peer task rejected");
    }
    wait_for_sync(board, peer_board).await;

    // Concurrent edits to the same task: one moves it, the other retitles it.
    board.change_state(&first, TaskState::InProgress);
    peer_board.retitle_task(&first, "Write the spec");
    wait_for_sync(board, peer_board).await;

    let review = peer_board
        .column(TaskState::Backlog)
        .into_iter()
        .find(|t| t.author() == "Bo");
    if let Some(review) = review {
        peer_board.change_state(review.id(), TaskState::Done);
    }
    let scratch = board.create_task(&config.author, "Scratch idea", 1);
    if let Ok(scratch) = scratch {
        board.remove_task(&scratch);
    }
    wait_for_sync(board, peer_board).await;
}

/// Waits until both boards show the same document, or gives up after
/// [`SYNC_TIMEOUT`].
async fn wait_for_sync(board: &TaskBoard<Replica>, peer_board: &TaskBoard<Replica>) {
    let converged = tokio::time::timeout(SYNC_TIMEOUT, async {
        while board.snapshot() != peer_board.snapshot() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    if converged.is_err() {
        tracing::warn!("replicas did not converge within {SYNC_TIMEOUT:?}");
    }
}

fn print_board(snapshot: &TaskList) {
    for column in view::columns(snapshot) {
        println!("== {} ({}) ==", column.state.label(), column.tasks.len());
        for task in column.tasks {
            let card = TaskCard::from(task);
            let title = if card.struck {
                format!("~~{}~~", card.title)
            } else {
                card.title
            };
            let moves: Vec<&str> = card.moves.iter().map(|s| s.label()).collect();
            println!("  {} {}", card.heading, card.stars);
            println!("    {title}");
            println!("    move to: {}", moves.join(" | "));
        }
        println!();
    }
}
