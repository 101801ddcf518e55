//! Async execution with progress reporting.

use tokio::sync::mpsc;

use reconcile_plan::ActionTable;

use crate::config::ExecuteConfig;
use crate::error::ExecuteError;
use crate::executor::ActionExecutor;
use crate::outcome::{ExecutionProgress, ExecutionSummary, RowReport};
use crate::EXECUTE_CHANNEL_SIZE;

/// Event emitted while a table executes.
#[derive(Debug)]
pub enum ExecuteEvent {
    /// A row is about to run.
    Progress(ExecutionProgress),
    /// A row finished.
    Row(RowReport),
    /// The run finished, or was refused before any row ran.
    Complete(Result<ExecutionSummary, ExecuteError>),
}

/// Start executing a table on a blocking task.
///
/// Returns a receiver for progress, per-row reports and the final result.
/// Dropping the receiver does not cancel the run.
pub fn start_execute(table: ActionTable, config: ExecuteConfig) -> mpsc::Receiver<ExecuteEvent> {
    let (tx, rx) = mpsc::channel(EXECUTE_CHANNEL_SIZE);

    tokio::task::spawn_blocking(move || {
        let executor = ActionExecutor::new(config);
        let result = executor.execute_with(&table, |event| {
            let _ = tx.blocking_send(event);
        });
        let _ = tx.blocking_send(ExecuteEvent::Complete(result));
    });

    rx
}
