//! Background scheduling of accepted rounds.

use std::sync::Arc;

use pagesmith_core::TaskRequest;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::executor::{RoundOrchestrator, RoundOutcome};
use crate::resources::TaskLocks;

/// Runs each accepted request as an independent background task.
///
/// Rounds for the same task id wait for each other; everything else runs
/// concurrently.
#[derive(Clone)]
pub struct TaskDispatcher {
    orchestrator: Arc<RoundOrchestrator>,
    locks: TaskLocks,
}

impl TaskDispatcher {
    pub fn new(orchestrator: Arc<RoundOrchestrator>) -> Self {
        Self {
            orchestrator,
            locks: TaskLocks::new(),
        }
    }

    /// Schedules `request` and returns without waiting for any of its work.
    pub fn submit(&self, request: TaskRequest) -> JoinHandle<()> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "round",
            run_id = %run_id,
            task = %request.task,
            round = request.round
        );

        let orchestrator = self.orchestrator.clone();
        let locks = self.locks.clone();

        tokio::spawn(
            async move {
                let _guard = locks.acquire(&request.task).await;

                match orchestrator.run(&request).await {
                    Ok(RoundOutcome::Completed(report)) if !report.delivered => {
                        error!(
                            commit = %report.publication.commit_sha,
                            "Round published but evaluator was not notified"
                        );
                    }
                    Ok(RoundOutcome::Completed(_)) => {}
                    Ok(RoundOutcome::Skipped { round }) => {
                        info!(round, "Round skipped");
                    }
                    Err(e) => {
                        error!(error = %e, "Round failed");
                    }
                }
            }
            .instrument(span),
        )
    }

    pub fn active_tasks(&self) -> usize {
        self.locks.active()
    }
}
