//! Bounded post-approval poll for a follow-up proposal.
//!
//! After an approval lands, the backend's retrospective agent may produce a
//! follow-up proposal. The watch polls the status endpoint on a fixed
//! interval until it reports one, the ceiling elapses, or the handle is
//! cancelled. A failed tick degrades to "nothing new" inside the client and
//! the loop keeps going.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::ApiClient;

/// Seconds between status probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Wall-clock ceiling after which the watch stops unconditionally.
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The retrospective produced a follow-up proposal.
    NewProposal { proposal_id: Option<String> },
    /// The ceiling elapsed without a follow-up.
    TimedOut,
    /// The handle was cancelled (or the task torn down).
    Cancelled,
}

/// Owning handle for one spawned watch.
///
/// Each approval owns exactly one handle; dropping it without `join` leaves
/// the task running until its ceiling, `cancel` stops it deterministically.
#[derive(Debug)]
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<WatchOutcome>,
}

impl WatchHandle {
    /// Ask the watch to stop. Idempotent; `join` afterwards returns
    /// [`WatchOutcome::Cancelled`] unless the watch already finished.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the watch to finish and return how it ended.
    pub async fn join(self) -> WatchOutcome {
        self.task.await.unwrap_or(WatchOutcome::Cancelled)
    }
}

pub struct RetrospectiveWatch;

impl RetrospectiveWatch {
    /// Spawn a watch polling `retrospective_status(workspace_id, since)`
    /// every `interval`, stopping at `ceiling` at the latest.
    pub fn spawn(
        client: Arc<ApiClient>,
        workspace_id: String,
        since: DateTime<Utc>,
        interval: Duration,
        ceiling: Duration,
    ) -> WatchHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + ceiling;
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        debug!(%workspace_id, "retrospective watch cancelled");
                        return WatchOutcome::Cancelled;
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        info!(%workspace_id, "retrospective watch reached its ceiling");
                        return WatchOutcome::TimedOut;
                    }
                    _ = ticker.tick() => {
                        let status = client.retrospective_status(&workspace_id, since).await;
                        if status.new_proposal {
                            info!(%workspace_id, proposal_id = ?status.proposal_id,
                                "retrospective produced a follow-up proposal");
                            return WatchOutcome::NewProposal {
                                proposal_id: status.proposal_id,
                            };
                        }
                        debug!(%workspace_id, "no follow-up proposal yet");
                    }
                }
            }
        });

        WatchHandle { cancel, task }
    }

    /// Spawn with the production interval and ceiling.
    pub fn spawn_default(
        client: Arc<ApiClient>,
        workspace_id: String,
        since: DateTime<Utc>,
    ) -> WatchHandle {
        Self::spawn(
            client,
            workspace_id,
            since,
            DEFAULT_POLL_INTERVAL,
            DEFAULT_POLL_CEILING,
        )
    }
}
