//! Commit engine: persists local changes and reconverges the mirror with the
//! board service.
//!
//! Every commit answer, success or failure, settles the move's own overlay
//! entry and triggers a refetch, so a failed write never leaves a status on
//! screen that the server does not have. Moves still in flight keep their
//! entries across that refetch.

use std::sync::Arc;

use shared::{
    domain::{BoardId, TaskId, TaskStatus},
    protocol::{ReorderEntry, TaskPatch},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    api::BoardApi,
    error::{ClientError, ClientResult},
    mirror::{BoardMirror, PendingMove, RefetchOutcome},
    reorder::ReorderTracker,
    ClientEvent, Toast,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCommit {
    pub task_id: TaskId,
    pub status: TaskStatus,
    /// `None` when the follow-up refetch failed; the next refetch repairs it.
    pub refetch: Option<RefetchOutcome>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// The final order matched the committed one; no request was sent.
    Unchanged,
    Committed(Vec<ReorderEntry>),
}

#[derive(Clone)]
pub struct CommitEngine {
    api: Arc<dyn BoardApi>,
    events: broadcast::Sender<ClientEvent>,
}

impl CommitEngine {
    pub fn new(api: Arc<dyn BoardApi>, events: broadcast::Sender<ClientEvent>) -> Self {
        Self { api, events }
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    /// Fetches the selected board and installs it unless the selection
    /// changed while the request was in flight.
    pub async fn refetch(&self, mirror: &Mutex<BoardMirror>) -> ClientResult<RefetchOutcome> {
        let (board_id, epoch) = {
            let guard = mirror.lock().await;
            let board_id = guard.selected().cloned().ok_or(ClientError::NoBoardSelected)?;
            (board_id, guard.epoch())
        };
        self.refetch_at(mirror, &board_id, epoch).await
    }

    async fn refetch_at(
        &self,
        mirror: &Mutex<BoardMirror>,
        board_id: &BoardId,
        epoch: u64,
    ) -> ClientResult<RefetchOutcome> {
        let board = self.api.get_board(board_id).await?;
        let outcome = mirror.lock().await.replace_confirmed(epoch, board.clone());
        if outcome == RefetchOutcome::Installed {
            self.emit(ClientEvent::BoardRefreshed(board));
        }
        Ok(outcome)
    }

    async fn refetch_logged(
        &self,
        mirror: &Mutex<BoardMirror>,
        board_id: &BoardId,
        epoch: u64,
    ) -> Option<RefetchOutcome> {
        match self.refetch_at(mirror, board_id, epoch).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                warn!(board_id = %board_id, "refetch after commit failed: {err}");
                None
            }
        }
    }

    /// Persists a status move. Settles the task's pending overlay entry when
    /// it targets `new_status`; works the same without one.
    pub async fn commit_status_change(
        &self,
        mirror: &Mutex<BoardMirror>,
        task_id: &TaskId,
        new_status: TaskStatus,
    ) -> ClientResult<StatusCommit> {
        let seq = mirror
            .lock()
            .await
            .pending()
            .get(task_id)
            .filter(|pending| pending.to == new_status)
            .map(|pending| pending.seq);
        self.commit_status(mirror, task_id, new_status, seq).await
    }

    /// Persists a move already applied with `BoardMirror::apply_optimistic`.
    pub async fn commit_move(
        &self,
        mirror: &Mutex<BoardMirror>,
        task_id: &TaskId,
        pending: PendingMove,
    ) -> ClientResult<StatusCommit> {
        self.commit_status(mirror, task_id, pending.to, Some(pending.seq))
            .await
    }

    async fn commit_status(
        &self,
        mirror: &Mutex<BoardMirror>,
        task_id: &TaskId,
        new_status: TaskStatus,
        seq: Option<u64>,
    ) -> ClientResult<StatusCommit> {
        let (board_id, epoch) = {
            let guard = mirror.lock().await;
            let board_id = guard.selected().cloned().ok_or(ClientError::NoBoardSelected)?;
            (board_id, guard.epoch())
        };

        let result = self
            .api
            .update_task(&board_id, task_id, &TaskPatch::status(new_status))
            .await;
        if let Some(seq) = seq {
            mirror.lock().await.settle(task_id, seq);
        }

        match result {
            Ok(()) => {
                info!(board_id = %board_id, task_id = %task_id, status = %new_status, "task status committed");
                self.emit(ClientEvent::TaskMoved {
                    board_id: board_id.clone(),
                    task_id: task_id.clone(),
                    status: new_status,
                });
                self.emit(ClientEvent::Toast(Toast::success(format!(
                    "Moved to {}",
                    new_status.label()
                ))));
                let refetch = self.refetch_logged(mirror, &board_id, epoch).await;
                Ok(StatusCommit {
                    task_id: task_id.clone(),
                    status: new_status,
                    refetch,
                })
            }
            Err(err) => {
                warn!(board_id = %board_id, task_id = %task_id, status = %new_status, "task status commit failed: {err}");
                let message = err.user_message();
                self.emit(ClientEvent::CommitFailed {
                    board_id: board_id.clone(),
                    task_id: task_id.clone(),
                    status: new_status,
                    message: message.clone(),
                });
                self.emit(ClientEvent::Toast(Toast::error(format!(
                    "Could not move task: {message}"
                ))));
                self.refetch_logged(mirror, &board_id, epoch).await;
                Err(ClientError::Divergence {
                    board_id,
                    task_id: task_id.clone(),
                    reason: message,
                })
            }
        }
    }

    /// Sends any task edit and invalidates the mirror afterwards.
    pub async fn commit_task_patch(
        &self,
        mirror: &Mutex<BoardMirror>,
        task_id: &TaskId,
        patch: &TaskPatch,
        success_message: Option<&str>,
    ) -> ClientResult<Option<RefetchOutcome>> {
        let (board_id, epoch) = {
            let guard = mirror.lock().await;
            let board_id = guard.selected().cloned().ok_or(ClientError::NoBoardSelected)?;
            (board_id, guard.epoch())
        };

        if let Err(err) = self.api.update_task(&board_id, task_id, patch).await {
            warn!(board_id = %board_id, task_id = %task_id, "task edit failed: {err}");
            self.emit(ClientEvent::Toast(Toast::error("Could not edit task")));
            return Err(err);
        }
        if let Some(message) = success_message {
            self.emit(ClientEvent::Toast(Toast::success(message)));
        }
        Ok(self.refetch_logged(mirror, &board_id, epoch).await)
    }

    /// Diffs `proposed` against the last committed board order and sends
    /// only the changed slots. An unchanged order issues no request.
    pub async fn commit_reorder(
        &self,
        tracker: &Mutex<ReorderTracker>,
        proposed: Vec<BoardId>,
    ) -> ClientResult<ReorderOutcome> {
        let diff = {
            let mut guard = tracker.lock().await;
            let diff = guard.propose(proposed)?;
            if diff.is_empty() {
                return Ok(ReorderOutcome::Unchanged);
            }
            diff
        };
        self.commit_pending_reorder(tracker, diff).await
    }

    /// Commits a diff produced by `ReorderTracker::end_drag`.
    pub async fn commit_pending_reorder(
        &self,
        tracker: &Mutex<ReorderTracker>,
        diff: Vec<ReorderEntry>,
    ) -> ClientResult<ReorderOutcome> {
        if diff.is_empty() {
            return Ok(ReorderOutcome::Unchanged);
        }
        tracker.lock().await.begin_commit()?;

        let result = self.api.reorder_boards(&diff).await;
        tracker.lock().await.finish_commit(result.is_ok());

        match result {
            Ok(()) => {
                info!(changed = diff.len(), "board order committed");
                self.emit(ClientEvent::BoardsReordered(diff.clone()));
                self.emit(ClientEvent::Toast(Toast::success("Board order changed")));
                Ok(ReorderOutcome::Committed(diff))
            }
            Err(err) => {
                warn!("board reorder failed: {err}");
                self.emit(ClientEvent::Toast(Toast::error("Could not update board order")));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
