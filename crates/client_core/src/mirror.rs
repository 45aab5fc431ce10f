//! Client-side copy of the selected board.
//!
//! The mirror is `{confirmed, overlay}`: `confirmed` is the last snapshot
//! the board service returned, `overlay` holds status moves the user made
//! that the service has not answered yet. Confirmed state is only ever
//! replaced wholesale by a refetch; it is never patched in place. A refetch
//! leaves the overlay alone: an entry lives until its own commit settles it.

use std::collections::BTreeMap;

use shared::{
    domain::{BoardId, TaskId, TaskStatus},
    protocol::{Board, Task},
};
use tracing::{debug, info};

use crate::error::{ClientError, ClientResult};

/// Tasks grouped by column, each column in board order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusColumns {
    pub todo: Vec<Task>,
    pub doing: Vec<Task>,
    pub done: Vec<Task>,
}

impl StatusColumns {
    pub fn partition(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut columns = Self::default();
        for task in tasks {
            columns.column_mut(task.status).push(task);
        }
        columns
    }

    pub fn column(&self, status: TaskStatus) -> &[Task] {
        match status {
            TaskStatus::Todo => &self.todo,
            TaskStatus::Doing => &self.doing,
            TaskStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: TaskStatus) -> &mut Vec<Task> {
        match status {
            TaskStatus::Todo => &mut self.todo,
            TaskStatus::Doing => &mut self.doing,
            TaskStatus::Done => &mut self.done,
        }
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.doing.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn status_of(&self, task_id: &TaskId) -> Option<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| self.column(*status).iter().any(|t| &t.task_id == task_id))
    }

    /// Flattens the columns back into one list, column by column.
    pub fn merge(self) -> Vec<Task> {
        let mut tasks = self.todo;
        tasks.extend(self.doing);
        tasks.extend(self.done);
        tasks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingMove {
    pub from: TaskStatus,
    pub to: TaskStatus,
    /// Identifies the move; a later move of the same task gets a higher one.
    pub seq: u64,
}

/// Outcome of installing a refetched snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefetchOutcome {
    Installed,
    /// The snapshot was requested under an older selection and was dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct BoardMirror {
    selected: Option<BoardId>,
    epoch: u64,
    confirmed: Option<Board>,
    overlay: BTreeMap<TaskId, PendingMove>,
    next_seq: u64,
}

impl BoardMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the mirror to another board. Older in-flight refetches
    /// become stale.
    pub fn select(&mut self, board_id: BoardId) -> u64 {
        self.epoch += 1;
        self.selected = Some(board_id);
        self.confirmed = None;
        self.overlay.clear();
        self.epoch
    }

    pub fn clear(&mut self) {
        self.epoch += 1;
        self.selected = None;
        self.confirmed = None;
        self.overlay.clear();
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn selected(&self) -> Option<&BoardId> {
        self.selected.as_ref()
    }

    pub fn confirmed(&self) -> Option<&Board> {
        self.confirmed.as_ref()
    }

    pub fn pending(&self) -> &BTreeMap<TaskId, PendingMove> {
        &self.overlay
    }

    pub fn has_pending(&self) -> bool {
        !self.overlay.is_empty()
    }

    /// Installs a snapshot fetched under `epoch`. Snapshots for another
    /// board or an older selection are discarded.
    pub fn replace_confirmed(&mut self, epoch: u64, board: Board) -> RefetchOutcome {
        if epoch != self.epoch || self.selected.as_ref() != Some(&board.board_id) {
            debug!(
                board_id = %board.board_id,
                epoch,
                current_epoch = self.epoch,
                "discarding stale board snapshot"
            );
            return RefetchOutcome::Stale;
        }
        info!(
            board_id = %board.board_id,
            tasks = board.tasks.len(),
            pending = self.overlay.len(),
            "board snapshot installed"
        );
        self.confirmed = Some(board);
        RefetchOutcome::Installed
    }

    /// Moves a task to `new_status` locally, without touching the network.
    pub fn apply_optimistic(
        &mut self,
        task_id: &TaskId,
        new_status: TaskStatus,
    ) -> ClientResult<PendingMove> {
        let confirmed = self.confirmed.as_ref().ok_or(ClientError::NoBoardSelected)?;
        let task = confirmed
            .task(task_id)
            .ok_or_else(|| ClientError::UnknownTask(task_id.clone()))?;
        let from = self.overlay.get(task_id).map_or(task.status, |pending| pending.to);
        self.next_seq += 1;
        let pending = PendingMove {
            from,
            to: new_status,
            seq: self.next_seq,
        };
        debug!(
            task_id = %task_id,
            from = %pending.from,
            to = %pending.to,
            seq = pending.seq,
            "optimistic move"
        );
        self.overlay.insert(task_id.clone(), pending);
        Ok(pending)
    }

    /// Drops the overlay entry of the move `seq` once its commit has been
    /// answered. A newer move of the same task stays in place.
    pub fn settle(&mut self, task_id: &TaskId, seq: u64) -> Option<PendingMove> {
        match self.overlay.get(task_id) {
            Some(pending) if pending.seq == seq => self.overlay.remove(task_id),
            Some(pending) => {
                debug!(task_id = %task_id, seq, newer = pending.seq, "newer move still pending");
                None
            }
            None => None,
        }
    }

    pub fn task(&self, task_id: &TaskId) -> Option<Task> {
        let mut task = self.confirmed.as_ref()?.task(task_id)?.clone();
        if let Some(pending) = self.overlay.get(task_id) {
            task.status = pending.to;
        }
        Some(task)
    }

    /// What the user sees: confirmed tasks with pending moves applied.
    pub fn current_view(&self) -> StatusColumns {
        let Some(board) = self.confirmed.as_ref() else {
            return StatusColumns::default();
        };
        StatusColumns::partition(board.tasks.iter().cloned().map(|mut task| {
            if let Some(pending) = self.overlay.get(&task.task_id) {
                task.status = pending.to;
            }
            task
        }))
    }
}

#[cfg(test)]
#[path = "tests/mirror_tests.rs"]
mod tests;
