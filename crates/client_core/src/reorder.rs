//! Board list reordering.
//!
//! While the pointer moves, every permutation stays local. Only the order
//! present when the drag ends is diffed against the last committed order,
//! and only the slots whose id changed are sent.

use std::collections::HashSet;

use shared::{domain::BoardId, protocol::ReorderEntry};
use tracing::debug;

use crate::error::{ClientError, ClientResult};

/// Payload for `PATCH /kanban/boards/reorder`: one entry per index whose
/// board id differs between `committed` and `proposed`.
pub fn diff_order(committed: &[BoardId], proposed: &[BoardId]) -> ClientResult<Vec<ReorderEntry>> {
    ensure_permutation(committed, proposed)?;
    Ok(committed
        .iter()
        .zip(proposed)
        .enumerate()
        .filter(|(_, (before, after))| before != after)
        .map(|(index, (_, after))| ReorderEntry {
            board_id: after.clone(),
            order: index as i64,
        })
        .collect())
}

fn ensure_permutation(committed: &[BoardId], proposed: &[BoardId]) -> ClientResult<()> {
    if committed.len() != proposed.len() {
        return Err(ClientError::validation(format!(
            "reorder must keep all {} boards, got {}",
            committed.len(),
            proposed.len()
        )));
    }
    let known: HashSet<&BoardId> = committed.iter().collect();
    let mut seen = HashSet::with_capacity(proposed.len());
    for board_id in proposed {
        if !known.contains(board_id) {
            return Err(ClientError::validation(format!("unknown board {board_id}")));
        }
        if !seen.insert(board_id) {
            return Err(ClientError::validation(format!("board {board_id} listed twice")));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderPhase {
    Idle,
    DragStarted,
    Reordering,
    DragEnded,
    Committing,
}

#[derive(Debug)]
pub struct ReorderTracker {
    committed: Vec<BoardId>,
    working: Vec<BoardId>,
    dragged: Option<BoardId>,
    phase: ReorderPhase,
}

impl Default for ReorderTracker {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ReorderTracker {
    pub fn new(committed: Vec<BoardId>) -> Self {
        Self {
            working: committed.clone(),
            committed,
            dragged: None,
            phase: ReorderPhase::Idle,
        }
    }

    pub fn phase(&self) -> ReorderPhase {
        self.phase
    }

    pub fn committed(&self) -> &[BoardId] {
        &self.committed
    }

    /// Order to render: the working permutation during a gesture.
    pub fn view(&self) -> &[BoardId] {
        &self.working
    }

    /// Replaces the committed order with what the server returned. Ignored
    /// during a gesture or commit so the user's drag is not yanked away.
    pub fn load(&mut self, order: Vec<BoardId>) -> bool {
        if self.phase != ReorderPhase::Idle {
            debug!(phase = ?self.phase, "board list refresh deferred during reorder");
            return false;
        }
        self.working = order.clone();
        self.committed = order;
        true
    }

    pub fn start_drag(&mut self, board_id: BoardId) -> ClientResult<()> {
        if self.phase != ReorderPhase::Idle {
            return Err(ClientError::validation("a board reorder is already in progress"));
        }
        if !self.working.contains(&board_id) {
            return Err(ClientError::validation(format!("unknown board {board_id}")));
        }
        self.dragged = Some(board_id);
        self.phase = ReorderPhase::DragStarted;
        Ok(())
    }

    /// Moves the dragged board to `index` in the working order.
    pub fn hover_index(&mut self, index: usize) -> ClientResult<()> {
        if !matches!(self.phase, ReorderPhase::DragStarted | ReorderPhase::Reordering) {
            return Err(ClientError::validation("no board is being dragged"));
        }
        let Some(dragged) = self.dragged.as_ref() else {
            return Err(ClientError::validation("no board is being dragged"));
        };
        let Some(from) = self.working.iter().position(|id| id == dragged) else {
            return Err(ClientError::validation(format!("unknown board {dragged}")));
        };
        let to = index.min(self.working.len().saturating_sub(1));
        let board = self.working.remove(from);
        self.working.insert(to, board);
        self.phase = ReorderPhase::Reordering;
        Ok(())
    }

    /// Ends the gesture and returns the minimal payload. An empty payload
    /// means nothing to commit; the tracker is idle again in that case.
    pub fn end_drag(&mut self) -> ClientResult<Vec<ReorderEntry>> {
        if !matches!(self.phase, ReorderPhase::DragStarted | ReorderPhase::Reordering) {
            return Err(ClientError::validation("no board is being dragged"));
        }
        self.dragged = None;
        let diff = diff_order(&self.committed, &self.working)?;
        self.phase = if diff.is_empty() {
            ReorderPhase::Idle
        } else {
            ReorderPhase::DragEnded
        };
        Ok(diff)
    }

    pub fn cancel_drag(&mut self) {
        if matches!(self.phase, ReorderPhase::DragStarted | ReorderPhase::Reordering) {
            self.working = self.committed.clone();
            self.dragged = None;
            self.phase = ReorderPhase::Idle;
        }
    }

    /// Replaces the working order wholesale (keyboard reorder, CLI) and
    /// returns the diff, leaving the tracker in `DragEnded` when non-empty.
    pub fn propose(&mut self, proposed: Vec<BoardId>) -> ClientResult<Vec<ReorderEntry>> {
        if self.phase != ReorderPhase::Idle {
            return Err(ClientError::validation("a board reorder is already in progress"));
        }
        let diff = diff_order(&self.committed, &proposed)?;
        if !diff.is_empty() {
            self.working = proposed;
            self.phase = ReorderPhase::DragEnded;
        }
        Ok(diff)
    }

    pub fn begin_commit(&mut self) -> ClientResult<()> {
        if self.phase != ReorderPhase::DragEnded {
            return Err(ClientError::validation("no finished reorder to commit"));
        }
        self.phase = ReorderPhase::Committing;
        Ok(())
    }

    /// Settles a commit: success promotes the working order, failure
    /// restores the last committed one.
    pub fn finish_commit(&mut self, success: bool) {
        if success {
            self.committed = self.working.clone();
        } else {
            self.working = self.committed.clone();
        }
        self.phase = ReorderPhase::Idle;
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
