//! Drag/drop coordinator for moving task cards between status columns.
//!
//! A press only records a pending drag; the drag starts once the pointer
//! has moved past `DRAG_THRESHOLD_PX`, so a plain click on a card still
//! opens it. Every release or cancel returns the coordinator to idle.

use shared::domain::{TaskId, TaskStatus};
use tracing::debug;

/// Movement threshold in pixels before a press becomes a drag.
pub const DRAG_THRESHOLD_PX: i32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub task_id: TaskId,
    pub source: TaskStatus,
    pub hover: Option<TaskStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingPress {
    task_id: TaskId,
    source: TaskStatus,
    start_x: i32,
    start_y: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Idle,
    Pressed(PendingPress),
    Dragging(DragSession),
}

/// Terminal result of a gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Released over another column: the only outcome that mutates state.
    Moved {
        task_id: TaskId,
        from: TaskStatus,
        to: TaskStatus,
    },
    SameColumn { task_id: TaskId },
    OutsideTarget { task_id: TaskId },
    Cancelled { task_id: TaskId },
    /// Released before the threshold was crossed.
    Click { task_id: TaskId },
}

impl DropOutcome {
    pub fn task_id(&self) -> &TaskId {
        match self {
            Self::Moved { task_id, .. }
            | Self::SameColumn { task_id }
            | Self::OutsideTarget { task_id }
            | Self::Cancelled { task_id }
            | Self::Click { task_id } => task_id,
        }
    }

    pub fn requires_commit(&self) -> bool {
        matches!(self, Self::Moved { .. })
    }
}

#[derive(Debug, Default)]
pub struct DragCoordinator {
    phase: Phase,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.phase, Phase::Dragging(_))
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.phase {
            Phase::Dragging(session) => Some(session),
            _ => None,
        }
    }

    /// Column the card is currently highlighted over.
    pub fn hover_target(&self) -> Option<TaskStatus> {
        self.session().and_then(|session| session.hover)
    }

    /// Pointer-down on a card. Ignored while another gesture is active.
    pub fn press(&mut self, task_id: TaskId, source: TaskStatus, x: i32, y: i32) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.phase = Phase::Pressed(PendingPress {
            task_id,
            source,
            start_x: x,
            start_y: y,
        });
        true
    }

    /// Pointer movement; promotes a press into a drag once past the
    /// threshold. Returns true when a drag started on this call.
    pub fn pointer_moved(&mut self, x: i32, y: i32) -> bool {
        let Phase::Pressed(press) = &self.phase else {
            return false;
        };
        let threshold = DRAG_THRESHOLD_PX.unsigned_abs();
        if x.abs_diff(press.start_x) <= threshold && y.abs_diff(press.start_y) <= threshold {
            return false;
        }
        let (task_id, source) = (press.task_id.clone(), press.source);
        self.begin(task_id, source)
    }

    /// Starts a drag directly, skipping the movement threshold.
    pub fn begin(&mut self, task_id: TaskId, source: TaskStatus) -> bool {
        if self.is_dragging() {
            return false;
        }
        debug!(task_id = %task_id, source = %source, "drag started");
        self.phase = Phase::Dragging(DragSession {
            task_id,
            source,
            hover: None,
        });
        true
    }

    pub fn enter_column(&mut self, status: TaskStatus) {
        if let Phase::Dragging(session) = &mut self.phase {
            session.hover = Some(status);
        }
    }

    pub fn leave_column(&mut self) {
        if let Phase::Dragging(session) = &mut self.phase {
            session.hover = None;
        }
    }

    /// Pointer-up at the current hover target.
    pub fn release(&mut self) -> Option<DropOutcome> {
        let target = self.hover_target();
        self.drop_on(target)
    }

    /// Pointer-up over `target` (`None` = outside every column).
    pub fn drop_on(&mut self, target: Option<TaskStatus>) -> Option<DropOutcome> {
        let outcome = match std::mem::take(&mut self.phase) {
            Phase::Idle => return None,
            Phase::Pressed(press) => DropOutcome::Click {
                task_id: press.task_id,
            },
            Phase::Dragging(session) => match target {
                None => DropOutcome::OutsideTarget {
                    task_id: session.task_id,
                },
                Some(to) if to == session.source => DropOutcome::SameColumn {
                    task_id: session.task_id,
                },
                Some(to) => DropOutcome::Moved {
                    task_id: session.task_id,
                    from: session.source,
                    to,
                },
            },
        };
        debug!(?outcome, "drag finished");
        Some(outcome)
    }

    /// Escape or lost pointer capture.
    pub fn cancel(&mut self) -> Option<DropOutcome> {
        match std::mem::take(&mut self.phase) {
            Phase::Idle => None,
            Phase::Pressed(press) => Some(DropOutcome::Cancelled {
                task_id: press.task_id,
            }),
            Phase::Dragging(session) => Some(DropOutcome::Cancelled {
                task_id: session.task_id,
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/drag_tests.rs"]
mod tests;
