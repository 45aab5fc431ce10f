pub mod api;
pub mod config;
pub mod controller;
pub mod drag;
pub mod error;
pub mod mirror;
pub mod realtime;
pub mod reconcile;
pub mod reorder;
pub mod session;
pub mod timer;

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

use shared::{
    domain::{BoardId, TaskId, TaskStatus},
    protocol::{Board, BoardSummary, NotificationRecord, ReorderEntry},
};

pub use api::{BoardApi, HttpBoardApi};
pub use config::{load_settings, Environment, Settings};
pub use drag::{DragCoordinator, DropOutcome};
pub use error::{ClientError, ClientResult};
pub use mirror::{BoardMirror, RefetchOutcome, StatusColumns};
pub use realtime::{
    FirebaseRealtimeStore, InMemoryRealtimeStore, MissingRealtimeStore, RealtimeStore,
};
pub use reconcile::{CommitEngine, ReorderOutcome, StatusCommit};
pub use reorder::{ReorderPhase, ReorderTracker};
pub use session::KanbanSession;
pub use timer::{format_tracked, TaskTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
}

/// Transient message for the user. Never blocks an interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    BoardsUpdated(Vec<BoardSummary>),
    BoardRefreshed(Board),
    TaskMoved {
        board_id: BoardId,
        task_id: TaskId,
        status: TaskStatus,
    },
    CommitFailed {
        board_id: BoardId,
        task_id: TaskId,
        status: TaskStatus,
        message: String,
    },
    BoardsReordered(Vec<ReorderEntry>),
    NotificationsUpdated(Vec<NotificationRecord>),
    Toast(Toast),
}
