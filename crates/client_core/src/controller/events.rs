//! Backend-to-UI events and error modeling for the controller.

use shared::{
    domain::{BoardId, TaskId, TaskStatus, UserProfile},
    error::ErrorCode,
    protocol::{Board, BoardSummary, NotificationRecord},
};

use crate::{error::ClientError, ClientEvent, Toast};

#[derive(Debug, Clone)]
pub enum UiEvent {
    Info(String),
    BoardsLoaded(Vec<BoardSummary>),
    BoardLoaded(Board),
    TaskMoved {
        board_id: BoardId,
        task_id: TaskId,
        status: TaskStatus,
    },
    /// A status commit was rejected; the optimistic move is withdrawn.
    MoveFailed {
        task_id: TaskId,
        status: TaskStatus,
    },
    BoardOrderSaved,
    NotificationsUpdated(Vec<NotificationRecord>),
    UserInvited(UserProfile),
    TimerStopped {
        task_id: TaskId,
        total: u64,
    },
    Toast(Toast),
    Error(UiError),
}

impl UiEvent {
    /// Maps session events; `None` for events the UI does not render.
    pub fn from_client_event(event: ClientEvent) -> Option<Self> {
        match event {
            ClientEvent::BoardsUpdated(boards) => Some(Self::BoardsLoaded(boards)),
            ClientEvent::BoardRefreshed(board) => Some(Self::BoardLoaded(board)),
            ClientEvent::TaskMoved {
                board_id,
                task_id,
                status,
            } => Some(Self::TaskMoved {
                board_id,
                task_id,
                status,
            }),
            ClientEvent::BoardsReordered(_) => Some(Self::BoardOrderSaved),
            ClientEvent::NotificationsUpdated(records) => Some(Self::NotificationsUpdated(records)),
            ClientEvent::Toast(toast) => Some(Self::Toast(toast)),
            // The error toast arrives as its own event.
            ClientEvent::CommitFailed {
                task_id,
                status,
                ..
            } => Some(Self::MoveFailed { task_id, status }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Boards,
    Task,
    Reorder,
    Members,
    Notifications,
    General,
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("session expired")
            || message_lower.contains("not logged in")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("invalid")
            || message_lower.contains("can't be empty")
            || message_lower.contains("already")
            || message_lower.contains("missing")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    /// Typed errors classify by variant; only untyped text falls back to
    /// keyword matching.
    pub fn from_client_error(context: UiErrorContext, err: &ClientError) -> Self {
        let category = match err {
            ClientError::Transport(_) => UiErrorCategory::Transport,
            ClientError::Validation(_)
            | ClientError::NoBoardSelected
            | ClientError::UnknownTask(_) => UiErrorCategory::Validation,
            ClientError::Api { code, .. } => match code {
                ErrorCode::Unauthorized | ErrorCode::Forbidden => UiErrorCategory::Auth,
                ErrorCode::Validation | ErrorCode::NotFound => UiErrorCategory::Validation,
                ErrorCode::RateLimited => UiErrorCategory::Transport,
                ErrorCode::Internal => UiErrorCategory::Unknown,
            },
            _ => return Self::from_message(context, err.user_message()),
        };
        Self {
            category,
            context,
            message: err.user_message(),
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
