use shared::{
    domain::{BoardId, TaskId},
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{code:?}: {message}")]
    Api { code: ErrorCode, message: String },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("task {task_id} on board {board_id} was rolled back after a failed commit: {reason}")]
    Divergence {
        board_id: BoardId,
        task_id: TaskId,
        reason: String,
    },
    #[error("realtime store failure: {0}")]
    Realtime(String),
    #[error("no board selected")]
    NoBoardSelected,
    #[error("task {0} is not on the selected board")]
    UnknownTask(TaskId),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Validation(_) => Some(ErrorCode::Validation),
            _ => None,
        }
    }

    /// Message suitable for a transient toast.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        Self::Api {
            code: value.code,
            message: value.message,
        }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(value: url::ParseError) -> Self {
        Self::Config(value.to_string())
    }
}
