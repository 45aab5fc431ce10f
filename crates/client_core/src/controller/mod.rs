//! Controller layer: typed UI commands, application state transitions, and
//! the backend worker that runs network commands against a `KanbanSession`.

pub mod app_state;
pub mod bridge;
pub mod commands;
pub mod events;
pub mod orchestration;

pub use app_state::{AppState, Modal, TaskDraft, UiCommand};
pub use commands::BackendCommand;
pub use events::{UiError, UiErrorCategory, UiErrorContext, UiEvent};
pub use orchestration::dispatch_backend_command;
