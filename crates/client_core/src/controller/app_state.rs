//! Page-scoped application state and its typed UI commands.
//!
//! `AppState` is owned by whoever drives the UI. It changes only through
//! `apply` (user input) and `handle_event` (backend results); commands that
//! need the network come back as a `BackendCommand` for the caller to queue.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shared::{
    domain::{BoardId, Priority, SubtaskId, TaskId, TaskStatus},
    protocol::{Board, BoardSummary, CreateTaskRequest, NewSubtask, NotificationRecord, TaskPatch},
};

use crate::{
    controller::{
        commands::BackendCommand,
        events::{UiError, UiErrorContext, UiEvent},
    },
    drag::{DragCoordinator, DropOutcome},
    mirror::StatusColumns,
    realtime::unread_count,
    Toast,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    CreateBoard,
    RenameBoard(BoardId),
    DeleteBoard(BoardId),
    AddTask,
    TaskDetails(TaskId),
    EditTask(TaskId),
    DeleteTask(TaskId),
    InviteMember(BoardId),
}

/// Form state shared by the add-task and edit-task dialogs.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub subtasks: Vec<String>,
    pub deadline: Option<DateTime<Utc>>,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            // The add-task dialog opens with two empty subtask rows.
            subtasks: vec![String::new(), String::new()],
            deadline: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiCommand {
    /// The dialog close button.
    Close,
    ToggleOptionMenu,
    ToggleSidebar,
    OpenCreateBoard,
    OpenRenameBoard,
    OpenDeleteBoard,
    OpenAddTask,
    OpenTaskDetails(TaskId),
    OpenEditTask(TaskId),
    OpenDeleteTask(TaskId),
    OpenInvite,
    SetBoardName(String),
    SetTaskTitle(String),
    SetTaskDescription(String),
    SetTaskStatus(TaskStatus),
    SetTaskPriority(Priority),
    SetTaskDeadline(Option<DateTime<Utc>>),
    AddSubtaskField,
    SetSubtaskField { index: usize, name: String },
    RemoveSubtaskField(usize),
    SetInviteEmail(String),
    Search(String),
    SelectBoard(BoardId),
    /// The dialog submit button; its meaning depends on the open dialog.
    Submit,
    ToggleSubtask {
        task_id: TaskId,
        subtask_id: SubtaskId,
        checked: bool,
    },
    ChangePriority {
        task_id: TaskId,
        priority: Priority,
    },
    StartTimer(TaskId),
    StopTimer(TaskId),
    ResetTimer(TaskId),
    PressTask {
        task_id: TaskId,
        x: i32,
        y: i32,
    },
    PointerMoved {
        x: i32,
        y: i32,
    },
    EnterColumn(TaskStatus),
    LeaveColumn,
    Release,
    CancelDrag,
    MarkNotificationsRead,
    DismissToast,
}

/// A dropped card shown in its new column before the backend confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OptimisticMove {
    to: TaskStatus,
    /// The status commit succeeded; the entry goes with the next snapshot.
    committed: bool,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub boards: Vec<BoardSummary>,
    pub selected_board: Option<BoardId>,
    pub board: Option<Board>,
    pub sidebar_open: bool,
    pub option_menu_open: bool,
    pub modal: Option<Modal>,
    pub search: String,
    pub board_name_draft: String,
    pub task_draft: TaskDraft,
    pub invite_email_draft: String,
    pub notifications: Vec<NotificationRecord>,
    pub toasts: Vec<Toast>,
    pub last_error: Option<UiError>,
    pub status: String,
    pub drag: DragCoordinator,
    moves: BTreeMap<TaskId, OptimisticMove>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sidebar_open: true,
            ..Self::default()
        }
    }

    pub fn unread_notifications(&self) -> usize {
        unread_count(&self.notifications)
    }

    /// Columns of the last backend snapshot with dropped cards already in
    /// their new column.
    pub fn columns(&self) -> StatusColumns {
        let Some(board) = self.board.as_ref() else {
            return StatusColumns::default();
        };
        StatusColumns::partition(board.tasks.iter().cloned().map(|mut task| {
            if let Some(pending) = self.moves.get(&task.task_id) {
                task.status = pending.to;
            }
            task
        }))
    }

    pub fn task_status(&self, task_id: &TaskId) -> Option<TaskStatus> {
        if let Some(pending) = self.moves.get(task_id) {
            return Some(pending.to);
        }
        Some(self.board.as_ref()?.task(task_id)?.status)
    }

    pub fn has_pending_moves(&self) -> bool {
        !self.moves.is_empty()
    }

    fn forget_board(&mut self) {
        self.board = None;
        self.moves.clear();
    }

    fn close_modal(&mut self) {
        self.modal = None;
        self.option_menu_open = false;
        self.board_name_draft.clear();
        self.invite_email_draft.clear();
        self.task_draft = TaskDraft::default();
    }

    fn open_modal(&mut self, modal: Modal) {
        self.option_menu_open = false;
        self.modal = Some(modal);
    }

    fn reject(&mut self, message: impl Into<String>) -> Option<BackendCommand> {
        let error = UiError::from_message(UiErrorContext::General, message);
        self.status = error.message().to_string();
        self.last_error = Some(error);
        None
    }

    pub fn apply(&mut self, command: UiCommand) -> Option<BackendCommand> {
        match command {
            UiCommand::Close => {
                self.close_modal();
                None
            }
            UiCommand::ToggleOptionMenu => {
                self.option_menu_open = !self.option_menu_open;
                None
            }
            UiCommand::ToggleSidebar => {
                self.sidebar_open = !self.sidebar_open;
                None
            }
            UiCommand::OpenCreateBoard => {
                self.board_name_draft.clear();
                self.open_modal(Modal::CreateBoard);
                None
            }
            UiCommand::OpenRenameBoard => {
                let Some(board) = self.board.as_ref() else {
                    return self.reject("Select a board first");
                };
                let (board_id, name) = (board.board_id.clone(), board.board_name.clone());
                self.board_name_draft = name;
                self.open_modal(Modal::RenameBoard(board_id));
                None
            }
            UiCommand::OpenDeleteBoard => {
                let Some(board_id) = self.selected_board.clone() else {
                    return self.reject("Select a board first");
                };
                self.open_modal(Modal::DeleteBoard(board_id));
                None
            }
            UiCommand::OpenAddTask => {
                if self.selected_board.is_none() {
                    return self.reject("Select a board first");
                }
                self.task_draft = TaskDraft::default();
                self.open_modal(Modal::AddTask);
                None
            }
            UiCommand::OpenTaskDetails(task_id) => {
                self.open_modal(Modal::TaskDetails(task_id));
                None
            }
            UiCommand::OpenEditTask(task_id) => {
                let Some(task) = self.board.as_ref().and_then(|b| b.task(&task_id)) else {
                    return self.reject("Task is no longer on this board");
                };
                self.task_draft = TaskDraft {
                    title: task.title.clone(),
                    description: task.description.clone(),
                    status: task.status,
                    priority: task.priority,
                    subtasks: task.subtasks.iter().map(|s| s.name.clone()).collect(),
                    deadline: task.deadline,
                };
                self.open_modal(Modal::EditTask(task_id));
                None
            }
            UiCommand::OpenDeleteTask(task_id) => {
                self.open_modal(Modal::DeleteTask(task_id));
                None
            }
            UiCommand::OpenInvite => {
                let Some(board_id) = self.selected_board.clone() else {
                    return self.reject("Select a board first");
                };
                self.invite_email_draft.clear();
                self.open_modal(Modal::InviteMember(board_id));
                None
            }
            UiCommand::SetBoardName(name) => {
                self.board_name_draft = name;
                None
            }
            UiCommand::SetTaskTitle(title) => {
                self.task_draft.title = title;
                None
            }
            UiCommand::SetTaskDescription(description) => {
                self.task_draft.description = description;
                None
            }
            UiCommand::SetTaskStatus(status) => {
                self.task_draft.status = status;
                None
            }
            UiCommand::SetTaskPriority(priority) => {
                self.task_draft.priority = priority;
                None
            }
            UiCommand::SetTaskDeadline(deadline) => {
                self.task_draft.deadline = deadline;
                None
            }
            UiCommand::AddSubtaskField => {
                self.task_draft.subtasks.push(String::new());
                None
            }
            UiCommand::SetSubtaskField { index, name } => {
                if let Some(field) = self.task_draft.subtasks.get_mut(index) {
                    *field = name;
                }
                None
            }
            UiCommand::RemoveSubtaskField(index) => {
                if index < self.task_draft.subtasks.len() {
                    self.task_draft.subtasks.remove(index);
                }
                None
            }
            UiCommand::SetInviteEmail(email) => {
                self.invite_email_draft = email;
                None
            }
            UiCommand::Search(query) => {
                self.search = query;
                let query = self.search.trim();
                Some(BackendCommand::LoadBoards {
                    query: (!query.is_empty()).then(|| query.to_string()),
                })
            }
            UiCommand::SelectBoard(board_id) => {
                if self.selected_board.as_ref() == Some(&board_id) {
                    return None;
                }
                self.selected_board = Some(board_id.clone());
                self.forget_board();
                self.option_menu_open = false;
                Some(BackendCommand::SelectBoard { board_id })
            }
            UiCommand::Submit => self.submit(),
            UiCommand::ToggleSubtask {
                task_id,
                subtask_id,
                checked,
            } => Some(BackendCommand::SetSubtaskStatus {
                task_id,
                subtask_id,
                checked,
            }),
            UiCommand::ChangePriority { task_id, priority } => {
                Some(BackendCommand::ChangePriority { task_id, priority })
            }
            UiCommand::StartTimer(task_id) => Some(BackendCommand::StartTimer { task_id }),
            UiCommand::StopTimer(task_id) => Some(BackendCommand::StopTimer { task_id }),
            UiCommand::ResetTimer(task_id) => Some(BackendCommand::ResetTimer { task_id }),
            UiCommand::PressTask { task_id, x, y } => {
                let source = self.task_status(&task_id)?;
                self.drag.press(task_id, source, x, y);
                None
            }
            UiCommand::PointerMoved { x, y } => {
                self.drag.pointer_moved(x, y);
                None
            }
            UiCommand::EnterColumn(status) => {
                self.drag.enter_column(status);
                None
            }
            UiCommand::LeaveColumn => {
                self.drag.leave_column();
                None
            }
            UiCommand::Release => match self.drag.release()? {
                DropOutcome::Click { task_id } => {
                    self.open_modal(Modal::TaskDetails(task_id));
                    None
                }
                DropOutcome::Moved { task_id, from, to } => {
                    self.moves.insert(
                        task_id.clone(),
                        OptimisticMove {
                            to,
                            committed: false,
                        },
                    );
                    Some(BackendCommand::Drop(DropOutcome::Moved { task_id, from, to }))
                }
                _ => None,
            },
            UiCommand::CancelDrag => {
                self.drag.cancel();
                None
            }
            UiCommand::MarkNotificationsRead => Some(BackendCommand::MarkNotificationsRead),
            UiCommand::DismissToast => {
                if !self.toasts.is_empty() {
                    self.toasts.remove(0);
                }
                None
            }
        }
    }

    fn submit(&mut self) -> Option<BackendCommand> {
        let modal = self.modal.clone()?;
        let command = match modal {
            Modal::CreateBoard | Modal::RenameBoard(_) => {
                let board_name = self.board_name_draft.trim().to_string();
                if board_name.is_empty() {
                    return self.reject("Board name can't be empty");
                }
                match modal {
                    Modal::RenameBoard(board_id) => BackendCommand::RenameBoard {
                        board_id,
                        board_name,
                    },
                    _ => BackendCommand::CreateBoard { board_name },
                }
            }
            Modal::DeleteBoard(board_id) => {
                if self.selected_board.as_ref() == Some(&board_id) {
                    self.selected_board = None;
                    self.forget_board();
                }
                BackendCommand::DeleteBoard { board_id }
            }
            Modal::AddTask => {
                let draft = &self.task_draft;
                let title = draft.title.trim();
                if title.is_empty() {
                    return self.reject("Title can't be empty");
                }
                if draft.subtasks.iter().any(|name| name.trim().is_empty()) {
                    return self.reject("Subtask can't be empty");
                }
                BackendCommand::CreateTask(CreateTaskRequest {
                    title: title.to_string(),
                    description: draft.description.trim().to_string(),
                    subtasks: draft
                        .subtasks
                        .iter()
                        .map(|name| NewSubtask {
                            name: name.trim().to_string(),
                        })
                        .collect(),
                    status: draft.status,
                    priority: draft.priority,
                    deadline: draft.deadline,
                })
            }
            Modal::EditTask(task_id) => {
                let Some(task) = self.board.as_ref().and_then(|b| b.task(&task_id)) else {
                    return self.reject("Task is no longer on this board");
                };
                let draft = &self.task_draft;
                let title = draft.title.trim();
                if title.is_empty() {
                    return self.reject("Title can't be empty");
                }
                let mut patch = TaskPatch::default();
                if title != task.title {
                    patch.title = Some(title.to_string());
                }
                if draft.description.trim() != task.description {
                    patch.description = Some(draft.description.trim().to_string());
                }
                if draft.status != task.status {
                    patch.status = Some(draft.status);
                }
                if draft.priority != task.priority {
                    patch.priority = Some(draft.priority);
                }
                if draft.deadline != task.deadline {
                    patch.deadline = draft.deadline;
                }
                if patch.is_empty() {
                    self.close_modal();
                    return None;
                }
                BackendCommand::EditTask { task_id, patch }
            }
            Modal::DeleteTask(task_id) => BackendCommand::DeleteTask { task_id },
            Modal::InviteMember(board_id) => {
                let email = self.invite_email_draft.trim().to_string();
                if email.is_empty() || !email.contains('@') {
                    return self.reject("Please enter a valid email");
                }
                BackendCommand::InviteUser { board_id, email }
            }
            Modal::TaskDetails(_) => return None,
        };
        self.close_modal();
        Some(command)
    }

    /// Folds one backend event into the state.
    pub fn handle_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::Info(message) => self.status = message,
            UiEvent::BoardsLoaded(boards) => {
                if self.search.trim().is_empty() {
                    if let Some(selected) = self.selected_board.as_ref() {
                        if !boards.iter().any(|board| &board.board_id == selected) {
                            self.selected_board = None;
                            self.forget_board();
                        }
                    }
                }
                self.boards = boards;
            }
            UiEvent::BoardLoaded(board) => {
                if self.selected_board.as_ref() == Some(&board.board_id) {
                    // Uncommitted moves stay until their commit answers.
                    self.moves.retain(|task_id, pending| {
                        !pending.committed
                            && board.task(task_id).is_some_and(|task| task.status != pending.to)
                    });
                    self.board = Some(board);
                }
            }
            UiEvent::TaskMoved { task_id, status, .. } => {
                if let Some(pending) = self.moves.get_mut(&task_id) {
                    if pending.to == status {
                        pending.committed = true;
                    }
                }
            }
            UiEvent::MoveFailed { task_id, status } => {
                if self.moves.get(&task_id).is_some_and(|pending| pending.to == status) {
                    self.moves.remove(&task_id);
                }
            }
            UiEvent::BoardOrderSaved => {}
            UiEvent::NotificationsUpdated(records) => self.notifications = records,
            UiEvent::UserInvited(user) => {
                self.status = format!("Invited {}", user.name);
            }
            UiEvent::TimerStopped { task_id, total } => {
                self.status = format!(
                    "Tracked {} on {task_id}",
                    crate::timer::format_tracked(total)
                );
            }
            UiEvent::Toast(toast) => self.toasts.push(toast),
            UiEvent::Error(error) => {
                self.status = error.message().to_string();
                self.last_error = Some(error);
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/app_state_tests.rs"]
mod tests;
