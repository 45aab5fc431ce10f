//! Backend commands queued from the UI to the backend worker.

use shared::{
    domain::{BoardId, Priority, SubtaskId, TaskId, TaskStatus, UserId},
    protocol::{CreateTaskRequest, TaskPatch},
};

use crate::drag::DropOutcome;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    LoadBoards {
        query: Option<String>,
    },
    SelectBoard {
        board_id: BoardId,
    },
    RefreshBoard,
    CreateBoard {
        board_name: String,
    },
    RenameBoard {
        board_id: BoardId,
        board_name: String,
    },
    DeleteBoard {
        board_id: BoardId,
    },
    ReorderBoards {
        order: Vec<BoardId>,
    },
    Drop(DropOutcome),
    MoveTask {
        task_id: TaskId,
        status: TaskStatus,
    },
    CreateTask(CreateTaskRequest),
    EditTask {
        task_id: TaskId,
        patch: TaskPatch,
    },
    DeleteTask {
        task_id: TaskId,
    },
    SetSubtaskStatus {
        task_id: TaskId,
        subtask_id: SubtaskId,
        checked: bool,
    },
    AddSubtask {
        task_id: TaskId,
        name: String,
    },
    ChangePriority {
        task_id: TaskId,
        priority: Priority,
    },
    StartTimer {
        task_id: TaskId,
    },
    StopTimer {
        task_id: TaskId,
    },
    ResetTimer {
        task_id: TaskId,
    },
    AssignUser {
        task_id: TaskId,
        email: String,
    },
    UnassignUser {
        task_id: TaskId,
        user_id: UserId,
    },
    InviteUser {
        board_id: BoardId,
        email: String,
    },
    AcceptInvite {
        board_id: BoardId,
    },
    RemoveMember {
        board_id: BoardId,
        user_id: UserId,
    },
    LoadNotifications,
    MarkNotificationsRead,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadBoards { .. } => "load_boards",
            Self::SelectBoard { .. } => "select_board",
            Self::RefreshBoard => "refresh_board",
            Self::CreateBoard { .. } => "create_board",
            Self::RenameBoard { .. } => "rename_board",
            Self::DeleteBoard { .. } => "delete_board",
            Self::ReorderBoards { .. } => "reorder_boards",
            Self::Drop(_) => "drop",
            Self::MoveTask { .. } => "move_task",
            Self::CreateTask(_) => "create_task",
            Self::EditTask { .. } => "edit_task",
            Self::DeleteTask { .. } => "delete_task",
            Self::SetSubtaskStatus { .. } => "set_subtask_status",
            Self::AddSubtask { .. } => "add_subtask",
            Self::ChangePriority { .. } => "change_priority",
            Self::StartTimer { .. } => "start_timer",
            Self::StopTimer { .. } => "stop_timer",
            Self::ResetTimer { .. } => "reset_timer",
            Self::AssignUser { .. } => "assign_user",
            Self::UnassignUser { .. } => "unassign_user",
            Self::InviteUser { .. } => "invite_user",
            Self::AcceptInvite { .. } => "accept_invite",
            Self::RemoveMember { .. } => "remove_member",
            Self::LoadNotifications => "load_notifications",
            Self::MarkNotificationsRead => "mark_notifications_read",
        }
    }
}
