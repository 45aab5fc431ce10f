use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    AssignmentId, BoardId, MemberRole, Priority, SubtaskId, SubtaskStatus, TaskId, TaskStatus,
    UserId, UserProfile, UserRef,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    #[serde(rename = "_id")]
    pub board_id: BoardId,
    pub board_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    #[serde(rename = "_id")]
    pub board_id: BoardId,
    pub board_name: String,
    pub created_by: UserRef,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub invited_users: Vec<UserId>,
    #[serde(default)]
    pub accepted_invite_users: Vec<UserId>,
    #[serde(default)]
    pub order: i64,
}

impl Board {
    pub fn owner(&self) -> &UserId {
        self.created_by.id()
    }

    pub fn task(&self, task_id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| &task.task_id == task_id)
    }

    pub fn role_of(&self, user_id: &UserId) -> Option<MemberRole> {
        if self.owner() == user_id {
            Some(MemberRole::Owner)
        } else if self.accepted_invite_users.contains(user_id) {
            Some(MemberRole::Member)
        } else if self.invited_users.contains(user_id) {
            Some(MemberRole::Invited)
        } else {
            None
        }
    }

    pub fn summary(&self) -> BoardSummary {
        BoardSummary {
            board_id: self.board_id.clone(),
            board_name: self.board_name.clone(),
            created_by: Some(self.created_by.clone()),
            order: self.order,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(rename = "_id")]
    pub task_id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    #[serde(default)]
    pub time_tracked: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assigned: Vec<Assignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
}

impl Task {
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks
            .iter()
            .filter(|subtask| subtask.status.is_done())
            .count()
    }

    /// Card caption, e.g. `3 subtasks (1 completed)`.
    pub fn progress_label(&self) -> String {
        format!(
            "{} subtasks ({} completed)",
            self.subtasks.len(),
            self.completed_subtasks()
        )
    }

    pub fn subtask(&self, subtask_id: &SubtaskId) -> Option<&Subtask> {
        self.subtasks
            .iter()
            .find(|subtask| &subtask.subtask_id == subtask_id)
    }

    pub fn is_assigned(&self, user_id: &UserId) -> bool {
        self.assigned
            .iter()
            .any(|assignment| assignment.user.id() == user_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(rename = "_id")]
    pub subtask_id: SubtaskId,
    pub name: String,
    #[serde(default)]
    pub status: SubtaskStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub assignment_id: Option<AssignmentId>,
    pub user: UserRef,
    pub assigned_by: UserRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardNameRequest {
    pub board_name: String,
}

/// One changed slot of the user's board list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderEntry {
    pub board_id: BoardId,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub data: Vec<ReorderEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubtask {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subtasks: Vec<NewSubtask>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskPatch {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub subtask_id: Option<SubtaskId>,
    pub name: String,
    pub status: SubtaskStatus,
}

impl From<&Subtask> for SubtaskPatch {
    fn from(value: &Subtask) -> Self {
        Self {
            subtask_id: Some(value.subtask_id.clone()),
            name: value.name.clone(),
            status: value.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPayload {
    pub user: UserId,
    pub assigned_by: UserId,
}

impl From<&Assignment> for AssignmentPayload {
    fn from(value: &Assignment) -> Self {
        Self {
            user: value.user.id().clone(),
            assigned_by: value.assigned_by.id().clone(),
        }
    }
}

/// Body of `PATCH /kanban/boards/:boardId/:taskId`. Only the fields that are
/// set are sent, so a status move carries `{"status": ...}` and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtasks: Option<Vec<SubtaskPatch>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_tracked: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned: Option<Vec<AssignmentPayload>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn time_tracked(seconds: u64) -> Self {
        Self {
            time_tracked: Some(seconds),
            ..Self::default()
        }
    }

    pub fn priority(priority: Priority) -> Self {
        Self {
            priority: Some(priority),
            ..Self::default()
        }
    }

    pub fn subtasks(subtasks: Vec<SubtaskPatch>) -> Self {
        Self {
            subtasks: Some(subtasks),
            ..Self::default()
        }
    }

    pub fn assigned(assigned: Vec<AssignmentPayload>) -> Self {
        Self {
            assigned: Some(assigned),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Assign,
    Unassign,
    Move,
    Status,
    Join,
}

/// Acting user as stored in a notification; never carries the email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationActor {
    #[serde(rename = "_id")]
    pub user_id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&UserProfile> for NotificationActor {
    fn from(value: &UserProfile) -> Self {
        Self {
            user_id: value.id.clone(),
            name: value.name.clone(),
            avatar_url: value.avatar_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub id: Uuid,
    pub action_by: NotificationActor,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<EntityRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<EntityRef>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl NotificationRecord {
    pub fn new(
        kind: NotificationKind,
        action_by: NotificationActor,
        board: Option<EntityRef>,
        task: Option<EntityRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_by,
            kind,
            board,
            task,
            timestamp: Utc::now(),
            read: false,
        }
    }
}

/// Entry of the `task/{boardOwnerId}/assigned` ledger in the realtime store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedMember {
    pub user_id: UserId,
    pub name: String,
    pub assigned_by: String,
}
