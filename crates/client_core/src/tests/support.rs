//! Recording `BoardApi` double shared by the unit tests.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use shared::{
    domain::{
        BoardId, Priority, SubtaskId, SubtaskStatus, TaskId, TaskStatus, UserId, UserProfile,
        UserRef,
    },
    error::{ApiError, ErrorCode},
    protocol::{
        Assignment, Board, BoardSummary, CreateTaskRequest, ReorderEntry, Subtask, Task, TaskPatch,
    },
};

use tokio::sync::{mpsc, Semaphore};

use crate::{api::BoardApi, error::ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    CurrentUser,
    FindUsers(String),
    ListBoards(Option<String>),
    CreateBoard(String),
    GetBoard(BoardId),
    RenameBoard(BoardId, String),
    Reorder(Vec<ReorderEntry>),
    DeleteBoard(BoardId),
    CreateTask(BoardId, CreateTaskRequest),
    UpdateTask(BoardId, TaskId, TaskPatch),
    DeleteTask(BoardId, TaskId),
    Invite(BoardId, UserId),
    Accept(BoardId, UserId),
    RemoveMember(BoardId, UserId),
}

pub fn task(id: &str, status: TaskStatus) -> Task {
    Task {
        task_id: TaskId::from(id),
        title: format!("task {id}"),
        description: String::new(),
        status,
        priority: Priority::Medium,
        subtasks: Vec::new(),
        time_tracked: 0,
        deadline: None,
        assigned: Vec::new(),
        created_by: None,
    }
}

pub fn subtask(id: &str, status: SubtaskStatus) -> Subtask {
    Subtask {
        subtask_id: SubtaskId::from(id),
        name: format!("subtask {id}"),
        status,
    }
}

pub fn board(id: &str, order: i64, tasks: Vec<Task>) -> Board {
    Board {
        board_id: BoardId::from(id),
        board_name: format!("board {id}"),
        created_by: UserRef::Id(UserId::from("owner")),
        tasks,
        invited_users: Vec::new(),
        accepted_invite_users: Vec::new(),
        order,
    }
}

pub fn profile(id: &str, name: &str) -> UserProfile {
    UserProfile {
        id: UserId::from(id),
        name: name.to_string(),
        email: Some(format!("{id}@example.com")),
        avatar_url: None,
    }
}

/// In-memory board service. Task edits are applied to the stored boards so
/// refetches observe them.
pub struct FakeBoardApi {
    user: UserProfile,
    directory: Vec<UserProfile>,
    boards: Mutex<Vec<Board>>,
    calls: Mutex<Vec<ApiCall>>,
    fail_updates: AtomicBool,
    fail_reorder: AtomicBool,
    invite_error: Mutex<Option<String>>,
    update_gate: Mutex<Option<GateState>>,
}

struct GateState {
    tasks: Vec<TaskId>,
    permits: Arc<Semaphore>,
    arrivals: mpsc::UnboundedSender<TaskId>,
}

/// Holds `update_task` calls for the gated tasks until the test lets them
/// through, in arrival order.
pub struct UpdateGate {
    permits: Arc<Semaphore>,
    arrivals: mpsc::UnboundedReceiver<TaskId>,
}

impl UpdateGate {
    /// Waits until an update reaches the service and returns its task.
    pub async fn arrived(&mut self) -> TaskId {
        self.arrivals.recv().await.expect("gate sender dropped")
    }

    pub fn release_one(&self) {
        self.permits.add_permits(1);
    }
}

impl FakeBoardApi {
    pub fn new(boards: Vec<Board>) -> Self {
        Self {
            user: profile("owner", "Ada Lovelace"),
            directory: vec![profile("u2", "Grace Hopper")],
            boards: Mutex::new(boards),
            calls: Mutex::new(Vec::new()),
            fail_updates: AtomicBool::new(false),
            fail_reorder: AtomicBool::new(false),
            invite_error: Mutex::new(None),
            update_gate: Mutex::new(None),
        }
    }

    pub fn gate_updates(&self, tasks: &[&str]) -> UpdateGate {
        let permits = Arc::new(Semaphore::new(0));
        let (tx, arrivals) = mpsc::unbounded_channel();
        *self.update_gate.lock().unwrap() = Some(GateState {
            tasks: tasks.iter().map(|id| TaskId::from(*id)).collect(),
            permits: Arc::clone(&permits),
            arrivals: tx,
        });
        UpdateGate { permits, arrivals }
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reorder(&self, fail: bool) {
        self.fail_reorder.store(fail, Ordering::SeqCst);
    }

    pub fn reject_invites_with(&self, message: &str) {
        *self.invite_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Writes only; reads are filtered out.
    pub fn writes(&self) -> Vec<ApiCall> {
        self.calls()
            .into_iter()
            .filter(|call| {
                !matches!(
                    call,
                    ApiCall::CurrentUser
                        | ApiCall::FindUsers(_)
                        | ApiCall::ListBoards(_)
                        | ApiCall::GetBoard(_)
                )
            })
            .collect()
    }

    pub fn stored_task(&self, board_id: &str, task_id: &str) -> Option<Task> {
        let boards = self.boards.lock().unwrap();
        boards
            .iter()
            .find(|board| board.board_id.as_str() == board_id)?
            .task(&TaskId::from(task_id))
            .cloned()
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn not_found(what: &str) -> crate::error::ClientError {
        ApiError::new(ErrorCode::NotFound, format!("{what} not found")).into()
    }
}

fn apply_patch(task: &mut Task, patch: &TaskPatch) {
    if let Some(title) = &patch.title {
        task.title = title.clone();
    }
    if let Some(description) = &patch.description {
        task.description = description.clone();
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(seconds) = patch.time_tracked {
        task.time_tracked = seconds;
    }
    if let Some(subtasks) = &patch.subtasks {
        task.subtasks = subtasks
            .iter()
            .enumerate()
            .map(|(index, patch)| Subtask {
                subtask_id: patch
                    .subtask_id
                    .clone()
                    .unwrap_or_else(|| SubtaskId::new(format!("{}-s{index}", task.task_id))),
                name: patch.name.clone(),
                status: patch.status,
            })
            .collect();
    }
    if let Some(assigned) = &patch.assigned {
        task.assigned = assigned
            .iter()
            .map(|payload| Assignment {
                assignment_id: None,
                user: UserRef::Id(payload.user.clone()),
                assigned_by: UserRef::Id(payload.assigned_by.clone()),
                assigned_at: None,
            })
            .collect();
    }
}

#[async_trait]
impl BoardApi for FakeBoardApi {
    async fn current_user(&self) -> ClientResult<UserProfile> {
        self.record(ApiCall::CurrentUser);
        Ok(self.user.clone())
    }

    async fn find_users_by_email(&self, email: &str) -> ClientResult<Vec<UserProfile>> {
        self.record(ApiCall::FindUsers(email.to_string()));
        Ok(self
            .directory
            .iter()
            .filter(|user| user.email.as_deref() == Some(email))
            .cloned()
            .collect())
    }

    async fn list_boards(&self, query: Option<&str>) -> ClientResult<Vec<BoardSummary>> {
        self.record(ApiCall::ListBoards(query.map(str::to_string)));
        let boards = self.boards.lock().unwrap();
        Ok(boards
            .iter()
            .filter(|board| query.map_or(true, |q| board.board_name.contains(q)))
            .map(Board::summary)
            .collect())
    }

    async fn create_board(&self, board_name: &str) -> ClientResult<()> {
        self.record(ApiCall::CreateBoard(board_name.to_string()));
        let mut boards = self.boards.lock().unwrap();
        let order = boards.len() as i64;
        let mut created = board(&format!("b{}", boards.len() + 1), order, Vec::new());
        created.board_name = board_name.to_string();
        boards.push(created);
        Ok(())
    }

    async fn get_board(&self, board_id: &BoardId) -> ClientResult<Board> {
        self.record(ApiCall::GetBoard(board_id.clone()));
        let boards = self.boards.lock().unwrap();
        boards
            .iter()
            .find(|board| &board.board_id == board_id)
            .cloned()
            .ok_or_else(|| Self::not_found("board"))
    }

    async fn rename_board(&self, board_id: &BoardId, board_name: &str) -> ClientResult<()> {
        self.record(ApiCall::RenameBoard(board_id.clone(), board_name.to_string()));
        let mut boards = self.boards.lock().unwrap();
        let board = boards
            .iter_mut()
            .find(|board| &board.board_id == board_id)
            .ok_or_else(|| Self::not_found("board"))?;
        board.board_name = board_name.to_string();
        Ok(())
    }

    async fn reorder_boards(&self, entries: &[ReorderEntry]) -> ClientResult<()> {
        self.record(ApiCall::Reorder(entries.to_vec()));
        if self.fail_reorder.load(Ordering::SeqCst) {
            return Err(ApiError::new(ErrorCode::Internal, "reorder failed").into());
        }
        let mut boards = self.boards.lock().unwrap();
        for entry in entries {
            if let Some(board) = boards.iter_mut().find(|b| b.board_id == entry.board_id) {
                board.order = entry.order;
            }
        }
        Ok(())
    }

    async fn delete_board(&self, board_id: &BoardId) -> ClientResult<()> {
        self.record(ApiCall::DeleteBoard(board_id.clone()));
        self.boards
            .lock()
            .unwrap()
            .retain(|board| &board.board_id != board_id);
        Ok(())
    }

    async fn create_task(&self, board_id: &BoardId, request: &CreateTaskRequest) -> ClientResult<()> {
        self.record(ApiCall::CreateTask(board_id.clone(), request.clone()));
        let mut boards = self.boards.lock().unwrap();
        let board = boards
            .iter_mut()
            .find(|board| &board.board_id == board_id)
            .ok_or_else(|| Self::not_found("board"))?;
        let mut created = task(&format!("t{}", board.tasks.len() + 1), request.status);
        created.title = request.title.clone();
        created.priority = request.priority;
        board.tasks.push(created);
        Ok(())
    }

    async fn update_task(
        &self,
        board_id: &BoardId,
        task_id: &TaskId,
        patch: &TaskPatch,
    ) -> ClientResult<()> {
        self.record(ApiCall::UpdateTask(
            board_id.clone(),
            task_id.clone(),
            patch.clone(),
        ));
        let gate = self
            .update_gate
            .lock()
            .unwrap()
            .as_ref()
            .filter(|gate| gate.tasks.contains(task_id))
            .map(|gate| (Arc::clone(&gate.permits), gate.arrivals.clone()));
        if let Some((permits, arrivals)) = gate {
            let _ = arrivals.send(task_id.clone());
            permits.acquire().await.expect("gate closed").forget();
        }
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(ApiError::new(ErrorCode::Internal, "database unavailable").into());
        }
        let mut boards = self.boards.lock().unwrap();
        let task = boards
            .iter_mut()
            .find(|board| &board.board_id == board_id)
            .and_then(|board| board.tasks.iter_mut().find(|t| &t.task_id == task_id))
            .ok_or_else(|| Self::not_found("task"))?;
        apply_patch(task, patch);
        Ok(())
    }

    async fn delete_task(&self, board_id: &BoardId, task_id: &TaskId) -> ClientResult<()> {
        self.record(ApiCall::DeleteTask(board_id.clone(), task_id.clone()));
        let mut boards = self.boards.lock().unwrap();
        if let Some(board) = boards.iter_mut().find(|board| &board.board_id == board_id) {
            board.tasks.retain(|task| &task.task_id != task_id);
        }
        Ok(())
    }

    async fn invite_user(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.record(ApiCall::Invite(board_id.clone(), user_id.clone()));
        if let Some(message) = self.invite_error.lock().unwrap().clone() {
            return Err(ApiError::new(ErrorCode::Validation, message).into());
        }
        let mut boards = self.boards.lock().unwrap();
        if let Some(board) = boards.iter_mut().find(|board| &board.board_id == board_id) {
            board.invited_users.push(user_id.clone());
        }
        Ok(())
    }

    async fn accept_invite(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.record(ApiCall::Accept(board_id.clone(), user_id.clone()));
        let mut boards = self.boards.lock().unwrap();
        if let Some(board) = boards.iter_mut().find(|board| &board.board_id == board_id) {
            board.invited_users.retain(|id| id != user_id);
            board.accepted_invite_users.push(user_id.clone());
        }
        Ok(())
    }

    async fn remove_member(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        self.record(ApiCall::RemoveMember(board_id.clone(), user_id.clone()));
        let mut boards = self.boards.lock().unwrap();
        if let Some(board) = boards.iter_mut().find(|board| &board.board_id == board_id) {
            board.accepted_invite_users.retain(|id| id != user_id);
        }
        Ok(())
    }
}
