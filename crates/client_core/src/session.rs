//! `KanbanSession`: one signed-in user working against the board service.
//!
//! The session owns the mirror of the selected board, the board-list reorder
//! tracker and the running task timers. Every operation suspends only its
//! caller; commits in flight are never cancelled.

use std::{collections::HashMap, sync::Arc, time::Duration};

use reqwest::Client;
use shared::{
    domain::{
        BoardId, MemberRole, Priority, SubtaskId, SubtaskStatus, TaskId, TaskStatus, UserId,
        UserProfile,
    },
    protocol::{
        AssignedMember, AssignmentPayload, Board, BoardSummary, CreateTaskRequest, EntityRef,
        NotificationKind, NotificationRecord, SubtaskPatch, Task, TaskPatch,
    },
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    api::{BoardApi, HttpBoardApi},
    config::Settings,
    drag::DropOutcome,
    error::{ClientError, ClientResult},
    mirror::{BoardMirror, RefetchOutcome, StatusColumns},
    realtime::{
        unread_count, FirebaseRealtimeStore, MissingRealtimeStore, NotificationFeed, RealtimeStore,
    },
    reconcile::{CommitEngine, ReorderOutcome, StatusCommit},
    reorder::ReorderTracker,
    timer::{spawn_ticker, TaskTimer},
    ClientEvent, Toast,
};

const ALREADY_INVITED: &str = "User has already been invited";
const ALREADY_MEMBER: &str = "User is already a member of this board";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Origin of the web app, used to build invite links.
    pub app_origin: String,
    pub timer_period: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            app_origin: Settings::default().app_origin,
            timer_period: Duration::from_secs(1),
        }
    }
}

struct SessionState {
    current_user: Option<UserProfile>,
    boards: Vec<BoardSummary>,
}

/// A running timer, or a stopped one whose total has not been saved yet.
struct ActiveTimer {
    timer: Arc<Mutex<TaskTimer>>,
    ticker: Option<JoinHandle<()>>,
}

impl ActiveTimer {
    fn abort(self) -> Arc<Mutex<TaskTimer>> {
        if let Some(ticker) = self.ticker {
            ticker.abort();
        }
        self.timer
    }
}

pub struct KanbanSession {
    api: Arc<dyn BoardApi>,
    realtime: Arc<dyn RealtimeStore>,
    engine: CommitEngine,
    mirror: Mutex<BoardMirror>,
    reorder: Mutex<ReorderTracker>,
    inner: Mutex<SessionState>,
    timers: Mutex<HashMap<TaskId, ActiveTimer>>,
    options: SessionOptions,
    events: broadcast::Sender<ClientEvent>,
}

impl KanbanSession {
    pub fn new(api: Arc<dyn BoardApi>) -> Arc<Self> {
        Self::new_with_dependencies(api, Arc::new(MissingRealtimeStore), SessionOptions::default())
    }

    pub fn new_with_dependencies(
        api: Arc<dyn BoardApi>,
        realtime: Arc<dyn RealtimeStore>,
        options: SessionOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        Arc::new(Self {
            engine: CommitEngine::new(Arc::clone(&api), events.clone()),
            api,
            realtime,
            mirror: Mutex::new(BoardMirror::new()),
            reorder: Mutex::new(ReorderTracker::default()),
            inner: Mutex::new(SessionState {
                current_user: None,
                boards: Vec::new(),
            }),
            timers: Mutex::new(HashMap::new()),
            options,
            events,
        })
    }

    /// Wires the HTTP board client and, when a database URL is configured,
    /// the Firebase realtime store.
    pub fn from_settings(settings: &Settings) -> ClientResult<Arc<Self>> {
        let api: Arc<dyn BoardApi> = Arc::new(HttpBoardApi::from_settings(settings)?);
        let realtime: Arc<dyn RealtimeStore> = match settings.firebase_base_url()? {
            Some(url) => {
                let http = Client::builder().timeout(settings.request_timeout()).build()?;
                FirebaseRealtimeStore::new(http, url, settings.notification_poll_interval())
            }
            None => {
                info!("no realtime database configured; notifications disabled");
                Arc::new(MissingRealtimeStore)
            }
        };
        Ok(Self::new_with_dependencies(
            api,
            realtime,
            SessionOptions {
                app_origin: settings.app_origin.clone(),
                ..SessionOptions::default()
            },
        ))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn toast_error(&self, context: &str, err: &ClientError) {
        self.emit(ClientEvent::Toast(Toast::error(format!(
            "{context}: {}",
            err.user_message()
        ))));
    }

    pub async fn current_user(&self) -> ClientResult<UserProfile> {
        if let Some(user) = self.inner.lock().await.current_user.clone() {
            return Ok(user);
        }
        let user = self.api.current_user().await?;
        info!(user_id = %user.id, "signed in");
        self.inner.lock().await.current_user = Some(user.clone());
        Ok(user)
    }

    // Boards

    /// Fetches the user's boards in rank order. An unfiltered list also
    /// becomes the committed order for board reordering.
    pub async fn load_boards(&self, query: Option<&str>) -> ClientResult<Vec<BoardSummary>> {
        let mut boards = self.api.list_boards(query).await?;
        boards.sort_by_key(|board| board.order);
        let filtered = query.is_some_and(|q| !q.trim().is_empty());
        if !filtered {
            let order = boards.iter().map(|board| board.board_id.clone()).collect();
            self.reorder.lock().await.load(order);
            self.inner.lock().await.boards = boards.clone();
        }
        self.emit(ClientEvent::BoardsUpdated(boards.clone()));
        Ok(boards)
    }

    async fn reload_boards_logged(&self) {
        if let Err(err) = self.load_boards(None).await {
            warn!("board list refresh failed: {err}");
        }
    }

    /// Last unfiltered board list, in the order the reorder tracker shows.
    pub async fn boards(&self) -> Vec<BoardSummary> {
        let boards = self.inner.lock().await.boards.clone();
        let order = self.reorder.lock().await.view().to_vec();
        let mut by_id: HashMap<BoardId, BoardSummary> = boards
            .into_iter()
            .map(|board| (board.board_id.clone(), board))
            .collect();
        order
            .into_iter()
            .filter_map(|board_id| by_id.remove(&board_id))
            .collect()
    }

    pub async fn create_board(&self, board_name: &str) -> ClientResult<()> {
        let board_name = validate_name(board_name, "Board name")?;
        if let Err(err) = self.api.create_board(&board_name).await {
            self.toast_error("Could not create board", &err);
            return Err(err);
        }
        info!(board_name = %board_name, "board created");
        self.emit(ClientEvent::Toast(Toast::success("Board created")));
        self.reload_boards_logged().await;
        Ok(())
    }

    pub async fn rename_board(&self, board_id: &BoardId, board_name: &str) -> ClientResult<()> {
        let board_name = validate_name(board_name, "Board name")?;
        if let Err(err) = self.api.rename_board(board_id, &board_name).await {
            self.toast_error("Could not rename board", &err);
            return Err(err);
        }
        self.emit(ClientEvent::Toast(Toast::success("Board renamed")));
        self.reload_boards_logged().await;
        self.refresh_if_selected(board_id).await;
        Ok(())
    }

    pub async fn delete_board(&self, board_id: &BoardId) -> ClientResult<()> {
        if let Err(err) = self.api.delete_board(board_id).await {
            self.toast_error("Could not delete board", &err);
            return Err(err);
        }
        {
            let mut mirror = self.mirror.lock().await;
            if mirror.selected() == Some(board_id) {
                mirror.clear();
            }
        }
        info!(board_id = %board_id, "board deleted");
        self.emit(ClientEvent::Toast(Toast::success("Board deleted")));
        self.reload_boards_logged().await;
        Ok(())
    }

    /// Makes `board_id` the selected board and loads it. A response that
    /// arrives after the user selected another board is discarded.
    pub async fn select_board(&self, board_id: &BoardId) -> ClientResult<RefetchOutcome> {
        let epoch = self.mirror.lock().await.select(board_id.clone());
        debug!(board_id = %board_id, epoch, "board selected");
        self.engine.refetch(&self.mirror).await
    }

    pub async fn refresh_board(&self) -> ClientResult<RefetchOutcome> {
        self.engine.refetch(&self.mirror).await
    }

    async fn refresh_if_selected(&self, board_id: &BoardId) {
        let selected = self.mirror.lock().await.selected() == Some(board_id);
        if selected {
            if let Err(err) = self.refresh_board().await {
                warn!(board_id = %board_id, "board refresh failed: {err}");
            }
        }
    }

    async fn selected_board_id(&self) -> ClientResult<BoardId> {
        self.mirror
            .lock()
            .await
            .selected()
            .cloned()
            .ok_or(ClientError::NoBoardSelected)
    }

    /// Last confirmed snapshot of the selected board.
    pub async fn selected_board(&self) -> Option<Board> {
        self.mirror.lock().await.confirmed().cloned()
    }

    pub async fn current_view(&self) -> StatusColumns {
        self.mirror.lock().await.current_view()
    }

    pub async fn task(&self, task_id: &TaskId) -> ClientResult<Task> {
        let mirror = self.mirror.lock().await;
        if mirror.confirmed().is_none() {
            return Err(ClientError::NoBoardSelected);
        }
        mirror
            .task(task_id)
            .ok_or_else(|| ClientError::UnknownTask(task_id.clone()))
    }

    // Status moves

    /// Finishes a drag gesture. Only a move to another column reaches the
    /// network.
    pub async fn handle_drop(&self, outcome: DropOutcome) -> ClientResult<Option<StatusCommit>> {
        match outcome {
            DropOutcome::Moved { task_id, to, .. } => self.move_task(&task_id, to).await,
            other => {
                debug!(?other, "drop needs no commit");
                Ok(None)
            }
        }
    }

    /// Shows the move at once, then persists it. `None` when the task
    /// already sits in `status`.
    pub async fn move_task(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> ClientResult<Option<StatusCommit>> {
        let pending = {
            let mut mirror = self.mirror.lock().await;
            let current = mirror
                .task(task_id)
                .ok_or_else(|| match mirror.confirmed() {
                    Some(_) => ClientError::UnknownTask(task_id.clone()),
                    None => ClientError::NoBoardSelected,
                })?;
            if current.status == status {
                debug!(task_id = %task_id, %status, "task already in target column");
                return Ok(None);
            }
            mirror.apply_optimistic(task_id, status)?
        };
        self.engine
            .commit_move(&self.mirror, task_id, pending)
            .await
            .map(Some)
    }

    // Board reordering

    pub async fn start_board_drag(&self, board_id: BoardId) -> ClientResult<()> {
        self.reorder.lock().await.start_drag(board_id)
    }

    pub async fn hover_board_index(&self, index: usize) -> ClientResult<Vec<BoardId>> {
        let mut tracker = self.reorder.lock().await;
        tracker.hover_index(index)?;
        Ok(tracker.view().to_vec())
    }

    pub async fn cancel_board_drag(&self) {
        self.reorder.lock().await.cancel_drag();
    }

    /// Ends the gesture and commits the final permutation, if it differs.
    pub async fn end_board_drag(&self) -> ClientResult<ReorderOutcome> {
        let diff = self.reorder.lock().await.end_drag()?;
        let outcome = self.engine.commit_pending_reorder(&self.reorder, diff).await?;
        self.after_reorder(&outcome).await;
        Ok(outcome)
    }

    pub async fn commit_reorder(&self, proposed: Vec<BoardId>) -> ClientResult<ReorderOutcome> {
        let outcome = self.engine.commit_reorder(&self.reorder, proposed).await?;
        self.after_reorder(&outcome).await;
        Ok(outcome)
    }

    async fn after_reorder(&self, outcome: &ReorderOutcome) {
        if matches!(outcome, ReorderOutcome::Committed(_)) {
            self.reload_boards_logged().await;
        }
    }

    // Tasks

    pub async fn create_task(&self, mut request: CreateTaskRequest) -> ClientResult<()> {
        request.title = validate_name(&request.title, "Title")?;
        for subtask in &mut request.subtasks {
            subtask.name = validate_name(&subtask.name, "Subtask")?;
        }
        let board_id = self.selected_board_id().await?;
        if let Err(err) = self.api.create_task(&board_id, &request).await {
            self.toast_error("Could not create task", &err);
            return Err(err);
        }
        info!(board_id = %board_id, title = %request.title, "task created");
        self.emit(ClientEvent::Toast(Toast::success("Task created")));
        if let Err(err) = self.refresh_board().await {
            warn!(board_id = %board_id, "refetch after task creation failed: {err}");
        }
        Ok(())
    }

    /// Sends an edit. An empty patch sends nothing.
    pub async fn edit_task(&self, task_id: &TaskId, patch: TaskPatch) -> ClientResult<bool> {
        if patch.is_empty() {
            return Ok(false);
        }
        if let Some(title) = patch.title.as_deref() {
            validate_name(title, "Title")?;
        }
        self.task(task_id).await?;
        self.engine
            .commit_task_patch(&self.mirror, task_id, &patch, Some("Task updated"))
            .await?;
        Ok(true)
    }

    pub async fn delete_task(&self, task_id: &TaskId) -> ClientResult<()> {
        let board_id = self.selected_board_id().await?;
        if let Err(err) = self.api.delete_task(&board_id, task_id).await {
            self.toast_error("Could not delete task", &err);
            return Err(err);
        }
        self.stop_ticker(task_id).await;
        self.emit(ClientEvent::Toast(Toast::success("Task deleted")));
        if let Err(err) = self.refresh_board().await {
            warn!(board_id = %board_id, "refetch after task deletion failed: {err}");
        }
        Ok(())
    }

    /// Checks or unchecks one subtask. Returns `false` without a request
    /// when the subtask already has that status.
    pub async fn set_subtask_status(
        &self,
        task_id: &TaskId,
        subtask_id: &SubtaskId,
        checked: bool,
    ) -> ClientResult<bool> {
        let task = self.task(task_id).await?;
        let target = SubtaskStatus::from_checked(checked);
        let current = task
            .subtask(subtask_id)
            .ok_or_else(|| ClientError::validation(format!("unknown subtask {subtask_id}")))?;
        if current.status == target {
            debug!(task_id = %task_id, subtask_id = %subtask_id, "subtask already in requested state");
            return Ok(false);
        }
        let subtasks = task
            .subtasks
            .iter()
            .map(|subtask| {
                let mut patch = SubtaskPatch::from(subtask);
                if &subtask.subtask_id == subtask_id {
                    patch.status = target;
                }
                patch
            })
            .collect();
        self.engine
            .commit_task_patch(&self.mirror, task_id, &TaskPatch::subtasks(subtasks), None)
            .await?;
        Ok(true)
    }

    /// Appends a new, unchecked subtask.
    pub async fn add_subtask(&self, task_id: &TaskId, name: &str) -> ClientResult<()> {
        let name = validate_name(name, "Subtask")?;
        let task = self.task(task_id).await?;
        let mut subtasks: Vec<SubtaskPatch> = task.subtasks.iter().map(SubtaskPatch::from).collect();
        subtasks.push(SubtaskPatch {
            subtask_id: None,
            name,
            status: SubtaskStatus::Undone,
        });
        self.engine
            .commit_task_patch(
                &self.mirror,
                task_id,
                &TaskPatch::subtasks(subtasks),
                Some("Subtask added"),
            )
            .await?;
        Ok(())
    }

    pub async fn change_priority(&self, task_id: &TaskId, priority: Priority) -> ClientResult<bool> {
        let task = self.task(task_id).await?;
        if task.priority == priority {
            return Ok(false);
        }
        self.engine
            .commit_task_patch(
                &self.mirror,
                task_id,
                &TaskPatch::priority(priority),
                Some("Priority changed"),
            )
            .await?;
        Ok(true)
    }

    // Time tracking

    /// Starts counting from the task's tracked total. Returns the shared
    /// timer so a view can render it.
    pub async fn start_timer(&self, task_id: &TaskId) -> ClientResult<Arc<Mutex<TaskTimer>>> {
        let mut timers = self.timers.lock().await;
        let unsaved = match timers.get(task_id) {
            Some(active) => {
                let timer = active.timer.lock().await;
                if timer.is_running() {
                    return Err(ClientError::validation("timer is already running"));
                }
                Some(timer.elapsed())
            }
            None => None,
        };
        let tracked = match unsaved {
            Some(elapsed) => elapsed,
            None => self.task(task_id).await?.time_tracked,
        };
        let mut timer = TaskTimer::new(task_id.clone(), tracked);
        timer.start();
        let timer = Arc::new(Mutex::new(timer));
        let ticker = spawn_ticker(Arc::clone(&timer), self.options.timer_period);
        debug!(task_id = %task_id, tracked, "timer started");
        if let Some(previous) = timers.insert(
            task_id.clone(),
            ActiveTimer {
                timer: Arc::clone(&timer),
                ticker: Some(ticker),
            },
        ) {
            previous.abort();
        }
        Ok(timer)
    }

    pub async fn timer_display(&self, task_id: &TaskId) -> Option<String> {
        let timers = self.timers.lock().await;
        let active = timers.get(task_id)?;
        let display = active.timer.lock().await.display();
        Some(display)
    }

    async fn stop_ticker(&self, task_id: &TaskId) -> Option<Arc<Mutex<TaskTimer>>> {
        let active = self.timers.lock().await.remove(task_id)?;
        Some(active.abort())
    }

    /// Stops the timer and persists the new total. `None` when the task has
    /// no timer. If the write fails the stopped timer is kept, so the total
    /// is still shown and the next stop retries it.
    pub async fn stop_timer(&self, task_id: &TaskId) -> ClientResult<Option<u64>> {
        let Some(timer) = self.stop_ticker(task_id).await else {
            return Ok(None);
        };
        let total = {
            let mut guard = timer.lock().await;
            guard.stop().unwrap_or_else(|| guard.elapsed())
        };
        if let Err(err) = self.persist_time(task_id, total).await {
            warn!(task_id = %task_id, total, "tracked time not saved; keeping timer");
            self.timers
                .lock()
                .await
                .entry(task_id.clone())
                .or_insert(ActiveTimer {
                    timer,
                    ticker: None,
                });
            return Err(err);
        }
        Ok(Some(total))
    }

    /// Zeroes the tracked time, running or not.
    pub async fn reset_timer(&self, task_id: &TaskId) -> ClientResult<u64> {
        let total = match self.stop_ticker(task_id).await {
            Some(timer) => timer.lock().await.reset(),
            None => 0,
        };
        self.persist_time(task_id, total).await?;
        Ok(total)
    }

    async fn persist_time(&self, task_id: &TaskId, seconds: u64) -> ClientResult<()> {
        info!(task_id = %task_id, seconds, "persisting tracked time");
        self.engine
            .commit_task_patch(&self.mirror, task_id, &TaskPatch::time_tracked(seconds), None)
            .await?;
        Ok(())
    }

    // Assignment

    pub async fn assign_user(&self, task_id: &TaskId, user: &UserProfile) -> ClientResult<()> {
        let task = self.task(task_id).await?;
        if task.is_assigned(&user.id) {
            return Err(ClientError::validation(format!(
                "{} is already assigned to this task",
                user.name
            )));
        }
        let actor = self.current_user().await?;
        let board = self.selected_board().await.ok_or(ClientError::NoBoardSelected)?;

        let mut assigned: Vec<AssignmentPayload> =
            task.assigned.iter().map(AssignmentPayload::from).collect();
        assigned.push(AssignmentPayload {
            user: user.id.clone(),
            assigned_by: actor.id.clone(),
        });
        let toast = format!("{} assigned", user.first_name());
        self.engine
            .commit_task_patch(&self.mirror, task_id, &TaskPatch::assigned(assigned), Some(&toast))
            .await?;

        let member = AssignedMember {
            user_id: user.id.clone(),
            name: user.name.clone(),
            assigned_by: actor.name.clone(),
        };
        if let Err(err) = self.realtime.add_assigned_member(board.owner(), member).await {
            warn!(board_id = %board.board_id, user_id = %user.id, "assigned ledger update failed: {err}");
        }
        self.notify(&user.id, NotificationKind::Assign, &actor, &board, Some(&task))
            .await;
        Ok(())
    }

    pub async fn unassign_user(&self, task_id: &TaskId, user_id: &UserId) -> ClientResult<()> {
        let task = self.task(task_id).await?;
        if !task.is_assigned(user_id) {
            return Err(ClientError::validation("user is not assigned to this task"));
        }
        let actor = self.current_user().await?;
        let board = self.selected_board().await.ok_or(ClientError::NoBoardSelected)?;

        let assigned = task
            .assigned
            .iter()
            .filter(|assignment| assignment.user.id() != user_id)
            .map(AssignmentPayload::from)
            .collect();
        self.engine
            .commit_task_patch(
                &self.mirror,
                task_id,
                &TaskPatch::assigned(assigned),
                Some("User unassigned"),
            )
            .await?;

        if let Err(err) = self.realtime.remove_assigned_member(board.owner(), user_id).await {
            warn!(board_id = %board.board_id, user_id = %user_id, "assigned ledger update failed: {err}");
        }
        self.notify(user_id, NotificationKind::Unassign, &actor, &board, Some(&task))
            .await;
        Ok(())
    }

    /// Best-effort: a failed push is logged, never surfaced.
    async fn notify(
        &self,
        recipient: &UserId,
        kind: NotificationKind,
        actor: &UserProfile,
        board: &Board,
        task: Option<&Task>,
    ) {
        if recipient == &actor.id {
            return;
        }
        let record = NotificationRecord::new(
            kind,
            actor.into(),
            Some(EntityRef {
                id: board.board_id.to_string(),
                name: board.board_name.clone(),
            }),
            task.map(|task| EntityRef {
                id: task.task_id.to_string(),
                name: task.title.clone(),
            }),
        );
        if let Err(err) = self.realtime.push_notification(recipient, &record).await {
            warn!(recipient = %recipient, ?kind, "notification push failed: {err}");
        }
    }

    // Membership

    pub async fn find_user_by_email(&self, email: &str) -> ClientResult<UserProfile> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ClientError::validation("Please enter a valid email"));
        }
        self.api
            .find_users_by_email(email)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::validation(format!("No user found with email {email}")))
    }

    /// Looks the user up by email and invites them. Returns the invitee.
    pub async fn invite_user(&self, board_id: &BoardId, email: &str) -> ClientResult<UserProfile> {
        let invitee = self.find_user_by_email(email).await?;
        if let Some(board) = self.selected_board().await.filter(|b| &b.board_id == board_id) {
            match board.role_of(&invitee.id) {
                Some(MemberRole::Invited) => {
                    return Err(ClientError::validation(ALREADY_INVITED))
                }
                Some(_) => return Err(ClientError::validation(ALREADY_MEMBER)),
                None => {}
            }
        }
        if let Err(err) = self.api.invite_user(board_id, &invitee.id).await {
            let err = map_invite_error(err);
            self.toast_error("Could not invite user", &err);
            return Err(err);
        }
        info!(board_id = %board_id, user_id = %invitee.id, "user invited");
        self.emit(ClientEvent::Toast(Toast::success(format!(
            "Invitation sent to {}",
            invitee.first_name()
        ))));
        self.refresh_if_selected(board_id).await;
        Ok(invitee)
    }

    pub fn invite_link(&self, board_id: &BoardId) -> String {
        format!(
            "{}/invite/{board_id}",
            self.options.app_origin.trim_end_matches('/')
        )
    }

    /// Accepts an invitation for the signed-in user and tells the owner.
    pub async fn accept_invite(&self, board_id: &BoardId) -> ClientResult<()> {
        let user = self.current_user().await?;
        if let Err(err) = self.api.accept_invite(board_id, &user.id).await {
            let err = map_invite_error(err);
            self.toast_error("Could not join board", &err);
            return Err(err);
        }
        info!(board_id = %board_id, user_id = %user.id, "invitation accepted");
        self.emit(ClientEvent::Toast(Toast::success("Joined board")));
        match self.api.get_board(board_id).await {
            Ok(board) => {
                let owner = board.owner().clone();
                self.notify(&owner, NotificationKind::Join, &user, &board, None)
                    .await;
            }
            Err(err) => warn!(board_id = %board_id, "could not load joined board: {err}"),
        }
        self.reload_boards_logged().await;
        Ok(())
    }

    pub async fn remove_member(&self, board_id: &BoardId, user_id: &UserId) -> ClientResult<()> {
        if let Err(err) = self.api.remove_member(board_id, user_id).await {
            self.toast_error("Could not remove member", &err);
            return Err(err);
        }
        self.emit(ClientEvent::Toast(Toast::success("Member removed")));
        self.refresh_if_selected(board_id).await;
        Ok(())
    }

    // Notifications

    pub async fn notifications(&self) -> ClientResult<Vec<NotificationRecord>> {
        let user = self.current_user().await?;
        let records = self.realtime.notifications(&user.id).await?;
        self.emit(ClientEvent::NotificationsUpdated(records.clone()));
        Ok(records)
    }

    pub async fn unread_notifications(&self) -> ClientResult<usize> {
        Ok(unread_count(&self.notifications().await?))
    }

    pub async fn mark_all_read(&self) -> ClientResult<()> {
        let user = self.current_user().await?;
        self.realtime.mark_all_read(&user.id).await
    }

    pub async fn subscribe_notifications(&self) -> ClientResult<NotificationFeed> {
        let user = self.current_user().await?;
        Ok(Arc::clone(&self.realtime).subscribe_notifications(user.id))
    }
}

fn validate_name(raw: &str, field: &str) -> ClientResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(format!("{field} can't be empty")));
    }
    Ok(trimmed.to_string())
}

fn map_invite_error(err: ClientError) -> ClientError {
    if let ClientError::Api { message, .. } = &err {
        let lower = message.to_ascii_lowercase();
        if lower.contains("already invited") {
            return ClientError::validation(ALREADY_INVITED);
        }
        if lower.contains("already a member") {
            return ClientError::validation(ALREADY_MEMBER);
        }
    }
    err
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
