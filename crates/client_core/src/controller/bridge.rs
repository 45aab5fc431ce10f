//! Runtime bridge between the UI command queue and the session.
//!
//! The worker owns its own tokio runtime on a dedicated thread so the UI
//! thread never blocks on the network.

use std::{sync::Arc, thread};

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use tokio::runtime::Runtime;

use crate::{
    config::Settings,
    controller::{
        commands::BackendCommand,
        events::{UiError, UiErrorContext, UiEvent},
    },
    error::ClientResult,
    session::KanbanSession,
};

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build backend runtime")
}

fn startup_failure(ui_tx: &Sender<UiEvent>, err: impl std::fmt::Display) {
    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
        UiErrorContext::BackendStartup,
        format!("backend worker startup failure: {err}"),
    )));
    tracing::error!("backend worker startup failure: {err}");
}

/// Builds a session from `settings` on the worker thread and serves
/// commands until the command channel closes.
pub fn launch(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Backend worker starting...".to_string()));
        let session = match KanbanSession::from_settings(&settings)
            .context("failed to initialize kanban session")
        {
            Ok(session) => session,
            Err(err) => {
                startup_failure(&ui_tx, format!("{err:#}"));
                return;
            }
        };
        run_worker(session, cmd_rx, ui_tx);
    })
}

/// Same as `launch` for an already built session.
pub fn launch_with_session(
    session: Arc<KanbanSession>,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || run_worker(session, cmd_rx, ui_tx))
}

fn run_worker(session: Arc<KanbanSession>, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(err) => {
            startup_failure(&ui_tx, format!("{err:#}"));
            return;
        }
    };

    runtime.block_on(async move {
        let mut events = session.subscribe_events();
        let events_tx = ui_tx.clone();
        let event_task = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let Some(event) = UiEvent::from_client_event(event) {
                    let _ = events_tx.try_send(event);
                }
            }
        });

        let _ = ui_tx.try_send(UiEvent::Info("Backend worker ready".to_string()));
        while let Ok(cmd) = cmd_rx.recv() {
            let name = cmd.name();
            let context = error_context(&cmd);
            match execute(&session, cmd).await {
                Ok(Some(event)) => {
                    let _ = ui_tx.try_send(event);
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(command = name, "backend command failed: {err}");
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_client_error(context, &err)));
                }
            }
        }
        tracing::info!("ui command queue closed; backend worker stopping");
        event_task.abort();
    });
}

fn error_context(cmd: &BackendCommand) -> UiErrorContext {
    match cmd {
        BackendCommand::LoadBoards { .. }
        | BackendCommand::SelectBoard { .. }
        | BackendCommand::RefreshBoard
        | BackendCommand::CreateBoard { .. }
        | BackendCommand::RenameBoard { .. }
        | BackendCommand::DeleteBoard { .. } => UiErrorContext::Boards,
        BackendCommand::ReorderBoards { .. } => UiErrorContext::Reorder,
        BackendCommand::InviteUser { .. }
        | BackendCommand::AcceptInvite { .. }
        | BackendCommand::RemoveMember { .. } => UiErrorContext::Members,
        BackendCommand::LoadNotifications | BackendCommand::MarkNotificationsRead => {
            UiErrorContext::Notifications
        }
        _ => UiErrorContext::Task,
    }
}

/// Runs one command against the session. Most results reach the UI through
/// session events; the returned event covers the rest.
pub async fn execute(session: &KanbanSession, cmd: BackendCommand) -> ClientResult<Option<UiEvent>> {
    match cmd {
        BackendCommand::LoadBoards { query } => {
            session.load_boards(query.as_deref()).await?;
        }
        BackendCommand::SelectBoard { board_id } => {
            session.select_board(&board_id).await?;
        }
        BackendCommand::RefreshBoard => {
            session.refresh_board().await?;
        }
        BackendCommand::CreateBoard { board_name } => session.create_board(&board_name).await?,
        BackendCommand::RenameBoard {
            board_id,
            board_name,
        } => session.rename_board(&board_id, &board_name).await?,
        BackendCommand::DeleteBoard { board_id } => session.delete_board(&board_id).await?,
        BackendCommand::ReorderBoards { order } => {
            session.commit_reorder(order).await?;
        }
        BackendCommand::Drop(outcome) => {
            session.handle_drop(outcome).await?;
        }
        BackendCommand::MoveTask { task_id, status } => {
            session.move_task(&task_id, status).await?;
        }
        BackendCommand::CreateTask(request) => session.create_task(request).await?,
        BackendCommand::EditTask { task_id, patch } => {
            session.edit_task(&task_id, patch).await?;
        }
        BackendCommand::DeleteTask { task_id } => session.delete_task(&task_id).await?,
        BackendCommand::SetSubtaskStatus {
            task_id,
            subtask_id,
            checked,
        } => {
            session
                .set_subtask_status(&task_id, &subtask_id, checked)
                .await?;
        }
        BackendCommand::AddSubtask { task_id, name } => {
            session.add_subtask(&task_id, &name).await?
        }
        BackendCommand::ChangePriority { task_id, priority } => {
            session.change_priority(&task_id, priority).await?;
        }
        BackendCommand::StartTimer { task_id } => {
            session.start_timer(&task_id).await?;
        }
        BackendCommand::StopTimer { task_id } => {
            if let Some(total) = session.stop_timer(&task_id).await? {
                return Ok(Some(UiEvent::TimerStopped { task_id, total }));
            }
        }
        BackendCommand::ResetTimer { task_id } => {
            let total = session.reset_timer(&task_id).await?;
            return Ok(Some(UiEvent::TimerStopped { task_id, total }));
        }
        BackendCommand::AssignUser { task_id, email } => {
            let user = session.find_user_by_email(&email).await?;
            session.assign_user(&task_id, &user).await?;
        }
        BackendCommand::UnassignUser { task_id, user_id } => {
            session.unassign_user(&task_id, &user_id).await?
        }
        BackendCommand::InviteUser { board_id, email } => {
            let user = session.invite_user(&board_id, &email).await?;
            return Ok(Some(UiEvent::UserInvited(user)));
        }
        BackendCommand::AcceptInvite { board_id } => session.accept_invite(&board_id).await?,
        BackendCommand::RemoveMember { board_id, user_id } => {
            session.remove_member(&board_id, &user_id).await?
        }
        BackendCommand::LoadNotifications => {
            session.notifications().await?;
        }
        BackendCommand::MarkNotificationsRead => {
            session.mark_all_read().await?;
            session.notifications().await?;
        }
    }
    Ok(None)
}
