//! Command orchestration from UI actions to the backend command queue.

use crossbeam_channel::{Sender, TrySendError};

use crate::controller::commands::BackendCommand;

/// Queues `cmd` without blocking the UI. Queue problems are reported in
/// `status` instead of failing the interaction.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut String,
) -> bool {
    let cmd_name = cmd.name();
    match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            true
        }
        Err(TrySendError::Full(_)) => {
            *status = "UI command queue is full; please retry".to_string();
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            *status =
                "Backend worker disconnected (possible startup/runtime failure); restart the app"
                    .to_string();
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_reports_retry() {
        let (tx, _rx) = crossbeam_channel::bounded(1);
        let mut status = String::new();
        assert!(dispatch_backend_command(&tx, BackendCommand::RefreshBoard, &mut status));
        assert!(!dispatch_backend_command(&tx, BackendCommand::RefreshBoard, &mut status));
        assert_eq!(status, "UI command queue is full; please retry");
    }

    #[test]
    fn disconnected_worker_asks_for_restart() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        drop(rx);
        let mut status = String::new();
        assert!(!dispatch_backend_command(
            &tx,
            BackendCommand::LoadNotifications,
            &mut status
        ));
        assert!(status.starts_with("Backend worker disconnected"));
    }
}
