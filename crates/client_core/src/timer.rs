//! Per-task time tracking. The timer only counts; persisting the total is
//! the session's job (`stop` and `reset` return what must be written).

use std::{sync::Arc, time::Duration};

use shared::domain::TaskId;
use tokio::{sync::Mutex, task::JoinHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTimer {
    task_id: TaskId,
    elapsed: u64,
    running: bool,
}

impl TaskTimer {
    /// Starts from the task's already tracked seconds.
    pub fn new(task_id: TaskId, tracked: u64) -> Self {
        Self {
            task_id,
            elapsed: tracked,
            running: false,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        true
    }

    pub fn tick(&mut self) {
        if self.running {
            self.elapsed = self.elapsed.saturating_add(1);
        }
    }

    /// Stops the timer. Returns the total to persist, or `None` when it was
    /// not running (nothing changed).
    pub fn stop(&mut self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.running = false;
        Some(self.elapsed)
    }

    /// Stops and zeroes the timer; the returned value is always persisted.
    pub fn reset(&mut self) -> u64 {
        self.running = false;
        self.elapsed = 0;
        0
    }

    pub fn display(&self) -> String {
        format_tracked(self.elapsed)
    }
}

/// `HH:MM:SS`; hours are not capped at 24.
pub fn format_tracked(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}

/// Drives `tick` once per `period` until the timer stops.
pub fn spawn_ticker(timer: Arc<Mutex<TaskTimer>>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut timer = timer.lock().await;
            if !timer.is_running() {
                break;
            }
            timer.tick();
        }
    })
}
