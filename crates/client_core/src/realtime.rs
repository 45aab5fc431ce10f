//! Realtime store collaborator: per-user notification log and the board
//! owner's `assigned` ledger.
//!
//! The store is append-event / subscribe-to-stream only; nothing here takes
//! part in board reconciliation.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::{
    domain::UserId,
    protocol::{AssignedMember, NotificationRecord},
};
use tokio::sync::{broadcast, Mutex};
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, ClientResult};

/// Live view of one user's notifications; yields the full list, newest
/// first, every time it changes.
pub type NotificationFeed = BoxStream<'static, Vec<NotificationRecord>>;

#[async_trait]
pub trait RealtimeStore: Send + Sync {
    async fn push_notification(
        &self,
        recipient: &UserId,
        record: &NotificationRecord,
    ) -> ClientResult<()>;
    async fn notifications(&self, user_id: &UserId) -> ClientResult<Vec<NotificationRecord>>;
    async fn mark_all_read(&self, user_id: &UserId) -> ClientResult<()>;
    async fn assigned_members(&self, board_owner: &UserId) -> ClientResult<Vec<AssignedMember>>;
    /// Rejects a member whose user id is already on the ledger.
    async fn add_assigned_member(
        &self,
        board_owner: &UserId,
        member: AssignedMember,
    ) -> ClientResult<()>;
    async fn remove_assigned_member(
        &self,
        board_owner: &UserId,
        user_id: &UserId,
    ) -> ClientResult<()>;
    fn subscribe_notifications(self: Arc<Self>, user_id: UserId) -> NotificationFeed;
}

pub fn unread_count(records: &[NotificationRecord]) -> usize {
    records.iter().filter(|record| !record.read).count()
}

fn newest_first(mut records: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    records
}

fn ensure_not_assigned(current: &[AssignedMember], member: &AssignedMember) -> ClientResult<()> {
    if current.iter().any(|m| m.user_id == member.user_id) {
        return Err(ClientError::validation(format!(
            "{} is already on the assigned list",
            member.name
        )));
    }
    Ok(())
}

pub struct MissingRealtimeStore;

fn missing() -> ClientError {
    ClientError::Realtime("realtime store is not configured".into())
}

#[async_trait]
impl RealtimeStore for MissingRealtimeStore {
    async fn push_notification(&self, _: &UserId, _: &NotificationRecord) -> ClientResult<()> {
        Err(missing())
    }

    async fn notifications(&self, _: &UserId) -> ClientResult<Vec<NotificationRecord>> {
        Err(missing())
    }

    async fn mark_all_read(&self, _: &UserId) -> ClientResult<()> {
        Err(missing())
    }

    async fn assigned_members(&self, _: &UserId) -> ClientResult<Vec<AssignedMember>> {
        Err(missing())
    }

    async fn add_assigned_member(&self, _: &UserId, _: AssignedMember) -> ClientResult<()> {
        Err(missing())
    }

    async fn remove_assigned_member(&self, _: &UserId, _: &UserId) -> ClientResult<()> {
        Err(missing())
    }

    fn subscribe_notifications(self: Arc<Self>, _: UserId) -> NotificationFeed {
        futures::stream::empty().boxed()
    }
}

#[derive(Default)]
struct MemoryState {
    notifications: HashMap<UserId, Vec<NotificationRecord>>,
    assigned: HashMap<UserId, Vec<AssignedMember>>,
}

/// Process-local store, used when the app runs without a realtime database
/// and in tests.
pub struct InMemoryRealtimeStore {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<UserId>,
}

impl Default for InMemoryRealtimeStore {
    fn default() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            state: Mutex::new(MemoryState::default()),
            changes,
        }
    }
}

impl InMemoryRealtimeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn snapshot(&self, user_id: &UserId) -> Vec<NotificationRecord> {
        let state = self.state.lock().await;
        newest_first(
            state
                .notifications
                .get(user_id)
                .cloned()
                .unwrap_or_default(),
        )
    }
}

#[async_trait]
impl RealtimeStore for InMemoryRealtimeStore {
    async fn push_notification(
        &self,
        recipient: &UserId,
        record: &NotificationRecord,
    ) -> ClientResult<()> {
        self.state
            .lock()
            .await
            .notifications
            .entry(recipient.clone())
            .or_default()
            .push(record.clone());
        let _ = self.changes.send(recipient.clone());
        Ok(())
    }

    async fn notifications(&self, user_id: &UserId) -> ClientResult<Vec<NotificationRecord>> {
        Ok(self.snapshot(user_id).await)
    }

    async fn mark_all_read(&self, user_id: &UserId) -> ClientResult<()> {
        {
            let mut state = self.state.lock().await;
            if let Some(records) = state.notifications.get_mut(user_id) {
                for record in records.iter_mut() {
                    record.read = true;
                }
            }
        }
        let _ = self.changes.send(user_id.clone());
        Ok(())
    }

    async fn assigned_members(&self, board_owner: &UserId) -> ClientResult<Vec<AssignedMember>> {
        let state = self.state.lock().await;
        Ok(state.assigned.get(board_owner).cloned().unwrap_or_default())
    }

    async fn add_assigned_member(
        &self,
        board_owner: &UserId,
        member: AssignedMember,
    ) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        let ledger = state.assigned.entry(board_owner.clone()).or_default();
        ensure_not_assigned(ledger, &member)?;
        ledger.push(member);
        Ok(())
    }

    async fn remove_assigned_member(
        &self,
        board_owner: &UserId,
        user_id: &UserId,
    ) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        if let Some(ledger) = state.assigned.get_mut(board_owner) {
            ledger.retain(|member| &member.user_id != user_id);
        }
        Ok(())
    }

    fn subscribe_notifications(self: Arc<Self>, user_id: UserId) -> NotificationFeed {
        // Subscribe before the initial read so no change falls in between.
        let changes = BroadcastStream::new(self.changes.subscribe());
        let initial = {
            let store = Arc::clone(&self);
            let user_id = user_id.clone();
            futures::stream::once(async move { store.snapshot(&user_id).await })
        };
        let updates = changes.filter_map(move |changed| {
            let store = Arc::clone(&self);
            let user_id = user_id.clone();
            async move {
                match changed {
                    Ok(changed) if changed == user_id => Some(store.snapshot(&user_id).await),
                    Ok(_) => None,
                    // Lagged: resend the full list.
                    Err(_) => Some(store.snapshot(&user_id).await),
                }
            }
        });
        initial.chain(updates).boxed()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssignedLedger {
    #[serde(default)]
    assigned: Vec<AssignedMember>,
}

/// Firebase Realtime Database over its REST interface
/// (`{db}/path.json`). Live subscriptions poll the path and emit on change.
pub struct FirebaseRealtimeStore {
    http: Client,
    base_url: Url,
    poll_interval: Duration,
}

impl FirebaseRealtimeStore {
    pub fn new(http: Client, base_url: Url, poll_interval: Duration) -> Arc<Self> {
        Arc::new(Self {
            http,
            base_url,
            poll_interval,
        })
    }

    fn node(&self, path: &str) -> ClientResult<Url> {
        Ok(self.base_url.join(&format!("{path}.json"))?)
    }

    async fn notification_map(
        &self,
        user_id: &UserId,
    ) -> ClientResult<BTreeMap<String, NotificationRecord>> {
        let url = self.node(&format!("notification/{user_id}"))?;
        let map: Option<BTreeMap<String, NotificationRecord>> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(map.unwrap_or_default())
    }

    async fn ledger(&self, board_owner: &UserId) -> ClientResult<AssignedLedger> {
        let url = self.node(&format!("task/{board_owner}"))?;
        let ledger: Option<AssignedLedger> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(ledger.unwrap_or_default())
    }

    async fn write_ledger(&self, board_owner: &UserId, ledger: &AssignedLedger) -> ClientResult<()> {
        let url = self.node(&format!("task/{board_owner}"))?;
        self.http
            .patch(url)
            .json(ledger)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl RealtimeStore for FirebaseRealtimeStore {
    async fn push_notification(
        &self,
        recipient: &UserId,
        record: &NotificationRecord,
    ) -> ClientResult<()> {
        let url = self.node(&format!("notification/{recipient}"))?;
        self.http
            .post(url)
            .json(record)
            .send()
            .await?
            .error_for_status()?;
        debug!(recipient = %recipient, kind = ?record.kind, "notification pushed");
        Ok(())
    }

    async fn notifications(&self, user_id: &UserId) -> ClientResult<Vec<NotificationRecord>> {
        Ok(newest_first(
            self.notification_map(user_id).await?.into_values().collect(),
        ))
    }

    async fn mark_all_read(&self, user_id: &UserId) -> ClientResult<()> {
        let mut map = self.notification_map(user_id).await?;
        if map.is_empty() {
            return Ok(());
        }
        for record in map.values_mut() {
            record.read = true;
        }
        let url = self.node(&format!("notification/{user_id}"))?;
        self.http
            .patch(url)
            .json(&map)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn assigned_members(&self, board_owner: &UserId) -> ClientResult<Vec<AssignedMember>> {
        Ok(self.ledger(board_owner).await?.assigned)
    }

    async fn add_assigned_member(
        &self,
        board_owner: &UserId,
        member: AssignedMember,
    ) -> ClientResult<()> {
        let mut ledger = self.ledger(board_owner).await?;
        ensure_not_assigned(&ledger.assigned, &member)?;
        ledger.assigned.push(member);
        self.write_ledger(board_owner, &ledger).await
    }

    async fn remove_assigned_member(
        &self,
        board_owner: &UserId,
        user_id: &UserId,
    ) -> ClientResult<()> {
        let mut ledger = self.ledger(board_owner).await?;
        ledger.assigned.retain(|member| &member.user_id != user_id);
        self.write_ledger(board_owner, &ledger).await
    }

    fn subscribe_notifications(self: Arc<Self>, user_id: UserId) -> NotificationFeed {
        let poll_interval = self.poll_interval;
        futures::stream::unfold(
            (self, user_id, None::<Vec<NotificationRecord>>, true),
            move |(store, user_id, mut last, first)| async move {
                let mut first = first;
                loop {
                    if !first {
                        tokio::time::sleep(poll_interval).await;
                    }
                    first = false;
                    match store.notifications(&user_id).await {
                        Ok(records) if last.as_ref() != Some(&records) => {
                            last = Some(records.clone());
                            return Some((records, (store, user_id, last, false)));
                        }
                        Ok(_) => {}
                        Err(err) => {
                            warn!(user_id = %user_id, "notification poll failed: {err}");
                        }
                    }
                }
            },
        )
        .boxed()
    }
}

#[cfg(test)]
#[path = "tests/realtime_tests.rs"]
mod tests;
