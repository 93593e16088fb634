//! Local-first writes.
//!
//! Every write is applied to the local state first and then pushed to the
//! server. Writes the server does not acknowledge wait in a persistent FIFO
//! queue and are retried by [`SmartSave::sync_pending`], which the background
//! loop runs on a timer and whenever connectivity comes back.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

use orkut_types::{Profile, UpdateProfileRequest};

use crate::api::{ApiClient, ApiResult};
use crate::log_sync;
use crate::logging::LogConfig;
use crate::store::{LocalState, LocalStore};

/// A queued write is dropped once it has failed this many times
pub const MAX_ATTEMPTS: u32 = 3;

/// How often the background loop retries the queue
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// A write the user made, in a form that can be replayed against the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingOp {
    UpdateProfile(UpdateProfileRequest),
    CreatePost { content: String },
    DeletePost { post_id: Uuid },
    CreateScrap { to_user_id: Uuid, content: String },
    SendMessage { to_user_id: Uuid, content: String },
    CreateComment { post_id: Uuid, content: String },
}

impl PendingOp {
    pub fn describe(&self) -> &'static str {
        match self {
            PendingOp::UpdateProfile(_) => "profile update",
            PendingOp::CreatePost { .. } => "new post",
            PendingOp::DeletePost { .. } => "post deletion",
            PendingOp::CreateScrap { .. } => "scrap",
            PendingOp::SendMessage { .. } => "message",
            PendingOp::CreateComment { .. } => "comment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub id: Uuid,
    pub op: PendingOp,
    /// Failed pushes so far, including the one made when the write was saved
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl PendingWrite {
    /// A write that has not been pushed yet
    pub fn new(op: PendingOp) -> Self {
        Self {
            id: Uuid::new_v4(),
            op,
            attempts: 0,
            queued_at: Utc::now(),
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The server accepted the write
    Synced,
    /// The server could not be reached or refused; the write waits in the queue
    Queued,
}

/// Result of one pass over the queue
#[derive(Debug, Default)]
pub struct SyncReport {
    pub synced: usize,
    pub retried: usize,
    /// Writes that hit `MAX_ATTEMPTS` and were discarded
    pub dropped: Vec<PendingWrite>,
}

impl SyncReport {
    pub fn is_empty(&self) -> bool {
        self.synced == 0 && self.retried == 0 && self.dropped.is_empty()
    }
}

/// Where queued writes are delivered
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn push(&self, op: &PendingOp) -> ApiResult<()>;
}

#[async_trait]
impl SyncTransport for ApiClient {
    async fn push(&self, op: &PendingOp) -> ApiResult<()> {
        match op {
            PendingOp::UpdateProfile(request) => self.update_profile(request).await.map(|_| ()),
            PendingOp::CreatePost { content } => self.create_post(content).await.map(|_| ()),
            PendingOp::DeletePost { post_id } => self.delete_post(*post_id).await,
            PendingOp::CreateScrap { to_user_id, content } => {
                self.create_scrap(*to_user_id, content).await.map(|_| ())
            }
            PendingOp::SendMessage { to_user_id, content } => {
                self.send_message(*to_user_id, content).await.map(|_| ())
            }
            PendingOp::CreateComment { post_id, content } => {
                self.create_comment(*post_id, content).await.map(|_| ())
            }
        }
    }
}

pub struct SmartSave<T> {
    transport: T,
    store: LocalStore,
    state: Mutex<LocalState>,
    /// Queued writes whose push from `save` has not returned yet
    in_flight: std::sync::Mutex<HashSet<Uuid>>,
    /// Held for the length of one queue pass
    sync_lock: Mutex<()>,
    online: Notify,
    log: LogConfig,
}

/// Marks a write as being pushed by `save` until dropped, so a cancelled save
/// hands its write back to `sync_pending`
struct InFlight<'a> {
    set: &'a std::sync::Mutex<HashSet<Uuid>>,
    id: Uuid,
}

impl<'a> InFlight<'a> {
    fn mark(set: &'a std::sync::Mutex<HashSet<Uuid>>, id: Uuid) -> Self {
        set.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).insert(id);
        Self { set, id }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&self.id);
    }
}

impl<T: SyncTransport> SmartSave<T> {
    /// Load any saved state from `store` and deliver writes through `transport`
    pub fn new(transport: T, store: LocalStore) -> Result<Self> {
        let state = store.load()?;
        if !state.queue.is_empty() {
            log::info!("Restored {} pending writes", state.queue.len());
        }
        Ok(Self {
            transport,
            store,
            state: Mutex::new(state),
            in_flight: std::sync::Mutex::new(HashSet::new()),
            sync_lock: Mutex::new(()),
            online: Notify::new(),
            log: LogConfig::default(),
        })
    }

    pub fn with_log_config(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Apply `op` locally and queue it on disk, then try the server once.
    ///
    /// The write is persisted before the push starts, so neither a failed push
    /// nor a crash mid-push loses it. On success it leaves the queue again.
    pub async fn save(&self, op: PendingOp) -> Result<SaveOutcome> {
        let write = PendingWrite::new(op);
        {
            let mut state = self.state.lock().await;
            if let (PendingOp::UpdateProfile(edit), Some(profile)) = (&write.op, state.profile.as_mut()) {
                apply_profile_edit(profile, edit);
            }
            state.queue.push(write.clone());
            self.store.save(&state)?;
        }

        let guard = InFlight::mark(&self.in_flight, write.id);
        let result = self.transport.push(&write.op).await;

        let mut state = self.state.lock().await;
        drop(guard);
        let outcome = match result {
            Ok(()) => {
                state.queue.retain(|queued| queued.id != write.id);
                log_sync!(self.log, "Saved {} directly", write.op.describe());
                SaveOutcome::Synced
            }
            Err(e) => {
                log::warn!("Could not save {} to the server, queueing: {}", write.op.describe(), e);
                if let Some(dropped) = record_failure(&mut state.queue, write.id, e.to_string()) {
                    log::warn!("Dropping {} after {} attempts", dropped.op.describe(), dropped.attempts);
                }
                SaveOutcome::Queued
            }
        };

        self.store.save(&state)?;
        Ok(outcome)
    }

    /// Push queued writes in the order they were made.
    ///
    /// A failure does not stop the pass; the write stays in its place until it
    /// succeeds or reaches `MAX_ATTEMPTS`. Writes a `save` is still pushing
    /// are skipped. The queue is persisted after every push.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let _pass = self.sync_lock.lock().await;
        let mut report = SyncReport::default();

        let batch: Vec<PendingWrite> = {
            let state = self.state.lock().await;
            let in_flight = self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            state
                .queue
                .iter()
                .filter(|write| !in_flight.contains(&write.id))
                .cloned()
                .collect()
        };
        if batch.is_empty() {
            return Ok(report);
        }
        log_sync!(self.log, "Syncing {} pending writes", batch.len());

        for write in batch {
            let result = self.transport.push(&write.op).await;

            let mut state = self.state.lock().await;
            match result {
                Ok(()) => {
                    state.queue.retain(|queued| queued.id != write.id);
                    report.synced += 1;
                }
                Err(e) => match record_failure(&mut state.queue, write.id, e.to_string()) {
                    Some(dropped) => {
                        log::warn!(
                            "Dropping {} after {} attempts: {}",
                            dropped.op.describe(),
                            dropped.attempts,
                            e
                        );
                        report.dropped.push(dropped);
                    }
                    None => report.retried += 1,
                },
            }
            self.store.save(&state)?;
        }

        log_sync!(
            self.log,
            "Sync finished: {} synced, {} retried, {} dropped",
            report.synced,
            report.retried,
            report.dropped.len()
        );
        Ok(report)
    }

    /// Queued writes, oldest first
    pub async fn pending(&self) -> Vec<PendingWrite> {
        self.state.lock().await.queue.clone()
    }

    /// The shadow profile, including edits the server has not seen yet
    pub async fn profile(&self) -> Option<Profile> {
        self.state.lock().await.profile.clone()
    }

    /// Replace the shadow profile with a fresh copy from the server
    pub async fn set_profile(&self, profile: Profile) -> Result<()> {
        let mut state = self.state.lock().await;
        state.profile = Some(profile);
        self.store.save(&state)
    }

    /// Signal that connectivity is back; the background loop syncs right away
    pub fn notify_online(&self) {
        self.online.notify_one();
    }
}

impl<T: SyncTransport + 'static> SmartSave<T> {
    /// Run `sync_pending` every `SYNC_INTERVAL` and on each `notify_online`
    /// until `shutdown` turns true or its sender goes away.
    pub fn spawn_background_sync(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SYNC_INTERVAL);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = self.online.notified() => {
                        log_sync!(self.log, "Back online, syncing");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                match self.sync_pending().await {
                    Ok(report) if !report.is_empty() => log::info!(
                        "Background sync: {} synced, {} retried, {} dropped",
                        report.synced,
                        report.retried,
                        report.dropped.len()
                    ),
                    Ok(_) => {}
                    Err(e) => log::error!("Background sync failed: {:#}", e),
                }
            }
            log::debug!("Background sync stopped");
        })
    }
}

/// Count a failed push of the queued write `id`. Returns the write when it has
/// used up its attempts and was taken out of the queue.
fn record_failure(queue: &mut Vec<PendingWrite>, id: Uuid, error: String) -> Option<PendingWrite> {
    let index = queue.iter().position(|queued| queued.id == id)?;
    let write = &mut queue[index];
    write.attempts += 1;
    write.last_error = Some(error);
    if write.attempts >= MAX_ATTEMPTS {
        Some(queue.remove(index))
    } else {
        None
    }
}

fn apply_profile_edit(profile: &mut Profile, edit: &UpdateProfileRequest) {
    let fields = [
        (&mut profile.display_name, &edit.display_name),
        (&mut profile.bio, &edit.bio),
        (&mut profile.birthday, &edit.birthday),
        (&mut profile.city, &edit.city),
        (&mut profile.country, &edit.country),
        (&mut profile.relationship_status, &edit.relationship_status),
        (&mut profile.interests, &edit.interests),
    ];
    for (current, new) in fields {
        if let Some(value) = new {
            *current = Some(value.clone());
        }
    }
    profile.updated_at = Utc::now();
}
