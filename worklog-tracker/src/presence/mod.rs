//! Voice presence → work-log state machine
//!
//! Per user the state is either "no open log" or "open log for project P".
//! It is re-derived from the log store on every event and never cached, so
//! restarts and redelivered events converge on the stored truth.
//!
//! Each event runs under the user's lock:
//! 1. Find the user's open log. An event observed before that log started
//!    was overtaken by a newer one and is skipped.
//! 2. If one exists and the event still places the user in that project's
//!    channel (mute/deaf toggle, duplicate), stop. Otherwise close it.
//! 3. If the event names a channel other than the break channel and that
//!    channel is a registered project, open a new log.
//!
//! A failed close aborts the event before step 3, so a user never ends up
//! with the old log still open next to a new one.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use worklog_common::db::WorkLog;
use worklog_common::Result;

use crate::store::{ChannelRegistry, LogStore};

mod locks;
mod worker;

pub use locks::{UserGuard, UserLocks};
pub use worker::{event_channel, run_presence_worker, EVENT_QUEUE_CAPACITY};

/// One voice-membership change for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEvent {
    pub user_id: String,
    /// Channel the user is now in; `None` after a disconnect
    pub channel_id: Option<String>,
    /// When this process received the change
    pub observed_at: DateTime<Utc>,
}

impl VoiceEvent {
    pub fn new(
        user_id: impl Into<String>,
        channel_id: Option<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            // An empty channel id carries the same meaning as none
            channel_id: channel_id.filter(|id| !id.is_empty()),
            observed_at,
        }
    }

    /// Event stamped with the current time
    pub fn observed_now(user_id: impl Into<String>, channel_id: Option<String>) -> Self {
        Self::new(user_id, channel_id, worklog_common::time::now())
    }
}

/// What handling an event did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Still in the active log's channel; nothing written
    Unchanged,
    /// No log open before or after; nothing written
    Ignored,
    /// Observed before the active log started; nothing written
    Stale,
    /// A log was opened
    Opened(WorkLog),
    /// The active log was closed and none opened
    Closed(WorkLog),
    /// The active log was closed and another opened at the same instant
    Moved { closed: WorkLog, opened: WorkLog },
}

impl Outcome {
    /// Number of store mutations the event caused
    pub fn writes(&self) -> usize {
        match self {
            Outcome::Unchanged | Outcome::Ignored | Outcome::Stale => 0,
            Outcome::Opened(_) | Outcome::Closed(_) => 1,
            Outcome::Moved { .. } => 2,
        }
    }
}

/// Drives the channel registry and log store from voice events
pub struct PresenceMachine {
    registry: Arc<dyn ChannelRegistry>,
    logs: Arc<dyn LogStore>,
    break_channel_id: String,
    locks: UserLocks,
}

impl PresenceMachine {
    pub fn new(
        registry: Arc<dyn ChannelRegistry>,
        logs: Arc<dyn LogStore>,
        break_channel_id: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            logs,
            break_channel_id: break_channel_id.into(),
            locks: UserLocks::new(),
        }
    }

    pub fn break_channel_id(&self) -> &str {
        &self.break_channel_id
    }

    /// Apply one event
    ///
    /// Errors are logged here with user/project context before being
    /// returned; the caller only decides whether to drop the event.
    pub async fn handle(&self, event: &VoiceEvent) -> Result<Outcome> {
        let _guard = self.locks.lock(&event.user_id).await;

        let active = self.logs.find_open_log(&event.user_id).await.map_err(|e| {
            error!(user_id = %event.user_id, "Failed to look up open log: {}", e);
            e
        })?;

        let mut closed = None;
        if let Some(active) = active {
            if event.observed_at < active.start_time {
                debug!(
                    user_id = %event.user_id,
                    project_id = %active.project_id,
                    observed_at = %event.observed_at,
                    start_time = %active.start_time,
                    "Skipping voice event older than the open work log"
                );
                return Ok(Outcome::Stale);
            }
            if self.still_in_project(&active, event).await? {
                debug!(
                    user_id = %event.user_id,
                    project_id = %active.project_id,
                    "Voice state change within project channel"
                );
                return Ok(Outcome::Unchanged);
            }
            closed = self.close(active, event.observed_at).await?;
        }

        let opened = match event.channel_id.as_deref() {
            Some(channel_id) if channel_id != self.break_channel_id => {
                self.open(&event.user_id, channel_id, event.observed_at)
                    .await?
            }
            _ => None,
        };

        Ok(match (closed, opened) {
            (None, None) => Outcome::Ignored,
            (None, Some(opened)) => Outcome::Opened(opened),
            (Some(closed), None) => Outcome::Closed(closed),
            (Some(closed), Some(opened)) => Outcome::Moved { closed, opened },
        })
    }

    /// Whether the event keeps the user in the channel of the active log's project
    async fn still_in_project(&self, active: &WorkLog, event: &VoiceEvent) -> Result<bool> {
        let project = self
            .registry
            .find_project(&active.project_id)
            .await
            .map_err(|e| {
                error!(
                    user_id = %active.user_id,
                    project_id = %active.project_id,
                    "Failed to resolve project of open log: {}", e
                );
                e
            })?;

        match project {
            Some(project) => Ok(event.channel_id.as_deref() == Some(project.channel_id.as_str())),
            None => {
                warn!(
                    user_id = %active.user_id,
                    project_id = %active.project_id,
                    "Open log references a missing project, closing it"
                );
                Ok(false)
            }
        }
    }

    async fn close(&self, mut log: WorkLog, at: DateTime<Utc>) -> Result<Option<WorkLog>> {
        match self.logs.close_log(&log, at).await {
            Ok(()) => {
                log.end_time = Some(at);
                info!(
                    user_id = %log.user_id,
                    project_id = %log.project_id,
                    seconds = log.duration_seconds(),
                    "Closed work log"
                );
                Ok(Some(log))
            }
            Err(e) if e.is_conflict() => {
                warn!(
                    user_id = %log.user_id,
                    project_id = %log.project_id,
                    "Work log was already closed: {}", e
                );
                Ok(None)
            }
            Err(e) => {
                error!(
                    user_id = %log.user_id,
                    project_id = %log.project_id,
                    "Error closing work log: {}", e
                );
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        user_id: &str,
        channel_id: &str,
        at: DateTime<Utc>,
    ) -> Result<Option<WorkLog>> {
        let project = match self.registry.resolve_project(channel_id).await {
            Ok(Some(project)) => project,
            Ok(None) => {
                debug!(user_id, channel_id, "Channel is not a project channel");
                return Ok(None);
            }
            Err(e) => {
                error!(user_id, channel_id, "Failed to resolve project channel: {}", e);
                return Err(e);
            }
        };

        match self.logs.create_log(user_id, &project.id, at).await {
            Ok(log) => {
                info!(
                    user_id,
                    project_id = %project.id,
                    project = %project.name,
                    "Opened work log"
                );
                Ok(Some(log))
            }
            Err(e) if e.is_conflict() => {
                warn!(user_id, project_id = %project.id, "Work log already open: {}", e);
                Ok(None)
            }
            Err(e) => {
                error!(
                    user_id,
                    project_id = %project.id,
                    "Error creating work log: {}", e
                );
                Err(e)
            }
        }
    }
}
