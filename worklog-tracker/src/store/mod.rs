//! Storage contracts used by the presence state machine
//!
//! The machine only talks to these traits, so it can run against SQLite in
//! production and against in-memory doubles in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use worklog_common::db::{Project, WorkLog};
use worklog_common::Result;

mod sqlite;

pub use sqlite::SqliteStore;

/// Lookup of registered project channels
#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    /// Project registered for a voice channel, `None` when the channel is not a project
    async fn resolve_project(&self, channel_id: &str) -> Result<Option<Project>>;

    /// Point lookup by project id
    async fn find_project(&self, project_id: &str) -> Result<Option<Project>>;
}

/// Work-log records owned by the presence state machine
#[async_trait]
pub trait LogStore: Send + Sync {
    /// The user's open log, if any
    ///
    /// Should more than one be open, the earliest one is returned.
    async fn find_open_log(&self, user_id: &str) -> Result<Option<WorkLog>>;

    /// Open a log; `Error::Conflict` if the user already has an open one
    async fn create_log(
        &self,
        user_id: &str,
        project_id: &str,
        start_time: DateTime<Utc>,
    ) -> Result<WorkLog>;

    /// Stamp `end_time`; `Error::Conflict` if the log is no longer open
    async fn close_log(&self, log: &WorkLog, end_time: DateTime<Utc>) -> Result<()>;
}
