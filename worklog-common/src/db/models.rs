//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A voice channel registered as a trackable project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: String,
    pub channel_id: String,
    pub name: String,
}

/// One interval of a user's presence in a project channel
///
/// `end_time == None` marks the log as open (in progress).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkLog {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl WorkLog {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed seconds of a closed log; open logs count as zero
    pub fn duration_seconds(&self) -> i64 {
        self.end_time
            .map(|end| crate::time::elapsed_seconds(self.start_time, end))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn log_at(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> WorkLog {
        WorkLog {
            id: "log-1".to_string(),
            user_id: "user-1".to_string(),
            project_id: "project-1".to_string(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_open_log_counts_zero() {
        let log = log_at(Utc::now(), None);
        assert!(log.is_open());
        assert_eq!(log.duration_seconds(), 0);
    }

    #[test]
    fn test_closed_log_duration() {
        let start = Utc::now();
        let log = log_at(start, Some(start + Duration::minutes(25)));
        assert!(!log.is_open());
        assert_eq!(log.duration_seconds(), 1500);
    }
}
