//! SQLite-backed channel registry and log store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use worklog_common::db::{Project, WorkLog};
use worklog_common::{Error, Result};

use super::{ChannelRegistry, LogStore};

/// Registry and log store over one connection pool
#[derive(Clone)]
pub struct SqliteStore {
    db: SqlitePool,
}

impl SqliteStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.db
    }

    /// Register a voice channel as a project
    pub async fn create_project(&self, name: &str, channel_id: &str) -> Result<Project> {
        let name = name.trim();
        let channel_id = channel_id.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("project name must not be empty".to_string()));
        }
        if channel_id.is_empty() {
            return Err(Error::InvalidInput("channel id must not be empty".to_string()));
        }

        let project = Project {
            id: Uuid::new_v4().to_string(),
            channel_id: channel_id.to_string(),
            name: name.to_string(),
        };

        let inserted = sqlx::query("INSERT INTO projects (id, channel_id, name) VALUES (?, ?, ?)")
            .bind(&project.id)
            .bind(&project.channel_id)
            .bind(&project.name)
            .execute(&self.db)
            .await;

        match inserted {
            Ok(_) => Ok(project),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::Conflict(
                format!("channel {} is already registered", channel_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// All registered projects ordered by name
    pub async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects = sqlx::query_as::<_, Project>(
            "SELECT id, channel_id, name FROM projects ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(projects)
    }
}

#[async_trait]
impl ChannelRegistry for SqliteStore {
    async fn resolve_project(&self, channel_id: &str) -> Result<Option<Project>> {
        let project = sqlx::query_as::<_, Project>(
            "SELECT id, channel_id, name FROM projects WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(project)
    }

    async fn find_project(&self, project_id: &str) -> Result<Option<Project>> {
        let project =
            sqlx::query_as::<_, Project>("SELECT id, channel_id, name FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_optional(&self.db)
                .await?;

        Ok(project)
    }
}

#[async_trait]
impl LogStore for SqliteStore {
    async fn find_open_log(&self, user_id: &str) -> Result<Option<WorkLog>> {
        let log = sqlx::query_as::<_, WorkLog>(
            r#"
            SELECT id, user_id, project_id, start_time, end_time
            FROM work_logs
            WHERE user_id = ? AND end_time IS NULL
            ORDER BY start_time ASC, id ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(log)
    }

    async fn create_log(
        &self,
        user_id: &str,
        project_id: &str,
        start_time: DateTime<Utc>,
    ) -> Result<WorkLog> {
        let log = WorkLog {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            project_id: project_id.to_string(),
            start_time,
            end_time: None,
        };

        // Insert only while the user has no open log
        let result = sqlx::query(
            r#"
            INSERT INTO work_logs (id, user_id, project_id, start_time, end_time)
            SELECT ?, ?, ?, ?, NULL
            WHERE NOT EXISTS (
                SELECT 1 FROM work_logs WHERE user_id = ? AND end_time IS NULL
            )
            "#,
        )
        .bind(&log.id)
        .bind(&log.user_id)
        .bind(&log.project_id)
        .bind(log.start_time)
        .bind(&log.user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "user {} already has an open log",
                user_id
            )));
        }

        Ok(log)
    }

    async fn close_log(&self, log: &WorkLog, end_time: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query("UPDATE work_logs SET end_time = ? WHERE id = ? AND end_time IS NULL")
            .bind(end_time)
            .bind(&log.id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!("log {} is not open", log.id)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use worklog_common::db::init_memory_database;

    async fn setup_store() -> SqliteStore {
        SqliteStore::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_resolve_project_by_channel() {
        let store = setup_store().await;
        let project = store.create_project("Alpha", "100").await.unwrap();

        let found = store.resolve_project("100").await.unwrap();
        assert_eq!(found, Some(project.clone()));

        let by_id = store.find_project(&project.id).await.unwrap();
        assert_eq!(by_id, Some(project));

        assert!(store.resolve_project("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_channel_is_conflict() {
        let store = setup_store().await;
        store.create_project("Alpha", "100").await.unwrap();

        let err = store.create_project("Beta", "100").await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_blank_project_name_rejected() {
        let store = setup_store().await;
        let err = store.create_project("  ", "100").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_create_find_close_round() {
        let store = setup_store().await;
        let project = store.create_project("Alpha", "100").await.unwrap();
        let t0 = Utc::now();

        let log = store.create_log("u1", &project.id, t0).await.unwrap();
        let open = store.find_open_log("u1").await.unwrap().unwrap();
        assert_eq!(open.id, log.id);
        assert!(open.is_open());

        store
            .close_log(&open, t0 + Duration::minutes(10))
            .await
            .unwrap();
        assert!(store.find_open_log("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_log_is_conflict() {
        let store = setup_store().await;
        let project = store.create_project("Alpha", "100").await.unwrap();

        store.create_log("u1", &project.id, Utc::now()).await.unwrap();
        let err = store
            .create_log("u1", &project.id, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        // Other users are unaffected
        store.create_log("u2", &project.id, Utc::now()).await.unwrap();
    }

    #[tokio::test]
    async fn test_closing_twice_is_conflict() {
        let store = setup_store().await;
        let project = store.create_project("Alpha", "100").await.unwrap();
        let log = store.create_log("u1", &project.id, Utc::now()).await.unwrap();

        store.close_log(&log, Utc::now()).await.unwrap();
        let err = store.close_log(&log, Utc::now()).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_find_open_log_picks_earliest_when_duplicated() {
        let store = setup_store().await;
        let project = store.create_project("Alpha", "100").await.unwrap();
        let t0 = Utc::now();

        // Bypass the guarded insert to simulate a violated invariant
        for (id, start) in [("late", t0 + Duration::seconds(5)), ("early", t0)] {
            sqlx::query(
                "INSERT INTO work_logs (id, user_id, project_id, start_time) VALUES (?, 'u1', ?, ?)",
            )
            .bind(id)
            .bind(&project.id)
            .bind(start)
            .execute(store.pool())
            .await
            .unwrap();
        }

        let open = store.find_open_log("u1").await.unwrap().unwrap();
        assert_eq!(open.id, "early");
    }
}
