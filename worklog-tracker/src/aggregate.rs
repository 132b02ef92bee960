//! Read-only aggregation over closed work logs
//!
//! Open logs never contribute: every query filters on `end_time IS NOT NULL`.
//! Elapsed time per log is `end_time - start_time` rounded to whole seconds
//! and floored at zero.

use futures::future::join_all;
use serde::Serialize;
use sqlx::SqlitePool;
use worklog_common::{Error, Result};

use crate::directory::UserDirectory;

/// Leaderboard size
pub const LEADERBOARD_LIMIT: i64 = 10;

/// Days covered by the timeline
pub const TIMELINE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStat {
    pub project_name: String,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStat {
    pub user_id: String,
    pub user_name: String,
    pub total_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub date: String,
    pub total_seconds: i64,
}

/// Total seconds per project, largest first
pub async fn project_totals(db: &SqlitePool) -> Result<Vec<ProjectStat>> {
    let stats = sqlx::query_as::<_, ProjectStat>(
        r#"
        SELECT COALESCE(p.name, w.project_id) AS project_name,
               SUM(MAX(0, CAST(ROUND((julianday(w.end_time) - julianday(w.start_time)) * 86400.0) AS INTEGER))) AS total_seconds
        FROM work_logs w
        LEFT JOIN projects p ON p.id = w.project_id
        WHERE w.end_time IS NOT NULL
        GROUP BY w.project_id
        ORDER BY total_seconds DESC, project_name ASC
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(stats)
}

/// Top users by total seconds, names resolved through `directory` when present
pub async fn leaderboard(
    db: &SqlitePool,
    directory: Option<&dyn UserDirectory>,
) -> Result<Vec<UserStat>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        r#"
        SELECT w.user_id,
               SUM(MAX(0, CAST(ROUND((julianday(w.end_time) - julianday(w.start_time)) * 86400.0) AS INTEGER))) AS total_seconds
        FROM work_logs w
        WHERE w.end_time IS NOT NULL
        GROUP BY w.user_id
        ORDER BY total_seconds DESC, w.user_id ASC
        LIMIT ?
        "#,
    )
    .bind(LEADERBOARD_LIMIT)
    .fetch_all(db)
    .await?;

    let names = match directory {
        Some(directory) => {
            join_all(rows.iter().map(|(user_id, _)| directory.display_name(user_id))).await
        }
        None => vec![None; rows.len()],
    };

    Ok(rows
        .into_iter()
        .zip(names)
        .map(|((user_id, total_seconds), name)| UserStat {
            user_name: name.unwrap_or_else(|| user_id.clone()),
            user_id,
            total_seconds,
        })
        .collect())
}

/// Daily totals (UTC, by start time) for the most recent days, oldest first
pub async fn timeline(db: &SqlitePool) -> Result<Vec<DailyStat>> {
    let stats = sqlx::query_as::<_, DailyStat>(
        r#"
        SELECT date, total_seconds FROM (
            SELECT date(w.start_time) AS date,
                   SUM(MAX(0, CAST(ROUND((julianday(w.end_time) - julianday(w.start_time)) * 86400.0) AS INTEGER))) AS total_seconds
            FROM work_logs w
            WHERE w.end_time IS NOT NULL
            GROUP BY date(w.start_time)
            ORDER BY date DESC
            LIMIT ?
        )
        ORDER BY date ASC
        "#,
    )
    .bind(TIMELINE_DAYS)
    .fetch_all(db)
    .await?;

    Ok(stats)
}

/// Total seconds logged against one project across all users
pub async fn project_total(db: &SqlitePool, project_id: &str) -> Result<i64> {
    let exists: Option<String> = sqlx::query_scalar("SELECT id FROM projects WHERE id = ?")
        .bind(project_id)
        .fetch_optional(db)
        .await?;
    if exists.is_none() {
        return Err(Error::NotFound(format!("project {}", project_id)));
    }

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(MAX(0, CAST(ROUND((julianday(end_time) - julianday(start_time)) * 86400.0) AS INTEGER))), 0)
        FROM work_logs
        WHERE project_id = ? AND end_time IS NOT NULL
        "#,
    )
    .bind(project_id)
    .fetch_one(db)
    .await?;

    Ok(total)
}

/// Total seconds logged by one user across all projects
pub async fn user_total(db: &SqlitePool, user_id: &str) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(MAX(0, CAST(ROUND((julianday(end_time) - julianday(start_time)) * 86400.0) AS INTEGER))), 0)
        FROM work_logs
        WHERE user_id = ? AND end_time IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    Ok(total)
}
