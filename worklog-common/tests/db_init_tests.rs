//! Integration tests for on-disk database initialization
//!
//! - Automatic database creation on first run
//! - Reopening an existing database keeps its rows

use tempfile::TempDir;
use worklog_common::db::init::init_database;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("worklog.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing_and_keeps_rows() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("worklog.db");

    let pool = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO projects (id, channel_id, name) VALUES ('p1', 'c1', 'Alpha')")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    // Open database second time (should succeed and keep data)
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(&pool)
        .await
        .unwrap();

    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_channel_id_unique() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("worklog.db")).await.unwrap();

    sqlx::query("INSERT INTO projects (id, channel_id, name) VALUES ('p1', 'c1', 'Alpha')")
        .execute(&pool)
        .await
        .unwrap();
    let duplicate =
        sqlx::query("INSERT INTO projects (id, channel_id, name) VALUES ('p2', 'c1', 'Beta')")
            .execute(&pool)
            .await;

    assert!(duplicate.is_err(), "Two projects must not share a channel");
}
