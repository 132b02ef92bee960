//! Single worker draining the inbound voice event queue in arrival order

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{PresenceMachine, VoiceEvent};

/// Events buffered between the gateway adapter and the worker
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Bounded queue feeding the presence worker
pub fn event_channel() -> (mpsc::Sender<VoiceEvent>, mpsc::Receiver<VoiceEvent>) {
    mpsc::channel(EVENT_QUEUE_CAPACITY)
}

/// Handle events one at a time until every sender is dropped
///
/// A failed event is dropped; the next event for that user re-derives its
/// state from the store.
pub async fn run_presence_worker(machine: Arc<PresenceMachine>, mut rx: mpsc::Receiver<VoiceEvent>) {
    info!("Presence worker started");

    while let Some(event) = rx.recv().await {
        match machine.handle(&event).await {
            Ok(outcome) => debug!(
                user_id = %event.user_id,
                channel_id = ?event.channel_id,
                writes = outcome.writes(),
                "Handled voice event: {:?}", outcome
            ),
            Err(e) => debug!(
                user_id = %event.user_id,
                channel_id = ?event.channel_id,
                "Dropped voice event: {}", e
            ),
        }
    }

    info!("Presence worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use chrono::{Duration, Utc};
    use crate::store::LogStore;
    use worklog_common::db::init_memory_database;

    #[tokio::test]
    async fn test_worker_applies_events_in_order() {
        let store = SqliteStore::new(init_memory_database().await.unwrap());
        let alpha = store.create_project("Alpha", "100").await.unwrap();
        let beta = store.create_project("Beta", "200").await.unwrap();
        let machine = Arc::new(PresenceMachine::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            "999",
        ));

        let (tx, rx) = event_channel();
        let worker = tokio::spawn(run_presence_worker(machine, rx));

        let t0 = Utc::now();
        tx.send(VoiceEvent::new("u1", Some("100".into()), t0)).await.unwrap();
        tx.send(VoiceEvent::new("u1", Some("200".into()), t0 + Duration::seconds(60)))
            .await
            .unwrap();
        drop(tx);
        worker.await.unwrap();

        let open = store.find_open_log("u1").await.unwrap().unwrap();
        assert_eq!(open.project_id, beta.id);

        let closed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM work_logs WHERE project_id = ? AND end_time IS NOT NULL",
        )
        .bind(&alpha.id)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(closed, 1);
    }
}
