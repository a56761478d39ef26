//! TTL Cleanup Task
//!
//! Background task that periodically removes expired records from the
//! in-memory engine, so records nobody reads again do not pile up.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::memory::SharedStore;

/// Spawns a task that sweeps expired records every `cleanup_interval_secs`.
///
/// The returned handle is aborted when the owning engine is dropped.
pub fn spawn_cleanup_task(store: SharedStore, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut guard = store.write().await;
                guard.cleanup_expired()
            };

            if removed > 0 {
                info!("TTL cleanup: removed {} expired records", removed);
            } else {
                debug!("TTL cleanup: no expired records found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use crate::backend::memory::MemoryStore;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_records() {
        let store = Arc::new(RwLock::new(MemoryStore::new(100)));
        store
            .write()
            .await
            .insert("expire_soon", b"textvalue".to_vec(), 1)
            .unwrap();
        store
            .write()
            .await
            .insert("long_lived", b"textvalue".to_vec(), 3600)
            .unwrap();

        let handle = spawn_cleanup_task(store.clone(), 1);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(store.read().await.len(), 1);
        assert!(store.write().await.get("long_lived").is_ok());

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let store = Arc::new(RwLock::new(MemoryStore::new(100)));
        let handle = spawn_cleanup_task(store, 1);

        handle.abort();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
