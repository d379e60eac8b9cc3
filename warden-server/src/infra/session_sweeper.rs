use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use warden_core::auth::domain::repositories::{SessionStore, StoreError};

/// Delete expired sessions once.
pub async fn sweep_once(store: &dyn SessionStore) -> Result<u64, StoreError> {
    let removed = store.purge_expired().await?;
    if removed > 0 {
        info!(removed, "purged expired refresh sessions");
    } else {
        debug!("no expired refresh sessions to purge");
    }
    Ok(removed)
}

/// Run [`sweep_once`] every `interval` until `shutdown` fires.
pub fn spawn_session_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("session sweeper stopping");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(err) = sweep_once(store.as_ref()).await {
                        warn!(error = %err, "expired session purge failed");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;
    use warden_core::auth::{
        ClientFingerprint,
        domain::aggregates::RefreshSessionRecord,
        infrastructure::repositories::InMemorySessionStore,
    };

    use super::*;

    fn record(hash: &str, expires_in: chrono::Duration) -> RefreshSessionRecord {
        RefreshSessionRecord {
            token_hash: hash.to_string(),
            user_id: Uuid::now_v7(),
            expires_at: Utc::now() + expires_in,
            fingerprint: ClientFingerprint::new("ua", "fp", "10.0.0.1").unwrap(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_sessions() {
        let store = InMemorySessionStore::new();
        store
            .create(&record("expired", chrono::Duration::minutes(-1)))
            .await
            .unwrap();
        store
            .create(&record("live", chrono::Duration::minutes(5)))
            .await
            .unwrap();

        assert_eq!(sweep_once(&store).await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sweeper_runs_on_interval_and_stops_on_shutdown() {
        let store = Arc::new(InMemorySessionStore::new());
        store
            .create(&record("expired", chrono::Duration::minutes(-1)))
            .await
            .unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_session_sweeper(
            store.clone(),
            Duration::from_secs(60),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(store.is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
