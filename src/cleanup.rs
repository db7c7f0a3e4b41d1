use crate::{app_state::AppState, models::ModelError};
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tower_sessions::ExpiredDeletion;
use tracing::{debug, error, info};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Start the background task that periodically removes expired snippets and session records.
pub fn spawn_cleanup_job<Store>(state: AppState, sessions: Store) -> JoinHandle<()>
where
    Store: ExpiredDeletion,
{
    tokio::spawn(async move {
        info!(
            target: "cleanup",
            interval_secs = CLEANUP_INTERVAL.as_secs(),
            "starting cleanup background task"
        );

        let mut ticker = interval(CLEANUP_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if let Err(err) = run_cleanup_cycle(&state, &sessions).await {
                error!(target: "cleanup", %err, "cleanup cycle failed");
            }
        }
    })
}

/// One pass over both stores. A session store failure does not stop the snippet purge.
pub async fn run_cleanup_cycle<Store>(state: &AppState, sessions: &Store) -> Result<u64, CleanupError>
where
    Store: ExpiredDeletion,
{
    let now = OffsetDateTime::now_utc().unix_timestamp();

    if let Err(err) = sessions.delete_expired().await {
        error!(target: "cleanup", %err, "failed to prune expired sessions");
    }

    let snippets_removed = state.snippets().purge_expired(now).await?;
    if snippets_removed > 0 {
        info!(target: "cleanup", snippets_removed, "expired snippets removed");
    } else {
        debug!(target: "cleanup", "no expired snippets to remove in this cycle");
    }

    Ok(snippets_removed)
}

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("snippet store error: {0}")]
    Snippets(#[from] ModelError),
}
