use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::error::{Error, Result};
use crate::services::session_service::SessionService;

/// Starts the cron job that expires overdue consultation sessions. The returned
/// scheduler must be kept alive and shut down on exit.
pub async fn start_session_sweeper(sessions: SessionService, schedule: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .map_err(|e| Error::Internal(format!("failed to create scheduler: {:?}", e)))?;

    let job = Job::new_async(schedule, move |_id, _scheduler| {
        let sessions = sessions.clone();
        Box::pin(async move {
            match sessions.expire_overdue(Utc::now()).await {
                Ok(0) => tracing::debug!("session sweep found nothing to expire"),
                Ok(expired) => tracing::info!(expired, "expired overdue consultation sessions"),
                Err(e) => tracing::error!(error = ?e, "session sweep failed"),
            }
        })
    })
    .map_err(|e| Error::Config(format!("invalid SESSION_SWEEP_CRON '{}': {:?}", schedule, e)))?;

    scheduler
        .add(job)
        .await
        .map_err(|e| Error::Internal(format!("failed to register session sweep: {:?}", e)))?;
    scheduler
        .start()
        .await
        .map_err(|e| Error::Internal(format!("failed to start scheduler: {:?}", e)))?;

    tracing::info!(%schedule, "session sweeper started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn invalid_schedule_is_a_config_error() {
        let result = tokio_test::block_on(async {
            let pool = PgPoolOptions::new()
                .connect_lazy("postgres://localhost/sirius_test")
                .unwrap();
            start_session_sweeper(SessionService::new(pool), "every five minutes").await
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
