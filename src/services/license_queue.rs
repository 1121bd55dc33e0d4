use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::Result;
use crate::services::license_check::{check_license, record_license_check};
use crate::services::notification_service::NotificationService;

const MIN_DELAY_SECS: i64 = 5 * 60;
pub const POLL_INTERVAL: StdDuration = StdDuration::from_secs(15);
const PRIME_LIMIT: i64 = 250;
const AUTO_CHECKER: &str = "auto-scheduler";

pub fn min_delay() -> Duration {
    Duration::seconds(MIN_DELAY_SECS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecheckJob {
    pub user_id: Uuid,
    pub license_number: String,
    pub regulatory_body: String,
    pub run_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecheckTiming {
    /// Review interval from now.
    Default,
    /// Delay from now, floored at [`min_delay`].
    After(Duration),
    /// Exact run time, used as-is.
    At(DateTime<Utc>),
}

/// In-memory recheck schedule kept sorted by `run_at`, at most one job per user.
#[derive(Clone)]
pub struct LicenseRecheckQueue {
    jobs: Arc<Mutex<Vec<RecheckJob>>>,
    interval: Duration,
}

impl LicenseRecheckQueue {
    pub fn new(interval: Duration) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(Vec::new())),
            interval,
        }
    }

    pub fn from_config() -> Self {
        let secs = crate::config::get_config().license_review_interval_secs;
        Self::new(Duration::seconds(secs.max(0)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecheckJob>> {
        // a panic while holding the lock leaves the vector itself intact
        self.jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns `false` when the request is ignored because a field is empty.
    pub fn schedule(
        &self,
        user_id: Uuid,
        license_number: &str,
        regulatory_body: &str,
        timing: RecheckTiming,
        now: DateTime<Utc>,
    ) -> bool {
        if user_id.is_nil() || license_number.is_empty() || regulatory_body.is_empty() {
            return false;
        }

        let run_at = match timing {
            RecheckTiming::Default => now + self.interval.max(min_delay()),
            RecheckTiming::After(delay) => now + delay.max(min_delay()),
            RecheckTiming::At(at) => at,
        };

        let mut jobs = self.lock();
        jobs.retain(|job| job.user_id != user_id);
        let position = jobs.partition_point(|job| job.run_at <= run_at);
        jobs.insert(
            position,
            RecheckJob {
                user_id,
                license_number: license_number.to_string(),
                regulatory_body: regulatory_body.to_string(),
                run_at,
            },
        );
        true
    }

    /// How long the worker should sleep before looking again, or `None` when the head is due.
    pub fn wait_time(&self, now: DateTime<Utc>) -> Option<StdDuration> {
        let jobs = self.lock();
        match jobs.first() {
            None => Some(POLL_INTERVAL),
            Some(job) if job.run_at > now => {
                let wait = (job.run_at - now).to_std().unwrap_or(POLL_INTERVAL);
                Some(wait.min(POLL_INTERVAL))
            }
            Some(_) => None,
        }
    }

    pub fn pop_due(&self, now: DateTime<Utc>) -> Option<RecheckJob> {
        let mut jobs = self.lock();
        if jobs.first().is_some_and(|job| job.run_at <= now) {
            Some(jobs.remove(0))
        } else {
            None
        }
    }

    pub fn snapshot(&self) -> Vec<RecheckJob> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn failure_delay(&self) -> Duration {
        (self.interval / 4).max(min_delay())
    }

    pub fn error_delay(&self) -> Duration {
        (self.interval / 6).max(min_delay())
    }

    /// Delay until a profile last checked at `last_checked` is due again.
    pub fn prime_delay(&self, last_checked: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
        let remaining = match last_checked {
            Some(at) => self.interval - (now - at),
            None => Duration::zero(),
        };
        remaining.max(min_delay())
    }
}

#[derive(sqlx::FromRow)]
struct PrimeCandidate {
    user_id: Uuid,
    license_number: String,
    regulatory_body: String,
    license_last_checked_at: Option<DateTime<Utc>>,
}

/// Drains the queue: re-runs the licence check, records it, notifies and reschedules.
#[derive(Clone)]
pub struct LicenseRecheckWorker {
    pool: PgPool,
    queue: LicenseRecheckQueue,
    notifications: NotificationService,
}

impl LicenseRecheckWorker {
    pub fn new(pool: PgPool, queue: LicenseRecheckQueue, notifications: NotificationService) -> Self {
        Self {
            pool,
            queue,
            notifications,
        }
    }

    /// Seeds the queue from verified profiles. Returns how many jobs were scheduled.
    pub async fn prime(&self) -> Result<usize> {
        let candidates = sqlx::query_as::<_, PrimeCandidate>(
            r#"
            SELECT user_id, license_number, regulatory_body, license_last_checked_at
            FROM professional_profiles
            WHERE license_verified = TRUE
              AND license_number IS NOT NULL
              AND regulatory_body IS NOT NULL
            LIMIT $1
            "#,
        )
        .bind(PRIME_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let now = Utc::now();
        let mut scheduled = 0;
        for candidate in candidates {
            let delay = self.queue.prime_delay(candidate.license_last_checked_at, now);
            if self.queue.schedule(
                candidate.user_id,
                &candidate.license_number,
                &candidate.regulatory_body,
                RecheckTiming::After(delay),
                now,
            ) {
                scheduled += 1;
            }
        }
        tracing::info!(scheduled, "licence recheck queue primed");
        Ok(scheduled)
    }

    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("licence recheck worker started");
        loop {
            let now = Utc::now();
            if let Some(wait) = self.queue.wait_time(now) {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(wait) => continue,
                }
            }
            let Some(job) = self.queue.pop_due(now) else {
                continue;
            };
            if let Err(e) = self.process(&job).await {
                tracing::error!(error = ?e, user_id = %job.user_id, "licence recheck failed");
                self.queue.schedule(
                    job.user_id,
                    &job.license_number,
                    &job.regulatory_body,
                    RecheckTiming::After(self.queue.error_delay()),
                    Utc::now(),
                );
            }
            if cancel.is_cancelled() {
                break;
            }
        }
        tracing::info!("licence recheck worker stopped");
    }

    pub async fn process(&self, job: &RecheckJob) -> Result<()> {
        let result = check_license(&job.license_number, &job.regulatory_body);
        record_license_check(
            &self.pool,
            job.user_id,
            &job.license_number,
            &job.regulatory_body,
            &result,
            AUTO_CHECKER,
            false,
        )
        .await?;

        let message = recheck_message(&job.license_number, &job.regulatory_body, result.is_verified());
        self.notifications
            .notify(
                job.user_id,
                "Professional licence check update",
                &message,
                Some(json!({
                    "status": result.status,
                    "regulatoryBody": job.regulatory_body,
                    "licenseNumber": job.license_number,
                })),
            )
            .await?;

        let next = if result.is_verified() {
            self.queue.interval()
        } else {
            self.queue.failure_delay()
        };
        self.queue.schedule(
            job.user_id,
            &job.license_number,
            &job.regulatory_body,
            RecheckTiming::After(next),
            Utc::now(),
        );
        tracing::debug!(user_id = %job.user_id, status = result.status.as_str(), "licence rechecked");
        Ok(())
    }
}

fn recheck_message(license_number: &str, regulatory_body: &str, verified: bool) -> String {
    if verified {
        let chars: Vec<char> = license_number.chars().collect();
        let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!(
            "We re-verified your {} licence ending in {}.",
            regulatory_body, tail
        )
    } else {
        format!(
            "We could not confirm your {} licence automatically. Upload updated documents so we can review manually.",
            regulatory_body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> LicenseRecheckQueue {
        LicenseRecheckQueue::new(Duration::days(30))
    }

    #[test]
    fn empty_fields_are_ignored() {
        let q = queue();
        let now = Utc::now();
        assert!(!q.schedule(Uuid::new_v4(), "", "MDCN", RecheckTiming::Default, now));
        assert!(!q.schedule(Uuid::new_v4(), "MDCN-1234", "", RecheckTiming::Default, now));
        assert!(q.is_empty());
    }

    #[test]
    fn delay_is_floored_at_five_minutes() {
        let q = queue();
        let now = Utc::now();
        q.schedule(Uuid::new_v4(), "MDCN-1234", "MDCN", RecheckTiming::After(Duration::seconds(10)), now);
        assert_eq!(q.snapshot()[0].run_at, now + min_delay());
    }

    #[test]
    fn explicit_run_at_is_used_as_is() {
        let q = queue();
        let now = Utc::now();
        let at = now - Duration::hours(1);
        q.schedule(Uuid::new_v4(), "MDCN-1234", "MDCN", RecheckTiming::At(at), now);
        assert_eq!(q.snapshot()[0].run_at, at);
        assert!(q.pop_due(now).is_some());
    }

    #[test]
    fn rescheduling_replaces_the_users_job() {
        let q = queue();
        let now = Utc::now();
        let user = Uuid::new_v4();
        q.schedule(user, "MDCN-1234", "MDCN", RecheckTiming::Default, now);
        q.schedule(user, "MDCN-9999", "MDCN", RecheckTiming::After(Duration::hours(1)), now);
        let jobs = q.snapshot();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].license_number, "MDCN-9999");
    }

    #[test]
    fn jobs_stay_sorted_by_run_at() {
        let q = queue();
        let now = Utc::now();
        let late = Uuid::new_v4();
        let early = Uuid::new_v4();
        let middle = Uuid::new_v4();
        q.schedule(late, "LATE-0001", "NBA", RecheckTiming::After(Duration::days(3)), now);
        q.schedule(early, "EARLY-001", "NBA", RecheckTiming::After(Duration::hours(1)), now);
        q.schedule(middle, "MIDDLE-01", "NBA", RecheckTiming::After(Duration::days(1)), now);
        let order: Vec<Uuid> = q.snapshot().into_iter().map(|j| j.user_id).collect();
        assert_eq!(order, vec![early, middle, late]);
    }

    #[test]
    fn wait_time_is_capped_by_poll_interval() {
        let q = queue();
        let now = Utc::now();
        assert_eq!(q.wait_time(now), Some(POLL_INTERVAL));
        q.schedule(Uuid::new_v4(), "MDCN-1234", "MDCN", RecheckTiming::Default, now);
        assert_eq!(q.wait_time(now), Some(POLL_INTERVAL));
        assert!(q.pop_due(now).is_none());
    }

    #[test]
    fn head_becomes_due_at_run_at() {
        let q = queue();
        let now = Utc::now();
        q.schedule(Uuid::new_v4(), "MDCN-1234", "MDCN", RecheckTiming::After(min_delay()), now);
        let later = now + min_delay();
        assert_eq!(q.wait_time(later), None);
        assert!(q.pop_due(later).is_some());
        assert!(q.is_empty());
    }

    #[test]
    fn retry_delays_derive_from_interval() {
        let q = queue();
        assert_eq!(q.failure_delay(), Duration::days(30) / 4);
        assert_eq!(q.error_delay(), Duration::days(5));
        let short = LicenseRecheckQueue::new(Duration::minutes(10));
        assert_eq!(short.failure_delay(), min_delay());
        assert_eq!(short.error_delay(), min_delay());
    }

    #[test]
    fn prime_delay_uses_remaining_interval() {
        let q = queue();
        let now = Utc::now();
        let checked = now - Duration::days(10);
        assert_eq!(q.prime_delay(Some(checked), now), Duration::days(20));
        assert_eq!(q.prime_delay(Some(now - Duration::days(45)), now), min_delay());
        assert_eq!(q.prime_delay(None, now), min_delay());
    }

    #[test]
    fn verified_message_masks_all_but_last_four() {
        let message = recheck_message("MDCN-123456", "MDCN", true);
        assert!(message.ends_with("ending in 3456."));
        assert!(!message.contains("MDCN-12"));
    }
}
