use chrono::{DateTime, Duration, Utc};

/// Failed-login lockout shared by user and merchant accounts.
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    pub max_attempts: i32,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    pub attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub attempts_remaining: i32,
}

impl LockoutPolicy {
    pub fn new(max_attempts: i32, duration_minutes: i64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            duration: Duration::minutes(duration_minutes.max(1)),
        }
    }

    pub fn from_config() -> Self {
        let config = crate::config::get_config();
        Self::new(
            config.account_lockout_attempts,
            config.account_lockout_duration_minutes,
        )
    }

    pub fn is_locked(&self, locked_until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        locked_until.is_some_and(|until| now < until)
    }

    /// Whole minutes left on a lock, rounded up.
    pub fn minutes_remaining(&self, locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
        let secs = (locked_until - now).num_seconds().max(0);
        (secs + 59) / 60
    }

    pub fn register_failure(&self, previous_attempts: i32, now: DateTime<Utc>) -> FailedAttempt {
        let attempts = previous_attempts + 1;
        let locked_until = if attempts >= self.max_attempts {
            Some(now + self.duration)
        } else {
            None
        };
        FailedAttempt {
            attempts,
            locked_until,
            attempts_remaining: (self.max_attempts - attempts).max(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_on_the_configured_attempt() {
        let policy = LockoutPolicy::new(5, 30);
        let now = Utc::now();
        let fourth = policy.register_failure(3, now);
        assert_eq!(fourth.attempts, 4);
        assert_eq!(fourth.attempts_remaining, 1);
        assert!(fourth.locked_until.is_none());

        let fifth = policy.register_failure(4, now);
        assert_eq!(fifth.attempts_remaining, 0);
        assert_eq!(fifth.locked_until, Some(now + Duration::minutes(30)));
    }

    #[test]
    fn lock_expires() {
        let policy = LockoutPolicy::new(5, 30);
        let now = Utc::now();
        let until = now + Duration::minutes(10);
        assert!(policy.is_locked(Some(until), now));
        assert!(!policy.is_locked(Some(until), until + Duration::seconds(1)));
        assert!(!policy.is_locked(None, now));
    }

    #[test]
    fn rounds_remaining_minutes_up() {
        let policy = LockoutPolicy::new(5, 30);
        let now = Utc::now();
        assert_eq!(policy.minutes_remaining(now + Duration::seconds(61), now), 2);
        assert_eq!(policy.minutes_remaining(now - Duration::seconds(5), now), 0);
    }
}
