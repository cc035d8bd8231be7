use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Time remaining in a voting window, rendered as `"{h}h {m}m {s}s"`.
///
/// Purely a display value: reaching `Expired` changes nothing about the post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
    Remaining { hours: i64, minutes: i64, seconds: i64 },
    Expired,
}

impl TimeLeft {
    pub fn until(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if expires_at <= now {
            return TimeLeft::Expired;
        }
        let remaining = (expires_at - now).num_seconds();
        TimeLeft::Remaining {
            hours: remaining / 3600,
            minutes: remaining % 3600 / 60,
            seconds: remaining % 60,
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TimeLeft::Expired)
    }
}

impl std::fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeLeft::Remaining { hours, minutes, seconds } => {
                write!(f, "{hours}h {minutes}m {seconds}s")
            }
            TimeLeft::Expired => f.write_str("Expired"),
        }
    }
}

impl Serialize for TimeLeft {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn renders_hours_minutes_seconds() {
        let now = Utc::now();
        let left = TimeLeft::until(now + Duration::seconds(23 * 3600 + 5 * 60 + 9), now);
        assert_eq!(left.to_string(), "23h 5m 9s");

        let left = TimeLeft::until(now + Duration::hours(24), now);
        assert_eq!(left.to_string(), "24h 0m 0s");
    }

    #[test]
    fn only_reached_deadlines_are_expired() {
        let now = Utc::now();
        assert!(TimeLeft::until(now, now).is_expired());
        assert_eq!(
            TimeLeft::until(now + Duration::milliseconds(400), now).to_string(),
            "0h 0m 0s"
        );
        assert_eq!(TimeLeft::until(now - Duration::hours(1), now).to_string(), "Expired");
    }

    #[test]
    fn serializes_as_label() {
        let now = Utc::now();
        let json = serde_json::to_value(TimeLeft::until(now + Duration::seconds(61), now)).unwrap();
        assert_eq!(json, "0h 1m 1s");
    }
}
