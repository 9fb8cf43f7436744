//! Gala gate: results stay hidden until the reveal time.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::Serialize;

/// Whether results of an event may be shown yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum GalaGate {
    /// Results are visible and voting is closed (or no gala date was set).
    Open,
    /// Results are hidden and voting is still possible.
    #[serde(rename_all = "camelCase")]
    Locked {
        reveal_at: DateTime<Utc>,
        #[serde(serialize_with = "serialize_seconds")]
        remaining: Duration,
    },
}

impl GalaGate {
    /// Evaluate the gate for a gala date at `now`.
    #[must_use]
    pub fn evaluate(gala_date: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> Self {
        match gala_date {
            Some(date) if now < date => {
                let reveal_at = date.with_timezone(&Utc);
                Self::Locked {
                    reveal_at,
                    remaining: reveal_at - now,
                }
            }
            _ => Self::Open,
        }
    }

    /// Whether results are visible.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Whether ballots are still accepted.
    ///
    /// An event without a gala date never closes.
    #[must_use]
    pub fn accepts_votes(gala_date: Option<DateTime<FixedOffset>>, now: DateTime<Utc>) -> bool {
        gala_date.is_none_or(|date| now < date)
    }
}

fn serialize_seconds<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_i64(d.num_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_before_gala_is_locked() {
        let now = Utc::now();
        let gala = (now + Duration::hours(2)).fixed_offset();

        match GalaGate::evaluate(Some(gala), now) {
            GalaGate::Locked { remaining, .. } => {
                assert_eq!(remaining.num_minutes(), 120);
            }
            GalaGate::Open => panic!("expected locked"),
        }
        assert!(GalaGate::accepts_votes(Some(gala), now));
    }

    #[test]
    fn test_after_gala_is_open() {
        let now = Utc::now();
        let gala = (now - Duration::minutes(1)).fixed_offset();

        assert!(GalaGate::evaluate(Some(gala), now).is_open());
        assert!(!GalaGate::accepts_votes(Some(gala), now));
    }

    #[test]
    fn test_exact_gala_instant_is_open() {
        let now = Utc::now();
        assert!(GalaGate::evaluate(Some(now.fixed_offset()), now).is_open());
        assert!(!GalaGate::accepts_votes(Some(now.fixed_offset()), now));
    }

    #[test]
    fn test_no_date_is_open_and_accepts_votes() {
        let now = Utc::now();
        assert!(GalaGate::evaluate(None, now).is_open());
        assert!(GalaGate::accepts_votes(None, now));
    }

    #[test]
    fn test_locked_serializes_remaining_seconds() {
        let now = Utc::now();
        let gate = GalaGate::evaluate(Some((now + Duration::seconds(90)).fixed_offset()), now);
        let value = serde_json::to_value(gate).unwrap_or_default();

        assert_eq!(value["state"], "locked");
        assert_eq!(value["remaining"], 90);
    }
}
