//! Plan tiers and quota limits.

use chrono::{DateTime, Utc};
use pollnow_common::{AppError, AppResult};
use pollnow_db::entities::user::{self, SubscriptionStatus};
use serde::Serialize;

pub use pollnow_db::entities::user::Plan as PlanTier;

/// Resources counted against a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Events,
    PollsPerEvent,
    ParticipantsPerEvent,
}

impl Resource {
    const fn label(self) -> &'static str {
        match self {
            Self::Events => "events",
            Self::PollsPerEvent => "polls per event",
            Self::ParticipantsPerEvent => "participants per event",
        }
    }
}

/// Numeric limits for a plan tier. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub max_events: Option<u64>,
    pub max_polls_per_event: Option<u64>,
    pub max_participants_per_event: Option<u64>,
}

impl PlanLimits {
    /// Limits for a tier.
    #[must_use]
    pub const fn for_tier(tier: PlanTier) -> Self {
        match tier {
            PlanTier::Free => Self {
                max_events: Some(1),
                max_polls_per_event: Some(5),
                max_participants_per_event: Some(10),
            },
            PlanTier::Premium => Self {
                max_events: Some(10),
                max_polls_per_event: Some(50),
                max_participants_per_event: Some(100),
            },
            PlanTier::Unlimited => Self {
                max_events: None,
                max_polls_per_event: None,
                max_participants_per_event: None,
            },
        }
    }

    /// Limit for one resource.
    #[must_use]
    pub const fn limit(&self, resource: Resource) -> Option<u64> {
        match resource {
            Resource::Events => self.max_events,
            Resource::PollsPerEvent => self.max_polls_per_event,
            Resource::ParticipantsPerEvent => self.max_participants_per_event,
        }
    }

    /// Check whether one more `resource` may be created when `current`
    /// already exist.
    pub fn check(&self, resource: Resource, current: u64) -> AppResult<()> {
        match self.limit(resource) {
            Some(limit) if current >= limit => Err(AppError::QuotaExceeded(format!(
                "Your plan allows {limit} {}",
                resource.label()
            ))),
            _ => Ok(()),
        }
    }
}

/// One row of the public pricing table.
#[derive(Debug, Clone, Serialize)]
pub struct PlanInfo {
    pub tier: PlanTier,
    pub limits: PlanLimits,
}

/// All tiers with their limits, cheapest first.
#[must_use]
pub fn all_plans() -> Vec<PlanInfo> {
    [PlanTier::Free, PlanTier::Premium, PlanTier::Unlimited]
        .into_iter()
        .map(|tier| PlanInfo {
            tier,
            limits: PlanLimits::for_tier(tier),
        })
        .collect()
}

/// Parse a plan name as used in billing metadata and admin requests.
#[must_use]
pub fn parse_tier(name: &str) -> Option<PlanTier> {
    match name.to_ascii_lowercase().as_str() {
        "free" => Some(PlanTier::Free),
        "premium" => Some(PlanTier::Premium),
        "unlimited" => Some(PlanTier::Unlimited),
        _ => None,
    }
}

/// The tier a user is entitled to right now.
///
/// A paid tier falls back to Free once the subscription is canceled, or
/// when a payment is past due and the paid period has ended.
#[must_use]
pub fn effective_plan(user: &user::Model, now: DateTime<Utc>) -> PlanTier {
    if user.plan == PlanTier::Free {
        return PlanTier::Free;
    }

    match user.subscription_status {
        SubscriptionStatus::Canceled => PlanTier::Free,
        SubscriptionStatus::PastDue => match user.plan_renews_at {
            Some(renews_at) if now <= renews_at => user.plan,
            _ => PlanTier::Free,
        },
        SubscriptionStatus::None | SubscriptionStatus::Active => user.plan,
    }
}

/// Limits that apply to a user right now.
#[must_use]
pub fn limits_for(user: &user::Model, now: DateTime<Utc>) -> PlanLimits {
    PlanLimits::for_tier(effective_plan(user, now))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) fn test_user(id: &str, plan: PlanTier) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: id.to_string(),
            username_lower: id.to_lowercase(),
            email: None,
            name: None,
            password_hash: String::new(),
            token: Some(format!("token-{id}")),
            is_admin: false,
            is_banned: false,
            plan,
            billing_customer_id: None,
            subscription_id: None,
            subscription_status: SubscriptionStatus::None,
            plan_renews_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_quota_blocks_at_limit() {
        let free = PlanLimits::for_tier(PlanTier::Free);
        assert!(free.check(Resource::Events, 0).is_ok());
        assert!(matches!(
            free.check(Resource::Events, 1),
            Err(AppError::QuotaExceeded(_))
        ));
        assert!(free.check(Resource::PollsPerEvent, 4).is_ok());
        assert!(free.check(Resource::PollsPerEvent, 5).is_err());
        assert!(free.check(Resource::ParticipantsPerEvent, 10).is_err());
    }

    #[test]
    fn test_unlimited_never_blocks() {
        let unlimited = PlanLimits::for_tier(PlanTier::Unlimited);
        assert!(unlimited.check(Resource::Events, 10_000).is_ok());
        assert!(unlimited.check(Resource::ParticipantsPerEvent, 10_000).is_ok());
    }

    #[test]
    fn test_premium_limits() {
        let premium = PlanLimits::for_tier(PlanTier::Premium);
        assert_eq!(premium.limit(Resource::Events), Some(10));
        assert!(premium.check(Resource::PollsPerEvent, 49).is_ok());
        assert!(premium.check(Resource::PollsPerEvent, 50).is_err());
    }

    #[test]
    fn test_canceled_subscription_falls_back_to_free() {
        let mut user = test_user("u1", PlanTier::Premium);
        user.subscription_status = SubscriptionStatus::Canceled;
        assert_eq!(effective_plan(&user, Utc::now()), PlanTier::Free);
    }

    #[test]
    fn test_past_due_keeps_plan_until_period_end() {
        let now = Utc::now();
        let mut user = test_user("u1", PlanTier::Unlimited);
        user.subscription_status = SubscriptionStatus::PastDue;
        user.plan_renews_at = Some((now + Duration::days(3)).into());
        assert_eq!(effective_plan(&user, now), PlanTier::Unlimited);

        user.plan_renews_at = Some((now - Duration::days(1)).into());
        assert_eq!(effective_plan(&user, now), PlanTier::Free);
    }

    #[test]
    fn test_admin_assigned_plan_without_subscription() {
        let user = test_user("u1", PlanTier::Premium);
        assert_eq!(effective_plan(&user, Utc::now()), PlanTier::Premium);
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!(parse_tier("Premium"), Some(PlanTier::Premium));
        assert_eq!(parse_tier("gold"), None);
        assert_eq!(all_plans().len(), 3);
    }
}
