//! Billing provider webhooks.
//!
//! The provider signs each delivery with a header of the form
//! `t=<unix seconds>,v1=<hex hmac-sha256 of "{t}.{payload}">`. Verified
//! events are applied to the user's subscription once per event ID.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use pollnow_common::{AppError, AppResult, config::BillingConfig};
use pollnow_db::{
    entities::{
        notification::NotificationType,
        user::{self, SubscriptionStatus},
    },
    repositories::{BillingEventRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use sha2::Sha256;

use super::notification::NotificationService;
use super::plan::{PlanTier, parse_tier};

type HmacSha256 = Hmac<Sha256>;

/// Check a webhook signature header against the raw payload.
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> AppResult<()> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
    if now.abs_diff(timestamp) > u64::try_from(tolerance_secs).unwrap_or(0) {
        tracing::warn!(timestamp, now, "Rejected stale webhook signature");
        return Err(AppError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::Internal(format!("Invalid webhook secret: {e}")))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });

    if matched {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

/// Produce a signature header for a payload. Used by tests and tooling.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::new();
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Envelope of every webhook delivery.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookData,
}

/// Wrapper around the event's subject object.
#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    customer: Option<String>,
    subscription: Option<String>,
    /// Our user ID, passed to the provider when the checkout was started.
    client_reference_id: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Subscription {
    id: String,
    customer: String,
    status: String,
    current_period_end: Option<i64>,
    #[serde(default)]
    items: SubscriptionItems,
}

#[derive(Debug, Default, Deserialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
struct SubscriptionItem {
    price: Price,
}

#[derive(Debug, Deserialize)]
struct Price {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Invoice {
    customer: Option<String>,
}

/// What happened to a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// The event changed a user's subscription.
    Applied,
    /// The event ID was processed before.
    Duplicate,
    /// Unsupported kind, or no matching user.
    Ignored,
}

/// Billing service.
#[derive(Clone)]
pub struct BillingService {
    user_repo: UserRepository,
    billing_event_repo: BillingEventRepository,
    notifications: NotificationService,
    webhook_secret: String,
    tolerance_secs: i64,
    price_plans: HashMap<String, PlanTier>,
}

impl BillingService {
    /// Create a new billing service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        billing_event_repo: BillingEventRepository,
        notifications: NotificationService,
        config: &BillingConfig,
    ) -> Self {
        let price_plans = config
            .price_plans
            .iter()
            .filter_map(|(price, plan)| match parse_tier(plan) {
                Some(tier) => Some((price.clone(), tier)),
                None => {
                    tracing::warn!(price = %price, plan = %plan, "Ignoring unknown plan in price map");
                    None
                }
            })
            .collect();

        Self {
            user_repo,
            billing_event_repo,
            notifications,
            webhook_secret: config.webhook_secret.clone(),
            tolerance_secs: config.tolerance_secs,
            price_plans,
        }
    }

    /// Verify a delivery against the configured secret.
    pub fn verify(&self, header: &str, payload: &[u8], now: DateTime<Utc>) -> AppResult<()> {
        if self.webhook_secret.is_empty() {
            tracing::warn!("Billing webhook received but no webhook secret is configured");
            return Err(AppError::InvalidSignature);
        }
        verify_signature(
            header,
            payload,
            &self.webhook_secret,
            now.timestamp(),
            self.tolerance_secs,
        )
    }

    /// Apply a verified delivery.
    pub async fn handle_event(&self, payload: &[u8]) -> AppResult<WebhookOutcome> {
        let event: WebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {e}")))?;

        if !self.billing_event_repo.claim(&event.id, &event.kind).await? {
            tracing::debug!(event_id = %event.id, "Duplicate billing event");
            return Ok(WebhookOutcome::Duplicate);
        }

        let applied = match self.apply(&event).await {
            Ok(applied) => applied,
            Err(e) => {
                if let Err(release_err) = self.billing_event_repo.release(&event.id).await {
                    tracing::warn!(event_id = %event.id, error = %release_err, "Failed to release billing event claim");
                }
                return Err(e);
            }
        };

        let Some(user) = applied else {
            return Ok(WebhookOutcome::Ignored);
        };

        tracing::info!(
            event_id = %event.id,
            kind = %event.kind,
            user_id = %user.id,
            plan = ?user.plan,
            status = ?user.subscription_status,
            "Applied billing event"
        );

        self.notifications
            .notify(
                &user.id,
                NotificationType::SubscriptionChanged,
                "Subscription updated",
                subscription_message(&user),
                None,
            )
            .await;

        Ok(WebhookOutcome::Applied)
    }

    async fn apply(&self, event: &WebhookEvent) -> AppResult<Option<user::Model>> {
        let applied = match event.kind.as_str() {
            "checkout.session.completed" => self.checkout_completed(parse_object(event)?).await?,
            "customer.subscription.updated" => {
                self.subscription_updated(parse_object(event)?).await?
            }
            "customer.subscription.deleted" => {
                self.subscription_deleted(parse_object(event)?).await?
            }
            "invoice.payment_failed" => self.payment_failed(parse_object(event)?).await?,
            other => {
                tracing::debug!(kind = %other, "Ignoring billing event kind");
                None
            }
        };

        if let Some(user) = &applied {
            if let Err(e) = self.billing_event_repo.attach_user(&event.id, &user.id).await {
                tracing::warn!(event_id = %event.id, error = %e, "Failed to link billing event to user");
            }
        }

        Ok(applied)
    }

    async fn checkout_completed(&self, session: CheckoutSession) -> AppResult<Option<user::Model>> {
        let user = match &session.client_reference_id {
            Some(user_id) => self.user_repo.find_by_id(user_id).await?,
            None => self.find_customer(session.customer.as_deref()).await?,
        };
        let Some(user) = user else {
            tracing::warn!("Checkout completed for unknown user");
            return Ok(None);
        };

        let mut active: user::ActiveModel = user.into();
        if let Some(customer) = session.customer {
            active.billing_customer_id = Set(Some(customer));
        }
        if let Some(subscription) = session.subscription {
            active.subscription_id = Set(Some(subscription));
        }
        if let Some(tier) = session.metadata.get("plan").and_then(|p| parse_tier(p)) {
            active.plan = Set(tier);
        }
        active.subscription_status = Set(SubscriptionStatus::Active);
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await.map(Some)
    }

    async fn subscription_updated(&self, sub: Subscription) -> AppResult<Option<user::Model>> {
        let Some(user) = self.find_customer(Some(&sub.customer)).await? else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = user.into();
        active.subscription_id = Set(Some(sub.id));
        if let Some(status) = map_status(&sub.status) {
            active.subscription_status = Set(status);
        }
        if let Some(tier) = sub
            .items
            .data
            .first()
            .and_then(|item| self.price_plans.get(&item.price.id))
        {
            active.plan = Set(*tier);
        }
        if let Some(end) = sub.current_period_end.and_then(|t| DateTime::from_timestamp(t, 0)) {
            active.plan_renews_at = Set(Some(end.into()));
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await.map(Some)
    }

    async fn subscription_deleted(&self, sub: Subscription) -> AppResult<Option<user::Model>> {
        let Some(user) = self.find_customer(Some(&sub.customer)).await? else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = user.into();
        active.plan = Set(PlanTier::Free);
        active.subscription_status = Set(SubscriptionStatus::Canceled);
        active.subscription_id = Set(None);
        active.plan_renews_at = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await.map(Some)
    }

    async fn payment_failed(&self, invoice: Invoice) -> AppResult<Option<user::Model>> {
        let Some(user) = self.find_customer(invoice.customer.as_deref()).await? else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = user.into();
        active.subscription_status = Set(SubscriptionStatus::PastDue);
        active.updated_at = Set(Some(Utc::now().into()));

        self.user_repo.update(active).await.map(Some)
    }

    async fn find_customer(&self, customer: Option<&str>) -> AppResult<Option<user::Model>> {
        let Some(customer) = customer else {
            return Ok(None);
        };
        let user = self.user_repo.find_by_billing_customer_id(customer).await?;
        if user.is_none() {
            tracing::warn!(customer = %customer, "Billing event for unknown customer");
        }
        Ok(user)
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &WebhookEvent) -> AppResult<T> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        AppError::BadRequest(format!("Malformed {} object: {e}", event.kind))
    })
}

fn map_status(status: &str) -> Option<SubscriptionStatus> {
    match status {
        "active" | "trialing" => Some(SubscriptionStatus::Active),
        "past_due" | "unpaid" => Some(SubscriptionStatus::PastDue),
        "canceled" | "incomplete_expired" => Some(SubscriptionStatus::Canceled),
        _ => None,
    }
}

fn subscription_message(user: &user::Model) -> String {
    match user.subscription_status {
        SubscriptionStatus::PastDue => {
            "A payment failed. Please update your billing details to keep your plan.".to_string()
        }
        SubscriptionStatus::Canceled => {
            "Your subscription has ended and your account is on the Free plan.".to_string()
        }
        SubscriptionStatus::Active | SubscriptionStatus::None => {
            format!("Your plan is now {:?}.", user.plan)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::plan::tests::test_user;
    use pollnow_db::entities::notification;
    use pollnow_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    const SECRET: &str = "whsec_test";

    fn service(db: MockDatabase) -> BillingService {
        let conn = Arc::new(db.into_connection());
        let config = BillingConfig {
            webhook_secret: SECRET.to_string(),
            tolerance_secs: 300,
            price_plans: HashMap::from([
                ("price_premium".to_string(), "premium".to_string()),
                ("price_bogus".to_string(), "platinum".to_string()),
            ]),
        };
        BillingService::new(
            UserRepository::new(conn.clone()),
            BillingEventRepository::new(conn.clone()),
            NotificationService::new(NotificationRepository::new(conn)),
            &config,
        )
    }

    fn affected(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = sign_payload(payload, SECRET, 1_700_000_000);
        assert!(verify_signature(&header, payload, SECRET, 1_700_000_010, 300).is_ok());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let header = sign_payload(br#"{"id":"evt_1"}"#, SECRET, 1_700_000_000);
        let result = verify_signature(&header, br#"{"id":"evt_2"}"#, SECRET, 1_700_000_000, 300);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn test_stale_signature_rejected() {
        let payload = b"{}";
        let header = sign_payload(payload, SECRET, 1_700_000_000);
        assert!(verify_signature(&header, payload, SECRET, 1_700_000_301, 300).is_err());
    }

    #[test]
    fn test_any_matching_v1_accepted() {
        let payload = b"{}";
        let good = sign_payload(payload, SECRET, 1_700_000_000);
        let header = format!("{good},v1=deadbeef");
        assert!(verify_signature(&header, payload, SECRET, 1_700_000_000, 300).is_ok());
        assert!(verify_signature("v1=deadbeef", payload, SECRET, 1_700_000_000, 300).is_err());
        assert!(verify_signature("t=abc,v1=zz", payload, SECRET, 1_700_000_000, 300).is_err());
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let payload = b"{}";
        let now = 1_700_000_000;
        for t in [i64::MIN, i64::MAX, -1, 0] {
            let header = format!("t={t},v1=00");
            let result = verify_signature(&header, payload, SECRET, now, 300);
            assert!(matches!(result, Err(AppError::InvalidSignature)));
        }
        let header = sign_payload(payload, SECRET, now);
        assert!(verify_signature(&header, payload, SECRET, i64::MIN, 300).is_err());
    }

    #[test]
    fn test_unknown_price_plan_dropped() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        assert_eq!(svc.price_plans.len(), 1);
        assert_eq!(svc.price_plans.get("price_premium"), Some(&PlanTier::Premium));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("trialing"), Some(SubscriptionStatus::Active));
        assert_eq!(map_status("unpaid"), Some(SubscriptionStatus::PastDue));
        assert_eq!(map_status("incomplete"), None);
    }

    #[tokio::test]
    async fn test_duplicate_event_skipped() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([affected(0)]),
        );
        let payload = json!({
            "id": "evt_1",
            "type": "invoice.payment_failed",
            "data": { "object": { "customer": "cus_1" } }
        });

        let outcome = svc
            .handle_event(payload.to_string().as_bytes())
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_unknown_kind_ignored() {
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_exec_results([affected(1)]),
        );
        let payload = json!({
            "id": "evt_2",
            "type": "customer.created",
            "data": { "object": {} }
        });

        let outcome = svc
            .handle_event(payload.to_string().as_bytes())
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Ignored);
    }

    #[tokio::test]
    async fn test_subscription_deleted_downgrades() {
        let mut user = test_user("u1", PlanTier::Premium);
        user.billing_customer_id = Some("cus_1".to_string());
        user.subscription_status = SubscriptionStatus::Active;

        let mut downgraded = user.clone();
        downgraded.plan = PlanTier::Free;
        downgraded.subscription_status = SubscriptionStatus::Canceled;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([affected(1), affected(1)])
                .append_query_results([[user]])
                .append_query_results([[downgraded]])
                .append_query_results([Vec::<notification::Model>::new()]),
        );
        let payload = json!({
            "id": "evt_3",
            "type": "customer.subscription.deleted",
            "data": { "object": { "id": "sub_1", "customer": "cus_1", "status": "canceled" } }
        });

        let outcome = svc
            .handle_event(payload.to_string().as_bytes())
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Applied);
    }

    #[tokio::test]
    async fn test_failed_apply_releases_claim() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([affected(1), affected(1)])
            .append_query_errors([DbErr::Custom("connection reset".to_string())]);
        let svc = service(db);
        let payload = json!({
            "id": "evt_4",
            "type": "invoice.payment_failed",
            "data": { "object": { "customer": "cus_1" } }
        });

        let result = svc.handle_event(payload.to_string().as_bytes()).await;
        assert!(matches!(result, Err(AppError::Database(_))));
    }

    #[tokio::test]
    async fn test_malformed_payload_is_bad_request() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let result = svc.handle_event(b"not json").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
