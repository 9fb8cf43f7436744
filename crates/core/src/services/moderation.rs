//! Moderation: event review, reports, bans and the audit log.

use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{
        event::{self, EventStatus},
        moderation_log::{self, ModerationAction, TargetType},
        notification::NotificationType,
        report::{self, ReportStatus},
        support_chat::ChatStatus,
        user::{self, SubscriptionStatus},
    },
    repositories::{
        EventRepository, ModerationLogRepository, ReportRepository, SupportChatRepository,
        UserRepository,
    },
};
use sea_orm::Set;
use serde::Serialize;

use super::notification::NotificationService;
use super::plan::PlanTier;

/// Longest accepted report reason, in characters.
const MAX_REASON_CHARS: usize = 2000;

/// Counters for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationStats {
    pub pending_events: u64,
    pub pending_reports: u64,
    pub open_chats: u64,
    pub users: u64,
}

/// Fail unless `user` is an admin.
pub fn ensure_admin(user: &user::Model) -> AppResult<()> {
    if user.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin access required".to_string()))
    }
}

/// Write one audit log entry. Shared with the support chat service.
pub(crate) async fn write_log(
    log_repo: &ModerationLogRepository,
    id_gen: &IdGenerator,
    moderator: &user::Model,
    action: ModerationAction,
    target_type: TargetType,
    target_id: &str,
    reason: Option<String>,
) -> AppResult<moderation_log::Model> {
    let entry = log_repo
        .create(moderation_log::ActiveModel {
            id: Set(id_gen.generate()),
            moderator_id: Set(moderator.id.clone()),
            action: Set(action),
            target_type: Set(target_type),
            target_id: Set(target_id.to_string()),
            reason: Set(reason),
            created_at: Set(Utc::now().into()),
        })
        .await?;

    tracing::info!(
        moderator_id = %moderator.id,
        action = ?action,
        target_id = %target_id,
        "Moderation action"
    );

    Ok(entry)
}

/// Moderation service.
#[derive(Clone)]
pub struct ModerationService {
    event_repo: EventRepository,
    report_repo: ReportRepository,
    log_repo: ModerationLogRepository,
    user_repo: UserRepository,
    chat_repo: SupportChatRepository,
    notifications: NotificationService,
    id_gen: IdGenerator,
}

impl ModerationService {
    /// Create a new moderation service.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        report_repo: ReportRepository,
        log_repo: ModerationLogRepository,
        user_repo: UserRepository,
        chat_repo: SupportChatRepository,
        notifications: NotificationService,
    ) -> Self {
        Self {
            event_repo,
            report_repo,
            log_repo,
            user_repo,
            chat_repo,
            notifications,
            id_gen: IdGenerator::new(),
        }
    }

    async fn log(
        &self,
        moderator: &user::Model,
        action: ModerationAction,
        target_type: TargetType,
        target_id: &str,
        reason: Option<String>,
    ) -> AppResult<moderation_log::Model> {
        write_log(
            &self.log_repo,
            &self.id_gen,
            moderator,
            action,
            target_type,
            target_id,
            reason,
        )
        .await
    }

    // ========== Reports ==========

    /// Report an approved event. Anonymous visitors may report too.
    pub async fn create_report(
        &self,
        reporter: Option<&user::Model>,
        event_id: &str,
        reason: &str,
    ) -> AppResult<report::Model> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest("Report reason is required".to_string()));
        }
        if reason.chars().count() > MAX_REASON_CHARS {
            return Err(AppError::BadRequest("Report reason too long".to_string()));
        }

        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status != EventStatus::Approved {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }

        let model = report::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event.id),
            reporter_id: Set(reporter.map(|u| u.id.clone())),
            reason: Set(reason.to_string()),
            status: Set(ReportStatus::Pending),
            resolved_by: Set(None),
            resolution_note: Set(None),
            created_at: Set(Utc::now().into()),
            resolved_at: Set(None),
        };

        self.report_repo.create(model).await
    }

    /// List reports, optionally by status.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<report::Model>> {
        self.report_repo.find_all(status, limit.min(100), offset).await
    }

    /// Close a pending report as resolved or dismissed.
    pub async fn resolve_report(
        &self,
        admin: &user::Model,
        report_id: &str,
        resolution: ReportStatus,
        note: Option<String>,
    ) -> AppResult<report::Model> {
        ensure_admin(admin)?;

        let action = match resolution {
            ReportStatus::Resolved => ModerationAction::ResolveReport,
            ReportStatus::Dismissed => ModerationAction::DismissReport,
            ReportStatus::Pending => {
                return Err(AppError::BadRequest(
                    "Resolution must be resolved or dismissed".to_string(),
                ));
            }
        };

        let report = self.report_repo.get_by_id(report_id).await?;
        if report.status != ReportStatus::Pending {
            return Err(AppError::Conflict("Report already handled".to_string()));
        }

        let mut active: report::ActiveModel = report.into();
        active.status = Set(resolution);
        active.resolved_by = Set(Some(admin.id.clone()));
        active.resolution_note = Set(note.clone());
        active.resolved_at = Set(Some(Utc::now().into()));
        let report = self.report_repo.update(active).await?;

        self.log(admin, action, TargetType::Report, &report.id, note)
            .await?;

        if let Some(reporter_id) = &report.reporter_id {
            self.notifications
                .notify(
                    reporter_id,
                    NotificationType::ReportResolved,
                    "Report reviewed",
                    "Thanks for your report. Our team has reviewed it.",
                    Some(&report.event_id),
                )
                .await;
        }

        Ok(report)
    }

    // ========== Event review ==========

    /// Events waiting for review, oldest submission first.
    pub async fn list_pending_events(
        &self,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<event::Model>> {
        self.event_repo
            .find_by_status(EventStatus::Pending, limit.min(100), offset)
            .await
    }

    /// Approve a pending event.
    pub async fn approve_event(
        &self,
        admin: &user::Model,
        event_id: &str,
    ) -> AppResult<event::Model> {
        ensure_admin(admin)?;

        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status != EventStatus::Pending {
            return Err(AppError::BadRequest(
                "Only pending events can be approved".to_string(),
            ));
        }

        let event = self
            .set_event_status(event, EventStatus::Approved, None)
            .await?;
        self.log(
            admin,
            ModerationAction::ApproveEvent,
            TargetType::Event,
            &event.id,
            None,
        )
        .await?;

        self.notifications
            .notify(
                &event.user_id,
                NotificationType::EventApproved,
                "Event approved",
                format!("\"{}\" is now live and open for voting.", event.name),
                Some(&event.id),
            )
            .await;

        Ok(event)
    }

    /// Deny a pending event, or take down an approved one.
    pub async fn deny_event(
        &self,
        admin: &user::Model,
        event_id: &str,
        reason: &str,
    ) -> AppResult<event::Model> {
        ensure_admin(admin)?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::BadRequest("A reason is required".to_string()));
        }

        let event = self.event_repo.get_by_id(event_id).await?;
        if !matches!(event.status, EventStatus::Pending | EventStatus::Approved) {
            return Err(AppError::BadRequest(
                "Only pending or approved events can be denied".to_string(),
            ));
        }

        let event = self
            .set_event_status(event, EventStatus::Denied, Some(reason.to_string()))
            .await?;
        self.log(
            admin,
            ModerationAction::DenyEvent,
            TargetType::Event,
            &event.id,
            Some(reason.to_string()),
        )
        .await?;

        self.notifications
            .notify(
                &event.user_id,
                NotificationType::EventDenied,
                "Event denied",
                format!("\"{}\" was not approved: {reason}", event.name),
                Some(&event.id),
            )
            .await;

        Ok(event)
    }

    async fn set_event_status(
        &self,
        event: event::Model,
        status: EventStatus,
        note: Option<String>,
    ) -> AppResult<event::Model> {
        let mut active: event::ActiveModel = event.into();
        active.status = Set(status);
        active.moderation_note = Set(note);
        active.updated_at = Set(Some(Utc::now().into()));
        self.event_repo.update(active).await
    }

    // ========== Users ==========

    /// Ban a user and revoke their token.
    pub async fn ban_user(
        &self,
        admin: &user::Model,
        user_id: &str,
        reason: Option<String>,
    ) -> AppResult<user::Model> {
        let target = self.moderatable_user(admin, user_id).await?;

        let mut active: user::ActiveModel = target.into();
        active.is_banned = Set(true);
        active.token = Set(None);
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;

        self.log(admin, ModerationAction::BanUser, TargetType::User, &user.id, reason)
            .await?;

        Ok(user)
    }

    /// Lift a ban.
    pub async fn unban_user(&self, admin: &user::Model, user_id: &str) -> AppResult<user::Model> {
        let target = self.moderatable_user(admin, user_id).await?;

        let mut active: user::ActiveModel = target.into();
        active.is_banned = Set(false);
        active.updated_at = Set(Some(Utc::now().into()));
        let user = self.user_repo.update(active).await?;

        self.log(admin, ModerationAction::UnbanUser, TargetType::User, &user.id, None)
            .await?;

        Ok(user)
    }

    /// Assign a plan by hand, outside the billing provider.
    pub async fn set_plan(
        &self,
        admin: &user::Model,
        user_id: &str,
        tier: PlanTier,
        reason: Option<String>,
    ) -> AppResult<user::Model> {
        ensure_admin(admin)?;

        let target = self.user_repo.get_by_id(user_id).await?;
        let user = self.user_repo.update(manual_plan(target, tier)).await?;

        let reason = Some(reason.map_or_else(
            || format!("plan={tier:?}"),
            |r| format!("plan={tier:?}: {r}"),
        ));
        self.log(admin, ModerationAction::SetPlan, TargetType::User, &user.id, reason)
            .await?;

        self.notifications
            .notify(
                &user.id,
                NotificationType::SubscriptionChanged,
                "Plan updated",
                format!("Your plan is now {tier:?}."),
                None,
            )
            .await;

        Ok(user)
    }

    async fn moderatable_user(&self, admin: &user::Model, user_id: &str) -> AppResult<user::Model> {
        ensure_admin(admin)?;

        if admin.id == user_id {
            return Err(AppError::BadRequest(
                "You cannot moderate yourself".to_string(),
            ));
        }

        let target = self.user_repo.get_by_id(user_id).await?;
        if target.is_admin {
            return Err(AppError::Forbidden("Admins cannot be banned".to_string()));
        }

        Ok(target)
    }

    /// List all users, newest first.
    pub async fn list_users(&self, limit: u64, offset: u64) -> AppResult<Vec<user::Model>> {
        self.user_repo.find_all(limit.min(100), offset).await
    }

    // ========== Log & stats ==========

    /// Audit log, newest first.
    pub async fn list_logs(
        &self,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<moderation_log::Model>> {
        self.log_repo.find_recent(limit.min(100), until_id).await
    }

    /// Dashboard counters.
    pub async fn stats(&self) -> AppResult<ModerationStats> {
        Ok(ModerationStats {
            pending_events: self.event_repo.count_by_status(EventStatus::Pending).await?,
            pending_reports: self.report_repo.count_pending().await?,
            open_chats: self.chat_repo.count_by_status(ChatStatus::Open).await?,
            users: self.user_repo.count().await?,
        })
    }
}

/// A hand-assigned plan detaches the user from the provider's subscription
/// state, so a past cancellation no longer overrides it.
fn manual_plan(target: user::Model, tier: PlanTier) -> user::ActiveModel {
    let mut active: user::ActiveModel = target.into();
    active.plan = Set(tier);
    active.subscription_status = Set(SubscriptionStatus::None);
    active.plan_renews_at = Set(None);
    active.updated_at = Set(Some(Utc::now().into()));
    active
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event::tests::test_event;
    use crate::services::plan::tests::test_user;
    use pollnow_db::entities::{notification, user::Plan};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use crate::services::plan::effective_plan;
    use pollnow_db::repositories::NotificationRepository;
    use sea_orm::TryIntoModel;

    fn service(db: MockDatabase) -> ModerationService {
        let conn = Arc::new(db.into_connection());
        ModerationService::new(
            EventRepository::new(conn.clone()),
            ReportRepository::new(conn.clone()),
            ModerationLogRepository::new(conn.clone()),
            UserRepository::new(conn.clone()),
            SupportChatRepository::new(conn.clone()),
            NotificationService::new(NotificationRepository::new(conn)),
        )
    }

    fn admin() -> user::Model {
        let mut admin = test_user("admin", Plan::Free);
        admin.is_admin = true;
        admin
    }

    fn log_entry(action: ModerationAction, target_id: &str) -> moderation_log::Model {
        moderation_log::Model {
            id: "log1".to_string(),
            moderator_id: "admin".to_string(),
            action,
            target_type: TargetType::Event,
            target_id: target_id.to_string(),
            reason: None,
            created_at: Utc::now().into(),
        }
    }

    fn notification_row(user_id: &str) -> notification::Model {
        notification::Model {
            id: "n1".to_string(),
            user_id: user_id.to_string(),
            notification_type: NotificationType::EventApproved,
            title: String::new(),
            body: String::new(),
            event_id: None,
            is_read: false,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_non_admin_cannot_approve() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));
        let user = test_user("someone", Plan::Free);

        let result = svc.approve_event(&user, "e1").await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_pending_event() {
        let pending = test_event("e1", "owner", EventStatus::Pending);
        let mut approved = pending.clone();
        approved.status = EventStatus::Approved;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pending]])
                .append_query_results([[approved]])
                .append_query_results([[log_entry(ModerationAction::ApproveEvent, "e1")]])
                .append_query_results([[notification_row("owner")]]),
        );

        let event = svc.approve_event(&admin(), "e1").await.unwrap();
        assert_eq!(event.status, EventStatus::Approved);
    }

    #[tokio::test]
    async fn test_deny_requires_reason() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc.deny_event(&admin(), "e1", "   ").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_cannot_ban_admin_or_self() {
        let mut other_admin = test_user("admin2", Plan::Free);
        other_admin.is_admin = true;
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[other_admin]]),
        );

        assert!(matches!(
            svc.ban_user(&admin(), "admin", None).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            svc.ban_user(&admin(), "admin2", None).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_report_reason_bounds() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        assert!(svc.create_report(None, "e1", "").await.is_err());
        let long = "x".repeat(MAX_REASON_CHARS + 1);
        assert!(svc.create_report(None, "e1", &long).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_report_rejects_pending_resolution() {
        let svc = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = svc
            .resolve_report(&admin(), "r1", ReportStatus::Pending, None)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_manual_plan_overrides_canceled_subscription() {
        let mut target = test_user("u1", Plan::Free);
        target.subscription_status = SubscriptionStatus::Canceled;
        target.plan_renews_at = Some((Utc::now() - chrono::Duration::days(3)).into());

        let granted = manual_plan(target, PlanTier::Premium).try_into_model().unwrap();
        assert_eq!(granted.plan, PlanTier::Premium);
        assert_eq!(granted.subscription_status, SubscriptionStatus::None);
        assert!(granted.plan_renews_at.is_none());
        assert_eq!(effective_plan(&granted, Utc::now()), PlanTier::Premium);
    }

    #[tokio::test]
    async fn test_set_plan_logs_and_notifies() {
        let mut target = test_user("u1", Plan::Free);
        target.subscription_status = SubscriptionStatus::Canceled;
        let mut updated = target.clone();
        updated.plan = PlanTier::Premium;
        updated.subscription_status = SubscriptionStatus::None;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[target]])
                .append_query_results([[updated]])
                .append_query_results([[log_entry(ModerationAction::SetPlan, "u1")]])
                .append_query_results([[notification_row("u1")]]),
        );

        let user = svc
            .set_plan(&admin(), "u1", PlanTier::Premium, None)
            .await
            .unwrap();
        assert_eq!(effective_plan(&user, Utc::now()), PlanTier::Premium);
    }

    #[tokio::test]
    async fn test_stats() {
        let count = |n: i64| BTreeMap::from([("num_items", sea_orm::Value::from(n))]);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[count(2)]])
                .append_query_results([[count(1)]])
                .append_query_results([[count(3)]])
                .append_query_results([[count(40)]]),
        );

        let stats = svc.stats().await.unwrap();
        assert_eq!(stats.pending_events, 2);
        assert_eq!(stats.pending_reports, 1);
        assert_eq!(stats.open_chats, 3);
        assert_eq!(stats.users, 40);
    }
}
