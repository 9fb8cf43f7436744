//! Event service: award galas and their review lifecycle.

use chrono::{DateTime, FixedOffset, Utc};
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{
        event::{self, EventStatus},
        user,
    },
    repositories::{EventRepository, PollRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::plan::{Resource, limits_for};

/// Input for creating an event.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub gala_date: Option<DateTime<FixedOffset>>,

    #[serde(default = "default_true")]
    pub is_public: bool,
}

/// Input for updating an event. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub gala_date: Option<DateTime<FixedOffset>>,

    /// Remove the gala date so results are never withheld.
    #[serde(default)]
    pub clear_gala_date: bool,

    pub is_public: Option<bool>,
}

const fn default_true() -> bool {
    true
}

/// Whether `user` owns `event`.
#[must_use]
pub fn is_owner(event: &event::Model, user: &user::Model) -> bool {
    event.user_id == user.id
}

/// Whether `viewer` may see an event regardless of its review status.
#[must_use]
pub fn can_preview(event: &event::Model, viewer: Option<&user::Model>) -> bool {
    viewer.is_some_and(|u| u.is_admin || is_owner(event, u))
}

/// Fail unless `user` owns `event`.
pub fn ensure_owner(event: &event::Model, user: &user::Model) -> AppResult<()> {
    if is_owner(event, user) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the event owner can do this".to_string(),
        ))
    }
}

/// Event service for business logic.
#[derive(Clone)]
pub struct EventService {
    event_repo: EventRepository,
    poll_repo: PollRepository,
    id_gen: IdGenerator,
}

impl EventService {
    /// Create a new event service.
    #[must_use]
    pub const fn new(event_repo: EventRepository, poll_repo: PollRepository) -> Self {
        Self {
            event_repo,
            poll_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a draft event, subject to the owner's event quota.
    pub async fn create(
        &self,
        owner: &user::Model,
        input: CreateEventInput,
    ) -> AppResult<event::Model> {
        input.validate()?;

        let now = Utc::now();
        let current = self.event_repo.count_by_user(&owner.id).await?;
        limits_for(owner, now).check(Resource::Events, current)?;

        let model = event::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(owner.id.clone()),
            name: Set(input.name),
            description: Set(input.description),
            status: Set(EventStatus::Draft),
            gala_date: Set(input.gala_date),
            is_public: Set(input.is_public),
            moderation_note: Set(None),
            submitted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let event = self.event_repo.create(model).await?;
        tracing::info!(event_id = %event.id, user_id = %owner.id, "Event created");

        Ok(event)
    }

    /// Get an event as seen by `viewer`.
    ///
    /// Events that are not approved yet are reported as missing to
    /// everyone except their owner and admins.
    pub async fn get_visible(
        &self,
        event_id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;

        if event.status == EventStatus::Approved || can_preview(&event, viewer) {
            Ok(event)
        } else {
            Err(AppError::EventNotFound(event_id.to_string()))
        }
    }

    /// Get an event the user owns.
    pub async fn get_owned(&self, event_id: &str, owner: &user::Model) -> AppResult<event::Model> {
        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_owner(&event, owner)?;
        Ok(event)
    }

    /// Events owned by a user.
    pub async fn list_mine(&self, owner: &user::Model) -> AppResult<Vec<event::Model>> {
        self.event_repo.find_by_user(&owner.id).await
    }

    /// Approved public events.
    pub async fn list_public(&self, limit: u64, offset: u64) -> AppResult<Vec<event::Model>> {
        self.event_repo.find_public(limit.min(100), offset).await
    }

    /// Update an event's details. Approved events stay approved.
    pub async fn update(
        &self,
        event_id: &str,
        owner: &user::Model,
        input: UpdateEventInput,
    ) -> AppResult<event::Model> {
        input.validate()?;

        let event = self.get_owned(event_id, owner).await?;
        let mut active: event::ActiveModel = event.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if input.clear_gala_date {
            active.gala_date = Set(None);
        } else if let Some(gala_date) = input.gala_date {
            active.gala_date = Set(Some(gala_date));
        }
        if let Some(is_public) = input.is_public {
            active.is_public = Set(is_public);
        }

        active.updated_at = Set(Some(Utc::now().into()));

        self.event_repo.update(active).await
    }

    /// Delete an event with everything in it.
    pub async fn delete(&self, event_id: &str, owner: &user::Model) -> AppResult<()> {
        self.get_owned(event_id, owner).await?;
        self.event_repo.delete(event_id).await?;
        tracing::info!(event_id = %event_id, user_id = %owner.id, "Event deleted");
        Ok(())
    }

    /// Send a draft or denied event to the review queue.
    pub async fn submit(&self, event_id: &str, owner: &user::Model) -> AppResult<event::Model> {
        let event = self.get_owned(event_id, owner).await?;

        if !matches!(event.status, EventStatus::Draft | EventStatus::Denied) {
            return Err(AppError::BadRequest(format!(
                "Event cannot be submitted while {:?}",
                event.status
            )));
        }

        if self.poll_repo.count_by_event(event_id).await? == 0 {
            return Err(AppError::BadRequest(
                "Add at least one poll before submitting".to_string(),
            ));
        }

        let now = Utc::now();
        let mut active: event::ActiveModel = event.into();
        active.status = Set(EventStatus::Pending);
        active.moderation_note = Set(None);
        active.submitted_at = Set(Some(now.into()));
        active.updated_at = Set(Some(now.into()));

        let event = self.event_repo.update(active).await?;
        tracing::info!(event_id = %event.id, "Event submitted for review");

        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;
    use crate::services::plan::tests::test_user;
    use pollnow_db::entities::user::Plan;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    pub(crate) fn test_event(id: &str, owner: &str, status: EventStatus) -> event::Model {
        event::Model {
            id: id.to_string(),
            user_id: owner.to_string(),
            name: "Friends of the Year".to_string(),
            description: None,
            status,
            gala_date: None,
            is_public: true,
            moderation_note: None,
            submitted_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn count_row(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", n.into())])
    }

    fn service(db: MockDatabase) -> EventService {
        let conn = Arc::new(db.into_connection());
        EventService::new(EventRepository::new(conn.clone()), PollRepository::new(conn))
    }

    #[test]
    fn test_preview_rights() {
        let owner = test_user("owner", Plan::Free);
        let stranger = test_user("stranger", Plan::Free);
        let mut admin = test_user("admin", Plan::Free);
        admin.is_admin = true;
        let event = test_event("e1", "owner", EventStatus::Pending);

        assert!(can_preview(&event, Some(&owner)));
        assert!(can_preview(&event, Some(&admin)));
        assert!(!can_preview(&event, Some(&stranger)));
        assert!(!can_preview(&event, None));
        assert!(ensure_owner(&event, &admin).is_err());
    }

    #[tokio::test]
    async fn test_create_blocked_by_free_quota() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[count_row(1)]]),
        );

        let result = svc
            .create(
                &owner,
                CreateEventInput {
                    name: "Second gala".to_string(),
                    description: None,
                    gala_date: None,
                    is_public: true,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn test_pending_event_hidden_from_strangers() {
        let stranger = test_user("stranger", Plan::Free);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event("e1", "owner", EventStatus::Pending)]]),
        );

        let result = svc.get_visible("e1", Some(&stranger)).await;
        assert!(matches!(result, Err(AppError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn test_submit_requires_draft_or_denied() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event("e1", "owner", EventStatus::Approved)]]),
        );

        let result = svc.submit("e1", &owner).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_submit_denied_event_goes_pending() {
        let owner = test_user("owner", Plan::Free);
        let denied = test_event("e1", "owner", EventStatus::Denied);
        let mut pending = denied.clone();
        pending.status = EventStatus::Pending;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[denied]])
                .append_query_results([[count_row(2)]])
                .append_query_results([[pending]]),
        );

        let event = svc.submit("e1", &owner).await.unwrap();
        assert_eq!(event.status, EventStatus::Pending);
    }
}
