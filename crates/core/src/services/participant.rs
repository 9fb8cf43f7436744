//! Participant (nominee) service.

use std::collections::HashSet;

use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{event::EventStatus, participant, user},
    repositories::{EventRepository, ParticipantRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;

use super::event::{can_preview, ensure_owner};
use super::plan::{Resource, limits_for};

/// Input for adding a participant.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,
}

/// Input for updating a participant.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateParticipantInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[validate(url)]
    pub image_url: Option<String>,
}

/// Participant service for business logic.
#[derive(Clone)]
pub struct ParticipantService {
    participant_repo: ParticipantRepository,
    event_repo: EventRepository,
    poll_repo: PollRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl ParticipantService {
    /// Create a new participant service.
    #[must_use]
    pub const fn new(
        participant_repo: ParticipantRepository,
        event_repo: EventRepository,
        poll_repo: PollRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            participant_repo,
            event_repo,
            poll_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Add a participant at the end of the event's list.
    pub async fn add(
        &self,
        owner: &user::Model,
        event_id: &str,
        input: CreateParticipantInput,
    ) -> AppResult<participant::Model> {
        input.validate()?;

        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_owner(&event, owner)?;

        let now = Utc::now();
        let current = self.participant_repo.count_by_event(event_id).await?;
        limits_for(owner, now).check(Resource::ParticipantsPerEvent, current)?;

        let position = self.participant_repo.next_position(event_id).await?;

        let model = participant::ActiveModel {
            id: Set(self.id_gen.generate()),
            event_id: Set(event_id.to_string()),
            name: Set(input.name),
            description: Set(input.description),
            image_url: Set(input.image_url),
            position: Set(position),
            created_at: Set(now.into()),
        };

        self.participant_repo.create(model).await
    }

    /// Participants of an event visible to `viewer`, in display order.
    pub async fn list(
        &self,
        event_id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<Vec<participant::Model>> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status != EventStatus::Approved && !can_preview(&event, viewer) {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }

        self.participant_repo.find_by_event(event_id).await
    }

    /// Update a participant.
    pub async fn update(
        &self,
        owner: &user::Model,
        participant_id: &str,
        input: UpdateParticipantInput,
    ) -> AppResult<participant::Model> {
        input.validate()?;

        let participant = self.get_owned(owner, participant_id).await?;
        let mut active: participant::ActiveModel = participant.into();

        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(image_url) = input.image_url {
            active.image_url = Set(Some(image_url));
        }

        self.participant_repo.update(active).await
    }

    /// Remove a participant and every poll option pointing at it.
    ///
    /// Refused while any poll offering the participant has ballots, or when
    /// a poll would be left with fewer than two options or fewer options
    /// than its `max_choices`.
    pub async fn remove(&self, owner: &user::Model, participant_id: &str) -> AppResult<()> {
        let participant = self.get_owned(owner, participant_id).await?;

        let polls = self.poll_repo.find_by_event(&participant.event_id).await?;
        let poll_ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();
        let options = self.poll_repo.find_options_for_polls(&poll_ids).await?;

        for poll in &polls {
            let poll_options: Vec<_> = options.iter().filter(|o| o.poll_id == poll.id).collect();
            if !poll_options
                .iter()
                .any(|o| o.participant_id == participant_id)
            {
                continue;
            }

            if self.vote_repo.count_by_poll(&poll.id).await? > 0 {
                return Err(AppError::Conflict(format!(
                    "Poll '{}' already has votes for this participant",
                    poll.title
                )));
            }

            let remaining = poll_options.len() - 1;
            if remaining < 2 {
                return Err(AppError::Conflict(format!(
                    "Poll '{}' needs at least two options",
                    poll.title
                )));
            }
            if usize::try_from(poll.max_choices).unwrap_or(usize::MAX) > remaining {
                return Err(AppError::Conflict(format!(
                    "Poll '{}' allows {} choices; lower it before removing an option",
                    poll.title, poll.max_choices
                )));
            }
        }

        self.participant_repo.delete(participant_id).await
    }

    /// Reorder all participants of an event.
    ///
    /// `ordered_ids` must list every participant of the event exactly once.
    pub async fn reorder(
        &self,
        owner: &user::Model,
        event_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<()> {
        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_owner(&event, owner)?;

        let existing: Vec<String> = self
            .participant_repo
            .find_by_event(event_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        ensure_permutation(&existing, ordered_ids)?;

        self.participant_repo.reorder(event_id, ordered_ids).await
    }

    async fn get_owned(
        &self,
        owner: &user::Model,
        participant_id: &str,
    ) -> AppResult<participant::Model> {
        let participant = self.participant_repo.get_by_id(participant_id).await?;
        let event = self.event_repo.get_by_id(&participant.event_id).await?;
        ensure_owner(&event, owner)?;
        Ok(participant)
    }
}

/// Fail unless `ordered` contains exactly the IDs in `existing`.
pub(crate) fn ensure_permutation(existing: &[String], ordered: &[String]) -> AppResult<()> {
    let expected: HashSet<&str> = existing.iter().map(String::as_str).collect();
    let given: HashSet<&str> = ordered.iter().map(String::as_str).collect();

    if given.len() != ordered.len() {
        return Err(AppError::BadRequest("Duplicate IDs in order".to_string()));
    }
    if given != expected {
        return Err(AppError::BadRequest(
            "Order must list every item exactly once".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::event::tests::test_event;
    use crate::services::plan::tests::test_user;
    use pollnow_db::entities::{event, poll, poll_option, user::Plan};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| (*s).to_string()).collect()
    }

    fn service(db: MockDatabase) -> ParticipantService {
        let conn = Arc::new(db.into_connection());
        ParticipantService::new(
            ParticipantRepository::new(conn.clone()),
            EventRepository::new(conn.clone()),
            PollRepository::new(conn.clone()),
            VoteRepository::new(conn),
        )
    }

    fn nominee(id: &str) -> participant::Model {
        participant::Model {
            id: id.to_string(),
            event_id: "e1".to_string(),
            name: id.to_uppercase(),
            description: None,
            image_url: None,
            position: 0,
            created_at: Utc::now().into(),
        }
    }

    fn category(id: &str, max_choices: i32) -> poll::Model {
        poll::Model {
            id: id.to_string(),
            event_id: "e1".to_string(),
            title: "Best Laugh".to_string(),
            description: None,
            max_choices,
            position: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn options(poll_id: &str, participant_ids: &[&str]) -> Vec<poll_option::Model> {
        participant_ids
            .iter()
            .enumerate()
            .map(|(i, pid)| poll_option::Model {
                id: format!("{poll_id}-{pid}"),
                poll_id: poll_id.to_string(),
                participant_id: (*pid).to_string(),
                position: i as i32,
            })
            .collect()
    }

    fn count(n: i64) -> BTreeMap<&'static str, sea_orm::Value> {
        BTreeMap::from([("num_items", sea_orm::Value::from(n))])
    }

    /// Mock for `remove("pa")` on event e1 with a single poll.
    fn removal_db(poll: poll::Model, option_rows: Vec<poll_option::Model>) -> MockDatabase {
        MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[nominee("pa")]])
            .append_query_results([[test_event("e1", "owner", event::EventStatus::Approved)]])
            .append_query_results([[poll]])
            .append_query_results([option_rows])
    }

    #[tokio::test]
    async fn test_remove_blocked_once_poll_has_votes() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            removal_db(category("p1", 1), options("p1", &["pa", "pb", "pc"]))
                .append_query_results([[count(4)]]),
        );

        let result = svc.remove(&owner, "pa").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remove_keeps_two_options() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            removal_db(category("p1", 1), options("p1", &["pa", "pb"]))
                .append_query_results([[count(0)]]),
        );

        let result = svc.remove(&owner, "pa").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remove_respects_max_choices() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            removal_db(category("p1", 3), options("p1", &["pa", "pb", "pc"]))
                .append_query_results([[count(0)]]),
        );

        let result = svc.remove(&owner, "pa").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_remove_participant_without_ballots() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            removal_db(category("p1", 1), options("p1", &["pa", "pb", "pc"]))
                .append_query_results([[count(0)]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        svc.remove(&owner, "pa").await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_skips_polls_without_participant() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            removal_db(category("p1", 2), options("p1", &["pb", "pc"])).append_exec_results([
                MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                },
            ]),
        );

        svc.remove(&owner, "pa").await.unwrap();
    }

    #[test]
    fn test_permutation_checks() {
        let existing = ids(&["a", "b", "c"]);
        assert!(ensure_permutation(&existing, &ids(&["c", "a", "b"])).is_ok());
        assert!(ensure_permutation(&existing, &ids(&["a", "b"])).is_err());
        assert!(ensure_permutation(&existing, &ids(&["a", "a", "b"])).is_err());
        assert!(ensure_permutation(&existing, &ids(&["a", "b", "x"])).is_err());
    }

    #[tokio::test]
    async fn test_add_blocked_at_participant_limit() {
        let owner = test_user("owner", Plan::Free);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event("e1", "owner", event::EventStatus::Draft)]])
                .append_query_results([[BTreeMap::from([(
                    "num_items",
                    sea_orm::Value::from(10i64),
                )])]]),
        );

        let result = svc
            .add(
                &owner,
                "e1",
                CreateParticipantInput {
                    name: "Ana".to_string(),
                    description: None,
                    image_url: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::QuotaExceeded(_))));
    }

    #[tokio::test]
    async fn test_add_requires_owner() {
        let stranger = test_user("stranger", Plan::Unlimited);
        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_event("e1", "owner", event::EventStatus::Draft)]]),
        );

        let result = svc
            .add(
                &stranger,
                "e1",
                CreateParticipantInput {
                    name: "Ana".to_string(),
                    description: None,
                    image_url: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }
}
