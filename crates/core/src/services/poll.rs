//! Poll (award category) service.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{event::EventStatus, poll, poll_option, user},
    repositories::{EventRepository, ParticipantRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::event::{can_preview, ensure_owner};
use super::participant::ensure_permutation;
use super::plan::{Resource, limits_for};

/// Input for creating a poll.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    #[serde(default = "default_max_choices")]
    pub max_choices: i32,

    /// Participants offered as options, in display order.
    pub participant_ids: Vec<String>,
}

/// Input for updating a poll.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollInput {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub max_choices: Option<i32>,

    /// Replaces the option set. Rejected once the poll has votes.
    pub participant_ids: Option<Vec<String>>,
}

const fn default_max_choices() -> i32 {
    1
}

/// A poll together with its options.
#[derive(Debug, Clone, Serialize)]
pub struct PollWithOptions {
    #[serde(flatten)]
    pub poll: poll::Model,
    pub options: Vec<poll_option::Model>,
}

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    participant_repo: ParticipantRepository,
    event_repo: EventRepository,
    vote_repo: VoteRepository,
    id_gen: IdGenerator,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        participant_repo: ParticipantRepository,
        event_repo: EventRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            poll_repo,
            participant_repo,
            event_repo,
            vote_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll whose options are participants of the same event.
    pub async fn create(
        &self,
        owner: &user::Model,
        event_id: &str,
        input: CreatePollInput,
    ) -> AppResult<PollWithOptions> {
        input.validate()?;

        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_owner(&event, owner)?;

        let now = Utc::now();
        let current = self.poll_repo.count_by_event(event_id).await?;
        limits_for(owner, now).check(Resource::PollsPerEvent, current)?;

        self.ensure_participants(event_id, &input.participant_ids)
            .await?;
        validate_max_choices(input.max_choices, input.participant_ids.len())?;

        let poll_id = self.id_gen.generate();
        let position = i32::try_from(current).unwrap_or(i32::MAX);
        let options = self.build_options(&poll_id, &input.participant_ids);

        let model = poll::ActiveModel {
            id: Set(poll_id.clone()),
            event_id: Set(event_id.to_string()),
            title: Set(input.title),
            description: Set(input.description),
            max_choices: Set(input.max_choices),
            position: Set(position),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };

        let poll = self.poll_repo.create_with_options(model, options).await?;
        let options = self.poll_repo.find_options(&poll.id).await?;

        tracing::debug!(poll_id = %poll.id, event_id = %event_id, "Poll created");

        Ok(PollWithOptions { poll, options })
    }

    /// Update a poll.
    pub async fn update(
        &self,
        owner: &user::Model,
        poll_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<PollWithOptions> {
        input.validate()?;

        let poll = self.get_owned(owner, poll_id).await?;

        let option_count = match &input.participant_ids {
            Some(ids) => {
                if self.vote_repo.count_by_poll(poll_id).await? > 0 {
                    return Err(AppError::Conflict(
                        "Options cannot change once voting has started".to_string(),
                    ));
                }
                self.ensure_participants(&poll.event_id, ids).await?;
                ids.len()
            }
            None => self.poll_repo.find_options(poll_id).await?.len(),
        };
        let max_choices = input.max_choices.unwrap_or(poll.max_choices);
        validate_max_choices(max_choices, option_count)?;

        let replace_options = input
            .participant_ids
            .as_ref()
            .map(|ids| self.build_options(poll_id, ids));

        let mut active: poll::ActiveModel = poll.into();
        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.max_choices = Set(max_choices);
        active.updated_at = Set(Some(Utc::now().into()));

        let poll = self.poll_repo.update(active, replace_options).await?;
        let options = self.poll_repo.find_options(&poll.id).await?;

        Ok(PollWithOptions { poll, options })
    }

    /// Delete a poll with its votes.
    pub async fn delete(&self, owner: &user::Model, poll_id: &str) -> AppResult<()> {
        self.get_owned(owner, poll_id).await?;
        self.poll_repo.delete(poll_id).await
    }

    /// Polls of an event with their options, in display order.
    pub async fn list(
        &self,
        event_id: &str,
        viewer: Option<&user::Model>,
    ) -> AppResult<Vec<PollWithOptions>> {
        let event = self.event_repo.get_by_id(event_id).await?;
        if event.status != EventStatus::Approved && !can_preview(&event, viewer) {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }

        self.list_for_event(event_id).await
    }

    /// Polls of an event with their options, without access checks.
    pub(crate) async fn list_for_event(&self, event_id: &str) -> AppResult<Vec<PollWithOptions>> {
        let polls = self.poll_repo.find_by_event(event_id).await?;
        let poll_ids: Vec<String> = polls.iter().map(|p| p.id.clone()).collect();

        let mut by_poll: HashMap<String, Vec<poll_option::Model>> = HashMap::new();
        for option in self.poll_repo.find_options_for_polls(&poll_ids).await? {
            by_poll.entry(option.poll_id.clone()).or_default().push(option);
        }

        Ok(polls
            .into_iter()
            .map(|poll| {
                let mut options = by_poll.remove(&poll.id).unwrap_or_default();
                options.sort_by_key(|o| o.position);
                PollWithOptions { poll, options }
            })
            .collect())
    }

    /// Reorder all polls of an event.
    pub async fn reorder(
        &self,
        owner: &user::Model,
        event_id: &str,
        ordered_ids: &[String],
    ) -> AppResult<()> {
        let event = self.event_repo.get_by_id(event_id).await?;
        ensure_owner(&event, owner)?;

        let existing: Vec<String> = self
            .poll_repo
            .find_by_event(event_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        ensure_permutation(&existing, ordered_ids)?;

        self.poll_repo.reorder(event_id, ordered_ids).await
    }

    async fn get_owned(&self, owner: &user::Model, poll_id: &str) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let event = self.event_repo.get_by_id(&poll.event_id).await?;
        ensure_owner(&event, owner)?;
        Ok(poll)
    }

    async fn ensure_participants(&self, event_id: &str, participant_ids: &[String]) -> AppResult<()> {
        let unique: HashSet<&str> = participant_ids.iter().map(String::as_str).collect();
        if unique.len() != participant_ids.len() {
            return Err(AppError::BadRequest(
                "A participant can only be offered once per poll".to_string(),
            ));
        }
        if participant_ids.len() < 2 {
            return Err(AppError::BadRequest(
                "A poll needs at least 2 options".to_string(),
            ));
        }

        let found = self.participant_repo.find_by_ids(participant_ids).await?;
        let all_in_event =
            found.len() == participant_ids.len() && found.iter().all(|p| p.event_id == event_id);
        if !all_in_event {
            return Err(AppError::BadRequest(
                "Options must be participants of this event".to_string(),
            ));
        }

        Ok(())
    }

    fn build_options(&self, poll_id: &str, participant_ids: &[String]) -> Vec<poll_option::ActiveModel> {
        participant_ids
            .iter()
            .enumerate()
            .map(|(index, participant_id)| poll_option::ActiveModel {
                id: Set(self.id_gen.generate()),
                poll_id: Set(poll_id.to_string()),
                participant_id: Set(participant_id.clone()),
                position: Set(i32::try_from(index).unwrap_or(i32::MAX)),
            })
            .collect()
    }
}

fn validate_max_choices(max_choices: i32, option_count: usize) -> AppResult<()> {
    let within = usize::try_from(max_choices).is_ok_and(|n| n >= 1 && n <= option_count);
    if within {
        Ok(())
    } else {
        Err(AppError::BadRequest(format!(
            "maxChoices must be between 1 and {option_count}"
        )))
    }
}
