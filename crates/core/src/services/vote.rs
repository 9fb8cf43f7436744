//! Ballot casting.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use pollnow_common::{AppError, AppResult, IdGenerator};
use pollnow_db::{
    entities::{event::EventStatus, vote},
    repositories::{EventRepository, PollRepository, VoteRepository},
};
use sea_orm::Set;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::gala::GalaGate;

/// Who is casting a ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Voter {
    /// A signed-in user, by user ID.
    User(String),
    /// An anonymous visitor, by the value of their voter cookie.
    Anonymous(String),
}

impl Voter {
    fn user_id(&self) -> Option<String> {
        match self {
            Self::User(id) => Some(id.clone()),
            Self::Anonymous(_) => None,
        }
    }
}

/// Salted SHA-256 fingerprint of a voter, hex encoded.
#[must_use]
pub fn fingerprint(salt: &str, voter: &Voter) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    match voter {
        Voter::User(id) => {
            hasher.update(b"user:");
            hasher.update(id.as_bytes());
        }
        Voter::Anonymous(cookie) => {
            hasher.update(b"anon:");
            hasher.update(cookie.as_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    vote_repo: VoteRepository,
    poll_repo: PollRepository,
    event_repo: EventRepository,
    salt: String,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        vote_repo: VoteRepository,
        poll_repo: PollRepository,
        event_repo: EventRepository,
        salt: String,
    ) -> Self {
        Self {
            vote_repo,
            poll_repo,
            event_repo,
            salt,
            id_gen: IdGenerator::new(),
        }
    }

    /// Cast one ballot on a poll.
    pub async fn cast(
        &self,
        poll_id: &str,
        voter: &Voter,
        option_ids: Vec<String>,
        now: DateTime<Utc>,
    ) -> AppResult<vote::Model> {
        let poll = self.poll_repo.get_by_id(poll_id).await?;
        let event = self.event_repo.get_by_id(&poll.event_id).await?;

        if event.status != EventStatus::Approved {
            return Err(AppError::Forbidden(
                "This event is not open for voting".to_string(),
            ));
        }
        if !GalaGate::accepts_votes(event.gala_date, now) {
            return Err(AppError::Forbidden("Voting has closed".to_string()));
        }

        let options = self.poll_repo.find_options(poll_id).await?;
        let valid: HashSet<&str> = options.iter().map(|o| o.id.as_str()).collect();
        validate_ballot(&option_ids, &valid, poll.max_choices)?;

        let fingerprint = fingerprint(&self.salt, voter);
        if self
            .vote_repo
            .find_by_fingerprint(poll_id, &fingerprint)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Already voted in this poll".to_string()));
        }

        let model = vote::ActiveModel {
            id: Set(self.id_gen.generate()),
            poll_id: Set(poll_id.to_string()),
            voter_fingerprint: Set(fingerprint),
            user_id: Set(voter.user_id()),
            option_ids: Set(json!(option_ids)),
            created_at: Set(now.into()),
        };

        let ballot = self.vote_repo.create(model).await?;
        tracing::debug!(poll_id = %poll_id, vote_id = %ballot.id, "Ballot cast");

        Ok(ballot)
    }

    /// Whether the voter already has a ballot on the poll.
    pub async fn has_voted(&self, poll_id: &str, voter: &Voter) -> AppResult<bool> {
        let fingerprint = fingerprint(&self.salt, voter);
        Ok(self
            .vote_repo
            .find_by_fingerprint(poll_id, &fingerprint)
            .await?
            .is_some())
    }

    /// The voter's selections on each poll of an event they voted in.
    pub async fn ballots_in_event(
        &self,
        event_id: &str,
        voter: &Voter,
    ) -> AppResult<HashMap<String, Vec<String>>> {
        let poll_ids: Vec<String> = self
            .poll_repo
            .find_by_event(event_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();

        let fingerprint = fingerprint(&self.salt, voter);
        let ballots = self
            .vote_repo
            .find_by_fingerprint_in_polls(&poll_ids, &fingerprint)
            .await?;

        Ok(ballots
            .into_iter()
            .map(|b| {
                let selected = b.selected_options();
                (b.poll_id, selected)
            })
            .collect())
    }
}

fn validate_ballot(option_ids: &[String], valid: &HashSet<&str>, max_choices: i32) -> AppResult<()> {
    if option_ids.is_empty() {
        return Err(AppError::BadRequest("Select at least one option".to_string()));
    }

    let max = usize::try_from(max_choices).unwrap_or(1);
    if option_ids.len() > max {
        return Err(AppError::BadRequest(format!(
            "Select at most {max} option(s)"
        )));
    }

    let distinct: HashSet<&str> = option_ids.iter().map(String::as_str).collect();
    if distinct.len() != option_ids.len() {
        return Err(AppError::BadRequest("Options must be distinct".to_string()));
    }

    if !distinct.is_subset(valid) {
        return Err(AppError::BadRequest(
            "Option does not belong to this poll".to_string(),
        ));
    }

    Ok(())
}
