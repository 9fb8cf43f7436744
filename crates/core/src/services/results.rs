//! Event results behind the gala gate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use pollnow_common::{AppError, AppResult};
use pollnow_db::{
    entities::{event::EventStatus, participant, user, vote},
    repositories::{EventRepository, ParticipantRepository, VoteRepository},
};
use serde::Serialize;

use super::event::can_preview;
use super::gala::GalaGate;
use super::poll::{PollService, PollWithOptions};
use super::tally::{PollTally, tally};

/// One option with its participant resolved.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionResult {
    pub option_id: String,
    pub participant_id: String,
    pub participant_name: String,
    pub image_url: Option<String>,
    pub votes: u64,
    pub percentage: f64,
    pub is_winner: bool,
}

/// Results of one poll.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    pub poll_id: String,
    pub title: String,
    pub total_votes: u64,
    pub total_voters: u64,
    pub options: Vec<OptionResult>,
}

/// Results of every poll in an event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResults {
    pub event_id: String,
    pub gate: GalaGate,
    /// Set when the gate is still locked and the viewer sees a preview.
    pub is_preview: bool,
    pub polls: Vec<PollResult>,
}

/// Results service.
#[derive(Clone)]
pub struct ResultsService {
    event_repo: EventRepository,
    participant_repo: ParticipantRepository,
    vote_repo: VoteRepository,
    poll_service: PollService,
}

impl ResultsService {
    /// Create a new results service.
    #[must_use]
    pub const fn new(
        event_repo: EventRepository,
        participant_repo: ParticipantRepository,
        vote_repo: VoteRepository,
        poll_service: PollService,
    ) -> Self {
        Self {
            event_repo,
            participant_repo,
            vote_repo,
            poll_service,
        }
    }

    /// Tally every poll of an event for `viewer`.
    ///
    /// Before the gala date only the owner and admins get results.
    pub async fn event_results(
        &self,
        event_id: &str,
        viewer: Option<&user::Model>,
        now: DateTime<Utc>,
    ) -> AppResult<EventResults> {
        let event = self.event_repo.get_by_id(event_id).await?;
        let privileged = can_preview(&event, viewer);

        if event.status != EventStatus::Approved && !privileged {
            return Err(AppError::EventNotFound(event_id.to_string()));
        }

        let gate = GalaGate::evaluate(event.gala_date, now);
        if let GalaGate::Locked { reveal_at, .. } = gate {
            if !privileged {
                return Err(AppError::ResultsLocked(reveal_at.to_rfc3339()));
            }
        }

        let polls = self.poll_service.list_for_event(event_id).await?;
        let poll_ids: Vec<String> = polls.iter().map(|p| p.poll.id.clone()).collect();

        let mut votes_by_poll: HashMap<String, Vec<vote::Model>> = HashMap::new();
        for ballot in self.vote_repo.find_by_polls(&poll_ids).await? {
            votes_by_poll
                .entry(ballot.poll_id.clone())
                .or_default()
                .push(ballot);
        }

        let participants: HashMap<String, participant::Model> = self
            .participant_repo
            .find_by_event(event_id)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        let polls = polls
            .into_iter()
            .map(|p| {
                let votes = votes_by_poll.remove(&p.poll.id).unwrap_or_default();
                let tally = tally(&p.options, &votes);
                poll_result(p, &tally, &participants)
            })
            .collect();

        Ok(EventResults {
            event_id: event.id,
            gate,
            is_preview: !gate.is_open(),
            polls,
        })
    }
}

fn poll_result(
    poll: PollWithOptions,
    tally: &PollTally,
    participants: &HashMap<String, participant::Model>,
) -> PollResult {
    let options = tally
        .options
        .iter()
        .map(|o| {
            let participant = participants.get(&o.participant_id);
            OptionResult {
                option_id: o.option_id.clone(),
                participant_id: o.participant_id.clone(),
                participant_name: participant.map(|p| p.name.clone()).unwrap_or_default(),
                image_url: participant.and_then(|p| p.image_url.clone()),
                votes: o.votes,
                percentage: o.percentage,
                is_winner: tally.winners.contains(&o.option_id),
            }
        })
        .collect();

    PollResult {
        poll_id: poll.poll.id,
        title: poll.poll.title,
        total_votes: tally.total_votes,
        total_voters: tally.total_voters,
        options,
    }
}
