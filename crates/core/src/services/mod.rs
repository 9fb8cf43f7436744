//! Business logic services.

#![allow(missing_docs)]

pub mod billing;
pub mod event;
pub mod gala;
pub mod moderation;
pub mod notification;
pub mod participant;
pub mod plan;
pub mod poll;
pub mod results;
pub mod support_chat;
pub mod tally;
pub mod user;
pub mod vote;

pub use billing::{BillingService, WebhookOutcome, sign_payload, verify_signature};
pub use event::{CreateEventInput, EventService, UpdateEventInput};
pub use gala::GalaGate;
pub use moderation::{ModerationService, ModerationStats, ensure_admin};
pub use notification::NotificationService;
pub use participant::{CreateParticipantInput, ParticipantService, UpdateParticipantInput};
pub use plan::{PlanInfo, PlanLimits, PlanTier, Resource, all_plans, effective_plan, parse_tier};
pub use poll::{CreatePollInput, PollService, PollWithOptions, UpdatePollInput};
pub use results::{EventResults, ResultsService};
pub use support_chat::{OpenedChat, SupportChatService};
pub use tally::{PollTally, tally};
pub use user::{SigninInput, SignupInput, UserService};
pub use vote::{VoteService, Voter, fingerprint};
