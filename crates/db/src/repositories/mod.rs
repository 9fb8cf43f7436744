//! Repository layer: one repository per aggregate.

mod billing_event;
mod event;
mod moderation_log;
mod notification;
mod participant;
mod poll;
mod report;
mod support_chat;
mod user;
mod vote;

pub use billing_event::BillingEventRepository;
pub use event::EventRepository;
pub use moderation_log::ModerationLogRepository;
pub use notification::NotificationRepository;
pub use participant::ParticipantRepository;
pub use poll::PollRepository;
pub use report::ReportRepository;
pub use support_chat::SupportChatRepository;
pub use user::UserRepository;
pub use vote::VoteRepository;
