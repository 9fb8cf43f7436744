//! Database entities.

#![allow(missing_docs)]

pub mod billing_event;
pub mod event;
pub mod moderation_log;
pub mod notification;
pub mod participant;
pub mod poll;
pub mod poll_option;
pub mod report;
pub mod support_chat;
pub mod support_message;
pub mod user;
pub mod vote;

pub use billing_event::Entity as BillingEvent;
pub use event::Entity as Event;
pub use moderation_log::Entity as ModerationLog;
pub use notification::Entity as Notification;
pub use participant::Entity as Participant;
pub use poll::Entity as Poll;
pub use poll_option::Entity as PollOption;
pub use report::Entity as Report;
pub use support_chat::Entity as SupportChat;
pub use support_message::Entity as SupportMessage;
pub use user::Entity as User;
pub use vote::Entity as Vote;
