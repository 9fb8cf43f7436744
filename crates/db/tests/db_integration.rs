//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `pollnow_test`)
//!   `TEST_DB_PASSWORD` (default: `pollnow_test`)

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::Utc;
use pollnow_common::AppError;
use pollnow_db::entities::{event, participant, poll, poll_option, user, vote};
use pollnow_db::repositories::{
    EventRepository, ParticipantRepository, PollRepository, UserRepository, VoteRepository,
};
use pollnow_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{Database, DatabaseConnection, Set};
use serde_json::json;

async fn seed_event(db: &Arc<DatabaseConnection>) -> (String, Vec<String>) {
    let now = Utc::now();
    let users = UserRepository::new(db.clone());
    let owner = users
        .create(user::ActiveModel {
            id: Set("owner1".to_string()),
            username: Set("owner".to_string()),
            username_lower: Set("owner".to_string()),
            email: Set(None),
            name: Set(None),
            password_hash: Set("x".to_string()),
            token: Set(None),
            is_admin: Set(false),
            is_banned: Set(false),
            plan: Set(user::Plan::Free),
            billing_customer_id: Set(None),
            subscription_id: Set(None),
            subscription_status: Set(user::SubscriptionStatus::None),
            plan_renews_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    let events = EventRepository::new(db.clone());
    let event = events
        .create(event::ActiveModel {
            id: Set("event1".to_string()),
            user_id: Set(owner.id),
            name: Set("Friends of the Year".to_string()),
            description: Set(None),
            status: Set(event::EventStatus::Approved),
            gala_date: Set(None),
            is_public: Set(true),
            moderation_note: Set(None),
            submitted_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        })
        .await
        .unwrap();

    let participants = ParticipantRepository::new(db.clone());
    let mut ids = Vec::new();
    for (i, name) in ["Ana", "Ben", "Cleo"].iter().enumerate() {
        let p = participants
            .create(participant::ActiveModel {
                id: Set(format!("p{i}")),
                event_id: Set(event.id.clone()),
                name: Set((*name).to_string()),
                description: Set(None),
                image_url: Set(None),
                position: Set(i32::try_from(i).unwrap()),
                created_at: Set(now.into()),
            })
            .await
            .unwrap();
        ids.push(p.id);
    }

    (event.id, ids)
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_reorder_participants() {
    let test_db = TestDatabase::create_unique().await.expect("Failed to connect");
    // `DatabaseConnection` is not `Clone` with sea-orm `mock` enabled (dev-dep),
    // so open a second connection to the same test database.
    let db = Arc::new(
        Database::connect(&test_db.config.database_url())
            .await
            .expect("Failed to connect"),
    );
    let (event_id, ids) = seed_event(&db).await;

    let repo = ParticipantRepository::new(db.clone());
    let reversed: Vec<String> = ids.iter().rev().cloned().collect();
    repo.reorder(&event_id, &reversed).await.unwrap();

    let ordered = repo.find_by_event(&event_id).await.unwrap();
    let names: Vec<&str> = ordered.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Cleo", "Ben", "Ana"]);

    test_db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_ballot_is_conflict() {
    let test_db = TestDatabase::create_unique().await.expect("Failed to connect");
    // `DatabaseConnection` is not `Clone` with sea-orm `mock` enabled (dev-dep),
    // so open a second connection to the same test database.
    let db = Arc::new(
        Database::connect(&test_db.config.database_url())
            .await
            .expect("Failed to connect"),
    );
    let (event_id, ids) = seed_event(&db).await;

    let polls = PollRepository::new(db.clone());
    let poll = polls
        .create_with_options(
            poll::ActiveModel {
                id: Set("poll1".to_string()),
                event_id: Set(event_id),
                title: Set("Best Cook".to_string()),
                description: Set(None),
                max_choices: Set(1),
                position: Set(0),
                created_at: Set(Utc::now().into()),
                updated_at: Set(None),
            },
            vec![poll_option::ActiveModel {
                id: Set("o1".to_string()),
                poll_id: Set("poll1".to_string()),
                participant_id: Set(ids[0].clone()),
                position: Set(0),
            }],
        )
        .await
        .unwrap();

    let votes = VoteRepository::new(db.clone());
    let ballot = |id: &str| vote::ActiveModel {
        id: Set(id.to_string()),
        poll_id: Set(poll.id.clone()),
        voter_fingerprint: Set("fp".to_string()),
        user_id: Set(None),
        option_ids: Set(json!(["o1"])),
        created_at: Set(Utc::now().into()),
    };

    votes.create(ballot("v1")).await.unwrap();
    let second = votes.create(ballot("v2")).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));
    assert_eq!(votes.count_by_poll("poll1").await.unwrap(), 1);

    test_db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}
