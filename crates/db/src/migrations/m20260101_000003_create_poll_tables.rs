//! Create poll, poll option and vote tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Poll::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Poll::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Poll::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Poll::Description).text())
                    .col(ColumnDef::new(Poll::MaxChoices).integer().not_null().default(1))
                    .col(ColumnDef::new(Poll::Position).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Poll::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Poll::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_event")
                            .from(Poll::Table, Poll::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_event_id")
                    .table(Poll::Table)
                    .col(Poll::EventId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PollOption::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollOption::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollOption::PollId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(PollOption::ParticipantId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PollOption::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_option_poll")
                            .from(PollOption::Table, PollOption::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_option_participant")
                            .from(PollOption::Table, PollOption::ParticipantId)
                            .to(Participant::Table, Participant::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, participant_id) - a nominee appears once per poll
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_option_poll_participant")
                    .table(PollOption::Table)
                    .col(PollOption::PollId)
                    .col(PollOption::ParticipantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Vote::PollId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Vote::VoterFingerprint)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Vote::UserId).string_len(32))
                    .col(ColumnDef::new(Vote::OptionIds).json().not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_poll")
                            .from(Vote::Table, Vote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_user")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (poll_id, voter_fingerprint) - one ballot per voter per poll
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_poll_fingerprint")
                    .table(Vote::Table)
                    .col(Vote::PollId)
                    .col(Vote::VoterFingerprint)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PollOption::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    EventId,
    Title,
    Description,
    MaxChoices,
    Position,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PollOption {
    Table,
    Id,
    PollId,
    ParticipantId,
    Position,
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    PollId,
    VoterFingerprint,
    UserId,
    OptionIds,
    CreatedAt,
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
}

#[derive(Iden)]
enum Participant {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
