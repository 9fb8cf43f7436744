//! Create event and participant tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Event::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Event::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Event::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Event::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Event::Description).text())
                    .col(
                        ColumnDef::new(Event::Status)
                            .string_len(16)
                            .not_null()
                            .default("DRAFT"),
                    )
                    .col(ColumnDef::new(Event::GalaDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Event::IsPublic).boolean().not_null().default(true))
                    .col(ColumnDef::new(Event::ModerationNote).text())
                    .col(ColumnDef::new(Event::SubmittedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Event::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Event::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_event_user")
                            .from(Event::Table, Event::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: user_id (owner listing, quota counts)
        manager
            .create_index(
                Index::create()
                    .name("idx_event_user_id")
                    .table(Event::Table)
                    .col(Event::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: status (moderation queue, public directory)
        manager
            .create_index(
                Index::create()
                    .name("idx_event_status")
                    .table(Event::Table)
                    .col(Event::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Participant::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participant::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Participant::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Participant::Name).string_len(256).not_null())
                    .col(ColumnDef::new(Participant::Description).text())
                    .col(ColumnDef::new(Participant::ImageUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Participant::Position)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Participant::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participant_event")
                            .from(Participant::Table, Participant::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_participant_event_id")
                    .table(Participant::Table)
                    .col(Participant::EventId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Participant::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Event::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
    UserId,
    Name,
    Description,
    Status,
    GalaDate,
    IsPublic,
    ModerationNote,
    SubmittedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Participant {
    Table,
    Id,
    EventId,
    Name,
    Description,
    ImageUrl,
    Position,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
