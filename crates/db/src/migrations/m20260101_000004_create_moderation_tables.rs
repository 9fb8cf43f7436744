//! Create report and moderation log tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Report::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Report::EventId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::ReporterId).string_len(32))
                    .col(ColumnDef::new(Report::Reason).text().not_null())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Report::ResolvedBy).string_len(32))
                    .col(ColumnDef::new(Report::ResolutionNote).text())
                    .col(
                        ColumnDef::new(Report::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Report::ResolvedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_report_event")
                            .from(Report::Table, Report::EventId)
                            .to(Event::Table, Event::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (status, created_at) for the admin queue
        manager
            .create_index(
                Index::create()
                    .name("idx_report_status_created_at")
                    .table(Report::Table)
                    .col(Report::Status)
                    .col(Report::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ModerationLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ModerationLog::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ModerationLog::ModeratorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationLog::Action).string_len(32).not_null())
                    .col(
                        ColumnDef::new(ModerationLog::TargetType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ModerationLog::TargetId).string_len(32).not_null())
                    .col(ColumnDef::new(ModerationLog::Reason).text())
                    .col(
                        ColumnDef::new(ModerationLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_moderation_log_target_id")
                    .table(ModerationLog::Table)
                    .col(ModerationLog::TargetId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ModerationLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    EventId,
    ReporterId,
    Reason,
    Status,
    ResolvedBy,
    ResolutionNote,
    CreatedAt,
    ResolvedAt,
}

#[derive(Iden)]
enum ModerationLog {
    Table,
    Id,
    ModeratorId,
    Action,
    TargetType,
    TargetId,
    Reason,
    CreatedAt,
}

#[derive(Iden)]
enum Event {
    Table,
    Id,
}
