//! Create support chat tables migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SupportChat::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportChat::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SupportChat::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(SupportChat::Subject).string_len(256).not_null())
                    .col(
                        ColumnDef::new(SupportChat::Status)
                            .string_len(16)
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(SupportChat::LastMessageAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupportChat::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_support_chat_user")
                            .from(SupportChat::Table, SupportChat::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_support_chat_status_last_message_at")
                    .table(SupportChat::Table)
                    .col(SupportChat::Status)
                    .col(SupportChat::LastMessageAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SupportMessage::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SupportMessage::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SupportMessage::ChatId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(SupportMessage::SenderId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SupportMessage::IsStaff)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SupportMessage::Body).text().not_null())
                    .col(
                        ColumnDef::new(SupportMessage::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_support_message_chat")
                            .from(SupportMessage::Table, SupportMessage::ChatId)
                            .to(SupportChat::Table, SupportChat::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (chat_id, id) for polling newer messages
        manager
            .create_index(
                Index::create()
                    .name("idx_support_message_chat_id_id")
                    .table(SupportMessage::Table)
                    .col(SupportMessage::ChatId)
                    .col(SupportMessage::Id)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SupportMessage::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SupportChat::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SupportChat {
    Table,
    Id,
    UserId,
    Subject,
    Status,
    LastMessageAt,
    CreatedAt,
}

#[derive(Iden)]
enum SupportMessage {
    Table,
    Id,
    ChatId,
    SenderId,
    IsStaff,
    Body,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
