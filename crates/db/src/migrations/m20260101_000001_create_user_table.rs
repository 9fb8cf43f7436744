//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(User::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(User::Username).string_len(128).not_null())
                    .col(ColumnDef::new(User::UsernameLower).string_len(128).not_null())
                    .col(ColumnDef::new(User::Email).string_len(320))
                    .col(ColumnDef::new(User::Name).string_len(256))
                    .col(ColumnDef::new(User::PasswordHash).string_len(256).not_null())
                    .col(ColumnDef::new(User::Token).string_len(64))
                    .col(ColumnDef::new(User::IsAdmin).boolean().not_null().default(false))
                    .col(ColumnDef::new(User::IsBanned).boolean().not_null().default(false))
                    .col(
                        ColumnDef::new(User::Plan)
                            .string_len(16)
                            .not_null()
                            .default("free"),
                    )
                    .col(ColumnDef::new(User::BillingCustomerId).string_len(128))
                    .col(ColumnDef::new(User::SubscriptionId).string_len(128))
                    .col(
                        ColumnDef::new(User::SubscriptionStatus)
                            .string_len(16)
                            .not_null()
                            .default("none"),
                    )
                    .col(ColumnDef::new(User::PlanRenewsAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Unique index: username_lower
        manager
            .create_index(
                Index::create()
                    .name("idx_user_username_lower")
                    .table(User::Table)
                    .col(User::UsernameLower)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: token
        manager
            .create_index(
                Index::create()
                    .name("idx_user_token")
                    .table(User::Table)
                    .col(User::Token)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: billing customer (webhook lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_billing_customer_id")
                    .table(User::Table)
                    .col(User::BillingCustomerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Username,
    UsernameLower,
    Email,
    Name,
    PasswordHash,
    Token,
    IsAdmin,
    IsBanned,
    Plan,
    BillingCustomerId,
    SubscriptionId,
    SubscriptionStatus,
    PlanRenewsAt,
    CreatedAt,
    UpdatedAt,
}
