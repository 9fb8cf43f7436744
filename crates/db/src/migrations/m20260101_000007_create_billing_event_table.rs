//! Create billing event table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BillingEvent::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BillingEvent::Id)
                            .string_len(255)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BillingEvent::Kind).string_len(128).not_null())
                    .col(ColumnDef::new(BillingEvent::UserId).string_len(32))
                    .col(
                        ColumnDef::new(BillingEvent::ReceivedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillingEvent::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum BillingEvent {
    Table,
    Id,
    Kind,
    UserId,
    ReceivedAt,
}
