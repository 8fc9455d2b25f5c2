use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `bookings` table and its columns.
#[derive(DeriveIden)]
enum Bookings {
    Table,
    Id,
    UserId,
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    ArtType,
    ArtSize,
    Deadline,
    ProjectDescription,
    ReferenceFiles,
    DepositAmount,
    TotalAmount,
    PaymentMethod,
    Status,
    DepositPaid,
    FullPaymentReceived,
    StripeSessionId,
    StripeInvoiceId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

/// Re-declare parent table identifiers for foreign-key references.
#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bookings::UserId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::CustomerName).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerEmail).string().not_null())
                    .col(ColumnDef::new(Bookings::CustomerPhone).string().null())
                    .col(ColumnDef::new(Bookings::ArtType).string().not_null())
                    .col(ColumnDef::new(Bookings::ArtSize).string().null())
                    .col(ColumnDef::new(Bookings::Deadline).string().null())
                    .col(ColumnDef::new(Bookings::ProjectDescription).text().not_null())
                    .col(ColumnDef::new(Bookings::ReferenceFiles).json().not_null())
                    .col(ColumnDef::new(Bookings::DepositAmount).double().not_null())
                    .col(ColumnDef::new(Bookings::TotalAmount).double().null())
                    .col(ColumnDef::new(Bookings::PaymentMethod).string().not_null())
                    .col(ColumnDef::new(Bookings::Status).string().not_null())
                    .col(
                        ColumnDef::new(Bookings::DepositPaid)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Bookings::FullPaymentReceived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    // One booking per checkout session once the provider correlates it.
                    .col(
                        ColumnDef::new(Bookings::StripeSessionId)
                            .string()
                            .null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Bookings::StripeInvoiceId).string().null())
                    .col(ColumnDef::new(Bookings::Notes).text().null())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_user_id")
                            .from(Bookings::Table, Bookings::UserId)
                            .to(Users::Table, Users::Id)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}
