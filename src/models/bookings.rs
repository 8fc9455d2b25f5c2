use std::fmt;
use std::str::FromStr;

use sea_orm::{FromJsonQueryResult, Iterable};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Fixed upfront payment that confirms a booking.
pub const DEPOSIT_AMOUNT: f64 = 20.00;

/// The deposit in the provider's minor currency unit.
pub const DEPOSIT_AMOUNT_MINOR: i64 = 2000;

/// Maximum number of reference images attached to a booking.
pub const MAX_REFERENCE_FILES: usize = 5;

/// Booking lifecycle status, stored as a lowercase string in the database.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "pending_deposit")]
    PendingDeposit,
    #[sea_orm(string_value = "deposit_paid")]
    DepositPaid,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "payment_completed")]
    PaymentCompleted,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::PendingDeposit => "pending_deposit",
            Status::DepositPaid => "deposit_paid",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
            Status::Cancelled => "cancelled",
            Status::PaymentCompleted => "payment_completed",
        }
    }

    /// Status a new booking starts in, chosen by how the deposit will be paid.
    pub fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Stripe => Status::Pending,
            PaymentMethod::Etransfer => Status::PendingDeposit,
        }
    }

    /// Statuses an operator may move a booking out of to reach `self`.
    ///
    /// Re-applying the current status is always accepted and handled by the
    /// caller, so `self` never needs to appear here.
    pub fn operator_sources(self) -> &'static [Status] {
        match self {
            Status::Pending | Status::PendingDeposit => &[],
            Status::DepositPaid => &[Status::Pending, Status::PendingDeposit],
            Status::InProgress => &[Status::Pending, Status::PendingDeposit, Status::DepositPaid],
            Status::Completed => &[Status::InProgress],
            Status::Cancelled => &[
                Status::Pending,
                Status::PendingDeposit,
                Status::DepositPaid,
                Status::InProgress,
                Status::Completed,
                Status::PaymentCompleted,
            ],
            Status::PaymentCompleted => &[Status::Completed],
        }
    }

    /// Whether a booking in this status has progressed past the deposit stage.
    /// `None` for `Cancelled`, which keeps whatever the booking had before.
    pub fn implies_deposit_paid(self) -> Option<bool> {
        match self {
            Status::Pending | Status::PendingDeposit => Some(false),
            Status::DepositPaid
            | Status::InProgress
            | Status::Completed
            | Status::PaymentCompleted => Some(true),
            Status::Cancelled => None,
        }
    }

    /// Human-readable label used in customer emails, e.g. `DEPOSIT PAID`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ").to_uppercase()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Status::iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid status: {s}"))
    }
}

/// How the customer pays the deposit.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    #[sea_orm(string_value = "stripe")]
    Stripe,
    #[sea_orm(string_value = "etransfer")]
    Etransfer,
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(PaymentMethod::Stripe),
            "etransfer" => Ok(PaymentMethod::Etransfer),
            other => Err(format!(
                "paymentMethod must be one of stripe, etransfer (got {other})"
            )),
        }
    }
}

/// Public paths of uploaded reference images, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct ReferenceFiles(pub Vec<String>);

/// SeaORM entity for the `bookings` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub art_type: String,
    pub art_size: Option<String>,
    pub deadline: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub project_description: String,
    #[sea_orm(column_type = "Json")]
    pub reference_files: ReferenceFiles,
    #[sea_orm(column_type = "Double")]
    pub deposit_amount: f64,
    #[sea_orm(column_type = "Double", nullable)]
    pub total_amount: Option<f64>,
    pub payment_method: PaymentMethod,
    pub status: Status,
    pub deposit_paid: bool,
    pub full_payment_received: bool,
    #[sea_orm(unique)]
    pub stripe_session_id: Option<String>,
    pub stripe_invoice_id: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Balance left after the deposit, computed fresh from the current total.
    pub fn remaining_balance(&self) -> Option<f64> {
        self.total_amount.map(|total| total - self.deposit_amount)
    }

    /// First 100 characters of the project description, for email summaries.
    pub fn description_excerpt(&self) -> String {
        self.project_description.chars().take(100).collect()
    }
}

// ── DTOs ──

/// Customer-submitted booking details (the text fields of the booking form).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    #[validate(length(min = 2, max = 100, message = "Customer name must be 2-100 characters"))]
    pub customer_name: String,
    #[validate(email(message = "A valid customer email is required"))]
    pub customer_email: String,
    pub customer_phone: Option<String>,
    #[validate(length(
        min = 10,
        max = 1000,
        message = "Project description must be 10-1000 characters"
    ))]
    pub project_description: String,
    #[validate(length(min = 1, message = "Art type is required"))]
    pub art_type: String,
    pub art_size: Option<String>,
    pub deadline: Option<String>,
    pub payment_method: Option<String>,
}

/// Fields written when a booking is inserted.
#[derive(Debug, Clone)]
pub struct CreateBooking {
    pub user_id: Uuid,
    pub details: NewBooking,
    pub payment_method: PaymentMethod,
    pub reference_files: Vec<String>,
}

/// Query string for `GET /api/admin/bookings`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingListQuery {
    pub status: Option<String>,
    pub user_id: Option<Uuid>,
}

/// Parsed listing filter; every present field must match.
#[derive(Debug, Clone, Copy, Default)]
pub struct BookingFilter {
    pub status: Option<Status>,
    pub user_id: Option<Uuid>,
}

/// Body of `PATCH /api/admin/bookings/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingStatus {
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Body of `PATCH /api/admin/bookings/{id}/total`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTotalAmount {
    pub total_amount: Option<f64>,
}

/// Field changes applied together with a status transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionChanges {
    pub deposit_paid: Option<bool>,
    pub full_payment_received: Option<bool>,
    pub stripe_session_id: Option<String>,
    pub stripe_invoice_id: Option<String>,
    pub notes: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_status_follows_payment_method() {
        assert_eq!(Status::initial_for(PaymentMethod::Stripe), Status::Pending);
        assert_eq!(
            Status::initial_for(PaymentMethod::Etransfer),
            Status::PendingDeposit
        );
    }

    #[test]
    fn status_parses_only_the_closed_set() {
        for status in Status::iter() {
            assert_eq!(status.as_str().parse::<Status>(), Ok(status));
        }
        assert!("shipped".parse::<Status>().is_err());
        assert!("DEPOSIT_PAID".parse::<Status>().is_err());
        assert!("".parse::<Status>().is_err());
    }

    #[test]
    fn cancellation_is_reachable_from_everything_but_itself() {
        let sources = Status::Cancelled.operator_sources();
        assert!(!sources.contains(&Status::Cancelled));
        assert_eq!(sources.len(), 6);
    }

    #[test]
    fn completion_requires_work_in_progress() {
        assert_eq!(Status::Completed.operator_sources(), &[Status::InProgress]);
        assert!(Status::Pending.operator_sources().is_empty());
    }

    #[test]
    fn labels_replace_every_underscore() {
        assert_eq!(Status::PaymentCompleted.label(), "PAYMENT COMPLETED");
        assert_eq!(Status::Pending.label(), "PENDING");
    }

    #[test]
    fn payment_method_defaults_to_stripe() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Stripe);
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }
}
