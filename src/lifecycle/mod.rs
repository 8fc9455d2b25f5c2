//! Booking lifecycle: the state machine behind a booking's `status`.
//!
//! ```text
//!  stripe ──► pending ──(checkout webhook)──┐
//!                                           ▼
//!  etransfer ► pending_deposit ─(operator)► deposit_paid ─► in_progress ─► completed
//!                                                                            │ invoice
//!                                                      payment_completed ◄───┘ (webhook)
//!  any status except cancelled ─(operator)─► cancelled
//! ```
//!
//! Every transition is a single conditional update ("only if the current
//! status is one of ...") followed by notifications. Notifications run after
//! the write has committed; their failures come back as warnings on the
//! [`Outcome`], never as an error.

pub mod webhooks;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::config::INVOICE_DAYS_UNTIL_DUE;
use crate::db::bookings::{self as booking_db, TransitionResult};
use crate::models::bookings::{
    self, BookingFilter, BookingListQuery, CreateBooking, DEPOSIT_AMOUNT, DEPOSIT_AMOUNT_MINOR,
    MAX_REFERENCE_FILES, NewBooking, PaymentMethod, Status, TransitionChanges, UpdateBookingStatus,
    UpdateTotalAmount,
};
use crate::models::validation_message;
use crate::notify::{deliver_all, templates};
use crate::payments::{BalanceInvoice, DepositCheckout, PaymentError, to_minor_units};
use crate::state::AppContext;

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    /// Malformed or out-of-range input; nothing was written.
    #[error("{0}")]
    Validation(String),

    #[error("Booking {0} not found")]
    NotFound(Uuid),

    /// The booking exists but is not in a state that allows the operation.
    #[error("{0}")]
    Precondition(String),

    /// The booking's status did not allow the transition at write time.
    #[error("Booking {id} is {current}; it cannot move to {requested}")]
    Conflict {
        id: Uuid,
        current: Status,
        requested: Status,
    },

    /// A provider session id is already recorded on a different booking.
    #[error("Payment reference {0} already belongs to another booking")]
    PaymentReferenceInUse(String),

    #[error(transparent)]
    Payment(#[from] PaymentError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ResponseError for BookingError {
    fn status_code(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) | BookingError::Precondition(_) => StatusCode::BAD_REQUEST,
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Conflict { .. } | BookingError::PaymentReferenceInUse(_) => {
                StatusCode::CONFLICT
            }
            BookingError::Payment(_) => StatusCode::BAD_GATEWAY,
            BookingError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let BookingError::Database(e) = self {
            tracing::error!(error = %e, "Database error in booking lifecycle");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

/// A committed result plus any non-fatal problems (failed notifications).
#[derive(Debug, Clone, Serialize)]
pub struct Outcome<T> {
    #[serde(flatten)]
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> Outcome<T> {
    pub fn new(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingCreated {
    pub message: String,
    pub booking_id: Uuid,
    pub status: Status,
    pub stripe_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUpdated {
    pub message: String,
    pub booking: bookings::Model,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceIssued {
    pub message: String,
    pub invoice_id: String,
    pub invoice_url: Option<String>,
    pub amount_due: f64,
}

fn applied(
    result: TransitionResult,
    id: Uuid,
    requested: Status,
) -> Result<bookings::Model, BookingError> {
    match result {
        TransitionResult::Applied(booking) => Ok(booking),
        TransitionResult::NotFound => Err(BookingError::NotFound(id)),
        TransitionResult::Conflict { current } => Err(BookingError::Conflict {
            id,
            current,
            requested,
        }),
    }
}

fn payment_write_error(err: DbErr, reference: &str) -> BookingError {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        BookingError::PaymentReferenceInUse(reference.to_string())
    } else {
        BookingError::Database(err)
    }
}

/// Create a booking for `owner_id` in its initial status and, for card
/// payments, open the deposit checkout.
///
/// `reference_files` are public paths already written by the upload store;
/// the caller owns cleaning them up if this returns an error.
pub async fn create_booking(
    ctx: &AppContext,
    owner_id: Uuid,
    details: NewBooking,
    reference_files: Vec<String>,
) -> Result<Outcome<BookingCreated>, BookingError> {
    details
        .validate()
        .map_err(|e| BookingError::Validation(validation_message(&e)))?;

    if reference_files.len() > MAX_REFERENCE_FILES {
        return Err(BookingError::Validation(format!(
            "At most {MAX_REFERENCE_FILES} reference files are allowed"
        )));
    }

    let payment_method = match details.payment_method.as_deref().map(str::trim) {
        None | Some("") => PaymentMethod::default(),
        Some(raw) => raw.parse().map_err(BookingError::Validation)?,
    };

    let booking = booking_db::insert_booking(
        &ctx.db,
        CreateBooking {
            user_id: owner_id,
            details,
            payment_method,
            reference_files,
        },
    )
    .await?;

    tracing::info!(
        booking_id = %booking.id,
        status = %booking.status,
        payment_method = ?payment_method,
        "Booking created"
    );

    let mut stripe_url = None;
    if payment_method == PaymentMethod::Stripe {
        let frontend = &ctx.config.frontend_url;
        let checkout = DepositCheckout {
            booking_id: booking.id,
            customer_email: booking.customer_email.clone(),
            art_type: booking.art_type.clone(),
            amount_minor: DEPOSIT_AMOUNT_MINOR,
            currency: ctx.config.currency.clone(),
            success_url: format!(
                "{frontend}/payment-success?session_id={{CHECKOUT_SESSION_ID}}&booking_id={}",
                booking.id
            ),
            cancel_url: format!("{frontend}/dashboard"),
        };

        match ctx.payments.create_checkout_session(checkout).await {
            Ok(session) => stripe_url = session.url,
            Err(e) => {
                tracing::error!(booking_id = %booking.id, error = %e, "Checkout session creation failed");
                // Do not leave a booking behind that can never be paid.
                if let Err(db_err) = booking_db::delete_booking(&ctx.db, booking.id).await {
                    tracing::error!(booking_id = %booking.id, error = %db_err, "Failed to remove unpaid booking");
                }
                return Err(e.into());
            }
        }
    }

    let brand = ctx.brand();
    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![
            templates::booking_created_customer(&brand, &booking, stripe_url.as_deref()),
            templates::booking_created_admin(&brand, &booking),
        ],
    )
    .await;

    Ok(Outcome::new(
        BookingCreated {
            message: "Booking created successfully".to_string(),
            booking_id: booking.id,
            status: booking.status,
            stripe_url,
        },
        warnings,
    ))
}

/// A customer's own bookings, most recent first.
pub async fn list_for_owner(
    ctx: &AppContext,
    owner_id: Uuid,
) -> Result<Vec<bookings::Model>, BookingError> {
    Ok(booking_db::get_bookings_by_user_id(&ctx.db, owner_id).await?)
}

/// All bookings, optionally filtered by status and/or owner, most recent first.
pub async fn list_all(
    ctx: &AppContext,
    query: BookingListQuery,
) -> Result<Vec<bookings::Model>, BookingError> {
    let status = match query.status.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Status>().map_err(BookingError::Validation)?),
    };

    Ok(booking_db::list_bookings(
        &ctx.db,
        BookingFilter {
            status,
            user_id: query.user_id,
        },
    )
    .await?)
}

/// Operator-driven status change.
///
/// Re-applying the current status is accepted and only refreshes notes and
/// `updated_at`; no email is sent for it.
pub async fn update_status(
    ctx: &AppContext,
    id: Uuid,
    request: UpdateBookingStatus,
) -> Result<Outcome<BookingUpdated>, BookingError> {
    let requested: Status = request
        .status
        .as_deref()
        .ok_or_else(|| BookingError::Validation("Invalid status".to_string()))?
        .parse()
        .map_err(BookingError::Validation)?;

    let notes = request.notes.filter(|n| !n.trim().is_empty());

    let current = booking_db::get_booking_by_id(&ctx.db, id)
        .await?
        .ok_or(BookingError::NotFound(id))?
        .status;

    if current == requested {
        let result = booking_db::transition_status(
            &ctx.db,
            id,
            &[requested],
            requested,
            TransitionChanges {
                notes,
                ..Default::default()
            },
        )
        .await?;
        let booking = applied(result, id, requested)?;

        return Ok(Outcome::new(
            BookingUpdated {
                message: "Booking status unchanged".to_string(),
                booking,
            },
            Vec::new(),
        ));
    }

    let sources = requested.operator_sources();
    if !sources.contains(&current) {
        return Err(BookingError::Conflict {
            id,
            current,
            requested,
        });
    }

    let changes = TransitionChanges {
        deposit_paid: requested.implies_deposit_paid(),
        full_payment_received: (requested == Status::PaymentCompleted).then_some(true),
        notes,
        ..Default::default()
    };
    let result = booking_db::transition_status(&ctx.db, id, sources, requested, changes).await?;
    let booking = applied(result, id, requested)?;

    tracing::info!(booking_id = %id, from = %current, to = %requested, "Booking status changed by operator");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::status_update(&ctx.brand(), &booking)],
    )
    .await;

    Ok(Outcome::new(
        BookingUpdated {
            message: "Booking status updated successfully".to_string(),
            booking,
        },
        warnings,
    ))
}

/// Record the agreed total. Never changes status.
pub async fn set_total_amount(
    ctx: &AppContext,
    id: Uuid,
    request: UpdateTotalAmount,
) -> Result<bookings::Model, BookingError> {
    let total = request
        .total_amount
        .filter(|amount| amount.is_finite() && *amount >= DEPOSIT_AMOUNT)
        .ok_or_else(|| {
            BookingError::Validation(format!("Total amount must be at least ${DEPOSIT_AMOUNT:.2}"))
        })?;

    let booking = booking_db::set_total_amount(&ctx.db, id, total)
        .await?
        .ok_or(BookingError::NotFound(id))?;

    tracing::info!(booking_id = %id, total_amount = total, "Booking total set");
    Ok(booking)
}

/// Invoice the customer for `total - deposit` on a completed booking.
pub async fn issue_invoice(
    ctx: &AppContext,
    id: Uuid,
) -> Result<Outcome<InvoiceIssued>, BookingError> {
    let booking = booking_db::get_booking_by_id(&ctx.db, id)
        .await?
        .ok_or(BookingError::NotFound(id))?;

    if booking.status != Status::Completed {
        return Err(BookingError::Precondition(
            "Invoice can only be sent for completed bookings".to_string(),
        ));
    }
    let (Some(total), Some(remaining)) = (booking.total_amount, booking.remaining_balance()) else {
        return Err(BookingError::Precondition(
            "Total amount not set for this booking".to_string(),
        ));
    };

    let invoice = ctx
        .payments
        .send_invoice(BalanceInvoice {
            booking_id: booking.id,
            customer_email: booking.customer_email.clone(),
            art_type: booking.art_type.clone(),
            amount_minor: to_minor_units(remaining),
            currency: ctx.config.currency.clone(),
            days_until_due: INVOICE_DAYS_UNTIL_DUE,
        })
        .await?;

    tracing::info!(booking_id = %id, invoice_id = %invoice.id, amount_due = remaining, "Balance invoice sent");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::invoice_sent(
            &ctx.brand(),
            &booking,
            total,
            remaining,
            invoice.hosted_invoice_url.as_deref(),
        )],
    )
    .await;

    Ok(Outcome::new(
        InvoiceIssued {
            message: "Invoice sent successfully".to_string(),
            invoice_id: invoice.id,
            invoice_url: invoice.hosted_invoice_url,
            amount_due: remaining,
        },
        warnings,
    ))
}

/// `pending` → `deposit_paid` once the provider reports the checkout paid.
pub async fn confirm_deposit_payment(
    ctx: &AppContext,
    id: Uuid,
    session_id: &str,
    customer_email: Option<&str>,
) -> Result<Outcome<bookings::Model>, BookingError> {
    let changes = TransitionChanges {
        deposit_paid: Some(true),
        stripe_session_id: Some(session_id.to_string()),
        ..Default::default()
    };
    let result = booking_db::transition_status(
        &ctx.db,
        id,
        &[Status::Pending],
        Status::DepositPaid,
        changes.clone(),
    )
    .await
    .map_err(|e| payment_write_error(e, session_id))?;

    let booking = match result {
        TransitionResult::Applied(booking) => booking,
        TransitionResult::NotFound => return Err(BookingError::NotFound(id)),
        TransitionResult::Conflict { current } => {
            return record_late_payment(
                ctx,
                LatePayment {
                    id,
                    current,
                    label: "deposit",
                    reference: session_id,
                    changes,
                },
                |booking| booking.stripe_session_id.as_deref() == Some(session_id),
            )
            .await;
        }
    };

    tracing::info!(booking_id = %id, session_id, from = %Status::Pending, to = %Status::DepositPaid, "Deposit payment confirmed");

    let brand = ctx.brand();
    let customer_email = customer_email.unwrap_or(&booking.customer_email);
    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![
            templates::deposit_confirmed_customer(&brand, &booking, customer_email),
            templates::deposit_confirmed_admin(&brand, &booking, customer_email, session_id),
        ],
    )
    .await;

    Ok(Outcome::new(booking, warnings))
}

/// `completed` → `payment_completed` once the provider reports the invoice paid.
pub async fn confirm_final_payment(
    ctx: &AppContext,
    id: Uuid,
    invoice_id: &str,
) -> Result<Outcome<bookings::Model>, BookingError> {
    let changes = TransitionChanges {
        deposit_paid: Some(true),
        full_payment_received: Some(true),
        stripe_invoice_id: Some(invoice_id.to_string()),
        ..Default::default()
    };
    let result = booking_db::transition_status(
        &ctx.db,
        id,
        &[Status::Completed],
        Status::PaymentCompleted,
        changes.clone(),
    )
    .await?;

    let booking = match result {
        TransitionResult::Applied(booking) => booking,
        TransitionResult::NotFound => return Err(BookingError::NotFound(id)),
        TransitionResult::Conflict { current } => {
            return record_late_payment(
                ctx,
                LatePayment {
                    id,
                    current,
                    label: "final payment",
                    reference: invoice_id,
                    changes,
                },
                |booking| {
                    booking.full_payment_received
                        && booking.stripe_invoice_id.as_deref() == Some(invoice_id)
                },
            )
            .await;
        }
    };

    tracing::info!(booking_id = %id, invoice_id, from = %Status::Completed, to = %Status::PaymentCompleted, "Final payment confirmed");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::final_payment_received(&ctx.brand(), &booking)],
    )
    .await;

    Ok(Outcome::new(booking, warnings))
}

/// A provider-confirmed payment for a booking that is no longer waiting on it.
struct LatePayment<'a> {
    id: Uuid,
    current: Status,
    label: &'a str,
    reference: &'a str,
    changes: TransitionChanges,
}

/// Record the money without moving the status and ask the operator to
/// reconcile. A payment that is already recorded is a no-op.
async fn record_late_payment(
    ctx: &AppContext,
    payment: LatePayment<'_>,
    already_recorded: impl Fn(&bookings::Model) -> bool,
) -> Result<Outcome<bookings::Model>, BookingError> {
    let LatePayment {
        id,
        current,
        label,
        reference,
        changes,
    } = payment;

    let existing = booking_db::get_booking_by_id(&ctx.db, id)
        .await?
        .ok_or(BookingError::NotFound(id))?;
    if already_recorded(&existing) {
        tracing::info!(booking_id = %id, reference, status = %current, "Payment already recorded on booking");
        return Ok(Outcome::new(existing, Vec::new()));
    }

    let booking = booking_db::record_payment(&ctx.db, id, changes)
        .await
        .map_err(|e| payment_write_error(e, reference))?
        .ok_or(BookingError::NotFound(id))?;

    tracing::warn!(booking_id = %id, reference, status = %current, "Provider confirmed a {label} for a booking that was not awaiting it");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::payment_needs_review(&ctx.brand(), &booking, label, reference)],
    )
    .await;

    Ok(Outcome::new(booking, warnings))
}
