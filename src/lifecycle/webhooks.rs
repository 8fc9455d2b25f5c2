//! Provider webhook ingestion.
//!
//! A delivery is verified against the raw request bytes, deduplicated by
//! event id in the `webhook_events` ledger, and then dispatched to the
//! matching lifecycle transition. A failed dispatch removes the ledger row
//! so the provider's retry is processed again.
//!
//! Only event kinds that are dispatched get a ledger row; everything else is
//! acknowledged without being stored.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use sea_orm::DbErr;
use serde::Serialize;
use uuid::Uuid;

use super::BookingError;
use crate::db::webhook_events;
use crate::payments::{PaymentError, WebhookEvent, WebhookEventKind};
use crate::state::AppContext;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,

    #[error("{0}")]
    Verification(PaymentError),

    #[error("Webhook processing failed: {0}")]
    Processing(#[from] BookingError),

    #[error("Database error: {0}")]
    Ledger(#[from] DbErr),
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingSignature | WebhookError::Verification(_) => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Processing(_) | WebhookError::Ledger(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": format!("Webhook Error: {self}"),
        }))
    }
}

/// Acknowledgement body returned to the provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl WebhookAck {
    fn received(warnings: Vec<String>) -> Self {
        Self {
            received: true,
            duplicate: false,
            warnings,
        }
    }
}

/// Verify, deduplicate and apply one webhook delivery.
pub async fn ingest(
    ctx: &AppContext,
    payload: &[u8],
    signature: Option<&str>,
) -> Result<WebhookAck, WebhookError> {
    let Some(signature) = signature else {
        tracing::warn!("Webhook delivery without a signature header");
        return Err(WebhookError::MissingSignature);
    };

    let event = ctx
        .payments
        .construct_event(payload, signature)
        .map_err(|e| {
            tracing::warn!(error = %e, "Webhook signature verification failed");
            WebhookError::Verification(e)
        })?;

    let event_type = event.kind.type_name().to_string();
    tracing::info!(event_id = %event.id, event_type = %event_type, "Webhook received");

    if let WebhookEventKind::Other(kind) = &event.kind {
        tracing::debug!(event_id = %event.id, event_type = %kind, "Unhandled webhook event type");
        return Ok(WebhookAck::received(Vec::new()));
    }

    if !webhook_events::record_event(&ctx.db, &event.id, &event_type).await? {
        tracing::info!(event_id = %event.id, "Duplicate webhook delivery ignored");
        return Ok(WebhookAck {
            received: true,
            duplicate: true,
            warnings: Vec::new(),
        });
    }

    match dispatch(ctx, &event).await {
        Ok(warnings) => Ok(WebhookAck::received(warnings)),
        // A redelivery would collide again; keep the ledger row and acknowledge.
        Err(e @ BookingError::PaymentReferenceInUse(_)) => {
            tracing::error!(event_id = %event.id, event_type = %event_type, error = %e, "Webhook event not applied");
            Ok(WebhookAck::received(vec![e.to_string()]))
        }
        Err(e) => {
            tracing::error!(event_id = %event.id, event_type = %event_type, error = %e, "Webhook processing failed");
            if let Err(ledger_err) = webhook_events::forget_event(&ctx.db, &event.id).await {
                tracing::error!(event_id = %event.id, error = %ledger_err, "Failed to release webhook event for retry");
            }
            Err(e.into())
        }
    }
}

async fn dispatch(ctx: &AppContext, event: &WebhookEvent) -> Result<Vec<String>, BookingError> {
    match &event.kind {
        WebhookEventKind::CheckoutSessionCompleted {
            session_id,
            booking_id,
            customer_email,
        } => {
            let Some(booking_id) = booking_reference(&event.id, booking_id.as_deref()) else {
                return Ok(Vec::new());
            };
            let outcome = super::confirm_deposit_payment(
                ctx,
                booking_id,
                session_id,
                customer_email.as_deref(),
            )
            .await?;
            Ok(outcome.warnings)
        }
        WebhookEventKind::InvoicePaymentSucceeded {
            invoice_id,
            booking_id,
        } => {
            let Some(booking_id) = booking_reference(&event.id, booking_id.as_deref()) else {
                return Ok(Vec::new());
            };
            let outcome = super::confirm_final_payment(ctx, booking_id, invoice_id).await?;
            Ok(outcome.warnings)
        }
        WebhookEventKind::Other(_) => Ok(Vec::new()),
    }
}

/// The `bookingId` metadata as a booking id; `None` (logged) when it is
/// missing or not a UUID, in which case the event is acknowledged untouched.
fn booking_reference(event_id: &str, raw: Option<&str>) -> Option<Uuid> {
    match raw {
        None => {
            tracing::error!(event_id, "Webhook event has no bookingId metadata");
            None
        }
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::error!(event_id, booking_id = raw, "Webhook event has an invalid bookingId");
                None
            }
        },
    }
}
