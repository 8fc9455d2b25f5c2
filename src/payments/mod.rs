//! Payment-provider seam.
//!
//! The booking lifecycle talks to the provider only through
//! [`PaymentGateway`]: creating the deposit checkout session, issuing the
//! balance invoice, and turning a signed webhook delivery into a typed
//! [`WebhookEvent`]. [`stripe::StripeClient`] is the production
//! implementation.

pub mod signature;
pub mod stripe;

use async_trait::async_trait;
use uuid::Uuid;

pub use signature::SignatureError;

/// Errors from the payment provider or from webhook verification.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The request never produced a provider response.
    #[error("Payment provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider rejected the request.
    #[error("Payment provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered with something we could not read.
    #[error("Unexpected payment provider response: {0}")]
    InvalidResponse(String),

    /// A webhook delivery failed signature verification.
    #[error("Webhook signature verification failed: {0}")]
    Signature(#[from] SignatureError),
}

/// A one-time checkout for a booking's deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositCheckout {
    pub booking_id: Uuid,
    pub customer_email: String,
    pub art_type: String,
    pub amount_minor: i64,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// An invoice for whatever is left to pay after the deposit.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceInvoice {
    pub booking_id: Uuid,
    pub customer_email: String,
    pub art_type: String,
    pub amount_minor: i64,
    pub currency: String,
    pub days_until_due: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentInvoice {
    pub id: String,
    pub hosted_invoice_url: Option<String>,
}

/// A verified provider event.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: WebhookEventKind,
}

/// Event kinds the booking lifecycle reacts to; everything else is `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookEventKind {
    CheckoutSessionCompleted {
        session_id: String,
        booking_id: Option<String>,
        customer_email: Option<String>,
    },
    InvoicePaymentSucceeded {
        invoice_id: String,
        booking_id: Option<String>,
    },
    Other(String),
}

impl WebhookEventKind {
    pub fn type_name(&self) -> &str {
        match self {
            WebhookEventKind::CheckoutSessionCompleted { .. } => "checkout.session.completed",
            WebhookEventKind::InvoicePaymentSucceeded { .. } => "invoice.payment_succeeded",
            WebhookEventKind::Other(name) => name,
        }
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout for the deposit. The session carries
    /// `bookingId` and `customerEmail` metadata so the completion webhook
    /// can be correlated back to the booking.
    async fn create_checkout_session(
        &self,
        request: DepositCheckout,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Create, finalize and send an invoice carrying `bookingId` metadata.
    async fn send_invoice(&self, request: BalanceInvoice) -> Result<SentInvoice, PaymentError>;

    /// Verify `signature_header` against the exact request bytes and parse the event.
    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError>;
}

/// Convert a currency amount to minor units (cents), rounding to the nearest unit.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
