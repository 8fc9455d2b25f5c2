//! Verification of the provider's `Stripe-Signature` webhook header.
//!
//! The header looks like `t=1700000000,v1=<hex>,v1=<hex>`. Each `v1` value is
//! an HMAC-SHA256 over `"{t}.{raw body}"` keyed with the endpoint secret. The
//! body must be the bytes exactly as received; re-serialized JSON will not
//! verify.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::{WebhookEvent, WebhookEventKind};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("no signature matches the payload")]
    NoMatchingSignature,
    #[error("timestamp outside the tolerance window")]
    TimestampOutsideTolerance,
    #[error("invalid event payload: {0}")]
    InvalidPayload(String),
}

#[derive(Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// HMAC-SHA256 keyed with `secret`, fed `"{timestamp}.{payload}"`.
fn signed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::MalformedHeader)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex signature the provider would put in a `v1=` entry.
pub fn compute_signature(
    secret: &str,
    timestamp: i64,
    payload: &[u8],
) -> Result<String, SignatureError> {
    let mac = signed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify the header against `payload` and parse the event it signs.
///
/// `now` is the current unix time in seconds; deliveries signed more than
/// `tolerance_secs` ago are rejected.
pub fn construct_event(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<WebhookEvent, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|_| SignatureError::MalformedHeader)?)
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mac = signed_mac(secret, timestamp, payload)?;

    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::NoMatchingSignature);
    }

    if now - timestamp > tolerance_secs {
        return Err(SignatureError::TimestampOutsideTolerance);
    }

    parse_event(payload)
}

fn parse_event(payload: &[u8]) -> Result<WebhookEvent, SignatureError> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| SignatureError::InvalidPayload(e.to_string()))?;
    let object = raw.data.object;

    let object_id = object["id"].as_str().unwrap_or_default().to_string();
    let metadata = |key: &str| object["metadata"][key].as_str().map(str::to_string);

    let kind = match raw.event_type.as_str() {
        "checkout.session.completed" => WebhookEventKind::CheckoutSessionCompleted {
            session_id: object_id,
            booking_id: metadata("bookingId"),
            customer_email: metadata("customerEmail"),
        },
        "invoice.payment_succeeded" => WebhookEventKind::InvoicePaymentSucceeded {
            invoice_id: object_id,
            booking_id: metadata("bookingId"),
        },
        _ => WebhookEventKind::Other(raw.event_type),
    };

    Ok(WebhookEvent { id: raw.id, kind })
}
