use actix_web::{HttpRequest, HttpResponse, web};

use crate::lifecycle::webhooks::{self, WebhookError};
use crate::state::AppContext;

/// POST /api/stripe-webhook — the body is taken as raw bytes so the
/// signature is checked against exactly what the provider sent.
pub async fn stripe_webhook(
    req: HttpRequest,
    ctx: web::Data<AppContext>,
    body: web::Bytes,
) -> Result<HttpResponse, WebhookError> {
    let signature = req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok());

    let ack = webhooks::ingest(&ctx, &body, signature).await?;
    Ok(HttpResponse::Ok().json(ack))
}
