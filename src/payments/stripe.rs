use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    BalanceInvoice, CheckoutSession, DepositCheckout, PaymentError, PaymentGateway, SentInvoice,
    WebhookEvent, signature,
};
use crate::config::WEBHOOK_TOLERANCE_SECS;

type FormParams = Vec<(&'static str, String)>;

/// Stripe REST client (form-encoded requests, bearer-key auth).
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
    webhook_secret: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

#[derive(Deserialize)]
struct IdOnly {
    id: String,
}

#[derive(Deserialize)]
struct CustomerList {
    data: Vec<IdOnly>,
}

#[derive(Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Deserialize)]
struct InvoiceResponse {
    id: String,
    hosted_invoice_url: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str, webhook_secret: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&'static str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{path}", self.api_base);
        debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        read_response(response).await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, PaymentError> {
        let url = format!("{}/{path}", self.api_base);
        debug!("GET {url}");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(query)
            .send()
            .await?;

        read_response(response).await
    }

    /// Reuse the provider customer for this email, creating one if needed.
    async fn customer_for(&self, email: &str) -> Result<String, PaymentError> {
        let existing: CustomerList = self
            .get(
                "customers",
                &[("email", email.to_string()), ("limit", "1".to_string())],
            )
            .await?;

        if let Some(customer) = existing.data.into_iter().next() {
            return Ok(customer.id);
        }

        let created: IdOnly = self
            .post_form("customers", &[("email", email.to_string())])
            .await?;
        Ok(created.id)
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| PaymentError::InvalidResponse(e.to_string()))
}

/// Form body for a one-line deposit checkout session.
pub fn checkout_form(request: &DepositCheckout) -> FormParams {
    vec![
        ("mode", "payment".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("line_items[0][quantity]", "1".to_string()),
        (
            "line_items[0][price_data][currency]",
            request.currency.clone(),
        ),
        (
            "line_items[0][price_data][unit_amount]",
            request.amount_minor.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            format!("Deposit for Booking #{}", request.booking_id),
        ),
        (
            "line_items[0][price_data][product_data][description]",
            format!("Deposit for {}", request.art_type),
        ),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("customer_email", request.customer_email.clone()),
        ("metadata[bookingId]", request.booking_id.to_string()),
        ("metadata[customerEmail]", request.customer_email.clone()),
    ]
}

/// Form body for a draft `send_invoice` invoice.
pub fn invoice_form(request: &BalanceInvoice, customer_id: &str) -> FormParams {
    vec![
        ("customer", customer_id.to_string()),
        ("collection_method", "send_invoice".to_string()),
        ("days_until_due", request.days_until_due.to_string()),
        ("currency", request.currency.clone()),
        (
            "description",
            format!("Remaining payment for Booking #{}", request.booking_id),
        ),
        ("metadata[bookingId]", request.booking_id.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        request: DepositCheckout,
    ) -> Result<CheckoutSession, PaymentError> {
        let session: SessionResponse = self
            .post_form("checkout/sessions", &checkout_form(&request))
            .await?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }

    async fn send_invoice(&self, request: BalanceInvoice) -> Result<SentInvoice, PaymentError> {
        let customer_id = self.customer_for(&request.customer_email).await?;

        let draft: IdOnly = self
            .post_form("invoices", &invoice_form(&request, &customer_id))
            .await?;

        let _: IdOnly = self
            .post_form(
                "invoiceitems",
                &[
                    ("customer", customer_id.clone()),
                    ("invoice", draft.id.clone()),
                    ("amount", request.amount_minor.to_string()),
                    ("currency", request.currency.clone()),
                    (
                        "description",
                        format!("Remaining balance for {}", request.art_type),
                    ),
                ],
            )
            .await?;

        let _: IdOnly = self
            .post_form(&format!("invoices/{}/finalize", draft.id), &[])
            .await?;
        let sent: InvoiceResponse = self
            .post_form(&format!("invoices/{}/send", draft.id), &[])
            .await?;

        Ok(SentInvoice {
            id: sent.id,
            hosted_invoice_url: sent.hosted_invoice_url,
        })
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let now = chrono::Utc::now().timestamp();
        signature::construct_event(
            payload,
            signature_header,
            &self.webhook_secret,
            WEBHOOK_TOLERANCE_SECS,
            now,
        )
        .map_err(PaymentError::from)
    }
}
