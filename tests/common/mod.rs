//! Shared fixtures for the integration tests: an in-memory SQLite database
//! migrated with the real migrations, a payment gateway double that records
//! calls but verifies webhook signatures for real, and a notifier that
//! records emails and can be switched to fail.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use smartyart_backend::AppContext;
use smartyart_backend::auth::password::hash_password;
use smartyart_backend::config::{AppConfig, WEBHOOK_TOLERANCE_SECS};
use smartyart_backend::db::bookings as booking_db;
use smartyart_backend::db::users as user_db;
use smartyart_backend::lifecycle;
use smartyart_backend::models::bookings::{self, NewBooking, Status};
use smartyart_backend::models::users::{self, CreateUser};
use smartyart_backend::models::webhook_events;
use smartyart_backend::notify::{Email, Notifier, NotifyError};
use smartyart_backend::payments::signature::{self, compute_signature};
use smartyart_backend::payments::{
    BalanceInvoice, CheckoutSession, DepositCheckout, PaymentError, PaymentGateway, SentInvoice,
    WebhookEvent,
};
use smartyart_backend::uploads::UploadStore;

pub const JWT_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";
pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_EMAIL: &str = "artist@example.com";
pub const PASSWORD: &str = "password123";

// ── Payment gateway double ──

#[derive(Default)]
pub struct FakeGateway {
    pub checkouts: Mutex<Vec<DepositCheckout>>,
    pub invoices: Mutex<Vec<BalanceInvoice>>,
    pub fail_checkout: AtomicBool,
    pub fail_invoice: AtomicBool,
    counter: AtomicUsize,
}

impl FakeGateway {
    pub fn checkout_count(&self) -> usize {
        self.checkouts.lock().unwrap().len()
    }

    pub fn invoices(&self) -> Vec<BalanceInvoice> {
        self.invoices.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(
        &self,
        request: DepositCheckout,
    ) -> Result<CheckoutSession, PaymentError> {
        if self.fail_checkout.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 400,
                message: "checkout unavailable".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let session = CheckoutSession {
            id: format!("cs_test_{n}"),
            url: Some(format!("https://checkout.test/pay/cs_test_{n}")),
        };
        self.checkouts.lock().unwrap().push(request);
        Ok(session)
    }

    async fn send_invoice(&self, request: BalanceInvoice) -> Result<SentInvoice, PaymentError> {
        if self.fail_invoice.load(Ordering::SeqCst) {
            return Err(PaymentError::Api {
                status: 400,
                message: "invoice unavailable".to_string(),
            });
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.invoices.lock().unwrap().push(request);
        Ok(SentInvoice {
            id: format!("in_test_{n}"),
            hosted_invoice_url: Some(format!("https://invoice.test/in_test_{n}")),
        })
    }

    fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        Ok(signature::construct_event(
            payload,
            signature_header,
            WEBHOOK_SECRET,
            WEBHOOK_TOLERANCE_SECS,
            Utc::now().timestamp(),
        )?)
    }
}

// ── Notifier double ──

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Email>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, email: Email) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Build("mail server unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(email);
        Ok(())
    }
}

// ── Application fixture ──

pub struct TestApp {
    pub ctx: AppContext,
    pub gateway: Arc<FakeGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub upload_dir: tempfile::TempDir,
}

pub async fn test_db() -> DatabaseConnection {
    // A single connection keeps every query on the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await.expect("connect to sqlite");
    Migrator::up(&db, None).await.expect("run migrations");
    db
}

pub fn test_config(upload_dir: &std::path::Path) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        port: 0,
        jwt_secret: JWT_SECRET.to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        frontend_url: "http://frontend.test".to_string(),
        stripe_secret_key: "sk_test_fake".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        stripe_api_base: "http://stripe.invalid/v1".to_string(),
        currency: "usd".to_string(),
        upload_dir: upload_dir.to_path_buf(),
        smtp: None,
        email_from: ADMIN_EMAIL.to_string(),
        studio_name: "SmartyArt".to_string(),
        artist_name: "The Artist".to_string(),
    }
}

pub async fn setup() -> TestApp {
    let upload_dir = tempfile::tempdir().expect("create upload dir");
    let gateway = Arc::new(FakeGateway::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let ctx = AppContext {
        db: test_db().await,
        payments: gateway.clone(),
        notifier: notifier.clone(),
        uploads: UploadStore::new(upload_dir.path()),
        config: Arc::new(test_config(upload_dir.path())),
    };

    TestApp {
        ctx,
        gateway,
        notifier,
        upload_dir,
    }
}

pub async fn create_user(app: &TestApp, email: &str, is_admin: bool) -> users::Model {
    user_db::insert_user(
        &app.ctx.db,
        CreateUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: hash_password(PASSWORD).expect("hash password"),
            is_admin,
        },
    )
    .await
    .expect("insert user")
}

pub fn booking_details(payment_method: &str) -> NewBooking {
    NewBooking {
        customer_name: "Ada Lovelace".to_string(),
        customer_email: "ada@example.com".to_string(),
        customer_phone: None,
        project_description: "A watercolor portrait of my cat in a garden".to_string(),
        art_type: "portrait".to_string(),
        art_size: Some("A4".to_string()),
        deadline: None,
        payment_method: Some(payment_method.to_string()),
    }
}

/// Create a booking through the lifecycle and return the stored row.
pub async fn create_booking(app: &TestApp, owner: &users::Model, payment_method: &str) -> bookings::Model {
    let outcome = lifecycle::create_booking(&app.ctx, owner.id, booking_details(payment_method), Vec::new())
        .await
        .expect("create booking");
    get_booking(app, outcome.value.booking_id).await
}

pub async fn get_booking(app: &TestApp, id: Uuid) -> bookings::Model {
    booking_db::get_booking_by_id(&app.ctx.db, id)
        .await
        .expect("query booking")
        .expect("booking exists")
}

/// Put a booking straight into `status`, bypassing the lifecycle.
pub async fn force_status(app: &TestApp, id: Uuid, status: Status) -> bookings::Model {
    let booking = get_booking(app, id).await;
    let mut active: bookings::ActiveModel = booking.into();
    active.status = Set(status);
    active.update(&app.ctx.db).await.expect("force status")
}

pub async fn force_total(app: &TestApp, id: Uuid, total: f64) -> bookings::Model {
    booking_db::set_total_amount(&app.ctx.db, id, total)
        .await
        .expect("set total")
        .expect("booking exists")
}

/// Whether the webhook ledger holds a row for `event_id`.
pub async fn ledger_has(app: &TestApp, event_id: &str) -> bool {
    webhook_events::Entity::find_by_id(event_id.to_string())
        .one(&app.ctx.db)
        .await
        .expect("query ledger")
        .is_some()
}

// ── Webhook payloads ──

pub fn checkout_completed(event_id: &str, booking_id: Option<&str>, session_id: &str) -> Vec<u8> {
    let mut metadata = serde_json::json!({ "customerEmail": "ada@example.com" });
    if let Some(id) = booking_id {
        metadata["bookingId"] = serde_json::Value::String(id.to_string());
    }
    serde_json::json!({
        "id": event_id,
        "type": "checkout.session.completed",
        "data": { "object": { "id": session_id, "metadata": metadata } }
    })
    .to_string()
    .into_bytes()
}

pub fn invoice_paid(event_id: &str, booking_id: &str, invoice_id: &str) -> Vec<u8> {
    serde_json::json!({
        "id": event_id,
        "type": "invoice.payment_succeeded",
        "data": { "object": { "id": invoice_id, "metadata": { "bookingId": booking_id } } }
    })
    .to_string()
    .into_bytes()
}

pub fn sign(payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    format!(
        "t={timestamp},v1={}",
        compute_signature(WEBHOOK_SECRET, timestamp, payload).unwrap()
    )
}
