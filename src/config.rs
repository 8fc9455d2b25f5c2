use std::env;
use std::path::PathBuf;

/// Maximum size of a single uploaded reference image.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Days a balance invoice stays open before it is due.
pub const INVOICE_DAYS_UNTIL_DUE: u32 = 7;

/// Lifetime of an issued bearer token.
pub const AUTH_TOKEN_TTL_SECS: i64 = 7 * 24 * 60 * 60;

/// Lifetime of a password-reset token.
pub const RESET_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Webhook timestamps older than this are rejected.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

const DEFAULT_PORT: &str = "4000";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is not valid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// SMTP settings; absent when `SMTP_HOST` is not set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
}

/// Process-wide settings, read once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub admin_email: String,
    pub frontend_url: String,
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub currency: String,
    pub upload_dir: PathBuf,
    pub smtp: Option<SmtpConfig>,
    pub email_from: String,
    pub studio_name: String,
    pub artist_name: String,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                | Required | Default                     |
    /// |-------------------------|----------|-----------------------------|
    /// | `DATABASE_URL`          | yes      | -                           |
    /// | `JWT_SECRET`            | yes      | -                           |
    /// | `ADMIN_EMAIL`           | yes      | -                           |
    /// | `STRIPE_SECRET_KEY`     | yes      | -                           |
    /// | `STRIPE_WEBHOOK_SECRET` | yes      | -                           |
    /// | `PORT`                  | no       | `4000`                      |
    /// | `FRONTEND_URL`          | no       | `http://localhost:5173`     |
    /// | `STRIPE_API_BASE`       | no       | `https://api.stripe.com/v1` |
    /// | `CURRENCY`              | no       | `usd`                       |
    /// | `UPLOAD_DIR`            | no       | `uploads`                   |
    /// | `SMTP_HOST`             | no       | - (emails are only logged)  |
    /// | `SMTP_PORT`             | no       | `465`                       |
    /// | `SMTP_USER`             | no       | -                           |
    /// | `SMTP_PASSWORD`         | no       | -                           |
    /// | `EMAIL_FROM`            | no       | `SMTP_USER`, else admin     |
    /// | `STUDIO_NAME`           | no       | `SmartyArt`                 |
    /// | `ARTIST_NAME`           | no       | `The Artist`                |
    pub fn from_env() -> Result<Self, ConfigError> {
        let port_raw = env::var("PORT").unwrap_or_else(|_| DEFAULT_PORT.to_string());
        let port = port_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port_raw.clone(),
        })?;

        let admin_email = required("ADMIN_EMAIL")?.to_lowercase();

        let smtp = match env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: env::var("SMTP_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(DEFAULT_SMTP_PORT),
                user: env::var("SMTP_USER").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
            }),
            Err(_) => None,
        };

        let email_from = env::var("EMAIL_FROM")
            .ok()
            .or_else(|| smtp.as_ref().and_then(|s| s.user.clone()))
            .unwrap_or_else(|| admin_email.clone());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            port,
            jwt_secret: required("JWT_SECRET")?,
            admin_email,
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            stripe_secret_key: required("STRIPE_SECRET_KEY")?,
            stripe_webhook_secret: required("STRIPE_WEBHOOK_SECRET")?,
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            currency: env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "uploads".to_string())
                .into(),
            smtp,
            email_from,
            studio_name: env::var("STUDIO_NAME").unwrap_or_else(|_| "SmartyArt".to_string()),
            artist_name: env::var("ARTIST_NAME").unwrap_or_else(|_| "The Artist".to_string()),
        })
    }

    /// Whether `email` is the operator's address (case-insensitive).
    pub fn is_admin_email(&self, email: &str) -> bool {
        email.eq_ignore_ascii_case(&self.admin_email)
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(name))
}
