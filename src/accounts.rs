//! Customer accounts: signup, login, password reset and the operator's
//! user administration.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{Duration, Utc};
use rand::RngCore;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{jwt, password};
use crate::config::RESET_TOKEN_TTL_SECS;
use crate::db::users as user_db;
use crate::lifecycle::Outcome;
use crate::models::users::{
    self, CreateUser, ForgotPassword, Login, ResetPassword, Signup, UserResponse,
};
use crate::models::validation_message;
use crate::notify::{deliver_all, templates};
use crate::state::AppContext;

/// Answer to a forgot-password request, identical whether or not the
/// account exists.
pub const RESET_REQUESTED_MESSAGE: &str = "If that email is registered, a reset link has been sent";

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    AlreadyExists,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid or expired reset token")]
    InvalidResetToken,
    #[error("User not found")]
    NotFound,
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Token signing failed: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid reset link: {0}")]
    Link(String),
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl From<argon2::password_hash::Error> for AccountError {
    fn from(e: argon2::password_hash::Error) -> Self {
        AccountError::Hash(e.to_string())
    }
}

impl ResponseError for AccountError {
    fn status_code(&self) -> StatusCode {
        match self {
            AccountError::Validation(_)
            | AccountError::AlreadyExists
            | AccountError::InvalidCredentials
            | AccountError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AccountError::NotFound => StatusCode::NOT_FOUND,
            AccountError::Hash(_)
            | AccountError::Token(_)
            | AccountError::Link(_)
            | AccountError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(error = %self, "Account operation failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

/// A signed token plus the user it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminToggled {
    pub message: String,
    pub is_admin: bool,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn session_for(ctx: &AppContext, user: users::Model) -> Result<Session, AccountError> {
    let token = jwt::issue_token(&user, &ctx.config.jwt_secret)?;
    Ok(Session {
        token,
        user: UserResponse::from(user),
    })
}

/// 32 random bytes, hex encoded.
fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub async fn signup(ctx: &AppContext, input: Signup) -> Result<Outcome<Session>, AccountError> {
    input
        .validate()
        .map_err(|e| AccountError::Validation(validation_message(&e)))?;

    let email = normalize_email(&input.email);
    if user_db::get_user_by_email(&ctx.db, &email).await?.is_some() {
        return Err(AccountError::AlreadyExists);
    }

    let full_name = input
        .full_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

    let user = user_db::insert_user(
        &ctx.db,
        CreateUser {
            is_admin: ctx.config.is_admin_email(&email),
            email,
            full_name,
            password_hash: password::hash_password(&input.password)?,
        },
    )
    .await
    .map_err(|e| match e.sql_err() {
        // A concurrent signup took the email after the lookup above.
        Some(SqlErr::UniqueConstraintViolation(_)) => AccountError::AlreadyExists,
        _ => AccountError::Database(e),
    })?;

    tracing::info!(user_id = %user.id, is_admin = user.is_admin, "User signed up");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::welcome(&ctx.brand(), &user.email, &user.full_name)],
    )
    .await;

    Ok(Outcome::new(session_for(ctx, user)?, warnings))
}

pub async fn login(ctx: &AppContext, input: Login) -> Result<Session, AccountError> {
    input
        .validate()
        .map_err(|e| AccountError::Validation(validation_message(&e)))?;

    let user = user_db::get_user_by_email(&ctx.db, &normalize_email(&input.email))
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    if !password::verify_password(&input.password, &user.password_hash)? {
        return Err(AccountError::InvalidCredentials);
    }

    session_for(ctx, user)
}

/// Store a one-hour reset token and email the link. Unknown addresses get
/// the same answer and no email.
pub async fn forgot_password(
    ctx: &AppContext,
    input: ForgotPassword,
) -> Result<Outcome<Message>, AccountError> {
    let email = input
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AccountError::Validation("Email required".to_string()))?;

    let Some(user) = user_db::get_user_by_email(&ctx.db, &email).await? else {
        tracing::info!("Password reset requested for an unknown email");
        return Ok(Outcome::new(Message::new(RESET_REQUESTED_MESSAGE), Vec::new()));
    };

    let token = generate_reset_token();
    let expires_at = Utc::now() + Duration::seconds(RESET_TOKEN_TTL_SECS);
    user_db::set_reset_token(&ctx.db, user.id, token.clone(), expires_at).await?;

    let link = reqwest::Url::parse_with_params(
        &format!("{}/reset-password", ctx.config.frontend_url),
        &[("token", token.as_str()), ("email", email.as_str())],
    )
    .map_err(|e| AccountError::Link(e.to_string()))?;

    tracing::info!(user_id = %user.id, "Password reset token issued");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::password_reset(&ctx.brand(), &user.email, link.as_str())],
    )
    .await;

    Ok(Outcome::new(Message::new(RESET_REQUESTED_MESSAGE), warnings))
}

pub async fn reset_password(
    ctx: &AppContext,
    input: ResetPassword,
) -> Result<Outcome<Message>, AccountError> {
    let (Some(token), Some(new_password), Some(email)) =
        (input.token, input.new_password, input.email)
    else {
        return Err(AccountError::Validation(
            "Token, password, and email required".to_string(),
        ));
    };

    if new_password.chars().count() < 6 {
        return Err(AccountError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    let user = user_db::find_by_reset_token(&ctx.db, &normalize_email(&email), &token)
        .await?
        .ok_or(AccountError::InvalidResetToken)?;

    let user =
        user_db::update_password(&ctx.db, user.id, password::hash_password(&new_password)?).await?;

    tracing::info!(user_id = %user.id, "Password reset completed");

    let warnings = deliver_all(
        ctx.notifier.as_ref(),
        vec![templates::password_reset_done(&ctx.brand(), &user.email)],
    )
    .await;

    Ok(Outcome::new(Message::new("Password reset successful"), warnings))
}

pub async fn list_users(ctx: &AppContext) -> Result<Vec<UserResponse>, AccountError> {
    Ok(user_db::get_all_users(&ctx.db)
        .await?
        .into_iter()
        .map(UserResponse::from)
        .collect())
}

pub async fn toggle_admin(ctx: &AppContext, id: Uuid) -> Result<AdminToggled, AccountError> {
    let user = user_db::toggle_admin(&ctx.db, id)
        .await?
        .ok_or(AccountError::NotFound)?;

    tracing::info!(user_id = %id, is_admin = user.is_admin, "User admin flag toggled");

    Ok(AdminToggled {
        message: "User admin status updated".to_string(),
        is_admin: user.is_admin,
    })
}
