use actix_web::{HttpResponse, web};

use crate::accounts::{self, AccountError};
use crate::auth::middleware::AuthenticatedUser;
use crate::models::users::{ForgotPassword, Login, ResetPassword, Signup, UserResponse};
use crate::state::AppContext;

/// POST /api/auth/signup — create an account and return a session token.
pub async fn signup(
    ctx: web::Data<AppContext>,
    body: web::Json<Signup>,
) -> Result<HttpResponse, AccountError> {
    let outcome = accounts::signup(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(outcome))
}

/// POST /api/auth/login
pub async fn login(
    ctx: web::Data<AppContext>,
    body: web::Json<Login>,
) -> Result<HttpResponse, AccountError> {
    let session = accounts::login(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(session))
}

/// GET /api/auth/verify — return the currently authenticated user.
pub async fn verify(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "user": UserResponse::from(user.0),
    }))
}

/// POST /api/auth/forgot-password
pub async fn forgot_password(
    ctx: web::Data<AppContext>,
    body: web::Json<ForgotPassword>,
) -> Result<HttpResponse, AccountError> {
    let outcome = accounts::forgot_password(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    ctx: web::Data<AppContext>,
    body: web::Json<ResetPassword>,
) -> Result<HttpResponse, AccountError> {
    let outcome = accounts::reset_password(&ctx, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}
