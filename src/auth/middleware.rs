use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use std::future::Future;
use std::pin::Pin;

use crate::auth::jwt;
use crate::db::users as user_db;
use crate::models::users;
use crate::state::AppContext;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Access token required")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Admin access required")]
    Forbidden,
    #[error("{0}")]
    Internal(String),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingToken | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.to_string(),
        }))
    }
}

/// The user behind a valid `Authorization: Bearer` token, freshly loaded
/// from the database.
pub struct AuthenticatedUser(pub users::Model);

impl FromRequest for AuthenticatedUser {
    type Error = AuthError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            // 1. Extract the Bearer token.
            let bearer = BearerAuth::extract(&req)
                .await
                .map_err(|_| AuthError::MissingToken)?;

            // 2. Get the shared context.
            let ctx = req.app_data::<web::Data<AppContext>>().ok_or_else(|| {
                AuthError::Internal("Application context not configured".to_string())
            })?;

            // 3. Validate the JWT.
            let claims = jwt::validate_token(bearer.token(), &ctx.config.jwt_secret).map_err(|e| {
                tracing::debug!(error = %e, "Rejected bearer token");
                AuthError::InvalidToken
            })?;
            let user_id = claims.user_id().map_err(|_| AuthError::InvalidToken)?;

            // 4. Reload the user so admin changes apply immediately.
            let user = user_db::get_user_by_id(&ctx.db, user_id)
                .await
                .map_err(|e| AuthError::Internal(format!("Database error: {e}")))?
                .ok_or(AuthError::InvalidToken)?;

            Ok(AuthenticatedUser(user))
        })
    }
}

/// An [`AuthenticatedUser`] whose `is_admin` flag is set; otherwise 403.
pub struct AdminUser(pub users::Model);

impl FromRequest for AdminUser {
    type Error = AuthError;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = AuthenticatedUser::from_request(req, payload);

        Box::pin(async move {
            let AuthenticatedUser(user) = user.await?;
            if !user.is_admin {
                return Err(AuthError::Forbidden);
            }
            Ok(AdminUser(user))
        })
    }
}
