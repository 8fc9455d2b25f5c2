use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AUTH_TOKEN_TTL_SECS;
use crate::models::users;

/// Claims carried by the bearer tokens this server issues.
///
/// `is_admin` is informational only; the extractor reloads the user on
/// every request so an admin toggle takes effect immediately.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// The user's UUID.
    pub sub: String,
    pub email: String,
    pub is_admin: bool,
    /// Expiration (Unix timestamp).
    pub exp: usize,
    /// Issued-at (Unix timestamp).
    pub iat: usize,
}

impl Claims {
    pub fn for_user(user: &users::Model, issued_at: i64) -> Self {
        Self {
            sub: user.id.to_string(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            exp: (issued_at + AUTH_TOKEN_TTL_SECS) as usize,
            iat: issued_at as usize,
        }
    }

    /// Extract the user UUID from the `sub` claim.
    pub fn user_id(&self) -> Result<Uuid, String> {
        Uuid::parse_str(&self.sub).map_err(|e| format!("Invalid UUID in sub claim: {e}"))
    }
}

/// Sign an HS256 token for `user`, valid for seven days.
pub fn issue_token(user: &users::Model, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims::for_user(user, chrono::Utc::now().timestamp());
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate an HS256 token and return the decoded claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
