//! JWT issuance and validation.
//!
//! Tokens are minted locally with the same HS256 secret the server would
//! use, then checked through `validate_token`. No server or database is
//! needed.
//!
//! Run with: `cargo test --test auth_test`
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use smartyart_backend::auth::jwt::{Claims, issue_token, validate_token};
use smartyart_backend::models::users;

/// A fake secret for testing.
const TEST_SECRET: &str = "test-secret-at-least-256-bits-long-for-hs256-xxxxxxx";

fn test_user(is_admin: bool) -> users::Model {
    users::Model {
        id: Uuid::new_v4(),
        email: "alice@example.com".to_string(),
        full_name: "Alice Smith".to_string(),
        password_hash: String::new(),
        is_admin,
        reset_token: None,
        reset_token_expires_at: None,
        created_at: Utc::now(),
    }
}

fn mint(claims: &Claims, secret: &str) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode test JWT")
}

#[test]
fn test_issued_token_decodes_correctly() {
    let user = test_user(true);
    let token = issue_token(&user, TEST_SECRET).expect("Token should be issued");

    let claims = validate_token(&token, TEST_SECRET).expect("Token should be valid");

    assert_eq!(claims.user_id().unwrap(), user.id);
    assert_eq!(claims.email, "alice@example.com");
    assert!(claims.is_admin);
    assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
}

#[test]
fn test_expired_token_is_rejected() {
    let now = Utc::now().timestamp();
    // Expired 5 minutes ago, well past the 60s default leeway.
    let mut claims = Claims::for_user(&test_user(false), now - 3600);
    claims.exp = (now - 300) as usize;

    let result = validate_token(&mint(&claims, TEST_SECRET), TEST_SECRET);
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("ExpiredSignature"));
}

#[test]
fn test_wrong_secret_is_rejected() {
    let token = issue_token(&test_user(false), TEST_SECRET).unwrap();

    let result = validate_token(&token, "completely-wrong-secret-xxxxxxxxxxxxxxxxxxx");
    assert!(result.is_err());
    assert!(result.unwrap_err().contains("InvalidSignature"));
}

#[test]
fn test_garbage_token_is_rejected() {
    let result = validate_token("not.a.valid.jwt", TEST_SECRET);
    assert!(result.is_err());
}

#[test]
fn test_non_uuid_subject_is_reported() {
    let mut claims = Claims::for_user(&test_user(false), Utc::now().timestamp());
    claims.sub = "12345".to_string();

    let decoded = validate_token(&mint(&claims, TEST_SECRET), TEST_SECRET).unwrap();
    assert!(decoded.user_id().is_err());
}
