use chrono::{DateTime, Utc};
use sea_orm::*;
use uuid::Uuid;

use crate::models::users::{self, CreateUser};

/// Insert a new user. The email is expected to be normalized already.
pub async fn insert_user(db: &DatabaseConnection, input: CreateUser) -> Result<users::Model, DbErr> {
    let new_user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(input.email),
        full_name: Set(input.full_name),
        password_hash: Set(input.password_hash),
        is_admin: Set(input.is_admin),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: Set(Utc::now()),
    };

    new_user.insert(db).await
}

/// Fetch all users, newest first.
pub async fn get_all_users(db: &DatabaseConnection) -> Result<Vec<users::Model>, DbErr> {
    users::Entity::find()
        .order_by_desc(users::Column::CreatedAt)
        .all(db)
        .await
}

/// Fetch a single user by ID.
pub async fn get_user_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(id).one(db).await
}

/// Fetch a single user by (normalized) email.
pub async fn get_user_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(db)
        .await
}

/// Flip a user's admin flag. Returns `None` if the id does not exist.
pub async fn toggle_admin(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<users::Model>, DbErr> {
    let Some(user) = get_user_by_id(db, id).await? else {
        return Ok(None);
    };

    let is_admin = !user.is_admin;
    let mut active: users::ActiveModel = user.into();
    active.is_admin = Set(is_admin);

    active.update(db).await.map(Some)
}

/// Store a password-reset token and its expiry.
pub async fn set_reset_token(
    db: &DatabaseConnection,
    id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
) -> Result<users::Model, DbErr> {
    let user = users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut active: users::ActiveModel = user.into();
    active.reset_token = Set(Some(token));
    active.reset_token_expires_at = Set(Some(expires_at));

    active.update(db).await
}

/// Find the user holding an unexpired reset token for this email.
pub async fn find_by_reset_token(
    db: &DatabaseConnection,
    email: &str,
    token: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .filter(users::Column::ResetToken.eq(token))
        .filter(users::Column::ResetTokenExpiresAt.gt(Utc::now()))
        .one(db)
        .await
}

/// Replace the password hash and clear any pending reset token.
pub async fn update_password(
    db: &DatabaseConnection,
    id: Uuid,
    password_hash: String,
) -> Result<users::Model, DbErr> {
    let user = users::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound("User not found".to_string()))?;

    let mut active: users::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.reset_token = Set(None);
    active.reset_token_expires_at = Set(None);

    active.update(db).await
}
