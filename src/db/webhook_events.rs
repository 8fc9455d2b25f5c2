use sea_orm::*;

use crate::models::webhook_events;

/// Record a provider event id. Returns `false` if it was already recorded.
pub async fn record_event(
    db: &DatabaseConnection,
    event_id: &str,
    event_type: &str,
) -> Result<bool, DbErr> {
    if webhook_events::Entity::find_by_id(event_id.to_string())
        .one(db)
        .await?
        .is_some()
    {
        return Ok(false);
    }

    let row = webhook_events::ActiveModel {
        id: Set(event_id.to_string()),
        event_type: Set(event_type.to_string()),
        received_at: Set(chrono::Utc::now()),
    };

    match webhook_events::Entity::insert(row).exec(db).await {
        Ok(_) => Ok(true),
        // Lost a race with a concurrent delivery of the same event.
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Drop a recorded event id so a redelivery will be processed again.
pub async fn forget_event(db: &DatabaseConnection, event_id: &str) -> Result<(), DbErr> {
    webhook_events::Entity::delete_by_id(event_id.to_string())
        .exec(db)
        .await?;
    Ok(())
}
