pub mod bookings;
pub mod users;
pub mod webhook_events;

use sea_orm::{Database, DatabaseConnection, DbErr};

/// Create a SeaORM database connection pool for the given URL.
pub async fn create_pool(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
