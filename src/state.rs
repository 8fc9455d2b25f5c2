use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::notify::Notifier;
use crate::notify::templates::Brand;
use crate::payments::PaymentGateway;
use crate::uploads::UploadStore;

/// Everything a request handler needs, built once in `main` and shared
/// read-only across workers.
#[derive(Clone)]
pub struct AppContext {
    pub db: DatabaseConnection,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub uploads: UploadStore,
    pub config: Arc<AppConfig>,
}

impl AppContext {
    pub fn brand(&self) -> Brand {
        Brand::from(self.config.as_ref())
    }
}
