pub mod accounts;
pub mod auth;
pub mod config;
pub mod db;
pub mod handlers;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod payments;
pub mod state;
pub mod uploads;

pub use db::create_pool;
pub use state::AppContext;
