use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, web};
use dotenv::dotenv;
use migration::{Migrator, MigratorTrait};
use smartyart_backend::config::AppConfig;
use smartyart_backend::notify::smtp::SmtpNotifier;
use smartyart_backend::notify::{LogNotifier, Notifier};
use smartyart_backend::payments::stripe::StripeClient;
use smartyart_backend::uploads::{PUBLIC_PREFIX, UploadStore};
use smartyart_backend::{AppContext, create_pool, handlers};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = AppConfig::from_env().map_err(std::io::Error::other)?;

    let db = create_pool(&config.database_url)
        .await
        .map_err(std::io::Error::other)?;
    Migrator::up(&db, None).await.map_err(std::io::Error::other)?;
    tracing::info!("Database connected and migrated");

    let payments = Arc::new(StripeClient::new(
        &config.stripe_api_base,
        &config.stripe_secret_key,
        &config.stripe_webhook_secret,
    ));

    let notifier: Arc<dyn Notifier> = match &config.smtp {
        Some(smtp) => {
            let notifier = SmtpNotifier::new(smtp, &config.email_from).map_err(std::io::Error::other)?;
            tracing::info!(host = %smtp.host, port = smtp.port, from = %config.email_from, "SMTP configured");
            Arc::new(notifier)
        }
        None => {
            tracing::warn!("SMTP_HOST not set; emails will be logged, not sent");
            Arc::new(LogNotifier)
        }
    };

    let uploads = UploadStore::new(config.upload_dir.clone());
    std::fs::create_dir_all(uploads.dir())?;

    let bind_addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        frontend = %config.frontend_url,
        stripe_configured = !config.stripe_secret_key.is_empty(),
        webhook_secret_configured = !config.stripe_webhook_secret.is_empty(),
        "Server running at http://{bind_addr}"
    );

    let ctx = web::Data::new(AppContext {
        db,
        payments,
        notifier,
        uploads,
        config: Arc::new(config),
    });

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&ctx.config.frontend_url)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
            ])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .app_data(ctx.clone())
            .service(web::scope("/api").configure(handlers::init_routes))
            .service(Files::new(PUBLIC_PREFIX, ctx.uploads.dir()))
    })
    .bind(&bind_addr)?
    .run()
    .await
}
