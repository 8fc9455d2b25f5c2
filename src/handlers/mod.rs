pub mod admin;
pub mod auth;
pub mod bookings;
pub mod health;
pub mod webhooks;

use actix_web::web;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health::health));

    // ── Auth routes (public, except /verify) ──
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(auth::signup))
            .route("/login", web::post().to(auth::login))
            .route("/verify", web::get().to(auth::verify))
            .route("/forgot-password", web::post().to(auth::forgot_password))
            .route("/reset-password", web::post().to(auth::reset_password)),
    );

    // ── Customer booking routes (require valid JWT) ──
    cfg.service(
        web::resource("/bookings")
            .route(web::get().to(bookings::get_own_bookings))
            .route(web::post().to(bookings::create_booking)),
    );

    // ── Operator routes (require an admin JWT) ──
    cfg.service(
        web::scope("/admin")
            .route("/bookings", web::get().to(admin::get_bookings))
            .route("/bookings/{id}", web::patch().to(admin::update_status))
            .route("/bookings/{id}/total", web::patch().to(admin::set_total_amount))
            .route("/invoices/{id}", web::post().to(admin::send_invoice))
            .route("/users", web::get().to(admin::get_users))
            .route("/users/{id}/admin", web::patch().to(admin::toggle_admin)),
    );

    // ── Payment provider webhook (authenticated by signature) ──
    cfg.route("/stripe-webhook", web::post().to(webhooks::stripe_webhook));
}
