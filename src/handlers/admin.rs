use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::accounts::{self, AccountError};
use crate::auth::middleware::AdminUser;
use crate::lifecycle::{self, BookingError};
use crate::models::bookings::{BookingListQuery, UpdateBookingStatus, UpdateTotalAmount};
use crate::state::AppContext;

/// GET /api/admin/bookings?status=&userId= — every booking, newest first.
pub async fn get_bookings(
    _admin: AdminUser,
    ctx: web::Data<AppContext>,
    query: web::Query<BookingListQuery>,
) -> Result<HttpResponse, BookingError> {
    let bookings = lifecycle::list_all(&ctx, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// PATCH /api/admin/bookings/{id} — move a booking to a new status.
pub async fn update_status(
    admin: AdminUser,
    ctx: web::Data<AppContext>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBookingStatus>,
) -> Result<HttpResponse, BookingError> {
    let id = path.into_inner();
    tracing::debug!(booking_id = %id, admin_id = %admin.0.id, "Status update requested");
    let outcome = lifecycle::update_status(&ctx, id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// PATCH /api/admin/bookings/{id}/total — record the agreed total.
pub async fn set_total_amount(
    _admin: AdminUser,
    ctx: web::Data<AppContext>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateTotalAmount>,
) -> Result<HttpResponse, BookingError> {
    let booking = lifecycle::set_total_amount(&ctx, path.into_inner(), body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Total amount updated",
        "totalAmount": booking.total_amount,
    })))
}

/// POST /api/admin/invoices/{id} — invoice the remaining balance.
pub async fn send_invoice(
    _admin: AdminUser,
    ctx: web::Data<AppContext>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, BookingError> {
    let outcome = lifecycle::issue_invoice(&ctx, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// GET /api/admin/users — all users, newest first.
pub async fn get_users(
    _admin: AdminUser,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, AccountError> {
    Ok(HttpResponse::Ok().json(accounts::list_users(&ctx).await?))
}

/// PATCH /api/admin/users/{id}/admin — flip a user's admin flag.
pub async fn toggle_admin(
    _admin: AdminUser,
    ctx: web::Data<AppContext>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AccountError> {
    Ok(HttpResponse::Ok().json(accounts::toggle_admin(&ctx, path.into_inner()).await?))
}
