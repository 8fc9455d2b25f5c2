use std::collections::HashMap;

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt;

use crate::auth::middleware::AuthenticatedUser;
use crate::config::MAX_UPLOAD_BYTES;
use crate::lifecycle::{self, BookingError};
use crate::models::bookings::NewBooking;
use crate::state::AppContext;
use crate::uploads::{UploadBatch, UploadError};

/// Longest accepted value for a text field of the booking form.
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;

/// GET /api/bookings — the caller's own bookings, newest first.
pub async fn get_own_bookings(
    user: AuthenticatedUser,
    ctx: web::Data<AppContext>,
) -> Result<HttpResponse, BookingError> {
    let bookings = lifecycle::list_for_owner(&ctx, user.0.id).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

/// POST /api/bookings — multipart form: the booking's text fields plus up
/// to five `files` images.
pub async fn create_booking(
    user: AuthenticatedUser,
    ctx: web::Data<AppContext>,
    mut payload: Multipart,
) -> actix_web::Result<HttpResponse> {
    let mut batch = UploadBatch::new(&ctx.uploads);
    let mut text = HashMap::new();

    if let Err(e) = read_form(&mut payload, &mut batch, &mut text).await {
        tracing::warn!(error = %e, "Rejected booking upload");
        batch.discard().await;
        return Err(e.into());
    }

    let details = details_from_form(text);
    match lifecycle::create_booking(&ctx, user.0.id, details, batch.paths().to_vec()).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(outcome)),
        Err(e) => {
            batch.discard().await;
            Err(e.into())
        }
    }
}

async fn read_form(
    payload: &mut Multipart,
    batch: &mut UploadBatch<'_>,
    text: &mut HashMap<String, String>,
) -> Result<(), UploadError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" {
            let is_image = field
                .content_type()
                .is_some_and(|mime| mime.type_().as_str() == "image");
            if !is_image {
                return Err(UploadError::NotAnImage);
            }

            let filename = field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string);
            let bytes = read_field(&mut field, MAX_UPLOAD_BYTES, UploadError::TooLarge).await?;
            batch.add(filename.as_deref(), &bytes).await?;
        } else {
            let bytes = read_field(
                &mut field,
                MAX_TEXT_FIELD_BYTES,
                UploadError::Malformed(format!("Field {name} is too long")),
            )
            .await?;
            let value = String::from_utf8(bytes)
                .map_err(|_| UploadError::Malformed(format!("Field {name} is not valid UTF-8")))?;
            text.insert(name, value);
        }
    }

    Ok(())
}

/// Drain a multipart field, failing with `over_limit` past `limit` bytes.
async fn read_field(
    field: &mut Field,
    limit: usize,
    over_limit: UploadError,
) -> Result<Vec<u8>, UploadError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|e| UploadError::Malformed(e.to_string()))?
    {
        if buf.len() + chunk.len() > limit {
            return Err(over_limit);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Booking details from the form's text fields. Blank optional fields are
/// treated as absent; missing required ones are left empty for validation.
fn details_from_form(mut text: HashMap<String, String>) -> NewBooking {
    let mut take = |key: &str| {
        text.remove(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    NewBooking {
        customer_name: take("customerName").unwrap_or_default(),
        customer_email: take("customerEmail").unwrap_or_default(),
        customer_phone: take("customerPhone"),
        project_description: take("projectDescription").unwrap_or_default(),
        art_type: take("artType").unwrap_or_default(),
        art_size: take("artSize"),
        deadline: take("deadline"),
        payment_method: take("paymentMethod"),
    }
}
