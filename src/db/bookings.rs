use sea_orm::*;
use uuid::Uuid;

use crate::models::bookings::{
    self, BookingFilter, CreateBooking, DEPOSIT_AMOUNT, ReferenceFiles, Status, TransitionChanges,
};

/// What happened to a conditional status update.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionResult {
    /// The row matched and now holds the new status.
    Applied(bookings::Model),
    /// No booking has this id.
    NotFound,
    /// The booking exists but its status was not one of the allowed sources.
    Conflict { current: Status },
}

/// Insert a new booking in the initial status for its payment method.
pub async fn insert_booking(
    db: &DatabaseConnection,
    input: CreateBooking,
) -> Result<bookings::Model, DbErr> {
    let now = chrono::Utc::now();
    let details = input.details;

    let new_booking = bookings::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(input.user_id),
        customer_name: Set(details.customer_name),
        customer_email: Set(details.customer_email),
        customer_phone: Set(details.customer_phone),
        art_type: Set(details.art_type),
        art_size: Set(details.art_size),
        deadline: Set(details.deadline),
        project_description: Set(details.project_description),
        reference_files: Set(ReferenceFiles(input.reference_files)),
        deposit_amount: Set(DEPOSIT_AMOUNT),
        total_amount: Set(None),
        payment_method: Set(input.payment_method),
        status: Set(Status::initial_for(input.payment_method)),
        deposit_paid: Set(false),
        full_payment_received: Set(false),
        stripe_session_id: Set(None),
        stripe_invoice_id: Set(None),
        notes: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_booking.insert(db).await
}

/// Fetch a single booking by ID.
pub async fn get_booking_by_id(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Option<bookings::Model>, DbErr> {
    bookings::Entity::find_by_id(id).one(db).await
}

/// Fetch bookings matching the filter, most recent first.
pub async fn list_bookings(
    db: &DatabaseConnection,
    filter: BookingFilter,
) -> Result<Vec<bookings::Model>, DbErr> {
    let mut query = bookings::Entity::find();

    if let Some(status) = filter.status {
        query = query.filter(bookings::Column::Status.eq(status));
    }
    if let Some(user_id) = filter.user_id {
        query = query.filter(bookings::Column::UserId.eq(user_id));
    }

    query
        .order_by_desc(bookings::Column::CreatedAt)
        .order_by_desc(bookings::Column::Id)
        .all(db)
        .await
}

/// Fetch every booking owned by a user, most recent first.
pub async fn get_bookings_by_user_id(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Vec<bookings::Model>, DbErr> {
    list_bookings(
        db,
        BookingFilter {
            status: None,
            user_id: Some(user_id),
        },
    )
    .await
}

/// Set the agreed total for a booking. Returns `None` if the id does not exist.
pub async fn set_total_amount(
    db: &DatabaseConnection,
    id: Uuid,
    total_amount: f64,
) -> Result<Option<bookings::Model>, DbErr> {
    let changes = bookings::ActiveModel {
        total_amount: Set(Some(total_amount)),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    let result = bookings::Entity::update_many()
        .set(changes)
        .filter(bookings::Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_booking_by_id(db, id).await
}

/// Move a booking to `to`, but only if its current status is in `allowed_from`.
///
/// The status check and the write happen in a single `UPDATE ... WHERE`, so a
/// concurrent transition on the same booking either wins or shows up as a
/// `Conflict`, never as a silent overwrite.
pub async fn transition_status(
    db: &DatabaseConnection,
    id: Uuid,
    allowed_from: &[Status],
    to: Status,
    changes: TransitionChanges,
) -> Result<TransitionResult, DbErr> {
    let mut active = bookings::ActiveModel {
        status: Set(to),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    apply_changes(&mut active, changes);

    let result = bookings::Entity::update_many()
        .set(active)
        .filter(bookings::Column::Id.eq(id))
        .filter(bookings::Column::Status.is_in(allowed_from.iter().copied()))
        .exec(db)
        .await?;

    match get_booking_by_id(db, id).await? {
        None => Ok(TransitionResult::NotFound),
        Some(booking) if result.rows_affected > 0 => Ok(TransitionResult::Applied(booking)),
        Some(booking) => Ok(TransitionResult::Conflict {
            current: booking.status,
        }),
    }
}

/// Write payment fields on a booking without touching its status.
/// Returns `None` if the id does not exist.
pub async fn record_payment(
    db: &DatabaseConnection,
    id: Uuid,
    changes: TransitionChanges,
) -> Result<Option<bookings::Model>, DbErr> {
    let mut active = bookings::ActiveModel {
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    apply_changes(&mut active, changes);

    let result = bookings::Entity::update_many()
        .set(active)
        .filter(bookings::Column::Id.eq(id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(None);
    }
    get_booking_by_id(db, id).await
}

fn apply_changes(active: &mut bookings::ActiveModel, changes: TransitionChanges) {
    if let Some(deposit_paid) = changes.deposit_paid {
        active.deposit_paid = Set(deposit_paid);
    }
    if let Some(full_payment_received) = changes.full_payment_received {
        active.full_payment_received = Set(full_payment_received);
    }
    if let Some(session_id) = changes.stripe_session_id {
        active.stripe_session_id = Set(Some(session_id));
    }
    if let Some(invoice_id) = changes.stripe_invoice_id {
        active.stripe_invoice_id = Set(Some(invoice_id));
    }
    if let Some(notes) = changes.notes {
        active.notes = Set(Some(notes));
    }
}

/// Delete a booking by ID.
pub async fn delete_booking(db: &DatabaseConnection, id: Uuid) -> Result<DeleteResult, DbErr> {
    bookings::Entity::delete_by_id(id).exec(db).await
}
