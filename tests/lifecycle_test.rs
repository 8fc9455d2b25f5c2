//! Booking lifecycle against an in-memory database.
//!
//! Run with: `cargo test --test lifecycle_test`
mod common;

use actix_web::ResponseError;
use actix_web::http::StatusCode;
use common::*;
use smartyart_backend::lifecycle::{self, BookingError};
use smartyart_backend::models::bookings::{
    BookingListQuery, Status, UpdateBookingStatus, UpdateTotalAmount,
};
use uuid::Uuid;

fn status_request(status: &str) -> UpdateBookingStatus {
    UpdateBookingStatus {
        status: Some(status.to_string()),
        notes: None,
    }
}

#[tokio::test]
async fn initial_status_follows_payment_method() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;

    let card = create_booking(&app, &owner, "stripe").await;
    assert_eq!(card.status, Status::Pending);
    assert!(!card.deposit_paid);
    assert_eq!(card.deposit_amount, 20.0);

    let transfer = create_booking(&app, &owner, "etransfer").await;
    assert_eq!(transfer.status, Status::PendingDeposit);

    // Only the card booking opened a checkout.
    assert_eq!(app.gateway.checkout_count(), 1);
}

#[tokio::test]
async fn stripe_booking_returns_checkout_url_with_correlation_metadata() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;

    let outcome = lifecycle::create_booking(&app.ctx, owner.id, booking_details("stripe"), Vec::new())
        .await
        .unwrap();
    assert!(outcome.value.stripe_url.is_some());
    assert!(outcome.warnings.is_empty());

    let checkout = app.gateway.checkouts.lock().unwrap()[0].clone();
    assert_eq!(checkout.booking_id, outcome.value.booking_id);
    assert_eq!(checkout.customer_email, "ada@example.com");
    assert_eq!(checkout.amount_minor, 2000);
    assert!(checkout.success_url.contains(&outcome.value.booking_id.to_string()));

    let emails = app.notifier.sent();
    assert_eq!(emails.len(), 2);
    assert_eq!(emails[0].to, "ada@example.com");
    assert_eq!(emails[0].cc.as_deref(), Some(ADMIN_EMAIL));
    assert_eq!(emails[1].to, ADMIN_EMAIL);
}

#[tokio::test]
async fn invalid_booking_details_are_rejected_without_insert() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;

    let mut details = booking_details("stripe");
    details.project_description = "short".to_string();
    let err = lifecycle::create_booking(&app.ctx, owner.id, details, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let err = lifecycle::create_booking(&app.ctx, owner.id, booking_details("paypal"), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let mut details = booking_details("stripe");
    details.customer_email = "not-an-email".to_string();
    let err = lifecycle::create_booking(&app.ctx, owner.id, details, Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    assert!(lifecycle::list_for_owner(&app.ctx, owner.id).await.unwrap().is_empty());
    assert_eq!(app.gateway.checkout_count(), 0);
}

#[tokio::test]
async fn failed_checkout_removes_the_booking() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    app.gateway
        .fail_checkout
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let err = lifecycle::create_booking(&app.ctx, owner.id, booking_details("stripe"), Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Payment(_)));
    assert!(lifecycle::list_for_owner(&app.ctx, owner.id).await.unwrap().is_empty());
    assert!(app.notifier.sent().is_empty());
}

#[tokio::test]
async fn scenario_a_etransfer_deposit_confirmed_by_operator() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;

    let outcome = lifecycle::create_booking(&app.ctx, owner.id, booking_details("etransfer"), Vec::new())
        .await
        .unwrap();
    assert_eq!(outcome.value.stripe_url, None);
    assert_eq!(outcome.value.status, Status::PendingDeposit);
    let id = outcome.value.booking_id;
    app.notifier.clear();

    let updated = lifecycle::update_status(&app.ctx, id, status_request("deposit_paid"))
        .await
        .unwrap();
    assert_eq!(updated.value.booking.status, Status::DepositPaid);
    assert!(updated.value.booking.deposit_paid);
    assert_eq!(app.notifier.sent().len(), 1);

    // Re-applying the same status is accepted and changes nothing else.
    let again = lifecycle::update_status(
        &app.ctx,
        id,
        UpdateBookingStatus {
            status: Some("deposit_paid".to_string()),
            notes: Some("Transfer #42 received".to_string()),
        },
    )
    .await
    .unwrap();
    assert_eq!(again.value.booking.status, Status::DepositPaid);
    assert!(again.value.booking.deposit_paid);
    assert_eq!(again.value.booking.notes.as_deref(), Some("Transfer #42 received"));
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn unknown_or_missing_status_is_rejected_without_mutation() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;

    for request in [
        status_request("shipped"),
        status_request("DEPOSIT_PAID"),
        UpdateBookingStatus::default(),
    ] {
        let err = lifecycle::update_status(&app.ctx, booking.id, request)
            .await
            .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }

    assert_eq!(get_booking(&app, booking.id).await, booking);
}

#[tokio::test]
async fn operator_cannot_skip_ahead_or_leave_cancelled() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;

    let err = lifecycle::update_status(&app.ctx, booking.id, status_request("completed"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BookingError::Conflict {
            current: Status::PendingDeposit,
            requested: Status::Completed,
            ..
        }
    ));

    lifecycle::update_status(&app.ctx, booking.id, status_request("cancelled"))
        .await
        .unwrap();
    let err = lifecycle::update_status(&app.ctx, booking.id, status_request("in_progress"))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Conflict { current: Status::Cancelled, .. }));
}

#[tokio::test]
async fn cancellation_keeps_deposit_flag_and_sends_refund_copy() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;
    lifecycle::update_status(&app.ctx, booking.id, status_request("in_progress"))
        .await
        .unwrap();
    app.notifier.clear();

    let cancelled = lifecycle::update_status(&app.ctx, booking.id, status_request("cancelled"))
        .await
        .unwrap();
    assert_eq!(cancelled.value.booking.status, Status::Cancelled);
    assert!(cancelled.value.booking.deposit_paid);

    let emails = app.notifier.sent();
    assert_eq!(emails.len(), 1);
    assert!(emails[0].html.contains("5-7 business days"));
}

#[tokio::test]
async fn update_on_missing_booking_is_not_found() {
    let app = setup().await;
    let err = lifecycle::update_status(&app.ctx, Uuid::new_v4(), status_request("in_progress"))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::NotFound(_)));
}

#[tokio::test]
async fn notification_failure_is_a_warning_not_an_error() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;
    app.notifier.set_failing(true);

    let outcome = lifecycle::update_status(&app.ctx, booking.id, status_request("in_progress"))
        .await
        .unwrap();
    assert_eq!(outcome.warnings.len(), 1);
    assert_eq!(get_booking(&app, booking.id).await.status, Status::InProgress);
}

#[tokio::test]
async fn total_below_deposit_is_rejected_without_mutation() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;

    for total in [Some(19.99), Some(-5.0), Some(f64::NAN), None] {
        let err = lifecycle::set_total_amount(
            &app.ctx,
            booking.id,
            UpdateTotalAmount {
                total_amount: total,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
    }
    assert_eq!(get_booking(&app, booking.id).await.total_amount, None);

    let updated = lifecycle::set_total_amount(
        &app.ctx,
        booking.id,
        UpdateTotalAmount {
            total_amount: Some(20.0),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.total_amount, Some(20.0));
    assert_eq!(updated.status, Status::PendingDeposit);
}

#[tokio::test]
async fn scenario_c_invoice_for_remaining_balance() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;
    force_status(&app, booking.id, Status::Completed).await;
    force_total(&app, booking.id, 150.0).await;
    app.notifier.clear();

    let outcome = lifecycle::issue_invoice(&app.ctx, booking.id).await.unwrap();
    assert_eq!(outcome.value.amount_due, 130.0);
    assert!(outcome.value.invoice_url.is_some());

    let invoices = app.gateway.invoices();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].amount_minor, 13_000);
    assert_eq!(invoices[0].booking_id, booking.id);
    assert_eq!(invoices[0].days_until_due, 7);

    // Issuing an invoice never moves the booking.
    assert_eq!(get_booking(&app, booking.id).await.status, Status::Completed);
    assert_eq!(app.notifier.sent().len(), 1);
}

#[tokio::test]
async fn scenario_d_invoice_rejected_before_completion() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;
    force_status(&app, booking.id, Status::InProgress).await;
    force_total(&app, booking.id, 150.0).await;

    let err = lifecycle::issue_invoice(&app.ctx, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::Precondition(_)));
    assert!(app.gateway.invoices().is_empty());
}

#[tokio::test]
async fn invoice_requires_a_total() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let booking = create_booking(&app, &owner, "etransfer").await;
    force_status(&app, booking.id, Status::Completed).await;

    let err = lifecycle::issue_invoice(&app.ctx, booking.id).await.unwrap_err();
    assert!(matches!(err, BookingError::Precondition(_)));
    assert!(app.gateway.invoices().is_empty());
}

#[tokio::test]
async fn listing_filters_by_status_and_owner_newest_first() {
    let app = setup().await;
    let ada = create_user(&app, "ada@example.com", false).await;
    let bob = create_user(&app, "bob@example.com", false).await;

    let first = create_booking(&app, &ada, "stripe").await;
    let second = create_booking(&app, &ada, "etransfer").await;
    let other = create_booking(&app, &bob, "etransfer").await;

    let all = lifecycle::list_all(&app.ctx, BookingListQuery::default()).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let pending_deposit = lifecycle::list_all(
        &app.ctx,
        BookingListQuery {
            status: Some("pending_deposit".to_string()),
            user_id: None,
        },
    )
    .await
    .unwrap();
    let ids: Vec<_> = pending_deposit.iter().map(|b| b.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&second.id) && ids.contains(&other.id));

    let adas = lifecycle::list_all(
        &app.ctx,
        BookingListQuery {
            status: None,
            user_id: Some(ada.id),
        },
    )
    .await
    .unwrap();
    assert_eq!(adas.len(), 2);
    assert!(adas.iter().any(|b| b.id == first.id));

    let err = lifecycle::list_all(
        &app.ctx,
        BookingListQuery {
            status: Some("bogus".to_string()),
            user_id: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, BookingError::Validation(_)));

    let own = lifecycle::list_for_owner(&app.ctx, bob.id).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, other.id);
}

#[tokio::test]
async fn provider_session_id_cannot_be_shared_between_bookings() {
    let app = setup().await;
    let owner = create_user(&app, "ada@example.com", false).await;
    let first = create_booking(&app, &owner, "stripe").await;
    let second = create_booking(&app, &owner, "stripe").await;
    let cancelled = create_booking(&app, &owner, "stripe").await;
    force_status(&app, cancelled.id, Status::Cancelled).await;

    lifecycle::confirm_deposit_payment(&app.ctx, first.id, "cs_shared", None)
        .await
        .unwrap();

    // Both the normal transition and the late-payment path refuse the reused id.
    for id in [second.id, cancelled.id] {
        let err = lifecycle::confirm_deposit_payment(&app.ctx, id, "cs_shared", None)
            .await
            .unwrap_err();
        assert!(matches!(&err, BookingError::PaymentReferenceInUse(reference) if reference == "cs_shared"));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let stored = get_booking(&app, id).await;
        assert!(!stored.deposit_paid);
        assert_eq!(stored.stripe_session_id, None);
    }
    assert_eq!(get_booking(&app, second.id).await.status, Status::Pending);
    assert_eq!(get_booking(&app, cancelled.id).await.status, Status::Cancelled);
}
