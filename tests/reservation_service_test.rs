//! Tests for the reservation ledger: availability accounting, state
//! transitions, reference-scoped release, and the expiry sweep.

mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use stockflow::entities::reservation::ReservationStatus;
use stockflow::ServiceError;

#[tokio::test]
async fn reservations_respect_available_stock() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 100).await;

    // Reserve 70 for order A: available drops to 30
    app.services
        .reservations
        .create_reservation(product_id, warehouse_id, 70, "order-a", None)
        .await
        .unwrap();

    // 40 for order B exceeds the remaining 30
    let result = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 40, "order-b", None)
        .await;
    assert_matches!(
        result,
        Err(ServiceError::InsufficientAvailableStock {
            requested: 40,
            available: 30,
            ..
        })
    );

    // 30 fits exactly
    app.services
        .reservations
        .create_reservation(product_id, warehouse_id, 30, "order-b", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn create_reservation_rejects_non_positive_quantity() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 10).await;

    let result = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 0, "order-a", None)
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn released_and_consumed_reservations_free_availability() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 100).await;

    let reservation = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 100, "order-a", None)
        .await
        .unwrap();

    // Fully reserved: nothing available
    let result = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 1, "order-b", None)
        .await;
    assert_matches!(result, Err(ServiceError::InsufficientAvailableStock { .. }));

    // Releasing returns the quantity to the pool
    app.services
        .reservations
        .release_reservation(reservation.id)
        .await
        .unwrap();

    app.services
        .reservations
        .create_reservation(product_id, warehouse_id, 100, "order-b", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn consume_and_release_require_active_status() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 10).await;

    let reservation = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 5, "order-a", None)
        .await
        .unwrap();

    let consumed = app
        .services
        .reservations
        .consume_reservation(reservation.id)
        .await
        .unwrap();
    assert_eq!(consumed.status(), Some(ReservationStatus::Consumed));

    // Terminal states reject further transitions
    let result = app
        .services
        .reservations
        .consume_reservation(reservation.id)
        .await;
    assert_matches!(
        result,
        Err(ServiceError::InvalidReservationState {
            current: ReservationStatus::Consumed,
            ..
        })
    );

    let result = app
        .services
        .reservations
        .release_reservation(reservation.id)
        .await;
    assert_matches!(result, Err(ServiceError::InvalidReservationState { .. }));
}

#[tokio::test]
async fn release_by_reference_skips_terminal_reservations() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 100).await;

    let first = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 10, "order-a", None)
        .await
        .unwrap();
    app.services
        .reservations
        .create_reservation(product_id, warehouse_id, 20, "order-a", None)
        .await
        .unwrap();
    app.services
        .reservations
        .consume_reservation(first.id)
        .await
        .unwrap();

    // Only the remaining ACTIVE reservation is released
    let released = app
        .services
        .reservations
        .release_reservations_by_reference("order-a")
        .await
        .unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].quantity, 20);

    // Second call finds nothing ACTIVE and does not error
    let released = app
        .services
        .reservations
        .release_reservations_by_reference("order-a")
        .await
        .unwrap();
    assert!(released.is_empty());

    let consumed = app
        .services
        .reservations
        .get_reservation(first.id)
        .await
        .unwrap();
    assert_eq!(consumed.status(), Some(ReservationStatus::Consumed));
}

#[tokio::test]
async fn expiry_sweep_releases_only_lapsed_active_reservations() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 100).await;

    let lapsed = app
        .services
        .reservations
        .create_reservation(
            product_id,
            warehouse_id,
            10,
            "order-a",
            Some(Utc::now() - Duration::minutes(5)),
        )
        .await
        .unwrap();
    let current = app
        .services
        .reservations
        .create_reservation(
            product_id,
            warehouse_id,
            20,
            "order-b",
            Some(Utc::now() + Duration::hours(1)),
        )
        .await
        .unwrap();
    let open_ended = app
        .services
        .reservations
        .create_reservation(product_id, warehouse_id, 30, "order-c", None)
        .await
        .unwrap();

    let sweep = app
        .services
        .reservations
        .release_expired_reservations()
        .await
        .unwrap();
    assert_eq!(sweep.released_count, 1);

    let lapsed = app
        .services
        .reservations
        .get_reservation(lapsed.id)
        .await
        .unwrap();
    assert_eq!(lapsed.status(), Some(ReservationStatus::Released));

    for id in [current.id, open_ended.id] {
        let reservation = app.services.reservations.get_reservation(id).await.unwrap();
        assert_eq!(reservation.status(), Some(ReservationStatus::Active));
    }

    // Idempotent: a second sweep releases nothing further
    let sweep = app
        .services
        .reservations
        .release_expired_reservations()
        .await
        .unwrap();
    assert_eq!(sweep.released_count, 0);
}

#[tokio::test]
async fn get_reservation_reports_missing_id() {
    let app = TestApp::new().await;

    let result = app
        .services
        .reservations
        .get_reservation(uuid::Uuid::new_v4())
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}
