//! Tests for the inventory transaction log: stock application by type and
//! the all-or-nothing boundary between record and mutation.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use stockflow::entities::inventory_transaction::TransactionType;
use stockflow::ServiceError;

#[tokio::test]
async fn receipt_increases_stock() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 10).await;

    let transaction = app
        .services
        .inventory_transactions
        .create_transaction(product_id, warehouse_id, 40, TransactionType::Receipt, None)
        .await
        .unwrap();
    assert_eq!(transaction.transaction_type(), Some(TransactionType::Receipt));

    let stock = app
        .services
        .stock
        .get_stock(product_id, warehouse_id)
        .await
        .unwrap()
        .expect("stock entry should exist");
    assert_eq!(stock.quantity, 50);
}

#[tokio::test]
async fn shipment_decreases_stock() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 50).await;

    app.services
        .inventory_transactions
        .create_transaction(
            product_id,
            warehouse_id,
            30,
            TransactionType::Shipment,
            Some("order-a"),
        )
        .await
        .unwrap();

    let stock = app
        .services
        .stock
        .get_stock(product_id, warehouse_id)
        .await
        .unwrap()
        .expect("stock entry should exist");
    assert_eq!(stock.quantity, 20);
}

#[tokio::test]
async fn shipment_beyond_stock_persists_nothing() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 20).await;

    let result = app
        .services
        .inventory_transactions
        .create_transaction(product_id, warehouse_id, 30, TransactionType::Shipment, None)
        .await;
    assert_matches!(
        result,
        Err(ServiceError::InsufficientStock {
            current: 20,
            requested: 30
        })
    );

    // The record rolled back together with the failed stock mutation
    let transactions = app
        .services
        .inventory_transactions
        .get_transactions_by_product(product_id)
        .await
        .unwrap();
    assert!(transactions.is_empty());

    let stock = app
        .services
        .stock
        .get_stock(product_id, warehouse_id)
        .await
        .unwrap()
        .expect("stock entry should exist");
    assert_eq!(stock.quantity, 20);
}

#[tokio::test]
async fn adjustment_sets_absolute_quantity() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 50).await;

    app.services
        .inventory_transactions
        .create_transaction(product_id, warehouse_id, 7, TransactionType::Adjustment, None)
        .await
        .unwrap();

    let stock = app
        .services
        .stock
        .get_stock(product_id, warehouse_id)
        .await
        .unwrap()
        .expect("stock entry should exist");
    assert_eq!(stock.quantity, 7);
}

#[tokio::test]
async fn return_adds_back_to_stock() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 5).await;

    app.services
        .inventory_transactions
        .create_transaction(
            product_id,
            warehouse_id,
            3,
            TransactionType::Return,
            Some("order-a"),
        )
        .await
        .unwrap();

    let stock = app
        .services
        .stock
        .get_stock(product_id, warehouse_id)
        .await
        .unwrap()
        .expect("stock entry should exist");
    assert_eq!(stock.quantity, 8);
}

#[tokio::test]
async fn transaction_rejects_non_positive_quantity() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 10).await;

    for quantity in [0, -5] {
        let result = app
            .services
            .inventory_transactions
            .create_transaction(
                product_id,
                warehouse_id,
                quantity,
                TransactionType::Receipt,
                None,
            )
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }
}

#[tokio::test]
async fn transactions_are_queryable_by_pair() {
    let app = TestApp::new().await;
    let (product_id, warehouse_id) = app.seed_stock("SKU-001", "Main", 100).await;
    let other_warehouse = app.seed_warehouse("Overflow").await;
    app.services
        .stock
        .set_stock(product_id, other_warehouse.id, 10)
        .await
        .unwrap();

    app.services
        .inventory_transactions
        .create_transaction(product_id, warehouse_id, 5, TransactionType::Receipt, None)
        .await
        .unwrap();
    app.services
        .inventory_transactions
        .create_transaction(
            product_id,
            other_warehouse.id,
            4,
            TransactionType::Receipt,
            None,
        )
        .await
        .unwrap();

    let by_product = app
        .services
        .inventory_transactions
        .get_transactions_by_product(product_id)
        .await
        .unwrap();
    assert_eq!(by_product.len(), 2);

    let by_pair = app
        .services
        .inventory_transactions
        .get_transactions_by_product_and_warehouse(product_id, warehouse_id)
        .await
        .unwrap();
    assert_eq!(by_pair.len(), 1);
    assert_eq!(by_pair[0].quantity, 5);
}
