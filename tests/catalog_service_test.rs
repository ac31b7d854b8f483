//! Tests for the catalog plumbing: categories, products, and warehouses.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use stockflow::services::products::ProductUpdate;
use stockflow::services::warehouses::WarehouseUpdate;
use stockflow::ServiceError;
use uuid::Uuid;

#[tokio::test]
async fn duplicate_sku_conflicts() {
    let app = TestApp::new().await;

    app.services
        .products
        .create_product("Laptop", "SKU-LAPTOP-001", None)
        .await
        .unwrap();

    let result = app
        .services
        .products
        .create_product("Other laptop", "SKU-LAPTOP-001", None)
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn product_requires_name_and_sku() {
    let app = TestApp::new().await;

    let result = app.services.products.create_product("", "SKU-1", None).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));

    let result = app.services.products.create_product("Widget", "  ", None).await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn product_lookup_by_sku_and_deactivation() {
    let app = TestApp::new().await;

    let category = app
        .services
        .categories
        .create_category("Electronics", Some("Devices and accessories"))
        .await
        .unwrap();

    let created = app
        .services
        .products
        .create_product("Laptop", "SKU-LAPTOP-001", Some(category.id))
        .await
        .unwrap();
    assert!(created.is_active);
    assert!(created.is_sellable);

    let found = app
        .services
        .products
        .get_product_by_sku("SKU-LAPTOP-001")
        .await
        .unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.category_id, Some(category.id));

    let deactivated = app
        .services
        .products
        .deactivate_product(created.id)
        .await
        .unwrap();
    assert!(!deactivated.is_active);

    let active_only = app.services.products.list_products(true).await.unwrap();
    assert!(active_only.is_empty());

    let all = app.services.products.list_products(false).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn duplicate_category_name_conflicts() {
    let app = TestApp::new().await;

    app.services
        .categories
        .create_category("Electronics", None)
        .await
        .unwrap();

    let result = app
        .services
        .categories
        .create_category("Electronics", None)
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn category_delete_reports_missing_id() {
    let app = TestApp::new().await;

    let result = app.services.categories.delete_category(Uuid::new_v4()).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn warehouse_soft_delete_hides_from_active_listing() {
    let app = TestApp::new().await;

    let main = app.services.warehouses.create_warehouse("Main", true).await.unwrap();
    app.services
        .warehouses
        .create_warehouse("Overflow", false)
        .await
        .unwrap();

    app.services
        .warehouses
        .deactivate_warehouse(main.id)
        .await
        .unwrap();

    let active = app.services.warehouses.list_warehouses(true).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "Overflow");

    let all = app.services.warehouses.list_warehouses(false).await.unwrap();
    assert_eq!(all.len(), 2);

    // Reactivation brings it back
    app.services
        .warehouses
        .activate_warehouse(main.id)
        .await
        .unwrap();
    let active = app.services.warehouses.list_warehouses(true).await.unwrap();
    assert_eq!(active.len(), 2);
}

#[tokio::test]
async fn warehouse_update_changes_fields() {
    let app = TestApp::new().await;

    let warehouse = app
        .services
        .warehouses
        .create_warehouse("Main", true)
        .await
        .unwrap();

    let updated = app
        .services
        .warehouses
        .update_warehouse(
            warehouse.id,
            WarehouseUpdate {
                name: Some("Main Berlin".to_string()),
                shipping_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Main Berlin");
    assert!(!updated.shipping_enabled);
}

#[tokio::test]
async fn product_update_rejects_empty_name() {
    let app = TestApp::new().await;

    let product = app
        .services
        .products
        .create_product("Widget", "SKU-1", None)
        .await
        .unwrap();

    let result = app
        .services
        .products
        .update_product(
            product.id,
            ProductUpdate {
                name: Some("".to_string()),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}
