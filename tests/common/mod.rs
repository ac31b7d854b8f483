//! Shared test harness: an in-memory SQLite database with the embedded
//! migrations applied and all services wired onto it.
#![allow(dead_code)]

use std::sync::Arc;

use stockflow::db::{establish_connection_with_config, run_migrations, DbConfig, DbPool};
use stockflow::entities::{product, warehouse};
use stockflow::services::Services;
use uuid::Uuid;

pub struct TestApp {
    pub db: Arc<DbPool>,
    pub services: Services,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single pooled connection keeps every query on the same
        // in-memory database.
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };

        let db = establish_connection_with_config(&config)
            .await
            .expect("Failed to open in-memory database");
        run_migrations(&db).await.expect("Failed to run migrations");

        let db = Arc::new(db);
        let services = Services::new(db.clone(), None);

        Self { db, services }
    }

    pub async fn seed_product(&self, sku: &str) -> product::Model {
        self.services
            .products
            .create_product(&format!("Product {}", sku), sku, None)
            .await
            .expect("Failed to seed product")
    }

    pub async fn seed_warehouse(&self, name: &str) -> warehouse::Model {
        self.services
            .warehouses
            .create_warehouse(name, true)
            .await
            .expect("Failed to seed warehouse")
    }

    /// Seeds a product/warehouse pair with initial stock and returns the ids.
    pub async fn seed_stock(&self, sku: &str, warehouse_name: &str, quantity: i32) -> (Uuid, Uuid) {
        let product = self.seed_product(sku).await;
        let warehouse = self.seed_warehouse(warehouse_name).await;
        self.services
            .stock
            .set_stock(product.id, warehouse.id, quantity)
            .await
            .expect("Failed to seed stock");
        (product.id, warehouse.id)
    }
}
