use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product::Entity as ProductEntity;
use crate::entities::stock_entry::{self, Entity as StockEntryEntity};
use crate::entities::warehouse::Entity as WarehouseEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Inserts or replaces the quantity for a (product, warehouse) pair.
///
/// Callers are responsible for validating the quantity; this helper is the
/// single write path to the stock table shared by the stock service and the
/// transaction log.
pub(crate) async fn upsert_stock_quantity<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    warehouse_id: Uuid,
    quantity: i32,
) -> Result<stock_entry::Model, ServiceError> {
    let existing = StockEntryEntity::find_by_id((product_id, warehouse_id))
        .one(conn)
        .await?;

    match existing {
        Some(entry) => {
            let mut active: stock_entry::ActiveModel = entry.into();
            active.quantity = Set(quantity);
            Ok(active.update(conn).await?)
        }
        None => {
            let active = stock_entry::ActiveModel {
                product_id: Set(product_id),
                warehouse_id: Set(warehouse_id),
                quantity: Set(quantity),
                ..Default::default()
            };
            Ok(active.insert(conn).await?)
        }
    }
}

/// Service for the physical stock ledger.
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Sets the stock quantity for a product in a warehouse, replacing any
    /// prior quantity. Both the product and the warehouse must exist.
    #[instrument(skip(self))]
    pub async fn set_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<stock_entry::Model, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;
        let entry = self
            .set_stock_in(&txn, product_id, warehouse_id, quantity)
            .await?;
        txn.commit().await?;

        info!(
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            quantity = quantity,
            "Stock set"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::StockSet {
                    product_id,
                    warehouse_id,
                    quantity,
                })
                .await
            {
                warn!(error = %e, product_id = %product_id, "Failed to send stock set event");
            }
        }

        Ok(entry)
    }

    pub(crate) async fn set_stock_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<stock_entry::Model, ServiceError> {
        if quantity < 0 {
            return Err(ServiceError::ValidationError(format!(
                "Stock quantity must not be negative, got {}",
                quantity
            )));
        }

        ProductEntity::find_by_id(product_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        WarehouseEntity::find_by_id(warehouse_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Warehouse {} not found", warehouse_id))
            })?;

        upsert_stock_quantity(conn, product_id, warehouse_id, quantity).await
    }

    /// Adjusts the stock quantity by a signed delta. The read and the write
    /// run in one database transaction so concurrent adjustments cannot
    /// interleave between them.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        delta: i32,
    ) -> Result<stock_entry::Model, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let current = StockEntryEntity::find_by_id((product_id, warehouse_id))
            .one(&txn)
            .await?
            .map(|entry| entry.quantity)
            .unwrap_or(0);

        let new_quantity = current + delta;
        if new_quantity < 0 {
            return Err(ServiceError::InsufficientStock {
                current,
                requested: delta.saturating_abs(),
            });
        }

        let entry = self
            .set_stock_in(&txn, product_id, warehouse_id, new_quantity)
            .await?;
        txn.commit().await?;

        info!(
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            old_quantity = current,
            new_quantity = new_quantity,
            "Stock adjusted"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::StockAdjusted {
                    product_id,
                    warehouse_id,
                    old_quantity: current,
                    new_quantity,
                })
                .await
            {
                warn!(error = %e, product_id = %product_id, "Failed to send stock adjusted event");
            }
        }

        Ok(entry)
    }

    /// Increases stock by a positive quantity.
    #[instrument(skip(self))]
    pub async fn increase_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<stock_entry::Model, ServiceError> {
        self.adjust_stock(product_id, warehouse_id, quantity).await
    }

    /// Decreases stock by a positive quantity.
    #[instrument(skip(self))]
    pub async fn decrease_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    ) -> Result<stock_entry::Model, ServiceError> {
        self.adjust_stock(product_id, warehouse_id, -quantity).await
    }

    /// Gets the stock entry for a product in a warehouse, if one exists.
    #[instrument(skip(self))]
    pub async fn get_stock(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Option<stock_entry::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(StockEntryEntity::find_by_id((product_id, warehouse_id))
            .one(db)
            .await?)
    }

    /// Gets all stock entries for a product across warehouses.
    #[instrument(skip(self))]
    pub async fn get_stock_by_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<stock_entry::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(StockEntryEntity::find()
            .filter(stock_entry::Column::ProductId.eq(product_id))
            .all(db)
            .await?)
    }

    /// Gets all stock entries held in a warehouse.
    #[instrument(skip(self))]
    pub async fn get_stock_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<stock_entry::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(StockEntryEntity::find()
            .filter(stock_entry::Column::WarehouseId.eq(warehouse_id))
            .all(db)
            .await?)
    }

    /// Total quantity for a product summed over all warehouses; 0 when the
    /// product has no stock entries.
    #[instrument(skip(self))]
    pub async fn get_total_stock(&self, product_id: Uuid) -> Result<i64, ServiceError> {
        let entries = self.get_stock_by_product(product_id).await?;
        Ok(entries.iter().map(|e| i64::from(e.quantity)).sum())
    }
}
