//! Inventory transaction service
//!
//! Append-only log of stock-affecting events. Every record insert is paired
//! with exactly one stock mutation, and both run in the same database
//! transaction: a failed stock update leaves no orphaned record behind.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::inventory_transaction::{
    self, Entity as InventoryTransactionEntity, TransactionType,
};
use crate::entities::stock_entry::Entity as StockEntryEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::stock::upsert_stock_quantity;

/// Service for the inventory transaction log.
#[derive(Clone)]
pub struct InventoryTransactionService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl InventoryTransactionService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Records a transaction and applies it to the stock ledger.
    ///
    /// The stored quantity is positive for every type; the type determines
    /// how stock changes:
    /// - RECEIPT, RETURN: stock increases by the quantity
    /// - SHIPMENT: stock decreases by the quantity, failing if it would go
    ///   negative
    /// - ADJUSTMENT: stock is set to the quantity
    #[instrument(skip(self))]
    pub async fn create_transaction(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        transaction_type: TransactionType,
        reference_id: Option<&str>,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;
        let created = self
            .create_transaction_in(
                &txn,
                product_id,
                warehouse_id,
                quantity,
                transaction_type,
                reference_id,
            )
            .await?;
        txn.commit().await?;

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::InventoryTransactionRecorded {
                    transaction_id: created.id,
                    product_id,
                    warehouse_id,
                    transaction_type: transaction_type.as_str().to_string(),
                    quantity,
                })
                .await
            {
                warn!(error = %e, transaction_id = %created.id, "Failed to send transaction event");
            }
        }

        Ok(created)
    }

    pub(crate) async fn create_transaction_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        transaction_type: TransactionType,
        reference_id: Option<&str>,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Transaction quantity must be positive, got {}",
                quantity
            )));
        }

        let model = inventory_transaction::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            r#type: Set(transaction_type.as_str().to_string()),
            quantity: Set(quantity),
            reference_id: Set(reference_id.map(str::to_string)),
            ..Default::default()
        };

        let created = model.insert(conn).await?;

        self.apply_to_stock(conn, &created, transaction_type).await?;

        info!(
            transaction_id = %created.id,
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            transaction_type = %transaction_type,
            quantity = quantity,
            "Inventory transaction recorded"
        );

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_transaction(
        &self,
        id: Uuid,
    ) -> Result<inventory_transaction::Model, ServiceError> {
        let db = &*self.db_pool;

        InventoryTransactionEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_transactions_by_product(
        &self,
        product_id: Uuid,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ProductId.eq(product_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_transactions_by_warehouse(
        &self,
        warehouse_id: Uuid,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::WarehouseId.eq(warehouse_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get_transactions_by_product_and_warehouse(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Vec<inventory_transaction::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(InventoryTransactionEntity::find()
            .filter(inventory_transaction::Column::ProductId.eq(product_id))
            .filter(inventory_transaction::Column::WarehouseId.eq(warehouse_id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// Applies a recorded transaction to the stock ledger. Stock is read
    /// fresh on the same connection so the check sees any updates made
    /// earlier in the enclosing transaction.
    async fn apply_to_stock<C: ConnectionTrait>(
        &self,
        conn: &C,
        transaction: &inventory_transaction::Model,
        transaction_type: TransactionType,
    ) -> Result<(), ServiceError> {
        let current = StockEntryEntity::find_by_id((transaction.product_id, transaction.warehouse_id))
            .one(conn)
            .await?
            .map(|entry| entry.quantity)
            .unwrap_or(0);

        let new_quantity = match transaction_type {
            TransactionType::Receipt | TransactionType::Return => current + transaction.quantity,
            TransactionType::Shipment => {
                let remaining = current - transaction.quantity;
                if remaining < 0 {
                    return Err(ServiceError::InsufficientStock {
                        current,
                        requested: transaction.quantity,
                    });
                }
                remaining
            }
            TransactionType::Adjustment => transaction.quantity,
        };

        upsert_stock_quantity(conn, transaction.product_id, transaction.warehouse_id, new_quantity)
            .await?;

        Ok(())
    }
}
