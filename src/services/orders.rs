//! Order service
//!
//! Drives an order through its lifecycle and coordinates the reservation
//! ledger and the transaction log:
//!
//! ```text
//! CREATED -> CONFIRMED -> PAID -> SHIPPED -> COMPLETED
//! CREATED | CONFIRMED | PAID -> CANCELLED
//! ```
//!
//! Confirmation reserves stock per item; shipping consumes the reservations
//! and writes the paired shipment transactions; cancellation releases them.
//! Each multi-step workflow runs in one database transaction, so a failing
//! step rolls back everything applied earlier in the same call.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::DbPool;
use crate::entities::inventory_transaction::TransactionType;
use crate::entities::order::{self, Entity as OrderEntity, OrderStatus};
use crate::entities::order_item::{self, Entity as OrderItemEntity};
use crate::entities::reservation::{self, Entity as ReservationEntity, ReservationStatus};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::inventory_transactions::InventoryTransactionService;
use crate::services::reservations::ReservationService;

/// Reservations made on confirmation expire after this many hours unless
/// the order ships or is cancelled first.
const RESERVATION_TTL_HOURS: i64 = 1;

/// Request/response types for the order service

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price per unit in the smallest currency unit (cents).
    pub unit_price: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Customer id is required"))]
    pub customer_id: String,
    pub items: Vec<OrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: String,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Service for managing orders.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    reservations: ReservationService,
    transactions: InventoryTransactionService,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        reservations: ReservationService,
        transactions: InventoryTransactionService,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db_pool,
            reservations,
            transactions,
            event_sender,
        }
    }

    /// Creates a new order in CREATED with its items.
    #[instrument(skip(self, request), fields(customer_id = %request.customer_id, item_count = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderResponse, ServiceError> {
        request.validate()?;

        if request.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "Order must contain at least one item".to_string(),
            ));
        }
        for item in &request.items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Item quantity must be positive, got {} for product {}",
                    item.quantity, item.product_id
                )));
            }
            if item.unit_price < 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Unit price must not be negative, got {} for product {}",
                    item.unit_price, item.product_id
                )));
            }
        }

        let total_amount: i64 = request
            .items
            .iter()
            .map(|item| i64::from(item.quantity) * item.unit_price)
            .sum();

        let db = &*self.db_pool;
        let order_id = Uuid::new_v4();

        let txn = db.begin().await?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            customer_id: Set(request.customer_id.clone()),
            status: Set(OrderStatus::Created.as_str().to_string()),
            total_amount: Set(total_amount),
            ..Default::default()
        };
        let created_order = order_model.insert(&txn).await?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let item_model = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                ..Default::default()
            };
            items.push(item_model.insert(&txn).await?);
        }

        txn.commit().await?;

        info!(order_id = %order_id, total_amount = total_amount, "Order created");

        self.emit(Event::OrderCreated(order_id)).await;

        Self::to_response(created_order, items)
    }

    /// Retrieves an order with its items.
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let order = Self::load_order(db, id).await?;
        let items = Self::load_items(db, id).await?;

        Self::to_response(order, items)
    }

    /// All orders placed by a customer, newest first.
    #[instrument(skip(self))]
    pub async fn get_orders_by_customer(
        &self,
        customer_id: &str,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db_pool;

        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(db)
            .await?;

        let mut responses = Vec::with_capacity(orders.len());
        for order in orders {
            let items = Self::load_items(db, order.id).await?;
            responses.push(Self::to_response(order, items)?);
        }

        Ok(responses)
    }

    /// Confirms a CREATED order, reserving stock for every item.
    ///
    /// All reservations and the status update run in one database
    /// transaction: if any item cannot be reserved, the whole confirmation
    /// rolls back and the order stays CREATED with no reservations left
    /// behind.
    #[instrument(skip(self))]
    pub async fn confirm_order(
        &self,
        id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, id).await?;
        Self::require_status(&order, OrderStatus::Created)?;

        let items = Self::load_items(&txn, id).await?;
        let reference_id = id.to_string();
        let expires_at = Utc::now() + Duration::hours(RESERVATION_TTL_HOURS);

        for item in &items {
            self.reservations
                .create_reservation_in(
                    &txn,
                    item.product_id,
                    warehouse_id,
                    item.quantity,
                    &reference_id,
                    Some(expires_at),
                )
                .await?;
        }

        let updated = Self::update_status(&txn, order, OrderStatus::Confirmed).await?;
        txn.commit().await?;

        info!(order_id = %id, warehouse_id = %warehouse_id, "Order confirmed");

        self.emit(Event::OrderConfirmed(id)).await;

        Self::to_response(updated, items)
    }

    /// Marks a CONFIRMED order as paid. No side effects beyond the status.
    #[instrument(skip(self))]
    pub async fn mark_order_as_paid(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, id).await?;
        Self::require_status(&order, OrderStatus::Confirmed)?;

        let updated = Self::update_status(&txn, order, OrderStatus::Paid).await?;
        txn.commit().await?;

        info!(order_id = %id, "Order marked as paid");

        self.emit(Event::OrderPaid(id)).await;

        let items = Self::load_items(db, id).await?;
        Self::to_response(updated, items)
    }

    /// Ships a PAID order.
    ///
    /// Every ACTIVE reservation for the order is consumed and paired with a
    /// shipment transaction for the same product, warehouse, and quantity.
    /// The pairs and the status update run in one database transaction, so
    /// a failing shipment (e.g. stock drained out of band) rolls back the
    /// consumptions already applied.
    #[instrument(skip(self))]
    pub async fn ship_order(
        &self,
        id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, id).await?;
        Self::require_status(&order, OrderStatus::Paid)?;

        let reference_id = id.to_string();
        let active_reservations = ReservationEntity::find()
            .filter(reservation::Column::ReferenceId.eq(reference_id.as_str()))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(&txn)
            .await?;

        for res in &active_reservations {
            self.reservations
                .consume_reservation_in(&txn, res.id)
                .await?;
            self.transactions
                .create_transaction_in(
                    &txn,
                    res.product_id,
                    res.warehouse_id,
                    res.quantity,
                    TransactionType::Shipment,
                    Some(reference_id.as_str()),
                )
                .await?;
        }

        let updated = Self::update_status(&txn, order, OrderStatus::Shipped).await?;
        txn.commit().await?;

        info!(
            order_id = %id,
            warehouse_id = %warehouse_id,
            shipped_reservations = active_reservations.len(),
            "Order shipped"
        );

        self.emit(Event::OrderShipped(id)).await;

        let items = Self::load_items(db, id).await?;
        Self::to_response(updated, items)
    }

    /// Completes a SHIPPED order.
    #[instrument(skip(self))]
    pub async fn complete_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, id).await?;
        Self::require_status(&order, OrderStatus::Shipped)?;

        let updated = Self::update_status(&txn, order, OrderStatus::Completed).await?;
        txn.commit().await?;

        info!(order_id = %id, "Order completed");

        self.emit(Event::OrderCompleted(id)).await;

        let items = Self::load_items(db, id).await?;
        Self::to_response(updated, items)
    }

    /// Cancels an order from any non-terminal state, releasing all of its
    /// reservations.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: Uuid) -> Result<OrderResponse, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, id).await?;
        let current = Self::decode_status(&order)?;
        if current.is_terminal() {
            return Err(ServiceError::InvalidOrderState {
                order_id: id,
                current,
                required: "any non-terminal status",
            });
        }

        let reference_id = id.to_string();
        let released = self
            .reservations
            .release_reservations_by_reference_in(&txn, &reference_id)
            .await?;

        let updated = Self::update_status(&txn, order, OrderStatus::Cancelled).await?;
        txn.commit().await?;

        info!(
            order_id = %id,
            released_reservations = released.len(),
            "Order cancelled"
        );

        self.emit(Event::OrderCancelled(id)).await;

        let items = Self::load_items(db, id).await?;
        Self::to_response(updated, items)
    }

    /// Records returned items for a SHIPPED or COMPLETED order, adding the
    /// quantities back to stock via RETURN transactions.
    ///
    /// The order status does not change, and repeated partial returns are
    /// allowed; cumulative returned quantity is not bounded against what
    /// was shipped.
    #[instrument(skip(self, items), fields(order_id = %order_id, item_count = items.len()))]
    pub async fn return_order_items(
        &self,
        order_id: Uuid,
        items: Vec<ReturnItemRequest>,
        warehouse_id: Uuid,
    ) -> Result<(), ServiceError> {
        for item in &items {
            if item.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Return quantity must be positive, got {} for product {}",
                    item.quantity, item.product_id
                )));
            }
        }

        let db = &*self.db_pool;

        let txn = db.begin().await?;

        let order = Self::load_order(&txn, order_id).await?;
        let current = Self::decode_status(&order)?;
        if current != OrderStatus::Shipped && current != OrderStatus::Completed {
            return Err(ServiceError::InvalidOrderState {
                order_id,
                current,
                required: "SHIPPED or COMPLETED",
            });
        }

        let reference_id = order_id.to_string();
        for item in &items {
            self.transactions
                .create_transaction_in(
                    &txn,
                    item.product_id,
                    warehouse_id,
                    item.quantity,
                    TransactionType::Return,
                    Some(reference_id.as_str()),
                )
                .await?;
        }

        txn.commit().await?;

        info!(
            order_id = %order_id,
            warehouse_id = %warehouse_id,
            returned_items = items.len(),
            "Order items returned"
        );

        self.emit(Event::OrderItemsReturned {
            order_id,
            warehouse_id,
        })
        .await;

        Ok(())
    }

    async fn load_order<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        OrderEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))
    }

    async fn load_items<C: ConnectionTrait>(
        conn: &C,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        Ok(OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(conn)
            .await?)
    }

    fn decode_status(order: &order::Model) -> Result<OrderStatus, ServiceError> {
        order.status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Order {} has unknown status \"{}\"",
                order.id, order.status
            ))
        })
    }

    fn require_status(order: &order::Model, required: OrderStatus) -> Result<(), ServiceError> {
        let current = Self::decode_status(order)?;
        if current != required {
            return Err(ServiceError::InvalidOrderState {
                order_id: order.id,
                current,
                required: required.as_str(),
            });
        }
        Ok(())
    }

    async fn update_status<C: ConnectionTrait>(
        conn: &C,
        order: order::Model,
        to: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(to.as_str().to_string());
        Ok(active.update(conn).await?)
    }

    fn to_response(
        order: order::Model,
        items: Vec<order_item::Model>,
    ) -> Result<OrderResponse, ServiceError> {
        let status = Self::decode_status(&order)?;
        Ok(OrderResponse {
            id: order.id,
            customer_id: order.customer_id,
            status,
            total_amount: order.total_amount,
            items: items
                .into_iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total: item.total(),
                })
                .collect(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send order event");
            }
        }
    }
}
