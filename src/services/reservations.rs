//! Reservation service
//!
//! Soft-holds stock for a reference (typically an order) without touching
//! the physical ledger. The availability check and the insert run inside a
//! single database transaction; two concurrent reservations for the same
//! (product, warehouse) pair cannot both observe the same available figure.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::reservation::{self, Entity as ReservationEntity, ReservationStatus};
use crate::entities::stock_entry::Entity as StockEntryEntity;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Result of releasing expired reservations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirySweepResult {
    /// Number of reservations released by this sweep.
    pub released_count: u64,
    /// Timestamp when the sweep ran.
    pub swept_at: DateTime<Utc>,
}

/// Service for managing stock reservations.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl ReservationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Reserves stock for a reference if enough is available.
    ///
    /// Available quantity is physical stock minus the sum of ACTIVE
    /// reservations for the pair; consumed and released reservations no
    /// longer count against it.
    #[instrument(skip(self))]
    pub async fn create_reservation(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reference_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<reservation::Model, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;
        let created = self
            .create_reservation_in(&txn, product_id, warehouse_id, quantity, reference_id, expires_at)
            .await?;
        txn.commit().await?;

        self.emit(Event::ReservationCreated {
            reservation_id: created.id,
            product_id,
            warehouse_id,
            quantity,
            reference_id: reference_id.to_string(),
        })
        .await;

        Ok(created)
    }

    pub(crate) async fn create_reservation_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reference_id: &str,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<reservation::Model, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::ValidationError(format!(
                "Reservation quantity must be positive, got {}",
                quantity
            )));
        }

        let physical = StockEntryEntity::find_by_id((product_id, warehouse_id))
            .one(conn)
            .await?
            .map(|entry| entry.quantity)
            .unwrap_or(0);

        let active_reservations = ReservationEntity::find()
            .filter(reservation::Column::ProductId.eq(product_id))
            .filter(reservation::Column::WarehouseId.eq(warehouse_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(conn)
            .await?;

        let reserved: i32 = active_reservations.iter().map(|r| r.quantity).sum();
        let available = physical - reserved;

        if available < quantity {
            return Err(ServiceError::InsufficientAvailableStock {
                product_id,
                warehouse_id,
                requested: quantity,
                available,
            });
        }

        let model = reservation::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            warehouse_id: Set(warehouse_id),
            quantity: Set(quantity),
            status: Set(ReservationStatus::Active.as_str().to_string()),
            reference_id: Set(reference_id.to_string()),
            expires_at: Set(expires_at),
            ..Default::default()
        };

        let created = model.insert(conn).await?;

        info!(
            reservation_id = %created.id,
            product_id = %product_id,
            warehouse_id = %warehouse_id,
            quantity = quantity,
            reference_id = %reference_id,
            "Reservation created"
        );

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_reservation(&self, id: Uuid) -> Result<reservation::Model, ServiceError> {
        let db = &*self.db_pool;
        Self::load(db, id).await
    }

    /// All reservations created for a reference, newest first.
    #[instrument(skip(self))]
    pub async fn get_reservations_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(ReservationEntity::find()
            .filter(reservation::Column::ReferenceId.eq(reference_id))
            .order_by_desc(reservation::Column::CreatedAt)
            .all(db)
            .await?)
    }

    /// ACTIVE reservations for a (product, warehouse) pair.
    #[instrument(skip(self))]
    pub async fn get_active_reservations(
        &self,
        product_id: Uuid,
        warehouse_id: Uuid,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(ReservationEntity::find()
            .filter(reservation::Column::ProductId.eq(product_id))
            .filter(reservation::Column::WarehouseId.eq(warehouse_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(db)
            .await?)
    }

    /// Marks an ACTIVE reservation as consumed.
    ///
    /// Consumption does not touch the stock ledger; the caller is expected
    /// to issue the corresponding shipment transaction. The order workflow
    /// pairs both steps in one database transaction.
    #[instrument(skip(self))]
    pub async fn consume_reservation(&self, id: Uuid) -> Result<reservation::Model, ServiceError> {
        let db = &*self.db_pool;

        let updated = self.consume_reservation_in(db, id).await?;

        self.emit(Event::ReservationConsumed(id)).await;

        Ok(updated)
    }

    pub(crate) async fn consume_reservation_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
    ) -> Result<reservation::Model, ServiceError> {
        let updated = Self::transition(conn, id, ReservationStatus::Consumed).await?;

        info!(reservation_id = %id, "Reservation consumed");

        Ok(updated)
    }

    /// Marks an ACTIVE reservation as released, returning its quantity to
    /// the available pool.
    #[instrument(skip(self))]
    pub async fn release_reservation(&self, id: Uuid) -> Result<reservation::Model, ServiceError> {
        let db = &*self.db_pool;

        let updated = Self::transition(db, id, ReservationStatus::Released).await?;

        info!(reservation_id = %id, "Reservation released");

        self.emit(Event::ReservationReleased(id)).await;

        Ok(updated)
    }

    /// Releases every ACTIVE reservation for a reference. Reservations
    /// already in a terminal state are skipped, not errored.
    #[instrument(skip(self))]
    pub async fn release_reservations_by_reference(
        &self,
        reference_id: &str,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let db = &*self.db_pool;

        let txn = db.begin().await?;
        let released = self
            .release_reservations_by_reference_in(&txn, reference_id)
            .await?;
        txn.commit().await?;

        for reservation in &released {
            self.emit(Event::ReservationReleased(reservation.id)).await;
        }

        Ok(released)
    }

    pub(crate) async fn release_reservations_by_reference_in<C: ConnectionTrait>(
        &self,
        conn: &C,
        reference_id: &str,
    ) -> Result<Vec<reservation::Model>, ServiceError> {
        let active = ReservationEntity::find()
            .filter(reservation::Column::ReferenceId.eq(reference_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(conn)
            .await?;

        let mut released = Vec::with_capacity(active.len());
        for reservation in active {
            let id = reservation.id;
            let mut model: reservation::ActiveModel = reservation.into();
            model.status = Set(ReservationStatus::Released.as_str().to_string());
            released.push(model.update(conn).await?);

            info!(reservation_id = %id, reference_id = %reference_id, "Reservation released");
        }

        Ok(released)
    }

    /// ACTIVE reservations whose expiry has passed and which the sweep has
    /// not yet released.
    #[instrument(skip(self))]
    pub async fn get_expired_reservations(&self) -> Result<Vec<reservation::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(ReservationEntity::find()
            .filter(reservation::Column::ExpiresAt.lt(Utc::now()))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(db)
            .await?)
    }

    /// Releases ACTIVE reservations whose expiry has passed.
    ///
    /// Intended to run on an external schedule; idempotent and safe to call
    /// at any frequency, since released reservations drop out of the filter.
    #[instrument(skip(self))]
    pub async fn release_expired_reservations(&self) -> Result<ExpirySweepResult, ServiceError> {
        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await?;

        let expired = ReservationEntity::find()
            .filter(reservation::Column::ExpiresAt.lt(now))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .all(&txn)
            .await?;

        let mut released_count = 0u64;
        for reservation in expired {
            let id = reservation.id;
            let mut model: reservation::ActiveModel = reservation.into();
            model.status = Set(ReservationStatus::Released.as_str().to_string());
            model.update(&txn).await?;
            released_count += 1;

            info!(reservation_id = %id, "Expired reservation released");
        }

        txn.commit().await?;

        info!(released_count = released_count, "Expired reservation sweep completed");

        if released_count > 0 {
            self.emit(Event::ExpiredReservationsReleased { released_count })
                .await;
        }

        Ok(ExpirySweepResult {
            released_count,
            swept_at: now,
        })
    }

    async fn load<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
    ) -> Result<reservation::Model, ServiceError> {
        ReservationEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Reservation {} not found", id)))
    }

    async fn transition<C: ConnectionTrait>(
        conn: &C,
        id: Uuid,
        to: ReservationStatus,
    ) -> Result<reservation::Model, ServiceError> {
        let reservation = Self::load(conn, id).await?;

        let current = reservation.status().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "Reservation {} has unknown status \"{}\"",
                id, reservation.status
            ))
        })?;

        if current != ReservationStatus::Active {
            return Err(ServiceError::InvalidReservationState {
                reservation_id: id,
                current,
            });
        }

        let mut model: reservation::ActiveModel = reservation.into();
        model.status = Set(to.as_str().to_string());

        Ok(model.update(conn).await?)
    }

    async fn emit(&self, event: Event) {
        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(event).await {
                warn!(error = %e, "Failed to send reservation event");
            }
        }
    }
}
