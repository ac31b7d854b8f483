use sea_orm::error::DbErr;
use serde::Serialize;
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::entities::reservation::ReservationStatus;

/// Error type shared by all services.
///
/// Variants carry enough structured detail (ids, requested vs. available
/// quantities, current vs. required status) to be rendered to an operator
/// without re-querying state.
#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock: current {current}, requested {requested}")]
    InsufficientStock { current: i32, requested: i32 },

    #[error(
        "Insufficient available stock for product {product_id} in warehouse {warehouse_id}: \
         requested {requested}, available {available}"
    )]
    InsufficientAvailableStock {
        product_id: Uuid,
        warehouse_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("Order {order_id} is {current}, operation requires {required}")]
    InvalidOrderState {
        order_id: Uuid,
        current: OrderStatus,
        required: &'static str,
    },

    #[error("Reservation {reservation_id} is {current}, operation requires ACTIVE")]
    InvalidReservationState {
        reservation_id: Uuid,
        current: ReservationStatus,
    },

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }
}
