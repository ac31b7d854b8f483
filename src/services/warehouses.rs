use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::warehouse::{self, Entity as WarehouseEntity};
use crate::errors::ServiceError;

/// Fields that can be changed on an existing warehouse.
#[derive(Debug, Clone, Default)]
pub struct WarehouseUpdate {
    pub name: Option<String>,
    pub shipping_enabled: Option<bool>,
    pub is_active: Option<bool>,
}

/// Service for managing warehouses.
#[derive(Clone)]
pub struct WarehouseService {
    db_pool: Arc<DbPool>,
}

impl WarehouseService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create_warehouse(
        &self,
        name: &str,
        shipping_enabled: bool,
    ) -> Result<warehouse::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Warehouse name must not be empty".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let model = warehouse::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            shipping_enabled: Set(shipping_enabled),
            is_active: Set(true),
            ..Default::default()
        };

        let created = model.insert(db).await?;

        info!(warehouse_id = %created.id, name = %created.name, "Warehouse created");

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        let db = &*self.db_pool;

        WarehouseEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Warehouse {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_warehouses(
        &self,
        active_only: bool,
    ) -> Result<Vec<warehouse::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = WarehouseEntity::find();
        if active_only {
            query = query.filter(warehouse::Column::IsActive.eq(true));
        }

        Ok(query.order_by_asc(warehouse::Column::Name).all(db).await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update_warehouse(
        &self,
        id: Uuid,
        update: WarehouseUpdate,
    ) -> Result<warehouse::Model, ServiceError> {
        let warehouse = self.get_warehouse(id).await?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Warehouse name must not be empty".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let mut active: warehouse::ActiveModel = warehouse.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(shipping_enabled) = update.shipping_enabled {
            active.shipping_enabled = Set(shipping_enabled);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(db).await?)
    }

    /// Soft delete: the warehouse stays addressable for historical stock
    /// entries and transactions.
    #[instrument(skip(self))]
    pub async fn deactivate_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        self.update_warehouse(
            id,
            WarehouseUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn activate_warehouse(&self, id: Uuid) -> Result<warehouse::Model, ServiceError> {
        self.update_warehouse(
            id,
            WarehouseUpdate {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_warehouse(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_warehouse(id).await?;

        let db = &*self.db_pool;
        let result = WarehouseEntity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Warehouse {} not found",
                id
            )));
        }

        info!(warehouse_id = %id, "Warehouse deleted");

        Ok(())
    }
}
