use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::product::{self, Entity as ProductEntity};
use crate::errors::ServiceError;

/// Fields that can be changed on an existing product.
#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<Option<Uuid>>,
    pub is_sellable: Option<bool>,
    pub is_active: Option<bool>,
}

/// Service for managing products.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        name: &str,
        sku: &str,
        category_id: Option<Uuid>,
    ) -> Result<product::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Product name must not be empty".to_string(),
            ));
        }
        if sku.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "SKU must not be empty".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let existing = ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product with SKU \"{}\" already exists",
                sku
            )));
        }

        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            sku: Set(sku.to_string()),
            category_id: Set(category_id),
            is_sellable: Set(true),
            is_active: Set(true),
            ..Default::default()
        };

        let created = model.insert(db).await?;

        info!(product_id = %created.id, sku = %created.sku, "Product created");

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        ProductEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        ProductEntity::find()
            .filter(product::Column::Sku.eq(sku))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with SKU \"{}\" not found", sku)))
    }

    #[instrument(skip(self))]
    pub async fn list_products(&self, active_only: bool) -> Result<Vec<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = ProductEntity::find();
        if active_only {
            query = query.filter(product::Column::IsActive.eq(true));
        }

        Ok(query.order_by_asc(product::Column::Name).all(db).await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update_product(
        &self,
        id: Uuid,
        update: ProductUpdate,
    ) -> Result<product::Model, ServiceError> {
        let product = self.get_product(id).await?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Product name must not be empty".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let mut active: product::ActiveModel = product.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(category_id) = update.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(is_sellable) = update.is_sellable {
            active.is_sellable = Set(is_sellable);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }

        Ok(active.update(db).await?)
    }

    /// Soft-deletes a product by marking it inactive.
    #[instrument(skip(self))]
    pub async fn deactivate_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        self.update_product(
            id,
            ProductUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_product(id).await?;

        let db = &*self.db_pool;
        let result = ProductEntity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Product {} not found", id)));
        }

        info!(product_id = %id, "Product deleted");

        Ok(())
    }
}
