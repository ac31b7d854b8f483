use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::category::{self, Entity as CategoryEntity};
use crate::errors::ServiceError;

/// Fields that can be changed on an existing category.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

/// Service for managing product categories.
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<category::Model, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Category name must not be empty".to_string(),
            ));
        }

        let db = &*self.db_pool;

        let existing = CategoryEntity::find()
            .filter(category::Column::Name.eq(name))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Category \"{}\" already exists",
                name
            )));
        }

        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            description: Set(description.map(str::to_string)),
            ..Default::default()
        };

        let created = model.insert(db).await?;

        info!(category_id = %created.id, name = %created.name, "Category created");

        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        let db = &*self.db_pool;

        CategoryEntity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<category::Model>, ServiceError> {
        let db = &*self.db_pool;

        Ok(CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await?)
    }

    #[instrument(skip(self, update))]
    pub async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
    ) -> Result<category::Model, ServiceError> {
        let category = self.get_category(id).await?;

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Category name must not be empty".to_string(),
                ));
            }
        }

        let db = &*self.db_pool;
        let mut active: category::ActiveModel = category.into();
        if let Some(name) = update.name {
            active.name = Set(name);
        }
        if let Some(description) = update.description {
            active.description = Set(description);
        }

        Ok(active.update(db).await?)
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_category(id).await?;

        let db = &*self.db_pool;
        let result = CategoryEntity::delete_by_id(id).exec(db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Category {} not found", id)));
        }

        info!(category_id = %id, "Category deleted");

        Ok(())
    }
}
