use crate::{
    entities::commerce::{category, product, Category, CategoryModel, Product, ProductModel},
    errors::ServiceError,
    repositories::{repo, Page, PageRequest, SortOrder},
    services::validate_amount,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Name,
    Price,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CategorySort {
    #[default]
    Name,
    CreatedAt,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, message = "stock_quantity must not be negative"))]
    pub stock_quantity: i32,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(custom = "validate_amount")]
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "stock_quantity must not be negative"))]
    pub stock_quantity: Option<i32>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Product catalog service for managing products and categories
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DatabaseConnection>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new product
    #[instrument(skip(self))]
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            stock_quantity: Set(input.stock_quantity),
            category_id: Set(input.category_id),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let product = repo::<Product, _>(&*self.db).insert(product).await?;
        info!("Created product: {}", product.id);
        Ok(product)
    }

    /// Get a live product
    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        repo::<Product, _>(&*self.db).get(product_id).await
    }

    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: PageRequest,
        sort_by: ProductSort,
        sort_order: SortOrder,
    ) -> Result<Page<ProductModel>, ServiceError> {
        let column = match sort_by {
            ProductSort::Name => product::Column::Name,
            ProductSort::Price => product::Column::Price,
        };
        repo::<Product, _>(&*self.db)
            .list(page, Some((column, sort_order)))
            .await
    }

    /// Update an existing product
    #[instrument(skip(self))]
    pub async fn update_product(
        &self,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<ProductModel, ServiceError> {
        input.validate()?;
        let products = repo::<Product, _>(&*self.db);
        let product = products.get(product_id).await?;
        if let Some(category_id) = input.category_id {
            self.get_category(category_id).await?;
        }

        let mut active: product::ActiveModel = product.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(stock_quantity) = input.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(Some(category_id));
        }
        active.updated_at = Set(Utc::now());

        let updated = products.update(active).await?;
        info!("Updated product: {}", product_id);
        Ok(updated)
    }

    /// Soft-deletes a product; existing order items keep referencing it.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: Uuid) -> Result<(), ServiceError> {
        repo::<Product, _>(&*self.db).soft_delete(product_id).await?;
        info!("Deleted product: {}", product_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        input: CreateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;

        let now = Utc::now();
        let category = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let category = repo::<Category, _>(&*self.db).insert(category).await?;
        info!("Created category: {}", category.id);
        Ok(category)
    }

    pub async fn get_category(&self, category_id: Uuid) -> Result<CategoryModel, ServiceError> {
        repo::<Category, _>(&*self.db).get(category_id).await
    }

    pub async fn list_categories(
        &self,
        page: PageRequest,
        sort_by: CategorySort,
        sort_order: SortOrder,
    ) -> Result<Page<CategoryModel>, ServiceError> {
        let column = match sort_by {
            CategorySort::Name => category::Column::Name,
            CategorySort::CreatedAt => category::Column::CreatedAt,
        };
        repo::<Category, _>(&*self.db)
            .list(page, Some((column, sort_order)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        input.validate()?;
        let categories = repo::<Category, _>(&*self.db);
        let category = categories.get(category_id).await?;

        let mut active: category::ActiveModel = category.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        active.updated_at = Set(Utc::now());

        categories.update(active).await
    }

    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), ServiceError> {
        repo::<Category, _>(&*self.db).soft_delete(category_id).await?;
        info!("Deleted category: {}", category_id);
        Ok(())
    }
}
