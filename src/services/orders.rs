use crate::{
    entities::{
        commerce::{product, Customer, Product},
        order, order_item, Order, OrderItem,
    },
    errors::ServiceError,
    repositories::{repo, Page, PageRequest, SortOrder},
    services::{line_subtotal, order_total, validate_amount},
};
use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Fields an order listing can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OrderSort {
    #[default]
    CreatedAt,
    TotalPrice,
}

impl OrderSort {
    fn column(self) -> order::Column {
        match self {
            OrderSort::CreatedAt => order::Column::CreatedAt,
            OrderSort::TotalPrice => order::Column::TotalPrice,
        }
    }
}

/// One priced line of an order about to be placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct OrderLine {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be greater than zero"))]
    pub quantity: i32,
    #[validate(custom = "validate_amount")]
    pub price_at_order: Decimal,
}

impl OrderLine {
    /// `price_at_order × quantity`; a `ValidationError` when out of range
    pub fn subtotal(&self) -> Result<Decimal, ServiceError> {
        line_subtotal(self.price_at_order, self.quantity)
    }
}

/// Input for `POST /orders`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub customer_id: Uuid,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    #[validate]
    pub order_items: Vec<OrderLine>,
}

/// An order together with its items
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Inserts an order and its items, decrementing stock for every line.
///
/// Must run inside a transaction: a failure part-way leaves earlier stock
/// decrements behind for the caller's rollback to undo. `missing_product`
/// builds the error for a product that is gone or soft-deleted.
pub(crate) async fn place_order<C, F>(
    conn: &C,
    customer_id: Uuid,
    lines: &[OrderLine],
    missing_product: F,
) -> Result<OrderWithItems, ServiceError>
where
    C: ConnectionTrait,
    F: Fn(Uuid) -> ServiceError,
{
    let subtotals = lines
        .iter()
        .map(OrderLine::subtotal)
        .collect::<Result<Vec<_>, _>>()?;
    let total = order_total(subtotals.iter().copied())?;

    for line in lines {
        reserve_stock(conn, line, &missing_product).await?;
    }

    let now = Utc::now();
    let order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        total_price: Set(total),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(conn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (line, subtotal) in lines.iter().zip(subtotals) {
        let item = order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            price_at_order: Set(line.price_at_order),
            subtotal: Set(subtotal),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
        items.push(item);
    }

    Ok(OrderWithItems { order, items })
}

/// Conditional decrement: succeeds only while the product is live and has
/// enough stock, so concurrent orders can never drive stock negative.
async fn reserve_stock<C, F>(
    conn: &C,
    line: &OrderLine,
    missing_product: &F,
) -> Result<(), ServiceError>
where
    C: ConnectionTrait,
    F: Fn(Uuid) -> ServiceError,
{
    let result = Product::update_many()
        .col_expr(
            product::Column::StockQuantity,
            Expr::col(product::Column::StockQuantity).sub(line.quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(line.product_id))
        .filter(product::Column::DeletedAt.is_null())
        .filter(product::Column::StockQuantity.gte(line.quantity))
        .exec(conn)
        .await?;

    if result.rows_affected > 0 {
        return Ok(());
    }

    match repo::<Product, _>(conn).find_active(line.product_id).await? {
        None => Err(missing_product(line.product_id)),
        Some(product) => Err(ServiceError::InsufficientStock(format!(
            "product {} has {} left, {} requested",
            product.id, product.stock_quantity, line.quantity
        ))),
    }
}

/// Order service: direct order placement and order queries
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Places an order from explicit items.
    ///
    /// `caller_customer_id` is the customer linked to the authenticated user;
    /// orders can only be placed for that customer.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_order(
        &self,
        caller_customer_id: Option<Uuid>,
        input: CreateOrderInput,
    ) -> Result<OrderWithItems, ServiceError> {
        input.validate()?;

        // Ownership first, so foreign customer ids reveal nothing about
        // which customers exist
        if caller_customer_id != Some(input.customer_id) {
            warn!(
                customer_id = %input.customer_id,
                "order placement for a customer not linked to the caller"
            );
            return Err(ServiceError::Forbidden(
                "Orders can only be placed for your own customer".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        repo::<Customer, _>(&txn).get(input.customer_id).await?;

        let placed = place_order(
            &txn,
            input.customer_id,
            &input.order_items,
            ServiceError::product_not_found,
        )
        .await?;

        txn.commit().await?;

        counter!("orders_created", 1);
        info!(
            order_id = %placed.order.id,
            total = %placed.order.total_price,
            "Order created"
        );
        Ok(placed)
    }

    /// Lists live orders
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: PageRequest,
        sort_by: OrderSort,
        sort_order: SortOrder,
    ) -> Result<Page<order::Model>, ServiceError> {
        repo::<Order, _>(&*self.db)
            .list(page, Some((sort_by.column(), sort_order)))
            .await
    }

    /// Gets a live order with its items
    #[instrument(skip(self))]
    pub async fn get_order(&self, id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = repo::<Order, _>(&*self.db).get(id).await?;
        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order.id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Soft-deletes an order; its items stay attached and hidden with it.
    #[instrument(skip(self))]
    pub async fn delete_order(&self, id: Uuid) -> Result<(), ServiceError> {
        repo::<Order, _>(&*self.db).soft_delete(id).await?;
        info!("Order {} deleted", id);
        Ok(())
    }
}
