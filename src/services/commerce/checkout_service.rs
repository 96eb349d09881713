use crate::{
    entities::commerce::{cart, cart_item, Cart, CartItem},
    errors::ServiceError,
    services::{
        commerce::cart_service::lines_of,
        locks::CustomerLocks,
        orders::{place_order, OrderLine, OrderWithItems},
    },
};
use metrics::counter;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait, QueryFilter,
    QuerySelect, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Checkout service for converting carts to orders
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    locks: CustomerLocks,
}

impl CheckoutService {
    pub fn new(db: Arc<DatabaseConnection>, locks: CustomerLocks) -> Self {
        Self { db, locks }
    }

    /// Converts the customer's cart into an order and empties the cart.
    ///
    /// Runs in one transaction: stock decrements, the order, its items and
    /// the removal of the cart lines commit together or not at all.
    #[instrument(skip(self))]
    pub async fn checkout(&self, customer_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let result = self.checkout_cart(customer_id).await;

        match &result {
            Ok(placed) => {
                counter!("checkouts_completed", 1);
                counter!("orders_created", 1);
                info!(
                    order_id = %placed.order.id,
                    total = %placed.order.total_price,
                    items = placed.items.len(),
                    "Checkout completed"
                );
            }
            Err(err) => {
                counter!("checkouts_failed", 1);
                warn!(error = %err, "Checkout failed");
            }
        }

        result
    }

    async fn checkout_cart(&self, customer_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let _guard = self.locks.lock(customer_id).await;
        let txn = self.db.begin().await?;

        let mut query = Cart::find().filter(cart::Column::CustomerId.eq(customer_id));
        if txn.get_database_backend() == DbBackend::Postgres {
            query = query.lock_exclusive();
        }
        let cart = query.one(&txn).await?.ok_or(ServiceError::EmptyCart)?;

        let lines = lines_of(&txn, cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        // The line's stored unit price becomes the frozen order price.
        let order_lines: Vec<OrderLine> = lines
            .iter()
            .map(|line| OrderLine {
                product_id: line.product_id,
                quantity: line.quantity,
                price_at_order: line.unit_price,
            })
            .collect();

        let placed = place_order(&txn, customer_id, &order_lines, |product_id| {
            ServiceError::Conflict(format!(
                "Product {} is no longer available; update your cart",
                product_id
            ))
        })
        .await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(placed)
    }
}
