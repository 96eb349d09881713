use crate::{
    entities::commerce::{cart, cart_item, Cart, CartItem, CartModel, Customer, Product},
    errors::ServiceError,
    repositories::{repo, Page, PageRequest, SortOrder},
    services::{checked_total, line_subtotal, locks::CustomerLocks},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::OnConflict, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    SqlErr, TransactionTrait,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Fields a cart listing can be sorted by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CartSort {
    #[default]
    Quantity,
    Subtotal,
}

/// A cart line as returned to clients, with its derived subtotal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

impl TryFrom<cart_item::Model> for CartLine {
    type Error = ServiceError;

    fn try_from(item: cart_item::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            subtotal: line_subtotal(item.unit_price, item.quantity)?,
            id: item.id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
    }
}

/// One page of a cart plus the total of the whole cart
#[derive(Debug, Clone, Serialize)]
pub struct CartContents {
    pub cart_id: Uuid,
    pub items: Page<CartLine>,
    pub total: Decimal,
}

/// Sum of line subtotals; zero for an empty cart.
pub fn cart_total<'a>(
    lines: impl IntoIterator<Item = &'a cart_item::Model>,
) -> Result<Decimal, ServiceError> {
    let subtotals = lines
        .into_iter()
        .map(|line| line_subtotal(line.unit_price, line.quantity))
        .collect::<Result<Vec<_>, _>>()?;
    checked_total(subtotals)
}

/// Sorts lines in place; ties keep insertion order.
pub fn sort_lines(lines: &mut [CartLine], sort_by: CartSort, order: SortOrder) {
    lines.sort_by(|a, b| {
        let ordering = match sort_by {
            CartSort::Quantity => a.quantity.cmp(&b.quantity),
            CartSort::Subtotal => a.subtotal.cmp(&b.subtotal),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// Returns the customer's cart, creating it on first access.
///
/// Relies on the unique `customer_id` index: concurrent callers race on the
/// insert, the loser's insert is a no-op and both read back the same row.
pub(crate) async fn get_or_create_in<C: ConnectionTrait>(
    conn: &C,
    customer_id: Uuid,
) -> Result<CartModel, ServiceError> {
    repo::<Customer, _>(conn).get(customer_id).await?;

    let now = Utc::now();
    let cart = cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Cart::insert(cart)
        .on_conflict(
            OnConflict::column(cart::Column::CustomerId)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Cart::find()
        .filter(cart::Column::CustomerId.eq(customer_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InternalError(format!("Cart for customer {} vanished", customer_id))
        })
}

/// Takes the row lock on a cart for the rest of the transaction. SQLite
/// serializes writers itself and has no `FOR UPDATE`.
pub(crate) async fn lock_cart_row(
    txn: &DatabaseTransaction,
    cart_id: Uuid,
) -> Result<(), ServiceError> {
    if txn.get_database_backend() == DbBackend::Postgres {
        Cart::find_by_id(cart_id).lock_exclusive().one(txn).await?;
    }
    Ok(())
}

/// Lines of a cart in insertion order
pub(crate) async fn lines_of<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<cart_item::Model>, ServiceError> {
    Ok(CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .order_by_asc(cart_item::Column::Id)
        .all(conn)
        .await?)
}

/// Shopping cart service.
///
/// Every mutation runs in its own transaction while holding the customer's
/// lock from [`CustomerLocks`].
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    locks: CustomerLocks,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, locks: CustomerLocks) -> Self {
        Self { db, locks }
    }

    /// Returns the customer's cart, creating an empty one if needed.
    #[instrument(skip(self))]
    pub async fn get_or_create(&self, customer_id: Uuid) -> Result<CartModel, ServiceError> {
        get_or_create_in(&*self.db, customer_id).await
    }

    /// Adds `quantity` of a product to the cart.
    ///
    /// An existing line for the product accumulates and takes the current
    /// product price; otherwise a new line is created at that price.
    /// Writers holding a different [`CustomerLocks`] (another process) are
    /// reconciled by the unique `(cart_id, product_id)` key.
    #[instrument(skip(self))]
    pub async fn add_line(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::invalid_quantity());
        }

        let _guard = self.locks.lock(customer_id).await;
        let txn = self.db.begin().await?;

        let cart = get_or_create_in(&txn, customer_id).await?;
        lock_cart_row(&txn, cart.id).await?;

        let product = repo::<Product, _>(&txn)
            .find_active(product_id)
            .await?
            .ok_or_else(|| ServiceError::product_not_found(product_id))?;

        let line = insert_or_accumulate(&txn, cart.id, product_id, product.price, quantity).await?;

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        info!(
            "Added product {} x{} to cart of customer {}",
            product_id, quantity, customer_id
        );
        line.try_into()
    }

    /// Replaces the quantity of a line and refreshes its unit price.
    #[instrument(skip(self))]
    pub async fn update_line_quantity(
        &self,
        customer_id: Uuid,
        cart_id: Uuid,
        line_id: Uuid,
        quantity: i32,
    ) -> Result<CartLine, ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::invalid_quantity());
        }

        let _guard = self.locks.lock(customer_id).await;
        let txn = self.db.begin().await?;

        let cart = owned_cart(&txn, customer_id, cart_id).await?;
        lock_cart_row(&txn, cart.id).await?;

        let line = CartItem::find_by_id(line_id)
            .filter(cart_item::Column::CartId.eq(cart.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::line_not_found(line_id))?;

        let product = repo::<Product, _>(&txn)
            .find_active(line.product_id)
            .await?
            .ok_or_else(|| ServiceError::product_not_found(line.product_id))?;

        line_subtotal(product.price, quantity)?;
        let mut active: cart_item::ActiveModel = line.into();
        active.quantity = Set(quantity);
        active.unit_price = Set(product.price);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        updated.try_into()
    }

    /// Removes a line from the caller's cart.
    #[instrument(skip(self))]
    pub async fn remove_line(
        &self,
        customer_id: Uuid,
        cart_id: Uuid,
        line_id: Uuid,
    ) -> Result<(), ServiceError> {
        let _guard = self.locks.lock(customer_id).await;
        let txn = self.db.begin().await?;

        let cart = owned_cart(&txn, customer_id, cart_id).await?;
        lock_cart_row(&txn, cart.id).await?;

        let result = CartItem::delete_many()
            .filter(cart_item::Column::Id.eq(line_id))
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::line_not_found(line_id));
        }

        touch_cart(&txn, cart).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Removes every line. Clearing an empty cart is a no-op.
    #[instrument(skip(self))]
    pub async fn clear(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        let _guard = self.locks.lock(customer_id).await;
        let txn = self.db.begin().await?;

        let cart = get_or_create_in(&txn, customer_id).await?;
        lock_cart_row(&txn, cart.id).await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!("Cleared cart: {}", cart.id);
        Ok(())
    }

    /// Current total of the customer's cart
    pub async fn total(&self, customer_id: Uuid) -> Result<Decimal, ServiceError> {
        let cart = self.get_or_create(customer_id).await?;
        let lines = lines_of(&*self.db, cart.id).await?;
        cart_total(&lines)
    }

    /// Lists a page of the customer's cart lines with the whole-cart total.
    #[instrument(skip(self))]
    pub async fn list_lines(
        &self,
        customer_id: Uuid,
        sort_by: CartSort,
        sort_order: SortOrder,
        page: PageRequest,
    ) -> Result<CartContents, ServiceError> {
        let cart = self.get_or_create(customer_id).await?;
        let lines = lines_of(&*self.db, cart.id).await?;
        let total = cart_total(&lines)?;

        let mut lines = lines
            .into_iter()
            .map(CartLine::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        sort_lines(&mut lines, sort_by, sort_order);

        Ok(CartContents {
            cart_id: cart.id,
            items: page.slice(lines),
            total,
        })
    }
}

/// The caller's cart, provided `cart_id` names it.
async fn owned_cart(
    txn: &DatabaseTransaction,
    customer_id: Uuid,
    cart_id: Uuid,
) -> Result<CartModel, ServiceError> {
    let cart = get_or_create_in(txn, customer_id).await?;
    if cart.id != cart_id {
        return Err(ServiceError::NotFound(format!("Cart {} not found", cart_id)));
    }
    Ok(cart)
}

/// Inserts a new line, or accumulates into the existing one when the
/// `(cart_id, product_id)` key is already taken.
///
/// The insert runs under a savepoint so the unique violation leaves the
/// transaction usable, on Postgres as well as SQLite.
async fn insert_or_accumulate(
    txn: &DatabaseTransaction,
    cart_id: Uuid,
    product_id: Uuid,
    unit_price: Decimal,
    quantity: i32,
) -> Result<cart_item::Model, ServiceError> {
    line_subtotal(unit_price, quantity)?;

    let now = Utc::now();
    let new_line = cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        product_id: Set(product_id),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let savepoint = txn.begin().await?;
    match new_line.insert(&savepoint).await {
        Ok(line) => {
            savepoint.commit().await?;
            Ok(line)
        }
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            savepoint.rollback().await?;
            let existing = find_line_for_product(txn, cart_id, product_id)
                .await?
                .ok_or_else(|| {
                    ServiceError::Conflict(
                        "Cart line changed concurrently, retry the request".to_string(),
                    )
                })?;
            accumulate(txn, existing, quantity, unit_price).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_line_for_product(
    txn: &DatabaseTransaction,
    cart_id: Uuid,
    product_id: Uuid,
) -> Result<Option<cart_item::Model>, ServiceError> {
    Ok(CartItem::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(txn)
        .await?)
}

async fn accumulate(
    txn: &DatabaseTransaction,
    line: cart_item::Model,
    quantity: i32,
    unit_price: Decimal,
) -> Result<cart_item::Model, ServiceError> {
    let new_quantity = line.quantity.checked_add(quantity).ok_or_else(|| {
        ServiceError::ValidationError("Quantity exceeds the allowed maximum".to_string())
    })?;
    line_subtotal(unit_price, new_quantity)?;

    let mut active: cart_item::ActiveModel = line.into();
    active.quantity = Set(new_quantity);
    active.unit_price = Set(unit_price);
    active.updated_at = Set(Utc::now());
    Ok(active.update(txn).await?)
}

async fn touch_cart(txn: &DatabaseTransaction, cart: CartModel) -> Result<(), ServiceError> {
    let mut active: cart::ActiveModel = cart.into();
    active.updated_at = Set(Utc::now());
    active.update(txn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(quantity: i32, unit_price: Decimal) -> cart_item::Model {
        let now = Utc::now();
        cart_item::Model {
            id: Uuid::new_v4(),
            cart_id: Uuid::nil(),
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_sums_line_subtotals() {
        let lines = vec![line(2, dec!(10.00)), line(3, dec!(10.00)), line(1, dec!(0.99))];
        assert_eq!(cart_total(&lines).unwrap(), dec!(50.99));
        assert_eq!(cart_total(&Vec::new()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn oversized_lines_are_rejected_instead_of_overflowing() {
        let lines = vec![line(2, Decimal::MAX)];
        assert!(matches!(
            cart_total(&lines),
            Err(ServiceError::ValidationError(_))
        ));
        assert!(CartLine::try_from(line(2, Decimal::MAX)).is_err());
    }

    #[test]
    fn sort_by_subtotal_desc_then_quantity_asc() {
        let mut lines: Vec<CartLine> = vec![
            line(1, dec!(30.00)),
            line(5, dec!(1.00)),
            line(2, dec!(20.00)),
        ]
        .into_iter()
        .map(|item| CartLine::try_from(item).unwrap())
        .collect();

        sort_lines(&mut lines, CartSort::Subtotal, SortOrder::Desc);
        let subtotals: Vec<Decimal> = lines.iter().map(|l| l.subtotal).collect();
        assert_eq!(subtotals, vec![dec!(40.00), dec!(30.00), dec!(5.00)]);

        sort_lines(&mut lines, CartSort::Quantity, SortOrder::Asc);
        let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 5]);
    }

    #[test]
    fn cart_sort_parses_known_fields_only() {
        assert_eq!("subtotal".parse::<CartSort>(), Ok(CartSort::Subtotal));
        assert!("price".parse::<CartSort>().is_err());
    }
}
