use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait,
    EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Select,
};
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::ServiceError;

/// Upper bound for `per_page` unless configured otherwise
pub const MAX_PER_PAGE: u64 = 100;
pub const DEFAULT_PER_PAGE: u64 = 10;

/// Entities whose rows are hidden by setting `deleted_at` instead of being removed.
pub trait SoftDelete: EntityTrait {
    /// Human readable name used in error messages
    const LABEL: &'static str;

    fn id_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ServiceError::ValidationError(format!(
                "Invalid sort_order '{}': expected 'asc' or 'desc'",
                other
            ))),
        }
    }
}

impl From<SortOrder> for sea_orm::Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => sea_orm::Order::Asc,
            SortOrder::Desc => sea_orm::Order::Desc,
        }
    }
}

/// Parses an optional `sort_by` value against the fields a listing supports.
pub fn parse_sort_field<T: FromStr>(raw: Option<&str>, default: T) -> Result<T, ServiceError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| {
            ServiceError::ValidationError(format!("Invalid sort_by '{}'", value))
        }),
    }
}

/// Validated 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64, max_per_page: u64) -> Result<Self, ServiceError> {
        if page < 1 {
            return Err(ServiceError::ValidationError(
                "page must be at least 1".to_string(),
            ));
        }
        if per_page < 1 || per_page > max_per_page {
            return Err(ServiceError::ValidationError(format!(
                "per_page must be between 1 and {}",
                max_per_page
            )));
        }
        // The row offset has to fit a signed SQL OFFSET and a usize skip
        (page - 1)
            .checked_mul(per_page)
            .and_then(|offset| i64::try_from(offset).ok())
            .and_then(|offset| usize::try_from(offset).ok())
            .ok_or_else(|| {
                ServiceError::ValidationError(format!("page {} is out of range", page))
            })?;
        Ok(Self { page, per_page })
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.per_page) as usize
    }

    /// Cuts the requested page out of an already sorted, fully loaded list.
    pub fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(self.offset())
            .take(self.per_page as usize)
            .collect();
        Page {
            items,
            total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// One page of a listing plus the totals needed for pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Generic CRUD over a soft-deletable entity, bound to a connection or an
/// open transaction.
pub struct EntityRepository<'c, E, C> {
    conn: &'c C,
    _entity: PhantomData<E>,
}

pub fn repo<E, C>(conn: &C) -> EntityRepository<'_, E, C>
where
    E: SoftDelete,
    C: ConnectionTrait,
{
    EntityRepository {
        conn,
        _entity: PhantomData,
    }
}

impl<'c, E, C> EntityRepository<'c, E, C>
where
    E: SoftDelete,
    E::Model: Sync + 'static,
    C: ConnectionTrait,
{
    /// Rows that have not been soft-deleted
    pub fn live(&self) -> Select<E> {
        E::find().filter(E::deleted_at_column().is_null())
    }

    pub async fn find_active(&self, id: Uuid) -> Result<Option<E::Model>, ServiceError> {
        Ok(self
            .live()
            .filter(E::id_column().eq(id))
            .one(self.conn)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<E::Model, ServiceError> {
        self.find_active(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("{} {} not found", E::LABEL, id)))
    }

    pub async fn list(
        &self,
        page: PageRequest,
        sort: Option<(E::Column, SortOrder)>,
    ) -> Result<Page<E::Model>, ServiceError> {
        self.list_query(self.live(), page, sort).await
    }

    /// Paginates a caller-built query over live rows.
    pub async fn list_query(
        &self,
        query: Select<E>,
        page: PageRequest,
        sort: Option<(E::Column, SortOrder)>,
    ) -> Result<Page<E::Model>, ServiceError> {
        let mut query = query;
        if let Some((column, order)) = sort {
            query = query.order_by(column, order.into());
        }
        let paginator = query
            .order_by_asc(E::id_column())
            .paginate(self.conn, page.per_page);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.page - 1).await?;

        Ok(Page {
            items,
            total,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn insert<A>(&self, model: A) -> Result<E::Model, ServiceError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        model
            .insert(self.conn)
            .await
            .map_err(|e| ServiceError::from_write(e, format!("{} already exists", E::LABEL)))
    }

    pub async fn update<A>(&self, model: A) -> Result<E::Model, ServiceError>
    where
        A: ActiveModelTrait<Entity = E> + ActiveModelBehavior + Send + 'static,
        E::Model: IntoActiveModel<A>,
    {
        model.update(self.conn).await.map_err(|e| {
            ServiceError::from_write(e, format!("{} conflicts with an existing one", E::LABEL))
        })
    }

    /// Marks a live row deleted. Deleting an already deleted row is `NotFound`.
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = E::update_many()
            .col_expr(E::deleted_at_column(), Expr::value(Utc::now()))
            .filter(E::id_column().eq(id))
            .filter(E::deleted_at_column().is_null())
            .exec(self.conn)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "{} {} not found",
                E::LABEL,
                id
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use test_case::test_case;

    #[test_case(0, 10 ; "page zero")]
    #[test_case(1, 0 ; "empty page")]
    #[test_case(1, 101 ; "page too large")]
    fn invalid_page_requests_are_rejected(page: u64, per_page: u64) {
        assert_matches!(
            PageRequest::new(page, per_page, MAX_PER_PAGE),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test_case(u64::MAX, 100 ; "offset overflows u64")]
    #[test_case(u64::MAX / 4, 3 ; "offset exceeds i64")]
    fn pages_beyond_the_addressable_offset_are_rejected(page: u64, per_page: u64) {
        assert_matches!(
            PageRequest::new(page, per_page, MAX_PER_PAGE),
            Err(ServiceError::ValidationError(msg)) if msg.contains("out of range")
        );
    }

    #[test]
    fn largest_addressable_page_is_accepted() {
        let request = PageRequest::new(i64::MAX as u64 / 100 + 1, 100, MAX_PER_PAGE).unwrap();
        assert_eq!(request.offset() as u64, i64::MAX as u64 / 100 * 100);
    }

    #[test]
    fn slice_returns_requested_window_and_total() {
        let request = PageRequest::new(2, 2, MAX_PER_PAGE).unwrap();
        let page = request.slice(vec![1, 2, 3, 4, 5]);

        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages(), 3);
    }

    #[test]
    fn slice_past_the_end_is_empty() {
        let page = PageRequest::new(4, 2, MAX_PER_PAGE).unwrap().slice(vec![1, 2, 3]);
        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn sort_order_parsing() {
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Asc);
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert_matches!(
            "DESC".parse::<SortOrder>(),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[derive(Debug, PartialEq, strum::EnumString)]
    #[strum(serialize_all = "snake_case")]
    enum Field {
        Name,
        CreatedAt,
    }

    #[test]
    fn sort_field_defaults_and_rejects_unknown() {
        assert_eq!(parse_sort_field(None, Field::Name).unwrap(), Field::Name);
        assert_eq!(
            parse_sort_field(Some("created_at"), Field::Name).unwrap(),
            Field::CreatedAt
        );
        assert_matches!(
            parse_sort_field(Some("price"), Field::Name),
            Err(ServiceError::ValidationError(_))
        );
    }
}
