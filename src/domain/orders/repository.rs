//! Orders Repository

use std::str::FromStr;

use jiff::Timestamp;
use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};
use uuid::Uuid;

use crate::{
    auth::UserUuid,
    database::{try_get_amount, try_get_quantity},
    domain::{
        orders::{
            models::{
                Order, OrderFilter, OrderItem, OrderStatus, OrderUuid, PaymentMethod,
                PaymentStatus, ShippingAddress, StatusBucket, StatusHistoryEntry, TodayStats,
            },
            status::StatusChange,
        },
        pagination::Page,
        products::models::{ProductUuid, Size},
    },
};

const INSERT_ORDER_SQL: &str = include_str!("sql/insert_order.sql");
const INSERT_ORDER_ITEM_SQL: &str = include_str!("sql/insert_order_item.sql");
const INSERT_STATUS_HISTORY_SQL: &str = include_str!("sql/insert_status_history.sql");
const ORDER_NUMBER_EXISTS_SQL: &str = include_str!("sql/order_number_exists.sql");
const GET_ORDER_SQL: &str = include_str!("sql/get_order.sql");
const GET_ORDER_BY_NUMBER_SQL: &str = include_str!("sql/get_order_by_number.sql");
const GET_ORDER_ITEMS_SQL: &str = include_str!("sql/get_order_items.sql");
const GET_STATUS_HISTORY_SQL: &str = include_str!("sql/get_status_history.sql");
const ITEMS_FOR_ORDERS_SQL: &str = include_str!("sql/items_for_orders.sql");
const HISTORY_FOR_ORDERS_SQL: &str = include_str!("sql/history_for_orders.sql");
const LIST_USER_ORDERS_SQL: &str = include_str!("sql/list_user_orders.sql");
const COUNT_USER_ORDERS_SQL: &str = include_str!("sql/count_user_orders.sql");
const LIST_ORDERS_SQL: &str = include_str!("sql/list_orders.sql");
const COUNT_ORDERS_SQL: &str = include_str!("sql/count_orders.sql");
const APPLY_STATUS_CHANGE_SQL: &str = include_str!("sql/apply_status_change.sql");
const DECREMENT_STOCK_SQL: &str = include_str!("sql/decrement_stock.sql");
const RESTORE_STOCK_SQL: &str = include_str!("sql/restore_stock.sql");
const PRODUCT_AVAILABILITY_SQL: &str = include_str!("sql/product_availability.sql");
const STATS_BY_STATUS_SQL: &str = include_str!("sql/stats_by_status.sql");
const TODAY_STATS_SQL: &str = include_str!("sql/today_stats.sql");

/// An order item tagged with its owning order, for grouped list loads.
#[derive(Debug, Clone)]
pub(crate) struct OrderItemRow {
    pub order_uuid: OrderUuid,
    pub item: OrderItem,
}

/// A history entry tagged with its owning order.
#[derive(Debug, Clone)]
pub(crate) struct HistoryRow {
    pub order_uuid: OrderUuid,
    pub entry: StatusHistoryEntry,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PgOrdersRepository;

impl PgOrdersRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    /// Insert the order row; items and history are inserted separately.
    /// Returns the stored `(created_at, updated_at)` pair.
    pub(crate) async fn insert_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<(Timestamp, Timestamp), sqlx::Error> {
        let (created_at, updated_at): (SqlxTimestamp, SqlxTimestamp) =
            query_as(INSERT_ORDER_SQL)
                .bind(order.uuid.into_uuid())
                .bind(&order.order_number)
                .bind(order.user_uuid.into_uuid())
                .bind(&order.shipping_address.full_name)
                .bind(&order.shipping_address.street)
                .bind(&order.shipping_address.city)
                .bind(&order.shipping_address.province)
                .bind(order.shipping_address.postal_code.as_deref())
                .bind(&order.shipping_address.phone)
                .bind(bind_amount(order.subtotal, "subtotal")?)
                .bind(bind_amount(order.shipping_cost, "shipping_cost")?)
                .bind(bind_amount(order.total, "total")?)
                .bind(order.payment_method.as_str())
                .bind(order.payment_status.as_str())
                .bind(order.order_status.as_str())
                .bind(order.notes.as_deref())
                .fetch_one(&mut **tx)
                .await?;

        Ok((created_at.to_jiff(), updated_at.to_jiff()))
    }

    pub(crate) async fn insert_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        items: &[OrderItem],
    ) -> Result<(), sqlx::Error> {
        for (position, item) in items.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| sqlx::Error::ColumnDecode {
                index: "position".to_string(),
                source: Box::new(e),
            })?;
            let quantity = i32::try_from(item.quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?;

            query(INSERT_ORDER_ITEM_SQL)
                .bind(order.into_uuid())
                .bind(position)
                .bind(item.product_uuid.into_uuid())
                .bind(&item.name)
                .bind(bind_amount(item.unit_price, "unit_price")?)
                .bind(quantity)
                .bind(item.size.map(Size::as_str))
                .bind(&item.image)
                .execute(&mut **tx)
                .await?;
        }

        Ok(())
    }

    pub(crate) async fn insert_history_entry(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        entry: &StatusHistoryEntry,
    ) -> Result<(), sqlx::Error> {
        query(INSERT_STATUS_HISTORY_SQL)
            .bind(order.into_uuid())
            .bind(entry.status.as_str())
            .bind(&entry.note)
            .bind(SqlxTimestamp::from(entry.occurred_at))
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn order_number_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_number: &str,
    ) -> Result<bool, sqlx::Error> {
        query_scalar(ORDER_NUMBER_EXISTS_SQL)
            .bind(order_number)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(GET_ORDER_SQL)
            .bind(order.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_order_by_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order_number: &str,
    ) -> Result<Order, sqlx::Error> {
        query_as::<Postgres, Order>(GET_ORDER_BY_NUMBER_SQL)
            .bind(order_number)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_items(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<OrderItem>, sqlx::Error> {
        query_as::<Postgres, OrderItem>(GET_ORDER_ITEMS_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_history(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
        query_as::<Postgres, StatusHistoryEntry>(GET_STATUS_HISTORY_SQL)
            .bind(order.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn items_for_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        orders: &[OrderUuid],
    ) -> Result<Vec<OrderItemRow>, sqlx::Error> {
        query_as::<Postgres, OrderItemRow>(ITEMS_FOR_ORDERS_SQL)
            .bind(uuids(orders))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn history_for_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        orders: &[OrderUuid],
    ) -> Result<Vec<HistoryRow>, sqlx::Error> {
        query_as::<Postgres, HistoryRow>(HISTORY_FOR_ORDERS_SQL)
            .bind(uuids(orders))
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn list_user_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        page: Page,
    ) -> Result<Vec<Order>, sqlx::Error> {
        query_as::<Postgres, Order>(LIST_USER_ORDERS_SQL)
            .bind(user.into_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_user_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<u64, sqlx::Error> {
        let total: i64 = query_scalar(COUNT_USER_ORDERS_SQL)
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(total.max(0) as u64)
    }

    pub(crate) async fn list_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &OrderFilter,
        page: Page,
    ) -> Result<Vec<Order>, sqlx::Error> {
        query_as::<Postgres, Order>(LIST_ORDERS_SQL)
            .bind(filter.status.map(OrderStatus::as_str))
            .bind(filter.payment_status.map(PaymentStatus::as_str))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &OrderFilter,
    ) -> Result<u64, sqlx::Error> {
        let total: i64 = query_scalar(COUNT_ORDERS_SQL)
            .bind(filter.status.map(OrderStatus::as_str))
            .bind(filter.payment_status.map(PaymentStatus::as_str))
            .fetch_one(&mut **tx)
            .await?;

        Ok(total.max(0) as u64)
    }

    /// Apply a computed status change to the order row. The matching history
    /// entry is inserted separately.
    pub(crate) async fn apply_status_change(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
        change: &StatusChange,
        tracking_number: Option<&str>,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(APPLY_STATUS_CHANGE_SQL)
            .bind(order.into_uuid())
            .bind(change.status.as_str())
            .bind(tracking_number)
            .bind(change.delivered_at.map(SqlxTimestamp::from))
            .bind(change.cancelled_at.map(SqlxTimestamp::from))
            .bind(change.payment_status.map(PaymentStatus::as_str))
            .bind(SqlxTimestamp::from(change.occurred_at))
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Conditionally take stock: affects zero rows when the shelf is short,
    /// which aborts the placement.
    pub(crate) async fn decrement_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let quantity = i32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        let rows_affected = query(DECREMENT_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(quantity)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Put stock back on cancellation. Affects zero rows when the product
    /// has been deleted since placement.
    pub(crate) async fn restore_stock(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<u64, sqlx::Error> {
        let quantity = i32::try_from(quantity).map_err(|e| sqlx::Error::ColumnDecode {
            index: "quantity".to_string(),
            source: Box::new(e),
        })?;

        let rows_affected = query(RESTORE_STOCK_SQL)
            .bind(product.into_uuid())
            .bind(quantity)
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Name and live stock for an insufficient-stock report.
    pub(crate) async fn product_availability(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Option<(String, u32)>, sqlx::Error> {
        let row = query(PRODUCT_AVAILABILITY_SQL)
            .bind(product.into_uuid())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(|row| {
            let name: String = row.try_get("name")?;
            let available = try_get_quantity(&row, "stock_quantity")?;

            Ok((name, available))
        })
        .transpose()
    }

    pub(crate) async fn stats_by_status(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<Vec<StatusBucket>, sqlx::Error> {
        query_as::<Postgres, StatusBucket>(STATS_BY_STATUS_SQL)
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn today_stats(
        &self,
        tx: &mut Transaction<'_, Postgres>,
    ) -> Result<TodayStats, sqlx::Error> {
        let row = query(TODAY_STATS_SQL).fetch_one(&mut **tx).await?;

        Ok(TodayStats {
            orders: try_get_amount(&row, "orders")?,
            revenue: try_get_amount(&row, "revenue")?,
        })
    }
}

fn uuids(orders: &[OrderUuid]) -> Vec<Uuid> {
    orders.iter().copied().map(OrderUuid::into_uuid).collect()
}

fn bind_amount(amount: u64, index: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(e),
    })
}

impl<'r> FromRow<'r, PgRow> for Order {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: OrderUuid::from_uuid(row.try_get("uuid")?),
            order_number: row.try_get("order_number")?,
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            items: Vec::new(),
            shipping_address: ShippingAddress {
                full_name: row.try_get("ship_full_name")?,
                street: row.try_get("ship_street")?,
                city: row.try_get("ship_city")?,
                province: row.try_get("ship_province")?,
                postal_code: row.try_get("ship_postal_code")?,
                phone: row.try_get("ship_phone")?,
            },
            subtotal: try_get_amount(row, "subtotal")?,
            shipping_cost: try_get_amount(row, "shipping_cost")?,
            total: try_get_amount(row, "total")?,
            payment_method: parse_column::<PaymentMethod>(row, "payment_method")?,
            payment_status: parse_column::<PaymentStatus>(row, "payment_status")?,
            order_status: parse_column::<OrderStatus>(row, "order_status")?,
            tracking_number: row.try_get("tracking_number")?,
            notes: row.try_get("notes")?,
            status_history: Vec::new(),
            delivered_at: row
                .try_get::<Option<SqlxTimestamp>, _>("delivered_at")?
                .map(SqlxTimestamp::to_jiff),
            cancelled_at: row
                .try_get::<Option<SqlxTimestamp>, _>("cancelled_at")?
                .map(SqlxTimestamp::to_jiff),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItem {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let size = row
            .try_get::<Option<String>, _>("size")?
            .map(|value| {
                Size::from_str(&value).map_err(|e| sqlx::Error::ColumnDecode {
                    index: "size".to_string(),
                    source: Box::new(e),
                })
            })
            .transpose()?;

        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            name: row.try_get("name")?,
            unit_price: try_get_amount(row, "unit_price")?,
            quantity: try_get_quantity(row, "quantity")?,
            size,
            image: row.try_get("image")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for StatusHistoryEntry {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            status: parse_column::<OrderStatus>(row, "status")?,
            note: row.try_get("note")?,
            occurred_at: row.try_get::<SqlxTimestamp, _>("occurred_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            item: OrderItem::from_row(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for HistoryRow {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            order_uuid: OrderUuid::from_uuid(row.try_get("order_uuid")?),
            entry: StatusHistoryEntry::from_row(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for StatusBucket {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            status: parse_column::<OrderStatus>(row, "order_status")?,
            count: try_get_amount(row, "count")?,
            revenue: try_get_amount(row, "revenue")?,
        })
    }
}

fn parse_column<T>(row: &PgRow, col: &str) -> sqlx::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: String = row.try_get(col)?;

    T::from_str(&value).map_err(|e| sqlx::Error::ColumnDecode {
        index: col.to_string(),
        source: Box::new(e),
    })
}
