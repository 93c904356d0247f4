//! Orders service.
//!
//! Every operation runs inside a single database transaction, so the order
//! write, the stock movements, and the cart clearing commit or roll back as
//! one unit.

use std::collections::HashMap;

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use rand::rngs::OsRng;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::{
    auth::Identity,
    database::Db,
    domain::{
        carts::repository::PgCartsRepository,
        orders::{
            checkout,
            errors::{FieldError, OrdersServiceError},
            models::{
                MAX_STATUS_NOTE_LEN, NewOrder, Order, OrderFilter, OrderStats, OrderStatus,
                OrderUuid, PaymentStatus, StatusHistoryEntry, StatusUpdate,
            },
            number,
            repository::PgOrdersRepository,
            status::{StatusChange, can_cancel},
        },
        pagination::{Page, Paginated},
    },
};

/// Attempts at a fresh order number before conceding the ledger is against
/// us. A collision needs two placements in the same millisecond drawing the
/// same four-character suffix.
const MAX_NUMBER_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone)]
pub struct PgOrdersService {
    db: Db,
    orders_repository: PgOrdersRepository,
    carts_repository: PgCartsRepository,
}

impl PgOrdersService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            orders_repository: PgOrdersRepository::new(),
            carts_repository: PgCartsRepository::new(),
        }
    }

    async fn unique_order_number(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        now: Timestamp,
    ) -> Result<String, OrdersServiceError> {
        for _ in 0..MAX_NUMBER_ATTEMPTS {
            let candidate = number::generate_order_number(now, &mut OsRng);

            if !self
                .orders_repository
                .order_number_exists(tx, &candidate)
                .await?
            {
                return Ok(candidate);
            }
        }

        Err(OrdersServiceError::AlreadyExists)
    }

    /// Attach items and history to a page of order rows with two grouped
    /// queries.
    async fn hydrate_orders(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        mut orders: Vec<Order>,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        if orders.is_empty() {
            return Ok(orders);
        }

        let uuids: Vec<OrderUuid> = orders.iter().map(|order| order.uuid).collect();

        let slots: HashMap<OrderUuid, usize> = orders
            .iter()
            .enumerate()
            .map(|(index, order)| (order.uuid, index))
            .collect();

        for row in self.orders_repository.items_for_orders(tx, &uuids).await? {
            if let Some(&index) = slots.get(&row.order_uuid)
                && let Some(order) = orders.get_mut(index)
            {
                order.items.push(row.item);
            }
        }

        for row in self
            .orders_repository
            .history_for_orders(tx, &uuids)
            .await?
        {
            if let Some(&index) = slots.get(&row.order_uuid)
                && let Some(order) = orders.get_mut(index)
            {
                order.status_history.push(row.entry);
            }
        }

        Ok(orders)
    }

    async fn load_full_order(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut order = self.orders_repository.get_order(tx, order).await?;

        order.items = self.orders_repository.get_items(tx, order.uuid).await?;
        order.status_history = self.orders_repository.get_history(tx, order.uuid).await?;

        Ok(order)
    }
}

#[async_trait]
impl OrdersService for PgOrdersService {
    async fn place_order(
        &self,
        identity: &Identity,
        new_order: NewOrder,
    ) -> Result<Order, OrdersServiceError> {
        new_order.validate()?;

        let mut tx = self.db.begin_transaction().await?;

        // Steps 1-3: load and validate. Nothing is mutated until the whole
        // cart has priced.
        let cart = self
            .carts_repository
            .get_cart_by_user(&mut tx, identity.user_uuid)
            .await?
            .ok_or(OrdersServiceError::EmptyCart)?;

        let resolved = self
            .carts_repository
            .get_resolved_lines(&mut tx, cart.uuid)
            .await?;

        let priced = checkout::price_cart(&resolved)?;

        let now = Timestamp::now();
        let order_number = self.unique_order_number(&mut tx, now).await?;

        let initial_entry = StatusHistoryEntry {
            status: OrderStatus::Pending,
            note: "Order placed".to_string(),
            occurred_at: now,
        };

        let mut order = Order {
            uuid: OrderUuid::new(),
            order_number,
            user_uuid: identity.user_uuid,
            items: priced.items,
            shipping_address: new_order.shipping_address,
            subtotal: priced.subtotal,
            shipping_cost: priced.shipping_cost,
            total: priced.total,
            payment_method: new_order.payment_method,
            payment_status: PaymentStatus::Pending,
            order_status: OrderStatus::Pending,
            tracking_number: None,
            notes: new_order.notes,
            status_history: vec![initial_entry.clone()],
            delivered_at: None,
            cancelled_at: None,
            created_at: now,
            updated_at: now,
        };

        let (created_at, updated_at) = self
            .orders_repository
            .insert_order(&mut tx, &order)
            .await?;

        order.created_at = created_at;
        order.updated_at = updated_at;

        self.orders_repository
            .insert_items(&mut tx, order.uuid, &order.items)
            .await?;
        self.orders_repository
            .insert_history_entry(&mut tx, order.uuid, &initial_entry)
            .await?;

        // The conditional decrement is the authoritative stock check: a
        // concurrent placement that drained the shelf after pricing affects
        // zero rows here and the whole transaction rolls back.
        for item in &order.items {
            let rows_affected = self
                .orders_repository
                .decrement_stock(&mut tx, item.product_uuid, item.quantity)
                .await?;

            if rows_affected == 0 {
                let (name, available) = self
                    .orders_repository
                    .product_availability(&mut tx, item.product_uuid)
                    .await?
                    .unwrap_or_else(|| (item.name.clone(), 0));

                return Err(OrdersServiceError::InsufficientStock { name, available });
            }
        }

        self.carts_repository.clear_lines(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            user = %order.user_uuid,
            total = order.total,
            "order placed"
        );

        Ok(order)
    }

    async fn get_order(
        &self,
        identity: &Identity,
        order_number: &str,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let mut order = self
            .orders_repository
            .get_order_by_number(&mut tx, order_number)
            .await?;

        if order.user_uuid != identity.user_uuid && !identity.is_admin() {
            return Err(OrdersServiceError::Forbidden);
        }

        order.items = self.orders_repository.get_items(&mut tx, order.uuid).await?;
        order.status_history = self.orders_repository.get_history(&mut tx, order.uuid).await?;

        tx.commit().await?;

        Ok(order)
    }

    async fn list_my_orders(
        &self,
        identity: &Identity,
        page: Page,
    ) -> Result<Paginated<Order>, OrdersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let orders = self
            .orders_repository
            .list_user_orders(&mut tx, identity.user_uuid, page)
            .await?;
        let orders = self.hydrate_orders(&mut tx, orders).await?;

        let total = self
            .orders_repository
            .count_user_orders(&mut tx, identity.user_uuid)
            .await?;

        tx.commit().await?;

        Ok(Paginated::new(orders, total, page))
    }

    async fn list_orders(
        &self,
        identity: &Identity,
        filter: OrderFilter,
        page: Page,
    ) -> Result<Paginated<Order>, OrdersServiceError> {
        if !identity.is_admin() {
            return Err(OrdersServiceError::Forbidden);
        }

        let mut tx = self.db.begin_transaction().await?;

        let orders = self
            .orders_repository
            .list_orders(&mut tx, &filter, page)
            .await?;
        let orders = self.hydrate_orders(&mut tx, orders).await?;

        let total = self.orders_repository.count_orders(&mut tx, &filter).await?;

        tx.commit().await?;

        Ok(Paginated::new(orders, total, page))
    }

    async fn cancel_order(
        &self,
        identity: &Identity,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let mut order = self.load_full_order(&mut tx, order).await?;

        if order.user_uuid != identity.user_uuid {
            return Err(OrdersServiceError::Forbidden);
        }

        if !can_cancel(order.order_status) {
            return Err(OrdersServiceError::InvalidTransition {
                from: order.order_status,
            });
        }

        // Stock goes back line by line. A product deleted since placement is
        // a logged anomaly, not a failed cancellation; the order history
        // outlives the catalog row.
        for item in &order.items {
            let rows_affected = self
                .orders_repository
                .restore_stock(&mut tx, item.product_uuid, item.quantity)
                .await?;

            if rows_affected == 0 {
                warn!(
                    order_number = %order.order_number,
                    product = %item.product_uuid,
                    quantity = item.quantity,
                    "stock restoration skipped; product no longer exists"
                );
            }
        }

        let change = StatusChange::to(
            OrderStatus::Cancelled,
            "Cancelled by customer",
            Timestamp::now(),
        );

        self.orders_repository
            .apply_status_change(&mut tx, order.uuid, &change, None)
            .await?;
        self.orders_repository
            .insert_history_entry(&mut tx, order.uuid, &change.history_entry())
            .await?;

        change.apply_to(&mut order);

        tx.commit().await?;

        info!(order_number = %order.order_number, "order cancelled");

        Ok(order)
    }

    async fn update_status(
        &self,
        identity: &Identity,
        order: OrderUuid,
        update: StatusUpdate,
    ) -> Result<Order, OrdersServiceError> {
        if !identity.is_admin() {
            return Err(OrdersServiceError::Forbidden);
        }

        if update
            .note
            .as_ref()
            .is_some_and(|note| note.len() > MAX_STATUS_NOTE_LEN)
        {
            return Err(OrdersServiceError::Validation(vec![FieldError::new(
                "note",
                format!("must not exceed {MAX_STATUS_NOTE_LEN} characters"),
            )]));
        }

        let mut tx = self.db.begin_transaction().await?;

        let mut order = self.load_full_order(&mut tx, order).await?;

        let change = StatusChange::to(
            update.status,
            update.note.unwrap_or_default(),
            Timestamp::now(),
        );

        self.orders_repository
            .apply_status_change(&mut tx, order.uuid, &change, update.tracking_number.as_deref())
            .await?;
        self.orders_repository
            .insert_history_entry(&mut tx, order.uuid, &change.history_entry())
            .await?;

        if let Some(tracking_number) = update.tracking_number {
            order.tracking_number = Some(tracking_number);
        }

        change.apply_to(&mut order);

        tx.commit().await?;

        Ok(order)
    }

    async fn order_stats(&self, identity: &Identity) -> Result<OrderStats, OrdersServiceError> {
        if !identity.is_admin() {
            return Err(OrdersServiceError::Forbidden);
        }

        let mut tx = self.db.begin_transaction().await?;

        let by_status = self.orders_repository.stats_by_status(&mut tx).await?;
        let today = self.orders_repository.today_stats(&mut tx).await?;

        tx.commit().await?;

        Ok(OrderStats { by_status, today })
    }
}

#[automock]
#[async_trait]
pub trait OrdersService: Send + Sync {
    /// Place an order from the user's cart in one transaction: validate,
    /// price, persist the frozen snapshots, take stock, and empty the cart.
    async fn place_order(
        &self,
        identity: &Identity,
        new_order: NewOrder,
    ) -> Result<Order, OrdersServiceError>;

    /// Fetch one order by its number. Owner or admin only.
    async fn get_order(
        &self,
        identity: &Identity,
        order_number: &str,
    ) -> Result<Order, OrdersServiceError>;

    /// The caller's own orders, newest first.
    async fn list_my_orders(
        &self,
        identity: &Identity,
        page: Page,
    ) -> Result<Paginated<Order>, OrdersServiceError>;

    /// All orders, filtered by status and payment status. Admin only.
    async fn list_orders(
        &self,
        identity: &Identity,
        filter: OrderFilter,
        page: Page,
    ) -> Result<Paginated<Order>, OrdersServiceError>;

    /// Cancel an owned order while it is still Pending or Confirmed,
    /// restoring stock.
    async fn cancel_order(
        &self,
        identity: &Identity,
        order: OrderUuid,
    ) -> Result<Order, OrdersServiceError>;

    /// Transition an order's status, with its side effects. Admin only.
    async fn update_status(
        &self,
        identity: &Identity,
        order: OrderUuid,
        update: StatusUpdate,
    ) -> Result<Order, OrdersServiceError>;

    /// Count and revenue per status, plus today's totals. Admin only.
    async fn order_stats(&self, identity: &Identity) -> Result<OrderStats, OrdersServiceError>;
}
