//! Carts Repository

use std::str::FromStr;

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as};
use uuid::Uuid;

use crate::{
    auth::UserUuid,
    database::{try_get_amount, try_get_quantity},
    domain::{
        carts::models::{Cart, CartLine, CartProduct, CartUuid, ResolvedCartLine},
        products::models::{ProductUuid, Size},
    },
};

const GET_CART_BY_USER_SQL: &str = include_str!("sql/get_cart_by_user.sql");
const CREATE_CART_SQL: &str = include_str!("sql/create_cart.sql");
const GET_CART_LINES_SQL: &str = include_str!("sql/get_cart_lines.sql");
const GET_RESOLVED_LINES_SQL: &str = include_str!("sql/get_resolved_lines.sql");
const DELETE_CART_LINES_SQL: &str = include_str!("sql/delete_cart_lines.sql");
const INSERT_CART_LINE_SQL: &str = include_str!("sql/insert_cart_line.sql");
const TOUCH_CART_SQL: &str = include_str!("sql/touch_cart.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgCartsRepository;

impl PgCartsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn get_cart_by_user(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Option<Cart>, sqlx::Error> {
        query_as::<Postgres, Cart>(GET_CART_BY_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&mut **tx)
            .await
    }

    pub(crate) async fn create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        user: UserUuid,
    ) -> Result<Cart, sqlx::Error> {
        query_as::<Postgres, Cart>(CREATE_CART_SQL)
            .bind(cart.into_uuid())
            .bind(user.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<CartLine>, sqlx::Error> {
        query_as::<Postgres, CartLine>(GET_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    /// Lines joined against the live catalog; deleted products surface as
    /// `None` snapshots.
    pub(crate) async fn get_resolved_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<Vec<ResolvedCartLine>, sqlx::Error> {
        query_as::<Postgres, ResolvedCartLine>(GET_RESOLVED_LINES_SQL)
            .bind(cart.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    /// Replace the cart's lines wholesale and bump its `updated_at`.
    pub(crate) async fn replace_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
        lines: &[CartLine],
    ) -> Result<(), sqlx::Error> {
        query(DELETE_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        for (position, line) in lines.iter().enumerate() {
            let position = i32::try_from(position).map_err(|e| sqlx::Error::ColumnDecode {
                index: "position".to_string(),
                source: Box::new(e),
            })?;
            let quantity = i32::try_from(line.quantity).map_err(|e| sqlx::Error::ColumnDecode {
                index: "quantity".to_string(),
                source: Box::new(e),
            })?;

            query(INSERT_CART_LINE_SQL)
                .bind(cart.into_uuid())
                .bind(position)
                .bind(line.product_uuid.into_uuid())
                .bind(quantity)
                .bind(line.size.map(Size::as_str))
                .execute(&mut **tx)
                .await?;
        }

        query(TOUCH_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub(crate) async fn clear_lines(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<(), sqlx::Error> {
        query(DELETE_CART_LINES_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        query(TOUCH_CART_SQL)
            .bind(cart.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Cart {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            uuid: CartUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            items: Vec::new(),
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for CartLine {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            quantity: try_get_quantity(row, "quantity")?,
            size: try_get_size(row)?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ResolvedCartLine {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let product = match row.try_get::<Option<Uuid>, _>("p_uuid")? {
            Some(uuid) => Some(CartProduct {
                uuid: ProductUuid::from_uuid(uuid),
                name: row.try_get("p_name")?,
                price: try_get_amount(row, "p_price")?,
                discount_price: row
                    .try_get::<Option<i64>, _>("p_discount_price")?
                    .map(|d| {
                        u64::try_from(d).map_err(|e| sqlx::Error::ColumnDecode {
                            index: "p_discount_price".to_string(),
                            source: Box::new(e),
                        })
                    })
                    .transpose()?,
                stock_quantity: try_get_quantity(row, "p_stock_quantity")?,
                is_active: row.try_get("p_is_active")?,
                image: row.try_get("p_image")?,
            }),
            None => None,
        };

        Ok(Self {
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            quantity: try_get_quantity(row, "quantity")?,
            size: try_get_size(row)?,
            product,
        })
    }
}

fn try_get_size(row: &PgRow) -> sqlx::Result<Option<Size>> {
    row.try_get::<Option<String>, _>("size")?
        .map(|value| {
            Size::from_str(&value).map_err(|e| sqlx::Error::ColumnDecode {
                index: "size".to_string(),
                source: Box::new(e),
            })
        })
        .transpose()
}
