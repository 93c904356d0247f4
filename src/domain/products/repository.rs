//! Products Repository

use std::str::FromStr;

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    database::{try_get_amount, try_get_quantity},
    domain::{
        categories::models::CategoryUuid,
        pagination::Page,
        products::models::{
            FabricType, Gender, Product, ProductFilter, ProductUuid, Season, Size,
        },
    },
};

const LIST_PRODUCTS_SQL: &str = include_str!("sql/list_products.sql");
const COUNT_PRODUCTS_SQL: &str = include_str!("sql/count_products.sql");
const GET_PRODUCT_SQL: &str = include_str!("sql/get_product.sql");
const GET_PRODUCT_BY_SLUG_SQL: &str = include_str!("sql/get_product_by_slug.sql");
const SLUG_EXISTS_SQL: &str = include_str!("sql/slug_exists.sql");
const CREATE_PRODUCT_SQL: &str = include_str!("sql/create_product.sql");
const UPDATE_PRODUCT_SQL: &str = include_str!("sql/update_product.sql");
const DELETE_PRODUCT_SQL: &str = include_str!("sql/delete_product.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgProductsRepository;

impl PgProductsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &ProductFilter,
        page: Page,
    ) -> Result<Vec<Product>, sqlx::Error> {
        let (min_price, max_price) = price_bounds(filter)?;

        query_as::<Postgres, Product>(LIST_PRODUCTS_SQL)
            .bind(filter.include_inactive)
            .bind(filter.category.map(CategoryUuid::into_uuid))
            .bind(filter.gender.map(Gender::as_str))
            .bind(filter.fabric_type.map(FabricType::as_str))
            .bind(filter.season.map(Season::as_str))
            .bind(filter.size.map(Size::as_str))
            .bind(min_price)
            .bind(max_price)
            .bind(filter.is_featured)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_products(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        filter: &ProductFilter,
    ) -> Result<u64, sqlx::Error> {
        let (min_price, max_price) = price_bounds(filter)?;

        let total: i64 = query_scalar(COUNT_PRODUCTS_SQL)
            .bind(filter.include_inactive)
            .bind(filter.category.map(CategoryUuid::into_uuid))
            .bind(filter.gender.map(Gender::as_str))
            .bind(filter.fabric_type.map(FabricType::as_str))
            .bind(filter.season.map(Season::as_str))
            .bind(filter.size.map(Size::as_str))
            .bind(min_price)
            .bind(max_price)
            .bind(filter.is_featured)
            .fetch_one(&mut **tx)
            .await?;

        Ok(total.max(0) as u64)
    }

    pub(crate) async fn get_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn get_product_by_slug(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        slug: &str,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(GET_PRODUCT_BY_SLUG_SQL)
            .bind(slug)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn slug_exists(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        slug: &str,
    ) -> Result<bool, sqlx::Error> {
        query_scalar(SLUG_EXISTS_SQL)
            .bind(slug)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn create_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: &Product,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(CREATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(&product.name)
            .bind(&product.slug)
            .bind(product.brand.as_deref())
            .bind(product.category_uuid.into_uuid())
            .bind(product.fabric_type.as_str())
            .bind(size_names(&product.sizes))
            .bind(product.color.as_deref())
            .bind(bind_amount(product.price, "price")?)
            .bind(
                product
                    .discount_price
                    .map(|d| bind_amount(d, "discount_price"))
                    .transpose()?,
            )
            .bind(bind_count(product.stock_quantity, "stock_quantity")?)
            .bind(&product.images)
            .bind(product.description.as_deref())
            .bind(product.season.as_str())
            .bind(product.gender.as_str())
            .bind(product.is_active)
            .bind(product.is_featured)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: &Product,
    ) -> Result<Product, sqlx::Error> {
        query_as::<Postgres, Product>(UPDATE_PRODUCT_SQL)
            .bind(product.uuid.into_uuid())
            .bind(&product.name)
            .bind(&product.slug)
            .bind(product.brand.as_deref())
            .bind(product.category_uuid.into_uuid())
            .bind(product.fabric_type.as_str())
            .bind(size_names(&product.sizes))
            .bind(product.color.as_deref())
            .bind(bind_amount(product.price, "price")?)
            .bind(
                product
                    .discount_price
                    .map(|d| bind_amount(d, "discount_price"))
                    .transpose()?,
            )
            .bind(bind_count(product.stock_quantity, "stock_quantity")?)
            .bind(&product.images)
            .bind(product.description.as_deref())
            .bind(product.season.as_str())
            .bind(product.gender.as_str())
            .bind(product.is_active)
            .bind(product.is_featured)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_product(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_PRODUCT_SQL)
            .bind(product.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }
}

fn price_bounds(filter: &ProductFilter) -> Result<(Option<i64>, Option<i64>), sqlx::Error> {
    let min_price = filter
        .min_price
        .map(|p| bind_amount(p, "min_price"))
        .transpose()?;
    let max_price = filter
        .max_price
        .map(|p| bind_amount(p, "max_price"))
        .transpose()?;

    Ok((min_price, max_price))
}

fn bind_amount(amount: u64, index: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(amount).map_err(|e| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(e),
    })
}

fn bind_count(count: u32, index: &str) -> Result<i32, sqlx::Error> {
    i32::try_from(count).map_err(|e| sqlx::Error::ColumnDecode {
        index: index.to_string(),
        source: Box::new(e),
    })
}

fn size_names(sizes: &[Size]) -> Vec<String> {
    sizes.iter().map(|size| size.as_str().to_string()).collect()
}

impl<'r> FromRow<'r, PgRow> for Product {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let fabric_type = parse_column::<FabricType>(row, "fabric_type")?;
        let season = parse_column::<Season>(row, "season")?;
        let gender = parse_column::<Gender>(row, "gender")?;

        let sizes = row
            .try_get::<Vec<String>, _>("sizes")?
            .iter()
            .map(|value| Size::from_str(value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "sizes".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            uuid: ProductUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            slug: row.try_get("slug")?,
            brand: row.try_get("brand")?,
            category_uuid: CategoryUuid::from_uuid(row.try_get("category_uuid")?),
            fabric_type,
            sizes,
            color: row.try_get("color")?,
            price: try_get_amount(row, "price")?,
            discount_price: row
                .try_get::<Option<i64>, _>("discount_price")?
                .map(|d| {
                    u64::try_from(d).map_err(|e| sqlx::Error::ColumnDecode {
                        index: "discount_price".to_string(),
                        source: Box::new(e),
                    })
                })
                .transpose()?,
            stock_quantity: try_get_quantity(row, "stock_quantity")?,
            images: row.try_get("images")?,
            description: row.try_get("description")?,
            season,
            gender,
            is_active: row.try_get("is_active")?,
            is_featured: row.try_get("is_featured")?,
            average_rating: row.try_get("average_rating")?,
            review_count: try_get_quantity(row, "review_count")?,
            sold_count: try_get_amount(row, "sold_count")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
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
