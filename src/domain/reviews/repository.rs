//! Reviews Repository

use jiff_sqlx::Timestamp as SqlxTimestamp;
use sqlx::{FromRow, Postgres, Row, Transaction, postgres::PgRow, query, query_as, query_scalar};

use crate::{
    auth::UserUuid,
    database::try_get_amount,
    domain::{
        pagination::Page,
        products::models::ProductUuid,
        reviews::models::{RatingBucket, Review, ReviewUuid},
    },
};

const LIST_REVIEWS_SQL: &str = include_str!("sql/list_reviews.sql");
const COUNT_REVIEWS_SQL: &str = include_str!("sql/count_reviews.sql");
const RATING_DISTRIBUTION_SQL: &str = include_str!("sql/rating_distribution.sql");
const GET_REVIEW_SQL: &str = include_str!("sql/get_review.sql");
const INSERT_REVIEW_SQL: &str = include_str!("sql/insert_review.sql");
const UPDATE_REVIEW_SQL: &str = include_str!("sql/update_review.sql");
const DELETE_REVIEW_SQL: &str = include_str!("sql/delete_review.sql");
const HAS_DELIVERED_PURCHASE_SQL: &str = include_str!("sql/has_delivered_purchase.sql");
const REFRESH_PRODUCT_RATING_SQL: &str = include_str!("sql/refresh_product_rating.sql");

#[derive(Debug, Clone, Default)]
pub(crate) struct PgReviewsRepository;

impl PgReviewsRepository {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) async fn list_reviews(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        page: Page,
    ) -> Result<Vec<Review>, sqlx::Error> {
        query_as::<Postgres, Review>(LIST_REVIEWS_SQL)
            .bind(product.into_uuid())
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn count_reviews(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<u64, sqlx::Error> {
        let total: i64 = query_scalar(COUNT_REVIEWS_SQL)
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await?;

        Ok(total.max(0) as u64)
    }

    pub(crate) async fn rating_distribution(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<Vec<RatingBucket>, sqlx::Error> {
        query_as::<Postgres, RatingBucket>(RATING_DISTRIBUTION_SQL)
            .bind(product.into_uuid())
            .fetch_all(&mut **tx)
            .await
    }

    pub(crate) async fn get_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        review: ReviewUuid,
    ) -> Result<Review, sqlx::Error> {
        query_as::<Postgres, Review>(GET_REVIEW_SQL)
            .bind(review.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn insert_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        review: &Review,
    ) -> Result<Review, sqlx::Error> {
        query_as::<Postgres, Review>(INSERT_REVIEW_SQL)
            .bind(review.uuid.into_uuid())
            .bind(review.user_uuid.into_uuid())
            .bind(review.product_uuid.into_uuid())
            .bind(i16::from(review.rating))
            .bind(review.title.as_deref())
            .bind(review.comment.as_deref())
            .bind(review.is_verified_purchase)
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn update_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        review: &Review,
    ) -> Result<Review, sqlx::Error> {
        query_as::<Postgres, Review>(UPDATE_REVIEW_SQL)
            .bind(review.uuid.into_uuid())
            .bind(i16::from(review.rating))
            .bind(review.title.as_deref())
            .bind(review.comment.as_deref())
            .fetch_one(&mut **tx)
            .await
    }

    pub(crate) async fn delete_review(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        review: ReviewUuid,
    ) -> Result<u64, sqlx::Error> {
        let rows_affected = query(DELETE_REVIEW_SQL)
            .bind(review.into_uuid())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        Ok(rows_affected)
    }

    /// Whether the user has a delivered order containing the product.
    pub(crate) async fn has_delivered_purchase(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
        product: ProductUuid,
    ) -> Result<bool, sqlx::Error> {
        query_scalar(HAS_DELIVERED_PURCHASE_SQL)
            .bind(user.into_uuid())
            .bind(product.into_uuid())
            .fetch_one(&mut **tx)
            .await
    }

    /// Recompute the product's cached `average_rating` and `review_count`
    /// from scratch.
    pub(crate) async fn refresh_product_rating(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
    ) -> Result<(), sqlx::Error> {
        query(REFRESH_PRODUCT_RATING_SQL)
            .bind(product.into_uuid())
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

impl<'r> FromRow<'r, PgRow> for Review {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let rating_i16: i16 = row.try_get("rating")?;

        let rating = u8::try_from(rating_i16).map_err(|e| sqlx::Error::ColumnDecode {
            index: "rating".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: ReviewUuid::from_uuid(row.try_get("uuid")?),
            user_uuid: UserUuid::from_uuid(row.try_get("user_uuid")?),
            product_uuid: ProductUuid::from_uuid(row.try_get("product_uuid")?),
            rating,
            title: row.try_get("title")?,
            comment: row.try_get("comment")?,
            is_verified_purchase: row.try_get("is_verified_purchase")?,
            created_at: row.try_get::<SqlxTimestamp, _>("created_at")?.to_jiff(),
            updated_at: row.try_get::<SqlxTimestamp, _>("updated_at")?.to_jiff(),
        })
    }
}

impl<'r> FromRow<'r, PgRow> for RatingBucket {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let rating_i16: i16 = row.try_get("rating")?;

        let rating = u8::try_from(rating_i16).map_err(|e| sqlx::Error::ColumnDecode {
            index: "rating".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            rating,
            count: try_get_amount(row, "count")?,
        })
    }
}
