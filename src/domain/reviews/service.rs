//! Reviews service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use tracing::info;

use crate::{
    auth::Identity,
    database::Db,
    domain::{
        pagination::{Page, Paginated},
        products::{models::ProductUuid, repository::PgProductsRepository},
        reviews::{
            errors::ReviewsServiceError,
            models::{
                MAX_COMMENT_LEN, MAX_TITLE_LEN, NewReview, ProductReviews, Review, ReviewUpdate,
                ReviewUuid,
            },
            repository::PgReviewsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgReviewsService {
    db: Db,
    reviews_repository: PgReviewsRepository,
    products_repository: PgProductsRepository,
}

impl PgReviewsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            reviews_repository: PgReviewsRepository::new(),
            products_repository: PgProductsRepository::new(),
        }
    }
}

#[async_trait]
impl ReviewsService for PgReviewsService {
    async fn list_product_reviews(
        &self,
        product: ProductUuid,
        page: Page,
    ) -> Result<ProductReviews, ReviewsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let reviews = self
            .reviews_repository
            .list_reviews(&mut tx, product, page)
            .await?;
        let total = self.reviews_repository.count_reviews(&mut tx, product).await?;
        let rating_distribution = self
            .reviews_repository
            .rating_distribution(&mut tx, product)
            .await?;

        tx.commit().await?;

        Ok(ProductReviews {
            reviews: Paginated::new(reviews, total, page),
            rating_distribution,
        })
    }

    async fn add_review(
        &self,
        identity: &Identity,
        product: ProductUuid,
        review: NewReview,
    ) -> Result<Review, ReviewsServiceError> {
        validate_review(review.rating, review.title.as_deref(), review.comment.as_deref())?;

        let mut tx = self.db.begin_transaction().await?;

        self.products_repository
            .get_product(&mut tx, product)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => ReviewsServiceError::ProductNotFound,
                other => other.into(),
            })?;

        // The review counts as a verified purchase when a delivered order of
        // the reviewer contains this product.
        let is_verified_purchase = self
            .reviews_repository
            .has_delivered_purchase(&mut tx, identity.user_uuid, product)
            .await?;

        let now = Timestamp::now();

        let created = self
            .reviews_repository
            .insert_review(
                &mut tx,
                &Review {
                    uuid: review.uuid,
                    user_uuid: identity.user_uuid,
                    product_uuid: product,
                    rating: review.rating,
                    title: review.title,
                    comment: review.comment,
                    is_verified_purchase,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;

        self.reviews_repository
            .refresh_product_rating(&mut tx, product)
            .await?;

        tx.commit().await?;

        info!(product = %product, rating = created.rating, "review added");

        Ok(created)
    }

    async fn update_review(
        &self,
        identity: &Identity,
        review: ReviewUuid,
        update: ReviewUpdate,
    ) -> Result<Review, ReviewsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let mut current = self.reviews_repository.get_review(&mut tx, review).await?;

        if current.user_uuid != identity.user_uuid {
            return Err(ReviewsServiceError::Forbidden);
        }

        update.apply_to(&mut current);

        validate_review(
            current.rating,
            current.title.as_deref(),
            current.comment.as_deref(),
        )?;

        let updated = self.reviews_repository.update_review(&mut tx, &current).await?;

        self.reviews_repository
            .refresh_product_rating(&mut tx, updated.product_uuid)
            .await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_review(
        &self,
        identity: &Identity,
        review: ReviewUuid,
    ) -> Result<(), ReviewsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let current = self.reviews_repository.get_review(&mut tx, review).await?;

        if current.user_uuid != identity.user_uuid && !identity.is_admin() {
            return Err(ReviewsServiceError::Forbidden);
        }

        self.reviews_repository.delete_review(&mut tx, review).await?;

        self.reviews_repository
            .refresh_product_rating(&mut tx, current.product_uuid)
            .await?;

        tx.commit().await?;

        Ok(())
    }
}

fn validate_review(
    rating: u8,
    title: Option<&str>,
    comment: Option<&str>,
) -> Result<(), ReviewsServiceError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewsServiceError::InvalidRating);
    }

    if title.is_some_and(|t| t.len() > MAX_TITLE_LEN)
        || comment.is_some_and(|c| c.len() > MAX_COMMENT_LEN)
    {
        return Err(ReviewsServiceError::InvalidData);
    }

    Ok(())
}

#[automock]
#[async_trait]
pub trait ReviewsService: Send + Sync {
    /// A page of a product's reviews plus the star distribution.
    async fn list_product_reviews(
        &self,
        product: ProductUuid,
        page: Page,
    ) -> Result<ProductReviews, ReviewsServiceError>;

    /// Add a review for a product; one per user per product.
    async fn add_review(
        &self,
        identity: &Identity,
        product: ProductUuid,
        review: NewReview,
    ) -> Result<Review, ReviewsServiceError>;

    /// Edit one's own review.
    async fn update_review(
        &self,
        identity: &Identity,
        review: ReviewUuid,
        update: ReviewUpdate,
    ) -> Result<Review, ReviewsServiceError>;

    /// Remove a review; owner or admin.
    async fn delete_review(
        &self,
        identity: &Identity,
        review: ReviewUuid,
    ) -> Result<(), ReviewsServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        for rating in [0, 6, 10] {
            assert!(matches!(
                validate_review(rating, None, None),
                Err(ReviewsServiceError::InvalidRating)
            ));
        }

        for rating in 1..=5 {
            assert!(validate_review(rating, None, None).is_ok());
        }
    }

    #[test]
    fn overlong_title_and_comment_are_rejected() {
        let title = "t".repeat(MAX_TITLE_LEN + 1);
        let comment = "c".repeat(MAX_COMMENT_LEN + 1);

        assert!(matches!(
            validate_review(5, Some(&title), None),
            Err(ReviewsServiceError::InvalidData)
        ));
        assert!(matches!(
            validate_review(5, None, Some(&comment)),
            Err(ReviewsServiceError::InvalidData)
        ));
    }
}
