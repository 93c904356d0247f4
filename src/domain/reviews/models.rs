//! Review Models

use jiff::Timestamp;

use crate::{
    auth::UserUuid,
    domain::{pagination::Paginated, products::models::ProductUuid},
    uuids::TypedUuid,
};

/// Review UUID
pub type ReviewUuid = TypedUuid<Review>;

/// Longest allowed review title.
pub const MAX_TITLE_LEN: usize = 100;

/// Longest allowed review comment.
pub const MAX_COMMENT_LEN: usize = 1000;

/// Review Model
#[derive(Debug, Clone)]
pub struct Review {
    pub uuid: ReviewUuid,
    pub user_uuid: UserUuid,
    pub product_uuid: ProductUuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,

    /// Whether the reviewer has a delivered order containing this product.
    pub is_verified_purchase: bool,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// New Review Model
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub uuid: ReviewUuid,
    pub rating: u8,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Review Update Model
///
/// `None` fields are left untouched; `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewUpdate {
    pub rating: Option<u8>,
    pub title: Option<Option<String>>,
    pub comment: Option<Option<String>>,
}

impl ReviewUpdate {
    pub(crate) fn apply_to(self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(title) = self.title {
            review.title = title;
        }
        if let Some(comment) = self.comment {
            review.comment = comment;
        }
    }
}

/// How many reviews landed on each star.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingBucket {
    pub rating: u8,
    pub count: u64,
}

/// A page of a product's reviews plus the star distribution.
#[derive(Debug, Clone)]
pub struct ProductReviews {
    pub reviews: Paginated<Review>,
    pub rating_distribution: Vec<RatingBucket>,
}
