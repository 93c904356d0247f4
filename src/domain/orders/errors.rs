//! Orders service errors.

use std::fmt;

use sqlx::{
    Error,
    error::{DatabaseError, ErrorKind},
};
use thiserror::Error;

use crate::domain::{
    orders::{checkout::CheckoutError, models::OrderStatus},
    products::models::ProductUuid,
};

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    #[must_use]
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn required(field: &'static str) -> Self {
        Self::new(field, "is required")
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum OrdersServiceError {
    /// Placement attempted with no cart or zero lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A cart line's product is missing or inactive.
    #[error("product {product} is no longer available")]
    UnavailableItem { product: ProductUuid },

    /// Requested quantity exceeds available stock.
    #[error("insufficient stock for {name}: {available} available")]
    InsufficientStock { name: String, available: u32 },

    /// Actor does not own the order, or lacks the admin role.
    #[error("not authorized")]
    Forbidden,

    /// The order's current status does not allow the requested transition.
    #[error("order cannot be cancelled while {from}")]
    InvalidTransition { from: OrderStatus },

    #[error("order not found")]
    NotFound,

    #[error("validation failed")]
    Validation(Vec<FieldError>),

    #[error("order already exists")]
    AlreadyExists,

    #[error("related resource not found")]
    InvalidReference,

    #[error("missing required data")]
    MissingRequiredData,

    #[error("invalid data")]
    InvalidData,

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for OrdersServiceError {
    fn from(error: Error) -> Self {
        if matches!(error, Error::RowNotFound) {
            return Self::NotFound;
        }

        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::AlreadyExists,
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            Some(ErrorKind::NotNullViolation) => Self::MissingRequiredData,
            Some(ErrorKind::CheckViolation) => Self::InvalidData,
            Some(ErrorKind::Other | _) | None => Self::Sql(error),
        }
    }
}

impl From<CheckoutError> for OrdersServiceError {
    fn from(error: CheckoutError) -> Self {
        match error {
            CheckoutError::EmptyCart => Self::EmptyCart,
            CheckoutError::UnavailableItem { product } => Self::UnavailableItem { product },
            CheckoutError::InsufficientStock { name, available } => {
                Self::InsufficientStock { name, available }
            }
        }
    }
}

impl From<Vec<FieldError>> for OrdersServiceError {
    fn from(errors: Vec<FieldError>) -> Self {
        Self::Validation(errors)
    }
}
