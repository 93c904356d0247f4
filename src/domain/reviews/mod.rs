//! Reviews

pub mod errors;
pub mod models;
mod repository;
pub mod service;

pub use errors::ReviewsServiceError;
pub use service::*;
