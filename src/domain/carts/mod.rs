//! Carts

pub mod errors;
pub mod lines;
pub mod models;
pub(crate) mod repository;
pub mod service;

pub use errors::CartsServiceError;
pub use service::*;
