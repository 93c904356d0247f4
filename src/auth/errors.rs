//! Auth service errors.

use sqlx::Error;
use thiserror::Error;

use crate::auth::TokenError;

#[derive(Debug, Error)]
pub enum AuthServiceError {
    /// Token did not verify, or the user behind it is gone or deactivated.
    #[error("authentication failed")]
    Unauthorized,

    #[error("user not found")]
    NotFound,

    #[error("token processing error")]
    Token(#[source] TokenError),

    #[error("storage error")]
    Sql(#[source] Error),
}

impl From<Error> for AuthServiceError {
    fn from(error: Error) -> Self {
        Self::Sql(error)
    }
}

impl From<TokenError> for AuthServiceError {
    fn from(error: TokenError) -> Self {
        Self::Token(error)
    }
}
