//! Auth service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::PgPool;

use crate::auth::{
    AuthKey, Claims, Identity, PgAuthRepository, TokenVersion, UserUuid,
    errors::AuthServiceError,
    token::{format_token, parse_and_verify},
};

/// Token lifetime, matching the storefront's 24h sessions.
pub const TOKEN_TTL_SECS: i64 = 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct PgAuthService {
    key: AuthKey,
    repository: PgAuthRepository,
}

impl PgAuthService {
    #[must_use]
    pub fn new(pool: PgPool, key: AuthKey) -> Self {
        Self {
            key,
            repository: PgAuthRepository::new(pool),
        }
    }
}

#[async_trait]
impl AuthService for PgAuthService {
    async fn authenticate(&self, bearer_token: &str) -> Result<Identity, AuthServiceError> {
        let claims = parse_and_verify(bearer_token, &self.key, Timestamp::now())?;

        let account = self
            .repository
            .find_user(UserUuid::from_uuid(claims.sub))
            .await?
            .ok_or(AuthServiceError::Unauthorized)?;

        if !account.is_active {
            return Err(AuthServiceError::Unauthorized);
        }

        // The account row is authoritative for the role; a stale token cannot
        // retain privileges the row has lost.
        Ok(Identity {
            user_uuid: account.uuid,
            name: account.name,
            email: account.email,
            role: account.role,
        })
    }

    async fn issue_token(&self, user: UserUuid) -> Result<String, AuthServiceError> {
        let account = self
            .repository
            .find_user(user)
            .await?
            .ok_or(AuthServiceError::NotFound)?;

        let now = Timestamp::now();

        let claims = Claims {
            sub: account.uuid.into_uuid(),
            role: account.role,
            iat: now.as_second(),
            exp: now.as_second() + TOKEN_TTL_SECS,
        };

        Ok(format_token(&claims, TokenVersion::V1, &self.key))
    }
}

#[automock]
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify a bearer token and produce the caller's identity.
    async fn authenticate(&self, bearer_token: &str) -> Result<Identity, AuthServiceError>;

    /// Issue a fresh bearer token for an existing user.
    async fn issue_token(&self, user: UserUuid) -> Result<String, AuthServiceError>;
}
