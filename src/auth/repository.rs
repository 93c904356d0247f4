//! Auth Repository

use std::str::FromStr;

use sqlx::{FromRow, PgPool, Row, postgres::PgRow, query_as};

use crate::auth::models::{Role, UserAccount, UserUuid};

const FIND_USER_SQL: &str = include_str!("sql/find_user.sql");

#[derive(Debug, Clone)]
pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the account row behind a set of verified claims.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    pub async fn find_user(&self, user: UserUuid) -> Result<Option<UserAccount>, sqlx::Error> {
        query_as::<_, UserAccount>(FIND_USER_SQL)
            .bind(user.into_uuid())
            .fetch_optional(&self.pool)
            .await
    }
}

impl<'r> FromRow<'r, PgRow> for UserAccount {
    fn from_row(row: &'r PgRow) -> sqlx::Result<Self> {
        let role_str: String = row.try_get("role")?;

        let role = Role::from_str(&role_str).map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;

        Ok(Self {
            uuid: UserUuid::from_uuid(row.try_get("uuid")?),
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role,
            is_active: row.try_get("is_active")?,
        })
    }
}
