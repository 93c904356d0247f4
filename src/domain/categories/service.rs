//! Categories service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;

use crate::{
    auth::Identity,
    database::Db,
    domain::categories::{
        errors::CategoriesServiceError,
        models::{Category, CategoryUpdate, CategoryUuid, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, NewCategory},
        repository::PgCategoriesRepository,
    },
    slugs,
};

/// Upper bound on `-N` slug suffixes tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone)]
pub struct PgCategoriesService {
    db: Db,
    repository: PgCategoriesRepository,
}

impl PgCategoriesService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgCategoriesRepository::new(),
        }
    }

    async fn unique_slug(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        name: &str,
    ) -> Result<String, CategoriesServiceError> {
        let base = slugs::generate_slug(name);

        if base.is_empty() {
            return Err(CategoriesServiceError::InvalidData);
        }

        if !self.repository.slug_exists(tx, &base).await? {
            return Ok(base);
        }

        for counter in 1..=MAX_SLUG_ATTEMPTS {
            let candidate = slugs::suffixed_slug(&base, counter);

            if !self.repository.slug_exists(tx, &candidate).await? {
                return Ok(candidate);
            }
        }

        Err(CategoriesServiceError::AlreadyExists)
    }
}

#[async_trait]
impl CategoriesService for PgCategoriesService {
    async fn list_categories(&self) -> Result<Vec<Category>, CategoriesServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let categories = self.repository.list_categories(&mut tx).await?;

        tx.commit().await?;

        Ok(categories)
    }

    async fn get_category(
        &self,
        category: CategoryUuid,
    ) -> Result<Category, CategoriesServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let category = self.repository.get_category(&mut tx, category).await?;

        tx.commit().await?;

        Ok(category)
    }

    async fn create_category(
        &self,
        identity: &Identity,
        category: NewCategory,
    ) -> Result<Category, CategoriesServiceError> {
        if !identity.is_admin() {
            return Err(CategoriesServiceError::Forbidden);
        }

        validate_name(&category.name)?;

        if category
            .description
            .as_ref()
            .is_some_and(|d| d.len() > MAX_DESCRIPTION_LEN)
        {
            return Err(CategoriesServiceError::InvalidData);
        }

        let mut tx = self.db.begin_transaction().await?;

        let slug = self.unique_slug(&mut tx, &category.name).await?;

        let now = Timestamp::now();

        let created = self
            .repository
            .create_category(
                &mut tx,
                &Category {
                    uuid: category.uuid,
                    name: category.name,
                    slug,
                    description: category.description,
                    parent_uuid: category.parent_uuid,
                    image: category.image,
                    is_active: true,
                    display_order: category.display_order,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_category(
        &self,
        identity: &Identity,
        category: CategoryUuid,
        update: CategoryUpdate,
    ) -> Result<Category, CategoriesServiceError> {
        if !identity.is_admin() {
            return Err(CategoriesServiceError::Forbidden);
        }

        if let Some(name) = &update.name {
            validate_name(name)?;
        }

        let mut tx = self.db.begin_transaction().await?;

        let mut current = self.repository.get_category(&mut tx, category).await?;

        update.apply_to(&mut current);

        let updated = self.repository.update_category(&mut tx, &current).await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_category(
        &self,
        identity: &Identity,
        category: CategoryUuid,
    ) -> Result<(), CategoriesServiceError> {
        if !identity.is_admin() {
            return Err(CategoriesServiceError::Forbidden);
        }

        let mut tx = self.db.begin_transaction().await?;

        let rows_affected = self.repository.delete_category(&mut tx, category).await?;

        if rows_affected == 0 {
            return Err(CategoriesServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), CategoriesServiceError> {
    if name.trim().is_empty() {
        return Err(CategoriesServiceError::MissingRequiredData);
    }

    if name.len() > MAX_NAME_LEN {
        return Err(CategoriesServiceError::InvalidData);
    }

    Ok(())
}

#[automock]
#[async_trait]
pub trait CategoriesService: Send + Sync {
    /// Retrieves all categories ordered for display.
    async fn list_categories(&self) -> Result<Vec<Category>, CategoriesServiceError>;

    /// Retrieve a single category.
    async fn get_category(
        &self,
        category: CategoryUuid,
    ) -> Result<Category, CategoriesServiceError>;

    /// Creates a new category with a derived unique slug. Admin only.
    async fn create_category(
        &self,
        identity: &Identity,
        category: NewCategory,
    ) -> Result<Category, CategoriesServiceError>;

    /// Applies a partial update. Admin only.
    async fn update_category(
        &self,
        identity: &Identity,
        category: CategoryUuid,
        update: CategoryUpdate,
    ) -> Result<Category, CategoriesServiceError>;

    /// Deletes a category. Admin only.
    async fn delete_category(
        &self,
        identity: &Identity,
        category: CategoryUuid,
    ) -> Result<(), CategoriesServiceError>;
}
