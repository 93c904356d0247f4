//! Products service.

use async_trait::async_trait;
use jiff::Timestamp;
use mockall::automock;
use sqlx::{Postgres, Transaction};

use crate::{
    auth::Identity,
    database::Db,
    domain::{
        pagination::{Page, Paginated},
        products::{
            errors::ProductsServiceError,
            models::{
                MAX_BRAND_LEN, MAX_DESCRIPTION_LEN, MAX_NAME_LEN, NewProduct, Product,
                ProductFilter, ProductUpdate, ProductUuid,
            },
            repository::PgProductsRepository,
        },
    },
    slugs,
};

/// Upper bound on `-N` slug suffixes tried before giving up.
const MAX_SLUG_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone)]
pub struct PgProductsService {
    db: Db,
    repository: PgProductsRepository,
}

impl PgProductsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            repository: PgProductsRepository::new(),
        }
    }

    async fn unique_slug(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
    ) -> Result<String, ProductsServiceError> {
        let base = slugs::generate_slug(name);

        if base.is_empty() {
            return Err(ProductsServiceError::InvalidData);
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

        Err(ProductsServiceError::AlreadyExists)
    }
}

#[async_trait]
impl ProductsService for PgProductsService {
    async fn list_products(
        &self,
        filter: ProductFilter,
        page: Page,
    ) -> Result<Paginated<Product>, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let products = self.repository.list_products(&mut tx, &filter, page).await?;
        let total = self.repository.count_products(&mut tx, &filter).await?;

        tx.commit().await?;

        Ok(Paginated::new(products, total, page))
    }

    async fn get_product(&self, product: ProductUuid) -> Result<Product, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let product = self.repository.get_product(&mut tx, product).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, ProductsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let product = self.repository.get_product_by_slug(&mut tx, slug).await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn create_product(
        &self,
        identity: &Identity,
        product: NewProduct,
    ) -> Result<Product, ProductsServiceError> {
        if !identity.is_admin() {
            return Err(ProductsServiceError::Forbidden);
        }

        validate_fields(&product.name, product.brand.as_deref(), product.description.as_deref())?;
        validate_pricing(product.price, product.discount_price)?;

        let mut tx = self.db.begin_transaction().await?;

        let slug = self.unique_slug(&mut tx, &product.name).await?;

        let now = Timestamp::now();

        let created = self
            .repository
            .create_product(
                &mut tx,
                &Product {
                    uuid: product.uuid,
                    name: product.name,
                    slug,
                    brand: product.brand,
                    category_uuid: product.category_uuid,
                    fabric_type: product.fabric_type,
                    sizes: product.sizes,
                    color: product.color,
                    price: product.price,
                    discount_price: product.discount_price,
                    stock_quantity: product.stock_quantity,
                    images: product.images,
                    description: product.description,
                    season: product.season,
                    gender: product.gender,
                    is_active: true,
                    is_featured: product.is_featured,
                    average_rating: 0.0,
                    review_count: 0,
                    sold_count: 0,
                    created_at: now,
                    updated_at: now,
                },
            )
            .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn update_product(
        &self,
        identity: &Identity,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError> {
        if !identity.is_admin() {
            return Err(ProductsServiceError::Forbidden);
        }

        let mut tx = self.db.begin_transaction().await?;

        let mut current = self.repository.get_product(&mut tx, product).await?;

        let renamed = update
            .name
            .as_ref()
            .is_some_and(|name| *name != current.name);

        update.apply_to(&mut current);

        validate_fields(
            &current.name,
            current.brand.as_deref(),
            current.description.as_deref(),
        )?;
        validate_pricing(current.price, current.discount_price)?;

        // Renames get a freshly de-duplicated slug, like creation does.
        if renamed {
            current.slug = self.unique_slug(&mut tx, &current.name).await?;
        }

        let updated = self.repository.update_product(&mut tx, &current).await?;

        tx.commit().await?;

        Ok(updated)
    }

    async fn delete_product(
        &self,
        identity: &Identity,
        product: ProductUuid,
    ) -> Result<(), ProductsServiceError> {
        if !identity.is_admin() {
            return Err(ProductsServiceError::Forbidden);
        }

        let mut tx = self.db.begin_transaction().await?;

        let rows_affected = self.repository.delete_product(&mut tx, product).await?;

        if rows_affected == 0 {
            return Err(ProductsServiceError::NotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}

fn validate_fields(
    name: &str,
    brand: Option<&str>,
    description: Option<&str>,
) -> Result<(), ProductsServiceError> {
    if name.trim().is_empty() {
        return Err(ProductsServiceError::MissingRequiredData);
    }

    if name.len() > MAX_NAME_LEN
        || brand.is_some_and(|b| b.len() > MAX_BRAND_LEN)
        || description.is_some_and(|d| d.len() > MAX_DESCRIPTION_LEN)
    {
        return Err(ProductsServiceError::InvalidData);
    }

    Ok(())
}

/// A discount, when present, must undercut the regular price.
fn validate_pricing(price: u64, discount_price: Option<u64>) -> Result<(), ProductsServiceError> {
    match discount_price {
        Some(discount) if discount >= price => Err(ProductsServiceError::InvalidDiscount),
        _ => Ok(()),
    }
}

#[automock]
#[async_trait]
pub trait ProductsService: Send + Sync {
    /// Retrieves a page of the catalog matching a filter.
    async fn list_products(
        &self,
        filter: ProductFilter,
        page: Page,
    ) -> Result<Paginated<Product>, ProductsServiceError>;

    /// Retrieve a single product.
    async fn get_product(&self, product: ProductUuid) -> Result<Product, ProductsServiceError>;

    /// Retrieve a single product by its catalog slug.
    async fn get_product_by_slug(&self, slug: &str) -> Result<Product, ProductsServiceError>;

    /// Creates a new product with a derived unique slug. Admin only.
    async fn create_product(
        &self,
        identity: &Identity,
        product: NewProduct,
    ) -> Result<Product, ProductsServiceError>;

    /// Applies a partial update, re-deriving the slug on rename. Admin only.
    async fn update_product(
        &self,
        identity: &Identity,
        product: ProductUuid,
        update: ProductUpdate,
    ) -> Result<Product, ProductsServiceError>;

    /// Deletes a product. Admin only.
    async fn delete_product(
        &self,
        identity: &Identity,
        product: ProductUuid,
    ) -> Result<(), ProductsServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_must_undercut_price() {
        assert!(validate_pricing(2000, Some(1999)).is_ok());
        assert!(matches!(
            validate_pricing(2000, Some(2000)),
            Err(ProductsServiceError::InvalidDiscount)
        ));
        assert!(matches!(
            validate_pricing(2000, Some(2500)),
            Err(ProductsServiceError::InvalidDiscount)
        ));
    }

    #[test]
    fn no_discount_is_always_valid() {
        assert!(validate_pricing(0, None).is_ok());
    }

    #[test]
    fn blank_name_is_missing_data() {
        assert!(matches!(
            validate_fields("   ", None, None),
            Err(ProductsServiceError::MissingRequiredData)
        ));
    }

    #[test]
    fn overlong_name_is_invalid() {
        let name = "x".repeat(MAX_NAME_LEN + 1);

        assert!(matches!(
            validate_fields(&name, None, None),
            Err(ProductsServiceError::InvalidData)
        ));
    }
}
