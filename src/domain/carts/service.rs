//! Carts service.

use async_trait::async_trait;
use mockall::automock;
use sqlx::{Postgres, Transaction};

use crate::{
    auth::UserUuid,
    database::Db,
    domain::{
        carts::{
            errors::CartsServiceError,
            lines,
            models::{Cart, CartUuid, CartView, NewCartItem},
            repository::PgCartsRepository,
        },
        products::{
            models::{Product, ProductUuid, Size},
            repository::PgProductsRepository,
        },
    },
};

#[derive(Debug, Clone)]
pub struct PgCartsService {
    db: Db,
    carts_repository: PgCartsRepository,
    products_repository: PgProductsRepository,
}

impl PgCartsService {
    #[must_use]
    pub fn new(db: Db) -> Self {
        Self {
            db,
            carts_repository: PgCartsRepository::new(),
            products_repository: PgProductsRepository::new(),
        }
    }

    /// Carts are created lazily on first touch.
    async fn get_or_create_cart(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user: UserUuid,
    ) -> Result<Cart, CartsServiceError> {
        if let Some(cart) = self.carts_repository.get_cart_by_user(tx, user).await? {
            return Ok(cart);
        }

        let cart = self
            .carts_repository
            .create_cart(tx, CartUuid::new(), user)
            .await?;

        Ok(cart)
    }

    async fn require_available(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        product: ProductUuid,
        quantity: u32,
    ) -> Result<Product, CartsServiceError> {
        let product = self
            .products_repository
            .get_product(tx, product)
            .await
            .map_err(|error| match error {
                sqlx::Error::RowNotFound => CartsServiceError::ProductNotFound,
                other => other.into(),
            })?;

        if !product.is_active {
            return Err(CartsServiceError::ProductUnavailable);
        }

        if product.stock_quantity < quantity {
            return Err(CartsServiceError::InsufficientStock {
                available: product.stock_quantity,
            });
        }

        Ok(product)
    }

    async fn view(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        cart: CartUuid,
    ) -> Result<CartView, CartsServiceError> {
        let resolved = self.carts_repository.get_resolved_lines(tx, cart).await?;

        Ok(CartView::from_lines(cart, resolved))
    }
}

#[async_trait]
impl CartsService for PgCartsService {
    async fn get_cart(&self, user: UserUuid) -> Result<CartView, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let cart = self.get_or_create_cart(&mut tx, user).await?;
        let view = self.view(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(view)
    }

    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartView, CartsServiceError> {
        if item.quantity == 0 {
            return Err(CartsServiceError::InvalidData);
        }

        let mut tx = self.db.begin_transaction().await?;

        self.require_available(&mut tx, item.product_uuid, item.quantity)
            .await?;

        let cart = self.get_or_create_cart(&mut tx, user).await?;

        let mut cart_lines = self.carts_repository.get_lines(&mut tx, cart.uuid).await?;

        lines::add_line(&mut cart_lines, item.product_uuid, item.quantity, item.size);

        self.carts_repository
            .replace_lines(&mut tx, cart.uuid, &cart_lines)
            .await?;

        let view = self.view(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(view)
    }

    async fn update_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u32,
        size: Option<Size>,
    ) -> Result<CartView, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let cart = self
            .carts_repository
            .get_cart_by_user(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        // Only gate on stock when the line keeps a positive quantity; a
        // removal must always go through, and a line whose product is gone
        // can still be edited away.
        if quantity > 0 {
            match self.products_repository.get_product(&mut tx, product).await {
                Ok(product) if product.stock_quantity < quantity => {
                    return Err(CartsServiceError::InsufficientStock {
                        available: product.stock_quantity,
                    });
                }
                Ok(_) | Err(sqlx::Error::RowNotFound) => {}
                Err(error) => return Err(error.into()),
            }
        }

        let mut cart_lines = self.carts_repository.get_lines(&mut tx, cart.uuid).await?;

        lines::set_line_quantity(&mut cart_lines, product, quantity, size);

        self.carts_repository
            .replace_lines(&mut tx, cart.uuid, &cart_lines)
            .await?;

        let view = self.view(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(view)
    }

    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        size: Option<Size>,
    ) -> Result<CartView, CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        let cart = self
            .carts_repository
            .get_cart_by_user(&mut tx, user)
            .await?
            .ok_or(CartsServiceError::NotFound)?;

        let mut cart_lines = self.carts_repository.get_lines(&mut tx, cart.uuid).await?;

        lines::remove_line(&mut cart_lines, product, size);

        self.carts_repository
            .replace_lines(&mut tx, cart.uuid, &cart_lines)
            .await?;

        let view = self.view(&mut tx, cart.uuid).await?;

        tx.commit().await?;

        Ok(view)
    }

    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError> {
        let mut tx = self.db.begin_transaction().await?;

        if let Some(cart) = self.carts_repository.get_cart_by_user(&mut tx, user).await? {
            self.carts_repository.clear_lines(&mut tx, cart.uuid).await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

#[automock]
#[async_trait]
pub trait CartsService: Send + Sync {
    /// Retrieve the user's cart, creating it lazily.
    async fn get_cart(&self, user: UserUuid) -> Result<CartView, CartsServiceError>;

    /// Add an item, merging into an existing (product, size) line.
    async fn add_item(
        &self,
        user: UserUuid,
        item: NewCartItem,
    ) -> Result<CartView, CartsServiceError>;

    /// Overwrite a line's quantity; zero removes the line.
    async fn update_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        quantity: u32,
        size: Option<Size>,
    ) -> Result<CartView, CartsServiceError>;

    /// Drop a (product, size) line; absence is a silent no-op.
    async fn remove_item(
        &self,
        user: UserUuid,
        product: ProductUuid,
        size: Option<Size>,
    ) -> Result<CartView, CartsServiceError>;

    /// Empty the cart, keeping the row.
    async fn clear_cart(&self, user: UserUuid) -> Result<(), CartsServiceError>;
}
