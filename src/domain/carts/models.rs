//! Cart Models

use jiff::Timestamp;

use crate::{
    auth::UserUuid,
    domain::products::models::{ProductUuid, Size, effective_price},
    uuids::TypedUuid,
};

/// Cart UUID
pub type CartUuid = TypedUuid<Cart>;

/// Cart Model
///
/// One cart per user; emptied rather than deleted.
#[derive(Debug, Clone)]
pub struct Cart {
    pub uuid: CartUuid,
    pub user_uuid: UserUuid,
    pub items: Vec<CartLine>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A (product, quantity, size) line within a cart.
///
/// Line identity for merging is the (product, size) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub size: Option<Size>,
}

impl CartLine {
    #[must_use]
    pub fn matches(&self, product: ProductUuid, size: Option<Size>) -> bool {
        self.product_uuid == product && self.size == size
    }
}

/// New item payload for `add_item`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub size: Option<Size>,
}

/// Live catalog snapshot joined onto a cart line at read time.
#[derive(Debug, Clone)]
pub struct CartProduct {
    pub uuid: ProductUuid,
    pub name: String,
    pub price: u64,
    pub discount_price: Option<u64>,
    pub stock_quantity: u32,
    pub is_active: bool,
    pub image: Option<String>,
}

impl CartProduct {
    #[must_use]
    pub fn effective_price(&self) -> u64 {
        effective_price(self.price, self.discount_price)
    }
}

/// A cart line resolved against the catalog. The product is `None` when the
/// referenced row has been deleted since the line was added.
#[derive(Debug, Clone)]
pub struct ResolvedCartLine {
    pub product_uuid: ProductUuid,
    pub quantity: u32,
    pub size: Option<Size>,
    pub product: Option<CartProduct>,
}

impl ResolvedCartLine {
    /// A line is purchasable only while its product exists and is active.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.product.as_ref().is_some_and(|p| p.is_active)
    }
}

/// Cart as presented to the caller: valid lines plus running totals.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart_uuid: CartUuid,
    pub items: Vec<ResolvedCartLine>,
    pub total_items: u32,
    pub subtotal: u64,
}

impl CartView {
    /// Build the view from resolved lines, dropping lines whose product is
    /// gone or inactive.
    #[must_use]
    pub fn from_lines(cart_uuid: CartUuid, lines: Vec<ResolvedCartLine>) -> Self {
        let items: Vec<ResolvedCartLine> =
            lines.into_iter().filter(ResolvedCartLine::is_valid).collect();

        let total_items = items.iter().map(|line| line.quantity).sum();

        let subtotal = items
            .iter()
            .filter_map(|line| {
                line.product
                    .as_ref()
                    .map(|p| p.effective_price() * u64::from(line.quantity))
            })
            .sum();

        Self {
            cart_uuid,
            items,
            total_items,
            subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(price: u64, discount: Option<u64>, quantity: u32, is_active: bool) -> ResolvedCartLine {
        let product_uuid = ProductUuid::new();

        ResolvedCartLine {
            product_uuid,
            quantity,
            size: None,
            product: Some(CartProduct {
                uuid: product_uuid,
                name: "Classic White Cotton".to_string(),
                price,
                discount_price: discount,
                stock_quantity: 50,
                is_active,
                image: None,
            }),
        }
    }

    #[test]
    fn view_totals_use_effective_prices() {
        let view = CartView::from_lines(
            CartUuid::new(),
            vec![resolved(1000, None, 2, true), resolved(2000, Some(1800), 1, true)],
        );

        assert_eq!(view.total_items, 3);
        assert_eq!(view.subtotal, 2 * 1000 + 1800);
        assert_eq!(view.items.len(), 2);
    }

    #[test]
    fn view_drops_inactive_products() {
        let view = CartView::from_lines(
            CartUuid::new(),
            vec![resolved(1000, None, 2, true), resolved(500, None, 1, false)],
        );

        assert_eq!(view.items.len(), 1);
        assert_eq!(view.subtotal, 2000);
    }

    #[test]
    fn view_drops_deleted_products() {
        let orphan = ResolvedCartLine {
            product_uuid: ProductUuid::new(),
            quantity: 4,
            size: None,
            product: None,
        };

        let view = CartView::from_lines(CartUuid::new(), vec![orphan]);

        assert!(view.items.is_empty());
        assert_eq!(view.total_items, 0);
        assert_eq!(view.subtotal, 0);
    }
}
