//! Placement pricing.
//!
//! The pure half of the placement workflow: given the user's resolved cart
//! lines, either produce the frozen snapshots and totals for a new order or
//! refuse without anything having been mutated.

use thiserror::Error;

use crate::domain::{
    carts::models::ResolvedCartLine,
    orders::models::OrderItem,
    products::models::ProductUuid,
};

/// Subtotal at or above this ships free.
pub const FREE_SHIPPING_THRESHOLD: u64 = 3000;

/// Flat rate below the free-shipping threshold.
pub const FLAT_SHIPPING_COST: u64 = 200;

/// Why a cart cannot be priced. Detected before any mutation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("product {product} is no longer available")]
    UnavailableItem { product: ProductUuid },

    #[error("insufficient stock for {name}: {available} available")]
    InsufficientStock { name: String, available: u32 },
}

/// A priced cart, ready to be persisted as an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedCart {
    pub items: Vec<OrderItem>,
    pub subtotal: u64,
    pub shipping_cost: u64,
    pub total: u64,
}

/// Price the cart: validate every line, freeze snapshots, and compute the
/// totals.
///
/// The unit price is the discount price when one is set and valid, else the
/// regular price, captured here so later catalog edits never alter the
/// order.
///
/// # Errors
///
/// - [`CheckoutError::EmptyCart`]: no lines to price.
/// - [`CheckoutError::UnavailableItem`]: a line's product is gone or
///   inactive.
/// - [`CheckoutError::InsufficientStock`]: a line wants more than the shelf
///   holds.
pub fn price_cart(lines: &[ResolvedCartLine]) -> Result<PricedCart, CheckoutError> {
    if lines.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let mut items = Vec::with_capacity(lines.len());
    let mut subtotal = 0_u64;

    for line in lines {
        let product = line
            .product
            .as_ref()
            .filter(|p| p.is_active)
            .ok_or(CheckoutError::UnavailableItem {
                product: line.product_uuid,
            })?;

        if product.stock_quantity < line.quantity {
            return Err(CheckoutError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock_quantity,
            });
        }

        let unit_price = product.effective_price();

        subtotal += unit_price * u64::from(line.quantity);

        items.push(OrderItem {
            product_uuid: product.uuid,
            name: product.name.clone(),
            unit_price,
            quantity: line.quantity,
            size: line.size,
            image: product.image.clone().unwrap_or_default(),
        });
    }

    let shipping_cost = shipping_cost_for(subtotal);

    Ok(PricedCart {
        items,
        subtotal,
        shipping_cost,
        total: subtotal + shipping_cost,
    })
}

/// Free at or above the threshold, flat rate below it.
#[must_use]
pub const fn shipping_cost_for(subtotal: u64) -> u64 {
    if subtotal >= FREE_SHIPPING_THRESHOLD {
        0
    } else {
        FLAT_SHIPPING_COST
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use crate::domain::{carts::models::CartProduct, products::models::Size};

    use super::*;

    fn line(
        name: &str,
        price: u64,
        discount: Option<u64>,
        quantity: u32,
        stock: u32,
    ) -> ResolvedCartLine {
        let product_uuid = ProductUuid::new();

        ResolvedCartLine {
            product_uuid,
            quantity,
            size: Some(Size::M),
            product: Some(CartProduct {
                uuid: product_uuid,
                name: name.to_string(),
                price,
                discount_price: discount,
                stock_quantity: stock,
                is_active: true,
                image: None,
            }),
        }
    }

    #[test]
    fn flat_shipping_below_threshold() -> TestResult {
        // price 1000 x 2, no discount
        let priced = price_cart(&[line("Cotton Kameez", 1000, None, 2, 10)])?;

        assert_eq!(priced.subtotal, 2000);
        assert_eq!(priced.shipping_cost, 200);
        assert_eq!(priced.total, 2200);

        Ok(())
    }

    #[test]
    fn free_shipping_at_or_above_threshold() -> TestResult {
        // price 2000 x 2 with discount 1800
        let priced = price_cart(&[line("Lawn Suit", 2000, Some(1800), 2, 10)])?;

        assert_eq!(priced.subtotal, 3600);
        assert_eq!(priced.shipping_cost, 0);
        assert_eq!(priced.total, 3600);

        Ok(())
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        assert_eq!(shipping_cost_for(3000), 0);
        assert_eq!(shipping_cost_for(2999), FLAT_SHIPPING_COST);
        assert_eq!(shipping_cost_for(0), FLAT_SHIPPING_COST);
    }

    #[test]
    fn total_always_equals_subtotal_plus_shipping() -> TestResult {
        for lines in [
            vec![line("A", 500, None, 1, 5)],
            vec![line("A", 500, None, 1, 5), line("B", 4000, None, 1, 5)],
            vec![line("A", 1500, Some(1499), 2, 5)],
        ] {
            let priced = price_cart(&lines)?;

            assert_eq!(priced.total, priced.subtotal + priced.shipping_cost);
        }

        Ok(())
    }

    #[test]
    fn unit_price_is_frozen_from_effective_price() -> TestResult {
        let priced = price_cart(&[
            line("Discounted", 2000, Some(1800), 1, 5),
            line("Regular", 1000, None, 1, 5),
            line("Bogus discount", 1000, Some(1200), 1, 5),
        ])?;

        let unit_prices: Vec<u64> = priced.items.iter().map(|i| i.unit_price).collect();

        assert_eq!(unit_prices, vec![1800, 1000, 1000]);

        Ok(())
    }

    #[test]
    fn empty_cart_is_rejected() {
        assert_eq!(price_cart(&[]), Err(CheckoutError::EmptyCart));
    }

    #[test]
    fn missing_product_is_unavailable() {
        let orphan = ResolvedCartLine {
            product_uuid: ProductUuid::new(),
            quantity: 1,
            size: None,
            product: None,
        };

        assert_eq!(
            price_cart(&[orphan.clone()]),
            Err(CheckoutError::UnavailableItem {
                product: orphan.product_uuid
            })
        );
    }

    #[test]
    fn inactive_product_is_unavailable() {
        let mut inactive = line("Retired", 1000, None, 1, 5);
        if let Some(product) = inactive.product.as_mut() {
            product.is_active = false;
        }

        assert!(matches!(
            price_cart(&[inactive]),
            Err(CheckoutError::UnavailableItem { .. })
        ));
    }

    #[test]
    fn zero_stock_fails_with_name_and_availability() {
        let result = price_cart(&[line("Sold Out Kurta", 1000, None, 1, 0)]);

        assert_eq!(
            result,
            Err(CheckoutError::InsufficientStock {
                name: "Sold Out Kurta".to_string(),
                available: 0,
            })
        );
    }

    #[test]
    fn any_failing_line_rejects_the_whole_cart() {
        let result = price_cart(&[
            line("Fine", 1000, None, 1, 5),
            line("Short", 1000, None, 3, 2),
        ]);

        assert!(matches!(result, Err(CheckoutError::InsufficientStock { .. })));
    }

    #[test]
    fn snapshot_image_defaults_to_empty_string() -> TestResult {
        let priced = price_cart(&[line("No Photos", 1000, None, 1, 5)])?;

        assert_eq!(priced.items[0].image, "");

        Ok(())
    }
}
