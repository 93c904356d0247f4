//! The cart mutation contract, expressed over in-memory lines.
//!
//! The service loads a cart's lines, applies one of these mutations, and
//! persists the result in the same transaction.

use crate::domain::{
    carts::models::CartLine,
    products::models::{ProductUuid, Size},
};

/// Merge an item into the lines: an existing (product, size) line has its
/// quantity increased, otherwise a new line is appended.
pub fn add_line(lines: &mut Vec<CartLine>, product: ProductUuid, quantity: u32, size: Option<Size>) {
    if let Some(line) = lines.iter_mut().find(|line| line.matches(product, size)) {
        line.quantity = line.quantity.saturating_add(quantity);
        return;
    }

    lines.push(CartLine {
        product_uuid: product,
        quantity,
        size,
    });
}

/// Overwrite the quantity of an existing (product, size) line. Zero removes
/// the line; a missing line is left as a no-op.
pub fn set_line_quantity(
    lines: &mut Vec<CartLine>,
    product: ProductUuid,
    quantity: u32,
    size: Option<Size>,
) {
    if quantity == 0 {
        remove_line(lines, product, size);
        return;
    }

    if let Some(line) = lines.iter_mut().find(|line| line.matches(product, size)) {
        line.quantity = quantity;
    }
}

/// Drop the matching (product, size) line; absence is a silent no-op.
pub fn remove_line(lines: &mut Vec<CartLine>, product: ProductUuid, size: Option<Size>) {
    lines.retain(|line| !line.matches(product, size));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_appends_new_line() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 2, Some(Size::M));

        assert_eq!(
            lines,
            vec![CartLine {
                product_uuid: product,
                quantity: 2,
                size: Some(Size::M),
            }]
        );
    }

    #[test]
    fn add_merges_same_product_and_size() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 2, Some(Size::M));
        add_line(&mut lines, product, 3, Some(Size::M));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn add_keeps_sizes_as_distinct_lines() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 1, Some(Size::M));
        add_line(&mut lines, product, 1, Some(Size::L));
        add_line(&mut lines, product, 1, None);

        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn set_quantity_overwrites() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 2, None);
        set_line_quantity(&mut lines, product, 7, None);

        assert_eq!(lines[0].quantity, 7);
    }

    #[test]
    fn set_quantity_zero_removes_line() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 2, None);
        set_line_quantity(&mut lines, product, 0, None);

        assert!(lines.is_empty());
    }

    #[test]
    fn set_quantity_on_missing_line_is_a_no_op() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 2, None);
        set_line_quantity(&mut lines, ProductUuid::new(), 5, None);

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 2);
    }

    #[test]
    fn remove_filters_only_the_matching_pair() {
        let mut lines = Vec::new();
        let product = ProductUuid::new();

        add_line(&mut lines, product, 1, Some(Size::M));
        add_line(&mut lines, product, 1, Some(Size::L));
        remove_line(&mut lines, product, Some(Size::M));

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].size, Some(Size::L));
    }

    #[test]
    fn remove_missing_line_is_a_no_op() {
        let mut lines = Vec::new();

        remove_line(&mut lines, ProductUuid::new(), None);

        assert!(lines.is_empty());
    }
}
