//! Order number generation.
//!
//! Numbers look like `SK-<TIMESTAMP36>-<RAND4>`: a base-36 millisecond
//! timestamp plus four random base-36 characters. Callers treat them as
//! opaque; uniqueness is enforced by the ledger's index, with the service
//! regenerating on the (practically impossible) collision.

use jiff::Timestamp;
use rand::Rng;

/// Human-readable prefix carried over from the storefront's early days.
pub const ORDER_NUMBER_PREFIX: &str = "SK";

const SUFFIX_LEN: usize = 4;
const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a fresh order number.
#[must_use]
pub fn generate_order_number(now: Timestamp, rng: &mut impl Rng) -> String {
    let timestamp = base36(now.as_millisecond().max(0) as u64);

    let mut suffix = String::with_capacity(SUFFIX_LEN);

    for _ in 0..SUFFIX_LEN {
        suffix.push(BASE36[rng.gen_range(0..BASE36.len())] as char);
    }

    format!("{ORDER_NUMBER_PREFIX}-{timestamp}-{suffix}")
}

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();

    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }

    digits.reverse();

    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn number_has_prefix_and_three_segments() {
        let mut rng = StdRng::seed_from_u64(7);
        let number = generate_order_number(Timestamp::now(), &mut rng);
        let segments: Vec<&str> = number.split('-').collect();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], ORDER_NUMBER_PREFIX);
        assert_eq!(segments[2].len(), SUFFIX_LEN);
        assert!(
            number
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-'),
            "unexpected characters in {number}"
        );
    }

    #[test]
    fn numbers_are_pairwise_distinct_across_placements() {
        let mut rng = StdRng::seed_from_u64(42);

        let numbers: HashSet<String> = (0..1000_i64)
            .map(|ms| {
                let now = Timestamp::from_millisecond(ms).expect("valid timestamp");
                generate_order_number(now, &mut rng)
            })
            .collect();

        assert_eq!(numbers.len(), 1000);
    }

    #[test]
    fn base36_encodes_known_values() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "Z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(36 * 36 + 1), "101");
    }
}
