//! URL slug derivation.

/// Derive a URL-friendly slug from a display name.
///
/// Lowercases, keeps ASCII alphanumerics, and collapses every other run of
/// characters into a single `-`. Leading and trailing separators are trimmed.
#[must_use]
pub fn generate_slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_separator = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;

            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    slug
}

/// Slug with a numeric de-duplication suffix, used when the bare slug is taken.
#[must_use]
pub fn suffixed_slug(base: &str, counter: u32) -> String {
    format!("{base}-{counter}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_hyphenates() {
        assert_eq!(
            generate_slug("Classic White Cotton Shalwar Kameez"),
            "classic-white-cotton-shalwar-kameez"
        );
    }

    #[test]
    fn collapses_punctuation_runs() {
        assert_eq!(generate_slug("Eid '25 — Lawn (Unstitched)"), "eid-25-lawn-unstitched");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(generate_slug("  Velvet!  "), "velvet");
    }

    #[test]
    fn empty_input_yields_empty_slug() {
        assert_eq!(generate_slug("!!!"), "");
    }

    #[test]
    fn suffix_appends_counter() {
        assert_eq!(suffixed_slug("lawn-suit", 2), "lawn-suit-2");
    }
}
