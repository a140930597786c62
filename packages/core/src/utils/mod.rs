//! Shared helpers

use nanoid::nanoid;

/// Alphabet for slug identifiers: lowercase alphanumerics only, so slugs
/// stay URL-safe and case-insensitive-unambiguous.
const SLUG_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// Generate a 10-character slug identifier.
///
/// Slugs are the immutable external address of databases and rows. 36^10
/// combinations make collisions negligible; the store still enforces
/// uniqueness and an insert losing that race surfaces as a conflict.
pub fn generate_slug_id() -> String {
    nanoid!(10, &SLUG_ALPHABET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_shape() {
        let slug = generate_slug_id();
        assert_eq!(slug.len(), 10);
        assert!(slug.chars().all(|c| SLUG_ALPHABET.contains(&c)));
    }

    #[test]
    fn test_slugs_differ() {
        assert_ne!(generate_slug_id(), generate_slug_id());
    }
}
