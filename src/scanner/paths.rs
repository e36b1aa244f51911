//! Unicode path normalization for cache keys.
//!
//! macOS stores names in NFD while Linux and Windows typically use NFC, so
//! the same visual filename can arrive with different byte representations.
//! Cache keys and seen-path sets normalize to NFC so those spellings hit the
//! same entry.

use std::path::Path;

use unicode_normalization::UnicodeNormalization;

/// Normalize a path string to NFC form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Normalized comparison key for a path.
///
/// Invalid UTF-8 falls back to the lossy conversion; the real on-disk path
/// is never replaced by this form, it is only used as a map key.
#[must_use]
pub fn path_key(path: &Path) -> String {
    normalize_path_str(&path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nfd_normalizes_to_nfc() {
        let nfd = "cafe\u{0301}.txt";
        assert_eq!(normalize_path_str(nfd), "café.txt");
    }

    #[test]
    fn test_ascii_unchanged() {
        assert_eq!(normalize_path_str("hello.txt"), "hello.txt");
        assert_eq!(normalize_path_str(""), "");
    }

    #[test]
    fn test_path_key_collapses_spellings() {
        let nfc = Path::new("/docs/café.txt");
        let nfd = Path::new("/docs/cafe\u{0301}.txt");
        assert_eq!(path_key(nfc), path_key(nfd));
    }

    #[test]
    fn test_path_key_distinguishes_different_names() {
        assert_ne!(
            path_key(Path::new("/docs/a.txt")),
            path_key(Path::new("/docs/b.txt"))
        );
    }
}
