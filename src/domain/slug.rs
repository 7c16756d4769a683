//! Slug and filename generation for book pages
//!
//! Titles are turned into filesystem-safe basenames: nonspacing marks
//! (accents) are stripped after canonical decomposition, anything that is not a word character,
//! whitespace or hyphen is dropped, and runs of whitespace/hyphens collapse
//! into a single hyphen.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_properties::{GeneralCategory, UnicodeGeneralCategory};

/// Extension used for every book page
pub const MARKDOWN_EXT: &str = "md";

/// Basename used when a title slugifies to nothing
const EMPTY_SLUG: &str = "untitled";

static DISALLOWED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("static regex"));

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").expect("static regex"));

/// Converts text to a URL/filesystem-safe slug
pub fn slug(text: &str) -> String {
    let stripped: String = text
        .nfd()
        .filter(|c| c.general_category() != GeneralCategory::NonspacingMark)
        .collect();
    let lowered = stripped.to_lowercase();
    let cleaned = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = SEPARATORS.replace_all(&cleaned, "-");

    hyphenated.trim_matches('-').to_string()
}

/// Returns a markdown filename for `title` that does not yet exist in `dir`
///
/// Collisions get `-1`, `-2`, ... appended before the extension.
pub fn unique_filename(title: &str, dir: &Path) -> String {
    let mut base = slug(title);
    if base.is_empty() {
        base = EMPTY_SLUG.to_string();
    }

    let mut candidate = format!("{}.{}", base, MARKDOWN_EXT);
    let mut counter = 1;
    while dir.join(&candidate).exists() {
        candidate = format!("{}-{}.{}", base, counter, MARKDOWN_EXT);
        counter += 1;
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn strips_vietnamese_accents() {
        assert_eq!(slug("Hà Nội Mùa Thu!!!"), "ha-noi-mua-thu");
    }

    #[test]
    fn keeps_spacing_marks() {
        assert_eq!(slug("कि"), "कि");
        assert_eq!(slug("Hà Nội"), "ha-noi");
    }

    #[test]
    fn collapses_separators() {
        assert_eq!(slug("  Rust -- in   Action  "), "rust-in-action");
        assert_eq!(slug("C'est la vie"), "cest-la-vie");
    }

    #[test]
    fn keeps_digits_and_underscores() {
        assert_eq!(slug("Book_2 Part 3"), "book_2-part-3");
    }

    #[test]
    fn filename_in_empty_dir() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_filename("Test Book", dir.path()), "test-book.md");
    }

    #[test]
    fn filename_suffixes_on_collision() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test-book.md"), "x").unwrap();
        assert_eq!(unique_filename("Test Book", dir.path()), "test-book-1.md");

        fs::write(dir.path().join("test-book-1.md"), "x").unwrap();
        assert_eq!(unique_filename("test book!", dir.path()), "test-book-2.md");
    }

    #[test]
    fn filename_for_punctuation_only_title() {
        let dir = TempDir::new().unwrap();
        assert_eq!(unique_filename("!!!", dir.path()), "untitled.md");
    }

    const TITLE_CHARS: &str = "[a-zA-Z0-9 àáâãèéêìíòóôõùúăđĩũơưạảấầẩẫậắằẳẵặẹẻẽếềểễệỉịọỏốồổỗộớờởỡợụủứừửữựỳỵỷỹ!?.,'_-]{0,40}";

    proptest! {
        #[test]
        fn slug_is_idempotent(s in TITLE_CHARS) {
            let once = slug(&s);
            prop_assert_eq!(slug(&once), once.clone());
        }

        #[test]
        fn slug_has_no_edge_hyphens_or_spaces(s in TITLE_CHARS) {
            let out = slug(&s);
            prop_assert!(!out.starts_with('-'));
            prop_assert!(!out.ends_with('-'));
            prop_assert!(!out.chars().any(char::is_whitespace));
            prop_assert!(!out.contains("--"));
        }
    }
}
