//! English ordinals for account ages.

/// Returns the English ordinal suffix for `n` (`st`, `nd`, `rd` or `th`).
///
/// 11, 12 and 13 (and 111, 212, ...) take `th` despite their last digit.
pub fn ordinal_suffix(n: u32) -> &'static str {
    match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Renders `n` as an ordinal with the suffix in markdown superscript:
/// `9` becomes `9^th`.
pub fn superscript_ordinal(n: u32) -> String {
    format!("{}^{}", n, ordinal_suffix(n))
}
