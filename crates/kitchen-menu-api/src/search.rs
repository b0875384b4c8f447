
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

use crate::Dish;

pub const SEARCH_LIMIT: usize = 25;

/// Lowercases and drops diacritics, so "Ciorbă" and "ciorba" compare equal.
/// ș/ț (comma below) and ş/ţ (cedilla) both decompose to s/t.
pub fn fold_diacritics(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
    .collect()
}

/// Plain ascii rendering of `s`; letters lose their diacritics and
/// anything else outside ascii becomes `_`.
pub fn ascii_text(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c.is_ascii() { c } else { '_' })
    .collect()
}

/// Substring match on folded names, at most [`SEARCH_LIMIT`] results in
/// catalog order. A blank query matches nothing.
pub fn search_dishes<'a>(dishes: &'a [Dish], query: &str) -> Vec<&'a Dish> {
    let query = fold_diacritics(query.trim());
    if query.is_empty() {
        return Vec::new();
    }

    dishes.iter()
        .filter(|v| fold_diacritics(&v.name).contains(&query))
        .take(SEARCH_LIMIT)
    .collect()
}
