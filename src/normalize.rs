//! Text normalization policy.
//!
//! Every value that reaches the synonym map or the entity table goes through
//! [`normalize`] first. The policy is deliberately small: trim, lowercase,
//! collapse whitespace runs. Punctuation and hyphens are preserved because
//! they are meaningful in target names (`h+/k+-атфаза`, `l-type`).

/// Trims, case-folds and collapses every whitespace run to a single space.
///
/// Lowercasing is Unicode-aware, so Cyrillic input folds the same way Latin
/// input does. The function is idempotent.
///
/// # Examples
///
/// ```
/// use pharmacanon::normalize;
///
/// assert_eq!(normalize("  Ингибиторы \t CYP3A4 "), "ингибиторы cyp3a4");
/// assert_eq!(normalize(&normalize("  LTCC ")), normalize("  LTCC "));
/// ```
#[must_use]
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for word in s.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().flat_map(char::to_lowercase));
    }
    out
}

/// Returns true if `s` is already in normalized form.
#[must_use]
pub fn is_normalized(s: &str) -> bool {
    normalize(s) == s
}
