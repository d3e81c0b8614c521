//! Text normalization for comparison keys
//!
//! Every comparison field (lot identifiers, product descriptions) passes
//! through `normalize` before it enters a reference table or a query item.
//! Display values keep their original casing; only comparison keys are
//! normalized.

/// Textual sentinels that mean "no value" in the reference sheets.
///
/// Spreadsheet exports render missing cells as the literal text "NaN"
/// (and occasionally "None"/"null"), which must not be treated as a key.
const NULL_SENTINELS: [&str; 3] = ["NAN", "NONE", "NULL"];

/// Canonicalize a raw text field for comparison.
///
/// Trims surrounding whitespace, folds case to uppercase, and replaces
/// null-like textual sentinels with the empty string. Total over any input
/// and idempotent: `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let folded = raw.trim().to_uppercase();

    if NULL_SENTINELS.contains(&folded.as_str()) {
        return String::new();
    }

    folded
}

/// True if a field normalizes to nothing (blank or a null sentinel).
pub fn is_blank(raw: &str) -> bool {
    normalize(raw).is_empty()
}
