//! Identifier classifier.
//!
//! # Responsibility
//! - Decide whether a token has the lexical shape of a record identifier.
//!
//! # Invariants
//! - Classification is pure and total: every string either matches or not.
//! - Surrounding whitespace is ignored.

use once_cell::sync::Lazy;
use regex::Regex;

static CLUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}-[0-9]{2}\.[0-9]{2}\.[0-9]{2}\.[0-9]+$")
        .expect("valid cluid regex")
});

/// Returns whether `token` looks like a record identifier.
///
/// Shape: `NNNN-NN-NN-NN.NN.NN.N+` (ASCII digits), checked after trimming.
pub fn is_identifier(token: &str) -> bool {
    CLUID_RE.is_match(token.trim())
}
