//! Identifier Sanitizer
//!
//! Maps external poll keys to internal identifiers that are safe to use as
//! file names inside the storage directory.
//!
//! The platform path separator is replaced by [`ESCAPE_CHAR`], a Unicode
//! noncharacter. Keys that already contain the escape character are rejected
//! so the mapping stays reversible.

use std::path::MAIN_SEPARATOR;

use crate::error::{Result, SafeError};

/// Escape for the path separator, a noncharacter (U+FDD0)
pub const ESCAPE_CHAR: char = '\u{FDD0}';

/// Map an external poll key to its internal identifier
pub fn internal_id(external: &str) -> Result<String> {
    if external.contains(ESCAPE_CHAR) {
        return Err(SafeError::InvalidIdentifier(external.to_string()));
    }

    // These would resolve to the storage directory or its parent
    if external.is_empty() || external == "." || external == ".." {
        return Err(SafeError::InvalidIdentifier(external.to_string()));
    }

    Ok(external.replace(MAIN_SEPARATOR, &ESCAPE_CHAR.to_string()))
}

/// Recover the external key from an internal identifier (file name)
pub fn external_id(internal: &str) -> String {
    internal.replace(ESCAPE_CHAR, &MAIN_SEPARATOR.to_string())
}
