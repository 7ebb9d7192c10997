//! Name Mapper — deterministic property-name to column-name conversion.
//!
//! Pure, thread-safe, no caching: every call recomputes from scratch, which
//! is cheap enough that memoizing would only add contention for no benefit.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name mapping rejected a null input")]
    InvalidName,
}

/// `map(name)` per the documented algorithm:
/// 1. empty input maps to empty;
/// 2. an input that is already all upper-case letters/digits/underscore is
///    just lower-cased;
/// 3. otherwise every upper-case rune not at position 0 gets a leading `_`
///    before being lower-cased, so consecutive capitals each get their own
///    separator (`XMLHttpRequest` -> `x_m_l_http_request`).
///
/// `input: None` is the Rust stand-in for "null" from the source system —
/// `&str` has no null, so the failure mode is modeled as `Option::None`
/// rather than silently accepting an empty string for both cases.
pub fn map(input: Option<&str>) -> Result<String, NameError> {
    let name = input.ok_or(NameError::InvalidName)?;

    if name.is_empty() {
        return Ok(String::new());
    }

    if name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        return Ok(name.to_ascii_lowercase());
    }

    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(c.to_lowercase());
    }
    Ok(out)
}

/// `map(map(x)) == map(x)` for any `x` already passed through once — the
/// second pass is over text that is already all lower-case-or-underscore so
/// rule 2 applies and nothing moves.
pub fn is_idempotent(name: &str) -> bool {
    let once = map(Some(name)).unwrap_or_default();
    let twice = map(Some(&once)).unwrap_or_default();
    once == twice
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_maps_to_empty() {
        assert_eq!(map(Some("")).unwrap(), "");
    }

    #[test]
    fn null_input_fails() {
        assert_eq!(map(None), Err(NameError::InvalidName));
    }

    #[test]
    fn already_snake_case_is_unchanged() {
        assert_eq!(map(Some("created_at")).unwrap(), "created_at");
    }

    #[test]
    fn shouty_constant_is_lower_cased_only() {
        assert_eq!(map(Some("MAX_RETRIES")).unwrap(), "max_retries");
    }

    #[test]
    fn pascal_case_gets_underscore_per_capital() {
        assert_eq!(map(Some("CreatedAt")).unwrap(), "created_at");
        assert_eq!(map(Some("Id")).unwrap(), "id");
    }

    #[test]
    fn consecutive_capitals_each_split() {
        assert_eq!(map(Some("XMLHttpRequest")).unwrap(), "x_m_l_http_request");
    }

    #[test]
    fn mapping_is_idempotent() {
        for name in ["CreatedAt", "XMLHttpRequest", "id", "MAX_RETRIES", ""] {
            assert!(is_idempotent(name));
        }
    }
}
