//! Identifier escaping for SQLite.
//!
//! Bound parameters cannot stand in for table or column names, so every
//! identifier that ends up in statement text goes through this module first.
//! An identifier is rejected (or sanitized, depending on the
//! [`InvalidCharPolicy`]) when it contains:
//!
//! - a NUL character,
//! - a lone UTF-16 surrogate (only reachable through [`escape_utf16`], since a
//!   Rust `str` cannot hold one),
//! - a Unicode non-character: `U+FDD0..=U+FDEF` or the last two code points of
//!   any plane.
//!
//! The sanitized text then has every `"` doubled and is wrapped in double
//! quotes.

use rusqlite::types::Value;

use crate::error::{DbError, InvalidCharClass, Result};

/// What to do with a disallowed code point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidCharPolicy {
    /// Fail with [`DbError::InvalidIdentifier`].
    #[default]
    Reject,
    /// Substitute the given character.
    Replace(char),
    /// Drop the code point.
    Strip,
}

enum Unit {
    Char(char),
    Surrogate(u16),
}

fn classify(point: u32) -> Option<InvalidCharClass> {
    match point {
        0 => Some(InvalidCharClass::Nul),
        0xD800..=0xDBFF => Some(InvalidCharClass::HighSurrogate),
        0xDC00..=0xDFFF => Some(InvalidCharClass::LowSurrogate),
        0xFDD0..=0xFDEF => Some(InvalidCharClass::NonCharacter),
        p if matches!(p & 0xFFFF, 0xFFFE | 0xFFFF) => Some(InvalidCharClass::NonCharacter),
        _ => None,
    }
}

fn sanitize<I, F>(units: I, policy: InvalidCharPolicy, original: F) -> Result<String>
where
    I: Iterator<Item = Unit>,
    F: Fn() -> String,
{
    let mut out = String::new();

    for unit in units {
        let class = match unit {
            Unit::Char(ch) => match classify(ch as u32) {
                None => {
                    out.push(ch);
                    continue;
                }
                Some(class) => class,
            },
            Unit::Surrogate(s) => classify(s as u32).unwrap_or(InvalidCharClass::LowSurrogate),
        };

        match policy {
            InvalidCharPolicy::Reject => {
                return Err(DbError::InvalidIdentifier {
                    class,
                    identifier: original(),
                });
            }
            InvalidCharPolicy::Replace(replacement) => out.push(replacement),
            InvalidCharPolicy::Strip => {}
        }
    }

    Ok(out.replace('"', "\"\""))
}

/// Sanitizes `identifier` and doubles its quotes without wrapping it.
pub fn escape_without_literal(identifier: &str, policy: InvalidCharPolicy) -> Result<String> {
    sanitize(identifier.chars().map(Unit::Char), policy, || {
        identifier.to_string()
    })
}

/// Quotes `identifier` for literal interpolation, rejecting invalid code points.
///
/// ```
/// use formsql_db::escape::escape;
///
/// assert_eq!(escape("Children").unwrap(), r#""Children""#);
/// assert_eq!(escape(r#"a"b"#).unwrap(), r#""a""b""#);
/// assert!(escape("bad\0name").is_err());
/// ```
pub fn escape(identifier: &str) -> Result<String> {
    escape_with(identifier, InvalidCharPolicy::Reject)
}

pub fn escape_with(identifier: &str, policy: InvalidCharPolicy) -> Result<String> {
    Ok(format!("\"{}\"", escape_without_literal(identifier, policy)?))
}

/// Quotes an identifier given as UTF-16 code units, which may contain lone
/// surrogates.
pub fn escape_utf16(identifier: &[u16], policy: InvalidCharPolicy) -> Result<String> {
    let units = char::decode_utf16(identifier.iter().copied()).map(|r| match r {
        Ok(ch) => Unit::Char(ch),
        Err(err) => Unit::Surrogate(err.unpaired_surrogate()),
    });
    let sanitized = sanitize(units, policy, || String::from_utf16_lossy(identifier))?;
    Ok(format!("\"{sanitized}\""))
}

/// Builds the `"table"."field"` form used for qualified columns.
pub fn qualify(table: &str, field: &str) -> Result<String> {
    Ok(format!("{}.{}", escape(table)?, escape(field)?))
}

/// Escapes a dynamically typed value.
///
/// Integers, reals and NULL need no quoting and are returned unchanged. Text is
/// quoted like any identifier; blobs are decoded lossily first.
pub fn escape_value(value: Value, policy: InvalidCharPolicy) -> Result<Value> {
    match value {
        Value::Null | Value::Integer(_) | Value::Real(_) => Ok(value),
        Value::Text(text) => Ok(Value::Text(escape_with(&text, policy)?)),
        Value::Blob(bytes) => Ok(Value::Text(escape_with(
            &String::from_utf8_lossy(&bytes),
            policy,
        )?)),
    }
}
