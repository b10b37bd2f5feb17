//! Field rules and their failure reasons.
//!
//! Reason texts follow the protoc-gen-validate wording so that clients see the
//! same messages regardless of which service rejected the request.

use std::fmt::Display;
use validator::ValidateLength;

/// Constraint on a string field. Lengths count characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringRule<'a> {
    /// Exactly `n` characters
    Len(u64),
    MinLen(u64),
    MaxLen(u64),
    /// Between `min` and `max` characters, inclusive
    LenBetween(u64, u64),
    In(&'a [&'a str]),
    NotIn(&'a [&'a str]),
}

impl StringRule<'_> {
    /// `Err(reason)` when the value breaks the rule.
    pub fn check(&self, value: &str) -> Result<(), String> {
        match *self {
            StringRule::Len(n) => check(
                value.validate_length(None, None, Some(n)),
                || format!("value length must be {n} runes"),
            ),
            StringRule::MinLen(min) => check(
                value.validate_length(Some(min), None, None),
                || format!("value length must be at least {min} runes"),
            ),
            StringRule::MaxLen(max) => check(
                value.validate_length(None, Some(max), None),
                || format!("value length must be at most {max} runes"),
            ),
            StringRule::LenBetween(min, max) if min == max => StringRule::Len(min).check(value),
            StringRule::LenBetween(min, max) => check(
                value.validate_length(Some(min), Some(max), None),
                || format!("value length must be between {min} and {max} runes, inclusive"),
            ),
            StringRule::In(list) => check(list.contains(&value), || {
                format!("value must be in list {}", render_list(list))
            }),
            StringRule::NotIn(list) => check(!list.contains(&value), || {
                format!("value must not be in list {}", render_list(list))
            }),
        }
    }
}

/// Constraint on an integer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntRule<'a> {
    Gt(i64),
    Gte(i64),
    Lt(i64),
    Lte(i64),
    In(&'a [i64]),
}

impl IntRule<'_> {
    pub fn check(&self, value: i64) -> Result<(), String> {
        match *self {
            IntRule::Gt(bound) => check(value > bound, || {
                format!("value must be greater than {bound}")
            }),
            IntRule::Gte(bound) => check(value >= bound, || {
                format!("value must be greater than or equal to {bound}")
            }),
            IntRule::Lt(bound) => check(value < bound, || format!("value must be less than {bound}")),
            IntRule::Lte(bound) => check(value <= bound, || {
                format!("value must be less than or equal to {bound}")
            }),
            IntRule::In(list) => check(list.contains(&value), || {
                format!("value must be in list {}", render_list(list))
            }),
        }
    }
}

fn check(ok: bool, reason: impl FnOnce() -> String) -> Result<(), String> {
    if ok {
        Ok(())
    } else {
        Err(reason())
    }
}

fn render_list<T: Display>(items: &[T]) -> String {
    let joined = items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!("[{joined}]")
}
