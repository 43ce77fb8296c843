//! Clause Classifier
//!
//! All shape-sniffing of declarative input lives here. Given one raw
//! `(key, value)` entry it decides which clause shape the entry is, using a
//! fixed precedence where the first matching rule wins:
//!
//! 1. `QueryRule` - key is `:order`, `:limit` or `:group` (any case)
//! 2. `Expression` - value is a raw expression
//! 3. `Scalar` - named key, scalar value, key whitelisted (if a whitelist is given)
//! 4. `CompareShort` - named key, value is a 2-element list `[operator, operand]`
//! 5. `CompareLong` - numeric key, value is a 3-element list `[field, operator, operand]`
//! 6. `SubGroup` - `:`-prefixed key, or numeric key with a composite value
//! 7. `Unknown`
//!
//! "Named" means neither numeric nor `:`-prefixed.

use std::collections::HashSet;

use crate::input::{FilterInput, FilterKey};

/// Keys that configure the query instead of filtering it
pub const QUERY_RULES: [&str; 3] = [":order", ":limit", ":group"];

/// Resolved shape of one declarative entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Scalar,
    CompareShort,
    CompareLong,
    SubGroup,
    Expression,
    QueryRule,
    Unknown,
}

/// Is `name` one of the query-rule keys?
pub fn is_query_rule(name: &str) -> bool {
    QUERY_RULES.iter().any(|rule| rule.eq_ignore_ascii_case(name))
}

/// Classify one `(key, value)` entry.
///
/// `known_fields`, when supplied, restricts which keys may be read as
/// `field = value` scalar entries.
pub fn classify(
    key: &FilterKey,
    value: &FilterInput,
    known_fields: Option<&HashSet<String>>,
) -> ClauseKind {
    if key.as_name().is_some_and(is_query_rule) {
        return ClauseKind::QueryRule;
    }

    if matches!(value, FilterInput::Expression(_)) {
        return ClauseKind::Expression;
    }

    let numeric = key.is_numeric();
    let prefixed = key.as_name().is_some_and(|name| name.starts_with(':'));

    if let (false, false, Some(name)) = (numeric, prefixed, key.as_name()) {
        if matches!(value, FilterInput::Scalar(_))
            && known_fields.map_or(true, |fields| fields.contains(name))
        {
            return ClauseKind::Scalar;
        }
        if value.as_sequence().is_some_and(|seq| seq.len() == 2) {
            return ClauseKind::CompareShort;
        }
    }

    if numeric {
        // Field and operator slots must at least be scalars; whether they
        // are strings is checked when the clause is built.
        let triple = value.as_sequence().is_some_and(|seq| {
            seq.len() == 3 && !seq[0].is_composite() && !seq[1].is_composite()
        });
        if triple {
            return ClauseKind::CompareLong;
        }
    }

    if prefixed || (numeric && value.is_composite()) {
        return ClauseKind::SubGroup;
    }

    ClauseKind::Unknown
}
