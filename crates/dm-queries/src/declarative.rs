//! Declarative Filters
//!
//! Walks a nested `FilterInput` top-down, classifies each entry and turns it
//! into a `Clause`. Sub-groups recurse; query rules (`:order`, `:limit`,
//! `:group`) update the spec's modifiers wherever they appear.
//!
//! Each top-level entry becomes its own parenthesized term of the root
//! conjunction, so `{"age": [">", 18], ":OR": {...}}` renders as
//! `(age > ?) AND (... OR ...)`. Below the top level, leaves render bare.

use std::collections::HashSet;

use dm_core::{CompileError, CompileErrorKind, Value};

use crate::classifier::{classify, ClauseKind};
use crate::filters::{Clause, Combinator, Comparator, FilterOperator, Group};
use crate::input::{FilterInput, FilterKey};
use crate::sorts::{SortCriterion, SortDirection};
use crate::spec::{FilterSpec, Modifiers};

/// Parse declarative input into a spec
pub fn parse(input: &FilterInput) -> Result<FilterSpec, CompileError> {
    Parser::new(None).parse(input)
}

/// Parse declarative input, reading only whitelisted keys as scalar entries
pub fn parse_with_fields(
    input: &FilterInput,
    known_fields: &HashSet<String>,
) -> Result<FilterSpec, CompileError> {
    Parser::new(Some(known_fields)).parse(input)
}

struct Parser<'a> {
    known_fields: Option<&'a HashSet<String>>,
    modifiers: Modifiers,
}

impl<'a> Parser<'a> {
    fn new(known_fields: Option<&'a HashSet<String>>) -> Self {
        Self {
            known_fields,
            modifiers: Modifiers::default(),
        }
    }

    fn parse(mut self, input: &FilterInput) -> Result<FilterSpec, CompileError> {
        let children = self
            .parse_entries(input, "")?
            .into_iter()
            .map(|clause| match clause {
                Clause::Group(group) => Clause::Group(group),
                leaf => Clause::Group(Group::and(vec![leaf])),
            })
            .collect();

        Ok(FilterSpec::new(Group::and(children), self.modifiers))
    }

    fn parse_entries(
        &mut self,
        input: &FilterInput,
        path: &str,
    ) -> Result<Vec<Clause>, CompileError> {
        let entries = input.entries().ok_or_else(|| {
            CompileError::new(display_path(path), CompileErrorKind::UnknownShape)
        })?;

        let mut clauses = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let entry_path = format!("{}/{}", path, key);
            match classify(&key, value, self.known_fields) {
                ClauseKind::QueryRule => self.apply_rule(&key, value, &entry_path)?,
                kind => clauses.push(self.parse_entry(kind, &key, value, &entry_path)?),
            }
        }
        Ok(clauses)
    }

    fn parse_entry(
        &mut self,
        kind: ClauseKind,
        key: &FilterKey,
        value: &FilterInput,
        path: &str,
    ) -> Result<Clause, CompileError> {
        match kind {
            ClauseKind::Scalar => {
                let field = key.to_string();
                Ok(match value.as_scalar() {
                    Some(Value::Null) | None => Clause::null_check(field, true),
                    Some(v) => Clause::comparison(field, Comparator::Eq, v.clone()),
                })
            }
            ClauseKind::CompareShort => {
                let seq = sequence(value, path)?;
                let op = seq[0].as_str().ok_or_else(|| malformed(path))?;
                operator_clause(key.to_string(), op, seq[1], path)
            }
            ClauseKind::CompareLong => {
                let seq = sequence(value, path)?;
                let (Some(field), Some(op)) = (seq[0].as_str(), seq[1].as_str()) else {
                    return Err(malformed(path));
                };
                operator_clause(field.to_string(), op, seq[2], path)
            }
            ClauseKind::Expression => match value {
                FilterInput::Expression(expr) => Ok(Clause::Raw(expr.clone())),
                _ => Err(CompileError::new(path, CompileErrorKind::UnknownShape)),
            },
            ClauseKind::SubGroup => {
                let combinator = match key.as_name() {
                    Some(name) if !key.is_numeric() => {
                        Combinator::from_key(name).ok_or_else(|| {
                            CompileError::new(
                                path,
                                CompileErrorKind::UnknownCombinator(name.to_string()),
                            )
                        })?
                    }
                    _ => Combinator::And,
                };
                let children = self.parse_entries(value, path)?;
                Ok(Clause::Group(Group::new(combinator, children)))
            }
            ClauseKind::QueryRule | ClauseKind::Unknown => {
                Err(CompileError::new(path, CompileErrorKind::UnknownShape))
            }
        }
    }

    fn apply_rule(
        &mut self,
        key: &FilterKey,
        value: &FilterInput,
        path: &str,
    ) -> Result<(), CompileError> {
        let rule = key.to_string().to_lowercase();
        match rule.as_str() {
            ":order" => self.apply_order(value, path),
            ":limit" => self.apply_limit(value, path),
            ":group" => self.apply_group(value, path),
            _ => Err(CompileError::new(path, CompileErrorKind::UnknownShape)),
        }
    }

    fn apply_order(&mut self, value: &FilterInput, path: &str) -> Result<(), CompileError> {
        if let Some(text) = value.as_str() {
            self.modifiers.order_by.add(SortCriterion::asc(text));
            return Ok(());
        }

        if let Some(items) = value.as_sequence() {
            for item in items {
                let criterion = match (item.as_str(), item.as_sequence()) {
                    (Some(field), _) => SortCriterion::asc(field),
                    (None, Some(pair)) if pair.len() == 2 => {
                        let field = pair[0]
                            .as_str()
                            .ok_or_else(|| invalid_order(path, item))?;
                        SortCriterion::new(field, direction(pair[1], path)?)
                    }
                    _ => return Err(invalid_order(path, item)),
                };
                self.modifiers.order_by.add(criterion);
            }
            return Ok(());
        }

        match value {
            FilterInput::Map(entries) => {
                for (field, dir) in entries {
                    let field = field.as_name().ok_or_else(|| invalid_order(path, value))?;
                    self.modifiers
                        .order_by
                        .add(SortCriterion::new(field, direction(dir, path)?));
                }
                Ok(())
            }
            _ => Err(invalid_order(path, value)),
        }
    }

    fn apply_limit(&mut self, value: &FilterInput, path: &str) -> Result<(), CompileError> {
        let invalid = || CompileError::new(path, CompileErrorKind::InvalidLimit(value.describe()));

        if let Some(limit) = value.as_scalar() {
            self.modifiers.limit = Some(limit.clone());
            self.modifiers.limit_path = Some(path.to_string());
            return Ok(());
        }

        let seq = value.as_sequence().ok_or_else(invalid)?;
        match seq.as_slice() {
            [limit] => {
                self.modifiers.limit = Some(limit.as_scalar().ok_or_else(invalid)?.clone());
                self.modifiers.limit_path = Some(format!("{}/0", path));
            }
            [limit, offset] => {
                self.modifiers.limit = Some(limit.as_scalar().ok_or_else(invalid)?.clone());
                self.modifiers.offset = Some(offset.as_scalar().ok_or_else(invalid)?.clone());
                self.modifiers.limit_path = Some(format!("{}/0", path));
                self.modifiers.offset_path = Some(format!("{}/1", path));
            }
            _ => return Err(invalid()),
        }
        Ok(())
    }

    fn apply_group(&mut self, value: &FilterInput, path: &str) -> Result<(), CompileError> {
        if let Some(field) = value.as_str() {
            self.modifiers.group_by.push(field.to_string());
            return Ok(());
        }

        let unknown = || CompileError::new(path, CompileErrorKind::UnknownShape);
        let items = value.as_sequence().ok_or_else(unknown)?;
        for item in items {
            let field = item.as_str().ok_or_else(unknown)?;
            self.modifiers.group_by.push(field.to_string());
        }
        Ok(())
    }
}

/// Build the clause for `field <operator> operand`
fn operator_clause(
    field: String,
    op: &str,
    operand: &FilterInput,
    path: &str,
) -> Result<Clause, CompileError> {
    let operator = FilterOperator::from_str(op).ok_or_else(|| {
        CompileError::new(path, CompileErrorKind::UnknownOperator(op.to_string()))
    })?;
    let unknown = || CompileError::new(path, CompileErrorKind::UnknownShape);

    match operator {
        FilterOperator::Compare(cmp) => match operand.as_scalar().ok_or_else(unknown)? {
            Value::Null if cmp == Comparator::Eq => Ok(Clause::null_check(field, true)),
            Value::Null if cmp == Comparator::NotEq => Ok(Clause::null_check(field, false)),
            v => Ok(Clause::comparison(field, cmp, v.clone())),
        },
        FilterOperator::In | FilterOperator::NotIn => {
            let negate = operator == FilterOperator::NotIn;
            let values = match operand {
                FilterInput::Scalar(v) => vec![v.clone()],
                other => other
                    .as_sequence()
                    .ok_or_else(unknown)?
                    .into_iter()
                    .map(|item| item.as_scalar().cloned().ok_or_else(unknown))
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Ok(Clause::membership(field, negate, values))
        }
        FilterOperator::Like | FilterOperator::NotLike => {
            let pattern = operand.as_scalar().ok_or_else(unknown)?;
            Ok(Clause::pattern(
                field,
                operator == FilterOperator::NotLike,
                pattern.clone(),
            ))
        }
        FilterOperator::Is | FilterOperator::IsNot => match operand.as_scalar() {
            Some(Value::Null) => Ok(Clause::null_check(field, operator == FilterOperator::Is)),
            _ => Err(unknown()),
        },
    }
}

fn sequence<'i>(value: &'i FilterInput, path: &str) -> Result<Vec<&'i FilterInput>, CompileError> {
    value
        .as_sequence()
        .ok_or_else(|| CompileError::new(path, CompileErrorKind::UnknownShape))
}

fn direction(value: &FilterInput, path: &str) -> Result<SortDirection, CompileError> {
    value
        .as_str()
        .and_then(SortDirection::from_str)
        .ok_or_else(|| invalid_order(path, value))
}

fn malformed(path: &str) -> CompileError {
    CompileError::new(path, CompileErrorKind::MalformedComparison)
}

fn invalid_order(path: &str, value: &FilterInput) -> CompileError {
    CompileError::new(path, CompileErrorKind::InvalidOrder(value.describe()))
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}
