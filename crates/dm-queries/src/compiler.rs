//! SQL Compiler
//!
//! Renders a `FilterSpec` into SQL text and a single ordered list of bind
//! values. Placeholders are always unnamed `?`, appended left to right in a
//! depth-first walk, so values contributed by nested groups and raw
//! expressions line up with their placeholders without any renaming.

use std::sync::Arc;

use dm_core::{CompileError, CompileErrorKind, Value};
use tracing::{debug, trace};

use crate::filters::{Clause, Combinator, Group};
use crate::spec::{FilterSpec, Projection};

/// Rendered SQL plus positional bind values
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub table: String,
    pub id_column: String,
    pub sql: String,
    pub bind: Vec<Value>,
}

impl CompiledQuery {
    fn targets(&self, table: &str, id_column: &str) -> bool {
        self.table == table && self.id_column == id_column
    }

    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

/// Compiles specs against one table
#[derive(Debug, Clone)]
pub struct SqlCompiler {
    table: String,
    id_column: String,
}

impl SqlCompiler {
    pub fn new(table: impl Into<String>, id_column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            id_column: id_column.into(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// Compile a spec.
    ///
    /// The first successful compile is memoized on the spec; later calls for
    /// the same table and id column return that same shared result. A spec
    /// compiled against a different target is rendered fresh and the memo is
    /// left untouched.
    pub fn compile(&self, spec: &FilterSpec) -> Result<Arc<CompiledQuery>, CompileError> {
        if let Some(cached) = spec.memo().get() {
            if cached.targets(&self.table, &self.id_column) {
                trace!(table = %self.table, "Compiled query served from memo");
                return Ok(Arc::clone(cached));
            }
            return self.render(spec).map(Arc::new);
        }

        let compiled = Arc::new(self.render(spec)?);
        // Cannot already be set: checked above and the cell is not shared
        let _ = spec.memo().set(Arc::clone(&compiled));
        Ok(compiled)
    }

    fn render(&self, spec: &FilterSpec) -> Result<CompiledQuery, CompileError> {
        let modifiers = spec.modifiers();
        let limit = validate_count(
            modifiers.limit.as_ref(),
            modifiers.limit_error_path(),
            CompileErrorKind::InvalidLimit,
        )?;
        let offset = validate_count(
            modifiers.offset.as_ref(),
            modifiers.offset_error_path(),
            CompileErrorKind::InvalidOffset,
        )?;

        let projection = match (modifiers.projection, modifiers.distinct) {
            (Projection::Full, false) => "*".to_string(),
            (Projection::Full, true) => "DISTINCT *".to_string(),
            (Projection::IdOnly, false) => self.id_column.clone(),
            (Projection::IdOnly, true) => format!("DISTINCT {}", self.id_column),
            (Projection::CountOnly, false) => "COUNT(*)".to_string(),
            (Projection::CountOnly, true) => format!("COUNT(DISTINCT {})", self.id_column),
        };

        let mut bind = Vec::new();
        let mut sql = format!("SELECT {} FROM {}", projection, self.table);

        if !spec.root().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&render_group(spec.root(), &mut bind));
        }

        if modifiers.projection != Projection::CountOnly {
            if !modifiers.group_by.is_empty() {
                sql.push_str(" GROUP BY ");
                sql.push_str(&modifiers.group_by.join(", "));
            }
            if let Some(order) = modifiers.order_by.to_sql() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&order);
            }
            if let Some(limit) = limit {
                sql.push_str(&format!(" LIMIT {}", limit));
            }
            if let Some(offset) = offset {
                sql.push_str(&format!(" OFFSET {}", offset));
            }
        }

        debug!(table = %self.table, sql = %sql, bind_count = bind.len(), "Compiled filter");

        Ok(CompiledQuery {
            table: self.table.clone(),
            id_column: self.id_column.clone(),
            sql,
            bind,
        })
    }
}

fn validate_count(
    value: Option<&Value>,
    path: &str,
    kind: fn(String) -> CompileErrorKind,
) -> Result<Option<u64>, CompileError> {
    match value {
        None => Ok(None),
        Some(v) => v
            .as_non_negative()
            .map(Some)
            .ok_or_else(|| CompileError::new(path, kind(v.to_string()))),
    }
}

/// Render a group's children joined by its combinator, without outer parentheses
fn render_group(group: &Group, bind: &mut Vec<Value>) -> String {
    if group.is_empty() {
        return match group.combinator {
            Combinator::And => "1 = 1".to_string(),
            Combinator::Or => "1 = 0".to_string(),
        };
    }

    group
        .children
        .iter()
        .map(|child| render_clause(child, bind))
        .collect::<Vec<_>>()
        .join(group.combinator.joiner())
}

fn render_clause(clause: &Clause, bind: &mut Vec<Value>) -> String {
    match clause {
        Clause::Comparison { field, op, value } => {
            bind.push(value.clone());
            format!("{} {} ?", field, op.as_sql())
        }
        Clause::Pattern {
            field,
            negate,
            pattern,
        } => {
            bind.push(pattern.clone());
            format!("{} {}LIKE ?", field, if *negate { "NOT " } else { "" })
        }
        Clause::NullCheck { field, is_null } => {
            format!("{} IS {}NULL", field, if *is_null { "" } else { "NOT " })
        }
        Clause::Membership {
            field,
            negate,
            values,
        } => {
            if values.is_empty() {
                // Nothing is IN an empty set; everything is NOT IN it
                return if *negate { "1 = 1" } else { "1 = 0" }.to_string();
            }
            bind.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            format!(
                "{} {}IN ({})",
                field,
                if *negate { "NOT " } else { "" },
                placeholders
            )
        }
        Clause::Raw(expr) => {
            bind.extend(expr.bind.iter().cloned());
            expr.sql.clone()
        }
        Clause::Group(group) => format!("({})", render_group(group, bind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Comparator, RawExpression};
    use crate::spec::Modifiers;
    use crate::sorts::SortCriterion;

    fn spec_of(children: Vec<Clause>) -> FilterSpec {
        FilterSpec::new(Group::and(children), Modifiers::default())
    }

    fn compile(spec: &FilterSpec) -> Arc<CompiledQuery> {
        SqlCompiler::new("users", "id").compile(spec).unwrap()
    }

    #[test]
    fn test_empty_spec() {
        let compiled = compile(&FilterSpec::all());
        assert_eq!(compiled.sql, "SELECT * FROM users");
        assert!(compiled.bind.is_empty());
    }

    #[test]
    fn test_leaf_rendering() {
        let spec = spec_of(vec![
            Clause::comparison("age", Comparator::GtEq, 21),
            Clause::pattern("name", false, "Jo%"),
            Clause::pattern("email", true, "%@spam.io"),
            Clause::null_check("deleted_at", true),
            Clause::null_check("verified_at", false),
            Clause::membership("role", false, vec!["a".into(), "b".into(), "c".into()]),
            Clause::membership("team", true, vec![7.into()]),
        ]);
        let compiled = compile(&spec);
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE age >= ? AND name LIKE ? AND email NOT LIKE ? \
             AND deleted_at IS NULL AND verified_at IS NOT NULL \
             AND role IN (?, ?, ?) AND team NOT IN (?)"
        );
        assert_eq!(
            compiled.bind,
            vec![
                Value::Int(21),
                Value::from("Jo%"),
                Value::from("%@spam.io"),
                Value::from("a"),
                Value::from("b"),
                Value::from("c"),
                Value::Int(7),
            ]
        );
        assert_eq!(compiled.placeholder_count(), compiled.bind.len());
    }

    #[test]
    fn test_empty_membership() {
        let spec = spec_of(vec![
            Clause::membership("a", false, vec![]),
            Clause::membership("b", true, vec![]),
        ]);
        let compiled = compile(&spec);
        assert_eq!(compiled.sql, "SELECT * FROM users WHERE 1 = 0 AND 1 = 1");
        assert!(compiled.bind.is_empty());
    }

    #[test]
    fn test_raw_expression_bind_order() {
        let spec = spec_of(vec![
            Clause::comparison("a", Comparator::Eq, 1),
            Clause::Group(Group::or(vec![
                Clause::Raw(RawExpression::with_bind(
                    "b BETWEEN ? AND ?",
                    vec![2.into(), 3.into()],
                )),
                Clause::comparison("c", Comparator::Lt, 4),
            ])),
            Clause::comparison("d", Comparator::Gt, 5),
        ]);
        let compiled = compile(&spec);
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE a = ? AND (b BETWEEN ? AND ? OR c < ?) AND d > ?"
        );
        let expected: Vec<Value> = (1..=5).map(Value::Int).collect();
        assert_eq!(compiled.bind, expected);
    }

    #[test]
    fn test_nested_parentheses() {
        let spec = FilterSpec::new(
            Group::or(vec![
                Clause::comparison("a", Comparator::Eq, 1),
                Clause::Group(Group::and(vec![
                    Clause::comparison("b", Comparator::Eq, 2),
                    Clause::Group(Group::or(vec![
                        Clause::comparison("c", Comparator::Eq, 3),
                        Clause::Group(Group::and(vec![])),
                    ])),
                ])),
            ]),
            Modifiers::default(),
        );
        let compiled = compile(&spec);
        assert_eq!(
            compiled.sql,
            "SELECT * FROM users WHERE a = ? OR (b = ? AND (c = ? OR (1 = 1)))"
        );
        let opens = compiled.sql.matches('(').count();
        assert_eq!(opens, compiled.sql.matches(')').count());
        assert_eq!(opens, spec.root().nested_group_count());
    }

    #[test]
    fn test_projections_and_modifiers() {
        let mut modifiers = Modifiers::default();
        modifiers.order_by.add(SortCriterion::desc("created_at"));
        modifiers.group_by.push("team".to_string());
        modifiers.limit = Some(Value::Int(10));
        modifiers.offset = Some(Value::Int(20));
        let spec = FilterSpec::new(
            Group::and(vec![Clause::comparison("a", Comparator::Eq, 1)]),
            modifiers,
        );

        assert_eq!(
            compile(&spec).sql,
            "SELECT * FROM users WHERE a = ? GROUP BY team ORDER BY created_at DESC LIMIT 10 OFFSET 20"
        );

        let ids = spec.with_projection(Projection::IdOnly);
        assert!(compile(&ids).sql.starts_with("SELECT id FROM users WHERE a = ?"));

        let count = spec.with_projection(Projection::CountOnly);
        let compiled = compile(&count);
        assert_eq!(compiled.sql, "SELECT COUNT(*) FROM users WHERE a = ?");
        assert_eq!(compiled.bind, vec![Value::Int(1)]);
    }

    #[test]
    fn test_distinct() {
        let modifiers = Modifiers {
            distinct: true,
            ..Default::default()
        };
        let spec = FilterSpec::new(Group::default(), modifiers);
        assert_eq!(compile(&spec).sql, "SELECT DISTINCT * FROM users");
        assert_eq!(
            compile(&spec.with_projection(Projection::IdOnly)).sql,
            "SELECT DISTINCT id FROM users"
        );
        assert_eq!(
            compile(&spec.with_projection(Projection::CountOnly)).sql,
            "SELECT COUNT(DISTINCT id) FROM users"
        );
    }

    #[test]
    fn test_offset_without_limit() {
        let modifiers = Modifiers {
            offset: Some(Value::Int(5)),
            ..Default::default()
        };
        let spec = FilterSpec::new(Group::default(), modifiers);
        assert_eq!(compile(&spec).sql, "SELECT * FROM users OFFSET 5");
    }

    #[test]
    fn test_rejects_non_numeric_limit() {
        let modifiers = Modifiers {
            limit: Some(Value::from("10; DROP TABLE users")),
            ..Default::default()
        };
        let spec = FilterSpec::new(Group::default(), modifiers);
        let err = SqlCompiler::new("users", "id").compile(&spec).unwrap_err();
        assert_eq!(err.path, "/:limit");
        assert!(matches!(err.kind, CompileErrorKind::InvalidLimit(_)));
        assert!(!spec.is_compiled());
    }

    #[test]
    fn test_rejects_negative_offset() {
        let modifiers = Modifiers {
            limit: Some(Value::Int(10)),
            offset: Some(Value::Int(-3)),
            ..Default::default()
        };
        let spec = FilterSpec::new(Group::default(), modifiers);
        let err = SqlCompiler::new("users", "id").compile(&spec).unwrap_err();
        assert!(matches!(err.kind, CompileErrorKind::InvalidOffset(_)));
    }

    #[test]
    fn test_numeric_string_limit_accepted() {
        let modifiers = Modifiers {
            limit: Some(Value::from("15")),
            ..Default::default()
        };
        let spec = FilterSpec::new(Group::default(), modifiers);
        assert_eq!(compile(&spec).sql, "SELECT * FROM users LIMIT 15");
    }

    #[test]
    fn test_memoized_per_spec() {
        let spec = spec_of(vec![Clause::comparison("a", Comparator::Eq, 1)]);
        let compiler = SqlCompiler::new("users", "id");

        let first = compiler.compile(&spec).unwrap();
        let second = compiler.compile(&spec).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.sql, second.sql);
        assert_eq!(first.bind, second.bind);
    }

    #[test]
    fn test_other_target_does_not_replace_memo() {
        let spec = spec_of(vec![Clause::comparison("a", Comparator::Eq, 1)]);
        let users = SqlCompiler::new("users", "id").compile(&spec).unwrap();
        let admins = SqlCompiler::new("admins", "admin_id").compile(&spec).unwrap();
        assert_eq!(admins.sql, "SELECT * FROM admins WHERE a = ?");

        let again = SqlCompiler::new("users", "id").compile(&spec).unwrap();
        assert!(Arc::ptr_eq(&users, &again));
    }
}
