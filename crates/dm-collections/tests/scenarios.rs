//! End-to-end checks: declarative input through compilation, execution and
//! the result container.

use std::collections::HashSet;
use std::sync::Arc;

use dm_collections::{Collection, Finder, QueryResult};
use dm_core::config::QueryConfig;
use dm_core::{DmError, DmResult, MockPersistence, Record, Row, Value};
use dm_queries::{
    Clause, Conditions, FilterBuilder, FilterInput, FilterSpec, Group, Projection, SqlCompiler,
};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
struct Account {
    id: i64,
    status: String,
}

impl Account {
    fn new(id: i64, status: &str) -> Self {
        Self {
            id,
            status: status.to_string(),
        }
    }
}

impl Record for Account {
    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "Id" | "id" => Some(Value::Int(self.id)),
            "status" => Some(Value::from(self.status.as_str())),
            _ => None,
        }
    }
}

fn hydrate_account(row: &Row) -> DmResult<Account> {
    let id = row
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| DmError::Hydration("missing id".into()))?;
    let status = row
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default();
    Ok(Account::new(id, status))
}

fn scenario_spec() -> FilterSpec {
    let input = FilterInput::from_json(json!({
        "age": [">", 18],
        ":OR": {"status": "active", "status2": "pending"}
    }));
    FilterSpec::from_input(&input).unwrap()
}

fn users() -> SqlCompiler {
    SqlCompiler::new("users", "id")
}

#[test]
fn scenario_a_full_projection() {
    let compiled = users().compile(&scenario_spec()).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT * FROM users WHERE (age > ?) AND (status = ? OR status2 = ?)"
    );
    assert_eq!(
        compiled.bind,
        vec![Value::Int(18), Value::from("active"), Value::from("pending")]
    );
}

#[test]
fn scenario_b_count_only() {
    let spec = scenario_spec();
    let full = users().compile(&spec).unwrap();
    let counted = users()
        .compile(&spec.with_projection(Projection::CountOnly))
        .unwrap();
    assert_eq!(
        counted.sql,
        "SELECT COUNT(*) FROM users WHERE (age > ?) AND (status = ? OR status2 = ?)"
    );
    assert_eq!(counted.bind, full.bind);
    for keyword in ["ORDER", "LIMIT", "OFFSET"] {
        assert!(!counted.sql.contains(keyword));
    }
}

#[test]
fn scenario_b_drops_modifiers() {
    let input = FilterInput::from_json(json!({
        "age": [">", 18],
        ":order": {"age": "desc"},
        ":limit": [10, 20]
    }));
    let spec = FilterSpec::from_input(&input).unwrap();
    let counted = users()
        .compile(&spec.with_projection(Projection::CountOnly))
        .unwrap();
    assert_eq!(counted.sql, "SELECT COUNT(*) FROM users WHERE (age > ?)");
}

#[test]
fn scenario_c_locked_collection() {
    let mut accounts = Collection::from_vec(vec![
        Account::new(1, "active"),
        Account::new(2, "active"),
        Account::new(3, "closed"),
    ])
    .unwrap();
    accounts.lock(true);

    let err = accounts.push(Account::new(4, "active")).unwrap_err();
    assert!(matches!(err, DmError::Locked));
    assert!(matches!(accounts.unlock(), Err(DmError::NotUnlockable)));
    assert_eq!(accounts.len(), 3);
}

#[test]
fn scenario_d_reindex() {
    let mut accounts = Collection::from_vec(vec![
        Account::new(30, "a"),
        Account::new(10, "b"),
        Account::new(20, "c"),
    ])
    .unwrap();

    accounts.reindex_by_field(false, "Id").unwrap();
    let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![10, 20, 30]);

    accounts.reindex_by_field(true, "Id").unwrap();
    let ids: Vec<i64> = accounts.iter().map(|a| a.id).collect();
    assert_eq!(ids, vec![30, 20, 10]);
}

#[test]
fn compile_is_idempotent() {
    let spec = scenario_spec();
    let first = users().compile(&spec).unwrap();
    let second = users().compile(&spec).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.bind, second.bind);

    // A different target renders fresh and leaves the memo alone
    let other = SqlCompiler::new("admins", "id").compile(&spec).unwrap();
    assert!(other.sql.starts_with("SELECT * FROM admins"));
    assert!(Arc::ptr_eq(&users().compile(&spec).unwrap(), &first));
}

fn leaf_samples() -> Vec<Clause> {
    vec![
        Clause::comparison("a", dm_queries::Comparator::LtEq, 1),
        Clause::membership("b", false, vec![1.into(), 2.into(), 3.into()]),
        Clause::membership("c", true, vec!["x".into()]),
        Clause::membership("d", false, vec![]),
        Clause::pattern("e", true, "%z"),
        Clause::Raw(dm_queries::RawExpression::with_bind(
            "f BETWEEN ? AND ?",
            vec![1.into(), 9.into()],
        )),
    ]
}

#[test]
fn placeholders_match_bind_values_per_leaf() {
    for leaf in leaf_samples() {
        let expected = leaf.bind_count();
        let spec = FilterSpec::new(Group::and(vec![leaf]), Default::default());
        let compiled = users().compile(&spec).unwrap();
        assert_eq!(compiled.placeholder_count(), compiled.bind.len());
        assert_eq!(compiled.bind.len(), expected);
    }

    let null_check = FilterSpec::new(
        Group::and(vec![Clause::null_check("g", true)]),
        Default::default(),
    );
    let compiled = users().compile(&null_check).unwrap();
    assert!(compiled.bind.is_empty());
    assert_eq!(compiled.placeholder_count(), 0);
}

/// Nest the sample leaves `depth` levels deep, alternating AND and OR
fn nested(depth: usize) -> Group {
    let mut group = Group::or(leaf_samples());
    for level in 0..depth {
        let mut children = leaf_samples();
        children.insert(level % children.len(), Clause::Group(group));
        group = if level % 2 == 0 {
            Group::and(children)
        } else {
            Group::or(children)
        };
    }
    group
}

#[test]
fn parentheses_balance_with_one_pair_per_nested_group() {
    for depth in 0..6 {
        let root = Group::and(vec![Clause::Group(nested(depth)), Clause::Group(Group::or(vec![]))]);
        let groups = root.nested_group_count();
        let compiled = users()
            .compile(&FilterSpec::new(root, Default::default()))
            .unwrap();

        let mut open = 0i64;
        for ch in compiled.sql.chars() {
            match ch {
                '(' => open += 1,
                ')' => open -= 1,
                _ => {}
            }
            assert!(open >= 0);
        }
        assert_eq!(open, 0);

        // Each nested group adds one pair; each non-empty IN list adds another
        let in_lists = compiled.sql.matches("IN (").count();
        assert_eq!(compiled.sql.matches('(').count(), groups + in_lists);
        assert_eq!(compiled.placeholder_count(), compiled.bind.len());
    }
}

#[test]
fn sampling_returns_every_element_once() {
    let mut accounts: Collection<Account> = (0..25)
        .map(|i| Account::new(i, "active"))
        .fold(Collection::new(), |mut c, a| {
            c.push(a).unwrap();
            c
        });

    for _ in 0..2 {
        let mut seen = HashSet::new();
        for _ in 0..25 {
            let id = accounts.get_next_random_element().unwrap().id;
            assert!(seen.insert(id));
        }
        assert!(accounts.get_next_random_element().is_none());
        assert_eq!(seen.len(), 25);
        accounts.reset_random();
    }
}

#[test]
fn permanent_lock_blocks_every_mutation() {
    let mut accounts =
        Collection::from_vec(vec![Account::new(1, "a"), Account::new(2, "b")]).unwrap();
    accounts.lock(true);

    for _ in 0..3 {
        assert!(accounts.unlock().is_err());
        assert!(accounts.push(Account::new(3, "c")).unwrap_err().is_locked());
        assert!(accounts.unshift(Account::new(3, "c")).unwrap_err().is_locked());
        assert!(accounts.pop().unwrap_err().is_locked());
        assert!(accounts.shift().unwrap_err().is_locked());
        assert!(accounts.reindex_by_field(true, "Id").unwrap_err().is_locked());
    }
    assert_eq!(accounts.len(), 2);
}

#[test]
fn compile_errors_carry_the_path() {
    let input = FilterInput::from_json(json!({
        ":OR": [
            {"status": "active"},
            ["age", ">", 18],
            {"name": ["SOUNDS LIKE", "x"]}
        ]
    }));
    let err = FilterSpec::from_input(&input).unwrap_err();
    assert_eq!(err.path, "/:OR/2/name");
    assert_eq!(
        err.to_string(),
        format!("{} at `/:OR/2/name`", err.kind)
    );
}

#[test]
fn finder_paged_query_end_to_end() {
    let mut mock = MockPersistence::new();
    mock.expect_execute()
        .withf(|sql, bind| {
            sql == "SELECT * FROM users WHERE (age > ?) AND (status = ? OR status2 = ?) LIMIT 2 OFFSET 2"
                && bind.len() == 3
        })
        .times(1)
        .returning(|_, _| {
            let rows = [(3, "active"), (4, "pending")]
                .into_iter()
                .map(|(id, status)| {
                    let mut row = Row::new();
                    row.insert("id".into(), Value::Int(id));
                    row.insert("status".into(), Value::from(status));
                    row
                })
                .collect();
            Ok(rows)
        });
    mock.expect_execute()
        .withf(|sql, _| {
            sql == "SELECT COUNT(*) FROM users WHERE (age > ?) AND (status = ? OR status2 = ?)"
        })
        .times(1)
        .returning(|_, _| {
            let mut row = Row::new();
            row.insert("COUNT(*)".into(), Value::from("5"));
            Ok(vec![row])
        });

    let finder = Finder::new("users", Arc::new(mock), hydrate_account, QueryConfig::default());
    let page: QueryResult<Account> = finder.find_page(&scenario_spec(), 2, Some(2)).unwrap();

    assert!(page.is_paged());
    assert_eq!(page.get_page(), Some(2));
    assert_eq!(page.get_records_count_on_page(), Some(2));
    assert_eq!(page.get_total_paged_count().unwrap(), Some(5));
    assert_eq!(
        page.get_from_each("status").unwrap(),
        vec![Value::from("active"), Value::from("pending")]
    );
    assert!(page.is_locked());
}

#[test]
fn builder_and_declarative_forms_agree() {
    let built = FilterBuilder::new()
        .and_group(|g| g.gt("age", 18))
        .or_group(|g| g.eq("status", "active").eq("status2", "pending"))
        .build();
    let a = users().compile(&built).unwrap();
    let b = users().compile(&scenario_spec()).unwrap();
    assert_eq!(a.sql, b.sql);
    assert_eq!(a.bind, b.bind);
}
