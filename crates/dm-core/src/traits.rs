//! Core traits shared by the query and collection layers
//!
//! `Record` replaces magic property access with explicit, fallible accessors.
//! `Persistence` and `Hydrator` are the collaborators this workspace talks to
//! but never implements for a real database.

use crate::error::{DmError, DmResult, StorageError};
use crate::value::{Row, Value};

/// Reflective access to a hydrated entity
///
/// Collections use this to check element types, sort by field, and run the
/// bulk `*_for_each` accessors.
pub trait Record {
    /// Name of the concrete entity type, used for homogeneity checks
    fn record_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Read a field. `None` means the field does not exist on this type;
    /// an existing NULL field is `Some(Value::Null)`.
    fn field(&self, name: &str) -> Option<Value>;

    /// Write a field
    fn set_field(&mut self, name: &str, _value: Value) -> DmResult<()> {
        Err(DmError::UnknownField {
            record_type: self.record_type(),
            field: name.to_string(),
        })
    }

    /// Invoke a named method
    fn call(&self, method: &str, _args: &[Value]) -> DmResult<Value> {
        Err(DmError::UnknownMethod {
            record_type: self.record_type(),
            method: method.to_string(),
        })
    }
}

impl<R: Record + ?Sized> Record for Box<R> {
    fn record_type(&self) -> &'static str {
        (**self).record_type()
    }

    fn field(&self, name: &str) -> Option<Value> {
        (**self).field(name)
    }

    fn set_field(&mut self, name: &str, value: Value) -> DmResult<()> {
        (**self).set_field(name, value)
    }

    fn call(&self, method: &str, args: &[Value]) -> DmResult<Value> {
        (**self).call(method, args)
    }
}

/// Executes compiled SQL with positional bind values
///
/// Blocking; timeouts and cancellation are the implementor's concern.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
pub trait Persistence: Send + Sync {
    fn execute(&self, sql: &str, bind: &[Value]) -> Result<Vec<Row>, StorageError>;
}

/// Converts a raw row into a typed entity
pub trait Hydrator<T> {
    fn hydrate(&self, row: &Row) -> DmResult<T>;
}

impl<T, F> Hydrator<T> for F
where
    F: Fn(&Row) -> DmResult<T>,
{
    fn hydrate(&self, row: &Row) -> DmResult<T> {
        self(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tag {
        label: String,
    }

    impl Record for Tag {
        fn field(&self, name: &str) -> Option<Value> {
            match name {
                "label" => Some(Value::from(self.label.as_str())),
                _ => None,
            }
        }
    }

    #[test]
    fn test_default_record_type_is_type_name() {
        let tag = Tag {
            label: "x".to_string(),
        };
        assert!(tag.record_type().ends_with("Tag"));

        let boxed: Box<dyn Record> = Box::new(tag);
        assert!(boxed.record_type().ends_with("Tag"));
    }

    #[test]
    fn test_default_set_field_rejects() {
        let mut tag = Tag {
            label: "x".to_string(),
        };
        let err = tag.set_field("label", Value::from("y")).unwrap_err();
        assert!(matches!(err, DmError::UnknownField { .. }));
        assert!(tag.call("shout", &[]).is_err());
    }

    #[test]
    fn test_closure_hydrator() {
        let hydrator = |row: &Row| -> DmResult<String> {
            row.get("label")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| DmError::Hydration("missing label".into()))
        };

        let mut row = Row::new();
        row.insert("label".into(), Value::from("urgent"));
        assert_eq!(hydrator.hydrate(&row).unwrap(), "urgent");
        assert!(hydrator.hydrate(&Row::new()).is_err());
    }

    #[test]
    fn test_mock_persistence() {
        let mut mock = MockPersistence::new();
        mock.expect_execute()
            .withf(|sql, bind| sql == "SELECT 1" && bind.is_empty())
            .returning(|_, _| Ok(vec![Row::new()]));

        let rows = mock.execute("SELECT 1", &[]).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
