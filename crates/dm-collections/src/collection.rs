//! Collection
//!
//! Ordered container of hydrated entities. The element type is fixed by the
//! first insert (or up front via `with_element_type`) and checked on every
//! later insert. A locked collection refuses membership and order changes;
//! `lock(true)` makes that permanent.

use std::cmp::Ordering;
use std::collections::HashSet;

use dm_core::{DmError, DmResult, Record, Row, Value};
use rand::Rng;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Collection<T> {
    elements: Vec<T>,
    element_type: Option<&'static str>,
    locked: bool,
    unlockable: bool,
    /// Indices handed out by the current sampling epoch
    drawn: HashSet<usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            element_type: None,
            locked: false,
            unlockable: true,
            drawn: HashSet::new(),
        }
    }
}

impl<T: Record> Collection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty collection that only accepts `record_type` elements
    pub fn with_element_type(record_type: &'static str) -> Self {
        Self {
            element_type: Some(record_type),
            ..Self::default()
        }
    }

    /// Collection holding `elements`, which must all share one record type
    pub fn from_vec(elements: Vec<T>) -> DmResult<Self> {
        let mut collection = Self::new();
        for element in elements {
            collection.push(element)?;
        }
        Ok(collection)
    }

    // Membership

    pub fn push(&mut self, value: T) -> DmResult<()> {
        self.admit(&value)?;
        self.elements.push(value);
        self.drawn.clear();
        Ok(())
    }

    pub fn unshift(&mut self, value: T) -> DmResult<()> {
        self.admit(&value)?;
        self.elements.insert(0, value);
        self.drawn.clear();
        Ok(())
    }

    pub fn pop(&mut self) -> DmResult<Option<T>> {
        self.ensure_unlocked()?;
        let value = self.elements.pop();
        if value.is_some() {
            self.drawn.clear();
        }
        Ok(value)
    }

    pub fn shift(&mut self) -> DmResult<Option<T>> {
        self.ensure_unlocked()?;
        if self.elements.is_empty() {
            return Ok(None);
        }
        self.drawn.clear();
        Ok(Some(self.elements.remove(0)))
    }

    fn admit(&mut self, value: &T) -> DmResult<()> {
        self.ensure_unlocked()?;
        let found = value.record_type();
        match self.element_type {
            Some(expected) if expected != found => Err(DmError::ClassMismatch {
                expected: expected.to_string(),
                found,
            }),
            Some(_) => Ok(()),
            None => {
                self.element_type = Some(found);
                Ok(())
            }
        }
    }

    fn ensure_unlocked(&self) -> DmResult<()> {
        if self.locked {
            Err(DmError::Locked)
        } else {
            Ok(())
        }
    }

    // Locking

    /// Lock the collection; `disallow_unlock` makes the lock permanent
    pub fn lock(&mut self, disallow_unlock: bool) {
        self.locked = true;
        if disallow_unlock {
            self.unlockable = false;
        }
        debug!(
            len = self.elements.len(),
            permanent = !self.unlockable,
            "Collection locked"
        );
    }

    pub fn unlock(&mut self) -> DmResult<()> {
        if !self.unlockable {
            return Err(DmError::NotUnlockable);
        }
        self.locked = false;
        debug!(len = self.elements.len(), "Collection unlocked");
        Ok(())
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_unlockable(&self) -> bool {
        self.unlockable
    }

    // Ordering

    /// Stable sort by `field`, ascending unless `reverse`.
    ///
    /// Fails without touching the order if the collection is locked or any
    /// element lacks the field.
    pub fn reindex_by_field(&mut self, reverse: bool, field: &str) -> DmResult<()> {
        self.ensure_unlocked()?;
        let keys = self
            .elements
            .iter()
            .map(|element| read_field(element, field))
            .collect::<DmResult<Vec<_>>>()?;

        let mut keyed: Vec<(Value, T)> = keys.into_iter().zip(self.elements.drain(..)).collect();
        keyed.sort_by(|(a, _), (b, _)| {
            let ordering = a.compare(b);
            if reverse {
                ordering.reverse()
            } else {
                ordering
            }
        });
        self.elements = keyed.into_iter().map(|(_, element)| element).collect();
        self.drawn.clear();
        Ok(())
    }

    // Sampling

    /// Draw a not-yet-returned element uniformly at random, or `None` once
    /// every element has been drawn in this epoch
    pub fn get_next_random_element(&mut self) -> Option<&T> {
        self.next_random_element_with(&mut rand::rng())
    }

    /// `get_next_random_element` with a caller-supplied generator
    pub fn next_random_element_with<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&T> {
        let pool: Vec<usize> = (0..self.elements.len())
            .filter(|i| !self.drawn.contains(i))
            .collect();
        if pool.is_empty() {
            return None;
        }
        let index = pool[rng.random_range(0..pool.len())];
        self.drawn.insert(index);
        self.elements.get(index)
    }

    /// Start a new sampling epoch
    pub fn reset_random(&mut self) {
        self.drawn.clear();
    }

    // Bulk accessors

    pub fn get_from_each(&self, field: &str) -> DmResult<Vec<Value>> {
        self.elements
            .iter()
            .map(|element| read_field(element, field))
            .collect()
    }

    /// One row per element holding each requested field
    pub fn get_from_each_many(&self, fields: &[&str]) -> DmResult<Vec<Row>> {
        self.elements
            .iter()
            .map(|element| {
                fields
                    .iter()
                    .map(|field| Ok((field.to_string(), read_field(element, field)?)))
                    .collect::<DmResult<Row>>()
            })
            .collect()
    }

    /// Write `value` into `field` on every element, in order
    pub fn set_for_each(&mut self, field: &str, value: Value) -> DmResult<()> {
        for element in &mut self.elements {
            element.set_field(field, value.clone())?;
        }
        Ok(())
    }

    pub fn call_for_each(&self, method: &str, args: &[Value]) -> DmResult<Vec<Value>> {
        self.elements
            .iter()
            .map(|element| element.call(method, args))
            .collect()
    }

    // Access

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    pub fn first(&self) -> Option<&T> {
        self.elements.first()
    }

    pub fn last(&self) -> Option<&T> {
        self.elements.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    pub fn into_vec(self) -> Vec<T> {
        self.elements
    }

    pub fn element_type(&self) -> Option<&'static str> {
        self.element_type
    }
}

impl<T: Record + Clone> Collection<T> {
    /// Unlocked collection of the elements whose `field` equals `value`
    ///
    /// Fields are read per element, so an empty collection yields an empty
    /// result even when `field` does not exist on the record type.
    pub fn get_elements_by_property_value(&self, field: &str, value: &Value) -> DmResult<Self> {
        self.filtered(|element| Ok(read_field(element, field)?.compare(value) == Ordering::Equal))
    }

    /// Unlocked collection of the elements for which `method(args)` returns `expected`
    ///
    /// As with `get_elements_by_property_value`, an empty collection never
    /// calls `method` and so cannot report an unknown one.
    pub fn get_elements_by_function_result(
        &self,
        method: &str,
        args: &[Value],
        expected: &Value,
    ) -> DmResult<Self> {
        self.filtered(|element| Ok(element.call(method, args)?.compare(expected) == Ordering::Equal))
    }

    fn filtered(&self, mut keep: impl FnMut(&T) -> DmResult<bool>) -> DmResult<Self> {
        let mut subset = Self {
            element_type: self.element_type,
            ..Self::default()
        };
        for element in &self.elements {
            if keep(element)? {
                subset.elements.push(element.clone());
            }
        }
        Ok(subset)
    }
}

fn read_field<T: Record>(element: &T, field: &str) -> DmResult<Value> {
    element.field(field).ok_or_else(|| DmError::UnknownField {
        record_type: element.record_type(),
        field: field.to_string(),
    })
}

impl<T> IntoIterator for Collection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a Collection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}
