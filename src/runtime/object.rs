//! Object representation
//!
//! An object maps string keys to variables owned by the collector. Every
//! handle stored in the table holds one count on its target; the table
//! takes it on insert and gives it back on overwrite or removal.

use log::warn;

use crate::gc::{GarbageCollector, Handle};
use crate::runtime::property::PropertyTable;
use crate::value::{render, Frame, Variable};

/// String-keyed property store
#[derive(Debug, Default)]
pub struct Object {
    properties: PropertyTable<Handle<Variable>>,
}

impl Object {
    /// Create a new empty object
    pub fn new() -> Self {
        Object {
            properties: PropertyTable::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Store `value` under `key`, releasing whatever was there before
    ///
    /// A freed `value` is not stored.
    pub fn add_property(
        &mut self,
        key: &str,
        value: Handle<Variable>,
        gc: &mut GarbageCollector<Variable>,
    ) {
        if !gc.contains(value) {
            warn!("object: {key:?} not set, {value:?} is stale");
            return;
        }
        gc.inc_counter(value);
        if let Some(old) = self.properties.set(key, value) {
            gc.dec_counter(old);
        }
    }

    /// Look up `key`, returning an owned handle
    ///
    /// A miss yields a fresh Undefined. With `allocate` set, that Undefined
    /// is also stored under `key`.
    pub fn get_property(
        &mut self,
        key: &str,
        allocate: bool,
        gc: &mut GarbageCollector<Variable>,
    ) -> Handle<Variable> {
        if let Some(value) = self.properties.get(key) {
            gc.inc_counter(value);
            return value;
        }

        let value = gc.allocate();
        if allocate {
            gc.inc_counter(value);
            self.properties.set(key, value);
        }
        value
    }

    /// Borrow the handle stored under `key` without touching its count
    #[inline]
    pub fn peek(&self, key: &str) -> Option<Handle<Variable>> {
        self.properties.get(key)
    }

    /// Drop `key`, releasing the table's count on its value
    pub fn remove_property(&mut self, key: &str, gc: &mut GarbageCollector<Variable>) {
        if let Some(old) = self.properties.delete(key) {
            gc.dec_counter(old);
        }
    }

    /// Iterate over `(key, value)` pairs in slot order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Handle<Variable>)> + '_ {
        self.properties.iter()
    }

    /// Render as `{k: v,k2: v2,}`
    pub fn to_string(&self, gc: &GarbageCollector<Variable>) -> String {
        render(Frame::Object(self), gc)
    }

    /// Copy of the table that shares its handles; counts are the caller's job
    pub(crate) fn share(&self) -> Self {
        Object {
            properties: self.properties.clone(),
        }
    }

    pub(crate) fn handles(&self) -> impl Iterator<Item = Handle<Variable>> + '_ {
        self.properties.values()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.properties.get(key) == Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number(gc: &mut GarbageCollector<Variable>, n: f64) -> Handle<Variable> {
        gc.allocate_with(Variable::Number(n.into()))
    }

    #[test]
    fn test_add_and_get() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let v = number(&mut gc, 1.0);
        obj.add_property("a", v, &mut gc);
        assert_eq!(gc.get_counter(v), 2);
        assert_eq!(obj.len(), 1);

        let got = obj.get_property("a", false, &mut gc);
        assert_eq!(got, v);
        assert_eq!(gc.get_counter(v), 3);
    }

    #[test]
    fn test_stale_value_not_stored() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let v = number(&mut gc, 1.0);
        gc.dec_counter(v);
        obj.add_property("a", v, &mut gc);
        assert!(obj.is_empty());
        assert_eq!(obj.peek("a"), None);
    }

    #[test]
    fn test_overwrite_releases_old_value() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let first = number(&mut gc, 1.0);
        obj.add_property("a", first, &mut gc);
        gc.dec_counter(first);
        assert_eq!(gc.get_counter(first), 1);

        let second = number(&mut gc, 2.0);
        obj.add_property("a", second, &mut gc);
        assert!(!gc.contains(first));
        assert_eq!(obj.peek("a"), Some(second));
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_readd_same_value_keeps_count() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let v = number(&mut gc, 1.0);
        obj.add_property("a", v, &mut gc);
        obj.add_property("a", v, &mut gc);
        assert_eq!(gc.get_counter(v), 2);
    }

    #[test]
    fn test_get_missing_without_allocate() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let got = obj.get_property("missing", false, &mut gc);
        assert!(matches!(gc.get(got), Ok(Variable::Undefined)));
        assert_eq!(gc.get_counter(got), 1);
        assert!(obj.is_empty());
    }

    #[test]
    fn test_get_missing_with_allocate() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let got = obj.get_property("x", true, &mut gc);
        assert_eq!(obj.len(), 1);
        assert_eq!(obj.peek("x"), Some(got));
        assert_eq!(gc.get_counter(got), 2);

        let again = obj.get_property("x", true, &mut gc);
        assert_eq!(again, got);
        assert_eq!(obj.len(), 1);
    }

    #[test]
    fn test_remove_property() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let v = number(&mut gc, 3.0);
        obj.add_property("a", v, &mut gc);
        obj.remove_property("a", &mut gc);
        assert!(obj.is_empty());
        assert_eq!(gc.get_counter(v), 1);

        obj.remove_property("a", &mut gc);
        assert_eq!(gc.get_counter(v), 1);
    }

    #[test]
    fn test_to_string() {
        let mut gc = GarbageCollector::new();
        let mut obj = Object::new();

        let a = number(&mut gc, 1.0);
        let b = gc.allocate_with(Variable::String("hi".to_string()));
        obj.add_property("a", a, &mut gc);
        obj.add_property("b", b, &mut gc);

        assert_eq!(obj.to_string(&gc), "{a: 1.000000,b: hi,}");
        assert_eq!(Object::new().to_string(&gc), "{}");
    }

    #[test]
    fn test_equality_compares_handles() {
        let mut gc = GarbageCollector::new();
        let v = number(&mut gc, 1.0);
        let w = number(&mut gc, 1.0);

        let mut a = Object::new();
        let mut b = Object::new();
        a.add_property("x", v, &mut gc);
        a.add_property("y", w, &mut gc);
        b.add_property("y", w, &mut gc);
        b.add_property("x", v, &mut gc);
        assert!(a == b);

        let mut c = Object::new();
        c.add_property("x", w, &mut gc);
        c.add_property("y", v, &mut gc);
        assert!(a != c);
    }
}
