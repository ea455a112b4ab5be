//! Array implementation
//!
//! Arrays are dense: every index below the length holds a live variable.
//! Writes and create-on-miss reads past the end back-fill the gap with
//! fresh Undefined values. Each stored handle holds one count on its
//! target.

use log::warn;

use crate::gc::{GarbageCollector, Handle};
use crate::runtime::number::Number;
use crate::value::{render, Frame, Variable};

/// Maximum array length (2^30 - 1)
pub const MAX_ARRAY_LENGTH: u32 = (1 << 30) - 1;

/// Growable sequence of collector-owned variables
#[derive(Debug, Default)]
pub struct Array {
    elements: Vec<Handle<Variable>>,
}

impl Array {
    /// Create a new empty array
    pub fn new() -> Self {
        Array {
            elements: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.elements.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Append `value`; ignored once the array is at its maximum length or
    /// when `value` has been freed
    pub fn push(&mut self, value: Handle<Variable>, gc: &mut GarbageCollector<Variable>) {
        if self.len() >= MAX_ARRAY_LENGTH {
            return;
        }
        if !gc.contains(value) {
            warn!("array: push skipped, {value:?} is stale");
            return;
        }
        gc.inc_counter(value);
        self.elements.push(value);
    }

    /// Remove the last element, handing its count to the caller
    ///
    /// An empty array yields a fresh Undefined and stays empty.
    pub fn pop(&mut self, gc: &mut GarbageCollector<Variable>) -> Handle<Variable> {
        match self.elements.pop() {
            Some(value) => value,
            None => gc.allocate(),
        }
    }

    /// Element at `index`, as an owned handle
    ///
    /// Past the end this returns a fresh Undefined. With `allocate` set,
    /// the array grows to `index + 1` and that Undefined is stored at `index`.
    pub fn get(
        &mut self,
        index: u32,
        allocate: bool,
        gc: &mut GarbageCollector<Variable>,
    ) -> Handle<Variable> {
        if let Some(&value) = self.elements.get(index as usize) {
            gc.inc_counter(value);
            return value;
        }

        let value = gc.allocate();
        if allocate && index < MAX_ARRAY_LENGTH {
            self.fill_to(index, gc);
            gc.inc_counter(value);
            self.elements.push(value);
        }
        value
    }

    /// Store `value` at `index`, growing the array if needed
    ///
    /// A freed `value` is not stored.
    pub fn put(&mut self, index: u32, value: Handle<Variable>, gc: &mut GarbageCollector<Variable>) {
        if index >= MAX_ARRAY_LENGTH {
            return;
        }
        if !gc.contains(value) {
            warn!("array: put at {index} skipped, {value:?} is stale");
            return;
        }

        gc.inc_counter(value);
        match self.elements.get_mut(index as usize) {
            Some(slot) => {
                let old = std::mem::replace(slot, value);
                gc.dec_counter(old);
            }
            None => {
                self.fill_to(index, gc);
                self.elements.push(value);
            }
        }
    }

    /// Element lookup through a numeric key
    ///
    /// Keys that are not valid indices read as a throwaway Undefined.
    pub fn get_at(
        &mut self,
        index: Number,
        allocate: bool,
        gc: &mut GarbageCollector<Variable>,
    ) -> Handle<Variable> {
        match to_index(index) {
            Some(index) => self.get(index, allocate, gc),
            None => gc.allocate(),
        }
    }

    /// Store through a numeric key; invalid indices are ignored
    pub fn put_at(&mut self, index: Number, value: Handle<Variable>, gc: &mut GarbageCollector<Variable>) {
        if let Some(index) = to_index(index) {
            self.put(index, value, gc);
        }
    }

    /// Borrow the handle at `index` without touching its count
    #[inline]
    pub fn peek(&self, index: u32) -> Option<Handle<Variable>> {
        self.elements.get(index as usize).copied()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Handle<Variable>> + '_ {
        self.elements.iter().copied()
    }

    /// Render as `[v,v,]`
    pub fn to_string(&self, gc: &GarbageCollector<Variable>) -> String {
        render(Frame::Array(self), gc)
    }

    /// Copy that shares the element handles; counts are the caller's job
    pub(crate) fn share(&self) -> Self {
        Array {
            elements: self.elements.clone(),
        }
    }

    /// Back-fill with fresh Undefined values until the length is `len`
    fn fill_to(&mut self, len: u32, gc: &mut GarbageCollector<Variable>) {
        while self.len() < len {
            let filler = gc.allocate();
            self.elements.push(filler);
        }
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

/// Numeric key to array index
///
/// NaN, infinities, negatives, and anything at or past the maximum length
/// are not indices; fractions truncate toward zero.
pub fn to_index(key: Number) -> Option<u32> {
    match key {
        Number::Value(v) if v >= 0.0 && v < MAX_ARRAY_LENGTH as f64 => Some(v.trunc() as u32),
        _ => None,
    }
}

/// String key to array index, parsed as a number first
pub fn parse_index(key: &str) -> Option<u32> {
    let number = key
        .trim()
        .parse::<f64>()
        .map(Number::new)
        .unwrap_or(Number::NaN);
    to_index(number)
}
