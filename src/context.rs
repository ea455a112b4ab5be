//! Runtime context
//!
//! The Context is the main entry point for driving variables. It owns the
//! collector every variable lives in and exposes the operations an
//! interpreter calls: allocation, mutation, property access, coercion,
//! arithmetic, comparison, and diagnostics.
//!
//! # Handle ownership
//! Every handle a Context method returns is owned by the caller and must
//! eventually go back through [`Context::deallocate`]. Handles passed in
//! are only borrowed; containers that keep one take their own count.
//!
//! Passing a handle whose variable has already been freed is a caller
//! bug and panics.

use std::io::{self, Write};

use log::{debug, error, warn};

use crate::gc::{GarbageCollector, Handle, HeapError};
use crate::runtime::array::parse_index;
use crate::runtime::{Array, Function, NativeFunction, Number, Object};
use crate::value::Variable;

/// Construction-time settings for a [`Context`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextConfig {
    /// Slots reserved up front in the variable arena
    pub initial_capacity: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        ContextConfig {
            initial_capacity: 64,
        }
    }
}

/// Memory usage statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStats {
    /// Variables currently alive
    pub live: usize,
    /// Freed slots waiting for reuse
    pub free_slots: usize,
    /// Slots the arena can hold before it reallocates
    pub capacity: usize,
}

/// Variable runtime context
pub struct Context {
    gc: GarbageCollector<Variable>,
}

#[track_caller]
fn expect_live<T>(res: Result<T, HeapError>) -> T {
    match res {
        Ok(value) => value,
        Err(err) => panic!("{err}"),
    }
}

impl Context {
    /// Create a context with default settings
    pub fn new() -> Self {
        Self::with_config(ContextConfig::default())
    }

    pub fn with_config(config: ContextConfig) -> Self {
        Context {
            gc: GarbageCollector::with_capacity(config.initial_capacity),
        }
    }

    /// Allocate a fresh Undefined variable
    #[inline]
    pub fn allocate(&mut self) -> Handle<Variable> {
        self.gc.allocate()
    }

    /// Give up one reference to `handle`
    #[inline]
    pub fn deallocate(&mut self, handle: Handle<Variable>) {
        self.gc.dec_counter(handle);
    }

    /// Take another reference to `handle` and return it
    #[inline]
    pub fn retain(&mut self, handle: Handle<Variable>) -> Handle<Variable> {
        self.gc.inc_counter(handle);
        handle
    }

    /// Borrow a live variable
    ///
    /// # Panics
    /// Panics if the variable has been freed.
    #[track_caller]
    pub fn get(&self, handle: Handle<Variable>) -> &Variable {
        expect_live(self.gc.get(handle))
    }

    pub fn try_get(&self, handle: Handle<Variable>) -> Result<&Variable, HeapError> {
        self.gc.get(handle)
    }

    /// Reference count of `handle`, 0 once freed
    #[inline]
    pub fn counter(&self, handle: Handle<Variable>) -> u32 {
        self.gc.get_counter(handle)
    }

    #[inline]
    pub fn collector(&self) -> &GarbageCollector<Variable> {
        &self.gc
    }

    /// Get memory usage statistics
    pub fn memory_stats(&self) -> MemoryStats {
        let heap = self.gc.heap();
        MemoryStats {
            live: heap.live(),
            free_slots: heap.free_slots(),
            capacity: heap.capacity(),
        }
    }

    // Mutators

    /// Overwrite the variable behind `handle`, releasing the old payload
    #[track_caller]
    fn replace(&mut self, handle: Handle<Variable>, value: Variable) {
        let slot = expect_live(self.gc.get_mut(handle));
        let old = std::mem::replace(slot, value);
        self.gc.release(old);
    }

    pub fn set_undefined(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Undefined);
    }

    pub fn set_null(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Null);
    }

    pub fn set_nan(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Number(Number::NaN));
    }

    pub fn set_infinity(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Number(Number::Infinity));
    }

    pub fn set_neginfinity(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Number(Number::NegInfinity));
    }

    pub fn set_number(&mut self, handle: Handle<Variable>, value: f64) {
        self.replace(handle, Variable::Number(Number::new(value)));
    }

    pub fn set_boolean(&mut self, handle: Handle<Variable>, value: bool) {
        self.replace(handle, Variable::Boolean(value));
    }

    pub fn set_string(&mut self, handle: Handle<Variable>, value: impl Into<String>) {
        self.replace(handle, Variable::String(value.into()));
    }

    /// Replace with a new empty object
    pub fn set_object(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Object(Object::new()));
    }

    /// Replace with a new empty array
    pub fn set_array(&mut self, handle: Handle<Variable>) {
        self.replace(handle, Variable::Array(Array::new()));
    }

    pub fn set_function(&mut self, handle: Handle<Variable>, func: NativeFunction, arity: u32) {
        self.replace(handle, Variable::Function(Function::new(func, arity)));
    }

    /// Copy tag and payload of `source` into `target`
    ///
    /// Object and Array payloads are shared: the copy refers to the same
    /// member variables, each of which gains a count.
    pub fn set_variable(&mut self, target: Handle<Variable>, source: Handle<Variable>) {
        let copy = self.get(source).share();
        self.gc.retain_edges(&copy);
        self.replace(target, copy);
    }

    // Properties

    /// Store `value` under `key` on an Object, or at index `key` on an Array
    ///
    /// Other targets, and Array keys that are not indices, are ignored.
    ///
    /// # Panics
    /// Panics if `target` or `value` has been freed.
    #[track_caller]
    pub fn add_property(&mut self, target: Handle<Variable>, key: &str, value: Handle<Variable>) {
        expect_live(self.gc.get(value));
        expect_live(self.gc.with_mut(target, |var, gc| match var {
            Variable::Object(obj) => obj.add_property(key, value, gc),
            Variable::Array(arr) => match parse_index(key) {
                Some(index) => arr.put(index, value, gc),
                None => debug!("add_property: {key:?} is not an array index"),
            },
            other => debug!("add_property on {} ignored", other.type_name()),
        }));
    }

    /// Like [`Context::add_property`], with the key taken from a variable
    #[track_caller]
    pub fn add_property_by_var(
        &mut self,
        target: Handle<Variable>,
        key: Handle<Variable>,
        value: Handle<Variable>,
    ) {
        let key = self.render(key);
        self.add_property(target, &key, value);
    }

    /// Look up `key`, returning an owned handle
    ///
    /// Misses, non-index Array keys, and targets that are neither Object
    /// nor Array produce a fresh Undefined. With `allocate` set, a miss on
    /// an Object or Array also stores that Undefined.
    pub fn get_property(
        &mut self,
        target: Handle<Variable>,
        key: &str,
        allocate: bool,
    ) -> Handle<Variable> {
        expect_live(self.gc.with_mut(target, |var, gc| match var {
            Variable::Object(obj) => obj.get_property(key, allocate, gc),
            Variable::Array(arr) => match parse_index(key) {
                Some(index) => arr.get(index, allocate, gc),
                None => gc.allocate(),
            },
            _ => gc.allocate(),
        }))
    }

    pub fn get_property_by_var(
        &mut self,
        target: Handle<Variable>,
        key: Handle<Variable>,
        allocate: bool,
    ) -> Handle<Variable> {
        let key = self.render(key);
        self.get_property(target, &key, allocate)
    }

    /// Remove `key` from an Object; other targets are left alone
    pub fn remove_property(&mut self, target: Handle<Variable>, key: &str) {
        expect_live(self.gc.with_mut(target, |var, gc| match var {
            Variable::Object(obj) => obj.remove_property(key, gc),
            other => debug!("remove_property on {} ignored", other.type_name()),
        }));
    }

    pub fn remove_property_by_var(&mut self, target: Handle<Variable>, key: Handle<Variable>) {
        let key = self.render(key);
        self.remove_property(target, &key);
    }

    /// Append to an Array; other targets are left alone
    #[track_caller]
    pub fn push(&mut self, target: Handle<Variable>, value: Handle<Variable>) {
        expect_live(self.gc.get(value));
        expect_live(self.gc.with_mut(target, |var, gc| match var {
            Variable::Array(arr) => arr.push(value, gc),
            other => debug!("push on {} ignored", other.type_name()),
        }));
    }

    /// Remove the last element of an Array
    ///
    /// Empty arrays and non-Array targets yield a fresh Undefined.
    pub fn pop(&mut self, target: Handle<Variable>) -> Handle<Variable> {
        expect_live(self.gc.with_mut(target, |var, gc| match var {
            Variable::Array(arr) => arr.pop(gc),
            _ => gc.allocate(),
        }))
    }

    // Conversions

    /// Truthiness of the variable behind `handle`
    pub fn get_boolean(&self, handle: Handle<Variable>) -> bool {
        self.get(handle).to_boolean()
    }

    pub fn convert_to_boolean(&mut self, handle: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(handle).to_boolean();
        self.gc.allocate_with(Variable::Boolean(res))
    }

    pub fn convert_to_number(&mut self, handle: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(handle).to_number();
        self.gc.allocate_with(Variable::Number(res))
    }

    pub fn convert_to_string(&mut self, handle: Handle<Variable>) -> Handle<Variable> {
        let res = self.render(handle);
        self.gc.allocate_with(Variable::String(res))
    }

    #[track_caller]
    fn render(&self, handle: Handle<Variable>) -> String {
        self.get(handle).to_string(&self.gc)
    }

    // Arithmetic

    pub fn arithmetic_addition(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a).add(self.get(b), &self.gc);
        self.gc.allocate_with(res)
    }

    pub fn arithmetic_subtraction(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a) - self.get(b);
        self.gc.allocate_with(res)
    }

    pub fn arithmetic_multiplication(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a) * self.get(b);
        self.gc.allocate_with(res)
    }

    pub fn arithmetic_division(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a) / self.get(b);
        self.gc.allocate_with(res)
    }

    // Logical

    fn boolean(&mut self, value: bool) -> Handle<Variable> {
        self.gc.allocate_with(Variable::Boolean(value))
    }

    /// Fresh variable holding a copy of `source`
    fn copy_of(&mut self, source: Handle<Variable>) -> Handle<Variable> {
        let copy = self.get(source).share();
        self.gc.retain_edges(&copy);
        self.gc.allocate_with(copy)
    }

    pub fn logical_not(&mut self, a: Handle<Variable>) -> Handle<Variable> {
        let res = !self.get(a);
        self.boolean(res)
    }

    /// Copy of `a` if it is falsy, otherwise of `b`
    pub fn logical_and(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let chosen = if self.get(a).to_boolean() { b } else { a };
        self.copy_of(chosen)
    }

    /// Copy of `a` if it is truthy, otherwise of `b`
    pub fn logical_or(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let chosen = if self.get(a).to_boolean() { a } else { b };
        self.copy_of(chosen)
    }

    /// Loose equality; identical to [`Context::logical_seq`]
    pub fn logical_eq(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        self.logical_seq(a, b)
    }

    pub fn logical_ne(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        self.logical_sne(a, b)
    }

    pub fn logical_seq(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a) == self.get(b);
        self.boolean(res)
    }

    pub fn logical_sne(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a) != self.get(b);
        self.boolean(res)
    }

    pub fn logical_gt(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a).gt(self.get(b));
        self.boolean(res)
    }

    pub fn logical_ge(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a).ge(self.get(b));
        self.boolean(res)
    }

    pub fn logical_lt(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a).lt(self.get(b));
        self.boolean(res)
    }

    pub fn logical_le(&mut self, a: Handle<Variable>, b: Handle<Variable>) -> Handle<Variable> {
        let res = self.get(a).le(self.get(b));
        self.boolean(res)
    }

    // Functions

    /// Call the Function stored behind `target`
    ///
    /// Any other target yields a fresh Undefined.
    #[track_caller]
    pub fn call_function(&mut self, target: Handle<Variable>, args: &[Handle<Variable>]) -> Handle<Variable> {
        for &arg in args {
            expect_live(self.gc.get(arg));
        }
        match self.get(target) {
            Variable::Function(func) => {
                let func = *func;
                func.call(self, args)
            }
            other => {
                debug!("call_function on {} ignored", other.type_name());
                self.allocate()
            }
        }
    }

    // Diagnostics

    /// Abort the process unless `handle` is truthy
    pub fn variable_assert(&self, handle: Handle<Variable>) {
        if !self.get_boolean(handle) {
            error!("assertion failed: {} is falsy", self.render(handle));
            std::process::abort();
        }
    }

    /// Abort the process unless `a` and `b` are strictly equal
    pub fn variable_assert_eq(&self, a: Handle<Variable>, b: Handle<Variable>) {
        if self.get(a) != self.get(b) {
            error!(
                "assertion failed: {} != {}",
                self.render(a),
                self.render(b)
            );
            std::process::abort();
        }
    }

    /// Write the rendered value and a newline to standard output
    pub fn print(&self, handle: Handle<Variable>) {
        if let Err(err) = self.print_to(handle, &mut io::stdout().lock()) {
            warn!("print: {err}");
        }
    }

    pub fn print_to(&self, handle: Handle<Variable>, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", self.render(handle))
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
