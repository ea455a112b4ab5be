//! jsvar - reference-counted dynamic variables for a JavaScript-like runtime
//!
//! This crate is the value layer an interpreter builds on: a tagged
//! [`Variable`] with JavaScript-style coercion, arithmetic, comparison and
//! logical operators, stored in a reference-counted arena.
//!
//! # Features
//! - Number algebra with explicit NaN and signed infinity
//! - Objects (string-keyed) and dense arrays holding other variables
//! - Native functions with a declared arity
//! - Generation-checked handles: a freed variable is never aliased
//! - No global state; everything hangs off a [`Context`]
//!
//! # Example
//! ```
//! use jsvar::{Context, Variable};
//!
//! let mut ctx = Context::new();
//! let a = ctx.allocate();
//! let b = ctx.allocate();
//! ctx.set_number(a, 2.0);
//! ctx.set_string(b, " world");
//!
//! let res = ctx.arithmetic_addition(a, b);
//! assert_eq!(*ctx.get(res), Variable::from("2.000000 world"));
//! ```

// Core modules
pub mod context;
pub mod value;

// Garbage collector
pub mod gc;

// Runtime support
pub mod runtime;

// Re-export main types
pub use context::{Context, ContextConfig, MemoryStats};
pub use gc::{GarbageCollector, Handle, HeapError, Trace};
pub use runtime::{Array, Function, NativeFunction, Number, Object};
pub use value::Variable;
