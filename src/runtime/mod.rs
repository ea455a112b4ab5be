//! Runtime support
//!
//! Payload types carried by a [`crate::Variable`]:
//! - Number algebra (finite, NaN, and signed infinity)
//! - Object (string-keyed property store)
//! - Array (dense growable sequence)
//! - Function (native callback with a declared arity)

pub mod array;
pub mod function;
pub mod number;
pub mod object;
pub mod property;

pub use array::{Array, MAX_ARRAY_LENGTH};
pub use function::{Function, NativeFunction};
pub use number::Number;
pub use object::Object;
pub use property::{Property, PropertyTable};
