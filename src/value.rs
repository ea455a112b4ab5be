//! Variable representation
//!
//! [`Variable`] is the tagged union every runtime value lives in. Scalars
//! are stored inline; Object and Array payloads hold handles to other
//! variables in the same collector, which is why rendering and string
//! concatenation take the collector as an argument.
//!
//! # Coercions
//! | tag       | to_boolean      | to_number | to_string                   |
//! |-----------|-----------------|-----------|-----------------------------|
//! | Undefined | false           | NaN       | `undefined`                 |
//! | Null      | false           | 0         | `null`                      |
//! | Number    | not NaN, not 0  | itself    | `2.000000`, `NaN`, ...      |
//! | Boolean   | itself          | 1 / 0     | `true` / `false`            |
//! | String    | non-empty       | NaN       | itself                      |
//! | Object    | true            | NaN       | `{k: v,}`                   |
//! | Array     | non-empty       | NaN       | `[v,v,]`                    |
//! | Function  | true            | NaN       | `function, args num: N`     |

use std::ops::{Div, Mul, Not, Sub};

use ahash::AHashSet;
use log::warn;

use crate::gc::{GarbageCollector, Handle, Trace};
use crate::runtime::{Array, Function, Number, Object};

/// Dynamically-typed runtime value
#[derive(Debug, Default)]
pub enum Variable {
    #[default]
    Undefined,
    Null,
    Number(Number),
    Boolean(bool),
    String(String),
    Object(Object),
    Array(Array),
    Function(Function),
}

/// Operands that can be ordered against each other
enum Ordered<'a> {
    Numbers(Number, Number),
    Strings(&'a str, &'a str),
}

impl Variable {
    /// Name of the active tag
    pub fn type_name(&self) -> &'static str {
        match self {
            Variable::Undefined => "undefined",
            Variable::Null => "null",
            Variable::Number(_) => "number",
            Variable::Boolean(_) => "boolean",
            Variable::String(_) => "string",
            Variable::Object(_) => "object",
            Variable::Array(_) => "array",
            Variable::Function(_) => "function",
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Variable::Undefined)
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Variable::Undefined | Variable::Null => false,
            Variable::Number(n) => n.to_boolean(),
            Variable::Boolean(b) => *b,
            Variable::String(s) => !s.is_empty(),
            Variable::Object(_) | Variable::Function(_) => true,
            Variable::Array(arr) => !arr.is_empty(),
        }
    }

    pub fn to_number(&self) -> Number {
        match self {
            Variable::Null => Number::from(0),
            Variable::Number(n) => *n,
            Variable::Boolean(b) => Number::from(u32::from(*b)),
            Variable::Undefined
            | Variable::String(_)
            | Variable::Object(_)
            | Variable::Array(_)
            | Variable::Function(_) => Number::NaN,
        }
    }

    /// Render the value, following Object and Array members through `gc`
    ///
    /// A member whose Object or Array is still open further up renders as
    /// `[Circular]`.
    pub fn to_string(&self, gc: &GarbageCollector<Variable>) -> String {
        render(Frame::Value(self), gc)
    }

    /// Address of the Object or Array payload, used to spot cycles
    fn payload_addr(&self) -> Option<*const ()> {
        match self {
            Variable::Object(obj) => Some(addr_of(obj)),
            Variable::Array(arr) => Some(addr_of(arr)),
            _ => None,
        }
    }

    /// `+`: concatenates when either side is a String, otherwise adds numbers
    pub fn add(&self, rhs: &Variable, gc: &GarbageCollector<Variable>) -> Variable {
        if matches!(self, Variable::String(_)) || matches!(rhs, Variable::String(_)) {
            let mut res = self.to_string(gc);
            res.push_str(&rhs.to_string(gc));
            Variable::String(res)
        } else {
            Variable::Number(self.to_number() + rhs.to_number())
        }
    }

    /// Short-circuit `&&`: `self` if falsy, else `rhs`
    pub fn and<'a>(&'a self, rhs: &'a Variable) -> &'a Variable {
        if self.to_boolean() { rhs } else { self }
    }

    /// Short-circuit `||`: `self` if truthy, else `rhs`
    pub fn or<'a>(&'a self, rhs: &'a Variable) -> &'a Variable {
        if self.to_boolean() { self } else { rhs }
    }

    fn ordered<'a>(&'a self, rhs: &'a Variable) -> Option<Ordered<'a>> {
        match (self, rhs) {
            (Variable::String(a), Variable::String(b)) => Some(Ordered::Strings(a, b)),
            (
                Variable::Number(_) | Variable::Boolean(_) | Variable::Null,
                Variable::Number(_) | Variable::Boolean(_) | Variable::Null,
            ) => Some(Ordered::Numbers(self.to_number(), rhs.to_number())),
            _ => None,
        }
    }

    pub fn gt(&self, rhs: &Variable) -> bool {
        match self.ordered(rhs) {
            Some(Ordered::Numbers(a, b)) => a.gt(b),
            Some(Ordered::Strings(a, b)) => a > b,
            None => false,
        }
    }

    pub fn ge(&self, rhs: &Variable) -> bool {
        match self.ordered(rhs) {
            Some(Ordered::Numbers(a, b)) => a.ge(b),
            Some(Ordered::Strings(a, b)) => a >= b,
            None => false,
        }
    }

    pub fn lt(&self, rhs: &Variable) -> bool {
        match self.ordered(rhs) {
            Some(Ordered::Numbers(a, b)) => a.lt(b),
            Some(Ordered::Strings(a, b)) => a < b,
            None => false,
        }
    }

    pub fn le(&self, rhs: &Variable) -> bool {
        match self.ordered(rhs) {
            Some(Ordered::Numbers(a, b)) => a.le(b),
            Some(Ordered::Strings(a, b)) => a <= b,
            None => false,
        }
    }

    /// Shallow copy; Object and Array handles are duplicated without
    /// touching their counts
    pub(crate) fn share(&self) -> Variable {
        match self {
            Variable::Undefined => Variable::Undefined,
            Variable::Null => Variable::Null,
            Variable::Number(n) => Variable::Number(*n),
            Variable::Boolean(b) => Variable::Boolean(*b),
            Variable::String(s) => Variable::String(s.clone()),
            Variable::Object(obj) => Variable::Object(obj.share()),
            Variable::Array(arr) => Variable::Array(arr.share()),
            Variable::Function(func) => Variable::Function(*func),
        }
    }
}

/// Pending rendering work
pub(crate) enum Frame<'a> {
    Value(&'a Variable),
    Object(&'a Object),
    Array(&'a Array),
    Member(Handle<Variable>),
    Text(&'a str),
    /// Close the container opened at this address
    Leave(*const ()),
}

#[inline]
fn addr_of<T>(value: &T) -> *const () {
    std::ptr::from_ref(value).cast()
}

/// Render `root` from an explicit frame stack
///
/// Nesting depth costs heap, not call stack. `open` holds the payload
/// addresses of containers between the root and the current frame.
pub(crate) fn render<'a>(root: Frame<'a>, gc: &'a GarbageCollector<Variable>) -> String {
    let mut out = String::new();
    let mut open: AHashSet<*const ()> = AHashSet::new();
    let mut stack = vec![root];

    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Text(text) => out.push_str(text),
            Frame::Leave(addr) => {
                open.remove(&addr);
            }
            Frame::Member(handle) => match gc.get(handle) {
                Ok(value) if value.payload_addr().is_some_and(|addr| open.contains(&addr)) => {
                    out.push_str("[Circular]");
                }
                Ok(value) => stack.push(Frame::Value(value)),
                Err(err) => {
                    warn!("render: {err}");
                    out.push_str("undefined");
                }
            },
            Frame::Value(value) => match value {
                Variable::Undefined => out.push_str("undefined"),
                Variable::Null => out.push_str("null"),
                Variable::Number(n) => out.push_str(&n.to_string()),
                Variable::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
                Variable::String(s) => out.push_str(s),
                Variable::Object(obj) => stack.push(Frame::Object(obj)),
                Variable::Array(arr) => stack.push(Frame::Array(arr)),
                Variable::Function(func) => out.push_str(&func.to_string()),
            },
            Frame::Object(obj) => {
                let addr = addr_of(obj);
                open.insert(addr);
                out.push('{');
                stack.push(Frame::Leave(addr));
                stack.push(Frame::Text("}"));
                let entries: Vec<_> = obj.iter().collect();
                for (key, value) in entries.into_iter().rev() {
                    stack.push(Frame::Text(","));
                    stack.push(Frame::Member(value));
                    stack.push(Frame::Text(": "));
                    stack.push(Frame::Text(key));
                }
            }
            Frame::Array(arr) => {
                let addr = addr_of(arr);
                open.insert(addr);
                out.push('[');
                stack.push(Frame::Leave(addr));
                stack.push(Frame::Text("]"));
                for value in arr.iter().rev() {
                    stack.push(Frame::Text(","));
                    stack.push(Frame::Member(value));
                }
            }
        }
    }
    out
}

impl Trace for Variable {
    fn trace(&self, edges: &mut Vec<Handle<Self>>) {
        match self {
            Variable::Object(obj) => edges.extend(obj.handles()),
            Variable::Array(arr) => edges.extend(arr.iter()),
            _ => {}
        }
    }
}

/// Tag-sensitive equality; Object and Array never compare equal
impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::Undefined, Variable::Undefined) | (Variable::Null, Variable::Null) => true,
            (Variable::Number(a), Variable::Number(b)) => a == b,
            (Variable::Boolean(a), Variable::Boolean(b)) => a == b,
            (Variable::String(a), Variable::String(b)) => a == b,
            (Variable::Function(a), Variable::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl Sub for &Variable {
    type Output = Variable;

    fn sub(self, rhs: Self) -> Variable {
        Variable::Number(self.to_number() - rhs.to_number())
    }
}

impl Mul for &Variable {
    type Output = Variable;

    fn mul(self, rhs: Self) -> Variable {
        Variable::Number(self.to_number() * rhs.to_number())
    }
}

impl Div for &Variable {
    type Output = Variable;

    fn div(self, rhs: Self) -> Variable {
        Variable::Number(self.to_number() / rhs.to_number())
    }
}

impl Not for &Variable {
    type Output = bool;

    fn not(self) -> bool {
        !self.to_boolean()
    }
}

impl From<Number> for Variable {
    fn from(value: Number) -> Self {
        Variable::Number(value)
    }
}

impl From<f64> for Variable {
    fn from(value: f64) -> Self {
        Variable::Number(Number::new(value))
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Variable::Boolean(value)
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::String(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable::String(value)
    }
}

impl From<Function> for Variable {
    fn from(value: Function) -> Self {
        Variable::Function(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn gc() -> GarbageCollector<Variable> {
        GarbageCollector::new()
    }

    #[test]
    fn test_to_boolean() {
        assert!(!Variable::Undefined.to_boolean());
        assert!(!Variable::Null.to_boolean());
        assert!(!Variable::Number(Number::NaN).to_boolean());
        assert!(!Variable::from(0.0).to_boolean());
        assert!(Variable::from(-2.0).to_boolean());
        assert!(Variable::Number(Number::Infinity).to_boolean());
        assert!(!Variable::from("").to_boolean());
        assert!(Variable::from("a").to_boolean());
        assert!(Variable::Object(Object::new()).to_boolean());
        assert!(!Variable::Array(Array::new()).to_boolean());
    }

    #[test]
    fn test_non_empty_array_is_truthy() {
        let mut gc = gc();
        let mut arr = Array::new();
        let v = gc.allocate();
        arr.push(v, &mut gc);
        assert!(Variable::Array(arr).to_boolean());
    }

    #[test]
    fn test_not_asymmetry() {
        assert!(!&Variable::Array(Array::new()));
        assert!(!(!&Variable::Object(Object::new())));
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Variable::Undefined.to_number(), Number::NaN);
        assert_eq!(Variable::Null.to_number(), Number::from(0));
        assert_eq!(Variable::from(true).to_number(), Number::from(1));
        assert_eq!(Variable::from(false).to_number(), Number::from(0));
        assert_eq!(Variable::from("12").to_number(), Number::NaN);
        assert_eq!(Variable::Object(Object::new()).to_number(), Number::NaN);
        assert_eq!(Variable::from(4.5).to_number(), Number::new(4.5));
    }

    #[test]
    fn test_to_string_scalars() {
        let gc = gc();
        assert_eq!(Variable::Undefined.to_string(&gc), "undefined");
        assert_eq!(Variable::Null.to_string(&gc), "null");
        assert_eq!(Variable::from(true).to_string(&gc), "true");
        assert_eq!(Variable::from(false).to_string(&gc), "false");
        assert_eq!(Variable::from(2.0).to_string(&gc), "2.000000");
        assert_eq!(Variable::Number(Number::NaN).to_string(&gc), "NaN");
        assert_eq!(Variable::Number(Number::NegInfinity).to_string(&gc), "-Infinity");
        assert_eq!(Variable::from("abc").to_string(&gc), "abc");
    }

    #[test]
    fn test_string_concatenation() {
        let gc = gc();
        let res = Variable::from("Hello ").add(&Variable::from("world"), &gc);
        assert_eq!(res, Variable::from("Hello world"));

        let res = Variable::from(2.0).add(&Variable::from(" world"), &gc);
        assert_eq!(res, Variable::from("2.000000 world"));

        let res = Variable::from("x").add(&Variable::Undefined, &gc);
        assert_eq!(res, Variable::from("xundefined"));
    }

    #[test]
    fn test_numeric_arithmetic() {
        let gc = gc();
        let one = Variable::from(1.0);
        let two = Variable::from(2.0);

        assert_eq!(one.add(&two, &gc), Variable::from(3.0));
        assert_eq!(Variable::from(true).add(&Variable::Null, &gc), Variable::from(1.0));
        assert_eq!(
            Variable::Undefined.add(&one, &gc),
            Variable::Number(Number::NaN)
        );
        assert_eq!(&one - &two, Variable::from(-1.0));
        assert_eq!(&two * &two, Variable::from(4.0));
        assert_eq!(&one / &Variable::Null, Variable::Number(Number::Infinity));
        assert_eq!(
            &Variable::from("3") * &two,
            Variable::Number(Number::NaN)
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(Variable::Undefined, Variable::Undefined);
        assert_eq!(Variable::Null, Variable::Null);
        assert_eq!(Variable::Number(Number::NaN), Variable::Number(Number::NaN));
        assert_ne!(Variable::from(1.0), Variable::from(true));
        assert_ne!(Variable::Null, Variable::Undefined);
        assert_ne!(Variable::from("1"), Variable::from(1.0));

        assert_ne!(Variable::Object(Object::new()), Variable::Object(Object::new()));
        assert_ne!(Variable::Array(Array::new()), Variable::Array(Array::new()));
        let obj = Variable::Object(Object::new());
        let same = &obj;
        assert_ne!(&obj, same);
    }

    #[test]
    fn test_ordering() {
        assert!(Variable::from(2.0).gt(&Variable::from(1.0)));
        assert!(Variable::from(true).gt(&Variable::Null));
        assert!(Variable::Null.ge(&Variable::from(false)));
        assert!(Variable::from(0.5).lt(&Variable::from(true)));
        assert!(Variable::from("abc").lt(&Variable::from("abd")));
        assert!(Variable::from("b").ge(&Variable::from("b")));

        assert!(!Variable::from("1").lt(&Variable::from(2.0)));
        assert!(!Variable::Undefined.le(&Variable::Undefined));
        assert!(!Variable::Undefined.ge(&Variable::from(0.0)));
        assert!(!Variable::Object(Object::new()).gt(&Variable::Null));
        assert!(!Variable::Number(Number::NaN).ge(&Variable::Number(Number::NaN)));
    }

    #[test]
    fn test_logical_operand_return() {
        let t = Variable::from(true);
        let eleven = Variable::from(11.0);
        assert_eq!(*t.and(&eleven), Variable::from(11.0));
        assert_eq!(*t.or(&eleven), Variable::from(true));

        let empty = Variable::from("");
        assert_eq!(*empty.and(&eleven), Variable::from(""));
        assert_eq!(*empty.or(&eleven), Variable::from(11.0));
        assert_eq!(*empty.or(&Variable::Null), Variable::Null);
    }

    #[test]
    fn test_nested_rendering() {
        let mut gc = gc();
        let one = gc.allocate_with(Variable::from(1.0));
        let inner = gc.allocate_with(Variable::Array(Array::new()));
        gc.with_mut(inner, |var, gc| {
            if let Variable::Array(arr) = var {
                arr.push(one, gc);
            }
        })
        .unwrap();

        let mut obj = Object::new();
        obj.add_property("list", inner, &mut gc);
        obj.add_property("n", one, &mut gc);

        let rendered = Variable::Object(obj).to_string(&gc);
        assert_eq!(rendered, "{list: [1.000000,],n: 1.000000,}");
    }

    #[test]
    fn test_cycle_renders_circular() {
        let mut gc = gc();
        let h = gc.allocate_with(Variable::Object(Object::new()));
        gc.with_mut(h, |var, gc| {
            if let Variable::Object(obj) = var {
                obj.add_property("me", h, gc);
            }
        })
        .unwrap();

        let var = gc.get(h).unwrap();
        assert_eq!(var.to_string(&gc), "{me: [Circular],}");
        let Variable::Object(obj) = var else {
            panic!("expected an object");
        };
        assert_eq!(obj.to_string(&gc), "{me: [Circular],}");
    }

    #[test]
    fn test_shared_member_is_not_circular() {
        let mut gc = gc();
        let inner = gc.allocate_with(Variable::Array(Array::new()));

        let mut outer = Array::new();
        outer.push(inner, &mut gc);
        outer.push(inner, &mut gc);

        assert_eq!(outer.to_string(&gc), "[[],[],]");
    }

    #[test]
    fn test_trace_reports_members() {
        let mut gc = gc();
        let a = gc.allocate();
        let b = gc.allocate();

        let mut arr = Array::new();
        arr.push(a, &mut gc);
        arr.push(b, &mut gc);

        let mut edges = Vec::new();
        Variable::Array(arr).trace(&mut edges);
        assert_eq!(edges, vec![a, b]);

        let mut edges = Vec::new();
        Variable::from("leaf").trace(&mut edges);
        assert!(edges.is_empty());
    }

    proptest! {
        #[test]
        fn prop_number_addition_matches_algebra(a in any::<f64>(), b in any::<f64>()) {
            let gc = GarbageCollector::new();
            let res = Variable::from(a).add(&Variable::from(b), &gc);
            prop_assert_eq!(res, Variable::Number(Number::new(a) + Number::new(b)));
        }

        #[test]
        fn prop_string_addition_concatenates(a in ".*", b in ".*") {
            let gc = GarbageCollector::new();
            let res = Variable::from(a.as_str()).add(&Variable::from(b.as_str()), &gc);
            prop_assert_eq!(res, Variable::String(format!("{a}{b}")));
        }

        #[test]
        fn prop_and_or_pick_an_operand(a in any::<f64>(), b in any::<bool>()) {
            let (x, y) = (Variable::from(a), Variable::from(b));
            let and = x.and(&y);
            let or = x.or(&y);
            prop_assert!(std::ptr::eq(and, &x) || std::ptr::eq(and, &y));
            prop_assert!(std::ptr::eq(or, &x) || std::ptr::eq(or, &y));
            prop_assert_eq!(x.to_boolean() && y.to_boolean(), and.to_boolean());
            prop_assert_eq!(x.to_boolean() || y.to_boolean(), or.to_boolean());
        }
    }
}
