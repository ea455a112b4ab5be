//! Native function wrapper
//!
//! A function pairs a Rust callback with the number of arguments it
//! expects. Calls always pass exactly that many: missing arguments are
//! padded with fresh Undefined values and extras are dropped.

use std::fmt;

use crate::context::Context;
use crate::gc::Handle;
use crate::value::Variable;

/// Native function signature
///
/// Arguments are borrowed for the duration of the call; the returned
/// handle is owned by the caller.
pub type NativeFunction = fn(ctx: &mut Context, args: &[Handle<Variable>]) -> Handle<Variable>;

/// Callable with a declared arity
#[derive(Clone, Copy)]
pub struct Function {
    func: NativeFunction,
    arity: u32,
}

impl Function {
    pub fn new(func: NativeFunction, arity: u32) -> Self {
        Function { func, arity }
    }

    #[inline]
    pub fn arity(&self) -> u32 {
        self.arity
    }

    /// Invoke the callback with exactly `arity` arguments
    pub fn call(&self, ctx: &mut Context, args: &[Handle<Variable>]) -> Handle<Variable> {
        let arity = self.arity as usize;
        if args.len() >= arity {
            return (self.func)(ctx, &args[..arity]);
        }

        let mut padded = Vec::with_capacity(arity);
        padded.extend_from_slice(args);
        while padded.len() < arity {
            padded.push(ctx.allocate());
        }

        let result = (self.func)(ctx, &padded);

        for &pad in &padded[args.len()..] {
            ctx.deallocate(pad);
        }
        result
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        self.arity == other.arity && std::ptr::fn_addr_eq(self.func, other.func)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function, args num: {}", self.arity)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("func", &(self.func as *const ()))
            .field("arity", &self.arity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::Number;

    fn count_defined(ctx: &mut Context, args: &[Handle<Variable>]) -> Handle<Variable> {
        let defined = args
            .iter()
            .filter(|&&arg| !matches!(ctx.get(arg), Variable::Undefined))
            .count();
        let res = ctx.allocate();
        ctx.set_number(res, defined as f64);
        res
    }

    fn first(ctx: &mut Context, args: &[Handle<Variable>]) -> Handle<Variable> {
        ctx.retain(args[0])
    }

    fn number_of(ctx: &Context, h: Handle<Variable>) -> Number {
        match ctx.get(h) {
            Variable::Number(n) => *n,
            other => panic!("expected number, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_missing_arguments_are_padded() {
        let mut ctx = Context::new();
        let func = Function::new(count_defined, 3);

        let a = ctx.allocate();
        ctx.set_boolean(a, true);

        let res = func.call(&mut ctx, &[a]);
        assert_eq!(number_of(&ctx, res), Number::from(1));

        // only `a` and the result survive; padding was released
        assert_eq!(ctx.memory_stats().live, 2);
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let mut ctx = Context::new();
        let func = Function::new(count_defined, 1);

        let a = ctx.allocate();
        let b = ctx.allocate();
        ctx.set_null(a);
        ctx.set_null(b);

        let res = func.call(&mut ctx, &[a, b]);
        assert_eq!(number_of(&ctx, res), Number::from(1));
    }

    #[test]
    fn test_returning_an_argument() {
        let mut ctx = Context::new();
        let func = Function::new(first, 1);

        let a = ctx.allocate();
        let res = func.call(&mut ctx, &[a]);
        assert_eq!(res, a);
        assert_eq!(ctx.counter(a), 2);
    }

    #[test]
    fn test_padding_returned_to_caller_survives() {
        let mut ctx = Context::new();
        let func = Function::new(first, 1);

        let res = func.call(&mut ctx, &[]);
        assert!(matches!(ctx.get(res), Variable::Undefined));
        assert_eq!(ctx.counter(res), 1);
    }

    #[test]
    fn test_equality() {
        let a = Function::new(first, 1);
        assert_eq!(a, Function::new(first, 1));
        assert_ne!(a, Function::new(first, 2));
        assert_ne!(a, Function::new(count_defined, 1));
    }

    #[test]
    fn test_to_string() {
        assert_eq!(Function::new(first, 2).to_string(), "function, args num: 2");
    }
}
