//! Runtime value types for rogscript

use crate::ast::FunctionDecl;
use crate::environment::EnvRef;
use crate::stack::ensure_sufficient_stack;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Nested arrays/objects deeper than this are elided when displayed, which
/// also keeps self-referencing containers printable.
const DISPLAY_DEPTH_MAX: usize = 16;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime values in rogscript
#[derive(Clone)]
pub enum Value {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
    /// Shared, mutable, ordered sequence
    Array(ArrayRef),
    /// Shared, mutable map in insertion order
    Object(ObjectRef),
    Callable(Rc<Callable>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(entries: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(entries)))
    }

    pub fn native<F>(name: &str, arity: usize, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Value::Callable(Rc::new(Callable::Native(NativeFunction::new(name, arity, handler))))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Nil => "nil",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Callable(_) => "function",
        }
    }

    /// Only `nil` and `false` are falsy; `0` and `""` are truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    fn write_nested(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                if depth >= DISPLAY_DEPTH_MAX {
                    return write!(f, "[...]");
                }
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    item.write_nested(f, depth + 1)?;
                }
                write!(f, "]")
            }
            Value::Object(entries) => {
                if depth >= DISPLAY_DEPTH_MAX {
                    return write!(f, "{{...}}");
                }
                let entries = entries.borrow();
                if entries.is_empty() {
                    return write!(f, "{{}}");
                }
                write!(f, "{{ ")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.write_nested(f, depth + 1)?;
                }
                write!(f, " }}")
            }
            other => write!(f, "{}", other),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Nil => write!(f, "nil"),
            Value::Array(_) | Value::Object(_) => self.write_nested(f, 0),
            Value::Callable(callable) => write!(f, "{}", callable),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other),
        }
    }
}

/// Structural equality without coercion. Callables compare by identity.
///
/// Containers may reference themselves, so every pair of containers under
/// comparison is remembered and meeting the same pair again counts as equal.
/// Pairs stay recorded: a mismatch anywhere makes the whole comparison false.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other, &mut HashSet::new())
    }
}

type ContainerPair = (*const (), *const ());

impl Value {
    fn structural_eq(&self, other: &Value, seen: &mut HashSet<ContainerPair>) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Array(a), Value::Array(b)) => {
                let pair: ContainerPair = (Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast());
                if Rc::ptr_eq(a, b) || !seen.insert(pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| {
                        ensure_sufficient_stack(|| x.structural_eq(y, seen))
                    })
            }
            (Value::Object(a), Value::Object(b)) => {
                let pair: ContainerPair = (Rc::as_ptr(a).cast(), Rc::as_ptr(b).cast());
                if Rc::ptr_eq(a, b) || !seen.insert(pair) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter().all(|(key, x)| {
                        b.get(key).is_some_and(|y| {
                            ensure_sufficient_stack(|| x.structural_eq(y, seen))
                        })
                    })
            }
            (Value::Callable(a), Value::Callable(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Anything that can be invoked with a fixed number of arguments
pub enum Callable {
    User(UserFunction),
    Native(NativeFunction),
}

impl Callable {
    /// Exact argument count every call site must supply
    pub fn arity(&self) -> usize {
        match self {
            Callable::User(function) => function.decl.params.len(),
            Callable::Native(native) => native.arity,
        }
    }
}

impl fmt::Display for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::User(function) => write!(f, "<fn ({})>", function.decl.params.join(", ")),
            Callable::Native(native) => write!(f, "<native fn {}>", native.name),
        }
    }
}

/// A function literal closed over the environment it was evaluated in
pub struct UserFunction {
    pub decl: Rc<FunctionDecl>,
    pub closure: EnvRef,
}

impl UserFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: EnvRef) -> Self {
        Self { decl, closure }
    }
}

/// Host handler behind a native function
pub type NativeHandler = Rc<dyn Fn(&[Value]) -> Result<Value, String>>;

/// Native/built-in function
#[derive(Clone)]
pub struct NativeFunction {
    pub name: String,
    pub arity: usize,
    pub handler: NativeHandler,
}

impl NativeFunction {
    pub fn new<F>(name: &str, arity: usize, handler: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + 'static,
    {
        Self {
            name: name.to_string(),
            arity,
            handler: Rc::new(handler),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
