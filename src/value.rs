//! Runtime values and the error every evaluation step can fail with.

use crate::ast::{Expr, accessor_name, constructor_name, predicate_name};
use crate::environment::Environment;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

pub type ExprResult = Result<Value, ValueError>;

/// Native implementation of a built-in function. Receives the already
/// evaluated arguments.
pub type BuiltinFn = fn(&[Value]) -> ExprResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Atomic {
    String(String),
    Number(f64),
    Boolean(bool),
}

#[derive(Clone)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// A user-defined function. Functions only exist at the top level, so the
/// captured environment is always the top-level one and is held weakly:
/// the environment owns the closure, not the other way around.
pub struct Closure {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
    pub env: Weak<RefCell<Environment>>,
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Closure {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.params == other.params && self.body == other.body
    }
}

/// Created once per `define-struct`; instances, constructors, accessors and
/// predicates all share it, and type identity is pointer identity.
#[derive(Debug, PartialEq)]
pub struct StructType {
    pub name: String,
    pub fields: Vec<String>,
}

impl StructType {
    pub fn new(name: &str, fields: &[String]) -> Rc<Self> {
        Rc::new(StructType {
            name: name.to_string(),
            fields: fields.to_vec(),
        })
    }

    /// The constructor, one accessor per field and the predicate, named and
    /// ordered as `Definition::bound_names` lists them.
    pub fn bindings(self: &Rc<Self>) -> Vec<(String, Value)> {
        let accessors = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| {
                (
                    accessor_name(&self.name, field),
                    Value::Accessor(self.clone(), index),
                )
            });
        std::iter::once((constructor_name(&self.name), Value::Constructor(self.clone())))
            .chain(accessors)
            .chain(std::iter::once((
                predicate_name(&self.name),
                Value::Predicate(self.clone()),
            )))
            .collect()
    }
}

#[derive(Debug, PartialEq)]
pub struct StructInstance {
    pub ty: Rc<StructType>,
    pub fields: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Atomic(Atomic),
    Builtin(Builtin),
    Closure(Rc<Closure>),
    Struct(Rc<StructInstance>),
    Constructor(Rc<StructType>),
    /// Field index into the instance.
    Accessor(Rc<StructType>, usize),
    Predicate(Rc<StructType>),
}

impl Value {
    pub fn number(n: f64) -> Value {
        Value::Atomic(Atomic::Number(n))
    }

    pub fn string(s: impl Into<String>) -> Value {
        Value::Atomic(Atomic::String(s.into()))
    }

    pub fn boolean(b: bool) -> Value {
        Value::Atomic(Atomic::Boolean(b))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Atomic(Atomic::Number(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Atomic(Atomic::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Atomic(Atomic::Boolean(b)) => Some(*b),
            _ => None,
        }
    }
}

/// The equality used by `check-expect` and `equal?`. Only atomic values
/// compare; functions and structures are never equal to anything.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Atomic(a), Value::Atomic(b)) => a == b,
        _ => false,
    }
}

/// A runtime failure. `context` is the expression (or function name) the
/// failure is reported against.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueError {
    pub context: Option<Expr>,
    pub message: String,
}

impl ValueError {
    pub fn new(context: &Expr, message: impl Into<String>) -> Self {
        ValueError {
            context: Some(context.clone()),
            message: message.into(),
        }
    }

    /// An error raised inside the function called `name`.
    pub fn in_function(name: &str, message: impl Into<String>) -> Self {
        ValueError {
            context: Some(Expr::Id(name.to_string())),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}: {}", context, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for ValueError {}
