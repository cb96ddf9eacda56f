//! Typed forms produced by the parser, and the syntax errors it reports.

use crate::types::{Atom, ReadError, SExp};
use thiserror::Error;

pub const KEYWORDS: &[&str] = &[
    "define",
    "define-struct",
    "if",
    "cond",
    "else",
    "and",
    "or",
    "check-expect",
    "check-within",
    "check-error",
];

/// Design-recipe placeholders for not-yet-written code.
pub const TEMPLATES: &[&str] = &["...", "....", ".....", "......"];

pub fn is_template(name: &str) -> bool {
    TEMPLATES.contains(&name)
}

pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name) || is_template(name)
}

pub fn is_check(name: &str) -> bool {
    matches!(name, "check-expect" | "check-within" | "check-error")
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    String(String),
    Num(f64),
    Bool(bool),
    Id(String),
    Call {
        op: String,
        args: Vec<Expr>,
    },
    If {
        predicate: Box<Expr>,
        consequent: Box<Expr>,
        alternative: Box<Expr>,
    },
    Cond {
        clauses: Vec<CondClause>,
    },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Template(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CondClause {
    pub question: Question,
    pub answer: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Question {
    /// Only allowed in the last clause.
    Else,
    Test(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Constant {
        name: String,
        body: Expr,
    },
    Function {
        name: String,
        params: Vec<String>,
        body: Expr,
    },
    Struct {
        name: String,
        fields: Vec<String>,
    },
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Constant { name, .. }
            | Definition::Function { name, .. }
            | Definition::Struct { name, .. } => name,
        }
    }

    /// Every top-level name this definition binds, in binding order.
    pub fn bound_names(&self) -> Vec<String> {
        match self {
            Definition::Constant { name, .. } | Definition::Function { name, .. } => {
                vec![name.clone()]
            }
            Definition::Struct { name, fields } => std::iter::once(constructor_name(name))
                .chain(fields.iter().map(|field| accessor_name(name, field)))
                .chain(std::iter::once(predicate_name(name)))
                .collect(),
        }
    }
}

pub fn constructor_name(struct_name: &str) -> String {
    format!("make-{}", struct_name)
}

pub fn accessor_name(struct_name: &str, field: &str) -> String {
    format!("{}-{}", struct_name, field)
}

pub fn predicate_name(struct_name: &str) -> String {
    format!("{}?", struct_name)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Expect {
        actual: Expr,
        expected: Expr,
    },
    Within {
        actual: Expr,
        expected: Expr,
        delta: Expr,
    },
    Error {
        actual: Expr,
        message: Option<Expr>,
    },
}

impl Check {
    pub fn keyword(&self) -> &'static str {
        match self {
            Check::Expect { .. } => "check-expect",
            Check::Within { .. } => "check-within",
            Check::Error { .. } => "check-error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TopLevel {
    Definition(Definition),
    Expr(Expr),
    Check(Check),
    Error(TopLevelError),
}

/// A form with the wrong shape, reported against the keyword that owns it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{keyword}: {message}")]
pub struct FormError {
    pub keyword: String,
    pub message: String,
    /// The S-expression the violation was found in.
    pub found: SExp,
}

impl FormError {
    pub fn new(keyword: &str, message: impl Into<String>, found: &SExp) -> Self {
        FormError {
            keyword: keyword.to_string(),
            message: message.into(),
            found: found.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Body(#[from] ExprError),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TopLevelError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error(transparent)]
    Check(ExprError),
}

impl TopLevelError {
    /// The S-expression a syntax error was found in, if it carries one.
    pub fn found(&self) -> Option<&SExp> {
        let expr_error = match self {
            TopLevelError::Read(_) => return None,
            TopLevelError::Definition(DefinitionError::Form(form)) => return Some(&form.found),
            TopLevelError::Definition(DefinitionError::Body(error))
            | TopLevelError::Expr(error)
            | TopLevelError::Check(error) => error,
        };
        match expr_error {
            ExprError::Form(form) => Some(&form.found),
            ExprError::Read(_) => None,
        }
    }
}

// --- Message helpers shared by the parser and the built-ins ---

pub(crate) fn parts(n: usize) -> String {
    format!("{} {}", n, if n == 1 { "part" } else { "parts" })
}

/// "nothing's there" or "found only N parts".
pub(crate) fn missing_parts(n: usize) -> String {
    if n == 0 {
        "nothing's there".to_string()
    } else {
        format!("found only {}", parts(n))
    }
}

pub(crate) fn extra_parts(n: usize) -> String {
    format!("found {} extra {}", n, if n == 1 { "part" } else { "parts" })
}

/// How a form or literal is named when it shows up in the wrong place.
pub(crate) fn describe(sexp: &SExp) -> &'static str {
    match sexp {
        SExp::Atom(Atom::String(_)) => "a string",
        SExp::Atom(Atom::Num(_)) => "a number",
        SExp::Atom(Atom::Bool(_)) => "a boolean",
        SExp::Atom(Atom::Id(name)) if is_keyword(name) => "a keyword",
        SExp::Atom(Atom::Id(_)) => "a variable",
        SExp::List(_) | SExp::Error(_) => "a part",
    }
}

/// Message for a call with `found` arguments to something accepting
/// `min..=max` (`max` of `None` is variadic).
pub(crate) fn arity_message(min: usize, max: Option<usize>, found: usize) -> String {
    let arguments = |n: usize| if n == 1 { "argument" } else { "arguments" };
    let found_few = if found == 0 {
        "none".to_string()
    } else {
        format!("only {}", found)
    };
    match max {
        Some(max) if found > max && max == min => {
            format!("expects only {} {}, but found {}", max, arguments(max), found)
        }
        Some(max) if found > max => {
            format!("expects at most {} {}, but found {}", max, arguments(max), found)
        }
        Some(max) if max == min => {
            format!("expects {} {}, but found {}", min, arguments(min), found_few)
        }
        _ => format!(
            "expects at least {} {}, but found {}",
            min,
            arguments(min),
            found_few
        ),
    }
}
