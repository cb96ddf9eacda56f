//! Renders results, one line per form, and renders expressions and values
//! back into surface syntax for messages.

use crate::ast::{Expr, Question, constructor_name};
use crate::evaluator::{CheckResult, DefinitionResult, FormResult};
use crate::value::{Atomic, Value};
use std::fmt;

/// Every result on its own line. An empty program prints a single newline.
pub fn print(results: &[FormResult]) -> String {
    if results.is_empty() {
        return "\n".to_string();
    }
    results.iter().map(|result| format!("{}\n", result)).collect()
}

fn write_spaced<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for item in items {
        write!(f, " {}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::String(s) => write!(f, "\"{}\"", s),
            Expr::Num(n) => write!(f, "{}", n),
            Expr::Bool(b) => f.write_str(if *b { "#true" } else { "#false" }),
            Expr::Id(name) | Expr::Template(name) => f.write_str(name),
            Expr::Call { op, args } => {
                write!(f, "({}", op)?;
                write_spaced(f, args)?;
                write!(f, ")")
            }
            Expr::If {
                predicate,
                consequent,
                alternative,
            } => write!(f, "(if {} {} {})", predicate, consequent, alternative),
            Expr::Cond { clauses } => {
                write!(f, "(cond")?;
                for clause in clauses {
                    match &clause.question {
                        Question::Else => write!(f, " [else {}]", clause.answer)?,
                        Question::Test(question) => {
                            write!(f, " [{} {}]", question, clause.answer)?
                        }
                    }
                }
                write!(f, ")")
            }
            Expr::And(args) => {
                write!(f, "(and")?;
                write_spaced(f, args)?;
                write!(f, ")")
            }
            Expr::Or(args) => {
                write!(f, "(or")?;
                write_spaced(f, args)?;
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Atomic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atomic::String(s) => write!(f, "\"{}\"", s),
            Atomic::Number(n) => write!(f, "{}", n),
            Atomic::Boolean(b) => f.write_str(if *b { "#true" } else { "#false" }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Atomic(atomic) => write!(f, "{}", atomic),
            Value::Builtin(builtin) => f.write_str(builtin.name),
            Value::Closure(closure) => f.write_str(&closure.name),
            Value::Struct(instance) => {
                write!(f, "({}", constructor_name(&instance.ty.name))?;
                write_spaced(f, &instance.fields)?;
                write!(f, ")")
            }
            Value::Constructor(ty) => f.write_str(&constructor_name(&ty.name)),
            Value::Accessor(ty, index) => write!(f, "{}-{}", ty.name, ty.fields[*index]),
            Value::Predicate(ty) => write!(f, "{}?", ty.name),
        }
    }
}

impl fmt::Display for DefinitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefinitionResult::Binding {
                name,
                value: Some(Value::Closure(closure)),
            } if closure.name == *name => {
                write!(f, "Defined ({}", name)?;
                write_spaced(f, &closure.params)?;
                write!(f, ") to be {}.", closure.body)
            }
            DefinitionResult::Binding {
                name,
                value: Some(value),
            } => write!(f, "Defined {} to be {}.", name, value),
            DefinitionResult::Binding { name, value: None } => {
                write!(f, "Defined structure {}.", name)
            }
            DefinitionResult::Error(error) => write!(f, "{}", error),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Success => f.write_str("🎉 Test passed!"),
            CheckResult::Failure { actual, expected } => write!(
                f,
                "Actual value {} differs from {}, the expected value.",
                actual, expected
            ),
            CheckResult::NotWithin {
                actual,
                expected,
                delta,
            } => write!(
                f,
                "Actual value {} is not within {} of expected value {}.",
                actual, delta, expected
            ),
            CheckResult::ActualError {
                keyword,
                error,
                expected,
            } => write!(
                f,
                "{} encountered the following error instead of the expected value, {}. :: {}",
                keyword, expected, error
            ),
            CheckResult::ExpectedError(error) => write!(f, "{}", error),
            CheckResult::NoError { actual } => write!(
                f,
                "check-error expected an error, but instead received the value {}.",
                actual
            ),
            CheckResult::WrongError { expected, error } => write!(
                f,
                "check-error encountered the following error instead of the expected {} :: {}",
                expected, error
            ),
        }
    }
}

impl fmt::Display for FormResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormResult::Definition(result) => write!(f, "{}", result),
            FormResult::Expr(Ok(value)) => write!(f, "{}", value),
            FormResult::Expr(Err(error)) => write!(f, "{}", error),
            FormResult::Check(result) => write!(f, "{}", result),
            FormResult::Syntax(error) => write!(f, "{}", error),
        }
    }
}
