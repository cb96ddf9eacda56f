use crate::ast::{Check, CondClause, Definition, Expr, Question, TopLevel, TopLevelError, arity_message};
use crate::environment::{BindingError, Environment, Lookup};
use crate::value::{
    Closure, ExprResult, StructInstance, StructType, Value, ValueError, values_equal,
};
use std::cell::RefCell;
use std::rc::Rc;

type Env = Rc<RefCell<Environment>>;

#[derive(Debug, Clone, PartialEq)]
pub enum DefinitionResult {
    /// `value` is `None` for a structure definition, which binds several
    /// names at once.
    Binding { name: String, value: Option<Value> },
    Error(BindingError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Success,
    Failure {
        actual: Value,
        expected: Value,
    },
    NotWithin {
        actual: Value,
        expected: Value,
        delta: f64,
    },
    /// The actual side failed while the expected side produced a value.
    ActualError {
        keyword: &'static str,
        error: ValueError,
        expected: Value,
    },
    /// The expected side (or delta, or message) failed.
    ExpectedError(ValueError),
    /// `check-error` got a value instead of an error.
    NoError {
        actual: Value,
    },
    /// `check-error` got an error with a different message.
    WrongError {
        expected: String,
        error: ValueError,
    },
}

impl CheckResult {
    pub fn passed(&self) -> bool {
        matches!(self, CheckResult::Success)
    }
}

/// The result of one top-level form.
#[derive(Debug, Clone, PartialEq)]
pub enum FormResult {
    Definition(DefinitionResult),
    Expr(ExprResult),
    Check(CheckResult),
    Syntax(TopLevelError),
}

impl FormResult {
    /// Whether this form produced an error or a failing test.
    pub fn is_failure(&self) -> bool {
        match self {
            FormResult::Definition(DefinitionResult::Binding { .. }) => false,
            FormResult::Definition(DefinitionResult::Error(_)) => true,
            FormResult::Expr(result) => result.is_err(),
            FormResult::Check(check) => !check.passed(),
            FormResult::Syntax(_) => true,
        }
    }
}

enum Pending<'a> {
    Done(FormResult),
    Check(&'a Check),
}

/// Evaluates a whole program against a fresh top-level environment.
/// One result per form, in order.
pub fn evaluate(forms: &[TopLevel]) -> Vec<FormResult> {
    evaluate_in(forms, &Environment::new_global_populated())
}

/// Evaluates `forms` against `env`, which is treated as the top level.
pub fn evaluate_in(forms: &[TopLevel], env: &Env) -> Vec<FormResult> {
    // Pre-bind: every defined name exists before anything is evaluated.
    {
        let mut top = env.borrow_mut();
        for form in forms {
            if let TopLevel::Definition(definition) = form {
                for name in definition.bound_names() {
                    top.reserve(&name);
                }
            }
        }
    }

    // Definitions and expressions in order; checks wait until the end.
    let pending: Vec<Pending> = forms
        .iter()
        .map(|form| match form {
            TopLevel::Definition(definition) => {
                Pending::Done(FormResult::Definition(eval_definition(definition, env)))
            }
            TopLevel::Expr(expr) => Pending::Done(FormResult::Expr(eval(expr, env))),
            TopLevel::Check(check) => Pending::Check(check),
            TopLevel::Error(error) => Pending::Done(FormResult::Syntax(error.clone())),
        })
        .collect();

    let results: Vec<FormResult> = pending
        .into_iter()
        .map(|p| match p {
            Pending::Done(result) => result,
            Pending::Check(check) => FormResult::Check(run_check(check, env)),
        })
        .collect();
    tracing::debug!(
        forms = results.len(),
        failures = results.iter().filter(|r| r.is_failure()).count(),
        "evaluated"
    );
    results
}

fn eval_definition(definition: &Definition, env: &Env) -> DefinitionResult {
    tracing::trace!(name = definition.name(), "define");
    match definition {
        Definition::Constant { name, body } => {
            let value = eval(body, env);
            let filled = env.borrow_mut().fill(name, value.clone());
            match (filled, value) {
                (Err(error), _) => DefinitionResult::Error(error),
                (Ok(()), Err(error)) => DefinitionResult::Error(error.into()),
                (Ok(()), Ok(value)) => DefinitionResult::Binding {
                    name: name.clone(),
                    value: Some(value),
                },
            }
        }
        Definition::Function { name, params, body } => {
            let closure = Value::Closure(Rc::new(Closure {
                name: name.clone(),
                params: params.clone(),
                body: body.clone(),
                env: Rc::downgrade(env),
            }));
            let filled = env.borrow_mut().fill(name, Ok(closure.clone()));
            match filled {
                Ok(()) => DefinitionResult::Binding {
                    name: name.clone(),
                    value: Some(closure),
                },
                Err(error) => DefinitionResult::Error(error),
            }
        }
        Definition::Struct { name, fields } => {
            let ty = StructType::new(name, fields);
            let mut top = env.borrow_mut();
            // Fill every name even after a clash so none stays reserved.
            let mut first_error = None;
            for (bound, value) in ty.bindings() {
                if let Err(error) = top.fill(&bound, Ok(value)) {
                    first_error.get_or_insert(error);
                }
            }
            match first_error {
                Some(error) => DefinitionResult::Error(error),
                None => DefinitionResult::Binding {
                    name: name.clone(),
                    value: None,
                },
            }
        }
    }
}

fn lookup(name: &str, env: &Env) -> ExprResult {
    let found = env.borrow().lookup(name);
    match found {
        Lookup::Bound(result) => result,
        Lookup::Reserved => Err(ValueError::in_function(
            name,
            "Expression defined later in program",
        )),
        Lookup::Unbound => Err(ValueError::in_function(name, "this variable is not defined")),
    }
}

fn not_boolean(context: &Expr, value: &Value) -> ValueError {
    ValueError::new(
        context,
        format!("question result is not true or false: {}", value),
    )
}

/// Evaluates a single expression.
pub fn eval(expr: &Expr, env: &Env) -> ExprResult {
    match expr {
        Expr::String(s) => Ok(Value::string(s.as_str())),
        Expr::Num(n) => Ok(Value::number(*n)),
        Expr::Bool(b) => Ok(Value::boolean(*b)),
        Expr::Id(name) => lookup(name, env),
        Expr::Template(_) => Err(ValueError::new(
            expr,
            "expected a finished expression, but found a template",
        )),
        Expr::If {
            predicate,
            consequent,
            alternative,
        } => {
            let question = eval(predicate, env)?;
            match question.as_boolean() {
                Some(true) => eval(consequent, env),
                Some(false) => eval(alternative, env),
                None => Err(not_boolean(expr, &question)),
            }
        }
        Expr::Cond { clauses } => eval_cond(expr, clauses, env),
        Expr::And(args) => eval_logical(expr, args, false, env),
        Expr::Or(args) => eval_logical(expr, args, true, env),
        Expr::Call { op, args } => {
            let function = lookup(op, env)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, env))
                .collect::<Result<Vec<_>, _>>()?;
            apply(&function, &args, expr)
        }
    }
}

fn eval_cond(expr: &Expr, clauses: &[CondClause], env: &Env) -> ExprResult {
    for clause in clauses {
        match &clause.question {
            Question::Else => return eval(&clause.answer, env),
            Question::Test(question) => {
                let result = eval(question, env)?;
                match result.as_boolean() {
                    Some(true) => return eval(&clause.answer, env),
                    Some(false) => {}
                    None => return Err(not_boolean(expr, &result)),
                }
            }
        }
    }
    Err(ValueError::new(expr, "all question results were false"))
}

/// `and` stops at the first `#false`, `or` at the first `#true`.
fn eval_logical(expr: &Expr, args: &[Expr], stop_on: bool, env: &Env) -> ExprResult {
    for arg in args {
        let result = eval(arg, env)?;
        match result.as_boolean() {
            Some(b) if b == stop_on => return Ok(result),
            Some(_) => {}
            None => return Err(not_boolean(expr, &result)),
        }
    }
    Ok(Value::boolean(!stop_on))
}

fn check_count(name: &str, expected: usize, args: &[Value]) -> Result<(), ValueError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ValueError::in_function(
            name,
            arity_message(expected, Some(expected), args.len()),
        ))
    }
}

/// Applies a function value to evaluated arguments. `call` is the
/// expression being evaluated, for error context.
pub fn apply(function: &Value, args: &[Value], call: &Expr) -> ExprResult {
    match function {
        Value::Builtin(builtin) => (builtin.func)(args),
        Value::Closure(closure) => apply_closure(closure, args),
        Value::Constructor(ty) => {
            check_count(&crate::ast::constructor_name(&ty.name), ty.fields.len(), args)?;
            Ok(Value::Struct(Rc::new(StructInstance {
                ty: ty.clone(),
                fields: args.to_vec(),
            })))
        }
        Value::Accessor(ty, index) => {
            let name = crate::ast::accessor_name(&ty.name, &ty.fields[*index]);
            check_count(&name, 1, args)?;
            match &args[0] {
                Value::Struct(instance) if Rc::ptr_eq(&instance.ty, ty) => {
                    Ok(instance.fields[*index].clone())
                }
                other => Err(ValueError::in_function(
                    &name,
                    format!("expects a {}, given {}", ty.name, other),
                )),
            }
        }
        Value::Predicate(ty) => {
            check_count(&crate::ast::predicate_name(&ty.name), 1, args)?;
            let is_instance =
                matches!(&args[0], Value::Struct(instance) if Rc::ptr_eq(&instance.ty, ty));
            Ok(Value::boolean(is_instance))
        }
        Value::Atomic(_) | Value::Struct(_) => {
            Err(ValueError::new(call, "tried to apply a non-function"))
        }
    }
}

fn apply_closure(closure: &Closure, args: &[Value]) -> ExprResult {
    check_count(&closure.name, closure.params.len(), args)?;
    let Some(captured) = closure.env.upgrade() else {
        return Err(ValueError::in_function(
            &closure.name,
            "the program that defined this function is no longer running",
        ));
    };
    let frame = Environment::extend(
        captured,
        closure.params.iter().cloned().zip(args.iter().cloned()),
    );
    eval(&closure.body, &frame)
}

fn run_check(check: &Check, env: &Env) -> CheckResult {
    let keyword = check.keyword();
    match check {
        Check::Expect { actual, expected } => {
            let expected = match eval(expected, env) {
                Ok(value) => value,
                Err(error) => return CheckResult::ExpectedError(error),
            };
            match eval(actual, env) {
                Ok(actual) if values_equal(&actual, &expected) => CheckResult::Success,
                Ok(actual) => CheckResult::Failure { actual, expected },
                Err(error) => CheckResult::ActualError {
                    keyword,
                    error,
                    expected,
                },
            }
        }
        Check::Within {
            actual,
            expected,
            delta,
        } => {
            let expected = match eval(expected, env) {
                Ok(value) => value,
                Err(error) => return CheckResult::ExpectedError(error),
            };
            let delta = match eval(delta, env) {
                Ok(value) => match value.as_number() {
                    Some(delta) => delta,
                    None => {
                        return CheckResult::ExpectedError(ValueError::in_function(
                            keyword,
                            format!("expects a number as 3rd argument, given {}", value),
                        ));
                    }
                },
                Err(error) => return CheckResult::ExpectedError(error),
            };
            match eval(actual, env) {
                Ok(actual) => {
                    let within = match (actual.as_number(), expected.as_number()) {
                        (Some(a), Some(e)) => (a - e).abs() <= delta,
                        _ => values_equal(&actual, &expected),
                    };
                    if within {
                        CheckResult::Success
                    } else {
                        CheckResult::NotWithin {
                            actual,
                            expected,
                            delta,
                        }
                    }
                }
                Err(error) => CheckResult::ActualError {
                    keyword,
                    error,
                    expected,
                },
            }
        }
        Check::Error { actual, message } => {
            let message = match message.as_ref().map(|m| eval(m, env)) {
                None => None,
                Some(Ok(value)) => match value.as_str() {
                    Some(s) => Some(s.to_string()),
                    None => {
                        return CheckResult::ExpectedError(ValueError::in_function(
                            keyword,
                            format!("expects a string as 2nd argument, given {}", value),
                        ));
                    }
                },
                Some(Err(error)) => return CheckResult::ExpectedError(error),
            };
            match (eval(actual, env), message) {
                (Ok(actual), _) => CheckResult::NoError { actual },
                (Err(error), Some(expected)) if error.to_string() != expected => {
                    CheckResult::WrongError { expected, error }
                }
                (Err(_), _) => CheckResult::Success,
            }
        }
    }
}
