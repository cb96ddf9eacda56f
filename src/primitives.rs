//! The built-in library. Every built-in checks its argument count first,
//! then the type of every argument, and only then computes.

use crate::ast::arity_message;
use crate::environment::Environment;
use crate::value::{ExprResult, StructType, Value, ValueError, values_equal};

// Returns early with an arity error.
macro_rules! check_arity {
    ($args:expr, $name:expr, min $expected:expr) => {
        if $args.len() < $expected {
            return Err(ValueError::in_function(
                $name,
                arity_message($expected, None, $args.len()),
            ));
        }
    };
    ($args:expr, $name:expr, $expected:expr) => {
        if $args.len() != $expected {
            return Err(ValueError::in_function(
                $name,
                arity_message($expected, Some($expected), $args.len()),
            ));
        }
    };
}

pub(crate) fn install(env: &mut Environment) {
    env.add_builtin("+", prim_add);
    env.add_builtin("-", prim_sub);
    env.add_builtin("*", prim_mul);
    env.add_builtin("/", prim_div);
    env.add_builtin("=", prim_equals);
    env.add_builtin("<", prim_less_than);
    env.add_builtin(">", prim_greater_than);
    env.add_builtin("<=", prim_less_than_or_equals);
    env.add_builtin(">=", prim_greater_than_or_equals);
    env.add_builtin("sin", prim_sin);
    env.add_builtin("cos", prim_cos);
    env.add_builtin("sqrt", prim_sqrt);
    env.add_builtin("abs", prim_abs);

    env.add_builtin("string-append", prim_string_append);
    env.add_builtin("string-length", prim_string_length);
    env.add_builtin("string=?", prim_string_equals);

    env.add_builtin("not", prim_not);
    env.add_builtin("equal?", prim_is_equal);
    env.add_builtin("number?", prim_is_number);
    env.add_builtin("string?", prim_is_string);
    env.add_builtin("boolean?", prim_is_boolean);

    env.define("pi", Value::number(std::f64::consts::PI));
    env.define("e", Value::number(std::f64::consts::E));

    let posn = StructType::new("posn", &["x".to_string(), "y".to_string()]);
    for (name, value) in posn.bindings() {
        env.define(name, value);
    }
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}

/// `index` is 0-based; the message counts from 1.
fn type_error(name: &str, expected: &str, index: usize, given: &Value) -> ValueError {
    ValueError::in_function(
        name,
        format!(
            "expects {} as {} argument, given {}",
            expected,
            ordinal(index + 1),
            given
        ),
    )
}

fn numbers(name: &str, args: &[Value]) -> Result<Vec<f64>, ValueError> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| arg.as_number().ok_or_else(|| type_error(name, "a number", i, arg)))
        .collect()
}

fn strings<'a>(name: &str, args: &'a [Value]) -> Result<Vec<&'a str>, ValueError> {
    args.iter()
        .enumerate()
        .map(|(i, arg)| arg.as_str().ok_or_else(|| type_error(name, "a string", i, arg)))
        .collect()
}

// --- Arithmetic ---

fn prim_add(args: &[Value]) -> ExprResult {
    check_arity!(args, "+", min 2);
    Ok(Value::number(numbers("+", args)?.iter().sum()))
}

fn prim_mul(args: &[Value]) -> ExprResult {
    check_arity!(args, "*", min 2);
    Ok(Value::number(numbers("*", args)?.iter().product()))
}

fn prim_sub(args: &[Value]) -> ExprResult {
    check_arity!(args, "-", min 1);
    let result = match numbers("-", args)?.as_slice() {
        [only] => -only,
        [first, rest @ ..] => rest.iter().fold(*first, |acc, n| acc - n),
        [] => unreachable!("arity checked"),
    };
    Ok(Value::number(result))
}

fn prim_div(args: &[Value]) -> ExprResult {
    check_arity!(args, "/", min 1);
    let nums = numbers("/", args)?;
    let (seed, divisors) = match nums.as_slice() {
        [only] => (1.0, std::slice::from_ref(only)),
        [first, rest @ ..] => (*first, rest),
        [] => unreachable!("arity checked"),
    };
    let mut result = seed;
    for divisor in divisors {
        if *divisor == 0.0 {
            return Err(ValueError::in_function("/", "division by zero"));
        }
        result /= divisor;
    }
    Ok(Value::number(result))
}

fn unary_number(name: &str, args: &[Value], func: fn(f64) -> f64) -> ExprResult {
    check_arity!(args, name, 1);
    Ok(Value::number(func(numbers(name, args)?[0])))
}

fn prim_sin(args: &[Value]) -> ExprResult {
    unary_number("sin", args, f64::sin)
}

fn prim_cos(args: &[Value]) -> ExprResult {
    unary_number("cos", args, f64::cos)
}

fn prim_abs(args: &[Value]) -> ExprResult {
    unary_number("abs", args, f64::abs)
}

fn prim_sqrt(args: &[Value]) -> ExprResult {
    check_arity!(args, "sqrt", 1);
    let n = numbers("sqrt", args)?[0];
    if n < 0.0 {
        return Err(type_error("sqrt", "a non-negative number", 0, &args[0]));
    }
    Ok(Value::number(n.sqrt()))
}

// --- Comparison ---

fn compare_numbers(name: &str, args: &[Value], op: fn(f64, f64) -> bool) -> ExprResult {
    check_arity!(args, name, min 2);
    let nums = numbers(name, args)?;
    Ok(Value::boolean(nums.windows(2).all(|pair| op(pair[0], pair[1]))))
}

fn prim_equals(args: &[Value]) -> ExprResult {
    compare_numbers("=", args, |a, b| a == b)
}

fn prim_less_than(args: &[Value]) -> ExprResult {
    compare_numbers("<", args, |a, b| a < b)
}

fn prim_greater_than(args: &[Value]) -> ExprResult {
    compare_numbers(">", args, |a, b| a > b)
}

fn prim_less_than_or_equals(args: &[Value]) -> ExprResult {
    compare_numbers("<=", args, |a, b| a <= b)
}

fn prim_greater_than_or_equals(args: &[Value]) -> ExprResult {
    compare_numbers(">=", args, |a, b| a >= b)
}

// --- Strings ---

fn prim_string_append(args: &[Value]) -> ExprResult {
    Ok(Value::string(strings("string-append", args)?.concat()))
}

fn prim_string_length(args: &[Value]) -> ExprResult {
    check_arity!(args, "string-length", 1);
    let s = strings("string-length", args)?[0];
    Ok(Value::number(s.chars().count() as f64))
}

fn prim_string_equals(args: &[Value]) -> ExprResult {
    check_arity!(args, "string=?", min 2);
    let strs = strings("string=?", args)?;
    Ok(Value::boolean(strs.windows(2).all(|pair| pair[0] == pair[1])))
}

// --- Booleans and predicates ---

fn prim_not(args: &[Value]) -> ExprResult {
    check_arity!(args, "not", 1);
    match args[0].as_boolean() {
        Some(b) => Ok(Value::boolean(!b)),
        None => Err(type_error("not", "a boolean", 0, &args[0])),
    }
}

fn prim_is_equal(args: &[Value]) -> ExprResult {
    check_arity!(args, "equal?", 2);
    Ok(Value::boolean(values_equal(&args[0], &args[1])))
}

fn prim_is_number(args: &[Value]) -> ExprResult {
    check_arity!(args, "number?", 1);
    Ok(Value::boolean(args[0].as_number().is_some()))
}

fn prim_is_string(args: &[Value]) -> ExprResult {
    check_arity!(args, "string?", 1);
    Ok(Value::boolean(args[0].as_str().is_some()))
}

fn prim_is_boolean(args: &[Value]) -> ExprResult {
    check_arity!(args, "boolean?", 1);
    Ok(Value::boolean(args[0].as_boolean().is_some()))
}
