use crate::ast::{
    Check, CondClause, Definition, DefinitionError, Expr, ExprError, FormError, Question, TopLevel,
    TopLevelError, arity_message, describe, extra_parts, is_check, is_keyword, is_template,
    missing_parts, parts,
};
use crate::types::{Atom, SExp};
use std::collections::HashSet;

// Result type aliases for convenience
type ExprResult<T = Expr> = Result<T, ExprError>;
type ShapeResult<T> = Result<T, FormError>;
type DefineResult<T> = Result<T, DefinitionError>;

fn found(sexp: &SExp) -> String {
    format!("found {}", describe(sexp))
}

/// Parses one S-expression per top-level form, keeping order.
pub fn parse(sexps: &[SExp]) -> Vec<TopLevel> {
    let forms: Vec<TopLevel> = sexps.iter().map(parse_top_level).collect();
    tracing::debug!(
        forms = forms.len(),
        errors = forms.iter().filter(|f| matches!(f, TopLevel::Error(_))).count(),
        "parsed"
    );
    forms
}

pub fn parse_top_level(sexp: &SExp) -> TopLevel {
    let (head, args) = match sexp {
        SExp::Error(error) => return TopLevel::Error(TopLevelError::Read(error.clone())),
        SExp::List(items) => match items.split_first() {
            Some((head, args)) => (head.as_id(), args),
            None => (None, &[][..]),
        },
        SExp::Atom(_) => (None, &[][..]),
    };
    match head {
        Some("define") => match parse_define(sexp, args) {
            Ok(definition) => TopLevel::Definition(definition),
            Err(error) => TopLevel::Error(error.into()),
        },
        Some("define-struct") => match parse_define_struct(sexp, args) {
            Ok(definition) => TopLevel::Definition(definition),
            Err(error) => TopLevel::Error(error.into()),
        },
        Some(keyword) if is_check(keyword) => match parse_check(keyword, sexp, args) {
            Ok(check) => TopLevel::Check(check),
            Err(error) => TopLevel::Error(TopLevelError::Check(error)),
        },
        _ => match parse_expr(sexp) {
            Ok(expr) => TopLevel::Expr(expr),
            Err(error) => TopLevel::Error(error.into()),
        },
    }
}

/// Parses an expression; definitions and tests are not expressions.
pub fn parse_expr(sexp: &SExp) -> ExprResult {
    match sexp {
        SExp::Error(error) => Err(error.clone().into()),
        SExp::Atom(Atom::String(s)) => Ok(Expr::String(s.clone())),
        SExp::Atom(Atom::Num(n)) => Ok(Expr::Num(*n)),
        SExp::Atom(Atom::Bool(b)) => Ok(Expr::Bool(*b)),
        SExp::Atom(Atom::Id(name)) if is_template(name) => Ok(Expr::Template(name.clone())),
        SExp::Atom(Atom::Id(name)) if name == "else" => Err(misplaced_else(sexp).into()),
        SExp::Atom(Atom::Id(name)) if is_keyword(name) => Err(FormError::new(
            name,
            format!(
                "expected an open parenthesis before {}, but found none",
                name
            ),
            sexp,
        )
        .into()),
        SExp::Atom(Atom::Id(name)) => Ok(Expr::Id(name.clone())),
        SExp::List(items) => parse_list(sexp, items),
    }
}

fn misplaced_else(sexp: &SExp) -> FormError {
    FormError::new(
        "else",
        "not allowed here, because this is not a question in a clause",
        sexp,
    )
}

fn parse_list(sexp: &SExp, items: &[SExp]) -> ExprResult {
    let Some((head, args)) = items.split_first() else {
        return Err(FormError::new(
            "function call",
            "expected a function after the open parenthesis, but nothing's there",
            sexp,
        )
        .into());
    };
    match head.as_id() {
        Some(name) if is_template(name) => Ok(Expr::Template(name.to_string())),
        Some(keyword @ ("define" | "define-struct")) => Err(FormError::new(
            keyword,
            "found a definition that is not at the top level",
            sexp,
        )
        .into()),
        Some(keyword) if is_check(keyword) => Err(FormError::new(
            keyword,
            "found a test that is not at the top level",
            sexp,
        )
        .into()),
        Some("else") => Err(misplaced_else(sexp).into()),
        Some("if") => parse_if(sexp, args),
        Some("cond") => parse_cond(sexp, args),
        Some(keyword @ ("and" | "or")) => parse_logical(keyword, sexp, args),
        Some(op) => Ok(Expr::Call {
            op: op.to_string(),
            args: args.iter().map(parse_expr).collect::<ExprResult<_>>()?,
        }),
        None => match head {
            SExp::Error(error) => Err(error.clone().into()),
            _ => Err(FormError::new(
                "function call",
                format!(
                    "expected a function after the open parenthesis, but {}",
                    found(head)
                ),
                sexp,
            )
            .into()),
        },
    }
}

fn parse_if(sexp: &SExp, args: &[SExp]) -> ExprResult {
    match args {
        [predicate, consequent, alternative] => Ok(Expr::If {
            predicate: Box::new(parse_expr(predicate)?),
            consequent: Box::new(parse_expr(consequent)?),
            alternative: Box::new(parse_expr(alternative)?),
        }),
        _ if args.len() < 3 => Err(FormError::new(
            "if",
            format!(
                "expected a question and two answers, but {}",
                missing_parts(args.len())
            ),
            sexp,
        )
        .into()),
        _ => Err(FormError::new(
            "if",
            format!(
                "expected only a question and two answers, but {}",
                extra_parts(args.len() - 3)
            ),
            sexp,
        )
        .into()),
    }
}

fn parse_cond(sexp: &SExp, args: &[SExp]) -> ExprResult {
    if args.is_empty() {
        return Err(FormError::new(
            "cond",
            "expected a clause after cond, but nothing's there",
            sexp,
        )
        .into());
    }
    let mut clauses = Vec::with_capacity(args.len());
    for (index, clause) in args.iter().enumerate() {
        let (question, answer) = match clause {
            SExp::List(parts_of_clause) => match parts_of_clause.as_slice() {
                [question, answer] => (question, answer),
                other => {
                    return Err(FormError::new(
                        "cond",
                        format!(
                            "expected a clause with a question and an answer, but found a clause with {}",
                            parts(other.len())
                        ),
                        clause,
                    )
                    .into());
                }
            },
            SExp::Error(error) => return Err(error.clone().into()),
            other => {
                return Err(FormError::new(
                    "cond",
                    format!(
                        "expected a clause with a question and an answer, but {}",
                        found(other)
                    ),
                    clause,
                )
                .into());
            }
        };
        let question = match question.as_id() {
            Some("else") if index + 1 == args.len() => Question::Else,
            Some("else") => {
                return Err(FormError::new(
                    "cond",
                    "found an else clause that isn't the last clause in its cond expression",
                    sexp,
                )
                .into());
            }
            _ => Question::Test(parse_expr(question)?),
        };
        clauses.push(CondClause {
            question,
            answer: parse_expr(answer)?,
        });
    }
    Ok(Expr::Cond { clauses })
}

fn parse_logical(keyword: &str, sexp: &SExp, args: &[SExp]) -> ExprResult {
    if args.len() < 2 {
        return Err(FormError::new(keyword, arity_message(2, None, args.len()), sexp).into());
    }
    let args = args.iter().map(parse_expr).collect::<ExprResult<Vec<_>>>()?;
    Ok(if keyword == "and" {
        Expr::And(args)
    } else {
        Expr::Or(args)
    })
}

/// A name in binding position: a non-keyword identifier.
fn variable(keyword: &str, expected: &str, sexp: &SExp, form: &SExp) -> DefineResult<String> {
    match sexp {
        SExp::Error(error) => Err(ExprError::from(error.clone()).into()),
        SExp::Atom(Atom::Id(name)) if is_keyword(name) => Err(FormError::new(
            keyword,
            "expected a variable, but found a keyword",
            form,
        )
        .into()),
        SExp::Atom(Atom::Id(name)) => Ok(name.clone()),
        other => Err(FormError::new(
            keyword,
            format!("expected {}, but {}", expected, found(other)),
            form,
        )
        .into()),
    }
}

fn distinct_names(
    keyword: &str,
    what: &str,
    names: &[String],
    form: &SExp,
) -> ShapeResult<()> {
    let mut seen = HashSet::new();
    match names.iter().find(|name| !seen.insert(name.as_str())) {
        Some(duplicate) => Err(FormError::new(
            keyword,
            format!("found {} that is used more than once: {}", what, duplicate),
            form,
        )),
        None => Ok(()),
    }
}

fn parse_define(sexp: &SExp, args: &[SExp]) -> DefineResult<Definition> {
    let Some((target, rest)) = args.split_first() else {
        return Err(FormError::new(
            "define",
            "expected a variable name, or a function name and its variables (in parentheses), but nothing's there",
            sexp,
        )
        .into());
    };
    match target {
        SExp::Atom(Atom::Id(_)) => {
            let name = variable("define", "a variable", target, sexp)?;
            match rest {
                [] => Err(FormError::new(
                    "define",
                    format!(
                        "expected an expression after the variable name {}, but nothing's there",
                        name
                    ),
                    sexp,
                )
                .into()),
                [body] => Ok(Definition::Constant {
                    name,
                    body: parse_expr(body)?,
                }),
                [_, extra @ ..] => Err(FormError::new(
                    "define",
                    format!(
                        "expected only one expression after the variable name {}, but {}",
                        name,
                        extra_parts(extra.len())
                    ),
                    sexp,
                )
                .into()),
            }
        }
        SExp::List(header) => {
            let Some((function, params)) = header.split_first() else {
                return Err(FormError::new(
                    "define",
                    "expected the name of the function, but nothing's there",
                    sexp,
                )
                .into());
            };
            let name = variable("define", "the name of the function", function, sexp)?;
            if params.is_empty() {
                return Err(FormError::new(
                    "define",
                    "expected at least one variable after the function name, but found none",
                    sexp,
                )
                .into());
            }
            let params = params
                .iter()
                .map(|param| variable("define", "a variable", param, sexp))
                .collect::<DefineResult<Vec<_>>>()?;
            distinct_names("define", "a variable", &params, sexp)?;
            match rest {
                [] => Err(FormError::new(
                    "define",
                    "expected an expression for the function body, but nothing's there",
                    sexp,
                )
                .into()),
                [body] => Ok(Definition::Function {
                    name,
                    params,
                    body: parse_expr(body)?,
                }),
                [_, extra @ ..] => Err(FormError::new(
                    "define",
                    format!(
                        "expected only one expression for the function body, but {}",
                        extra_parts(extra.len())
                    ),
                    sexp,
                )
                .into()),
            }
        }
        SExp::Error(error) => Err(ExprError::from(error.clone()).into()),
        other => Err(FormError::new(
            "define",
            format!(
                "expected a variable name, or a function name and its variables (in parentheses), but {}",
                found(other)
            ),
            sexp,
        )
        .into()),
    }
}

fn parse_define_struct(sexp: &SExp, args: &[SExp]) -> DefineResult<Definition> {
    let keyword = "define-struct";
    let Some((name, rest)) = args.split_first() else {
        return Err(FormError::new(
            keyword,
            "expected the structure name after define-struct, but nothing's there",
            sexp,
        )
        .into());
    };
    let name = variable(keyword, "the structure name after define-struct", name, sexp)?;
    let expected_fields = "expected at least one field name (in parentheses) after the structure name";
    match rest {
        [] => Err(FormError::new(
            keyword,
            format!("{}, but nothing's there", expected_fields),
            sexp,
        )
        .into()),
        [SExp::List(fields), extra @ ..] => {
            if fields.is_empty() {
                return Err(FormError::new(
                    keyword,
                    format!("{}, but found none", expected_fields),
                    sexp,
                )
                .into());
            }
            let fields = fields
                .iter()
                .map(|field| variable(keyword, "a field name", field, sexp))
                .collect::<DefineResult<Vec<_>>>()?;
            distinct_names(keyword, "a field name", &fields, sexp)?;
            if !extra.is_empty() {
                return Err(FormError::new(
                    keyword,
                    format!(
                        "expected nothing after the field names, but {}",
                        extra_parts(extra.len())
                    ),
                    sexp,
                )
                .into());
            }
            Ok(Definition::Struct { name, fields })
        }
        [SExp::Error(error), ..] => Err(ExprError::from(error.clone()).into()),
        [other, ..] => Err(FormError::new(
            keyword,
            format!("{}, but {}", expected_fields, found(other)),
            sexp,
        )
        .into()),
    }
}

fn parse_check(keyword: &str, sexp: &SExp, args: &[SExp]) -> ExprResult<Check> {
    Ok(match (keyword, args) {
        ("check-expect", [actual, expected]) => Check::Expect {
            actual: parse_expr(actual)?,
            expected: parse_expr(expected)?,
        },
        ("check-within", [actual, expected, delta]) => Check::Within {
            actual: parse_expr(actual)?,
            expected: parse_expr(expected)?,
            delta: parse_expr(delta)?,
        },
        ("check-error", [actual]) => Check::Error {
            actual: parse_expr(actual)?,
            message: None,
        },
        ("check-error", [actual, message]) => Check::Error {
            actual: parse_expr(actual)?,
            message: Some(parse_expr(message)?),
        },
        _ => {
            let (min, max) = match keyword {
                "check-expect" => (2, 2),
                "check-within" => (3, 3),
                _ => (1, 2),
            };
            return Err(
                FormError::new(keyword, arity_message(min, Some(max), args.len()), sexp).into(),
            );
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::reader::read;

    fn parse_str(input: &str) -> Vec<TopLevel> {
        parse(&read(&tokenize(input)))
    }

    fn parse_one(input: &str) -> TopLevel {
        let mut forms = parse_str(input);
        assert_eq!(forms.len(), 1, "Input: '{}'", input);
        forms.remove(0)
    }

    fn assert_expr(input: &str, expected: Expr) {
        assert_eq!(parse_one(input), TopLevel::Expr(expected), "Input: '{}'", input);
    }

    fn assert_parse_error(input: &str, expected_message: &str) {
        match parse_one(input) {
            TopLevel::Error(error) => {
                assert_eq!(error.to_string(), expected_message, "Input: '{}'", input)
            }
            other => panic!(
                "Expected parsing to fail for input '{}', but got: {:?}",
                input, other
            ),
        }
    }

    fn id(name: &str) -> Expr {
        Expr::Id(name.to_string())
    }

    fn call(op: &str, args: Vec<Expr>) -> Expr {
        Expr::Call {
            op: op.to_string(),
            args,
        }
    }

    #[test]
    fn test_parse_literals_and_ids() {
        assert_expr("5", Expr::Num(5.0));
        assert_expr("\"s\"", Expr::String("s".to_string()));
        assert_expr("#true", Expr::Bool(true));
        assert_expr("x", id("x"));
        assert_expr("...", Expr::Template("...".to_string()));
        assert_expr("(.... x)", Expr::Template("....".to_string()));
    }

    #[test]
    fn test_parse_call_and_special_forms() {
        assert_expr("(f 1 x)", call("f", vec![Expr::Num(1.0), id("x")]));
        assert_expr("(f)", call("f", vec![]));
        assert_expr(
            "(if #true 1 2)",
            Expr::If {
                predicate: Box::new(Expr::Bool(true)),
                consequent: Box::new(Expr::Num(1.0)),
                alternative: Box::new(Expr::Num(2.0)),
            },
        );
        assert_expr(
            "(and a b c)",
            Expr::And(vec![id("a"), id("b"), id("c")]),
        );
        assert_expr("(or a b)", Expr::Or(vec![id("a"), id("b")]));
        assert_expr(
            "(cond [(f x) 1] [else 2])",
            Expr::Cond {
                clauses: vec![
                    CondClause {
                        question: Question::Test(call("f", vec![id("x")])),
                        answer: Expr::Num(1.0),
                    },
                    CondClause {
                        question: Question::Else,
                        answer: Expr::Num(2.0),
                    },
                ],
            },
        );
    }

    #[test]
    fn test_parse_definitions() {
        assert_eq!(
            parse_one("(define x 10)"),
            TopLevel::Definition(Definition::Constant {
                name: "x".to_string(),
                body: Expr::Num(10.0),
            })
        );
        assert_eq!(
            parse_one("(define (f a b) (+ a b))"),
            TopLevel::Definition(Definition::Function {
                name: "f".to_string(),
                params: vec!["a".to_string(), "b".to_string()],
                body: call("+", vec![id("a"), id("b")]),
            })
        );
        assert_eq!(
            parse_one("(define-struct ball [x y])"),
            TopLevel::Definition(Definition::Struct {
                name: "ball".to_string(),
                fields: vec!["x".to_string(), "y".to_string()],
            })
        );
    }

    #[test]
    fn test_parse_checks() {
        assert_eq!(
            parse_one("(check-expect (f 1) 2)"),
            TopLevel::Check(Check::Expect {
                actual: call("f", vec![Expr::Num(1.0)]),
                expected: Expr::Num(2.0),
            })
        );
        assert_eq!(
            parse_one("(check-within x 1 0.1)"),
            TopLevel::Check(Check::Within {
                actual: id("x"),
                expected: Expr::Num(1.0),
                delta: Expr::Num(0.1),
            })
        );
        assert_eq!(
            parse_one("(check-error (f 1) \"boom\")"),
            TopLevel::Check(Check::Error {
                actual: call("f", vec![Expr::Num(1.0)]),
                message: Some(Expr::String("boom".to_string())),
            })
        );
        assert_eq!(
            parse_one("(check-error (f 1))"),
            TopLevel::Check(Check::Error {
                actual: call("f", vec![Expr::Num(1.0)]),
                message: None,
            })
        );
    }

    #[test]
    fn test_keyword_atoms() {
        assert_parse_error(
            "define",
            "define: expected an open parenthesis before define, but found none",
        );
        assert_parse_error(
            "else",
            "else: not allowed here, because this is not a question in a clause",
        );
    }

    #[test]
    fn test_call_head_errors() {
        assert_parse_error(
            "()",
            "function call: expected a function after the open parenthesis, but nothing's there",
        );
        assert_parse_error(
            "(1 2)",
            "function call: expected a function after the open parenthesis, but found a number",
        );
        assert_parse_error(
            "(\"f\")",
            "function call: expected a function after the open parenthesis, but found a string",
        );
        assert_parse_error(
            "(#true)",
            "function call: expected a function after the open parenthesis, but found a boolean",
        );
        assert_parse_error(
            "((f) 2)",
            "function call: expected a function after the open parenthesis, but found a part",
        );
    }

    #[test]
    fn test_if_arity() {
        assert_parse_error(
            "(if)",
            "if: expected a question and two answers, but nothing's there",
        );
        assert_parse_error(
            "(if #true 1)",
            "if: expected a question and two answers, but found only 2 parts",
        );
        assert_parse_error(
            "(if #true 1 2 3)",
            "if: expected only a question and two answers, but found 1 extra part",
        );
    }

    #[test]
    fn test_cond_shapes() {
        assert_parse_error("(cond)", "cond: expected a clause after cond, but nothing's there");
        assert_parse_error(
            "(cond 5)",
            "cond: expected a clause with a question and an answer, but found a number",
        );
        assert_parse_error(
            "(cond [#true])",
            "cond: expected a clause with a question and an answer, but found a clause with 1 part",
        );
        assert_parse_error(
            "(cond [else 1] [#true 2])",
            "cond: found an else clause that isn't the last clause in its cond expression",
        );
    }

    #[test]
    fn test_logical_arity() {
        assert_parse_error("(and #true)", "and: expects at least 2 arguments, but found only 1");
        assert_parse_error("(or)", "or: expects at least 2 arguments, but found none");
    }

    #[test]
    fn test_define_errors() {
        assert_parse_error(
            "(define)",
            "define: expected a variable name, or a function name and its variables (in parentheses), but nothing's there",
        );
        assert_parse_error(
            "(define 5 1)",
            "define: expected a variable name, or a function name and its variables (in parentheses), but found a number",
        );
        assert_parse_error(
            "(define x)",
            "define: expected an expression after the variable name x, but nothing's there",
        );
        assert_parse_error(
            "(define x 1 2 3)",
            "define: expected only one expression after the variable name x, but found 2 extra parts",
        );
        assert_parse_error(
            "(define (f) 1)",
            "define: expected at least one variable after the function name, but found none",
        );
        assert_parse_error(
            "(define () 1)",
            "define: expected the name of the function, but nothing's there",
        );
        assert_parse_error(
            "(define (f 5) 1)",
            "define: expected a variable, but found a number",
        );
        assert_parse_error(
            "(define (f x x) x)",
            "define: found a variable that is used more than once: x",
        );
        assert_parse_error(
            "(define (f x))",
            "define: expected an expression for the function body, but nothing's there",
        );
        assert_parse_error(
            "(define (f x) x x)",
            "define: expected only one expression for the function body, but found 1 extra part",
        );
    }

    #[test]
    fn test_keywords_cannot_be_bound() {
        for input in [
            "(define if 1)",
            "(define (cond x) x)",
            "(define (f and) 1)",
        ] {
            assert_parse_error(input, "define: expected a variable, but found a keyword");
        }
        assert_parse_error(
            "(define-struct s (x else))",
            "define-struct: expected a variable, but found a keyword",
        );
    }

    #[test]
    fn test_define_struct_errors() {
        assert_parse_error(
            "(define-struct)",
            "define-struct: expected the structure name after define-struct, but nothing's there",
        );
        assert_parse_error(
            "(define-struct posn)",
            "define-struct: expected at least one field name (in parentheses) after the structure name, but nothing's there",
        );
        assert_parse_error(
            "(define-struct posn ())",
            "define-struct: expected at least one field name (in parentheses) after the structure name, but found none",
        );
        assert_parse_error(
            "(define-struct posn x)",
            "define-struct: expected at least one field name (in parentheses) after the structure name, but found a variable",
        );
        assert_parse_error(
            "(define-struct posn (x 1))",
            "define-struct: expected a field name, but found a number",
        );
        assert_parse_error(
            "(define-struct posn (x x))",
            "define-struct: found a field name that is used more than once: x",
        );
        assert_parse_error(
            "(define-struct posn (x) y)",
            "define-struct: expected nothing after the field names, but found 1 extra part",
        );
    }

    #[test]
    fn test_nested_definitions_and_tests() {
        assert_parse_error(
            "(if #true (define x 1) 2)",
            "define: found a definition that is not at the top level",
        );
        assert_parse_error(
            "(f (check-expect 1 1))",
            "check-expect: found a test that is not at the top level",
        );
        assert_parse_error(
            "(define x (define-struct s (a)))",
            "define-struct: found a definition that is not at the top level",
        );
    }

    #[test]
    fn test_check_arity() {
        assert_parse_error("(check-expect 1)", "check-expect: expects 2 arguments, but found only 1");
        assert_parse_error(
            "(check-expect 1 2 3)",
            "check-expect: expects only 2 arguments, but found 3",
        );
        assert_parse_error("(check-within 1 2)", "check-within: expects 3 arguments, but found only 2");
        assert_parse_error("(check-error)", "check-error: expects at least 1 argument, but found none");
    }

    #[test]
    fn test_read_errors_pass_through() {
        assert_parse_error("(", "Read Error: No Closing Paren for (");
        assert_parse_error("(f . 1)", "Read Error: Invalid Token for . (illegal use of \".\")");
    }

    #[test]
    fn test_read_errors_in_head_and_binding_positions() {
        assert_parse_error("((f 1] 2)", "Read Error: Mismatched Parens for (f 1]");
        let dot = "Read Error: Invalid Token for . (illegal use of \".\")";
        for input in [
            "(. 1)",
            "(define . 1)",
            "(define (f .) 1)",
            "(define (. x) 1)",
            "(define-struct . (a))",
            "(define-struct s .)",
            "(define-struct s (a .))",
            "(cond .)",
        ] {
            assert_parse_error(input, dot);
        }
    }

    #[test]
    fn test_errors_keep_their_sexp() {
        match parse_one("(if 1)") {
            TopLevel::Error(error) => {
                assert_eq!(error.found().map(|s| s.to_string()), Some("(if 1)".to_string()))
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_one_form_per_sexp() {
        let forms = parse_str("(define x 1) x (if) (check-expect x 1)");
        assert_eq!(forms.len(), 4);
        assert!(matches!(forms[0], TopLevel::Definition(_)));
        assert!(matches!(forms[1], TopLevel::Expr(_)));
        assert!(matches!(forms[2], TopLevel::Error(_)));
        assert!(matches!(forms[3], TopLevel::Check(_)));
    }
}
