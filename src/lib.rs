//! An interpreter for a beginner teaching dialect of Scheme: tokenize,
//! read, parse, evaluate and print, where every mistake in the student's
//! program becomes a line of output instead of a failure.

pub mod ast;
pub mod environment;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod pretty_print;
pub mod primitives;
pub mod printer;
pub mod reader;
pub mod source;
pub mod types;
pub mod value;

pub use evaluator::{FormResult, evaluate};
pub use lexer::{Token, tokenize};
pub use parser::parse;
pub use pretty_print::Diagnostic;
pub use printer::print;
pub use reader::read;
pub use source::Span;
pub use types::SExp;
pub use value::{Value, ValueError};

/// The result of one top-level form together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub span: Span,
    pub result: FormResult,
}

/// Runs the whole pipeline, keeping each form's source span.
pub fn evaluate_source(source: &str) -> Vec<Outcome> {
    let tokens = tokenize(source);
    let (sexps, spans): (Vec<SExp>, Vec<Span>) = reader::read_spanned(&tokens).into_iter().unzip();
    let results = evaluate(&parse(&sexps));
    spans
        .into_iter()
        .zip(results)
        .map(|(span, result)| Outcome { span, result })
        .collect()
}

/// Runs a program and returns its output, one line per top-level form.
/// Never fails.
pub fn evaluate_and_print(source: &str) -> String {
    let results: Vec<FormResult> = evaluate_source(source)
        .into_iter()
        .map(|outcome| outcome.result)
        .collect();
    print(&results)
}

/// The failing forms of a program.
pub fn diagnose(source: &str) -> Vec<Diagnostic> {
    evaluate_source(source)
        .iter()
        .filter_map(Diagnostic::from_outcome)
        .collect()
}
