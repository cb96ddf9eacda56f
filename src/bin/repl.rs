use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use bsl::ast::{KEYWORDS, TopLevel};
use bsl::environment::Environment;
use bsl::lexer::{Bracket, Token, TokenErrorKind, TokenKind};
use bsl::{Diagnostic, evaluate_source, parse, read, tokenize};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Cmd, Completer, Context, Editor, EventHandler, KeyCode, KeyEvent, Modifiers};
use rustyline::{Helper, Highlighter, Hinter, Validator};
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = "bsl_history.txt";

/// Names visible to the session: built-ins plus everything defined so far.
type Names = Rc<RefCell<BTreeSet<String>>>;

struct BslCompleter {
    names: Names,
}

impl rustyline::completion::Completer for BslCompleter {
    type Candidate = String;
    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        let tokens = tokenize(&line[..pos]);
        let Some(prefix) = tokens.last().filter(|t| t.kind == TokenKind::Identifier) else {
            return Ok((pos, vec![]));
        };
        let names = self.names.borrow();
        let mut candidates: Vec<String> = names
            .iter()
            .map(String::as_str)
            .chain(KEYWORDS.iter().copied())
            .filter(|name| name.starts_with(prefix.text.as_str()))
            .map(str::to_string)
            .collect();
        candidates.sort();
        candidates.dedup();
        Ok((prefix.span.start, candidates))
    }
}

#[derive(Completer, Helper, Highlighter, Hinter, Validator)]
struct InputValidator {
    #[rustyline(Validator)]
    validator: BslValidator,
    #[rustyline(Highlighter)]
    highlighter: BslHighlighter,
    #[rustyline(Completer)]
    completer: BslCompleter,
}

struct BslValidator;

impl Validator for BslValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let mut stack: Vec<Bracket> = Vec::new();
        for token in tokenize(ctx.input()) {
            match token.kind {
                TokenKind::Open(bracket) => stack.push(bracket),
                TokenKind::Close(bracket) => match stack.pop() {
                    Some(open) if open == bracket => {}
                    Some(open) => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - '{}' closes '{}' at position {}",
                            bracket.close(),
                            open.open(),
                            token.span.start
                        ))));
                    }
                    None => {
                        return Ok(ValidationResult::Invalid(Some(format!(
                            "  - Unmatched '{}' at position {}",
                            bracket.close(),
                            token.span.start
                        ))));
                    }
                },
                // A lone quote is a string still being typed.
                TokenKind::Error(TokenErrorKind::Unrecognized) if token.text == "\"" => {
                    return Ok(ValidationResult::Incomplete);
                }
                _ => {}
            }
        }
        if stack.is_empty() {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

struct BslHighlighter;

const GREEN: &str = "32";
const CYAN: &str = "36";
const MAGENTA: &str = "35";
const RED: &str = "31";
const BOLD_RED: &str = "1;31";
const BLUE: &str = "34";
const BOLD_BLUE: &str = "1;34";

fn token_color(token: &Token) -> Option<&'static str> {
    match token.kind {
        TokenKind::String => Some(GREEN),
        TokenKind::Number | TokenKind::Boolean => Some(CYAN),
        TokenKind::Identifier if KEYWORDS.contains(&token.text.as_str()) => Some(MAGENTA),
        TokenKind::Error(_) => Some(RED),
        _ => None,
    }
}

impl Highlighter for BslHighlighter {
    fn highlight<'l>(&self, line: &'l str, pos: usize) -> Cow<'l, str> {
        let tokens = tokenize(line);
        let mut colors: Vec<Option<&str>> = tokens.iter().map(token_color).collect();
        let mut stack: Vec<(Bracket, usize)> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::Open(bracket) => stack.push((bracket, i)),
                TokenKind::Close(bracket) => match stack.pop() {
                    Some((opening, j)) if opening == bracket => {
                        // Only the pair the cursor sits just after.
                        if tokens[i].span.end == pos || tokens[j].span.end == pos {
                            colors[i] = Some(BLUE);
                            colors[j] = Some(BOLD_BLUE);
                        }
                    }
                    Some((_, j)) => {
                        colors[i] = Some(RED);
                        colors[j] = Some(BOLD_RED);
                    }
                    None => colors[i] = Some(RED),
                },
                _ => {}
            }
        }

        let mut highlighted = String::with_capacity(line.len());
        for (token, color) in tokens.iter().zip(colors) {
            match color {
                Some(code) => highlighted.push_str(&format!("\x1b[{}m{}\x1b[0m", code, token.text)),
                None => highlighted.push_str(&token.text),
            }
        }
        Cow::Owned(highlighted)
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

/// Names bound by the definitions in `source`.
fn defined_names(source: &str) -> Vec<String> {
    parse(&read(&tokenize(source)))
        .iter()
        .filter_map(|form| match form {
            TopLevel::Definition(definition) => Some(definition.bound_names()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn main() -> rustyline::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    println!("BSL REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' or press Ctrl-D to quit.");

    let names: Names = Rc::new(RefCell::new(
        Environment::new_global_populated().borrow().get_identifiers(),
    ));
    let h = InputValidator {
        highlighter: BslHighlighter,
        validator: BslValidator,
        completer: BslCompleter {
            names: names.clone(),
        },
    };
    let config = rustyline::config::Config::builder()
        .edit_mode(rustyline::EditMode::Vi)
        .build();
    let mut rl = Editor::with_config(config)?;
    rl.set_helper(Some(h));
    rl.bind_sequence(
        KeyEvent(KeyCode::Char('s'), Modifiers::CTRL),
        EventHandler::Simple(Cmd::Newline),
    );
    if rl.load_history(HISTORY_FILE).is_err() {
        println!("No previous history.");
    }

    // The session is one growing program. Each entry re-runs it so later
    // definitions are visible to earlier functions, and only the results of
    // the new forms are shown.
    let mut program = String::new();
    let mut shown = 0;

    loop {
        let readline = rl.readline("bsl> ");
        match readline {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let trimmed_input = line.trim();
                if trimmed_input.is_empty() {
                    continue;
                }
                if trimmed_input.eq_ignore_ascii_case("exit") {
                    break;
                }

                program.push_str(&line);
                program.push('\n');
                let outcomes = evaluate_source(&program);
                for outcome in outcomes.iter().skip(shown) {
                    let reported = Diagnostic::from_outcome(outcome)
                        .map(|diagnostic| diagnostic.report("REPL", &program).is_ok());
                    if reported != Some(true) {
                        println!("{}", outcome.result);
                    }
                }
                shown = outcomes.len();
                names.borrow_mut().extend(defined_names(&line));
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl-C
                println!("Interrupted. Type 'exit' or Ctrl-D to quit.");
            }
            Err(ReadlineError::Eof) => {
                // Ctrl-D
                println!("\nExiting.");
                break;
            }
            Err(err) => {
                eprintln!("Readline Error: {:?}", err);
                break;
            }
        }
    }
    rl.save_history(HISTORY_FILE)
}
