use crate::lexer::Token;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    String(String),
    Num(f64),
    Id(String),
    Bool(bool),
}

/// An S-expression as produced by the reader. Read failures are embedded
/// as values so that the rest of the program can still be read.
#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(Atom),
    /// `(...)`, `[...]` and `{...}` all read to the same list.
    List(Vec<SExp>),
    Error(ReadError),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReadErrorKind {
    NoValidSExp,
    NoClosingParen,
    NoOpenParen,
    MismatchedParens,
    InvalidToken,
}

impl fmt::Display for ReadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReadErrorKind::NoValidSExp => "No Valid SExp",
            ReadErrorKind::NoClosingParen => "No Closing Paren",
            ReadErrorKind::NoOpenParen => "No Open Paren",
            ReadErrorKind::MismatchedParens => "Mismatched Parens",
            ReadErrorKind::InvalidToken => "Invalid Token",
        })
    }
}

/// A read failure together with every token it consumed, so the
/// offending source can be replayed verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadError {
    pub kind: ReadErrorKind,
    pub tokens: Vec<Token>,
}

impl ReadError {
    pub fn new(kind: ReadErrorKind, tokens: Vec<Token>) -> Self {
        ReadError { kind, tokens }
    }

    /// The consumed source text, whitespace included.
    pub fn text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bad_token = self.tokens.iter().find_map(|t| t.error());
        match (self.kind, bad_token) {
            (ReadErrorKind::InvalidToken, Some(reason)) => write!(
                f,
                "Read Error: {} for {} ({})",
                self.kind,
                self.text().trim(),
                reason
            ),
            _ => write!(f, "Read Error: {} for {}", self.kind, self.text().trim()),
        }
    }
}

impl std::error::Error for ReadError {}

impl SExp {
    pub fn as_id(&self) -> Option<&str> {
        match self {
            SExp::Atom(Atom::Id(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::String(s) => write!(f, "\"{}\"", s),
            Atom::Num(n) => write!(f, "{}", n),
            Atom::Id(name) => f.write_str(name),
            Atom::Bool(b) => f.write_str(if *b { "#true" } else { "#false" }),
        }
    }
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(atom) => write!(f, "{}", atom),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
            SExp::Error(error) => f.write_str(error.text().trim()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_sexp_display() {
        let sexp = SExp::List(vec![
            SExp::Atom(Atom::Id("f".to_string())),
            SExp::Atom(Atom::Num(-1.5)),
            SExp::List(vec![SExp::Atom(Atom::Bool(false))]),
            SExp::Atom(Atom::String("s".to_string())),
        ]);
        assert_eq!(sexp.to_string(), "(f -1.5 (#false) \"s\")");
    }

    #[test]
    fn test_read_error_replays_tokens() {
        let error = ReadError::new(ReadErrorKind::NoClosingParen, tokenize("(+ 1  2"));
        assert_eq!(error.text(), "(+ 1  2");
        assert_eq!(error.to_string(), "Read Error: No Closing Paren for (+ 1  2");
    }

    #[test]
    fn test_invalid_token_names_reason() {
        let error = ReadError::new(ReadErrorKind::InvalidToken, tokenize("."));
        assert_eq!(
            error.to_string(),
            "Read Error: Invalid Token for . (illegal use of \".\")"
        );
    }
}
