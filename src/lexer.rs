use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

/// The raw categories recognised at the front of the remaining input once
/// no number matches there. They start with disjoint characters, so at
/// most one of them applies. Booleans are identifiers until the veto.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Lexeme {
    #[token("(")]
    OpenParen,
    #[token("[")]
    OpenSquare,
    #[token("{")]
    OpenCurly,
    #[token(")")]
    CloseParen,
    #[token("]")]
    CloseSquare,
    #[token("}")]
    CloseCurly,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r#"[^\s"'`,;|()\[\]{}]+"#)]
    Identifier,
    #[regex(r"\s+")]
    #[regex(r";[^\n]*")]
    Whitespace,
}

/// Tried before everything else: a number at the front of the input wins
/// even when an identifier would match more of it, so `1-2` is two numbers.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Numeral {
    #[regex(r"-?[0-9]+(\.[0-9]+)?")]
    Number,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Bracket {
    Paren,
    Square,
    Curly,
}

impl Bracket {
    pub fn open(self) -> char {
        match self {
            Bracket::Paren => '(',
            Bracket::Square => '[',
            Bracket::Curly => '{',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Paren => ')',
            Bracket::Square => ']',
            Bracket::Curly => '}',
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum TokenErrorKind {
    #[error("unrecognized character")]
    Unrecognized,
    #[error("illegal use of \".\"")]
    IllegalDot,
    #[error("bad syntax")]
    BadHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Open(Bracket),
    Close(Bracket),
    Number,
    String,
    Identifier,
    Boolean,
    /// Blank space and `;` comments.
    Whitespace,
    Error(TokenErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source slice this token was matched from.
    pub text: String,
    pub span: Span,
}

impl Token {
    pub fn is_whitespace(&self) -> bool {
        self.kind == TokenKind::Whitespace
    }

    pub fn error(&self) -> Option<TokenErrorKind> {
        match self.kind {
            TokenKind::Error(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Error(kind) => write!(f, "{}: {}", self.text, kind),
            _ => f.write_str(&self.text),
        }
    }
}

impl From<Lexeme> for TokenKind {
    fn from(lexeme: Lexeme) -> Self {
        match lexeme {
            Lexeme::OpenParen => TokenKind::Open(Bracket::Paren),
            Lexeme::OpenSquare => TokenKind::Open(Bracket::Square),
            Lexeme::OpenCurly => TokenKind::Open(Bracket::Curly),
            Lexeme::CloseParen => TokenKind::Close(Bracket::Paren),
            Lexeme::CloseSquare => TokenKind::Close(Bracket::Square),
            Lexeme::CloseCurly => TokenKind::Close(Bracket::Curly),
            Lexeme::String => TokenKind::String,
            Lexeme::Identifier => TokenKind::Identifier,
            Lexeme::Whitespace => TokenKind::Whitespace,
        }
    }
}

/// Identifiers that are lexically fine but not allowed as names. A `#`
/// identifier is only accepted when the whole of it is a boolean literal.
fn veto_identifier(text: &str) -> TokenKind {
    match text {
        "." => TokenKind::Error(TokenErrorKind::IllegalDot),
        "#true" | "#false" | "#t" | "#f" => TokenKind::Boolean,
        _ if text.starts_with('#') => TokenKind::Error(TokenErrorKind::BadHash),
        _ => TokenKind::Identifier,
    }
}

fn number_prefix(rest: &str) -> Option<usize> {
    let mut numeral = Numeral::lexer(rest);
    match numeral.next() {
        Some(Ok(Numeral::Number)) => Some(numeral.span().end),
        _ => None,
    }
}

/// Matches a single token at the front of `rest`, which starts at byte `offset`.
fn next_token(rest: &str, offset: usize) -> Option<Token> {
    let first = rest.chars().next()?;
    if let Some(len) = number_prefix(rest) {
        return Some(Token {
            kind: TokenKind::Number,
            text: rest[..len].to_string(),
            span: Span::new(offset, offset + len),
        });
    }
    let mut lexer = Lexeme::lexer(rest);
    let (kind, len) = match lexer.next() {
        Some(Ok(lexeme)) if lexer.span().end > 0 => {
            let len = lexer.span().end;
            let kind = match lexeme {
                Lexeme::Identifier => veto_identifier(&rest[..len]),
                other => other.into(),
            };
            (kind, len)
        }
        _ => (
            TokenKind::Error(TokenErrorKind::Unrecognized),
            first.len_utf8(),
        ),
    };
    Some(Token {
        kind,
        text: rest[..len].to_string(),
        span: Span::new(offset, offset + len),
    })
}

/// Splits `input` into tokens. Never fails: unrecognised input becomes
/// error tokens, so the token texts always concatenate back to `input`.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while let Some(token) = next_token(&input[pos..], pos) {
        pos = token.span.end;
        tokens.push(token);
    }
    tracing::debug!(tokens = tokens.len(), bytes = input.len(), "tokenized");
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    // Kinds and texts of the non-whitespace tokens.
    fn significant(input: &str) -> Vec<(TokenKind, String)> {
        tokenize(input)
            .into_iter()
            .filter(|t| !t.is_whitespace())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn assert_tokens(input: &str, expected: Vec<(TokenKind, &str)>) {
        let expected: Vec<(TokenKind, String)> = expected
            .into_iter()
            .map(|(kind, text)| (kind, text.to_string()))
            .collect();
        assert_eq!(significant(input), expected, "Input: '{}'", input);
    }

    fn ident(text: &str) -> (TokenKind, &str) {
        (TokenKind::Identifier, text)
    }

    fn number(text: &str) -> (TokenKind, &str) {
        (TokenKind::Number, text)
    }

    #[test]
    fn test_empty_input() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_brackets() {
        assert_tokens(
            "([{}])",
            vec![
                (TokenKind::Open(Bracket::Paren), "("),
                (TokenKind::Open(Bracket::Square), "["),
                (TokenKind::Open(Bracket::Curly), "{"),
                (TokenKind::Close(Bracket::Curly), "}"),
                (TokenKind::Close(Bracket::Square), "]"),
                (TokenKind::Close(Bracket::Paren), ")"),
            ],
        );
    }

    #[test]
    fn test_numbers() {
        assert_tokens("123", vec![number("123")]);
        assert_tokens("-45", vec![number("-45")]);
        assert_tokens("6.78", vec![number("6.78")]);
        assert_tokens("-0.9", vec![number("-0.9")]);
    }

    #[test]
    fn test_numbers_win_over_identifiers() {
        assert_tokens("1-2", vec![number("1"), number("-2")]);
        assert_tokens("1.2.3", vec![number("1.2"), ident(".3")]);
        assert_tokens("3abc", vec![number("3"), ident("abc")]);
        assert_tokens(
            "1.",
            vec![number("1"), (TokenKind::Error(TokenErrorKind::IllegalDot), ".")],
        );
    }

    #[test]
    fn test_number_like_identifiers() {
        assert_tokens("-", vec![ident("-")]);
        assert_tokens("--5", vec![ident("--5")]);
        assert_tokens("x-1", vec![ident("x-1")]);
        assert_tokens("-x", vec![ident("-x")]);
        assert_tokens("...", vec![ident("...")]);
    }

    #[test]
    fn test_booleans() {
        for text in ["#true", "#false", "#t", "#f"] {
            assert_tokens(text, vec![(TokenKind::Boolean, text)]);
        }
    }

    #[test]
    fn test_strings_have_no_escapes() {
        assert_tokens(r#""hello""#, vec![(TokenKind::String, r#""hello""#)]);
        assert_tokens(r#""a\n""#, vec![(TokenKind::String, r#""a\n""#)]);
        assert_tokens(
            r#""with space" x"#,
            vec![(TokenKind::String, r#""with space""#), ident("x")],
        );
    }

    #[test]
    fn test_comments_are_whitespace() {
        let tokens = tokenize("x ; note\ny");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::Whitespace,
                TokenKind::Whitespace,
                TokenKind::Identifier,
            ]
        );
        assert_eq!(tokens[2].text, "; note");
    }

    #[test]
    fn test_sequence() {
        assert_tokens(
            "(define (f x) [+ x 1])",
            vec![
                (TokenKind::Open(Bracket::Paren), "("),
                ident("define"),
                (TokenKind::Open(Bracket::Paren), "("),
                ident("f"),
                ident("x"),
                (TokenKind::Close(Bracket::Paren), ")"),
                (TokenKind::Open(Bracket::Square), "["),
                ident("+"),
                ident("x"),
                number("1"),
                (TokenKind::Close(Bracket::Square), "]"),
                (TokenKind::Close(Bracket::Paren), ")"),
            ],
        );
    }

    #[test]
    fn test_dot_is_vetoed() {
        assert_tokens(
            ".",
            vec![(TokenKind::Error(TokenErrorKind::IllegalDot), ".")],
        );
        assert_tokens("a.b", vec![ident("a.b")]);
    }

    #[test]
    fn test_hash_prefix_is_vetoed() {
        assert_tokens(
            "#foo",
            vec![(TokenKind::Error(TokenErrorKind::BadHash), "#foo")],
        );
        assert_tokens(
            "#true1",
            vec![(TokenKind::Error(TokenErrorKind::BadHash), "#true1")],
        );
    }

    #[test]
    fn test_unrecognized_characters_are_single() {
        assert_tokens(
            "'x",
            vec![(TokenKind::Error(TokenErrorKind::Unrecognized), "'"), ident("x")],
        );
        assert_tokens(
            "\"open",
            vec![
                (TokenKind::Error(TokenErrorKind::Unrecognized), "\""),
                ident("open"),
            ],
        );
    }

    #[test]
    fn test_texts_reassemble_source() {
        let input = "(define (f x)\n  ; comment\n  (* x 2.5)) '| #bad . \"s\"";
        let joined: String = tokenize(input).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(joined, input);
    }

    #[test]
    fn test_tokenize_spans() {
        let tokens = tokenize("(+ 1)");
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].span, Span::new(0, 1));
        assert_eq!(tokens[1].span, Span::new(1, 2));
        assert_eq!(tokens[2].kind, TokenKind::Whitespace);
        assert_eq!(tokens[3].span, Span::new(3, 4));
        assert_eq!(tokens[4].span, Span::new(4, 5));
    }

    #[test]
    fn test_multibyte_identifier_spans() {
        let tokens = tokenize("λ☕ x");
        assert_eq!(tokens[0].text, "λ☕");
        assert_eq!(tokens[0].span, Span::new(0, "λ☕".len()));
    }
}
