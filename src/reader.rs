use crate::Span;
use crate::lexer::{Bracket, Token, TokenKind};
use crate::types::{Atom, ReadError, ReadErrorKind, SExp};

fn skip_whitespace(tokens: &[Token]) -> &[Token] {
    let start = tokens
        .iter()
        .position(|t| !t.is_whitespace())
        .unwrap_or(tokens.len());
    &tokens[start..]
}

fn error(kind: ReadErrorKind, tokens: &[Token]) -> SExp {
    SExp::Error(ReadError::new(kind, tokens.to_vec()))
}

fn read_atom(token: &Token) -> SExp {
    let atom = match token.kind {
        // A literal too large for an f64 has no surface syntax to print back as.
        TokenKind::Number => match token.text.parse::<f64>() {
            Ok(n) if n.is_finite() => Atom::Num(n),
            _ => return error(ReadErrorKind::InvalidToken, std::slice::from_ref(token)),
        },
        TokenKind::String => Atom::String(token.text[1..token.text.len() - 1].to_string()),
        TokenKind::Boolean => Atom::Bool(matches!(token.text.as_str(), "#true" | "#t")),
        _ => Atom::Id(token.text.clone()),
    };
    SExp::Atom(atom)
}

/// Reads one S-expression from the front of `tokens`, returning it with the
/// tokens left over.
///
/// Recovery policy: a stray closing bracket or a bad token consumes only
/// itself, a wrongly-closed group ends at the bad closer, and only an
/// unterminated group swallows the rest of the input.
pub fn read_one(tokens: &[Token]) -> (SExp, &[Token]) {
    let tokens = skip_whitespace(tokens);
    let Some((first, rest)) = tokens.split_first() else {
        return (error(ReadErrorKind::NoValidSExp, tokens), tokens);
    };
    match first.kind {
        TokenKind::Open(bracket) => read_list(bracket, tokens),
        TokenKind::Close(_) => (error(ReadErrorKind::NoOpenParen, &tokens[..1]), rest),
        TokenKind::Error(_) => (error(ReadErrorKind::InvalidToken, &tokens[..1]), rest),
        TokenKind::Whitespace => unreachable!("whitespace was skipped"),
        TokenKind::Number | TokenKind::String | TokenKind::Identifier | TokenKind::Boolean => {
            (read_atom(first), rest)
        }
    }
}

/// `tokens` starts with the opening bracket.
fn read_list(open: Bracket, tokens: &[Token]) -> (SExp, &[Token]) {
    let mut items = Vec::new();
    let mut remaining = &tokens[1..];
    loop {
        remaining = skip_whitespace(remaining);
        let consumed = tokens.len() - remaining.len();
        match remaining.first().map(|t| &t.kind) {
            None => return (error(ReadErrorKind::NoClosingParen, tokens), remaining),
            Some(TokenKind::Close(close)) if *close == open => {
                return (SExp::List(items), &remaining[1..]);
            }
            Some(TokenKind::Close(_)) => {
                return (
                    error(ReadErrorKind::MismatchedParens, &tokens[..consumed + 1]),
                    &remaining[1..],
                );
            }
            Some(_) => {
                let (item, rest) = read_one(remaining);
                if let SExp::Error(ReadError {
                    kind: ReadErrorKind::NoClosingParen,
                    ..
                }) = item
                {
                    // An unterminated inner group leaves this one unterminated too.
                    return (error(ReadErrorKind::NoClosingParen, tokens), rest);
                }
                items.push(item);
                remaining = rest;
            }
        }
    }
}

/// Reads every S-expression in `tokens`, pairing each with the span from its
/// first to its last non-whitespace token.
pub fn read_spanned(tokens: &[Token]) -> Vec<(SExp, Span)> {
    let mut sexps = Vec::new();
    let mut remaining = skip_whitespace(tokens);
    while !remaining.is_empty() {
        let (sexp, rest) = read_one(remaining);
        let consumed = &remaining[..remaining.len() - rest.len()];
        let span = consumed
            .iter()
            .filter(|t| !t.is_whitespace())
            .map(|t| t.span)
            .reduce(Span::merge)
            .unwrap_or_default();
        sexps.push((sexp, span));
        remaining = skip_whitespace(rest);
    }
    tracing::debug!(sexps = sexps.len(), "read");
    sexps
}

/// Reads as many S-expressions as the tokens contain.
pub fn read(tokens: &[Token]) -> Vec<SExp> {
    read_spanned(tokens)
        .into_iter()
        .map(|(sexp, _)| sexp)
        .collect()
}
