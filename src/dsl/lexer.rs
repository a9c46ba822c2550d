//! Lexer/tokenizer for the filter language.
//!
//! Each production is a winnow sub-scanner run against a copy of the
//! remaining input, so any backtracking stays inside that scanner. Rules are
//! tried in a fixed order: whitespace, date-time, number, operator,
//! identifier, string. Characters no rule accepts collect into one `Error`
//! token per run.

use std::iter::FusedIterator;

use winnow::ascii::digit1;
use winnow::combinator::{alt, cut_err, empty, opt, preceded};
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;
use winnow::token::{one_of, take, take_while};

use super::token::{Token, TokenKind};

// Manually define PResult for resilience against winnow version changes
type PResult<T> = Result<T, ErrMode<ContextError>>;

type Scanner = fn(&mut &str) -> PResult<TokenKind>;

/// Scanners in priority order. A scanner yielding `TokenKind::Error` consumed
/// a malformed lexeme, which joins the pending error run.
const SCANNERS: [Scanner; 6] = [whitespace, date_time, number, operator, identifier, string];

const OPERATOR_CHARS: [char; 17] = [
    '=', '!', '<', '>', 'i', 'n', 'a', 'd', 'o', 'r', '(', ')', '.', '?', ',', ';', '-',
];

const OPERATORS: [&str; 18] = [
    "=", "!=", "<>", ">", "<", ">=", "<=", "in", "!", "and", "or", "(", ")", ".", "?.", ",", ";",
    "-",
];

fn is_digit(c: char) -> bool {
    c.is_ascii_digit()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn digits<'i>(count: usize) -> impl Parser<&'i str, &'i str, ErrMode<ContextError>> {
    take_while(count, is_digit)
}

fn whitespace(input: &mut &str) -> PResult<TokenKind> {
    take_while(1.., char::is_whitespace)
        .value(TokenKind::Whitespace)
        .parse_next(input)
}

/// `YYYY-MM-DD` with an optional `THH:MM:SS[.fff][Z|±HH[:MM]]`.
///
/// Once the `T` is seen every later component is mandatory, so a malformed
/// time rejects the whole lexeme rather than leaving a bare date.
fn date_time(input: &mut &str) -> PResult<TokenKind> {
    (
        digits(4),
        '-',
        digits(2),
        '-',
        digits(2),
        opt(preceded('T', cut_err(time_of_day))),
    )
        .value(TokenKind::DateTime)
        .parse_next(input)
}

fn time_of_day(input: &mut &str) -> PResult<()> {
    (
        hour,
        ':',
        sexagesimal,
        ':',
        sexagesimal,
        opt(preceded('.', cut_err(digits(3)))),
        alt(('Z'.void(), utc_offset, empty)),
    )
        .void()
        .parse_next(input)
}

fn hour(input: &mut &str) -> PResult<()> {
    (one_of('0'..='2'), one_of(is_digit))
        .void()
        .parse_next(input)
}

fn sexagesimal(input: &mut &str) -> PResult<()> {
    (one_of('0'..='5'), one_of(is_digit))
        .void()
        .parse_next(input)
}

fn utc_offset(input: &mut &str) -> PResult<()> {
    (
        one_of(['+', '-']),
        cut_err((hour, opt(preceded(':', cut_err(sexagesimal))))),
    )
        .void()
        .parse_next(input)
}

/// Unsigned decimal numeral. A `.` without following digits is malformed.
fn number(input: &mut &str) -> PResult<TokenKind> {
    (digit1, opt(preceded('.', opt(digit1))))
        .map(|(_, fraction)| match fraction {
            Some(None) => TokenKind::Error,
            _ => TokenKind::Number,
        })
        .parse_next(input)
}

/// Longest entry in `OPERATORS`.
const OPERATOR_MAX_LEN: usize = 3;

fn operator_run<'i>(input: &mut &'i str) -> PResult<&'i str> {
    take_while(1..=OPERATOR_MAX_LEN, OPERATOR_CHARS).parse_next(input)
}

/// Word operators only count when no identifier character follows them.
fn is_operator(candidate: &str, next: Option<char>) -> bool {
    let word_like = candidate.ends_with(|c: char| c.is_ascii_alphabetic());
    OPERATORS.contains(&candidate) && !(word_like && next.is_some_and(is_ident_char))
}

/// Run of at most three operator characters, cut back to its longest valid prefix.
fn operator(input: &mut &str) -> PResult<TokenKind> {
    let mut lookahead = *input;
    let run = operator_run(&mut lookahead)?;
    let len = (1..=run.len())
        .rev()
        .find(|&len| is_operator(&input[..len], input[len..].chars().next()))
        .ok_or(ErrMode::Backtrack(ContextError::default()))?;
    take(len).value(TokenKind::Operator).parse_next(input)
}

fn identifier(input: &mut &str) -> PResult<TokenKind> {
    (one_of(is_ident_start), take_while(0.., is_ident_char))
        .take()
        .map(|word| match word {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier,
        })
        .parse_next(input)
}

fn quote(input: &mut &str) -> PResult<char> {
    one_of(['\'', '"']).parse_next(input)
}

/// Quoted string. Escapes are located but not interpreted here; an
/// unterminated string swallows the rest of the input as malformed.
fn string(input: &mut &str) -> PResult<TokenKind> {
    let delimiter = quote(input)?;
    let rest: &str = *input;
    let mut escaped = false;
    for (idx, c) in rest.char_indices() {
        if c == '\\' {
            escaped = !escaped;
        } else if c == delimiter && !escaped {
            *input = &rest[idx + c.len_utf8()..];
            return Ok(TokenKind::String);
        } else {
            escaped = false;
        }
    }
    *input = &rest[rest.len()..];
    Ok(TokenKind::Error)
}

/// Lazy token stream over a filter source, terminated by `EndOfFile`.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: &'a str,
    rest: &'a str,
    error_start: Option<usize>,
    queued: Option<Token<'a>>,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            rest: source,
            error_start: None,
            queued: None,
            finished: false,
        }
    }

    fn offset(&self) -> usize {
        self.source.len() - self.rest.len()
    }

    fn scan(&mut self) -> Option<(TokenKind, &'a str)> {
        for scanner in SCANNERS {
            let mut input = self.rest;
            if let Ok(kind) = scanner(&mut input) {
                let text = &self.rest[..self.rest.len() - input.len()];
                self.rest = input;
                return Some((kind, text));
            }
        }
        None
    }

    fn skip_char(&mut self) {
        let width = self.rest.chars().next().map_or(0, char::len_utf8);
        self.rest = &self.rest[width..];
    }

    /// Flush a pending error run ahead of `token`.
    fn emit(&mut self, token: Token<'a>) -> Token<'a> {
        match self.error_start.take() {
            Some(start) => {
                self.queued = Some(token);
                Token::new(
                    TokenKind::Error,
                    &self.source[start..token.offset()],
                    start,
                )
            }
            None => token,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if let Some(token) = self.queued.take() {
            return Some(token);
        }
        if self.finished {
            return None;
        }

        loop {
            let start = self.offset();
            if self.rest.is_empty() {
                self.finished = true;
                let eof = Token::new(TokenKind::EndOfFile, "", start);
                return Some(self.emit(eof));
            }

            match self.scan() {
                Some((TokenKind::Error, _)) => {
                    self.error_start.get_or_insert(start);
                }
                Some((kind, text)) => return Some(self.emit(Token::new(kind, text, start))),
                None => {
                    self.error_start.get_or_insert(start);
                    self.skip_char();
                }
            }
        }
    }
}

impl FusedIterator for Tokenizer<'_> {}

/// Tokenize a filter source.
pub fn tokenize(source: &str) -> Tokenizer<'_> {
    Tokenizer::new(source)
}
