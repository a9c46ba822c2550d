//! Literal decoding and literal-to-member coercion.

use rust_decimal::Decimal;
use std::str::FromStr;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use super::ast::Literal;
use super::lexer::tokenize;
use super::token::TokenKind;
use crate::registry::{StaticType, ValueType};

pub(crate) fn decode_number(text: &str) -> Result<Decimal, String> {
    Decimal::from_str(text).map_err(|err| format!("Invalid number '{}': {}", text, err))
}

/// Decode a quoted string token, interpreting escapes.
///
/// `\n \r \b \t \v \\` and an escaped delimiter are recognised; any other
/// escaped character is kept together with its backslash.
pub(crate) fn decode_string(raw: &str) -> String {
    let mut chars = raw.chars();
    let delimiter = chars.next().unwrap_or('\'');
    chars.next_back();

    let mut result = String::with_capacity(raw.len().saturating_sub(2));
    let mut escaped = false;
    for c in chars {
        if !escaped {
            if c == '\\' {
                escaped = true;
            } else {
                result.push(c);
            }
            continue;
        }

        escaped = false;
        match c {
            '\\' => result.push('\\'),
            'n' => result.push('\n'),
            'r' => result.push('\r'),
            'b' => result.push('\u{8}'),
            't' => result.push('\t'),
            'v' => result.push('\u{b}'),
            c if c == delimiter => result.push(c),
            c => {
                result.push('\\');
                result.push(c);
            }
        }
    }
    result
}

fn component<T: FromStr>(text: &str, from: usize, to: usize) -> Result<T, String> {
    text.get(from..to)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| format!("Malformed timestamp '{}'", text))
}

/// Decode a lexed date-time. A missing zone means UTC.
pub(crate) fn decode_timestamp(text: &str) -> Result<OffsetDateTime, String> {
    let invalid = |err: time::error::ComponentRange| format!("Invalid timestamp '{}': {}", text, err);

    let year: i32 = component(text, 0, 4)?;
    let month: u8 = component(text, 5, 7)?;
    let day: u8 = component(text, 8, 10)?;
    let date = Date::from_calendar_date(year, Month::try_from(month).map_err(invalid)?, day)
        .map_err(invalid)?;

    let Some(clock) = text.get(11..) else {
        return Ok(date.midnight().assume_utc());
    };

    let hour: u8 = component(clock, 0, 2)?;
    let minute: u8 = component(clock, 3, 5)?;
    let second: u8 = component(clock, 6, 8)?;
    let mut zone = clock.get(8..).unwrap_or_default();
    let mut millis = 0u16;
    if let Some(fraction) = zone.strip_prefix('.') {
        millis = component(fraction, 0, 3)?;
        zone = fraction.get(3..).unwrap_or_default();
    }

    let offset = match zone.as_bytes().first() {
        None | Some(b'Z') => UtcOffset::UTC,
        Some(&sign @ (b'+' | b'-')) => {
            let hours: i8 = component(zone, 1, 3)?;
            let minutes: i8 = if zone.len() > 3 {
                component(zone, 4, 6)?
            } else {
                0
            };
            let (hours, minutes) = if sign == b'-' {
                (-hours, -minutes)
            } else {
                (hours, minutes)
            };
            UtcOffset::from_hms(hours, minutes, 0).map_err(invalid)?
        }
        Some(_) => return Err(format!("Malformed timestamp '{}'", text)),
    };

    let time = Time::from_hms_milli(hour, minute, second, millis).map_err(invalid)?;
    Ok(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

/// Parse a string that is, in its entirety, a timestamp literal.
fn timestamp_from_str(text: &str) -> Option<OffsetDateTime> {
    let mut tokens = tokenize(text);
    let token = tokens.next()?;
    let end = tokens.next()?;
    if token.kind() != TokenKind::DateTime || end.kind() != TokenKind::EndOfFile {
        return None;
    }
    decode_timestamp(token.text()).ok()
}

/// Convert a literal to the static type of the operand it is compared with.
pub(crate) fn coerce(literal: Literal, target: StaticType) -> Result<Literal, String> {
    match (literal, target.value) {
        (literal, ValueType::Null) => Ok(literal),
        (Literal::Null(_), _) if target.accepts_null() => Ok(Literal::Null(target)),
        (Literal::Null(_), _) => Err(format!("Cannot compare non-nullable {} with null", target)),

        (literal @ Literal::Bool(_), ValueType::Bool)
        | (literal @ Literal::Number(_), ValueType::Number)
        | (literal @ Literal::String(_), ValueType::String)
        | (literal @ Literal::Timestamp(_), ValueType::Timestamp) => Ok(literal),

        (Literal::String(text), ValueType::Number) => Decimal::from_str(text.trim())
            .map(Literal::Number)
            .map_err(|_| format!("Cannot convert '{}' to Number", text)),
        (Literal::String(text), ValueType::Bool) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Literal::Bool(true)),
            "false" => Ok(Literal::Bool(false)),
            _ => Err(format!("Cannot convert '{}' to Bool", text)),
        },
        (Literal::String(text), ValueType::Timestamp) => timestamp_from_str(text.trim())
            .map(Literal::Timestamp)
            .ok_or_else(|| format!("Cannot convert '{}' to Timestamp", text)),

        (literal, _) => Err(format!(
            "Cannot convert {} literal to {}",
            literal.static_type(),
            target
        )),
    }
}
