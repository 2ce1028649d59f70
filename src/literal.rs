//! Scanning of the plain-text runs between placeholders.

use nom::error::{ErrorKind, ParseError};
use nom::IResult;

use crate::types::{LiteralExpr, LiteralPart};

pub const OPEN_CHAR: char = '{';
pub const CLOSE_CHAR: char = '}';
pub const POUND_CHAR: char = '#';
pub const ESCAPE_CHAR: char = '\\';

/// Consumes text up to the next unescaped `{` or `}`.
///
/// An escape character makes the next `{`, `}`, `#` or escape character
/// literal; before any other character it is kept as written. Unescaped `#`
/// becomes a [`LiteralPart::Pound`] marker. Fails without consuming when the
/// input starts at a brace or is empty.
pub fn literal<'a, E: ParseError<&'a str>>(input: &'a str) -> IResult<&'a str, LiteralExpr, E> {
    let mut parts = Vec::new();
    let mut text = String::new();
    let mut escaped = false;
    let mut end = input.len();

    for (idx, c) in input.char_indices() {
        if escaped {
            if !matches!(c, OPEN_CHAR | CLOSE_CHAR | POUND_CHAR | ESCAPE_CHAR) {
                text.push(ESCAPE_CHAR);
            }
            text.push(c);
            escaped = false;
            continue;
        }

        match c {
            ESCAPE_CHAR => escaped = true,
            OPEN_CHAR | CLOSE_CHAR => {
                end = idx;
                break;
            }
            POUND_CHAR => {
                if !text.is_empty() {
                    parts.push(LiteralPart::Text(std::mem::take(&mut text)));
                }
                parts.push(LiteralPart::Pound);
            }
            _ => text.push(c),
        }
    }

    // dangling escape at the end of input
    if escaped {
        text.push(ESCAPE_CHAR);
    }
    if !text.is_empty() {
        parts.push(LiteralPart::Text(text));
    }

    if end == 0 {
        return Err(nom::Err::Error(E::from_error_kind(input, ErrorKind::TakeWhile1)));
    }

    Ok((&input[end..], LiteralExpr { parts }))
}
