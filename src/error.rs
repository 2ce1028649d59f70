use icu::locid::Locale;
use thiserror::Error;

use crate::types::NodeKind;

/// A template that could not be parsed. `offset` is a byte offset into the
/// template where the problem was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The template is malformed.
    Structural,
    /// The template is well formed but uses syntax this crate does not support.
    Unsupported,
    /// A recognised construct carries an invalid argument.
    InvalidFormat,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unbalanced braces")]
    UnbalancedBraces,
    #[error("unterminated placeholder")]
    UnterminatedPlaceholder,
    #[error("expected an argument name")]
    MissingArgumentName,
    #[error("unknown argument type `{0}`")]
    UnknownArgumentType(String),
    #[error("expected at least one case")]
    ExpectedCases,
    #[error("expected `{{` to open the case body")]
    ExpectedCaseBody,
    #[error("missing `other` case")]
    MissingOtherCase,
    #[error("duplicate case `{0}`")]
    DuplicateCase(String),
    #[error("invalid plural case key `{0}`")]
    InvalidPluralKey(String),
    #[error("malformed offset clause")]
    InvalidOffset,
    #[error("invalid date/time width `{0}`")]
    InvalidDateFormat(String),
    #[error("number format not implemented: `{0}`")]
    NumberFormatNotImplemented(String),
    #[error("sub-messages nested deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("unexpected input ({0:?})")]
    Syntax(nom::error::ErrorKind),
}

impl ParseErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ParseErrorKind::NumberFormatNotImplemented(_) => ErrorCategory::Unsupported,
            ParseErrorKind::InvalidDateFormat(_) => ErrorCategory::InvalidFormat,
            _ => ErrorCategory::Structural,
        }
    }
}

/// Why rendering a parsed message failed.
///
/// A parameter that is absent is reported as [`FormatError::MissingParameter`],
/// one of the wrong type as [`FormatError::InvalidArgType`]. Callers that only
/// care whether the arguments were at fault should ask
/// [`FormatError::is_invalid_argument`]:
///
/// ```
/// use platformed_messageformat::{format, params, MessageFormatError};
///
/// match format("Welcome back, {user}", params!("name" => "Ana")) {
///     Err(MessageFormatError::Format(err)) => assert!(err.is_invalid_argument()),
///     other => panic!("expected a format error, got {other:?}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    #[error("argument `{name}` must be a {expected}, got {found}")]
    InvalidArgType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{kind} node carries a {found}")]
    InvalidExprType { kind: NodeKind, found: &'static str },
    #[error("no plural function configured")]
    UndefinedPluralFunction,
}

impl FormatError {
    /// True when the parameters passed to the render were at fault, either
    /// missing or of the wrong type.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            FormatError::MissingParameter(_) | FormatError::InvalidArgType { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no plural rules available for locale `{0}`")]
    PluralRulesUnavailable(Locale),
    #[error("no number formatting data for locale `{0}`")]
    NumberFormatUnavailable(Locale),
}

#[derive(Debug, Error)]
pub enum MessageFormatError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("Format error: {0}")]
    Format(#[from] FormatError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
