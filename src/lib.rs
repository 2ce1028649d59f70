//! ICU-style message formatting.
//!
//! A template such as `"{count, plural, one{# item} other{# items}}"` is
//! parsed once with [`parse`] into an immutable [`ParseTree`] and then
//! rendered any number of times with a [`Formatter`]:
//!
//! ```
//! use icu::locid::locale;
//! use platformed_messageformat::{params, parse, Formatter, MessageFormatError};
//!
//! fn main() -> Result<(), MessageFormatError> {
//!     let tree = parse("Hello {name}!")?;
//!     let formatter = Formatter::new(locale!("en"))?;
//!     let text = formatter.format_map(&tree, params!("name" => "World"))?;
//!     assert_eq!(text, "Hello World!");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod formatter;
pub mod literal;
pub mod locale;
pub mod parser;
pub mod types;

pub use error::{ConfigError, ErrorCategory, FormatError, MessageFormatError, ParseError, ParseErrorKind};
pub use formatter::{Formatter, FormatterBuilder};
pub use locale::{DateTimeFormatter, DateTimeStyle, NumberPrinter, PluralFunction};
pub use parser::{parse, MAX_NESTING_DEPTH};
pub use types::{
    Expression, Node, NodeKind, ParameterValue, Parameters, ParseTree, PluralCategory, PluralKey,
};
pub use fixed_decimal::FixedDecimal;
pub use icu::locid::Locale;

/// Parses `message_str` and renders it with an English formatter.
pub fn format(message_str: &str, parameters: Parameters<'_>) -> Result<String, MessageFormatError> {
    let message = parse(message_str)?;
    let formatter = Formatter::builder().build()?;
    let result = formatter.format_map(&message, parameters)?;
    Ok(result)
}
