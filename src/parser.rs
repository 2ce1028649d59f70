use std::cell::Cell;
use std::ops::Range;

use nom::{
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize},
    error::{ErrorKind, ParseError as NomParseError},
    multi::many0,
    sequence::{pair, preceded},
    IResult, Offset,
};

use crate::error::{ParseError, ParseErrorKind};
use crate::literal::{literal, CLOSE_CHAR, ESCAPE_CHAR, OPEN_CHAR, POUND_CHAR};
use crate::types::{
    DateTimeExpr, DateTimeKind, DateTimeWidth, Expression, Node, NodeKind, NumberExpr, ParseTree,
    PluralCase, PluralCategory, PluralExpr, PluralKey, SelectCase, SelectExpr, VarExpr,
};

/// nom error carrying the typed failure reason and where it happened.
#[derive(Debug, PartialEq)]
struct SyntaxError<'a> {
    input: &'a str,
    kind: ParseErrorKind,
}

impl<'a> NomParseError<&'a str> for SyntaxError<'a> {
    fn from_error_kind(input: &'a str, kind: ErrorKind) -> Self {
        Self { input, kind: ParseErrorKind::Syntax(kind) }
    }

    fn append(_: &'a str, _: ErrorKind, other: Self) -> Self {
        other
    }
}

type PResult<'a, O> = IResult<&'a str, O, SyntaxError<'a>>;

fn failure<'a, O>(input: &'a str, kind: ParseErrorKind) -> PResult<'a, O> {
    Err(nom::Err::Failure(SyntaxError { input, kind }))
}

/// Like `cut`, but reports `kind` instead of whatever the inner parser said.
/// Running out of input is always an unterminated placeholder.
fn expect<'a, O, F>(mut parser: F, kind: ParseErrorKind) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    move |input: &'a str| match parser(input) {
        Err(nom::Err::Error(_)) if input.is_empty() => {
            failure(input, ParseErrorKind::UnterminatedPlaceholder)
        }
        Err(nom::Err::Error(_)) => failure(input, kind.clone()),
        other => other,
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, OPEN_CHAR | CLOSE_CHAR | POUND_CHAR | ESCAPE_CHAR | ',')
}

/// Argument names, type keywords and case keys.
fn word(input: &str) -> PResult<'_, &str> {
    take_while1(is_word_char)(input)
}

fn offset_clause(input: &str) -> PResult<'_, i64> {
    let (i, _) = tag("offset:")(input)?;
    let (i, _) = multispace0(i)?;
    let (rest, digits) = expect(recognize(pair(opt(char('-')), digit1)), ParseErrorKind::InvalidOffset)(i)?;
    match digits.parse::<i64>() {
        Ok(offset) => Ok((rest, offset)),
        Err(_) => failure(i, ParseErrorKind::InvalidOffset),
    }
}

/// Deepest case body accepted. Parsing and rendering both recurse once per
/// level, so this bounds their stack use.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Recursive-descent builder over one template. Keeps the full source so
/// node spans and error offsets can be reported against it.
struct TreeBuilder<'a> {
    source: &'a str,
    depth: Cell<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn span(&self, start: &'a str, rest: &'a str) -> Range<usize> {
        self.source.offset(start)..self.source.offset(rest)
    }

    /// Nodes up to the end of input or the first unmatched `}`.
    fn message(&self, input: &'a str) -> PResult<'a, ParseTree> {
        map(many0(|i: &'a str| self.node(i)), ParseTree::new)(input)
    }

    fn node(&self, input: &'a str) -> PResult<'a, Node> {
        if input.starts_with(OPEN_CHAR) {
            self.placeholder(input)
        } else {
            let (rest, expr) = literal(input)?;
            Ok((rest, Node::new(NodeKind::Literal, Expression::Literal(expr), self.span(input, rest))))
        }
    }

    fn placeholder(&self, input: &'a str) -> PResult<'a, Node> {
        let (i, _) = char(OPEN_CHAR)(input)?;
        let (i, name) = preceded(multispace0, expect(word, ParseErrorKind::MissingArgumentName))(i)?;
        let (i, _) = multispace0(i)?;
        let (i, comma) = opt(char(','))(i)?;

        let (i, (kind, expr)) = match comma {
            None => (i, (NodeKind::Var, Expression::Var(VarExpr { name: name.to_string() }))),
            Some(_) => {
                let (i, _) = multispace0(i)?;
                let (rest, keyword) = expect(word, ParseErrorKind::UnknownArgumentType(String::new()))(i)?;
                match keyword {
                    "number" => self.number(name, rest)?,
                    "date" => self.date_time(name, DateTimeKind::Date, rest)?,
                    "time" => self.date_time(name, DateTimeKind::Time, rest)?,
                    "plural" => self.plural(name, NodeKind::Plural, rest)?,
                    "selectordinal" => self.plural(name, NodeKind::SelectOrdinal, rest)?,
                    "select" => self.select(name, rest)?,
                    other => return failure(i, ParseErrorKind::UnknownArgumentType(other.to_string())),
                }
            }
        };

        let (i, _) = multispace0(i)?;
        let (rest, _) = expect(char(CLOSE_CHAR), ParseErrorKind::UnbalancedBraces)(i)?;
        Ok((rest, Node::new(kind, expr, self.span(input, rest))))
    }

    fn number(&self, name: &str, input: &'a str) -> PResult<'a, (NodeKind, Expression)> {
        let (i, comma) = opt(preceded(multispace0, char(',')))(input)?;
        if comma.is_some() {
            let (i, _) = multispace0(i)?;
            let (_, format) = take_till(|c: char| c == CLOSE_CHAR)(i)?;
            return failure(i, ParseErrorKind::NumberFormatNotImplemented(format.trim_end().to_string()));
        }
        Ok((input, (NodeKind::Number, Expression::Number(NumberExpr { name: name.to_string() }))))
    }

    fn date_time(&self, name: &str, kind: DateTimeKind, input: &'a str) -> PResult<'a, (NodeKind, Expression)> {
        let (i, comma) = opt(preceded(multispace0, char(',')))(input)?;
        let (rest, width) = match comma {
            None => (input, DateTimeWidth::Short),
            Some(_) => {
                let (i, _) = multispace0(i)?;
                let (rest, token) = take_till(|c: char| c.is_whitespace() || c == CLOSE_CHAR || c == OPEN_CHAR)(i)?;
                match DateTimeWidth::parse(token) {
                    Some(width) => (rest, width),
                    None => return failure(i, ParseErrorKind::InvalidDateFormat(token.to_string())),
                }
            }
        };

        let node_kind = match kind {
            DateTimeKind::Date => NodeKind::Date,
            DateTimeKind::Time => NodeKind::Time,
        };
        let expr = DateTimeExpr { name: name.to_string(), kind, width };
        Ok((rest, (node_kind, Expression::DateTime(expr))))
    }

    fn plural(&self, name: &str, kind: NodeKind, input: &'a str) -> PResult<'a, (NodeKind, Expression)> {
        let (i, _) = preceded(multispace0, expect(char(','), ParseErrorKind::ExpectedCases))(input)?;
        let (i, _) = multispace0(i)?;
        let (i, offset) = opt(offset_clause)(i)?;

        let parse_key = |token: &str| {
            PluralKey::parse(token).ok_or_else(|| ParseErrorKind::InvalidPluralKey(token.to_string()))
        };
        let (rest, cases) = self.cases(i, &parse_key)?;
        let cases: Vec<PluralCase> = cases.into_iter().map(|(key, message)| PluralCase { key, message }).collect();

        if !cases.iter().any(|case| case.key == PluralKey::Category(PluralCategory::Other)) {
            return failure(rest, ParseErrorKind::MissingOtherCase);
        }

        let expr = PluralExpr { name: name.to_string(), offset, cases };
        Ok((rest, (kind, Expression::Plural(expr))))
    }

    fn select(&self, name: &str, input: &'a str) -> PResult<'a, (NodeKind, Expression)> {
        let (i, _) = preceded(multispace0, expect(char(','), ParseErrorKind::ExpectedCases))(input)?;

        let parse_key = |token: &str| Ok::<_, ParseErrorKind>(token.to_string());
        let (rest, cases) = self.cases(i, &parse_key)?;
        let cases: Vec<SelectCase> = cases.into_iter().map(|(key, message)| SelectCase { key, message }).collect();

        if !cases.iter().any(|case| case.key == "other") {
            return failure(rest, ParseErrorKind::MissingOtherCase);
        }

        let expr = SelectExpr { name: name.to_string(), cases };
        Ok((rest, (NodeKind::Select, Expression::Select(expr))))
    }

    /// One or more `key { message }` pairs with distinct keys.
    fn cases<K, F>(&self, input: &'a str, parse_key: &F) -> PResult<'a, Vec<(K, ParseTree)>>
    where
        K: PartialEq,
        F: Fn(&str) -> Result<K, ParseErrorKind>,
    {
        let (rest, parsed) = many0(|i: &'a str| self.case(i, parse_key))(input)?;
        let (rest, _) = multispace0(rest)?;

        if parsed.is_empty() {
            let kind = if rest.is_empty() {
                ParseErrorKind::UnterminatedPlaceholder
            } else {
                ParseErrorKind::ExpectedCases
            };
            return failure(rest, kind);
        }

        let mut cases: Vec<(K, ParseTree)> = Vec::with_capacity(parsed.len());
        for (token, key, message) in parsed {
            if cases.iter().any(|(seen, _)| *seen == key) {
                return failure(token, ParseErrorKind::DuplicateCase(token.to_string()));
            }
            cases.push((key, message));
        }
        Ok((rest, cases))
    }

    /// A case body, one level below the enclosing message.
    fn nested_message(&self, input: &'a str) -> PResult<'a, ParseTree> {
        let depth = self.depth.get() + 1;
        if depth > MAX_NESTING_DEPTH {
            return failure(input, ParseErrorKind::NestingTooDeep(MAX_NESTING_DEPTH));
        }
        self.depth.set(depth);
        let parsed = self.message(input);
        self.depth.set(depth - 1);
        parsed
    }

    fn case<K, F>(&self, input: &'a str, parse_key: &F) -> PResult<'a, (&'a str, K, ParseTree)>
    where
        F: Fn(&str) -> Result<K, ParseErrorKind>,
    {
        let (i, _) = multispace0(input)?;
        let (i, token) = word(i)?;
        let key = match parse_key(token) {
            Ok(key) => key,
            Err(kind) => return failure(token, kind),
        };

        let (i, _) = multispace0(i)?;
        let (i, _) = expect(char(OPEN_CHAR), ParseErrorKind::ExpectedCaseBody)(i)?;
        let (i, message) = self.nested_message(i)?;
        let (rest, _) = expect(char(CLOSE_CHAR), ParseErrorKind::UnbalancedBraces)(i)?;
        Ok((rest, (token, key, message)))
    }
}

/// Parses a complete template. Nothing is returned unless the whole input
/// forms a well-balanced message.
pub fn parse(source: &str) -> Result<ParseTree, ParseError> {
    let builder = TreeBuilder { source, depth: Cell::new(0) };

    let outcome = match builder.message(source) {
        Ok(("", tree)) => Ok(tree),
        Ok((rest, _)) => Err(ParseError {
            kind: ParseErrorKind::UnbalancedBraces,
            offset: source.offset(rest),
        }),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(ParseError {
            offset: source.offset(err.input),
            kind: err.kind,
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            kind: ParseErrorKind::UnterminatedPlaceholder,
            offset: source.len(),
        }),
    };

    match &outcome {
        Ok(tree) => tracing::trace!(len = source.len(), nodes = tree.len(), "parsed message"),
        Err(err) => tracing::debug!(kind = %err.kind, offset = err.offset, "rejected message template"),
    }
    outcome
}
