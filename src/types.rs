use std::fmt;
use std::ops::Range;

use chrono::{DateTime, FixedOffset, Utc};

/// A parsed message: the root-level sequence of nodes.
///
/// Trees are only built by [`crate::parse`] and cannot be changed afterwards,
/// so one tree can be rendered from any number of threads at once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseTree {
    nodes: Vec<Node>,
}

impl ParseTree {
    pub(crate) fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParseTree {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Literal,
    Var,
    Number,
    Date,
    Time,
    Plural,
    SelectOrdinal,
    Select,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Literal => "literal",
            NodeKind::Var => "var",
            NodeKind::Number => "number",
            NodeKind::Date => "date",
            NodeKind::Time => "time",
            NodeKind::Plural => "plural",
            NodeKind::SelectOrdinal => "selectordinal",
            NodeKind::Select => "select",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One literal run or placeholder of a message.
///
/// `span` is the byte range the node covers in the template it was parsed
/// from, including for nodes nested inside sub-messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    expr: Expression,
    span: Range<usize>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, expr: Expression, span: Range<usize>) -> Self {
        Self { kind, expr, span }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn expr(&self) -> &Expression {
        &self.expr
    }

    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(LiteralExpr),
    Var(VarExpr),
    Number(NumberExpr),
    DateTime(DateTimeExpr),
    /// Shared by `plural` and `selectordinal`; the node kind tells them apart.
    Plural(PluralExpr),
    Select(SelectExpr),
}

impl Expression {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Expression::Literal(_) => "LiteralExpr",
            Expression::Var(_) => "VarExpr",
            Expression::Number(_) => "NumberExpr",
            Expression::DateTime(_) => "DateTimeExpr",
            Expression::Plural(_) => "PluralExpr",
            Expression::Select(_) => "SelectExpr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiteralPart {
    Text(String),
    /// An unescaped `#`: the enclosing plural value, or `#` itself at top level.
    Pound,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiteralExpr {
    pub parts: Vec<LiteralPart>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarExpr {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberExpr {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateTimeKind {
    Date,
    Time,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateTimeWidth {
    #[default]
    Short,
    Medium,
    Long,
    Full,
}

impl DateTimeWidth {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "short" => Some(DateTimeWidth::Short),
            "medium" => Some(DateTimeWidth::Medium),
            "long" => Some(DateTimeWidth::Long),
            "full" => Some(DateTimeWidth::Full),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeExpr {
    pub name: String,
    pub kind: DateTimeKind,
    pub width: DateTimeWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "zero" => Some(PluralCategory::Zero),
            "one" => Some(PluralCategory::One),
            "two" => Some(PluralCategory::Two),
            "few" => Some(PluralCategory::Few),
            "many" => Some(PluralCategory::Many),
            "other" => Some(PluralCategory::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralKey {
    /// `=N`, matched against the value before the offset is applied.
    Exact(i64),
    Category(PluralCategory),
}

impl PluralKey {
    pub fn parse(s: &str) -> Option<Self> {
        match s.strip_prefix('=') {
            Some(digits) => digits.parse::<i64>().ok().map(PluralKey::Exact),
            None => PluralCategory::parse(s).map(PluralKey::Category),
        }
    }
}

impl fmt::Display for PluralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluralKey::Exact(n) => write!(f, "={n}"),
            PluralKey::Category(category) => f.write_str(category.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluralCase {
    pub key: PluralKey,
    pub message: ParseTree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PluralExpr {
    pub name: String,
    pub offset: Option<i64>,
    pub cases: Vec<PluralCase>,
}

impl PluralExpr {
    pub fn exact(&self, value: i64) -> Option<&ParseTree> {
        self.find(PluralKey::Exact(value))
    }

    pub fn category(&self, category: PluralCategory) -> Option<&ParseTree> {
        self.find(PluralKey::Category(category))
    }

    pub fn other(&self) -> Option<&ParseTree> {
        self.category(PluralCategory::Other)
    }

    fn find(&self, key: PluralKey) -> Option<&ParseTree> {
        self.cases.iter().find(|case| case.key == key).map(|case| &case.message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectCase {
    pub key: String,
    pub message: ParseTree,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectExpr {
    pub name: String,
    pub cases: Vec<SelectCase>,
}

impl SelectExpr {
    /// The case whose key equals `value`, else `other`.
    pub fn select(&self, value: &str) -> Option<&ParseTree> {
        self.find(value).or_else(|| self.find("other"))
    }

    fn find(&self, key: &str) -> Option<&ParseTree> {
        self.cases.iter().find(|case| case.key == key).map(|case| &case.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterValue<'a> {
    String(&'a str),
    Number(i64),
    Decimal(f64),
    DateTime(DateTime<FixedOffset>),
}

impl ParameterValue<'_> {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::String(_) => "string",
            ParameterValue::Number(_) => "integer",
            ParameterValue::Decimal(_) => "decimal",
            ParameterValue::DateTime(_) => "date-time",
        }
    }
}

// Trait for types that can be used as parameter values without taking ownership
pub trait AsParameterValue {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a>;
}

impl AsParameterValue for &str {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::String(self)
    }
}

impl AsParameterValue for String {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::String(self.as_str())
    }
}

impl AsParameterValue for i64 {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::Number(*self)
    }
}

impl AsParameterValue for i32 {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::Number(i64::from(*self))
    }
}

impl AsParameterValue for u32 {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::Number(i64::from(*self))
    }
}

impl AsParameterValue for f64 {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::Decimal(*self)
    }
}

impl AsParameterValue for f32 {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::Decimal(f64::from(*self))
    }
}

impl AsParameterValue for DateTime<FixedOffset> {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::DateTime(*self)
    }
}

impl AsParameterValue for DateTime<Utc> {
    fn as_parameter_value<'a>(&'a self) -> ParameterValue<'a> {
        ParameterValue::DateTime(DateTime::<FixedOffset>::from(*self))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Parameters<'a> {
    pairs: &'a [(&'a str, ParameterValue<'a>)],
}

impl<'a> Parameters<'a> {
    pub fn empty() -> Self {
        Self { pairs: &[] }
    }

    pub fn from_slice(pairs: &'a [(&'a str, ParameterValue<'a>)]) -> Self {
        // Validate that all keys are distinct
        for (i, (key, _)) in pairs.iter().enumerate() {
            for (other_key, _) in pairs.iter().skip(i + 1) {
                if key == other_key {
                    panic!("Duplicate parameter key: {key}");
                }
            }
        }
        Self { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&ParameterValue<'a>> {
        self.pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

impl Default for Parameters<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

// Convenience macro for creating parameters
#[macro_export]
macro_rules! params {
    () => {{
        $crate::types::Parameters::empty()
    }};
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::types::Parameters::from_slice(&[
            $(($key, $crate::types::AsParameterValue::as_parameter_value(&$value)),)+
        ])
    };
}
