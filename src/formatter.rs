use std::borrow::Cow;
use std::fmt;

use fixed_decimal::FixedDecimal;
use icu::locid::{locale, Locale};

use crate::error::{ConfigError, FormatError};
use crate::literal::POUND_CHAR;
use crate::locale::{
    DateTimeFormatter, DateTimeStyle, IcuNumberPrinter, IcuPluralRules, NumberPrinter, PluralFunction,
};
use crate::types::{
    DateTimeExpr, DateTimeKind, DateTimeWidth, Expression, LiteralExpr, LiteralPart, NodeKind, NumberExpr,
    ParameterValue, Parameters, ParseTree, PluralExpr, SelectExpr, VarExpr,
};

/// Configuration for a [`Formatter`]. The locale defaults to `en`.
pub struct FormatterBuilder {
    locale: Locale,
    plural: Option<Box<dyn PluralFunction>>,
    resolve_plural_rules: bool,
    numbers: Option<Box<dyn NumberPrinter>>,
    dates: Option<Box<dyn DateTimeFormatter>>,
}

impl Default for FormatterBuilder {
    fn default() -> Self {
        Self {
            locale: locale!("en"),
            plural: None,
            resolve_plural_rules: true,
            numbers: None,
            dates: None,
        }
    }
}

impl FormatterBuilder {
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Use `plural` instead of the locale's CLDR rules.
    pub fn plural_function(mut self, plural: impl PluralFunction + 'static) -> Self {
        self.plural = Some(Box::new(plural));
        self
    }

    /// When disabled and no explicit plural function is set, the formatter has
    /// none, and rendering a plural without an exact match fails with
    /// [`FormatError::UndefinedPluralFunction`].
    pub fn resolve_plural_rules(mut self, resolve: bool) -> Self {
        self.resolve_plural_rules = resolve;
        self
    }

    pub fn number_printer(mut self, numbers: impl NumberPrinter + 'static) -> Self {
        self.numbers = Some(Box::new(numbers));
        self
    }

    pub fn date_time_formatter(mut self, dates: impl DateTimeFormatter + 'static) -> Self {
        self.dates = Some(Box::new(dates));
        self
    }

    pub fn build(self) -> Result<Formatter, ConfigError> {
        let plural_source = match (&self.plural, self.resolve_plural_rules) {
            (Some(_), _) => "custom",
            (None, true) => "cldr",
            (None, false) => "none",
        };
        let plural: Option<Box<dyn PluralFunction>> = match self.plural {
            Some(plural) => Some(plural),
            None if self.resolve_plural_rules => Some(Box::new(IcuPluralRules::try_new(&self.locale)?)),
            None => None,
        };

        let numbers: Box<dyn NumberPrinter> = match self.numbers {
            Some(numbers) => numbers,
            None => Box::new(IcuNumberPrinter::try_new(&self.locale)?),
        };

        let style = DateTimeStyle::for_locale(&self.locale);
        let custom_dates = self.dates.is_some();
        let dates = self.dates.unwrap_or_else(|| style.formatter());

        tracing::debug!(
            locale = %self.locale,
            plural = plural_source,
            date_style = ?style,
            custom_dates,
            "configured message formatter"
        );

        Ok(Formatter { locale: self.locale, plural, numbers, dates })
    }
}

/// Renders parsed messages for one locale.
///
/// Rendering only needs `&self`, so a single formatter can serve many threads.
/// The `set_*` methods need `&mut self` and therefore exclusive access.
pub struct Formatter {
    locale: Locale,
    plural: Option<Box<dyn PluralFunction>>,
    numbers: Box<dyn NumberPrinter>,
    dates: Box<dyn DateTimeFormatter>,
}

impl fmt::Debug for Formatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatter")
            .field("locale", &self.locale)
            .field("has_plural_function", &self.plural.is_some())
            .finish_non_exhaustive()
    }
}

impl Formatter {
    pub fn builder() -> FormatterBuilder {
        FormatterBuilder::default()
    }

    pub fn new(locale: Locale) -> Result<Self, ConfigError> {
        Self::builder().locale(locale).build()
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    pub fn set_plural_function(&mut self, plural: impl PluralFunction + 'static) {
        self.plural = Some(Box::new(plural));
    }

    pub fn set_date_time_formatter(&mut self, dates: impl DateTimeFormatter + 'static) {
        self.dates = Box::new(dates);
    }

    /// Renders a message that takes no parameters.
    pub fn format(&self, tree: &ParseTree) -> Result<String, FormatError> {
        self.format_map(tree, Parameters::empty())
    }

    pub fn format_map(&self, tree: &ParseTree, parameters: Parameters<'_>) -> Result<String, FormatError> {
        let mut result = String::new();
        self.format_tree(tree, parameters, None, &mut result)?;
        Ok(result)
    }

    /// `pound` is the text `#` stands for in the current branch, if any.
    fn format_tree(
        &self,
        tree: &ParseTree,
        parameters: Parameters<'_>,
        pound: Option<&str>,
        result: &mut String,
    ) -> Result<(), FormatError> {
        for node in tree {
            match (node.kind(), node.expr()) {
                (NodeKind::Literal, Expression::Literal(literal)) => format_literal(literal, pound, result),
                (NodeKind::Var, Expression::Var(var)) => format_var(var, parameters, result)?,
                (NodeKind::Number, Expression::Number(number)) => self.format_number(number, parameters, result)?,
                (NodeKind::Date, Expression::DateTime(date)) if date.kind == DateTimeKind::Date => {
                    self.format_date_time(date, parameters, result)?
                }
                (NodeKind::Time, Expression::DateTime(time)) if time.kind == DateTimeKind::Time => {
                    self.format_date_time(time, parameters, result)?
                }
                (NodeKind::Plural, Expression::Plural(plural)) => {
                    self.format_plural(plural, false, parameters, result)?
                }
                (NodeKind::SelectOrdinal, Expression::Plural(ordinal)) => {
                    self.format_plural(ordinal, true, parameters, result)?
                }
                (NodeKind::Select, Expression::Select(select)) => {
                    self.format_select(select, parameters, pound, result)?
                }
                (kind, expr) => {
                    return Err(FormatError::InvalidExprType { kind, found: expr.type_name() });
                }
            }
        }
        Ok(())
    }

    fn format_number(
        &self,
        number: &NumberExpr,
        parameters: Parameters<'_>,
        result: &mut String,
    ) -> Result<(), FormatError> {
        let value = lookup(parameters, &number.name)?;
        let decimal = match value {
            ParameterValue::Number(n) => FixedDecimal::from(n),
            ParameterValue::Decimal(d) => to_decimal(d).ok_or_else(|| invalid_arg(&number.name, "finite number", &value))?,
            _ => return Err(invalid_arg(&number.name, "number", &value)),
        };
        result.push_str(&self.numbers.print(&decimal));
        Ok(())
    }

    fn format_date_time(
        &self,
        expr: &DateTimeExpr,
        parameters: Parameters<'_>,
        result: &mut String,
    ) -> Result<(), FormatError> {
        let t = match lookup(parameters, &expr.name)? {
            ParameterValue::DateTime(t) => t,
            other => return Err(invalid_arg(&expr.name, "date-time", &other)),
        };

        let text = match (expr.kind, expr.width) {
            (DateTimeKind::Date, DateTimeWidth::Short) => self.dates.short_date(&t),
            (DateTimeKind::Date, DateTimeWidth::Medium) => self.dates.medium_date(&t),
            (DateTimeKind::Date, DateTimeWidth::Long) => self.dates.long_date(&t),
            (DateTimeKind::Date, DateTimeWidth::Full) => self.dates.full_date(&t),
            (DateTimeKind::Time, DateTimeWidth::Short) => self.dates.short_time(&t),
            (DateTimeKind::Time, DateTimeWidth::Medium) => self.dates.medium_time(&t),
            (DateTimeKind::Time, DateTimeWidth::Long) => self.dates.long_time(&t),
            (DateTimeKind::Time, DateTimeWidth::Full) => self.dates.full_time(&t),
        };
        result.push_str(&text);
        Ok(())
    }

    fn format_plural(
        &self,
        plural: &PluralExpr,
        ordinal: bool,
        parameters: Parameters<'_>,
        result: &mut String,
    ) -> Result<(), FormatError> {
        let value = lookup(parameters, &plural.name)?;
        let offset = plural.offset.unwrap_or(0);

        // exact keys compare against the raw value, categories use value - offset
        let (raw, adjusted, whole) = match value {
            ParameterValue::Number(n) => (FixedDecimal::from(n), FixedDecimal::from(n.saturating_sub(offset)), Some(n)),
            ParameterValue::Decimal(d) => {
                let not_finite = || invalid_arg(&plural.name, "finite number", &value);
                let raw = to_decimal(d).ok_or_else(not_finite)?;
                let adjusted = to_decimal(d - offset as f64).ok_or_else(not_finite)?;
                (raw, adjusted, as_whole(d))
            }
            _ => return Err(invalid_arg(&plural.name, "number", &value)),
        };

        let branch = match whole.and_then(|n| plural.exact(n)) {
            Some(branch) => Some(branch),
            None => {
                let rules = self.plural.as_deref().ok_or(FormatError::UndefinedPluralFunction)?;
                let category = rules.category(&adjusted, ordinal);
                plural.category(category).or_else(|| plural.other())
            }
        };

        if let Some(branch) = branch {
            let pound = self.numbers.print(&raw);
            self.format_tree(branch, parameters, Some(&pound), result)?;
        }
        Ok(())
    }

    fn format_select(
        &self,
        select: &SelectExpr,
        parameters: Parameters<'_>,
        pound: Option<&str>,
        result: &mut String,
    ) -> Result<(), FormatError> {
        let value = lookup(parameters, &select.name)?;
        let key: Cow<'_, str> = match value {
            ParameterValue::String(s) => Cow::Borrowed(s),
            ParameterValue::Number(n) => Cow::Owned(n.to_string()),
            ParameterValue::Decimal(d) => Cow::Owned(d.to_string()),
            ParameterValue::DateTime(_) => return Err(invalid_arg(&select.name, "string", &value)),
        };

        if let Some(branch) = select.select(&key) {
            self.format_tree(branch, parameters, pound, result)?;
        }
        Ok(())
    }
}

fn format_literal(literal: &LiteralExpr, pound: Option<&str>, result: &mut String) {
    for part in &literal.parts {
        match part {
            LiteralPart::Text(text) => result.push_str(text),
            LiteralPart::Pound => match pound {
                Some(value) => result.push_str(value),
                None => result.push(POUND_CHAR),
            },
        }
    }
}

fn format_var(var: &VarExpr, parameters: Parameters<'_>, result: &mut String) -> Result<(), FormatError> {
    match lookup(parameters, &var.name)? {
        ParameterValue::String(value) => result.push_str(value),
        ParameterValue::Number(value) => result.push_str(&value.to_string()),
        ParameterValue::Decimal(value) => result.push_str(&value.to_string()),
        other => return Err(invalid_arg(&var.name, "string or number", &other)),
    }
    Ok(())
}

fn lookup<'a>(parameters: Parameters<'a>, name: &str) -> Result<ParameterValue<'a>, FormatError> {
    parameters
        .get(name)
        .copied()
        .ok_or_else(|| FormatError::MissingParameter(name.to_string()))
}

fn invalid_arg(name: &str, expected: &'static str, found: &ParameterValue<'_>) -> FormatError {
    FormatError::InvalidArgType {
        name: name.to_string(),
        expected,
        found: found.type_name(),
    }
}

fn to_decimal(value: f64) -> Option<FixedDecimal> {
    match as_whole(value) {
        Some(whole) => Some(FixedDecimal::from(whole)),
        None => value.to_string().parse::<FixedDecimal>().ok(),
    }
}

fn as_whole(value: f64) -> Option<i64> {
    if value.fract() == 0.0 && value >= i64::MIN as f64 && value <= i64::MAX as f64 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::params;
    use crate::types::{Node, PluralCategory};
    use chrono::{DateTime, FixedOffset, TimeZone};
    use pretty_assertions::assert_eq;

    fn english() -> Formatter {
        Formatter::builder().build().unwrap()
    }

    fn render(source: &str, parameters: Parameters<'_>) -> Result<String, FormatError> {
        english().format_map(&parse(source).unwrap(), parameters)
    }

    fn sample_instant() -> DateTime<FixedOffset> {
        FixedOffset::west_opt(4 * 3600)
            .unwrap()
            .with_ymd_and_hms(2023, 4, 10, 5, 19, 42)
            .single()
            .unwrap()
    }

    #[test]
    fn test_format_text_only() {
        let tree = parse("Hello world").unwrap();
        assert_eq!(english().format(&tree).unwrap(), "Hello world");
    }

    #[test]
    fn test_format_multiple_parameters() {
        let result = render("Hello {firstName} {lastName}!", params!(
            "firstName" => "Alice",
            "lastName" => "Johnson"
        ));
        assert_eq!(result.unwrap(), "Hello Alice Johnson!");
    }

    #[test]
    fn test_format_var_numbers_are_not_grouped() {
        assert_eq!(render("{id}/{ratio}", params!("id" => 12345, "ratio" => 0.25)).unwrap(), "12345/0.25");
    }

    #[test]
    fn test_format_missing_parameter() {
        let tree = parse("Hello {name}").unwrap();
        let err = english().format(&tree).unwrap_err();
        assert_eq!(err, FormatError::MissingParameter("name".to_string()));
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_format_var_rejects_date_time() {
        let err = render("{when}", params!("when" => sample_instant())).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidArgType { name: "when".to_string(), expected: "string or number", found: "date-time" }
        );
    }

    #[test]
    fn test_pound_outside_plural_is_literal() {
        assert_eq!(render("Issue #{id}", params!("id" => "42")).unwrap(), "Issue #42");
    }

    #[test]
    fn test_format_plural_exact_and_other() {
        let source = "{n, plural, =0{none} one{one item} other{# items}}";
        assert_eq!(render(source, params!("n" => 0)).unwrap(), "none");
        assert_eq!(render(source, params!("n" => 1)).unwrap(), "one item");
        assert_eq!(render(source, params!("n" => 3)).unwrap(), "3 items");
        assert_eq!(render(source, params!("n" => 1234)).unwrap(), "1,234 items");
        assert_eq!(render(source, params!("n" => 2.5)).unwrap(), "2.5 items");
    }

    #[test]
    fn test_format_plural_offset() {
        let source = "{n, plural, offset:1 =1{only you} one{you and # (one)} other{you and # (other)}}";
        assert_eq!(render(source, params!("n" => 1)).unwrap(), "only you");
        // category comes from n - 1, # stays the raw value
        assert_eq!(render(source, params!("n" => 2)).unwrap(), "you and 2 (one)");
        assert_eq!(render(source, params!("n" => 5)).unwrap(), "you and 5 (other)");
    }

    #[test]
    fn test_format_selectordinal() {
        let tree = parse("{n, selectordinal, one{#st} two{#nd} few{#rd} other{#th}}").unwrap();
        let formatter = english();
        let rendered: Vec<String> = [1, 2, 3, 4, 11, 21, 22, 112]
            .iter()
            .map(|n| formatter.format_map(&tree, params!("n" => *n)).unwrap())
            .collect();
        assert_eq!(rendered, vec!["1st", "2nd", "3rd", "4th", "11th", "21st", "22nd", "112th"]);
    }

    #[test]
    fn test_format_plural_rejects_strings() {
        let err = render("{n, plural, other{#}}", params!("n" => "3")).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidArgType { name: "n".to_string(), expected: "number", found: "string" }
        );
    }

    #[test]
    fn test_select_keeps_enclosing_pound() {
        let source = "{n, plural, other{{g, select, female{she has #} other{they have #}}}}";
        assert_eq!(render(source, params!("n" => 3, "g" => "female")).unwrap(), "she has 3");
        assert_eq!(render(source, params!("n" => 3, "g" => "x")).unwrap(), "they have 3");
    }

    #[test]
    fn test_nested_plural_overrides_pound_for_its_branch_only() {
        let source = "{a, plural, other{# apples, {b, plural, other{# bananas}} and # again}}";
        assert_eq!(render(source, params!("a" => 2, "b" => 5)).unwrap(), "2 apples, 5 bananas and 2 again");
    }

    #[test]
    fn test_format_select() {
        let source = "{gender, select, male{He likes this.} female{She likes this.} other{They like this.}}";
        assert_eq!(render(source, params!("gender" => "male")).unwrap(), "He likes this.");
        assert_eq!(render(source, params!("gender" => "female")).unwrap(), "She likes this.");
        assert_eq!(render(source, params!("gender" => "nonbinary")).unwrap(), "They like this.");
    }

    #[test]
    fn test_format_select_stringifies_numbers() {
        let source = "{n, select, 1{first} other{later}}";
        assert_eq!(render(source, params!("n" => 1)).unwrap(), "first");
        assert_eq!(render(source, params!("n" => 2)).unwrap(), "later");
    }

    #[test]
    fn test_format_number_grouping() {
        assert_eq!(render("{v, number}", params!("v" => 1234)).unwrap(), "1,234");
        assert_eq!(render("{v, number}", params!("v" => 1234.5)).unwrap(), "1,234.5");
        assert_eq!(render("{v, number}", params!("v" => 12345.678)).unwrap(), "12,345.678");
        assert_eq!(render("{v, number}", params!("v" => 12345678)).unwrap(), "12,345,678");
    }

    #[test]
    fn test_format_number_rejects_non_numbers() {
        let err = render("{v, number}", params!("v" => "19.99")).unwrap_err();
        assert!(err.is_invalid_argument());
        let err = render("{v, number}", params!("v" => f64::NAN)).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidArgType { name: "v".to_string(), expected: "finite number", found: "decimal" }
        );
    }

    #[test]
    fn test_format_german_numbers_and_dates() {
        let formatter = Formatter::new(locale!("de")).unwrap();
        let tree = parse("{v, number} am {d, date, medium}").unwrap();
        let result = formatter.format_map(&tree, params!("v" => 1234.5, "d" => sample_instant()));
        assert_eq!(result.unwrap(), "1.234,5 am 10. April 2023");
    }

    #[test]
    fn test_format_dates_and_times() {
        let t = sample_instant();
        let cases = [
            ("{d, date}", "4/10/2023"),
            ("{d, date, short}", "4/10/2023"),
            ("{d, date, medium}", "April 10, 2023"),
            ("{d, date, long}", "Monday April 10, 2023"),
            ("{d, date, full}", "Monday, April 10, 2023"),
            ("{d, time}", "5:19 AM"),
            ("{d, time, short}", "5:19 AM"),
            ("{d, time, medium}", "5:19:42 AM"),
            ("{d, time, long}", "5:19:42 AM -04:00"),
            ("{d, time, full}", "5:19:42 AM -04:00"),
        ];
        for (source, expected) in cases {
            assert_eq!(render(source, params!("d" => t)).unwrap(), expected, "{source}");
        }
    }

    #[test]
    fn test_format_date_rejects_numbers() {
        let err = render("{d, date, short}", params!("d" => 5)).unwrap_err();
        assert_eq!(
            err,
            FormatError::InvalidArgType { name: "d".to_string(), expected: "date-time", found: "integer" }
        );
    }

    #[test]
    fn test_undefined_plural_function() {
        let formatter = Formatter::builder().resolve_plural_rules(false).build().unwrap();
        let tree = parse("{n, plural, =0{none} other{#}}").unwrap();

        assert_eq!(formatter.format_map(&tree, params!("n" => 0)).unwrap(), "none");
        assert_eq!(
            formatter.format_map(&tree, params!("n" => 4)).unwrap_err(),
            FormatError::UndefinedPluralFunction
        );
    }

    #[test]
    fn test_custom_plural_function() {
        let mut formatter = Formatter::builder()
            .plural_function(|_: &FixedDecimal, _: bool| PluralCategory::Few)
            .build()
            .unwrap();
        let tree = parse("{n, plural, few{few #} other{other #}}").unwrap();
        assert_eq!(formatter.format_map(&tree, params!("n" => 1)).unwrap(), "few 1");

        formatter.set_plural_function(|_: &FixedDecimal, _: bool| PluralCategory::Many);
        // no `many` case, falls back to other
        assert_eq!(formatter.format_map(&tree, params!("n" => 1)).unwrap(), "other 1");
    }

    struct IsoDates;

    impl DateTimeFormatter for IsoDates {
        fn short_date(&self, t: &DateTime<FixedOffset>) -> String {
            t.format("%Y-%m-%d").to_string()
        }
        fn medium_date(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_date(t)
        }
        fn long_date(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_date(t)
        }
        fn full_date(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_date(t)
        }
        fn short_time(&self, t: &DateTime<FixedOffset>) -> String {
            t.format("%H:%M").to_string()
        }
        fn medium_time(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_time(t)
        }
        fn long_time(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_time(t)
        }
        fn full_time(&self, t: &DateTime<FixedOffset>) -> String {
            self.short_time(t)
        }
    }

    #[test]
    fn test_custom_date_time_formatter() {
        let formatter = Formatter::builder().date_time_formatter(IsoDates).build().unwrap();
        let tree = parse("{d, date, long} {d, time, full}").unwrap();
        assert_eq!(formatter.format_map(&tree, params!("d" => sample_instant())).unwrap(), "2023-04-10 05:19");
    }

    #[test]
    fn test_mismatched_node_is_internal_error() {
        let tree = ParseTree::new(vec![Node::new(
            NodeKind::Var,
            Expression::Number(NumberExpr { name: "n".to_string() }),
            0..3,
        )]);
        assert_eq!(
            english().format(&tree).unwrap_err(),
            FormatError::InvalidExprType { kind: NodeKind::Var, found: "NumberExpr" }
        );
    }

    #[test]
    fn test_render_at_nesting_limit() {
        let depth = crate::parser::MAX_NESTING_DEPTH;
        let source = format!(
            "{}# deep{}",
            "{n, plural, other{{g, select, other{".repeat(depth / 2),
            "}}}}".repeat(depth / 2)
        );
        assert_eq!(render(&source, params!("n" => 3, "g" => "x")).unwrap(), "3 deep");
    }

    #[test]
    fn test_renders_are_independent() {
        let tree = parse("{n, plural, one{# file} other{# files}} in {dir}").unwrap();
        let formatter = english();
        let first = [("n", ParameterValue::Number(1)), ("dir", ParameterValue::String("a"))];
        let second = [("n", ParameterValue::Number(7)), ("dir", ParameterValue::String("b"))];

        assert_eq!(formatter.format_map(&tree, Parameters::from_slice(&first)).unwrap(), "1 file in a");
        assert_eq!(formatter.format_map(&tree, Parameters::from_slice(&second)).unwrap(), "7 files in b");
        assert_eq!(formatter.format_map(&tree, Parameters::from_slice(&first)).unwrap(), "1 file in a");
    }

    #[test]
    fn test_concurrent_renders_share_tree_and_formatter() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Formatter>();
        assert_send_sync::<ParseTree>();

        let tree = parse("{n, plural, one{# day} other{# days}}").unwrap();
        let formatter = english();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (1..=8i64)
                .map(|n| {
                    let (tree, formatter) = (&tree, &formatter);
                    scope.spawn(move || formatter.format_map(tree, params!("n" => n)).unwrap())
                })
                .collect();
            let results: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            assert_eq!(results[0], "1 day");
            assert_eq!(results[7], "8 days");
        });
    }
}
