//! Locale-specific collaborators used by the [`Formatter`](crate::Formatter):
//! plural categories, number printing and date/time text.
//!
//! Each concern is a trait so callers can plug in their own data. The
//! defaults use ICU4X compiled CLDR data for plurals and numbers and the
//! built-in [`DateTimeStyle`] variants for dates and times.

use chrono::{DateTime, Datelike, FixedOffset};
use fixed_decimal::FixedDecimal;
use icu::decimal::options::FixedDecimalFormatterOptions;
use icu::decimal::FixedDecimalFormatter;
use icu::locid::Locale;
use icu::plurals::{PluralCategory as IcuPluralCategory, PluralRules};
use icu_provider::DataLocale;
use writeable::Writeable;

use crate::error::ConfigError;
use crate::types::PluralCategory;

/// Maps a number to the plural category used to pick a `plural` or
/// `selectordinal` case.
pub trait PluralFunction: Send + Sync {
    fn category(&self, value: &FixedDecimal, ordinal: bool) -> PluralCategory;
}

impl<F> PluralFunction for F
where
    F: Fn(&FixedDecimal, bool) -> PluralCategory + Send + Sync,
{
    fn category(&self, value: &FixedDecimal, ordinal: bool) -> PluralCategory {
        self(value, ordinal)
    }
}

/// Prints a number with the locale's digits, separators and grouping.
pub trait NumberPrinter: Send + Sync {
    fn print(&self, value: &FixedDecimal) -> String;
}

pub trait DateTimeFormatter: Send + Sync {
    fn short_date(&self, t: &DateTime<FixedOffset>) -> String;
    fn medium_date(&self, t: &DateTime<FixedOffset>) -> String;
    fn long_date(&self, t: &DateTime<FixedOffset>) -> String;
    fn full_date(&self, t: &DateTime<FixedOffset>) -> String;
    fn short_time(&self, t: &DateTime<FixedOffset>) -> String;
    fn medium_time(&self, t: &DateTime<FixedOffset>) -> String;
    fn long_time(&self, t: &DateTime<FixedOffset>) -> String;
    fn full_time(&self, t: &DateTime<FixedOffset>) -> String;
}

/// CLDR cardinal and ordinal rules for one locale.
pub struct IcuPluralRules {
    cardinal: PluralRules,
    ordinal: PluralRules,
}

impl IcuPluralRules {
    pub fn try_new(locale: &Locale) -> Result<Self, ConfigError> {
        let data_locale = DataLocale::from(locale);
        let unavailable = |_| ConfigError::PluralRulesUnavailable(locale.clone());

        Ok(Self {
            cardinal: PluralRules::try_new_cardinal(&data_locale).map_err(unavailable)?,
            ordinal: PluralRules::try_new_ordinal(&data_locale).map_err(unavailable)?,
        })
    }
}

impl PluralFunction for IcuPluralRules {
    fn category(&self, value: &FixedDecimal, ordinal: bool) -> PluralCategory {
        let rules = if ordinal { &self.ordinal } else { &self.cardinal };
        match rules.category_for(value) {
            IcuPluralCategory::Zero => PluralCategory::Zero,
            IcuPluralCategory::One => PluralCategory::One,
            IcuPluralCategory::Two => PluralCategory::Two,
            IcuPluralCategory::Few => PluralCategory::Few,
            IcuPluralCategory::Many => PluralCategory::Many,
            IcuPluralCategory::Other => PluralCategory::Other,
        }
    }
}

pub struct IcuNumberPrinter {
    formatter: FixedDecimalFormatter,
}

impl IcuNumberPrinter {
    pub fn try_new(locale: &Locale) -> Result<Self, ConfigError> {
        let formatter = FixedDecimalFormatter::try_new(&locale.into(), FixedDecimalFormatterOptions::default())
            .map_err(|_| ConfigError::NumberFormatUnavailable(locale.clone()))?;
        Ok(Self { formatter })
    }
}

impl NumberPrinter for IcuNumberPrinter {
    fn print(&self, value: &FixedDecimal) -> String {
        self.formatter.format(value).write_to_string().into_owned()
    }
}

/// The built-in date/time variants. New locales get a new variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateTimeStyle {
    American,
    German,
}

impl DateTimeStyle {
    /// German for `de`, American for everything else.
    pub fn for_locale(locale: &Locale) -> Self {
        match locale.id.language.as_str() {
            "de" => DateTimeStyle::German,
            _ => DateTimeStyle::American,
        }
    }

    pub fn formatter(self) -> Box<dyn DateTimeFormatter> {
        match self {
            DateTimeStyle::American => Box::new(AmericanDateTimeFormatter),
            DateTimeStyle::German => Box::new(GermanDateTimeFormatter),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AmericanDateTimeFormatter;

impl DateTimeFormatter for AmericanDateTimeFormatter {
    // 4/10/2023
    fn short_date(&self, t: &DateTime<FixedOffset>) -> String {
        format!("{}/{}/{}", t.month(), t.day(), t.year())
    }

    // April 10, 2023
    fn medium_date(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%B %-d, %Y").to_string()
    }

    // Monday April 10, 2023
    fn long_date(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%A %B %-d, %Y").to_string()
    }

    // Monday, April 10, 2023
    fn full_date(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%A, %B %-d, %Y").to_string()
    }

    // 5:19 AM
    fn short_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%-I:%M %p").to_string()
    }

    // 5:19:42 AM
    fn medium_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%-I:%M:%S %p").to_string()
    }

    // 5:19:42 AM -04:00
    fn long_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%-I:%M:%S %p %:z").to_string()
    }

    fn full_time(&self, t: &DateTime<FixedOffset>) -> String {
        self.long_time(t)
    }
}

const GERMAN_MONTHS: [&str; 12] = [
    "Januar", "Februar", "März", "April", "Mai", "Juni", "Juli", "August", "September", "Oktober",
    "November", "Dezember",
];

const GERMAN_WEEKDAYS: [&str; 7] = [
    "Montag", "Dienstag", "Mittwoch", "Donnerstag", "Freitag", "Samstag", "Sonntag",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct GermanDateTimeFormatter;

impl GermanDateTimeFormatter {
    fn month(t: &DateTime<FixedOffset>) -> &'static str {
        GERMAN_MONTHS[t.month0() as usize]
    }

    fn weekday(t: &DateTime<FixedOffset>) -> &'static str {
        GERMAN_WEEKDAYS[t.weekday().num_days_from_monday() as usize]
    }
}

impl DateTimeFormatter for GermanDateTimeFormatter {
    // 10.4.2023
    fn short_date(&self, t: &DateTime<FixedOffset>) -> String {
        format!("{}.{}.{}", t.day(), t.month(), t.year())
    }

    // 10. April 2023
    fn medium_date(&self, t: &DateTime<FixedOffset>) -> String {
        format!("{}. {} {}", t.day(), Self::month(t), t.year())
    }

    // Montag 10. April 2023
    fn long_date(&self, t: &DateTime<FixedOffset>) -> String {
        format!("{} {}. {} {}", Self::weekday(t), t.day(), Self::month(t), t.year())
    }

    // Montag, 10. April 2023
    fn full_date(&self, t: &DateTime<FixedOffset>) -> String {
        format!("{}, {}. {} {}", Self::weekday(t), t.day(), Self::month(t), t.year())
    }

    fn short_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%H:%M").to_string()
    }

    fn medium_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%H:%M:%S").to_string()
    }

    fn long_time(&self, t: &DateTime<FixedOffset>) -> String {
        t.format("%H:%M:%S %:z").to_string()
    }

    fn full_time(&self, t: &DateTime<FixedOffset>) -> String {
        self.long_time(t)
    }
}
