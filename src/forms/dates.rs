//! Date pattern detection and conversion.
//!
//! Connector schemas describe dates with `format` and, more precisely, with a
//! `pattern` regex. The pattern decides how a submitted value is written;
//! the display format decides how it is shown. Date-only values never pass
//! through a timezone, so a calendar date survives a round trip unchanged.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Storage shape of a date field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePattern {
    /// `YYYY-MM-DD`
    YearMonthDay,
    /// `DD-MM-YYYY`
    DayMonthYear,
    /// `YYYY-MM-DDTHH:MM:SSZ`
    DateTimeSeconds,
    /// `YYYY-MM-DDTHH:MM:SS.sssZ`
    DateTimeMillis,
}

impl DatePattern {
    /// Infer the storage shape from a schema's `format` and `pattern`.
    ///
    /// A recognised `pattern` wins over `format`; a string with neither is
    /// not a date.
    pub fn infer(format: Option<&str>, pattern: Option<&str>) -> Option<Self> {
        if let Some(from_pattern) = pattern.and_then(Self::from_regex) {
            return Some(from_pattern);
        }
        match format {
            Some("date") => Some(DatePattern::YearMonthDay),
            Some("date-time") => Some(DatePattern::DateTimeMillis),
            _ => None,
        }
    }

    fn from_regex(pattern: &str) -> Option<Self> {
        let normalized = pattern
            .replace("\\d", "[0-9]")
            .replace("\\-", "-")
            .trim_start_matches('^')
            .trim_end_matches('$')
            .to_string();

        const YMD: &str = "[0-9]{4}-[0-9]{2}-[0-9]{2}";
        const DMY: &str = "[0-9]{2}-[0-9]{2}-[0-9]{4}";

        if normalized == DMY {
            return Some(DatePattern::DayMonthYear);
        }
        if normalized == YMD {
            return Some(DatePattern::YearMonthDay);
        }
        if let Some(time) = normalized.strip_prefix(YMD) {
            if time.starts_with('T') {
                let millis = time.contains(".[0-9]{3}")
                    || time.contains("\\.[0-9]{3}")
                    || time.contains("[0-9]{3}Z");
                return Some(if millis {
                    DatePattern::DateTimeMillis
                } else {
                    DatePattern::DateTimeSeconds
                });
            }
        }
        None
    }

    pub fn has_time(&self) -> bool {
        matches!(self, DatePattern::DateTimeSeconds | DatePattern::DateTimeMillis)
    }

    /// strftime string used when writing values.
    pub fn storage_format(&self) -> &'static str {
        match self {
            DatePattern::YearMonthDay => "%Y-%m-%d",
            DatePattern::DayMonthYear => "%d-%m-%Y",
            DatePattern::DateTimeSeconds => "%Y-%m-%dT%H:%M:%SZ",
            DatePattern::DateTimeMillis => "%Y-%m-%dT%H:%M:%S%.3fZ",
        }
    }

    /// Normalize user input (display format, ISO-8601, or the storage
    /// shape itself) into the storage shape.
    pub fn normalize(&self, input: &str, display: &DisplayFormat) -> Option<String> {
        let parsed = self.parse(input.trim(), display)?;
        if self.has_time() {
            write_formatted(parsed.format(self.storage_format()))
        } else {
            write_formatted(parsed.date().format(self.storage_format()))
        }
    }

    /// Render a stored value with the display format.
    pub fn to_display(&self, stored: &str, display: &DisplayFormat) -> Option<String> {
        let parsed = self.parse(stored.trim(), display)?;
        if self.has_time() {
            write_formatted(parsed.format(&display.date_time))
        } else {
            write_formatted(parsed.date().format(&display.date))
        }
    }

    fn parse(&self, input: &str, display: &DisplayFormat) -> Option<NaiveDateTime> {
        if input.is_empty() {
            return None;
        }

        // Date-only fields read the calendar date as written, ignoring any
        // time or offset part.
        if !self.has_time() {
            let date_part = input.split('T').next().unwrap_or(input);
            let date_formats = [self.storage_format(), display.date.as_str(), "%Y-%m-%d", "%d-%m-%Y"];
            return date_formats
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN));
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.with_timezone(&Utc).naive_utc());
        }

        let date_time_formats = [
            self.storage_format(),
            display.date_time.as_str(),
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ];
        if let Some(dt) = date_time_formats
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        {
            return Some(dt);
        }

        [display.date.as_str(), "%Y-%m-%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
            .map(|d| d.and_time(NaiveTime::MIN))
    }
}

/// Locale display formats (strftime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayFormat {
    #[serde(default = "default_date_display")]
    pub date: String,
    #[serde(default = "default_date_time_display")]
    pub date_time: String,
}

fn default_date_display() -> String {
    "%d/%m/%Y".to_string()
}

fn default_date_time_display() -> String {
    "%d/%m/%Y %H:%M".to_string()
}

impl Default for DisplayFormat {
    fn default() -> Self {
        Self {
            date: default_date_display(),
            date_time: default_date_time_display(),
        }
    }
}

impl DisplayFormat {
    /// Names of format strings that chrono cannot interpret.
    ///
    /// Each format is trial-rendered against a sample value: specifiers
    /// such as `%z` parse fine but cannot format a naive date.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        let sample = NaiveDate::from_ymd_opt(2024, 1, 31).and_then(|d| d.and_hms_opt(13, 45, 30));

        let date_ok = is_parseable_strftime(&self.date)
            && sample.is_some_and(|dt| write_formatted(dt.date().format(&self.date)).is_some());
        if !date_ok {
            invalid.push("date");
        }
        let date_time_ok = is_parseable_strftime(&self.date_time)
            && sample.is_some_and(|dt| write_formatted(dt.format(&self.date_time)).is_some());
        if !date_time_ok {
            invalid.push("date_time");
        }
        invalid
    }
}

fn is_parseable_strftime(fmt: &str) -> bool {
    !fmt.is_empty() && StrftimeItems::new(fmt).all(|item| !matches!(item, Item::Error))
}

/// Render a chrono formatter, returning `None` when a specifier does not
/// apply to the value instead of panicking like `to_string` would.
fn write_formatted(formatted: impl fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", formatted).ok()?;
    Some(out)
}
