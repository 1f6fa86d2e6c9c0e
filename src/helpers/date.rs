//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SiteConfig;

/// Errors raised while parsing or formatting dates
#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("unparseable date: {0:?}")]
    Unparseable(String),

    #[error("unknown locale: {0}")]
    UnknownLocale(String),

    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}

/// Formats CMS timestamps for display in the configured locale and timezone
#[derive(Debug, Clone)]
pub struct DateFormatter {
    locale: Locale,
    timezone: Tz,
    short_format: String,
    long_format: String,
}

impl DateFormatter {
    /// Create a formatter from Moment.js-style patterns
    pub fn new(
        language: &str,
        timezone: &str,
        short_format: &str,
        long_format: &str,
    ) -> Result<Self, DateError> {
        let locale = Locale::try_from(language)
            .map_err(|_| DateError::UnknownLocale(language.to_string()))?;
        let timezone = timezone
            .parse::<Tz>()
            .map_err(|_| DateError::UnknownTimezone(timezone.to_string()))?;

        Ok(Self {
            locale,
            timezone,
            short_format: moment_to_chrono_format(short_format),
            long_format: moment_to_chrono_format(long_format),
        })
    }

    /// Create a formatter from the site configuration
    pub fn from_config(config: &SiteConfig) -> Result<Self, DateError> {
        Self::new(
            &config.language,
            &config.timezone,
            &config.date_format,
            &config.datetime_format,
        )
    }

    /// Short form, e.g. "25 mar 2021"
    pub fn short(&self, input: &str) -> Result<String, DateError> {
        let date = parse_date(input)?.with_timezone(&self.timezone);
        Ok(format_date(&date, &self.short_format, self.locale))
    }

    /// Long form with time of day, e.g. "25 mar 2021, às 12:00"
    pub fn long(&self, input: &str) -> Result<String, DateError> {
        let date = parse_date(input)?.with_timezone(&self.timezone);
        Ok(format_date(&date, &self.long_format, self.locale))
    }
}

/// Parse a CMS timestamp.
///
/// Accepts RFC 3339, the `2021-03-25T19:25:28+0000` form the CMS emits and
/// bare `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_date(input: &str) -> Result<DateTime<FixedOffset>, DateError> {
    let input = input.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date);
    }

    for pattern in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
        if let Ok(date) = DateTime::parse_from_str(input, pattern) {
            return Ok(date);
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Utc.from_utc_datetime(&midnight).fixed_offset());
    }

    Err(DateError::Unparseable(input.to_string()))
}

/// Format a date with a chrono pattern in the given locale
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, format: &str, locale: Locale) -> String
where
    Tz::Offset: std::fmt::Display,
{
    date.format_localized(format, locale).to_string()
}

/// Convert Moment.js format to chrono format
fn moment_to_chrono_format(format: &str) -> String {
    // Longest tokens first within each category
    let replacements = [
        // Year
        ("YYYY", "%Y"),
        ("YY", "%y"),
        // Month
        ("MMMM", "%B"),
        ("MMM", "%b"),
        ("MM", "%m"),
        // Day of month
        ("DD", "%d"),
        // Hour 24h
        ("HH", "%H"),
        // Hour 12h
        ("hh", "%I"),
        // Minute (after MM is gone)
        ("mm", "%M"),
        // Second
        ("ss", "%S"),
        // Day of week
        ("dddd", "%A"),
        ("ddd", "%a"),
    ];

    let mut result = format.to_string();

    for (from, to) in replacements {
        result = result.replace(from, to);
    }

    result
}
