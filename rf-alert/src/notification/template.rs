//! Message templates.
//!
//! Templates may reference the alert description as `{description}` or `{}`.
//! When the code has no description the template is used verbatim.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::config::DEFAULT_TIME_FORMAT;

/// Substitute the description into `template`, or return it unchanged.
pub fn render(template: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => template
            .replace("{description}", description)
            .replace("{}", description),
        None => template.to_string(),
    }
}

/// Render a mail body, prefixed with the alert time when the description resolved.
pub fn render_body(template: &str, description: Option<&str>, timestamp: &str) -> String {
    match description {
        Some(_) => format!("{timestamp}: {}", render(template, description)),
        None => template.to_string(),
    }
}

/// Format `timestamp` with a strftime pattern, falling back to the default
/// pattern when `format` is invalid.
pub fn format_timestamp(timestamp: &DateTime<Local>, format: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", timestamp.format(format)).is_ok() {
        return out;
    }
    timestamp.format(DEFAULT_TIME_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    #[rstest]
    #[case("{description} triggered", Some("garage"), "garage triggered")]
    #[case("Alarm: {}", Some("front door"), "Alarm: front door")]
    #[case("{description} triggered", None, "{description} triggered")]
    #[case("No placeholder", Some("garage"), "No placeholder")]
    fn renders(#[case] template: &str, #[case] description: Option<&str>, #[case] expected: &str) {
        assert_eq!(render(template, description), expected);
    }

    #[test]
    fn body_gets_timestamp_prefix_only_when_resolved() {
        assert_eq!(
            render_body("{description} opened", Some("garage"), "2024-05-01 10:00:00"),
            "2024-05-01 10:00:00: garage opened"
        );
        assert_eq!(
            render_body("{description} opened", None, "2024-05-01 10:00:00"),
            "{description} opened"
        );
    }

    #[test]
    fn formats_with_pattern() {
        let ts = Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts, "%d.%m.%Y %H:%M"), "01.05.2024 10:00");
        assert_eq!(format_timestamp(&ts, "%Q"), "2024-05-01 10:00:00");
    }
}
