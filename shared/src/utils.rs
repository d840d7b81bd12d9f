use chrono::{DateTime, Datelike, FixedOffset, TimeZone};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub name: String,
    pub email: String,
}

/// Splits a `Display Name <user@example.com>` header value into its parts.
///
/// Values without an angle-bracket address are returned as both name and email.
pub fn parse_email_address(address: &str) -> EmailAddress {
    if let Some(inner) = address.strip_suffix('>') {
        // The display name must be at least one character long.
        let open = inner
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '<')
            .map(|(idx, _)| idx);

        if let Some(open) = open {
            let email = &inner[open + 1..];
            if !email.is_empty() {
                let name = inner[..open].replace('"', "").trim().to_string();
                return EmailAddress {
                    name,
                    email: email.to_string(),
                };
            }
        }
    }

    EmailAddress {
        name: address.to_string(),
        email: address.to_string(),
    }
}

/// Shortens `value` to at most `max_chars` characters, ending with `...` when cut.
pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = value.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Parses an RFC 2822 `Date` header, tolerating a trailing `(UTC)`-style comment.
pub fn parse_email_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = value.trim();
    if let Ok(date) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(date);
    }

    let without_comment = match trimmed.rfind('(') {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => return None,
    };
    DateTime::parse_from_rfc2822(without_comment).ok()
}

/// Formats a timestamp for list display relative to `now`: time of day for
/// today, month and day within the current year, full date otherwise.
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if date.date_naive() == now.date_naive() {
        date.format("%-I:%M %p").to_string()
    } else if date.year() == now.year() {
        date.format("%b %-d").to_string()
    } else {
        date.format("%b %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_named_address() {
        let parsed = parse_email_address("\"Jane Doe\" <jane@example.com>");
        assert_eq!(parsed.name, "Jane Doe");
        assert_eq!(parsed.email, "jane@example.com");

        let parsed = parse_email_address("Bob   <bob@example.com>");
        assert_eq!(parsed.name, "Bob");
        assert_eq!(parsed.email, "bob@example.com");
    }

    #[test]
    fn test_parse_bare_address() {
        let parsed = parse_email_address("plain@example.com");
        assert_eq!(parsed.name, "plain@example.com");
        assert_eq!(parsed.email, "plain@example.com");

        // No display name before the bracket
        let parsed = parse_email_address("<only@example.com>");
        assert_eq!(parsed.email, "<only@example.com>");

        let parsed = parse_email_address("Name <>");
        assert_eq!(parsed.name, "Name <>");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("this is too long", 10), "this is...");
        assert_eq!(truncate("héllo wörld", 8), "héllo...");
        assert_eq!(truncate("abcdef", 2), "...");
    }

    #[test]
    fn test_parse_email_date() {
        let date = parse_email_date("Mon, 1 Jan 2024 10:00:00 +0000").unwrap();
        assert_eq!(date.timestamp(), 1704103200);

        let date = parse_email_date("Mon, 1 Jan 2024 10:00:00 +0000 (UTC)").unwrap();
        assert_eq!(date.timestamp(), 1704103200);

        assert!(parse_email_date("yesterday").is_none());
    }

    #[test]
    fn test_format_date_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 18, 0, 0).unwrap();

        let today = Utc.with_ymd_and_hms(2024, 6, 15, 9, 5, 0).unwrap();
        assert_eq!(format_date(&today, &now), "9:05 AM");

        let this_year = Utc.with_ymd_and_hms(2024, 1, 3, 9, 5, 0).unwrap();
        assert_eq!(format_date(&this_year, &now), "Jan 3");

        let last_year = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(format_date(&last_year, &now), "Dec 31, 2023");
    }
}
