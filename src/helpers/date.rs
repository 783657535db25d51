//! Date helper functions

use chrono::{DateTime, FixedOffset, Locale, TimeZone};
use chrono_tz::Tz;

/// Parse a CMS publication date
///
/// The CMS emits `2021-03-25T19:25:28+0000`; RFC 3339 is accepted as well.
pub fn parse_publication_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

/// Resolve a timezone name, falling back to UTC
pub fn resolve_timezone(name: &str) -> Tz {
    if name.is_empty() {
        return Tz::UTC;
    }
    name.parse::<Tz>().unwrap_or_else(|_| {
        tracing::warn!("Unknown timezone {:?}, using UTC", name);
        Tz::UTC
    })
}

/// Format a date with a date-fns style pattern (`dd MMM yyyy`)
///
/// Month names follow `language` (`pt-BR` gives `mar`, `março`); unknown
/// languages use the POSIX locale.
///
/// # Examples
/// ```ignore
/// format_date(&date, "dd MMM yyyy", "pt-BR") // -> "25 mar 2021"
/// ```
pub fn format_date<Tz2: TimeZone>(date: &DateTime<Tz2>, format: &str, language: &str) -> String
where
    Tz2::Offset: std::fmt::Display,
{
    let chrono_format = date_fns_to_chrono_format(format);
    date.format_localized(&chrono_format, locale(language))
        .to_string()
}

fn locale(language: &str) -> Locale {
    Locale::try_from(language.replace('-', "_").as_str()).unwrap_or(Locale::POSIX)
}

/// Convert a date-fns pattern to a chrono format string
///
/// Supported tokens: `yyyy`, `yy`, `MMMM`, `MMM`, `MM`, `M`, `dd`, `d`,
/// `HH`, `H`, `mm`, `m`, `ss`, `s`. Text between single quotes is literal.
fn date_fns_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != '\'' {
                push_literal(&mut out, chars[i]);
                i += 1;
            }
            i += 1;
            continue;
        }

        let mut run = 1;
        while i + run < chars.len() && chars[i + run] == c {
            run += 1;
        }

        let specifier = match (c, run) {
            ('y', 2) => "%y",
            ('y', _) => "%Y",
            ('M', 1) => "%-m",
            ('M', 2) => "%m",
            ('M', 3) => "%b",
            ('M', _) => "%B",
            ('d', 1) => "%-d",
            ('d', _) => "%d",
            ('H', 1) => "%-H",
            ('H', _) => "%H",
            ('m', 1) => "%-M",
            ('m', _) => "%M",
            ('s', 1) => "%-S",
            ('s', _) => "%S",
            _ => {
                for _ in 0..run {
                    push_literal(&mut out, c);
                }
                i += run;
                continue;
            }
        };
        out.push_str(specifier);
        i += run;
    }

    out
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}

/// Format a publication date for display in the site timezone
pub fn format_publication_date(
    date: &DateTime<FixedOffset>,
    format: &str,
    language: &str,
    timezone: &Tz,
) -> String {
    format_date(&date.with_timezone(timezone), format, language)
}
