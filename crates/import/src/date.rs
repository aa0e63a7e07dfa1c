use chrono::{DateTime, Local, NaiveDate};
use tracing::warn;

/// Parses European and ISO booking dates: `DD.MM.YYYY`, `DD.MM.YY`,
/// `YYYY-MM-DD`, `DD-MM-YYYY`, `DD/MM/YYYY`, then RFC 3339/2822 and a few
/// unseparated forms. Time suffixes after the day are ignored.
pub fn try_parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace('"', "");
    let s = cleaned.trim();
    if s.is_empty() {
        return None;
    }

    if s.contains('.') {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() >= 3 {
            if let Some(date) = from_parts(parts[2], parts[1], parts[0]) {
                return Some(date);
            }
        }
    }

    if s.contains('-') {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() >= 3 {
            if parts[0].trim().len() == 4 {
                if let Some(date) = from_parts(parts[0], parts[1], parts[2]) {
                    return Some(date);
                }
            }
            if let Some(date) = from_parts(parts[2], parts[1], parts[0]) {
                return Some(date);
            }
        }
    }

    if s.contains('/') {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() >= 3 {
            if let Some(date) = from_parts(parts[2], parts[1], parts[0]) {
                return Some(date);
            }
        }
    }

    parse_free_form(s)
}

/// Total variant: unparseable input yields today's date.
pub fn parse_date(raw: &str) -> NaiveDate {
    parse_date_or(raw, today())
}

pub fn parse_date_or(raw: &str, fallback: NaiveDate) -> NaiveDate {
    try_parse_date(raw).unwrap_or_else(|| {
        warn!(input = raw, "unrecognized date format, using fallback date");
        fallback
    })
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn from_parts(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let (year, year_digits) = leading_number(year)?;
    let (month, _) = leading_number(month)?;
    let (day, _) = leading_number(day)?;
    let year = if year_digits <= 2 { year + 2000 } else { year };
    NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)
}

/// Integer value of the leading digit run, with its digit count.
fn leading_number(part: &str) -> Option<(u32, usize)> {
    let digits: String = part
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value = digits.parse().ok()?;
    Some((value, digits.len()))
}

fn parse_free_form(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    // YYYYMMDD
    if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
        return from_parts(&s[..4], &s[4..6], &s[6..]);
    }
    for fmt in ["%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── dotted ────────────────────────────────────────────────────────────────

    #[test]
    fn dotted_four_digit_year() {
        assert_eq!(try_parse_date("01.03.2024"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn dotted_two_digit_year() {
        assert_eq!(try_parse_date("15.01.24"), Some(date(2024, 1, 15)));
    }

    #[test]
    fn dotted_with_quotes_and_time() {
        assert_eq!(try_parse_date("\" 1.3.2024 12:00\""), Some(date(2024, 3, 1)));
    }

    // ── dashed / slashed ──────────────────────────────────────────────────────

    #[test]
    fn iso_dashed() {
        assert_eq!(try_parse_date("2024-03-01"), Some(date(2024, 3, 1)));
        assert_eq!(try_parse_date("2024-03-01T08:15:00Z"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn day_first_dashed() {
        assert_eq!(try_parse_date("01-03-2024"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn day_first_slashed() {
        assert_eq!(try_parse_date("01/03/2024"), Some(date(2024, 3, 1)));
        assert_eq!(try_parse_date("01/03/24"), Some(date(2024, 3, 1)));
    }

    // ── free form ─────────────────────────────────────────────────────────────

    #[test]
    fn compact_and_named_month() {
        assert_eq!(try_parse_date("20240301"), Some(date(2024, 3, 1)));
        assert_eq!(try_parse_date("1 March 2024"), Some(date(2024, 3, 1)));
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        assert_eq!(try_parse_date("31.02.2024"), None);
        assert_eq!(try_parse_date("00.01.2024"), None);
    }

    // ── totality ──────────────────────────────────────────────────────────────

    #[test]
    fn garbage_falls_back() {
        let fallback = date(2000, 1, 1);
        for input in ["", "   ", "morgen", "..", "--", "//", "1.2", "99999999999.1.1"] {
            assert_eq!(parse_date_or(input, fallback), fallback, "input {input:?}");
        }
    }

    #[test]
    fn parse_date_never_panics_on_odd_input() {
        for input in ["\u{feff}01.01.2024", "٣.٣.٢٠٢٤", "1.1.1.1.1", "-", "2024-13-45"] {
            let _ = parse_date(input);
        }
    }
}
