use finanzblick_core::Money;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parses a locale-formatted amount cell ("-1.234,56", "1,234.56 €",
/// "(12,50)", "12,50-") into an exact signed amount.
///
/// When both `.` and `,` appear, the right-most one is the decimal separator.
/// A lone `,` is a decimal comma; a lone `.` is a decimal point; repeated
/// separators of one kind are thousands grouping.
pub fn parse_amount(raw: &str) -> Option<Money> {
    let mut cleaned: String = raw.replace("EUR", "");
    cleaned.retain(|c| c != '"' && c != '€' && !c.is_whitespace());

    let mut negative = false;
    let mut body = cleaned.as_str();

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = inner;
    }
    if let Some(rest) = body.strip_suffix('-') {
        negative = !negative;
        body = rest;
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = !negative;
        body = rest;
    } else if let Some(rest) = body.strip_prefix('+') {
        body = rest;
    }

    if !body.chars().any(|c| c.is_ascii_digit())
        || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',')
    {
        return None;
    }

    let value = Decimal::from_str(&canonical_decimal(body)).ok()?;
    Some(Money::from_decimal(if negative { -value } else { value }))
}

/// Rewrites digits plus `.`/`,` separators into dot-decimal form.
fn canonical_decimal(body: &str) -> String {
    let decimal_sep = match (body.rfind('.'), body.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (None, Some(_)) if body.matches(',').count() == 1 => Some(','),
        (Some(_), None) if body.matches('.').count() == 1 => Some('.'),
        _ => None,
    };

    body.chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            c if Some(c) == decimal_sep => Some('.'),
            _ => None,
        })
        .collect()
}
