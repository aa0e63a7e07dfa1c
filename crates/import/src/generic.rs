use std::sync::OnceLock;

use chrono::NaiveDate;
use finanzblick_core::Money;
use regex::Regex;
use tracing::debug;

use crate::amount::parse_amount;
use crate::date::{today, try_parse_date};
use crate::detect::BankFormat;
use crate::mapper::{apply_cell, split_line, ColumnRole, MapError, StatementMapper};
use crate::record::{RawDate, RawRecord};

/// Header search window.
const HEADER_SCAN_LINES: usize = 20;
const MIN_COLUMNS: usize = 3;
const FALLBACK_PURPOSE_CHARS: usize = 100;
/// Tried in order; the first that splits the header into `MIN_COLUMNS` wins.
const DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date_shaped, r"^\d{1,2}[./-]\d{1,2}[./-]\d{2,4}");
re!(re_signed_decimal, r"^[+-]?\(?\d[\d.,]*\)?-?$");

/// Fallback for unknown exports. Infers header, delimiter and columns from
/// keywords and always emits a best-effort record per data row.
pub struct GenericMapper {
    fallback_date: Option<NaiveDate>,
}

impl GenericMapper {
    pub fn new() -> Self {
        Self { fallback_date: None }
    }

    /// Pins the date used for rows without any recognizable date.
    pub fn with_fallback_date(date: NaiveDate) -> Self {
        Self {
            fallback_date: Some(date),
        }
    }
}

impl Default for GenericMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementMapper for GenericMapper {
    fn format(&self) -> BankFormat {
        BankFormat::Generic
    }

    fn map(&self, content: &str) -> Result<Vec<RawRecord>, MapError> {
        let lines: Vec<&str> = content.lines().collect();
        let header_idx = find_header(&lines);
        let header_line = lines.get(header_idx).ok_or(MapError::MissingHeader)?;
        let delimiter = infer_delimiter(header_line)?;
        debug!(
            header_line = header_idx,
            delimiter = %char::from(delimiter).escape_default(),
            "generic header"
        );

        let headers = split_line(header_line, delimiter)?;
        let roles: Vec<Option<ColumnRole>> = headers.iter().map(|h| classify(h)).collect();
        let has_date_column = roles.contains(&Some(ColumnRole::BookingDate));
        let has_amount_column = roles.contains(&Some(ColumnRole::Amount));
        let fallback_date = self.fallback_date.unwrap_or_else(today);

        let mut records = Vec::new();
        for line in &lines[header_idx + 1..] {
            if line.trim().is_empty() {
                continue;
            }
            let cells = split_line(line, delimiter)?;
            if cells.len() < MIN_COLUMNS {
                continue;
            }

            let mut record = RawRecord::default();
            for (idx, header) in headers.iter().enumerate() {
                let value = cells.get(idx).map(String::as_str).unwrap_or("");
                apply_cell(&mut record, header, roles[idx], value);
            }

            if !has_date_column {
                record.booking_date = guess_date(&cells).map(RawDate::Parsed);
            }
            if !has_amount_column {
                record.amount = guess_amount(&cells);
            }

            if record.booking_date.is_none() {
                record.booking_date = Some(RawDate::Parsed(fallback_date));
            }
            if record.amount.is_none() {
                record.amount = Some(Money::zero());
            }
            if record.purpose.is_none() {
                record.purpose = Some(cells.join(" ").chars().take(FALLBACK_PURPOSE_CHARS).collect());
            }

            records.push(record);
        }

        debug!(rows = records.len(), "mapped generic rows");
        Ok(records)
    }
}

fn find_header(lines: &[&str]) -> usize {
    lines
        .iter()
        .take(HEADER_SCAN_LINES)
        .position(|line| {
            let line = line.to_lowercase();
            contains_any(&line, &["datum", "date", "buchungstag"])
                && contains_any(&line, &["betrag", "amount", "umsatz", "wert"])
        })
        .unwrap_or(0)
}

fn infer_delimiter(header: &str) -> Result<u8, MapError> {
    for delimiter in DELIMITERS {
        if split_line(header, delimiter)?.len() >= MIN_COLUMNS {
            return Ok(delimiter);
        }
    }
    Ok(DELIMITERS[0])
}

/// Loose substring classification for unknown headers.
fn classify(header: &str) -> Option<ColumnRole> {
    let h = header.to_lowercase();
    if contains_any(&h, &["datum", "date", "buchungstag"]) {
        Some(ColumnRole::BookingDate)
    } else if contains_any(&h, &["betrag", "amount", "umsatz"]) {
        Some(ColumnRole::Amount)
    } else if contains_any(&h, &["verwendungszweck", "zweck", "purpose", "memo", "beschreibung", "description"]) {
        Some(ColumnRole::Purpose)
    } else if contains_any(&h, &["buchungstext", "vorgang", "text"]) {
        Some(ColumnRole::RawText)
    } else if contains_any(&h, &["empfänger", "recipient", "zahler", "auftraggeber", "payee", "name"]) {
        Some(ColumnRole::Counterparty)
    } else {
        None
    }
}

fn guess_date(cells: &[String]) -> Option<NaiveDate> {
    cells
        .first()
        .filter(|c| re_date_shaped().is_match(c))
        .and_then(|c| try_parse_date(c))
}

/// First cell that looks like a signed decimal and is not a date.
fn guess_amount(cells: &[String]) -> Option<Money> {
    cells
        .iter()
        .filter(|c| !re_date_shaped().is_match(c) && re_signed_decimal().is_match(c))
        .find_map(|c| parse_amount(c))
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
