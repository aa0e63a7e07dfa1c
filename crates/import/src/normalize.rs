use chrono::NaiveDate;
use finanzblick_core::{Money, Transaction, NO_PURPOSE};
use tracing::warn;

use crate::date::{parse_date_or, today};
use crate::record::{RawDate, RawRecord};

/// Repairs every record into a complete [`Transaction`]. Records are never
/// dropped and order is preserved.
pub fn normalize(records: Vec<RawRecord>) -> Vec<Transaction> {
    normalize_with_today(records, today())
}

/// [`normalize`] with a pinned fallback date.
pub fn normalize_with_today(records: Vec<RawRecord>, today: NaiveDate) -> Vec<Transaction> {
    records
        .into_iter()
        .enumerate()
        .map(|(row, record)| repair(row, record, today))
        .collect()
}

fn repair(row: usize, record: RawRecord, today: NaiveDate) -> Transaction {
    let booking_date = match record.booking_date {
        Some(RawDate::Parsed(date)) => date,
        Some(RawDate::Unparsed(text)) => parse_date_or(&text, today),
        None => {
            warn!(row, "missing booking date, using today");
            today
        }
    };

    let amount = record.amount.unwrap_or_else(|| {
        warn!(row, "missing amount, using 0");
        Money::zero()
    });

    let purpose = match record.purpose {
        Some(p) if !p.trim().is_empty() => p,
        _ => NO_PURPOSE.to_string(),
    };

    Transaction {
        booking_date,
        amount,
        purpose,
        raw_text: record.raw_text,
        counterparty_name: record.counterparty_name,
        counterparty_id: record.counterparty_id,
        source_file_id: None,
        extra: record.extra,
    }
}
