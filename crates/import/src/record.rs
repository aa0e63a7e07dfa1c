use chrono::NaiveDate;
use finanzblick_core::{Money, Transaction};
use std::collections::BTreeMap;

/// Booking date as a mapper left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawDate {
    Parsed(NaiveDate),
    /// Cell text the date parser could not read; re-parsed during normalization.
    Unparsed(String),
}

/// One data row after column mapping, before repair. Every field may be unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub booking_date: Option<RawDate>,
    pub amount: Option<Money>,
    pub purpose: Option<String>,
    pub raw_text: Option<String>,
    pub counterparty_name: Option<String>,
    pub counterparty_id: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl RawRecord {
    pub(crate) fn set_date_text(&mut self, value: &str) {
        self.booking_date = Some(match crate::date::try_parse_date(value) {
            Some(date) => RawDate::Parsed(date),
            None => RawDate::Unparsed(value.to_string()),
        });
    }
}

impl From<Transaction> for RawRecord {
    fn from(tx: Transaction) -> Self {
        RawRecord {
            booking_date: Some(RawDate::Parsed(tx.booking_date)),
            amount: Some(tx.amount),
            purpose: Some(tx.purpose),
            raw_text: tx.raw_text,
            counterparty_name: tx.counterparty_name,
            counterparty_id: tx.counterparty_id,
            extra: tx.extra,
        }
    }
}
