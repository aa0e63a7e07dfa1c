use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::money::Money;
use super::period::DateRange;

/// Placeholder purpose for rows whose export carried no memo.
pub const NO_PURPOSE: &str = "Keine Beschreibung";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportBatchId(pub i64);

impl fmt::Display for ImportBatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical bank transaction. Every value of this type has a real booking
/// date and an exact amount; the import pipeline repairs rather than rejects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub booking_date: NaiveDate,
    pub amount: Money,
    pub purpose: String,
    /// Payer for inflows, payee for outflows.
    pub counterparty_name: Option<String>,
    /// Secondary identifier split off a "Name, Identifier" column (IBAN, creditor id).
    pub counterparty_id: Option<String>,
    /// Bank-specific free-text description ("Buchungstext").
    pub raw_text: Option<String>,
    /// Set once persisted.
    pub source_file_id: Option<ImportBatchId>,
    /// Unrecognized columns, verbatim under their original header.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Transaction {
    pub fn new(booking_date: NaiveDate, amount: Money, purpose: impl Into<String>) -> Self {
        Transaction {
            booking_date,
            amount,
            purpose: purpose.into(),
            counterparty_name: None,
            counterparty_id: None,
            raw_text: None,
            source_file_id: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_income(&self) -> bool {
        self.amount.is_inflow()
    }

    pub fn is_expense(&self) -> bool {
        self.amount.is_outflow()
    }
}

/// One persisted file import. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: ImportBatchId,
    /// Generated display name, e.g. "Umsatzübersicht 2024 März".
    pub name: String,
    pub original_name: String,
    pub import_date: DateTime<Utc>,
    pub transaction_count: usize,
    pub period: DateRange,
}
