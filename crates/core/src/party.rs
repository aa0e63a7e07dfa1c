//! Best-effort counterparty extraction for grouping and exclusion filters.
//!
//! None of this is authoritative party identification. The heuristics only
//! have to produce stable, human-readable labels for Pareto charts and
//! substring exclusion terms.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::transaction::{Transaction, NO_PURPOSE};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_recipient_in_text,
    r"(?i)\b(?:bei|an|für|in)\s+([A-ZÄÖÜß0-9\s]+)(?:\s|$)");
re!(re_sender_in_text,
    r"(?i)\b(?:von|durch|aus)\s+([A-ZÄÖÜß0-9\s]+)(?:\s|$)");
// POS <terminal> <code> <time> <NAME>
re!(re_point_of_sale,
    r"(?i)\bPOS\s+[0-9]+\s+[A-Z0-9]+\s+[0-9:.]+\s+([A-ZÄÖÜß0-9\s]+)");

const PURPOSE_PREFIX_CHARS: usize = 20;

/// Which side of the transaction we are naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartyRole {
    /// Payer of an inflow.
    Sender,
    /// Payee of an outflow.
    Recipient,
}

impl PartyRole {
    pub fn for_amount(amount: Money) -> Self {
        if amount.is_inflow() {
            PartyRole::Sender
        } else {
            PartyRole::Recipient
        }
    }

    pub fn default_label(self) -> &'static str {
        match self {
            PartyRole::Sender => "Sonstige Einnahme",
            PartyRole::Recipient => "Sonstiger Empfänger",
        }
    }
}

/// Tries, in order: the structured counterparty field, a role-specific
/// preposition pattern in the raw bank text, a point-of-sale pattern in the
/// purpose, and finally the first characters of the purpose.
pub fn extract_counterparty(tx: &Transaction, role: PartyRole) -> Option<String> {
    if let Some(name) = non_blank(tx.counterparty_name.as_deref()) {
        return Some(name.to_string());
    }

    if let Some(name) = tx
        .raw_text
        .as_deref()
        .and_then(|text| from_raw_text(text, role))
    {
        return Some(name);
    }

    non_blank(Some(tx.purpose.as_str()))
        .filter(|p| *p != NO_PURPOSE)
        .and_then(from_purpose)
}

/// Like [`extract_counterparty`] but falls back to the role's default label.
pub fn resolve_counterparty(tx: &Transaction, role: PartyRole) -> String {
    extract_counterparty(tx, role).unwrap_or_else(|| role.default_label().to_string())
}

fn from_raw_text(text: &str, role: PartyRole) -> Option<String> {
    let re = match role {
        PartyRole::Recipient => re_recipient_in_text(),
        PartyRole::Sender => re_sender_in_text(),
    };
    first_capture(re, text)
}

fn from_purpose(purpose: &str) -> Option<String> {
    first_capture(re_point_of_sale(), purpose).or_else(|| {
        let prefix: String = purpose.chars().take(PURPOSE_PREFIX_CHARS).collect();
        non_blank(Some(prefix.as_str())).map(str::to_string)
    })
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .and_then(|m| non_blank(Some(m.as_str())))
        .map(str::to_string)
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
