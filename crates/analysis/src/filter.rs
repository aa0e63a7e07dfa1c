use std::collections::BTreeSet;

use finanzblick_core::{resolve_counterparty, DateRange, PartyRole, Settings, Transaction};

/// Transactions inside `range` whose counterparty is not excluded by the
/// user's settings. Income terms are checked against the sender of inflows,
/// expense terms against the recipient of everything else.
pub fn filter_transactions<'a, I>(txs: I, range: DateRange, settings: &Settings) -> Vec<&'a Transaction>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    txs.into_iter()
        .filter(|tx| range.contains(tx.booking_date))
        .filter(|tx| !is_excluded(tx, settings))
        .collect()
}

pub fn is_excluded(tx: &Transaction, settings: &Settings) -> bool {
    let (role, terms) = if tx.is_income() {
        (PartyRole::Sender, &settings.excluded_income_terms)
    } else {
        (PartyRole::Recipient, &settings.excluded_expense_terms)
    };
    if terms.is_empty() {
        return false;
    }
    let party = resolve_counterparty(tx, role).to_lowercase();
    matches_any(&party, terms)
}

fn matches_any(party: &str, terms: &BTreeSet<String>) -> bool {
    terms.iter().any(|term| party.contains(&term.to_lowercase()))
}
