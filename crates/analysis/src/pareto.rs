use std::collections::HashMap;

use finanzblick_core::{resolve_counterparty, Money, PartyRole, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParetoEntry {
    pub name: String,
    /// Absolute sum for this counterparty.
    pub total: Money,
    pub count: usize,
    /// Running share of the kept groups' grand total, in percent.
    pub cumulative_percent: Decimal,
}

/// Groups outflows by recipient (or inflows by sender), largest first.
/// Ties are ordered by name. `limit` keeps only the top groups; percentages
/// are computed over what is kept.
pub fn pareto<'a, I>(txs: I, role: PartyRole, limit: Option<usize>) -> Vec<ParetoEntry>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut groups: HashMap<String, (Money, usize)> = HashMap::new();
    for tx in txs {
        let relevant = match role {
            PartyRole::Recipient => tx.is_expense(),
            PartyRole::Sender => tx.is_income(),
        };
        if !relevant {
            continue;
        }
        let entry = groups
            .entry(resolve_counterparty(tx, role))
            .or_insert((Money::zero(), 0));
        entry.0 = entry.0 + tx.amount.abs();
        entry.1 += 1;
    }

    let mut sorted: Vec<(String, (Money, usize))> = groups.into_iter().collect();
    sorted.sort_by(|(a_name, (a_total, _)), (b_name, (b_total, _))| {
        b_total.cmp(a_total).then_with(|| a_name.cmp(b_name))
    });
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }

    let grand_total: Money = sorted.iter().map(|(_, (total, _))| *total).sum();
    let mut running = Money::zero();
    sorted
        .into_iter()
        .map(|(name, (total, count))| {
            running = running + total;
            ParetoEntry {
                name,
                total,
                count,
                cumulative_percent: percent(running, grand_total),
            }
        })
        .collect()
}

fn percent(part: Money, whole: Money) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    let (part, whole) = (part.as_decimal(), whole.as_decimal());
    let share = match part.checked_mul(Decimal::ONE_HUNDRED) {
        Some(scaled) => scaled / whole,
        None => part / whole * Decimal::ONE_HUNDRED,
    };
    share.round_dp(2)
}

/// Shortens chart labels to `max` characters plus an ellipsis.
pub fn truncate_label(label: &str, max: usize) -> String {
    if label.chars().count() <= max {
        return label.to_string();
    }
    let mut short: String = label.chars().take(max).collect();
    short.push('…');
    short
}
