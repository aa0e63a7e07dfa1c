use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDate};
use finanzblick_core::{DateRange, Money, Transaction};
use serde::{Deserialize, Serialize};

/// Totals over a set of transactions. `expenses` is reported as a positive
/// amount; `balance` is `income - expenses`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub count: usize,
    pub income: Money,
    pub expenses: Money,
    pub balance: Money,
    pub period: Option<DateRange>,
}

impl Summary {
    pub fn from_transactions<'a, I>(txs: I) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut bucket = Bucket::default();
        let mut period: Option<DateRange> = None;
        for tx in txs {
            bucket.add(tx);
            period = Some(match period {
                None => DateRange::new(tx.booking_date, tx.booking_date),
                Some(r) => DateRange::new(r.start.min(tx.booking_date), r.end.max(tx.booking_date)),
            });
        }
        Summary {
            count: bucket.count,
            income: bucket.income,
            expenses: bucket.expenses,
            balance: bucket.balance(),
            period,
        }
    }
}

/// Per-day or per-month aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub income: Money,
    /// Positive sum of outflows.
    pub expenses: Money,
    pub count: usize,
}

impl Bucket {
    fn add(&mut self, tx: &Transaction) {
        if tx.is_income() {
            self.income = self.income + tx.amount;
        } else {
            self.expenses = self.expenses + tx.amount.abs();
        }
        self.count += 1;
    }

    pub fn balance(&self) -> Money {
        self.income - self.expenses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl From<NaiveDate> for YearMonth {
    fn from(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

pub fn group_by_day<'a, I>(txs: I) -> BTreeMap<NaiveDate, Bucket>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    group_by(txs, |date| date)
}

pub fn group_by_month<'a, I>(txs: I) -> BTreeMap<YearMonth, Bucket>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    group_by(txs, YearMonth::from)
}

fn group_by<'a, I, K, F>(txs: I, key: F) -> BTreeMap<K, Bucket>
where
    I: IntoIterator<Item = &'a Transaction>,
    K: Ord,
    F: Fn(NaiveDate) -> K,
{
    let mut groups: BTreeMap<K, Bucket> = BTreeMap::new();
    for tx in txs {
        groups.entry(key(tx.booking_date)).or_default().add(tx);
    }
    groups
}
