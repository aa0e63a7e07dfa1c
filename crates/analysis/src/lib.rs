//! Aggregations over imported transactions: filtering, period summaries,
//! counterparty rankings and keyword categorization.

pub mod filter;
pub mod pareto;
pub mod rules;
pub mod summary;

pub use filter::{filter_transactions, is_excluded};
pub use pareto::{pareto, truncate_label, ParetoEntry};
pub use rules::{CategoryRule, CategoryRuleEngine, CategoryTotal, MatchType, RuleError, OTHER_EXPENSES, OTHER_INCOME};
pub use summary::{group_by_day, group_by_month, Bucket, Summary, YearMonth};
