use std::collections::BTreeMap;

use finanzblick_core::{Money, Transaction};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const OTHER_INCOME: &str = "Sonstige Einnahmen";
pub const OTHER_EXPENSES: &str = "Sonstige Ausgaben";

#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

/// Shape of a rules file: a list of `[[rules]]` tables.
#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

struct CompiledRule {
    rule: CategoryRule,
    compiled_regex: Option<Regex>,
}

/// Keyword categorization over purpose, bank text and counterparty.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

/// Built-in keyword table, in descending priority.
const DEFAULT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Lebensmittel", &["supermarkt", "aldi", "lidl", "rewe", "edeka", "kaufland", "netto", "lebensmittel"]),
    ("Wohnen", &["miete", "strom", "gas", "wasser", "nebenkosten", "hausverwaltung", "wohnung"]),
    ("Transport", &["benzin", "tankstelle", "auto", "kfz", "versicherung", "bahn", "ticket", "fahrschein"]),
    ("Unterhaltung", &["kino", "restaurant", "café", "bar", "club", "veranstaltung"]),
    ("Einkommen", &["gehalt", "lohn", "einkommen", "überweisung", "zinsen", "dividende"]),
    ("Gesundheit", &["apotheke", "arzt", "medizin", "krankenhaus", "therapie"]),
    ("Bildung", &["schule", "studium", "kurs", "seminar", "buch"]),
    ("Kleidung", &["h&m", "zara", "c&a", "mode", "kleidung", "schuhe"]),
    ("Telekommunikation", &["handy", "telefon", "mobilfunk", "internet", "dsl", "vodafone", "telekom", "o2"]),
];

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if let MatchType::Regex = &rule.match_type {
                    match Regex::new(&rule.pattern) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(pattern = %rule.pattern, error = %e, "invalid rule regex, rule disabled");
                            None
                        }
                    }
                } else {
                    None
                };
                CompiledRule { rule, compiled_regex }
            })
            .collect();
        // Highest priority first; the sort is stable so file order breaks ties.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    /// German keyword rules for everyday household spending.
    pub fn with_defaults() -> Self {
        let count = DEFAULT_KEYWORDS.len() as i32;
        let rules = DEFAULT_KEYWORDS
            .iter()
            .enumerate()
            .flat_map(|(idx, (category, words))| {
                words.iter().map(move |word| CategoryRule {
                    category: category.to_string(),
                    priority: count - idx as i32,
                    pattern: word.to_string(),
                    match_type: MatchType::Contains,
                })
            })
            .collect();
        Self::new(rules)
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Ok(Self::new(file.rules))
    }

    pub fn find_matching_rule(&self, tx: &Transaction) -> Option<&CategoryRule> {
        let text = match_text(tx);
        let lowered = text.to_lowercase();
        self.rules
            .iter()
            .find(|cr| rule_matches(cr, &text, &lowered))
            .map(|cr| &cr.rule)
    }

    /// Matching rule's category, else a sign-based fallback.
    pub fn categorize(&self, tx: &Transaction) -> String {
        match self.find_matching_rule(tx) {
            Some(rule) => rule.category.clone(),
            None if tx.is_income() => OTHER_INCOME.to_string(),
            None => OTHER_EXPENSES.to_string(),
        }
    }

    /// Absolute totals and counts per category.
    pub fn totals<'a, I>(&self, txs: I) -> BTreeMap<String, CategoryTotal>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals: BTreeMap<String, CategoryTotal> = BTreeMap::new();
        for tx in txs {
            let entry = totals.entry(self.categorize(tx)).or_default();
            entry.total = entry.total + tx.amount.abs();
            entry.count += 1;
        }
        totals
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub total: Money,
    pub count: usize,
}

fn match_text(tx: &Transaction) -> String {
    [
        Some(tx.purpose.as_str()),
        tx.raw_text.as_deref(),
        tx.counterparty_name.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn rule_matches(cr: &CompiledRule, text: &str, lowered: &str) -> bool {
    let pattern = cr.rule.pattern.to_lowercase();
    match &cr.rule.match_type {
        MatchType::Contains => lowered.contains(&pattern),
        MatchType::Exact => lowered == pattern,
        MatchType::Regex => cr
            .compiled_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text)),
    }
}
