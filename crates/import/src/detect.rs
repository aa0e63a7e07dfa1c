use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Number of leading lines inspected for bank fingerprints.
const DETECT_LINES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankFormat {
    Sparkasse,
    Dkb,
    Ing,
    Comdirect,
    Generic,
}

impl fmt::Display for BankFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BankFormat::Sparkasse => write!(f, "Sparkasse"),
            BankFormat::Dkb => write!(f, "DKB"),
            BankFormat::Ing => write!(f, "ING"),
            BankFormat::Comdirect => write!(f, "Comdirect"),
            BankFormat::Generic => write!(f, "Generic"),
        }
    }
}

/// Fingerprints in priority order: bank name or characteristic header
/// fragment, both lower-case. First hit wins.
const FINGERPRINTS: &[Fingerprint] = &[
    Fingerprint {
        format: BankFormat::Sparkasse,
        name: "sparkasse",
        whole_word: false,
        header: "buchungstag;wertstellung;",
    },
    Fingerprint {
        format: BankFormat::Dkb,
        name: "dkb",
        whole_word: true,
        header: "buchungstag;wertstellung;buchungstext;",
    },
    Fingerprint {
        format: BankFormat::Ing,
        name: "ing",
        whole_word: true,
        header: "buchung;valuta;",
    },
    Fingerprint {
        format: BankFormat::Comdirect,
        name: "comdirect",
        whole_word: false,
        header: "buchungstag;valuta;",
    },
];

struct Fingerprint {
    format: BankFormat,
    name: &'static str,
    /// Short names also occur inside ordinary words ("Zahlungseingang").
    /// "Sparkasse" must still match compounds like "Kreissparkasse".
    whole_word: bool,
    header: &'static str,
}

impl Fingerprint {
    fn matches(&self, head: &str) -> bool {
        let named = if self.whole_word {
            contains_word(head, self.name)
        } else {
            head.contains(self.name)
        };
        named || head.contains(self.header)
    }
}

fn contains_word(haystack: &str, word: &str) -> bool {
    haystack.match_indices(word).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + word.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Classifies an export by its first lines. Never fails; unknown layouts are
/// [`BankFormat::Generic`].
///
/// A DKB export whose header starts with `Buchungstag;Wertstellung;` is
/// reported as Sparkasse. Both mappers share that header shape, and a wrong
/// guess that yields no rows falls back to the generic mapper anyway.
pub fn detect(content: &str) -> BankFormat {
    let head = content
        .lines()
        .take(DETECT_LINES)
        .collect::<Vec<_>>()
        .join("\n")
        .to_lowercase();

    let format = FINGERPRINTS
        .iter()
        .find(|fp| fp.matches(&head))
        .map(|fp| fp.format)
        .unwrap_or(BankFormat::Generic);

    debug!(%format, "detected bank format");
    format
}
