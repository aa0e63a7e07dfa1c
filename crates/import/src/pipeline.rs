use std::path::Path;

use finanzblick_core::Transaction;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::detect::{detect, BankFormat};
use crate::generic::GenericMapper;
use crate::mapper::{mapper_for, MapError, StatementMapper};
use crate::normalize::normalize;
use crate::record::RawRecord;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File is empty")]
    EmptyContent,
    #[error("Could not read statement: {0}")]
    Unparseable(#[from] MapError),
    #[error("Keine gültigen Transaktionen gefunden")]
    NoTransactions,
}

/// Outcome of one import. `format` names the mapper that produced the rows.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedStatement {
    pub format: BankFormat,
    pub transactions: Vec<Transaction>,
}

/// Detects the bank, maps the rows and repairs them. Falls back to the
/// generic mapper when the dialect mapper fails or yields nothing.
pub fn parse_statement(content: &str) -> Result<ParsedStatement, ImportError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    if content.trim().is_empty() {
        return Err(ImportError::EmptyContent);
    }

    let mapper = mapper_for(detect(content));
    let (format, records) = map_with_fallback(mapper.as_ref(), content)?;

    let transactions = normalize(records);
    if transactions.is_empty() {
        return Err(ImportError::NoTransactions);
    }

    info!(%format, count = transactions.len(), "parsed statement");
    Ok(ParsedStatement {
        format,
        transactions,
    })
}

/// Runs `mapper` and retries with the generic mapper when it errors or maps
/// no rows. The returned format names whichever mapper produced the rows.
fn map_with_fallback(
    mapper: &dyn StatementMapper,
    content: &str,
) -> Result<(BankFormat, Vec<RawRecord>), ImportError> {
    let format = mapper.format();
    if format != BankFormat::Generic {
        match mapper.map(content) {
            Ok(records) if !records.is_empty() => return Ok((format, records)),
            Ok(_) => warn!(%format, "no rows mapped, retrying with generic mapper"),
            Err(e) => warn!(%format, error = %e, "mapper failed, retrying with generic mapper"),
        }
    }

    let records = GenericMapper::new().map(content)?;
    Ok((BankFormat::Generic, records))
}

/// Reads and parses one export file. Invalid UTF-8 is replaced, not rejected.
pub async fn import_file(path: impl AsRef<Path>) -> Result<ParsedStatement, ImportError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let content = String::from_utf8_lossy(&bytes);
    info!(path = %path.display(), bytes = bytes.len(), "importing statement");
    parse_statement(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use finanzblick_core::{Money, NO_PURPOSE};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── end to end ────────────────────────────────────────────────────────────

    #[test]
    fn minimal_german_statement() {
        let csv = "Buchungstag;Betrag;Verwendungszweck\n01.03.2024;-49,99;\"Supermarkt ABC\"\n";
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.transactions.len(), 1);
        let tx = &parsed.transactions[0];
        assert_eq!(tx.booking_date, date(2024, 3, 1));
        assert_eq!(tx.amount, Money::from_cents(-4999));
        assert_eq!(tx.purpose, "Supermarkt ABC");
    }

    #[test]
    fn narrow_sparkasse_export_falls_back_to_generic() {
        let csv = "Sparkasse Musterstadt\nBuchungstag;Betrag;Verwendungszweck\n01.03.2024;-49,99;\"Supermarkt ABC\"\n";
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.format, BankFormat::Generic);
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].amount, Money::from_cents(-4999));
        assert_eq!(parsed.transactions[0].purpose, "Supermarkt ABC");
    }

    #[test]
    fn sparkasse_dialect_keeps_its_format() {
        let csv = "\
Auftragskonto;Buchungstag;Wertstellung;Buchungstext;Verwendungszweck;Beguenstigter/Zahlungspflichtiger;Betrag
DE001;01.03.24;01.03.24;LASTSCHRIFT;Strom;Stadtwerke GmbH, DE02;-82,00
";
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.format, BankFormat::Sparkasse);
        let tx = &parsed.transactions[0];
        assert_eq!(tx.counterparty_name.as_deref(), Some("Stadtwerke GmbH"));
        assert_eq!(tx.counterparty_id.as_deref(), Some("DE02"));
        assert_eq!(tx.raw_text.as_deref(), Some("LASTSCHRIFT"));
    }

    #[test]
    fn english_generic_statement() {
        let parsed = parse_statement("Date,Amount,Memo\n2024-03-01,100.00,Salary\n").unwrap();
        assert_eq!(parsed.format, BankFormat::Generic);
        assert_eq!(parsed.transactions[0].amount, Money::from_cents(10000));
        assert_eq!(parsed.transactions[0].booking_date, date(2024, 3, 1));
        assert_eq!(parsed.transactions[0].purpose, "Salary");
    }

    #[test]
    fn byte_order_mark_is_ignored() {
        let csv = "\u{feff}Date,Amount,Memo\n2024-03-01,1.00,x\n";
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.transactions[0].purpose, "x");
    }

    #[test]
    fn empty_memo_falls_back_to_joined_row() {
        let parsed =
            parse_statement("Datum;Betrag;Verwendungszweck;Konto\n01.03.2024;5,00;;DE00\n").unwrap();
        assert_eq!(parsed.transactions[0].purpose, "01.03.2024 5,00  DE00");
        assert_ne!(parsed.transactions[0].purpose, NO_PURPOSE);
    }

    #[test]
    fn misdetected_bank_falls_back_to_generic() {
        let csv = "ING Kontoauszug\nDatum;Empfänger;Betrag;Notiz\n02.04.2024;Bäcker;-2,50;Frühstück\n";
        assert_eq!(detect(csv), BankFormat::Ing);
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.format, BankFormat::Generic);
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].amount, Money::from_cents(-250));
        assert_eq!(parsed.transactions[0].booking_date, date(2024, 4, 2));
    }

    #[test]
    fn word_containing_ing_is_not_an_ing_export() {
        let csv = "Kontoauszug Zahlungseingang\nDatum;Empfänger;Betrag;Notiz\n02.04.2024;Bäcker;-2,50;Frühstück\n";
        let parsed = parse_statement(csv).unwrap();
        assert_eq!(parsed.format, BankFormat::Generic);
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].amount, Money::from_cents(-250));
    }

    // ── mapper fallback ───────────────────────────────────────────────────────

    struct FailingMapper;

    impl StatementMapper for FailingMapper {
        fn format(&self) -> BankFormat {
            BankFormat::Dkb
        }

        fn map(&self, _content: &str) -> Result<Vec<RawRecord>, MapError> {
            Err(MapError::MissingHeader)
        }
    }

    struct SilentMapper;

    impl StatementMapper for SilentMapper {
        fn format(&self) -> BankFormat {
            BankFormat::Comdirect
        }

        fn map(&self, _content: &str) -> Result<Vec<RawRecord>, MapError> {
            Ok(Vec::new())
        }
    }

    const SIMPLE: &str = "Datum;Betrag;Verwendungszweck\n01.03.2024;-1,00;Kiosk\n";

    #[test]
    fn failing_mapper_falls_back_to_generic() {
        let (format, records) = map_with_fallback(&FailingMapper, SIMPLE).unwrap();
        assert_eq!(format, BankFormat::Generic);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, Some(Money::from_cents(-100)));
        assert_eq!(records[0].purpose.as_deref(), Some("Kiosk"));
    }

    #[test]
    fn mapper_without_rows_falls_back_to_generic() {
        let (format, records) = map_with_fallback(&SilentMapper, SIMPLE).unwrap();
        assert_eq!(format, BankFormat::Generic);
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn garbled_dialect_exports_never_fail_hard() {
        let headers = [
            "Sparkasse\nAuftragskonto;Buchungstag;Wertstellung;Buchungstext;Verwendungszweck;Beguenstigter/Zahlungspflichtiger;Betrag",
            "DKB\nBuchungstag;Wertstellung;Buchungstext;Auftraggeber / Begünstigter;Verwendungszweck;Betrag (EUR)",
            "Buchung;Valuta;Auftraggeber/Empfänger;Buchungstext;Verwendungszweck;Betrag",
            "Buchungstag;Valuta;Vorgang;Buchungstext;Umsatz in EUR",
        ];
        let bodies = [
            "",
            "\n01.03.2024;",
            "\n01.03.2024;01.03.2024;\"offen;-1,00",
            "\n;;;;;;;;\n\"\";\"\";x",
            "\n32.13.2024;xx;yy;zz;1.2.3,4,5;-;()",
            "\n\u{0};\u{fffd};ä;ö;ü;ß;€",
        ];
        for header in headers {
            assert_ne!(detect(header), BankFormat::Generic, "{header:?}");
            for body in bodies {
                let csv = format!("{header}{body}\n");
                let result = parse_statement(&csv);
                assert!(
                    matches!(result, Ok(_) | Err(ImportError::NoTransactions)),
                    "{csv:?} gave {result:?}"
                );
            }
        }
    }

    // ── failures ──────────────────────────────────────────────────────────────

    #[test]
    fn empty_and_blank_content_is_rejected() {
        assert!(matches!(parse_statement(""), Err(ImportError::EmptyContent)));
        assert!(matches!(parse_statement(" \n\t\n"), Err(ImportError::EmptyContent)));
    }

    #[test]
    fn header_only_has_no_transactions() {
        assert!(matches!(
            parse_statement("Datum;Betrag;Verwendungszweck\n"),
            Err(ImportError::NoTransactions)
        ));
    }

    #[test]
    fn garbage_rows_are_repaired_not_dropped() {
        let parsed = parse_statement("a;b;c\nfoo;bar;baz\nqux;quux;corge\n").unwrap();
        assert_eq!(parsed.transactions.len(), 2);
        assert!(parsed.transactions.iter().all(|t| t.amount.is_zero()));
    }

    // ── file import ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn import_file_decodes_latin1_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umsatz.csv");
        let mut bytes = b"Datum;Betrag;Verwendungszweck\n01.03.2024;-3,50;B".to_vec();
        bytes.push(0xE4); // latin-1 'ä'
        bytes.extend_from_slice(b"ckerei\n");
        std::fs::write(&path, bytes).unwrap();

        let parsed = import_file(&path).await.unwrap();
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].amount, Money::from_cents(-350));
        assert_eq!(parsed.transactions[0].purpose, "B\u{fffd}ckerei");
    }

    #[tokio::test]
    async fn import_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = import_file(dir.path().join("fehlt.csv")).await;
        assert!(matches!(result, Err(ImportError::Io(_))));
    }
}
