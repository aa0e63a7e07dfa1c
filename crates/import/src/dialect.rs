use tracing::debug;

use crate::detect::BankFormat;
use crate::mapper::{apply_cell, split_line, ColumnRole, MapError, StatementMapper};
use crate::record::RawRecord;

use crate::mapper::ColumnRole::*;

/// Column layout of one bank's semicolon export.
#[derive(Debug)]
pub struct Dialect {
    pub format: BankFormat,
    /// Any of these (case-insensitive, quotes ignored) marks the header line.
    pub header_signatures: &'static [&'static str],
    /// Shorter rows are metadata or trailer lines.
    pub min_columns: usize,
    /// Lower-case header name to canonical role.
    pub columns: &'static [(&'static str, ColumnRole)],
}

pub static SPARKASSE: Dialect = Dialect {
    format: BankFormat::Sparkasse,
    header_signatures: &[
        "Buchungstag;Wertstellung;",
        "Buchungstag;Valutadatum;",
        "Buchungsdatum;Valutadatum;",
    ],
    min_columns: 5,
    columns: &[
        ("buchungstag", BookingDate),
        ("buchungsdatum", BookingDate),
        ("betrag", Amount),
        ("betrag (eur)", Amount),
        ("verwendungszweck", Purpose),
        ("buchungstext", RawText),
        ("empfänger/zahlungspflichtiger", CounterpartyWithId),
        ("beguenstigter/zahlungspflichtiger", CounterpartyWithId),
    ],
};

pub static DKB: Dialect = Dialect {
    format: BankFormat::Dkb,
    header_signatures: &["Buchungstag;Wertstellung;Buchungstext;"],
    min_columns: 5,
    columns: &[
        ("buchungstag", BookingDate),
        ("betrag (eur)", Amount),
        ("buchungstext", RawText),
        ("auftraggeber / begünstigter", Counterparty),
        ("verwendungszweck", Purpose),
    ],
};

pub static ING: Dialect = Dialect {
    format: BankFormat::Ing,
    header_signatures: &["Buchung;Valuta;", "Buchungsdatum;Wertstellung;"],
    min_columns: 4,
    columns: &[
        ("buchung", BookingDate),
        ("buchungsdatum", BookingDate),
        ("betrag", Amount),
        ("betrag (eur)", Amount),
        ("verwendungszweck", Purpose),
        ("buchungstext", RawText),
        ("auftraggeber/empfänger", Counterparty),
        ("name", Counterparty),
    ],
};

pub static COMDIRECT: Dialect = Dialect {
    format: BankFormat::Comdirect,
    header_signatures: &["Buchungstag;Valuta;", "Buchungsdatum;Wertstellung;"],
    min_columns: 4,
    columns: &[
        ("buchungstag", BookingDate),
        ("buchungsdatum", BookingDate),
        ("umsatz", Amount),
        ("umsatz in eur", Amount),
        ("betrag (eur)", Amount),
        ("buchungstext", RawText),
        ("vorgang", RawText),
        ("name", Counterparty),
        ("verwendungszweck", Purpose),
    ],
};

impl Dialect {
    fn is_header(&self, line: &str) -> bool {
        let line = line.replace('"', "").to_lowercase();
        self.header_signatures
            .iter()
            .any(|sig| line.contains(&sig.to_lowercase()))
    }

    fn role(&self, header: &str) -> Option<ColumnRole> {
        let header = header.to_lowercase();
        self.columns
            .iter()
            .find(|(name, _)| *name == header)
            .map(|(_, role)| *role)
    }
}

pub struct DialectMapper {
    dialect: &'static Dialect,
}

impl DialectMapper {
    pub fn new(dialect: &'static Dialect) -> Self {
        Self { dialect }
    }
}

impl StatementMapper for DialectMapper {
    fn format(&self) -> BankFormat {
        self.dialect.format
    }

    fn map(&self, content: &str) -> Result<Vec<RawRecord>, MapError> {
        let lines: Vec<&str> = content.lines().collect();

        let header_idx = match lines.iter().position(|l| self.dialect.is_header(l)) {
            Some(idx) => idx,
            None => {
                debug!(format = %self.dialect.format, "header signature not found, using first line");
                0
            }
        };
        let header_line = lines.get(header_idx).ok_or(MapError::MissingHeader)?;
        let headers = split_line(header_line, b';')?;
        let roles: Vec<Option<ColumnRole>> = headers.iter().map(|h| self.dialect.role(h)).collect();
        if !roles.contains(&Some(BookingDate)) || !roles.contains(&Some(Amount)) {
            debug!(format = %self.dialect.format, "no date or amount column, layout does not fit");
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for line in &lines[header_idx + 1..] {
            if line.trim().is_empty() {
                continue;
            }
            let cells = split_line(line, b';')?;
            if cells.len() < self.dialect.min_columns {
                debug!(cells = cells.len(), "skipping short row");
                continue;
            }

            let mut record = RawRecord::default();
            for (idx, header) in headers.iter().enumerate() {
                let value = cells.get(idx).map(String::as_str).unwrap_or("");
                apply_cell(&mut record, header, roles[idx], value);
            }
            records.push(record);
        }

        debug!(format = %self.dialect.format, rows = records.len(), "mapped dialect rows");
        Ok(records)
    }
}
