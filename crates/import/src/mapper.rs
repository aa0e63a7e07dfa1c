use thiserror::Error;

use crate::amount::parse_amount;
use crate::detect::BankFormat;
use crate::dialect::{DialectMapper, COMDIRECT, DKB, ING, SPARKASSE};
use crate::generic::GenericMapper;
use crate::record::RawRecord;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("No header line found")]
    MissingHeader,
}

/// Turns raw export text into unrepaired records, preserving line order.
pub trait StatementMapper {
    fn format(&self) -> BankFormat;
    fn map(&self, content: &str) -> Result<Vec<RawRecord>, MapError>;
}

pub fn mapper_for(format: BankFormat) -> Box<dyn StatementMapper> {
    match format {
        BankFormat::Sparkasse => Box::new(DialectMapper::new(&SPARKASSE)),
        BankFormat::Dkb => Box::new(DialectMapper::new(&DKB)),
        BankFormat::Ing => Box::new(DialectMapper::new(&ING)),
        BankFormat::Comdirect => Box::new(DialectMapper::new(&COMDIRECT)),
        BankFormat::Generic => Box::new(GenericMapper::new()),
    }
}

/// Canonical meaning of a CSV column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    BookingDate,
    Amount,
    Purpose,
    RawText,
    Counterparty,
    /// "Name, Identifier" packed into one cell.
    CounterpartyWithId,
}

/// Quote-aware split of a single line. Leftover `"` characters are dropped
/// and cells are trimmed.
pub(crate) fn split_line(line: &str, delimiter: u8) -> Result<Vec<String>, MapError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(Vec::new());
    }
    Ok(record.iter().map(clean_cell).collect())
}

pub(crate) fn clean_cell(cell: &str) -> String {
    cell.replace('"', "").trim().to_string()
}

/// Writes one cell into `record` according to its column role. Columns
/// without a role are kept verbatim under their header. Values that fail to
/// parse leave the field unset.
pub(crate) fn apply_cell(
    record: &mut RawRecord,
    header: &str,
    role: Option<ColumnRole>,
    value: &str,
) {
    match role {
        Some(ColumnRole::BookingDate) => {
            if record.booking_date.is_none() && !value.is_empty() {
                record.set_date_text(value);
            }
        }
        Some(ColumnRole::Amount) => {
            if record.amount.is_none() {
                record.amount = parse_amount(value);
            }
        }
        Some(ColumnRole::Purpose) => append_text(&mut record.purpose, value),
        Some(ColumnRole::RawText) => append_text(&mut record.raw_text, value),
        Some(ColumnRole::Counterparty) => {
            if record.counterparty_name.is_none() && !value.is_empty() {
                record.counterparty_name = Some(value.to_string());
            }
        }
        Some(ColumnRole::CounterpartyWithId) => {
            if record.counterparty_name.is_none() && !value.is_empty() {
                let (name, id) = match value.split_once(',') {
                    Some((name, id)) => (name.trim(), Some(id.trim())),
                    None => (value, None),
                };
                if !name.is_empty() {
                    record.counterparty_name = Some(name.to_string());
                }
                record.counterparty_id = id.filter(|id| !id.is_empty()).map(str::to_string);
            }
        }
        None => {
            if !header.is_empty() {
                record.extra.insert(header.to_string(), value.to_string());
            }
        }
    }
}

fn append_text(slot: &mut Option<String>, value: &str) {
    if value.is_empty() {
        return;
    }
    match slot {
        Some(existing) => {
            existing.push(' ');
            existing.push_str(value);
        }
        None => *slot = Some(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finanzblick_core::Money;

    #[test]
    fn split_line_strips_quotes_and_whitespace() {
        let cells = split_line(r#"01.03.2024; "-49,99" ;"Supermarkt; ABC""#, b';').unwrap();
        assert_eq!(cells, vec!["01.03.2024", "-49,99", "Supermarkt; ABC"]);
    }

    #[test]
    fn split_line_empty_input() {
        assert!(split_line("", b';').unwrap().is_empty());
    }

    #[test]
    fn counterparty_with_id_is_split_on_first_comma() {
        let mut record = RawRecord::default();
        apply_cell(
            &mut record,
            "Beguenstigter/Zahlungspflichtiger",
            Some(ColumnRole::CounterpartyWithId),
            "Stadtwerke GmbH, DE02120300000000202051",
        );
        assert_eq!(record.counterparty_name.as_deref(), Some("Stadtwerke GmbH"));
        assert_eq!(record.counterparty_id.as_deref(), Some("DE02120300000000202051"));
    }

    #[test]
    fn bad_amount_leaves_field_unset() {
        let mut record = RawRecord::default();
        apply_cell(&mut record, "Betrag", Some(ColumnRole::Amount), "n/a");
        assert_eq!(record.amount, None);
        apply_cell(&mut record, "Betrag", Some(ColumnRole::Amount), "-1,00");
        assert_eq!(record.amount, Some(Money::from_cents(-100)));
    }

    #[test]
    fn unknown_columns_pass_through() {
        let mut record = RawRecord::default();
        apply_cell(&mut record, "Gläubiger-ID", None, "DE98ZZZ09999999999");
        apply_cell(&mut record, "", None, "dropped");
        assert_eq!(record.extra.len(), 1);
        assert_eq!(record.extra["Gläubiger-ID"], "DE98ZZZ09999999999");
    }

    #[test]
    fn repeated_purpose_columns_are_joined() {
        let mut record = RawRecord::default();
        apply_cell(&mut record, "Verwendungszweck", Some(ColumnRole::Purpose), "Miete");
        apply_cell(&mut record, "Verwendungszweck 2", Some(ColumnRole::Purpose), "März");
        assert_eq!(record.purpose.as_deref(), Some("Miete März"));
    }
}
