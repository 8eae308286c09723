//! Row validation into normalized, comparison-ready records.
//!
//! [`validate_row`] is the only way to build a [`Record`]; a record therefore
//! never exists with a missing or mistyped field. Checks run in a fixed
//! order so that the first reported defect is stable:
//!
//! 1. ID present
//! 2. Name present
//! 3. Date present
//! 4. Amount present
//! 5. ID is a whole number
//! 6. Date is `YYYY-MM-DD`
//! 7. Amount is numeric

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    dataset::{DatasetLabel, RawRow},
    error::ReconError,
};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: i64,
    name: String,
    date: String,
    amount: Decimal,
}

impl Record {
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Trimmed, lower-cased name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Trimmed date text in `YYYY-MM-DD` form.
    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

pub fn validate_row(row: &RawRow, label: DatasetLabel) -> Result<Record, ReconError> {
    let raw_id = row.id.as_deref().ok_or(ReconError::EmptyId {
        label,
        position: row.display_position(),
    })?;
    let id_text = raw_id.trim();
    let empty_field = |field: &'static str| ReconError::EmptyField {
        label,
        field,
        id: id_text.to_string(),
    };

    let name = row.name.as_deref().ok_or_else(|| empty_field("name"))?;
    let date = row.date.as_deref().ok_or_else(|| empty_field("date"))?.trim();
    let amount = row.amount.as_deref().ok_or_else(|| empty_field("amount"))?;

    let id = parse_id(id_text).ok_or(ReconError::InvalidId {
        label,
        position: row.display_position(),
    })?;

    if parse_date(date).is_none() {
        return Err(ReconError::InvalidDate {
            label,
            value: date.to_string(),
            id: id_text.to_string(),
        });
    }

    let amount = parse_amount(amount).ok_or_else(|| ReconError::InvalidAmount {
        label,
        value: amount.to_string(),
        id: id_text.to_string(),
    })?;

    Ok(Record {
        id,
        name: name.trim().to_lowercase(),
        date: date.to_string(),
        amount,
    })
}

/// Parses an identifier that must be numeric and integral.
///
/// Values such as `1.5` are numeric but not integral and are rejected, as is
/// anything outside the `i64` range.
fn parse_id(value: &str) -> Option<i64> {
    let numeric = parse_amount(value)?;
    if numeric.scale() > 0 {
        return None;
    }
    value.parse::<i64>().ok()
}

/// Parses a `YYYY-MM-DD` date. The year must be four plain digits; chrono's
/// `%Y` alone would also take a signed year such as `+2023`.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let year = value.as_bytes().get(..4)?;
    if !year.iter().all(u8::is_ascii_digit) {
        return None;
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Parses an amount in plain or scientific notation.
///
/// Text that cannot be held exactly (more than 28 fractional digits, in
/// either notation) is rejected rather than rounded.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    Decimal::from_str_exact(unsigned)
        .or_else(|_| Decimal::from_scientific(unsigned))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, name: &str, date: &str, amount: &str) -> RawRow {
        RawRow::from_cells(0, id, name, date, amount)
    }

    fn source_error(raw: RawRow) -> String {
        validate_row(&raw, DatasetLabel::Source)
            .expect_err("row should be rejected")
            .to_string()
    }

    #[test]
    fn valid_row_is_normalized() {
        let record = validate_row(
            &row(" 7 ", "  John DOE ", " 2023-01-03 ", "100.50"),
            DatasetLabel::Source,
        )
        .expect("valid row");
        assert_eq!(record.id(), 7);
        assert_eq!(record.name(), "john doe");
        assert_eq!(record.date(), "2023-01-03");
        assert_eq!(record.amount(), Decimal::from_str("100.5").unwrap());
    }

    #[test]
    fn empty_id_reports_position() {
        assert_eq!(
            source_error(row("", "John Doe", "2023-01-01", "100.5")),
            "ID value empty in source file for row in position 1"
        );
    }

    #[test]
    fn empty_fields_report_id() {
        assert_eq!(
            source_error(row("1", "", "2023-01-01", "100.5")),
            "name value empty in source file for row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "", "100.5")),
            "date value empty in source file for row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "2023-01-01", "")),
            "amount value empty in source file for row with ID 1"
        );
    }

    #[test]
    fn presence_checks_run_before_type_checks() {
        assert_eq!(
            source_error(row("abc", "", "2023", "Fig")),
            "name value empty in source file for row with ID abc"
        );
    }

    #[test]
    fn fractional_and_textual_ids_are_rejected() {
        assert_eq!(
            source_error(row("1.5", "John Doe", "2023-01-01", "100")),
            "invalid ID type for row in position 1 in source file"
        );
        assert_eq!(
            source_error(row("Fig", "John Doe", "2023-01-01", "100")),
            "invalid ID type for row in position 1 in source file"
        );
        assert_eq!(
            source_error(row("1.0", "John Doe", "2023-01-01", "100")),
            "invalid ID type for row in position 1 in source file"
        );
    }

    #[test]
    fn id_check_runs_before_date_check() {
        assert_eq!(
            source_error(row("x", "John Doe", "2023", "100")),
            "invalid ID type for row in position 1 in source file"
        );
    }

    #[test]
    fn date_must_match_fixed_format() {
        assert_eq!(
            source_error(row("1", "John Doe", "2023", "100.5")),
            "invalid date input in source file 2023 from row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "03/01/2023", "100.5")),
            "invalid date input in source file 03/01/2023 from row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "2023-02-30", "100.5")),
            "invalid date input in source file 2023-02-30 from row with ID 1"
        );
    }

    #[test]
    fn date_year_must_be_unsigned() {
        assert_eq!(
            source_error(row("1", "John Doe", "+2023-01-01", "100.5")),
            "invalid date input in source file +2023-01-01 from row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "-2023-01-01", "100.5")),
            "invalid date input in source file -2023-01-01 from row with ID 1"
        );
        assert_eq!(
            source_error(row("1", "John Doe", "02023-01-01", "100.5")),
            "invalid date input in source file 02023-01-01 from row with ID 1"
        );
    }

    #[test]
    fn amount_must_be_numeric() {
        let err = validate_row(&row("1", "John Doe", "2023-01-01", "Fig"), DatasetLabel::Target)
            .expect_err("bad amount");
        assert_eq!(
            err.to_string(),
            "invalid amount input in target file Fig from row with ID 1"
        );
    }

    #[test]
    fn parse_amount_accepts_signed_and_scientific_values() {
        assert_eq!(parse_amount("-12.25"), Some(Decimal::from_str("-12.25").unwrap()));
        assert_eq!(parse_amount("+3"), Some(Decimal::from(3)));
        assert_eq!(parse_amount("1e3"), Some(Decimal::from(1000)));
        assert_eq!(parse_amount("1,000"), None);
        assert_eq!(parse_amount("   "), None);
    }

    #[test]
    fn amounts_too_precise_to_hold_are_rejected_in_both_notations() {
        let tiny = format!("0.{}1", "0".repeat(29));
        assert_eq!(parse_amount(&tiny), None);
        assert_eq!(parse_amount("1e-30"), None);
        assert_eq!(
            parse_amount(&format!("0.{}1", "0".repeat(27))),
            Some(Decimal::from_scientific("1e-28").unwrap())
        );

        let err = validate_row(&row("1", "John Doe", "2023-01-01", &tiny), DatasetLabel::Source)
            .expect_err("inexact amount");
        assert_eq!(
            err.to_string(),
            format!("invalid amount input in source file {tiny} from row with ID 1")
        );
    }
}
