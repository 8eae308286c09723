//! Result model handed from the engine to the renderers.
//!
//! Field and key names follow the JSON contract (`missing_in_target`,
//! `record_id`, `Name`, `source_value`, ...), so the JSON renderer can emit
//! these types as-is.

use std::{collections::BTreeMap, fmt};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{dataset::RawRow, record::Record};

/// Tracked fields, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Field {
    Name,
    Date,
    Amount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Name => f.write_str("Name"),
            Field::Date => f.write_str("Date"),
            Field::Amount => f.write_str("Amount"),
        }
    }
}

/// The reported values of one record as they appeared in its file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValues {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Amount", with = "exact_amount")]
    pub amount: Decimal,
}

impl FieldValues {
    /// Values for a record missing on the other side: name and date exactly
    /// as read.
    pub(crate) fn from_raw(raw: &RawRow, record: &Record) -> Self {
        Self {
            name: raw.name.clone().unwrap_or_default(),
            date: raw.date.clone().unwrap_or_default(),
            amount: record.amount(),
        }
    }

    /// Values for a matched record: the name as read, the date trimmed.
    pub(crate) fn from_matched(raw: &RawRow, record: &Record) -> Self {
        Self {
            name: raw.name.clone().unwrap_or_default(),
            date: record.date().to_string(),
            amount: record.amount(),
        }
    }

    pub fn value(&self, field: Field) -> FieldValue {
        match field {
            Field::Name => FieldValue::Text(self.name.clone()),
            Field::Date => FieldValue::Text(self.date.clone()),
            Field::Amount => FieldValue::Amount(self.amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Amount(#[serde(with = "exact_amount")] Decimal),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Amount(amount) => f.write_str(&display_amount(*amount)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDiff {
    pub source_value: FieldValue,
    pub target_value: FieldValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingRecord {
    pub record_id: i64,
    pub data: FieldValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDiscrepancy {
    pub record_id: i64,
    pub source_data: FieldValues,
    pub target_data: FieldValues,
    /// Only the fields whose normalized values differ.
    pub discrepancy: BTreeMap<Field, FieldDiff>,
}

impl RecordDiscrepancy {
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.discrepancy.keys().copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconResult {
    pub missing_in_target: Vec<MissingRecord>,
    pub missing_in_source: Vec<MissingRecord>,
    pub record_discrepancies: Vec<RecordDiscrepancy>,
}

impl ReconResult {
    /// True when both datasets hold the same records with the same values.
    pub fn is_reconciled(&self) -> bool {
        self.missing_in_target.is_empty()
            && self.missing_in_source.is_empty()
            && self.record_discrepancies.is_empty()
    }
}

/// JSON number written digit for digit from [`display_amount`], so no amount
/// passes through `f64` on its way out.
mod exact_amount {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use serde::{Deserializer, Serialize, Serializer, ser::Error as _};

    use super::display_amount;

    pub fn serialize<S: Serializer>(amount: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Number::from_str(&display_amount(*amount))
            .map_err(S::Error::custom)?
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        rust_decimal::serde::arbitrary_precision::deserialize(deserializer)
    }
}

/// Formats an amount the way a float column prints: integral values keep a
/// trailing `.0`, everything else uses the shortest exact decimal.
pub fn display_amount(amount: Decimal) -> String {
    let normalized = amount.normalize();
    if normalized.scale() == 0 {
        format!("{normalized}.0")
    } else {
        normalized.to_string()
    }
}
