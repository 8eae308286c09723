//! Two-way reconciliation of a source and a target dataset keyed by ID.
//!
//! [`reconcile`] validates every source row, then every target row, and only
//! then partitions the records into three lists:
//!
//! - `missing_in_target`: source IDs with no target counterpart
//! - `missing_in_source`: target IDs with no source counterpart
//! - `record_discrepancies`: IDs present on both sides whose tracked fields
//!   differ, with only the differing fields listed
//!
//! The first validation failure aborts the run; there are no partial
//! results. Each list keeps the row order of the file it was built from.

use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use clap::ValueEnum;
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::{Dataset, DatasetLabel, RawRow},
    error::ReconError,
    model::{Field, FieldDiff, FieldValues, MissingRecord, ReconResult, RecordDiscrepancy},
    record::{Record, validate_row},
};

/// How repeated IDs within one dataset are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Use the first row carrying an ID; later rows are validated but ignored.
    #[default]
    First,
    /// Fail the run on the first repeated ID.
    Reject,
}

/// Cooperative cancellation flag, checked between row validations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconOptions {
    pub duplicate_ids: DuplicatePolicy,
    /// Largest absolute amount difference still treated as equal. Zero means
    /// exact decimal equality.
    pub amount_tolerance: Decimal,
    /// Run the two directional passes on separate threads.
    pub parallel: bool,
    pub cancel: Option<CancelToken>,
}

struct Validated<'a> {
    raw: &'a RawRow,
    record: Record,
}

/// Validated records of one dataset plus an index of first occurrences.
struct Side<'a> {
    entries: Vec<Validated<'a>>,
    first_by_id: HashMap<i64, usize>,
}

impl<'a> Side<'a> {
    fn get(&self, id: i64) -> Option<&Validated<'a>> {
        self.first_by_id.get(&id).map(|idx| &self.entries[*idx])
    }

    /// Entries in file order, skipping rows whose ID was already seen.
    fn first_occurrences(&self) -> impl Iterator<Item = &Validated<'a>> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(idx, entry)| self.first_by_id.get(&entry.record.id()) == Some(idx))
            .map(|(_, entry)| entry)
    }
}

pub fn reconcile(
    source: &Dataset,
    target: &Dataset,
    options: &ReconOptions,
) -> Result<ReconResult, ReconError> {
    let source_side = validate_dataset(source, DatasetLabel::Source, options)?;
    let target_side = validate_dataset(target, DatasetLabel::Target, options)?;
    debug!(
        "Validated {} source and {} target row(s)",
        source_side.entries.len(),
        target_side.entries.len()
    );

    let tolerance = options.amount_tolerance;
    let ((missing_in_target, record_discrepancies), missing_in_source) = if options.parallel {
        thread::scope(|scope| {
            let target_pass = scope.spawn(|| missing_from(&target_side, &source_side));
            let source_result = source_pass(&source_side, &target_side, tolerance);
            let target_result = target_pass
                .join()
                .unwrap_or_else(|payload| std::panic::resume_unwind(payload));
            (source_result, target_result)
        })
    } else {
        (
            source_pass(&source_side, &target_side, tolerance),
            missing_from(&target_side, &source_side),
        )
    };

    Ok(ReconResult {
        missing_in_target,
        missing_in_source,
        record_discrepancies,
    })
}

fn validate_dataset<'a>(
    dataset: &'a Dataset,
    label: DatasetLabel,
    options: &ReconOptions,
) -> Result<Side<'a>, ReconError> {
    let mut entries: Vec<Validated<'a>> = Vec::with_capacity(dataset.len());
    let mut first_by_id: HashMap<i64, usize> = HashMap::with_capacity(dataset.len());
    for raw in dataset.rows() {
        if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ReconError::Cancelled);
        }
        let record = validate_row(raw, label)?;
        match first_by_id.entry(record.id()) {
            Entry::Vacant(slot) => {
                slot.insert(entries.len());
            }
            Entry::Occupied(slot) => {
                let first = &entries[*slot.get()];
                match options.duplicate_ids {
                    DuplicatePolicy::Reject => {
                        return Err(ReconError::DuplicateId {
                            label,
                            id: record.id(),
                            first: first.raw.display_position(),
                            duplicate: raw.display_position(),
                        });
                    }
                    DuplicatePolicy::First => warn!(
                        "Ignoring duplicate ID {} in {label} file at position {} (first seen at {})",
                        record.id(),
                        raw.display_position(),
                        first.raw.display_position()
                    ),
                }
            }
        }
        entries.push(Validated { raw, record });
    }
    Ok(Side {
        entries,
        first_by_id,
    })
}

fn source_pass(
    source: &Side<'_>,
    target: &Side<'_>,
    tolerance: Decimal,
) -> (Vec<MissingRecord>, Vec<RecordDiscrepancy>) {
    let mut missing = Vec::new();
    let mut discrepancies = Vec::new();
    for entry in source.first_occurrences() {
        match target.get(entry.record.id()) {
            None => missing.push(MissingRecord {
                record_id: entry.record.id(),
                data: FieldValues::from_raw(entry.raw, &entry.record),
            }),
            Some(counterpart) => {
                if let Some(discrepancy) = compare(entry, counterpart, tolerance) {
                    discrepancies.push(discrepancy);
                }
            }
        }
    }
    (missing, discrepancies)
}

/// Entries of `side` whose ID never appears in `other`.
fn missing_from(side: &Side<'_>, other: &Side<'_>) -> Vec<MissingRecord> {
    side.first_occurrences()
        .filter(|entry| other.get(entry.record.id()).is_none())
        .map(|entry| MissingRecord {
            record_id: entry.record.id(),
            data: FieldValues::from_raw(entry.raw, &entry.record),
        })
        .collect()
}

fn compare(
    source: &Validated<'_>,
    target: &Validated<'_>,
    tolerance: Decimal,
) -> Option<RecordDiscrepancy> {
    let mut differing = Vec::with_capacity(3);
    if source.record.name() != target.record.name() {
        differing.push(Field::Name);
    }
    if source.record.date() != target.record.date() {
        differing.push(Field::Date);
    }
    if !amounts_match(source.record.amount(), target.record.amount(), tolerance) {
        differing.push(Field::Amount);
    }
    if differing.is_empty() {
        return None;
    }

    let source_data = FieldValues::from_matched(source.raw, &source.record);
    let target_data = FieldValues::from_matched(target.raw, &target.record);
    let discrepancy = differing
        .into_iter()
        .map(|field| {
            (
                field,
                FieldDiff {
                    source_value: source_data.value(field),
                    target_value: target_data.value(field),
                },
            )
        })
        .collect::<BTreeMap<_, _>>();
    Some(RecordDiscrepancy {
        record_id: source.record.id(),
        source_data,
        target_data,
        discrepancy,
    })
}

pub fn amounts_match(left: Decimal, right: Decimal, tolerance: Decimal) -> bool {
    left == right
        || left
            .checked_sub(right)
            .is_some_and(|delta| delta.abs() <= tolerance)
}
