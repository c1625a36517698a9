//! Field assignment from column profiles.
//!
//! The mapper runs four deterministic passes over the detections: direct type
//! matches, name recovery beside the ID column, hire/leave date roles, and the
//! wage column. Every index it returns comes from the detections it was given.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    classify::ColumnType,
    hints::{PayrollField, match_header_hint},
    profile::ColumnDetection,
};

/// Columns to the left of the ID column inspected when no name column was found.
const NAME_SEARCH_OFFSETS: [usize; 2] = [1, 2];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericColumn {
    pub column_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_hint: Option<String>,
}

/// Zero-based column per field; `None` when no column fits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub name: Option<usize>,
    pub national_id: Option<usize>,
    pub join_date: Option<usize>,
    pub leave_date: Option<usize>,
    pub wage: Option<usize>,
    pub phone: Option<usize>,
    pub numeric_columns: Vec<NumericColumn>,
}

impl FieldMapping {
    pub fn get(&self, field: PayrollField) -> Option<usize> {
        match field {
            PayrollField::Name => self.name,
            PayrollField::NationalId => self.national_id,
            PayrollField::JoinDate => self.join_date,
            PayrollField::LeaveDate => self.leave_date,
            PayrollField::Wage => self.wage,
            PayrollField::Phone => self.phone,
        }
    }

    /// Mapped fields in dictionary order, skipping unmapped ones.
    pub fn assigned(&self) -> impl Iterator<Item = (PayrollField, usize)> + '_ {
        PayrollField::ALL
            .into_iter()
            .filter_map(|field| self.get(field).map(|column| (field, column)))
    }
}

fn hinted_field(detection: &ColumnDetection) -> Option<PayrollField> {
    detection.header_hint.as_deref().and_then(match_header_hint)
}

pub fn map_fields(columns: &[ColumnDetection]) -> FieldMapping {
    let mut mapping = FieldMapping::default();
    let mut id_confidence = 0.0f64;
    let mut dates: Vec<&ColumnDetection> = Vec::new();
    let mut large_amounts: Vec<&ColumnDetection> = Vec::new();

    for detection in columns {
        match detection.dominant_type {
            ColumnType::NationalId => {
                if mapping.national_id.is_none() || detection.confidence > id_confidence {
                    mapping.national_id = Some(detection.column_index);
                    id_confidence = detection.confidence;
                }
            }
            ColumnType::PersonName => {
                mapping.name.get_or_insert(detection.column_index);
            }
            ColumnType::Phone => {
                mapping.phone.get_or_insert(detection.column_index);
            }
            ColumnType::Date => dates.push(detection),
            ColumnType::LargeAmount | ColumnType::SmallAmount => {
                if detection.dominant_type == ColumnType::LargeAmount {
                    large_amounts.push(detection);
                }
                mapping.numeric_columns.push(NumericColumn {
                    column_index: detection.column_index,
                    header_hint: detection.header_hint.clone(),
                });
            }
            ColumnType::Text | ColumnType::Empty => {}
        }
    }

    if mapping.name.is_none()
        && let Some(id_column) = mapping.national_id
    {
        mapping.name = recover_name(columns, id_column);
    }

    let (join_date, leave_date) = assign_dates(&dates);
    mapping.join_date = join_date;
    mapping.leave_date = leave_date;

    mapping.wage = large_amounts
        .iter()
        .find(|detection| hinted_field(detection) == Some(PayrollField::Wage))
        .or_else(|| large_amounts.last())
        .map(|detection| detection.column_index);

    debug!("Field mapping: {mapping:?}");
    mapping
}

/// Names conventionally sit just left of the ID column.
fn recover_name(columns: &[ColumnDetection], id_column: usize) -> Option<usize> {
    NAME_SEARCH_OFFSETS.iter().find_map(|offset| {
        let candidate = id_column.checked_sub(*offset)?;
        columns
            .iter()
            .find(|detection| detection.column_index == candidate)
            .filter(|detection| {
                matches!(
                    detection.dominant_type,
                    ColumnType::Text | ColumnType::PersonName
                )
            })
            .map(|detection| detection.column_index)
    })
}

/// Header captions decide hire/leave first; remaining date columns fill the
/// open roles left to right.
fn assign_dates(dates: &[&ColumnDetection]) -> (Option<usize>, Option<usize>) {
    let mut join_date = None;
    let mut leave_date = None;

    for detection in dates {
        match hinted_field(detection) {
            Some(PayrollField::JoinDate) if join_date.is_none() => {
                join_date = Some(detection.column_index);
            }
            Some(PayrollField::LeaveDate) if leave_date.is_none() => {
                leave_date = Some(detection.column_index);
            }
            _ => {}
        }
    }

    let (hinted_join, hinted_leave) = (join_date, leave_date);
    let mut remaining = dates
        .iter()
        .map(|detection| detection.column_index)
        .filter(|column| Some(*column) != hinted_join && Some(*column) != hinted_leave);
    if join_date.is_none() {
        join_date = remaining.next();
    }
    if leave_date.is_none() {
        leave_date = remaining.next();
    }
    (join_date, leave_date)
}
