//! Single-cell semantic classification.
//!
//! [`classify`] walks an ordered chain of predicates and returns the first
//! match. The order is load-bearing: a 13-digit ID string must never fall
//! through to the amount checks, and an 11-digit mobile number must never be
//! read as a wage.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::sheet::Cell;

/// Amounts at or above this value are wage-sized.
pub const LARGE_AMOUNT_THRESHOLD: f64 = 100_000.0;
/// Spreadsheet serial numbers covering roughly 1900-01-01 through 2100-12-31.
pub const DATE_SERIAL_MAX: f64 = 73_050.0;

const NATIONAL_ID_DIGITS: usize = 13;

/// Semantic cell type, listed in classification precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    NationalId,
    Phone,
    PersonName,
    Date,
    LargeAmount,
    SmallAmount,
    Text,
    Empty,
}

impl ColumnType {
    pub const ALL: [ColumnType; 8] = [
        ColumnType::NationalId,
        ColumnType::Phone,
        ColumnType::PersonName,
        ColumnType::Date,
        ColumnType::LargeAmount,
        ColumnType::SmallAmount,
        ColumnType::Text,
        ColumnType::Empty,
    ];

    /// Position in [`ColumnType::ALL`], usable as a histogram slot.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_amount(self) -> bool {
        matches!(self, ColumnType::LargeAmount | ColumnType::SmallAmount)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ColumnType::NationalId => "NATIONAL_ID",
            ColumnType::Phone => "PHONE",
            ColumnType::PersonName => "PERSON_NAME",
            ColumnType::Date => "DATE",
            ColumnType::LargeAmount => "LARGE_AMOUNT",
            ColumnType::SmallAmount => "SMALL_AMOUNT",
            ColumnType::Text => "TEXT",
            ColumnType::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(cell: &Cell) -> ColumnType {
    if cell.is_blank() {
        ColumnType::Empty
    } else if is_national_id(cell) {
        ColumnType::NationalId
    } else if is_phone(cell) {
        ColumnType::Phone
    } else if is_person_name(cell) {
        ColumnType::PersonName
    } else if is_date_value(cell) {
        ColumnType::Date
    } else if is_large_amount(cell) {
        ColumnType::LargeAmount
    } else if is_small_amount(cell) {
        ColumnType::SmallAmount
    } else {
        ColumnType::Text
    }
}

fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Thirteen digits (separators ignored) whose 3rd-6th digits form a plausible
/// month and day.
pub fn is_national_id(cell: &Cell) -> bool {
    let Some(text) = cell.text() else {
        return false;
    };
    let digits = digits_only(text.trim());
    if digits.len() != NATIONAL_ID_DIGITS {
        return false;
    }
    let month = digits[2..4].parse::<u32>().unwrap_or(0);
    let day = digits[4..6].parse::<u32>().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

pub fn is_phone(cell: &Cell) -> bool {
    static MOBILE: OnceLock<Regex> = OnceLock::new();
    let Some(text) = cell.text() else {
        return false;
    };
    let pattern =
        MOBILE.get_or_init(|| Regex::new(r"^01[016789]\d{7,8}$").expect("valid mobile pattern"));
    pattern.is_match(&digits_only(&text))
}

/// Two to four Hangul syllables, the usual shape of a Korean personal name.
pub fn is_person_name(cell: &Cell) -> bool {
    let Some(text) = cell.text() else {
        return false;
    };
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    (2..=4).contains(&count) && trimmed.chars().all(|ch| ('\u{AC00}'..='\u{D7A3}').contains(&ch))
}

pub fn is_date_value(cell: &Cell) -> bool {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    static COMPACT: OnceLock<Regex> = OnceLock::new();

    match cell {
        Cell::Number(value) => (1.0..=DATE_SERIAL_MAX).contains(value),
        Cell::Text(text) => {
            let trimmed = text.trim();
            let compact = COMPACT.get_or_init(|| Regex::new(r"^\d{8}$").expect("valid pattern"));
            if compact.is_match(trimmed) {
                let month = trimmed[4..6].parse::<u32>().unwrap_or(0);
                return (1..=12).contains(&month);
            }
            let patterns = PATTERNS.get_or_init(|| {
                [
                    Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid pattern"),
                    Regex::new(r"^\d{2}\.\d{1,2}\.\d{1,2}$").expect("valid pattern"),
                    Regex::new(r"^\d{4}[./]\d{1,2}[./]\d{1,2}$").expect("valid pattern"),
                ]
            });
            patterns.iter().any(|pattern| pattern.is_match(trimmed))
        }
        Cell::Empty => false,
    }
}

/// Numeric reading of a cell; text is read leniently (thousands separators
/// dropped, trailing units such as `원` ignored).
pub fn numeric_value(cell: &Cell) -> Option<f64> {
    static LEADING_NUMBER: OnceLock<Regex> = OnceLock::new();
    match cell {
        Cell::Number(value) => Some(*value),
        Cell::Text(text) => {
            let cleaned = text.replace(',', "");
            let pattern = LEADING_NUMBER.get_or_init(|| {
                Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("valid pattern")
            });
            let found = pattern.find(cleaned.trim_start())?;
            found.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
        }
        Cell::Empty => None,
    }
}

pub fn is_large_amount(cell: &Cell) -> bool {
    numeric_value(cell).is_some_and(|value| value >= LARGE_AMOUNT_THRESHOLD)
}

pub fn is_small_amount(cell: &Cell) -> bool {
    numeric_value(cell).is_some_and(|value| (1.0..LARGE_AMOUNT_THRESHOLD).contains(&value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn national_id_accepts_separator_and_numeric_cells() {
        assert!(is_national_id(&text("950101-1234567")));
        assert!(is_national_id(&text("9501011234567")));
        assert!(is_national_id(&Cell::Number(9_501_011_234_567.0)));
        assert!(!is_national_id(&text("9513011234567")));
        assert!(!is_national_id(&text("9501001234567")));
        assert!(!is_national_id(&text("950101-123456")));
    }

    #[test]
    fn phone_requires_mobile_prefix() {
        assert!(is_phone(&text("010-1234-5678")));
        assert!(is_phone(&text("0111234567")));
        assert!(!is_phone(&text("0212345678")));
        assert!(!is_phone(&text("01212345678")));
    }

    #[test]
    fn person_name_is_two_to_four_hangul_syllables() {
        assert!(is_person_name(&text("김철수")));
        assert!(is_person_name(&text("남궁민수")));
        assert!(!is_person_name(&text("김")));
        assert!(!is_person_name(&text("김철수입니다")));
        assert!(!is_person_name(&text("Kim")));
    }

    #[test]
    fn date_accepts_serials_and_common_layouts() {
        assert!(is_date_value(&Cell::Number(45_306.0)));
        assert!(!is_date_value(&Cell::Number(73_051.0)));
        assert!(is_date_value(&text("2024-01-15")));
        assert!(is_date_value(&text("20240115")));
        assert!(!is_date_value(&text("20241315")));
        assert!(is_date_value(&text("24.1.5")));
        assert!(is_date_value(&text("2024/1/5")));
        assert!(is_date_value(&text("2024.01.05")));
        assert!(!is_date_value(&text("2024-1-5")));
    }

    #[test]
    fn amounts_split_at_one_hundred_thousand() {
        assert!(is_large_amount(&Cell::Number(100_000.0)));
        assert!(is_large_amount(&text("3,000,000원")));
        assert!(is_small_amount(&Cell::Number(99_999.0)));
        assert!(!is_small_amount(&Cell::Number(0.5)));
        assert!(!is_small_amount(&text("abc")));
    }

    #[test]
    fn classification_order_is_respected() {
        assert_eq!(classify(&Cell::Empty), ColumnType::Empty);
        assert_eq!(classify(&text("")), ColumnType::Empty);
        assert_eq!(
            classify(&Cell::Number(9_501_011_234_567.0)),
            ColumnType::NationalId
        );
        assert_eq!(classify(&text("01012345678")), ColumnType::Phone);
        assert_eq!(classify(&text("김철수")), ColumnType::PersonName);
        assert_eq!(classify(&Cell::Number(45_306.0)), ColumnType::Date);
        assert_eq!(classify(&Cell::Number(3_000_000.0)), ColumnType::LargeAmount);
        assert_eq!(classify(&Cell::Number(99_900.0)), ColumnType::SmallAmount);
        assert_eq!(classify(&text("정규직 사원")), ColumnType::Text);
    }
}
