//! Header keyword dictionary and matcher.
//!
//! Header captions on payroll ledgers vary wildly ("성명", "근로자 명",
//! "[지급 합계]"), so captions are normalized before a substring lookup against
//! a fixed per-field keyword list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::classify::ColumnType;

/// Semantic roles a column can be mapped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PayrollField {
    Name,
    NationalId,
    JoinDate,
    LeaveDate,
    Wage,
    Phone,
}

impl PayrollField {
    /// Lookup order of the dictionary; the first field with a matching keyword wins.
    pub const ALL: [PayrollField; 6] = [
        PayrollField::Name,
        PayrollField::NationalId,
        PayrollField::JoinDate,
        PayrollField::LeaveDate,
        PayrollField::Wage,
        PayrollField::Phone,
    ];

    pub fn key(self) -> &'static str {
        match self {
            PayrollField::Name => "name",
            PayrollField::NationalId => "nationalId",
            PayrollField::JoinDate => "joinDate",
            PayrollField::LeaveDate => "leaveDate",
            PayrollField::Wage => "wage",
            PayrollField::Phone => "phone",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.key() == key)
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            PayrollField::Name => &["이름", "성명", "근로자명", "사원명", "직원명"],
            PayrollField::NationalId => &["주민번호", "주민등록번호", "생년월일"],
            PayrollField::JoinDate => &["입사일", "입사일자", "채용일", "취득일"],
            PayrollField::LeaveDate => &["퇴사일", "퇴사일자", "퇴직일", "상실일"],
            PayrollField::Wage => &[
                "임금총액",
                "지급총액",
                "지급합계",
                "총지급액",
                "급여총액",
                "총액",
                "합계",
            ],
            PayrollField::Phone => &["전화번호", "연락처", "핸드폰", "휴대폰"],
        }
    }

    /// Cell types whose presence under this caption corroborates the header.
    pub fn expected_types(self) -> &'static [ColumnType] {
        match self {
            PayrollField::Name => &[ColumnType::PersonName, ColumnType::Text],
            PayrollField::NationalId => &[ColumnType::NationalId],
            PayrollField::JoinDate | PayrollField::LeaveDate => &[ColumnType::Date],
            PayrollField::Wage => &[ColumnType::LargeAmount],
            PayrollField::Phone => &[ColumnType::Phone],
        }
    }
}

impl fmt::Display for PayrollField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Strips whitespace and bracket/punctuation noise, then lowercases.
pub fn normalize_header(text: &str) -> String {
    text.chars()
        .filter(|ch| {
            !ch.is_whitespace()
                && !matches!(ch, '[' | ']' | '(' | ')' | '.' | ',' | '/' | '-' | '_')
        })
        .flat_map(char::to_lowercase)
        .collect()
}

pub fn match_header_hint(text: &str) -> Option<PayrollField> {
    let normalized = normalize_header(text);
    if normalized.is_empty() {
        return None;
    }
    PayrollField::ALL.into_iter().find(|field| {
        field
            .keywords()
            .iter()
            .any(|keyword| normalized.contains(keyword))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_drops_spacing_and_brackets() {
        assert_eq!(normalize_header(" [근로자 명]\n"), "근로자명");
        assert_eq!(normalize_header("Total_Pay (KRW)"), "totalpaykrw");
    }

    #[test]
    fn captions_resolve_to_fields() {
        assert_eq!(match_header_hint("성 명"), Some(PayrollField::Name));
        assert_eq!(
            match_header_hint("주민등록번호"),
            Some(PayrollField::NationalId)
        );
        assert_eq!(match_header_hint("입사 일자"), Some(PayrollField::JoinDate));
        assert_eq!(match_header_hint("퇴직일"), Some(PayrollField::LeaveDate));
        assert_eq!(match_header_hint("지급 합계"), Some(PayrollField::Wage));
        assert_eq!(match_header_hint("휴대폰"), Some(PayrollField::Phone));
        assert_eq!(match_header_hint("기본급"), None);
        assert_eq!(match_header_hint("  "), None);
    }

    #[test]
    fn field_keys_round_trip() {
        for field in PayrollField::ALL {
            assert_eq!(PayrollField::from_key(field.key()), Some(field));
        }
        assert_eq!(PayrollField::from_key("bonus"), None);
    }
}
