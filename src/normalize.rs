//! Derived fields and the row-skip policy.

use crate::model::{CellValue, Record, SkipReason};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const ISO_DATE: &str = "%Y-%m-%d";
const DISPLAY_DATE: &str = "%d/%m/%Y";

/// Spreadsheet headers with special meaning to the merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Primary name column. Substituted upper-cased; drives the skip decision.
    pub name: String,
    /// Key under which the original-case name is published.
    pub name_original: String,
    pub date_of_birth: String,
    /// Column whose characters fill the identifier grid.
    pub identifier: String,
    /// Name value marking an unoccupied row.
    pub vacancy_marker: String,
    /// Text located and replaced inside table cells with the original-case name.
    pub name_cell_keyword: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            name: "HỌ TÊN".to_string(),
            name_original: "HỌ TÊN2".to_string(),
            date_of_birth: "NGÀY SINH".to_string(),
            identifier: "SỐ CCCD".to_string(),
            vacancy_marker: "Phòng trống".to_string(),
            name_cell_keyword: "HỌ TÊN".to_string(),
        }
    }
}

/// Values ready to be written into one document.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeFields {
    pub record_index: usize,
    /// Placeholder key to replacement text, in column order.
    pub substitutions: IndexMap<String, String>,
    pub name_original: String,
    pub identifier: Option<String>,
}

impl MergeFields {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.substitutions.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Merge(MergeFields),
    Skip(SkipReason),
}

#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    fields: FieldNames,
}

impl FieldNormalizer {
    pub fn new(fields: FieldNames) -> Self {
        Self { fields }
    }

    /// Decide whether `record` produces a document and derive its
    /// substitution values. Runs before any document work.
    pub fn normalize(&self, record: &Record) -> Normalized {
        if let Some(reason) = self.skip_reason(record) {
            return Normalized::Skip(reason);
        }

        let name = record
            .get(&self.fields.name)
            .map(CellValue::display_text)
            .unwrap_or_default();

        let mut substitutions = IndexMap::with_capacity(record.fields.len() + 1);
        for (key, value) in &record.fields {
            let text = if *key == self.fields.name {
                name.to_uppercase()
            } else if *key == self.fields.date_of_birth {
                format_date(value).display_text()
            } else {
                value.display_text()
            };
            substitutions.insert(key.clone(), text);
        }
        substitutions.insert(self.fields.name_original.clone(), name.clone());

        let identifier = record
            .get(&self.fields.identifier)
            .filter(|value| !value.is_blank())
            .map(CellValue::to_string);

        Normalized::Merge(MergeFields {
            record_index: record.index,
            substitutions,
            name_original: name,
            identifier,
        })
    }

    pub fn skip_reason(&self, record: &Record) -> Option<SkipReason> {
        match record.get(&self.fields.name) {
            None => Some(SkipReason::MissingName),
            Some(value) if value.is_blank() => Some(SkipReason::MissingName),
            Some(value) if value.as_text() == Some(self.fields.vacancy_marker.as_str()) => {
                Some(SkipReason::Vacant)
            }
            Some(_) => None,
        }
    }
}

/// Render a date of birth as `DD/MM/YYYY`.
///
/// Native dates and `YYYY-MM-DD` strings are reformatted; anything else is
/// returned unchanged.
pub fn format_date(value: &CellValue) -> CellValue {
    match value {
        CellValue::Date(date) => CellValue::Text(date.format(DISPLAY_DATE).to_string()),
        CellValue::DateTime(dt) => CellValue::Text(dt.format(DISPLAY_DATE).to_string()),
        CellValue::Text(text) => match NaiveDate::parse_from_str(text, ISO_DATE) {
            Ok(date) => CellValue::Text(date.format(DISPLAY_DATE).to_string()),
            Err(_) => value.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> FieldNormalizer {
        FieldNormalizer::default()
    }

    fn merge(normalized: Normalized) -> MergeFields {
        match normalized {
            Normalized::Merge(fields) => fields,
            Normalized::Skip(reason) => panic!("unexpected skip: {reason}"),
        }
    }

    #[test]
    fn iso_strings_and_native_dates_are_reformatted() {
        assert_eq!(
            format_date(&CellValue::from("2024-03-05")),
            CellValue::from("05/03/2024")
        );
        let date = NaiveDate::from_ymd_opt(1990, 12, 1).unwrap();
        assert_eq!(format_date(&CellValue::Date(date)), CellValue::from("01/12/1990"));
    }

    #[test]
    fn unrecognized_dates_pass_through() {
        for raw in ["05/03/2024", "March 5", "2024-13-40", "2024-03-05 extra"] {
            assert_eq!(format_date(&CellValue::from(raw)), CellValue::from(raw));
        }
        assert_eq!(format_date(&CellValue::Number(3.0)), CellValue::Number(3.0));
    }

    #[test]
    fn name_variants_are_derived() {
        let record = Record::new(4)
            .with_field("HỌ TÊN", "Nguyễn Văn An")
            .with_field("NGÀY SINH", "2001-07-09")
            .with_field("SỐ CCCD", 12345678901.0);
        let fields = merge(normalizer().normalize(&record));

        assert_eq!(fields.record_index, 4);
        assert_eq!(fields.get("HỌ TÊN"), Some("NGUYỄN VĂN AN"));
        assert_eq!(fields.get("HỌ TÊN2"), Some("Nguyễn Văn An"));
        assert_eq!(fields.get("NGÀY SINH"), Some("09/07/2001"));
        assert_eq!(fields.name_original, "Nguyễn Văn An");
        assert_eq!(fields.identifier.as_deref(), Some("12345678901"));
    }

    #[test]
    fn blank_identifier_is_absent() {
        let record = Record::new(1)
            .with_field("HỌ TÊN", "An")
            .with_field("SỐ CCCD", "");
        assert_eq!(merge(normalizer().normalize(&record)).identifier, None);
    }

    #[test]
    fn blank_values_substitute_empty() {
        let record = Record::new(1)
            .with_field("HỌ TÊN", "An")
            .with_field("GHI CHÚ", CellValue::Empty)
            .with_field("SỐ PHÒNG", 0.0);
        let fields = merge(normalizer().normalize(&record));
        assert_eq!(fields.get("GHI CHÚ"), Some(""));
        assert_eq!(fields.get("SỐ PHÒNG"), Some(""));
    }

    #[test]
    fn skip_policy() {
        let n = normalizer();
        assert_eq!(n.skip_reason(&Record::new(1)), Some(SkipReason::MissingName));
        assert_eq!(
            n.skip_reason(&Record::new(1).with_field("HỌ TÊN", "")),
            Some(SkipReason::MissingName)
        );
        assert_eq!(
            n.skip_reason(&Record::new(1).with_field("HỌ TÊN", "Phòng trống")),
            Some(SkipReason::Vacant)
        );
        assert_eq!(n.skip_reason(&Record::new(1).with_field("HỌ TÊN", "An")), None);
    }

    proptest! {
        #[test]
        fn iso_dates_reformat_to_day_month_year(
            year in 1900i32..2100,
            month in 1u32..=12,
            day in 1u32..=28,
        ) {
            let iso = format!("{year:04}-{month:02}-{day:02}");
            let expected = format!("{day:02}/{month:02}/{year:04}");
            prop_assert_eq!(format_date(&CellValue::Text(iso)), CellValue::Text(expected));
        }

        #[test]
        fn non_empty_names_other_than_the_marker_are_kept(name in "[A-Za-z ]{1,20}") {
            let record = Record::new(1).with_field("HỌ TÊN", name.as_str());
            prop_assert_eq!(normalizer().skip_reason(&record), None);
        }
    }
}
