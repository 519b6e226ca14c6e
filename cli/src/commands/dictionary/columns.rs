use ckan_client::{column_names, value_to_string, Record};
use prettytable::{row, Row};
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::printer::DisplayTable;

/// Number of non-missing values per column looked at when inferring types.
pub const TYPE_SAMPLE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ColumnType {
    Numeric,
    Alphanumeric,
    Text,
}

impl ColumnType {
    /// Label written into the dictionary document.
    pub fn label(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "NUMÉRICO",
            ColumnType::Alphanumeric => "ALFANUMÉRICO",
            ColumnType::Text => "TEXTO",
        }
    }

    pub fn infer<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let (mut has_letters, mut has_digits) = (false, false);
        for value in values {
            has_letters |= value.chars().any(char::is_alphabetic);
            has_digits |= value.chars().any(|char| char.is_ascii_digit());
            if has_letters && has_digits {
                break;
            }
        }
        match (has_letters, has_digits) {
            (true, true) => ColumnType::Alphanumeric,
            (false, true) => ColumnType::Numeric,
            _ => ColumnType::Text,
        }
    }
}

impl Display for ColumnType {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FmtResult {
        formatter.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: ColumnType,
    pub display_label: String,
}

pub fn display_label(column: &str) -> String {
    column.replace(['_', '/'], " ").to_uppercase()
}

/// Profile every column of `records`, in first-seen column order.
pub fn profile_columns(records: &[Record]) -> Vec<ColumnProfile> {
    column_names(records)
        .into_iter()
        .map(|name| {
            let sample: Vec<String> = records
                .iter()
                .filter_map(|record| record.get(&name))
                .filter(|value| !value.is_null())
                .take(TYPE_SAMPLE_SIZE)
                .map(value_to_string)
                .collect();
            ColumnProfile {
                inferred_type: ColumnType::infer(sample.iter().map(String::as_str)),
                display_label: display_label(&name),
                name,
            }
        })
        .collect()
}

impl DisplayTable for ColumnProfile {
    fn to_table_headers() -> Row {
        row![bFg => "Column", "Type", "Description"]
    }

    fn to_table_row(&self) -> Row {
        row![self.name, self.inferred_type, self.display_label]
    }
}
