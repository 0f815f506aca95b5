use std::collections::BTreeSet;

use serde::Deserialize;
use tweetdesk_types::CsvRecord;

use super::{CsvTable, LookupError};

const NAME_COLUMN: &str = "Name";

/// Rune names use `•` as a word separator; clients also search with spaces.
const RUNE_SEPARATOR: char = '•';

/// Substring filters for the runes social table. Empty fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunesFilter {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Telegram", default)]
    pub telegram: Option<String>,
    #[serde(rename = "X", default)]
    pub x: Option<String>,
    #[serde(rename = "DC", default)]
    pub dc: Option<String>,
}

impl RunesFilter {
    fn criteria(&self) -> Vec<(&'static str, String)> {
        [
            ("Name", &self.name),
            ("Telegram", &self.telegram),
            ("X", &self.x),
            ("DC", &self.dc),
        ]
        .into_iter()
        .filter_map(|(column, needle)| {
            needle
                .as_deref()
                .filter(|n| !n.is_empty())
                .map(|n| (column, n.to_lowercase()))
        })
        .collect()
    }
}

/// Social links (Telegram, X, Discord) per rune.
#[derive(Debug, Clone, Default)]
pub struct RunesSocial {
    table: CsvTable,
}

impl RunesSocial {
    pub fn from_table(table: CsvTable) -> Self {
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Unique non-empty values of `column`, sorted.
    pub fn distinct_values(&self, column: &str) -> Vec<String> {
        self.table
            .column_values(column)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows matching every given filter (case-insensitive substring).
    pub fn query(&self, filter: &RunesFilter) -> Vec<CsvRecord> {
        let criteria = filter.criteria();
        self.table
            .rows()
            .iter()
            .filter(|row| {
                criteria.iter().all(|(column, needle)| {
                    row.get(*column)
                        .map(|cell| cell.to_lowercase().contains(needle.as_str()))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect()
    }

    /// First row whose name equals `name`, ignoring case.
    pub fn social_info(&self, name: &str) -> Option<&CsvRecord> {
        let wanted = name.to_lowercase();
        self.table.rows().iter().find(|row| {
            row.get(NAME_COLUMN)
                .map(|n| n.to_lowercase() == wanted)
                .unwrap_or(false)
        })
    }

    /// Non-empty values of `column` in file order.
    ///
    /// For the name column the list is followed by every name again with the
    /// rune separator replaced by spaces.
    pub fn column_data(&self, column: &str) -> Result<Vec<String>, LookupError> {
        self.table.require_column(column)?;

        let mut values: Vec<String> = self
            .table
            .column_values(column)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();

        if column == NAME_COLUMN {
            let spaced: Vec<String> = values
                .iter()
                .map(|name| name.replace(RUNE_SEPARATOR, " ").trim().to_string())
                .collect();
            values.extend(spaced);
        }

        Ok(values)
    }
}
