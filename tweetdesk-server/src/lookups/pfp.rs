use std::collections::HashMap;

use super::{CsvTable, LookupError};

/// Inscription number to profile-picture URL.
#[derive(Debug, Clone, Default)]
pub struct PfpIndex {
    urls: HashMap<String, String>,
}

impl PfpIndex {
    pub fn from_table(table: CsvTable) -> Result<Self, LookupError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }
        for column in ["number", "url"] {
            if !table.has_column(column) {
                return Err(LookupError::MissingColumn {
                    file: "pfp".to_string(),
                    column: column.to_string(),
                });
            }
        }

        // Later rows win, as with a plain dict build
        let urls = table
            .rows()
            .iter()
            .map(|row| (row["number"].clone(), row["url"].clone()))
            .collect();
        Ok(Self { urls })
    }

    pub fn url_for(&self, number: &str) -> Option<&str> {
        self.urls.get(number.trim()).map(String::as_str)
    }

    /// URL for `number`, or an empty string when unknown.
    pub fn url_or_empty(&self, number: &str) -> String {
        self.url_for(number).unwrap_or_default().to_string()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> PfpIndex {
        let csv = "number,url\n1,https://a/1.png\n2,https://a/2.png\n1,https://b/1.png\n";
        PfpIndex::from_table(CsvTable::from_reader(csv.as_bytes(), "pfp.csv").unwrap()).unwrap()
    }

    #[test]
    fn test_same_key_same_value() {
        let pfp = index();
        let first = pfp.url_for("2").map(str::to_string);
        for _ in 0..3 {
            assert_eq!(pfp.url_for("2").map(str::to_string), first);
        }
        assert_eq!(first.as_deref(), Some("https://a/2.png"));
    }

    #[test]
    fn test_duplicate_numbers_keep_last_row() {
        assert_eq!(index().url_for("1"), Some("https://b/1.png"));
        assert_eq!(index().len(), 2);
    }

    #[test]
    fn test_unknown_number_is_empty() {
        assert_eq!(index().url_for("99"), None);
        assert_eq!(index().url_or_empty("99"), "");
    }
}
