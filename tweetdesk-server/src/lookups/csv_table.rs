use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use tweetdesk_types::CsvRecord;

use super::LookupError;

/// A headed CSV file held in memory. Cell values are trimmed and empty
/// cells are kept as empty strings.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<CsvRecord>,
}

impl CsvTable {
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self, LookupError> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| LookupError::Csv {
                source_name: source.to_string(),
                source: e,
            })?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| LookupError::Csv {
                source_name: source.to_string(),
                source: e,
            })?;
            let row: CsvRecord = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), record.get(i).unwrap_or("").to_string()))
                .collect();
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    /// Load a table from disk. A missing file yields an empty table so the
    /// service can start without every dataset present.
    pub fn from_path(path: &Path) -> Result<Self, LookupError> {
        if !path.exists() {
            tracing::warn!("Lookup file {} not found, serving an empty table", path.display());
            return Ok(Self::default());
        }
        let file = std::fs::File::open(path).map_err(|e| LookupError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let table = Self::from_reader(file, &path.display().to_string())?;
        tracing::info!("Loaded {} rows from {}", table.len(), path.display());
        Ok(table)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[CsvRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn require_column(&self, column: &str) -> Result<(), LookupError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(LookupError::UnknownColumn(column.to_string()))
        }
    }

    /// Values of one column in file order, including empty cells.
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.rows
            .iter()
            .map(move |row| row.get(column).map(String::as_str).unwrap_or(""))
    }

    /// Occurrences of each distinct value in `column`.
    pub fn value_counts(&self, column: &str) -> Result<BTreeMap<String, usize>, LookupError> {
        self.require_column(column)?;
        let mut counts = BTreeMap::new();
        for value in self.column_values(column).filter(|v| !v.is_empty()) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(content: &str) -> CsvTable {
        CsvTable::from_reader(content.as_bytes(), "test.csv").unwrap()
    }

    #[test]
    fn test_rows_are_keyed_and_trimmed() {
        let t = table("Name, X\n  DOG•GO•TO•THE•MOON , @dog \nPUPS,\n");
        assert_eq!(t.headers(), &["Name".to_string(), "X".to_string()]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[0]["Name"], "DOG•GO•TO•THE•MOON");
        assert_eq!(t.rows()[0]["X"], "@dog");
        assert_eq!(t.rows()[1]["X"], "");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let t = table("a,b,c\n1\n");
        assert_eq!(t.rows()[0]["c"], "");
    }

    #[test]
    fn test_value_counts() {
        let t = table("wallet\nx\ny\nx\n");
        let counts = t.value_counts("wallet").unwrap();
        assert_eq!(counts["x"], 2);
        assert_eq!(counts["y"], 1);
        assert!(matches!(t.value_counts("nope"), Err(LookupError::UnknownColumn(_))));
    }

    #[test]
    fn test_value_counts_skip_empty_cells() {
        let t = table("wallet,tier\nx,gold\n,gold\ny,\n");
        let counts = t.value_counts("wallet").unwrap();
        assert_eq!(counts.len(), 2);
        assert!(!counts.contains_key(""));
        assert_eq!(t.value_counts("tier").unwrap()["gold"], 2);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let t = CsvTable::from_path(&dir.path().join("absent.csv")).unwrap();
        assert!(t.is_empty());
        assert!(t.headers().is_empty());
    }

    #[test]
    fn test_bom_is_stripped_from_first_header() {
        let t = table("\u{feff}userid\n42\n");
        assert!(t.has_column("userid"));
    }
}
