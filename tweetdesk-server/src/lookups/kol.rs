use super::{CsvTable, LookupError};

const USERID_COLUMN: &str = "userid";

/// Allowlist of tracked KOL user ids, in file order.
#[derive(Debug, Clone, Default)]
pub struct KolList {
    userids: Vec<String>,
}

impl KolList {
    pub fn from_table(table: CsvTable) -> Result<Self, LookupError> {
        if table.headers().is_empty() {
            return Ok(Self::default());
        }
        if !table.has_column(USERID_COLUMN) {
            return Err(LookupError::MissingColumn {
                file: "kols".to_string(),
                column: USERID_COLUMN.to_string(),
            });
        }
        let userids = table
            .column_values(USERID_COLUMN)
            .map(str::to_string)
            .collect();
        Ok(Self { userids })
    }

    pub fn userids(&self) -> &[String] {
        &self.userids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_userids_keep_file_order() {
        let table = CsvTable::from_reader("userid\n30\n10\n20\n".as_bytes(), "kols.csv").unwrap();
        let kols = KolList::from_table(table).unwrap();
        assert_eq!(kols.userids(), &["30", "10", "20"]);
    }
}
