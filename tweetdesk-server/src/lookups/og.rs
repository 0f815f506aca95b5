use std::collections::BTreeMap;

use tweetdesk_types::{CsvRecord, WalletCount};

use super::{CsvTable, LookupError};
use crate::filter::{Condition, FilterError};

const WALLET_COLUMN: &str = "wallet";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// OG holder snapshot: an arbitrary headed CSV queried with conditions.
#[derive(Debug, Clone, Default)]
pub struct OgDataset {
    table: CsvTable,
}

impl OgDataset {
    pub fn from_table(table: CsvTable) -> Self {
        Self { table }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn unique_values(&self, column: &str) -> Result<BTreeMap<String, usize>, LookupError> {
        self.table.value_counts(column)
    }

    /// Rows satisfying every condition.
    pub fn query(&self, conditions: &[Condition]) -> Result<Vec<CsvRecord>, DatasetError> {
        self.check_columns(conditions)?;
        Ok(self
            .table
            .rows()
            .iter()
            .filter(|row| {
                conditions.iter().all(|c| {
                    row.get(&c.column)
                        .map(|cell| c.matches(cell))
                        .unwrap_or(false)
                })
            })
            .cloned()
            .collect())
    }

    /// Wallet occurrence counts among matching rows, most frequent first.
    pub fn wallet_counts(&self, conditions: &[Condition]) -> Result<Vec<WalletCount>, DatasetError> {
        self.table.require_column(WALLET_COLUMN)?;

        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for row in self.query(conditions)? {
            let wallet = row.get(WALLET_COLUMN).cloned().unwrap_or_default();
            *counts.entry(wallet).or_insert(0) += 1;
        }

        let mut wallets: Vec<WalletCount> = counts
            .into_iter()
            .map(|(wallet, count)| WalletCount {
                wallet: Some(wallet),
                count,
            })
            .collect();
        // Stable sort keeps equal counts in wallet order
        wallets.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(wallets)
    }

    fn check_columns(&self, conditions: &[Condition]) -> Result<(), FilterError> {
        if conditions.is_empty() {
            return Err(FilterError::Empty);
        }
        match conditions.iter().find(|c| !self.table.has_column(&c.column)) {
            Some(unknown) => Err(FilterError::UnknownColumn(unknown.column.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;

    fn og() -> OgDataset {
        let csv = "wallet,tier,holdings\n\
                   bc1a,gold,12\n\
                   bc1b,silver,3\n\
                   bc1a,gold,7\n\
                   bc1c,gold,20\n";
        OgDataset::from_table(CsvTable::from_reader(csv.as_bytes(), "og.csv").unwrap())
    }

    #[test]
    fn test_unique_values() {
        let counts = og().unique_values("tier").unwrap();
        assert_eq!(counts["gold"], 3);
        assert_eq!(counts["silver"], 1);
    }

    #[test]
    fn test_query_ands_conditions() {
        let rows = og()
            .query(&[
                Condition::new("tier", Operator::Eq, "gold"),
                Condition::new("holdings", Operator::Gt, "10"),
            ])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["tier"] == "gold"));
    }

    #[test]
    fn test_query_rejects_unknown_column() {
        let err = og()
            .query(&[Condition::new("rank", Operator::Eq, "1")])
            .unwrap_err();
        assert!(matches!(err, DatasetError::Filter(FilterError::UnknownColumn(_))));
    }

    #[test]
    fn test_wallet_counts_sorted_desc() {
        let wallets = og()
            .wallet_counts(&[Condition::new("tier", Operator::Eq, "gold")])
            .unwrap();
        assert_eq!(wallets[0].wallet.as_deref(), Some("bc1a"));
        assert_eq!(wallets[0].count, 2);
        assert_eq!(wallets[1].wallet.as_deref(), Some("bc1c"));
        assert_eq!(wallets.len(), 2);
    }
}
