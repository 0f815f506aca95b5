//! CSV-backed lookup tables, loaded once at startup and shared read-only.

mod csv_table;
mod kol;
mod og;
mod pfp;
mod runes;

pub use csv_table::CsvTable;
pub use kol::KolList;
pub use og::{DatasetError, OgDataset};
pub use pfp::PfpIndex;
pub use runes::{RunesFilter, RunesSocial};

use thiserror::Error;

use crate::config::Data;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {source_name}: {source}")]
    Csv {
        source_name: String,
        #[source]
        source: csv::Error,
    },
    #[error("{file} has no '{column}' column")]
    MissingColumn { file: String, column: String },
    #[error("Column '{0}' not found")]
    UnknownColumn(String),
}

#[derive(Debug, Clone, Default)]
pub struct Lookups {
    pub kols: KolList,
    pub pfp: PfpIndex,
    pub runes: RunesSocial,
    pub og: OgDataset,
}

impl Lookups {
    pub fn load(data: &Data) -> Result<Self, LookupError> {
        Ok(Self {
            kols: KolList::from_table(CsvTable::from_path(&data.path_of(&data.kols_file))?)?,
            pfp: PfpIndex::from_table(CsvTable::from_path(&data.path_of(&data.pfp_file))?)?,
            runes: RunesSocial::from_table(CsvTable::from_path(
                &data.path_of(&data.runes_social_file),
            )?),
            og: OgDataset::from_table(CsvTable::from_path(&data.path_of(&data.og_file))?),
        })
    }
}
