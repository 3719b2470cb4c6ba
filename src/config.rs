// config.rs

use clap::ValueEnum;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{ToolError, ToolResult};

// --- Defaults ---
pub const DEFAULT_RCD_TYPES: [&str; 3] = ["Necroptosis", "Pyroptosis", "Ferroptosis"];
pub const DEFAULT_RCD_DIR: &str = "data/RCDdb";
pub const DEFAULT_UNIQUE_GENES_DIR: &str = "temp/unique_genes/necroptosis_ferroptosis_pyroptosis";
pub const DEFAULT_MIRDB: &str = "data/miRDB_v6.0_prediction_result.txt";

// --- File formats ---
pub const GENE_TABLE_EXTENSION: &str = "csv";
pub const UNIQUE_GENES_HEADER: [&str; 7] = [
    "deathtype",
    "gene",
    "description",
    "gene_id",
    "gene_biotype",
    "pmid",
    "comment",
];
pub const MIN_GENE_FIELDS: usize = 5;
pub const MIN_PREDICTION_FIELDS: usize = 2;

/// Row order of each unique-gene output table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum RowOrder {
    /// Position of the first occurrence of each symbol in the category table.
    #[default]
    Input,
    /// Lexicographic by gene symbol.
    Symbol,
}

/// What to do with a row that has too few fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum MalformedRowPolicy {
    #[default]
    Abort,
    Skip,
}

#[derive(Clone, Debug)]
pub struct ExtractorConfig {
    pub rcd_dir: PathBuf,
    pub output_dir: PathBuf,
    pub categories: Vec<String>,
    pub write_header: bool,
    pub order: RowOrder,
    pub on_malformed: MalformedRowPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RCD_DIR, DEFAULT_UNIQUE_GENES_DIR)
    }
}

impl ExtractorConfig {
    pub fn new(rcd_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            rcd_dir: rcd_dir.into(),
            output_dir: output_dir.into(),
            categories: DEFAULT_RCD_TYPES.iter().map(|c| c.to_string()).collect(),
            write_header: true,
            order: RowOrder::default(),
            on_malformed: MalformedRowPolicy::default(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn category_path(&self, category: &str) -> PathBuf {
        table_path(&self.rcd_dir, category)
    }

    pub fn output_path(&self, category: &str) -> PathBuf {
        table_path(&self.output_dir, category)
    }

    pub fn validate(&self) -> ToolResult<()> {
        if self.categories.is_empty() {
            return Err(ToolError::InvalidConfig(
                "at least one RCD category is required".to_string(),
            ));
        }
        let mut seen = HashSet::with_capacity(self.categories.len());
        for category in &self.categories {
            if category.trim().is_empty() {
                return Err(ToolError::InvalidConfig(
                    "RCD category names must not be empty".to_string(),
                ));
            }
            if !seen.insert(category.as_str()) {
                return Err(ToolError::InvalidConfig(format!(
                    "RCD category '{}' is listed more than once",
                    category
                )));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct MapperConfig {
    pub mrna_list: PathBuf,
    pub mirdb: PathBuf,
    pub output: PathBuf,
    pub on_malformed: MalformedRowPolicy,
}

impl MapperConfig {
    pub fn new(mrna_list: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            mrna_list: mrna_list.into(),
            mirdb: PathBuf::from(DEFAULT_MIRDB),
            output: output.into(),
            on_malformed: MalformedRowPolicy::default(),
        }
    }
}

fn table_path(dir: &Path, category: &str) -> PathBuf {
    dir.join(format!("{}.{}", category, GENE_TABLE_EXTENSION))
}
