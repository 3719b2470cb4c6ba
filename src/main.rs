// main.rs

// --- External Crate Imports ---
use anyhow::{Error, Result};
use clap::Parser;
use log::info;
use std::time::Instant;

use rcd_mirna::{genes, mirna};

// --- Main Function ---
fn main() -> Result<(), Error> {
    let total_time_start = Instant::now();
    let cli_args = cli::CliArgs::parse();

    // Initialize logger
    let log_level = cli_args
        .log_level
        .parse::<log::LevelFilter>()
        .unwrap_or_else(|_| {
            eprintln!(
                "Warning: Invalid log level '{}' provided. Defaulting to Info.",
                cli_args.log_level
            );
            log::LevelFilter::Info
        });
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp_micros()
        .init();

    info!("Starting rcd_mirna with args: {:?}", cli_args);

    match &cli_args.command {
        cli::Command::UniqueGenes(args) => {
            let config = args.to_config()?;
            info!(
                "Extracting unique genes for {} categories from {} into {}",
                config.categories.len(),
                config.rcd_dir.display(),
                config.output_dir.display()
            );
            let summaries = genes::extract_unique_genes(&config)?;
            let total_unique: usize = summaries.iter().map(|s| s.unique_genes).sum();
            info!(
                "Wrote {} unique genes across {} tables.",
                total_unique,
                summaries.len()
            );
        }
        cli::Command::GetMirna(args) => {
            let config = args.to_config();
            mirna::get_mirna(&config)?;
        }
    }

    info!(
        "rcd_mirna finished successfully in {:.2?}.",
        total_time_start.elapsed()
    );
    Ok(())
}

// --- Module Implementations ---

mod cli {
    use anyhow::{anyhow, Result};
    use clap::{Args, Parser, Subcommand};
    use std::path::{Path, PathBuf};

    use rcd_mirna::config::{
        ExtractorConfig, MalformedRowPolicy, MapperConfig, RowOrder, DEFAULT_MIRDB,
        DEFAULT_RCD_DIR, DEFAULT_RCD_TYPES, DEFAULT_UNIQUE_GENES_DIR,
    };
    use rcd_mirna::genes::category_from_path;

    #[derive(Parser, Debug)]
    #[command(author, version, about = "RCD unique-gene extraction and miRNA target mapping.", long_about = None, propagate_version = true)]
    pub(crate) struct CliArgs {
        #[command(subcommand)]
        pub(crate) command: Command,

        #[arg(long, default_value = "Info", global = true)]
        pub(crate) log_level: String,
    }

    #[derive(Subcommand, Debug)]
    pub(crate) enum Command {
        /// Write, for each RCD category, the genes listed in no other category.
        UniqueGenes(UniqueGenesArgs),
        /// Write the miRNAs predicted to target the given transcripts.
        GetMirna(GetMirnaArgs),
    }

    #[derive(Args, Debug)]
    pub(crate) struct UniqueGenesArgs {
        /// Directory holding one `<category>.csv` table per RCD category.
        #[arg(long = "rcd-gene-list-dir", default_value = DEFAULT_RCD_DIR)]
        pub(crate) rcd_gene_list_dir: PathBuf,

        #[arg(long = "output-dir", default_value = DEFAULT_UNIQUE_GENES_DIR)]
        pub(crate) output_dir: PathBuf,

        #[arg(long, value_delimiter = ',', default_values = DEFAULT_RCD_TYPES)]
        pub(crate) categories: Vec<String>,

        /// Omit the `deathtype,gene,...` header row from the output tables.
        #[arg(long = "no-header")]
        pub(crate) no_header: bool,

        #[arg(long, value_enum, default_value_t = RowOrder::Input)]
        pub(crate) order: RowOrder,

        #[arg(long = "on-malformed", value_enum, default_value_t = MalformedRowPolicy::Abort)]
        pub(crate) on_malformed: MalformedRowPolicy,
    }

    impl UniqueGenesArgs {
        pub(crate) fn to_config(&self) -> Result<ExtractorConfig> {
            let categories = self
                .categories
                .iter()
                .map(|raw| {
                    category_from_path(Path::new(raw.trim()))
                        .ok_or_else(|| anyhow!("Invalid RCD category '{}'.", raw))
                })
                .collect::<Result<Vec<String>>>()?;

            let mut config = ExtractorConfig::new(&self.rcd_gene_list_dir, &self.output_dir)
                .with_categories(categories);
            config.write_header = !self.no_header;
            config.order = self.order;
            config.on_malformed = self.on_malformed;
            Ok(config)
        }
    }

    #[derive(Args, Debug)]
    pub(crate) struct GetMirnaArgs {
        /// Text file with one RefSeq transcript ID per line.
        #[arg(long = "mrna-list", required = true)]
        pub(crate) mrna_list: PathBuf,

        #[arg(short, long, required = true)]
        pub(crate) output: PathBuf,

        /// miRDB prediction table (tab-separated, no header).
        #[arg(long, default_value = DEFAULT_MIRDB)]
        pub(crate) mirdb: PathBuf,

        #[arg(long = "on-malformed", value_enum, default_value_t = MalformedRowPolicy::Abort)]
        pub(crate) on_malformed: MalformedRowPolicy,
    }

    impl GetMirnaArgs {
        pub(crate) fn to_config(&self) -> MapperConfig {
            let mut config = MapperConfig::new(&self.mrna_list, &self.output);
            config.mirdb = self.mirdb.clone();
            config.on_malformed = self.on_malformed;
            config
        }
    }

}
