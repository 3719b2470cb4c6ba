// mirna.rs

// --- External Crate Imports ---
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{debug, info, warn};
use std::{
    collections::HashSet,
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::config::{MalformedRowPolicy, MapperConfig, MIN_PREDICTION_FIELDS};
use crate::error::{ToolError, ToolResult};

/// Strand arm suffixes dropped during normalization.
pub const STRAND_SUFFIXES: [&str; 2] = ["-5p", "-3p"];

/// Lowercases a miRNA name and drops a trailing `-5p`/`-3p` arm suffix.
///
/// `hsa-miR-21-5p` -> `hsa-mir-21`, `hsa-miR-21` -> `hsa-mir-21`.
pub fn normalize_mirna_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    for suffix in STRAND_SUFFIXES {
        if let Some(stripped) = lowered.strip_suffix(suffix) {
            return stripped.to_string();
        }
    }
    lowered
}

/// One transcript identifier per line; surrounding whitespace trimmed, blanks ignored.
pub fn parse_target_transcripts<R: BufRead>(reader: R) -> std::io::Result<HashSet<String>> {
    let mut targets = HashSet::new();
    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if !id.is_empty() {
            targets.insert(id.to_string());
        }
    }
    Ok(targets)
}

pub fn read_target_transcripts(path: &Path) -> ToolResult<HashSet<String>> {
    let file = File::open(path).map_err(|e| ToolError::io(path, e))?;
    parse_target_transcripts(BufReader::new(file)).map_err(|e| ToolError::io(path, e))
}

/// The two columns of a miRDB-style row that are consulted; the rest are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction<'a> {
    pub mirna: &'a str,
    pub transcript: &'a str,
}

impl<'a> Prediction<'a> {
    /// `None` when the trimmed line has fewer than two tab-separated fields.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut fields = line.trim().split('\t');
        let mirna = fields.next()?;
        let transcript = fields.next()?;
        Some(Self { mirna, transcript })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MappingStats {
    pub rows_read: u64,
    pub rows_matched: u64,
    pub rows_skipped: u64,
    pub distinct_mirnas: usize,
}

/// Streams a prediction table and writes `mirna\ttranscript` for every row whose
/// transcript is in `targets`, in input order. Blank lines are ignored.
pub fn map_predictions<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    targets: &HashSet<String>,
    on_malformed: MalformedRowPolicy,
    source: &Path,
) -> ToolResult<MappingStats> {
    map_predictions_with_progress(
        reader,
        &mut writer,
        targets,
        on_malformed,
        source,
        Path::new("<writer>"),
        &ProgressBar::hidden(),
    )
}

fn map_predictions_with_progress<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    targets: &HashSet<String>,
    on_malformed: MalformedRowPolicy,
    source: &Path,
    sink: &Path,
    progress: &ProgressBar,
) -> ToolResult<MappingStats> {
    let mut stats = MappingStats::default();
    let mut mirnas: HashSet<String> = HashSet::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ToolError::io(source, e))?;
        let line_number = idx as u64 + 1;
        progress.inc(1);
        if line.trim().is_empty() {
            continue;
        }
        stats.rows_read += 1;

        let prediction = match Prediction::parse(&line) {
            Some(prediction) => prediction,
            None => match on_malformed {
                MalformedRowPolicy::Abort => {
                    return Err(ToolError::MalformedRow {
                        path: source.to_path_buf(),
                        line: line_number,
                        expected: MIN_PREDICTION_FIELDS,
                        found: 1,
                    });
                }
                MalformedRowPolicy::Skip => {
                    warn!(
                        "Skipping line {} of {}: expected at least {} tab-separated fields.",
                        line_number,
                        source.display(),
                        MIN_PREDICTION_FIELDS
                    );
                    stats.rows_skipped += 1;
                    continue;
                }
            },
        };

        if !targets.contains(prediction.transcript) {
            continue;
        }

        let mirna = normalize_mirna_name(prediction.mirna);
        writeln!(writer, "{}\t{}", mirna, prediction.transcript)
            .map_err(|e| ToolError::io(sink, e))?;
        stats.rows_matched += 1;
        mirnas.insert(mirna);
    }

    writer.flush().map_err(|e| ToolError::io(sink, e))?;
    stats.distinct_mirnas = mirnas.len();
    Ok(stats)
}

pub fn get_mirna(config: &MapperConfig) -> ToolResult<MappingStats> {
    info!("Reading target transcripts from {}", config.mrna_list.display());
    let targets = read_target_transcripts(&config.mrna_list)?;
    if targets.is_empty() {
        warn!(
            "No transcript identifiers found in {}. The output will be empty.",
            config.mrna_list.display()
        );
    } else {
        info!("Loaded {} distinct target transcripts.", targets.len());
    }

    let mirdb = File::open(&config.mirdb).map_err(|e| ToolError::io(&config.mirdb, e))?;

    if let Some(parent) = config.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ToolError::io(parent, e))?;
            info!("Created output directory: {}", parent.display());
        }
    }
    let output = File::create(&config.output).map_err(|e| ToolError::io(&config.output, e))?;
    let mut writer = BufWriter::new(output);

    info!("Scanning predictions in {}", config.mirdb.display());
    let progress = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(4));
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} prediction rows scanned")
    {
        progress.set_style(style);
    }

    let stats = map_predictions_with_progress(
        BufReader::new(mirdb),
        &mut writer,
        &targets,
        config.on_malformed,
        &config.mirdb,
        &config.output,
        &progress,
    );
    progress.finish_and_clear();
    let stats = stats?;

    debug!("{:?}", stats);
    info!(
        "{} / {} prediction rows matched ({} distinct miRNAs). Written to {}",
        stats.rows_matched,
        stats.rows_read,
        stats.distinct_mirnas,
        config.output.display()
    );
    Ok(stats)
}
