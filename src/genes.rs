// genes.rs

// --- External Crate Imports ---
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, info, warn};
use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
};

use crate::config::{
    ExtractorConfig, MalformedRowPolicy, RowOrder, GENE_TABLE_EXTENSION, MIN_GENE_FIELDS,
    UNIQUE_GENES_HEADER,
};
use crate::error::{ToolError, ToolResult};

/// One row of a category gene table.
///
/// Columns are `[context, gene_symbol, description, gene_id, gene_biotype, pmid?, comment?]`;
/// the optional trailing columns are only carried through to the output.
/// The raw row is kept as-is so it can be written back out field-for-field.
#[derive(Clone, Debug)]
pub struct GeneRecord {
    fields: StringRecord,
}

impl GeneRecord {
    /// Returns `None` when the row has fewer than `MIN_GENE_FIELDS` fields.
    pub fn from_record(fields: StringRecord) -> Option<Self> {
        if fields.len() < MIN_GENE_FIELDS {
            return None;
        }
        Some(Self { fields })
    }

    pub fn context(&self) -> &str {
        &self.fields[0]
    }

    pub fn symbol(&self) -> &str {
        &self.fields[1]
    }

    pub fn description(&self) -> &str {
        &self.fields[2]
    }

    pub fn gene_id(&self) -> &str {
        &self.fields[3]
    }

    pub fn gene_biotype(&self) -> &str {
        &self.fields[4]
    }

    pub fn fields(&self) -> &StringRecord {
        &self.fields
    }
}

/// Genes of a single RCD category, keyed by symbol.
///
/// A repeated symbol replaces the earlier record but keeps the earlier position.
#[derive(Debug)]
pub struct GeneTable {
    category: String,
    records: Vec<GeneRecord>,
    index: HashMap<String, usize>,
    overwritten: usize,
    skipped: usize,
}

impl GeneTable {
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            records: Vec::new(),
            index: HashMap::new(),
            overwritten: 0,
            skipped: 0,
        }
    }

    pub fn from_path(
        category: impl Into<String>,
        path: &Path,
        on_malformed: MalformedRowPolicy,
    ) -> ToolResult<Self> {
        let file = File::open(path).map_err(|e| ToolError::io(path, e))?;
        Self::from_reader(category, file, path, on_malformed)
    }

    /// Parses a comma-delimited table. The first record is the header and is discarded.
    pub fn from_reader<R: Read>(
        category: impl Into<String>,
        reader: R,
        source: &Path,
        on_malformed: MalformedRowPolicy,
    ) -> ToolResult<Self> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut rows = csv_reader.records();

        match rows.next() {
            Some(header) => {
                header.map_err(|e| ToolError::csv(source, e))?;
            }
            None => return Err(ToolError::MissingHeader(source.to_path_buf())),
        }

        let mut table = Self::new(category);
        for row in rows {
            let row = row.map_err(|e| ToolError::csv(source, e))?;
            let line = row.position().map_or(0, |p| p.line());
            let found = row.len();
            match GeneRecord::from_record(row) {
                Some(record) => table.insert(record),
                None => match on_malformed {
                    MalformedRowPolicy::Abort => {
                        return Err(ToolError::MalformedRow {
                            path: source.to_path_buf(),
                            line,
                            expected: MIN_GENE_FIELDS,
                            found,
                        });
                    }
                    MalformedRowPolicy::Skip => {
                        warn!(
                            "Skipping row {} of {}: {} field(s), expected at least {}.",
                            line,
                            source.display(),
                            found,
                            MIN_GENE_FIELDS
                        );
                        table.skipped += 1;
                    }
                },
            }
        }
        Ok(table)
    }

    pub fn insert(&mut self, record: GeneRecord) {
        if record.context() != self.category {
            debug!(
                "{}: row for {} is labelled '{}'.",
                self.category,
                record.symbol(),
                record.context()
            );
        }
        if let Some(&pos) = self.index.get(record.symbol()) {
            let earlier = &self.records[pos];
            debug!(
                "{}: {} ({}, {}, '{}') replaced by a later row ({}, {}, '{}').",
                self.category,
                record.symbol(),
                earlier.gene_id(),
                earlier.gene_biotype(),
                earlier.description(),
                record.gene_id(),
                record.gene_biotype(),
                record.description()
            );
            self.records[pos] = record;
            self.overwritten += 1;
        } else {
            self.index
                .insert(record.symbol().to_string(), self.records.len());
            self.records.push(record);
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.index.contains_key(symbol)
    }

    pub fn get(&self, symbol: &str) -> Option<&GeneRecord> {
        self.index.get(symbol).map(|&pos| &self.records[pos])
    }

    /// Records in first-seen order.
    pub fn records(&self) -> impl Iterator<Item = &GeneRecord> {
        self.records.iter()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(GeneRecord::symbol)
    }

    /// Number of rows that replaced an earlier row with the same symbol.
    pub fn overwritten(&self) -> usize {
        self.overwritten
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Category name from a gene table path, e.g. `data/RCDdb/Necroptosis.csv` -> `Necroptosis`.
/// A bare name without the table extension is returned unchanged.
pub fn category_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let suffix = format!(".{}", GENE_TABLE_EXTENSION);
    let stem = name.strip_suffix(suffix.as_str()).unwrap_or(name);
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Reads every configured category table. Nothing is written until all of them parse.
pub fn load_gene_tables(config: &ExtractorConfig) -> ToolResult<Vec<GeneTable>> {
    let mut tables = Vec::with_capacity(config.categories.len());
    for category in &config.categories {
        let path = config.category_path(category);
        info!("Reading {} genes from {}", category, path.display());
        let table = GeneTable::from_path(category.as_str(), &path, config.on_malformed)?;
        debug!(
            "{}: {} genes, {} duplicate symbol row(s) overwritten, {} row(s) skipped.",
            category,
            table.len(),
            table.overwritten(),
            table.skipped()
        );
        if table.is_empty() {
            warn!("Gene table {} has a header but no genes.", path.display());
        }
        tables.push(table);
    }
    Ok(tables)
}

/// Genes of `target` whose symbol appears in no other category of `tables`.
pub fn unique_genes<'a>(
    target: &'a GeneTable,
    tables: &[GeneTable],
    order: RowOrder,
) -> Vec<&'a GeneRecord> {
    let other_symbols: HashSet<&str> = tables
        .iter()
        .filter(|table| table.category() != target.category())
        .flat_map(GeneTable::symbols)
        .collect();

    let mut unique: Vec<&GeneRecord> = target
        .records()
        .filter(|record| !other_symbols.contains(record.symbol()))
        .collect();

    if order == RowOrder::Symbol {
        unique.sort_by(|a, b| a.symbol().cmp(b.symbol()));
    }
    unique
}

pub fn write_unique_genes<W: Write>(
    writer: W,
    records: &[&GeneRecord],
    write_header: bool,
) -> csv::Result<()> {
    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);
    if write_header {
        csv_writer.write_record(UNIQUE_GENES_HEADER)?;
    }
    for record in records {
        csv_writer.write_record(record.fields())?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct UniqueGeneSummary {
    pub category: String,
    pub input_genes: usize,
    pub unique_genes: usize,
    pub output: PathBuf,
}

pub fn extract_unique_genes(config: &ExtractorConfig) -> ToolResult<Vec<UniqueGeneSummary>> {
    config.validate()?;

    fs::create_dir_all(&config.output_dir).map_err(|e| ToolError::io(&config.output_dir, e))?;

    let tables = load_gene_tables(config)?;

    let mut summaries = Vec::with_capacity(tables.len());
    for table in &tables {
        let unique = unique_genes(table, &tables, config.order);
        let output = config.output_path(table.category());
        let file = File::create(&output).map_err(|e| ToolError::io(&output, e))?;
        write_unique_genes(file, &unique, config.write_header)
            .map_err(|e| ToolError::csv(&output, e))?;

        info!(
            "{}: {} / {} genes are unique. Written to {}",
            table.category(),
            unique.len(),
            table.len(),
            output.display()
        );
        summaries.push(UniqueGeneSummary {
            category: table.category().to_string(),
            input_genes: table.len(),
            unique_genes: unique.len(),
            output,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const HEADER: &str = "deathtype,gene,description,gene_id,gene_biotype,pmid,comment\n";

    fn table(category: &str, symbols: &[&str]) -> GeneTable {
        let mut text = String::from(HEADER);
        for symbol in symbols {
            text.push_str(&format!(
                "{},{},{} protein,1000,protein_coding,12345,\n",
                category, symbol, symbol
            ));
        }
        GeneTable::from_reader(
            category,
            text.as_bytes(),
            Path::new("test.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap()
    }

    fn symbols_of(records: &[&GeneRecord]) -> Vec<String> {
        records.iter().map(|r| r.symbol().to_string()).collect()
    }

    #[test]
    fn header_is_skipped_and_fields_are_exposed() {
        let text = format!(
            "{}Necroptosis,RIPK3,\"receptor interacting, kinase 3\",11035,protein_coding,2345,core\n",
            HEADER
        );
        let table = GeneTable::from_reader(
            "Necroptosis",
            text.as_bytes(),
            Path::new("Necroptosis.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap();

        assert_eq!(table.len(), 1);
        assert!(!table.contains("gene"));
        let ripk3 = table.get("RIPK3").unwrap();
        assert_eq!(ripk3.context(), "Necroptosis");
        assert_eq!(ripk3.description(), "receptor interacting, kinase 3");
        assert_eq!(ripk3.gene_id(), "11035");
        assert_eq!(ripk3.gene_biotype(), "protein_coding");
        assert_eq!(ripk3.fields().get(5), Some("2345"));
        assert_eq!(ripk3.fields().get(6), Some("core"));
    }

    #[test]
    fn five_field_rows_have_no_pmid_or_comment() {
        let text = "h1,h2,h3,h4,h5\nPyroptosis,GSDMD,gasdermin D,79792,protein_coding\n";
        let table = GeneTable::from_reader(
            "Pyroptosis",
            text.as_bytes(),
            Path::new("Pyroptosis.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap();
        let gsdmd = table.get("GSDMD").unwrap();
        assert_eq!(gsdmd.fields().len(), MIN_GENE_FIELDS);
        assert_eq!(gsdmd.fields().get(5), None);
    }

    #[test]
    fn repeated_symbol_keeps_last_row_at_first_position() {
        let text = format!(
            "{}N,GeneA,first,1,pc,,\nN,GeneB,only,2,pc,,\nN,GeneA,second,1,pc,,\n",
            HEADER
        );
        let table = GeneTable::from_reader(
            "N",
            text.as_bytes(),
            Path::new("N.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.overwritten(), 1);
        assert_eq!(table.symbols().collect::<Vec<_>>(), vec!["GeneA", "GeneB"]);
        assert_eq!(table.get("GeneA").unwrap().description(), "second");
    }

    #[test]
    fn empty_table_has_no_header() {
        let err = GeneTable::from_reader(
            "Ferroptosis",
            "".as_bytes(),
            Path::new("Ferroptosis.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap_err();
        assert!(matches!(err, ToolError::MissingHeader(_)));
    }

    #[test]
    fn short_rows_abort_or_are_skipped() {
        let text = format!("{}F,GPX4,glutathione peroxidase 4,2879,pc\nF,ACSL4,short\n", HEADER);

        let err = GeneTable::from_reader(
            "F",
            text.as_bytes(),
            Path::new("F.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap_err();
        match err {
            ToolError::MalformedRow {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, MIN_GENE_FIELDS);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        let table = GeneTable::from_reader(
            "F",
            text.as_bytes(),
            Path::new("F.csv"),
            MalformedRowPolicy::Skip,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.skipped(), 1);
        assert!(table.contains("GPX4"));
    }

    #[test]
    fn three_category_scenario() {
        let tables = vec![
            table("Necroptosis", &["GeneA", "GeneB"]),
            table("Pyroptosis", &["GeneB", "GeneC"]),
            table("Ferroptosis", &["GeneD"]),
        ];

        let necro = unique_genes(&tables[0], &tables, RowOrder::Input);
        let pyro = unique_genes(&tables[1], &tables, RowOrder::Input);
        let ferro = unique_genes(&tables[2], &tables, RowOrder::Input);

        assert_eq!(symbols_of(&necro), vec!["GeneA"]);
        assert_eq!(symbols_of(&pyro), vec!["GeneC"]);
        assert_eq!(symbols_of(&ferro), vec!["GeneD"]);
    }

    #[test]
    fn shared_genes_leave_category_empty() {
        let tables = vec![
            table("Necroptosis", &["GeneA", "GeneB"]),
            table("Pyroptosis", &["GeneB"]),
            table("Ferroptosis", &["GeneD"]),
        ];
        assert!(unique_genes(&tables[1], &tables, RowOrder::Input).is_empty());
    }

    #[test]
    fn unique_sets_are_disjoint_subsets_of_their_category() {
        let tables = vec![
            table("Necroptosis", &["MLKL", "RIPK1", "RIPK3", "CASP8", "ZBP1"]),
            table("Pyroptosis", &["GSDMD", "CASP1", "CASP8", "NLRP3", "ZBP1"]),
            table("Ferroptosis", &["GPX4", "ACSL4", "NLRP3", "SLC7A11", "ZBP1"]),
        ];
        let uniques: Vec<Vec<&GeneRecord>> = tables
            .iter()
            .map(|t| unique_genes(t, &tables, RowOrder::Input))
            .collect();

        for (i, unique) in uniques.iter().enumerate() {
            for record in unique {
                assert!(tables[i].contains(record.symbol()));
                let in_categories = tables.iter().filter(|t| t.contains(record.symbol())).count();
                assert_eq!(in_categories, 1);
            }
            for (j, other) in uniques.iter().enumerate() {
                if i == j {
                    continue;
                }
                let mine: HashSet<&str> = unique.iter().map(|r| r.symbol()).collect();
                assert!(other.iter().all(|r| !mine.contains(r.symbol())));
            }
        }

        assert_eq!(symbols_of(&uniques[0]), vec!["MLKL", "RIPK1", "RIPK3"]);
        assert_eq!(symbols_of(&uniques[1]), vec!["GSDMD", "CASP1"]);
        assert_eq!(symbols_of(&uniques[2]), vec!["GPX4", "ACSL4", "SLC7A11"]);
    }

    #[test]
    fn symbol_order_is_lexicographic() {
        let tables = vec![table("Ferroptosis", &["SLC7A11", "ACSL4", "GPX4"])];
        let unique = unique_genes(&tables[0], &tables, RowOrder::Symbol);
        assert_eq!(symbols_of(&unique), vec!["ACSL4", "GPX4", "SLC7A11"]);
    }

    #[test]
    fn written_rows_preserve_fields() {
        let text = format!(
            "{}Necroptosis,RIPK3,\"receptor interacting, kinase 3\",11035,protein_coding,2345,core\nNecroptosis,MLKL,pseudokinase,197259,protein_coding\n",
            HEADER
        );
        let table = GeneTable::from_reader(
            "Necroptosis",
            text.as_bytes(),
            Path::new("Necroptosis.csv"),
            MalformedRowPolicy::Abort,
        )
        .unwrap();
        let records: Vec<&GeneRecord> = table.records().collect();

        let mut with_header = Vec::new();
        write_unique_genes(&mut with_header, &records, true).unwrap();
        assert_eq!(
            String::from_utf8(with_header).unwrap(),
            format!(
                "{}Necroptosis,RIPK3,\"receptor interacting, kinase 3\",11035,protein_coding,2345,core\nNecroptosis,MLKL,pseudokinase,197259,protein_coding\n",
                HEADER
            )
        );

        let mut without_header = Vec::new();
        write_unique_genes(&mut without_header, &records[1..], false).unwrap();
        assert_eq!(
            String::from_utf8(without_header).unwrap(),
            "Necroptosis,MLKL,pseudokinase,197259,protein_coding\n"
        );
    }

    #[test]
    fn category_names_come_from_file_names() {
        assert_eq!(
            category_from_path(Path::new("data/RCDdb/Necroptosis.csv")),
            Some("Necroptosis".to_string())
        );
        assert_eq!(
            category_from_path(Path::new("Pyroptosis")),
            Some("Pyroptosis".to_string())
        );
        assert_eq!(category_from_path(Path::new(".csv")), None);
    }

    fn write_inputs(dir: &Path) {
        fs::write(
            dir.join("Necroptosis.csv"),
            format!("{}Necroptosis,GeneA,a,1,pc,,\nNecroptosis,GeneB,b,2,pc,,\n", HEADER),
        )
        .unwrap();
        fs::write(
            dir.join("Pyroptosis.csv"),
            format!("{}Pyroptosis,GeneB,b,2,pc,,\nPyroptosis,GeneC,c,3,pc,,\n", HEADER),
        )
        .unwrap();
        fs::write(
            dir.join("Ferroptosis.csv"),
            format!("{}Ferroptosis,GeneD,d,4,pc,,\n", HEADER),
        )
        .unwrap();
    }

    #[test]
    fn extraction_writes_one_table_per_category() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_inputs(input.path());
        let out_dir = output.path().join("nested/unique");

        let config = ExtractorConfig::new(input.path(), &out_dir);
        let summaries = extract_unique_genes(&config).unwrap();

        assert_eq!(summaries.len(), 3);
        assert_eq!(summaries[0].category, "Necroptosis");
        assert_eq!(summaries[0].input_genes, 2);
        assert_eq!(summaries[0].unique_genes, 1);
        assert_eq!(
            fs::read_to_string(out_dir.join("Necroptosis.csv")).unwrap(),
            format!("{}Necroptosis,GeneA,a,1,pc,,\n", HEADER)
        );
        assert_eq!(
            fs::read_to_string(out_dir.join("Ferroptosis.csv")).unwrap(),
            format!("{}Ferroptosis,GeneD,d,4,pc,,\n", HEADER)
        );

        let first_run = fs::read_to_string(out_dir.join("Pyroptosis.csv")).unwrap();
        extract_unique_genes(&config).unwrap();
        let second_run = fs::read_to_string(out_dir.join("Pyroptosis.csv")).unwrap();
        assert_eq!(first_run, second_run);
    }

    #[test]
    fn headerless_variant_writes_rows_only() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_inputs(input.path());

        let mut config = ExtractorConfig::new(input.path(), output.path());
        config.write_header = false;
        extract_unique_genes(&config).unwrap();

        assert_eq!(
            fs::read_to_string(output.path().join("Necroptosis.csv")).unwrap(),
            "Necroptosis,GeneA,a,1,pc,,\n"
        );
    }

    #[test]
    fn missing_category_file_is_fatal_before_any_output() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_inputs(input.path());
        fs::remove_file(input.path().join("Ferroptosis.csv")).unwrap();

        let config = ExtractorConfig::new(input.path(), output.path());
        let err = extract_unique_genes(&config).unwrap_err();

        assert!(matches!(err, ToolError::Io { .. }));
        assert!(!output.path().join("Necroptosis.csv").exists());
    }
}
