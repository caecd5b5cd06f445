use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    sync::Arc,
};

use clap::Parser;
use heicpack::{
    codec::HEIF_DECODER_MISSING,
    core::{
        input::collect_file_items,
        utils::{
            calculate_progress_fraction,
            format_file_size,
        },
        BatchRun,
        SingleFileResult,
    },
    mapping::column_index,
    load_mapping_file,
    ConversionPipeline,
    ImageCodec,
    ImageCrateCodec,
    MappingOptions,
    MappingTable,
    PackError,
    ParsedMapping,
    PipelineResult,
    Settings,
};
use serde_json::json;

#[derive(Parser)]
#[command(name = "heicpack", version, about = "Convert HEIC/HEIF photos to JPEG, renaming them from a mapping sheet")]
pub enum Cli {
    /// Convert files and folders; batches are packed into a ZIP archive
    Convert(ConvertArgs),
    /// Parse a mapping file and print the table with its diagnostics
    InspectMapping(InspectArgs),
}

#[derive(clap::Args)]
pub struct ConvertArgs {
    /// Files or folders to convert
    #[arg(required = true)]
    paths: Vec<PathBuf>,
    /// Mapping file (.xlsx, .xls or .csv) with original/new names
    #[arg(long)]
    mapping: Option<PathBuf>,
    /// Output directory
    #[arg(long, default_value = ".")]
    out: PathBuf,
    /// JPEG quality between 0.0 and 1.0
    #[arg(long)]
    quality: Option<f32>,
    /// Conversions in flight at once
    #[arg(long)]
    jobs: Option<usize>,
    /// Pack a single input file into an archive too
    #[arg(long)]
    archive: bool,
    /// Print the result as JSON
    #[arg(long)]
    json: bool,
    /// Store the effective options as defaults for later runs
    #[arg(long)]
    save_settings: bool,
    #[command(flatten)]
    mapping_args: MappingArgs,
}

#[derive(clap::Args)]
pub struct InspectArgs {
    /// Mapping file (.xlsx, .xls or .csv)
    file: PathBuf,
    /// Print the table and diagnostics as JSON
    #[arg(long)]
    json: bool,
    #[command(flatten)]
    mapping_args: MappingArgs,
}

#[derive(clap::Args)]
pub struct MappingArgs {
    /// Column holding original names, as letters (default Q)
    #[arg(long, value_parser = parse_column)]
    key_column: Option<usize>,
    /// Column holding new names, as letters (default R)
    #[arg(long, value_parser = parse_column)]
    value_column: Option<usize>,
    /// Leading spreadsheet rows to skip
    #[arg(long)]
    sheet_header_rows: Option<usize>,
    /// Leading CSV records to skip
    #[arg(long)]
    csv_header_rows: Option<usize>,
    /// CSV field delimiter
    #[arg(long)]
    delimiter: Option<char>,
}

impl MappingArgs {
    fn apply(&self, options: &mut MappingOptions) {
        if let Some(column) = self.key_column {
            options.key_column = column;
        }
        if let Some(column) = self.value_column {
            options.value_column = column;
        }
        if let Some(rows) = self.sheet_header_rows {
            options.sheet_header_rows = rows;
        }
        if let Some(rows) = self.csv_header_rows {
            options.delimited_header_rows = rows;
        }
        if let Some(delimiter) = self.delimiter {
            options.delimiter = delimiter;
        }
    }
}

fn parse_column(label: &str) -> Result<usize, String> {
    column_index(label).ok_or_else(|| format!("'{}' is not a column label like Q or AB", label))
}

pub async fn run(cli: Cli) -> Result<(), PackError> {
    match cli {
        Cli::Convert(args) => convert(args).await,
        Cli::InspectMapping(args) => inspect_mapping(args),
    }
}

async fn convert(args: ConvertArgs) -> Result<(), PackError> {
    let mut settings = Settings::load();
    if let Some(quality) = args.quality {
        settings.pipeline.jpeg_quality = quality.clamp(0.0, 1.0);
    }
    if let Some(jobs) = args.jobs {
        settings.pipeline.concurrency = jobs.max(1);
    }
    args.mapping_args.apply(&mut settings.mapping);

    if args.save_settings {
        settings.save()?;
    }

    let table = match args.mapping.as_deref() {
        Some(path) => load_mapping_or_continue(path, &settings.mapping)?,
        None => MappingTable::new(),
    };

    let items = collect_file_items(&args.paths)?;
    let codec = Arc::new(ImageCrateCodec);
    if !codec.decodes_heif() {
        tracing::warn!("{}; HEIC files will be reported as failed", HEIF_DECODER_MISSING);
    }

    let pipeline = ConversionPipeline::new(codec, settings.pipeline.clone())
        .with_progress(Box::new(|current, total, message| {
            let percent = calculate_progress_fraction(current, total) * 100.0;
            tracing::debug!("[{}/{} {:.0}%] {}", current, total, percent, message);
        }));

    let result = if args.archive {
        PipelineResult::Batch(pipeline.run(items, &table).await?)
    } else {
        pipeline.process(items, &table).await?
    };

    fs::create_dir_all(&args.out)?;
    match result {
        PipelineResult::Single(single) => write_single(single, &args.out, args.json),
        PipelineResult::Batch(batch) => write_batch(batch, &args.out, args.json),
    }
}

/// Unreadable workbooks leave the batch unmapped; other errors abort the run.
fn load_mapping_or_continue(path: &Path, options: &MappingOptions) -> Result<MappingTable, PackError> {
    match load_mapping_file(path, options) {
        Ok(parsed) => {
            log_diagnostics(&parsed);
            tracing::info!("{}", parsed.status_message());
            Ok(parsed.table)
        }
        Err(e @ (PackError::MissingWorksheet | PackError::MalformedWorkbook(_))) => {
            tracing::warn!("Error reading mapping file: {}. Continuing without renames.", e);
            Ok(MappingTable::new())
        }
        Err(e) => Err(e),
    }
}

fn log_diagnostics(parsed: &ParsedMapping) {
    for row in &parsed.diagnostics.skipped_rows {
        tracing::warn!(
            "Row {} skipped: missing {} (values: {:?}, {:?})",
            row.row_number,
            row.missing_columns.join(" and "),
            row.raw_values.0,
            row.raw_values.1
        );
    }
    for dup in &parsed.diagnostics.duplicate_rows {
        tracing::warn!(
            "Row {}: duplicate key '{}' (first at row {}), '{}' replaced by '{}'",
            dup.row_number,
            dup.key,
            dup.first_row_number,
            dup.first_value,
            dup.new_value
        );
    }
}

fn write_single(single: SingleFileResult, out: &Path, as_json: bool) -> Result<(), PackError> {
    let written = match &single.output {
        Some(output) => {
            let path = out.join(&output.name);
            fs::write(&path, &output.bytes)?;
            Some(path)
        }
        None => None,
    };

    if as_json {
        let value = json!({
            "outcome": single.outcome,
            "renamed_from": single.renamed_from,
            "output": written,
            "elapsed_ms": single.elapsed.as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", single.status_message());
    if let Some(path) = written {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn write_batch(batch: BatchRun, out: &Path, as_json: bool) -> Result<(), PackError> {
    let summary = batch.report.finalize();

    let written = match &batch.archive {
        Some(archive) => {
            let path = out.join(&archive.file_name);
            fs::write(&path, &archive.bytes)?;
            Some(path)
        }
        None => None,
    };

    if as_json {
        let value = json!({
            "summary": summary,
            "report": batch.report,
            "archive": written,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", summary.headline);
    println!(
        "  converted: {}  passed through: {}  failed: {}  renamed: {}",
        summary.converted, summary.passed_through, summary.failed, summary.renamed
    );
    if summary.converted > 0 {
        println!(
            "  HEIC input {} -> JPEG output {}",
            format_file_size(summary.original_bytes),
            format_file_size(summary.converted_bytes)
        );
    }
    for failed in &batch.report.failed {
        println!("  failed: {} ({})", failed.name, failed.error);
    }
    for renamed in &batch.report.renamed {
        println!("  renamed: {} -> {}", renamed.from, renamed.to);
    }
    if let Some(path) = written {
        println!("Saved {}", path.display());
    }
    Ok(())
}

fn inspect_mapping(args: InspectArgs) -> Result<(), PackError> {
    let mut options = Settings::load().mapping;
    args.mapping_args.apply(&mut options);

    let parsed = load_mapping_file(&args.file, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&parsed)?);
        return Ok(());
    }

    println!("{}", parsed.status_message());
    for (from, to) in parsed.table.iter() {
        println!("  {} -> {}", from, to);
    }
    if parsed.diagnostics.is_clean() {
        return Ok(());
    }

    println!("Diagnostics:");
    for row in &parsed.diagnostics.skipped_rows {
        println!("  row {}: skipped, missing {}", row.row_number, row.missing_columns.join(" and "));
    }
    for dup in &parsed.diagnostics.duplicate_rows {
        println!(
            "  row {}: '{}' was '{}' (row {}), now '{}'",
            dup.row_number, dup.key, dup.first_value, dup.first_row_number, dup.new_value
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_flags_override_mapping_options() {
        let cli = Cli::try_parse_from([
            "heicpack",
            "convert",
            "photos",
            "--key-column",
            "b",
            "--value-column",
            "AA",
            "--csv-header-rows",
            "1",
            "--delimiter",
            ";",
        ])
        .unwrap();

        let Cli::Convert(args) = cli else {
            panic!("Expected convert subcommand");
        };
        let mut options = MappingOptions::default();
        args.mapping_args.apply(&mut options);

        assert_eq!(args.paths, vec![PathBuf::from("photos")]);
        assert_eq!(options.key_column, 1);
        assert_eq!(options.value_column, 26);
        assert_eq!(options.delimited_header_rows, 1);
        assert_eq!(options.sheet_header_rows, 1);
        assert_eq!(options.delimiter, ';');
    }

    #[test]
    fn test_invalid_column_is_rejected() {
        let result = Cli::try_parse_from(["heicpack", "inspect-mapping", "map.csv", "--key-column", "1"]);
        assert!(result.is_err());

        let result =
            Cli::try_parse_from(["heicpack", "convert", "a.heic", "--value-column", "ZZZZZZZZZZZZZZZ"]);
        assert!(result.is_err());
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("heicpack_cli_{}_{}", std::process::id(), name))
    }

    fn workbook_without_sheets() -> Vec<u8> {
        use std::io::{
            Cursor,
            Write,
        };

        use zip::{
            write::SimpleFileOptions,
            ZipWriter,
        };

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_unreadable_workbooks_continue_unmapped() {
        let options = MappingOptions::default();

        let no_sheet = temp_path("no_sheet.xlsx");
        fs::write(&no_sheet, workbook_without_sheets()).unwrap();
        let table = load_mapping_or_continue(&no_sheet, &options).unwrap();
        assert!(table.is_empty());

        let not_zip = temp_path("not_zip.xlsx");
        fs::write(&not_zip, b"plain bytes").unwrap();
        let table = load_mapping_or_continue(&not_zip, &options).unwrap();
        assert!(table.is_empty());

        fs::remove_file(&no_sheet).unwrap();
        fs::remove_file(&not_zip).unwrap();
    }

    #[test]
    fn test_unsupported_mapping_type_aborts() {
        // Never created: the extension is rejected before any read
        let path = temp_path("names.txt");

        let result = load_mapping_or_continue(&path, &MappingOptions::default());
        assert!(matches!(result, Err(PackError::UnsupportedMappingFileType(_))));
    }

    #[test]
    fn test_valid_mapping_is_loaded() {
        let path = temp_path("names.csv");
        let mut fields = vec![""; 16];
        fields.extend(["IMG_1.heic", "beach.heic"]);
        fs::write(&path, format!("{}\n", fields.join(","))).unwrap();

        let table = load_mapping_or_continue(&path, &MappingOptions::default()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("IMG_1.heic"), Some("beach.heic"));

        fs::remove_file(&path).unwrap();
    }
}
