use std::{
    collections::HashSet,
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

use chrono::Utc;
use futures::stream::{
    self,
    StreamExt,
};
use serde::{
    Deserialize,
    Serialize,
};
use tokio::task;

use super::{
    models::{
        ConversionOutcome,
        ConvertedFile,
        FailedFile,
        FileItem,
        PassedThroughFile,
    },
    report::BatchReport,
    utils::{
        describe_size_change,
        ToJpegName,
    },
    ConversionError,
    PackError,
};
use crate::{
    archive::{
        archive_file_name,
        ArchiveWriter,
        ZipArchiveWriter,
    },
    codec::{
        looks_like_image,
        ImageCodec,
        DEFAULT_JPEG_QUALITY,
    },
    mapping::{
        resolve_rename,
        MappingTable,
    },
};

/// `(current, total, message)`
pub type ProgressCallback = Box<dyn Fn(usize, usize, String) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineOptions {
    pub jpeg_quality: f32,
    pub concurrency: usize, // Conversions in flight at once
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { jpeg_quality: DEFAULT_JPEG_QUALITY, concurrency: 4 }
    }
}

#[derive(Debug, Clone)]
pub struct OutputFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ArchiveOutput {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct BatchRun {
    pub report: BatchReport,
    pub archive: Option<ArchiveOutput>, // None when nothing succeeded
}

#[derive(Debug, Clone)]
pub struct SingleFileResult {
    pub outcome: ConversionOutcome,
    pub renamed_from: Option<String>,
    pub output: Option<OutputFile>, // Only set for converted files
    pub elapsed: Duration,
}

impl SingleFileResult {
    pub fn status_message(&self) -> String {
        let rename_note = if self.renamed_from.is_some() {
            " File was renamed using mapping."
        } else {
            ""
        };

        match &self.outcome {
            ConversionOutcome::Converted(file) => format!(
                "Successfully converted! File is {} ({}ms).{}",
                describe_size_change(file.original_size, file.converted_size),
                self.elapsed.as_millis(),
                rename_note
            ),
            ConversionOutcome::PassedThrough(_) => format!(
                "This is not a HEIC/HEIF file. No conversion needed.{}",
                rename_note
            ),
            ConversionOutcome::Failed(file) => format!("Error: {}", file.error),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PipelineResult {
    Single(SingleFileResult),
    Batch(BatchRun),
}

/// Per-item result before archive placement.
struct ProcessedItem {
    final_name: String,
    outcome: ConversionOutcome,
    output: Option<OutputFile>,
    relative_path: String,
    renamed_from: Option<String>,
}

pub struct ConversionPipeline {
    codec: Arc<dyn ImageCodec>,
    options: PipelineOptions,
    progress: Option<ProgressCallback>,
}

impl ConversionPipeline {
    pub fn new(codec: Arc<dyn ImageCodec>, options: PipelineOptions) -> Self {
        Self { codec, options, progress: None }
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    fn report_progress(&self, current: usize, total: usize, message: String) {
        if let Some(ref callback) = self.progress {
            callback(current, total, message);
        }
    }

    /// One item runs in single-file mode, anything else as a batch.
    pub async fn process(
        &self,
        mut items: Vec<FileItem>,
        table: &MappingTable,
    ) -> Result<PipelineResult, PackError> {
        if items.len() == 1 {
            let item = items.remove(0);
            return Ok(PipelineResult::Single(self.run_single(item, table).await));
        }

        self.run(items, table).await.map(PipelineResult::Batch)
    }

    pub async fn run(&self, items: Vec<FileItem>, table: &MappingTable) -> Result<BatchRun, PackError> {
        self.run_with_writer(items, table, ZipArchiveWriter::new()).await
    }

    pub async fn run_with_writer<W: ArchiveWriter>(
        &self,
        mut items: Vec<FileItem>,
        table: &MappingTable,
        mut writer: W,
    ) -> Result<BatchRun, PackError> {
        let total = items.len();
        if total == 0 {
            tracing::info!("No files to process");
            return Ok(BatchRun { report: BatchReport::new(), archive: None });
        }

        let start = Instant::now();
        self.analyze(&mut items, table);

        let heic_count = items.iter().filter(|item| item.is_heic).count();
        tracing::info!(
            "Converting {} HEIC files ({} passed through)",
            heic_count,
            total - heic_count
        );

        let mut results = stream::iter(items.into_iter().enumerate())
            .map(move |(idx, item)| async move {
                self.report_progress(idx + 1, total, format!("Converting {}...", item.final_name));
                self.convert_item(item).await
            })
            .buffered(self.options.concurrency.max(1));

        let mut report = BatchReport::new();
        let mut used_paths: HashSet<String> = HashSet::new();

        // Results arrive in input order; placement and reporting happen here only
        while let Some(processed) = results.next().await {
            let ProcessedItem { final_name, outcome, output, relative_path, renamed_from } = processed;
            let outcome = match output {
                Some(file) => {
                    let path = format!("{}{}", relative_path, file.name);
                    if used_paths.insert(path.clone()) {
                        writer.add_entry(&path, &file.bytes)?;
                        if let Some(from) = renamed_from {
                            report.record_rename(from, file.name);
                        }
                        outcome
                    } else {
                        tracing::warn!("Skipping {}: archive already has an entry at that path", path);
                        ConversionOutcome::Failed(FailedFile {
                            name: final_name,
                            error: format!("Duplicate output path {}", path),
                        })
                    }
                }
                None => outcome,
            };

            report.record(outcome);
        }

        if report.success_count() == 0 {
            tracing::warn!("No files could be processed");
            return Ok(BatchRun { report, archive: None });
        }

        self.report_progress(1, 1, "Creating ZIP file...".to_string());
        let entry_count = writer.entry_count();
        let bytes = writer.serialize()?;

        tracing::info!(
            "Batch completed ({:.1}s): {} converted, {} passed through, {} failed",
            start.elapsed().as_secs_f32(),
            report.converted.len(),
            report.passed_through.len(),
            report.failed.len()
        );

        Ok(BatchRun {
            report,
            archive: Some(ArchiveOutput {
                file_name: archive_file_name(Utc::now()),
                bytes,
                entry_count,
            }),
        })
    }

    /// Single-file mode: no archive, the converted JPEG is returned directly.
    pub async fn run_single(&self, mut item: FileItem, table: &MappingTable) -> SingleFileResult {
        let start = Instant::now();
        self.analyze(std::slice::from_mut(&mut item), table);
        let renamed_from = item.renamed_from.clone();

        if !item.is_heic && !looks_like_image(&item.bytes) {
            tracing::warn!("{} is not a supported image", item.final_name);
            return SingleFileResult {
                outcome: ConversionOutcome::Failed(FailedFile {
                    name: item.final_name,
                    error: "Unsupported file type".to_string(),
                }),
                renamed_from,
                output: None,
                elapsed: start.elapsed(),
            };
        }

        let processed = self.convert_item(item).await;
        let output = match processed.outcome {
            ConversionOutcome::Converted(_) => processed.output,
            _ => None,
        };

        SingleFileResult { outcome: processed.outcome, renamed_from, output, elapsed: start.elapsed() }
    }

    /// Detects HEIC content and resolves final names, in input order.
    pub fn analyze(&self, items: &mut [FileItem], table: &MappingTable) {
        let total = items.len();

        for (idx, item) in items.iter_mut().enumerate() {
            item.is_heic = match self.codec.is_heic(&item.bytes) {
                Ok(is_heic) => is_heic,
                Err(e) => {
                    tracing::warn!("Could not inspect {}: {}", item.original_name, e);
                    false
                }
            };

            let (final_name, renamed_from) = resolve_rename(&item.original_name, table);
            if let Some(ref from) = renamed_from {
                tracing::debug!("Renaming {} -> {}", from, final_name);
            }
            item.final_name = final_name;
            item.renamed_from = renamed_from;

            self.report_progress(idx + 1, total, "Analyzing files...".to_string());
        }
    }

    async fn convert_item(&self, item: FileItem) -> ProcessedItem {
        let was_renamed = item.was_renamed();
        let FileItem { final_name, relative_path, bytes, renamed_from, is_heic, .. } = item;

        if !is_heic {
            return ProcessedItem {
                outcome: ConversionOutcome::PassedThrough(PassedThroughFile {
                    name: final_name.clone(),
                    was_renamed,
                }),
                output: Some(OutputFile { name: final_name.clone(), bytes }),
                final_name,
                relative_path,
                renamed_from,
            };
        }

        let original_size = bytes.len() as u64;
        let codec = Arc::clone(&self.codec);
        let quality = self.options.jpeg_quality;

        let converted = task::spawn_blocking(move || codec.convert_to_jpeg(&bytes, quality))
            .await
            .unwrap_or_else(|e| Err(ConversionError::new(format!("Conversion task failed: {}", e))));

        match converted {
            Ok(jpeg) => {
                let output_name = final_name.to_jpeg_name();
                tracing::debug!("Converted {} -> {} ({} bytes)", final_name, output_name, jpeg.len());
                ProcessedItem {
                    outcome: ConversionOutcome::Converted(ConvertedFile {
                        original: renamed_from.clone().unwrap_or_else(|| final_name.clone()),
                        output_name: output_name.clone(),
                        original_size,
                        converted_size: jpeg.len() as u64,
                        was_renamed,
                    }),
                    output: Some(OutputFile { name: output_name, bytes: jpeg }),
                    final_name,
                    relative_path,
                    renamed_from,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to convert {}: {}", final_name, e);
                ProcessedItem {
                    outcome: ConversionOutcome::Failed(FailedFile {
                        name: final_name.clone(),
                        error: e.message,
                    }),
                    output: None,
                    final_name,
                    relative_path,
                    renamed_from,
                }
            }
        }
    }
}
