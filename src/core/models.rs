use serde::Serialize;

/// One input file of a batch.
///
/// `final_name`, `renamed_from` and `is_heic` start out unresolved and are set
/// once during the analysis phase of the pipeline.
#[derive(Debug, Clone)]
pub struct FileItem {
    pub original_name: String,
    pub relative_path: String, // Folder prefix inside the archive, "" or ending in '/'
    pub bytes: Vec<u8>,
    pub final_name: String,
    pub renamed_from: Option<String>,
    pub is_heic: bool,
}

impl FileItem {
    pub fn new(
        original_name: impl Into<String>,
        relative_path: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        let original_name = original_name.into();
        FileItem {
            final_name: original_name.clone(),
            original_name,
            relative_path: relative_path.into(),
            bytes,
            renamed_from: None,
            is_heic: false,
        }
    }

    pub fn was_renamed(&self) -> bool {
        self.renamed_from.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConvertedFile {
    pub original: String,
    pub output_name: String,
    pub original_size: u64,
    pub converted_size: u64,
    pub was_renamed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassedThroughFile {
    pub name: String,
    pub was_renamed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenamedFile {
    pub from: String,
    pub to: String,
}

/// Result of processing one `FileItem`. Exactly one is produced per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted(ConvertedFile),
    PassedThrough(PassedThroughFile),
    Failed(FailedFile),
}
