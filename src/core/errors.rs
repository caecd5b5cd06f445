use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("I/O error: {0}")]
    Io(Box<std::io::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(Box<csv::Error>),

    #[error("Could not find worksheet in Excel file")]
    MissingWorksheet,

    #[error("Failed to read Excel file: {0}")]
    MalformedWorkbook(String),

    #[error("Unsupported mapping file type: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedMappingFileType(String),

    #[error("Failed to create archive: {0}")]
    Archive(String),

    #[error("PackError: {0}")]
    Custom(String),
}

impl From<std::io::Error> for PackError {
    fn from(error: std::io::Error) -> Self {
        PackError::Io(Box::new(error))
    }
}

impl From<csv::Error> for PackError {
    fn from(error: csv::Error) -> Self {
        PackError::Csv(Box::new(error))
    }
}

/// Failure of a single image conversion. Never crosses the batch boundary:
/// the pipeline turns it into a `Failed` outcome.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ConversionError {
    pub message: String,
}

impl ConversionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<image::ImageError> for ConversionError {
    fn from(error: image::ImageError) -> Self {
        ConversionError::new(error.to_string())
    }
}
