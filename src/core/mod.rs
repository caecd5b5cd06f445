pub mod errors;
pub mod input;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;


pub use errors::{
    ConversionError,
    PackError,
};
pub use models::{
    ConversionOutcome,
    ConvertedFile,
    FailedFile,
    FileItem,
    PassedThroughFile,
    RenamedFile,
};
pub use pipeline::{
    ArchiveOutput,
    BatchRun,
    ConversionPipeline,
    OutputFile,
    PipelineOptions,
    PipelineResult,
    ProgressCallback,
    SingleFileResult,
};
pub use report::{
    BatchReport,
    BatchSummary,
};
