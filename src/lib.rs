pub mod archive;
pub mod codec;
pub mod core;
pub mod mapping;
pub mod persistence;

pub use crate::{
    archive::{
        ArchiveWriter,
        ZipArchiveWriter,
    },
    codec::{
        ImageCodec,
        ImageCrateCodec,
    },
    core::{
        BatchReport,
        BatchSummary,
        ConversionOutcome,
        ConversionPipeline,
        FileItem,
        PackError,
        PipelineOptions,
        PipelineResult,
    },
    mapping::{
        load_mapping_file,
        MappingOptions,
        MappingTable,
        ParsedMapping,
    },
    persistence::Settings,
};
