use serde::Serialize;

use super::models::{
    ConversionOutcome,
    ConvertedFile,
    FailedFile,
    PassedThroughFile,
    RenamedFile,
};

/// Outcomes of a batch, kept in input order per category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub converted: Vec<ConvertedFile>,
    pub passed_through: Vec<PassedThroughFile>,
    pub failed: Vec<FailedFile>,
    pub renamed: Vec<RenamedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub converted: usize,
    pub passed_through: usize,
    pub failed: usize,
    pub renamed: usize,
    pub total: usize,
    pub succeeded: usize,
    pub original_bytes: u64,  // Sum over converted files only
    pub converted_bytes: u64,
    pub byte_delta: i64,      // converted - original; negative means smaller
    pub headline: String,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ConversionOutcome) {
        match outcome {
            ConversionOutcome::Converted(file) => self.converted.push(file),
            ConversionOutcome::PassedThrough(file) => self.passed_through.push(file),
            ConversionOutcome::Failed(file) => self.failed.push(file),
        }
    }

    pub fn record_rename(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.renamed.push(RenamedFile { from: from.into(), to: to.into() });
    }

    pub fn outcome_count(&self) -> usize {
        self.converted.len() + self.passed_through.len() + self.failed.len()
    }

    pub fn success_count(&self) -> usize {
        self.converted.len() + self.passed_through.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcome_count() == 0
    }

    pub fn finalize(&self) -> BatchSummary {
        let original_bytes: u64 = self.converted.iter().map(|f| f.original_size).sum();
        let converted_bytes: u64 = self.converted.iter().map(|f| f.converted_size).sum();

        BatchSummary {
            converted: self.converted.len(),
            passed_through: self.passed_through.len(),
            failed: self.failed.len(),
            renamed: self.renamed.len(),
            total: self.outcome_count(),
            succeeded: self.success_count(),
            original_bytes,
            converted_bytes,
            byte_delta: converted_bytes as i64 - original_bytes as i64,
            headline: self.headline(),
        }
    }

    fn headline(&self) -> String {
        let total = self.outcome_count();
        let succeeded = self.success_count();

        if total == 0 {
            return "No image files found.".to_string();
        }
        if succeeded == 0 {
            return "No files could be processed".to_string();
        }
        if !self.failed.is_empty() {
            return format!(
                "Processed {}/{} files. {} files failed to convert.",
                succeeded,
                total,
                self.failed.len()
            );
        }

        let mut message = format!("Successfully processed all {} files!", total);
        if !self.renamed.is_empty() {
            message.push_str(&format!(
                " {} files were renamed using mapping.",
                self.renamed.len()
            ));
        }
        message
    }
}
