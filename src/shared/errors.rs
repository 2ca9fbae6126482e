//! Error taxonomy of the pipeline
//!
//! `ConfigurationError` stops a run before any I/O happens. `SampleError`
//! only removes the offending sample from the cohort. Records whose gene name
//! has no family code are not errors at all (they simply never match).
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Invalid locus '{0}' (available loci: HLA-A, HLA-B, HLA-C)")]
    InvalidLocus(String),

    #[error("Threshold must be between 0 and 1, got {0}")]
    ThresholdOutOfRange(f64),

    #[error("You can use either counts (use_counts) or detects (use_detects), not both")]
    BothMethods,

    #[error("One of counts (use_counts) or detects (use_detects) must be selected")]
    NoMethod,

    #[error("The reference panel has no entry for the locus {0}")]
    EmptyLocusPanel(String),

    #[error("The reference panel is empty")]
    EmptyPanel,

    #[error("The field delimiter must be a single byte, got '{0}'")]
    InvalidDelimiter(String),

    #[error("At least one column is needed to build clonotype keys")]
    NoMatchColumns,

    #[error("Column '{0}' is converted to family level but is not part of the matching columns")]
    FamilyColumnNotMatched(String),

    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SampleError {
    #[error("Unable to read {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("Missing required column '{0}'")]
    MissingColumn(String),

    #[error("Invalid abundance '{value}' on line {line}")]
    InvalidAbundance { line: u64, value: String },

    #[error("Malformed sample table: {0}")]
    Malformed(String),

    #[error("Sample identifier '{0}' is already used by another input")]
    DuplicateSample(String),

    #[error("Tabulation returned {found} values for {expected} reference clonotypes")]
    WrongLength { expected: usize, found: usize },
}

/// A `SampleError` tagged with the identity of the sample it came from.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("sample {sample}: {error}")]
pub struct SampleFailure {
    pub sample: String,
    pub error: SampleError,
}
