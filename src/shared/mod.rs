//! Shared functionalities: gene names, parameters, errors and table I/O
pub mod errors;
pub mod gene;
pub mod parameters;
pub mod parser;
pub mod py_binding;
pub mod utils;

pub use errors::{ConfigurationError, SampleError, SampleFailure};
pub use gene::{normalize_family, Chain, FamilyCode, GeneNameLookup, Segment, TranslationTable};
pub use parameters::{CohortOptions, EvidenceMethod, Locus, MatchParameters, Threshold};
