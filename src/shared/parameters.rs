//! The structs used for specifying the parameters of a run
use crate::shared::errors::ConfigurationError;
use anyhow::{anyhow, Result};
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use pyo3::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[cfg_attr(all(feature = "py_binds", feature = "pyo3"), pyclass(get_all, set_all))]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParameters {
    // field delimiter of the sample (and reference) files
    pub sep: String,
    // string joining the matched fields into a clonotype key
    pub sep_str: String,
    // ordered list of columns forming the key
    pub cols_to_match: Vec<String>,
    // subset of cols_to_match converted from gene to family (TRBV12*01 -> V12)
    pub cols_to_family: Vec<String>,
    // abundance column (count, templates, productive templates...)
    pub col_to_count: String,
}

impl Default for MatchParameters {
    fn default() -> MatchParameters {
        MatchParameters {
            sep: "\t".to_string(),
            sep_str: ",".to_string(),
            cols_to_match: vec!["v_b_gene".to_string(), "cdr3_b_aa".to_string()],
            cols_to_family: vec!["v_b_gene".to_string()],
            col_to_count: "count".to_string(),
        }
    }
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pymethods]
impl MatchParameters {
    #[new]
    pub fn py_new() -> Self {
        MatchParameters::default()
    }

    fn __repr__(&self) -> PyResult<String> {
        Ok(format!(
            "MatchParameters(sep={:?}, sep_str={:?}, cols_to_match={:?}, cols_to_family={:?}, col_to_count={:?})",
            self.sep, self.sep_str, self.cols_to_match, self.cols_to_family, self.col_to_count
        ))
    }
}

impl MatchParameters {
    pub fn new(
        sep: &str,
        sep_str: &str,
        cols_to_match: Vec<String>,
        cols_to_family: Vec<String>,
        col_to_count: &str,
    ) -> Result<MatchParameters, ConfigurationError> {
        let params = MatchParameters {
            sep: sep.to_string(),
            sep_str: sep_str.to_string(),
            cols_to_match,
            cols_to_family,
            col_to_count: col_to_count.to_string(),
        };
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.delimiter()?;
        if self.cols_to_match.is_empty() {
            return Err(ConfigurationError::NoMatchColumns);
        }
        if let Some(col) = self
            .cols_to_family
            .iter()
            .find(|c| !self.cols_to_match.contains(c))
        {
            return Err(ConfigurationError::FamilyColumnNotMatched(col.clone()));
        }
        Ok(())
    }

    /// Field delimiter as a single byte, `\t` is accepted as an escape.
    pub fn delimiter(&self) -> Result<u8, ConfigurationError> {
        parse_delimiter(&self.sep)
    }

    /// For each column of `cols_to_match`, whether it goes through family normalization.
    pub fn family_mask(&self) -> Vec<bool> {
        self.cols_to_match
            .iter()
            .map(|c| self.cols_to_family.contains(c))
            .collect()
    }

    pub fn load_json(path: &Path) -> Result<MatchParameters> {
        let file = File::open(path)
            .map_err(|e| anyhow!("Unable to open {}: {}", path.display(), e))?;
        let params: MatchParameters = serde_json::from_reader(BufReader::new(file))?;
        params.validate()?;
        Ok(params)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

pub fn parse_delimiter(sep: &str) -> Result<u8, ConfigurationError> {
    match sep {
        "\\t" => Ok(b'\t'),
        s if s.len() == 1 => Ok(s.as_bytes()[0]),
        s => Err(ConfigurationError::InvalidDelimiter(s.to_string())),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Locus {
    #[serde(rename = "HLA-A")]
    A,
    #[serde(rename = "HLA-B")]
    B,
    #[serde(rename = "HLA-C")]
    C,
}

impl Locus {
    /// Prefix shared by all the alleles of the locus (`HLA-A*02:01`...).
    pub fn prefix(&self) -> &'static str {
        match self {
            Locus::A => "HLA-A",
            Locus::B => "HLA-B",
            Locus::C => "HLA-C",
        }
    }

    pub fn contains(&self, allele: &str) -> bool {
        allele.starts_with(self.prefix())
    }

    /// Default name of the truth column for this locus (`hla_a`...).
    pub fn truth_column(&self) -> &'static str {
        match self {
            Locus::A => "hla_a",
            Locus::B => "hla_b",
            Locus::C => "hla_c",
        }
    }
}

impl FromStr for Locus {
    type Err = ConfigurationError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HLA-A" => Ok(Locus::A),
            "HLA-B" => Ok(Locus::B),
            "HLA-C" => Ok(Locus::C),
            _ => Err(ConfigurationError::InvalidLocus(s.to_string())),
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// Which per-allele statistic is normalized into a weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvidenceMethod {
    // number of diagnostic clonotypes seen at all (recommended)
    Detects,
    // summed abundance of the diagnostic clonotypes
    Counts,
}

impl EvidenceMethod {
    pub fn from_flags(
        use_detects: bool,
        use_counts: bool,
    ) -> Result<EvidenceMethod, ConfigurationError> {
        match (use_detects, use_counts) {
            (true, false) => Ok(EvidenceMethod::Detects),
            (false, true) => Ok(EvidenceMethod::Counts),
            (true, true) => Err(ConfigurationError::BothMethods),
            (false, false) => Err(ConfigurationError::NoMethod),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EvidenceMethod::Detects => "detection",
            EvidenceMethod::Counts => "counts",
        }
    }
}

impl fmt::Display for EvidenceMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Minimal weight needed to call an allele, in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Threshold(f64);

impl Threshold {
    pub fn new(value: f64) -> Result<Threshold, ConfigurationError> {
        if !(0.0..=1.0).contains(&value) {
            // also catches NaN
            return Err(ConfigurationError::ThresholdOutOfRange(value));
        }
        Ok(Threshold(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn passes(&self, weight: f64) -> bool {
        weight >= self.0
    }
}

impl Default for Threshold {
    fn default() -> Threshold {
        Threshold(0.1)
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct CohortOptions {
    // size of the worker pool, 0 lets rayon decide
    pub threads: usize,
    // display a progress bar while the samples are tabulated
    pub show_progress: bool,
    // set by the caller to stop scheduling new samples
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for CohortOptions {
    fn default() -> CohortOptions {
        CohortOptions {
            threads: 2,
            show_progress: false,
            cancel: None,
        }
    }
}

impl CohortOptions {
    pub fn new(threads: usize) -> CohortOptions {
        CohortOptions {
            threads,
            ..Default::default()
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, |c| c.load(Ordering::SeqCst))
    }
}
