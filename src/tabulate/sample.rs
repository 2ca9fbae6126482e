//! Exact-match tabulation of one repertoire sample against the reference keys
use crate::shared::errors::SampleError;
use crate::shared::gene::normalize_family;
use crate::shared::parameters::MatchParameters;
use crate::shared::parser::read_sample_rows;
use crate::tabulate::key::{make_key, ClonotypeKey};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// One repertoire record, projected on the matching columns (in
/// `cols_to_match` order, gene names not yet normalized) and the abundance.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRow {
    pub fields: Vec<String>,
    pub abundance: f64,
}

impl SampleRow {
    pub fn new<S: AsRef<str>>(fields: &[S], abundance: f64) -> SampleRow {
        SampleRow {
            fields: fields.iter().map(|f| f.as_ref().to_string()).collect(),
            abundance,
        }
    }
}

/// Key of a record. `None` when one of the family columns has no family code,
/// such a record can't match anything.
pub fn clonotype_key(row: &SampleRow, family_mask: &[bool], sep_str: &str) -> Option<ClonotypeKey> {
    let mut fields = Vec::with_capacity(row.fields.len());
    for (field, &to_family) in row.fields.iter().zip(family_mask) {
        if to_family {
            fields.push(normalize_family(field)?.to_string());
        } else {
            fields.push(field.clone());
        }
    }
    Some(make_key(&fields, sep_str))
}

/// Sum the abundance of the records sharing a key (allele ambiguity can
/// split one clonotype over several records).
pub fn aggregate(
    rows: &[SampleRow],
    params: &MatchParameters,
) -> HashMap<ClonotypeKey, f64> {
    let mask = params.family_mask();
    let mut counts: HashMap<ClonotypeKey, f64> = HashMap::new();
    for row in rows {
        if let Some(key) = clonotype_key(row, &mask, &params.sep_str) {
            *counts.entry(key).or_insert(0.) += row.abundance;
        }
    }
    counts
}

/// Abundance of every reference key in the sample, in `reference_keys` order
/// (0 when the key is absent).
pub fn tabulate(
    rows: &[SampleRow],
    reference_keys: &[ClonotypeKey],
    params: &MatchParameters,
) -> Vec<f64> {
    let counts = aggregate(rows, params);
    reference_keys
        .iter()
        .map(|k| counts.get(k).copied().unwrap_or(0.))
        .collect()
}

pub fn tabulate_file(
    path: &Path,
    reference_keys: &[ClonotypeKey],
    params: &MatchParameters,
) -> Result<Vec<f64>, SampleError> {
    let file = File::open(path).map_err(|e| SampleError::Unreadable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rows = read_sample_rows(file, params)?;
    Ok(tabulate(&rows, reference_keys, params))
}
