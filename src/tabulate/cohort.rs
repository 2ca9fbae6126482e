//! Tabulation of a cohort of samples into a hits matrix
use crate::shared::errors::{SampleError, SampleFailure};
use crate::shared::parameters::{CohortOptions, MatchParameters};
use crate::shared::utils::sample_name;
use crate::tabulate::key::ClonotypeKey;
use crate::tabulate::panel::ReferencePanel;
use crate::tabulate::sample::tabulate_file;
use anyhow::{anyhow, Result};
#[cfg(feature = "kdam")]
use kdam::TqdmParallelIterator;
use log::{info, warn};
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A sample to tabulate: its identifier and the repertoire file it comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SampleInput {
    pub name: String,
    pub path: PathBuf,
}

impl SampleInput {
    pub fn new(name: &str, path: &Path) -> SampleInput {
        SampleInput {
            name: name.to_string(),
            path: path.to_path_buf(),
        }
    }

    /// Use the file name, minus `strip_str`, as the sample identifier.
    pub fn from_path(path: &Path, strip_str: &str) -> SampleInput {
        SampleInput {
            name: sample_name(path, strip_str),
            path: path.to_path_buf(),
        }
    }
}

/// Reference clonotypes x samples table of abundances, with the allele
/// associated to each reference clonotype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HitsMatrix {
    pub keys: Vec<ClonotypeKey>,
    pub alleles: Vec<String>,
    pub samples: Vec<String>,
    // one row per reference clonotype, one column per sample
    pub values: Array2<f64>,
}

impl HitsMatrix {
    pub fn new(
        keys: Vec<ClonotypeKey>,
        alleles: Vec<String>,
        samples: Vec<String>,
        values: Array2<f64>,
    ) -> Result<HitsMatrix> {
        if keys.len() != alleles.len() {
            return Err(anyhow!(
                "Hits matrix with {} clonotypes but {} alleles",
                keys.len(),
                alleles.len()
            ));
        }
        if values.dim() != (keys.len(), samples.len()) {
            return Err(anyhow!(
                "Hits matrix of shape {:?}, expected ({}, {})",
                values.dim(),
                keys.len(),
                samples.len()
            ));
        }
        Ok(HitsMatrix {
            keys,
            alleles,
            samples,
            values,
        })
    }

    /// Assemble the matrix from one column per sample (panel order).
    pub fn from_columns(
        panel: &ReferencePanel,
        samples: Vec<String>,
        columns: &[Vec<f64>],
    ) -> Result<HitsMatrix> {
        if columns.len() != samples.len() {
            return Err(anyhow!("One column per sample is needed"));
        }
        if let Some(col) = columns.iter().find(|c| c.len() != panel.len()) {
            return Err(anyhow!(
                "Column of length {}, the panel has {} clonotypes",
                col.len(),
                panel.len()
            ));
        }
        let values = Array2::from_shape_fn((panel.len(), samples.len()), |(ii, jj)| {
            columns[jj][ii]
        });
        HitsMatrix::new(panel.keys(), panel.alleles(), samples, values)
    }

    pub fn nb_clonotypes(&self) -> usize {
        self.keys.len()
    }

    pub fn nb_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_index(&self, sample: &str) -> Option<usize> {
        self.samples.iter().position(|s| s == sample)
    }

    pub fn column(&self, sample: usize) -> ArrayView1<'_, f64> {
        self.values.column(sample)
    }
}

/// Result of a cohort run: the matrix of the samples that could be
/// tabulated, and the samples that could not.
#[derive(Clone, Debug)]
pub struct Cohort {
    pub matrix: HitsMatrix,
    pub failures: Vec<SampleFailure>,
}

/// Run `tabulate_fn` on every sample (in parallel, on a pool of
/// `options.threads` workers) against the panel keys. Columns follow the
/// order of `samples` whatever the completion order. A failing sample is
/// reported and left out of the matrix; the rest of the cohort goes on.
pub fn build_hits_matrix<F>(
    samples: &[SampleInput],
    panel: &ReferencePanel,
    tabulate_fn: F,
    options: &CohortOptions,
) -> Result<Cohort>
where
    F: Fn(&SampleInput, &[ClonotypeKey]) -> Result<Vec<f64>, SampleError> + Sync,
{
    let reference_keys = panel.keys();
    let mut failures: Vec<(usize, SampleFailure)> = Vec::new();

    // the first input claiming an identifier keeps it
    let mut seen = HashSet::new();
    let mut jobs: Vec<(usize, &SampleInput)> = Vec::with_capacity(samples.len());
    for (idx, sample) in samples.iter().enumerate() {
        if seen.insert(sample.name.as_str()) {
            jobs.push((idx, sample));
        } else {
            failures.push((
                idx,
                SampleFailure {
                    sample: sample.name.clone(),
                    error: SampleError::DuplicateSample(sample.name.clone()),
                },
            ));
        }
    }

    info!(
        "Tabulating {} samples against {} reference clonotypes",
        jobs.len(),
        reference_keys.len()
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(options.threads)
        .build()
        .map_err(|e| anyhow!("Unable to create the worker pool: {}", e))?;

    let work = |&(idx, sample): &(usize, &SampleInput)| {
        if options.is_cancelled() {
            return (idx, None);
        }
        let result = tabulate_fn(sample, &reference_keys).and_then(|column| {
            if column.len() == reference_keys.len() {
                Ok(column)
            } else {
                Err(SampleError::WrongLength {
                    expected: reference_keys.len(),
                    found: column.len(),
                })
            }
        });
        (idx, Some(result))
    };

    let mut results = pool.install(|| fan_out(&jobs, work, options.show_progress));

    if options.is_cancelled() || results.iter().any(|(_, r)| r.is_none()) {
        return Err(anyhow!("Cohort tabulation cancelled"));
    }

    results.sort_by_key(|(idx, _)| *idx);
    let mut names = Vec::with_capacity(results.len());
    let mut columns = Vec::with_capacity(results.len());
    for (idx, result) in results {
        match result {
            Some(Ok(column)) => {
                names.push(samples[idx].name.clone());
                columns.push(column);
            }
            Some(Err(error)) => failures.push((
                idx,
                SampleFailure {
                    sample: samples[idx].name.clone(),
                    error,
                },
            )),
            None => {}
        }
    }

    failures.sort_by_key(|(idx, _)| *idx);
    let failures: Vec<SampleFailure> = failures.into_iter().map(|(_, f)| f).collect();
    for failure in &failures {
        warn!("Sample {} excluded: {}", failure.sample, failure.error);
    }

    let matrix = HitsMatrix::from_columns(panel, names, &columns)?;
    info!(
        "Hits matrix done: {} samples tabulated over {} clonotypes, {} excluded",
        matrix.nb_samples(),
        matrix.nb_clonotypes(),
        failures.len()
    );
    Ok(Cohort { matrix, failures })
}

/// Tabulate every sample file with `params` (see `tabulate_file`).
pub fn tabulate_cohort(
    samples: &[SampleInput],
    panel: &ReferencePanel,
    params: &MatchParameters,
    options: &CohortOptions,
) -> Result<Cohort> {
    params.validate()?;
    build_hits_matrix(
        samples,
        panel,
        |sample, keys| tabulate_file(&sample.path, keys, params),
        options,
    )
}

#[cfg(feature = "kdam")]
fn fan_out<T, R, W>(jobs: &[T], work: W, show_progress: bool) -> Vec<R>
where
    T: Sync,
    R: Send,
    W: Fn(&T) -> R + Sync + Send,
{
    if show_progress {
        jobs.par_iter().tqdm().map(work).collect()
    } else {
        jobs.par_iter().map(work).collect()
    }
}

#[cfg(not(feature = "kdam"))]
fn fan_out<T, R, W>(jobs: &[T], work: W, _show_progress: bool) -> Vec<R>
where
    T: Sync,
    R: Send,
    W: Fn(&T) -> R + Sync + Send,
{
    jobs.par_iter().map(work).collect()
}
