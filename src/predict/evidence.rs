//! Weight of evidence: per (allele, sample) statistics over the diagnostic
//! clonotypes of one locus, normalized within each sample.
//!
//! For an allele with `n` diagnostic clonotypes in the panel, `detects` of
//! which are seen in a sample (for a summed abundance `sum`):
//!   dadj = detects / n,  cadj = sum / n
//!   wd = dadj / sum_alleles(dadj),  wc = cadj / sum_alleles(cadj)
//! Deeper sequenced samples detect more of everything, dividing by the sample
//! total removes that effect; dividing by `n` removes the panel size effect.
use crate::shared::errors::ConfigurationError;
use crate::shared::parameters::{EvidenceMethod, Locus};
use crate::tabulate::cohort::HitsMatrix;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRow {
    pub allele: String,
    pub sample: String,
    // number of panel clonotypes associated with the allele
    pub n: usize,
    // summed abundance of these clonotypes in the sample
    pub sum: f64,
    // how many of them have a non-zero abundance
    pub detects: usize,
    pub dadj: f64,
    pub cadj: f64,
    pub total_dadj: f64,
    pub total_cadj: f64,
    pub wd: f64,
    pub wc: f64,
}

impl EvidenceRow {
    pub fn weight(&self, method: EvidenceMethod) -> f64 {
        match method {
            EvidenceMethod::Detects => self.wd,
            EvidenceMethod::Counts => self.wc,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub locus: Locus,
    pub method: EvidenceMethod,
    // sorted by name
    pub alleles: Vec<String>,
    // hits matrix order
    pub samples: Vec<String>,
    // allele-major: evidence[a * samples.len() + s]
    pub evidence: Vec<EvidenceRow>,
    // samples x alleles, weights of the selected method
    pub weights: Array2<f64>,
}

impl WeightTable {
    pub fn nb_alleles(&self) -> usize {
        self.alleles.len()
    }

    pub fn nb_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn evidence_row(&self, allele: usize, sample: usize) -> &EvidenceRow {
        &self.evidence[allele * self.samples.len() + sample]
    }

    pub fn find(&self, allele: &str, sample: &str) -> Option<&EvidenceRow> {
        let a = self.alleles.iter().position(|x| x == allele)?;
        let s = self.samples.iter().position(|x| x == sample)?;
        Some(self.evidence_row(a, s))
    }

    /// (allele, weight) pairs of one sample, in allele order.
    pub fn sample_weights(&self, sample: usize) -> Vec<(String, f64)> {
        self.alleles
            .iter()
            .cloned()
            .zip(self.weights.row(sample).iter().copied())
            .collect()
    }
}

/// Same as `score`, with the two mutually exclusive flags of the command line.
pub fn score_with_flags(
    matrix: &HitsMatrix,
    locus: Locus,
    use_detects: bool,
    use_counts: bool,
) -> Result<WeightTable, ConfigurationError> {
    let method = EvidenceMethod::from_flags(use_detects, use_counts)?;
    score(matrix, locus, method)
}

pub fn score(
    matrix: &HitsMatrix,
    locus: Locus,
    method: EvidenceMethod,
) -> Result<WeightTable, ConfigurationError> {
    // panel rows of each allele of the locus
    let mut rows_by_allele: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (row, allele) in matrix.alleles.iter().enumerate() {
        if locus.contains(allele) {
            rows_by_allele.entry(allele.as_str()).or_default().push(row);
        }
    }
    if rows_by_allele.is_empty() {
        return Err(ConfigurationError::EmptyLocusPanel(locus.to_string()));
    }

    let nb_alleles = rows_by_allele.len();
    let nb_samples = matrix.nb_samples();
    let mut n = vec![0usize; nb_alleles];
    let mut sum = Array2::<f64>::zeros((nb_alleles, nb_samples));
    let mut detects = Array2::<usize>::zeros((nb_alleles, nb_samples));
    for (a, rows) in rows_by_allele.values().enumerate() {
        n[a] = rows.len();
        for &row in rows {
            for (s, &value) in matrix.values.row(row).iter().enumerate() {
                sum[[a, s]] += value;
                if value > 0. {
                    detects[[a, s]] += 1;
                }
            }
        }
    }

    let dadj = Array2::from_shape_fn((nb_alleles, nb_samples), |(a, s)| {
        detects[[a, s]] as f64 / n[a] as f64
    });
    let cadj = Array2::from_shape_fn((nb_alleles, nb_samples), |(a, s)| sum[[a, s]] / n[a] as f64);
    let total_dadj = dadj.sum_axis(Axis(0));
    let total_cadj = cadj.sum_axis(Axis(0));

    let alleles: Vec<String> = rows_by_allele.keys().map(|a| a.to_string()).collect();
    let mut evidence = Vec::with_capacity(nb_alleles * nb_samples);
    let mut weights = Array2::<f64>::zeros((nb_samples, nb_alleles));
    for (a, allele) in alleles.iter().enumerate() {
        for (s, sample) in matrix.samples.iter().enumerate() {
            let row = EvidenceRow {
                allele: allele.clone(),
                sample: sample.clone(),
                n: n[a],
                sum: sum[[a, s]],
                detects: detects[[a, s]],
                dadj: dadj[[a, s]],
                cadj: cadj[[a, s]],
                total_dadj: total_dadj[s],
                total_cadj: total_cadj[s],
                wd: normalized(dadj[[a, s]], total_dadj[s]),
                wc: normalized(cadj[[a, s]], total_cadj[s]),
            };
            weights[[s, a]] = row.weight(method);
            evidence.push(row);
        }
    }

    Ok(WeightTable {
        locus,
        method,
        alleles,
        samples: matrix.samples.clone(),
        evidence,
        weights,
    })
}

// no evidence at all in the sample: every weight is 0
fn normalized(value: f64, total: f64) -> f64 {
    if total > 0. {
        value / total
    } else {
        0.
    }
}
