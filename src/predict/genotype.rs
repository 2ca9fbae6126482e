//! Top-2 genotype call per sample
use crate::predict::evidence::{score, WeightTable};
use crate::shared::errors::ConfigurationError;
use crate::shared::parameters::{EvidenceMethod, Locus, Threshold};
use crate::tabulate::cohort::HitsMatrix;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GenotypePrediction {
    pub sample: String,
    pub threshold: f64,
    pub method: EvidenceMethod,
    pub locus: Locus,
    // None is "no call"
    pub hla_1: Option<String>,
    pub hla_2: Option<String>,
    pub v1: f64,
    pub v2: Option<f64>,
    pub p1: String,
    // a locus with a single allele in the panel has no second candidate
    pub p2: Option<String>,
    // full weight vector of the sample, allele order of the weight table
    pub weights: Vec<(String, f64)>,
}

impl GenotypePrediction {
    pub fn called(&self) -> Vec<&str> {
        self.hla_1
            .iter()
            .chain(self.hla_2.iter())
            .map(|s| s.as_str())
            .collect()
    }

    pub fn nb_called(&self) -> usize {
        self.hla_1.is_some() as usize + self.hla_2.is_some() as usize
    }

    pub fn weight(&self, allele: &str) -> Option<f64> {
        self.weights
            .iter()
            .find(|(a, _)| a == allele)
            .map(|(_, w)| *w)
    }
}

/// Heaviest first, equal weights broken by allele name.
pub fn rank_alleles(weights: &[(String, f64)]) -> Vec<(String, f64)> {
    let mut ranked = weights.to_vec();
    ranked.sort_by(|a, b| match b.1.total_cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        ord => ord,
    });
    ranked
}

pub fn call(table: &WeightTable, threshold: f64) -> Result<Vec<GenotypePrediction>, ConfigurationError> {
    let threshold = Threshold::new(threshold)?;
    Ok(call_with_threshold(table, threshold))
}

pub fn call_with_threshold(table: &WeightTable, threshold: Threshold) -> Vec<GenotypePrediction> {
    (0..table.nb_samples())
        .filter_map(|s| {
            let weights = table.sample_weights(s);
            let ranked = rank_alleles(&weights);
            let mut top = ranked.into_iter();
            // the weight table always has at least one allele
            let (p1, v1) = top.next()?;
            let second = top.next();
            let hla_1 = threshold.passes(v1).then(|| p1.clone());
            let hla_2 = second
                .as_ref()
                .filter(|(_, v2)| threshold.passes(*v2))
                .map(|(p2, _)| p2.clone());
            Some(GenotypePrediction {
                sample: table.samples[s].clone(),
                threshold: threshold.value(),
                method: table.method,
                locus: table.locus,
                hla_1,
                hla_2,
                v1,
                v2: second.as_ref().map(|(_, v)| *v),
                p1,
                p2: second.map(|(p, _)| p),
                weights,
            })
        })
        .collect()
}

/// Score the hits matrix for one locus and call the genotypes. The threshold
/// is checked before anything is computed.
pub fn weight_of_evidence(
    matrix: &HitsMatrix,
    locus: Locus,
    threshold: f64,
    method: EvidenceMethod,
) -> Result<(WeightTable, Vec<GenotypePrediction>), ConfigurationError> {
    let threshold = Threshold::new(threshold)?;
    let table = score(matrix, locus, method)?;
    let predictions = call_with_threshold(&table, threshold);
    Ok((table, predictions))
}
