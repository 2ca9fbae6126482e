//! Comparison of genotype calls with known HLA types
use crate::predict::evidence::WeightTable;
use crate::predict::genotype::{call_with_threshold, GenotypePrediction};
use crate::shared::errors::ConfigurationError;
use crate::shared::parameters::{EvidenceMethod, Locus, Threshold};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Known genotype of each sample for one locus, as free text
/// (e.g. `HLA-A*02:01,HLA-A*24:02`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruthTable {
    pub truth: HashMap<String, String>,
}

impl TruthTable {
    pub fn new(truth: HashMap<String, String>) -> TruthTable {
        TruthTable { truth }
    }

    pub fn get(&self, sample: &str) -> Option<&str> {
        self.truth
            .get(sample)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

/// One (sample, allele) comparison.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub sample: String,
    pub allele: String,
    pub truth: String,
    // allele in the true genotype
    pub pos: bool,
    // allele called as hla_1 or hla_2
    pub pred_pos: bool,
    pub hla_1: Option<String>,
    pub hla_2: Option<String>,
    pub v1: f64,
    pub v2: Option<f64>,
    pub v_allele: Option<f64>,
    pub threshold: f64,
    pub method: EvidenceMethod,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub allele: String,
    pub locus: Locus,
    pub method: EvidenceMethod,
    pub threshold: f64,
    pub tps: usize,
    pub tns: usize,
    pub fps: usize,
    pub fns: usize,
    // None when the denominator is 0
    pub sens: Option<f64>,
    pub spec: Option<f64>,
    pub acur: Option<f64>,
    pub f1: Option<f64>,
}

impl Performance {
    fn from_counts(
        allele: &str,
        locus: Locus,
        method: EvidenceMethod,
        threshold: f64,
        outcomes: &[Outcome],
    ) -> Performance {
        let count = |pos: bool, pred_pos: bool| {
            outcomes
                .iter()
                .filter(|o| o.pos == pos && o.pred_pos == pred_pos)
                .count()
        };
        let (tps, fps, tns, fns) = (
            count(true, true),
            count(false, true),
            count(false, false),
            count(true, false),
        );
        Performance {
            allele: allele.to_string(),
            locus,
            method,
            threshold,
            tps,
            tns,
            fps,
            fns,
            sens: ratio(tps, tps + fns),
            spec: ratio(tns, tns + fps),
            acur: ratio(tps + tns, tps + tns + fps + fns),
            f1: ratio(2 * tps, 2 * tps + fps + fns),
        }
    }
}

fn ratio(num: usize, den: usize) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Per-allele confusion counts over the samples with a known genotype and
/// some evidence (`v1 > 0`). Alleles without a weight in the predictions
/// are skipped.
pub fn evaluate(
    predictions: &[GenotypePrediction],
    truth: &TruthTable,
    alleles: &[String],
) -> (Vec<Performance>, Vec<Outcome>) {
    let scored: Vec<(&GenotypePrediction, &str)> = predictions
        .iter()
        .filter(|p| p.v1 > 0.)
        .filter_map(|p| truth.get(&p.sample).map(|t| (p, t)))
        .collect();

    let (locus, method, threshold) = match predictions.first() {
        Some(p) => (p.locus, p.method, p.threshold),
        None => return (Vec::new(), Vec::new()),
    };

    let mut performances = Vec::new();
    let mut all_outcomes = Vec::new();
    for allele in alleles {
        if predictions[0].weight(allele).is_none() {
            continue;
        }
        let outcomes: Vec<Outcome> = scored
            .iter()
            .map(|(p, t)| Outcome {
                sample: p.sample.clone(),
                allele: allele.clone(),
                truth: t.to_string(),
                pos: t.contains(allele.as_str()),
                pred_pos: p.called().iter().any(|c| c.contains(allele.as_str())),
                hla_1: p.hla_1.clone(),
                hla_2: p.hla_2.clone(),
                v1: p.v1,
                v2: p.v2,
                v_allele: p.weight(allele),
                threshold: p.threshold,
                method: p.method,
            })
            .collect();
        performances.push(Performance::from_counts(
            allele, locus, method, threshold, &outcomes,
        ));
        all_outcomes.extend(outcomes);
    }
    (performances, all_outcomes)
}

/// `evaluate` at each threshold; by default every allele of the table.
pub fn sweep(
    table: &WeightTable,
    thresholds: &[f64],
    truth: &TruthTable,
    alleles: Option<&[String]>,
) -> Result<(Vec<Performance>, Vec<Outcome>), ConfigurationError> {
    // all the thresholds are checked before any call
    let thresholds = thresholds
        .iter()
        .map(|&t| Threshold::new(t))
        .collect::<Result<Vec<_>, _>>()?;
    let alleles = alleles.unwrap_or(&table.alleles);
    let mut performances = Vec::new();
    let mut outcomes = Vec::new();
    for threshold in thresholds {
        let predictions = call_with_threshold(table, threshold);
        let (p, o) = evaluate(&predictions, truth, alleles);
        performances.extend(p);
        outcomes.extend(o);
    }
    Ok((performances, outcomes))
}
