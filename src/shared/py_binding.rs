#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use crate::predict::{evidence::WeightTable, genotype::call_with_threshold, GenotypePrediction};
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use crate::shared::parameters::{CohortOptions, EvidenceMethod, Locus, MatchParameters, Threshold};
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use crate::shared::parser;
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use crate::tabulate::{tabulate_cohort, SampleInput};
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use anyhow::Result;
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use numpy::{IntoPyArray, PyArray2};
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use pyo3::prelude::*;
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use std::fs::File;
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use std::io::BufWriter;
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use std::path::Path;

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyclass(name = "GenotypePrediction", get_all)]
#[derive(Clone, Debug)]
pub struct PyGenotypePrediction {
    pub sample: String,
    pub threshold: f64,
    pub method: String,
    pub locus: String,
    pub hla_1: Option<String>,
    pub hla_2: Option<String>,
    pub v1: f64,
    pub v2: Option<f64>,
    pub p1: String,
    pub p2: Option<String>,
    pub weights: Vec<(String, f64)>,
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
impl From<GenotypePrediction> for PyGenotypePrediction {
    fn from(p: GenotypePrediction) -> PyGenotypePrediction {
        PyGenotypePrediction {
            sample: p.sample,
            threshold: p.threshold,
            method: p.method.to_string(),
            locus: p.locus.to_string(),
            hla_1: p.hla_1,
            hla_2: p.hla_2,
            v1: p.v1,
            v2: p.v2,
            p1: p.p1,
            p2: p.p2,
            weights: p.weights,
        }
    }
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pymethods]
impl PyGenotypePrediction {
    fn __repr__(&self) -> String {
        format!(
            "GenotypePrediction({}, {}: {:?}/{:?})",
            self.sample, self.locus, self.hla_1, self.hla_2
        )
    }
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyclass(name = "WeightTable")]
#[derive(Clone, Debug)]
pub struct PyWeightTable {
    inner: WeightTable,
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pymethods]
impl PyWeightTable {
    #[getter]
    fn get_alleles(&self) -> Vec<String> {
        self.inner.alleles.clone()
    }

    #[getter]
    fn get_samples(&self) -> Vec<String> {
        self.inner.samples.clone()
    }

    #[getter]
    /// samples x alleles matrix of weights
    fn get_weights(&self, py: Python) -> Py<PyArray2<f64>> {
        self.inner.weights.clone().into_pyarray_bound(py).into()
    }

    /// Call the genotypes at another threshold
    fn call(&self, threshold: f64) -> Result<Vec<PyGenotypePrediction>> {
        let threshold = Threshold::new(threshold)?;
        Ok(call_with_threshold(&self.inner, threshold)
            .into_iter()
            .map(PyGenotypePrediction::from)
            .collect())
    }
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyfunction]
/// Family code of a gene name (TRBV12*01 -> V12), None if not a TCR V/J gene
pub fn normalize_family(gene_name: &str) -> Option<String> {
    crate::shared::gene::normalize_family(gene_name).map(|f| f.to_string())
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyfunction]
#[pyo3(signature = (reference, filenames, outfile, params=MatchParameters::default(), ncpus=2, strip_str=""))]
/// Tabulate the files against the reference and write the hits matrix.
/// Return the samples that were excluded, with the reason.
pub fn exact_match(
    reference: &str,
    filenames: Vec<String>,
    outfile: &str,
    params: MatchParameters,
    ncpus: usize,
    strip_str: &str,
) -> Result<Vec<(String, String)>> {
    params.validate()?;
    let panel = parser::read_reference_panel(Path::new(reference), params.delimiter()?)?;
    let samples: Vec<SampleInput> = filenames
        .iter()
        .map(|f| SampleInput::from_path(Path::new(f), strip_str))
        .collect();
    let cohort = tabulate_cohort(&samples, &panel, &params, &CohortOptions::new(ncpus))?;
    parser::write_hits_matrix(BufWriter::new(File::create(outfile)?), &cohort.matrix)?;
    Ok(cohort
        .failures
        .into_iter()
        .map(|f| (f.sample, f.error.to_string()))
        .collect())
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyfunction]
#[pyo3(signature = (hits, locus="HLA-A", threshold=0.1, use_detects=true, use_counts=false))]
/// Score a hits matrix file for one locus and call the genotypes
pub fn weight_of_evidence(
    hits: &str,
    locus: &str,
    threshold: f64,
    use_detects: bool,
    use_counts: bool,
) -> Result<(PyWeightTable, Vec<PyGenotypePrediction>)> {
    let locus: Locus = locus.parse()?;
    let method = EvidenceMethod::from_flags(use_detects, use_counts)?;
    Threshold::new(threshold)?;
    let matrix = parser::read_hits_matrix(Path::new(hits))?;
    let (table, predictions) =
        crate::predict::weight_of_evidence(&matrix, locus, threshold, method)?;
    Ok((
        PyWeightTable { inner: table },
        predictions
            .into_iter()
            .map(PyGenotypePrediction::from)
            .collect(),
    ))
}
