#![warn(clippy::large_types_passed_by_value)]
//! HLA genotype inference from bulk TCR repertoires.
//!
//! Two stages: `tabulate` counts, in each repertoire, the clonotypes of a
//! reference panel of HLA-associated TCRs (hits matrix), and `predict`
//! turns these counts into per-allele weights of evidence and a top-2
//! genotype call per sample.

pub mod predict;
pub mod shared;
pub mod tabulate;

pub use crate::predict::{
    call, score, weight_of_evidence, EvidenceRow, GenotypePrediction, WeightTable,
};
pub use crate::shared::{
    normalize_family, CohortOptions, ConfigurationError, EvidenceMethod, FamilyCode,
    GeneNameLookup, Locus, MatchParameters, SampleError, SampleFailure, Threshold,
};
pub use crate::tabulate::{
    build_hits_matrix, make_key, tabulate, tabulate_cohort, ClonotypeKey, Cohort, HitsMatrix,
    ReferencePanel, SampleInput, SampleRow,
};

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use pyo3::prelude::*;

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
use rayon::ThreadPoolBuilder;

/// Set the number of threads of the global pool (if not run: all of them)
#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pyfunction]
fn set_number_threads(num_threads: usize) -> anyhow::Result<()> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()?;
    Ok(())
}

#[cfg(all(feature = "py_binds", feature = "pyo3"))]
#[pymodule]
#[pyo3(name = "_tcrhla")]
fn tcrhla_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<crate::shared::parameters::MatchParameters>()?;
    m.add_class::<crate::shared::py_binding::PyWeightTable>()?;
    m.add_class::<crate::shared::py_binding::PyGenotypePrediction>()?;
    m.add_function(wrap_pyfunction!(crate::shared::py_binding::normalize_family, m)?)?;
    m.add_function(wrap_pyfunction!(crate::shared::py_binding::exact_match, m)?)?;
    m.add_function(wrap_pyfunction!(
        crate::shared::py_binding::weight_of_evidence,
        m
    )?)?;
    m.add_function(wrap_pyfunction!(set_number_threads, m)?)?;
    Ok(())
}
