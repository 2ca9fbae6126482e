//! Weight-of-evidence scoring and genotype calls

pub mod evidence;
pub mod genotype;
pub mod performance;

// Re-exporting for public API
pub use self::evidence::{score, score_with_flags, EvidenceRow, WeightTable};
pub use self::genotype::{call, weight_of_evidence, GenotypePrediction};
pub use self::performance::{evaluate, sweep, Performance, TruthTable};
