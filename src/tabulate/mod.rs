//! Exact-match tabulation of repertoires against the reference panel

pub mod cohort;
pub mod key;
pub mod panel;
pub mod reformat;
pub mod sample;

// Re-exporting for public API
pub use self::cohort::{build_hits_matrix, tabulate_cohort, Cohort, HitsMatrix, SampleInput};
pub use self::key::{make_key, ClonotypeKey};
pub use self::panel::{PanelEntry, ReferencePanel};
pub use self::sample::{tabulate, tabulate_file, SampleRow};
