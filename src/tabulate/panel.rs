//! Reference panel of HLA-diagnostic clonotypes
use crate::shared::errors::ConfigurationError;
use crate::shared::parameters::Locus;
use crate::tabulate::key::ClonotypeKey;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelEntry {
    pub key: ClonotypeKey,
    pub allele: String,
}

/// Ordered list of (clonotype, allele) pairs. The order of the entries is the
/// row order of every hits matrix built against the panel. Duplicated keys are
/// kept, each row counts on its own.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePanel {
    pub entries: Vec<PanelEntry>,
}

impl ReferencePanel {
    pub fn new(entries: Vec<PanelEntry>) -> Result<ReferencePanel, ConfigurationError> {
        if entries.is_empty() {
            return Err(ConfigurationError::EmptyPanel);
        }
        Ok(ReferencePanel { entries })
    }

    pub fn from_pairs<K, A>(pairs: &[(K, A)]) -> Result<ReferencePanel, ConfigurationError>
    where
        K: AsRef<str>,
        A: AsRef<str>,
    {
        ReferencePanel::new(
            pairs
                .iter()
                .map(|(k, a)| PanelEntry {
                    key: ClonotypeKey::new(k.as_ref()),
                    allele: a.as_ref().to_string(),
                })
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<ClonotypeKey> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn alleles(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.allele.clone()).collect()
    }

    /// Number of panel rows whose allele belongs to `locus`.
    pub fn locus_size(&self, locus: Locus) -> usize {
        self.entries
            .iter()
            .filter(|e| locus.contains(&e.allele))
            .count()
    }
}
