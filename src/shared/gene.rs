//! Deal with V/J gene names: family-level codes and vendor name translation
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::Path;

// Both IMGT (TRBV12) and Adaptive (TCRBV12) spellings, allele suffix ignored.
static FAMILY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"T(?:C)?R([ABGD])([VJ])([0-9]{1,2})").unwrap());

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Chain {
    Alpha,
    Beta,
    Gamma,
    Delta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    V,
    J,
}

/// Family-level representation of a V or J gene, displayed as `V02`, `J12`...
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FamilyCode {
    pub chain: Chain,
    pub segment: Segment,
    pub family: u8,
}

impl fmt::Display for FamilyCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let segment = match self.segment {
            Segment::V => 'V',
            Segment::J => 'J',
        };
        write!(f, "{}{:02}", segment, self.family)
    }
}

/// Collapse a gene name (`TRBV12-3*01`, `TCRBV06-01`, `TRBJ2-7`) to its family
/// code. Anything that does not look like a TCR V/J gene gives `None`: most
/// records of a repertoire never match the diagnostic panel, this is not an error.
pub fn normalize_family(gene_name: &str) -> Option<FamilyCode> {
    let caps = FAMILY_REGEX.captures(gene_name)?;
    let chain = match caps.get(1)?.as_str() {
        "A" => Chain::Alpha,
        "B" => Chain::Beta,
        "G" => Chain::Gamma,
        "D" => Chain::Delta,
        _ => return None,
    };
    let segment = match caps.get(2)?.as_str() {
        "V" => Segment::V,
        "J" => Segment::J,
        _ => return None,
    };
    let family = caps.get(3)?.as_str().parse::<u8>().ok()?;
    Some(FamilyCode {
        chain,
        segment,
        family,
    })
}

/// Lookup interface to the (external) gene-name translation service, mapping
/// vendor gene names to the standard nomenclature.
pub trait GeneNameLookup {
    fn translate(&self, vendor_name: &str) -> Option<String>;

    /// Allele-level name first, then the family name with a `-01` gene
    /// position appended (vendors often only report the family).
    fn translate_or_guess(&self, gene: &str, family: &str) -> Option<String> {
        if !gene.is_empty() {
            if let Some(name) = self.translate(gene) {
                return Some(name);
            }
        }
        if family.is_empty() {
            return None;
        }
        self.translate(&format!("{}-01", family))
    }
}

/// Two-column (vendor name, standard name) translation table.
#[derive(Default, Clone, Debug, Serialize, Deserialize)]
pub struct TranslationTable {
    names: HashMap<String, String>,
}

impl TranslationTable {
    pub fn new(names: HashMap<String, String>) -> TranslationTable {
        TranslationTable { names }
    }

    pub fn load(path: &Path, delimiter: u8) -> Result<TranslationTable> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Unable to open the gene table {}", path.display()))?;
        TranslationTable::from_reader(file, delimiter)
    }

    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<TranslationTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(reader);
        let mut names = HashMap::new();
        for result in rdr.records() {
            let record = result.map_err(|e| anyhow!("Error reading the gene table: {}", e))?;
            match (record.get(0), record.get(1)) {
                (Some(vendor), Some(standard)) if !standard.is_empty() => {
                    names.insert(vendor.to_string(), standard.to_string());
                }
                (Some(_), Some(_)) => {}
                _ => return Err(anyhow!("The gene table needs two columns (vendor, standard)")),
            }
        }
        Ok(TranslationTable { names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl GeneNameLookup for TranslationTable {
    fn translate(&self, vendor_name: &str) -> Option<String> {
        self.names.get(vendor_name).cloned()
    }
}

