//! Conversion of vendor repertoire exports to the standard sample columns
//! (`cdr3_b_aa`, `v_b_gene`, `j_b_gene`, `count`...) used for tabulation.
use crate::shared::gene::GeneNameLookup;
use anyhow::{anyhow, Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct VendorRecord {
    pub amino_acid: String,
    pub templates: Option<f64>,
    pub v_gene: String,
    pub j_gene: String,
    pub v_family: String,
    pub j_family: String,
    #[serde(default)]
    pub productive_frequency: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StandardRecord {
    pub cdr3_b_aa: String,
    // None when the gene name could not be translated
    pub v_b_gene: Option<String>,
    pub j_b_gene: Option<String>,
    pub subject: String,
    pub count: f64,
    pub productive_frequency: Option<String>,
    pub sum_productive_templates_calc: f64,
}

pub fn reformat_records<L: GeneNameLookup>(
    records: &[VendorRecord],
    subject: &str,
    lookup: &L,
) -> Vec<StandardRecord> {
    let total: f64 = records.iter().filter_map(|r| r.templates).sum();
    records
        .iter()
        .map(|r| StandardRecord {
            cdr3_b_aa: r.amino_acid.clone(),
            v_b_gene: lookup.translate_or_guess(&r.v_gene, &r.v_family),
            j_b_gene: lookup.translate_or_guess(&r.j_gene, &r.j_family),
            subject: subject.to_string(),
            count: r.templates.unwrap_or(0.),
            productive_frequency: r.productive_frequency.clone(),
            sum_productive_templates_calc: total,
        })
        .collect()
}

pub fn read_vendor_export<R: Read>(reader: R, delimiter: u8) -> Result<Vec<VendorRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    rdr.deserialize()
        .map(|r| r.map_err(|e| anyhow!("Invalid vendor export: {}", e)))
        .collect()
}

pub fn write_standard_records<W: Write>(writer: W, records: &[StandardRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a vendor export, translate its gene names and write the standard
/// tab-separated sample file. Return the number of records written.
pub fn reformat_export<L: GeneNameLookup>(
    input: &Path,
    output: &Path,
    delimiter: u8,
    subject: &str,
    lookup: &L,
) -> Result<usize> {
    let file = File::open(input)
        .with_context(|| format!("Unable to open the export {}", input.display()))?;
    let records = read_vendor_export(file, delimiter)?;
    let standard = reformat_records(&records, subject, lookup);
    let untranslated = standard.iter().filter(|r| r.v_b_gene.is_none()).count();
    info!(
        "{}: {} records, {} templates, {} V genes without translation",
        subject,
        standard.len(),
        standard.first().map_or(0., |r| r.sum_productive_templates_calc),
        untranslated
    );
    let out = File::create(output)
        .with_context(|| format!("Unable to create {}", output.display()))?;
    write_standard_records(out, &standard)?;
    Ok(standard.len())
}
