//! Readers and writers for the tables of the pipeline (reference panel,
//! repertoire samples, hits matrix, evidence, predictions, performance)
use crate::predict::evidence::WeightTable;
use crate::predict::genotype::GenotypePrediction;
use crate::predict::performance::{Outcome, Performance, TruthTable};
use crate::shared::errors::SampleError;
use crate::shared::parameters::MatchParameters;
use crate::tabulate::cohort::HitsMatrix;
use crate::tabulate::key::ClonotypeKey;
use crate::tabulate::panel::{PanelEntry, ReferencePanel};
use crate::tabulate::sample::SampleRow;
use anyhow::{anyhow, Context, Result};
use csv::{Reader, ReaderBuilder, StringRecord, Writer, WriterBuilder};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Columns of a hits matrix that are neither the key, the allele, nor a sample.
pub const IGNORED_COLUMNS: [&str; 1] = ["association_pvalue"];

const NO_CALL: &str = "";

fn reader<R: Read>(reader: R, delimiter: u8) -> Reader<R> {
    ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader)
}

fn tsv_writer<W: Write>(writer: W) -> Writer<W> {
    WriterBuilder::new().delimiter(b'\t').from_writer(writer)
}

fn column_index(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn opt_to_string<T: ToString>(x: &Option<T>) -> String {
    x.as_ref().map_or(NO_CALL.to_string(), |v| v.to_string())
}

pub fn read_reference_panel(path: &Path, delimiter: u8) -> Result<ReferencePanel> {
    let file = File::open(path)
        .with_context(|| format!("Unable to open the reference file {}", path.display()))?;
    read_reference_panel_from_reader(file, delimiter)
        .with_context(|| format!("Invalid reference file {}", path.display()))
}

/// The panel needs a `tcr` column (keys already in matching form) and a
/// `hla_allele` column, other columns are ignored.
pub fn read_reference_panel_from_reader<R: Read>(
    rdr: R,
    delimiter: u8,
) -> Result<ReferencePanel> {
    let mut rdr = reader(rdr, delimiter);
    let headers = rdr.headers()?.clone();
    let key_idx = column_index(&headers, "tcr")
        .ok_or(anyhow!("The reference panel has no 'tcr' column"))?;
    let allele_idx = column_index(&headers, "hla_allele")
        .ok_or(anyhow!("The reference panel has no 'hla_allele' column"))?;
    let mut entries = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| anyhow!("Error reading the record {:?}", e))?;
        let (key, allele) = match (record.get(key_idx), record.get(allele_idx)) {
            (Some(k), Some(a)) => (k, a),
            _ => return Err(anyhow!("Incomplete reference record {:?}", record)),
        };
        entries.push(PanelEntry {
            key: ClonotypeKey::new(key),
            allele: allele.to_string(),
        });
    }
    Ok(ReferencePanel::new(entries)?)
}

/// Project a repertoire table on the matching columns and the abundance
/// column. Missing columns or unparsable abundances fail the whole sample.
pub fn read_sample_rows<R: Read>(
    rdr: R,
    params: &MatchParameters,
) -> Result<Vec<SampleRow>, SampleError> {
    let delimiter = params
        .delimiter()
        .map_err(|e| SampleError::Malformed(e.to_string()))?;
    let mut rdr = reader(rdr, delimiter);
    let headers = rdr
        .headers()
        .map_err(|e| SampleError::Malformed(e.to_string()))?
        .clone();
    let field_idx = params
        .cols_to_match
        .iter()
        .map(|c| column_index(&headers, c).ok_or(SampleError::MissingColumn(c.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    let count_idx = column_index(&headers, &params.col_to_count)
        .ok_or(SampleError::MissingColumn(params.col_to_count.clone()))?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| SampleError::Malformed(e.to_string()))?;
        let line = record.position().map_or(0, |p| p.line());
        let fields = field_idx
            .iter()
            .map(|&ii| record.get(ii).unwrap_or("").to_string())
            .collect();
        let abundance = parse_abundance(record.get(count_idx).unwrap_or(""), line)?;
        rows.push(SampleRow { fields, abundance });
    }
    Ok(rows)
}

// empty cells count as 0, abundances are finite and non-negative
fn parse_abundance(value: &str, line: u64) -> Result<f64, SampleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0.);
    }
    match trimmed.parse::<f64>() {
        Ok(x) if x.is_finite() && x >= 0. => Ok(x),
        _ => Err(SampleError::InvalidAbundance {
            line,
            value: value.to_string(),
        }),
    }
}

pub fn read_hits_matrix(path: &Path) -> Result<HitsMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Unable to open the hits matrix {}", path.display()))?;
    read_hits_matrix_from_reader(file)
        .with_context(|| format!("Invalid hits matrix {}", path.display()))
}

/// Tab-separated, one row per reference clonotype: a key column (`match` or
/// `tcr`), `hla_allele`, then one column per sample.
pub fn read_hits_matrix_from_reader<R: Read>(rdr: R) -> Result<HitsMatrix> {
    let mut rdr = reader(rdr, b'\t');
    let headers = rdr.headers()?.clone();
    let key_idx = column_index(&headers, "match")
        .or_else(|| column_index(&headers, "tcr"))
        .ok_or(anyhow!("The hits matrix has no 'match' (or 'tcr') column"))?;
    let allele_idx = column_index(&headers, "hla_allele")
        .ok_or(anyhow!("The hits matrix has no 'hla_allele' column"))?;
    let sample_idx: Vec<usize> = (0..headers.len())
        .filter(|&ii| ii != key_idx && ii != allele_idx)
        .filter(|&ii| !IGNORED_COLUMNS.contains(&&headers[ii]))
        .collect();
    let samples: Vec<String> = sample_idx.iter().map(|&ii| headers[ii].to_string()).collect();
    let mut seen = HashSet::new();
    if let Some(dup) = samples.iter().find(|s| !seen.insert(s.as_str())) {
        return Err(anyhow!("Sample column '{}' appears twice in the hits matrix", dup));
    }

    let mut keys = Vec::new();
    let mut alleles = Vec::new();
    let mut values = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| anyhow!("Error reading the record {:?}", e))?;
        let line = record.position().map_or(0, |p| p.line());
        keys.push(ClonotypeKey::new(record.get(key_idx).unwrap_or("")));
        alleles.push(record.get(allele_idx).unwrap_or("").to_string());
        for &ii in &sample_idx {
            let cell = record.get(ii).unwrap_or("");
            let value = parse_abundance(cell, line).map_err(|_| {
                anyhow!("Invalid value '{}' on line {} (column {})", cell, line, &headers[ii])
            })?;
            values.push(value);
        }
    }
    let values = Array2::from_shape_vec((keys.len(), samples.len()), values)?;
    HitsMatrix::new(keys, alleles, samples, values)
}

pub fn write_hits_matrix<W: Write>(writer: W, matrix: &HitsMatrix) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    let mut header = vec!["match".to_string(), "hla_allele".to_string()];
    header.extend(matrix.samples.iter().cloned());
    wtr.write_record(&header)?;
    for (ii, (key, allele)) in matrix.keys.iter().zip(&matrix.alleles).enumerate() {
        let mut record = vec![key.to_string(), allele.clone()];
        record.extend(matrix.values.row(ii).iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_evidence<W: Write>(writer: W, table: &WeightTable) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record([
        "hla_allele",
        "sample",
        "n",
        "sum",
        "detects",
        "dadj",
        "cadj",
        "total_dadj",
        "total_cadj",
        "wd",
        "wc",
    ])?;
    for e in &table.evidence {
        wtr.write_record(&[
            e.allele.clone(),
            e.sample.clone(),
            e.n.to_string(),
            e.sum.to_string(),
            e.detects.to_string(),
            e.dadj.to_string(),
            e.cadj.to_string(),
            e.total_dadj.to_string(),
            e.total_cadj.to_string(),
            e.wd.to_string(),
            e.wc.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// One row per sample: the call, then the weight of every allele in `alleles`.
pub fn write_predictions<W: Write>(
    writer: W,
    predictions: &[GenotypePrediction],
    alleles: &[String],
) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    let mut header: Vec<String> = [
        "sample", "threshold", "method", "locus", "hla_1", "hla_2", "v1", "v2", "p1", "p2",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(alleles.iter().cloned());
    wtr.write_record(&header)?;
    for p in predictions {
        let mut record = vec![
            p.sample.clone(),
            p.threshold.to_string(),
            p.method.to_string(),
            p.locus.to_string(),
            opt_to_string(&p.hla_1),
            opt_to_string(&p.hla_2),
            p.v1.to_string(),
            opt_to_string(&p.v2),
            p.p1.clone(),
            opt_to_string(&p.p2),
        ];
        record.extend(alleles.iter().map(|a| opt_to_string(&p.weight(a))));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_truth_table(path: &Path, column: &str) -> Result<TruthTable> {
    let file = File::open(path)
        .with_context(|| format!("Unable to open the truth table {}", path.display()))?;
    read_truth_table_from_reader(file, column)
}

/// Tab-separated table with a `sample` column and one genotype column.
pub fn read_truth_table_from_reader<R: Read>(rdr: R, column: &str) -> Result<TruthTable> {
    let mut rdr = reader(rdr, b'\t');
    let headers = rdr.headers()?.clone();
    let sample_idx = column_index(&headers, "sample")
        .ok_or(anyhow!("The truth table has no 'sample' column"))?;
    let truth_idx = column_index(&headers, column)
        .ok_or(anyhow!("The truth table has no '{}' column", column))?;
    let mut truth = HashMap::new();
    for result in rdr.records() {
        let record = result.map_err(|e| anyhow!("Error reading the record {:?}", e))?;
        if let (Some(s), Some(t)) = (record.get(sample_idx), record.get(truth_idx)) {
            truth.insert(s.to_string(), t.to_string());
        }
    }
    Ok(TruthTable::new(truth))
}

pub fn write_performance<W: Write>(writer: W, performances: &[Performance]) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record([
        "allele", "locus", "method", "threshold", "TPs", "TNs", "FPs", "FNs", "sens", "spec",
        "acur", "F1",
    ])?;
    for p in performances {
        wtr.write_record(&[
            p.allele.clone(),
            p.locus.to_string(),
            p.method.to_string(),
            p.threshold.to_string(),
            p.tps.to_string(),
            p.tns.to_string(),
            p.fps.to_string(),
            p.fns.to_string(),
            opt_to_string(&p.sens),
            opt_to_string(&p.spec),
            opt_to_string(&p.acur),
            opt_to_string(&p.f1),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_outcomes<W: Write>(writer: W, outcomes: &[Outcome]) -> Result<()> {
    let mut wtr = tsv_writer(writer);
    wtr.write_record([
        "sample", "allele", "truth", "pos", "pred_pos", "hla_1", "hla_2", "v1", "v2",
        "v_allele", "threshold", "method",
    ])?;
    for o in outcomes {
        wtr.write_record(&[
            o.sample.clone(),
            o.allele.clone(),
            o.truth.clone(),
            (o.pos as u8).to_string(),
            (o.pred_pos as u8).to_string(),
            opt_to_string(&o.hla_1),
            opt_to_string(&o.hla_2),
            o.v1.to_string(),
            opt_to_string(&o.v2),
            opt_to_string(&o.v_allele),
            o.threshold.to_string(),
            o.method.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
