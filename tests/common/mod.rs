use anyhow::Result;
use ndarray::Array2;
use std::fs;
use std::path::{Path, PathBuf};
use tcrhla::{ClonotypeKey, HitsMatrix, ReferencePanel};

#[cfg(test)]
#[allow(dead_code)]
pub fn write_file(dir: &Path, name: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
#[allow(dead_code)]
pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

/// Two HLA-A alleles with one diagnostic clonotype each.
#[cfg(test)]
#[allow(dead_code)]
pub fn simple_panel() -> ReferencePanel {
    ReferencePanel::from_pairs(&[
        ("V02,CASSL", "HLA-A*02:01"),
        ("V12,CASSQ", "HLA-A*03:01"),
    ])
    .unwrap()
}

/// Repertoire in the standard columns, tab separated.
#[cfg(test)]
#[allow(dead_code)]
pub fn sample_content(records: &[(&str, &str, &str)]) -> String {
    let mut content = "v_b_gene\tcdr3_b_aa\tcount\n".to_string();
    for (v, cdr3, count) in records {
        content.push_str(&format!("{}\t{}\t{}\n", v, cdr3, count));
    }
    content
}

/// Hits matrix built from (key, allele, one value per sample) rows.
#[cfg(test)]
#[allow(dead_code)]
pub fn matrix(samples: &[&str], rows: &[(&str, &str, Vec<f64>)]) -> HitsMatrix {
    let keys = rows.iter().map(|(k, _, _)| ClonotypeKey::from(*k)).collect();
    let alleles = rows.iter().map(|(_, a, _)| a.to_string()).collect();
    let values = Array2::from_shape_fn((rows.len(), samples.len()), |(ii, jj)| rows[ii].2[jj]);
    HitsMatrix::new(
        keys,
        alleles,
        samples.iter().map(|s| s.to_string()).collect(),
        values,
    )
    .unwrap()
}

/// Three HLA-A alleles (two clonotypes for *01:01) and one HLA-B allele,
/// three samples of increasing depth.
#[cfg(test)]
#[allow(dead_code)]
pub fn cohort_matrix() -> HitsMatrix {
    matrix(
        &["s1", "s2", "s3"],
        &[
            ("V05,CASSLAPGATNEKLFF", "HLA-A*01:01", vec![3., 0., 20.]),
            ("V07,CASSLEGQGYEQYF", "HLA-A*01:01", vec![0., 0., 4.]),
            ("V02,CASSLGQAYEQYF", "HLA-A*02:01", vec![5., 1., 0.]),
            ("V12,CASSQDRGNTEAFF", "HLA-A*03:01", vec![0., 2., 1.]),
            ("V28,CASSLRGYEQYF", "HLA-B*07:02", vec![1., 1., 1.]),
        ],
    )
}
