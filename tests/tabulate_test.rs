use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tcrhla::shared::gene::{Chain, Segment};
use tcrhla::shared::TranslationTable;
use tcrhla::tabulate::reformat::{read_vendor_export, reformat_records};
use tcrhla::tabulate::sample::{aggregate, clonotype_key, tabulate_file};
use tcrhla::{
    build_hits_matrix, make_key, normalize_family, tabulate, tabulate_cohort, ClonotypeKey,
    CohortOptions, GeneNameLookup, MatchParameters, SampleError, SampleInput, SampleRow,
};
mod common;

#[test]
fn family_normalization() -> Result<()> {
    let code = normalize_family("TRBV2*01").unwrap();
    assert!(code.to_string() == "V02");
    assert!(code.chain == Chain::Beta);
    assert!(code.segment == Segment::V);

    assert!(normalize_family("TCRBV06-01").unwrap().to_string() == "V06");
    assert!(normalize_family("TRBV12-3*01").unwrap().to_string() == "V12");
    assert!(normalize_family("TRBJ2-7").unwrap().to_string() == "J02");
    assert!(normalize_family("TRAV1-2").unwrap().chain == Chain::Alpha);

    assert!(normalize_family("XYZ123").is_none());
    assert!(normalize_family("").is_none());
    assert!(normalize_family("unresolved").is_none());
    Ok(())
}

#[test]
fn key_building() -> Result<()> {
    assert!(make_key(&["V06", "CASSPGPDRYEQYF"], ",") == ClonotypeKey::from("V06,CASSPGPDRYEQYF"));
    assert!(make_key(&["CASSL"], ",").as_str() == "CASSL");
    // no escaping of the separator
    assert!(make_key(&["A,B", "C"], ",") == make_key(&["A", "B,C"], ","));

    let params = MatchParameters::default();
    let row = SampleRow::new(&["TRBV6-1*01", "CASSPGPDRYEQYF"], 12.);
    let key = clonotype_key(&row, &params.family_mask(), &params.sep_str);
    assert!(key == Some(ClonotypeKey::from("V06,CASSPGPDRYEQYF")));

    // unresolved gene: the record can't match anything
    let row = SampleRow::new(&["unresolved", "CASSPGPDRYEQYF"], 12.);
    assert!(clonotype_key(&row, &params.family_mask(), &params.sep_str).is_none());
    Ok(())
}

#[test]
fn tabulation_sums_and_fills_zeros() -> Result<()> {
    let params = MatchParameters::default();
    let rows = vec![
        SampleRow::new(&["TRBV2*01", "CASSL"], 4.),
        SampleRow::new(&["TRBV2-1*02", "CASSL"], 6.),
        SampleRow::new(&["TRBV5-1*01", "CASSF"], 100.),
        SampleRow::new(&["XYZ123", "CASSQ"], 7.),
    ];
    let counts = aggregate(&rows, &params);
    assert!(counts.len() == 2);
    assert!(counts[&ClonotypeKey::from("V02,CASSL")] == 10.);

    let panel = common::simple_panel();
    let column = tabulate(&rows, &panel.keys(), &params);
    assert!(column == vec![10., 0.]);

    // empty sample: all zeros, same length as the panel
    assert!(tabulate(&[], &panel.keys(), &params) == vec![0., 0.]);
    Ok(())
}

#[test]
fn sample_file_errors() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let params = MatchParameters::default();
    let keys = common::simple_panel().keys();

    let no_count = common::write_file(
        dir.path(),
        "no_count.tsv",
        "v_b_gene\tcdr3_b_aa\ttemplates\nTRBV2*01\tCASSL\t3\n",
    )?;
    let result = tabulate_file(&no_count, &keys, &params);
    assert!(result == Err(SampleError::MissingColumn("count".to_string())));

    let bad_count = common::write_file(
        dir.path(),
        "bad_count.tsv",
        &common::sample_content(&[("TRBV2*01", "CASSL", "3"), ("TRBV12*01", "CASSQ", "many")]),
    )?;
    assert!(matches!(
        tabulate_file(&bad_count, &keys, &params),
        Err(SampleError::InvalidAbundance { .. })
    ));

    let empty_count = common::write_file(
        dir.path(),
        "empty_count.tsv",
        &common::sample_content(&[("TRBV2*01", "CASSL", ""), ("TRBV12*01", "CASSQ", "2")]),
    )?;
    assert!(tabulate_file(&empty_count, &keys, &params)? == vec![0., 2.]);

    let missing = dir.path().join("missing.tsv");
    assert!(matches!(
        tabulate_file(&missing, &keys, &params),
        Err(SampleError::Unreadable { .. })
    ));
    Ok(())
}

#[test]
fn cohort_keeps_input_order() -> Result<()> {
    let panel = common::simple_panel();
    let samples: Vec<SampleInput> = (0..20)
        .map(|ii| SampleInput::new(&format!("s{}", ii), std::path::Path::new("unused")))
        .collect();
    let options = CohortOptions::new(4);
    let cohort = build_hits_matrix(
        &samples,
        &panel,
        |sample, keys| {
            let ii: f64 = sample.name[1..].parse().unwrap();
            std::thread::sleep(std::time::Duration::from_millis(20 - ii as u64));
            Ok(vec![ii; keys.len()])
        },
        &options,
    )?;
    assert!(cohort.failures.is_empty());
    assert!(cohort.matrix.nb_samples() == 20);
    for (jj, name) in cohort.matrix.samples.iter().enumerate() {
        assert!(*name == format!("s{}", jj));
        assert!(cohort.matrix.values[[0, jj]] == jj as f64);
    }
    Ok(())
}

#[test]
fn cohort_failures_and_duplicates() -> Result<()> {
    let panel = common::simple_panel();
    let path = std::path::Path::new("unused");
    let samples = vec![
        SampleInput::new("a", path),
        SampleInput::new("b", path),
        SampleInput::new("a", path),
        SampleInput::new("c", path),
    ];
    let cohort = build_hits_matrix(
        &samples,
        &panel,
        |sample, keys| match sample.name.as_str() {
            "b" => Err(SampleError::MissingColumn("count".to_string())),
            "c" => Ok(vec![1.]),
            _ => Ok(vec![2.; keys.len()]),
        },
        &CohortOptions::default(),
    )?;
    assert!(cohort.matrix.samples == vec!["a".to_string()]);
    assert!(cohort.failures.len() == 3);
    assert!(cohort.failures[0].sample == "b");
    assert!(cohort.failures[1].error == SampleError::DuplicateSample("a".to_string()));
    assert!(
        cohort.failures[2].error
            == SampleError::WrongLength {
                expected: 2,
                found: 1
            }
    );
    Ok(())
}

#[test]
fn cohort_cancelled() -> Result<()> {
    let panel = common::simple_panel();
    let samples = vec![SampleInput::new("a", std::path::Path::new("unused"))];
    let options = CohortOptions {
        cancel: Some(Arc::new(AtomicBool::new(true))),
        ..Default::default()
    };
    let result = build_hits_matrix(&samples, &panel, |_, keys| Ok(vec![0.; keys.len()]), &options);
    assert!(result.is_err());
    Ok(())
}

#[test]
fn cohort_from_files() -> Result<()> {
    // a sample missing the abundance column is excluded, the others go through
    let dir = tempfile::tempdir()?;
    let s1 = common::write_file(
        dir.path(),
        "s1.tsv",
        &common::sample_content(&[
            ("TRBV2*01", "CASSL", "4"),
            ("TRBV2*02", "CASSL", "6"),
            ("TRBV12-3*01", "CASSQ", "0"),
        ]),
    )?;
    let s2 = common::write_file(
        dir.path(),
        "s2.tsv",
        "v_b_gene\tcdr3_b_aa\nTRBV2*01\tCASSL\n",
    )?;
    let s3 = common::write_file(
        dir.path(),
        "s3.tsv",
        &common::sample_content(&[("TRBV12-4*01", "CASSQ", "3")]),
    )?;

    let samples: Vec<SampleInput> = [s1, s2, s3]
        .iter()
        .map(|p| SampleInput::from_path(p, ".tsv"))
        .collect();
    let cohort = tabulate_cohort(
        &samples,
        &common::simple_panel(),
        &MatchParameters::default(),
        &CohortOptions::new(2),
    )?;
    assert!(cohort.matrix.samples == vec!["s1".to_string(), "s3".to_string()]);
    assert!(cohort.matrix.column(0).to_vec() == vec![10., 0.]);
    assert!(cohort.matrix.column(1).to_vec() == vec![0., 3.]);
    assert!(cohort.failures.len() == 1);
    assert!(cohort.failures[0].sample == "s2");
    assert!(cohort.failures[0].error == SampleError::MissingColumn("count".to_string()));
    Ok(())
}

#[test]
fn retabulation_is_identical() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let panel = tcrhla::ReferencePanel::from_pairs(&[
        ("V02,CASSL", "HLA-A*02:01"),
        ("V12,CASSQ", "HLA-A*03:01"),
        ("V05,CASSF", "HLA-B*07:02"),
    ])?;
    let mut samples = Vec::new();
    for ii in 0..8 {
        let content = common::sample_content(&[
            ("TRBV2*01", "CASSL", &format!("{}.1", ii)),
            ("TRBV2-1*02", "CASSL", "0.2"),
            ("TRBV5-1*01", "CASSF", &format!("{}", 3 * ii)),
            ("TRBV12-3*01", "CASSQ", "0.7"),
            ("TRBV12-4*01", "CASSQ", "1e-3"),
        ]);
        let path = common::write_file(dir.path(), &format!("s{}.tsv", ii), &content)?;
        samples.push(SampleInput::from_path(&path, ".tsv"));
    }
    let params = MatchParameters::default();
    let options = CohortOptions::new(4);
    let first = tabulate_cohort(&samples, &panel, &params, &options)?;
    let second = tabulate_cohort(&samples, &panel, &params, &options)?;
    assert!(first.failures.is_empty());
    assert!(first.matrix.samples == second.matrix.samples);
    assert!(first
        .matrix
        .values
        .iter()
        .zip(second.matrix.values.iter())
        .all(|(a, b)| a.to_bits() == b.to_bits()));
    Ok(())
}

#[test]
fn custom_match_columns() -> Result<()> {
    // cdr3 only, comma separated file, templates as abundance
    let params = MatchParameters::new(
        ",",
        "+",
        vec!["cdr3_b_aa".to_string()],
        vec![],
        "templates",
    )?;
    let dir = tempfile::tempdir()?;
    let path = common::write_file(
        dir.path(),
        "s.csv",
        "cdr3_b_aa,templates,v_b_gene\nCASSL,2,TRBV2*01\nCASSL,5,TRBV9*01\n",
    )?;
    let keys = vec![ClonotypeKey::from("CASSL"), ClonotypeKey::from("CASSQ")];
    assert!(tabulate_file(&path, &keys, &params)? == vec![7., 0.]);

    assert!(MatchParameters::new("\t", ",", vec![], vec![], "count").is_err());
    assert!(MatchParameters::new(
        "\t",
        ",",
        vec!["cdr3_b_aa".to_string()],
        vec!["v_b_gene".to_string()],
        "count"
    )
    .is_err());
    assert!(MatchParameters::new("::", ",", vec!["cdr3_b_aa".to_string()], vec![], "count").is_err());
    Ok(())
}

#[test]
fn vendor_reformat() -> Result<()> {
    let mut names = HashMap::new();
    names.insert("TCRBV06-01*01".to_string(), "TRBV6-1*01".to_string());
    names.insert("TCRBV12-01".to_string(), "TRBV12-1*01".to_string());
    names.insert("TCRBJ02-07*01".to_string(), "TRBJ2-7*01".to_string());
    let lookup = TranslationTable::new(names);
    assert!(lookup.translate("TCRBV06-01*01").unwrap() == "TRBV6-1*01");
    assert!(lookup.translate_or_guess("", "TCRBV12").unwrap() == "TRBV12-1*01");
    assert!(lookup.translate_or_guess("TCRBV99", "TCRBV98").is_none());

    let export = "amino_acid,templates,v_gene,j_gene,v_family,j_family\n\
                  CASSPGPDRYEQYF,10,TCRBV06-01*01,TCRBJ02-07*01,TCRBV06,TCRBJ02\n\
                  CASSQDRGNTEAFF,5,,TCRBJ02-07*01,TCRBV12,TCRBJ02\n\
                  CASSXX,,TCRBV99,,TCRBV99,\n";
    let records = read_vendor_export(export.as_bytes(), b',')?;
    assert!(records.len() == 3);
    let standard = reformat_records(&records, "subject1", &lookup);
    assert!(standard[0].v_b_gene.as_deref() == Some("TRBV6-1*01"));
    assert!(standard[1].v_b_gene.as_deref() == Some("TRBV12-1*01"));
    assert!(standard[2].v_b_gene.is_none());
    assert!(standard[2].count == 0.);
    assert!(standard.iter().all(|r| r.sum_productive_templates_calc == 15.));
    assert!(standard.iter().all(|r| r.subject == "subject1"));
    Ok(())
}
