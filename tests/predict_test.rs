use anyhow::Result;
use std::collections::HashMap;
use tcrhla::predict::genotype::rank_alleles;
use tcrhla::predict::{evaluate, score_with_flags, sweep, TruthTable};
use tcrhla::{
    call, score, weight_of_evidence, ConfigurationError, EvidenceMethod, HitsMatrix, Locus,
};
mod common;

#[test]
fn single_sample_scenario() -> Result<()> {
    let panel = common::simple_panel();
    let matrix = HitsMatrix::from_columns(&panel, vec!["s1".to_string()], &[vec![10., 0.]])?;
    let (table, predictions) = weight_of_evidence(&matrix, Locus::A, 0.5, EvidenceMethod::Detects)?;

    let a02 = table.find("HLA-A*02:01", "s1").unwrap();
    assert!(a02.n == 1 && a02.sum == 10. && a02.detects == 1);
    assert!(a02.dadj == 1. && a02.cadj == 10.);
    assert!(a02.wd == 1.);
    let a03 = table.find("HLA-A*03:01", "s1").unwrap();
    assert!(a03.n == 1 && a03.sum == 0. && a03.detects == 0);
    assert!(a03.dadj == 0. && a03.cadj == 0.);
    assert!(a03.wd == 0.);

    assert!(predictions.len() == 1);
    let p = &predictions[0];
    assert!(p.hla_1.as_deref() == Some("HLA-A*02:01"));
    assert!(p.hla_2.is_none());
    assert!(p.p2.as_deref() == Some("HLA-A*03:01"));
    assert!(p.v1 == 1. && p.v2 == Some(0.));
    Ok(())
}

#[test]
fn evidence_values() -> Result<()> {
    let matrix = common::cohort_matrix();
    let table = score(&matrix, Locus::A, EvidenceMethod::Detects)?;
    // the HLA-B row is not part of the locus
    assert!(table.alleles == vec!["HLA-A*01:01", "HLA-A*02:01", "HLA-A*03:01"]);
    assert!(table.samples == vec!["s1", "s2", "s3"]);

    let row = table.find("HLA-A*01:01", "s1").unwrap();
    assert!(row.n == 2 && row.detects == 1 && row.sum == 3.);
    assert!(common::approx(row.dadj, 0.5) && common::approx(row.cadj, 1.5));
    assert!(common::approx(row.total_dadj, 1.5));
    assert!(common::approx(row.wd, 1. / 3.));
    assert!(common::approx(row.wc, 1.5 / 6.5));

    let row = table.find("HLA-A*01:01", "s3").unwrap();
    assert!(row.detects == 2 && common::approx(row.cadj, 12.));
    Ok(())
}

#[test]
fn evidence_invariants() -> Result<()> {
    let matrix = common::matrix(
        &["deep", "shallow", "empty"],
        &[
            ("V02,CASSL", "HLA-C*07:01", vec![120., 2., 0.]),
            ("V03,CASSL", "HLA-C*07:01", vec![0., 0., 0.]),
            ("V12,CASSQ", "HLA-C*04:01", vec![35., 1., 0.]),
        ],
    );
    for method in [EvidenceMethod::Detects, EvidenceMethod::Counts] {
        let table = score(&matrix, Locus::C, method)?;
        for row in &table.evidence {
            assert!(row.detects <= row.n);
            assert!((0. ..=1.).contains(&row.wd));
            assert!((0. ..=1.).contains(&row.wc));
        }
        for s in 0..table.nb_samples() {
            let total: f64 = table.weights.row(s).sum();
            if table.samples[s] == "empty" {
                assert!(total == 0.);
            } else {
                assert!(common::approx(total, 1.));
            }
        }
    }
    // depth only changes the counts weights, not the detection ones
    let table = score(&matrix, Locus::C, EvidenceMethod::Detects)?;
    assert!(table.weights.row(0) == table.weights.row(1));
    Ok(())
}

#[test]
fn configuration_errors() -> Result<()> {
    let matrix = common::cohort_matrix();
    assert!(
        score(&matrix, Locus::C, EvidenceMethod::Detects)
            == Err(ConfigurationError::EmptyLocusPanel("HLA-C".to_string()))
    );
    assert!(
        score_with_flags(&matrix, Locus::A, true, true).err()
            == Some(ConfigurationError::BothMethods)
    );
    assert!(
        score_with_flags(&matrix, Locus::A, false, false).err()
            == Some(ConfigurationError::NoMethod)
    );
    assert!(matches!(
        weight_of_evidence(&matrix, Locus::A, 1.5, EvidenceMethod::Detects),
        Err(ConfigurationError::ThresholdOutOfRange(_))
    ));
    assert!(weight_of_evidence(&matrix, Locus::A, f64::NAN, EvidenceMethod::Detects).is_err());
    assert!("HLA-D".parse::<Locus>() == Err(ConfigurationError::InvalidLocus("HLA-D".to_string())));
    assert!("HLA-B".parse::<Locus>()? == Locus::B);
    Ok(())
}

#[test]
fn ties_broken_by_name() -> Result<()> {
    let ranked = rank_alleles(&[
        ("HLA-A*24:02".to_string(), 0.25),
        ("HLA-A*03:01".to_string(), 0.5),
        ("HLA-A*01:01".to_string(), 0.25),
    ]);
    assert!(ranked[0].0 == "HLA-A*03:01");
    assert!(ranked[1].0 == "HLA-A*01:01");
    assert!(ranked[2].0 == "HLA-A*24:02");

    let table = score(&common::cohort_matrix(), Locus::A, EvidenceMethod::Detects)?;
    let predictions = call(&table, 0.4)?;
    // s2: *02:01 and *03:01 both at 0.5
    assert!(predictions[1].p1 == "HLA-A*02:01");
    assert!(predictions[1].p2.as_deref() == Some("HLA-A*03:01"));
    // s3: *01:01 and *03:01 both at 0.5
    assert!(predictions[2].hla_1.as_deref() == Some("HLA-A*01:01"));
    assert!(predictions[2].hla_2.as_deref() == Some("HLA-A*03:01"));
    Ok(())
}

#[test]
fn threshold_monotonicity() -> Result<()> {
    let table = score(&common::cohort_matrix(), Locus::A, EvidenceMethod::Counts)?;
    let thresholds = [0., 0.05, 0.1, 0.2, 0.3, 0.5, 0.7, 0.9, 1.];
    let mut previous: Option<Vec<usize>> = None;
    for &t in &thresholds {
        let predictions = call(&table, t)?;
        let called: Vec<usize> = predictions.iter().map(|p| p.nb_called()).collect();
        if let Some(prev) = &previous {
            assert!(called.iter().zip(prev).all(|(c, p)| c <= p));
        }
        for p in &predictions {
            if let Some(a) = &p.hla_1 {
                assert!(p.weight(a).unwrap() >= t);
            }
            assert!(p.v2.map_or(true, |v2| v2 <= p.v1));
        }
        previous = Some(called);
    }
    Ok(())
}

#[test]
fn single_allele_locus() -> Result<()> {
    let (_, predictions) = weight_of_evidence(
        &common::cohort_matrix(),
        Locus::B,
        0.1,
        EvidenceMethod::Detects,
    )?;
    for p in &predictions {
        assert!(p.hla_1.as_deref() == Some("HLA-B*07:02"));
        assert!(p.p2.is_none() && p.v2.is_none() && p.hla_2.is_none());
    }
    Ok(())
}

#[test]
fn performance_against_truth() -> Result<()> {
    let table = score(&common::cohort_matrix(), Locus::A, EvidenceMethod::Detects)?;
    let mut truth = HashMap::new();
    truth.insert("s1".to_string(), "HLA-A*02:01,HLA-A*11:01".to_string());
    truth.insert("s2".to_string(), "HLA-A*03:01,HLA-A*24:02".to_string());
    truth.insert("s3".to_string(), "".to_string());
    let truth = TruthTable::new(truth);

    let predictions = call(&table, 0.4)?;
    let alleles = vec!["HLA-A*02:01".to_string(), "HLA-A*68:01".to_string()];
    let (performances, outcomes) = evaluate(&predictions, &truth, &alleles);
    // *68:01 has no weight, s3 has no known genotype
    assert!(performances.len() == 1);
    assert!(outcomes.len() == 2);
    let perf = &performances[0];
    // s1: *02:01 called and true, s2: *02:01 called but not true
    assert!(perf.tps == 1 && perf.fps == 1 && perf.tns == 0 && perf.fns == 0);
    assert!(perf.sens == Some(1.));
    assert!(perf.spec == Some(0.));
    assert!(perf.acur == Some(0.5));
    assert!(common::approx(perf.f1.unwrap(), 2. / 3.));

    let (performances, _) = sweep(&table, &[0.1, 0.9], &truth, None)?;
    assert!(performances.len() == 6);
    assert!(sweep(&table, &[0.1, 2.], &truth, None).is_err());
    Ok(())
}
