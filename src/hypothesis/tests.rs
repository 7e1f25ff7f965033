// Hypothesis test dispatch: reference values and precondition coverage
//
// Reference statistics were worked by hand from the textbook formulas;
// tolerances reflect the printed precision.

use super::*;
use crate::dataset::Column;
use crate::error::ErrorKind;

/// Columns of unequal length are padded with missing cells
fn numeric_dataset(columns: &[(&str, &[f64])]) -> Dataset {
    let rows = columns.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
    Dataset::from_columns(
        columns
            .iter()
            .map(|(name, values)| {
                let mut cells: Vec<Option<f64>> = values.iter().map(|&v| Some(v)).collect();
                cells.resize(rows, None);
                Column::numeric(*name, cells)
            })
            .collect(),
    )
    .unwrap()
}

fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() < tol,
        "expected {expected}, got {actual}"
    );
}

fn df_single(result: &TestResult) -> f64 {
    match result.df {
        Some(DegreesOfFreedom::Single(df)) => df,
        other => panic!("expected single df, got {other:?}"),
    }
}

fn df_pair(result: &TestResult) -> (f64, f64) {
    match result.df {
        Some(DegreesOfFreedom::Pair {
            numerator,
            denominator,
        }) => (numerator, denominator),
        other => panic!("expected df pair, got {other:?}"),
    }
}

#[test]
fn test_catalog_covers_every_procedure_once() {
    assert_eq!(PROCEDURES.len(), 10);
    for spec in PROCEDURES {
        let parsed: Procedure = spec.procedure.id().parse().unwrap();
        assert_eq!(parsed, spec.procedure);
        assert!(procedure_spec(spec.procedure).is_ok());
    }
    assert_eq!(
        "chi-square".parse::<Procedure>(),
        Err(EngineError::UnknownProcedure("chi-square".into()))
    );
}

#[test]
fn test_welch_t_on_manual_template() {
    let data = Dataset::manual_template();
    let request = TestRequest::new(Procedure::TwoSampleT, &["A", "B"], 0.05);
    let result = run_test(&data, &request).unwrap();

    assert_close(result.statistic, -8.0, 1e-9);
    assert_close(df_single(&result), 8.0, 1e-9);
    assert!(result.p_value < 0.001);
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_paired_t_on_manual_template() {
    let data = Dataset::manual_template();
    let request = TestRequest::new(Procedure::PairedT, &["A", "B"], 0.05);
    let result = run_test(&data, &request).unwrap();

    assert_close(result.statistic, -9.561_828_874_675, 1e-9);
    assert_close(df_single(&result), 4.0, 1e-12);
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_one_sample_t() {
    let data = Dataset::manual_template();
    let request = TestRequest::new(Procedure::OneSampleT, &["A"], 0.05).with_params(TestParams {
        mu0: Some(10.0),
        ..Default::default()
    });
    let result = run_test(&data, &request).unwrap();

    assert_close(result.statistic, 5.656_854_249_492, 1e-9);
    assert_close(df_single(&result), 4.0, 1e-12);
    // t(0.995, 4) = 4.604, so p < 0.01
    assert!(result.p_value < 0.01);
    assert!(result.p_value > 0.001);
}

#[test]
fn test_one_sample_t_requires_mu0() {
    let data = Dataset::manual_template();
    let request = TestRequest::new(Procedure::OneSampleT, &["A"], 0.05);
    assert_eq!(
        run_test(&data, &request),
        Err(EngineError::MissingParameter("mu0"))
    );
}

#[test]
fn test_identical_columns_give_zero_t() {
    let values = [3.0, 5.0, 4.0, 6.0, 2.0];
    let data = numeric_dataset(&[("x", &values), ("y", &values)]);

    for procedure in [Procedure::TwoSampleT, Procedure::PairedT] {
        let result = run_test(&data, &TestRequest::new(procedure, &["x", "y"], 0.05)).unwrap();
        assert_eq!(result.statistic, 0.0, "{procedure}");
        assert_close(result.p_value, 1.0, 1e-12);
        assert_eq!(result.decision, Decision::FailToReject);
    }
}

#[test]
fn test_zero_standard_error_with_difference_is_error() {
    let data = numeric_dataset(&[("x", &[5.0, 5.0, 5.0])]);
    let request = TestRequest::new(Procedure::OneSampleT, &["x"], 0.05).with_params(TestParams {
        mu0: Some(4.0),
        ..Default::default()
    });
    let err = run_test(&data, &request).unwrap_err();
    assert!(matches!(err, EngineError::ZeroVariance(_)));
    assert_eq!(err.kind(), ErrorKind::DegenerateData);
}

#[test]
fn test_same_column_twice_rejected() {
    let data = Dataset::manual_template();
    for procedure in [
        Procedure::TwoSampleT,
        Procedure::PairedT,
        Procedure::FTest,
        Procedure::Anova,
        Procedure::MannWhitney,
        Procedure::Wilcoxon,
    ] {
        let err = run_test(&data, &TestRequest::new(procedure, &["A", "A"], 0.05)).unwrap_err();
        assert_eq!(err, EngineError::DuplicateColumn("A".into()), "{procedure}");
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }
}

#[test]
fn test_column_errors() {
    let data = Dataset::manual_template();
    assert_eq!(
        run_test(&data, &TestRequest::new(Procedure::TwoSampleT, &["A", "Z"], 0.05)),
        Err(EngineError::UnknownColumn("Z".into()))
    );
    assert_eq!(
        run_test(&data, &TestRequest::new(Procedure::TwoSampleT, &["A", "Grup"], 0.05)),
        Err(EngineError::NonNumericColumn("Grup".into()))
    );
    assert!(matches!(
        run_test(&data, &TestRequest::new(Procedure::Anova, &["A"], 0.05)),
        Err(EngineError::InsufficientColumns { required: 2, actual: 1, .. })
    ));
    assert!(matches!(
        run_test(&data, &TestRequest::new(Procedure::FTest, &["A", "B", "Grup"], 0.05)),
        Err(EngineError::InvalidParameter { name: "columns", .. })
    ));
}

#[test]
fn test_empty_column_after_dropping_missing() {
    let data = Dataset::from_columns(vec![
        Column::numeric("x", vec![None, None]),
        Column::numeric("y", vec![Some(1.0), Some(2.0)]),
    ])
    .unwrap();
    let err = run_test(&data, &TestRequest::new(Procedure::TwoSampleT, &["x", "y"], 0.05))
        .unwrap_err();
    assert_eq!(err, EngineError::EmptyColumn("x".into()));
}

#[test]
fn test_insufficient_observations() {
    let data = numeric_dataset(&[("x", &[1.0]), ("y", &[2.0])]);
    assert!(matches!(
        run_test(&data, &TestRequest::new(Procedure::TwoSampleT, &["x", "y"], 0.05)),
        Err(EngineError::InsufficientData { required: 2, actual: 1, .. })
    ));
    assert!(matches!(
        run_test(&data, &TestRequest::new(Procedure::Anova, &["x", "y"], 0.05)),
        Err(EngineError::InsufficientData { required: 3, actual: 2, .. })
    ));
}

#[test]
fn test_invalid_alpha() {
    let data = Dataset::manual_template();
    for alpha in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
        let err = run_test(&data, &TestRequest::new(Procedure::TwoSampleT, &["A", "B"], alpha))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidSignificanceLevel(_)));
    }
}

#[test]
fn test_paired_length_mismatch_after_dropping() {
    let data = Dataset::from_columns(vec![
        Column::numeric("x", vec![Some(1.0), Some(2.0), Some(3.0)]),
        Column::numeric("y", vec![Some(1.5), None, Some(3.5)]),
    ])
    .unwrap();
    for procedure in [Procedure::PairedT, Procedure::Wilcoxon] {
        assert_eq!(
            run_test(&data, &TestRequest::new(procedure, &["x", "y"], 0.05)),
            Err(EngineError::LengthMismatch { left: 3, right: 2 })
        );
    }
}

#[test]
fn test_one_sample_z() {
    let data = numeric_dataset(&[("x", &[1.0, 2.0, 3.0, 4.0, 5.0])]);
    let request = TestRequest::new(Procedure::OneSampleZ, &["x"], 0.05).with_params(TestParams {
        mu0: Some(2.0),
        sigma: Some(1.0),
        ..Default::default()
    });
    let result = run_test(&data, &request).unwrap();
    assert_close(result.statistic, 5f64.sqrt(), 1e-12);
    assert_close(result.p_value, 0.025_347, 1e-5);
    assert!(result.df.is_none());
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_one_sample_z_rejects_bad_sigma() {
    let data = numeric_dataset(&[("x", &[1.0, 2.0])]);
    let request = TestRequest::new(Procedure::OneSampleZ, &["x"], 0.05).with_params(TestParams {
        mu0: Some(0.0),
        sigma: Some(0.0),
        ..Default::default()
    });
    assert!(matches!(
        run_test(&data, &request),
        Err(EngineError::InvalidParameter { name: "sigma", .. })
    ));
}

#[test]
fn test_one_proportion_at_hypothesis() {
    let request = TestRequest::new(Procedure::OneProportionZ, &[], 0.05).with_params(TestParams {
        x: Some(50),
        n: Some(100),
        p0: Some(0.5),
        ..Default::default()
    });
    let result = run_test(&Dataset::new(), &request).unwrap();
    assert_eq!(result.statistic, 0.0);
    assert_close(result.p_value, 1.0, 1e-12);
    assert_eq!(result.decision, Decision::FailToReject);
}

#[test]
fn test_one_proportion_parameter_errors() {
    let cases = [
        (Some(5), Some(0), Some(0.5), "n"),
        (Some(11), Some(10), Some(0.5), "x"),
        (Some(5), Some(10), Some(0.0), "p0"),
        (Some(5), Some(10), Some(1.0), "p0"),
    ];
    for (x, n, p0, name) in cases {
        let request = TestRequest::new(Procedure::OneProportionZ, &[], 0.05).with_params(
            TestParams {
                x,
                n,
                p0,
                ..Default::default()
            },
        );
        match run_test(&Dataset::new(), &request) {
            Err(EngineError::InvalidParameter { name: got, .. }) => assert_eq!(got, name),
            other => panic!("expected invalid {name}, got {other:?}"),
        }
    }
}

#[test]
fn test_two_proportion() {
    let request = TestRequest::new(Procedure::TwoProportionZ, &[], 0.05).with_params(TestParams {
        x1: Some(45),
        n1: Some(100),
        x2: Some(30),
        n2: Some(100),
        ..Default::default()
    });
    let result = run_test(&Dataset::new(), &request).unwrap();
    assert_close(result.statistic, 2.190_890_230, 1e-8);
    assert_close(result.p_value, 0.028_460, 1e-5);
    assert_eq!(result.decision, Decision::Reject);

    let strict = TestRequest {
        alpha: 0.01,
        ..request
    };
    assert_eq!(
        run_test(&Dataset::new(), &strict).unwrap().decision,
        Decision::FailToReject
    );
}

#[test]
fn test_two_proportion_rejects_overflowing_counts() {
    let request = TestRequest::new(Procedure::TwoProportionZ, &[], 0.05).with_params(TestParams {
        x1: Some(u64::MAX - 1),
        n1: Some(u64::MAX),
        x2: Some(1),
        n2: Some(2),
        ..Default::default()
    });
    assert!(matches!(
        run_test(&Dataset::new(), &request),
        Err(EngineError::InvalidParameter { name: "n1 + n2", .. })
    ));
}

#[test]
fn test_two_proportion_degenerate_pool() {
    let request = TestRequest::new(Procedure::TwoProportionZ, &[], 0.05).with_params(TestParams {
        x1: Some(0),
        n1: Some(10),
        x2: Some(0),
        n2: Some(12),
        ..Default::default()
    });
    assert!(matches!(
        run_test(&Dataset::new(), &request),
        Err(EngineError::InvalidParameter {
            name: "pooled proportion",
            ..
        })
    ));
}

#[test]
fn test_f_test_puts_larger_variance_on_top() {
    // var(x) = 2.5 (n=5), var(y) = 4 (n=3)
    let data = numeric_dataset(&[("x", &[1.0, 2.0, 3.0, 4.0, 5.0]), ("y", &[2.0, 4.0, 6.0])]);
    let result = run_test(&data, &TestRequest::new(Procedure::FTest, &["x", "y"], 0.05)).unwrap();

    assert_close(result.statistic, 1.6, 1e-12);
    assert_eq!(df_pair(&result), (2.0, 4.0));
    // F(2, 4) upper tail is (1 + F/2)^-2
    assert_close(result.p_value, 2.0 * 1.8f64.powi(-2), 1e-8);
}

#[test]
fn test_f_test_zero_variance() {
    let data = numeric_dataset(&[("x", &[1.0, 1.0, 1.0]), ("y", &[2.0, 4.0, 6.0])]);
    assert!(matches!(
        run_test(&data, &TestRequest::new(Procedure::FTest, &["x", "y"], 0.05)),
        Err(EngineError::ZeroVariance(_))
    ));
}

#[test]
fn test_anova_three_groups() {
    let data = numeric_dataset(&[
        ("g1", &[1.0, 2.0, 3.0]),
        ("g2", &[4.0, 5.0, 6.0]),
        ("g3", &[7.0, 8.0, 9.0]),
    ]);
    let result = run_test(
        &data,
        &TestRequest::new(Procedure::Anova, &["g1", "g2", "g3"], 0.05),
    )
    .unwrap();

    // MSB = 54 / 2, MSW = 6 / 6
    assert_close(result.statistic, 27.0, 1e-10);
    assert_eq!(df_pair(&result), (2.0, 6.0));
    // F(2, 6) upper tail is (1 + F/3)^-3
    assert_close(result.p_value, 0.001, 1e-8);
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_mann_whitney_separated_samples() {
    let data = numeric_dataset(&[
        ("x", &[1.0, 2.0, 3.0, 4.0, 5.0]),
        ("y", &[6.0, 7.0, 8.0, 9.0, 10.0]),
    ]);
    let result =
        run_test(&data, &TestRequest::new(Procedure::MannWhitney, &["x", "y"], 0.05)).unwrap();
    assert_eq!(result.statistic, 0.0);
    assert_close(result.p_value, 0.012_186, 1e-5);
    assert_eq!(result.decision, Decision::Reject);
}

#[test]
fn test_mann_whitney_all_tied() {
    let data = numeric_dataset(&[("x", &[3.0, 3.0]), ("y", &[3.0, 3.0, 3.0])]);
    let result =
        run_test(&data, &TestRequest::new(Procedure::MannWhitney, &["x", "y"], 0.05)).unwrap();
    assert_eq!(result.statistic, 3.0);
    assert_eq!(result.p_value, 1.0);
}

#[test]
fn test_wilcoxon_exact() {
    // differences x - y = [1, -2, 3, 4, 5, 6]: T+ = 19, T- = 2
    let data = numeric_dataset(&[
        ("x", &[11.0, 18.0, 33.0, 44.0, 55.0, 66.0]),
        ("y", &[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]),
    ]);
    let result =
        run_test(&data, &TestRequest::new(Procedure::Wilcoxon, &["x", "y"], 0.05)).unwrap();
    assert_eq!(result.statistic, 2.0);
    // P(T <= 2) = 3/64 for n = 6
    assert_close(result.p_value, 6.0 / 64.0, 1e-12);
    assert_eq!(result.decision, Decision::FailToReject);
    assert_eq!(
        Decision::from_p_value(result.p_value, 0.10),
        Decision::Reject
    );
}

#[test]
fn test_wilcoxon_drops_zero_differences() {
    let data = numeric_dataset(&[
        ("x", &[1.0, 2.0, 3.0, 4.0]),
        ("y", &[1.0, 2.0, 3.0, 6.0]),
    ]);
    let result =
        run_test(&data, &TestRequest::new(Procedure::Wilcoxon, &["x", "y"], 0.05)).unwrap();
    // single non-zero difference: W = 0, exact p = 2 * 1/2
    assert_eq!(result.statistic, 0.0);
    assert_eq!(result.p_value, 1.0);
}

#[test]
fn test_wilcoxon_all_zero_differences() {
    let values = [1.0, 2.0, 3.0];
    let data = numeric_dataset(&[("x", &values), ("y", &values)]);
    assert_eq!(
        run_test(&data, &TestRequest::new(Procedure::Wilcoxon, &["x", "y"], 0.05)),
        Err(EngineError::AllDifferencesZero)
    );
}

#[test]
fn test_wilcoxon_ties_use_normal_approximation() {
    // |d| = [1, 1, 2, 2, 3, 3, 4]: tied ranks
    let data = numeric_dataset(&[
        ("x", &[2.0, 3.0, 5.0, 6.0, 8.0, 9.0, 14.0]),
        ("y", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 10.0]),
    ]);
    let result =
        run_test(&data, &TestRequest::new(Procedure::Wilcoxon, &["x", "y"], 0.05)).unwrap();
    // every difference positive: W = 0
    assert_eq!(result.statistic, 0.0);
    assert!(result.p_value > 0.0 && result.p_value < 0.05);
}

#[test]
fn test_decision_rule_is_strict() {
    for alpha in [0.01, 0.05, 0.10] {
        assert_eq!(Decision::from_p_value(alpha, alpha), Decision::FailToReject);
        assert_eq!(
            Decision::from_p_value(alpha - 1e-9, alpha),
            Decision::Reject
        );
        assert_eq!(
            Decision::from_p_value(alpha + 1e-9, alpha),
            Decision::FailToReject
        );
    }
}

#[test]
fn test_result_serializes_procedure_id() {
    let data = Dataset::manual_template();
    let result = run_test(&data, &TestRequest::new(Procedure::FTest, &["A", "B"], 0.05)).unwrap();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["procedure"], "f-test");
    assert_eq!(json["decision"], "fail-to-reject");
    assert!(json["df"]["numerator"].is_number());
    assert!(result.to_report_string().contains("F-test"));
}
