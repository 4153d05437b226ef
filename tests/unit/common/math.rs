use jtrader::common::math;

#[test]
fn sma_uses_trailing_values() {
    assert_eq!(math::sma(&[1.0, 2.0, 3.0, 4.0], 2), Some(3.5));
    assert_eq!(math::sma(&[1.0], 2), None);
}

#[test]
fn linear_regression_recovers_exact_line() {
    let values: Vec<f64> = (0..10).map(|x| 2.0 * x as f64 + 1.0).collect();
    let fit = math::linear_regression(&values).unwrap();
    assert!((fit.slope - 2.0).abs() < 1e-9);
    assert!((fit.intercept - 1.0).abs() < 1e-9);
    assert!((fit.r_squared - 1.0).abs() < 1e-9);
    assert!((fit.predict(12.0) - 25.0).abs() < 1e-9);
}

#[test]
fn std_dev_of_constant_series_is_zero() {
    assert_eq!(math::std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
}
