//! Regression metrics.

/// Mean absolute percentage error, as a fraction (0.1 = 10%).
///
/// Each term is `|y - ŷ| / max(|y|, ε)` so zero targets give a large but
/// finite error instead of a division by zero. Returns `None` for empty or
/// mismatched inputs.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(y, p)| (y - p).abs() / y.abs().max(f64::EPSILON))
        .sum();
    Some(total / actual.len() as f64)
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mape_basic() {
        let mape = mean_absolute_percentage_error(&[100.0, 200.0], &[110.0, 180.0]).unwrap();
        assert!((mape - 0.1).abs() < 1e-12);
    }

    #[test]
    fn mape_rejects_bad_shapes() {
        assert!(mean_absolute_percentage_error(&[], &[]).is_none());
        assert!(mean_absolute_percentage_error(&[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn mape_is_finite_for_zero_targets() {
        let mape = mean_absolute_percentage_error(&[0.0], &[1.0]).unwrap();
        assert!(mape.is_finite() && mape > 1.0);
    }

    #[test]
    fn variance_of_constant_is_zero() {
        assert_eq!(variance(&[3.0, 3.0, 3.0]), 0.0);
        assert!((variance(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }
}
