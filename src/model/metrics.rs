//! Regression metrics and summary statistics.
//!
//! All functions take equal-length slices; callers guarantee that.

use statrs::statistics::Statistics;

/// Floor for `|y|` in MAPE so zero targets do not divide by zero.
const MAPE_EPSILON: f64 = f64::EPSILON;

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .mean()
}

pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .mean()
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 for a perfect fit and 0.0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().mean();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Mean absolute percentage error as a fraction (0.1 = 10%).
pub fn mape(y_true: &[f64], y_pred: &[f64]) -> f64 {
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs() / t.abs().max(MAPE_EPSILON))
        .mean()
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Sample standard deviation (n - 1). Zero for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Population standard deviation (n). Zero for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mae_and_mse() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert!(close(mae(&y, &p), 0.5));
        assert!(close(mse(&y, &p), 0.375));
    }

    #[test]
    fn test_r2_reference_value() {
        let y = [3.0, -0.5, 2.0, 7.0];
        let p = [2.5, 0.0, 2.0, 8.0];
        assert!(close(r2(&y, &p), 0.948_608_137_044_967_9));
    }

    #[test]
    fn test_r2_constant_target() {
        assert_eq!(r2(&[2.0, 2.0], &[2.0, 2.0]), 1.0);
        assert_eq!(r2(&[2.0, 2.0], &[2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_mape_is_fraction() {
        assert!(close(mape(&[100.0, 200.0], &[110.0, 180.0]), 0.1));
    }

    #[test]
    fn test_mape_zero_target_is_finite() {
        assert!(mape(&[0.0], &[1.0]).is_finite());
    }

    #[test]
    fn test_std_conventions() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(population_std(&v), 2.0));
        assert!(close(sample_std(&v), 2.138_089_935_299_395));
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
    }
}
