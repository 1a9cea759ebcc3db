use ndarray::Array1;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::features::DesignMatrix;
use crate::linalg::least_squares;
use crate::types::{AnalysisError, CoefficientEstimate, RegressionResult, Result};

/// Fit the cross-sectional regression by ordinary least squares.
///
/// The design already carries its intercept column (`const`). Standard
/// errors use the classical homoskedastic covariance `s² (X'X)^-1` with
/// `s² = SSR / (n - k)`, and p-values are two-sided Student-t with `n - k`
/// degrees of freedom.
///
/// # Arguments
/// * `design` - Imputed design matrix and target from `features::build_design`
///
/// # Returns
/// `RegressionResult` with per-coefficient inference, R², adjusted R² and RMSE
///
/// # Errors
/// Returns `AnalysisError::InsufficientObservations` if there are not more rows
/// than columns, and `AnalysisError::RankDeficient` for collinear designs
pub fn fit_ols(design: &DesignMatrix) -> Result<RegressionResult> {
    let (n, k) = design.x.dim();
    if n <= k {
        return Err(AnalysisError::InsufficientObservations {
            required: k + 1,
            available: n,
        });
    }

    let ls = least_squares(&design.x, &design.y, &design.names)?;
    let df_resid = n - k;
    let sigma2 = ls.ssr / df_resid as f64;

    let coefficients = design
        .names
        .iter()
        .enumerate()
        .map(|(j, name)| {
            let coef = ls.beta[j];
            let std_error = (sigma2 * ls.xtx_inv[[j, j]]).max(0.0).sqrt();
            let t_stat = coef / std_error;
            CoefficientEstimate {
                name: name.clone(),
                coef,
                std_error,
                t_stat,
                p_value: t_test_p_value(coef, std_error, df_resid),
            }
        })
        .collect();

    let (rmse, r2) = compute_metrics(&design.y, &ls.fitted);
    let adj_r2 = 1.0 - (1.0 - r2) * (n as f64 - 1.0) / df_resid as f64;

    Ok(RegressionResult {
        coefficients,
        r2,
        adj_r2,
        rmse,
        n_obs: n,
        df_resid,
    })
}

/// Two-sided p-value of `coef / std_error` under Student-t(df).
///
/// A zero standard error (perfect fit) gives p = 0 for a non-zero coefficient
/// and p = 1 for a zero one.
pub(crate) fn t_test_p_value(coef: f64, std_error: f64, df: usize) -> f64 {
    if std_error == 0.0 {
        return if coef == 0.0 { 1.0 } else { 0.0 };
    }
    let t = coef / std_error;
    match StudentsT::new(0.0, 1.0, df as f64) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Compute RMSE and R² metrics.
///
/// # Arguments
/// * `y_actual` - Actual target values
/// * `y_pred` - Predicted values from the model
///
/// # Returns
/// Tuple of (RMSE, R²) fit quality metrics
pub(crate) fn compute_metrics(y_actual: &Array1<f64>, y_pred: &Array1<f64>) -> (f64, f64) {
    let n = y_actual.len() as f64;

    let ss_res: f64 = y_actual
        .iter()
        .zip(y_pred.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum();
    let rmse = (ss_res / n).sqrt();

    let y_mean = y_actual.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_actual.iter().map(|&v| (v - y_mean).powi(2)).sum();
    let r2 = 1.0 - ss_res / ss_tot.max(1e-12);

    (rmse, r2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn simple_design() -> DesignMatrix {
        DesignMatrix {
            names: vec!["x".into(), "const".into()],
            x: array![[1.0, 1.0], [2.0, 1.0], [3.0, 1.0], [4.0, 1.0], [5.0, 1.0]],
            y: array![2.0, 4.0, 5.0, 4.0, 5.0],
        }
    }

    #[test]
    fn test_ols_textbook_example() {
        let fit = fit_ols(&simple_design()).unwrap();

        assert_relative_eq!(fit.coefficient("x").unwrap(), 0.6, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficient("const").unwrap(), 2.2, epsilon = 1e-10);
        assert_relative_eq!(fit.estimate("x").unwrap().std_error, 0.08_f64.sqrt(), epsilon = 1e-10);
        assert_relative_eq!(fit.p_value("x").unwrap(), 0.124_027_062_657_554_6, epsilon = 1e-8);
        assert_relative_eq!(fit.p_value("const").unwrap(), 0.100_743_456_085_419_9, epsilon = 1e-8);
        assert_relative_eq!(fit.r2, 0.6, epsilon = 1e-10);
        assert_relative_eq!(fit.adj_r2, 1.0 - 0.4 * 4.0 / 3.0, epsilon = 1e-10);
        assert_eq!(fit.df_resid, 3);
        assert_eq!(fit.n_obs, 5);
    }

    #[test]
    fn test_r2_bounds_on_noisy_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let n = 60;
        let x = Array2::from_shape_fn((n, 3), |(_, j)| {
            if j == 2 {
                1.0
            } else {
                rng.gen_range(-5.0..5.0)
            }
        });
        let y = Array1::from_shape_fn(n, |i| {
            1.5 + 0.8 * x[[i, 0]] - 0.3 * x[[i, 1]] + rng.gen_range(-2.0..2.0)
        });
        let design = DesignMatrix {
            names: vec!["a".into(), "b".into(), "const".into()],
            x,
            y,
        };
        let fit = fit_ols(&design).unwrap();

        assert!(fit.r2 >= 0.0 && fit.r2 <= 1.0);
        assert!(fit.adj_r2 <= fit.r2);
        assert!(fit.p_value("a").unwrap() < 0.05);
        for c in &fit.coefficients {
            assert!(c.p_value >= 0.0 && c.p_value <= 1.0);
        }
    }

    #[test]
    fn test_coefficient_and_pvalue_keys_match() {
        let fit = fit_ols(&simple_design()).unwrap();
        let names: Vec<_> = fit.coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "const"]);
        for name in names {
            assert!(fit.coefficient(name).is_some());
            assert!(fit.p_value(name).is_some());
        }
    }

    #[test]
    fn test_collinear_dummies_fail() {
        // Two one-hot columns that always sum to the intercept.
        let design = DesignMatrix {
            names: vec!["Stage_A".into(), "Stage_B".into(), "const".into()],
            x: array![
                [1.0, 0.0, 1.0],
                [0.0, 1.0, 1.0],
                [1.0, 0.0, 1.0],
                [0.0, 1.0, 1.0],
                [1.0, 0.0, 1.0]
            ],
            y: array![1.0, 2.0, 3.0, 4.0, 5.0],
        };
        match fit_ols(&design) {
            Err(AnalysisError::RankDeficient { column }) => assert_eq!(column, "const"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_too_few_rows() {
        let design = DesignMatrix {
            names: vec!["x".into(), "const".into()],
            x: array![[1.0, 1.0], [2.0, 1.0]],
            y: array![1.0, 2.0],
        };
        assert!(matches!(
            fit_ols(&design),
            Err(AnalysisError::InsufficientObservations {
                required: 3,
                available: 2
            })
        ));
    }

    #[test]
    fn test_perfect_fit_p_values() {
        assert_eq!(t_test_p_value(2.0, 0.0, 5), 0.0);
        assert_eq!(t_test_p_value(0.0, 0.0, 5), 1.0);
    }

    #[test]
    fn test_compute_metrics() {
        let y = array![1.0, 2.0, 3.0];
        let (rmse, r2) = compute_metrics(&y, &y);
        assert_eq!(rmse, 0.0);
        assert_relative_eq!(r2, 1.0);
    }
}
