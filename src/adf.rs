//! Augmented Dickey-Fuller unit-root test with a constant term.
//!
//! The augmentation length is chosen by AIC over `0..=maxlag` on a common
//! sample, then the test regression is re-estimated on the longest sample
//! available for the chosen length. p-values come from the MacKinnon (1994)
//! response surface, critical values from MacKinnon (2010).

use ndarray::{Array1, Array2};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::debug;

use crate::defaults::{DIFFERENCED_SERIES, LEVEL_ADF_MAXLAG, LEVEL_SERIES};
use crate::linalg::least_squares;
use crate::timeseries::{MacroPanel, VarPanel};
use crate::types::{classify_stationarity, AdfReport, AdfResult, AnalysisError, Result};

// MacKinnon (1994), constant only, one series.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALLP: [f64; 3] = [2.1659, 1.4412, 3.8269e-2];
const TAU_LARGEP: [f64; 4] = [1.7339, 9.3202e-1, -1.2745e-1, -1.0368e-2];

// MacKinnon (2010), constant only, one series: 1%, 5%, 10%.
const TAU_2010: [[f64; 4]; 3] = [
    [-3.43035, -6.5393, -16.786, -79.433],
    [-2.86154, -2.8903, -4.234, -40.040],
    [-2.56677, -1.5384, -2.809, 0.0],
];

/// Number of deterministic terms in the test regression.
const NTREND: usize = 1;

fn polyval(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Approximate p-value of an ADF statistic (constant, no trend).
pub fn mackinnon_p_value(stat: f64) -> f64 {
    if stat > TAU_MAX {
        return 1.0;
    }
    if stat < TAU_MIN {
        return 0.0;
    }
    let z = if stat <= TAU_STAR {
        polyval(&TAU_SMALLP, stat)
    } else {
        polyval(&TAU_LARGEP, stat)
    };
    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}

/// Finite-sample 1%, 5% and 10% critical values for `nobs` observations.
pub fn mackinnon_critical_values(nobs: usize) -> [f64; 3] {
    let inv = 1.0 / nobs as f64;
    TAU_2010.map(|row| polyval(&row, inv))
}

/// Default augmentation cap: ceil(12 (n/100)^{1/4}), at most n/2 - 2.
pub fn default_maxlag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(NTREND + 1))
}

/// Regressors `[x_{t-1}, Δx_{t-1}, .., Δx_{t-lags}]` and target `Δx_t`,
/// aligned on the last `len(Δx) - trim` differences.
fn adf_regressors(x: &[f64], dx: &[f64], lags: usize, trim: usize) -> (Array2<f64>, Array1<f64>) {
    let nobs = dx.len() - trim;
    let xs = Array2::from_shape_fn((nobs, lags + 1), |(r, j)| {
        let t = trim + r;
        if j == 0 {
            x[t]
        } else {
            dx[t - j]
        }
    });
    let y = Array1::from_shape_fn(nobs, |r| dx[trim + r]);
    (xs, y)
}

fn with_constant(xs: &Array2<f64>, prepend: bool) -> Array2<f64> {
    let (n, k) = xs.dim();
    Array2::from_shape_fn((n, k + 1), |(i, j)| match (prepend, j) {
        (true, 0) => 1.0,
        (true, j) => xs[[i, j - 1]],
        (false, j) if j == k => 1.0,
        (false, j) => xs[[i, j]],
    })
}

fn column_names(k: usize) -> Vec<String> {
    (0..k).map(|j| format!("adf_{j}")).collect()
}

/// Gaussian AIC of an OLS fit, `-2 llf + 2 k`.
fn ols_aic(ssr: f64, nobs: usize, k: usize) -> f64 {
    let n = nobs as f64;
    let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (ssr / n).ln() + 1.0);
    -2.0 * llf + 2.0 * k as f64
}

/// Run the ADF test on `series`.
///
/// # Arguments
/// * `series` - Observations in time order; must be finite
/// * `maxlag` - Largest augmentation length tried; `None` uses [`default_maxlag`]
///
/// # Errors
/// * `MissingValues` if the series contains NaN or infinities
/// * `InsufficientObservations` if `maxlag` leaves no room for the regression
/// * `RankDeficient` for degenerate (e.g. constant) series
pub fn adf_test(series: &[f64], maxlag: Option<usize>) -> Result<AdfResult> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::MissingValues("adf input".to_string()));
    }
    let n = series.len();
    let cap = (n / 2).saturating_sub(NTREND + 1);
    let maxlag = maxlag.unwrap_or_else(|| default_maxlag(n));
    if n < 4 || maxlag > cap {
        return Err(AnalysisError::InsufficientObservations {
            required: 2 * (maxlag + NTREND + 1),
            available: n,
        });
    }

    let dx: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag search on the common sample.
    let (xs, y) = adf_regressors(series, &dx, maxlag, maxlag);
    let full = with_constant(&xs, true);
    let nobs = y.len();
    let mut best = (f64::INFINITY, 0usize);
    for lags in 0..=maxlag {
        let k = lags + 2;
        let exog = full.slice(ndarray::s![.., ..k]).to_owned();
        let ls = least_squares(&exog, &y, &column_names(k))?;
        let aic = ols_aic(ls.ssr, nobs, k);
        if aic < best.0 {
            best = (aic, lags);
        }
    }
    let (ic_best, used_lag) = best;

    // Final regression on the longest sample for the chosen length.
    let (xs, y) = adf_regressors(series, &dx, used_lag, used_lag);
    let exog = with_constant(&xs, false);
    let nobs = y.len();
    let k = exog.ncols();
    if nobs <= k {
        return Err(AnalysisError::InsufficientObservations {
            required: k + 1,
            available: nobs,
        });
    }
    let ls = least_squares(&exog, &y, &column_names(k))?;
    let sigma2 = ls.ssr / (nobs - k) as f64;
    let statistic = ls.beta[0] / (sigma2 * ls.xtx_inv[[0, 0]]).sqrt();
    let p_value = mackinnon_p_value(statistic);

    debug!(statistic, p_value, used_lag, nobs, "adf test");

    Ok(AdfResult {
        statistic,
        p_value,
        used_lag,
        n_obs: nobs,
        critical_values: mackinnon_critical_values(nobs),
        ic_best,
    })
}

fn complete_series(panel: &MacroPanel, name: &str) -> Result<Vec<f64>> {
    panel
        .series(name)?
        .iter()
        .map(|v| v.ok_or_else(|| AnalysisError::MissingValues(name.to_string())))
        .collect()
}

/// Stationarity diagnostics for the VAR inputs.
///
/// Levels (LAYOFFS, UNCERTAINTY, FEDFUNDS, CORESTICKM159SFRBATL, INDPRO) are
/// tested with a maximum augmentation of 1; the differenced INFLATION and
/// D_INDPRO with the default lag cap.
pub fn stationarity_report(raw: &MacroPanel, differenced: &VarPanel) -> Result<Vec<AdfReport>> {
    let mut reports = Vec::with_capacity(LEVEL_SERIES.len() + DIFFERENCED_SERIES.len());

    for name in LEVEL_SERIES {
        let values = complete_series(raw, name)?;
        let result = adf_test(&values, Some(LEVEL_ADF_MAXLAG))?;
        reports.push(AdfReport {
            variable: name.to_string(),
            differenced: false,
            verdict: classify_stationarity(name, result.p_value),
            result,
        });
    }

    for name in DIFFERENCED_SERIES {
        let values = differenced
            .series(name)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                available: differenced.names.clone(),
            })?
            .to_vec();
        let result = adf_test(&values, None)?;
        reports.push(AdfReport {
            variable: name.to_string(),
            differenced: true,
            verdict: classify_stationarity(name, result.p_value),
            result,
        });
    }

    Ok(reports)
}
