//! Vector autoregression: equation-wise estimation and AIC lag selection.

use std::sync::Arc;

use linfa::dataset::Dataset;
use linfa::traits::Fit;
use linfa_linear::LinearRegression;
use ndarray::{s, Array1, Array2};
use tracing::{debug, info};

use crate::defaults::CONST_NAME;
use crate::linalg::{gram_inverse, log_det_spd};
use crate::ols::{compute_metrics, t_test_p_value};
use crate::timeseries::VarPanel;
use crate::types::{
    AnalysisError, CoefficientEstimate, EquationCoefficients, EquationStats, LagCriteria, Result,
};

/// Unfitted VAR over a differenced panel.
///
/// The data is shared with every `FittedVar` produced from it.
#[derive(Clone, Debug)]
pub struct VarModel {
    names: Vec<String>,
    endog: Arc<Array2<f64>>,
}

impl VarModel {
    /// # Errors
    /// `EmptyInput` for a panel without rows or variables, `MissingValues`
    /// naming the first variable with a non-finite entry.
    pub fn new(panel: &VarPanel) -> Result<Self> {
        if panel.data.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        if panel.names.len() != panel.data.ncols() {
            return Err(AnalysisError::LengthMismatch {
                expected: panel.data.ncols(),
                found: panel.names.len(),
            });
        }
        for (j, name) in panel.names.iter().enumerate() {
            if panel.data.column(j).iter().any(|v| !v.is_finite()) {
                return Err(AnalysisError::MissingValues(name.clone()));
            }
        }
        Ok(Self {
            names: panel.names.clone(),
            endog: Arc::new(panel.data.clone()),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn neqs(&self) -> usize {
        self.names.len()
    }

    pub fn nobs(&self) -> usize {
        self.endog.nrows()
    }

    /// Smallest panel length that leaves one residual degree of freedom at
    /// lag order `lags`.
    pub fn required_obs(&self, lags: usize) -> usize {
        lags + self.neqs() * lags + 2
    }

    /// Fit VAR(`lags`) with an intercept on the sample `y[lags..]`.
    ///
    /// Each equation is an ordinary least-squares regression of one variable
    /// on `lags` lags of every variable.
    ///
    /// # Errors
    /// * `InvalidConfig` for `lags == 0`
    /// * `InsufficientObservations` when the sample leaves no residual
    ///   degrees of freedom
    /// * `RankDeficient` naming the first collinear lag regressor
    /// * `SingularCovariance` when the residual covariance is not positive
    ///   definite
    pub fn fit(&self, lags: usize) -> Result<FittedVar> {
        if lags == 0 {
            return Err(AnalysisError::InvalidConfig(
                "VAR lag order must be at least 1".to_string(),
            ));
        }
        let required = self.required_obs(lags);
        if self.nobs() < required {
            return Err(AnalysisError::InsufficientObservations {
                required,
                available: self.nobs(),
            });
        }

        let k = self.neqs();
        let y = self.endog.slice(s![lags.., ..]).to_owned();
        let z = self.lagged_regressors(lags);
        let regressor_names = self.regressor_names(lags);
        let xtx_inv = self.check_regressors(&z, &regressor_names)?;

        let mut intercept = Array1::<f64>::zeros(k);
        let mut params = Array2::<f64>::zeros((k, k * lags));
        for i in 0..k {
            let dataset = Dataset::new(z.clone(), y.column(i).to_owned());
            let lin = LinearRegression::new().with_intercept(true);
            let ols = lin
                .fit(&dataset)
                .map_err(|e| AnalysisError::Linalg(format!("{:?}", e)))?;
            intercept[i] = ols.intercept();
            params.row_mut(i).assign(ols.params());
        }

        let coefs: Vec<Array2<f64>> = (0..lags)
            .map(|j| params.slice(s![.., j * k..(j + 1) * k]).to_owned())
            .collect();

        let fitted = z.dot(&params.t()) + &intercept;
        let resid = &y - &fitted;

        let nobs = y.nrows();
        let df_model = k * lags + 1;
        let df_resid = nobs - df_model;
        let sse = resid.t().dot(&resid);
        let sigma_u_mle = &sse / nobs as f64;
        let sigma_u = &sse / df_resid as f64;

        let ld = log_det_spd(&sigma_u_mle)?;
        let criteria = InfoCriteria::new(ld, nobs, k, lags);

        Ok(FittedVar {
            names: self.names.clone(),
            endog: Arc::clone(&self.endog),
            lag_order: lags,
            intercept,
            coefs,
            fitted,
            resid,
            sigma_u,
            sigma_u_mle,
            criteria,
            regressor_names,
            xtx_inv,
        })
    }

    /// Row `r` holds `[y_{t-1}, y_{t-2}, .., y_{t-lags}]` for `t = lags + r`.
    fn lagged_regressors(&self, lags: usize) -> Array2<f64> {
        let k = self.neqs();
        let rows = self.nobs() - lags;
        Array2::from_shape_fn((rows, k * lags), |(r, c)| {
            let (j, l) = (c / k, c % k);
            self.endog[[lags + r - (j + 1), l]]
        })
    }

    /// `const` followed by `L{j}.{name}` in regressor column order.
    fn regressor_names(&self, lags: usize) -> Vec<String> {
        let mut names = Vec::with_capacity(self.neqs() * lags + 1);
        names.push(CONST_NAME.to_string());
        for j in 1..=lags {
            for name in &self.names {
                names.push(format!("L{j}.{name}"));
            }
        }
        names
    }

    /// `(Z'Z)^-1` of the regressors with the constant column first.
    fn check_regressors(&self, z: &Array2<f64>, names: &[String]) -> Result<Array2<f64>> {
        let mut with_const = Array2::<f64>::ones((z.nrows(), z.ncols() + 1));
        with_const.slice_mut(s![.., 1..]).assign(z);
        gram_inverse(&with_const, names)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InfoCriteria {
    pub aic: f64,
    pub bic: f64,
    pub hqic: f64,
    pub fpe: f64,
}

impl InfoCriteria {
    /// `ld` is ln det of the MLE residual covariance.
    fn new(ld: f64, nobs: usize, neqs: usize, lags: usize) -> Self {
        let n = nobs as f64;
        let free = (lags * neqs * neqs + neqs) as f64;
        let df_model = (neqs * lags + 1) as f64;
        Self {
            aic: ld + 2.0 * free / n,
            bic: ld + n.ln() * free / n,
            hqic: ld + 2.0 * n.ln().ln() * free / n,
            fpe: ((n + df_model) / (n - df_model)).powi(neqs as i32) * ld.exp(),
        }
    }
}

/// Estimated VAR(p). Immutable; shares the panel data with its `VarModel`.
#[derive(Clone, Debug)]
pub struct FittedVar {
    names: Vec<String>,
    endog: Arc<Array2<f64>>,
    lag_order: usize,
    intercept: Array1<f64>,
    coefs: Vec<Array2<f64>>,
    fitted: Array2<f64>,
    resid: Array2<f64>,
    sigma_u: Array2<f64>,
    sigma_u_mle: Array2<f64>,
    criteria: InfoCriteria,
    regressor_names: Vec<String>,
    xtx_inv: Array2<f64>,
}

impl FittedVar {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn neqs(&self) -> usize {
        self.names.len()
    }

    pub fn lag_order(&self) -> usize {
        self.lag_order
    }

    /// Observations used in estimation (`T - p`).
    pub fn nobs(&self) -> usize {
        self.resid.nrows()
    }

    pub fn intercept(&self) -> &Array1<f64> {
        &self.intercept
    }

    /// `A_1..A_p`, where `A_j[[i, l]]` is the effect of variable `l` at lag
    /// `j` on equation `i`.
    pub fn coefs(&self) -> &[Array2<f64>] {
        &self.coefs
    }

    pub fn fitted_values(&self) -> &Array2<f64> {
        &self.fitted
    }

    pub fn residuals(&self) -> &Array2<f64> {
        &self.resid
    }

    /// Residual covariance adjusted for degrees of freedom.
    pub fn sigma_u(&self) -> &Array2<f64> {
        &self.sigma_u
    }

    pub fn sigma_u_mle(&self) -> &Array2<f64> {
        &self.sigma_u_mle
    }

    pub fn info_criteria(&self) -> InfoCriteria {
        self.criteria
    }

    pub fn lag_criteria(&self) -> LagCriteria {
        LagCriteria {
            lag: self.lag_order,
            aic: self.criteria.aic,
            hqic: self.criteria.hqic,
            bic: self.criteria.bic,
        }
    }

    /// Panel the model was estimated from, shared with the `VarModel`.
    pub fn endog(&self) -> &Array2<f64> {
        &self.endog
    }

    /// Index of variable `name` in the model ordering.
    ///
    /// # Errors
    /// `MissingColumn` listing the model variables.
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                available: self.names.clone(),
            })
    }

    /// Residual correlation matrix derived from `sigma_u`.
    pub fn resid_corr(&self) -> Array2<f64> {
        let sd = self.sigma_u.diag().mapv(f64::sqrt);
        Array2::from_shape_fn(self.sigma_u.dim(), |(i, j)| {
            self.sigma_u[[i, j]] / (sd[i] * sd[j])
        })
    }

    /// Coefficient, standard error, t statistic and two-sided p-value for
    /// every regressor of every equation.
    ///
    /// Standard errors come from `(Z'Z)^-1 ⊗ sigma_u`; p-values use a
    /// Student-t with `nobs - (neqs * p + 1)` degrees of freedom.
    pub fn coefficient_table(&self) -> Vec<EquationCoefficients> {
        let k = self.neqs();
        let df_resid = self.nobs() - (k * self.lag_order + 1);
        self.names
            .iter()
            .enumerate()
            .map(|(i, equation)| {
                let coefficients = self
                    .regressor_names
                    .iter()
                    .enumerate()
                    .map(|(c, name)| {
                        let coef = match c {
                            0 => self.intercept[i],
                            _ => self.coefs[(c - 1) / k][[i, (c - 1) % k]],
                        };
                        let std_error = (self.xtx_inv[[c, c]] * self.sigma_u[[i, i]]).sqrt();
                        CoefficientEstimate {
                            name: name.clone(),
                            coef,
                            std_error,
                            t_stat: coef / std_error,
                            p_value: t_test_p_value(coef, std_error, df_resid),
                        }
                    })
                    .collect();
                EquationCoefficients {
                    equation: equation.clone(),
                    coefficients,
                }
            })
            .collect()
    }

    /// RMSE (`sqrt` of the `sigma_u` diagonal) and R² per equation.
    pub fn equation_stats(&self) -> Vec<EquationStats> {
        let actual = self.endog.slice(s![self.lag_order.., ..]);
        self.names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let (_, r2) = compute_metrics(
                    &actual.column(i).to_owned(),
                    &self.fitted.column(i).to_owned(),
                );
                EquationStats {
                    equation: name.clone(),
                    rmse: self.sigma_u[[i, i]].sqrt(),
                    r2,
                }
            })
            .collect()
    }
}

/// Lag table plus the model refit at the AIC-minimizing order.
#[derive(Clone, Debug)]
pub struct LagSelection {
    /// One row per candidate lag, in increasing order.
    pub table: Vec<LagCriteria>,
    pub selected_lag: usize,
    pub model: FittedVar,
    /// Number of VAR estimations performed (candidates plus the refit).
    pub fit_calls: usize,
}

/// Fit VAR(p) for p = 1..=`maxlags`, pick the lag with the smallest AIC
/// (first minimum on ties) and estimate the final model at that lag.
///
/// # Arguments
/// * `model` - Unfitted VAR over the differenced panel
/// * `maxlags` - Largest candidate lag order
///
/// # Returns
/// `LagSelection` with `maxlags` table rows and `maxlags + 1` fit calls
///
/// # Errors
/// Returns `AnalysisError::InsufficientObservations` before any estimation
/// if the panel cannot support `maxlags`, and propagates estimation errors.
pub fn select_and_fit(model: &VarModel, maxlags: usize) -> Result<LagSelection> {
    if maxlags == 0 {
        return Err(AnalysisError::InvalidConfig(
            "maxlags must be at least 1".to_string(),
        ));
    }
    let required = model.required_obs(maxlags);
    if model.nobs() < required {
        return Err(AnalysisError::InsufficientObservations {
            required,
            available: model.nobs(),
        });
    }

    let mut table = Vec::with_capacity(maxlags);
    let mut fit_calls = 0usize;
    let mut best_lag = 1usize;
    let mut best_aic = f64::INFINITY;

    for lag in 1..=maxlags {
        let fit = model.fit(lag)?;
        fit_calls += 1;
        let row = fit.lag_criteria();
        debug!(lag, aic = row.aic, hqic = row.hqic, bic = row.bic, "fitted VAR candidate");

        if row.aic < best_aic {
            best_aic = row.aic;
            best_lag = lag;
        }
        table.push(row);
    }

    let final_model = model.fit(best_lag)?;
    fit_calls += 1;
    info!(selected_lag = best_lag, aic = best_aic, fit_calls, "selected VAR lag order");

    Ok(LagSelection {
        table,
        selected_lag: best_lag,
        model: final_model,
        fit_calls,
    })
}
