//! Impulse responses of a fitted VAR.

use ndarray::{Array2, Array3};

use crate::defaults::LAYOFFS;
use crate::linalg::cholesky_lower;
use crate::types::{AnalysisError, ResponseCurve, ResponsePoint, Result};
use crate::var::FittedVar;

/// Responses for steps `0..=horizon`, indexed `[step, response, impulse]`.
#[derive(Clone, Debug)]
pub struct ImpulseResponse {
    names: Vec<String>,
    horizon: usize,
    ma: Array3<f64>,
    orth: Array3<f64>,
}

/// Moving-average and orthogonalized impulse responses of `model`.
///
/// The MA coefficients follow `Φ_0 = I`, `Φ_i = Σ_{j=1}^{min(i,p)} Φ_{i-j} A_j`.
/// Orthogonalized responses are `Θ_i = Φ_i P` with `P` the lower Cholesky
/// factor of `sigma_u`, so the variable order of the model fixes the
/// identification: a shock to variable `j` has no contemporaneous effect on
/// variables ordered before it.
///
/// # Errors
/// Returns `AnalysisError::SingularCovariance` if `sigma_u` is not positive
/// definite.
pub fn impulse_responses(model: &FittedVar, horizon: usize) -> Result<ImpulseResponse> {
    let k = model.neqs();
    let p = cholesky_lower(model.sigma_u())?;

    let mut phis: Vec<Array2<f64>> = Vec::with_capacity(horizon + 1);
    phis.push(Array2::eye(k));
    for i in 1..=horizon {
        let mut phi = Array2::<f64>::zeros((k, k));
        for (j, a) in model.coefs().iter().enumerate().take(i) {
            phi += &phis[i - j - 1].dot(a);
        }
        phis.push(phi);
    }

    let thetas: Vec<Array2<f64>> = phis.iter().map(|phi| phi.dot(&p)).collect();

    Ok(ImpulseResponse {
        names: model.names().to_vec(),
        horizon,
        ma: stack(&phis, k),
        orth: stack(&thetas, k),
    })
}

fn stack(mats: &[Array2<f64>], k: usize) -> Array3<f64> {
    Array3::from_shape_fn((mats.len(), k, k), |(h, i, j)| mats[h][[i, j]])
}

impl ImpulseResponse {
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Non-orthogonalized MA coefficients `Φ_0..Φ_H`.
    pub fn ma_coefficients(&self) -> &Array3<f64> {
        &self.ma
    }

    pub fn orth_irfs(&self) -> &Array3<f64> {
        &self.orth
    }

    /// Orthogonalized response of `response` to a one standard deviation
    /// shock in `impulse`, one point per step.
    ///
    /// # Errors
    /// `MissingColumn` if either name is not a model variable.
    pub fn response_path(&self, impulse: &str, response: &str) -> Result<Vec<ResponsePoint>> {
        let j = self.index_of(impulse)?;
        let i = self.index_of(response)?;
        Ok((0..=self.horizon)
            .map(|step| ResponsePoint {
                step,
                value: self.orth[[step, i, j]],
            })
            .collect())
    }

    pub fn response_curve(&self, impulse: &str, response: &str) -> Result<ResponseCurve> {
        Ok(ResponseCurve {
            impulse: impulse.to_string(),
            response: response.to_string(),
            points: self.response_path(impulse, response)?,
        })
    }

    /// Response of LAYOFFS to each of `impulses`, in the order given.
    pub fn layoff_responses<S: AsRef<str>>(&self, impulses: &[S]) -> Result<Vec<ResponseCurve>> {
        impulses
            .iter()
            .map(|impulse| self.response_curve(impulse.as_ref(), LAYOFFS))
            .collect()
    }

    fn index_of(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| AnalysisError::MissingColumn {
                column: name.to_string(),
                available: self.names.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{FEDFUNDS, INFLATION, UNCERTAINTY, VAR_ORDERING};
    use crate::timeseries::VarPanel;
    use crate::var::VarModel;
    use approx::assert_relative_eq;
    use chrono::{Months, NaiveDate};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn simulated_panel(n: usize, seed: u64) -> VarPanel {
        let k = VAR_ORDERING.len();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut data = Array2::<f64>::zeros((n, k));
        for t in 1..n {
            for i in 0..k {
                let own = 0.4 * data[[t - 1, i]];
                let spill = if i > 0 { 0.2 * data[[t - 1, i - 1]] } else { 0.0 };
                data[[t, i]] = own + spill + rng.gen_range(-1.0..1.0);
            }
        }
        let start = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        VarPanel {
            dates: (0..n).map(|i| start + Months::new(i as u32)).collect(),
            names: VAR_ORDERING.iter().map(|s| s.to_string()).collect(),
            data,
        }
    }

    fn fitted(lags: usize) -> FittedVar {
        VarModel::new(&simulated_panel(240, 17))
            .unwrap()
            .fit(lags)
            .unwrap()
    }

    #[test]
    fn test_step_zero_is_cholesky_factor() {
        let model = fitted(2);
        let irf = impulse_responses(&model, 20).unwrap();
        let p = cholesky_lower(model.sigma_u()).unwrap();

        assert_eq!(irf.orth_irfs().dim(), (21, 5, 5));
        for i in 0..5 {
            for j in 0..5 {
                assert_relative_eq!(irf.orth_irfs()[[0, i, j]], p[[i, j]], epsilon = 1e-12);
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_eq!(irf.ma_coefficients()[[0, i, j]], expected);
            }
        }
    }

    #[test]
    fn test_var1_responses_are_matrix_powers() {
        let model = fitted(1);
        let irf = impulse_responses(&model, 3).unwrap();
        let a = &model.coefs()[0];
        let p = cholesky_lower(model.sigma_u()).unwrap();
        let a3p = a.dot(a).dot(a).dot(&p);

        for i in 0..5 {
            for j in 0..5 {
                assert_relative_eq!(irf.ma_coefficients()[[1, i, j]], a[[i, j]], epsilon = 1e-12);
                assert_relative_eq!(irf.orth_irfs()[[3, i, j]], a3p[[i, j]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_var2_recursion() {
        let model = fitted(2);
        let irf = impulse_responses(&model, 2).unwrap();
        let (a1, a2) = (&model.coefs()[0], &model.coefs()[1]);
        let phi2 = a1.dot(a1) + a2;
        for i in 0..5 {
            for j in 0..5 {
                assert_relative_eq!(irf.ma_coefficients()[[2, i, j]], phi2[[i, j]], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_last_variable_has_no_contemporaneous_spillover() {
        let irf = impulse_responses(&fitted(1), 20).unwrap();
        // LAYOFFS is ordered last, so its shock only moves itself at step 0.
        for name in [INFLATION, FEDFUNDS, UNCERTAINTY] {
            let path = irf.response_path(LAYOFFS, name).unwrap();
            assert_eq!(path[0].value, 0.0);
        }
        assert!(irf.response_path(LAYOFFS, LAYOFFS).unwrap()[0].value > 0.0);
    }

    #[test]
    fn test_layoff_responses_cover_horizon() {
        let irf = impulse_responses(&fitted(2), 20).unwrap();
        let impulses = [INFLATION, FEDFUNDS];
        let curves = irf.layoff_responses(&impulses).unwrap();

        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0].impulse, INFLATION);
        assert_eq!(curves[1].response, LAYOFFS);
        let steps: Vec<usize> = curves[0].points.iter().map(|p| p.step).collect();
        assert_eq!(steps, (0..=20).collect::<Vec<_>>());
    }

    #[test]
    fn test_model_is_not_mutated() {
        let model = fitted(1);
        let before = model.coefs()[0].clone();
        let _ = impulse_responses(&model, 10).unwrap();
        assert_eq!(model.coefs()[0], before);
    }

    #[test]
    fn test_unknown_variable() {
        let irf = impulse_responses(&fitted(1), 5).unwrap();
        assert!(matches!(
            irf.response_path("GDP", LAYOFFS),
            Err(AnalysisError::MissingColumn { .. })
        ));
    }
}
