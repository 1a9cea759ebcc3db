//! End-to-end entry points for the regression and VAR paths.

use std::path::PathBuf;

use tracing::info;

use crate::adf::stationarity_report;
use crate::data::{load_table, Table};
use crate::defaults::VAR_ORDERING;
use crate::features::build_design;
use crate::irf::{impulse_responses, ImpulseResponse};
use crate::ols::fit_ols;
use crate::timeseries::{difference_variables, prepare_raw_data};
use crate::types::{
    AdfReport, AnalysisConfig, AnalysisError, EquationStats, FeatureSpec, LagCriteria, PValueRow,
    RegressionResult, ResponseCurve, Result,
};
use crate::var::{select_and_fit, FittedVar, VarModel};

/// Locations of the two input CSV files.
#[derive(Clone, Debug)]
pub struct InputPaths {
    /// Company-level layoffs table with funding and indicator columns.
    pub companies: PathBuf,
    /// Monthly macro table keyed by `observation_date`.
    pub macro_data: PathBuf,
}

/// Raw tables as loaded from disk.
#[derive(Clone, Debug)]
pub struct Inputs {
    pub companies: Table,
    pub macro_table: Table,
}

/// Load both input tables.
///
/// # Errors
/// Propagates `Io` / `Csv` errors carrying the offending path.
pub fn load_inputs(paths: &InputPaths) -> Result<Inputs> {
    let companies = load_table(&paths.companies)?;
    let macro_table = load_table(&paths.macro_data)?;
    info!(
        companies = companies.nrows(),
        macro_rows = macro_table.nrows(),
        "loaded inputs"
    );
    Ok(Inputs {
        companies,
        macro_table,
    })
}

/// Output of the time-series path.
#[derive(Clone, Debug)]
pub struct VarAnalysis {
    pub stationarity: Vec<AdfReport>,
    pub lag_table: Vec<LagCriteria>,
    pub fit_calls: usize,
    pub model: FittedVar,
    pub equation_stats: Vec<EquationStats>,
    pub irf: ImpulseResponse,
    /// LAYOFFS response to each configured impulse.
    pub layoff_responses: Vec<ResponseCurve>,
}

impl VarAnalysis {
    pub fn selected_lag(&self) -> usize {
        self.model.lag_order()
    }
}

/// Everything produced by one analysis run.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    pub regression: RegressionResult,
    /// Predictors with p < 0.05.
    pub significant: Vec<PValueRow>,
    /// Predictors with p > 0.05.
    pub non_significant: Vec<PValueRow>,
    pub var: VarAnalysis,
}

/// Cross-sectional path: feature construction then OLS.
pub fn run_regression(companies: &Table, spec: &FeatureSpec) -> Result<RegressionResult> {
    let design = build_design(companies, spec)?;
    let fit = fit_ols(&design)?;
    info!(
        n_obs = fit.n_obs,
        predictors = fit.coefficients.len(),
        r2 = fit.r2,
        adj_r2 = fit.adj_r2,
        "fitted cross-sectional regression"
    );
    Ok(fit)
}

/// Time-series path: panel preparation, stationarity diagnostics, lag
/// selection, final VAR and impulse responses.
///
/// The stationarity reports are diagnostic only; the differenced variable
/// set is fixed regardless of their verdicts.
pub fn run_var_analysis(macro_table: &Table, config: &AnalysisConfig) -> Result<VarAnalysis> {
    validate_config(config)?;

    let raw = prepare_raw_data(macro_table)?;
    let panel = difference_variables(&raw)?;
    let stationarity = stationarity_report(&raw, &panel)?;
    for report in &stationarity {
        info!(
            variable = %report.variable,
            differenced = report.differenced,
            p_value = report.result.p_value,
            verdict = %report.verdict,
            "stationarity check"
        );
    }

    let model = VarModel::new(&panel)?;
    let selection = select_and_fit(&model, config.maxlags)?;
    let irf = impulse_responses(&selection.model, config.irf_horizon)?;
    let layoff_responses = irf.layoff_responses(&config.irf_impulses)?;
    let equation_stats = selection.model.equation_stats();

    info!(
        nobs = panel.nobs(),
        selected_lag = selection.selected_lag,
        horizon = config.irf_horizon,
        "completed VAR analysis"
    );

    Ok(VarAnalysis {
        stationarity,
        lag_table: selection.table,
        fit_calls: selection.fit_calls,
        model: selection.model,
        equation_stats,
        irf,
        layoff_responses,
    })
}

/// Run both independent paths over the loaded inputs.
///
/// # Errors
/// The first error from either path; the inputs are never modified.
pub fn run_analysis(inputs: &Inputs, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let regression = run_regression(&inputs.companies, &config.features)?;
    let significant = regression.significant();
    let non_significant = regression.non_significant();
    let var = run_var_analysis(&inputs.macro_table, config)?;

    Ok(AnalysisReport {
        regression,
        significant,
        non_significant,
        var,
    })
}

fn validate_config(config: &AnalysisConfig) -> Result<()> {
    if config.maxlags == 0 {
        return Err(AnalysisError::InvalidConfig(
            "maxlags must be at least 1".to_string(),
        ));
    }
    if let Some(unknown) = config
        .irf_impulses
        .iter()
        .find(|name| !VAR_ORDERING.contains(&name.as_str()))
    {
        return Err(AnalysisError::InvalidConfig(format!(
            "impulse {unknown:?} is not a VAR variable (expected one of {VAR_ORDERING:?})"
        )));
    }
    Ok(())
}
