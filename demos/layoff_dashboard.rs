//! Full analysis run on synthetic layoffs and macro data.
//!
//! Generates a company table and a monthly macro panel, runs both the
//! cross-sectional regression and the VAR path, prints the summary tables and
//! writes the lag-selection table and the LAYOFFS impulse responses to
//! timestamped CSV files.
//!
//! Pass two CSV paths (companies, macro) to analyse real files instead.
//!
//! Run with: RUST_LOG=info cargo run --release --example layoff_dashboard

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

use chrono::Local;
use layoff_macro::{
    load_inputs, names, read_table, run_analysis, AnalysisConfig, AnalysisReport, InputPaths,
    Inputs,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Serialize)]
struct ResponseRow<'a> {
    impulse: &'a str,
    response: &'a str,
    step: usize,
    value: f64,
}

fn synthetic_companies(rows: usize, rng: &mut StdRng) -> String {
    let mut s = String::from(
        "Company,$ Raised (mm),Stage_Seed,Stage_Series B,Stage_Post-IPO,Industry_Retail,Industry_Finance,DFF,USEPUINDXD,# Laid Off\n",
    );
    for i in 0..rows {
        let funding: f64 = rng.gen_range(5.0..2_000.0);
        let stage = rng.gen_range(0..4);
        let retail = rng.gen_bool(0.2) as u8;
        let finance = rng.gen_bool(0.25) as u8;
        let post_ipo = if stage == 2 { 60.0 } else { 0.0 };
        let laid_off = 30.0 + 0.12 * funding - 2.0e-5 * funding * funding
            + post_ipo
            + 15.0 * finance as f64
            + rng.gen_range(-40.0..40.0);
        let funding_cell = if rng.gen_bool(0.08) {
            String::new()
        } else {
            format!("{funding:.1}")
        };
        s.push_str(&format!(
            "company_{i},{funding_cell},{},{},{},{retail},{finance},{:.2},{:.1},{:.0}\n",
            (stage == 0) as u8,
            (stage == 1) as u8,
            (stage == 2) as u8,
            rng.gen_range(0.05..5.5),
            rng.gen_range(40.0..400.0),
            laid_off.max(1.0),
        ));
    }
    s
}

fn synthetic_macro(months: usize, rng: &mut StdRng) -> String {
    let mut s = String::from(
        "observation_date,FEDFUNDS,CORESTICKM159SFRBATL,INDPRO,UNCERTAINTY,LAYOFFS\n",
    );
    let (mut fed, mut cpi, mut indpro, mut unc, mut lay) : (f64, f64, f64, f64, f64) = (1.5, 180.0, 90.0, 110.0, 1_700.0);
    for i in 0..months {
        let prev_fed = fed;
        fed = (0.1 + 0.95 * fed + rng.gen_range(-0.2..0.2)).max(0.05);
        cpi += 0.18 + 0.05 * (fed - prev_fed) + rng.gen_range(-0.08..0.08);
        indpro += 0.1 - 0.2 * (fed - prev_fed) + rng.gen_range(-0.7..0.7);
        unc = 25.0 + 0.78 * unc + rng.gen_range(-18.0..18.0);
        lay = 500.0 + 0.7 * lay + 2.0 * (unc - 115.0) + 40.0 * (fed - 1.5)
            + rng.gen_range(-120.0..120.0);
        s.push_str(&format!(
            "{:02}/01/{},{fed:.2},{cpi:.3},{indpro:.3},{unc:.2},{lay:.0}\n",
            1 + i % 12,
            2000 + i / 12,
        ));
    }
    s
}

fn load(args: &[String]) -> Result<Inputs, Box<dyn Error>> {
    if let [companies, macro_data] = args {
        return Ok(load_inputs(&InputPaths {
            companies: PathBuf::from(companies),
            macro_data: PathBuf::from(macro_data),
        })?);
    }
    let mut rng = StdRng::seed_from_u64(2023);
    Ok(Inputs {
        companies: read_table(synthetic_companies(400, &mut rng).as_bytes())?,
        macro_table: read_table(synthetic_macro(264, &mut rng).as_bytes())?,
    })
}

fn print_report(report: &AnalysisReport) {
    let reg = &report.regression;
    println!("=== Cross-sectional regression ===");
    println!(
        "n = {}  R² = {:.4}  adj. R² = {:.4}  RMSE = {:.3}",
        reg.n_obs, reg.r2, reg.adj_r2, reg.rmse
    );
    println!("{:<22} {:>12} {:>10} {:>8} {:>8}", "predictor", "coef", "std err", "t", "p");
    for c in &reg.coefficients {
        println!(
            "{:<22} {:>12.4} {:>10.4} {:>8.3} {:>8.4}",
            c.name, c.coef, c.std_error, c.t_stat, c.p_value
        );
    }
    println!("\nSignificant (p < 0.05):");
    for row in &report.significant {
        println!("  {:<22} {:.4}", row.predictor, row.p_value);
    }
    println!("Not significant (p > 0.05):");
    for row in &report.non_significant {
        println!("  {:<22} {:.4}", row.predictor, row.p_value);
    }

    let var = &report.var;
    println!("\n=== Stationarity (ADF) ===");
    for r in &var.stationarity {
        println!(
            "{:<22} stat {:>8.3}  p {:.4}  lag {:>2}  {}",
            r.variable, r.result.statistic, r.result.p_value, r.result.used_lag, r.verdict
        );
    }

    println!("\n=== VAR lag selection ===");
    println!("{:>4} {:>12} {:>12} {:>12}", "lag", "AIC", "HQIC", "BIC");
    for row in &var.lag_table {
        let marker = if row.lag == var.selected_lag() { " *" } else { "" };
        println!(
            "{:>4} {:>12.4} {:>12.4} {:>12.4}{marker}",
            row.lag, row.aic, row.hqic, row.bic
        );
    }
    println!("fits performed: {}", var.fit_calls);

    println!("\n=== VAR equations (lag {}) ===", var.selected_lag());
    for eq in &var.equation_stats {
        println!("{:<12} RMSE {:>10.4}  R² {:.4}", eq.equation, eq.rmse, eq.r2);
    }

    if let Some(eq) = var
        .model
        .coefficient_table()
        .into_iter()
        .find(|eq| eq.equation == names::LAYOFFS)
    {
        println!("\n=== LAYOFFS equation ===");
        println!("{:<24} {:>12} {:>10} {:>8}", "term", "coef", "std err", "p");
        for c in &eq.coefficients {
            println!(
                "{:<24} {:>12.4} {:>10.4} {:>8.4}",
                c.name, c.coef, c.std_error, c.p_value
            );
        }
    }

    println!("\n=== LAYOFFS impulse responses ===");
    for curve in &var.layoff_responses {
        let head: Vec<String> = curve
            .points
            .iter()
            .take(6)
            .map(|p| format!("{:.2}", p.value))
            .collect();
        println!("{:<12} -> {}", curve.impulse, head.join(", "));
    }
}

fn write_csvs(report: &AnalysisReport) -> Result<(), Box<dyn Error>> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let lag_path = format!("var_lag_selection_{timestamp}.csv");
    let mut wtr = csv::Writer::from_writer(File::create(&lag_path)?);
    for row in &report.var.lag_table {
        wtr.serialize(row)?;
    }
    wtr.flush()?;

    let irf_path = format!("layoff_irf_{timestamp}.csv");
    let mut wtr = csv::Writer::from_writer(File::create(&irf_path)?);
    for curve in &report.var.layoff_responses {
        for point in &curve.points {
            wtr.serialize(ResponseRow {
                impulse: &curve.impulse,
                response: &curve.response,
                step: point.step,
                value: point.value,
            })?;
        }
    }
    wtr.flush()?;

    let coef_path = format!("regression_coefficients_{timestamp}.csv");
    let mut wtr = csv::Writer::from_writer(File::create(&coef_path)?);
    for c in &report.regression.coefficients {
        wtr.serialize(c)?;
    }
    wtr.flush()?;

    println!("\nResults written to {lag_path}, {irf_path} and {coef_path}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let inputs = load(&args)?;
    let report = run_analysis(&inputs, &AnalysisConfig::default())?;

    print_report(&report);
    write_csvs(&report)?;
    Ok(())
}
