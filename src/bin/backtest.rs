use anyhow::{Context, Result};

use fixture_forecast::calibration::{BacktestReport, CalibrationBin, walk_forward};
use fixture_forecast::logging::init_tracing;
use fixture_forecast::{DataPaths, EngineConfig, PredictionEngine};

const DEFAULT_LAST_N: usize = 200;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing()?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let json = args.iter().any(|a| a == "--json");
    let last_n = parse_last_arg(&args)?.unwrap_or(DEFAULT_LAST_N);

    let paths = DataPaths::from_env();
    let engine = PredictionEngine::from_paths(&paths, EngineConfig::from_env())?;
    let report = walk_forward(
        engine.repository(),
        engine.priors(),
        engine.config(),
        last_n,
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn parse_last_arg(args: &[String]) -> Result<Option<usize>> {
    for (idx, arg) in args.iter().enumerate() {
        let value = if let Some(v) = arg.strip_prefix("--last=") {
            Some(v)
        } else if arg == "--last" {
            args.get(idx + 1).map(String::as_str)
        } else {
            None
        };
        if let Some(v) = value {
            let n = v
                .trim()
                .parse::<usize>()
                .with_context(|| format!("invalid --last value '{v}'"))?;
            return Ok(Some(n));
        }
    }
    Ok(None)
}

fn print_report(report: &BacktestReport) {
    let m = &report.metrics;
    let b = &report.baseline;
    println!("Walk-forward backtest");
    println!("Evaluated: {} (skipped {})", m.samples, report.skipped);
    println!("Brier:    {:.4}  (base rate {:.4})", m.brier, b.brier);
    println!("Log-loss: {:.4}  (base rate {:.4})", m.log_loss, b.log_loss);
    println!("Accuracy: {:.1}%  (base rate {:.1}%)", m.accuracy * 100.0, b.accuracy * 100.0);
    print_bins("home", &report.home_bins);
    print_bins("draw", &report.draw_bins);
    print_bins("away", &report.away_bins);
}

fn print_bins(label: &str, bins: &[CalibrationBin]) {
    println!("Calibration ({label}):");
    for bin in bins.iter().filter(|b| b.count > 0) {
        println!(
            "  {:.1}-{:.1}  n={:<4} predicted {:.3}  actual {:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
}
