//! AxesLab CLI: drift and pattern-quality metrics over CSV tables.
//!
//! Commands:
//! - `run-axes`: axes vector of one table
//! - `run-retention`: classifier retention from a base to a shifted table
//! - `run-full`: axes plus optional retention, with run metadata
//! - `profile`: per-column summary and fingerprint of one table
//! - `shift`: synthetically shifted copy of a table
//! - `assert-thresholds`: check a report against a threshold profile
//! - `validate-schema`: check the shape of an axes report
//!
//! `assert-thresholds` and `validate-schema` exit with 0 on success, 1 on a
//! violation and 2 when an input cannot be read or parsed.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use axeslab_core::Metric;
use axeslab_runner::{
    run_axes_job, run_full_job, run_profile_job, run_retention_job, run_schema_job, run_shift_job,
    run_threshold_job, shift_features, AxesJob, AxesVector, DatasetProfile, EngineConfig, FullJob,
    ProfileJob, RetentionJob, RetentionReport, ShiftJob, ThresholdJob, ThresholdOutcome,
};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

#[derive(Parser)]
#[command(
    name = "axeslab",
    version,
    about = "AxesLab CLI: dataset drift and pattern-quality metrics"
)]
struct Cli {
    /// Log verbosity; logs go to stderr.
    #[arg(long, value_enum, default_value_t = LogLevel::Warn, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the axes vector of one CSV table.
    RunAxes {
        /// Input CSV with a header row.
        #[arg(long)]
        input: PathBuf,

        /// Output JSON path.
        #[arg(long)]
        out: PathBuf,

        /// Target column. Defaults to the last column.
        #[arg(long)]
        feature_col: Option<String>,

        /// Time column. Defaults to the first column.
        #[arg(long)]
        time_col: Option<String>,

        /// Minimum complete rows for the density metrics.
        #[arg(long)]
        min_samples: Option<usize>,

        /// Engine config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Evaluate classifier retention between a base and a shifted table.
    RunRetention {
        /// Base CSV; the last column is the class label.
        #[arg(long)]
        base: PathBuf,

        /// Shifted CSV with the same layout.
        #[arg(long)]
        shifted: PathBuf,

        /// Output JSON path.
        #[arg(long)]
        out: PathBuf,

        /// Minimum rows in each table.
        #[arg(long)]
        min_samples: Option<usize>,

        /// Engine config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Axes vector plus optional retention, with run metadata.
    RunFull {
        /// Input CSV with a header row.
        #[arg(long)]
        input: PathBuf,

        /// Shifted CSV; retention runs only when given.
        #[arg(long)]
        shifted: Option<PathBuf>,

        /// Output JSON path.
        #[arg(long)]
        out: PathBuf,

        /// Target column. Defaults to the last column.
        #[arg(long)]
        feature_col: Option<String>,

        /// Time column. Defaults to the first column.
        #[arg(long)]
        time_col: Option<String>,

        /// Minimum rows in each table for retention.
        #[arg(long)]
        min_samples: Option<usize>,

        /// Skip retention even when --shifted is given.
        #[arg(long, default_value_t = false)]
        no_retention: bool,

        /// Engine config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Summarise the columns of one CSV table.
    Profile {
        /// Input CSV with a header row.
        #[arg(long)]
        input: PathBuf,

        /// Output JSON path.
        #[arg(long)]
        out: PathBuf,
    },
    /// Write a copy of a table with mean-shifted, rescaled and noised features.
    Shift {
        /// Input CSV with a header row.
        #[arg(long)]
        input: PathBuf,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        /// Noise seed. Defaults to the config's `[shift] seed`.
        #[arg(long)]
        seed: Option<u64>,

        /// Engine config TOML.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Check a metrics report against a threshold profile (TOML or JSON).
    AssertThresholds {
        /// Report JSON written by run-axes, run-retention or run-full.
        #[arg(long)]
        metrics: PathBuf,

        /// Threshold profile; `.toml` files are TOML, others JSON.
        #[arg(long)]
        profile: PathBuf,

        /// Treat `warn_above` breaches as failures.
        #[arg(long, default_value_t = false)]
        fail_on_warn: bool,
    },
    /// Check that a report has every axes key with a numeric or null value.
    ValidateSchema {
        /// Report JSON written by run-axes or run-full.
        #[arg(long)]
        file: PathBuf,
    },
}

/// Exit code for unreadable or malformed inputs of the check commands.
const EXIT_INPUT_ERROR: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(Level::from(cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::RunAxes {
            input,
            out,
            feature_col,
            time_col,
            min_samples,
            config,
        } => {
            let mut engine = load_config(config)?;
            if let Some(n) = min_samples {
                engine.density.min_samples = n;
            }
            engine.validate().context("invalid --min-samples")?;
            let job = AxesJob {
                input,
                out,
                feature_col,
                time_col,
            };
            let axes = run_axes_job(&job, &engine)?;
            print_axes(&axes);
            println!("Report saved to: {}", job.out.display());
        }
        Commands::RunRetention {
            base,
            shifted,
            out,
            min_samples,
            config,
        } => {
            let mut engine = load_config(config)?;
            if let Some(n) = min_samples {
                engine.retention.min_rows = n;
            }
            engine.validate().context("invalid --min-samples")?;
            let job = RetentionJob { base, shifted, out };
            let report = run_retention_job(&job, &engine)?;
            print_retention(&report);
            println!("Report saved to: {}", job.out.display());
        }
        Commands::RunFull {
            input,
            shifted,
            out,
            feature_col,
            time_col,
            min_samples,
            no_retention,
            config,
        } => {
            let mut engine = load_config(config)?;
            if let Some(n) = min_samples {
                engine.retention.min_rows = n;
            }
            engine.validate().context("invalid --min-samples")?;
            let job = FullJob {
                input,
                shifted,
                out,
                feature_col,
                time_col,
                retention: !no_retention,
            };
            let report = run_full_job(&job, &engine)?;
            println!();
            println!("=== Run ===");
            println!("Base samples:    {}", report.metadata.base_samples);
            println!("Feature column:  {}", report.metadata.feature_column);
            println!("Time column:     {}", report.metadata.time_column);
            print_axes(&report.axes_metrics);
            match &report.retention_metrics {
                Some(retention) => print_retention(retention),
                None => {
                    println!();
                    println!("Retention: skipped");
                }
            }
            println!("Report saved to: {}", job.out.display());
        }
        Commands::Profile { input, out } => {
            let job = ProfileJob { input, out };
            let profile = run_profile_job(&job)?;
            print_profile(&profile);
            println!("Report saved to: {}", job.out.display());
        }
        Commands::Shift {
            input,
            out,
            seed,
            config,
        } => {
            let mut engine = load_config(config)?;
            if let Some(seed) = seed {
                engine.shift.seed = seed;
            }
            let job = ShiftJob { input, out };
            let shifted = run_shift_job(&job, &engine)?;
            println!();
            println!("=== Shift ===");
            println!("Rows:     {}", shifted.n_rows());
            println!("Shifted:  {}", shift_features(&shifted).join(", "));
            println!("Shifted dataset written to: {}", job.out.display());
        }
        Commands::AssertThresholds {
            metrics,
            profile,
            fail_on_warn,
        } => {
            let job = ThresholdJob {
                metrics,
                profile,
                fail_on_warn,
            };
            return Ok(match run_threshold_job(&job) {
                Ok(outcome) => {
                    print_thresholds(&outcome);
                    ExitCode::from(outcome.exit_code())
                }
                Err(e) => {
                    eprintln!("[ERROR] {e:#}");
                    ExitCode::from(EXIT_INPUT_ERROR)
                }
            });
        }
        Commands::ValidateSchema { file } => {
            return Ok(match run_schema_job(&file) {
                Ok(violations) if violations.is_empty() => {
                    println!("[RESULT] Schema validation PASSED");
                    ExitCode::SUCCESS
                }
                Ok(violations) => {
                    for v in &violations {
                        eprintln!("[ERROR] {v}");
                    }
                    eprintln!("[RESULT] Schema validation FAILED");
                    ExitCode::FAILURE
                }
                Err(e) => {
                    eprintln!("[ERROR] {e:#}");
                    ExitCode::from(EXIT_INPUT_ERROR)
                }
            });
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Defaults, or the given TOML file. Flag overrides are applied by the caller.
fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn print_metric(name: &str, metric: &Metric) {
    println!("{name:<28}{metric}");
}

fn print_axes(axes: &AxesVector) {
    println!();
    println!("=== Axes Metrics ===");
    for (name, metric) in axes.metrics() {
        print_metric(name, metric);
    }
    match axes.density_k {
        Some(k) => println!("{:<28}{k}", "density_k"),
        None => println!("{:<28}not available", "density_k"),
    }
}

fn print_retention(report: &RetentionReport) {
    println!();
    println!("=== Retention ===");
    for (name, metric) in report.metrics() {
        print_metric(name, metric);
    }
    if let Some(features) = &report.shift_intensity_features {
        println!();
        println!("--- Most shifted features ---");
        for f in features {
            println!(
                "{:<28}ks={:.4}  p={:.2e}  mean_diff={:+.4}",
                f.feature, f.ks_stat, f.ks_p_value, f.mean_diff
            );
        }
    }
    if let Some(note) = &report.note {
        println!("NOTE: {note}");
    }
}

fn print_thresholds(outcome: &ThresholdOutcome) {
    for finding in &outcome.findings {
        println!("[{}] {}", finding.severity, finding.message);
    }
    if outcome.passed() {
        println!(
            "[RESULT] Threshold assertions PASSED (warnings={})",
            outcome.warnings()
        );
    } else {
        eprintln!("[RESULT] Threshold assertions FAILED");
    }
}

fn print_profile(profile: &DatasetProfile) {
    println!();
    println!("=== Profile ===");
    println!("Rows:        {}", profile.rows);
    println!("Columns:     {}", profile.columns);
    println!("Fingerprint: {}", profile.fingerprint);
    println!();
    for col in &profile.column_profiles {
        let kind = format!("{:?}", col.kind).to_lowercase();
        match &col.summary {
            Some(s) => println!(
                "{:<20}{kind:<10}nulls={:.2}%  mean={:.4}  std={:.4}  min={:.4}  max={:.4}",
                col.name,
                col.null_fraction * 100.0,
                s.mean,
                s.std,
                s.min,
                s.max
            ),
            None => println!(
                "{:<20}{kind:<10}nulls={:.2}%",
                col.name,
                col.null_fraction * 100.0
            ),
        }
    }
}
