// src/main.rs
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use anyhow::{bail, Context, Result};
use clap::Parser;
use neuroclean::engine::AnalysisOutput;
use neuroclean::recorder;
use neuroclean::signal::CsvSource;
use neuroclean::{spawn_thread, AnalysisMessage, AnalysisRequest, CancellationToken, Method, PipelineConfig};
#[derive(Parser)]
#[command(
    name = "neuroclean",
    version,
    about = "Clean an EEG recording with Traditional ICA and/or GEDAI and score the result"
)]
struct Cli {
    /// Recording in CSV layout: optional Timestamp column, then one column per channel
    input: PathBuf,
    #[arg(long, value_enum, default_value_t = Method::Both)]
    method: Method,
    /// Sample rate in Hz; inferred from the Timestamp column when omitted
    #[arg(long)]
    sample_rate: Option<f64>,
    /// Multiplier from file units to volts
    #[arg(long, default_value_t = 1e-6)]
    scale: f64,
    /// JSON pipeline configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write one cleaned CSV per strategy here
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Print the metric summary as JSON instead of the text report
    #[arg(long)]
    json: bool,
}
fn main() -> ExitCode {
    env_logger::init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err:#}");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
fn run(cli: Cli) -> Result<()> {
    if !(cli.scale.is_finite() && cli.scale > 0.0) {
        bail!("--scale must be a positive number, got {}", cli.scale);
    }
    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let mut source = CsvSource::new(&cli.input).with_scale(cli.scale);
    if let Some(rate) = cli.sample_rate {
        source = source.with_sample_rate(rate);
    }
    let request = AnalysisRequest::new(source, cli.method).with_config(config);
    let (tx, rx) = mpsc::channel();
    let worker = spawn_thread(request, tx, CancellationToken::new());
    let mut output = None;
    for message in rx {
        match message {
            AnalysisMessage::Progress { percent, message } => log::info!("[{percent:3}%] {message}"),
            AnalysisMessage::Finished(done) => output = Some(done),
            AnalysisMessage::Failed(err) => bail!("analysis of {} failed: {err}", cli.input.display()),
            AnalysisMessage::Cancelled(_) => bail!("analysis cancelled"),
        }
    }
    if worker.join().is_err() {
        bail!("analysis worker panicked");
    }
    let output = output.context("analysis worker exited without a result")?;
    if cli.json {
        let summary = serde_json::to_string_pretty(&output.summary())
            .context("failed to serialise metric summary")?;
        println!("{summary}");
    } else {
        println!("{}", output.report());
    }
    if let Some(dir) = &cli.output_dir {
        export_cleaned(&output, dir, cli.scale)?;
    }
    Ok(())
}
fn export_cleaned(output: &AnalysisOutput, dir: &Path, scale: f64) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for (strategy, outcome) in &output.outcomes {
        let path = dir.join(format!("cleaned_{}.csv", strategy.key()));
        recorder::write_csv(&outcome.result.cleaned, &path, 1.0 / scale)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
