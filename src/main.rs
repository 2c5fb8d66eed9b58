use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::time::Duration;

mod batch;
mod config;
mod error;
mod metrics;
mod provider;
mod report;
mod runner;
mod sse;
mod timer;

use batch::BatchComparator;
use config::{BatchFile, CliArgs, Command, TargetConfig};
use metrics::aggregate;
use report::{BatchResult, BenchmarkReport, RankBy, ReportOutcome};
use runner::RunExecutor;
use timer::StreamTimer;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = CliArgs::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    // One client for the whole invocation; per-run deadlines are
    // enforced by the timer, so no global request timeout here.
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("failed to construct HTTP client")?;
    let timer = StreamTimer::new(client);

    match args.command {
        Command::Single {
            api_url,
            api_key,
            model,
            prompt,
            runs,
            timeout_secs,
            api_type,
            output,
        } => {
            let target = TargetConfig {
                name: model.clone(),
                endpoint: api_url,
                api_key,
                model,
                prompt,
                runs,
                timeout_secs,
                provider: api_type,
            };
            run_single(timer, target, output.as_deref()).await
        }
        Command::Batch { config, rank_by } => run_batch(timer, &config, rank_by).await,
    }
}

async fn run_single(
    timer: StreamTimer,
    target: TargetConfig,
    output: Option<&Path>,
) -> Result<()> {
    target.validate().context("invalid target")?;

    tracing::info!(
        "benchmarking {} at {} ({} runs, prompt of {} chars)",
        target.model,
        target.endpoint,
        target.runs,
        target.prompt.chars().count()
    );

    let executor = RunExecutor::new(timer);
    let samples = executor.run(&target).await;

    let report = match aggregate(&samples) {
        Some(metrics) => BenchmarkReport::from_metrics(&target, metrics),
        None => {
            let summary = samples
                .iter()
                .filter_map(|s| s.error.as_ref())
                .map(|e| format!("{}: {}", e.kind, e.message))
                .next()
                .unwrap_or_else(|| "no runs executed".to_string());
            BenchmarkReport::failed(&target, summary)
        }
    };

    print_single_summary(&report);

    if let Some(path) = output {
        std::fs::write(path, report.to_json())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Result written to {}", path.display());
    }

    match &report.outcome {
        ReportOutcome::Metrics(_) => Ok(()),
        ReportOutcome::Failed { error_summary } => {
            anyhow::bail!("benchmark failed: {}", error_summary)
        }
    }
}

fn print_single_summary(report: &BenchmarkReport) {
    println!("\n=== Benchmark Summary ===");
    println!("Model:    {}", report.model);
    println!("Endpoint: {}", report.endpoint);
    match &report.outcome {
        ReportOutcome::Metrics(m) => {
            println!(
                "TTFT:       {:.3}s (min={:.3}, p90={:.3})",
                m.mean_ttft_secs, m.ttft_stats.min, m.ttft_stats.p90
            );
            println!(
                "Throughput: {:.2} units/s (min={:.2}, p90={:.2})",
                m.mean_throughput, m.throughput_stats.min, m.throughput_stats.p90
            );
            println!(
                "Runs:       {} ok, {} failed",
                m.successful_runs, m.failed_runs
            );
        }
        ReportOutcome::Failed { error_summary } => {
            println!("FAILED:   {}", error_summary);
        }
    }
}

async fn run_batch(timer: StreamTimer, config_path: &Path, rank_by: RankBy) -> Result<()> {
    let file = BatchFile::load(config_path)?;
    let targets = file.targets();

    let comparator = BatchComparator::new(timer);
    let result = comparator.run(&targets).await?;

    print!("\n{}", result.render_table(rank_by));

    write_batch_artifacts(&result, &file, rank_by)?;
    Ok(())
}

/// Persist per-target JSON results and the Markdown comparison report
fn write_batch_artifacts(result: &BatchResult, file: &BatchFile, rank_by: RankBy) -> Result<()> {
    let out_dir = &file.general.output_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    for report in &result.reports {
        let filename = format!(
            "{}_{}.json",
            slugify(&report.name),
            report.timestamp.timestamp()
        );
        let path = out_dir.join(filename);
        std::fs::write(&path, report.to_json())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("result written to {}", path.display());
    }

    let report_path = out_dir.join(&file.general.report_file);
    std::fs::write(&report_path, result.render_markdown(rank_by))
        .with_context(|| format!("failed to write {}", report_path.display()))?;
    println!("Comparison report written to {}", report_path.display());

    Ok(())
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}
