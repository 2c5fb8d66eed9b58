//! Benchmark reports, ranking, and comparison rendering.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::config::TargetConfig;
use crate::metrics::{AggregateMetrics, Stats};

/// Ranking criterion for the comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    /// Mean throughput, descending (ties broken by lower latency)
    #[default]
    Throughput,
    /// Mean time-to-first-unit, ascending
    Latency,
}

impl std::fmt::Display for RankBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankBy::Throughput => write!(f, "throughput"),
            RankBy::Latency => write!(f, "latency"),
        }
    }
}

/// Either the target's metrics or its failure marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportOutcome {
    Metrics(AggregateMetrics),
    Failed { error_summary: String },
}

/// The atomic unit of output: one target, one batch invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub name: String,
    pub model: String,
    pub endpoint: String,
    pub timestamp: DateTime<Utc>,
    /// Prompt length in characters
    pub prompt_length: usize,
    pub run_count: u32,
    pub outcome: ReportOutcome,
}

impl BenchmarkReport {
    pub fn from_metrics(target: &TargetConfig, metrics: AggregateMetrics) -> Self {
        Self::assemble(target, ReportOutcome::Metrics(metrics))
    }

    pub fn failed(target: &TargetConfig, error_summary: String) -> Self {
        Self::assemble(target, ReportOutcome::Failed { error_summary })
    }

    fn assemble(target: &TargetConfig, outcome: ReportOutcome) -> Self {
        Self {
            name: target.name.clone(),
            model: target.model.clone(),
            endpoint: target.endpoint.clone(),
            timestamp: Utc::now(),
            prompt_length: target.prompt.chars().count(),
            run_count: target.runs,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ReportOutcome::Metrics(_))
    }

    pub fn metrics(&self) -> Option<&AggregateMetrics> {
        match &self.outcome {
            ReportOutcome::Metrics(m) => Some(m),
            ReportOutcome::Failed { .. } => None,
        }
    }

    /// Export the report as pretty JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Ordered reports for one batch invocation, configuration order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub reports: Vec<BenchmarkReport>,
}

impl BatchResult {
    pub fn new(reports: Vec<BenchmarkReport>) -> Self {
        Self { reports }
    }

    /// Ranked view for rendering: successful reports sorted by the
    /// criterion, fully-failed targets appended in original order.
    pub fn ranked(&self, rank_by: RankBy) -> Vec<&BenchmarkReport> {
        let mut successful: Vec<&BenchmarkReport> =
            self.reports.iter().filter(|r| r.is_success()).collect();

        successful.sort_by(|a, b| {
            let (ma, mb) = (a.metrics().unwrap(), b.metrics().unwrap());
            let ord = match rank_by {
                RankBy::Throughput => mb
                    .mean_throughput
                    .partial_cmp(&ma.mean_throughput)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(
                        ma.mean_ttft_secs
                            .partial_cmp(&mb.mean_ttft_secs)
                            .unwrap_or(std::cmp::Ordering::Equal),
                    ),
                RankBy::Latency => ma
                    .mean_ttft_secs
                    .partial_cmp(&mb.mean_ttft_secs)
                    .unwrap_or(std::cmp::Ordering::Equal),
            };
            ord
        });

        successful.extend(self.reports.iter().filter(|r| !r.is_success()));
        successful
    }

    /// Render the comparison as a console table
    pub fn render_table(&self, rank_by: RankBy) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "Benchmark comparison (ranked by {})\n\n",
            rank_by
        ));
        out.push_str(
            "┌──────────────────────┬────────────┬─────────────────┬───────────┬──────────┐\n",
        );
        out.push_str(
            "│ Target               │  TTFT (s)  │ Thrpt (units/s) │ Runs ok   │ Failed   │\n",
        );
        out.push_str(
            "├──────────────────────┼────────────┼─────────────────┼───────────┼──────────┤\n",
        );

        for report in self.ranked(rank_by) {
            match &report.outcome {
                ReportOutcome::Metrics(m) => out.push_str(&format!(
                    "│ {:<20} │ {:>10.3} │ {:>15.2} │ {:>9} │ {:>8} │\n",
                    truncate(&report.name, 20),
                    m.mean_ttft_secs,
                    m.mean_throughput,
                    m.successful_runs,
                    m.failed_runs
                )),
                ReportOutcome::Failed { error_summary } => out.push_str(&format!(
                    "│ {:<20} │ {:>10} │ {:>15} │ {:>9} │ {:>8} │  {}\n",
                    truncate(&report.name, 20),
                    "-",
                    "-",
                    0,
                    report.run_count,
                    truncate(error_summary, 40)
                )),
            }
        }

        out.push_str(
            "└──────────────────────┴────────────┴─────────────────┴───────────┴──────────┘\n",
        );
        out
    }

    /// Render the comparison as a Markdown report with per-target
    /// detail sections
    pub fn render_markdown(&self, rank_by: RankBy) -> String {
        let mut lines: Vec<String> = Vec::new();

        lines.push("# LLM API Benchmark Comparison".to_string());
        lines.push(String::new());
        lines.push(format!(
            "- **Generated**: {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        ));
        lines.push(format!("- **Ranked by**: {}", rank_by));
        lines.push(String::new());

        lines.push("## Comparison".to_string());
        lines.push(String::new());
        lines.push(
            "| Target | Model | Mean TTFT (s) | P90 TTFT (s) | Throughput (units/s) \
             | Runs ok | Runs failed | Endpoint |"
                .to_string(),
        );
        lines.push("| :--- | :--- | ---: | ---: | ---: | ---: | ---: | :--- |".to_string());

        let ranked = self.ranked(rank_by);
        for report in &ranked {
            match &report.outcome {
                ReportOutcome::Metrics(m) => lines.push(format!(
                    "| {} | {} | {:.3} | {:.3} | {:.2} | {} | {} | {} |",
                    report.name,
                    report.model,
                    m.mean_ttft_secs,
                    m.ttft_stats.p90,
                    m.mean_throughput,
                    m.successful_runs,
                    m.failed_runs,
                    report.endpoint
                )),
                ReportOutcome::Failed { error_summary } => lines.push(format!(
                    "| {} | {} | - | - | - | 0 | {} | {} (failed: {}) |",
                    report.name, report.model, report.run_count, report.endpoint, error_summary
                )),
            }
        }
        lines.push(String::new());

        lines.push("## Details".to_string());
        lines.push(String::new());

        for report in &ranked {
            lines.push(format!("### {}", report.name));
            lines.push(String::new());
            lines.push(format!(
                "- **Tested**: {}",
                report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));
            lines.push(format!("- **Model**: {}", report.model));
            lines.push(format!("- **Endpoint**: {}", report.endpoint));
            lines.push(format!(
                "- **Prompt length**: {} chars",
                report.prompt_length
            ));
            lines.push(format!("- **Runs**: {}", report.run_count));
            lines.push(String::new());

            match &report.outcome {
                ReportOutcome::Metrics(m) => {
                    lines.push("**Time-to-first-unit (s):**".to_string());
                    lines.push(String::new());
                    push_stats_table(&mut lines, &m.ttft_stats, 3);
                    lines.push("**Throughput (units/s):**".to_string());
                    lines.push(String::new());
                    push_stats_table(&mut lines, &m.throughput_stats, 2);
                    lines.push("**Total response time (s):**".to_string());
                    lines.push(String::new());
                    push_stats_table(&mut lines, &m.response_time_stats, 2);
                }
                ReportOutcome::Failed { error_summary } => {
                    lines.push(format!("**All runs failed**: {}", error_summary));
                    lines.push(String::new());
                }
            }
        }

        lines.join("\n")
    }
}

fn push_stats_table(lines: &mut Vec<String>, stats: &Stats, precision: usize) {
    lines.push("| avg | min | max | median | p90 | p99 | std dev |".to_string());
    lines.push("| ---: | ---: | ---: | ---: | ---: | ---: | ---: |".to_string());
    lines.push(format!(
        "| {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} | {:.p$} |",
        stats.avg,
        stats.min,
        stats.max,
        stats.median,
        stats.p90,
        stats.p99,
        stats.std_dev,
        p = precision
    ));
    lines.push(String::new());
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
