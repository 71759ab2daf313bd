//! Console output formatter for snapshots, plans and run summaries

use colored::Colorize;
use phasepool_domain::{
    ExecutorPlan, ParallelismSnapshot, Phase, PreconditionError, QuiescenceSummary, TaskFailure,
};
use serde_json::{Value, json};
use std::path::Path;

/// The plan a phase would use, or why it cannot be built.
pub type PhasePlan = (Phase, Result<ExecutorPlan, PreconditionError>);

/// Formats phasepool results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the snapshot and the plan of every phase
    pub fn format_show(snapshot: &ParallelismSnapshot, version: u64, plans: &[PhasePlan]) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Parallelism Settings"));
        output.push('\n');
        output.push_str(&format!(
            "{} {}\n\n",
            "Version:".cyan().bold(),
            version
        ));

        let rows = [
            ("analysis_parallelism", snapshot.analysis_parallelism().to_string()),
            ("execution_parallelism", snapshot.execution_parallelism().to_string()),
            ("globbing_parallelism", snapshot.globbing_parallelism().to_string()),
            ("cpu_heavy_pool_size", snapshot.cpu_heavy_pool_size().to_string()),
            ("use_prioritization", snapshot.use_prioritization().to_string()),
        ];
        for (field, value) in rows {
            output.push_str(&format!("  {:<24}{}\n", field, value));
        }

        output.push_str(&Self::section_header("Executors"));
        for (phase, plan) in plans {
            output.push_str(&Self::format_plan(*phase, plan));
        }

        output.push_str(&Self::footer());
        output
    }

    fn format_plan(phase: Phase, plan: &Result<ExecutorPlan, PreconditionError>) -> String {
        let label = format!("{:<10}", phase.as_str());
        match plan {
            Ok(plan) => {
                let mut line = format!(
                    "  {} {} ({} threads)\n",
                    label.yellow().bold(),
                    plan.strategy(),
                    plan.total_threads()
                );
                for pool in plan.pools() {
                    line.push_str(&format!("  {:<10} * {}\n", "", pool));
                }
                if let ExecutorPlan::TieredPriority {
                    cpu_heavy_capacity, ..
                } = plan
                {
                    line.push_str(&format!(
                        "  {:<10} * cpu-heavy lane capped at {}\n",
                        "", cpu_heavy_capacity
                    ));
                }
                line
            }
            Err(e) => format!(
                "  {} {}\n",
                label.red().bold(),
                format!("unavailable: expected {} > 0", e.field).dimmed()
            ),
        }
    }

    /// Format `show` output as JSON
    pub fn format_show_json(
        snapshot: &ParallelismSnapshot,
        version: u64,
        plans: &[PhasePlan],
    ) -> String {
        let mut executors = serde_json::Map::new();
        for (phase, plan) in plans {
            let value = match plan {
                Ok(plan) => json!({
                    "plan": plan,
                    "total_threads": plan.total_threads(),
                }),
                Err(e) => json!({ "error": e.to_string() }),
            };
            executors.insert(phase.as_str().to_string(), value);
        }

        let value = json!({
            "version": version,
            "snapshot": snapshot,
            "executors": Value::Object(executors),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format the outcome of a run
    pub fn format_run(
        plan: &ExecutorPlan,
        result: &Result<QuiescenceSummary, TaskFailure>,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("{} {}\n", "Executor:".cyan().bold(), plan));

        match result {
            Ok(summary) => {
                output.push_str(&format!(
                    "{} {} tasks ran ({} completed, {} recoverable failures), {} skipped\n",
                    "Quiescent:".green().bold(),
                    summary.ran(),
                    summary.completed,
                    summary.recoverable_failures.len(),
                    summary.skipped
                ));
                for failure in &summary.recoverable_failures {
                    output.push_str(&format!("  * {}\n", failure));
                }
            }
            Err(failure) => {
                output.push_str(&format!("{} {}\n", "Failed:".red().bold(), failure));
            }
        }
        output
    }

    /// Format configuration file locations
    pub fn format_sources<'a>(sources: impl IntoIterator<Item = (&'a str, &'a Path, bool)>) -> String {
        let mut output = format!("{}\n", "Configuration files (priority order):".bold());
        for (label, path, found) in sources {
            let status = if found {
                "found".green()
            } else {
                "not found".dimmed()
            };
            output.push_str(&format!(
                "  {:<10}{} ({})\n",
                format!("{}:", label),
                path.display(),
                status
            ));
        }
        output
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
