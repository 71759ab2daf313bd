//! CLI command definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use phasepool_domain::Phase;
use std::path::PathBuf;

/// Output format for `show`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Phase selector for `run`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Analysis,
    Execution,
    /// Analysis and execution in one executor
    Merged,
}

impl From<PhaseArg> for Phase {
    fn from(arg: PhaseArg) -> Self {
        match arg {
            PhaseArg::Analysis => Phase::Analysis,
            PhaseArg::Execution => Phase::Execution,
            PhaseArg::Merged => Phase::Merged,
        }
    }
}

/// CLI arguments for phasepool
#[derive(Parser, Debug)]
#[command(name = "phasepool")]
#[command(author, version, about = "Parallelism settings and phase executors for a build engine")]
#[command(long_about = r#"
phasepool resolves the parallelism settings of a command and builds the
worker pools each build phase runs on.

Configuration files are loaded from (in priority order):
1. Command-line overrides
2. PHASEPOOL_<SECTION>__<KEY> environment variables
3. --config <path>                       Explicit config file
4. ./phasepool.toml                      Project-level config
5. ~/.config/phasepool/config.toml       Global config

Thread counts accept an integer, "auto", or HOST_CPUS with an optional
*<factor> or -<n> suffix.

Example:
  phasepool show
  phasepool -j HOST_CPUS --cpu-heavy-pool-size 4 --prioritize true show
  phasepool --loading-phase-threads 8 run --phase analysis --tasks 200 --heavy-every 5
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files and environment variables
    #[arg(long, global = true)]
    pub no_config: bool,
}

/// Option values that take precedence over every configuration source.
///
/// Thread counts are kept as text here and parsed by the config layer.
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Threads for the loading/analysis phase
    #[arg(long, global = true, value_name = "COUNT")]
    pub loading_phase_threads: Option<String>,

    /// Concurrent jobs in the execution phase
    #[arg(short, long, global = true, value_name = "COUNT")]
    pub jobs: Option<String>,

    /// Threads for file globbing
    #[arg(long, global = true, value_name = "COUNT")]
    pub globbing_threads: Option<String>,

    /// Capacity for CPU-heavy evaluation work (0 disables it)
    #[arg(long, global = true, value_name = "COUNT")]
    pub cpu_heavy_pool_size: Option<String>,

    /// Run CPU-heavy work as a capped lane of one pool
    #[arg(long, global = true, value_name = "BOOL")]
    pub prioritize: Option<bool>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show the resolved settings and the executor each phase would use
    Show {
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a synthetic workload on a phase executor and wait for quiescence
    Run {
        #[arg(long, value_enum, default_value = "analysis")]
        phase: PhaseArg,

        /// Root tasks to submit
        #[arg(long, default_value_t = 100)]
        tasks: usize,

        /// Every K-th root task is CPU-heavy (0 = none)
        #[arg(long, value_name = "K", default_value_t = 0)]
        heavy_every: usize,

        /// Child tasks each root task enqueues
        #[arg(long, value_name = "F", default_value_t = 0)]
        fan_out: usize,

        /// Index of a root task that fails fatally
        #[arg(long, value_name = "I")]
        fail_at: Option<usize>,
    },

    /// Show configuration file locations
    Sources,
}
