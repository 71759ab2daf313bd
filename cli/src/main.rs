//! CLI entrypoint for phasepool
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

mod workload;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use phasepool_application::{QuiescingExecutor, QuiescingExecutors};
use phasepool_domain::{ExecutorPlan, Phase};
use phasepool_infrastructure::{
    ConfigLoader, ConfigOverrides, FileConfig, ThreadCount, TokioExecutorBuilder,
};
use phasepool_presentation::{Cli, Command, ConsoleFormatter, OutputFormat, OverrideArgs};
use tracing::info;
use tracing_subscriber::EnvFilter;
use workload::Workload;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Starting phasepool");

    if cli.command == Command::Sources {
        let sources = ConfigLoader::config_sources(cli.config.as_deref());
        print!(
            "{}",
            ConsoleFormatter::format_sources(
                sources
                    .iter()
                    .map(|s| (s.label, s.path.as_path(), s.found))
            )
        );
        return Ok(());
    }

    let config = load_config(&cli)?;

    // === Dependency Injection ===
    // Each pool owns a runtime, so main must not run inside one
    let executors = QuiescingExecutors::new(TokioExecutorBuilder);
    let snapshot = executors.refresh(&config.into_options());

    match cli.command {
        Command::Show { format } => {
            let version = executors.settings().version();
            let plans: Vec<_> = Phase::ALL
                .into_iter()
                .map(|phase| (phase, ExecutorPlan::for_phase(phase, &snapshot)))
                .collect();
            let output = match format {
                OutputFormat::Text => ConsoleFormatter::format_show(&snapshot, version, &plans),
                OutputFormat::Json => ConsoleFormatter::format_show_json(&snapshot, version, &plans),
            };
            println!("{}", output);
        }
        Command::Run {
            phase,
            tasks,
            heavy_every,
            fan_out,
            fail_at,
        } => {
            let phase = Phase::from(phase);
            let executor = executors
                .executor_for(phase)
                .with_context(|| format!("cannot run the {} phase", phase))?;

            let workload = Workload::new(phase, tasks)
                .with_heavy_every(heavy_every)
                .with_fan_out(fan_out)
                .with_fail_at(fail_at);
            info!(
                "Submitting {} tasks ({} expected) to '{}'",
                tasks,
                workload.expected_tasks(),
                executor.name()
            );
            workload.submit_to(&executor);

            let result = executor.await_quiescence();
            print!("{}", ConsoleFormatter::format_run(executor.plan(), &result));
            if result.is_err() {
                bail!("the {} phase stopped after a fatal task failure", phase);
            }
        }
        Command::Sources => {}
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let overrides = parse_overrides(&cli.overrides)?;

    let config = if cli.no_config {
        ConfigLoader::load_overrides_only(&overrides)
    } else {
        ConfigLoader::load(cli.config.as_deref(), &overrides)
    }
    .map_err(|e| anyhow!("failed to load configuration: {}", e))?;

    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn parse_overrides(args: &OverrideArgs) -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        loading_phase_threads: thread_count(&args.loading_phase_threads, "loading-phase-threads")?,
        jobs: thread_count(&args.jobs, "jobs")?,
        globbing_threads: thread_count(&args.globbing_threads, "globbing-threads")?,
        cpu_heavy_pool_size: thread_count(&args.cpu_heavy_pool_size, "cpu-heavy-pool-size")?,
        use_prioritization: args.prioritize,
    })
}

fn thread_count(value: &Option<String>, flag: &str) -> Result<Option<ThreadCount>> {
    value
        .as_deref()
        .map(|v| {
            v.parse::<ThreadCount>()
                .with_context(|| format!("invalid value for --{}", flag))
        })
        .transpose()
}
