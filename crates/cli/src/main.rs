mod cli;
mod config;
mod report;
mod system;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use shardrun_scheduler::{EventSink, MultiSink, NullSink, Plan, TokioProcessExecutor, TracingSink};

use crate::cli::CliArgs;
use crate::config::{resolve, FileConfig};
use crate::report::ConsoleSink;

/// Exit code for configuration errors, distinct from test failures.
const CONFIG_ERROR_EXIT: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    // Initialize tracing
    let default_filter = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "run aborted");
            eprintln!("error: {e:#}");
            ExitCode::from(CONFIG_ERROR_EXIT)
        }
    }
}

async fn run(args: CliArgs) -> Result<u8> {
    let file = FileConfig::load(args.config.as_deref()).context("failed to load configuration")?;
    let (config, exec_settings) = resolve(&args, file)?;
    config.log_summary();

    let inventory = system::probe(args.gpu_count);
    let plan = Plan::new(config, inventory).context("cannot schedule test plan")?;

    if args.dry_run {
        print!("{}", report::dry_run(&plan));
        return Ok(0);
    }

    let mut executor = TokioProcessExecutor::new();
    if let Some(timeout) = exec_settings.timeout {
        executor = executor.with_timeout(timeout);
    }
    if !exec_settings.bind_with.is_empty() {
        executor = executor.with_affinity_launcher(exec_settings.bind_with);
    }

    let console = ConsoleSink;
    let console_sink: &dyn EventSink = if args.json { &NullSink } else { &console };
    let sinks: Vec<&dyn EventSink> = vec![&TracingSink, console_sink];
    let sink = MultiSink::new(sinks);

    let report = plan.execute_report(&executor, &sink).await;
    info!(
        total = report.summary.total,
        passed = report.summary.passed,
        "test run finished"
    );

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{json}");
    } else {
        print!("{}", report::render(&report, args.verbose > 0));
    }

    Ok(u8::try_from(report.exit_code()).unwrap_or(1))
}
