use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use test_scheduler::cli::{self, Args};
use test_scheduler::config::{print_env_help, AppConfig, ConfigFile, EnvConfig};
use test_scheduler::executor::Run;
use test_scheduler::models::RunSummary;
use test_scheduler::output::{write_results_to_file, OutputFormat, ResultFormatter};
use test_scheduler::suite::{ShellExecutor, Suite};
use test_scheduler::utils::{init_logger, LogLevel};

/// Exit status of a run stopped by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();
    let env = EnvConfig::load();

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    init_logger(level, env.log.as_deref());

    match args.command {
        cli::Command::Run(run_args) => run_suite(run_args, &env).await,
        cli::Command::List(list_args) => {
            list_suite(list_args)?;
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Config(config_args) => {
            manage_config(config_args, &env)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Configuration precedence: CLI flags, then environment, then file, then defaults.
fn load_config(path: Option<&str>, env: &EnvConfig) -> Result<AppConfig> {
    let file = match path.or(env.config_file.as_deref()) {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::load_default()?,
    };

    let mut config = file.run;
    config.apply_env(env);
    Ok(config)
}

async fn run_suite(args: cli::RunArgs, env: &EnvConfig) -> Result<ExitCode> {
    let mut config = load_config(args.config.as_deref(), env)?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if args.max_failures.is_some() {
        config.max_failures = args.max_failures;
    }
    if args.timeout.is_some() {
        config.timeout_secs = args.timeout;
    }
    if args.per_test_timeout.is_some() {
        config.per_test_timeout_secs = args.per_test_timeout;
    }
    config.shuffle |= args.shuffle;

    if config.timeout_secs == Some(0) || config.per_test_timeout_secs == Some(0) {
        anyhow::bail!("Timeouts must be greater than zero");
    }

    let format_name = args.format.clone().unwrap_or_else(|| env.format_or("table"));
    let format = OutputFormat::from_str(&format_name)
        .ok_or_else(|| anyhow::anyhow!("Unknown output format: {format_name}"))?;

    let mut suite = Suite::load(&args.suite)?;
    if let Some(pattern) = &args.filter {
        suite.filter(pattern);
    }
    suite.validate(&config.parallelism_groups)?;
    if config.shuffle {
        suite.shuffle();
    }
    let mut items = suite.items();

    info!(
        "Running {} tests from {} on {} workers",
        items.len(),
        args.suite,
        config.workers
    );

    let executor = Arc::new(
        ShellExecutor::new(config.shell.clone()).with_per_test_timeout(config.per_test_timeout()),
    );

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping test run");
                cancel.cancel();
            }
        })
    };

    let run = Run::new(executor, config.run_config())
        .with_workers(config.workers)
        .with_timeout(config.timeout())
        .with_cancellation(cancel);

    let formatter = ResultFormatter::new(format);
    let total = items.len();
    let mut done = 0;
    let started_at = Utc::now();

    let outcome = run
        .execute(&mut items, |item| {
            done += 1;
            if format.shows_progress() {
                println!("{}", formatter.format_progress(item, done, total));
            }
        })
        .await;
    interrupt.abort();

    let elapsed = match outcome {
        Ok(elapsed) => elapsed,
        Err(e) if e.is_interrupted() => {
            eprintln!("Test run interrupted");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
        Err(e) => return Err(e).context("Test run aborted"),
    };

    let summary = RunSummary::new(started_at, elapsed, items);
    println!("{}", formatter.format_summary(&summary)?);

    if let Some(output) = &args.output {
        write_results_to_file(output, &summary, format)?;
        info!("Results saved to {output}");
    }

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn list_suite(args: cli::ListArgs) -> Result<()> {
    let suite = Suite::load(&args.suite)?;
    let title = suite.name.as_deref().unwrap_or(&args.suite);

    println!("\n{title} ({} tests)\n", suite.len());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for (number, entry) in suite.tests.iter().enumerate() {
        if args.detailed {
            let mut flags = Vec::new();
            if entry.definition.expect_fail {
                flags.push("expect-fail");
            }
            if entry.definition.skip {
                flags.push("skip");
            }
            if entry.definition.unsupported {
                flags.push("unsupported");
            }
            println!(
                "  {:3}. {:40} [{}] {}",
                number + 1,
                entry.name,
                entry.group.as_deref().unwrap_or("-"),
                flags.join(",")
            );
        } else {
            println!("  {:3}. {}", number + 1, entry.name);
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

fn manage_config(args: cli::ConfigArgs, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
            println!("\nEdit the file to customize your settings.");
        }

        cli::ConfigAction::Show { env: show_env, format } => {
            if show_env {
                if !env.has_any() {
                    println!("No TEST_SCHEDULER_* environment variables are set.\n");
                }
                env.print_summary();
            } else {
                let config = match env.config_file.as_deref() {
                    Some(path) => ConfigFile::load(path)?,
                    None => ConfigFile::load_default()?,
                };
                let output = if format == "json" {
                    serde_json::to_string_pretty(&config)?
                } else {
                    serde_yaml::to_string(&config)?
                };
                println!("{output}");
            }
        }

        cli::ConfigAction::Validate { file } => {
            let path = file
                .or_else(|| env.config_file.clone())
                .or_else(|| ConfigFile::find().map(|p| p.to_string_lossy().to_string()))
                .unwrap_or_else(|| "./test-scheduler.yaml".to_string());

            match ConfigFile::load(&path) {
                Ok(_) => println!("✓ Configuration file is valid: {path}"),
                Err(e) => {
                    println!("✗ Configuration file is invalid: {path}");
                    println!("  Error: {e:#}");
                    return Err(e);
                }
            }
        }

        cli::ConfigAction::Env => print_env_help(),
    }

    Ok(())
}
