use clap::Parser;
use repro_runner::{EokaDriver, Params, Plan, Runner, StepStatus};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "repro-runner")]
#[command(about = "Run a bug-reproduction plan against a live page")]
#[command(version)]
struct Cli {
    /// Plan file to run
    plan: PathBuf,

    /// Run in headless mode (overrides plan)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Directory for screenshots (overrides plan)
    #[arg(long, value_name = "DIR")]
    artifacts: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate plan without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

/// RUST_LOG, when set, overrides the -v/-q level.
fn log_directives(quiet: bool, verbose: u8, rust_log: Option<String>) -> String {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return directives;
    }
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };
    level.as_str().to_lowercase()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> repro_runner::Result<()> {
    let cli = Cli::parse();

    let directives = log_directives(cli.quiet, cli.verbose, std::env::var("RUST_LOG").ok());

    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(directives))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = Params::from_args(&cli.params)?;
    let mut plan = Plan::load_with_params(&cli.plan, &params)?;

    if cli.check {
        println!("Plan valid: {}", plan.name);
        println!("  Steps: {}", plan.steps.len());
        for step in &plan.steps {
            println!("    {}. {} '{}'", step.step_number, step.action, step.target);
        }
        if !plan.params.is_empty() {
            println!("  Parameters: {}", plan.params.len());
            for (name, def) in &plan.params {
                let req = if def.required { " (required)" } else { "" };
                let desc = def.description.as_deref().unwrap_or("");
                println!("    - {}{}: {}", name, req, desc);
            }
        }
        println!("  Artifacts: {}", plan.artifacts.dir.display());
        return Ok(());
    }

    if cli.headless {
        plan.browser.headless = true;
    }
    if let Some(dir) = cli.artifacts {
        plan.artifacts.dir = dir;
    }

    println!("Running: {}", plan.name);

    let driver = EokaDriver::launch(&plan.browser).await?;
    let runner = Runner::new(driver, plan.settings());
    let report = runner.run(&plan.steps).await;

    println!();
    for result in &report.results {
        let mark = match result.status {
            StepStatus::Success => "✓",
            StepStatus::Partial => "~",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "-",
        };
        println!(
            "{} {}. {} ({}ms)",
            mark, result.step_number, result.message, result.duration_ms
        );
        if let Some(ref artifact) = result.artifact_ref {
            println!("    Artifact: {}", artifact);
        }
    }
    println!();
    println!(
        "  Steps: {} passed, {} partial, {} failed of {}",
        report.succeeded(),
        report.partial(),
        report.failed(),
        plan.steps.len()
    );
    println!("  Duration: {}ms", report.duration_ms);
    if report.aborted {
        println!("  Aborted: navigation failed");
    }
    if let Some(ref error) = report.fatal_error {
        println!("  Fatal: {}", error);
    }

    if let Some(ref path) = cli.output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("  Report: {}", path.display());
    }

    runner.into_driver().close().await?;

    if !report.completed() {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags_pick_level() {
        assert_eq!(log_directives(false, 0, None), "warn");
        assert_eq!(log_directives(false, 1, None), "info");
        assert_eq!(log_directives(false, 3, None), "debug");
        assert_eq!(log_directives(true, 2, None), "error");
    }

    #[test]
    fn rust_log_overrides_flags() {
        let env = Some("repro_runner=trace".to_string());
        assert_eq!(log_directives(true, 0, env), "repro_runner=trace");
        assert_eq!(log_directives(false, 1, Some("  ".into())), "info");
    }
}
