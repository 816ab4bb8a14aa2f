//! ftk Remote Installation Validator - Main entry point
//!
//! Exit status: 0 when every check passes, 1 on any failure or unexpected
//! error, 130 when interrupted with Ctrl+C.

use anyhow::Context;
use crossterm::style::Stylize;
use signal_hook::consts::signal::SIGINT;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ftk_remote_validator::cli::Cli;
use ftk_remote_validator::config::ValidatorConfig;
use ftk_remote_validator::{preflight, process_guard};
use ftk_remote_validator::report::{ConsoleReporter, Reporter, SilentReporter};
use ftk_remote_validator::transport::SshTransport;
use ftk_remote_validator::validator::{RemoteValidator, RunOutcome};

/// Initialize logging; RUST_LOG overrides the default `warn` level
fn init_logger() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_logger();
    info!("ftk remote validator starting up");

    if let Err(e) = process_guard::init_signal_handlers() {
        warn!("Failed to initialize signal handlers: {}", e);
    }
    debug!("Signal handlers initialized");

    let cli = Cli::parse_args();
    debug!(?cli, "CLI arguments parsed");

    let result = run(&cli);

    if let Some(sig) = process_guard::received_signal() {
        report_interrupt(&cli, sig);
        std::process::exit(process_guard::interrupt_exit_code(sig));
    }

    let code = match result {
        Ok(outcome) => outcome.exit_code(),
        Err(e) => {
            error!("Validation aborted: {:#}", e);
            eprintln!("\n{}", format!("Error: {:#}", e).red());
            RunOutcome::Failure.exit_code()
        }
    };

    std::process::exit(code);
}

fn report_interrupt(cli: &Cli, sig: i32) {
    info!(signal = sig, "run interrupted");
    if sig == SIGINT && !cli.quiet {
        ConsoleReporter::stdout().warning("Interrupted by user");
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<ValidatorConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {:?}", path);
            ValidatorConfig::load_from_file(path)?
        }
        None => ValidatorConfig::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid validator configuration")?;
    Ok(config)
}

fn run(cli: &Cli) -> anyhow::Result<RunOutcome> {
    let config = load_config(cli)?;
    preflight::verify_ssh_client(&config.ssh.program)?;
    let transport = SshTransport::new(config.ssh.clone());

    if cli.quiet {
        validate_with(cli, config, transport, SilentReporter)
    } else {
        validate_with(cli, config, transport, ConsoleReporter::stdout())
    }
}

fn validate_with<R: Reporter>(
    cli: &Cli,
    config: ValidatorConfig,
    transport: SshTransport,
    reporter: R,
) -> anyhow::Result<RunOutcome> {
    let mut validator = RemoteValidator::new(cli.hostname.clone(), config, transport, reporter);
    let outcome = validator
        .validate(&cli.workflow_options())
        .with_context(|| format!("Validation of {} failed unexpectedly", cli.hostname))?;
    info!(?outcome, "validation finished");
    Ok(outcome)
}
