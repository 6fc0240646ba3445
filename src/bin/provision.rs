use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use statping_provisioner::config::ProvisionConfig;
use statping_provisioner::document::load_document;
use statping_provisioner::logging::init_logging;
use statping_provisioner::reconciler::{Outcome, Reconciler, RunSummary};
use statping_provisioner::remote::statping::StatpingClient;

/// Creates or updates Statping groups and checks from a YAML document.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the desired-state document
    document: PathBuf,

    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,
}

fn log_summary(summary: &RunSummary) {
    let groups = summary.group_counts();
    let checks = summary.check_counts();
    info!(
        groups_created = groups.created,
        groups_matched = groups.matched,
        checks_created = checks.created,
        checks_updated = checks.updated,
        checks_skipped = checks.skipped,
        checks_failed = checks.failed,
        "Reconciliation finished."
    );
    for group in &summary.groups {
        for check in &group.checks {
            if matches!(check.outcome, Outcome::Failed(_) | Outcome::Skipped(_)) {
                warn!(
                    group = %group.name,
                    check = ?check.name,
                    outcome = %check.outcome,
                    "Check was not applied."
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Help and version requests are not usage errors.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    let config = match ProvisionConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::from(1);
        }
    };

    init_logging(config.log_dir.as_deref());
    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_host = %config.api_host,
        "Starting provisioner."
    );

    if !args.document.is_file() {
        error!(path = ?args.document, "Did you pass a valid file?");
        eprintln!("Usage: provision <file.yaml>");
        return ExitCode::from(1);
    }

    let groups = match load_document(&args.document) {
        Ok(groups) => groups,
        Err(e) => {
            error!(error = %e, "Failed to load desired-state document.");
            return ExitCode::from(1);
        }
    };

    if config.api_token.is_empty() {
        warn!("API_TOKEN is not set. Requests will carry an empty bearer token.");
    }

    let client = match StatpingClient::new(
        &config.api_host,
        &config.api_token,
        config.request_timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to build API client.");
            return ExitCode::from(1);
        }
    };

    let reconciler =
        Reconciler::new(client).with_max_concurrent_checks(config.max_concurrent_checks);

    match reconciler.run(&groups).await {
        Ok(summary) => {
            log_summary(&summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_summary(e.summary());
            error!(error = %e, "Reconciliation aborted.");
            ExitCode::from(1)
        }
    }
}
