mod batch;
mod config;
mod github;
mod issues;
mod report;

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::EnvFilter;

/// gh-issue-batch: creates GitHub issues in bulk from the ISSUES environment
/// variable and reports the created issues back to an existing comment.
///
/// Required environment: REPO_OWNER, REPO_NAME, AUTH_TOKEN, ISSUES.
/// Optional: COMMENT_ID, GITHUB_API_URL.
#[derive(Parser, Debug)]
#[command(name = "gh-issue-batch", version, about)]
struct Cli {
    /// Also write the summary to this file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Validate configuration and input, print what would be created, and exit
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = config::Config::load()
        .inspect_err(|e| error!(error = %e, "invalid configuration"))?;
    let _main_span =
        info_span!("issue_batch", repo = %format!("{}/{}", config.repo_owner, config.repo_name))
            .entered();

    let requests =
        issues::from_env().inspect_err(|e| error!(error = %e, "invalid issues input"))?;
    info!(issues = requests.len(), "loaded issues input");

    if cli.dry_run {
        println!("Dry run: {} issue(s) would be created", requests.len());
        for (i, request) in requests.iter().enumerate() {
            println!("{}. {}", i + 1, request.title);
        }
        return Ok(());
    }

    let client = github::GitHubClient::new(&config);
    let outcome = batch::run(&client, &requests, config.max_concurrency).await;
    report::print_terminal_summary(&outcome);

    let summary = report::summary(&outcome.created);
    if let Some(path) = cli.output.as_deref() {
        report::write_summary(&summary, path)?;
    }

    match config.comment_id {
        Some(comment_id) => report::publish(&client, comment_id, &summary).await?,
        None => {
            warn!("COMMENT_ID not set, summary not posted");
            println!("\n{summary}");
        }
    }

    info!(
        created = outcome.created.len(),
        failed = outcome.failed.len(),
        "done"
    );
    Ok(())
}
