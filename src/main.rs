//! Site-Auditor main entry point
//!
//! This is the command-line interface for the Site-Auditor website crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use site_auditor::config::{load_config_with_fingerprint, Config};
use site_auditor::crawler::{CrawlEvent, CrawlOrchestrator, CrawlRequest, HttpFetcher};
use site_auditor::output::{
    print_active_crawls, print_dashboard, print_report, write_markdown_report,
};
use site_auditor::report::{active_crawls, load_dashboard, NavigationAction, ReportSelector};
use site_auditor::storage::{SqliteStorage, Storage};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

/// Site-Auditor: a website health crawler
///
/// Site-Auditor crawls a website breadth-first and reports broken links,
/// permanent redirects and SEO defects. Every crawl is kept, so reports can
/// be viewed for any point in a website's history.
#[derive(Parser, Debug)]
#[command(name = "site-auditor")]
#[command(version = "1.0.0")]
#[command(about = "A website health crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a website and record the results
    Crawl {
        /// Website URL to crawl
        url: String,

        /// Display name for a newly registered website
        #[arg(long)]
        name: Option<String>,

        /// Desired crawl cadence (e.g. daily, weekly, manual)
        #[arg(long)]
        schedule: Option<String>,
    },

    /// Show totals, website health, active crawls and recent history
    Dashboard,

    /// Show a crawl report (the latest completed crawl by default)
    Report {
        /// Crawl to show
        #[arg(long, conflicts_with = "website_id")]
        crawl_id: Option<String>,

        /// Show the latest completed crawl of this website
        #[arg(long)]
        website_id: Option<i64>,

        /// Also write the report as markdown to the configured summary path
        #[arg(long)]
        export: bool,
    },

    /// Follow active crawls until none remain
    Watch,

    /// Mark abandoned crawls as failed
    Reconcile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, fingerprint) = load_config_with_fingerprint(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (fingerprint {})", fingerprint);

    match cli.command {
        Command::Crawl {
            url,
            name,
            schedule,
        } => {
            handle_crawl(
                config,
                CrawlRequest {
                    url,
                    name,
                    schedule,
                },
            )
            .await
        }
        Command::Dashboard => handle_dashboard(&config),
        Command::Report {
            crawl_id,
            website_id,
            export,
        } => handle_report(&config, crawl_id.as_deref(), website_id, export),
        Command::Watch => handle_watch(&config).await,
        Command::Reconcile => handle_reconcile(&config),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_auditor=info,warn"),
            1 => EnvFilter::new("site_auditor=debug,info"),
            2 => EnvFilter::new("site_auditor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    let path = Path::new(&config.storage.database_path);
    SqliteStorage::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Handles the crawl command: reconciles stale crawls, then runs one crawl
async fn handle_crawl(config: Config, request: CrawlRequest) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    let fetcher = HttpFetcher::new(&config.user_agent, config.crawler.request_timeout())
        .context("Failed to build HTTP client")?;

    let mut orchestrator = CrawlOrchestrator::new(storage, fetcher, config.crawler.clone());

    let reconciled = orchestrator.reconcile_stale()?;
    if !reconciled.is_empty() {
        tracing::warn!("Marked {} abandoned crawl(s) as failed", reconciled.len());
    }

    let events = orchestrator.subscribe();
    let reporter = tokio::spawn(report_events(events));

    tracing::info!("Starting crawl of {}", request.url);
    let outcome = orchestrator.run(request).await;

    // Closing the channel ends the reporter
    drop(orchestrator);
    let _ = reporter.await;

    let outcome = outcome?;
    let crawl = &outcome.crawl;
    println!(
        "Crawl #{} of {} {}: {} pages found, {} crawled",
        crawl.id, crawl.website_url, crawl.status, crawl.pages_found, crawl.pages_crawled
    );

    match outcome.error {
        None => {
            println!(
                "  {} broken links, {} permanent redirects, {} SEO issues",
                crawl.findings.errors_404.len(),
                crawl.findings.redirects_301.len(),
                crawl.findings.seo_issues.len()
            );
            Ok(())
        }
        Some(e) => bail!("Crawl #{} failed: {}", crawl.id, e),
    }
}

/// Logs orchestrator events until the channel closes
async fn report_events(mut events: broadcast::Receiver<CrawlEvent>) {
    loop {
        match events.recv().await {
            Ok(CrawlEvent::StatusChanged {
                crawl_id, status, ..
            }) => match crawl_id {
                Some(id) => tracing::debug!("Crawl {} is now {}", id, status),
                None => tracing::debug!("Website marked {}", status),
            },
            Ok(CrawlEvent::Progress { crawl_id, progress }) => {
                tracing::info!(
                    "Crawl {}: {} / {} pages",
                    crawl_id,
                    progress.pages_crawled,
                    progress.pages_found
                );
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Skipped {} progress events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Handles the dashboard command
fn handle_dashboard(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let dashboard = load_dashboard(&storage, &config.reports)?;
    print_dashboard(&dashboard);
    Ok(())
}

/// Handles the report command: resolves the selection and prints it
fn handle_report(
    config: &Config,
    crawl_id: Option<&str>,
    website_id: Option<i64>,
    export: bool,
) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let websites = storage.list_websites(None)?;
    let crawls = storage.list_crawls(None)?;
    let selector = ReportSelector::new(&crawls, &websites);

    let outcome = match website_id {
        Some(id) => selector.select_website(id),
        None => selector.select(crawl_id),
    };

    match (crawl_id, outcome.navigation) {
        (Some(requested), NavigationAction::Rewrite(id)) => {
            tracing::warn!("Crawl {} not found, showing latest crawl {}", requested, id)
        }
        (Some(requested), NavigationAction::Clear) => {
            tracing::warn!("Crawl {} not found", requested)
        }
        _ => {}
    }

    print_report(&outcome.selection);

    if export {
        let path = Path::new(&config.reports.summary_path);
        write_markdown_report(&outcome.selection, path)
            .with_context(|| format!("Failed to export report to {}", path.display()))?;
        println!("✓ Report exported to: {}", path.display());
    }

    Ok(())
}

/// Handles the watch command: polls active crawls at the configured interval
async fn handle_watch(config: &Config) -> anyhow::Result<()> {
    let storage = open_storage(config)?;
    let mut interval = tokio::time::interval(config.reports.refresh_interval());

    loop {
        interval.tick().await;

        let crawls = storage.list_crawls(Some(config.reports.recent_crawl_limit))?;
        let active = active_crawls(&crawls);
        if active.is_empty() {
            println!("No active crawls");
            return Ok(());
        }

        print_active_crawls(&active);
    }
}

/// Handles the reconcile command
fn handle_reconcile(config: &Config) -> anyhow::Result<()> {
    let mut storage = open_storage(config)?;
    let reconciled = site_auditor::crawler::reconcile_stale_crawls(
        &mut storage,
        config.crawler.stale_crawl_grace(),
        chrono::Utc::now(),
    )?;

    if reconciled.is_empty() {
        println!("No abandoned crawls");
    } else {
        println!("Marked {} abandoned crawl(s) as failed", reconciled.len());
        for id in reconciled {
            println!("  - crawl #{}", id);
        }
    }

    Ok(())
}
