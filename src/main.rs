//! trend-harvest CLI: trending labels and reactions from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use trend_harvest::{
    provider_from_config, trend_report, write_json, BrowserPool, CandidateGenerator,
    CandidateOutcome, ChromeDriver, HarvestConfig, Harvester, Target, TrendSnapshot,
};

/// Harvest trending topics and public reactions
#[derive(Parser)]
#[command(name = "trend-harvest")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Cookie export (JSON array) used as the browsing identity
    #[arg(long, global = true)]
    cookies: Option<PathBuf>,

    /// Chrome/Chromium executable
    #[arg(long, global = true)]
    chrome: Option<PathBuf>,

    /// Write JSON output to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Output format for stdout
    #[arg(short, long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the current trending labels
    Trends {
        /// Maximum number of trends
        #[arg(short, long)]
        limit: Option<usize>,

        /// Pair each label with its timeline URL
        #[arg(long)]
        targets: bool,
    },

    /// Collect reactions for a keyword or a single timeline URL
    Reactions {
        /// Keyword, optionally #-prefixed
        keyword: Option<String>,

        /// Visit this URL instead of generating candidates
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Discover trends and collect reactions for each
    Report {
        /// Maximum number of trends
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Print the candidate URLs for a keyword without visiting them
    Candidates {
        /// Keyword, optionally #-prefixed
        keyword: String,
    },

    /// Check whether the cookie export still signs in
    CheckCookies,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;

    if let Commands::Candidates { keyword } = &cli.command {
        return print_candidates(&cli, &config, keyword);
    }

    let pool = Arc::new(BrowserPool::new(config.browser.clone()));
    let identity = provider_from_config(&config.identity);
    let driver = Arc::new(ChromeDriver::new(Arc::clone(&pool)));
    let harvester = Harvester::new(driver, identity, config)?;

    let outcome = run(&cli, &harvester).await;
    pool.shutdown().await;
    outcome
}

fn load_config(cli: &Cli) -> Result<HarvestConfig> {
    let mut config = match &cli.config {
        Some(path) => HarvestConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HarvestConfig::default(),
    };
    if let Some(ref cookies) = cli.cookies {
        config.identity.cookies_file = Some(cookies.clone());
    }
    if let Some(ref chrome) = cli.chrome {
        config.browser.chrome_path = Some(chrome.clone());
    }
    Ok(config)
}

async fn run(cli: &Cli, harvester: &Harvester) -> Result<()> {
    let default_limit = harvester.config().trends.limit;

    match &cli.command {
        Commands::Trends { limit, targets } => {
            let limit = limit.unwrap_or(default_limit);
            if *targets {
                let targets = harvester.discover_targets(limit).await?;
                emit(cli, &targets, || {
                    for (i, t) in targets.iter().enumerate() {
                        println!("[{}] {}\n    {}", i + 1, t.label, t.url);
                    }
                })
            } else {
                let snapshot = TrendSnapshot::new(harvester.discover_trends(limit).await?);
                emit(cli, &snapshot, || {
                    println!("Trends as of {}:", snapshot.as_of.to_rfc3339());
                    for (i, label) in snapshot.keywords.iter().enumerate() {
                        println!("[{}] {}", i + 1, label);
                    }
                })
            }
        }
        Commands::Reactions { keyword, source } => {
            let target = match (source, keyword) {
                (Some(url), _) => Target::source(url.as_str()),
                (None, Some(keyword)) => Target::keyword(keyword.as_str()),
                (None, None) => anyhow::bail!("Give a keyword or --source URL"),
            };
            let harvest = harvester.acquire(&target).await?;
            emit(cli, &harvest, || {
                println!(
                    "{} reactions for \"{}\" from {} candidate(s):\n",
                    harvest.len(),
                    target.as_str(),
                    harvest.tried_urls.len()
                );
                for report in &harvest.candidates {
                    let status = match &report.outcome {
                        CandidateOutcome::Accumulated {
                            found,
                            added,
                            attempts,
                        } => format!("{} found, {} new, attempt {}", found, added, attempts),
                        CandidateOutcome::LoginWall => "login wall".to_string(),
                        CandidateOutcome::Exhausted { attempts, .. } => {
                            format!("failed after {} attempts", attempts)
                        }
                        CandidateOutcome::NoSession { error } => format!("no session: {}", error),
                    };
                    println!("  {} ({})", report.url, status);
                }
                println!();
                for (i, item) in harvest.items.iter().enumerate() {
                    println!("{}. {}", i + 1, item.text.replace('\n', " "));
                }
            })
        }
        Commands::Report { limit } => {
            let report = trend_report(harvester, limit.unwrap_or(default_limit)).await?;
            emit(cli, &report, || {
                for entry in &report.trends {
                    let status = match &entry.error {
                        Some(error) => format!("failed ({})", error),
                        None => format!("{} reactions", entry.count),
                    };
                    println!("[{}] {}: {}", entry.index, entry.keyword, status);
                }
            })
        }
        Commands::CheckCookies => {
            let signed_in = harvester.check_identity().await?;
            if signed_in {
                println!("Cookies valid (signed in)");
            } else {
                println!("Cookies invalid or expired (signed out)");
            }
            Ok(())
        }
        Commands::Candidates { .. } => Ok(()),
    }
}

fn print_candidates(cli: &Cli, config: &HarvestConfig, keyword: &str) -> Result<()> {
    let urls = CandidateGenerator::new(config.candidates.clone()).build(keyword)?;
    emit(cli, &urls, || {
        for url in &urls {
            println!("{}", url);
        }
    })
}

/// Writes `value` to `--output`, or prints it in the chosen format.
fn emit<T: Serialize>(cli: &Cli, value: &T, text: impl FnOnce()) -> Result<()> {
    if let Some(ref path) = cli.output {
        write_output(path, value)?;
        return Ok(());
    }
    match cli.format {
        OutputFormat::Text => text(),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

fn write_output<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_json(path, value).with_context(|| format!("Failed to write {}", path.display()))
}
