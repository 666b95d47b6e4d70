use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use podstash::config::default_config_path;
use podstash::{
    Config, ConfigFile, EpisodeListReporter, NoopReporter, Overrides, ReqwestClient,
    SharedProgressReporter, run,
};

/// Exit status for a run that failed in any feed or episode
const EXIT_FAILURE: u8 = 1;
/// Exit status after Ctrl-C, as a shell reports SIGINT
const EXIT_INTERRUPTED: u8 = 130;

/// Download new podcast episodes into a player-friendly folder layout
#[derive(Parser, Debug)]
#[command(name = "podstash")]
#[command(about = "Download new podcast episodes and rewrite their ID3 tags")]
#[command(version)]
struct Args {
    /// Feed URLs or local RSS files; replaces the feeds from the config file
    feeds: Vec<String>,

    /// Config file (default: ~/.config/podstash/config.ini)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory that receives one sub-directory per feed
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// File listing the GUIDs of downloaded episodes
    #[arg(long)]
    guid_file: Option<PathBuf>,

    /// Only list what would be downloaded (implies --download-skip and --guid-skip)
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Do not download, but still record GUIDs (marks episodes as seen)
    #[arg(short, long)]
    download_skip: bool,

    /// Do not record GUIDs of downloaded episodes
    #[arg(short, long)]
    guid_skip: bool,

    /// Do not list episodes on stdout
    #[arg(short, long)]
    quiet: bool,

    /// Log progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            download_directory: self.download_dir.clone(),
            guid_file: self.guid_file.clone(),
            feed_urls: self.feeds.clone(),
            dry_run: self.dry_run,
            download_skip: self.download_skip,
            guid_skip: self.guid_skip,
            quiet: self.quiet,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };

    let filter = match std::env::var("PODSTASH_LOG") {
        Ok(value) => value.parse::<EnvFilter>().unwrap_or_else(|e| {
            eprintln!(
                "WARN: PODSTASH_LOG='{value}' is not a valid tracing filter ({e}); \
                 falling back to '{default}'"
            );
            EnvFilter::new(default)
        }),
        Err(_) => EnvFilter::new(default),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    let file = match &args.config {
        Some(path) => ConfigFile::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => ConfigFile::load(&path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ConfigFile::default(),
        },
    };

    Config::resolve(file, args.overrides()).context("Invalid configuration")
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
}

async fn sync(args: Args) -> Result<ExitCode> {
    let config = load_config(&args)?;

    if config.dry_run {
        eprintln!("{} dry run, nothing is downloaded or recorded", "note:".yellow());
    } else {
        if config.download_skip {
            eprintln!(
                "{} downloads skipped, episodes are only marked as seen",
                "note:".yellow()
            );
        }
        if config.guid_skip {
            eprintln!(
                "{} GUID tracking disabled, {} is not updated",
                "note:".yellow(),
                config.guid_file.display()
            );
        }
    }

    let reporter: SharedProgressReporter = if config.quiet {
        NoopReporter::shared()
    } else {
        EpisodeListReporter::shared()
    };

    let client = ReqwestClient::new();

    let report = tokio::select! {
        report = run(&client, &config, reporter) => report.context("GUID file error")?,
        _ = interrupted() => {
            eprintln!("{}", "Interrupted".red().bold());
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    if report.is_success() {
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!(
        "{} {} episode(s) and {} feed(s) failed",
        "error:".red().bold(),
        report.failed_episodes.len(),
        report.failed_feeds.len()
    );
    Ok(ExitCode::from(EXIT_FAILURE))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match sync(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(EXIT_FAILURE)
        }
    }
}
