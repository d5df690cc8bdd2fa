//! acuquiz CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod app;
mod commands;
mod config;

#[derive(Parser)]
#[command(name = "acuquiz", version, about = "Acupoint memorization quiz")]
struct Cli {
    /// Directory for progress and settings (overrides acuquiz.toml)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Config file path (default: ./acuquiz.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the available banks with progress
    Banks,

    /// Run a self-graded quiz batch
    Quiz {
        /// Bank key, key without ".txt", or display name
        bank: String,

        /// Number of entries to draw (default from config)
        #[arg(long, short = 'n')]
        count: Option<usize>,

        /// Do not record drawn entries as used
        #[arg(long)]
        no_save: bool,

        /// Seed for a reproducible draw order
        #[arg(long)]
        seed: Option<u64>,

        /// Also print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse a bank's entries
    Study {
        bank: String,

        /// Show the details of one entry
        entry: Option<String>,

        /// Jump to the first entry of a section
        #[arg(long, conflicts_with = "entry")]
        group: Option<String>,

        /// List section headers
        #[arg(long, conflicts_with_all = ["entry", "group"])]
        groups: bool,
    },

    /// Show drawn/remaining counts per bank
    Stats {
        /// Limit to one bank
        bank: Option<String>,
    },

    /// Forget which entries of a bank have been drawn
    Clear { bank: String },

    /// Answer AI-generated questions and get them graded
    Ask {
        bank: String,

        /// Ask about this entry instead of a random one
        #[arg(long)]
        entry: Option<String>,

        /// Force the asked field (定位, 主治, 特定穴, 归经, 取穴)
        #[arg(long)]
        label: Option<String>,

        /// Number of questions
        #[arg(long, default_value = "1")]
        rounds: usize,

        /// Use local templates and grading only
        #[arg(long)]
        offline: bool,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Parse bank files and report problems
    Validate {
        /// Bank text files (default: the built-in banks)
        paths: Vec<PathBuf>,
    },

    /// Show or change the AI examiner settings
    Settings {
        /// Fill in URL and default model for a known platform
        #[arg(long)]
        platform: Option<String>,

        #[arg(long)]
        api_url: Option<String>,

        #[arg(long)]
        api_key: Option<String>,

        #[arg(long)]
        model: Option<String>,

        /// List known platforms and their models
        #[arg(long)]
        list_platforms: bool,
    },

    /// Create a starter acuquiz.toml and data directory
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match app::App::load(cli.config.as_deref(), cli.data_dir) {
        Ok(mut app) => run(&mut app, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(app: &mut app::App, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Banks => commands::banks::execute(app),
        Commands::Quiz {
            bank,
            count,
            no_save,
            seed,
            json,
        } => commands::quiz::execute(app, &bank, count, no_save, seed, json),
        Commands::Study {
            bank,
            entry,
            group,
            groups,
        } => commands::study::execute(app, &bank, entry.as_deref(), group.as_deref(), groups),
        Commands::Stats { bank } => commands::stats::execute(app, bank.as_deref()),
        Commands::Clear { bank } => commands::clear::execute(app, &bank),
        Commands::Ask {
            bank,
            entry,
            label,
            rounds,
            offline,
            seed,
        } => {
            commands::ask::execute(
                app,
                commands::ask::AskOptions {
                    bank,
                    entry,
                    label,
                    rounds,
                    offline,
                    seed,
                },
            )
            .await
        }
        Commands::Validate { paths } => commands::validate::execute(app, &paths),
        Commands::Settings {
            platform,
            api_url,
            api_key,
            model,
            list_platforms,
        } => commands::settings::execute(
            app,
            commands::settings::SettingsUpdate {
                platform,
                api_url,
                api_key,
                model,
            },
            list_platforms,
        ),
        Commands::Init => commands::init::execute(app),
    }
}
