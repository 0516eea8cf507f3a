use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyword_radar::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "keyword-radar",
    version,
    about = "Keyword intelligence engine: multi-portal estimates, trends, predictions and page store sync",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); defaults to the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a keyword on every portal
    Analyze {
        keyword: String,
    },

    /// Compare up to five keywords side by side
    Compare {
        #[arg(required = true)]
        keywords: Vec<String>,
    },

    /// Short-tail versus long-tail decomposition
    ShortLong {
        keyword: String,
    },

    /// Ranked keyword recommendations
    Recommend {
        #[arg(required = true)]
        keywords: Vec<String>,

        /// Channel topic used for niche variants
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Competitor keyword gap analysis
    Competitor {
        /// Competitor keywords, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        competitor: Vec<String>,

        /// Your keywords, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        yours: Vec<String>,

        /// Also record the analysis in the page store
        #[arg(long)]
        sync: bool,

        /// Analysis title for the synced record
        #[arg(long)]
        name: Option<String>,

        /// Competitor channel name for the synced record
        #[arg(long)]
        competitor_name: Option<String>,

        /// Your channel name for the synced record
        #[arg(long)]
        channel: Option<String>,
    },

    /// Search intent classification
    Intent {
        keyword: String,
    },

    /// Daily trend analysis
    Trends {
        keyword: String,

        /// Window in days (clamped to 7-90)
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Monthly and weekday seasonality with a posting schedule
    Seasonality {
        keyword: String,
    },

    /// Demand prediction
    Predict {
        keyword: String,

        /// Horizon in months (clamped to 1-6)
        #[arg(short, long)]
        months: Option<u32>,
    },

    /// Recorded analyses of a keyword
    History {
        keyword: String,

        /// Lookback in days; defaults to the configured window
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Most analysed keywords
    Top {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Export a multi-portal analysis to a JSON file
    Export {
        keyword: String,

        /// Output file; defaults to analysis_<keyword>_<timestamp>.json
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Wrap the analysis in a report with a generation timestamp
        #[arg(long)]
        report: bool,
    },

    /// Analyse a keyword and sync the results to the page store
    Sync {
        keyword: String,

        /// Also write the daily trend points
        #[arg(long)]
        trends: bool,

        /// Also write ranked recommendations
        #[arg(long)]
        recommendations: bool,

        /// Also write the search intent record
        #[arg(long)]
        intent: bool,

        /// Also write the performance prediction
        #[arg(long)]
        prediction: bool,

        /// Trend window in days
        #[arg(short, long)]
        days: Option<u32>,
    },

    /// Start the HTTP API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose)?;

    if let Err(e) = keyword_radar::metrics::init_metrics() {
        tracing::warn!(error = %e, "Metrics initialization failed");
    }

    match cli.command {
        Commands::Analyze { keyword } => {
            tracing::debug!(keyword = %keyword, "Starting analyze command");
            commands::analyze::analyze(&config, &keyword).await?;
        }
        Commands::Compare { keywords } => {
            commands::analyze::compare(&config, &keywords)?;
        }
        Commands::ShortLong { keyword } => {
            commands::analyze::short_long(&config, &keyword)?;
        }
        Commands::Recommend { keywords, topic } => {
            commands::analyze::recommend(&config, &keywords, topic.as_deref()).await?;
        }
        Commands::Competitor {
            competitor,
            yours,
            sync,
            name,
            competitor_name,
            channel,
        } => {
            let params = commands::sync::CompetitorParams {
                competitor,
                yours,
                sync,
                name,
                competitor_name,
                channel,
            };
            commands::sync::competitor(&config, params).await?;
        }
        Commands::Intent { keyword } => {
            commands::analyze::intent(&config, &keyword)?;
        }
        Commands::Trends { keyword, days } => {
            commands::analyze::trends(&config, &keyword, days)?;
        }
        Commands::Seasonality { keyword } => {
            commands::analyze::seasonality(&config, &keyword)?;
        }
        Commands::Predict { keyword, months } => {
            commands::analyze::predict(&config, &keyword, months)?;
        }
        Commands::History { keyword, days } => {
            commands::history::history(&config, &keyword, days)?;
        }
        Commands::Top { limit } => {
            commands::history::top(&config, limit)?;
        }
        Commands::Export {
            keyword,
            output,
            report,
        } => {
            commands::analyze::export(&config, &keyword, output, report).await?;
        }
        Commands::Sync {
            keyword,
            trends,
            recommendations,
            intent,
            prediction,
            days,
        } => {
            tracing::info!(
                keyword = %keyword,
                trends,
                recommendations,
                intent,
                prediction,
                "Starting sync command"
            );
            let params = commands::sync::SyncParams {
                keyword,
                trends,
                recommendations,
                intent,
                prediction,
                days,
            };
            commands::sync::sync(&config, params).await?;
        }
        Commands::Serve { host, port } => {
            commands::serve::serve(config, host, port).await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("keyword_radar=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("keyword_radar={level},warn")))
    };

    // Logs go to stderr so stdout carries only the JSON result
    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
