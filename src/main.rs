mod cli;
mod core;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cspend", about = "Cloud billing period cost summary CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Output format (text|json)
    #[arg(short, long, global = true)]
    format: Option<String>,

    /// Shorthand for --format json
    #[arg(short = 'j', long = "json", global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize month-to-date cost against last month
    Cost {
        /// Provider to query (aws|hwc, default from config)
        #[arg(short, long)]
        provider: Option<String>,

        /// Compute billing periods as of this RFC3339 timestamp instead of now
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Generate default config file
    Init,
    /// Validate config file
    Check,
    /// Print the config file path
    Path,
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "warn,cspend=debug" } else { "warn" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(Commands::Config { action }) = &cli.command {
        return match action {
            ConfigAction::Init => cli::config_cmd::init(),
            ConfigAction::Check => cli::config_cmd::check(),
            ConfigAction::Path => cli::config_cmd::path(),
        };
    }

    let config = crate::core::config::AppConfig::load().with_context(|| {
        format!(
            "Failed to load config from {}",
            crate::core::config::AppConfig::config_path().display()
        )
    })?;

    let format = if cli.json {
        cli::output::OutputFormat::Json
    } else {
        let id = cli
            .format
            .as_deref()
            .unwrap_or(&config.settings.default_format);
        cli::output::OutputFormat::from_id(id)
            .with_context(|| format!("Unknown output format: '{}'", id))?
    };

    let output_opts = cli::output::OutputOptions {
        format,
        pretty: cli.pretty,
        use_color: cli::output::detect_color(!cli.no_color, &config.settings.color),
    };

    let (provider, as_of) = match cli.command {
        Some(Commands::Cost { provider, as_of }) => (provider, as_of),
        _ => (None, None),
    };
    cli::cost_cmd::run(provider, as_of, &output_opts, &config).await
}
