use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cycletrack-cli", version, about = "Cycletrack CLI")]
struct Cli {
    /// Subject (user) the command acts on
    #[arg(long, global = true, default_value_t = 1)]
    subject: i64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record or remove period dates
    Date {
        #[command(subcommand)]
        action: commands::date::DateAction,
    },
    /// Inspect recorded episodes
    Episode {
        #[command(subcommand)]
        action: commands::episode::EpisodeAction,
    },
    /// Forecast the next periods and ovulation dates
    Forecast,
    /// Cycle profile management
    Profile {
        #[command(subcommand)]
        action: commands::profile::ProfileAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let subject = cli.subject;
    let result = match cli.command {
        Commands::Date { action } => commands::date::run(subject, action),
        Commands::Episode { action } => commands::episode::run(subject, action),
        Commands::Forecast => commands::forecast::run(subject),
        Commands::Profile { action } => commands::profile::run(subject, action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
