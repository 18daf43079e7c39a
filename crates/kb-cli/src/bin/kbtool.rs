use clap::{Parser, Subcommand};

use kb_cli::commands::{config_ops, replay_ops};

#[derive(Parser)]
#[command(name = "kbtool", about = "Kanabridge session tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a scripted session on the in-memory text field
    Replay {
        /// Path to the script TOML file
        script: String,
        /// Output as JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print the default settings, or validate a settings file
    Settings {
        /// Settings TOML file to validate
        #[arg(long)]
        check: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Replay { script, json } => replay_ops::replay_cmd(&script, json),
        Command::Settings { check: None } => config_ops::settings_export(),
        Command::Settings { check: Some(file) } => config_ops::settings_validate(&file),
    }
}
