use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod personas;
mod render;
mod settings;

use commands::ask::AskArgs;
use personas::PersonaKind;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (defaults to ./agentloop.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ask one of the persona agents and stream its answer
    Ask {
        /// Persona to answer as
        #[arg(short, long, value_enum, default_value_t = PersonaKind::Travel)]
        persona: PersonaKind,

        /// Model to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum tool rounds before giving up
        #[arg(long)]
        max_steps: Option<usize>,

        /// Do not print tool call notices
        #[arg(long)]
        hide_tool_calls: bool,

        /// What to ask
        #[arg(required = true)]
        request: Vec<String>,
    },

    /// List the available personas
    Personas,

    /// Display the current version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Ask {
            persona,
            model,
            max_steps,
            hide_tool_calls,
            request,
        } => {
            let args = AskArgs {
                persona,
                request: request.join(" "),
                model,
                max_steps,
                hide_tool_calls,
            };
            commands::ask::execute(args, cli.config.as_deref()).await
        }
        Command::Personas => commands::personas::execute(),
        Command::Version => commands::version::execute(),
    }
}
