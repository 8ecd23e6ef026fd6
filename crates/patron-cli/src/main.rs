// Patron CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Logs go to stderr so json/yaml output on stdout stays machine-readable.
// Design Decision: Handlers are built in; the library stays handler-agnostic.

mod commands;
mod handlers;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "patron")]
#[command(about = "Patron - run batches of jobs on a bounded worker pool")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every job in a file and report per-job results
    Run(commands::run::RunArgs),

    /// Show configuration resolved from the environment
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patron=info,patron_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let output_format = output::OutputFormat::from(cli.output.as_str());

    match cli.command {
        Commands::Run(args) => {
            let all_succeeded = commands::run::run(args, output_format, cli.quiet).await?;
            if !all_succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Config => commands::config::run(output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "patron", "-o", "json", "run", "jobs.json", "--workers", "3", "--mode", "stream",
            "--handler", "sleep",
        ])
        .unwrap();

        assert_eq!(cli.output, "json");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.workers, Some(3));
                assert_eq!(args.mode, commands::run::RunMode::Stream);
                assert_eq!(args.handler, handlers::HandlerKind::Sleep);
                assert_eq!(args.sleep_ms, 1000);
            }
            Commands::Config => panic!("expected run command"),
        }
    }
}
