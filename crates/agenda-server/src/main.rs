use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

use agenda_core::db;
use agenda_core::error::CoreError;
use agenda_core::repository::SqliteRepository;
use agenda_server::api::ApiError;
use agenda_server::cli::{Cli, Commands};
use agenda_server::commands;
use agenda_server::config::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        handle_error(e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::new()?,
    };

    let pool = db::establish_connection(&config.database.path).await?;
    let repository = SqliteRepository::new(pool);

    match cli.command {
        Commands::Serve(command) => commands::serve::serve(repository, config, command).await,
        Commands::Planner(command) => {
            commands::planner::print_planner(&repository, &config, command).await
        }
        Commands::Seed(command) => commands::seed::seed(&repository, command).await,
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    let core_error = err.downcast_ref::<CoreError>().or_else(|| match err.downcast_ref::<ApiError>() {
        Some(ApiError::Core(core)) => Some(core),
        _ => None,
    });

    match core_error {
        Some(CoreError::NotFound(s)) => {
            eprintln!("{} Not found: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidInput(s)) => {
            eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
        }
        Some(CoreError::InvalidTimezone(tz)) => {
            eprintln!(
                "{} Invalid timezone '{}'. Use IANA names like 'America/New_York'",
                "Error:".style(error_style),
                tz.yellow()
            );
        }
        Some(CoreError::InvalidRecurrence { task_id, reason }) => {
            eprintln!(
                "{} Task {} has an unusable recurrence rule: {}",
                "Error:".style(error_style),
                task_id.yellow(),
                reason
            );
        }
        _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
    }
}
