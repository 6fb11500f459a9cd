use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use uuid::Uuid;

/// Planner service for collections of recurring and one-off tasks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(long, global = true, env = "AGENDA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeCommand),
    /// Print the planner buckets for a collection as JSON
    Planner(PlannerCommand),
    /// Load collections, labels, tasks and completions from a JSON fixture
    Seed(SeedCommand),
}

#[derive(Parser, Debug, Clone, Default)]
pub struct ServeCommand {
    /// Address to bind, overriding `server.host`
    #[clap(long)]
    pub host: Option<String>,
    /// Port to bind, overriding `server.port`
    #[clap(short, long)]
    pub port: Option<u16>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewArg {
    Week,
    Month,
    Year,
}

impl ViewArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewArg::Week => "week",
            ViewArg::Month => "month",
            ViewArg::Year => "year",
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct PlannerCommand {
    /// View type; buckets are one unit smaller (week shows days)
    #[clap(long = "type", value_enum)]
    pub view: ViewArg,
    /// Window start (ISO-8601)
    #[clap(long)]
    pub start: String,
    /// Window end (ISO-8601)
    #[clap(long)]
    pub end: String,
    /// Collection id or invite token
    #[clap(long)]
    pub id: String,
    /// Display timezone (IANA format); defaults to `planner.default_timezone`
    #[clap(long)]
    pub timezone: Option<String>,
    /// Ignore the collection and include every visible task
    #[clap(long)]
    pub all: bool,
    /// Access through the collection's invite token without an identity
    #[clap(long)]
    pub public: bool,
    /// Caller's space id
    #[clap(long, required_unless_present = "public")]
    pub space: Option<Uuid>,
    /// Caller's user id
    #[clap(long, required_unless_present = "public")]
    pub user: Option<Uuid>,
    /// Pretty-print the JSON output
    #[clap(long)]
    pub pretty: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct SeedCommand {
    /// Fixture file
    pub file: PathBuf,
}
