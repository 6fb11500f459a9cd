use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use agenda_core::models::SeedData;
use agenda_core::repository::{Repository, SqliteRepository};

use crate::cli::SeedCommand;

pub async fn seed(repo: &SqliteRepository, command: SeedCommand) -> Result<()> {
    let raw = tokio::fs::read_to_string(&command.file)
        .await
        .with_context(|| format!("Failed to read {}", command.file.display()))?;
    let data: SeedData = serde_json::from_str(&raw)
        .with_context(|| format!("Invalid fixture {}", command.file.display()))?;

    let summary = repo.seed(data).await?;

    println!(
        "{} {} collections, {} labels, {} tasks, {} completions",
        "Seeded".green().bold(),
        summary.collections,
        summary.labels,
        summary.tasks,
        summary.completions
    );
    Ok(())
}
