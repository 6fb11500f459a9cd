use anyhow::Result;

use agenda_core::repository::SqliteRepository;

use crate::api::planner::{compute_planner, Identity, PlannerParams, PlannerRequest};
use crate::cli::PlannerCommand;
use crate::config::Config;

pub async fn print_planner(repo: &SqliteRepository, config: &Config, command: PlannerCommand) -> Result<()> {
    let params = PlannerParams {
        view: Some(command.view.as_str().to_string()),
        start: Some(command.start),
        end: Some(command.end),
        id: Some(command.id),
        timezone: Some(
            command
                .timezone
                .unwrap_or_else(|| config.planner.default_timezone.clone()),
        ),
        all: command.all.then(|| "true".to_string()),
        is_public: command.public.then(|| "true".to_string()),
    };
    let request = PlannerRequest::try_from(&params)?;
    let identity = Identity {
        space_id: command.space,
        user_id: command.user,
    };

    let buckets = compute_planner(repo, &request, identity, &config.planner.options()).await?;

    let output = if command.pretty {
        serde_json::to_string_pretty(&buckets)?
    } else {
        serde_json::to_string(&buckets)?
    };
    println!("{}", output);
    Ok(())
}
