use agenda_core::repository::SqliteRepository;

use crate::config::Config;

/// Shared, read-only application state handed to every handler.
pub struct AppState {
    pub repo: SqliteRepository,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: SqliteRepository, config: Config) -> Self {
        Self { repo, config }
    }
}
