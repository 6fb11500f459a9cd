use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    /// Stored recurrence data that cannot be evaluated. Aborts the whole
    /// planner computation instead of dropping the task.
    #[error("Invalid recurrence rule on task {task_id}: {reason}")]
    InvalidRecurrence { task_id: Uuid, reason: String },
}

impl CoreError {
    /// True for errors caused by the caller's input rather than stored data
    /// or infrastructure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CoreError::InvalidInput(_) | CoreError::InvalidTimezone(_)
        )
    }
}
