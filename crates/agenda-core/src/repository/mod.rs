use crate::db::DbPool;
use crate::error::CoreError;
use crate::models::{
    Collection, CompletionInstance, Label, NewCollection, NewCompletion, NewLabel, NewTaskData,
    SeedData, Task, TaskWithRelations,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

pub mod collections;
pub mod query_builder;
pub mod tasks;

/// Parameters of a planner candidate lookup.
#[derive(Debug, Clone)]
pub struct PlannerQuery {
    /// Collection id, or a collection invite token
    pub collection: String,
    /// Skip collection filtering entirely
    pub all: bool,
    /// Caller's space; `None` for anonymous (invite token) access
    pub space_id: Option<Uuid>,
    /// Caller's user id; `None` for anonymous access
    pub user_id: Option<Uuid>,
    pub range_start: DateTime<Utc>,
    pub range_end: DateTime<Utc>,
}

/// Domain-specific trait for task operations
#[async_trait]
pub trait TaskRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError>;
    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError>;
    async fn trash_task(&self, id: Uuid) -> Result<(), CoreError>;
    async fn add_completion(&self, data: NewCompletion) -> Result<CompletionInstance, CoreError>;
    /// Candidate tasks for a planner view, with labels, completion records
    /// and live subtasks attached.
    async fn find_planner_candidates(&self, query: &PlannerQuery) -> Result<Vec<TaskWithRelations>, CoreError>;
}

/// Domain-specific trait for collection and label operations
#[async_trait]
pub trait CollectionRepository {
    async fn add_collection(&self, data: NewCollection) -> Result<Collection, CoreError>;
    async fn find_collection_by_id(&self, id: Uuid) -> Result<Option<Collection>, CoreError>;
    async fn find_collection_by_token(&self, token: &str) -> Result<Option<Collection>, CoreError>;
    async fn invite_user(&self, collection_id: Uuid, user_id: Uuid) -> Result<(), CoreError>;
    async fn add_label(&self, data: NewLabel) -> Result<Label, CoreError>;
    async fn attach_label(&self, label_id: Uuid, collection_id: Uuid) -> Result<(), CoreError>;
}

/// Main repository trait that composes all domain traits
#[async_trait]
pub trait Repository: TaskRepository + CollectionRepository + Sync {
    /// Loads a fixture in dependency order: collections, labels, tasks
    /// (parents before subtasks), then completion records.
    async fn seed(&self, data: SeedData) -> Result<SeedSummary, CoreError> {
        let mut summary = SeedSummary::default();

        for collection in data.collections {
            self.add_collection(collection).await?;
            summary.collections += 1;
        }
        for label in data.labels {
            self.add_label(label).await?;
            summary.labels += 1;
        }

        let (parents, children): (Vec<_>, Vec<_>) =
            data.tasks.into_iter().partition(|task| task.parent_id.is_none());
        for task in parents.into_iter().chain(children) {
            self.add_task(task).await?;
            summary.tasks += 1;
        }

        for completion in data.completions {
            self.add_completion(completion).await?;
            summary.completions += 1;
        }

        info!(
            collections = summary.collections,
            labels = summary.labels,
            tasks = summary.tasks,
            completions = summary.completions,
            "Seed data loaded"
        );
        Ok(summary)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub collections: usize,
    pub labels: usize,
    pub tasks: usize,
    pub completions: usize,
}

/// SQLite implementation of the repository pattern
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: DbPool,
}

impl SqliteRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool for internal use across modules
    pub(crate) fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Repository for SqliteRepository {}
