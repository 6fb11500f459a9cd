use crate::error::CoreError;
use crate::models::{
    CompletionInstance, Label, NewCompletion, NewTaskData, Subtask, Task, TaskRecord,
    TaskWithRelations,
};
use crate::recurrence::RecurrenceExpander;
use crate::repository::query_builder::{SqlQueryBuilder, MAX_BOUND_IDS};
use crate::repository::{PlannerQuery, SqliteRepository};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite};
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[async_trait]
impl super::TaskRepository for SqliteRepository {
    async fn add_task(&self, data: NewTaskData) -> Result<Task, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Task name cannot be empty".to_string()));
        }

        let recurrence_json = match &data.recurrence_rule {
            Some(rule) => {
                RecurrenceExpander::validate(rule, data.start).map_err(|e| {
                    CoreError::InvalidInput(format!("Invalid recurrence for '{}': {}", data.name, e))
                })?;
                Some(rule.to_json()?)
            }
            None => None,
        };

        let record: TaskRecord = sqlx::query_as(
            "INSERT INTO tasks (id, name, space_id, collection_id, label_id, parent_id, start, \
             recurrence_rule, agenda_order, pinned, note, trash, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING *",
        )
        .bind(data.id.unwrap_or_else(Uuid::now_v7))
        .bind(&data.name)
        .bind(data.space_id)
        .bind(data.collection_id)
        .bind(data.label_id)
        .bind(data.parent_id)
        .bind(data.start)
        .bind(recurrence_json)
        .bind(&data.agenda_order)
        .bind(data.pinned)
        .bind(&data.note)
        .bind(data.trash)
        .bind(Utc::now())
        .fetch_one(self.pool())
        .await?;

        Task::try_from(record)
    }

    async fn find_task_by_id(&self, id: Uuid) -> Result<Option<Task>, CoreError> {
        let record: Option<TaskRecord> = sqlx::query_as("SELECT * FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        record.map(Task::try_from).transpose()
    }

    async fn trash_task(&self, id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE tasks SET trash = 1 WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("Task with id {}", id)));
        }
        Ok(())
    }

    async fn add_completion(&self, data: NewCompletion) -> Result<CompletionInstance, CoreError> {
        let completion = sqlx::query_as(
            "INSERT INTO completion_instances (id, task_id, completed_at, iteration) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(Uuid::now_v7())
        .bind(data.task_id)
        .bind(data.completed_at)
        .bind(data.iteration)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                CoreError::NotFound(format!("Task with id {}", data.task_id))
            }
            other => CoreError::Database(other),
        })?;
        Ok(completion)
    }

    async fn find_planner_candidates(
        &self,
        query: &PlannerQuery,
    ) -> Result<Vec<TaskWithRelations>, CoreError> {
        let mut query_builder = SqlQueryBuilder::build_candidate_query(query);
        let records: Vec<TaskRecord> = query_builder
            .build_query_as()
            .fetch_all(self.pool())
            .await?;

        let tasks = records
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            collection = %query.collection,
            all = query.all,
            candidates = tasks.len(),
            "Loaded planner candidates"
        );

        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
        let label_ids: Vec<Uuid> = {
            let mut ids: Vec<Uuid> = tasks.iter().filter_map(|t| t.label_id).collect();
            ids.sort();
            ids.dedup();
            ids
        };

        let labels: HashMap<Uuid, Label> = self
            .find_labels_by_ids(&label_ids)
            .await?
            .into_iter()
            .map(|label| (label.id, label))
            .collect();

        let subtasks = self.find_live_subtasks(&task_ids).await?;

        // A subtask can also be a candidate in its own right
        let mut completion_owner_ids = task_ids.clone();
        completion_owner_ids.extend(subtasks.iter().map(|s| s.id));
        completion_owner_ids.sort();
        completion_owner_ids.dedup();
        let completions = self.find_completions_by_task_ids(&completion_owner_ids).await?;
        let completions_of = |id: &Uuid| completions.get(id).cloned().unwrap_or_default();

        let mut subtasks_by_parent: HashMap<Uuid, Vec<Subtask>> = HashMap::new();
        for subtask in subtasks {
            let Some(parent_id) = subtask.parent_id else {
                continue;
            };
            let completion_instances = completions_of(&subtask.id);
            subtasks_by_parent.entry(parent_id).or_default().push(Subtask {
                task: subtask,
                completion_instances,
            });
        }

        let results = tasks
            .into_iter()
            .map(|task| {
                let mut item = TaskWithRelations::new(task);
                item.label = item.task.label_id.and_then(|id| labels.get(&id).cloned());
                item.completion_instances = completions_of(&item.task.id);
                item.subtasks = subtasks_by_parent.remove(&item.task.id).unwrap_or_default();
                item
            })
            .collect();

        Ok(results)
    }
}

impl SqliteRepository {
    async fn find_labels_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Label>, CoreError> {
        let mut labels = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BOUND_IDS) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM labels WHERE id IN ");
            SqlQueryBuilder::push_id_list(chunk, &mut qb);
            labels.extend(qb.build_query_as::<Label>().fetch_all(self.pool()).await?);
        }
        Ok(labels)
    }

    /// Non-trashed direct children of the given tasks. Children of one
    /// parent come from a single chunk, so their agenda order is kept.
    async fn find_live_subtasks(&self, parent_ids: &[Uuid]) -> Result<Vec<Task>, CoreError> {
        let mut records: Vec<TaskRecord> = Vec::new();
        for chunk in parent_ids.chunks(MAX_BOUND_IDS) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM tasks WHERE trash = 0 AND parent_id IN ");
            SqlQueryBuilder::push_id_list(chunk, &mut qb);
            qb.push(" ORDER BY agenda_order IS NULL, agenda_order ASC, id ASC");
            records.extend(qb.build_query_as::<TaskRecord>().fetch_all(self.pool()).await?);
        }
        records.into_iter().map(Task::try_from).collect()
    }

    /// Completion records grouped by task, each group ordered by completion time
    async fn find_completions_by_task_ids(
        &self,
        task_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<CompletionInstance>>, CoreError> {
        let mut grouped: HashMap<Uuid, Vec<CompletionInstance>> = HashMap::new();
        for chunk in task_ids.chunks(MAX_BOUND_IDS) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new("SELECT * FROM completion_instances WHERE task_id IN ");
            SqlQueryBuilder::push_id_list(chunk, &mut qb);
            qb.push(" ORDER BY completed_at ASC");

            let rows: Vec<CompletionInstance> = qb.build_query_as().fetch_all(self.pool()).await?;
            for completion in rows {
                grouped.entry(completion.task_id).or_default().push(completion);
            }
        }
        Ok(grouped)
    }
}
