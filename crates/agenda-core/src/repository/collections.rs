use crate::error::CoreError;
use crate::models::{Collection, Label, NewCollection, NewLabel};
use crate::repository::SqliteRepository;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

#[async_trait]
impl super::CollectionRepository for SqliteRepository {
    async fn add_collection(&self, data: NewCollection) -> Result<Collection, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Collection name cannot be empty".to_string()));
        }

        let mut tx = self.pool().begin().await?;
        let collection: Collection = sqlx::query_as(
            r#"INSERT INTO collections (id, name, emoji, space_id, invite_token, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.id)
        .bind(&data.name)
        .bind(&data.emoji)
        .bind(data.space_id)
        .bind(&data.invite_token)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for user_id in &data.invited_users {
            sqlx::query("INSERT OR IGNORE INTO collection_invites (collection_id, user_id) VALUES ($1, $2)")
                .bind(collection.id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(collection)
    }

    async fn find_collection_by_id(&self, id: Uuid) -> Result<Option<Collection>, CoreError> {
        let collection = sqlx::query_as("SELECT * FROM collections WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(collection)
    }

    async fn find_collection_by_token(&self, token: &str) -> Result<Option<Collection>, CoreError> {
        let collection = sqlx::query_as("SELECT * FROM collections WHERE invite_token = $1")
            .bind(token)
            .fetch_optional(self.pool())
            .await?;
        Ok(collection)
    }

    async fn invite_user(&self, collection_id: Uuid, user_id: Uuid) -> Result<(), CoreError> {
        if self.find_collection_by_id(collection_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("Collection with id {}", collection_id)));
        }

        sqlx::query("INSERT OR IGNORE INTO collection_invites (collection_id, user_id) VALUES ($1, $2)")
            .bind(collection_id)
            .bind(user_id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn add_label(&self, data: NewLabel) -> Result<Label, CoreError> {
        if data.name.trim().is_empty() {
            return Err(CoreError::InvalidInput("Label name cannot be empty".to_string()));
        }

        let mut tx = self.pool().begin().await?;
        let label: Label = sqlx::query_as(
            r#"INSERT INTO labels (id, name, emoji, color, space_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.id)
        .bind(&data.name)
        .bind(&data.emoji)
        .bind(&data.color)
        .bind(data.space_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for collection_id in &data.collections {
            sqlx::query("INSERT OR IGNORE INTO label_collections (label_id, collection_id) VALUES ($1, $2)")
                .bind(label.id)
                .bind(collection_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(label)
    }

    async fn attach_label(&self, label_id: Uuid, collection_id: Uuid) -> Result<(), CoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO label_collections (label_id, collection_id) \
             SELECT l.id, c.id FROM labels l, collections c WHERE l.id = $1 AND c.id = $2",
        )
        .bind(label_id)
        .bind(collection_id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(Uuid,)> = sqlx::query_as(
                "SELECT label_id FROM label_collections WHERE label_id = $1 AND collection_id = $2",
            )
            .bind(label_id)
            .bind(collection_id)
            .fetch_optional(self.pool())
            .await?;
            if exists.is_none() {
                return Err(CoreError::NotFound(format!(
                    "Label {} or collection {}",
                    label_id, collection_id
                )));
            }
        }
        Ok(())
    }
}
