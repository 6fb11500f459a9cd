//! # Agenda Core Library
//!
//! Planner engine for a task/household management product: recurring task
//! expansion, calendar bucketing, and the SQLite store that supplies
//! candidate tasks.
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Tasks, labels, collections, completion records and recurrence rules
//! - [`repository`]: Data access layer with Repository pattern
//! - [`recurrence`]: RFC 5545 occurrence expansion
//! - [`perspective`]: Time bucketing and task-to-bucket assignment
//! - [`timezone`]: Timezone and timestamp utilities
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use agenda_core::{
//!     db,
//!     perspective::{build_perspective, PlannerOptions, ViewType},
//!     repository::{PlannerQuery, SqliteRepository, TaskRepository},
//!     timezone::{parse_instant, parse_timezone},
//! };
//! use uuid::Uuid;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pool = db::establish_connection("agenda.db").await?;
//!     let repo = SqliteRepository::new(pool);
//!
//!     let start = parse_instant("2024-01-01T00:00:00.000Z")?;
//!     let end = parse_instant("2024-01-08T00:00:00.000Z")?;
//!     let query = PlannerQuery {
//!         collection: "groceries".to_string(),
//!         all: false,
//!         space_id: Some(Uuid::nil()),
//!         user_id: None,
//!         range_start: start,
//!         range_end: end,
//!     };
//!
//!     let tasks = repo.find_planner_candidates(&query).await?;
//!     let buckets = build_perspective(
//!         start,
//!         end,
//!         "week".parse::<ViewType>()?.granularity(),
//!         &parse_timezone("Europe/Berlin")?,
//!         &tasks,
//!         &PlannerOptions::default(),
//!     )?;
//!     println!("{}", serde_json::to_string_pretty(&buckets)?);
//!
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod models;
pub mod perspective;
pub mod recurrence;
pub mod repository;
pub mod timezone;
