//! Planner endpoint: buckets a collection's tasks over a time window.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use agenda_core::perspective::{build_perspective, Bucket, PlannerOptions, ViewType};
use agenda_core::repository::{PlannerQuery, TaskRepository};
use agenda_core::timezone::{parse_instant, parse_timezone};

use super::ApiError;
use crate::state::AppState;

pub const SPACE_HEADER: &str = "x-space-id";
pub const USER_HEADER: &str = "x-user-id";

/// Raw query string. Every field is optional here so that missing values
/// produce a JSON error instead of an extractor rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerParams {
    #[serde(rename = "type")]
    pub view: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub id: Option<String>,
    pub timezone: Option<String>,
    pub all: Option<String>,
    pub is_public: Option<String>,
}

impl PlannerParams {
    /// `isPublic=true` allows invite-token access without identity headers
    pub fn is_public(&self) -> bool {
        self.is_public.as_deref() == Some("true")
    }
}

/// Validated planner request
#[derive(Debug, Clone)]
pub struct PlannerRequest {
    pub view: ViewType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub collection: String,
    pub timezone: Tz,
    pub all: bool,
}

impl TryFrom<&PlannerParams> for PlannerRequest {
    type Error = ApiError;

    fn try_from(params: &PlannerParams) -> Result<Self, Self::Error> {
        let view = required(&params.view, "type")?;
        let start = required(&params.start, "start")?;
        let end = required(&params.end, "end")?;
        let collection = required(&params.id, "id")?;
        let timezone = required(&params.timezone, "timezone")?;

        Ok(Self {
            view: view.parse()?,
            start: parse_instant(start)?,
            end: parse_instant(end)?,
            collection: collection.to_string(),
            timezone: parse_timezone(timezone)?,
            all: params.all.as_deref().is_some_and(|all| all != "false"),
        })
    }
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ApiError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

/// Caller identity. Both ids are required unless the request is public.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    pub space_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

impl Identity {
    pub fn from_headers(headers: &HeaderMap, is_public: bool) -> Result<Self, ApiError> {
        let space_id = header_uuid(headers, SPACE_HEADER)?;
        let user_id = header_uuid(headers, USER_HEADER)?;

        if !is_public {
            if space_id.is_none() {
                return Err(ApiError::MissingIdentity(SPACE_HEADER));
            }
            if user_id.is_none() {
                return Err(ApiError::MissingIdentity(USER_HEADER));
            }
        }

        Ok(Self { space_id, user_id })
    }
}

fn header_uuid(headers: &HeaderMap, name: &'static str) -> Result<Option<Uuid>, ApiError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .map(Some)
            .ok_or(ApiError::MissingIdentity(name)),
    }
}

/// Loads the candidate tasks for `request` and buckets them.
pub async fn compute_planner<R: TaskRepository + Sync>(
    repo: &R,
    request: &PlannerRequest,
    identity: Identity,
    options: &PlannerOptions,
) -> Result<Vec<Bucket>, ApiError> {
    let query = PlannerQuery {
        collection: request.collection.clone(),
        all: request.all,
        space_id: identity.space_id,
        user_id: identity.user_id,
        range_start: request.start,
        range_end: request.end,
    };

    let tasks = repo.find_planner_candidates(&query).await?;
    debug!(candidates = tasks.len(), "Candidate tasks loaded");

    let buckets = build_perspective(
        request.start,
        request.end,
        request.view.granularity(),
        &request.timezone,
        &tasks,
        options,
    )?;
    Ok(buckets)
}

pub async fn planner(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PlannerParams>,
    headers: HeaderMap,
) -> Result<Json<Vec<Bucket>>, ApiError> {
    let identity = Identity::from_headers(&headers, params.is_public())?;
    let request = PlannerRequest::try_from(&params)?;

    info!(
        collection = %request.collection,
        view = ?request.view,
        timezone = request.timezone.name(),
        "Planner request"
    );

    let buckets = compute_planner(
        &state.repo,
        &request,
        identity,
        &state.config.planner.options(),
    )
    .await?;
    Ok(Json(buckets))
}

pub async fn planner_options() -> impl IntoResponse {
    (StatusCode::OK, [(header::ACCESS_CONTROL_ALLOW_HEADERS, "*")])
}
