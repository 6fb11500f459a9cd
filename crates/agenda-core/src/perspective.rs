//! Calendar "perspectives": a requested window split into day, week or
//! month buckets, each holding the tasks (and recurring-task occurrences)
//! that fall inside it.
//!
//! The pipeline is [`bucketize`] → [`assign`] over candidate tasks supplied
//! by the repository. Bucket arithmetic is done in UTC; only recurring
//! occurrences are shifted into the display timezone before placement.

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::models::{CompletionInstance, Label, Subtask, Task, TaskWithRelations};
use crate::recurrence::{ExpansionLimits, RecurrenceExpander};
use crate::timezone::{reinterpret_in_timezone, to_iso_string};

/// Default cap on generated occurrences per recurring task and request
pub const DEFAULT_MAX_OCCURRENCES: usize = 1000;

/// Default cap on rule steps walked per recurring task and request
pub const DEFAULT_MAX_ITERATIONS: usize = 100_000;

/// Default cap on buckets in one perspective
pub const DEFAULT_MAX_BUCKETS: usize = 1000;

/// Size of a single bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Day,
    Week,
    Month,
}

impl Granularity {
    /// Adds `n` units to `instant`. Month steps clamp to the end of shorter
    /// months (Jan 31 + 1 month = Feb 29 in a leap year).
    pub fn add(&self, instant: DateTime<Utc>, n: u32) -> Option<DateTime<Utc>> {
        match self {
            Granularity::Day => instant.checked_add_signed(Duration::days(i64::from(n))),
            Granularity::Week => instant.checked_add_signed(Duration::weeks(i64::from(n))),
            Granularity::Month => instant.checked_add_months(Months::new(n)),
        }
    }

    /// Whole units between `start` and `end`, floored. Negative spans yield
    /// zero.
    pub fn units_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
        if end <= start {
            return 0;
        }
        let span = end - start;
        let units = match self {
            Granularity::Day => span.num_days(),
            Granularity::Week => span.num_weeks(),
            Granularity::Month => {
                let months = i64::from(end.year() - start.year()) * 12
                    + i64::from(end.month()) - i64::from(start.month());
                let months = months.max(0);
                match u32::try_from(months).ok().and_then(|m| self.add(start, m)) {
                    Some(candidate) if candidate > end => months - 1,
                    _ => months,
                }
            }
        };
        u32::try_from(units.max(0)).unwrap_or(u32::MAX)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Day => write!(f, "day"),
            Granularity::Week => write!(f, "week"),
            Granularity::Month => write!(f, "month"),
        }
    }
}

impl FromStr for Granularity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            _ => Err(CoreError::InvalidInput(format!("Unknown granularity: {}", s))),
        }
    }
}

/// Client-facing view vocabulary. Each view shows buckets one size smaller
/// than itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewType {
    Week,
    Month,
    Year,
}

impl ViewType {
    pub fn granularity(&self) -> Granularity {
        match self {
            ViewType::Week => Granularity::Day,
            ViewType::Month => Granularity::Week,
            ViewType::Year => Granularity::Month,
        }
    }
}

impl FromStr for ViewType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(ViewType::Week),
            "month" => Ok(ViewType::Month),
            "year" => Ok(ViewType::Year),
            _ => Err(CoreError::InvalidInput("Invalid `type`".to_string())),
        }
    }
}

/// How occurrences of one recurring task share a bucket's entity map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OccurrenceKeying {
    /// Keyed by task id; a later occurrence in the same bucket replaces an
    /// earlier one
    #[default]
    TaskId,
    /// Keyed by `"{task_id}:{occurrence_date}"`; every occurrence is kept
    PerOccurrence,
}

#[derive(Debug, Clone)]
pub struct PlannerOptions {
    pub max_occurrences_per_task: usize,
    pub max_iterations_per_task: usize,
    pub max_buckets: usize,
    pub keying: OccurrenceKeying,
}

impl PlannerOptions {
    fn expansion_limits(&self) -> ExpansionLimits {
        ExpansionLimits::new(self.max_occurrences_per_task, self.max_iterations_per_task)
    }
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            max_occurrences_per_task: DEFAULT_MAX_OCCURRENCES,
            max_iterations_per_task: DEFAULT_MAX_ITERATIONS,
            max_buckets: DEFAULT_MAX_BUCKETS,
            keying: OccurrenceKeying::TaskId,
        }
    }
}

/// A task as rendered inside a bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedTask {
    #[serde(flatten)]
    pub task: Task,
    pub label: Option<Label>,
    pub completion_instances: Vec<CompletionInstance>,
    /// Subtasks keyed by subtask id
    pub subtasks: BTreeMap<String, Subtask>,
    /// The occurrence this entry stands for (recurring tasks only)
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_instant"
    )]
    pub occurrence_date: Option<DateTime<Utc>>,
}

impl PlannedTask {
    fn from_relations(source: &TaskWithRelations, occurrence_date: Option<DateTime<Utc>>) -> Self {
        let subtasks = source
            .subtasks
            .iter()
            .map(|subtask| (subtask.task.id.to_string(), subtask.clone()))
            .collect();

        Self {
            task: source.task.clone(),
            label: source.label.clone(),
            completion_instances: source.completion_instances.clone(),
            subtasks,
            occurrence_date,
        }
    }
}

/// One time window of a perspective. `end` is one second before the next
/// bucket's `start`; containment checks are inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    #[serde(serialize_with = "serialize_instant")]
    pub start: DateTime<Utc>,
    #[serde(serialize_with = "serialize_instant")]
    pub end: DateTime<Utc>,
    pub entities: BTreeMap<String, PlannedTask>,
}

impl Bucket {
    fn empty(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            entities: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

fn serialize_instant<S: Serializer>(instant: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&to_iso_string(instant))
}

fn serialize_optional_instant<S: Serializer>(
    instant: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match instant {
        Some(instant) => serialize_instant(instant, serializer),
        None => serializer.serialize_none(),
    }
}

/// Splits `[range_start, range_end)` into consecutive buckets.
///
/// The bucket count is the floored number of whole units in the range;
/// bucket `i` spans `[start + i·unit, start + (i+1)·unit − 1s]`.
pub fn bucketize(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    granularity: Granularity,
) -> Result<Vec<Bucket>, CoreError> {
    if range_end < range_start {
        return Err(CoreError::InvalidInput(format!(
            "Range end {} is before start {}",
            to_iso_string(&range_end),
            to_iso_string(&range_start)
        )));
    }

    let count = granularity.units_between(range_start, range_end);
    let overflow = || CoreError::InvalidInput("Range is out of bounds".to_string());

    let mut buckets = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = granularity.add(range_start, i).ok_or_else(overflow)?;
        let next = granularity.add(range_start, i + 1).ok_or_else(overflow)?;
        buckets.push(Bucket::empty(start, next - Duration::seconds(1)));
    }

    Ok(buckets)
}

/// Index of the bucket containing `instant`, by binary search over the
/// ordered buckets.
pub fn find_bucket(buckets: &[Bucket], instant: DateTime<Utc>) -> Option<usize> {
    let idx = buckets.partition_point(|bucket| bucket.end < instant);
    buckets
        .get(idx)
        .filter(|bucket| bucket.contains(instant))
        .map(|_| idx)
}

/// Places every candidate task into `buckets`.
///
/// # Arguments
/// * `buckets` - Output of [`bucketize`]
/// * `tasks` - Candidate tasks with their relations
/// * `window` - Query window handed to the recurrence expander
/// * `timezone` - Display timezone for recurring occurrences
/// * `options` - Expansion limits and keying
///
/// # Behavior
/// - Non-recurring tasks go into the bucket holding their `start`, keyed by
///   task id; tasks without a start or outside every bucket are dropped
/// - Recurring tasks are expanded over the window; each occurrence is
///   shifted into `timezone` and inserted with its `occurrence_date`
/// - Any recurrence rule that cannot be evaluated fails the whole call
pub fn assign(
    buckets: &mut [Bucket],
    tasks: &[TaskWithRelations],
    window: (DateTime<Utc>, DateTime<Utc>),
    timezone: &Tz,
    options: &PlannerOptions,
) -> Result<(), CoreError> {
    let (window_start, window_end) = window;

    for source in tasks {
        let task = &source.task;

        let Some(expander) = RecurrenceExpander::for_task(task)? else {
            if let Some(idx) = task.start.and_then(|start| find_bucket(buckets, start)) {
                buckets[idx]
                    .entities
                    .insert(task.id.to_string(), PlannedTask::from_relations(source, None));
            }
            continue;
        };

        let occurrences =
            expander.occurrences_between(window_start, window_end, options.expansion_limits());
        if occurrences.limited {
            warn!(
                task_id = %expander.task_id(),
                max_occurrences = options.max_occurrences_per_task,
                max_iterations = options.max_iterations_per_task,
                kept = occurrences.dates.len(),
                "Recurring task hit an expansion limit; remaining occurrences dropped"
            );
        }

        for occurrence in occurrences.dates {
            let due = reinterpret_in_timezone(occurrence, timezone);
            let Some(idx) = find_bucket(buckets, due) else {
                continue;
            };
            let key = match options.keying {
                OccurrenceKeying::TaskId => task.id.to_string(),
                OccurrenceKeying::PerOccurrence => format!("{}:{}", task.id, to_iso_string(&due)),
            };
            buckets[idx]
                .entities
                .insert(key, PlannedTask::from_relations(source, Some(due)));
        }
    }

    Ok(())
}

/// Builds a complete perspective: buckets for the window, filled with the
/// candidate tasks.
///
/// Windows spanning more than `options.max_buckets` units are rejected with
/// `InvalidInput` before any bucket is allocated.
pub fn build_perspective(
    range_start: DateTime<Utc>,
    range_end: DateTime<Utc>,
    granularity: Granularity,
    timezone: &Tz,
    tasks: &[TaskWithRelations],
    options: &PlannerOptions,
) -> Result<Vec<Bucket>, CoreError> {
    let count = granularity.units_between(range_start, range_end) as usize;
    if count > options.max_buckets {
        return Err(CoreError::InvalidInput(format!(
            "Range spans {} {} buckets; at most {} are allowed",
            count, granularity, options.max_buckets
        )));
    }

    let mut buckets = bucketize(range_start, range_end, granularity)?;
    assign(&mut buckets, tasks, (range_start, range_end), timezone, options)?;

    debug!(
        buckets = buckets.len(),
        candidates = tasks.len(),
        granularity = %granularity,
        "Built perspective"
    );

    Ok(buckets)
}
