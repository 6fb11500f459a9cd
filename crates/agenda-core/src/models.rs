use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub space_id: Uuid,
    /// Public access token; anyone holding it can read the collection
    pub invite_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: Uuid,
    pub name: String,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub space_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompletionInstance {
    pub id: Uuid,
    pub task_id: Uuid,
    pub completed_at: DateTime<Utc>,
    /// For recurring tasks: the occurrence this completion belongs to
    pub iteration: Option<DateTime<Utc>>,
}

/// Raw `tasks` row. The recurrence rule is kept as stored JSON text until
/// it is converted into a [`Task`].
#[derive(Debug, Clone, FromRow)]
pub struct TaskRecord {
    pub id: Uuid,
    pub name: String,
    pub space_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub label_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub start: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
    pub agenda_order: Option<String>,
    pub pinned: bool,
    pub note: Option<String>,
    pub trash: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = CoreError;

    fn try_from(record: TaskRecord) -> Result<Self, Self::Error> {
        let recurrence_rule = match record.recurrence_rule.as_deref() {
            None => None,
            Some(raw) => RecurrenceRule::from_json(raw).map_err(|e| CoreError::InvalidRecurrence {
                task_id: record.id,
                reason: e.to_string(),
            })?,
        };

        Ok(Task {
            id: record.id,
            name: record.name,
            space_id: record.space_id,
            collection_id: record.collection_id,
            label_id: record.label_id,
            parent_id: record.parent_id,
            start: record.start,
            recurrence_rule,
            agenda_order: record.agenda_order,
            pinned: record.pinned,
            note: record.note,
            trash: record.trash,
            created_at: record.created_at,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub space_id: Uuid,
    pub collection_id: Option<Uuid>,
    pub label_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    /// Start/due timestamp; for recurring tasks the fallback rule anchor
    pub start: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<RecurrenceRule>,
    pub agenda_order: Option<String>,
    pub pinned: bool,
    pub note: Option<String>,
    pub trash: bool,
    pub created_at: DateTime<Utc>,
}

impl Default for Task {
    fn default() -> Self {
        Self {
            id: Uuid::now_v7(),
            name: String::new(),
            space_id: Uuid::nil(),
            collection_id: None,
            label_id: None,
            parent_id: None,
            start: None,
            recurrence_rule: None,
            agenda_order: None,
            pinned: false,
            note: None,
            trash: false,
            created_at: Utc::now(),
        }
    }
}

impl Task {
    #[inline]
    pub fn is_recurring(&self) -> bool {
        self.recurrence_rule.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    #[serde(flatten)]
    pub task: Task,
    pub completion_instances: Vec<CompletionInstance>,
}

/// A candidate task together with the records the planner renders with it.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskWithRelations {
    pub task: Task,
    pub label: Option<Label>,
    pub completion_instances: Vec<CompletionInstance>,
    pub subtasks: Vec<Subtask>,
}

impl TaskWithRelations {
    pub fn new(task: Task) -> Self {
        Self {
            task,
            label: None,
            completion_instances: Vec::new(),
            subtasks: Vec::new(),
        }
    }
}

// ============================================================================
// Recurrence rules
// ============================================================================

/// Recurrence frequency. Stored either as the RFC 5545 name or as the
/// numeric code used by rrule.js (0 = yearly .. 6 = secondly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FrequencyRepr", into = "String")]
pub enum Frequency {
    Yearly,
    Monthly,
    Weekly,
    Daily,
    Hourly,
    Minutely,
    Secondly,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrequencyRepr {
    Code(u8),
    Name(String),
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid recurrence frequency: {0}")]
pub struct ParseFrequencyError(String);

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Yearly => "YEARLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Daily => "DAILY",
            Frequency::Hourly => "HOURLY",
            Frequency::Minutely => "MINUTELY",
            Frequency::Secondly => "SECONDLY",
        }
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "YEARLY" => Ok(Frequency::Yearly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "WEEKLY" => Ok(Frequency::Weekly),
            "DAILY" => Ok(Frequency::Daily),
            "HOURLY" => Ok(Frequency::Hourly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "SECONDLY" => Ok(Frequency::Secondly),
            _ => Err(ParseFrequencyError(s.to_string())),
        }
    }
}

impl TryFrom<FrequencyRepr> for Frequency {
    type Error = ParseFrequencyError;

    fn try_from(repr: FrequencyRepr) -> Result<Self, Self::Error> {
        match repr {
            FrequencyRepr::Code(0) => Ok(Frequency::Yearly),
            FrequencyRepr::Code(1) => Ok(Frequency::Monthly),
            FrequencyRepr::Code(2) => Ok(Frequency::Weekly),
            FrequencyRepr::Code(3) => Ok(Frequency::Daily),
            FrequencyRepr::Code(4) => Ok(Frequency::Hourly),
            FrequencyRepr::Code(5) => Ok(Frequency::Minutely),
            FrequencyRepr::Code(6) => Ok(Frequency::Secondly),
            FrequencyRepr::Code(other) => Err(ParseFrequencyError(other.to_string())),
            FrequencyRepr::Name(name) => name.parse(),
        }
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.as_str().to_string()
    }
}

/// A weekday constraint, optionally with an ordinal (`+1MO`, `-1FR`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WeekdayRepr", into = "String")]
pub struct RuleWeekday {
    pub day: chrono::Weekday,
    pub n: Option<i16>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeekdayRepr {
    Code(u8),
    Name(String),
    Nth { weekday: u8, n: Option<i16> },
}

#[derive(Error, Debug, PartialEq)]
#[error("Invalid weekday: {0}")]
pub struct ParseWeekdayError(String);

impl RuleWeekday {
    pub fn every(day: chrono::Weekday) -> Self {
        Self { day, n: None }
    }

    fn from_code(code: u8) -> Result<chrono::Weekday, ParseWeekdayError> {
        use chrono::Weekday::*;
        // rrule.js numbering starts the week on Monday
        match code {
            0 => Ok(Mon),
            1 => Ok(Tue),
            2 => Ok(Wed),
            3 => Ok(Thu),
            4 => Ok(Fri),
            5 => Ok(Sat),
            6 => Ok(Sun),
            _ => Err(ParseWeekdayError(code.to_string())),
        }
    }

    fn abbreviation(day: chrono::Weekday) -> &'static str {
        use chrono::Weekday::*;
        match day {
            Mon => "MO",
            Tue => "TU",
            Wed => "WE",
            Thu => "TH",
            Fri => "FR",
            Sat => "SA",
            Sun => "SU",
        }
    }
}

impl fmt::Display for RuleWeekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.n {
            Some(n) => write!(f, "{}{}", n, Self::abbreviation(self.day)),
            None => write!(f, "{}", Self::abbreviation(self.day)),
        }
    }
}

impl FromStr for RuleWeekday {
    type Err = ParseWeekdayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use chrono::Weekday::*;
        let s = s.trim().to_uppercase();
        if s.len() < 2 || !s.is_ascii() {
            return Err(ParseWeekdayError(s));
        }
        let (ordinal, name) = s.split_at(s.len() - 2);
        let day = match name {
            "MO" => Mon,
            "TU" => Tue,
            "WE" => Wed,
            "TH" => Thu,
            "FR" => Fri,
            "SA" => Sat,
            "SU" => Sun,
            _ => return Err(ParseWeekdayError(s.clone())),
        };
        let n = if ordinal.is_empty() {
            None
        } else {
            let n: i16 = ordinal
                .trim_start_matches('+')
                .parse()
                .map_err(|_| ParseWeekdayError(s.clone()))?;
            Some(n)
        };
        Ok(Self { day, n })
    }
}

impl TryFrom<WeekdayRepr> for RuleWeekday {
    type Error = ParseWeekdayError;

    fn try_from(repr: WeekdayRepr) -> Result<Self, Self::Error> {
        match repr {
            WeekdayRepr::Code(code) => Ok(Self::every(Self::from_code(code)?)),
            WeekdayRepr::Name(name) => name.parse(),
            WeekdayRepr::Nth { weekday, n } => Ok(Self {
                day: Self::from_code(weekday)?,
                n: n.filter(|n| *n != 0),
            }),
        }
    }
}

impl From<RuleWeekday> for String {
    fn from(weekday: RuleWeekday) -> Self {
        weekday.to_string()
    }
}

/// Structured recurrence rule following the iCalendar RRULE model.
///
/// Field names match the JSON stored by the web client, so a rule written
/// by rrule.js (`{"freq":2,"interval":1,"byweekday":[0],...}`) deserializes
/// directly. Unknown keys are ignored; `null` and single values are accepted
/// wherever a list is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub freq: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtstart: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wkst: Option<RuleWeekday>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub byweekday: Vec<RuleWeekday>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub bymonthday: Vec<i8>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub bymonth: Vec<u8>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub byyearday: Vec<i16>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub byweekno: Vec<i8>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub bysetpos: Vec<i32>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub byhour: Vec<u8>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub byminute: Vec<u8>,
    #[serde(default, deserialize_with = "one_or_many", skip_serializing_if = "Vec::is_empty")]
    pub bysecond: Vec<u8>,
}

impl RecurrenceRule {
    pub fn new(freq: Frequency) -> Self {
        Self {
            freq,
            interval: None,
            dtstart: None,
            until: None,
            count: None,
            wkst: None,
            byweekday: Vec::new(),
            bymonthday: Vec::new(),
            bymonth: Vec::new(),
            byyearday: Vec::new(),
            byweekno: Vec::new(),
            bysetpos: Vec::new(),
            byhour: Vec::new(),
            byminute: Vec::new(),
            bysecond: Vec::new(),
        }
    }

    pub fn from_json(raw: &str) -> Result<Option<Self>, serde_json::Error> {
        // A stored JSON `null` means "not recurring"
        serde_json::from_str::<Option<Self>>(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(value)) => vec![value],
        Some(OneOrMany::Many(values)) => values,
    })
}

// ============================================================================
// Data Transfer Objects (DTOs)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCollection {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    pub space_id: Uuid,
    #[serde(default)]
    pub invite_token: Option<String>,
    /// Users granted access besides the owning space
    #[serde(default)]
    pub invited_users: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabel {
    #[serde(default = "Uuid::now_v7")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    pub space_id: Uuid,
    /// Collections this label is attached to
    #[serde(default)]
    pub collections: Vec<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTaskData {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub space_id: Uuid,
    #[serde(default)]
    pub collection_id: Option<Uuid>,
    #[serde(default)]
    pub label_id: Option<Uuid>,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence_rule: Option<RecurrenceRule>,
    #[serde(default)]
    pub agenda_order: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub trash: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCompletion {
    pub task_id: Uuid,
    #[serde(default = "Utc::now")]
    pub completed_at: DateTime<Utc>,
    #[serde(default)]
    pub iteration: Option<DateTime<Utc>>,
}

/// Fixture format accepted by `agenda seed`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeedData {
    pub collections: Vec<NewCollection>,
    pub labels: Vec<NewLabel>,
    pub tasks: Vec<NewTaskData>,
    pub completions: Vec<NewCompletion>,
}
