use chrono::{DateTime, Utc};
use rrule::{RRuleSet, Tz as RRuleTz};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{RecurrenceRule, Task};

const RFC5545_UTC_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Occurrences produced for one query window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrences {
    /// Occurrence times in UTC, ascending
    pub dates: Vec<DateTime<Utc>>,
    /// Whether generation stopped at a limit
    pub limited: bool,
}

/// Bounds on a single expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpansionLimits {
    /// Maximum occurrences returned
    pub max_occurrences: usize,
    /// Maximum rule steps walked, including those before the window
    pub max_iterations: usize,
}

impl ExpansionLimits {
    pub fn new(max_occurrences: usize, max_iterations: usize) -> Self {
        Self {
            max_occurrences,
            max_iterations,
        }
    }
}

/// RecurrenceExpander: turns a stored [`RecurrenceRule`] into concrete
/// occurrence timestamps.
///
/// Rule evaluation (RFC 5545 semantics including month lengths, leap years
/// and BYxxx expansion) is delegated to the `rrule` crate. The anchor is
/// always UTC; display timezones are applied afterwards by the caller.
#[derive(Debug, Clone)]
pub struct RecurrenceExpander {
    task_id: Uuid,
    rrule_string: String,
    rrule_set: RRuleSet,
}

impl RecurrenceExpander {
    /// Creates an expander for a rule.
    ///
    /// # Arguments
    /// * `task_id` - Owning task, reported in errors
    /// * `rule` - The structured rule
    /// * `fallback_anchor` - Used as DTSTART when the rule carries none
    ///
    /// # Returns
    /// * `Result<Self, CoreError>` - `InvalidRecurrence` when the rule has no
    ///   anchor or does not parse
    pub fn new(
        task_id: Uuid,
        rule: &RecurrenceRule,
        fallback_anchor: Option<DateTime<Utc>>,
    ) -> Result<Self, CoreError> {
        let dtstart = rule
            .dtstart
            .or(fallback_anchor)
            .ok_or_else(|| CoreError::InvalidRecurrence {
                task_id,
                reason: "rule has no dtstart and the task has no start".to_string(),
            })?;

        let rrule_string = to_rrule_string(rule, dtstart);
        let rrule_set = rrule_string
            .parse::<RRuleSet>()
            .map_err(|e| CoreError::InvalidRecurrence {
                task_id,
                reason: format!("failed to parse RRULE '{}': {}", rrule_string, e),
            })?;

        Ok(Self {
            task_id,
            rrule_string,
            rrule_set,
        })
    }

    /// Expander for a task, or `None` when the task does not recur.
    pub fn for_task(task: &Task) -> Result<Option<Self>, CoreError> {
        task.recurrence_rule
            .as_ref()
            .map(|rule| Self::new(task.id, rule, task.start))
            .transpose()
    }

    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    /// The RFC 5545 text the rule was evaluated from
    pub fn rrule_string(&self) -> &str {
        &self.rrule_string
    }

    /// Generates occurrences strictly inside `(start, end)`.
    ///
    /// # Arguments
    /// * `start` - Exclusive lower bound (UTC)
    /// * `end` - Exclusive upper bound (UTC)
    /// * `limits` - Output cap and iteration budget
    ///
    /// # Behavior
    /// - Walks the rule from its anchor; occurrences at or before `start`
    ///   are skipped but still spend the iteration budget
    /// - Stops at the first occurrence at or past `end`
    /// - Sets `limited` when either limit was reached before the window was
    ///   exhausted
    pub fn occurrences_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limits: ExpansionLimits,
    ) -> Occurrences {
        let mut dates = Vec::new();
        let mut limited = false;

        if start >= end {
            return Occurrences { dates, limited };
        }

        let bounded = self.rrule_set.clone().before(end.with_timezone(&RRuleTz::UTC));

        let mut iterations = 0usize;
        for dt in &bounded {
            if iterations == limits.max_iterations {
                limited = true;
                break;
            }
            iterations += 1;

            let occurrence = dt.with_timezone(&Utc);
            if occurrence <= start {
                continue;
            }
            if occurrence >= end {
                break;
            }
            if dates.len() == limits.max_occurrences {
                limited = true;
                break;
            }
            dates.push(occurrence);
        }

        Occurrences { dates, limited }
    }

    /// Checks that a rule can be evaluated, without keeping the expander.
    pub fn validate(
        rule: &RecurrenceRule,
        fallback_anchor: Option<DateTime<Utc>>,
    ) -> Result<(), CoreError> {
        Self::new(Uuid::nil(), rule, fallback_anchor).map(|_| ())
    }
}

/// Renders a rule as an RFC 5545 `DTSTART`/`RRULE` pair with a UTC anchor.
pub fn to_rrule_string(rule: &RecurrenceRule, dtstart: DateTime<Utc>) -> String {
    let mut out = format!(
        "DTSTART:{}\nRRULE:FREQ={}",
        dtstart.format(RFC5545_UTC_FORMAT),
        rule.freq.as_str()
    );

    if let Some(interval) = rule.interval {
        let _ = write!(out, ";INTERVAL={}", interval);
    }
    if let Some(until) = rule.until {
        let _ = write!(out, ";UNTIL={}", until.format(RFC5545_UTC_FORMAT));
    }
    if let Some(count) = rule.count {
        let _ = write!(out, ";COUNT={}", count);
    }
    if let Some(wkst) = rule.wkst {
        // WKST takes a plain weekday
        let _ = write!(out, ";WKST={}", crate::models::RuleWeekday::every(wkst.day));
    }
    push_list(&mut out, "BYDAY", &rule.byweekday);
    push_list(&mut out, "BYMONTHDAY", &rule.bymonthday);
    push_list(&mut out, "BYMONTH", &rule.bymonth);
    push_list(&mut out, "BYYEARDAY", &rule.byyearday);
    push_list(&mut out, "BYWEEKNO", &rule.byweekno);
    push_list(&mut out, "BYSETPOS", &rule.bysetpos);
    push_list(&mut out, "BYHOUR", &rule.byhour);
    push_list(&mut out, "BYMINUTE", &rule.byminute);
    push_list(&mut out, "BYSECOND", &rule.bysecond);

    out
}

fn push_list<T: std::fmt::Display>(out: &mut String, key: &str, values: &[T]) {
    if values.is_empty() {
        return;
    }
    let joined = values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",");
    let _ = write!(out, ";{}={}", key, joined);
}
