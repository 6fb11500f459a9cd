use crate::repository::PlannerQuery;
use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

/// Largest id list bound into one `IN (...)` clause. Longer lists are split
/// into several queries to stay under SQLite's host parameter limit.
pub const MAX_BOUND_IDS: usize = 500;

/// Utility functions for building the planner's SQL
pub struct SqlQueryBuilder;

impl SqlQueryBuilder {
    /// Build the full candidate-task query for a planner request.
    ///
    /// Tasks are filtered on four groups of conditions joined with AND:
    /// not trashed, collection membership (unless `all`), caller visibility,
    /// and date range (one-off tasks only; recurring tasks always pass).
    pub fn build_candidate_query<'a>(query: &'a PlannerQuery) -> QueryBuilder<'a, Sqlite> {
        let mut qb: QueryBuilder<'a, Sqlite> = QueryBuilder::new(
            "SELECT t.id, t.name, t.space_id, t.collection_id, t.label_id, t.parent_id, t.start, \
             t.recurrence_rule, t.agenda_order, t.pinned, t.note, t.trash, t.created_at \
             FROM tasks t WHERE t.trash = 0",
        );

        if !query.all {
            qb.push(" AND (");
            Self::build_collection_clause(query, &mut qb);
            qb.push(")");
        }

        qb.push(" AND (");
        Self::build_visibility_clause(query, &mut qb);
        qb.push(")");

        qb.push(" AND ((t.recurrence_rule IS NULL AND t.start >= ");
        qb.push_bind(query.range_start);
        qb.push(" AND t.start <= ");
        qb.push_bind(query.range_end);
        qb.push(") OR t.recurrence_rule IS NOT NULL)");

        qb.push(" ORDER BY t.agenda_order IS NULL, t.agenda_order ASC, t.id ASC");
        qb
    }

    /// Task belongs to the collection directly, or carries a label attached
    /// to it. The collection may be named by id or by invite token.
    fn build_collection_clause<'a>(query: &'a PlannerQuery, qb: &mut QueryBuilder<'a, Sqlite>) {
        let collection_id = Uuid::parse_str(query.collection.trim()).ok();

        if let Some(id) = collection_id {
            qb.push("t.collection_id = ");
            qb.push_bind(id);
            qb.push(" OR t.label_id IN (SELECT label_id FROM label_collections WHERE collection_id = ");
            qb.push_bind(id);
            qb.push(") OR ");
        }

        qb.push("t.collection_id IN (SELECT id FROM collections WHERE invite_token = ");
        qb.push_bind(query.collection.as_str());
        qb.push(") OR t.label_id IN (SELECT lc.label_id FROM label_collections lc \
                 JOIN collections c ON c.id = lc.collection_id WHERE c.invite_token = ");
        qb.push_bind(query.collection.as_str());
        qb.push(")");
    }

    /// Caller can see the task through their space, an invitation to the
    /// task's collection (or a collection holding its label), or the invite
    /// token used for this request.
    fn build_visibility_clause<'a>(query: &'a PlannerQuery, qb: &mut QueryBuilder<'a, Sqlite>) {
        if let Some(space_id) = query.space_id {
            qb.push("t.space_id = ");
            qb.push_bind(space_id);
            qb.push(" OR ");
        }

        if let Some(user_id) = query.user_id {
            qb.push("t.collection_id IN (SELECT collection_id FROM collection_invites WHERE user_id = ");
            qb.push_bind(user_id);
            qb.push(") OR t.label_id IN (SELECT lc.label_id FROM label_collections lc \
                     JOIN collection_invites ci ON ci.collection_id = lc.collection_id WHERE ci.user_id = ");
            qb.push_bind(user_id);
            qb.push(") OR ");
        }

        qb.push("t.collection_id IN (SELECT id FROM collections WHERE invite_token = ");
        qb.push_bind(query.collection.as_str());
        qb.push(") OR t.label_id IN (SELECT lc.label_id FROM label_collections lc \
                 JOIN collections c ON c.id = lc.collection_id WHERE c.invite_token = ");
        qb.push_bind(query.collection.as_str());
        qb.push(")");
    }

    /// Append `(?, ?, ...)` for an id list. Callers keep lists at or below
    /// [`MAX_BOUND_IDS`] entries.
    pub fn push_id_list<'a>(ids: &'a [Uuid], qb: &mut QueryBuilder<'a, Sqlite>) {
        qb.push("(");
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");
    }
}
