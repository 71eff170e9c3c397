//! In-process record store
//!
//! Rows live as JSON objects per table behind one lock. Filters, ordering,
//! foreign-key embeds and the unique constraints of the shipped schema are
//! emulated closely enough for the data access layer to run unchanged. The
//! vote and comment counter triggers run inside the same write lock as the
//! row change, so counters never drift.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::debug;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::leaderboard::total_score;
use crate::models::Period;
use crate::postgrest::{Filter, FilterOperator, Query, RecordStore, SortOrder, Table};

/// Every table's rows, in insertion order
pub type Tables = HashMap<Table, Vec<Value>>;

/// Stored procedure body; runs with the tables write-locked
pub type Procedure = Box<dyn Fn(&mut Tables, Value) -> Result<Value> + Send + Sync>;

const UNIQUE_KEYS: &[(Table, &[&str])] = &[
    (Table::Profiles, &["id"]),
    (Table::IssueVotes, &["issue_id", "user_id"]),
    (Table::Bids, &["tender_id", "user_id"]),
];

struct State {
    tables: Tables,
    last_stamp: DateTime<Utc>,
}

/// Record store held entirely in memory
pub struct MemoryStore {
    state: RwLock<State>,
    procedures: RwLock<HashMap<String, Procedure>>,
    failing_inserts: RwLock<HashMap<Table, String>>,
    counter_triggers: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store with the counter triggers and built-in procedures installed
    pub fn new() -> Self {
        let store = Self {
            state: RwLock::new(State {
                tables: Tables::new(),
                last_stamp: DateTime::<Utc>::MIN_UTC,
            }),
            procedures: RwLock::new(HashMap::new()),
            failing_inserts: RwLock::new(HashMap::new()),
            counter_triggers: true,
        };
        store.register_procedure("increment_post_counter", increment_post_counter);
        store.register_procedure("get_leaderboard", get_leaderboard);
        store
    }

    /// Store without counter triggers, like a schema that never installed them
    pub fn without_counter_triggers(mut self) -> Self {
        self.counter_triggers = false;
        self
    }

    /// Install or replace a stored procedure
    pub fn register_procedure<F>(&self, name: &str, procedure: F)
    where
        F: Fn(&mut Tables, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.procedures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Box::new(procedure));
    }

    /// Make every insert into `table` fail with a 500 carrying `message`
    pub fn fail_inserts_into(&self, table: Table, message: &str) {
        self.failing_inserts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table, message.to_string());
    }

    /// Undo [`MemoryStore::fail_inserts_into`]
    pub fn heal_inserts_into(&self, table: Table) {
        self.failing_inserts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&table);
    }

    /// Insert rows directly, bypassing failure injection. Returns the stored rows.
    pub fn seed(&self, table: Table, rows: Vec<Value>) -> Result<Vec<Value>> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        rows.into_iter()
            .map(|row| self.insert_locked(&mut state, table, row))
            .collect()
    }

    /// Snapshot of a table in insertion order
    pub fn rows(&self, table: Table) -> Vec<Value> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.tables.get(&table).cloned().unwrap_or_default()
    }

    /// Overwrite one column on the row with `id`, skipping triggers
    pub fn set_column(&self, table: Table, id: &str, column: &str, value: Value) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let Some(rows) = state.tables.get_mut(&table) else {
            return false;
        };
        match rows.iter_mut().find(|row| row["id"] == id) {
            Some(row) => {
                row[column] = value;
                true
            }
            None => false,
        }
    }

    /// Strictly increasing timestamp so newest-first order is total
    fn next_stamp(state: &mut State) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = if now > state.last_stamp {
            now
        } else {
            state.last_stamp + Duration::microseconds(1)
        };
        state.last_stamp = stamp;
        stamp
    }

    fn insert_locked(&self, state: &mut State, table: Table, row: Value) -> Result<Value> {
        let Value::Object(mut row) = row else {
            return Err(Error::api(400, "row must be a JSON object"));
        };

        if row.get("id").map_or(true, Value::is_null) {
            row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
        }
        if row.get("created_at").map_or(true, Value::is_null) {
            let stamp = Self::next_stamp(state);
            row.insert("created_at".to_string(), json!(format_stamp(stamp)));
        }
        if table == Table::Issues && row.get("updated_at").map_or(true, Value::is_null) {
            let created = row.get("created_at").cloned().unwrap_or(Value::Null);
            row.insert("updated_at".to_string(), created);
        }

        let row = Value::Object(row);
        let rows = state.tables.entry(table).or_default();
        check_unique(table, rows, &row)?;
        rows.push(row.clone());

        self.run_triggers(&mut state.tables, table, &[row.clone()]);
        Ok(row)
    }

    /// Recount issue counters touched by changes to vote or comment rows
    fn run_triggers(&self, tables: &mut Tables, table: Table, changed: &[Value]) {
        if !self.counter_triggers || !matches!(table, Table::IssueVotes | Table::IssueComments) {
            return;
        }
        let issue_ids: HashSet<String> = changed
            .iter()
            .filter_map(|row| row.get("issue_id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        for issue_id in issue_ids {
            recount_issue(tables, &issue_id);
        }
    }
}

fn format_stamp(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn check_unique(table: Table, rows: &[Value], row: &Value) -> Result<()> {
    let Some((_, columns)) = UNIQUE_KEYS.iter().find(|(t, _)| *t == table) else {
        return Ok(());
    };
    let clash = rows
        .iter()
        .any(|existing| columns.iter().all(|c| existing.get(*c) == row.get(*c)));
    if clash {
        return Err(Error::api(
            409,
            format!(
                "duplicate key value violates unique constraint \"{}_{}_key\"",
                table,
                columns.join("_")
            ),
        ));
    }
    Ok(())
}

fn count_where(tables: &Tables, table: Table, predicate: impl Fn(&Value) -> bool) -> i64 {
    tables
        .get(&table)
        .map_or(0, |rows| rows.iter().filter(|row| predicate(row)).count() as i64)
}

const COUNTER_COLUMNS: [&str; 3] = ["upvotes", "downvotes", "comments_count"];

fn true_counters(tables: &Tables, issue_id: &str) -> [i64; 3] {
    let votes_of = |kind: &'static str| {
        move |row: &Value| row["issue_id"] == issue_id && row["vote_type"] == kind
    };
    [
        count_where(tables, Table::IssueVotes, votes_of("upvote")),
        count_where(tables, Table::IssueVotes, votes_of("downvote")),
        count_where(tables, Table::IssueComments, |row| row["issue_id"] == issue_id),
    ]
}

/// Counter columns belong to the recount trigger; a patch may only write the true counts
fn guard_issue_counters(tables: &Tables, filters: &[Filter], patch: &Map<String, Value>) -> Result<()> {
    if !COUNTER_COLUMNS.iter().any(|c| patch.contains_key(*c)) {
        return Ok(());
    }
    let Some(rows) = tables.get(&Table::Issues) else {
        return Ok(());
    };
    for row in rows.iter().filter(|row| matches_all(row, filters)) {
        let issue_id = row["id"].as_str().unwrap_or_default();
        let counts = true_counters(tables, issue_id);
        for (column, count) in COUNTER_COLUMNS.iter().zip(counts) {
            if let Some(value) = patch.get(*column) {
                if value.as_i64() != Some(count) {
                    return Err(Error::api(
                        403,
                        format!("{} on issue {} is maintained by the store", column, issue_id),
                    ));
                }
            }
        }
    }
    Ok(())
}

fn recount_issue(tables: &mut Tables, issue_id: &str) {
    let [upvotes, downvotes, comments] = true_counters(tables, issue_id);

    if let Some(issue) = tables
        .get_mut(&Table::Issues)
        .and_then(|rows| rows.iter_mut().find(|row| row["id"] == issue_id))
    {
        debug!(
            "Recounted issue {}: {} up, {} down, {} comments",
            issue_id, upvotes, downvotes, comments
        );
        issue["upvotes"] = json!(upvotes);
        issue["downvotes"] = json!(downvotes);
        issue["comments_count"] = json!(comments);
    }
}

// ---------------------------------------------------------------------------
// Filtering and ordering
// ---------------------------------------------------------------------------

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Compare a stored value with a filter operand the way Postgres would for
/// the column's type: numbers numerically, timestamps chronologically.
fn compare(stored: &Value, operand: &str) -> Option<Ordering> {
    match stored {
        Value::Number(n) => {
            let lhs = n.as_f64()?;
            let rhs: f64 = operand.parse().ok()?;
            lhs.partial_cmp(&rhs)
        }
        Value::Bool(b) => {
            let rhs: bool = operand.parse().ok()?;
            Some(b.cmp(&rhs))
        }
        Value::String(s) => {
            if let (Ok(lhs), Ok(rhs)) = (
                DateTime::parse_from_rfc3339(s),
                DateTime::parse_from_rfc3339(operand),
            ) {
                return Some(lhs.cmp(&rhs));
            }
            Some(s.as_str().cmp(operand))
        }
        _ => None,
    }
}

fn matches_filter(row: &Value, filter: &Filter) -> bool {
    let stored = row.get(&filter.column).unwrap_or(&Value::Null);
    let operand = filter.value();
    match filter.operator {
        FilterOperator::Eq => compare(stored, operand) == Some(Ordering::Equal),
        FilterOperator::Neq => {
            !stored.is_null() && compare(stored, operand) != Some(Ordering::Equal)
        }
        FilterOperator::Gt => compare(stored, operand) == Some(Ordering::Greater),
        FilterOperator::Gte => matches!(
            compare(stored, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::Lt => compare(stored, operand) == Some(Ordering::Less),
        FilterOperator::Lte => matches!(
            compare(stored, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::In => filter
            .values
            .iter()
            .any(|v| compare(stored, v) == Some(Ordering::Equal)),
        FilterOperator::Is => match operand {
            "null" => stored.is_null(),
            "true" => stored == &Value::Bool(true),
            "false" => stored == &Value::Bool(false),
            _ => false,
        },
    }
}

fn matches_all(row: &Value, filters: &[Filter]) -> bool {
    filters.iter().all(|f| matches_filter(row, f))
}

/// Ordering of two stored values; nulls sort last
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        _ => {}
    }
    value_text(b)
        .and_then(|rhs| compare(a, &rhs))
        .unwrap_or(Ordering::Equal)
}

fn sort_rows(rows: &mut [Value], order: &[(String, SortOrder)]) {
    rows.sort_by(|a, b| {
        for (column, direction) in order {
            let lhs = a.get(column).unwrap_or(&Value::Null);
            let rhs = b.get(column).unwrap_or(&Value::Null);
            let ordering = match direction {
                SortOrder::Ascending => compare_values(lhs, rhs),
                SortOrder::Descending => compare_values(rhs, lhs),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

// ---------------------------------------------------------------------------
// Embeds: `alias:table!fk_column(col, ...)`
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq)]
struct Embed {
    alias: String,
    table: Table,
    column: String,
    fields: Vec<String>,
}

/// Split on commas that are not inside parentheses
fn split_top_level(select: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in select.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(select[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(select[start..].trim());
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn parse_embeds(select: &str) -> Result<Vec<Embed>> {
    let mut embeds = Vec::new();
    for item in split_top_level(select) {
        let Some(open) = item.find('(') else {
            continue;
        };
        let head = &item[..open];
        let fields = item[open + 1..item.len().saturating_sub(1)]
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();
        let (alias, target) = match head.split_once(':') {
            Some((alias, target)) => (Some(alias), target),
            None => (None, head),
        };
        let (table_name, column) = target
            .split_once('!')
            .ok_or_else(|| Error::api(400, format!("embed {} needs a !column hint", head)))?;
        let alias = alias.unwrap_or(table_name);
        let table = Table::from_name(table_name)
            .ok_or_else(|| Error::api(400, format!("unknown table {}", table_name)))?;
        embeds.push(Embed {
            alias: alias.trim().to_string(),
            table,
            column: column.trim().to_string(),
            fields,
        });
    }
    Ok(embeds)
}

fn project(row: &Value, fields: &[String]) -> Value {
    if fields.iter().any(|f| f == "*") {
        return row.clone();
    }
    let mut out = Map::new();
    for field in fields {
        out.insert(field.clone(), row.get(field).cloned().unwrap_or(Value::Null));
    }
    Value::Object(out)
}

/// Attach embeds. A hint column present on the parent row points at the
/// target's id (to-one); otherwise the target points back at the parent (to-many).
fn apply_embeds(tables: &Tables, rows: &mut [Value], embeds: &[Embed]) {
    let empty = Vec::new();
    for embed in embeds {
        let targets = tables.get(&embed.table).unwrap_or(&empty);
        for row in rows.iter_mut() {
            let embedded = match row.get(&embed.column) {
                Some(key) => targets
                    .iter()
                    .find(|t| t.get("id") == Some(key) && !key.is_null())
                    .map_or(Value::Null, |t| project(t, &embed.fields)),
                None => Value::Array(
                    targets
                        .iter()
                        .filter(|t| t.get(&embed.column) == row.get("id"))
                        .map(|t| project(t, &embed.fields))
                        .collect(),
                ),
            };
            row[embed.alias.as_str()] = embedded;
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn select(&self, _ctx: &RequestContext, table: Table, query: &Query) -> Result<Vec<Value>> {
        let embeds = parse_embeds(&query.select)?;
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        let mut rows: Vec<Value> = state
            .tables
            .get(&table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(row, &query.filters))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        sort_rows(&mut rows, &query.order);
        if let Some(offset) = query.offset {
            rows.drain(..offset.min(rows.len()));
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        apply_embeds(&state.tables, &mut rows, &embeds);
        Ok(rows)
    }

    async fn count(&self, _ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        Ok(count_where(&state.tables, table, |row| matches_all(row, filters)) as u64)
    }

    async fn insert(&self, _ctx: &RequestContext, table: Table, row: Value) -> Result<Value> {
        if let Some(message) = self
            .failing_inserts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&table)
        {
            return Err(Error::api(500, message));
        }
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        self.insert_locked(&mut state, table, row)
    }

    async fn update(
        &self,
        _ctx: &RequestContext,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>> {
        let Value::Object(patch) = patch else {
            return Err(Error::api(400, "patch must be a JSON object"));
        };
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if table == Table::Issues && self.counter_triggers {
            guard_issue_counters(&state.tables, filters, &patch)?;
        }
        let stamp = format_stamp(Self::next_stamp(&mut state));

        let mut before = Vec::new();
        let mut updated = Vec::new();
        if let Some(rows) = state.tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|row| matches_all(row, filters)) {
                before.push(row.clone());
                for (key, value) in &patch {
                    row[key.as_str()] = value.clone();
                }
                if table == Table::Issues && !patch.contains_key("updated_at") {
                    row["updated_at"] = json!(stamp);
                }
                updated.push(row.clone());
            }
        }

        before.extend(updated.iter().cloned());
        self.run_triggers(&mut state.tables, table, &before);
        Ok(updated)
    }

    async fn delete(&self, _ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed: Vec<Value> = match state.tables.get_mut(&table) {
            Some(rows) => {
                let (gone, kept): (Vec<Value>, Vec<Value>) =
                    rows.drain(..).partition(|row| matches_all(row, filters));
                *rows = kept;
                gone
            }
            None => Vec::new(),
        };
        self.run_triggers(&mut state.tables, table, &removed);
        Ok(removed.len() as u64)
    }

    async fn rpc(&self, _ctx: &RequestContext, function: &str, params: Value) -> Result<Value> {
        let procedures = self.procedures.read().unwrap_or_else(PoisonError::into_inner);
        let procedure = procedures.get(function).ok_or_else(|| {
            Error::api(
                404,
                format!("Could not find the function public.{} in the schema cache", function),
            )
        })?;
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        procedure(&mut state.tables, params)
    }
}

// ---------------------------------------------------------------------------
// Built-in procedures, mirroring supabase/migrations
// ---------------------------------------------------------------------------

fn increment_post_counter(tables: &mut Tables, params: Value) -> Result<Value> {
    let post_id = params["p_post_id"]
        .as_str()
        .ok_or_else(|| Error::api(400, "p_post_id is required"))?;
    let column = match params["p_column"].as_str() {
        Some(column @ ("likes" | "shares")) => column,
        other => {
            return Err(Error::api(400, format!("unsupported counter {:?}", other)));
        }
    };
    let post = tables
        .get_mut(&Table::CommunityPosts)
        .and_then(|rows| rows.iter_mut().find(|row| row["id"] == post_id))
        .ok_or_else(|| Error::not_found(format!("post {}", post_id)))?;
    let next = post[column].as_i64().unwrap_or(0) + 1;
    post[column] = json!(next);
    Ok(json!(next))
}

fn created_since(row: &Value, since: &DateTime<Utc>) -> bool {
    row["created_at"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map_or(false, |created| created >= *since)
}

fn get_leaderboard(tables: &mut Tables, params: Value) -> Result<Value> {
    let period: Period = params["p_window"].as_str().unwrap_or("month").parse()?;
    let since = period.since(Utc::now());
    let tables: &Tables = tables;
    let empty = Vec::new();
    let profiles = tables.get(&Table::Profiles).unwrap_or(&empty);

    let mut rows: Vec<Value> = profiles
        .iter()
        .filter_map(|profile| {
            let user_id = profile["id"].as_str()?;
            let reported = |row: &Value| row["user_id"] == user_id && created_since(row, &since);
            let issues_reported = count_where(tables, Table::Issues, &reported);
            let issues_resolved = count_where(tables, Table::Issues, |row| {
                reported(row) && row["status"] == "resolved"
            });
            let posts_created = count_where(tables, Table::CommunityPosts, &reported);
            let score = total_score(issues_reported, issues_resolved, posts_created);
            (score > 0).then(|| {
                json!({
                    "user_id": user_id,
                    "full_name": profile["full_name"],
                    "avatar_url": profile.get("avatar_url").cloned().unwrap_or(Value::Null),
                    "issues_reported": issues_reported,
                    "issues_resolved": issues_resolved,
                    "posts_created": posts_created,
                    "total_score": score,
                })
            })
        })
        .collect();
    sort_rows(&mut rows, &[("total_score".to_string(), SortOrder::Descending)]);
    Ok(Value::Array(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext::anonymous()
    }

    #[test]
    fn parses_embed_hints() {
        let embeds = parse_embeds("*, reporter:profiles!user_id(full_name,email), bids!tender_id(*)").unwrap();
        assert_eq!(
            embeds,
            vec![
                Embed {
                    alias: "reporter".into(),
                    table: Table::Profiles,
                    column: "user_id".into(),
                    fields: vec!["full_name".into(), "email".into()],
                },
                Embed {
                    alias: "bids".into(),
                    table: Table::Bids,
                    column: "tender_id".into(),
                    fields: vec!["*".into()],
                },
            ]
        );
        assert!(parse_embeds("*, profiles(email)").is_err());
    }

    #[test]
    fn filters_compare_by_type() {
        let row = json!({ "n": 5, "t": "2024-01-02T00:00:00Z", "s": "roads", "b": true, "z": null });
        assert!(matches_filter(&row, &Filter::gte("n", 5)));
        assert!(!matches_filter(&row, &Filter::gte("n", 10)));
        assert!(matches_filter(&row, &Filter::gte("t", "2024-01-01T00:00:00+00:00")));
        assert!(matches_filter(&row, &Filter::eq("s", "roads")));
        assert!(matches_filter(&row, &Filter::in_list("s", &["safety", "roads"])));
        assert!(matches_filter(&row, &Filter::new("z", FilterOperator::Is, "null")));
        assert!(matches_filter(&row, &Filter::eq("b", true)));
        assert!(!matches_filter(&row, &Filter::eq("missing", "x")));
    }

    #[tokio::test]
    async fn insert_stamps_id_and_time() {
        let store = MemoryStore::new();
        let row = store
            .insert(&ctx(), Table::Feedback, json!({ "content": "hi" }))
            .await
            .unwrap();
        assert!(row["id"].as_str().is_some());
        assert!(row["created_at"].as_str().is_some());
        assert_eq!(store.rows(Table::Feedback).len(), 1);
    }

    #[tokio::test]
    async fn newest_first_is_total_for_fast_inserts() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store
                .insert(&ctx(), Table::Feedback, json!({ "content": i.to_string() }))
                .await
                .unwrap();
        }
        let rows = store
            .select(&ctx(), Table::Feedback, &Query::new().newest_first())
            .await
            .unwrap();
        let order: Vec<&str> = rows.iter().filter_map(|r| r["content"].as_str()).collect();
        assert_eq!(order, vec!["4", "3", "2", "1", "0"]);
    }

    #[tokio::test]
    async fn unique_vote_per_issue_and_user() {
        let store = MemoryStore::new();
        let vote = json!({ "issue_id": "i1", "user_id": "u1", "vote_type": "upvote" });
        store.insert(&ctx(), Table::IssueVotes, vote.clone()).await.unwrap();
        match store.insert(&ctx(), Table::IssueVotes, vote).await {
            Err(Error::Api { status: 409, .. }) => {}
            other => panic!("Expected 409, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn triggers_keep_issue_counters_in_step() {
        let store = MemoryStore::new();
        store
            .seed(Table::Issues, vec![json!({ "id": "i1", "upvotes": 0, "downvotes": 0, "comments_count": 0 })])
            .unwrap();

        store
            .insert(&ctx(), Table::IssueVotes, json!({ "issue_id": "i1", "user_id": "u1", "vote_type": "upvote" }))
            .await
            .unwrap();
        store
            .insert(&ctx(), Table::IssueComments, json!({ "issue_id": "i1", "user_id": "u1", "content": "+1" }))
            .await
            .unwrap();
        assert_eq!(store.rows(Table::Issues)[0]["upvotes"], 1);
        assert_eq!(store.rows(Table::Issues)[0]["comments_count"], 1);

        store
            .update(
                &ctx(),
                Table::IssueVotes,
                &[Filter::eq("issue_id", "i1"), Filter::eq("user_id", "u1")],
                json!({ "vote_type": "downvote" }),
            )
            .await
            .unwrap();
        let issue = &store.rows(Table::Issues)[0];
        assert_eq!((issue["upvotes"].as_i64(), issue["downvotes"].as_i64()), (Some(0), Some(1)));

        store
            .delete(&ctx(), Table::IssueVotes, &[Filter::eq("issue_id", "i1")])
            .await
            .unwrap();
        assert_eq!(store.rows(Table::Issues)[0]["downvotes"], 0);
    }

    #[tokio::test]
    async fn counters_refuse_hand_written_values() {
        let store = MemoryStore::new();
        store
            .seed(Table::Issues, vec![json!({ "id": "i1", "status": "pending", "upvotes": 0 })])
            .unwrap();
        store
            .insert(&ctx(), Table::IssueVotes, json!({ "issue_id": "i1", "user_id": "u1", "vote_type": "upvote" }))
            .await
            .unwrap();
        let only_i1 = [Filter::eq("id", "i1")];

        match store
            .update(&ctx(), Table::Issues, &only_i1, json!({ "title": "Pothole", "upvotes": 999 }))
            .await
        {
            Err(Error::Api { status: 403, .. }) => {}
            other => panic!("Expected 403, got {:?}", other),
        }
        let issue = &store.rows(Table::Issues)[0];
        assert_eq!(issue["upvotes"], 1);
        assert!(issue.get("title").is_none());

        store
            .update(&ctx(), Table::Issues, &only_i1, json!({ "upvotes": 1, "downvotes": 0 }))
            .await
            .unwrap();
        store
            .update(&ctx(), Table::Issues, &only_i1, json!({ "title": "Pothole" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn without_triggers_counters_stay_put() {
        let store = MemoryStore::new().without_counter_triggers();
        store
            .seed(Table::Issues, vec![json!({ "id": "i1", "upvotes": 0 })])
            .unwrap();
        store
            .insert(&ctx(), Table::IssueVotes, json!({ "issue_id": "i1", "user_id": "u1", "vote_type": "upvote" }))
            .await
            .unwrap();
        assert_eq!(store.rows(Table::Issues)[0]["upvotes"], 0);
    }

    #[tokio::test]
    async fn embeds_to_one_and_to_many() {
        let store = MemoryStore::new();
        store
            .seed(Table::Profiles, vec![json!({ "id": "u1", "email": "a@b.c", "full_name": "Asha" })])
            .unwrap();
        store
            .seed(Table::Tenders, vec![json!({ "id": "t1", "posted_by": "u1" })])
            .unwrap();
        store
            .seed(Table::Bids, vec![json!({ "tender_id": "t1", "user_id": "u1", "amount": 10.0 })])
            .unwrap();

        let rows = store
            .select(
                &ctx(),
                Table::Tenders,
                &Query::new().select("*, poster:profiles!posted_by(full_name), bids!tender_id(*)"),
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["poster"], json!({ "full_name": "Asha" }));
        assert_eq!(rows[0]["bids"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn post_counter_procedure_increments() {
        let store = MemoryStore::new();
        store
            .seed(Table::CommunityPosts, vec![json!({ "id": "p1", "likes": 2 })])
            .unwrap();
        let likes = store
            .rpc(&ctx(), "increment_post_counter", json!({ "p_post_id": "p1", "p_column": "likes" }))
            .await
            .unwrap();
        assert_eq!(likes, json!(3));
        assert!(store
            .rpc(&ctx(), "increment_post_counter", json!({ "p_post_id": "p1", "p_column": "id" }))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_procedure_is_404() {
        let store = MemoryStore::new();
        match store.rpc(&ctx(), "nope", json!({})).await {
            Err(Error::Api { status: 404, .. }) => {}
            other => panic!("Expected 404, got {:?}", other),
        }
    }
}
