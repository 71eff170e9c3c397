//! Relational storage through the PostgREST API

mod filter;
mod query;
mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::fetch::{Fetch, FetchBuilder};

pub use filter::*;
pub use query::*;
pub use types::*;

/// Row-level operations the data access layer needs from the remote store.
///
/// Rows travel as JSON; typed decoding happens in the data access layer.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read rows matching `query`
    async fn select(&self, ctx: &RequestContext, table: Table, query: &Query) -> Result<Vec<Value>>;

    /// Exact number of rows matching every filter
    async fn count(&self, ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64>;

    /// Insert one row and return it as stored
    async fn insert(&self, ctx: &RequestContext, table: Table, row: Value) -> Result<Value>;

    /// Patch matching rows and return them as stored
    async fn update(
        &self,
        ctx: &RequestContext,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>>;

    /// Delete matching rows, returning how many went away
    async fn delete(&self, ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64>;

    /// Call a stored procedure
    async fn rpc(&self, ctx: &RequestContext, function: &str, params: Value) -> Result<Value>;
}

/// Record store backed by a Supabase project's REST endpoint
pub struct PostgrestStore {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client
    client: Client,

    /// Non-default schema, sent as profile headers
    schema: Option<String>,

    /// Per-request timeout
    timeout: Option<Duration>,
}

impl PostgrestStore {
    /// Create a new store client
    pub fn new(url: &str, key: &str, client: Client) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            client,
            schema: None,
            timeout: None,
        }
    }

    /// Use a schema other than `public`
    pub fn with_schema(mut self, schema: &str) -> Self {
        self.schema = if schema == "public" {
            None
        } else {
            Some(schema.to_string())
        };
        self
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.url, table.as_str())
    }

    /// Apply key, bearer token and schema headers.
    ///
    /// Anonymous calls authenticate with the API key itself, as the JS client does.
    fn authorize<'a>(&self, fetch: FetchBuilder<'a>, ctx: &RequestContext) -> FetchBuilder<'a> {
        let token = ctx.access_token().unwrap_or(&self.key);
        let mut fetch = fetch
            .api_key(&self.key)
            .bearer_auth(token)
            .timeout(self.timeout);
        if let Some(schema) = &self.schema {
            fetch = fetch
                .header("Accept-Profile", schema)
                .header("Content-Profile", schema);
        }
        fetch
    }
}

fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters.iter().map(Filter::to_param).collect()
}

/// Total from a `Content-Range` header such as `0-24/3573` or `*/0`
pub(crate) fn parse_content_range_total(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl RecordStore for PostgrestStore {
    async fn select(&self, ctx: &RequestContext, table: Table, query: &Query) -> Result<Vec<Value>> {
        let url = self.table_url(table);
        let fetch = self
            .authorize(Fetch::get(&self.client, &url), ctx)
            .query(query.to_params());

        fetch.execute::<Vec<Value>>().await
    }

    async fn count(&self, ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64> {
        let url = self.table_url(table);
        let response = self
            .authorize(Fetch::head(&self.client, &url), ctx)
            .header("Prefer", "count=exact")
            .query_param("select", "*")
            .query(filter_params(filters))
            .send()
            .await?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| Error::api(response.status().as_u16(), "missing Content-Range count"))
    }

    async fn insert(&self, ctx: &RequestContext, table: Table, row: Value) -> Result<Value> {
        let url = self.table_url(table);
        let rows = self
            .authorize(Fetch::post(&self.client, &url), ctx)
            .header("Prefer", "return=representation")
            .json(&[row])?
            .execute::<Vec<Value>>()
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| Error::not_found(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        table: Table,
        filters: &[Filter],
        patch: Value,
    ) -> Result<Vec<Value>> {
        let url = self.table_url(table);
        self.authorize(Fetch::patch(&self.client, &url), ctx)
            .header("Prefer", "return=representation")
            .query(filter_params(filters))
            .json(&patch)?
            .execute::<Vec<Value>>()
            .await
    }

    async fn delete(&self, ctx: &RequestContext, table: Table, filters: &[Filter]) -> Result<u64> {
        let url = self.table_url(table);
        let rows = self
            .authorize(Fetch::delete(&self.client, &url), ctx)
            .header("Prefer", "return=representation")
            .query(filter_params(filters))
            .execute::<Vec<Value>>()
            .await?;

        Ok(rows.len() as u64)
    }

    async fn rpc(&self, ctx: &RequestContext, function: &str, params: Value) -> Result<Value> {
        let url = format!("{}/rest/v1/rpc/{}", self.url, function);
        self.authorize(Fetch::post(&self.client, &url), ctx)
            .json(&params)?
            .execute::<Value>()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn content_range_total() {
        assert_eq!(parse_content_range_total("0-24/3573"), Some(3573));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-24/*"), None);
    }

    #[tokio::test]
    async fn test_select_renders_filters_and_order() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/issues"))
            .and(query_param("status", "eq.pending"))
            .and(query_param("category", "eq.roads"))
            .and(query_param("order", "created_at.desc"))
            .and(header("apikey", "anon"))
            .and(header("Authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "1" }])))
            .expect(1)
            .mount(&mock_server)
            .await;

        let store = PostgrestStore::new(&mock_server.uri(), "anon", Client::new());
        let query = Query::new()
            .eq("status", "pending")
            .eq("category", "roads")
            .newest_first();
        let rows = store
            .select(&RequestContext::anonymous(), Table::Issues, &query)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_count_reads_content_range() {
        let mock_server = MockServer::start().await;

        Mock::given(method("HEAD"))
            .and(path("/rest/v1/issue_votes"))
            .and(query_param("issue_id", "eq.i1"))
            .and(header("Prefer", "count=exact"))
            .respond_with(ResponseTemplate::new(200).insert_header("Content-Range", "*/7"))
            .mount(&mock_server)
            .await;

        let store = PostgrestStore::new(&mock_server.uri(), "anon", Client::new());
        let count = store
            .count(
                &RequestContext::anonymous(),
                Table::IssueVotes,
                &[Filter::eq("issue_id", "i1")],
            )
            .await
            .unwrap();
        assert_eq!(count, 7);
    }

    #[tokio::test]
    async fn test_insert_returns_representation() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/feedback"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!([{ "content": "great app" }])))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!([{ "id": "f1", "content": "great app" }])),
            )
            .mount(&mock_server)
            .await;

        let store = PostgrestStore::new(&mock_server.uri(), "anon", Client::new());
        let row = store
            .insert(
                &RequestContext::anonymous(),
                Table::Feedback,
                json!({ "content": "great app" }),
            )
            .await
            .unwrap();
        assert_eq!(row["id"], "f1");
    }

    #[tokio::test]
    async fn test_constraint_violation_maps_to_api_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/issue_votes"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint",
                "details": null,
                "hint": null
            })))
            .mount(&mock_server)
            .await;

        let store = PostgrestStore::new(&mock_server.uri(), "anon", Client::new());
        let result = store
            .insert(&RequestContext::anonymous(), Table::IssueVotes, json!({}))
            .await;
        match result {
            Err(Error::Api { status, message }) => {
                assert_eq!(status, 409);
                assert!(message.contains("duplicate key"));
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }
}
