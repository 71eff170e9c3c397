use super::decode_all;
use crate::context::RequestContext;
use crate::error::Result;
use crate::models::MunicipalOfficial;
use crate::postgrest::{Query, SortOrder, Table};
use crate::CivicClient;

/// Directory of municipal officials
pub struct Officials<'a> {
    client: &'a CivicClient,
}

impl<'a> Officials<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Every official, by department then name
    pub async fn list(&self, ctx: &RequestContext) -> Result<Vec<MunicipalOfficial>> {
        let query = Query::new()
            .order("department", SortOrder::Ascending)
            .order("name", SortOrder::Ascending);
        let rows = self
            .client
            .store
            .select(ctx, Table::MunicipalOfficials, &query)
            .await?;
        decode_all(rows)
    }
}
