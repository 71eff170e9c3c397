use chrono::Utc;
use log::debug;

use super::decode_all;
use crate::context::RequestContext;
use crate::error::Result;
use crate::heatmap::{aggregate, HeatmapQuery, HeatmapView, IssuePoint, POINT_COLUMNS};
use crate::postgrest::{Query, SortOrder, Table};
use crate::CivicClient;

/// Rows per request; matches PostgREST's default `max-rows`
pub const HEATMAP_PAGE_SIZE: usize = 1000;

pub struct HeatmapApi<'a> {
    client: &'a CivicClient,
}

impl<'a> HeatmapApi<'a> {
    pub(crate) fn new(client: &'a CivicClient) -> Self {
        Self { client }
    }

    /// Hotspots over every issue reported within the query's period.
    ///
    /// Reads only the grouping columns and pages until a short page comes
    /// back, so busy periods are not cut off at the server's row cap.
    pub async fn hotspots(&self, ctx: &RequestContext, query: HeatmapQuery) -> Result<HeatmapView> {
        let mut base = Query::new()
            .select(POINT_COLUMNS)
            .gte("created_at", query.period.since(Utc::now()).to_rfc3339())
            .newest_first()
            .order("id", SortOrder::Ascending)
            .limit(HEATMAP_PAGE_SIZE);
        if let Some(category) = query.category {
            base = base.eq("category", category.as_str());
        }

        let mut points: Vec<IssuePoint> = Vec::new();
        loop {
            let page = base.clone().offset(points.len());
            let rows = self.client.store.select(ctx, Table::Issues, &page).await?;
            let fetched = rows.len();
            points.extend(decode_all::<IssuePoint>(rows)?);
            if fetched < HEATMAP_PAGE_SIZE {
                break;
            }
        }
        debug!("Heatmap over {} issues", points.len());
        Ok(aggregate(&points, query))
    }
}
