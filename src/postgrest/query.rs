//! Query builder for record store reads

use super::filter::*;
use super::types::SortOrder;

/// Read query: projection, predicates, ordering and limit
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// Select expression, including embedded relations
    pub select: String,

    /// Predicates, combined with AND
    pub filters: Vec<Filter>,

    /// Sort keys, applied in order
    pub order: Vec<(String, SortOrder)>,

    /// Maximum rows returned
    pub limit: Option<usize>,

    /// Rows skipped before the first one returned
    pub offset: Option<usize>,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl Query {
    /// Create a new query selecting every column
    pub fn new() -> Self {
        Self::default()
    }

    /// Select specific columns or embedded relations
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    /// Add a predicate
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(self, column: &str, value: T) -> Self {
        self.filter(Filter::eq(column, value))
    }

    /// Filter rows where column is greater than or equal to a value
    pub fn gte<T: ToString>(self, column: &str, value: T) -> Self {
        self.filter(Filter::gte(column, value))
    }

    /// Filter rows where column is less than or equal to a value
    pub fn lte<T: ToString>(self, column: &str, value: T) -> Self {
        self.filter(Filter::lte(column, value))
    }

    /// Order the results by a column
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    /// Newest rows first
    pub fn newest_first(self) -> Self {
        self.order("created_at", SortOrder::Descending)
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Skip the first `count` rows
    pub fn offset(mut self, count: usize) -> Self {
        self.offset = Some(count);
        self
    }

    /// Render as PostgREST query pairs
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().map(Filter::to_param));
        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, dir)| format!("{}.{}", column, dir.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset".to_string(), offset.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_columns_are_kept() {
        let params = Query::new()
            .gte("latitude", 1.0)
            .lte("latitude", 2.0)
            .newest_first()
            .limit(5)
            .offset(10)
            .to_params();
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("latitude".to_string(), "gte.1".to_string()),
                ("latitude".to_string(), "lte.2".to_string()),
                ("order".to_string(), "created_at.desc".to_string()),
                ("limit".to_string(), "5".to_string()),
                ("offset".to_string(), "10".to_string()),
            ]
        );
    }
}
