//! Data table component types.
//!
//! These types define the configuration for the list pages in the admin
//! panel, and the query (search, select filters, sort, page) a table is
//! currently showing. Everything round-trips through a plain GET query so
//! each view is linkable:
//!
//! ```text
//! /orders?q=ana&status=shipped&sort=-total&page=2
//! ```
//!
//! A leading `-` on `sort` means descending.

use url::form_urlencoded;

/// Column definition for a data table.
#[derive(Debug, Clone)]
pub struct TableColumn {
    /// Unique key for the column, also its `sort` value.
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    /// Whether the column is sortable.
    pub sortable: bool,
    /// Right-align numbers.
    pub numeric: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub fn sortable(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: true,
            numeric: false,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: false,
            numeric: false,
        }
    }

    #[must_use]
    pub const fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }
}

/// Option for select filters.
#[derive(Debug, Clone)]
pub struct FilterOption {
    /// Option value.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
        }
    }
}

/// Single-select filter definition. An empty value means "any".
#[derive(Debug, Clone)]
pub struct TableFilter {
    /// Filter parameter key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Available options.
    pub options: Vec<FilterOption>,
}

impl TableFilter {
    /// Create a select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            options,
        }
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone)]
pub struct DataTableConfig {
    /// Path the table lives at; links are built against it.
    pub base_path: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Filter definitions.
    pub filters: Vec<TableFilter>,
    /// Search placeholder text, `None` hides the search box.
    pub search_placeholder: Option<String>,
    /// Sort used when the query names none.
    pub default_sort: Sort,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            columns: vec![],
            filters: vec![],
            search_placeholder: None,
            default_sort: Sort::default(),
            empty_title: "No items found".to_string(),
            empty_description: None,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Show a search box with this placeholder.
    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = Some(placeholder.to_string());
        self
    }

    #[must_use]
    pub fn default_sort(mut self, key: &str, descending: bool) -> Self {
        self.default_sort = Sort {
            key: key.to_string(),
            descending,
        };
        self
    }

    /// Set empty state configuration.
    #[must_use]
    pub fn empty_state(mut self, title: &str, description: Option<&str>) -> Self {
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }

    fn is_sortable(&self, key: &str) -> bool {
        self.columns.iter().any(|c| c.sortable && c.key == key)
    }
}

/// Sort column and direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub descending: bool,
}

impl Sort {
    /// Query value: the key, prefixed with `-` when descending.
    #[must_use]
    pub fn as_param(&self) -> String {
        if self.descending {
            format!("-{}", self.key)
        } else {
            self.key.clone()
        }
    }
}

/// The view a table is currently showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub q: String,
    /// Values of the configured filters, in configuration order. Empty for
    /// "any".
    pub filters: Vec<(String, String)>,
    pub sort: Sort,
    pub page: usize,
}

impl TableQuery {
    /// Parse a raw query string against `config`. Unknown keys, unsortable
    /// sort keys and values outside a filter's options are ignored.
    #[must_use]
    pub fn parse(raw: Option<&str>, config: &DataTableConfig) -> Self {
        let mut query = Self {
            q: String::new(),
            filters: config
                .filters
                .iter()
                .map(|f| (f.key.clone(), String::new()))
                .collect(),
            sort: config.default_sort.clone(),
            page: 1,
        };
        let Some(raw) = raw else {
            return query;
        };

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            match key.as_ref() {
                "q" => query.q = value.to_string(),
                "page" => query.page = value.parse().unwrap_or(1).max(1),
                "sort" => {
                    let (descending, sort_key) = value
                        .strip_prefix('-')
                        .map_or((false, value), |k| (true, k));
                    if config.is_sortable(sort_key) {
                        query.sort = Sort {
                            key: sort_key.to_string(),
                            descending,
                        };
                    }
                }
                other => {
                    let known = config
                        .filters
                        .iter()
                        .find(|f| f.key == other)
                        .is_some_and(|f| f.options.iter().any(|o| o.value == value));
                    if known
                        && let Some(slot) = query.filters.iter_mut().find(|(k, _)| k == other)
                    {
                        slot.1 = value.to_string();
                    }
                }
            }
        }
        query
    }

    /// Selected value of filter `key`, empty for "any".
    #[must_use]
    pub fn filter(&self, key: &str) -> &str {
        self.filters
            .iter()
            .find(|(k, _)| k == key)
            .map_or("", |(_, v)| v.as_str())
    }

    fn to_query_string(&self, sort: &Sort, page: usize, default_sort: &Sort) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        if !self.q.is_empty() {
            serializer.append_pair("q", &self.q);
        }
        for (key, value) in &self.filters {
            if !value.is_empty() {
                serializer.append_pair(key, value);
            }
        }
        if sort != default_sort {
            serializer.append_pair("sort", &sort.as_param());
        }
        if page > 1 {
            serializer.append_pair("page", &page.to_string());
        }
        serializer.finish()
    }
}

/// A configured table and the query it is showing; what list templates
/// render headers, filters and pagination links from.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub config: DataTableConfig,
    pub query: TableQuery,
}

impl DataTable {
    /// Parse `raw` against `config`.
    #[must_use]
    pub fn new(config: DataTableConfig, raw: Option<&str>) -> Self {
        let query = TableQuery::parse(raw, &config);
        Self { config, query }
    }

    fn url(&self, sort: &Sort, page: usize) -> String {
        let qs = self
            .query
            .to_query_string(sort, page, &self.config.default_sort);
        if qs.is_empty() {
            self.config.base_path.clone()
        } else {
            format!("{}?{qs}", self.config.base_path)
        }
    }

    /// Header link for column `key`: sorts by it ascending, or flips the
    /// direction if it is already the sort column. Starts from page 1.
    #[must_use]
    pub fn sort_url(&self, key: &str) -> String {
        let sort = Sort {
            key: key.to_string(),
            descending: self.query.sort.key == key && !self.query.sort.descending,
        };
        self.url(&sort, 1)
    }

    /// Link to page `page` of the current view.
    #[must_use]
    pub fn page_url(&self, page: usize) -> String {
        self.url(&self.query.sort, page)
    }

    /// Arrow shown next to the sorted column's header.
    #[must_use]
    pub fn sort_indicator(&self, key: &str) -> &'static str {
        match &self.query.sort {
            s if s.key != key => "",
            s if s.descending => "\u{25bc}",
            _ => "\u{25b2}",
        }
    }

    /// Whether `value` is the selected option of filter `key`.
    #[must_use]
    pub fn is_selected(&self, key: &str, value: &str) -> bool {
        self.query.filter(key) == value
    }

    /// Whether any search or filter narrows the list.
    #[must_use]
    pub fn is_filtered(&self) -> bool {
        !self.query.q.is_empty() || self.query.filters.iter().any(|(_, v)| !v.is_empty())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> DataTableConfig {
        DataTableConfig::new("/orders")
            .column(TableColumn::sortable("number", "Order"))
            .column(TableColumn::new("items", "Items"))
            .column(TableColumn::sortable("total", "Total").numeric())
            .filter(TableFilter::select(
                "status",
                "Status",
                vec![
                    FilterOption::new("pending", "Pending"),
                    FilterOption::new("shipped", "Shipped"),
                ],
            ))
            .search_placeholder("Search orders")
            .default_sort("number", true)
    }

    #[test]
    fn test_parse_keeps_known_values_only() {
        let query = TableQuery::parse(
            Some("q=ana&status=shipped&sort=total&page=3&color=red"),
            &config(),
        );
        assert_eq!(query.q, "ana");
        assert_eq!(query.filter("status"), "shipped");
        assert_eq!(
            query.sort,
            Sort {
                key: "total".to_string(),
                descending: false
            }
        );
        assert_eq!(query.page, 3);

        let query = TableQuery::parse(Some("status=lost&sort=-items&page=zero"), &config());
        assert_eq!(query.filter("status"), "");
        assert_eq!(query.sort, config().default_sort);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn test_sort_url_toggles_direction() {
        let table = DataTable::new(config(), Some("status=pending&sort=total&page=2"));
        assert_eq!(table.sort_url("total"), "/orders?status=pending&sort=-total");
        assert_eq!(table.sort_url("number"), "/orders?status=pending&sort=number");
        assert_eq!(table.sort_indicator("total"), "\u{25b2}");
        assert_eq!(table.sort_indicator("number"), "");
    }

    #[test]
    fn test_default_view_has_bare_links() {
        let table = DataTable::new(config(), None);
        assert_eq!(table.page_url(1), "/orders");
        assert_eq!(table.page_url(2), "/orders?page=2");
        assert!(!table.is_filtered());
    }

    #[test]
    fn test_search_is_encoded() {
        let table = DataTable::new(config(), Some("q=ana+reyes"));
        assert_eq!(table.page_url(2), "/orders?q=ana+reyes&page=2");
        assert!(table.is_filtered());
        assert!(table.is_selected("status", ""));
    }
}
