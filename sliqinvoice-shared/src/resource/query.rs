/// List query translation
///
/// Turns raw query-string parameters into a validated [`ListParams`] and then
/// into parameterized SQL. Unknown sort columns, unknown filter values, empty
/// values and `all` are dropped rather than rejected, so a stale dashboard URL
/// degrades to "no filter" instead of an error.

use std::collections::HashMap;

use serde::Serialize;
use sqlx::{Postgres, QueryBuilder};

use super::{FilterKind, Resource};

/// Page size when `limit` is absent or unparseable
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// SQL keyword
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    /// Parses `asc`/`desc` (any case), defaulting to descending
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if v == "asc" || v == "ascending" => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// A filter that survived validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveFilter {
    /// `column = ANY(values)`
    In {
        column: &'static str,
        values: Vec<String>,
    },

    /// `column = value`
    Flag { column: &'static str, value: bool },
}

/// Validated list request
#[derive(Debug, Clone)]
pub struct ListParams {
    /// Trimmed, non-empty search term
    pub search: Option<String>,

    /// Filters AND-combined across fields
    pub filters: Vec<ActiveFilter>,

    /// 1-based page number
    pub page: i64,

    /// Page size, 1..=MAX_PAGE_SIZE
    pub limit: i64,

    /// Whitelisted sort column
    pub sort_by: &'static str,

    /// Sort direction
    pub sort_order: SortOrder,
}

impl ListParams {
    /// Builds list parameters for resource `R` from raw query-string pairs
    ///
    /// Recognized keys: `search`, `page`, `limit`, `sort_by`, `sort_order`,
    /// plus each filter parameter `R` declares. Filter values are
    /// comma-separated and OR-combined.
    pub fn from_query<R: Resource>(query: &HashMap<String, String>) -> Self {
        let search = query
            .get("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let page = query
            .get("page")
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1);

        let limit = query
            .get("limit")
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .map(|l| l.min(MAX_PAGE_SIZE))
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let sort_by = query
            .get("sort_by")
            .and_then(|requested| {
                R::SORT_COLUMNS
                    .iter()
                    .copied()
                    .find(|column| *column == requested.trim())
            })
            .unwrap_or(R::DEFAULT_SORT);

        let sort_order = SortOrder::parse(query.get("sort_order").map(String::as_str));

        let filters = R::FILTERS
            .iter()
            .filter_map(|spec| {
                let raw = query.get(spec.param)?;
                let values = split_filter_values(raw);
                match spec.kind {
                    FilterKind::OneOf(allowed) => {
                        let mut kept: Vec<String> = Vec::new();
                        for value in values {
                            if allowed.contains(&value.as_str()) && !kept.contains(&value) {
                                kept.push(value);
                            }
                        }
                        (!kept.is_empty()).then_some(ActiveFilter::In {
                            column: spec.column,
                            values: kept,
                        })
                    }
                    FilterKind::Flag { on, off } => {
                        let wants_on = values.iter().any(|v| v == on);
                        let wants_off = values.iter().any(|v| v == off);
                        // Both states selected is the same as no filter
                        match (wants_on, wants_off) {
                            (true, false) => Some(ActiveFilter::Flag {
                                column: spec.column,
                                value: true,
                            }),
                            (false, true) => Some(ActiveFilter::Flag {
                                column: spec.column,
                                value: false,
                            }),
                            _ => None,
                        }
                    }
                }
            })
            .collect();

        Self {
            search,
            filters,
            page,
            limit,
            sort_by,
            sort_order,
        }
    }

    /// Rows skipped before the current page
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

fn split_filter_values(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty() && v != "all")
        .collect()
}

/// Escapes `%`, `_` and `\` so a search term matches literally under `ILIKE`
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the `WHERE` clause for search and filters
pub fn push_conditions(
    qb: &mut QueryBuilder<'static, Postgres>,
    search_columns: &[&'static str],
    params: &ListParams,
) {
    qb.push(" WHERE TRUE");

    if let Some(term) = &params.search {
        if !search_columns.is_empty() {
            let pattern = format!("%{}%", escape_like(term));
            qb.push(" AND (");
            for (i, column) in search_columns.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column).push(" ILIKE ").push_bind(pattern.clone());
            }
            qb.push(")");
        }
    }

    for filter in &params.filters {
        match filter {
            ActiveFilter::In { column, values } => {
                qb.push(" AND ")
                    .push(*column)
                    .push(" = ANY(")
                    .push_bind(values.clone())
                    .push(")");
            }
            ActiveFilter::Flag { column, value } => {
                qb.push(" AND ").push(*column).push(" = ").push_bind(*value);
            }
        }
    }
}

/// `SELECT ... WHERE ... ORDER BY ...` without pagination
///
/// `id` is always the last sort key so pages never overlap on ties.
pub fn select_query<R: Resource>(params: &ListParams) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM {}", R::COLUMNS, R::TABLE));
    push_conditions(&mut qb, R::SEARCH_COLUMNS, params);

    let direction = params.sort_order.as_sql();
    qb.push(format!(
        " ORDER BY {} {}, id {}",
        params.sort_by, direction, direction
    ));
    qb
}

/// `SELECT COUNT(*) ... WHERE ...`
pub fn count_query<R: Resource>(params: &ListParams) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
    push_conditions(&mut qb, R::SEARCH_COLUMNS, params);
    qb
}

/// Pagination metadata returned with every list response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// Derives page counts from the filtered total
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let limit = limit.max(1);
        let total_pages = if total <= 0 { 0 } else { (total + limit - 1) / limit };

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: page > 1,
        }
    }
}

/// One page of records
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{customer::Customer, module::Module, user::User};

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let params = ListParams::from_query::<Customer>(&HashMap::new());

        assert_eq!(params.page, 1);
        assert_eq!(params.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(params.sort_by, "created_at");
        assert_eq!(params.sort_order, SortOrder::Desc);
        assert!(params.search.is_none());
        assert!(params.filters.is_empty());
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_page_and_limit_clamping() {
        let params = ListParams::from_query::<Module>(&query(&[("page", "0"), ("limit", "5000")]));
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, MAX_PAGE_SIZE);

        let params = ListParams::from_query::<Module>(&query(&[("page", "3"), ("limit", "25")]));
        assert_eq!(params.offset(), 50);

        let params = ListParams::from_query::<Module>(&query(&[("page", "x"), ("limit", "-1")]));
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_sort_whitelist() {
        let params = ListParams::from_query::<Customer>(&query(&[
            ("sort_by", "company_name"),
            ("sort_order", "ASC"),
        ]));
        assert_eq!(params.sort_by, "company_name");
        assert_eq!(params.sort_order, SortOrder::Asc);

        let params = ListParams::from_query::<Customer>(&query(&[("sort_by", "password_hash; DROP TABLE users")]));
        assert_eq!(params.sort_by, "created_at");
    }

    #[test]
    fn test_empty_and_all_mean_no_filter() {
        let params = ListParams::from_query::<Customer>(&query(&[("search", "   "), ("status", "all")]));
        assert!(params.search.is_none());
        assert!(params.filters.is_empty());

        let params = ListParams::from_query::<Customer>(&query(&[("status", "")]));
        assert!(params.filters.is_empty());
    }

    #[test]
    fn test_one_of_filter_drops_unknown_values() {
        let params = ListParams::from_query::<Customer>(&query(&[("status", "Active, bogus,suspended,active")]));
        assert_eq!(
            params.filters,
            vec![ActiveFilter::In {
                column: "subscription_status",
                values: vec!["active".to_string(), "suspended".to_string()],
            }]
        );
    }

    #[test]
    fn test_flag_filter() {
        let params = ListParams::from_query::<User>(&query(&[("status", "inactive")]));
        assert_eq!(
            params.filters,
            vec![ActiveFilter::Flag {
                column: "is_active",
                value: false,
            }]
        );

        let params = ListParams::from_query::<User>(&query(&[("status", "active,inactive")]));
        assert!(params.filters.is_empty());
    }

    #[test]
    fn test_filters_and_across_fields() {
        let params = ListParams::from_query::<User>(&query(&[
            ("role", "moderator,customer"),
            ("status", "active"),
        ]));
        assert_eq!(params.filters.len(), 2);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("acme"), "acme");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b\\c"), "a\\_b\\\\c");
    }

    #[test]
    fn test_select_sql_shape() {
        let params = ListParams::from_query::<Customer>(&query(&[
            ("search", "acme"),
            ("status", "active"),
            ("sort_by", "company_name"),
            ("sort_order", "asc"),
        ]));
        let qb = select_query::<Customer>(&params);
        let sql = qb.sql();

        assert!(sql.starts_with("SELECT "));
        assert!(sql.contains("FROM customers WHERE TRUE AND ("));
        assert!(sql.contains("company_name ILIKE $1 OR contact_name ILIKE $2 OR contact_email ILIKE $3"));
        assert!(sql.contains("subscription_status = ANY($4)"));
        assert!(sql.ends_with("ORDER BY company_name ASC, id ASC"));
        assert!(!sql.contains("acme"));
    }

    #[test]
    fn test_count_sql_shape() {
        let params = ListParams::from_query::<User>(&query(&[("status", "active")]));
        let qb = count_query::<User>(&params);
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM users WHERE TRUE AND is_active = $1");
    }

    #[test]
    fn test_pagination_metadata() {
        let p = Pagination::new(1, 10, 0);
        assert_eq!(p.total_pages, 0);
        assert!(!p.has_next_page);
        assert!(!p.has_prev_page);

        let p = Pagination::new(1, 10, 20);
        assert_eq!(p.total_pages, 2);
        assert!(p.has_next_page);

        let p = Pagination::new(3, 10, 21);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_next_page);
        assert!(p.has_prev_page);

        let p = Pagination::new(2, 1, 5);
        assert_eq!(p.total_pages, 5);
        assert!(p.has_next_page && p.has_prev_page);
    }
}
