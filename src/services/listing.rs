//! List query handling shared by every collection endpoint:
//! `_start`/`_end` windows, `_sort`/`_order`, and `<field>_like` filters.

use crate::errors::ServiceError;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ColumnTrait, ConnectionTrait, EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use std::collections::HashMap;
use std::str::FromStr;
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl From<SortOrder> for Order {
    fn from(order: SortOrder) -> Self {
        match order {
            SortOrder::Asc => Order::Asc,
            SortOrder::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub start: u64,
    pub end: u64,
    pub sort: Option<(String, SortOrder)>,
    /// `(field, needle)` pairs, needle already lowercased
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    pub fn from_params(
        params: &HashMap<String, String>,
        default_page_size: u64,
        max_page_size: u64,
    ) -> Result<Self, ServiceError> {
        let start = parse_index(params, "_start")?.unwrap_or(0);
        let end = parse_index(params, "_end")?
            .unwrap_or_else(|| start.saturating_add(default_page_size));
        if end < start {
            return Err(ServiceError::BadRequest(format!(
                "_end ({}) must not be before _start ({})",
                end, start
            )));
        }
        let end = end.min(start.saturating_add(max_page_size));

        let order = params
            .get("_order")
            .map(|raw| {
                SortOrder::from_str(raw).map_err(|_| {
                    ServiceError::BadRequest(format!("_order must be asc or desc, got '{}'", raw))
                })
            })
            .transpose()?;

        let sort = match params.get("_sort").filter(|s| !s.is_empty()) {
            Some(field) => Some((field.clone(), order.unwrap_or(SortOrder::Asc))),
            None => None,
        };

        let mut filters: Vec<(String, String)> = params
            .iter()
            .filter_map(|(key, value)| {
                key.strip_suffix("_like")
                    .filter(|field| !field.is_empty() && !value.trim().is_empty())
                    .map(|field| (field.to_string(), value.trim().to_lowercase()))
            })
            .collect();
        filters.sort();

        Ok(Self {
            start,
            end,
            sort,
            filters,
        })
    }

    pub fn limit(&self) -> u64 {
        self.end - self.start
    }
}

/// SQL `OFFSET`/`LIMIT` are signed.
const MAX_INDEX: u64 = i64::MAX as u64;

fn parse_index(params: &HashMap<String, String>, key: &str) -> Result<Option<u64>, ServiceError> {
    params
        .get(key)
        .map(|raw| {
            raw.parse::<u64>()
                .ok()
                .filter(|value| *value <= MAX_INDEX)
                .ok_or_else(|| {
                    ServiceError::BadRequest(format!(
                        "{} must be an integer between 0 and {}",
                        key, MAX_INDEX
                    ))
                })
        })
        .transpose()
}

/// Which JSON fields of a resource can be sorted on and filtered with
/// `_like`. Searchable columns must be text.
pub struct ListFields<C: 'static> {
    pub sortable: &'static [(&'static str, C)],
    pub searchable: &'static [(&'static str, C)],
    /// Newest-first column used when no `_sort` is given
    pub default_sort: C,
    pub tiebreak: C,
}

impl<C: ColumnTrait> ListFields<C> {
    fn sortable(&self, field: &str) -> Result<C, ServiceError> {
        lookup(self.sortable, field)
            .ok_or_else(|| ServiceError::BadRequest(format!("cannot sort by '{}'", field)))
    }

    fn searchable(&self, field: &str) -> Result<C, ServiceError> {
        lookup(self.searchable, field)
            .ok_or_else(|| ServiceError::BadRequest(format!("cannot filter by '{}'", field)))
    }
}

fn lookup<C: Copy>(fields: &[(&str, C)], name: &str) -> Option<C> {
    fields.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

/// Adds the `_like` filters as case-insensitive substring matches.
pub fn apply_filters<E>(
    mut select: Select<E>,
    query: &ListQuery,
    fields: &ListFields<E::Column>,
) -> Result<Select<E>, ServiceError>
where
    E: EntityTrait,
{
    for (field, needle) in &query.filters {
        let column = fields.searchable(field)?;
        let pattern = format!("%{}%", escape_like(needle));
        select = select.filter(
            Expr::expr(Func::lower(Expr::col((E::default(), column))))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }
    Ok(select)
}

/// Orders and windows an already filtered select.
pub fn apply_window<E>(
    select: Select<E>,
    query: &ListQuery,
    fields: &ListFields<E::Column>,
) -> Result<Select<E>, ServiceError>
where
    E: EntityTrait,
{
    let ordered = match &query.sort {
        Some((field, order)) => select.order_by(fields.sortable(field)?, Order::from(*order)),
        None => select.order_by(fields.default_sort, Order::Desc),
    };

    Ok(ordered
        .order_by(fields.tiebreak, Order::Asc)
        .offset(query.start)
        .limit(query.limit()))
}

/// Filters, counts and windows in one go. Returns the select for the page so
/// callers can still join related rows, plus the filtered total.
pub async fn paginate<E, C>(
    conn: &C,
    select: Select<E>,
    query: &ListQuery,
    fields: &ListFields<E::Column>,
) -> Result<(Select<E>, u64), ServiceError>
where
    E: EntityTrait,
    E::Model: Send + Sync,
    C: ConnectionTrait,
{
    let filtered = apply_filters(select, query, fields)?;
    let total = filtered
        .clone()
        .count(conn)
        .await
        .map_err(ServiceError::db_error)?;
    let page = apply_window(filtered, query, fields)?;
    Ok((page, total))
}

pub(crate) fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_to_first_page() {
        let q = ListQuery::from_params(&params(&[]), 10, 100).unwrap();
        assert_eq!((q.start, q.end, q.limit()), (0, 10, 10));
        assert!(q.sort.is_none());
        assert!(q.filters.is_empty());
    }

    #[test]
    fn window_is_capped() {
        let q = ListQuery::from_params(&params(&[("_start", "20"), ("_end", "1000")]), 10, 100)
            .unwrap();
        assert_eq!((q.start, q.end), (20, 120));
    }

    #[test]
    fn sort_and_filters_are_parsed() {
        let q = ListQuery::from_params(
            &params(&[
                ("_sort", "seq"),
                ("_order", "DESC"),
                ("clientName_like", " Juan "),
                ("q", "ignored"),
            ]),
            10,
            100,
        )
        .unwrap();
        assert_eq!(q.sort, Some(("seq".to_string(), SortOrder::Desc)));
        assert_eq!(q.filters, vec![("clientName".to_string(), "juan".to_string())]);
    }

    #[rstest]
    #[case(&[("_start", "5"), ("_end", "2")])]
    #[case(&[("_start", "-1")])]
    #[case(&[("_start", "18446744073709551615")])]
    #[case(&[("_end", "9223372036854775808")])]
    #[case(&[("_order", "sideways")])]
    fn rejects_bad_params(#[case] pairs: &[(&str, &str)]) {
        assert_matches!(
            ListQuery::from_params(&params(pairs), 10, 100),
            Err(ServiceError::BadRequest(_))
        );
    }

    #[test]
    fn window_near_the_top_does_not_overflow() {
        let start = MAX_INDEX.to_string();
        let q = ListQuery::from_params(&params(&[("_start", start.as_str())]), 10, 100).unwrap();
        assert_eq!(q.start, MAX_INDEX);
        assert_eq!(q.limit(), 10);
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }
}
