use std::collections::BTreeMap;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::types::{Comparison, Condition, FilterOp, Pagination, QueryDescriptor, SortDirection, SortField};

/// Query-string keys that control the listing rather than filter it
pub const RESERVED_PARAMS: [&str; 4] = ["select", "sort", "limit", "page"];

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 5;
pub const DEFAULT_SORT_FIELD: &str = "created_at";

/// Turns raw query-string parameters into a [`QueryDescriptor`].
///
/// Filter keys take the form `field=value` (equality) or `field[op]=value`
/// where `op` is one of `gt`, `gte`, `lt`, `lte`, `in`. Every field named in
/// a filter, `select` or `sort` must be on the resource's allow-list.
pub struct QueryTranslator<'a> {
    allowed_fields: &'a [&'a str],
    max_limit: Option<u32>,
}

impl<'a> QueryTranslator<'a> {
    pub fn new(allowed_fields: &'a [&'a str]) -> Self {
        Self { allowed_fields, max_limit: None }
    }

    pub fn with_max_limit(mut self, max_limit: Option<u32>) -> Self {
        self.max_limit = max_limit;
        self
    }

    pub fn translate(&self, raw: &BTreeMap<String, String>) -> Result<QueryDescriptor, FilterError> {
        let mut filter = Vec::new();
        for (key, value) in raw.iter().filter(|(k, _)| !RESERVED_PARAMS.contains(&k.as_str())) {
            let (field, op) = split_filter_key(key);
            self.check_field(field)?;
            filter.push(Condition { field: field.to_string(), comparison: Comparison::new(op, value) });
        }

        let select = match raw.get("select") {
            Some(s) => split_list(s),
            None => vec![],
        };
        for field in &select {
            self.check_field(field)?;
        }

        let sort = match raw.get("sort").map(|s| FilterOrder::parse(s)) {
            Some(sort) if !sort.is_empty() => sort,
            _ => vec![SortField { field: DEFAULT_SORT_FIELD.to_string(), direction: SortDirection::Asc }],
        };
        for s in &sort {
            self.check_field(&s.field)?;
        }

        let page = parse_positive(raw.get("page")).unwrap_or(DEFAULT_PAGE);
        let mut limit = parse_positive(raw.get("limit")).unwrap_or(DEFAULT_LIMIT);
        if let Some(max) = self.max_limit {
            if limit > max {
                tracing::warn!("Limit {} exceeds max {}, capping to max", limit, max);
                limit = max;
            }
        }

        Ok(QueryDescriptor { filter, select, sort, pagination: Pagination { page, limit } })
    }

    fn check_field(&self, field: &str) -> Result<(), FilterError> {
        if self.allowed_fields.contains(&field) {
            Ok(())
        } else {
            Err(FilterError::UnknownField(field.to_string()))
        }
    }
}

/// `price[lte]` -> ("price", Lte); `price` -> ("price", Eq). A bracket
/// suffix that is not an operator keyword stays part of the field name.
fn split_filter_key(key: &str) -> (&str, FilterOp) {
    if let Some(stripped) = key.strip_suffix(']') {
        if let Some((field, keyword)) = stripped.split_once('[') {
            if let Some(op) = FilterOp::from_keyword(keyword) {
                return (field, op);
            }
        }
    }
    (key, FilterOp::Eq)
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',').map(str::trim).filter(|t| !t.is_empty()).map(str::to_string).collect()
}

fn parse_positive(value: Option<&String>) -> Option<u32> {
    value.and_then(|v| v.trim().parse::<u32>().ok()).filter(|n| *n >= 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[&str] = &["name", "average_cost", "careers", "housing", "created_at", "location.state"];

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn reserved_keys_never_become_filters() {
        let raw = params(&[("select", "name"), ("sort", "-name"), ("limit", "2"), ("page", "3"), ("housing", "true")]);
        let q = QueryTranslator::new(FIELDS).translate(&raw).unwrap();
        assert_eq!(q.filter, vec![Condition::eq("housing", "true")]);
        assert!(q.filter.iter().all(|c| !RESERVED_PARAMS.contains(&c.field.as_str())));
    }

    #[test]
    fn bracket_keywords_select_operators() {
        let raw = params(&[
            ("average_cost[gt]", "1"),
            ("average_cost[gte]", "2"),
            ("average_cost[lt]", "3"),
            ("average_cost[lte]", "4"),
            ("careers[in]", "Business,UI/UX"),
        ]);
        let q = QueryTranslator::new(FIELDS).translate(&raw).unwrap();
        let comparisons: Vec<_> = q.filter.iter().map(|c| c.comparison.clone()).collect();
        assert!(comparisons.contains(&Comparison::Gt("1".into())));
        assert!(comparisons.contains(&Comparison::Gte("2".into())));
        assert!(comparisons.contains(&Comparison::Lt("3".into())));
        assert!(comparisons.contains(&Comparison::Lte("4".into())));
        assert!(comparisons.contains(&Comparison::In(vec!["Business".into(), "UI/UX".into()])));
    }

    #[test]
    fn operator_keywords_must_be_whole_words() {
        let raw = params(&[("average_cost[gtx]", "1")]);
        let err = QueryTranslator::new(FIELDS).translate(&raw).unwrap_err();
        assert_eq!(err, FilterError::UnknownField("average_cost[gtx]".into()));

        // Operator text inside a value is just data
        let raw = params(&[("name", "gte lte in")]);
        let q = QueryTranslator::new(FIELDS).translate(&raw).unwrap();
        assert_eq!(q.filter, vec![Condition::eq("name", "gte lte in")]);
    }

    #[test]
    fn select_and_sort_split_on_commas() {
        let raw = params(&[("select", "name, careers,,"), ("sort", "-average_cost,name")]);
        let q = QueryTranslator::new(FIELDS).translate(&raw).unwrap();
        assert_eq!(q.select, vec!["name", "careers"]);
        assert_eq!(
            q.sort,
            vec![
                SortField { field: "average_cost".into(), direction: SortDirection::Desc },
                SortField { field: "name".into(), direction: SortDirection::Asc },
            ]
        );
    }

    #[test]
    fn defaults_apply_when_control_params_are_absent() {
        let q = QueryTranslator::new(FIELDS).translate(&BTreeMap::new()).unwrap();
        assert!(q.filter.is_empty());
        assert!(q.select.is_empty());
        assert_eq!(q.sort, vec![SortField { field: "created_at".into(), direction: SortDirection::Asc }]);
        assert_eq!(q.pagination, Pagination { page: 1, limit: 5 });
    }

    #[test]
    fn malformed_page_and_limit_fall_back_to_defaults() {
        for (page, limit) in [("abc", "xyz"), ("0", "0"), ("-2", "-5"), ("", "")] {
            let raw = params(&[("page", page), ("limit", limit)]);
            let q = QueryTranslator::new(FIELDS).translate(&raw).unwrap();
            assert_eq!(q.pagination, Pagination { page: 1, limit: 5 }, "page={page} limit={limit}");
        }
        let q = QueryTranslator::new(FIELDS).translate(&params(&[("page", "3"), ("limit", "7")])).unwrap();
        assert_eq!(q.pagination, Pagination { page: 3, limit: 7 });
    }

    #[test]
    fn limit_is_capped() {
        let raw = params(&[("limit", "500")]);
        let q = QueryTranslator::new(FIELDS).with_max_limit(Some(100)).translate(&raw).unwrap();
        assert_eq!(q.pagination.limit, 100);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        for raw in [params(&[("password", "x")]), params(&[("select", "name,password")]), params(&[("sort", "-password")])] {
            let err = QueryTranslator::new(FIELDS).translate(&raw).unwrap_err();
            assert_eq!(err, FilterError::UnknownField("password".into()));
        }
    }

    #[test]
    fn dotted_fields_are_allowed_when_listed() {
        let q = QueryTranslator::new(FIELDS).translate(&params(&[("location.state", "MA")])).unwrap();
        assert_eq!(q.filter, vec![Condition::eq("location.state", "MA")]);
    }
}
