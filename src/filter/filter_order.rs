use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::error::FilterError;
use super::filter_where::json_path;
use super::types::{field_value, SortDirection, SortField};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse a comma-separated sort list. `-field` sorts descending; the
    /// long form `field desc` is accepted as well.
    pub fn parse(s: &str) -> Vec<SortField> {
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let (field, mut direction) = match col.strip_prefix('-') {
                    Some(stripped) => (stripped, SortDirection::Desc),
                    None => (col, SortDirection::Asc),
                };
                if let Some(dir) = it.next() {
                    if dir.eq_ignore_ascii_case("desc") { direction = SortDirection::Desc; }
                }
                if !field.is_empty() {
                    out.push(SortField { field: field.to_string(), direction });
                }
            }
        }
        out
    }

    /// Always ends with the row's insertion time and id so equal keys
    /// come back in insertion order, as they do from the memory store.
    pub fn generate(infos: &[SortField]) -> Result<String, FilterError> {
        let mut parts = Vec::with_capacity(infos.len() + 2);
        for info in infos {
            // jsonb ordering compares numbers numerically and strings lexically
            parts.push(format!("{} {}", json_path(&info.field, false)?, info.direction.to_sql()));
        }
        parts.push(format!("created_at {}", SortDirection::Asc.to_sql()));
        parts.push(format!("id {}", SortDirection::Asc.to_sql()));
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    /// In-memory equivalent of the generated ORDER BY. Missing values sort
    /// last ascending, as NULLs do in Postgres.
    pub fn compare(a: &Map<String, Value>, b: &Map<String, Value>, infos: &[SortField]) -> Ordering {
        for info in infos {
            let ord = compare_values(field_value(a, &info.field), field_value(b, &info.field));
            let ord = match info.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (x, y) => type_rank(x).cmp(&type_rank(y)),
        },
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_prefix_and_long_forms() {
        let sort = FilterOrder::parse("-average_cost, name ,created_at desc,");
        assert_eq!(sort.len(), 3);
        assert_eq!(sort[0], SortField { field: "average_cost".into(), direction: SortDirection::Desc });
        assert_eq!(sort[1], SortField { field: "name".into(), direction: SortDirection::Asc });
        assert_eq!(sort[2], SortField { field: "created_at".into(), direction: SortDirection::Desc });
        assert!(FilterOrder::parse(" , -").is_empty());
    }

    #[test]
    fn generates_order_by_over_document_paths() {
        let sql = FilterOrder::generate(&FilterOrder::parse("-average_cost,location.city")).unwrap();
        assert_eq!(
            sql,
            "ORDER BY doc #> '{average_cost}' DESC, doc #> '{location,city}' ASC, created_at ASC, id ASC"
        );
    }

    #[test]
    fn ties_fall_back_to_insertion_order() {
        assert_eq!(FilterOrder::generate(&[]).unwrap(), "ORDER BY created_at ASC, id ASC");
    }

    #[test]
    fn compares_numbers_numerically() {
        let sort = FilterOrder::parse("average_cost");
        let a = doc(json!({"average_cost": 9}));
        let b = doc(json!({"average_cost": 10}));
        assert_eq!(FilterOrder::compare(&a, &b, &sort), Ordering::Less);
        let sort = FilterOrder::parse("-average_cost");
        assert_eq!(FilterOrder::compare(&a, &b, &sort), Ordering::Greater);
    }

    #[test]
    fn falls_through_to_next_key_on_ties() {
        let sort = FilterOrder::parse("housing,-name");
        let a = doc(json!({"housing": true, "name": "Alpha"}));
        let b = doc(json!({"housing": true, "name": "Beta"}));
        assert_eq!(FilterOrder::compare(&a, &b, &sort), Ordering::Greater);
        assert_eq!(FilterOrder::compare(&a, &a, &sort), Ordering::Equal);
    }
}
