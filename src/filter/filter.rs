use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{Condition, SortField, SqlResult};

/// SQL statement builder for one document table (`id uuid, doc jsonb`).
pub struct Filter {
    table_name: String,
    conditions: Vec<Condition>,
    order_data: Vec<SortField>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Filter {
    pub fn new(table_name: impl Into<String>) -> Result<Self, FilterError> {
        let table_name = table_name.into();
        Self::validate_table_name(&table_name)?;
        Ok(Self {
            table_name,
            conditions: vec![],
            order_data: vec![],
            limit: None,
            offset: None,
        })
    }

    pub fn where_clause(&mut self, conditions: &[Condition]) -> &mut Self {
        self.conditions = conditions.to_vec();
        self
    }

    pub fn order(&mut self, order: &[SortField]) -> &mut Self {
        self.order_data = order.to_vec();
        self
    }

    pub fn limit(&mut self, limit: Option<u64>, offset: u64) -> &mut Self {
        self.limit = limit;
        self.offset = (offset > 0).then_some(offset);
        self
    }

    pub fn to_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0)?;
        let order_clause = FilterOrder::generate(&self.order_data)?;
        let limit_clause = self.build_limit_clause();

        let query = [
            "SELECT doc".to_string(),
            format!("FROM \"{}\"", self.table_name),
            format!("WHERE {}", where_clause),
            order_clause,
            limit_clause,
        ].into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join(" ");

        Ok(SqlResult { query, params })
    }

    pub fn to_count_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0)?;
        let query = format!("SELECT COUNT(*) AS count FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    pub fn to_delete_sql(&self) -> Result<SqlResult, FilterError> {
        let (where_clause, params) = FilterWhere::generate(&self.conditions, 0)?;
        let query = format!("DELETE FROM \"{}\" WHERE {}", self.table_name, where_clause);
        Ok(SqlResult { query, params })
    }

    fn validate_table_name(name: &str) -> Result<(), FilterError> {
        let mut chars = name.chars();
        let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(FilterError::InvalidTableName(format!("Invalid table name format: {}", name)));
        }
        Ok(())
    }

    fn build_limit_clause(&self) -> String {
        match (self.limit, self.offset) {
            (Some(l), Some(o)) => format!("LIMIT {} OFFSET {}", l, o),
            (Some(l), None) => format!("LIMIT {}", l),
            (None, Some(o)) => format!("OFFSET {}", o),
            (None, None) => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_order::FilterOrder;

    #[test]
    fn builds_paged_select() {
        let mut filter = Filter::new("bootcamps").unwrap();
        filter
            .where_clause(&[Condition::eq("housing", "true")])
            .order(&FilterOrder::parse("-name"))
            .limit(Some(5), 10);
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.starts_with("SELECT doc FROM \"bootcamps\" WHERE (CASE WHEN jsonb_typeof(doc #> '{housing}')"));
        assert!(sql.query.ends_with("ORDER BY doc #> '{name}' DESC, created_at ASC, id ASC LIMIT 5 OFFSET 10"));
        assert_eq!(sql.params, vec!["true", "true"]);
    }

    #[test]
    fn count_ignores_order_and_paging() {
        let mut filter = Filter::new("courses").unwrap();
        filter.order(&FilterOrder::parse("title")).limit(Some(5), 5);
        let sql = filter.to_count_sql().unwrap();
        assert_eq!(sql.query, "SELECT COUNT(*) AS count FROM \"courses\" WHERE 1=1");
    }

    #[test]
    fn rejects_bad_table_names() {
        assert!(Filter::new("").is_err());
        assert!(Filter::new("1users").is_err());
        assert!(Filter::new("users; DROP").is_err());
        assert!(Filter::new("_users").is_ok());
    }
}
