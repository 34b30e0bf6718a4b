use super::error::FilterError;
use super::types::{query_bool, query_number, Comparison, Condition};

/// Compiles typed conditions into a parameterised WHERE clause over a
/// `doc jsonb` column. All parameters are bound as text and cast in SQL.
pub struct FilterWhere {
    param_values: Vec<String>,
    param_index: usize,
}

impl FilterWhere {
    pub fn new(starting_param_index: usize) -> Self {
        Self {
            param_values: vec![],
            param_index: starting_param_index,
        }
    }

    pub fn generate(conditions: &[Condition], starting_param_index: usize) -> Result<(String, Vec<String>), FilterError> {
        let mut filter_where = Self::new(starting_param_index);
        filter_where.build(conditions)
    }

    fn build(&mut self, conditions: &[Condition]) -> Result<(String, Vec<String>), FilterError> {
        let mut sql_conditions = Vec::with_capacity(conditions.len());
        for condition in conditions {
            sql_conditions.push(self.build_sql_condition(condition)?);
        }
        let where_clause = if sql_conditions.is_empty() { "1=1".to_string() } else { sql_conditions.join(" AND ") };
        Ok((where_clause, std::mem::take(&mut self.param_values)))
    }

    fn build_sql_condition(&mut self, condition: &Condition) -> Result<String, FilterError> {
        let text = json_path(&condition.field, true)?;
        let node = json_path(&condition.field, false)?;

        let (op, values) = match &condition.comparison {
            Comparison::Eq(value) => ("=", std::slice::from_ref(value)),
            Comparison::Gt(value) => (">", std::slice::from_ref(value)),
            Comparison::Gte(value) => (">=", std::slice::from_ref(value)),
            Comparison::Lt(value) => ("<", std::slice::from_ref(value)),
            Comparison::Lte(value) => ("<=", std::slice::from_ref(value)),
            Comparison::In(values) if values.is_empty() => return Ok("1=0".to_string()),
            Comparison::In(values) => ("=", values.as_slice()),
            Comparison::Within(radius) => {
                let elems = path_elems(&condition.field)?;
                let lng = format!("(doc #>> '{{{},0}}')::float8", elems);
                let lat = format!("(doc #>> '{{{},1}}')::float8", elems);
                let c_lat = format!("{}::float8", self.param(radius.latitude.to_string()));
                let c_lng = format!("{}::float8", self.param(radius.longitude.to_string()));
                let rad = format!("{}::float8", self.param(radius.radians.to_string()));
                return Ok(format!(
                    "(jsonb_typeof({node}) = 'array' AND 2 * asin(least(1, sqrt(power(sin((radians({lat}) - radians({c_lat})) / 2), 2) \
                     + cos(radians({c_lat})) * cos(radians({lat})) * power(sin((radians({lng}) - radians({c_lng})) / 2), 2)))) <= {rad})"
                ));
            }
        };

        let bound: Vec<TypedParam> = values.iter().map(|v| self.typed_param(v)).collect();
        let on_field = any_typed(&bound, &node, &text, op);
        let on_element = any_typed(&bound, "v", "(v #>> '{}')", op);
        Ok(format!(
            "(CASE WHEN jsonb_typeof({node}) = 'array' \
             THEN EXISTS (SELECT 1 FROM jsonb_array_elements({node}) AS e(v) WHERE {on_element}) \
             ELSE {on_field} END)"
        ))
    }

    /// Bind a raw query value once as text, plus its numeric and boolean
    /// readings when it has them.
    fn typed_param(&mut self, value: &str) -> TypedParam {
        TypedParam {
            text: self.param(value.to_string()),
            number: query_number(value).map(|n| self.param(n.to_string())),
            boolean: query_bool(value).map(|b| self.param(b.to_string())),
        }
    }

    fn param(&mut self, value: String) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

/// Placeholders for one query value under each type it can be read as
struct TypedParam {
    text: String,
    number: Option<String>,
    boolean: Option<String>,
}

impl TypedParam {
    /// Compare one jsonb scalar by its own type. Strings use bytewise
    /// collation; a type the value cannot be read as yields NULL.
    fn compare(&self, node: &str, text: &str, op: &str) -> String {
        let mut arms = Vec::with_capacity(3);
        if let Some(n) = &self.number {
            arms.push(format!("WHEN 'number' THEN ({})::numeric {} {}::numeric", text, op, n));
        }
        if let Some(b) = &self.boolean {
            arms.push(format!("WHEN 'boolean' THEN ({})::boolean {} {}::boolean", text, op, b));
        }
        arms.push(format!("WHEN 'string' THEN ({}) COLLATE \"C\" {} {}", text, op, self.text));
        format!("CASE jsonb_typeof({}) {} END", node, arms.join(" "))
    }
}

fn any_typed(bound: &[TypedParam], node: &str, text: &str, op: &str) -> String {
    let parts: Vec<String> = bound.iter().map(|b| format!("({})", b.compare(node, text, op))).collect();
    parts.join(" OR ")
}

/// `location.city` -> `doc #>> '{location,city}'` (text) or `doc #> ...` (jsonb)
pub fn json_path(field: &str, as_text: bool) -> Result<String, FilterError> {
    let elems = path_elems(field)?;
    let op = if as_text { "#>>" } else { "#>" };
    Ok(format!("doc {} '{{{}}}'", op, elems))
}

fn path_elems(field: &str) -> Result<String, FilterError> {
    let valid = !field.is_empty()
        && field.split('.').all(|part| {
            part.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if !valid {
        return Err(FilterError::InvalidColumn(format!("Invalid field name format: {}", field)));
    }
    Ok(field.split('.').collect::<Vec<_>>().join(","))
}
