//! SQL rendering of document queries, in the document store's dialect.

use crate::{
    query::{
        criteria::{Criteria, CriteriaType},
        document_query::DocumentQuery,
    },
    value::Value,
};
use std::fmt::{self, Write as _};

const ROOT_ALIAS: &str = "r";

///
/// SqlQuerySpec
/// Parameterised query text plus its named parameters in binding order.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SqlQuerySpec {
    pub text: String,
    pub parameters: Vec<(String, Value)>,
}

impl SqlQuerySpec {
    /// Render a `SELECT *` query.
    #[must_use]
    pub fn select(query: &DocumentQuery) -> Self {
        render(query, "SELECT * FROM ROOT r", true)
    }

    /// Render a `SELECT VALUE COUNT(1)` query. Sort orders are dropped.
    #[must_use]
    pub fn count(query: &DocumentQuery) -> Self {
        render(query, "SELECT VALUE COUNT(1) FROM ROOT r", false)
    }
}

impl fmt::Display for SqlQuerySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)?;
        for (name, value) in &self.parameters {
            write!(f, " [{name}={value}]")?;
        }

        Ok(())
    }
}

fn render(query: &DocumentQuery, head: &str, with_order: bool) -> SqlQuerySpec {
    let mut spec = SqlQuerySpec {
        text: head.to_string(),
        parameters: Vec::new(),
    };

    if let Some(criteria) = query.criteria() {
        let mut condition = String::new();
        write_criteria(&mut condition, &mut spec.parameters, criteria);
        let _ = write!(spec.text, " WHERE {condition}");
    }

    if with_order && query.sort().is_sorted() {
        let orders: Vec<String> = query
            .sort()
            .orders()
            .iter()
            .map(|order| format!("{} {}", property_ref(&order.property), order.direction.as_sql()))
            .collect();
        let _ = write!(spec.text, " ORDER BY {}", orders.join(", "));
    }

    spec
}

fn property_ref(subject: &str) -> String {
    format!("{ROOT_ALIAS}.{subject}")
}

fn bind(parameters: &mut Vec<(String, Value)>, subject: &str, value: &Value) -> String {
    let name = format!("@{}{}", subject.replace('.', "_"), parameters.len());
    parameters.push((name.clone(), value.clone()));
    name
}

fn write_criteria(out: &mut String, parameters: &mut Vec<(String, Value)>, criteria: &Criteria) {
    match criteria {
        Criteria::Node {
            connector,
            left,
            right,
        } => {
            out.push('(');
            write_criteria(out, parameters, left);
            let _ = write!(out, " {} ", connector.as_sql());
            write_criteria(out, parameters, right);
            out.push(')');
        }
        Criteria::Leaf {
            subject,
            kind,
            operands,
            ignore_case,
        } => {
            let field = property_ref(subject);
            let params: Vec<String> = operands
                .iter()
                .map(|operand| bind(parameters, subject, operand))
                .collect();
            write_leaf(out, &field, *kind, &params, *ignore_case);
        }
    }
}

fn write_leaf(out: &mut String, field: &str, kind: CriteriaType, params: &[String], ignore_case: bool) {
    let p = |idx: usize| params.get(idx).map_or("null", String::as_str);
    let case_arg = if ignore_case { ", true" } else { "" };

    let _ = match kind {
        CriteriaType::Equal if ignore_case => write!(out, "STRINGEQUALS({field}, {}, true)", p(0)),
        CriteriaType::Equal => write!(out, "{field} = {}", p(0)),
        CriteriaType::NotEqual if ignore_case => {
            write!(out, "NOT STRINGEQUALS({field}, {}, true)", p(0))
        }
        CriteriaType::NotEqual => write!(out, "{field} != {}", p(0)),
        CriteriaType::LessThan => write!(out, "{field} < {}", p(0)),
        CriteriaType::LessThanEqual => write!(out, "{field} <= {}", p(0)),
        CriteriaType::GreaterThan => write!(out, "{field} > {}", p(0)),
        CriteriaType::GreaterThanEqual => write!(out, "{field} >= {}", p(0)),
        CriteriaType::Between => write!(out, "({field} >= {} AND {field} <= {})", p(0), p(1)),
        CriteriaType::In if params.is_empty() => write!(out, "false"),
        CriteriaType::In => write!(out, "{field} IN ({})", params.join(", ")),
        CriteriaType::NotIn if params.is_empty() => write!(out, "true"),
        CriteriaType::NotIn => write!(out, "NOT ({field} IN ({}))", params.join(", ")),
        CriteriaType::Containing => write!(out, "CONTAINS({field}, {}{case_arg})", p(0)),
        CriteriaType::NotContaining => write!(out, "NOT CONTAINS({field}, {}{case_arg})", p(0)),
        CriteriaType::StartsWith => write!(out, "STARTSWITH({field}, {}{case_arg})", p(0)),
        CriteriaType::EndsWith => write!(out, "ENDSWITH({field}, {}{case_arg})", p(0)),
        CriteriaType::IsNull => write!(out, "IS_NULL({field})"),
        CriteriaType::IsNotNull => write!(out, "NOT IS_NULL({field})"),
        CriteriaType::Exists => write!(out, "IS_DEFINED({field})"),
        CriteriaType::True => write!(out, "{field} = true"),
        CriteriaType::False => write!(out, "{field} = false"),
    };
}

///
/// TESTS
///
