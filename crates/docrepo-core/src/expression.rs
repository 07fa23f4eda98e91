//! Collection-name expressions.
//!
//! A narrow substitution language over a fixed context:
//! - `${key}` / `${key:default}` read from the property map
//! - `#{@bean}` / `#{@bean.field}` read from the bean map
//!
//! Everything outside an expression passes through verbatim.

use crate::{
    config::RepositoryConfig,
    error::{ErrorOrigin, InternalError},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// ExpressionError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExpressionError {
    #[error("unterminated expression in '{expression}'")]
    Unterminated { expression: String },

    #[error("unresolved placeholder '{key}' in '{expression}'")]
    UnresolvedPlaceholder { key: String, expression: String },

    #[error("unresolved bean reference '{name}' in '{expression}'")]
    UnresolvedBean { name: String, expression: String },

    #[error("expression '{expression}' resolved to an empty name")]
    Empty { expression: String },
}

impl From<ExpressionError> for InternalError {
    fn from(err: ExpressionError) -> Self {
        Self::configuration(ErrorOrigin::Expression, err.to_string())
    }
}

///
/// ExpressionResolver
///

#[derive(Clone, Debug, Default)]
pub struct ExpressionResolver {
    properties: BTreeMap<String, String>,
    beans: BTreeMap<String, String>,
}

impl ExpressionResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a resolver over the property and bean maps of a repository config.
    #[must_use]
    pub fn from_config(config: &RepositoryConfig) -> Self {
        Self {
            properties: config.properties.clone(),
            beans: config.beans.clone(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_bean(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.beans.insert(name.into(), value.into());
        self
    }

    /// Resolve every expression in `expression` to a literal string.
    pub fn resolve(&self, expression: &str) -> Result<String, ExpressionError> {
        let mut out = String::with_capacity(expression.len());
        let mut rest = expression;

        while let Some(start) = find_expression_start(rest) {
            out.push_str(&rest[..start]);
            let sigil = rest.as_bytes()[start];
            let body_start = start + 2;

            let Some(len) = rest[body_start..].find('}') else {
                return Err(ExpressionError::Unterminated {
                    expression: expression.to_string(),
                });
            };
            let body = rest[body_start..body_start + len].trim();

            let resolved = if sigil == b'$' {
                self.resolve_placeholder(body, expression)?
            } else {
                self.resolve_bean(body, expression)?
            };
            out.push_str(&resolved);

            rest = &rest[body_start + len + 1..];
        }
        out.push_str(rest);

        if out.trim().is_empty() {
            return Err(ExpressionError::Empty {
                expression: expression.to_string(),
            });
        }

        Ok(out)
    }

    fn resolve_placeholder(&self, body: &str, expression: &str) -> Result<String, ExpressionError> {
        let (key, default) = match body.split_once(':') {
            Some((key, default)) => (key.trim(), Some(default)),
            None => (body, None),
        };

        self.properties
            .get(key)
            .cloned()
            .or_else(|| default.map(str::to_string))
            .ok_or_else(|| ExpressionError::UnresolvedPlaceholder {
                key: key.to_string(),
                expression: expression.to_string(),
            })
    }

    fn resolve_bean(&self, body: &str, expression: &str) -> Result<String, ExpressionError> {
        let name = body.strip_prefix('@').unwrap_or(body).trim();

        self.beans
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnresolvedBean {
                name: name.to_string(),
                expression: expression.to_string(),
            })
    }
}

fn find_expression_start(s: &str) -> Option<usize> {
    let dollar = s.find("${");
    let hash = s.find("#{");

    match (dollar, hash) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

///
/// TESTS
///
