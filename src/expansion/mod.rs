use tracing::trace;

mod scanner;

use scanner::{scan_name, scan_position, skip_opaque};

use crate::error::QueryError;
use crate::params::{BoundValue, Parameter, ParameterKey, Parameters};
use crate::types::RowValues;

/// Target placeholder style for expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// SQLite-style placeholders like `?1`.
    Sqlite,
}

impl PlaceholderStyle {
    fn write(self, out: &mut String, number: usize) {
        let prefix = match self {
            PlaceholderStyle::Postgres => '$',
            PlaceholderStyle::Sqlite => '?',
        };
        out.push(prefix);
        out.push_str(&number.to_string());
    }
}

/// SQL with numbered placeholders and the values to bind to them, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedStatement {
    pub sql: String,
    pub values: Vec<RowValues>,
}

/// Rewrite `:name`, `?N` and bare `?` placeholders into numbered placeholders of `style`.
///
/// List parameters become one placeholder per element (`IN (:ids)` -> `IN (?1, ?2)`), an
/// empty list becomes `NULL`. Bare `?` placeholders take positional parameters in ascending
/// position. Quoted strings, comments, dollar-quoted blocks and `::` casts are left alone.
///
/// ```rust
/// use orm_query_cache::prelude::*;
/// # use orm_query_cache::params::{BoundValue, Parameter};
///
/// let mut params = Parameters::new();
/// params.insert(Parameter {
///     key: ParameterKey::from("ids"),
///     value: BoundValue::List(vec![
///         BoundValue::Scalar(RowValues::Int(1)),
///         BoundValue::Scalar(RowValues::Int(2)),
///     ]),
///     ty: ParamType::IntArray,
/// });
/// let expanded = expand_placeholders(
///     "SELECT * FROM t WHERE id IN (:ids)",
///     &params,
///     PlaceholderStyle::Sqlite,
/// )?;
/// assert_eq!(expanded.sql, "SELECT * FROM t WHERE id IN (?1, ?2)");
/// # Ok::<(), QueryError>(())
/// ```
///
/// # Errors
///
/// Returns `QueryError::InvalidArgument` if a placeholder has no bound parameter.
pub fn expand_placeholders(
    sql: &str,
    params: &Parameters,
    style: PlaceholderStyle,
) -> Result<ExpandedStatement, QueryError> {
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::with_capacity(params.len());
    let mut positional = params.positional();
    let mut copied = 0;
    let mut idx = 0;

    while idx < bytes.len() {
        if let Some(end) = skip_opaque(bytes, idx) {
            idx = end;
            continue;
        }

        let (end, param) = match bytes[idx] {
            // `::type` cast
            b':' if bytes.get(idx + 1) == Some(&b':') => {
                idx += 2;
                continue;
            }
            b':' => match scan_name(bytes, idx + 1) {
                Some((end, name)) => (end, lookup(params, &ParameterKey::Named(name.to_string()))?),
                None => {
                    idx += 1;
                    continue;
                }
            },
            b'?' => match scan_position(bytes, idx + 1) {
                Some((end, digits)) => {
                    let position = digits.parse::<usize>().map_err(|e| {
                        QueryError::InvalidArgument(format!(
                            "invalid positional placeholder ?{digits}: {e}"
                        ))
                    })?;
                    (end, lookup(params, &ParameterKey::Positional(position))?)
                }
                None => {
                    let param = positional.next().ok_or_else(|| {
                        QueryError::InvalidArgument(
                            "more `?` placeholders than positional parameters".to_string(),
                        )
                    })?;
                    (idx + 1, param)
                }
            },
            _ => {
                idx += 1;
                continue;
            }
        };

        out.push_str(&sql[copied..idx]);
        emit(&mut out, &mut values, &param.value, style);
        copied = end;
        idx = end;
    }

    out.push_str(&sql[copied..]);
    trace!(placeholders = values.len(), "expanded statement placeholders");
    Ok(ExpandedStatement { sql: out, values })
}

fn lookup<'a>(params: &'a Parameters, key: &ParameterKey) -> Result<&'a Parameter, QueryError> {
    params.get(key).ok_or_else(|| {
        QueryError::InvalidArgument(format!("no value bound for placeholder {key}"))
    })
}

fn emit(out: &mut String, values: &mut Vec<RowValues>, value: &BoundValue, style: PlaceholderStyle) {
    let mut flat = Vec::new();
    value.flatten_into(&mut flat);

    if flat.is_empty() {
        out.push_str("NULL");
        return;
    }

    for (i, scalar) in flat.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        values.push(scalar.clone());
        style.write(out, values.len());
    }
}
