//! Bind values for document-table queries.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryScalar;

/// A value bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum PgParam {
    Text(String),
    BigInt(i64),
    Json(Value),
}

impl PgParam {
    /// Lookup values compare as text against `doc ->> key`; non-string JSON uses its literal form.
    pub fn text_of(v: &Value) -> Self {
        match v {
            Value::String(s) => PgParam::Text(s.clone()),
            other => PgParam::Text(other.to_string()),
        }
    }
}

/// Build a scalar query returning one JSON value per row, with `params` bound in order.
pub fn bind_scalar<'q>(sql: &'q str, params: &'q [PgParam]) -> QueryScalar<'q, Postgres, Value, PgArguments> {
    let mut query = sqlx::query_scalar::<_, Value>(sql);
    for p in params {
        query = match p {
            PgParam::Text(s) => query.bind(s.as_str()),
            PgParam::BigInt(n) => query.bind(*n),
            PgParam::Json(v) => query.bind(sqlx::types::Json(v)),
        };
    }
    query
}
