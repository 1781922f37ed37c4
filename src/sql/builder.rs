//! Builds parameterized statements over document tables: one table per collection with a
//! `BIGSERIAL` id and a JSONB `doc`. Rows come back as `doc` with `id` merged in.

use crate::adapter::{Document, Query, PAGING_KEYS};
use crate::sql::PgParam;
use serde_json::Value;

/// Row projection: the stored document with its id.
const ROW: &str = "doc || jsonb_build_object('id', id)";

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<PgParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: PgParam) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// " WHERE ..." for every non-paging key, or empty. `id` compares against the id column.
    fn push_where(&mut self, query: &Query) -> String {
        let mut parts = Vec::new();
        for (key, value) in query {
            if PAGING_KEYS.contains(&key.as_str()) {
                continue;
            }
            let v = self.push_param(PgParam::text_of(value));
            if key == "id" {
                parts.push(format!("id::text = ${}", v));
            } else {
                let k = self.push_param(PgParam::Text(key.clone()));
                parts.push(format!("doc ->> ${} = ${}", k, v));
            }
        }
        if parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", parts.join(" AND "))
        }
    }
}

/// Document without `id`; the id lives in its own column.
fn body(doc: &Document) -> Value {
    let mut body = doc.clone();
    body.remove("id");
    Value::Object(body)
}

pub fn create_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id BIGSERIAL PRIMARY KEY, doc JSONB NOT NULL DEFAULT '{{}}'::jsonb)",
        quoted(table)
    )
}

/// SELECT matching rows ordered by id, with optional LIMIT/OFFSET.
pub fn select(table: &str, filter: &Query, limit: Option<u64>, offset: Option<u64>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.push_where(filter);
    let limit_clause = limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = offset.map(|n| format!(" OFFSET {}", n)).unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY id{}{}",
        ROW,
        quoted(table),
        where_clause,
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(table: &str, filter: &Query) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = q.push_where(filter);
    q.sql = format!("SELECT to_jsonb(COUNT(*)) FROM {}{}", quoted(table), where_clause);
    q
}

/// INSERT one document. An integer `id` is written to the id column; otherwise the sequence assigns it.
pub fn insert(table: &str, doc: &Document) -> QueryBuf {
    let mut q = QueryBuf::new();
    let t = quoted(table);
    match doc.get("id").and_then(Value::as_i64) {
        Some(id) => {
            let i = q.push_param(PgParam::BigInt(id));
            let d = q.push_param(PgParam::Json(body(doc)));
            q.sql = format!("INSERT INTO {} (id, doc) VALUES (${}, ${}) RETURNING {}", t, i, d, ROW);
        }
        None => {
            let d = q.push_param(PgParam::Json(body(doc)));
            q.sql = format!("INSERT INTO {} (doc) VALUES (${}) RETURNING {}", t, d, ROW);
        }
    }
    q
}

/// UPDATE the first row matching `selector`. `merge` keeps existing keys (PATCH); otherwise the document is replaced.
pub fn update(table: &str, selector: &Query, doc: &Document, merge: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    let t = quoted(table);
    let d = q.push_param(PgParam::Json(body(doc)));
    let where_clause = q.push_where(selector);
    let set = if merge {
        format!("doc = doc || ${}", d)
    } else {
        format!("doc = ${}", d)
    };
    q.sql = format!(
        "UPDATE {} SET {} WHERE id = (SELECT id FROM {}{} ORDER BY id LIMIT 1) RETURNING {}",
        t, set, t, where_clause, ROW
    );
    q
}

/// DELETE the first row matching `selector`, returning it.
pub fn delete(table: &str, selector: &Query) -> QueryBuf {
    let mut q = QueryBuf::new();
    let t = quoted(table);
    let where_clause = q.push_where(selector);
    q.sql = format!(
        "DELETE FROM {} WHERE id = (SELECT id FROM {}{} ORDER BY id LIMIT 1) RETURNING {}",
        t, t, where_clause, ROW
    );
    q
}

pub fn delete_all(table: &str) -> String {
    format!("DELETE FROM {}", quoted(table))
}
