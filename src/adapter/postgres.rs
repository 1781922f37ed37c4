//! PostgreSQL adapter: one JSONB document table per collection.

use crate::adapter::{paging, upsert_document, Adapter, Document, Query};
use crate::config::DatabaseConfig;
use crate::error::AdapterError;
use crate::logging::Logger;
use crate::model::Schema;
use crate::sql::{self, bind_scalar, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::RwLock;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

pub struct PostgresAdapter {
    pool: PgPool,
    log: Logger,
    /// entity -> table
    tables: RwLock<HashMap<String, String>>,
}

impl PostgresAdapter {
    /// Reads `url` and `max_connections`. Connections are opened on first use.
    pub fn connect_lazy(config: &DatabaseConfig, log: &Logger) -> Result<Self, AdapterError> {
        let url = config
            .option_str("url")
            .ok_or_else(|| AdapterError::Backend("postgres adapter requires a url".into()))?;
        let max = match config.option_u64("max_connections") {
            Some(n) => u32::try_from(n)
                .map_err(|_| AdapterError::Backend(format!("max_connections out of range: {}", n)))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let pool = PgPoolOptions::new().max_connections(max).connect_lazy(url)?;
        Ok(Self::with_pool(pool, log))
    }

    pub fn with_pool(pool: PgPool, log: &Logger) -> Self {
        PostgresAdapter {
            pool,
            log: log.component("database"),
            tables: RwLock::new(HashMap::new()),
        }
    }

    fn table(&self, entity: &str) -> Result<String, AdapterError> {
        let guard = self
            .tables
            .read()
            .map_err(|_| AdapterError::Backend("state lock".into()))?;
        guard
            .get(entity)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownEntity(entity.to_string()))
    }

    async fn fetch_optional(&self, q: &QueryBuf) -> Result<Option<Value>, AdapterError> {
        self.log.debug(format_args!("query: {} {:?}", q.sql, q.params));
        Ok(bind_scalar(&q.sql, &q.params).fetch_optional(&self.pool).await?)
    }

    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AdapterError> {
        self.log.debug(format_args!("query: {} {:?}", q.sql, q.params));
        Ok(bind_scalar(&q.sql, &q.params).fetch_all(&self.pool).await?)
    }

    async fn fetch_one_or_not_found(&self, entity: &str, q: &QueryBuf) -> Result<Value, AdapterError> {
        self.fetch_optional(q)
            .await?
            .ok_or_else(|| AdapterError::NotFound(entity.to_string()))
    }
}

#[async_trait]
impl Adapter for PostgresAdapter {
    async fn define(&self, entity: &str, collection: &str, schema: &Schema) -> Result<(), AdapterError> {
        let ddl = sql::create_table(collection);
        self.log.debug(format_args!(
            "Defining table {} for {} ({} fields)",
            collection,
            entity,
            schema.len()
        ));
        sqlx::query(&ddl).execute(&self.pool).await?;
        let mut guard = self
            .tables
            .write()
            .map_err(|_| AdapterError::Backend("state lock".into()))?;
        guard.insert(entity.to_string(), collection.to_string());
        Ok(())
    }

    async fn all(&self, entity: &str, filter: Query) -> Result<Value, AdapterError> {
        let (offset, limit) = paging(&filter);
        let q = sql::select(&self.table(entity)?, &filter, limit, offset);
        Ok(Value::Array(self.fetch_all(&q).await?))
    }

    async fn find(&self, entity: &str, query: Query) -> Result<Value, AdapterError> {
        let q = sql::select(&self.table(entity)?, &query, Some(1), None);
        self.fetch_one_or_not_found(entity, &q).await
    }

    async fn create(&self, entity: &str, data: Document) -> Result<Value, AdapterError> {
        let q = sql::insert(&self.table(entity)?, &data);
        self.fetch_one_or_not_found(entity, &q).await
    }

    async fn upsert(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        let table = self.table(entity)?;
        let doc = upsert_document(&selector, data);
        let replace = sql::update(&table, &selector, &doc, false);
        if let Some(row) = self.fetch_optional(&replace).await? {
            return Ok(row);
        }
        self.fetch_one_or_not_found(entity, &sql::insert(&table, &doc)).await
    }

    async fn update(&self, entity: &str, selector: Query, data: Document) -> Result<Value, AdapterError> {
        let q = sql::update(&self.table(entity)?, &selector, &data, true);
        self.fetch_one_or_not_found(entity, &q).await
    }

    async fn remove(&self, entity: &str, selector: Query) -> Result<Value, AdapterError> {
        let q = sql::delete(&self.table(entity)?, &selector);
        self.fetch_one_or_not_found(entity, &q).await
    }

    async fn count(&self, entity: &str, filter: Query) -> Result<Value, AdapterError> {
        let q = sql::count(&self.table(entity)?, &filter);
        self.fetch_one_or_not_found(entity, &q).await
    }

    async fn empty(&self, entity: &str) -> Result<(), AdapterError> {
        let stmt = sql::delete_all(&self.table(entity)?);
        self.log.debug(format_args!("query: {}", stmt));
        sqlx::query(&stmt).execute(&self.pool).await?;
        Ok(())
    }
}
