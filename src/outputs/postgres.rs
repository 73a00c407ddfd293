//! Postgres sink.
//!
//! The pool is created once at startup and passed in; each batch takes one
//! connection for one transaction. Tables are expected to exist with the
//! columns `title, description, full_text, date, url` (`date` nullable
//! timestamp). Keys and deduplication are the table's business.

use super::NewsSink;
use crate::error::SinkError;
use crate::models::NewsItem;
use crate::utils::is_plain_identifier;
use sqlx::PgPool;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct PgNewsSink {
    pool: PgPool,
}

impl PgNewsSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect to `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, SinkError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self::new(pool))
    }
}

pub(crate) fn insert_statement(table: &str) -> Result<String, SinkError> {
    if !is_plain_identifier(table) {
        return Err(SinkError::InvalidTable(table.to_string()));
    }
    Ok(format!(
        "INSERT INTO {table} (title, description, full_text, date, url) VALUES ($1, $2, $3, $4, $5)"
    ))
}

impl NewsSink for PgNewsSink {
    /// Insert all of `items` into table `topic`, or none of them.
    #[instrument(level = "info", skip(self, items), fields(count = items.len()))]
    async fn store(&self, topic: &str, items: &[NewsItem]) -> Result<u64, SinkError> {
        let sql = insert_statement(topic)?;
        if items.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for item in items {
            let res = sqlx::query(&sql)
                .bind(&item.title)
                .bind(&item.description)
                .bind(&item.full_text)
                .bind(item.published_at.timestamp())
                .bind(&item.url)
                .execute(&mut *tx)
                .await?;
            inserted += res.rows_affected();
        }
        tx.commit().await?;

        info!(table = %topic, inserted, "Inserted news batch");
        Ok(inserted)
    }
}
