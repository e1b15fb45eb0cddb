//! SQL warehouse extractor.
//!
//! Built on `tokio-postgres` directly rather than diesel: a
//! `SqlDatabase` source's `query_template` and resulting column set are
//! arbitrary per provider (a customer's own CUR-mirroring warehouse table),
//! which diesel's compile-time-checked query DSL cannot express. Its shape
//! (connect once, `tracing` around each query, typed error mapping) follows
//! the rest of this crate's extractors for consistency.

use focus_core::error::{Error, Result};
use focus_registry::source::{SourceConfig, SourceSpec};
use focus_registry::traits::{ExtractContext, ExtractedBatch, Extractor};
use jiff::Timestamp;
use serde_json::Value;
use tokio_postgres::types::Type;
use tokio_postgres::{Client, NoTls, Row};

pub const TRACING_TARGET: &str = "focus_extract::sql";

pub struct SqlDatabaseExtractor {
    client: Client,
}

impl SqlDatabaseExtractor {
    /// Connects to the warehouse named by `conninfo` (a libpq connection
    /// string), spawning the connection's background I/O task the way
    /// every `tokio-postgres` caller must.
    pub async fn connect(conninfo: &str) -> Result<Self> {
        let (client, connection) = tokio_postgres::connect(conninfo, NoTls)
            .await
            .map_err(|err| Error::config_invalid(format!("failed to connect to warehouse: {err}")))?;

        tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::warn!(target: TRACING_TARGET, error = %err, "warehouse connection closed with error");
            }
        });

        Ok(Self { client })
    }

    fn render_query(template: &str, table: &str) -> String {
        template
            .replace("{table}", table)
            .replace("{start}", "$1")
            .replace("{end}", "$2")
    }
}

fn row_to_json(row: &Row) -> Value {
    let mut object = serde_json::Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = match *column.type_() {
            Type::INT2 => row.try_get::<_, Option<i16>>(idx).ok().flatten().map(Value::from),
            Type::INT4 => row.try_get::<_, Option<i32>>(idx).ok().flatten().map(Value::from),
            Type::INT8 => row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Value::from),
            Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).ok().flatten().map(Value::from),
            Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Value::from),
            Type::BOOL => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Value::from),
            Type::TIMESTAMPTZ | Type::TIMESTAMP => row
                .try_get::<_, Option<TimestampText>>(idx)
                .unwrap_or(None)
                .map(Value::from),
            _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::from),
        };
        object.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }
    Value::Object(object)
}

/// `tokio-postgres` has no built-in string conversion for timestamp
/// columns without the `chrono` or `jiff-postgres`-style feature wiring;
/// columns are read back as their textual representation instead, which
/// `focus-mapper` parses with `jiff` on the way to a `FocusRecord`.
type TimestampText = String;

#[async_trait::async_trait]
impl Extractor for SqlDatabaseExtractor {
    async fn extract(&self, ctx: &ExtractContext<'_>, source: &SourceSpec) -> Result<Vec<ExtractedBatch>> {
        let SourceConfig::SqlDatabase { query_template, table, chunk_size } = &source.config else {
            return Err(Error::internal_bug("SqlDatabaseExtractor received a non-sql_database source"));
        };

        if ctx.cancellation.is_cancelled() {
            return Err(Error::cancelled());
        }

        let sql = Self::render_query(query_template, table);
        tracing::debug!(target: TRACING_TARGET, source = %source.name, %sql, "running warehouse query");

        let start = ctx.window.start.to_string();
        let end = ctx.window.end.to_string();
        let rows = self
            .client
            .query(&sql, &[&start, &end])
            .await
            .map_err(|err| Error::source_failed(format!("warehouse query failed: {err}")))?;

        let mut batches = Vec::new();
        for chunk in rows.chunks(*chunk_size as usize) {
            if ctx.cancellation.is_cancelled() {
                return Err(Error::cancelled());
            }
            let records: Vec<Value> = chunk.iter().map(row_to_json).collect();
            let payload = Value::Array(records.clone());
            let blob = focus_core::raw_blob::RawBlob::new(
                ctx.provider.id,
                ctx.run_id,
                source.name.clone(),
                source.config.source_type(),
                ctx.window.start,
                ctx.window.end,
                payload,
                records.len() as u32,
                Timestamp::now(),
            );
            let raw_blob_id = blob.id;
            ctx.sink.store(blob).await?;
            batches.push(ExtractedBatch { source_name: source.name.clone(), records, raw_blob_id });
        }

        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_query_substitutes_table_and_positional_params() {
        let rendered = SqlDatabaseExtractor::render_query(
            "select * from {table} where charge_date between {start} and {end}",
            "billing_export",
        );
        assert_eq!(rendered, "select * from billing_export where charge_date between $1 and $2");
    }
}
