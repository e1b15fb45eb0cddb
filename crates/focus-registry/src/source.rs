//! Source descriptor variants.
//!
//! A [`SourceSpec`] is a data value, not code: it says *how* to fetch one
//! stream of raw records for a [start, end) window, and the matching
//! [`Extractor`](crate::Extractor) implementation in `focus-extract`
//! interprets it. [`SourceSpec::validate`] enforces the structural
//! invariant every variant shares regardless of what it fetches.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use focus_core::error::{Error, Result};

/// How a REST source paginates its responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, strum::Display)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaginationPolicy {
    /// No pagination; the full result set is in one response.
    None,
    /// Pagination cursor carried in a response header (e.g. `Link`).
    HeaderLink { header_name: String },
    /// Pagination cursor carried in the response body.
    Cursor { cursor_field: String, cursor_param: String },
    /// Classic `page=N` pagination.
    PageNumber { page_param: String, page_size_param: Option<String> },
}

/// File format for a filesystem-sourced export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FileFormat {
    Parquet,
    Csv,
    Jsonl,
}

/// Compression applied to a filesystem-sourced export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Compression {
    None,
    Snappy,
    Gzip,
}

/// HTTP method for a REST source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// One source variant's configuration. See [`SourceSpec`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source_type", rename_all = "snake_case")]
pub enum SourceConfig {
    RestApi {
        endpoint_path: String,
        method: HttpMethod,
        #[serde(default)]
        query_params: Value,
        /// JSON-pointer-like path selecting the array of records in the response.
        response_selector: String,
        pagination: PaginationPolicy,
        /// Field names making up the source's natural primary key, used by
        /// the mapper to detect duplicate records within one page.
        primary_key_fields: Vec<String>,
    },
    Filesystem {
        /// `s3://`, `az://`, `gs://`, or `file://` URL understood by the
        /// object-store backend the extractor is configured with.
        url: String,
        glob: String,
        format: FileFormat,
        compression: Compression,
        /// Column holding the charge/usage date, used for pushdown filtering.
        date_column: String,
    },
    SqlDatabase {
        /// Only `{start}`, `{end}`, and `{table}` placeholders are allowed.
        query_template: String,
        table: String,
        chunk_size: u32,
    },
}

impl SourceConfig {
    pub fn source_type(&self) -> &'static str {
        match self {
            SourceConfig::RestApi { .. } => "rest_api",
            SourceConfig::Filesystem { .. } => "filesystem",
            SourceConfig::SqlDatabase { .. } => "sql_database",
        }
    }
}

/// One entry of a [`ProviderMetadata`](crate::ProviderMetadata)-bound source
/// descriptor's output: a named, self-validating fetch spec for one
/// [start, end) window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub config: SourceConfig,
}

impl SourceSpec {
    pub fn new(name: impl Into<String>, config: SourceConfig) -> Self {
        Self { name: name.into(), config }
    }

    /// Structural self-validation every descriptor output must pass:
    /// non-empty name, a recognized source_type, non-empty config.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::config_invalid("source spec name must not be empty"));
        }
        match &self.config {
            SourceConfig::RestApi { endpoint_path, response_selector, .. } => {
                if endpoint_path.trim().is_empty() {
                    return Err(Error::config_invalid("rest_api source requires endpoint_path"));
                }
                if response_selector.trim().is_empty() {
                    return Err(Error::config_invalid("rest_api source requires response_selector"));
                }
            }
            SourceConfig::Filesystem { url, glob, date_column, .. } => {
                if url.trim().is_empty() || glob.trim().is_empty() {
                    return Err(Error::config_invalid("filesystem source requires url and glob"));
                }
                if date_column.trim().is_empty() {
                    return Err(Error::config_invalid("filesystem source requires date_column"));
                }
            }
            SourceConfig::SqlDatabase { query_template, table, chunk_size } => {
                if query_template.trim().is_empty() || table.trim().is_empty() {
                    return Err(Error::config_invalid("sql_database source requires query_template and table"));
                }
                if *chunk_size == 0 {
                    return Err(Error::config_invalid("sql_database source chunk_size must be > 0"));
                }
                validate_sql_placeholders(query_template)?;
            }
        }
        Ok(())
    }
}

/// Rejects any `{placeholder}` in a SQL source's query template other than
/// the three allowed ones, closing off arbitrary string injection
/// into the template.
fn validate_sql_placeholders(template: &str) -> Result<()> {
    const ALLOWED: &[&str] = &["{start}", "{end}", "{table}"];
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let Some(close_rel) = rest[open..].find('}') else {
            return Err(Error::config_invalid("unterminated placeholder in sql_database query_template"));
        };
        let placeholder = &rest[open..open + close_rel + 1];
        if !ALLOWED.contains(&placeholder) {
            return Err(Error::config_invalid(format!(
                "sql_database query_template uses disallowed placeholder {placeholder}"
            )));
        }
        rest = &rest[open + close_rel + 1..];
    }
    Ok(())
}

/// The [start, end) extraction window, shared by every source variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Window {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        Self { start, end }
    }
}
