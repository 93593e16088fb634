pub mod connection;
pub mod repositories;
pub mod schema;
pub mod seed;

pub use connection::{Database, DbPool};

use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Row};
use uuid::Uuid;

/// Read a TEXT column holding a UUID
pub(crate) fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Read a TEXT column holding an RFC3339 timestamp
pub(crate) fn datetime_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    raw.parse::<DateTime<Utc>>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Clamp client-supplied paging values
pub(crate) fn page(limit: Option<i64>, offset: Option<i64>, default_limit: i64) -> (i64, i64) {
    let limit = limit.unwrap_or(default_limit).clamp(1, 100);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
