//! [`SqliteStore`] — the SQLite implementation of [`VisitStore`].

use std::{path::Path, sync::LazyLock};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use tally_core::{
  query::{VisitFilter, VisitQuery},
  store::VisitStore,
  visit::{NewVisit, VisitFields, VisitRecord},
};

use crate::{
  Result,
  encode::{RawVisit, encode_source, encode_ts},
  predicate::Predicate,
  schema::SCHEMA,
};

/// `INSERT` covering `timestamp`, `source` and every descriptive column.
static INSERT_SQL: LazyLock<String> = LazyLock::new(|| {
  let columns = VisitFields::COLUMNS.join(", ");
  let placeholders = vec!["?"; VisitFields::COLUMNS.len() + 2].join(", ");
  format!("INSERT INTO visits (timestamp, source, {columns}) VALUES ({placeholders})")
});

// ─── Store ───────────────────────────────────────────────────────────────────

/// A visit log backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert a row stamped with `at`.
  pub(crate) async fn append_at(
    &self,
    visit: NewVisit,
    at: DateTime<Utc>,
  ) -> Result<VisitRecord> {
    let mut values: Vec<String> = Vec::with_capacity(VisitFields::COLUMNS.len() + 2);
    values.push(encode_ts(at));
    values.push(encode_source(visit.source).to_owned());
    values.extend(visit.fields.values().into_iter().map(str::to_owned));

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(INSERT_SQL.as_str(), rusqlite::params_from_iter(values.iter()))?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(VisitRecord {
      id,
      timestamp: at,
      source: visit.source,
      fields: visit.fields,
    })
  }
}

// ─── VisitStore impl ─────────────────────────────────────────────────────────

impl VisitStore for SqliteStore {
  type Error = crate::Error;

  async fn append(&self, visit: NewVisit) -> Result<VisitRecord> {
    self.append_at(visit, Utc::now()).await
  }

  async fn fetch(&self, query: &VisitQuery) -> Result<Vec<VisitRecord>> {
    let predicate = Predicate::build(&query.filter);
    let sql = format!(
      "SELECT * FROM visits{} ORDER BY timestamp DESC, id DESC LIMIT ? OFFSET ?",
      predicate.where_sql()
    );
    let mut binds = predicate.binds().to_vec();
    binds.push(Value::Integer(i64::from(query.limit)));
    binds.push(Value::Integer(i64::from(query.offset)));

    let raws: Vec<RawVisit> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(binds.iter()), RawVisit::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVisit::into_record).collect()
  }

  async fn count(&self, filter: &VisitFilter) -> Result<u64> {
    let predicate = Predicate::build(filter);
    let sql = format!("SELECT COUNT(*) FROM visits{}", predicate.where_sql());
    let binds = predicate.binds().to_vec();

    let total: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          &sql,
          rusqlite::params_from_iter(binds.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;

    Ok(total.max(0) as u64)
  }
}
