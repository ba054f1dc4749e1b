//! Error type for `cairn-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Invalid input, duplicate session, or bad configuration.
  #[error(transparent)]
  Core(#[from] cairn_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The store kept reporting a write conflict after every retry.
  #[error("transaction conflict persisted after {attempts} attempts")]
  TransactionConflict { attempts: u32 },

  #[error("contradiction not found: {0}")]
  ContradictionNotFound(uuid::Uuid),

  #[error("contradiction {0} is already resolved")]
  AlreadyResolved(uuid::Uuid),
}

impl Error {
  /// `SQLITE_BUSY` / `SQLITE_LOCKED`: another connection holds the write
  /// lock. Worth retrying.
  pub fn is_conflict(&self) -> bool {
    let sqlite = match self {
      Self::Sqlite(e) => e,
      Self::Database(tokio_rusqlite::Error::Rusqlite(e)) => e,
      _ => return false,
    };
    matches!(
      sqlite,
      rusqlite::Error::SqliteFailure(failure, _)
        if matches!(
          failure.code,
          rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        )
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  fn failure(code: std::os::raw::c_int) -> rusqlite::Error {
    rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
  }

  #[test]
  fn busy_and_locked_are_conflicts() {
    assert!(Error::Sqlite(failure(rusqlite::ffi::SQLITE_BUSY)).is_conflict());
    assert!(Error::Sqlite(failure(rusqlite::ffi::SQLITE_LOCKED)).is_conflict());
    assert!(
      Error::Database(tokio_rusqlite::Error::Rusqlite(failure(rusqlite::ffi::SQLITE_BUSY)))
        .is_conflict()
    );
  }

  #[test]
  fn other_failures_are_not_conflicts() {
    assert!(!Error::Sqlite(failure(rusqlite::ffi::SQLITE_CONSTRAINT)).is_conflict());
    assert!(!Error::TransactionConflict { attempts: 4 }.is_conflict());
  }
}
