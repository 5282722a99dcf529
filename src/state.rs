use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::advice::AdviceProvider;
use crate::db::{self, DatabaseError};

/// Shared application state, constructed once at startup and injected
/// into every handler. Connections are opened per request; SQLite
/// serializes concurrent writers.
pub struct AppState {
    db_path: PathBuf,
    pub advice: Arc<dyn AdviceProvider>,
}

impl AppState {
    pub fn new(db_path: PathBuf, advice: Arc<dyn AdviceProvider>) -> Self {
        Self { db_path, advice }
    }

    /// Open a fresh connection. Migrations are idempotent and cheap
    /// once applied, so every open goes through the same path.
    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::MockAdvice;

    #[test]
    fn open_db_creates_and_migrates() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(
            tmp.path().join("test.db"),
            Arc::new(MockAdvice::returning("ok")),
        );
        let conn = state.open_db().unwrap();
        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, 3);
    }

    #[test]
    fn reopening_sees_persisted_rows() {
        let tmp = tempfile::tempdir().unwrap();
        let state = AppState::new(
            tmp.path().join("test.db"),
            Arc::new(MockAdvice::returning("ok")),
        );
        {
            let conn = state.open_db().unwrap();
            conn.execute(
                "INSERT INTO medicamentos (nome, dosagem, dias, dataInicio)
                 VALUES ('Dipirona', '500mg', 3, '2026-03-01T08:00:00')",
                [],
            )
            .unwrap();
        }
        let conn = state.open_db().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM medicamentos", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
