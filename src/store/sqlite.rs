//! SQLite storage engine
//!
//! One embedded database per repository handle, holding the statement set
//! of a single tenant repository. Thread-safe via an internal mutex on the
//! connection; shutdown drops the connection, after which every operation
//! fails with `EngineClosed`.

use super::engine::{OpenEngine, StorageEngine, StorageError, StorageResult};
use crate::model::{Iri, ObjectTerm, Statement};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// SQLite-backed statement store.
pub struct SqliteEngine {
    /// `None` once the engine is shut down
    conn: Mutex<Option<Connection>>,
    initialized: AtomicBool,
}

impl SqliteEngine {
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Statement set; the empty string stands in for "no named graph"
            -- so the uniqueness constraint covers it.
            CREATE TABLE IF NOT EXISTS statements (
                subject TEXT NOT NULL,
                predicate TEXT NOT NULL,
                object_json TEXT NOT NULL,
                graph TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (subject, predicate, object_json, graph)
            );

            CREATE INDEX IF NOT EXISTS idx_statements_subject
                ON statements(subject);

            -- WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            initialized: AtomicBool::new(true),
        })
    }

    fn statement_to_row(statement: &Statement) -> StorageResult<(String, String, String, String)> {
        Ok((
            statement.subject.as_str().to_string(),
            statement.predicate.as_str().to_string(),
            serde_json::to_string(&statement.object)?,
            statement
                .graph
                .as_ref()
                .map(|g| g.as_str().to_string())
                .unwrap_or_default(),
        ))
    }

    fn row_to_statement(
        subject: String,
        predicate: String,
        object_json: String,
        graph: String,
    ) -> StorageResult<Statement> {
        let object: ObjectTerm = serde_json::from_str(&object_json)?;
        Ok(Statement {
            subject: Iri::new(subject),
            predicate: Iri::new(predicate),
            object,
            graph: if graph.is_empty() {
                None
            } else {
                Some(Iri::new(graph))
            },
        })
    }
}

impl OpenEngine for SqliteEngine {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }
}

impl StorageEngine for SqliteEngine {
    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn shut_down(&self) -> StorageResult<()> {
        let mut guard = self.conn.lock().unwrap();
        if let Some(conn) = guard.take() {
            self.initialized.store(false, Ordering::Release);
            conn.close().map_err(|(_, e)| StorageError::Database(e))?;
        }
        Ok(())
    }

    fn insert_statements(&self, statements: &[Statement]) -> StorageResult<usize> {
        let mut guard = self.conn.lock().unwrap();
        let conn = guard.as_mut().ok_or(StorageError::EngineClosed)?;

        let tx = conn.transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR IGNORE INTO statements (subject, predicate, object_json, graph)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for statement in statements {
                let (subject, predicate, object_json, graph) = Self::statement_to_row(statement)?;
                inserted += stmt.execute(params![subject, predicate, object_json, graph])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn remove_statements(&self, statements: &[Statement]) -> StorageResult<usize> {
        let mut guard = self.conn.lock().unwrap();
        let conn = guard.as_mut().ok_or(StorageError::EngineClosed)?;

        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare_cached(
                "DELETE FROM statements
                 WHERE subject = ?1 AND predicate = ?2 AND object_json = ?3 AND graph = ?4",
            )?;
            for statement in statements {
                let (subject, predicate, object_json, graph) = Self::statement_to_row(statement)?;
                removed += stmt.execute(params![subject, predicate, object_json, graph])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn statements_about(&self, subject: &Iri) -> StorageResult<Vec<Statement>> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StorageError::EngineClosed)?;

        let mut stmt = conn.prepare_cached(
            "SELECT subject, predicate, object_json, graph FROM statements
             WHERE subject = ?1
             ORDER BY predicate, object_json",
        )?;
        let rows = stmt.query_map(params![subject.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut statements = Vec::new();
        for row in rows {
            let (subject, predicate, object_json, graph) = row?;
            statements.push(Self::row_to_statement(subject, predicate, object_json, graph)?);
        }
        Ok(statements)
    }

    fn has_subject(&self, subject: &Iri) -> StorageResult<bool> {
        let guard = self.conn.lock().unwrap();
        let conn = guard.as_ref().ok_or(StorageError::EngineClosed)?;

        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM statements WHERE subject = ?1 LIMIT 1",
                params![subject.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::vocab;

    fn statement(subject: &str, predicate: &str, value: &str) -> Statement {
        Statement::new(
            Iri::new(subject),
            Iri::new(predicate),
            ObjectTerm::literal(value),
        )
    }

    // === Scenario: statements round-trip through the engine ===
    #[test]
    fn insert_and_read_back() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let subject = Iri::new("http://example.org/things/a");

        let statements = vec![
            Statement::new(
                subject.clone(),
                Iri::new(vocab::TYPE),
                ObjectTerm::iri("http://example.org/vocab/Thing"),
            ),
            statement(
                "http://example.org/things/a",
                "http://example.org/vocab/label",
                "a thing",
            ),
        ];

        assert_eq!(engine.insert_statements(&statements).unwrap(), 2);
        let read = engine.statements_about(&subject).unwrap();
        assert_eq!(read.len(), 2);
        assert!(engine.has_subject(&subject).unwrap());
    }

    // === Scenario: a repository holds a set, not a bag ===
    #[test]
    fn duplicate_inserts_are_ignored() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let statements = vec![statement("s", "p", "v")];

        assert_eq!(engine.insert_statements(&statements).unwrap(), 1);
        assert_eq!(engine.insert_statements(&statements).unwrap(), 0);
        assert_eq!(engine.statements_about(&Iri::new("s")).unwrap().len(), 1);
    }

    // === Scenario: removal only deletes exact matches ===
    #[test]
    fn remove_is_exact() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        engine
            .insert_statements(&[statement("s", "p", "v1"), statement("s", "p", "v2")])
            .unwrap();

        assert_eq!(engine.remove_statements(&[statement("s", "p", "v1")]).unwrap(), 1);
        assert_eq!(engine.remove_statements(&[statement("s", "p", "v1")]).unwrap(), 0);
        assert_eq!(engine.statements_about(&Iri::new("s")).unwrap().len(), 1);
    }

    // === Scenario: language tags and named graphs survive the round trip ===
    #[test]
    fn tagged_statements_round_trip() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        let tagged = Statement::new(
            Iri::new("s"),
            Iri::new("p"),
            ObjectTerm::literal_with_language("ein Ding", "de"),
        )
        .with_graph(Iri::new("http://example.org/graphs/g1"));

        engine.insert_statements(std::slice::from_ref(&tagged)).unwrap();
        let read = engine.statements_about(&Iri::new("s")).unwrap();
        assert_eq!(read, vec![tagged]);
    }

    // === Scenario: operations after shutdown fail with EngineClosed ===
    #[test]
    fn shutdown_closes_the_engine() {
        let engine = SqliteEngine::open_in_memory().unwrap();
        assert!(engine.is_initialized());

        engine.shut_down().unwrap();
        assert!(!engine.is_initialized());
        assert!(matches!(
            engine.insert_statements(&[statement("s", "p", "v")]),
            Err(StorageError::EngineClosed)
        ));
        // idempotent
        engine.shut_down().unwrap();
    }

    // === Scenario: persistent engines survive reopening ===
    #[test]
    fn persistent_engine_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.db");

        let engine = SqliteEngine::open(&path).unwrap();
        engine.insert_statements(&[statement("s", "p", "v")]).unwrap();
        engine.shut_down().unwrap();

        let reopened = SqliteEngine::open(&path).unwrap();
        assert!(reopened.has_subject(&Iri::new("s")).unwrap());
    }
}
