use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

use crate::models::{Task, TimeCategory};

/// Bumped whenever the `tasks` layout changes; a mismatch wipes the table
pub const SCHEMA_VERSION: i64 = 2;

const TASK_COLUMNS: &str =
    "id, title, notes, date, date_completed, time, time_category, timestamp, flag, is_completed";

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Task with ID {0} already exists")]
    DuplicateId(i64),
    #[error("Task with ID {0} not found")]
    NotFound(i64),
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database file and initialize the schema
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let db_path = path.as_ref();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(db_path)?;
        let db = Database { conn };
        db.initialize_schema()?;
        log::debug!("event=db_open path={}", db_path.display());
        Ok(db)
    }

    /// In-memory database, used by tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        let db = Database { conn: Connection::open_in_memory()? };
        db.initialize_schema()?;
        Ok(db)
    }

    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let version: i64 = self.conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version != SCHEMA_VERSION {
            let has_table: i64 = self.conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'tasks'",
                [],
                |row| row.get(0),
            )?;
            if has_table > 0 {
                // No migration path: schema changes start from an empty table
                log::warn!(
                    "event=db_reset from_version={} to_version={}",
                    version,
                    SCHEMA_VERSION
                );
                self.conn.execute("DROP TABLE tasks", [])?;
            }
        }

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                notes           TEXT,
                date            TEXT,
                date_completed  TEXT,
                time            TEXT,
                time_category   TEXT,
                timestamp       INTEGER NOT NULL,
                flag            INTEGER NOT NULL DEFAULT 0,
                is_completed    INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        self.conn.execute("CREATE INDEX IF NOT EXISTS idx_tasks_date ON tasks(date)", [])?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_timestamp ON tasks(timestamp)",
            [],
        )?;
        self.conn
            .execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;

        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    fn row_to_task(row: &rusqlite::Row) -> Result<Task, rusqlite::Error> {
        let category: Option<String> = row.get(6)?;
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            notes: row.get(2)?,
            date: row.get(3)?,
            date_completed: row.get(4)?,
            time: row.get(5)?,
            time_category: category.and_then(|c| c.parse::<TimeCategory>().ok()),
            timestamp: row.get(7)?,
            flag: row.get::<_, i64>(8)? != 0,
            is_completed: row.get::<_, i64>(9)? != 0,
        })
    }

    fn query_tasks(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Task>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM tasks {} ORDER BY timestamp ASC, id ASC",
            TASK_COLUMNS, filter
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params, Self::row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn count(&self, filter: &str, params: impl rusqlite::Params) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM tasks {}", filter);
        Ok(self.conn.query_row(&sql, params, |row| row.get(0))?)
    }

    /// Insert a task and return its id.
    /// `id == 0` lets SQLite assign one; any other id must not exist yet.
    pub fn insert_task(&self, task: &Task) -> Result<i64, DatabaseError> {
        if task.id != 0 && self.get_task(task.id)?.is_some() {
            return Err(DatabaseError::DuplicateId(task.id));
        }

        let id = if task.id == 0 { None } else { Some(task.id) };
        self.conn.execute(
            "INSERT INTO tasks (id, title, notes, date, date_completed, time, time_category, timestamp, flag, is_completed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                id,
                task.title,
                task.notes,
                task.date,
                task.date_completed,
                task.time,
                task.time_category.map(|c| c.as_str()),
                task.timestamp,
                task.flag,
                task.is_completed,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Replace every column of an existing task
    pub fn update_task(&self, task: &Task) -> Result<(), DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE tasks SET title = ?1, notes = ?2, date = ?3, date_completed = ?4, time = ?5,
             time_category = ?6, timestamp = ?7, flag = ?8, is_completed = ?9 WHERE id = ?10",
            rusqlite::params![
                task.title,
                task.notes,
                task.date,
                task.date_completed,
                task.time,
                task.time_category.map(|c| c.as_str()),
                task.timestamp,
                task.flag,
                task.is_completed,
                task.id,
            ],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(task.id));
        }
        tx.commit()?;
        Ok(())
    }

    /// Update only the completion columns
    pub fn update_task_completion(
        &self,
        id: i64,
        is_completed: bool,
        date_completed: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET is_completed = ?1, date_completed = ?2 WHERE id = ?3",
            rusqlite::params![is_completed, date_completed, id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(id));
        }
        Ok(())
    }

    /// Delete a task by id, returns whether a row was removed
    pub fn delete_task(&self, id: i64) -> Result<bool, DatabaseError> {
        let removed = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }

    /// Delete every completed task, returns the number of rows removed
    pub fn delete_completed_tasks(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM tasks WHERE is_completed = 1", [])?)
    }

    /// Delete every task
    pub fn delete_all_tasks(&self) -> Result<usize, DatabaseError> {
        Ok(self.conn.execute("DELETE FROM tasks", [])?)
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, DatabaseError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = ?1", TASK_COLUMNS);
        Ok(self.conn.query_row(&sql, [id], Self::row_to_task).optional()?)
    }

    /// Case-insensitive substring match on title
    pub fn tasks_by_title(&self, title: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE title LIKE '%' || ?1 || '%' ESCAPE '\\'",
            [escape_like(title)],
        )
    }

    pub fn incomplete_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("WHERE is_completed = 0", [])
    }

    pub fn completed_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("WHERE is_completed = 1", [])
    }

    pub fn all_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("", [])
    }

    /// Incomplete tasks dated exactly `date`
    pub fn tasks_for_date(&self, date: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("WHERE date = ?1 AND is_completed = 0", [date])
    }

    /// Incomplete tasks dated between `start` and `end`, inclusive
    pub fn tasks_in_date_range(&self, start: &str, end: &str) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks(
            "WHERE date BETWEEN ?1 AND ?2 AND is_completed = 0",
            [start, end],
        )
    }

    /// Incomplete flagged tasks
    pub fn flagged_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("WHERE flag = 1 AND is_completed = 0", [])
    }

    /// Incomplete tasks that carry a date, for alarm scheduling
    pub fn dated_incomplete_tasks(&self) -> Result<Vec<Task>, DatabaseError> {
        self.query_tasks("WHERE date IS NOT NULL AND date != '' AND is_completed = 0", [])
    }

    pub fn count_incomplete(&self) -> Result<i64, DatabaseError> {
        self.count("WHERE is_completed = 0", [])
    }

    pub fn count_completed(&self) -> Result<i64, DatabaseError> {
        self.count("WHERE is_completed = 1", [])
    }

    pub fn count_all(&self) -> Result<i64, DatabaseError> {
        self.count("", [])
    }

    pub fn count_for_date(&self, date: &str) -> Result<i64, DatabaseError> {
        self.count("WHERE date = ?1 AND is_completed = 0", [date])
    }

    pub fn count_in_date_range(&self, start: &str, end: &str) -> Result<i64, DatabaseError> {
        self.count("WHERE date BETWEEN ?1 AND ?2 AND is_completed = 0", [start, end])
    }

    pub fn count_flagged(&self) -> Result<i64, DatabaseError> {
        self.count("WHERE flag = 1 AND is_completed = 0", [])
    }

    pub fn count_by_title(&self, title: &str) -> Result<i64, DatabaseError> {
        self.count(
            "WHERE title LIKE '%' || ?1 || '%' ESCAPE '\\'",
            [escape_like(title)],
        )
    }
}

fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
