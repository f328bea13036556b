//! Todo record store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the flat record primitives the tree algorithms depend on
//!   (insert with generated id, fetch by id).
//! - Provide the supporting record lifecycle (list roots, full replace,
//!   subtree delete).
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - Ids are generated on insert and never reused.
//! - A record may only reference children that are already stored
//!   (`todo_children.child_uuid` is a foreign key).
//! - Child lists are returned in stored position order.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::todo::{NewTodo, TodoId, TodoRecord};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by todo repository operations.
pub type TodoRepoResult<T> = Result<T, TodoRepoError>;

/// Errors from todo repository operations.
#[derive(Debug)]
pub enum TodoRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Requested record does not exist.
    NotFound(TodoId),
    /// Record cannot be deleted while another record lists it as a child.
    StillReferenced(TodoId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// Persisted data cannot be converted to a valid record.
    InvalidData(String),
}

impl Display for TodoRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "there is no todo with id {id}"),
            Self::StillReferenced(id) => {
                write!(f, "todo {id} is still referenced by another todo")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "todo repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "todo repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "todo repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid todo data: {message}"),
        }
    }
}

impl Error for TodoRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for TodoRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for TodoRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Record store interface consumed by the tree algorithms.
pub trait TodoRepository {
    /// Stores one record and returns its generated id.
    fn insert_todo(&self, todo: &NewTodo) -> TodoRepoResult<TodoId>;
    /// Loads records in request order; fails with `NotFound` for any
    /// missing id.
    fn fetch_todos(&self, ids: &[TodoId]) -> TodoRepoResult<Vec<TodoRecord>>;
    /// Lists ids of records flagged `is_root`, oldest first.
    fn list_root_ids(&self) -> TodoRepoResult<Vec<TodoId>>;
    /// Replaces every field and the child list of an existing record.
    fn replace_todo(&self, todo: &TodoRecord) -> TodoRepoResult<()>;
    /// Deletes a record plus every descendant left without a parent.
    fn delete_tree(&self, id: TodoId) -> TodoRepoResult<()>;
}

/// SQLite-backed todo repository.
pub struct SqliteTodoRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTodoRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TodoRepoResult<Self> {
        ensure_todo_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TodoRepository for SqliteTodoRepository<'_> {
    fn insert_todo(&self, todo: &NewTodo) -> TodoRepoResult<TodoId> {
        let id = Uuid::new_v4();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO todos (todo_uuid, description, done, is_root)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                id.to_string(),
                todo.description.as_str(),
                bool_to_int(todo.done),
                bool_to_int(todo.is_root),
            ],
        )?;
        write_children(&tx, id, &todo.children)?;
        tx.commit()?;
        Ok(id)
    }

    fn fetch_todos(&self, ids: &[TodoId]) -> TodoRepoResult<Vec<TodoRecord>> {
        let mut records = Vec::with_capacity(ids.len());
        for &id in ids {
            let record = load_record(self.conn, id)?.ok_or(TodoRepoError::NotFound(id))?;
            records.push(record);
        }
        Ok(records)
    }

    fn list_root_ids(&self) -> TodoRepoResult<Vec<TodoId>> {
        let mut stmt = self.conn.prepare(
            "SELECT todo_uuid
             FROM todos
             WHERE is_root = 1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "todos.todo_uuid")?);
        }
        Ok(ids)
    }

    fn replace_todo(&self, todo: &TodoRecord) -> TodoRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE todos
             SET description = ?2,
                 done = ?3,
                 is_root = ?4,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE todo_uuid = ?1;",
            params![
                todo.id.to_string(),
                todo.description.as_str(),
                bool_to_int(todo.done),
                bool_to_int(todo.is_root),
            ],
        )?;
        if changed == 0 {
            return Err(TodoRepoError::NotFound(todo.id));
        }

        tx.execute(
            "DELETE FROM todo_children WHERE parent_uuid = ?1;",
            [todo.id.to_string()],
        )?;
        write_children(&tx, todo.id, &todo.children)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_tree(&self, id: TodoId) -> TodoRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if !record_exists(&tx, id)? {
            return Err(TodoRepoError::NotFound(id));
        }
        if has_parent(&tx, id)? {
            return Err(TodoRepoError::StillReferenced(id));
        }

        let mut pending = vec![id];
        let mut removed = HashSet::new();
        while let Some(current) = pending.pop() {
            if !removed.insert(current) {
                continue;
            }
            let children = load_child_ids(&tx, current)?;
            // Edge rows of `current` go away through ON DELETE CASCADE.
            tx.execute(
                "DELETE FROM todos WHERE todo_uuid = ?1;",
                [current.to_string()],
            )?;
            for child in children {
                if !removed.contains(&child) && !has_parent(&tx, child)? && !is_root(&tx, child)? {
                    pending.push(child);
                }
            }
        }

        tx.commit()?;
        Ok(())
    }
}

fn write_children(conn: &Connection, parent: TodoId, children: &[TodoId]) -> TodoRepoResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO todo_children (parent_uuid, position, child_uuid)
         VALUES (?1, ?2, ?3);",
    )?;
    for (position, child) in children.iter().enumerate() {
        stmt.execute(params![
            parent.to_string(),
            position as i64,
            child.to_string()
        ])?;
    }
    Ok(())
}

fn load_record(conn: &Connection, id: TodoId) -> TodoRepoResult<Option<TodoRecord>> {
    let mut stmt = conn.prepare(
        "SELECT todo_uuid, description, done, is_root
         FROM todos
         WHERE todo_uuid = ?1;",
    )?;
    let mut rows = stmt.query([id.to_string()])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut record = parse_todo_row(row)?;
    record.children = load_child_ids(conn, id)?;
    Ok(Some(record))
}

fn load_child_ids(conn: &Connection, parent: TodoId) -> TodoRepoResult<Vec<TodoId>> {
    let mut stmt = conn.prepare(
        "SELECT child_uuid
         FROM todo_children
         WHERE parent_uuid = ?1
         ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([parent.to_string()])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "todo_children.child_uuid")?);
    }
    Ok(ids)
}

fn record_exists(conn: &Connection, id: TodoId) -> TodoRepoResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM todos WHERE todo_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn has_parent(conn: &Connection, id: TodoId) -> TodoRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM todo_children WHERE child_uuid = ?1
        );",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn is_root(conn: &Connection, id: TodoId) -> TodoRepoResult<bool> {
    let flag: Option<i64> = conn
        .query_row(
            "SELECT is_root FROM todos WHERE todo_uuid = ?1;",
            [id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(flag == Some(1))
}

fn parse_todo_row(row: &Row<'_>) -> TodoRepoResult<TodoRecord> {
    let id_text: String = row.get("todo_uuid")?;
    Ok(TodoRecord {
        id: parse_uuid(&id_text, "todos.todo_uuid")?,
        description: row.get("description")?,
        done: parse_flag(row.get("done")?, "todos.done")?,
        is_root: parse_flag(row.get("is_root")?, "todos.is_root")?,
        children: Vec::new(),
    })
}

fn parse_flag(value: i64, column: &'static str) -> TodoRepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(TodoRepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> TodoRepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| TodoRepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    (
        "todos",
        &[
            "todo_uuid",
            "description",
            "done",
            "is_root",
            "created_at",
            "updated_at",
        ],
    ),
    ("todo_children", &["parent_uuid", "position", "child_uuid"]),
];

fn ensure_todo_connection_ready(conn: &Connection) -> TodoRepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(TodoRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for &(table, columns) in REQUIRED_COLUMNS {
        if !table_exists(conn, table)? {
            return Err(TodoRepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(TodoRepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> TodoRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> TodoRepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
