#![allow(dead_code)]

use rusqlite::Connection;
use std::cell::{Cell, RefCell};
use todotree_core::db::open_db_in_memory;
use todotree_core::{
    NewTodo, SqliteTodoRepository, TodoId, TodoRecord, TodoRepoError, TodoRepoResult,
    TodoRepository,
};

pub fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Store call observed by [`RecordingRepo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Insert(NewTodo),
    Fetch(Vec<TodoId>),
    ListRoots,
    Replace(TodoRecord),
    Delete(TodoId),
}

/// Repository wrapper that records every call and can fail a chosen insert.
pub struct RecordingRepo<R> {
    inner: R,
    calls: RefCell<Vec<Call>>,
    inserted: RefCell<Vec<TodoId>>,
    fail_insert_at: Cell<Option<usize>>,
    inserts_seen: Cell<usize>,
}

impl<R: TodoRepository> RecordingRepo<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: RefCell::new(Vec::new()),
            inserted: RefCell::new(Vec::new()),
            fail_insert_at: Cell::new(None),
            inserts_seen: Cell::new(0),
        }
    }

    /// Makes the insert with zero-based ordinal `ordinal` fail.
    pub fn fail_insert_at(&self, ordinal: usize) {
        self.fail_insert_at.set(Some(ordinal));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn inserts(&self) -> Vec<NewTodo> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Insert(todo) => Some(todo.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids returned by successful inserts, in call order.
    pub fn inserted_ids(&self) -> Vec<TodoId> {
        self.inserted.borrow().clone()
    }

    pub fn fetches(&self) -> Vec<Vec<TodoId>> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                Call::Fetch(ids) => Some(ids.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
        self.inserted.borrow_mut().clear();
    }
}

impl<R: TodoRepository> TodoRepository for RecordingRepo<R> {
    fn insert_todo(&self, todo: &NewTodo) -> TodoRepoResult<TodoId> {
        self.calls.borrow_mut().push(Call::Insert(todo.clone()));
        let ordinal = self.inserts_seen.get();
        self.inserts_seen.set(ordinal + 1);
        if self.fail_insert_at.get() == Some(ordinal) {
            return Err(TodoRepoError::InvalidData(format!(
                "insert {ordinal} rejected"
            )));
        }
        let id = self.inner.insert_todo(todo)?;
        self.inserted.borrow_mut().push(id);
        Ok(id)
    }

    fn fetch_todos(&self, ids: &[TodoId]) -> TodoRepoResult<Vec<TodoRecord>> {
        self.calls.borrow_mut().push(Call::Fetch(ids.to_vec()));
        self.inner.fetch_todos(ids)
    }

    fn list_root_ids(&self) -> TodoRepoResult<Vec<TodoId>> {
        self.calls.borrow_mut().push(Call::ListRoots);
        self.inner.list_root_ids()
    }

    fn replace_todo(&self, todo: &TodoRecord) -> TodoRepoResult<()> {
        self.calls.borrow_mut().push(Call::Replace(todo.clone()));
        self.inner.replace_todo(todo)
    }

    fn delete_tree(&self, id: TodoId) -> TodoRepoResult<()> {
        self.calls.borrow_mut().push(Call::Delete(id));
        self.inner.delete_tree(id)
    }
}

pub fn recording(conn: &Connection) -> RecordingRepo<SqliteTodoRepository<'_>> {
    RecordingRepo::new(SqliteTodoRepository::try_new(conn).unwrap())
}

pub fn count_todos(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM todos;", [], |row| row.get(0))
        .unwrap()
}

pub fn fetch_one<R: TodoRepository>(repo: &R, id: TodoId) -> TodoRecord {
    repo.fetch_todos(&[id]).unwrap().remove(0)
}
