use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use lectern_events::{EventBus, LibraryEvent};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::StoreError;
use crate::records::{Book, ReadingLog};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LibraryState {
    #[serde(default)]
    books: Vec<Book>,
    #[serde(default)]
    logs: Vec<ReadingLog>,
}

/// Immutable view of the library at one point in time.
///
/// Records keep insertion order; callers sort by `log_date` when they
/// need chronology.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    books: Arc<Vec<Book>>,
    logs: Arc<Vec<ReadingLog>>,
}

impl Snapshot {
    fn from_state(state: &LibraryState) -> Self {
        Self {
            books: Arc::new(state.books.clone()),
            logs: Arc::new(state.logs.clone()),
        }
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn logs(&self) -> &[ReadingLog] {
        &self.logs
    }

    pub fn book(&self, id: Uuid) -> Option<&Book> {
        self.books.iter().find(|book| book.id == id)
    }

    pub fn log(&self, id: Uuid) -> Option<&ReadingLog> {
        self.logs.iter().find(|log| log.id == id)
    }

    /// Logs belonging to one book, in insertion order.
    pub fn logs_for(&self, book_id: Uuid) -> Vec<ReadingLog> {
        self.logs
            .iter()
            .filter(|log| log.book_id == book_id)
            .cloned()
            .collect()
    }
}

/// Staged mutations applied atomically by [`Store::transact`].
pub struct Transaction<'a> {
    state: &'a mut LibraryState,
    events: Vec<LibraryEvent>,
}

impl Transaction<'_> {
    pub fn book(&self, id: Uuid) -> Option<&Book> {
        self.state.books.iter().find(|book| book.id == id)
    }

    pub fn insert_book(&mut self, mut book: Book) -> Book {
        book.clamp_current_page();
        self.events.push(LibraryEvent::BookAdded { book_id: book.id });
        self.state.books.push(book.clone());
        book
    }

    /// Mutate a book in place. `id` and `created_at` cannot be changed and
    /// `current_page` is clamped to `total_pages` afterwards.
    pub fn update_book<F>(&mut self, id: Uuid, mutate: F) -> Result<Book, StoreError>
    where
        F: FnOnce(&mut Book),
    {
        let book = self
            .state
            .books
            .iter_mut()
            .find(|book| book.id == id)
            .ok_or(StoreError::BookNotFound(id))?;

        let created_at = book.created_at;
        mutate(book);
        book.id = id;
        book.created_at = created_at;
        book.clamp_current_page();

        self.events.push(LibraryEvent::BookUpdated { book_id: id });
        Ok(book.clone())
    }

    /// Insert a log. The referenced book must exist.
    pub fn insert_log(&mut self, log: ReadingLog) -> Result<ReadingLog, StoreError> {
        if self.book(log.book_id).is_none() {
            return Err(StoreError::BookNotFound(log.book_id));
        }
        self.events.push(LibraryEvent::LogAdded {
            log_id: log.id,
            book_id: log.book_id,
        });
        self.state.logs.push(log.clone());
        Ok(log)
    }

    pub fn delete_log(&mut self, id: Uuid) -> Result<ReadingLog, StoreError> {
        let index = self
            .state
            .logs
            .iter()
            .position(|log| log.id == id)
            .ok_or(StoreError::LogNotFound(id))?;
        let log = self.state.logs.remove(index);
        self.events.push(LibraryEvent::LogDeleted {
            log_id: log.id,
            book_id: log.book_id,
        });
        Ok(log)
    }

    /// Delete every log of the book, then the book itself.
    /// Returns the removed book and the number of removed logs.
    pub fn delete_book_cascade(&mut self, id: Uuid) -> Result<(Book, usize), StoreError> {
        let index = self
            .state
            .books
            .iter()
            .position(|book| book.id == id)
            .ok_or(StoreError::BookNotFound(id))?;

        let before = self.state.logs.len();
        self.state.logs.retain(|log| log.book_id != id);
        let cascaded_logs = before - self.state.logs.len();

        let book = self.state.books.remove(index);
        self.events.push(LibraryEvent::BookDeleted {
            book_id: id,
            cascaded_logs,
        });
        Ok((book, cascaded_logs))
    }
}

/// Book and reading-log store.
///
/// Writes go through [`Store::transact`]: the closure works on a staged copy
/// that replaces the live state only if it succeeds (and, for file-backed
/// stores, only once the file has been written). Each commit publishes a
/// fresh [`Snapshot`] to live subscribers and one [`LibraryEvent`] per change.
pub struct Store {
    state: RwLock<LibraryState>,
    snapshots: watch::Sender<Snapshot>,
    events: EventBus,
    path: Option<PathBuf>,
}

impl Store {
    /// A store that lives only as long as the process.
    pub fn in_memory(events: EventBus) -> Self {
        Self::from_state(LibraryState::default(), events, None)
    }

    /// A store backed by a JSON file. A missing file starts an empty library.
    pub fn open(path: impl Into<PathBuf>, events: EventBus) -> Result<Self, StoreError> {
        let path = path.into();
        let state = if path.exists() {
            let bytes = fs::read(&path).map_err(|source| StoreError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Serialization {
                path: path.clone(),
                source,
            })?
        } else {
            LibraryState::default()
        };

        tracing::info!(
            target: "lectern-db",
            path = %path.display(),
            books = state.books.len(),
            logs = state.logs.len(),
            "store opened"
        );

        Ok(Self::from_state(state, events, Some(path)))
    }

    fn from_state(state: LibraryState, events: EventBus, path: Option<PathBuf>) -> Self {
        let (snapshots, _) = watch::channel(Snapshot::from_state(&state));
        Self {
            state: RwLock::new(state),
            snapshots,
            events,
            path,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Live query: the receiver yields a new snapshot after every commit.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.subscribe()
    }

    pub fn books(&self) -> Vec<Book> {
        self.snapshot().books().to_vec()
    }

    pub fn logs(&self) -> Vec<ReadingLog> {
        self.snapshot().logs().to_vec()
    }

    pub fn book(&self, id: Uuid) -> Option<Book> {
        self.snapshot().book(id).cloned()
    }

    /// Apply several mutations as one atomic unit.
    pub fn transact<T, F>(&self, apply: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, StoreError>,
    {
        let (value, events) = {
            let mut live = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let mut staged = live.clone();
            let mut tx = Transaction {
                state: &mut staged,
                events: Vec::new(),
            };
            let value = apply(&mut tx)?;
            let events = tx.events;
            if events.is_empty() {
                return Ok(value);
            }

            if let Some(path) = &self.path {
                persist(path, &staged)?;
            }
            *live = staged;
            self.snapshots.send_replace(Snapshot::from_state(&live));
            (value, events)
        };

        tracing::debug!(target: "lectern-db", changes = events.len(), "store commit");
        for event in events {
            self.events.publish(event);
        }
        Ok(value)
    }

    pub fn insert_book(&self, book: Book) -> Result<Book, StoreError> {
        self.transact(|tx| Ok(tx.insert_book(book)))
    }

    pub fn update_book<F>(&self, id: Uuid, mutate: F) -> Result<Book, StoreError>
    where
        F: FnOnce(&mut Book),
    {
        self.transact(|tx| tx.update_book(id, mutate))
    }

    pub fn insert_log(&self, log: ReadingLog) -> Result<ReadingLog, StoreError> {
        self.transact(|tx| tx.insert_log(log))
    }

    pub fn delete_log(&self, id: Uuid) -> Result<ReadingLog, StoreError> {
        self.transact(|tx| tx.delete_log(id))
    }

    pub fn delete_book_cascade(&self, id: Uuid) -> Result<(Book, usize), StoreError> {
        self.transact(|tx| tx.delete_book_cascade(id))
    }
}

fn persist(path: &Path, state: &LibraryState) -> Result<(), StoreError> {
    let io_error = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let bytes = serde_json::to_vec_pretty(state).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, bytes).map_err(io_error)?;
    fs::rename(&staging, path).map_err(io_error)?;
    Ok(())
}
