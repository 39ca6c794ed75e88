//! Record-mutating user actions and the book status conventions they enforce.

use lectern_db::{Book, BookStatus, ReadingLog, Store, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::modules::search::BookCandidate;
use crate::utils::trimmed_non_empty;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },

    #[error("cannot {action} a book that is {}", .status.display_name())]
    InvalidTransition {
        status: BookStatus,
        action: &'static str,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn invalid(field: &'static str, message: &'static str) -> LibraryError {
    LibraryError::Validation { field, message }
}

/// A book entered by hand.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub total_pages: u32,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial edit; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookEdit {
    pub title: Option<String>,
    pub author: Option<String>,
    pub total_pages: Option<u32>,
    pub current_page: Option<u32>,
    pub image_url: Option<String>,
    pub status: Option<BookStatus>,
}

/// A reading session about to be logged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSession {
    pub book_id: Uuid,
    pub pages_read: u32,
    #[serde(default)]
    pub reading_time_minutes: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of logging a session: the stored log and the book after it.
#[derive(Debug, Clone, Serialize)]
pub struct LoggedSession {
    pub log: ReadingLog,
    pub book: Book,
}

/// Result of deleting a book.
#[derive(Debug, Clone, Serialize)]
pub struct DeletedBook {
    pub book: Book,
    pub deleted_logs: usize,
}

pub fn add_book(store: &Store, new: NewBook) -> Result<Book, LibraryError> {
    let title = trimmed_non_empty(&new.title).ok_or_else(|| invalid("title", "must not be empty"))?;
    let author =
        trimmed_non_empty(&new.author).ok_or_else(|| invalid("author", "must not be empty"))?;
    if new.total_pages == 0 {
        return Err(invalid("total_pages", "must be greater than zero"));
    }

    let image_url = new.image_url.as_deref().and_then(trimmed_non_empty);
    let book = store.insert_book(Book::new(title, author, new.total_pages).with_image_url(image_url))?;
    tracing::info!(book_id = %book.id, title = %book.title, "book added");
    Ok(book)
}

/// Catalog a search result. A candidate without a page count needs one
/// from the caller.
pub fn add_from_candidate(
    store: &Store,
    candidate: &BookCandidate,
    total_pages: Option<u32>,
) -> Result<Book, LibraryError> {
    let total_pages = total_pages
        .filter(|pages| *pages > 0)
        .unwrap_or(candidate.page_count);

    add_book(
        store,
        NewBook {
            title: candidate.title.clone(),
            author: candidate.authors_text(),
            total_pages,
            image_url: candidate.thumbnail_url.clone(),
        },
    )
}

/// Apply a partial edit in one commit.
///
/// An explicit `Completed` status moves the book to its last page, and
/// any other explicit status needs the book to be short of it. Without a
/// status, reaching the last page completes the book.
pub fn edit_book(store: &Store, id: Uuid, edit: BookEdit) -> Result<Book, LibraryError> {
    let title = match &edit.title {
        Some(title) => Some(trimmed_non_empty(title).ok_or_else(|| invalid("title", "must not be empty"))?),
        None => None,
    };
    let author = match &edit.author {
        Some(author) => {
            Some(trimmed_non_empty(author).ok_or_else(|| invalid("author", "must not be empty"))?)
        }
        None => None,
    };
    if edit.total_pages == Some(0) {
        return Err(invalid("total_pages", "must be greater than zero"));
    }

    let book = store.transact(|tx| {
        let current = tx.book(id).ok_or(StoreError::BookNotFound(id))?;
        let total_pages = edit.total_pages.unwrap_or(current.total_pages);
        let mut current_page = edit.current_page.unwrap_or(current.current_page);
        if current_page > total_pages {
            return Ok(Err(invalid("current_page", "must not exceed total pages")));
        }

        let status = match edit.status {
            Some(BookStatus::Completed) => {
                current_page = total_pages;
                BookStatus::Completed
            }
            Some(_) if current_page == total_pages => {
                return Ok(Err(invalid("status", "a book on its last page is completed")));
            }
            Some(status) => status,
            None if current_page == total_pages => BookStatus::Completed,
            None => current.status,
        };

        tx.update_book(id, |book| {
            if let Some(title) = title {
                book.title = title;
            }
            if let Some(author) = author {
                book.author = author;
            }
            if let Some(image_url) = edit.image_url {
                book.image_url = trimmed_non_empty(&image_url);
            }
            book.total_pages = total_pages;
            book.current_page = current_page;
            book.status = status;
        })
        .map(Ok)
    })??;
    tracing::info!(book_id = %id, status = ?book.status, "book edited");
    Ok(book)
}

/// Record a session and advance the book in the same commit.
///
/// The current page moves forward by `pages_read`, capped at the total.
/// Reaching the total completes the book; a first session on a `ToRead`
/// book starts it.
pub fn log_session(store: &Store, session: NewSession) -> Result<LoggedSession, LibraryError> {
    if session.pages_read == 0 {
        return Err(invalid("pages_read", "must be greater than zero"));
    }
    if session.reading_time_minutes == Some(0) {
        return Err(invalid("reading_time_minutes", "must be greater than zero"));
    }

    let log = ReadingLog::new(
        session.book_id,
        session.pages_read,
        session.reading_time_minutes,
        session.notes,
    );

    let logged = store.transact(|tx| {
        let log = tx.insert_log(log)?;
        let book = tx.update_book(log.book_id, |book| advance(book, log.pages_read))?;
        Ok(LoggedSession { log, book })
    })?;

    tracing::info!(
        book_id = %logged.book.id,
        pages = logged.log.pages_read,
        current_page = logged.book.current_page,
        status = ?logged.book.status,
        "reading session logged"
    );
    Ok(logged)
}

fn advance(book: &mut Book, pages_read: u32) {
    book.current_page = book
        .current_page
        .saturating_add(pages_read)
        .min(book.total_pages);

    if book.current_page >= book.total_pages {
        book.status = BookStatus::Completed;
    } else if book.status == BookStatus::ToRead {
        book.status = BookStatus::Reading;
    }
}

/// Jump to the last page. Completing a completed book changes nothing.
pub fn mark_complete(store: &Store, id: Uuid) -> Result<Book, LibraryError> {
    let book = store.update_book(id, |book| {
        book.current_page = book.total_pages;
        book.status = BookStatus::Completed;
    })?;
    tracing::info!(book_id = %id, "book completed");
    Ok(book)
}

pub fn pause(store: &Store, id: Uuid) -> Result<Book, LibraryError> {
    transition(store, id, "pause", |status| match status {
        BookStatus::Completed => None,
        _ => Some(BookStatus::Paused),
    })
}

pub fn resume(store: &Store, id: Uuid) -> Result<Book, LibraryError> {
    transition(store, id, "resume", |status| match status {
        BookStatus::Paused => Some(BookStatus::Reading),
        _ => None,
    })
}

/// Back to page zero and `ToRead`. Logged sessions are kept.
pub fn reset_progress(store: &Store, id: Uuid) -> Result<Book, LibraryError> {
    let book = store.update_book(id, |book| {
        book.current_page = 0;
        book.status = BookStatus::ToRead;
    })?;
    tracing::info!(book_id = %id, "book progress reset");
    Ok(book)
}

fn transition<F>(store: &Store, id: Uuid, action: &'static str, next: F) -> Result<Book, LibraryError>
where
    F: FnOnce(BookStatus) -> Option<BookStatus>,
{
    let book = store.transact(|tx| {
        let status = tx.book(id).ok_or(StoreError::BookNotFound(id))?.status;
        match next(status) {
            Some(target) => tx.update_book(id, |book| book.status = target).map(Ok),
            None => Ok(Err(LibraryError::InvalidTransition { status, action })),
        }
    })??;
    tracing::info!(book_id = %id, action, status = ?book.status, "book status changed");
    Ok(book)
}

/// Delete a book and, in the same commit, every log that points at it.
pub fn delete_book(store: &Store, id: Uuid) -> Result<DeletedBook, LibraryError> {
    let (book, deleted_logs) = store.delete_book_cascade(id)?;
    tracing::info!(book_id = %id, deleted_logs, "book deleted");
    Ok(DeletedBook { book, deleted_logs })
}

pub fn delete_log(store: &Store, id: Uuid) -> Result<ReadingLog, LibraryError> {
    let log = store.delete_log(id)?;
    tracing::info!(log_id = %id, book_id = %log.book_id, "reading log deleted");
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lectern_events::EventBus;

    fn store() -> Store {
        Store::in_memory(EventBus::default())
    }

    fn new_book(total_pages: u32) -> NewBook {
        NewBook {
            title: "The Hobbit".into(),
            author: "J. R. R. Tolkien".into(),
            total_pages,
            image_url: None,
        }
    }

    fn session(book_id: Uuid, pages_read: u32) -> NewSession {
        NewSession {
            book_id,
            pages_read,
            reading_time_minutes: Some(30),
            notes: None,
        }
    }

    #[test]
    fn add_book_validates_and_trims() {
        let store = store();

        let err = add_book(&store, NewBook { title: "   ".into(), ..new_book(10) }).unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "title", .. }));
        let err = add_book(&store, new_book(0)).unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "total_pages", .. }));

        let book = add_book(&store, NewBook { title: "  Emma ".into(), ..new_book(300) }).unwrap();
        assert_eq!(book.title, "Emma");
        assert_eq!(book.status, BookStatus::ToRead);
        assert_eq!(store.books().len(), 1);
    }

    #[test]
    fn sessions_advance_until_completion() {
        let store = store();
        let book = add_book(&store, new_book(200)).unwrap();

        let first = log_session(&store, session(book.id, 50)).unwrap();
        assert_eq!(first.book.current_page, 50);
        assert_eq!(first.book.status, BookStatus::Reading);

        log_session(&store, session(book.id, 80)).unwrap();
        let last = log_session(&store, session(book.id, 90)).unwrap();

        assert_eq!(last.book.current_page, 200);
        assert_eq!(last.book.status, BookStatus::Completed);
        assert_eq!(store.logs().len(), 3);
    }

    #[test]
    fn session_for_unknown_book_changes_nothing() {
        let store = store();
        let err = log_session(&store, session(Uuid::new_v4(), 10)).unwrap_err();

        assert!(matches!(err, LibraryError::Store(StoreError::BookNotFound(_))));
        assert!(store.logs().is_empty());
    }

    #[test]
    fn zero_pages_is_rejected() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();
        let err = log_session(&store, session(book.id, 0)).unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "pages_read", .. }));
    }

    #[test]
    fn paused_book_stays_paused_while_logging() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();
        log_session(&store, session(book.id, 10)).unwrap();
        pause(&store, book.id).unwrap();

        let logged = log_session(&store, session(book.id, 10)).unwrap();
        assert_eq!(logged.book.status, BookStatus::Paused);
        assert_eq!(resume(&store, book.id).unwrap().status, BookStatus::Reading);
    }

    #[test]
    fn status_transitions() {
        let store = store();
        let book = add_book(&store, new_book(120)).unwrap();

        let err = resume(&store, book.id).unwrap_err();
        assert!(matches!(err, LibraryError::InvalidTransition { action: "resume", .. }));

        let done = mark_complete(&store, book.id).unwrap();
        assert_eq!(done.current_page, 120);
        assert_eq!(mark_complete(&store, book.id).unwrap(), done);

        let err = pause(&store, book.id).unwrap_err();
        assert_eq!(err.to_string(), "cannot pause a book that is Completed");

        let reset = reset_progress(&store, book.id).unwrap();
        assert_eq!(reset.current_page, 0);
        assert_eq!(reset.status, BookStatus::ToRead);
    }

    #[test]
    fn edit_rejects_current_page_past_total() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();

        let err = edit_book(
            &store,
            book.id,
            BookEdit { total_pages: Some(50), current_page: Some(80), ..BookEdit::default() },
        )
        .unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "current_page", .. }));

        let edited = edit_book(
            &store,
            book.id,
            BookEdit { author: Some("Tolkien".into()), current_page: Some(40), ..BookEdit::default() },
        )
        .unwrap();
        assert_eq!(edited.author, "Tolkien");
        assert_eq!(edited.current_page, 40);
        assert_eq!(edited.title, "The Hobbit");
    }

    #[test]
    fn edit_sets_status_with_page_conventions() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();
        log_session(&store, session(book.id, 100)).unwrap();

        let err = edit_book(
            &store,
            book.id,
            BookEdit { status: Some(BookStatus::Reading), ..BookEdit::default() },
        )
        .unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "status", .. }));

        let reopened = edit_book(
            &store,
            book.id,
            BookEdit {
                status: Some(BookStatus::Reading),
                current_page: Some(60),
                ..BookEdit::default()
            },
        )
        .unwrap();
        assert_eq!(reopened.status, BookStatus::Reading);
        assert_eq!(reopened.current_page, 60);

        let finished = edit_book(
            &store,
            book.id,
            BookEdit { status: Some(BookStatus::Completed), ..BookEdit::default() },
        )
        .unwrap();
        assert_eq!(finished.status, BookStatus::Completed);
        assert_eq!(finished.current_page, 100);
    }

    #[test]
    fn edit_reaching_the_last_page_completes() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();

        let edited = edit_book(
            &store,
            book.id,
            BookEdit { current_page: Some(100), ..BookEdit::default() },
        )
        .unwrap();
        assert_eq!(edited.status, BookStatus::Completed);

        let grown = edit_book(
            &store,
            book.id,
            BookEdit { total_pages: Some(300), ..BookEdit::default() },
        )
        .unwrap();
        assert_eq!(grown.status, BookStatus::Completed);
        assert_eq!(grown.current_page, 100);
    }

    #[test]
    fn edit_validates_against_committed_progress() {
        let store = store();
        let book = add_book(&store, new_book(100)).unwrap();
        log_session(&store, session(book.id, 80)).unwrap();

        let err = edit_book(
            &store,
            book.id,
            BookEdit { total_pages: Some(50), ..BookEdit::default() },
        )
        .unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "current_page", .. }));
        assert_eq!(store.book(book.id).unwrap().total_pages, 100);

        let err = edit_book(&store, Uuid::new_v4(), BookEdit::default()).unwrap_err();
        assert!(matches!(err, LibraryError::Store(StoreError::BookNotFound(_))));
    }

    #[test]
    fn candidate_keeps_all_authors_and_cover() {
        let store = store();
        let candidate = BookCandidate {
            id: "g1".into(),
            title: "Good Omens".into(),
            authors: vec!["Terry Pratchett".into(), "Neil Gaiman".into()],
            page_count: 0,
            thumbnail_url: Some("http://img/g1.jpg".into()),
            description: None,
            published_date: None,
            categories: None,
        };

        let err = add_from_candidate(&store, &candidate, None).unwrap_err();
        assert!(matches!(err, LibraryError::Validation { field: "total_pages", .. }));

        let book = add_from_candidate(&store, &candidate, Some(412)).unwrap();
        assert_eq!(book.author, "Terry Pratchett, Neil Gaiman");
        assert_eq!(book.total_pages, 412);
        assert_eq!(book.image_url.as_deref(), Some("http://img/g1.jpg"));
    }

    #[test]
    fn delete_cascades_to_logs() {
        let store = store();
        let kept = add_book(&store, new_book(100)).unwrap();
        let doomed = add_book(&store, new_book(100)).unwrap();
        log_session(&store, session(kept.id, 5)).unwrap();
        log_session(&store, session(doomed.id, 5)).unwrap();
        log_session(&store, session(doomed.id, 5)).unwrap();

        let deleted = delete_book(&store, doomed.id).unwrap();

        assert_eq!(deleted.deleted_logs, 2);
        assert_eq!(store.books().len(), 1);
        assert!(store.logs().iter().all(|log| log.book_id == kept.id));
    }
}
