use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use lectern_db::{Book, ReadingLog, Store};
use lectern_http::error::AppError;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::actions::{self, BookEdit, DeletedBook, LibraryError, LoggedSession, NewBook, NewSession};
use crate::modules::search::BookCandidate;

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Validation { field, message } => AppError::validation(
                vec![json!({ "field": field, "error": message })],
                format!("{field} {message}"),
            ),
            LibraryError::InvalidTransition { status, action } => {
                let message = err.to_string();
                AppError::conflict(vec![json!({ "status": status, "action": action })], message)
            }
            LibraryError::Store(store) => store.into(),
        }
    }
}

pub fn router(store: Arc<Store>) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/from-candidate", post(create_from_candidate))
        .route("/books/{id}", get(get_book).patch(update_book).delete(remove_book))
        .route("/books/{id}/complete", post(complete_book))
        .route("/books/{id}/pause", post(pause_book))
        .route("/books/{id}/resume", post(resume_book))
        .route("/books/{id}/reset", post(reset_book))
        .route("/logs", get(list_logs).post(create_log))
        .route("/logs/{id}", delete(remove_log))
        .with_state(store)
}

/// Books, most recently added first.
async fn list_books(State(store): State<Arc<Store>>) -> Json<Vec<Book>> {
    let mut books = store.books();
    books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(books)
}

async fn create_book(
    State(store): State<Arc<Store>>,
    Json(body): Json<NewBook>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = actions::add_book(&store, body)?;
    Ok((StatusCode::CREATED, Json(book)))
}

#[derive(Debug, Deserialize)]
struct FromCandidate {
    candidate: BookCandidate,
    #[serde(default)]
    total_pages: Option<u32>,
}

async fn create_from_candidate(
    State(store): State<Arc<Store>>,
    Json(body): Json<FromCandidate>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let book = actions::add_from_candidate(&store, &body.candidate, body.total_pages)?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn get_book(State(store): State<Arc<Store>>, Path(id): Path<Uuid>) -> Result<Json<Book>, AppError> {
    store
        .book(id)
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))
}

async fn update_book(
    State(store): State<Arc<Store>>,
    Path(id): Path<Uuid>,
    Json(edit): Json<BookEdit>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(actions::edit_book(&store, id, edit)?))
}

async fn remove_book(
    State(store): State<Arc<Store>>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedBook>, AppError> {
    Ok(Json(actions::delete_book(&store, id)?))
}

async fn complete_book(State(store): State<Arc<Store>>, Path(id): Path<Uuid>) -> Result<Json<Book>, AppError> {
    Ok(Json(actions::mark_complete(&store, id)?))
}

async fn pause_book(State(store): State<Arc<Store>>, Path(id): Path<Uuid>) -> Result<Json<Book>, AppError> {
    Ok(Json(actions::pause(&store, id)?))
}

async fn resume_book(State(store): State<Arc<Store>>, Path(id): Path<Uuid>) -> Result<Json<Book>, AppError> {
    Ok(Json(actions::resume(&store, id)?))
}

async fn reset_book(State(store): State<Arc<Store>>, Path(id): Path<Uuid>) -> Result<Json<Book>, AppError> {
    Ok(Json(actions::reset_progress(&store, id)?))
}

#[derive(Debug, Deserialize)]
struct LogFilter {
    book_id: Option<Uuid>,
}

/// Logs newest first, optionally for one book.
async fn list_logs(State(store): State<Arc<Store>>, Query(filter): Query<LogFilter>) -> Json<Vec<ReadingLog>> {
    let snapshot = store.snapshot();
    let mut logs: Vec<ReadingLog> = match filter.book_id {
        Some(book_id) => snapshot.logs_for(book_id),
        None => snapshot.logs().to_vec(),
    };
    logs.sort_by(|a, b| b.log_date.cmp(&a.log_date));
    Json(logs)
}

async fn create_log(
    State(store): State<Arc<Store>>,
    Json(body): Json<NewSession>,
) -> Result<(StatusCode, Json<LoggedSession>), AppError> {
    let logged = actions::log_session(&store, body)?;
    Ok((StatusCode::CREATED, Json(logged)))
}

async fn remove_log(
    State(store): State<Arc<Store>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReadingLog>, AppError> {
    Ok(Json(actions::delete_log(&store, id)?))
}
