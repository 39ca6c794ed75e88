use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use lectern_db::Store;
use lectern_http::error::AppError;
use serde::Deserialize;
use uuid::Uuid;

use super::analytics::BookAnalytics;
use super::engine::{log_summary, Dashboard, LogSummary};
use super::live::DashboardFeed;

#[derive(Clone)]
pub struct StatsApi {
    pub store: Arc<Store>,
    pub feed: Arc<DashboardFeed>,
}

pub fn router(api: StatsApi) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/books/{id}", get(book_analytics))
        .route("/logs/summary", get(summary))
        .with_state(api)
}

async fn dashboard(State(api): State<StatsApi>) -> Json<Dashboard> {
    Json(api.feed.current())
}

async fn book_analytics(
    State(api): State<StatsApi>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookAnalytics>, AppError> {
    let snapshot = api.store.snapshot();
    let book = snapshot
        .book(id)
        .ok_or_else(|| AppError::not_found(format!("book {id} not found")))?;
    Ok(Json(BookAnalytics::compute(book, snapshot.logs())))
}

#[derive(Debug, Deserialize)]
struct SummaryFilter {
    book_id: Option<Uuid>,
}

/// Totals over all logs, or one book's logs.
async fn summary(State(api): State<StatsApi>, Query(filter): Query<SummaryFilter>) -> Json<LogSummary> {
    let snapshot = api.store.snapshot();
    Json(match filter.book_id {
        Some(book_id) => log_summary(&snapshot.logs_for(book_id)),
        None => log_summary(snapshot.logs()),
    })
}
