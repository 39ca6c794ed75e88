pub mod client;
pub mod debouncer;
pub mod error;
pub mod models;

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use lectern_http::error::AppError;
use lectern_kernel::{InitCtx, Module};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub use client::{BookSearch, GoogleBooksClient};
pub use debouncer::{SearchDebouncer, SearchState};
pub use error::SearchError;
pub use models::BookCandidate;

/// Remote book metadata search: a direct query endpoint and a shared
/// search-as-you-type draft.
pub struct SearchModule {
    client: Arc<dyn BookSearch>,
    draft: SearchDebouncer,
}

impl SearchModule {
    pub fn new(client: Arc<dyn BookSearch>, draft: SearchDebouncer) -> Self {
        Self { client, draft }
    }
}

#[derive(Clone)]
struct SearchApi {
    client: Arc<dyn BookSearch>,
    draft: SearchDebouncer,
}

#[async_trait]
impl Module for SearchModule {
    fn name(&self) -> &'static str {
        "search"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            base_url = %ctx.settings.search.base_url,
            quiet_period_ms = ctx.settings.search.quiet_period_ms,
            "search module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(search))
            .route("/draft", get(draft_state).put(draft_text).delete(clear_draft))
            .route("/draft/select", post(select_candidate))
            .route("/draft/selection", delete(clear_selection))
            .route("/draft/retry", post(retry_draft))
            .with_state(SearchApi {
                client: self.client.clone(),
                draft: self.draft.clone(),
            })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let draft_response = json!({
            "description": "Current search field state",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SearchDraft" } } }
        });

        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "Search remote book metadata",
                        "tags": ["Search"],
                        "parameters": [
                            { "name": "q", "in": "query", "required": true, "schema": { "type": "string" } }
                        ],
                        "responses": {
                            "200": {
                                "description": "Matching candidates (empty for a blank query)",
                                "content": {
                                    "application/json": {
                                        "schema": { "type": "array", "items": { "$ref": "#/components/schemas/BookCandidate" } }
                                    }
                                }
                            },
                            "502": {
                                "description": "Metadata API failed",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
                            }
                        }
                    }
                },
                "/draft": {
                    "get": { "summary": "Read the search field state", "tags": ["Search"], "responses": { "200": draft_response } },
                    "put": { "summary": "Change the search text", "tags": ["Search"], "responses": { "200": draft_response } },
                    "delete": { "summary": "Clear the search field", "tags": ["Search"], "responses": { "200": draft_response } }
                },
                "/draft/select": {
                    "post": {
                        "summary": "Select a candidate from the current results",
                        "tags": ["Search"],
                        "responses": {
                            "200": draft_response,
                            "404": { "description": "No such candidate in the current results" }
                        }
                    }
                },
                "/draft/selection": {
                    "delete": { "summary": "Drop the selection and search again", "tags": ["Search"], "responses": { "200": draft_response } }
                },
                "/draft/retry": {
                    "post": {
                        "summary": "Retry a failed search",
                        "tags": ["Search"],
                        "responses": {
                            "200": draft_response,
                            "409": { "description": "The last search did not fail" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "BookCandidate": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "authors": { "type": "array", "items": { "type": "string" } },
                            "page_count": { "type": "integer" },
                            "thumbnail_url": { "type": "string", "nullable": true },
                            "description": { "type": "string", "nullable": true },
                            "published_date": { "type": "string", "nullable": true },
                            "categories": { "type": "array", "items": { "type": "string" }, "nullable": true }
                        },
                        "required": ["id", "title", "authors", "page_count"]
                    },
                    "SearchDraft": {
                        "type": "object",
                        "properties": {
                            "text": { "type": "string" },
                            "state": {
                                "type": "object",
                                "description": "Tagged by `state`: idle, debouncing, searching, results, empty, failed, selected"
                            }
                        },
                        "required": ["text", "state"]
                    }
                }
            }
        }))
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.draft.clear();
        tracing::info!(module = self.name(), "search module stopped");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn search(
    State(api): State<SearchApi>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<BookCandidate>>, AppError> {
    let candidates = api
        .client
        .search(&query.q)
        .await
        .map_err(|err| AppError::upstream(err.code(), err.to_string()))?;
    Ok(Json(candidates))
}

#[derive(Debug, Serialize)]
struct DraftView {
    text: String,
    state: SearchState,
}

impl DraftView {
    fn of(draft: &SearchDebouncer) -> Json<Self> {
        Json(Self {
            text: draft.text(),
            state: draft.state(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct DraftText {
    text: String,
}

#[derive(Debug, Deserialize)]
struct CandidateChoice {
    id: String,
}

async fn draft_state(State(api): State<SearchApi>) -> Json<DraftView> {
    DraftView::of(&api.draft)
}

async fn draft_text(State(api): State<SearchApi>, Json(body): Json<DraftText>) -> Json<DraftView> {
    api.draft.on_text_changed(body.text);
    DraftView::of(&api.draft)
}

async fn clear_draft(State(api): State<SearchApi>) -> Json<DraftView> {
    api.draft.clear();
    DraftView::of(&api.draft)
}

async fn select_candidate(
    State(api): State<SearchApi>,
    Json(choice): Json<CandidateChoice>,
) -> Result<Json<DraftView>, AppError> {
    api.draft
        .select(&choice.id)
        .ok_or_else(|| AppError::not_found(format!("candidate {} is not in the current results", choice.id)))?;
    Ok(DraftView::of(&api.draft))
}

async fn clear_selection(State(api): State<SearchApi>) -> Json<DraftView> {
    api.draft.clear_selection();
    DraftView::of(&api.draft)
}

async fn retry_draft(State(api): State<SearchApi>) -> Result<Json<DraftView>, AppError> {
    if !api.draft.retry() {
        return Err(AppError::conflict(
            vec![json!({ "state": api.draft.state() })],
            "only a failed search can be retried",
        ));
    }
    Ok(DraftView::of(&api.draft))
}

/// Create the search module around a client, sharing one draft debouncer.
pub fn create_module(client: Arc<dyn BookSearch>, draft: SearchDebouncer) -> Arc<dyn Module> {
    Arc::new(SearchModule::new(client, draft))
}
