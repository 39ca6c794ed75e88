pub mod actions;
pub mod routes;

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::Router;
use lectern_db::Store;
use lectern_events::LibraryEvent;
use lectern_kernel::{InitCtx, Module};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub use actions::LibraryError;

/// Books and reading sessions: cataloging, logging and status changes.
pub struct LibraryModule {
    store: Arc<Store>,
    activity: Mutex<Option<JoinHandle<()>>>,
}

impl LibraryModule {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            activity: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Module for LibraryModule {
    fn name(&self) -> &'static str {
        "library"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let snapshot = self.store.snapshot();
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = snapshot.books().len(),
            logs = snapshot.logs().len(),
            "library module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let mut events = ctx.events.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => record_activity(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(target: "lectern::activity", skipped, "activity log fell behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        let previous = self
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }

        tracing::info!(module = self.name(), "library module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        if let Some(task) = self
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        tracing::info!(module = self.name(), "library module stopped");
        Ok(())
    }
}

fn record_activity(event: &LibraryEvent) {
    match event {
        LibraryEvent::BookDeleted {
            book_id,
            cascaded_logs,
        } => {
            tracing::info!(target: "lectern::activity", %book_id, cascaded_logs, "book removed from library");
        }
        other => {
            tracing::debug!(target: "lectern::activity", book_id = %other.book_id(), event = ?other, "library changed");
        }
    }
}

fn openapi_fragment() -> serde_json::Value {
    let error = json!({
        "description": "Error",
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
    });
    let book = json!({
        "description": "Book",
        "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Book" } } }
    });
    let id_param = json!([{ "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }]);
    let status_action = |summary: &str| {
        json!({
            "post": {
                "summary": summary,
                "tags": ["Library"],
                "parameters": id_param,
                "responses": { "200": book, "404": error, "409": error }
            }
        })
    };

    json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Library"],
                    "responses": {
                        "200": {
                            "description": "Books",
                            "content": { "application/json": { "schema": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } } } }
                        }
                    }
                },
                "post": {
                    "summary": "Add a book by hand",
                    "tags": ["Library"],
                    "responses": { "201": book, "422": error }
                }
            },
            "/books/from-candidate": {
                "post": {
                    "summary": "Add a book from a search candidate",
                    "tags": ["Library"],
                    "responses": { "201": book, "422": error }
                }
            },
            "/books/{id}": {
                "get": { "summary": "Get a book", "tags": ["Library"], "parameters": id_param, "responses": { "200": book, "404": error } },
                "patch": {
                    "summary": "Edit a book; absent fields are unchanged",
                    "tags": ["Library"],
                    "parameters": id_param,
                    "requestBody": {
                        "content": { "application/json": { "schema": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "author": { "type": "string" },
                                "total_pages": { "type": "integer", "minimum": 1 },
                                "current_page": { "type": "integer", "minimum": 0 },
                                "image_url": { "type": "string" },
                                "status": { "type": "string", "enum": ["to_read", "reading", "paused", "completed"] }
                            }
                        } } }
                    },
                    "responses": { "200": book, "404": error, "422": error }
                },
                "delete": { "summary": "Delete a book and its logs", "tags": ["Library"], "parameters": id_param, "responses": { "200": { "description": "Deleted book and log count" }, "404": error } }
            },
            "/books/{id}/complete": status_action("Mark a book completed"),
            "/books/{id}/pause": status_action("Pause a book"),
            "/books/{id}/resume": status_action("Resume a paused book"),
            "/books/{id}/reset": status_action("Reset reading progress"),
            "/logs": {
                "get": {
                    "summary": "List reading logs, newest first",
                    "tags": ["Library"],
                    "parameters": [{ "name": "book_id", "in": "query", "required": false, "schema": { "type": "string", "format": "uuid" } }],
                    "responses": {
                        "200": {
                            "description": "Reading logs",
                            "content": { "application/json": { "schema": { "type": "array", "items": { "$ref": "#/components/schemas/ReadingLog" } } } }
                        }
                    }
                },
                "post": {
                    "summary": "Log a reading session",
                    "tags": ["Library"],
                    "responses": { "201": { "description": "Stored log and updated book" }, "404": error, "422": error }
                }
            },
            "/logs/{id}": {
                "delete": { "summary": "Delete a reading log", "tags": ["Library"], "parameters": id_param, "responses": { "200": { "description": "Deleted log" }, "404": error } }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "total_pages": { "type": "integer", "minimum": 1 },
                        "current_page": { "type": "integer", "minimum": 0 },
                        "status": { "type": "string", "enum": ["to_read", "reading", "paused", "completed"] },
                        "image_url": { "type": "string", "nullable": true },
                        "created_at": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "total_pages", "current_page", "status", "created_at"]
                },
                "ReadingLog": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "format": "uuid" },
                        "book_id": { "type": "string", "format": "uuid" },
                        "pages_read": { "type": "integer", "minimum": 1 },
                        "reading_time_minutes": { "type": "integer", "nullable": true },
                        "log_date": { "type": "string", "format": "date-time" },
                        "notes": { "type": "string", "nullable": true }
                    },
                    "required": ["id", "book_id", "pages_read", "log_date"]
                }
            }
        }
    })
}

/// Create the library module over the shared store.
pub fn create_module(store: Arc<Store>) -> Arc<dyn Module> {
    Arc::new(LibraryModule::new(store))
}
