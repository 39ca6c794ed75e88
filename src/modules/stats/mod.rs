pub mod analytics;
pub mod engine;
pub mod live;
pub mod routes;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use lectern_db::Store;
use lectern_kernel::{settings::ReadingSettings, InitCtx, Module};
use serde_json::json;

pub use analytics::{BookAnalytics, TimeToFinish};
pub use engine::{Dashboard, LogSummary, Trend};
pub use live::DashboardFeed;

/// Derived reading statistics: dashboard, per-book analytics and log totals.
pub struct StatsModule {
    api: routes::StatsApi,
}

impl StatsModule {
    pub fn new(store: Arc<Store>, reading: ReadingSettings) -> Self {
        let feed = Arc::new(DashboardFeed::new(store.clone(), reading));
        Self {
            api: routes::StatsApi { store, feed },
        }
    }
}

#[async_trait]
impl Module for StatsModule {
    fn name(&self) -> &'static str {
        "stats"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            daily_goal_pages = ctx.settings.reading.daily_goal_pages,
            week_start = ?ctx.settings.reading.week_start,
            "stats module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.api.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = json!({
            "description": "Error",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/ErrorResponse" } } }
        });

        Some(json!({
            "paths": {
                "/dashboard": {
                    "get": {
                        "summary": "Today, week and year totals, streak and recent books",
                        "tags": ["Stats"],
                        "responses": {
                            "200": {
                                "description": "Dashboard",
                                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Dashboard" } } }
                            }
                        }
                    }
                },
                "/books/{id}": {
                    "get": {
                        "summary": "Reading speed and time to finish for one book",
                        "tags": ["Stats"],
                        "parameters": [{ "name": "id", "in": "path", "required": true, "schema": { "type": "string", "format": "uuid" } }],
                        "responses": {
                            "200": { "description": "Book analytics" },
                            "404": error
                        }
                    }
                },
                "/logs/summary": {
                    "get": {
                        "summary": "Total pages, sessions and average pages per session",
                        "tags": ["Stats"],
                        "parameters": [{ "name": "book_id", "in": "query", "required": false, "schema": { "type": "string", "format": "uuid" } }],
                        "responses": { "200": { "description": "Log summary" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Dashboard": {
                        "type": "object",
                        "properties": {
                            "date": { "type": "string", "format": "date" },
                            "today_pages": { "type": "integer" },
                            "today_minutes": { "type": "integer" },
                            "daily_goal_pages": { "type": "integer" },
                            "daily_goal_progress": { "type": "number", "minimum": 0, "maximum": 1 },
                            "week_pages": { "type": "integer" },
                            "weekly_trend": { "type": "string", "enum": ["up", "down", "neutral"] },
                            "books_this_year": { "type": "integer" },
                            "yearly_trend": { "type": "string", "enum": ["up", "down", "neutral"] },
                            "streak_days": { "type": "integer" },
                            "recent_books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                            "last_logged_book": { "$ref": "#/components/schemas/Book" }
                        }
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.api.feed.start();
        tracing::info!(module = self.name(), "stats module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.api.feed.stop();
        tracing::info!(module = self.name(), "stats module stopped");
        Ok(())
    }
}

/// Create the stats module over the shared store.
pub fn create_module(store: Arc<Store>, reading: ReadingSettings) -> Arc<dyn Module> {
    Arc::new(StatsModule::new(store, reading))
}
