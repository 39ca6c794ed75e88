use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use lectern_db::BookStatus;
use lectern_kernel::{InitCtx, Module, Palette, ThemeContext, ThemeKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Display preferences. Currently the active color theme.
pub struct PreferencesModule {
    theme: Arc<ThemeContext>,
}

impl PreferencesModule {
    pub fn new(theme: Arc<ThemeContext>) -> Self {
        Self { theme }
    }
}

#[async_trait]
impl Module for PreferencesModule {
    fn name(&self) -> &'static str {
        "preferences"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            theme = self.theme.active().display_name(),
            "preferences module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/theme", get(current_theme).put(change_theme))
            .with_state(self.theme.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let theme = json!({
            "description": "Active theme with its palette and status colors",
            "content": { "application/json": { "schema": { "$ref": "#/components/schemas/Theme" } } }
        });
        Some(json!({
            "paths": {
                "/theme": {
                    "get": { "summary": "Active theme", "tags": ["Preferences"], "responses": { "200": theme } },
                    "put": { "summary": "Switch theme", "tags": ["Preferences"], "responses": { "200": theme } }
                }
            },
            "components": {
                "schemas": {
                    "Theme": {
                        "type": "object",
                        "properties": {
                            "active": { "type": "string", "enum": ["catppuccin_mocha", "solarized_dark", "nord"] },
                            "display_name": { "type": "string" },
                            "available": { "type": "array", "items": { "type": "string" } },
                            "palette": { "type": "object" },
                            "status_colors": { "type": "object" }
                        }
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Serialize)]
struct ThemeView {
    active: ThemeKind,
    display_name: &'static str,
    available: [ThemeKind; 3],
    palette: &'static Palette,
    status_colors: BTreeMap<BookStatus, &'static str>,
}

impl ThemeView {
    fn of(theme: ThemeKind) -> Self {
        let palette = theme.palette();
        Self {
            active: theme,
            display_name: theme.display_name(),
            available: ThemeKind::ALL,
            palette,
            status_colors: BookStatus::ALL
                .into_iter()
                .map(|status| (status, palette.status_color(status)))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ThemeChange {
    theme: ThemeKind,
}

async fn current_theme(State(theme): State<Arc<ThemeContext>>) -> Json<ThemeView> {
    Json(ThemeView::of(theme.active()))
}

async fn change_theme(
    State(theme): State<Arc<ThemeContext>>,
    Json(change): Json<ThemeChange>,
) -> Json<ThemeView> {
    theme.set(change.theme);
    Json(ThemeView::of(change.theme))
}

/// Create the preferences module around the shared theme context.
pub fn create_module(theme: Arc<ThemeContext>) -> Arc<dyn Module> {
    Arc::new(PreferencesModule::new(theme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn theme_can_be_switched() {
        let theme = Arc::new(ThemeContext::new(ThemeKind::CatppuccinMocha));
        let routes = PreferencesModule::new(theme.clone()).routes();

        let response = routes
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::PUT)
                    .uri("/theme")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "theme": "nord" }"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["active"], "nord");
        assert_eq!(body["display_name"], "Nord");
        assert_eq!(body["status_colors"]["reading"], body["palette"]["accent"]);
        assert_eq!(theme.active(), ThemeKind::Nord);
    }

    #[tokio::test]
    async fn unknown_theme_is_rejected() {
        let theme = Arc::new(ThemeContext::default());
        let routes = PreferencesModule::new(theme.clone()).routes();

        let response = routes
            .oneshot(
                axum::http::Request::builder()
                    .method(Method::PUT)
                    .uri("/theme")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{ "theme": "hotdog_stand" }"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(theme.active(), ThemeKind::CatppuccinMocha);
    }
}
