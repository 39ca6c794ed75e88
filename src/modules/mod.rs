pub mod library;
pub mod preferences;
pub mod search;
pub mod stats;

use std::sync::Arc;

use anyhow::Context;
use lectern_db::Store;
use lectern_events::EventBus;
use lectern_kernel::{settings::Settings, InitCtx, ModuleRegistry, ThemeContext};

use search::{BookSearch, GoogleBooksClient, SearchDebouncer};

/// Long-lived services shared by the modules.
pub struct AppServices {
    pub settings: Settings,
    pub events: EventBus,
    pub store: Arc<Store>,
    pub theme: Arc<ThemeContext>,
    pub search: Arc<dyn BookSearch>,
    pub draft: SearchDebouncer,
}

impl AppServices {
    /// Open the store and build the search client described by `settings`.
    pub fn build(settings: Settings) -> anyhow::Result<Self> {
        let events = EventBus::new(settings.database.event_capacity);
        let store = match &settings.database.path {
            Some(path) => Store::open(path, events.clone())
                .with_context(|| format!("failed to open store at {}", path.display()))?,
            None => {
                tracing::warn!("no database path configured, library is kept in memory");
                Store::in_memory(events.clone())
            }
        };
        let client = GoogleBooksClient::new(&settings.search)
            .context("failed to build book search client")?;

        Ok(Self::with_parts(settings, events, store, Arc::new(client)))
    }

    /// Assemble services around an existing store and search backend.
    pub fn with_parts(
        settings: Settings,
        events: EventBus,
        store: Store,
        search: Arc<dyn BookSearch>,
    ) -> Self {
        let theme = Arc::new(ThemeContext::new(settings.theme.active));
        let draft = SearchDebouncer::new(search.clone(), settings.search.quiet_period());
        Self {
            settings,
            events,
            store: Arc::new(store),
            theme,
            search,
            draft,
        }
    }

    pub fn init_ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            store: &self.store,
            events: &self.events,
        }
    }
}

/// Register all application modules with the registry
pub fn register_all(registry: &mut ModuleRegistry, services: &AppServices) -> anyhow::Result<()> {
    registry.register(library::create_module(services.store.clone()))?;
    registry.register(stats::create_module(
        services.store.clone(),
        services.settings.reading.clone(),
    ))?;
    registry.register(search::create_module(
        services.search.clone(),
        services.draft.clone(),
    ))?;
    registry.register(preferences::create_module(services.theme.clone()))?;
    Ok(())
}
