//! Named color themes and the context object that holds the active one.

use std::sync::{PoisonError, RwLock};

use lectern_db::BookStatus;
use serde::{Deserialize, Serialize};

/// The closed set of available themes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeKind {
    #[default]
    CatppuccinMocha,
    SolarizedDark,
    Nord,
}

/// Hex colors of one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub primary_background: &'static str,
    pub secondary_background: &'static str,
    pub tertiary_background: &'static str,
    pub primary_text: &'static str,
    pub secondary_text: &'static str,
    pub tertiary_text: &'static str,
    pub accent: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub info: &'static str,
    pub separator: &'static str,
    pub shadow: &'static str,
}

const CATPPUCCIN_MOCHA: Palette = Palette {
    primary_background: "#1e1e2e",
    secondary_background: "#313244",
    tertiary_background: "#45475a",
    primary_text: "#cdd6f4",
    secondary_text: "#bac2de",
    tertiary_text: "#a6adc8",
    accent: "#89b4fa",
    success: "#a6e3a1",
    warning: "#fab387",
    error: "#f38ba8",
    info: "#89dceb",
    separator: "#6c7086",
    shadow: "#11111b",
};

const SOLARIZED_DARK: Palette = Palette {
    primary_background: "#002b36",
    secondary_background: "#073642",
    tertiary_background: "#586e75",
    primary_text: "#fdf6e3",
    secondary_text: "#93a1a1",
    tertiary_text: "#839496",
    accent: "#268bd2",
    success: "#859900",
    warning: "#e76f22",
    error: "#dc322f",
    info: "#2aa198",
    separator: "#586e75",
    shadow: "#002b3680",
};

const NORD: Palette = Palette {
    primary_background: "#2e3440",
    secondary_background: "#3b4252",
    tertiary_background: "#434c5e",
    primary_text: "#eceff4",
    secondary_text: "#e5e9f0",
    tertiary_text: "#d8dee9",
    accent: "#5e81ac",
    success: "#a3be8c",
    warning: "#ebcb8b",
    error: "#bf616a",
    info: "#88c0d0",
    separator: "#4c566a",
    shadow: "#2e344080",
};

impl ThemeKind {
    pub const ALL: [ThemeKind; 3] = [
        ThemeKind::CatppuccinMocha,
        ThemeKind::SolarizedDark,
        ThemeKind::Nord,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ThemeKind::CatppuccinMocha => "Catppuccin Mocha",
            ThemeKind::SolarizedDark => "Solarized Dark",
            ThemeKind::Nord => "Nord",
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            ThemeKind::CatppuccinMocha => &CATPPUCCIN_MOCHA,
            ThemeKind::SolarizedDark => &SOLARIZED_DARK,
            ThemeKind::Nord => &NORD,
        }
    }
}

impl Palette {
    /// Badge color for a reading status.
    pub fn status_color(&self, status: BookStatus) -> &'static str {
        match status {
            BookStatus::Reading => self.accent,
            BookStatus::Completed => self.success,
            BookStatus::ToRead => self.tertiary_text,
            BookStatus::Paused => self.warning,
        }
    }
}

/// Holds the active theme. Created once at startup from settings and
/// handed to whoever renders; changed only through [`ThemeContext::set`].
#[derive(Debug, Default)]
pub struct ThemeContext {
    active: RwLock<ThemeKind>,
}

impl ThemeContext {
    pub fn new(active: ThemeKind) -> Self {
        Self {
            active: RwLock::new(active),
        }
    }

    pub fn active(&self) -> ThemeKind {
        *self.active.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn palette(&self) -> &'static Palette {
        self.active().palette()
    }

    /// Switch themes, returning the previous one.
    pub fn set(&self, theme: ThemeKind) -> ThemeKind {
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        let previous = *active;
        *active = theme;
        tracing::info!(
            from = previous.display_name(),
            to = theme.display_name(),
            "theme changed"
        );
        previous
    }
}
