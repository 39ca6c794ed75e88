pub mod module;
pub mod registry;
pub mod settings;
pub mod theme;

pub use module::{InitCtx, Module};
pub use registry::ModuleRegistry;
pub use theme::{Palette, ThemeContext, ThemeKind};
