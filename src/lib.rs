//! Lectern application library
//!
//! Domain modules (library, stats, search, preferences) and the services
//! they share.

pub mod modules;
pub mod utils;

pub use modules::{register_all, AppServices};
