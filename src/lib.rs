pub mod analysis;
pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod models;
pub mod validator;
pub mod writer;

#[cfg(test)]
mod tests;

pub use analysis::*;
pub use api::*;
pub use config::*;
pub use constants::*;
pub use error::*;
pub use loader::*;
pub use models::*;
pub use validator::*;
pub use writer::*;

use tracing::Level;

/// Installs the global fmt subscriber. Safe to call more than once; later calls are ignored.
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}
