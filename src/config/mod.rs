//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/framescribe/config.toml)
//! 3. Project config (.framescribe/config.toml)
//! 4. Legacy environment variables (OPENAI_MODEL, OPENAI_MAX_TOKENS)
//! 5. Environment variables (FRAMESCRIBE_*)
//! 6. CLI arguments (highest priority)

mod loader;
mod state;
mod types;

pub use loader::ConfigLoader;
pub use state::LastState;
pub use types::*;
