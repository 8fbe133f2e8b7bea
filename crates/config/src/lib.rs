//! Configuration schema, discovery, and env substitution.
//!
//! Config files: `charla.toml`, `charla.yaml`/`charla.yml`, or `charla.json`
//! Searched in `./` then `~/.config/charla/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, load_config},
    schema::{
        CalendarConfig, CharlaConfig, CrmConfig, GenerationConfig, KnownUser, PacingConfig,
        QueueConfig, RemindersConfig, ServerConfig, SessionsConfig, TakeoverConfig, WhatsappConfig,
    },
};
