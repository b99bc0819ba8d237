//! Configuration for the scoreboard gateway.
//!
//! Config files are discovered as `chainball.{toml,yaml,yml,json}` in the
//! working directory, then in `~/.config/chainball/`. `${ENV_VAR}`
//! placeholders are substituted before parsing.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{config_dir, discover_and_load, find_config_file, load_config, load_or_discover},
    schema::{ChainballConfig, EventsConfig, ScoreboardConfig},
};
