pub mod logging_config;
pub mod macroplay_config;
pub mod paths;
pub mod player_config;

pub use logging_config::LoggingConfig;
pub use macroplay_config::{ConfigLoadError, MacroplayConfig};
pub use paths::ProjectPaths;
pub use player_config::PlayerConfig;
