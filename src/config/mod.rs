pub mod builtin_layouts;
#[cfg(feature = "cli")]
pub mod cli;
pub mod layout;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use builtin_layouts::LayoutRegistry;
pub use layout::{build_layout_config, LayoutConfig, LayoutParams};
pub use toml_config::EngineConfig;
