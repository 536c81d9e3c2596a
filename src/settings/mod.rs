//! Layered configuration: a TOML file chosen by `--settings` (or the build profile's
//! default), overridden by `SESSIONIST__*` environment variables.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
