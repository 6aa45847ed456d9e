//! `glslt-cli` runs the GLSL parse and print pipeline over files or stdin.
//!
//! Options come from an optional `glslt.toml` and are overridden by flags.
//! See [`config::Config`] for the file layout.
pub mod cli;
pub mod config;

pub use cli::Cli;
pub use config::Config;
