pub mod cli;
pub mod design_api;
pub mod load_config;

pub use cli::{run, Cli, Commands};
