pub mod cli;
pub mod config;
pub mod load_config;
pub mod server;
pub mod storage;
pub mod wallpaper;

pub use cli::{run, Cli, Commands};
