pub mod args;
mod config;

pub use config::*;
