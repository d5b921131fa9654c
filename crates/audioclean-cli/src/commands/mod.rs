pub mod config;
pub mod enhance;
