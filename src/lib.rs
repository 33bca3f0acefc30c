pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod progress;
pub mod server;
pub mod utils;
