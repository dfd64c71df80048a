pub mod cache;
pub mod catalog;
pub mod config;
pub mod fallback;
pub mod generator;
pub mod handlers;
pub mod kobold;
pub mod metrics;
pub mod models;
pub mod prompt;
pub mod settings;
pub mod state;
