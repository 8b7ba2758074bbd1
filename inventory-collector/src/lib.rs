pub mod collector_core;
pub mod collectors;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod metrics;
pub mod out;
pub mod provider;
pub mod size;
pub mod utils;
