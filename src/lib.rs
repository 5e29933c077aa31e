pub mod admin;
pub mod cli;
pub mod config;
pub mod error;
pub mod geocode;
pub mod logging;
pub mod pass;
pub mod sheets;
