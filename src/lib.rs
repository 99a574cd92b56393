pub mod commands;
pub mod config;
pub mod http;
pub mod performance;
pub mod report;
pub mod scenario;
pub mod ui;
pub mod utils;
