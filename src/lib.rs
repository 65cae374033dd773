pub mod api;
pub mod backend;
pub mod commands;
pub mod config;
pub mod core;
pub mod flow;
pub mod telemetry;
