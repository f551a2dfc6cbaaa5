// Crate root for the rover telemetry server modules.

pub mod app;
pub mod config;
pub mod connection;
pub mod constants;
pub mod http;
pub mod producer;
pub mod session;
pub mod simulator;
pub mod tasks;
pub mod telemetry;
pub mod utils;
pub mod ws;
