pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod services;
pub mod session;
pub mod types;
pub mod utils;
