pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod identity;
pub mod job;
pub mod services;
pub mod session;
pub mod store;
