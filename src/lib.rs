#![forbid(unsafe_code)]

pub mod config;
pub mod errors;
pub mod feed;
pub mod http;
pub mod orchestrator;
pub mod report;
pub mod taskade;

pub use config::RunConfig;
pub use errors::{AppError, Result};
