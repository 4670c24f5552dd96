pub mod client;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod export;
pub mod geo;
pub mod models;
pub mod service;
pub mod session;
pub mod shift;
pub mod ticker;
pub mod ui;

pub use error::{AppError, Result};
