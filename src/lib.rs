pub mod api;
pub mod collector;
pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod models;
pub mod normalize;
pub mod repositories;
pub mod rollup;

pub use config::Config;
pub use db::{connect, DbPool};
pub use error::{AppError, Result};
