pub mod config;
pub mod coupon;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod util;

pub use config::Config;
pub use db::AppState;
pub use error::{AppError, Result};
