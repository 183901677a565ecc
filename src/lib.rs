pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod services;
pub mod shutdown;

pub use handlers::{AppState, create_router};
