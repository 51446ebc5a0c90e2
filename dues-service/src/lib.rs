pub mod config;
pub mod handlers;
pub mod models;
pub mod paths;
pub mod services;
pub mod startup;
pub mod sync;
pub mod triggers;
pub mod utils;

pub use startup::{build_router, AppState, Application};
