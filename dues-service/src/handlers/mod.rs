pub mod health;
pub mod summary;

pub use health::{health_check, metrics, readiness_check};
