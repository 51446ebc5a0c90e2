pub mod coercion;

pub use coercion::{coerce_amount, is_truthy};
