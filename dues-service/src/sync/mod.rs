//! The two reactive handlers that keep payment records and due summaries in
//! step with the store. Both are stateless: read, compute, write.

pub mod aggregation;
pub mod fanout;

pub use aggregation::{summarize, AggregationHandler};
pub use fanout::{FanoutHandler, FanoutOutcome};
