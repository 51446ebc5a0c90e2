//! Event-driven invocation of the sync handlers.
//!
//! The change feed turns store writes into [`TriggerEvent`]s, the dispatcher
//! runs each one as an independent task, and the router picks the handler.

pub mod change_feed;
pub mod dispatcher;
pub mod event;
pub mod router;

pub use change_feed::ChangeFeed;
pub use dispatcher::{DispatchConfig, TriggerDispatcher};
pub use event::TriggerEvent;
pub use router::TriggerRouter;
