pub mod member;
pub mod payment;
pub mod summary;

pub use member::Member;
pub use payment::PaymentRecord;
pub use summary::DueSummary;
