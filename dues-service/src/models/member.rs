use serde::{Deserialize, Serialize};

/// An organization member. Existence of the member document is the membership;
/// its fields are not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub uid: String,
}

impl Member {
    pub fn new(uid: impl Into<String>) -> Self {
        Self { uid: uid.into() }
    }
}
