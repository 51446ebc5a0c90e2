use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

/// Aggregate totals over every payment record of a due.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueSummary {
    pub total_collected: f64,
    pub paid_count: i64,
    pub total_members: i64,
}

impl DueSummary {
    /// The fields owned by this service; merged over the stored summary.
    pub fn merge_fields(&self) -> Document {
        doc! {
            "totalCollected": self.total_collected,
            "paidCount": self.paid_count,
            "totalMembers": self.total_members,
        }
    }
}
