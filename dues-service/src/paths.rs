//! Hierarchical document paths.
//!
//! Every document the service touches is addressed by a slash-separated path:
//!
//! ```text
//! organizations/{orgId}/members/{uid}
//! organizations/{orgId}/dues/{dueId}
//! organizations/{orgId}/dues/{dueId}/due_payments/{uid}
//! organizations/{orgId}/dues/{dueId}/meta/summary
//! ```

use std::fmt;

pub const ORGANIZATIONS: &str = "organizations";
pub const MEMBERS: &str = "members";
pub const DUES: &str = "dues";
pub const DUE_PAYMENTS: &str = "due_payments";
pub const META: &str = "meta";
pub const SUMMARY: &str = "summary";

pub fn members_collection(org_id: &str) -> String {
    format!("{}/{}/{}", ORGANIZATIONS, org_id, MEMBERS)
}

pub fn member_doc(org_id: &str, uid: &str) -> String {
    format!("{}/{}", members_collection(org_id), uid)
}

fn dues_collection(org_id: &str) -> String {
    format!("{}/{}/{}", ORGANIZATIONS, org_id, DUES)
}

pub fn due_doc(org_id: &str, due_id: &str) -> String {
    format!("{}/{}", dues_collection(org_id), due_id)
}

pub fn payments_collection(org_id: &str, due_id: &str) -> String {
    format!("{}/{}", due_doc(org_id, due_id), DUE_PAYMENTS)
}

pub fn payment_doc(org_id: &str, due_id: &str, uid: &str) -> String {
    format!("{}/{}", payments_collection(org_id, due_id), uid)
}

pub fn meta_collection(org_id: &str, due_id: &str) -> String {
    format!("{}/{}", due_doc(org_id, due_id), META)
}

pub fn summary_doc(org_id: &str, due_id: &str) -> String {
    format!("{}/{}", meta_collection(org_id, due_id), SUMMARY)
}

/// Collection path a document belongs to.
pub fn parent_of(path: &str) -> Option<&str> {
    path.rsplit_once('/').map(|(parent, _)| parent)
}

/// Last segment of a document path.
pub fn doc_id(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(_, id)| id)
        .filter(|id| !id.is_empty())
}

fn segments(path: &str) -> Option<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(parts)
}

/// Path parameters of a due document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DueParams {
    pub org_id: String,
    pub due_id: String,
}

impl DueParams {
    pub fn new(org_id: impl Into<String>, due_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            due_id: due_id.into(),
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        match segments(path)?.as_slice() {
            [ORGANIZATIONS, org_id, DUES, due_id] => Some(Self::new(*org_id, *due_id)),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        due_doc(&self.org_id, &self.due_id)
    }
}

impl fmt::Display for DueParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Path parameters of a payment record document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentParams {
    pub org_id: String,
    pub due_id: String,
    pub payment_id: String,
}

impl PaymentParams {
    pub fn new(
        org_id: impl Into<String>,
        due_id: impl Into<String>,
        payment_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            due_id: due_id.into(),
            payment_id: payment_id.into(),
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        match segments(path)?.as_slice() {
            [ORGANIZATIONS, org_id, DUES, due_id, DUE_PAYMENTS, payment_id] => {
                Some(Self::new(*org_id, *due_id, *payment_id))
            }
            _ => None,
        }
    }

    pub fn due(&self) -> DueParams {
        DueParams::new(self.org_id.clone(), self.due_id.clone())
    }

    pub fn path(&self) -> String {
        payment_doc(&self.org_id, &self.due_id, &self.payment_id)
    }
}

impl fmt::Display for PaymentParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}
