use crate::models::approval::AttachmentRef;
use serde::{Deserialize, Serialize};

/// Raw record from the legacy approvals store. Fields pass through to the
/// unified item unchanged; most are optional because the upstream rows are
/// loosely typed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyApprovalRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub request_type: Option<String>,
    pub stage: Option<String>,
    pub priority: Option<String>,
    pub status: String,
    pub requested_by: Option<String>,
    pub requested_date: Option<i64>,
    pub due_date: Option<i64>,
    pub created_at: Option<i64>,
    pub attachments: Vec<AttachmentRef>,
    pub feedback: Option<String>,
    pub notes: Option<String>,
    pub project_id: Option<i64>,
}

/// Raw record from the deliverables store. Display name arrives as `name`
/// (not `title`) and the project stage as `phase`; deliverables carry no
/// priority and at most one file reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverableRecord {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub deliverable_type: Option<String>,
    pub phase: Option<String>,
    pub status: String,
    pub submitted_by: Option<String>,
    pub submitted_date: Option<i64>,
    pub due_date: Option<i64>,
    pub created_at: Option<i64>,
    pub file_name: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_size: Option<i64>,
    pub feedback: Option<String>,
    pub notes: Option<String>,
    pub project_id: Option<i64>,
    /// Review history, appended on approve/reject. Stored as JSON.
    pub approvals: Vec<DeliverableApprovalEntry>,
}

/// One entry in a deliverable's review history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverableApprovalEntry {
    pub id: String,
    pub reviewer: String,
    pub reviewed_at: i64,
    /// "approved" | "rejected"
    pub decision: String,
    pub feedback: String,
}
