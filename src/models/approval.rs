use serde::{Deserialize, Serialize};

/// Which upstream store an item came from. Fixed at normalization time;
/// all subsequent writes for the item target this store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemSource {
    Legacy,
    Deliverable,
}

impl ItemSource {
    pub fn tag(&self) -> &'static str {
        match self {
            ItemSource::Legacy => "legacy",
            ItemSource::Deliverable => "deliverable",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
    pub url: String,
    pub file_type: Option<String>,
    pub size: Option<i64>,
}

/// Unified approval work item. Immutable once normalized; the whole
/// collection is replaced on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalItem {
    /// Row id in the origin store. Not unique across sources.
    pub id: i64,
    /// Stable iteration key: "{source_tag}-{id}". Unique within a merged collection.
    pub unique_id: String,
    pub source: ItemSource,
    pub title: String,
    pub description: Option<String>,
    /// Free-text classification hint from the origin, e.g. "Stage Transition", "UI/UX", "Code".
    pub item_type: Option<String>,
    pub stage: Option<String>,
    pub priority: String,
    /// Open vocabulary: "Pending" | "In Review" | "Approved" | "Rejected" | "Completed"
    /// plus source-specific casings. Matched by lowercase substring, never a closed enum.
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

/// Result of a successful approve, returned to the caller so the UI can
/// report the cascade outcome without re-reading the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveOutcome {
    pub unique_id: String,
    pub new_status: String,
    /// Project phase written by the cascade, when one applied.
    pub project_phase_set: Option<String>,
    /// Cascade failure message. The primary approval stands regardless.
    pub cascade_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectOutcome {
    pub unique_id: String,
    pub new_status: String,
}

/// In-memory snapshot of the merged approval queue
#[derive(Debug, Default)]
pub struct ApprovalQueueCache {
    pub data_dir: Option<String>,
    pub items: Vec<ApprovalItem>,
    pub loaded_at: Option<i64>,
}
