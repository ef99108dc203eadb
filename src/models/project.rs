use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Lifecycle position, e.g. "Design" | "Development" | "Testing" | "Completed"
    pub phase: String,
    pub status: String,
    pub completed_at: Option<i64>,
    pub updated_at: i64,
}
