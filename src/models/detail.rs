use serde::{Deserialize, Serialize};

// Drill-down records shown alongside a testing-stage approval. Read-only;
// the transition engine never writes these.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCaseRecord {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    /// "passed" | "failed" | "pending"
    pub status: String,
    pub executed_by: Option<String>,
    pub executed_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugRecord {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    /// "low" | "medium" | "high" | "critical"
    pub severity: String,
    /// "open" | "fixed" | "closed"
    pub status: String,
    pub reported_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UatRecord {
    pub id: i64,
    pub project_id: i64,
    pub scenario: String,
    /// "accepted" | "rejected" | "pending"
    pub status: String,
    pub tester: Option<String>,
    pub tested_at: Option<i64>,
}

/// Aggregate returned by the project drill-down command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub project_id: i64,
    pub test_cases: Vec<TestCaseRecord>,
    pub bugs: Vec<BugRecord>,
    pub uat_records: Vec<UatRecord>,
}
