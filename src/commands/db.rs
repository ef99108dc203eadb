use crate::models::approval::AttachmentRef;
use crate::models::detail::{BugRecord, TestCaseRecord, UatRecord};
use crate::models::project::Project;
use crate::models::record::{DeliverableApprovalEntry, DeliverableRecord, LegacyApprovalRecord};
use rusqlite::{params, Connection, OptionalExtension, Result};

const DB_SCHEMA_VERSION: i64 = 2;

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        // Future schema; do not fail reads/writes for forward-compatible changes.
        conn.pragma_update(None, "user_version", version)?;
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS approvals (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            request_type TEXT,
            stage TEXT,
            priority TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            requested_by TEXT,
            requested_date INTEGER,
            due_date INTEGER,
            created_at INTEGER,
            approved_at INTEGER,
            feedback TEXT,
            notes TEXT,
            attachments_json TEXT NOT NULL DEFAULT '[]',
            project_id INTEGER
        );

        CREATE TABLE IF NOT EXISTS deliverables (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            deliverable_type TEXT,
            phase TEXT,
            status TEXT NOT NULL DEFAULT 'Pending',
            submitted_by TEXT,
            submitted_date INTEGER,
            due_date INTEGER,
            created_at INTEGER,
            file_name TEXT,
            file_url TEXT,
            file_type TEXT,
            file_size INTEGER,
            feedback TEXT,
            notes TEXT,
            project_id INTEGER,
            approvals_json TEXT NOT NULL DEFAULT '[]'
        );

        CREATE TABLE IF NOT EXISTS projects (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            phase TEXT NOT NULL DEFAULT 'Development',
            status TEXT NOT NULL DEFAULT 'Active',
            completed_at INTEGER,
            updated_at INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS test_cases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('passed', 'failed', 'pending')),
            executed_by TEXT,
            executed_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS bugs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            severity TEXT NOT NULL DEFAULT 'medium' CHECK(severity IN ('low', 'medium', 'high', 'critical')),
            status TEXT NOT NULL DEFAULT 'open' CHECK(status IN ('open', 'fixed', 'closed')),
            reported_at INTEGER
        );

        CREATE TABLE IF NOT EXISTS uat_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id INTEGER NOT NULL,
            scenario TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('accepted', 'rejected', 'pending')),
            tester TEXT,
            tested_at INTEGER
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "approvals", "rejected_at INTEGER")?;

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_approvals_project_id ON approvals(project_id);
        CREATE INDEX IF NOT EXISTS idx_deliverables_project_id ON deliverables(project_id);
        CREATE INDEX IF NOT EXISTS idx_test_cases_project_id ON test_cases(project_id);
        CREATE INDEX IF NOT EXISTS idx_bugs_project_id ON bugs(project_id);
        CREATE INDEX IF NOT EXISTS idx_uat_records_project_id ON uat_records(project_id);
        ",
    )
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}

pub fn get_db_connection(data_dir: &str) -> Result<Connection> {
    let state_dir = std::path::Path::new(data_dir).join(".stagegate");
    let _ = std::fs::create_dir_all(&state_dir);
    let conn = Connection::open(state_dir.join("state.db"))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

// ---------------------------------------------------------------------------
// Approval store (legacy source)
// ---------------------------------------------------------------------------

pub fn list_approvals(conn: &Connection) -> Result<Vec<LegacyApprovalRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, description, request_type, stage, priority, status, requested_by, requested_date, due_date, created_at, feedback, notes, attachments_json, project_id FROM approvals ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map([], |row| {
            let attachments_json: String = row.get(13)?;
            let attachments: Vec<AttachmentRef> =
                serde_json::from_str(&attachments_json).unwrap_or_default();

            Ok(LegacyApprovalRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                request_type: row.get(3)?,
                stage: row.get(4)?,
                priority: row.get(5)?,
                status: row.get(6)?,
                requested_by: row.get(7)?,
                requested_date: row.get(8)?,
                due_date: row.get(9)?,
                created_at: row.get(10)?,
                attachments,
                feedback: row.get(11)?,
                notes: row.get(12)?,
                project_id: row.get(14)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(records)
}

pub fn insert_approval(conn: &Connection, record: &LegacyApprovalRecord) -> Result<i64> {
    let attachments_json =
        serde_json::to_string(&record.attachments).unwrap_or_else(|_| "[]".to_string());

    conn.execute(
        "INSERT INTO approvals (title, description, request_type, stage, priority, status, requested_by, requested_date, due_date, created_at, feedback, notes, attachments_json, project_id) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
        params![
            &record.title,
            record.description.as_deref(),
            record.request_type.as_deref(),
            record.stage.as_deref(),
            record.priority.as_deref(),
            &record.status,
            record.requested_by.as_deref(),
            record.requested_date,
            record.due_date,
            record.created_at,
            record.feedback.as_deref(),
            record.notes.as_deref(),
            attachments_json,
            record.project_id,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Write the approve decision for a legacy approval. Returns the number of
/// rows touched; zero means the record no longer exists.
pub fn approve_approval(
    conn: &Connection,
    id: i64,
    status: &str,
    approved_at: i64,
    feedback: Option<&str>,
) -> Result<usize> {
    conn.execute(
        "UPDATE approvals SET status = ?2, approved_at = ?3, feedback = COALESCE(?4, feedback) WHERE id = ?1",
        params![id, status, approved_at, feedback],
    )
}

pub fn reject_approval(
    conn: &Connection,
    id: i64,
    rejected_at: i64,
    feedback: &str,
) -> Result<usize> {
    conn.execute(
        "UPDATE approvals SET status = 'Rejected', rejected_at = ?2, feedback = ?3 WHERE id = ?1",
        params![id, rejected_at, feedback],
    )
}

pub fn get_approval(conn: &Connection, id: i64) -> Result<Option<LegacyApprovalRecord>> {
    Ok(list_approvals(conn)?.into_iter().find(|r| r.id == id))
}

// ---------------------------------------------------------------------------
// Deliverable store
// ---------------------------------------------------------------------------

pub fn list_deliverables(conn: &Connection) -> Result<Vec<DeliverableRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, deliverable_type, phase, status, submitted_by, submitted_date, due_date, created_at, file_name, file_url, file_type, file_size, feedback, notes, project_id, approvals_json FROM deliverables ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map([], |row| {
            let approvals_json: String = row.get(17)?;
            let approvals: Vec<DeliverableApprovalEntry> =
                serde_json::from_str(&approvals_json).unwrap_or_default();

            Ok(DeliverableRecord {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                deliverable_type: row.get(3)?,
                phase: row.get(4)?,
                status: row.get(5)?,
                submitted_by: row.get(6)?,
                submitted_date: row.get(7)?,
                due_date: row.get(8)?,
                created_at: row.get(9)?,
                file_name: row.get(10)?,
                file_url: row.get(11)?,
                file_type: row.get(12)?,
                file_size: row.get(13)?,
                feedback: row.get(14)?,
                notes: row.get(15)?,
                project_id: row.get(16)?,
                approvals,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(records)
}

pub fn insert_deliverable(conn: &Connection, record: &DeliverableRecord) -> Result<i64> {
    let approvals_json =
        serde_json::to_string(&record.approvals).unwrap_or_else(|_| "[]".to_string());

    conn.execute(
        "INSERT INTO deliverables (name, description, deliverable_type, phase, status, submitted_by, submitted_date, due_date, created_at, file_name, file_url, file_type, file_size, feedback, notes, project_id, approvals_json) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17)",
        params![
            &record.name,
            record.description.as_deref(),
            record.deliverable_type.as_deref(),
            record.phase.as_deref(),
            &record.status,
            record.submitted_by.as_deref(),
            record.submitted_date,
            record.due_date,
            record.created_at,
            record.file_name.as_deref(),
            record.file_url.as_deref(),
            record.file_type.as_deref(),
            record.file_size,
            record.feedback.as_deref(),
            record.notes.as_deref(),
            record.project_id,
            approvals_json,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Write a review decision for a deliverable: set the new status and append
/// one entry to the review history. Returns rows touched.
pub fn update_deliverable(
    conn: &Connection,
    id: i64,
    status: &str,
    entry: &DeliverableApprovalEntry,
) -> Result<usize> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT approvals_json FROM deliverables WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    let Some(existing) = existing else {
        return Ok(0);
    };

    let mut history: Vec<DeliverableApprovalEntry> =
        serde_json::from_str(&existing).unwrap_or_default();
    history.push(entry.clone());
    let approvals_json = serde_json::to_string(&history).unwrap_or_else(|_| "[]".to_string());

    conn.execute(
        "UPDATE deliverables SET status = ?2, feedback = ?3, approvals_json = ?4 WHERE id = ?1",
        params![id, status, &entry.feedback, approvals_json],
    )
}

pub fn get_deliverable(conn: &Connection, id: i64) -> Result<Option<DeliverableRecord>> {
    Ok(list_deliverables(conn)?.into_iter().find(|r| r.id == id))
}

// ---------------------------------------------------------------------------
// Project store
// ---------------------------------------------------------------------------

pub fn insert_project(conn: &Connection, name: &str, phase: &str, status: &str) -> Result<i64> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "INSERT INTO projects (name, phase, status, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![name, phase, status, now],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Advance a project's lifecycle position. Returns rows touched; zero means
/// the project does not exist.
pub fn update_project(
    conn: &Connection,
    project_id: i64,
    phase: &str,
    status: &str,
    completed_at: Option<i64>,
) -> Result<usize> {
    let now = chrono::Utc::now().timestamp();
    conn.execute(
        "UPDATE projects SET phase = ?2, status = ?3, completed_at = COALESCE(?4, completed_at), updated_at = ?5 WHERE id = ?1",
        params![project_id, phase, status, completed_at, now],
    )
}

pub fn get_project(conn: &Connection, project_id: i64) -> Result<Option<Project>> {
    conn.query_row(
        "SELECT id, name, phase, status, completed_at, updated_at FROM projects WHERE id = ?1",
        params![project_id],
        |row| {
            Ok(Project {
                id: row.get(0)?,
                name: row.get(1)?,
                phase: row.get(2)?,
                status: row.get(3)?,
                completed_at: row.get(4)?,
                updated_at: row.get(5)?,
            })
        },
    )
    .optional()
}

// ---------------------------------------------------------------------------
// Read-only drill-down stores
// ---------------------------------------------------------------------------

pub fn list_test_cases_by_project(conn: &Connection, project_id: i64) -> Result<Vec<TestCaseRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, title, status, executed_by, executed_at FROM test_cases WHERE project_id = ?1 ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map(params![project_id], |row| {
            Ok(TestCaseRecord {
                id: row.get(0)?,
                project_id: row.get(1)?,
                title: row.get(2)?,
                status: row.get(3)?,
                executed_by: row.get(4)?,
                executed_at: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(records)
}

pub fn list_bugs_by_project(conn: &Connection, project_id: i64) -> Result<Vec<BugRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, title, severity, status, reported_at FROM bugs WHERE project_id = ?1 ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map(params![project_id], |row| {
            Ok(BugRecord {
                id: row.get(0)?,
                project_id: row.get(1)?,
                title: row.get(2)?,
                severity: row.get(3)?,
                status: row.get(4)?,
                reported_at: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(records)
}

pub fn list_uat_records_by_project(conn: &Connection, project_id: i64) -> Result<Vec<UatRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, project_id, scenario, status, tester, tested_at FROM uat_records WHERE project_id = ?1 ORDER BY id ASC",
    )?;

    let records = stmt
        .query_map(params![project_id], |row| {
            Ok(UatRecord {
                id: row.get(0)?,
                project_id: row.get(1)?,
                scenario: row.get(2)?,
                status: row.get(3)?,
                tester: row.get(4)?,
                tested_at: row.get(5)?,
            })
        })?
        .filter_map(|r| r.ok())
        .collect();

    Ok(records)
}

pub fn insert_test_case(
    conn: &Connection,
    project_id: i64,
    title: &str,
    status: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO test_cases (project_id, title, status) VALUES (?1, ?2, ?3)",
        params![project_id, title, status],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_bug(
    conn: &Connection,
    project_id: i64,
    title: &str,
    severity: &str,
    status: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO bugs (project_id, title, severity, status) VALUES (?1, ?2, ?3, ?4)",
        params![project_id, title, severity, status],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_uat_record(
    conn: &Connection,
    project_id: i64,
    scenario: &str,
    status: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO uat_records (project_id, scenario, status) VALUES (?1, ?2, ?3)",
        params![project_id, scenario, status],
    )?;
    Ok(conn.last_insert_rowid())
}
