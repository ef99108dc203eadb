use crate::analysis::classify::{categorize, Category};
use crate::analysis::filter::{count_statuses, filter_items, CategoryFilter, StatusCounts, StatusTab};
use crate::analysis::normalize::normalize_sources;
use crate::models::approval::{ApprovalItem, ApprovalQueueCache, ApproveOutcome, ItemSource, RejectOutcome};
use crate::models::record::DeliverableApprovalEntry;
use std::sync::{Arc, Mutex};

/// Delay before the post-action authoritative reload. The optimistic cache
/// update is cosmetic; this reload is what guarantees correctness.
pub const REFRESH_DELAY_MS: u64 = 1000;

const DEFAULT_APPROVE_FEEDBACK: &str = "Approved by client";
const REVIEWER_TAG: &str = "client";

/// Fetch both upstream sources, normalize into the unified collection and
/// replace the snapshot wholesale. A failed source read degrades to an empty
/// sequence; partial availability is not a hard error.
pub async fn load_approval_queue(
    data_dir: String,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
) -> Result<Vec<ApprovalItem>, String> {
    load_approval_queue_internal(&data_dir, cache)
}

pub fn load_approval_queue_internal(
    data_dir: &str,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
) -> Result<Vec<ApprovalItem>, String> {
    let conn = crate::commands::db::get_db_connection(data_dir)
        .map_err(|e| format!("DB error: {e}"))?;

    let legacy = crate::commands::db::list_approvals(&conn).unwrap_or_else(|e| {
        log::warn!("approval source unavailable, continuing without it: {e}");
        Vec::new()
    });
    let deliverables = crate::commands::db::list_deliverables(&conn).unwrap_or_else(|e| {
        log::warn!("deliverable source unavailable, continuing without it: {e}");
        Vec::new()
    });

    let items = normalize_sources(legacy, deliverables);

    let mut cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    cache_lock.data_dir = Some(data_dir.to_string());
    cache_lock.items = items.clone();
    cache_lock.loaded_at = Some(chrono::Utc::now().timestamp());

    log::debug!("approval queue loaded: {} items", items.len());
    Ok(items)
}

pub async fn get_unified_items(
    cache: &Arc<Mutex<ApprovalQueueCache>>,
) -> Result<Vec<ApprovalItem>, String> {
    let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    if cache_lock.loaded_at.is_none() {
        return Err("No approval data available. Load the queue first.".to_string());
    }
    Ok(cache_lock.items.clone())
}

pub async fn get_category_counts(
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    category: CategoryFilter,
) -> Result<StatusCounts, String> {
    let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    Ok(count_statuses(&cache_lock.items, category))
}

pub async fn get_filtered_items(
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    category: CategoryFilter,
    status_tab: StatusTab,
) -> Result<Vec<ApprovalItem>, String> {
    let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    Ok(filter_items(&cache_lock.items, category, status_tab)
        .into_iter()
        .cloned()
        .collect())
}

/// Approve an item. Testing-category approvals are final sign-off and go
/// straight to Completed; everything else becomes Approved. A successful
/// primary write may cascade a phase change onto the parent project.
pub async fn approve(
    data_dir: String,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: String,
    feedback: Option<String>,
) -> Result<ApproveOutcome, String> {
    let outcome = approve_internal(&data_dir, cache, &unique_id, feedback.as_deref())?;
    schedule_refresh(data_dir, Arc::clone(cache));
    Ok(outcome)
}

pub fn approve_internal(
    data_dir: &str,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: &str,
    feedback: Option<&str>,
) -> Result<ApproveOutcome, String> {
    let item = find_item(cache, unique_id)?;
    let category = categorize(&item);

    let target_status = if category == Category::Testing {
        "Completed"
    } else {
        "Approved"
    };

    let conn = crate::commands::db::get_db_connection(data_dir)
        .map_err(|e| format!("WRITE_FAILED: {e}"))?;
    let now = chrono::Utc::now().timestamp();

    // Primary write, dispatched by origin store. Any failure here aborts the
    // whole operation before local state or the project is touched.
    let rows = match item.source {
        ItemSource::Legacy => {
            crate::commands::db::approve_approval(&conn, item.id, target_status, now, feedback)
                .map_err(|e| format!("WRITE_FAILED: {e}"))?
        }
        ItemSource::Deliverable => {
            let entry = DeliverableApprovalEntry {
                id: uuid::Uuid::new_v4().to_string(),
                reviewer: REVIEWER_TAG.to_string(),
                reviewed_at: now,
                decision: "approved".to_string(),
                feedback: feedback
                    .map(str::to_string)
                    .unwrap_or_else(|| DEFAULT_APPROVE_FEEDBACK.to_string()),
            };
            crate::commands::db::update_deliverable(&conn, item.id, target_status, &entry)
                .map_err(|e| format!("WRITE_FAILED: {e}"))?
        }
    };
    if rows == 0 {
        return Err(format!("WRITE_FAILED: {} no longer exists", item.unique_id));
    }

    // Cascade onto the parent project. Failures are reported, never rolled back.
    let mut project_phase_set = None;
    let mut cascade_error = None;
    if let Some(project_id) = item.project_id {
        let cascade = match category {
            Category::Testing => Some(("Completed", "Completed", Some(now))),
            Category::Development => Some(("Testing", "Testing", None)),
            _ => None,
        };

        if let Some((phase, status, completed_at)) = cascade {
            match crate::commands::db::update_project(&conn, project_id, phase, status, completed_at) {
                Ok(0) => {
                    let msg = format!("project {project_id} not found");
                    log::warn!("phase cascade skipped: {msg}");
                    cascade_error = Some(msg);
                }
                Ok(_) => {
                    log::info!("project {project_id} advanced to {phase}");
                    project_phase_set = Some(phase.to_string());
                }
                Err(e) => {
                    let msg = format!("project update failed: {e}");
                    log::warn!("phase cascade failed for project {project_id}: {e}");
                    cascade_error = Some(msg);
                }
            }
        }
    }

    // Optimistic update, strictly after the awaited primary write succeeded.
    set_local_status(cache, unique_id, target_status, feedback)?;

    Ok(ApproveOutcome {
        unique_id: unique_id.to_string(),
        new_status: target_status.to_string(),
        project_phase_set,
        cascade_error,
    })
}

/// Reject an item. Feedback is mandatory; without it the operation aborts
/// locally before any store call is made. Rejection persists to the backing
/// store for both sources.
pub async fn reject(
    data_dir: String,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: String,
    feedback: String,
) -> Result<RejectOutcome, String> {
    let outcome = reject_internal(&data_dir, cache, &unique_id, &feedback)?;
    schedule_refresh(data_dir, Arc::clone(cache));
    Ok(outcome)
}

pub fn reject_internal(
    data_dir: &str,
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: &str,
    feedback: &str,
) -> Result<RejectOutcome, String> {
    let feedback = feedback.trim();
    if feedback.is_empty() {
        return Err("VALIDATION_FAILED: Feedback is required to reject an item".to_string());
    }

    let item = find_item(cache, unique_id)?;

    let conn = crate::commands::db::get_db_connection(data_dir)
        .map_err(|e| format!("WRITE_FAILED: {e}"))?;
    let now = chrono::Utc::now().timestamp();

    let rows = match item.source {
        ItemSource::Legacy => crate::commands::db::reject_approval(&conn, item.id, now, feedback)
            .map_err(|e| format!("WRITE_FAILED: {e}"))?,
        ItemSource::Deliverable => {
            let entry = DeliverableApprovalEntry {
                id: uuid::Uuid::new_v4().to_string(),
                reviewer: REVIEWER_TAG.to_string(),
                reviewed_at: now,
                decision: "rejected".to_string(),
                feedback: feedback.to_string(),
            };
            crate::commands::db::update_deliverable(&conn, item.id, "Rejected", &entry)
                .map_err(|e| format!("WRITE_FAILED: {e}"))?
        }
    };
    if rows == 0 {
        return Err(format!("WRITE_FAILED: {} no longer exists", item.unique_id));
    }

    set_local_status(cache, unique_id, "Rejected", Some(feedback))?;

    Ok(RejectOutcome {
        unique_id: unique_id.to_string(),
        new_status: "Rejected".to_string(),
    })
}

fn find_item(
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: &str,
) -> Result<ApprovalItem, String> {
    let cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    cache_lock
        .items
        .iter()
        .find(|item| item.unique_id == unique_id)
        .cloned()
        .ok_or(format!("ITEM_NOT_FOUND: {unique_id}"))
}

fn set_local_status(
    cache: &Arc<Mutex<ApprovalQueueCache>>,
    unique_id: &str,
    status: &str,
    feedback: Option<&str>,
) -> Result<(), String> {
    let mut cache_lock = cache.lock().map_err(|_| "Cache lock error".to_string())?;
    if let Some(item) = cache_lock
        .items
        .iter_mut()
        .find(|item| item.unique_id == unique_id)
    {
        item.status = status.to_string();
        if let Some(feedback) = feedback {
            item.feedback = Some(feedback.to_string());
        }
    }
    Ok(())
}

/// Unconditional timer-based resync. Not cancellable and not coalesced;
/// whatever the store holds after the delay supersedes the optimistic update.
fn schedule_refresh(data_dir: String, cache: Arc<Mutex<ApprovalQueueCache>>) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(REFRESH_DELAY_MS)).await;
        if let Err(e) = load_approval_queue_internal(&data_dir, &cache) {
            log::warn!("post-action reload failed: {e}");
        }
    });
}
