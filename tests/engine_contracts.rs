use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use stagegate_lib::analysis::classify::Category;
use stagegate_lib::analysis::filter::{CategoryFilter, StatusTab};
use stagegate_lib::commands::approvals::{
    approve, get_category_counts, get_filtered_items, get_unified_items, load_approval_queue,
    reject, reject_internal, REFRESH_DELAY_MS,
};
use stagegate_lib::commands::db;
use stagegate_lib::commands::details::get_project_details;
use stagegate_lib::models::approval::ApprovalQueueCache;
use stagegate_lib::models::record::{DeliverableRecord, LegacyApprovalRecord};

fn create_data_dir() -> (TempDir, String) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let data_dir = temp_dir.path().to_string_lossy().to_string();
    (temp_dir, data_dir)
}

fn new_cache() -> Arc<Mutex<ApprovalQueueCache>> {
    Arc::new(Mutex::new(ApprovalQueueCache::default()))
}

fn legacy_record(title: &str, request_type: Option<&str>, stage: Option<&str>) -> LegacyApprovalRecord {
    LegacyApprovalRecord {
        id: 0,
        title: title.to_string(),
        description: None,
        request_type: request_type.map(str::to_string),
        stage: stage.map(str::to_string),
        priority: Some("High".to_string()),
        status: "Pending".to_string(),
        requested_by: Some("pm@example.com".to_string()),
        requested_date: Some(1_700_000_000),
        due_date: None,
        created_at: Some(1_700_000_100),
        attachments: Vec::new(),
        feedback: None,
        notes: None,
        project_id: None,
    }
}

fn deliverable_record(name: &str, deliverable_type: Option<&str>, phase: Option<&str>) -> DeliverableRecord {
    DeliverableRecord {
        id: 0,
        name: name.to_string(),
        description: None,
        deliverable_type: deliverable_type.map(str::to_string),
        phase: phase.map(str::to_string),
        status: "Pending".to_string(),
        submitted_by: Some("vendor@example.com".to_string()),
        submitted_date: Some(1_700_000_050),
        due_date: None,
        created_at: Some(1_700_000_200),
        file_name: Some("deliverable.zip".to_string()),
        file_url: Some("https://files.example.com/deliverable.zip".to_string()),
        file_type: Some("application/zip".to_string()),
        file_size: Some(2048),
        feedback: None,
        notes: None,
        project_id: None,
        approvals: Vec::new(),
    }
}

#[tokio::test]
async fn load_merges_both_sources_with_distinct_unique_ids() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    // Autoincrement starts at 1 in both tables, so raw ids collide.
    db::insert_approval(&conn, &legacy_record("Design review", Some("UI/UX"), None)).expect("insert approval");
    db::insert_deliverable(&conn, &deliverable_record("API module", Some("Code"), None)).expect("insert deliverable");

    let cache = new_cache();
    let items = load_approval_queue(data_dir, &cache).await.expect("load queue");

    assert_eq!(items.len(), 2);
    let mut ids: Vec<&str> = items.iter().map(|i| i.unique_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["deliverable-1", "legacy-1"]);

    // Newest effective date first: the deliverable was created later.
    assert_eq!(items[0].unique_id, "deliverable-1");
}

#[tokio::test]
async fn load_degrades_a_broken_source_to_empty() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    db::insert_deliverable(&conn, &deliverable_record("Wireframes", None, Some("Design"))).expect("insert deliverable");
    // Schema version stays at latest, so the dropped table is not recreated
    // and the legacy fetch fails on the next load.
    conn.execute_batch("DROP TABLE approvals").expect("drop approvals");

    let cache = new_cache();
    let items = load_approval_queue(data_dir, &cache).await.expect("load queue");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unique_id, "deliverable-1");
}

#[tokio::test]
async fn filtered_items_and_counts_follow_the_category_subset() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    db::insert_approval(&conn, &legacy_record("UAT round 1", Some("Testing"), None)).expect("insert");
    db::insert_approval(&conn, &legacy_record("Auth implementation", Some("Code"), None)).expect("insert");
    let mut approved = legacy_record("Checkout implementation", Some("Code"), None);
    approved.status = "Approved".to_string();
    db::insert_approval(&conn, &approved).expect("insert");

    let cache = new_cache();
    load_approval_queue(data_dir, &cache).await.expect("load queue");

    let all = get_category_counts(&cache, CategoryFilter::All).await.expect("counts");
    assert_eq!(all.all, 3);
    assert_eq!(all.pending, 2);
    assert_eq!(all.approved, 1);

    let dev = get_category_counts(&cache, CategoryFilter::Only(Category::Development))
        .await
        .expect("counts");
    assert_eq!(dev.all, 2);
    assert_eq!(dev.pending, 1);
    assert_eq!(dev.approved, 1);

    let visible = get_filtered_items(&cache, CategoryFilter::Only(Category::Development), StatusTab::Pending)
        .await
        .expect("filter");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].title, "Auth implementation");
}

#[tokio::test]
async fn approving_a_testing_item_completes_it_and_the_project() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let project_id = db::insert_project(&conn, "CRM rollout", "Testing", "Testing").expect("insert project");
    let mut record = legacy_record("Final UAT signoff", Some("UAT"), Some("Testing"));
    record.project_id = Some(project_id);
    let approval_id = db::insert_approval(&conn, &record).expect("insert approval");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let outcome = approve(data_dir.clone(), &cache, format!("legacy-{approval_id}"), None)
        .await
        .expect("approve");

    assert_eq!(outcome.new_status, "Completed");
    assert_eq!(outcome.project_phase_set.as_deref(), Some("Completed"));
    assert!(outcome.cascade_error.is_none());

    let stored = db::get_approval(&conn, approval_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Completed");

    let project = db::get_project(&conn, project_id).expect("read").expect("exists");
    assert_eq!(project.phase, "Completed");
    assert_eq!(project.status, "Completed");
    assert!(project.completed_at.is_some());

    // Optimistic update landed in the snapshot.
    let items = get_unified_items(&cache).await.expect("items");
    assert_eq!(items[0].status, "Completed");
}

#[tokio::test]
async fn approving_a_development_deliverable_advances_the_project_to_testing() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let project_id = db::insert_project(&conn, "Portal", "Development", "Development").expect("insert project");
    let mut record = deliverable_record("Payment service", Some("Code"), Some("Development"));
    record.project_id = Some(project_id);
    let deliverable_id = db::insert_deliverable(&conn, &record).expect("insert deliverable");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let outcome = approve(data_dir, &cache, format!("deliverable-{deliverable_id}"), None)
        .await
        .expect("approve");

    assert_eq!(outcome.new_status, "Approved");
    assert_eq!(outcome.project_phase_set.as_deref(), Some("Testing"));

    let stored = db::get_deliverable(&conn, deliverable_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Approved");
    assert_eq!(stored.approvals.len(), 1);
    assert_eq!(stored.approvals[0].decision, "approved");
    assert_eq!(stored.approvals[0].feedback, "Approved by client");
    assert!(!stored.approvals[0].id.is_empty());

    let project = db::get_project(&conn, project_id).expect("read").expect("exists");
    assert_eq!(project.phase, "Testing");
    assert!(project.completed_at.is_none());
}

#[tokio::test]
async fn approving_a_uiux_item_never_touches_the_project() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let project_id = db::insert_project(&conn, "Portal", "Design", "Active").expect("insert project");
    let mut record = deliverable_record("Homepage mockup", Some("UI/UX"), Some("Design"));
    record.project_id = Some(project_id);
    let deliverable_id = db::insert_deliverable(&conn, &record).expect("insert deliverable");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let outcome = approve(data_dir, &cache, format!("deliverable-{deliverable_id}"), Some("Looks great".to_string()))
        .await
        .expect("approve");

    assert_eq!(outcome.new_status, "Approved");
    assert!(outcome.project_phase_set.is_none());
    assert!(outcome.cascade_error.is_none());

    let project = db::get_project(&conn, project_id).expect("read").expect("exists");
    assert_eq!(project.phase, "Design");

    let stored = db::get_deliverable(&conn, deliverable_id).expect("read").expect("exists");
    assert_eq!(stored.approvals[0].feedback, "Looks great");
}

#[tokio::test]
async fn cascade_failure_is_reported_but_the_approval_stands() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let mut record = legacy_record("Auth implementation", Some("Code"), None);
    record.project_id = Some(404); // no such project
    let approval_id = db::insert_approval(&conn, &record).expect("insert approval");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let outcome = approve(data_dir, &cache, format!("legacy-{approval_id}"), None)
        .await
        .expect("approve succeeds despite cascade failure");

    assert_eq!(outcome.new_status, "Approved");
    assert!(outcome.project_phase_set.is_none());
    assert!(outcome.cascade_error.is_some());

    let stored = db::get_approval(&conn, approval_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Approved");
}

#[tokio::test]
async fn approve_aborts_without_local_mutation_when_the_write_fails() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let approval_id = db::insert_approval(&conn, &legacy_record("Auth implementation", Some("Code"), None))
        .expect("insert approval");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    // Record disappears between snapshot and action.
    conn.execute("DELETE FROM approvals WHERE id = ?1", rusqlite::params![approval_id])
        .expect("delete row");

    let err = approve(data_dir, &cache, format!("legacy-{approval_id}"), None)
        .await
        .expect_err("approve must fail");
    assert!(err.starts_with("WRITE_FAILED:"), "unexpected error: {err}");

    let items = get_unified_items(&cache).await.expect("items");
    assert_eq!(items[0].status, "Pending");
}

#[tokio::test]
async fn reject_requires_non_empty_feedback_and_makes_no_store_call() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let approval_id = db::insert_approval(&conn, &legacy_record("Auth implementation", Some("Code"), None))
        .expect("insert approval");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let err = reject_internal(&data_dir, &cache, &format!("legacy-{approval_id}"), "   \t")
        .expect_err("whitespace feedback must be refused");
    assert!(err.starts_with("VALIDATION_FAILED:"), "unexpected error: {err}");

    let stored = db::get_approval(&conn, approval_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Pending");
    assert!(stored.feedback.is_none());

    let items = get_unified_items(&cache).await.expect("items");
    assert_eq!(items[0].status, "Pending");
}

#[tokio::test]
async fn reject_persists_feedback_for_both_sources() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let approval_id = db::insert_approval(&conn, &legacy_record("Auth implementation", Some("Code"), None))
        .expect("insert approval");
    let deliverable_id = db::insert_deliverable(&conn, &deliverable_record("Payment service", Some("Code"), None))
        .expect("insert deliverable");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    reject(data_dir.clone(), &cache, format!("legacy-{approval_id}"), "Missing error handling".to_string())
        .await
        .expect("reject legacy");
    reject(data_dir, &cache, format!("deliverable-{deliverable_id}"), "Build fails".to_string())
        .await
        .expect("reject deliverable");

    let stored = db::get_approval(&conn, approval_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Rejected");
    assert_eq!(stored.feedback.as_deref(), Some("Missing error handling"));

    let stored = db::get_deliverable(&conn, deliverable_id).expect("read").expect("exists");
    assert_eq!(stored.status, "Rejected");
    assert_eq!(stored.approvals.len(), 1);
    assert_eq!(stored.approvals[0].decision, "rejected");
    assert_eq!(stored.approvals[0].feedback, "Build fails");
}

#[tokio::test]
async fn delayed_reload_supersedes_the_optimistic_update() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let approval_id = db::insert_approval(&conn, &legacy_record("Auth implementation", Some("Code"), None))
        .expect("insert approval");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    approve(data_dir, &cache, format!("legacy-{approval_id}"), None)
        .await
        .expect("approve");

    // Another client changes the record before the resync fires; the reload
    // must replace the optimistic status with whatever the store holds.
    conn.execute(
        "UPDATE approvals SET status = 'In Review' WHERE id = ?1",
        rusqlite::params![approval_id],
    )
    .expect("external update");

    tokio::time::sleep(Duration::from_millis(REFRESH_DELAY_MS + 500)).await;

    let items = get_unified_items(&cache).await.expect("items");
    assert_eq!(items[0].status, "In Review");
}

#[tokio::test]
async fn unknown_unique_id_is_rejected_up_front() {
    let (_tmp, data_dir) = create_data_dir();
    db::get_db_connection(&data_dir).expect("open db");

    let cache = new_cache();
    load_approval_queue(data_dir.clone(), &cache).await.expect("load queue");

    let err = approve(data_dir, &cache, "legacy-999".to_string(), None)
        .await
        .expect_err("missing item");
    assert!(err.starts_with("ITEM_NOT_FOUND:"), "unexpected error: {err}");
}

#[tokio::test]
async fn project_details_return_only_that_projects_records() {
    let (_tmp, data_dir) = create_data_dir();
    let conn = db::get_db_connection(&data_dir).expect("open db");

    let project_id = db::insert_project(&conn, "CRM rollout", "Testing", "Testing").expect("insert project");
    let other_id = db::insert_project(&conn, "Other", "Testing", "Testing").expect("insert project");

    db::insert_test_case(&conn, project_id, "Login flow", "passed").expect("insert test case");
    db::insert_test_case(&conn, other_id, "Unrelated", "failed").expect("insert test case");
    db::insert_bug(&conn, project_id, "Crash on save", "high", "open").expect("insert bug");
    db::insert_uat_record(&conn, project_id, "Client walkthrough", "accepted").expect("insert uat");

    let details = get_project_details(data_dir, project_id).await.expect("details");

    assert_eq!(details.project_id, project_id);
    assert_eq!(details.test_cases.len(), 1);
    assert_eq!(details.test_cases[0].title, "Login flow");
    assert_eq!(details.bugs.len(), 1);
    assert_eq!(details.uat_records.len(), 1);
}
