use crate::models::detail::ProjectDetails;

/// Drill-down data for a testing-stage review: test cases, bugs and UAT
/// records for the parent project. Display only; the state machine never
/// reads these.
pub async fn get_project_details(
    data_dir: String,
    project_id: i64,
) -> Result<ProjectDetails, String> {
    let conn = crate::commands::db::get_db_connection(&data_dir)
        .map_err(|e| format!("DB error: {e}"))?;

    let test_cases = crate::commands::db::list_test_cases_by_project(&conn, project_id)
        .map_err(|e| format!("Query error: {e}"))?;
    let bugs = crate::commands::db::list_bugs_by_project(&conn, project_id)
        .map_err(|e| format!("Query error: {e}"))?;
    let uat_records = crate::commands::db::list_uat_records_by_project(&conn, project_id)
        .map_err(|e| format!("Query error: {e}"))?;

    Ok(ProjectDetails {
        project_id,
        test_cases,
        bugs,
        uat_records,
    })
}
