use crate::models::approval::{ApprovalItem, ItemSource};
use crate::models::record::{DeliverableRecord, LegacyApprovalRecord};

/// Merge the two upstream collections into one unified item list:
/// all legacy items first, then all deliverables, then a stable descending
/// sort by effective date so ties keep their relative order.
pub fn normalize_sources(
    legacy: Vec<LegacyApprovalRecord>,
    deliverables: Vec<DeliverableRecord>,
) -> Vec<ApprovalItem> {
    let mut items: Vec<ApprovalItem> = Vec::with_capacity(legacy.len() + deliverables.len());

    for record in legacy {
        items.push(from_legacy(record));
    }
    for record in deliverables {
        items.push(from_deliverable(record));
    }

    // Vec::sort_by is stable; undated items sink to the end.
    items.sort_by(|a, b| effective_date(b).cmp(&effective_date(a)));

    items
}

/// Creation date when present, else requested date.
pub fn effective_date(item: &ApprovalItem) -> i64 {
    item.created_at.or(item.requested_date).unwrap_or(0)
}

fn from_legacy(record: LegacyApprovalRecord) -> ApprovalItem {
    ApprovalItem {
        unique_id: format!("{}-{}", ItemSource::Legacy.tag(), record.id),
        id: record.id,
        source: ItemSource::Legacy,
        title: record.title,
        description: record.description,
        item_type: record.request_type,
        stage: record.stage,
        priority: record.priority.unwrap_or_else(|| "Normal".to_string()),
        status: record.status,
        requested_by: record.requested_by,
        requested_date: record.requested_date,
        due_date: record.due_date,
        created_at: record.created_at,
        attachments: record.attachments,
        feedback: record.feedback,
        notes: record.notes,
        project_id: record.project_id,
    }
}

fn from_deliverable(record: DeliverableRecord) -> ApprovalItem {
    let attachments = match (&record.file_name, &record.file_url) {
        (Some(name), Some(url)) => vec![crate::models::approval::AttachmentRef {
            name: name.clone(),
            url: url.clone(),
            file_type: record.file_type.clone(),
            size: record.file_size,
        }],
        _ => Vec::new(),
    };

    ApprovalItem {
        unique_id: format!("{}-{}", ItemSource::Deliverable.tag(), record.id),
        id: record.id,
        source: ItemSource::Deliverable,
        title: record.name,
        description: record.description,
        item_type: record.deliverable_type,
        stage: record.phase,
        // Deliverables carry no priority upstream.
        priority: "Normal".to_string(),
        status: record.status,
        requested_by: record.submitted_by,
        requested_date: record.submitted_date,
        due_date: record.due_date,
        created_at: record.created_at,
        attachments,
        feedback: record.feedback,
        notes: record.notes,
        project_id: record.project_id,
    }
}
