use crate::models::approval::{ApprovalItem, ItemSource};
use serde::{Deserialize, Serialize};

/// Work-type category used to route review tabs and drive phase cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    UiUx,
    Development,
    Testing,
    Other,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::UiUx => "UI/UX",
            Category::Development => "Development",
            Category::Testing => "Testing",
            Category::Other => "Other",
        }
    }
}

/// Classify one item. Pure and deterministic; rules run in a fixed order and
/// the first match wins. Exclusion runs first so stage-transition bookkeeping
/// never leaks into work tabs; deliverable rules run before the generic
/// keyword fallback because deliverables carry more reliable structured hints
/// than free text.
pub fn categorize(item: &ApprovalItem) -> Category {
    if is_workflow_bookkeeping(item) {
        return Category::Other;
    }

    if item.source == ItemSource::Deliverable {
        return categorize_deliverable(item);
    }

    if let Some(category) = keyword_fallback(item) {
        return category;
    }

    Category::Other
}

/// Rule 1: system/administrative exclusion. Stage-transition requests and
/// status-change bookkeeping are not work items.
fn is_workflow_bookkeeping(item: &ApprovalItem) -> bool {
    let item_type = lower(item.item_type.as_deref());
    let title = item.title.to_lowercase();

    item_type.contains("transition")
        || item_type == "status_change"
        || title.contains("move to")
        || title.contains("stage transition")
}

/// Rule 2: deliverable-sourced items. Structured stage/type hints first,
/// finer type/title hints second, Development as the default (deliverables
/// are assumed development output absent contrary evidence).
fn categorize_deliverable(item: &ApprovalItem) -> Category {
    let stage = lower(item.stage.as_deref());
    let item_type = lower(item.item_type.as_deref());

    if contains_any(&stage, &["design", "ui/ux"]) || contains_any(&item_type, &["design", "ui/ux"]) {
        return Category::UiUx;
    }
    if contains_any(&stage, &["development", "code"]) || contains_any(&item_type, &["development", "code"]) {
        return Category::Development;
    }
    if contains_any(&stage, &["test", "uat"]) || contains_any(&item_type, &["test", "uat"]) {
        return Category::Testing;
    }

    let title = item.title.to_lowercase();
    if contains_any(&item_type, &["wireframe", "mockup", "prototype"])
        || contains_any(&title, &["wireframe", "mockup", "prototype"])
    {
        return Category::UiUx;
    }
    if contains_any(&item_type, &["code", "implementation"])
        || contains_any(&title, &["code", "implementation"])
    {
        return Category::Development;
    }
    if contains_any(&item_type, &["uat", "qa", "bug", "test"])
        || contains_any(&title, &["uat", "qa", "bug", "test"])
    {
        return Category::Testing;
    }

    Category::Development
}

/// Rule 3: generic keyword fallback across stage, type, title and
/// description. Testing keywords outrank design, design outrank development.
fn keyword_fallback(item: &ApprovalItem) -> Option<Category> {
    let haystack = format!(
        "{} {} {} {}",
        lower(item.stage.as_deref()),
        lower(item.item_type.as_deref()),
        item.title.to_lowercase(),
        lower(item.description.as_deref()),
    );

    if contains_any(&haystack, &["test", "qa", "bug", "uat"]) {
        return Some(Category::Testing);
    }
    if contains_any(&haystack, &["design", "wireframe", "mockup", "prototype", "ui/ux"]) {
        return Some(Category::UiUx);
    }
    if contains_any(&haystack, &["development", "code", "implementation"]) {
        return Some(Category::Development);
    }

    None
}

fn lower(value: Option<&str>) -> String {
    value.unwrap_or_default().to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
