use crate::analysis::classify::{categorize, Category};
use crate::models::approval::ApprovalItem;
use serde::{Deserialize, Serialize};

/// Category tab selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    All,
    Only(Category),
}

/// Status tab selection. Matching is lowercase-substring based, not
/// equality, to absorb inconsistent upstream casing and wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTab {
    All,
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl StatusTab {
    /// The bucket predicates, in tab order. Kept as one explicit rule table
    /// so each bucket can be unit-tested on its own.
    pub fn matches(&self, status: &str) -> bool {
        let status = status.trim().to_lowercase();
        match self {
            StatusTab::All => true,
            // "In Review" is an equivalent initial state.
            StatusTab::Pending => status.contains("pending") || status == "in review",
            // Terminal testing approvals are represented as "Completed", not
            // "Approved"; the conjunction keeps them out of this bucket.
            StatusTab::Approved => status.contains("approved") && status != "completed",
            StatusTab::Rejected => status.contains("rejected"),
            StatusTab::Completed => status == "completed",
        }
    }
}

/// Counts per status bucket over the category-filtered subset, so switching
/// category tabs changes the denominators shown in status badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub all: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub completed: usize,
}

pub fn matches_category(item: &ApprovalItem, filter: CategoryFilter) -> bool {
    match filter {
        CategoryFilter::All => true,
        CategoryFilter::Only(category) => categorize(item) == category,
    }
}

pub fn filter_items<'a>(
    items: &'a [ApprovalItem],
    category: CategoryFilter,
    status_tab: StatusTab,
) -> Vec<&'a ApprovalItem> {
    items
        .iter()
        .filter(|item| matches_category(item, category) && status_tab.matches(&item.status))
        .collect()
}

pub fn count_statuses(items: &[ApprovalItem], category: CategoryFilter) -> StatusCounts {
    let subset: Vec<&ApprovalItem> = items
        .iter()
        .filter(|item| matches_category(item, category))
        .collect();

    StatusCounts {
        all: subset.len(),
        pending: subset.iter().filter(|i| StatusTab::Pending.matches(&i.status)).count(),
        approved: subset.iter().filter(|i| StatusTab::Approved.matches(&i.status)).count(),
        rejected: subset.iter().filter(|i| StatusTab::Rejected.matches(&i.status)).count(),
        completed: subset.iter().filter(|i| StatusTab::Completed.matches(&i.status)).count(),
    }
}
