pub mod approvals;
pub mod db;
pub mod details;
