pub mod approval;
pub mod detail;
pub mod project;
pub mod record;
