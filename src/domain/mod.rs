pub mod collector;
pub mod extractor;
pub mod metrics;
pub mod smartctl;
pub mod smartctl_report;
