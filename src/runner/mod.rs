//! Workflow orchestration and reporting.

pub mod report;
pub mod workflow;

pub use report::RunReport;
pub use workflow::WorkflowRunner;
