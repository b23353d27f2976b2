pub mod artifacts;
pub mod audit;
pub mod error;
pub mod findings;
pub mod report;
pub mod select;
pub mod vitals;

pub use artifacts::{Artifact, ArtifactStore};
pub use audit::{Audit, AuditConfig, AuditSummary};
pub use error::AuditError;
pub use findings::{Finding, FindingsGenerator, FindingsReport, Priority, PriorityMatrix};
pub use select::SelectedUrl;
pub use vitals::VitalsSummary;
