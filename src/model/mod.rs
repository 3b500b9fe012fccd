//! Data model shared by both redaction pipelines.

mod audit;
mod outcome;
mod region;
mod target;

pub use audit::{ActionKind, AuditLog, LogEntry};
pub use outcome::RedactionOutcome;
pub use region::Region;
pub use target::{fold_token, tokenize_phrase, RedactionTarget, TargetSet};
