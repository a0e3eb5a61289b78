//! Restore audit log
//!
//! Every restore-side mutation (a file restored, a conflicting file
//! preserved, a skip, a manifest update, a rollback) is appended to
//! `<backup>/restore-log.jsonl` so the backup store's history can be
//! reconstructed after the fact.
//!
//! # Example
//!
//! ```rust,ignore
//! use stowaway::audit::{AuditEntry, AuditLogger, Operation};
//!
//! let logger = AuditLogger::new(paths.audit_log());
//! logger.log(&AuditEntry::new(Operation::Restore, "tests/FooTest.php")
//!     .with_method("copy"))?;
//! ```

mod entry;
mod logger;

pub use entry::{AuditEntry, Operation};
pub use logger::AuditLogger;
