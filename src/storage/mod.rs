//! Storage layer for stowaway
//!
//! Provides the filesystem primitives the backup subsystem is built on:
//! atomic JSON and text writes, whole-file content hashing, and free-space
//! probing behind a trait so tests can simulate a full disk.

pub mod disk;
pub mod file_io;
pub mod hashing;

pub use disk::{FixedSpace, SpaceProbe, SystemSpace};
pub use file_io::{read_json_required, write_json_atomic, write_text_atomic};
pub use hashing::{file_digest, hash_file, FileDigest};
