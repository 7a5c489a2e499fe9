//! Concrete [`ConfigSource`](super::ConfigSource) implementations.
//!
//! Provides the structured JSON store ([`json`]), the flat key/value
//! fallback ([`flat`]) and the shared [`FileSource`](file_source::FileSource)
//! reader they are built on.

pub mod file_source;
pub mod flat;
pub mod json;

use sha2::{Digest, Sha256};

use crate::config::model::{HeaderList, RouteEntry};

/// Headers and routes produced by a source-specific parser.
pub type ParsedConfig = (HeaderList, Vec<RouteEntry>);

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
