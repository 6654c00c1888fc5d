//! Cache key derivation
//!
//! A request key must be identical for identical `(messages, tier)` inputs
//! across processes and restarts; the cache is keyed on it, so a
//! per-process-seeded hasher cannot be used here.

use crate::core::Message;
use sha2::{Digest, Sha256};

// Field/record separators keep the serialization unambiguous: without them,
// ("ab","c") and ("a","bc") would collide.
const FIELD_SEP: u8 = 0x1f;
const RECORD_SEP: u8 = 0x1e;

/// Derive the canonical cache key for a request.
///
/// Message order is significant and preserved; the same set of messages in
/// a different order yields a different key.
pub fn request_key(messages: &[Message], tier: &str) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.as_str().as_bytes());
        hasher.update([FIELD_SEP]);
        hasher.update(message.content.as_bytes());
        hasher.update([RECORD_SEP]);
    }
    hasher.update(tier.as_bytes());
    format!("{:x}", hasher.finalize())
}
