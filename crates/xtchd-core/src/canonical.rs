//! Canonical serialization: the exact strings that get hashed.
//!
//! Every chained type renders its fields as an ordered, space-separated list
//! of `key=value` pairs, followed by the write timestamp and the prior hash:
//!
//! ```text
//! auth_id=0 name=Xtchd Admins write_timestamp=2023.01.15 08:30:05 prior_sha256=000…000
//! ```
//!
//! Field order is part of each type's contract. Changing it invalidates every
//! hash already stored.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::entity::EntityKind;

/// The `prior_sha256` of the root row of every chain.
pub const ZERO_SHA256: &str =
  "0000000000000000000000000000000000000000000000000000000000000000";

/// A record whose state can be rendered into its canonical form.
pub trait Canonical {
  /// Which chain this type lives in.
  const KIND: EntityKind;

  /// The record's own id within its chain.
  fn id(&self) -> i32;

  /// The ordered `key=value` pairs for this record, without timestamp or
  /// prior hash.
  fn state_string(&self) -> String;
}

/// Render an optional field; `None` becomes the empty string rather than
/// being omitted.
pub fn nonefmt<T: Display>(opt: &Option<T>) -> String {
  match opt {
    Some(val) => val.to_string(),
    None => String::new(),
  }
}

/// `YYYY.MM.DD HH24:MI:SS`, second precision, no offset.
pub fn time_fmt(ts: &DateTime<Utc>) -> String {
  ts.format("%Y.%m.%d %H:%M:%S").to_string()
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(input.as_bytes());
  hex::encode(hasher.finalize())
}

/// The full canonical form of `content` as written at `write_timestamp` on
/// top of `prior_sha256`.
pub fn string_to_hash<T: Canonical>(
  content: &T,
  write_timestamp: &DateTime<Utc>,
  prior_sha256: &str,
) -> String {
  format!(
    "{} write_timestamp={} prior_sha256={}",
    content.state_string(),
    time_fmt(write_timestamp),
    prior_sha256
  )
}

/// `sha256_hex(string_to_hash(..))`.
pub fn canonical_hash<T: Canonical>(
  content: &T,
  write_timestamp: &DateTime<Utc>,
  prior_sha256: &str,
) -> String {
  sha256_hex(&string_to_hash(content, write_timestamp, prior_sha256))
}
