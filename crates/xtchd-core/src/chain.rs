//! The hash-chain envelope around every chained record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::{Canonical, ZERO_SHA256, canonical_hash, string_to_hash};

/// A committed row: the content plus everything needed to re-verify it.
///
/// Serialises as `{prior_id, content, prior_sha256, write_timestamp,
/// new_sha256}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chained<T> {
  /// `None` only for the root row (id 0).
  pub prior_id:        Option<i32>,
  pub content:         T,
  pub prior_sha256:    String,
  pub write_timestamp: DateTime<Utc>,
  pub new_sha256:      String,
}

impl<T: Canonical> Chained<T> {
  pub fn id(&self) -> i32 { self.content.id() }

  /// The exact string whose SHA-256 must equal `new_sha256`.
  pub fn string_to_hash(&self) -> String {
    string_to_hash(&self.content, &self.write_timestamp, &self.prior_sha256)
  }

  /// Recompute the canonical hash of this row.
  pub fn computed_sha256(&self) -> String {
    canonical_hash(&self.content, &self.write_timestamp, &self.prior_sha256)
  }

  /// `true` if the stored hash matches the recomputed one.
  pub fn verify_hash(&self) -> bool { self.computed_sha256() == self.new_sha256 }
}

// ─── Head ────────────────────────────────────────────────────────────────────

/// What a writer needs to know to build the next row of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainHead {
  pub next_id:      i32,
  pub prior_sha256: String,
}

impl ChainHead {
  /// The head of a chain with no rows yet.
  pub fn genesis() -> Self {
    Self { next_id: 0, prior_sha256: ZERO_SHA256.to_owned() }
  }

  pub fn prior_id(&self) -> Option<i32> {
    (self.next_id > 0).then(|| self.next_id - 1)
  }
}

// ─── Link ────────────────────────────────────────────────────────────────────

/// A timestamp and the canonical string it produces for some content. This is the
/// client-side half of an append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainLink {
  pub write_timestamp: DateTime<Utc>,
  pub string_to_hash:  String,
}

impl ChainLink {
  /// Link `content` onto `prior_sha256` at the current time.
  pub fn new<T: Canonical>(prior_sha256: &str, content: &T) -> Self {
    Self::from_timestamp(prior_sha256, Utc::now(), content)
  }

  pub fn from_timestamp<T: Canonical>(
    prior_sha256: &str,
    write_timestamp: DateTime<Utc>,
    content: &T,
  ) -> Self {
    let string_to_hash = string_to_hash(content, &write_timestamp, prior_sha256);
    Self { write_timestamp, string_to_hash }
  }

  pub fn new_sha256(&self) -> String {
    crate::canonical::sha256_hex(&self.string_to_hash)
  }
}

// ─── Append request ──────────────────────────────────────────────────────────

/// Input to an append. The archive recomputes `new_sha256` and rejects the
/// request if the claim does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendRequest<T> {
  pub content:         T,
  pub prior_sha256:    String,
  pub write_timestamp: DateTime<Utc>,
  /// The hash the caller claims for the new row.
  pub new_sha256:      String,
}

impl<T: Canonical> AppendRequest<T> {
  /// Build a request whose claimed hash is computed from the content.
  pub fn seal(
    content: T,
    prior_sha256: impl Into<String>,
    write_timestamp: DateTime<Utc>,
  ) -> Self {
    let prior_sha256 = prior_sha256.into();
    let new_sha256 = canonical_hash(&content, &write_timestamp, &prior_sha256);
    Self { content, prior_sha256, write_timestamp, new_sha256 }
  }

  /// Seal `content` onto `head` at the current time.
  pub fn on_head(content: T, head: &ChainHead) -> Self {
    Self::seal(content, head.prior_sha256.clone(), Utc::now())
  }

  /// The envelope this request becomes once committed.
  pub fn into_chained(self) -> Chained<T> {
    let id = self.content.id();
    Chained {
      prior_id:        (id > 0).then(|| id - 1),
      content:         self.content,
      prior_sha256:    self.prior_sha256,
      write_timestamp: self.write_timestamp,
      new_sha256:      self.new_sha256,
    }
  }
}

impl<T> From<Chained<T>> for AppendRequest<T> {
  fn from(row: Chained<T>) -> Self {
    Self {
      content:         row.content,
      prior_sha256:    row.prior_sha256,
      write_timestamp: row.write_timestamp,
      new_sha256:      row.new_sha256,
    }
  }
}
