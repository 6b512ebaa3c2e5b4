//! Error types for `xtchd-core`.
//!
//! Every variant below the chain checks is detected before any state change:
//! an append either commits fully or leaves the archive untouched.

use thiserror::Error;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  /// The appended id is not `tail.id + 1` (or 0 for an empty chain).
  #[error("{kind}: sequence violation, expected id {expected} but got {found}")]
  SequenceViolation {
    kind:     EntityKind,
    expected: i32,
    found:    i32,
  },

  /// `prior_sha256` does not match the hash recorded at the tail.
  #[error("{kind} {id}: prior_sha256 {found} does not match tail hash {expected}")]
  LinkageViolation {
    kind:     EntityKind,
    id:       i32,
    expected: String,
    found:    String,
  },

  /// The caller-supplied hash differs from the recomputed canonical hash.
  #[error("{kind} {id}: claimed hash {claimed} does not match computed {computed}")]
  IntegrityViolation {
    kind:     EntityKind,
    id:       i32,
    claimed:  String,
    computed: String,
  },

  /// `write_timestamp` lies outside the freshness window.
  #[error("{kind} {id}: write timestamp is {skew_ms} ms away from the commit clock")]
  FreshnessViolation {
    kind:    EntityKind,
    id:      i32,
    skew_ms: i64,
  },

  #[error("referential violation: {0}")]
  ReferentialViolation(String),

  #[error("uniqueness violation: {0}")]
  UniquenessViolation(String),

  /// A required field is blank.
  #[error("invalid content: {0}")]
  InvalidContent(String),

  /// Persisted data failed verification on replay. Fatal: nothing derived
  /// from the archive may be trusted until the chain is investigated.
  #[error("chain broken at {kind} {id}: {reason}")]
  ChainBroken {
    kind:   EntityKind,
    id:     i32,
    reason: String,
  },

  #[error("archive lock poisoned")]
  LockPoisoned,
}

impl Error {
  /// Only a stale timestamp can be fixed by simply trying again.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::FreshnessViolation { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
