//! A single append-only hash chain.
//!
//! Ids are dense and start at 0, so a row's id is also its position. Appends
//! are validated in a fixed order: sequence, linkage, freshness, integrity.
//! Nothing is mutated until every check has passed.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
  Error, Result,
  canonical::{Canonical, ZERO_SHA256},
  chain::{AppendRequest, ChainHead, Chained},
  entity::EntityKind,
};

/// Maximum distance between a row's `write_timestamp` and the commit clock.
pub const FRESHNESS_WINDOW_MS: i64 = 1_000;

/// How strictly an incoming row is checked.
#[derive(Debug, Clone, Copy)]
pub enum Check {
  /// A new write: all four chain checks, freshness against `now`.
  Append { now: DateTime<Utc> },
  /// A row read back from durable storage: everything except freshness.
  Replay,
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Ledger<T> {
  rows: Vec<Chained<T>>,
}

impl<T> Default for Ledger<T> {
  fn default() -> Self { Self { rows: Vec::new() } }
}

impl<T: Canonical> Ledger<T> {
  pub fn new() -> Self { Self::default() }

  pub fn len(&self) -> usize { self.rows.len() }

  pub fn is_empty(&self) -> bool { self.rows.is_empty() }

  pub fn get(&self, id: i32) -> Option<&Chained<T>> {
    usize::try_from(id).ok().and_then(|i| self.rows.get(i))
  }

  pub fn contains(&self, id: i32) -> bool { self.get(id).is_some() }

  pub fn tail(&self) -> Option<&Chained<T>> { self.rows.last() }

  pub fn head(&self) -> ChainHead {
    match self.tail() {
      Some(tail) => ChainHead {
        next_id:      tail.id() + 1,
        prior_sha256: tail.new_sha256.clone(),
      },
      None => ChainHead::genesis(),
    }
  }

  /// Rows in ascending id order.
  pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Chained<T>> {
    self.rows.iter()
  }

  /// Run the chain checks for `req` against the current tail and return the
  /// row it would become.
  pub fn validate(&self, req: AppendRequest<T>, check: Check) -> Result<Chained<T>> {
    let head = self.head();
    let id = req.content.id();

    if id != head.next_id {
      return Err(Error::SequenceViolation {
        kind:     T::KIND,
        expected: head.next_id,
        found:    id,
      });
    }

    if req.prior_sha256 != head.prior_sha256 {
      return Err(Error::LinkageViolation {
        kind: T::KIND,
        id,
        expected: head.prior_sha256,
        found: req.prior_sha256,
      });
    }

    if let Check::Append { now } = check {
      let skew_ms = (now - req.write_timestamp).num_milliseconds();
      if skew_ms.abs() > FRESHNESS_WINDOW_MS {
        return Err(Error::FreshnessViolation { kind: T::KIND, id, skew_ms });
      }
    }

    let row = req.into_chained();
    let computed = row.computed_sha256();
    if computed != row.new_sha256 {
      return Err(Error::IntegrityViolation {
        kind: T::KIND,
        id,
        claimed: row.new_sha256,
        computed,
      });
    }

    Ok(row)
  }

  /// Append a row produced by [`Ledger::validate`] against this same tail.
  pub(crate) fn push(&mut self, row: Chained<T>) {
    debug_assert_eq!(row.id(), self.head().next_id);
    self.rows.push(row);
  }

  /// Remove row `id`. Only the tail can go: every earlier row is the
  /// `prior_id` of the row after it.
  pub(crate) fn pop_tail(&mut self, id: i32) -> Result<Chained<T>> {
    match self.tail() {
      Some(tail) if tail.id() == id => {}
      Some(_) if self.contains(id) => {
        return Err(Error::ReferentialViolation(format!(
          "{} {id} is the prior row of {} {}",
          T::KIND,
          T::KIND,
          id + 1
        )));
      }
      _ => {
        return Err(Error::ReferentialViolation(format!(
          "{} {id} does not exist",
          T::KIND
        )));
      }
    }
    self.rows.pop().ok_or_else(|| {
      Error::ReferentialViolation(format!("{} {id} does not exist", T::KIND))
    })
  }

  /// Re-audit every stored row.
  pub fn verify(&self) -> ChainReport {
    let mut violations = Vec::new();
    let mut expected_prior = ZERO_SHA256.to_owned();

    for (index, row) in self.rows.iter().enumerate() {
      let id = row.id();
      if usize::try_from(id).ok() != Some(index) {
        violations.push(Violation {
          id,
          kind: ViolationKind::SequenceGap,
          description: format!("expected id {index}, found {id}"),
        });
      }

      let expected_prior_id = (index > 0).then(|| index as i32 - 1);
      if row.prior_id != expected_prior_id {
        violations.push(Violation {
          id,
          kind: ViolationKind::PriorIdMismatch,
          description: format!("prior_id {:?}, expected {expected_prior_id:?}", row.prior_id),
        });
      }

      if row.prior_sha256 != expected_prior {
        violations.push(Violation {
          id,
          kind: ViolationKind::HashChainBreak,
          description: "prior_sha256 does not match the previous row".into(),
        });
      }

      if !row.verify_hash() {
        violations.push(Violation {
          id,
          kind: ViolationKind::HashMismatch,
          description: format!("stored {} but computed {}", row.new_sha256, row.computed_sha256()),
        });
      }

      expected_prior = row.new_sha256.clone();
    }

    ChainReport { kind: T::KIND, rows: self.rows.len(), violations }
  }
}

// ─── Audit report ────────────────────────────────────────────────────────────

/// Result of re-verifying one chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainReport {
  pub kind:       EntityKind,
  pub rows:       usize,
  pub violations: Vec<Violation>,
}

impl ChainReport {
  pub fn is_valid(&self) -> bool { self.violations.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
  pub id:          i32,
  pub kind:        ViolationKind,
  pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
  SequenceGap,
  PriorIdMismatch,
  HashChainBreak,
  HashMismatch,
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::entity::Author;

  fn author(id: i32, name: &str) -> Author {
    Author { auth_id: id, name: name.into() }
  }

  fn append(ledger: &mut Ledger<Author>, name: &str) -> Chained<Author> {
    let head = ledger.head();
    let req = AppendRequest::on_head(author(head.next_id, name), &head);
    let row = ledger.validate(req, Check::Append { now: Utc::now() }).unwrap();
    ledger.push(row.clone());
    row
  }

  #[test]
  fn rows_link_to_their_predecessor() {
    let mut ledger = Ledger::new();
    let first = append(&mut ledger, "a");
    let second = append(&mut ledger, "b");

    assert_eq!(first.prior_sha256, ZERO_SHA256);
    assert_eq!(first.prior_id, None);
    assert_eq!(second.prior_sha256, first.new_sha256);
    assert_eq!(second.prior_id, Some(0));
    assert!(ledger.verify().is_valid());
  }

  #[test]
  fn wrong_id_is_a_sequence_violation() {
    let mut ledger = Ledger::new();
    append(&mut ledger, "a");
    let head = ledger.head();
    let req = AppendRequest::on_head(author(5, "b"), &head);
    let err = ledger.validate(req, Check::Append { now: Utc::now() }).unwrap_err();
    assert!(matches!(err, Error::SequenceViolation { expected: 1, found: 5, .. }));
  }

  #[test]
  fn stale_prior_hash_is_a_linkage_violation() {
    let mut ledger = Ledger::new();
    append(&mut ledger, "a");
    let req = AppendRequest::seal(author(1, "b"), ZERO_SHA256, Utc::now());
    let err = ledger.validate(req, Check::Append { now: Utc::now() }).unwrap_err();
    assert!(matches!(err, Error::LinkageViolation { id: 1, .. }));
  }

  #[test]
  fn old_timestamp_is_a_freshness_violation() {
    let ledger: Ledger<Author> = Ledger::new();
    let now = Utc::now();
    let req = AppendRequest::seal(author(0, "a"), ZERO_SHA256, now - Duration::seconds(2));
    let err = ledger.validate(req, Check::Append { now }).unwrap_err();
    assert!(err.is_retryable());
    assert!(ledger.is_empty());
  }

  #[test]
  fn replay_skips_freshness() {
    let ledger: Ledger<Author> = Ledger::new();
    let ts = Utc::now() - Duration::days(400);
    let req = AppendRequest::seal(author(0, "a"), ZERO_SHA256, ts);
    assert!(ledger.validate(req, Check::Replay).is_ok());
  }

  #[test]
  fn forged_hash_is_an_integrity_violation() {
    let ledger: Ledger<Author> = Ledger::new();
    let mut req = AppendRequest::seal(author(0, "a"), ZERO_SHA256, Utc::now());
    req.content.name = "b".into();
    let err = ledger.validate(req, Check::Append { now: Utc::now() }).unwrap_err();
    assert!(matches!(err, Error::IntegrityViolation { .. }));
  }

  #[test]
  fn sequence_is_checked_before_integrity() {
    let ledger: Ledger<Author> = Ledger::new();
    let mut req = AppendRequest::seal(author(1, "a"), ZERO_SHA256, Utc::now());
    req.new_sha256 = "nonsense".into();
    let err = ledger.validate(req, Check::Append { now: Utc::now() }).unwrap_err();
    assert!(matches!(err, Error::SequenceViolation { .. }));
  }

  #[test]
  fn only_the_tail_can_be_popped() {
    let mut ledger = Ledger::new();
    append(&mut ledger, "a");
    append(&mut ledger, "b");

    let err = ledger.pop_tail(0).unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));
    assert_eq!(ledger.len(), 2);

    let popped = ledger.pop_tail(1).unwrap();
    assert_eq!(popped.content.name, "b");
    assert_eq!(ledger.head().next_id, 1);
  }

  #[test]
  fn verify_reports_tampered_rows() {
    let mut ledger = Ledger::new();
    append(&mut ledger, "a");
    append(&mut ledger, "b");
    ledger.rows[0].content.name = "rewritten".into();

    let report = ledger.verify();
    assert!(!report.is_valid());
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].kind, ViolationKind::HashMismatch);
    assert_eq!(report.violations[0].id, 0);
  }
}
