//! Lookup structures over one reference-edge chain.
//!
//! The edges themselves live in a [`crate::ledger::Ledger`]; this index only
//! stores edge ids, always in ascending order because edges are indexed in
//! the order they are appended.

use std::collections::HashMap;

use crate::entity::Edge;

/// Paragraph key meaning "the article as a whole".
pub const WHOLE_ARTICLE: i32 = -1;

/// Map an optional paragraph anchor onto its index key.
pub fn para_key(apara_id: Option<i32>) -> i32 { apara_id.unwrap_or(WHOLE_ARTICLE) }

#[derive(Debug, Clone, Default)]
pub struct RefIndex {
  /// `(source art_id, source paragraph key)` → edge ids.
  outbound:   HashMap<(i32, i32), Vec<i32>>,
  /// target id → edge ids.
  inbound:    HashMap<i32, Vec<i32>>,
  /// source art_id → edge ids, across all paragraph keys.
  by_article: HashMap<i32, Vec<i32>>,
}

impl RefIndex {
  pub fn new() -> Self { Self::default() }

  pub fn insert<E: Edge>(&mut self, edge: &E) {
    let from = edge.source();
    let id = edge.id();
    self
      .outbound
      .entry((from.art_id, para_key(from.apara_id)))
      .or_default()
      .push(id);
    self.inbound.entry(edge.target()).or_default().push(id);
    self.by_article.entry(from.art_id).or_default().push(id);
  }

  /// Undo [`RefIndex::insert`] for the most recently inserted edge.
  pub fn remove<E: Edge>(&mut self, edge: &E) {
    let from = edge.source();
    let id = edge.id();
    pop_id(&mut self.outbound, (from.art_id, para_key(from.apara_id)), id);
    pop_id(&mut self.inbound, edge.target(), id);
    pop_id(&mut self.by_article, from.art_id, id);
  }

  /// Edges made from `art_id` under `key` (a paragraph id or
  /// [`WHOLE_ARTICLE`]).
  pub fn outbound(&self, art_id: i32, key: i32) -> &[i32] {
    self.outbound.get(&(art_id, key)).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Edges pointing at `target`.
  pub fn inbound(&self, target: i32) -> &[i32] {
    self.inbound.get(&target).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Every edge made from `art_id`, whatever its anchor.
  pub fn from_article(&self, art_id: i32) -> &[i32] {
    self.by_article.get(&art_id).map(Vec::as_slice).unwrap_or(&[])
  }
}

pub(crate) fn pop_id<K: std::hash::Hash + Eq>(map: &mut HashMap<K, Vec<i32>>, key: K, id: i32) {
  if let Some(ids) = map.get_mut(&key) {
    if ids.last() == Some(&id) {
      ids.pop();
    }
    if ids.is_empty() {
      map.remove(&key);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::entity::{ArticleRefImage, RefFrom};

  fn edge(id: i32, art_id: i32, apara_id: Option<i32>, img_id: i32) -> ArticleRefImage {
    ArticleRefImage {
      iref_id: id,
      from: RefFrom { art_id, apara_id, comment: format!("edge {id}") },
      img_id,
    }
  }

  #[test]
  fn unanchored_edges_land_in_the_sentinel_bucket() {
    let mut index = RefIndex::new();
    index.insert(&edge(0, 7, None, 1));
    index.insert(&edge(1, 7, Some(3), 1));

    assert_eq!(index.outbound(7, WHOLE_ARTICLE), &[0]);
    assert_eq!(index.outbound(7, 3), &[1]);
    assert!(index.outbound(7, 4).is_empty());
  }

  #[test]
  fn inbound_lists_are_ascending() {
    let mut index = RefIndex::new();
    index.insert(&edge(0, 1, None, 9));
    index.insert(&edge(1, 2, Some(0), 9));
    index.insert(&edge(2, 3, None, 8));
    index.insert(&edge(3, 1, None, 9));

    assert_eq!(index.inbound(9), &[0, 1, 3]);
    assert_eq!(index.from_article(1), &[0, 3]);
  }

  #[test]
  fn remove_undoes_the_last_insert() {
    let mut index = RefIndex::new();
    index.insert(&edge(0, 1, None, 9));
    let last = edge(1, 1, Some(2), 9);
    index.insert(&last);
    index.remove(&last);

    assert_eq!(index.inbound(9), &[0]);
    assert!(index.outbound(1, 2).is_empty());
    assert_eq!(index.from_article(1), &[0]);
  }
}
