//! Mutable sidecar attributes.
//!
//! A sidecar is keyed by the id of the chained record it decorates, may be
//! overwritten at any time, and never enters a hash. Changing an article's
//! cover image therefore does not require a new version of the article.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::ImagePair;

/// The thumbnail shown for an article in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverImage {
  /// Random id; covers are not sequential.
  pub id:     Uuid,
  pub art_id: i32,
  #[serde(flatten)]
  pub pair:   ImagePair,
}

impl CoverImage {
  pub fn new(art_id: i32, pair: ImagePair) -> Self {
    Self { id: Uuid::new_v4(), art_id, pair }
  }
}
