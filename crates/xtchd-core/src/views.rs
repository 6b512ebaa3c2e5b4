//! Denormalised read models. Built by [`crate::compose`]; every list is
//! present, possibly empty.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
  chain::Chained,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, Image, YoutubeChannel, YoutubeVideo,
  },
  fulltext::TextField,
  sidecar::CoverImage,
  topic::Topic,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameId {
  pub id:   i32,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorDetail {
  pub author:   Chained<Author>,
  /// Ascending by id.
  pub articles: Vec<NameId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleText {
  pub article:    Chained<Article>,
  pub author:     Chained<Author>,
  pub paragraphs: Vec<Chained<ArticlePara>>,
}

// ─── References ──────────────────────────────────────────────────────────────

/// An edge leaving an article, with the title of whatever it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundRef<E> {
  pub title:     String,
  pub reference: Chained<E>,
}

/// An edge arriving at an entity, described from the side of its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundRef<E> {
  pub from_art_id:   i32,
  pub from_apara_id: Option<i32>,
  /// Title of the source article.
  pub title:         String,
  pub comment:       String,
  pub reference:     Chained<E>,
}

/// Every outbound edge under one anchor, grouped by target kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct References {
  pub articles: Vec<OutboundRef<ArticleRefArticle>>,
  pub videos:   Vec<OutboundRef<ArticleRefVideo>>,
  pub images:   Vec<OutboundRef<ArticleRefImage>>,
}

impl References {
  pub fn is_empty(&self) -> bool {
    self.articles.is_empty() && self.videos.is_empty() && self.images.is_empty()
  }
}

/// Paragraph id (or [`crate::xref::WHOLE_ARTICLE`]) → references.
pub type CombinedReferences = BTreeMap<i32, References>;

// ─── Enriched views ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedParagraph {
  pub paragraph: Chained<ArticlePara>,
  pub refs:      References,
  pub topics:    Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedArticle {
  pub author:     Chained<Author>,
  pub article:    Chained<Article>,
  pub cover:      Option<CoverImage>,
  pub paragraphs: Vec<EnrichedParagraph>,
  /// References anchored to the article as a whole.
  pub refs:       References,
  pub inbound:    Vec<InboundRef<ArticleRefArticle>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedImage {
  pub image:   Chained<Image>,
  pub inbound: Vec<InboundRef<ArticleRefImage>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedVideo {
  pub channel: Chained<YoutubeChannel>,
  pub video:   Chained<YoutubeVideo>,
  pub inbound: Vec<InboundRef<ArticleRefVideo>>,
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
  pub art_id:      i32,
  pub title:       String,
  pub auth_id:     i32,
  pub author_name: String,
  pub cover_thmb:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
  pub field: TextField,
  pub id:    i32,
  pub score: u32,
  /// The matched name, title, alt text, markdown or comment.
  pub label: String,
}

/// One autocomplete candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
  pub field: TextField,
  pub id:    i32,
  pub label: String,
}
