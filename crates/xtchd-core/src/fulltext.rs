//! Inverted token index over the archive's searchable text fields.
//!
//! The index grows with every append and has no general removal path; the
//! only removal is undoing the postings of a retracted chain tail.
//!
//! Besides whole-term search, the index answers autocomplete queries: every
//! term but the last must match exactly, the last matches as a prefix.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap},
  fmt,
  ops::Bound,
  str::FromStr,
};

use serde::{Deserialize, Serialize};

// ─── Tokenization ────────────────────────────────────────────────────────────

/// Splits text into index terms. Queries and documents go through the same
/// tokenizer, so stemming or locale-aware variants slot in here.
pub trait Tokenizer: Send + Sync {
  fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Lower-case, strip punctuation, split on whitespace. No stemming.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleTokenizer;

impl Tokenizer for SimpleTokenizer {
  fn tokenize(&self, text: &str) -> Vec<String> {
    text
      .split_whitespace()
      .map(|word| {
        word
          .chars()
          .filter(|c| c.is_alphanumeric())
          .flat_map(char::to_lowercase)
          .collect::<String>()
      })
      .filter(|term| !term.is_empty())
      .collect()
  }
}

// ─── Fields ──────────────────────────────────────────────────────────────────

/// Every indexed text field. Ids are scoped per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
  AuthorName,
  ArticleTitle,
  ParagraphText,
  ImageAlt,
  ChannelName,
  VideoTitle,
  ArticleRefComment,
  VideoRefComment,
  ImageRefComment,
}

impl TextField {
  pub const ALL: [TextField; 9] = [
    Self::AuthorName,
    Self::ArticleTitle,
    Self::ParagraphText,
    Self::ImageAlt,
    Self::ChannelName,
    Self::VideoTitle,
    Self::ArticleRefComment,
    Self::VideoRefComment,
    Self::ImageRefComment,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::AuthorName => "author_name",
      Self::ArticleTitle => "article_title",
      Self::ParagraphText => "paragraph_text",
      Self::ImageAlt => "image_alt",
      Self::ChannelName => "channel_name",
      Self::VideoTitle => "video_title",
      Self::ArticleRefComment => "article_ref_comment",
      Self::VideoRefComment => "video_ref_comment",
      Self::ImageRefComment => "image_ref_comment",
    }
  }
}

impl fmt::Display for TextField {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TextField {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|field| field.as_str() == s)
      .ok_or_else(|| format!("unknown text field: {s:?}"))
  }
}

// ─── Inverted index ──────────────────────────────────────────────────────────

/// term → (id → term frequency). Terms are ordered so prefixes are a range.
#[derive(Debug, Clone, Default)]
pub struct InvertedIndex {
  postings: BTreeMap<String, BTreeMap<i32, u32>>,
}

impl InvertedIndex {
  pub fn insert(&mut self, id: i32, terms: &[String]) {
    for term in terms {
      *self.postings.entry(term.clone()).or_default().entry(id).or_default() += 1;
    }
  }

  pub fn remove(&mut self, id: i32, terms: &[String]) {
    for term in terms {
      if let Some(ids) = self.postings.get_mut(term) {
        ids.remove(&id);
        if ids.is_empty() {
          self.postings.remove(term);
        }
      }
    }
  }

  /// Ids containing every query term, with summed term frequency as score.
  /// Best score first, ties by ascending id.
  pub fn search(&self, terms: &[String]) -> Vec<(i32, u32)> {
    let Some((first, rest)) = terms.split_first() else {
      return Vec::new();
    };
    let Some(seed) = self.postings.get(first) else {
      return Vec::new();
    };

    let mut hits: Vec<(i32, u32)> = seed
      .iter()
      .filter_map(|(&id, &tf)| {
        rest.iter().try_fold(tf, |score, term| {
          self
            .postings
            .get(term)
            .and_then(|ids| ids.get(&id))
            .map(|&n| score + n)
        })
        .map(|score| (id, score))
      })
      .collect();

    hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    hits
  }

  /// Ids with some term starting with `prefix`, ascending.
  fn with_prefix(&self, prefix: &str) -> BTreeSet<i32> {
    self
      .postings
      .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
      .take_while(|(term, _)| term.starts_with(prefix))
      .flat_map(|(_, ids)| ids.keys().copied())
      .collect()
  }

  /// Ids containing every term of `complete` and a term starting with
  /// `prefix`, ascending.
  pub fn complete(&self, complete: &[String], prefix: &str) -> Vec<i32> {
    self
      .with_prefix(prefix)
      .into_iter()
      .filter(|id| {
        complete
          .iter()
          .all(|term| self.postings.get(term).is_some_and(|ids| ids.contains_key(id)))
      })
      .collect()
  }
}

// ─── Full-text index ─────────────────────────────────────────────────────────

/// One [`InvertedIndex`] per [`TextField`], sharing a tokenizer.
pub struct FullTextIndex {
  tokenizer: Box<dyn Tokenizer>,
  fields:    HashMap<TextField, InvertedIndex>,
}

impl FullTextIndex {
  pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
    Self { tokenizer, fields: HashMap::new() }
  }

  pub fn index(&mut self, field: TextField, id: i32, text: &str) {
    let terms = self.tokenizer.tokenize(text);
    self.fields.entry(field).or_default().insert(id, &terms);
  }

  pub fn unindex(&mut self, field: TextField, id: i32, text: &str) {
    let terms = self.tokenizer.tokenize(text);
    if let Some(index) = self.fields.get_mut(&field) {
      index.remove(id, &terms);
    }
  }

  pub fn search(&self, field: TextField, query: &str) -> Vec<(i32, u32)> {
    let mut terms = self.tokenizer.tokenize(query);
    terms.sort();
    terms.dedup();
    self
      .fields
      .get(&field)
      .map(|index| index.search(&terms))
      .unwrap_or_default()
  }
}

impl FullTextIndex {
  /// Ids matching `query` as typed so far. An empty query matches nothing.
  pub fn complete(&self, field: TextField, query: &str) -> Vec<i32> {
    let mut terms = self.tokenizer.tokenize(query);
    let Some(prefix) = terms.pop() else {
      return Vec::new();
    };
    self
      .fields
      .get(&field)
      .map(|index| index.complete(&terms, &prefix))
      .unwrap_or_default()
  }
}

impl Default for FullTextIndex {
  fn default() -> Self { Self::new(Box::new(SimpleTokenizer)) }
}

impl fmt::Debug for FullTextIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FullTextIndex")
      .field("fields", &self.fields.len())
      .finish_non_exhaustive()
  }
}
