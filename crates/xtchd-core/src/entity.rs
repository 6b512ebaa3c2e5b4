//! Chained entity types, one struct per append-only chain.
//!
//! Each struct carries its own id (`auth_id`, `art_id`, …) as the first
//! canonical field. The envelope around it (prior id, hashes, timestamp) lives
//! in [`crate::chain::Chained`].

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::canonical::{Canonical, nonefmt};

// ─── Kinds ───────────────────────────────────────────────────────────────────

/// Discriminant for every independent chain in the archive.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
  Author,
  Article,
  ArticlePara,
  Image,
  YoutubeChannel,
  YoutubeVideo,
  ArticleRefArticle,
  ArticleRefVideo,
  ArticleRefImage,
}

impl EntityKind {
  /// Every chain, in dependency order: a kind only references kinds listed
  /// before it.
  pub const ALL: [EntityKind; 9] = [
    Self::Author,
    Self::Article,
    Self::ArticlePara,
    Self::Image,
    Self::YoutubeChannel,
    Self::YoutubeVideo,
    Self::ArticleRefArticle,
    Self::ArticleRefVideo,
    Self::ArticleRefImage,
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Author => "author",
      Self::Article => "article",
      Self::ArticlePara => "article_para",
      Self::Image => "image",
      Self::YoutubeChannel => "youtube_channel",
      Self::YoutubeVideo => "youtube_video",
      Self::ArticleRefArticle => "article_ref_article",
      Self::ArticleRefVideo => "article_ref_video",
      Self::ArticleRefImage => "article_ref_image",
    }
  }

  /// Position in [`EntityKind::ALL`].
  pub fn index(self) -> usize { self as usize }
}

impl fmt::Display for EntityKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Authors & articles ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub auth_id: i32,
  pub name:    String,
}

impl Canonical for Author {
  const KIND: EntityKind = EntityKind::Author;

  fn id(&self) -> i32 { self.auth_id }

  fn state_string(&self) -> String {
    format!("auth_id={} name={}", self.auth_id, self.name)
  }
}

/// An article header. The text lives in [`ArticlePara`] rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
  pub art_id:  i32,
  pub auth_id: i32,
  pub title:   String,
}

impl Canonical for Article {
  const KIND: EntityKind = EntityKind::Article;

  fn id(&self) -> i32 { self.art_id }

  fn state_string(&self) -> String {
    format!("art_id={} auth_id={} title={}", self.art_id, self.auth_id, self.title)
  }
}

/// One markdown paragraph of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePara {
  pub apara_id: i32,
  pub art_id:   i32,
  pub md:       String,
}

impl Canonical for ArticlePara {
  const KIND: EntityKind = EntityKind::ArticlePara;

  fn id(&self) -> i32 { self.apara_id }

  fn state_string(&self) -> String {
    format!("apara_id={} art_id={} md={}", self.apara_id, self.art_id, self.md)
  }
}

// ─── Images ──────────────────────────────────────────────────────────────────

/// A full image plus its thumbnail, both base64 data URIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePair {
  /// e.g. `data:image/png;base64,iVBORw0KGgoA…`
  pub src_full: String,
  pub src_thmb: String,
  /// Caption / alt text.
  pub alt:      String,
  /// Where a screenshot or download came from.
  pub url:      Option<String>,
  /// Five-character archive.is key.
  pub archive:  Option<String>,
}

/// An image that "proves a point" inside an article, hence chained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
  pub img_id: i32,
  #[serde(flatten)]
  pub pair:   ImagePair,
}

impl Canonical for Image {
  const KIND: EntityKind = EntityKind::Image;

  fn id(&self) -> i32 { self.img_id }

  fn state_string(&self) -> String {
    format!(
      "img_id={} src_full={} src_thmb={} alt={} url={} archive={}",
      self.img_id,
      self.pair.src_full,
      self.pair.src_thmb,
      self.pair.alt,
      nonefmt(&self.pair.url),
      nonefmt(&self.pair.archive)
    )
  }
}

// ─── YouTube ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeChannel {
  pub chan_id: i32,
  /// Typically `c/ChannelName`.
  pub url:     String,
  pub name:    String,
}

impl Canonical for YoutubeChannel {
  const KIND: EntityKind = EntityKind::YoutubeChannel;

  fn id(&self) -> i32 { self.chan_id }

  fn state_string(&self) -> String {
    format!("chan_id={} name={} url={}", self.chan_id, self.name, self.url)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoutubeVideo {
  pub vid_id:        i32,
  pub chan_id:       i32,
  /// The 11-character id in the video's URL.
  pub vid_pk:        String,
  pub title:         String,
  /// Not part of the canonical form.
  pub date_uploaded: NaiveDate,
}

impl Canonical for YoutubeVideo {
  const KIND: EntityKind = EntityKind::YoutubeVideo;

  fn id(&self) -> i32 { self.vid_id }

  fn state_string(&self) -> String {
    format!(
      "vid_id={} vid_pk={} chan_id={} title={}",
      self.vid_id, self.vid_pk, self.chan_id, self.title
    )
  }
}

// ─── References ──────────────────────────────────────────────────────────────

/// The article (and optionally the paragraph) a reference is made from,
/// with a short note on why the target is relevant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefFrom {
  pub art_id:   i32,
  /// `None` anchors the reference to the article as a whole.
  pub apara_id: Option<i32>,
  pub comment:  String,
}

/// Article (or paragraph) → article (or paragraph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRefArticle {
  pub aref_id:   i32,
  pub from:      RefFrom,
  pub refs_art:  i32,
  pub refs_para: Option<i32>,
}

impl Canonical for ArticleRefArticle {
  const KIND: EntityKind = EntityKind::ArticleRefArticle;

  fn id(&self) -> i32 { self.aref_id }

  fn state_string(&self) -> String {
    format!(
      "aref_id={} from_art={} from_para={} refs_art={} refs_para={} comment={}",
      self.aref_id,
      self.from.art_id,
      nonefmt(&self.from.apara_id),
      self.refs_art,
      nonefmt(&self.refs_para),
      self.from.comment
    )
  }
}

/// Article (or paragraph) → video, optionally at an offset in seconds.
///
/// The video is named by its `vid_pk` in the canonical form. `vid_id` is the
/// resolved row and must name the video with that `vid_pk`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRefVideo {
  pub vref_id: i32,
  pub from:    RefFrom,
  pub vid_id:  i32,
  pub vid_pk:  String,
  pub sec_req: Option<i16>,
}

impl Canonical for ArticleRefVideo {
  const KIND: EntityKind = EntityKind::ArticleRefVideo;

  fn id(&self) -> i32 { self.vref_id }

  fn state_string(&self) -> String {
    format!(
      "vref_id={} art_id={} apara_id={} vid_pk={} sec_req={} comment={}",
      self.vref_id,
      self.from.art_id,
      nonefmt(&self.from.apara_id),
      self.vid_pk,
      nonefmt(&self.sec_req),
      self.from.comment
    )
  }
}

/// Article (or paragraph) → image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRefImage {
  pub iref_id: i32,
  pub from:    RefFrom,
  pub img_id:  i32,
}

impl Canonical for ArticleRefImage {
  const KIND: EntityKind = EntityKind::ArticleRefImage;

  fn id(&self) -> i32 { self.iref_id }

  fn state_string(&self) -> String {
    format!(
      "iref_id={} art_id={} apara_id={} img_id={} comment={}",
      self.iref_id,
      self.from.art_id,
      nonefmt(&self.from.apara_id),
      self.img_id,
      self.from.comment
    )
  }
}

/// Common shape of the three reference edge types.
pub trait Edge: Canonical {
  fn source(&self) -> &RefFrom;

  /// The id of the referenced article, video or image.
  fn target(&self) -> i32;
}

impl Edge for ArticleRefArticle {
  fn source(&self) -> &RefFrom { &self.from }
  fn target(&self) -> i32 { self.refs_art }
}

impl Edge for ArticleRefVideo {
  fn source(&self) -> &RefFrom { &self.from }
  fn target(&self) -> i32 { self.vid_id }
}

impl Edge for ArticleRefImage {
  fn source(&self) -> &RefFrom { &self.from }
  fn target(&self) -> i32 { self.img_id }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn channel_renders_name_before_url() {
    let chan = YoutubeChannel {
      chan_id: 2,
      url:     "c/somechannel".into(),
      name:    "Some Channel".into(),
    };
    assert_eq!(chan.state_string(), "chan_id=2 name=Some Channel url=c/somechannel");
  }

  #[test]
  fn video_canonical_form_excludes_upload_date() {
    let video = YoutubeVideo {
      vid_id:        4,
      chan_id:       2,
      vid_pk:        "dQw4w9WgXcQ".into(),
      title:         "A talk".into(),
      date_uploaded: NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
    };
    assert_eq!(video.state_string(), "vid_id=4 vid_pk=dQw4w9WgXcQ chan_id=2 title=A talk");
  }

  #[test]
  fn whole_article_reference_renders_blank_paragraph() {
    let r = ArticleRefArticle {
      aref_id:   0,
      from:      RefFrom { art_id: 0, apara_id: None, comment: "see also".into() },
      refs_art:  1,
      refs_para: Some(3),
    };
    assert_eq!(
      r.state_string(),
      "aref_id=0 from_art=0 from_para= refs_art=1 refs_para=3 comment=see also"
    );
  }

  #[test]
  fn video_reference_names_the_video_by_pk() {
    let r = ArticleRefVideo {
      vref_id: 2,
      from:    RefFrom { art_id: 1, apara_id: Some(4), comment: "at 1:35".into() },
      vid_id:  7,
      vid_pk:  "dQw4w9WgXcQ".into(),
      sec_req: Some(95),
    };
    assert_eq!(
      r.state_string(),
      "vref_id=2 art_id=1 apara_id=4 vid_pk=dQw4w9WgXcQ sec_req=95 comment=at 1:35"
    );
  }

  #[test]
  fn kinds_are_listed_in_index_order() {
    for (i, kind) in EntityKind::ALL.iter().enumerate() {
      assert_eq!(kind.index(), i);
    }
  }
}
