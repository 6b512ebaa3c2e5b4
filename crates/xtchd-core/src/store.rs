//! The `XtchdStore` trait and supporting query types.
//!
//! The trait is implemented by durable backends (e.g. `xtchd-store-sqlite`).
//! The CLI depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::NaiveDate;

use crate::{
  archive::Ledgered,
  chain::{AppendRequest, ChainHead, Chained},
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, Image, ImagePair, RefFrom, YoutubeChannel, YoutubeVideo,
  },
  fulltext::TextField,
  ledger::ChainReport,
  sidecar::CoverImage,
  topic::{Topic, TopicMention},
  views::{
    ArticleText, AuthorDetail, CombinedReferences, EnrichedArticle, EnrichedImage,
    EnrichedParagraph, EnrichedVideo, Headline, References, SearchHit, Suggestion,
  },
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`XtchdStore::search`] and [`XtchdStore::autocomplete`].
#[derive(Debug, Clone)]
pub struct SearchQuery {
  pub field: TextField,
  /// Every term must match. For autocomplete the last one matches as a
  /// prefix.
  pub text:  String,
  pub limit: Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a durable xtchd archive.
///
/// There is no update operation. Every write is an append to one chain,
/// validated in full before anything is persisted; the only exceptions are
/// the unchained topic mentions and cover sidecar.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait XtchdStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Chains ────────────────────────────────────────────────────────────

  /// What a client needs to seal the next row of `T`.
  fn head<T: Ledgered>(&self) -> impl Future<Output = Result<ChainHead, Self::Error>> + Send + '_;

  fn get<T: Ledgered>(
    &self,
    id: i32,
  ) -> impl Future<Output = Result<Option<Chained<T>>, Self::Error>> + Send + '_;

  fn tail<T: Ledgered>(
    &self,
  ) -> impl Future<Output = Result<Option<Chained<T>>, Self::Error>> + Send + '_;

  /// Validate `req` (sequence, linkage, freshness, integrity, then the
  /// type's referential and uniqueness rules), persist it, and publish it.
  fn append<T: Ledgered>(
    &self,
    req: AppendRequest<T>,
  ) -> impl Future<Output = Result<Chained<T>, Self::Error>> + Send + '_;

  /// Remove the tail row of `T`. Fails for any other row, or if anything
  /// still references it.
  fn remove_tail<T: Ledgered>(
    &self,
    id: i32,
  ) -> impl Future<Output = Result<Chained<T>, Self::Error>> + Send + '_;

  /// Re-audit every chain.
  fn verify(&self) -> impl Future<Output = Result<Vec<ChainReport>, Self::Error>> + Send + '_;

  // ── Convenience appends ───────────────────────────────────────────────
  //
  // Each reads the head under the writer gate, seals the content with the
  // current time, and appends it.

  fn add_author(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Chained<Author>, Self::Error>> + Send + '_;

  fn add_article(
    &self,
    auth_id: i32,
    title: String,
  ) -> impl Future<Output = Result<Chained<Article>, Self::Error>> + Send + '_;

  fn add_paragraph(
    &self,
    art_id: i32,
    md: String,
  ) -> impl Future<Output = Result<Chained<ArticlePara>, Self::Error>> + Send + '_;

  fn add_image(
    &self,
    pair: ImagePair,
  ) -> impl Future<Output = Result<Chained<Image>, Self::Error>> + Send + '_;

  /// `url` is stored lower-cased.
  fn add_youtube_channel(
    &self,
    url: String,
    name: String,
  ) -> impl Future<Output = Result<Chained<YoutubeChannel>, Self::Error>> + Send + '_;

  fn add_youtube_video(
    &self,
    chan_id: i32,
    vid_pk: String,
    title: String,
    date_uploaded: NaiveDate,
  ) -> impl Future<Output = Result<Chained<YoutubeVideo>, Self::Error>> + Send + '_;

  fn add_article_ref_article(
    &self,
    from: RefFrom,
    refs_art: i32,
    refs_para: Option<i32>,
  ) -> impl Future<Output = Result<Chained<ArticleRefArticle>, Self::Error>> + Send + '_;

  /// The video is named by its YouTube id and must already be archived.
  fn add_article_ref_video(
    &self,
    from: RefFrom,
    vid_pk: String,
    sec_req: Option<i16>,
  ) -> impl Future<Output = Result<Chained<ArticleRefVideo>, Self::Error>> + Send + '_;

  fn add_article_ref_image(
    &self,
    from: RefFrom,
    img_id: i32,
  ) -> impl Future<Output = Result<Chained<ArticleRefImage>, Self::Error>> + Send + '_;

  // ── Unchained tables ──────────────────────────────────────────────────

  /// Replace the cover of `art_id`.
  fn set_article_cover(
    &self,
    art_id: i32,
    pair: ImagePair,
  ) -> impl Future<Output = Result<CoverImage, Self::Error>> + Send + '_;

  fn article_cover(
    &self,
    art_id: i32,
  ) -> impl Future<Output = Result<Option<CoverImage>, Self::Error>> + Send + '_;

  fn record_topic_mention(
    &self,
    mention: TopicMention,
  ) -> impl Future<Output = Result<Topic, Self::Error>> + Send + '_;

  /// All topics, most mentioned first.
  fn topics(&self) -> impl Future<Output = Result<Vec<Topic>, Self::Error>> + Send + '_;

  // ── Views ─────────────────────────────────────────────────────────────

  fn author_detail(
    &self,
    auth_id: i32,
  ) -> impl Future<Output = Result<Option<AuthorDetail>, Self::Error>> + Send + '_;

  fn article_text(
    &self,
    art_id: i32,
  ) -> impl Future<Output = Result<Option<ArticleText>, Self::Error>> + Send + '_;

  /// References of `art_id` under a paragraph id or
  /// [`crate::xref::WHOLE_ARTICLE`]. Empty lists, never `None`.
  fn references(
    &self,
    art_id: i32,
    key: i32,
  ) -> impl Future<Output = Result<References, Self::Error>> + Send + '_;

  fn combined_references(
    &self,
    art_id: i32,
  ) -> impl Future<Output = Result<Option<CombinedReferences>, Self::Error>> + Send + '_;

  fn enriched_paragraph(
    &self,
    art_id: i32,
    apara_id: i32,
  ) -> impl Future<Output = Result<Option<EnrichedParagraph>, Self::Error>> + Send + '_;

  fn enriched_article(
    &self,
    art_id: i32,
  ) -> impl Future<Output = Result<Option<EnrichedArticle>, Self::Error>> + Send + '_;

  fn enriched_image(
    &self,
    img_id: i32,
  ) -> impl Future<Output = Result<Option<EnrichedImage>, Self::Error>> + Send + '_;

  fn enriched_video(
    &self,
    vid_id: i32,
  ) -> impl Future<Output = Result<Option<EnrichedVideo>, Self::Error>> + Send + '_;

  fn latest_headlines(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<Headline>, Self::Error>> + Send + '_;

  fn search<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<SearchHit>, Self::Error>> + Send + 'a;

  /// Shortest labels first; [`crate::compose::DEFAULT_SUGGESTIONS`] when
  /// the query has no limit.
  fn autocomplete<'a>(
    &'a self,
    query: &'a SearchQuery,
  ) -> impl Future<Output = Result<Vec<Suggestion>, Self::Error>> + Send + 'a;
}
