//! The archive: every chain, plus the lookup structures derived from them,
//! behind a single reader-writer lock.
//!
//! Writes are split in two so a backend can persist between them:
//!
//! 1. [`Archive::stage`] runs every check (chain, referential, uniqueness)
//!    under the read lock and returns the row that would be committed.
//! 2. [`Archive::publish`] takes the write lock, re-checks that the tail has
//!    not moved, and pushes the row and its index entries.
//!
//! Callers that stage and publish separately must serialise writers of the
//! same kind themselves. [`Archive::append`] does both under the write lock.

use std::{
  collections::{HashMap, HashSet},
  sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::{
  Error, Result,
  canonical::Canonical,
  chain::{AppendRequest, ChainHead, Chained},
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, EntityKind, Image, RefFrom, YoutubeChannel, YoutubeVideo,
  },
  fulltext::{FullTextIndex, TextField, Tokenizer},
  ledger::{ChainReport, Check, Ledger},
  record::Record,
  sidecar::CoverImage,
  topic::{Topic, TopicMention, TopicTable},
  xref::{RefIndex, pop_id},
};

// ─── State ───────────────────────────────────────────────────────────────────

/// Everything the archive knows. Only reachable through [`Archive`], so every
/// observer sees one consistent snapshot.
#[derive(Debug, Default)]
pub struct ArchiveState {
  pub(crate) authors:     Ledger<Author>,
  pub(crate) articles:    Ledger<Article>,
  pub(crate) paragraphs:  Ledger<ArticlePara>,
  pub(crate) images:      Ledger<Image>,
  pub(crate) channels:    Ledger<YoutubeChannel>,
  pub(crate) videos:      Ledger<YoutubeVideo>,
  pub(crate) art_refs:    Ledger<ArticleRefArticle>,
  pub(crate) vid_refs:    Ledger<ArticleRefVideo>,
  pub(crate) img_refs:    Ledger<ArticleRefImage>,

  pub(crate) articles_by_author: HashMap<i32, Vec<i32>>,
  pub(crate) paras_by_article:   HashMap<i32, Vec<i32>>,
  pub(crate) videos_by_channel:  HashMap<i32, Vec<i32>>,
  pub(crate) videos_by_pk:       HashMap<String, i32>,
  pub(crate) art_xref:           RefIndex,
  pub(crate) vid_xref:           RefIndex,
  pub(crate) img_xref:           RefIndex,
  /// Claimed values of every unique field, tagged by kind.
  pub(crate) unique:             HashSet<(EntityKind, String)>,
  pub(crate) text:               FullTextIndex,
  pub(crate) topics:             TopicTable,
  pub(crate) covers:             HashMap<i32, CoverImage>,
}

impl ArchiveState {
  pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Self {
    Self { text: FullTextIndex::new(tokenizer), ..Self::default() }
  }

  pub fn ledger<T: Ledgered>(&self) -> &Ledger<T> { T::ledger(self) }

  pub fn topics(&self) -> &TopicTable { &self.topics }

  pub fn cover(&self, art_id: i32) -> Option<&CoverImage> { self.covers.get(&art_id) }

  pub fn text(&self) -> &FullTextIndex { &self.text }

  /// The `vid_id` of the video with this `vid_pk`.
  pub fn video_id(&self, vid_pk: &str) -> Option<i32> { self.videos_by_pk.get(vid_pk).copied() }

  /// Re-audit every chain, in dependency order.
  pub fn verify(&self) -> Vec<ChainReport> {
    vec![
      self.authors.verify(),
      self.articles.verify(),
      self.paragraphs.verify(),
      self.images.verify(),
      self.channels.verify(),
      self.videos.verify(),
      self.art_refs.verify(),
      self.vid_refs.verify(),
      self.img_refs.verify(),
    ]
  }

  fn stage<T: Ledgered>(&self, req: AppendRequest<T>, check: Check) -> Result<Chained<T>> {
    let row = T::ledger(self).validate(req, check)?;
    row.content.check(self)?;
    Ok(row)
  }

  fn publish<T: Ledgered>(&mut self, row: Chained<T>) -> Result<()> {
    let head = T::ledger(self).head();
    if row.id() != head.next_id {
      return Err(Error::SequenceViolation {
        kind:     T::KIND,
        expected: head.next_id,
        found:    row.id(),
      });
    }
    if row.prior_sha256 != head.prior_sha256 {
      return Err(Error::LinkageViolation {
        kind:     T::KIND,
        id:       row.id(),
        expected: head.prior_sha256,
        found:    row.prior_sha256,
      });
    }
    row.content.index(self);
    T::ledger_mut(self).push(row);
    Ok(())
  }

  fn check_removal<T: Ledgered>(&self, id: i32) -> Result<()> {
    let ledger = T::ledger(self);
    let Some(row) = ledger.get(id) else {
      return Err(Error::ReferentialViolation(format!("{} {id} does not exist", T::KIND)));
    };
    if ledger.tail().map(Chained::id) != Some(id) {
      return Err(Error::ReferentialViolation(format!(
        "{} {id} is the prior row of {} {}",
        T::KIND,
        T::KIND,
        id + 1
      )));
    }
    match row.content.dependent(self) {
      Some(dependent) => Err(Error::ReferentialViolation(format!(
        "{} {id} is referenced by {dependent}",
        T::KIND
      ))),
      None => Ok(()),
    }
  }

  fn remove_tail<T: Ledgered>(&mut self, id: i32) -> Result<Chained<T>> {
    self.check_removal::<T>(id)?;
    let row = T::ledger_mut(self).pop_tail(id)?;
    row.content.unindex(self);
    Ok(row)
  }

  fn check_mention(&self, mention: &TopicMention) -> Result<()> {
    if !self.paragraphs.contains(mention.apara_id) {
      return Err(Error::ReferentialViolation(format!(
        "paragraph {} does not exist",
        mention.apara_id
      )));
    }
    if self.topics.contains(mention) {
      return Err(Error::UniquenessViolation(format!(
        "paragraph {} already mentions {:?}",
        mention.apara_id, mention.topic_key
      )));
    }
    Ok(())
  }

  fn check_cover(&self, art_id: i32) -> Result<()> {
    require_article(self, art_id).map(|_| ())
  }
}

// ─── Per-kind rules ──────────────────────────────────────────────────────────

/// A chained type the archive keeps a ledger for, with the rules that the
/// chain checks alone cannot express.
pub trait Ledgered: Canonical + Clone + Send + Sync + 'static {
  fn ledger(state: &ArchiveState) -> &Ledger<Self>;
  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self>;
  fn into_record(row: Chained<Self>) -> Record;

  /// Referential and uniqueness rules against the published state.
  fn check(&self, _state: &ArchiveState) -> Result<()> { Ok(()) }

  /// Add a row about to be pushed to the derived structures.
  fn index(&self, state: &mut ArchiveState);

  /// Undo [`Ledgered::index`] for a removed tail.
  fn unindex(&self, state: &mut ArchiveState);

  /// The first row that depends on this one, if any.
  fn dependent(&self, _state: &ArchiveState) -> Option<String> { None }
}

fn require_article(state: &ArchiveState, art_id: i32) -> Result<&Chained<Article>> {
  state
    .articles
    .get(art_id)
    .ok_or_else(|| Error::ReferentialViolation(format!("article {art_id} does not exist")))
}

fn require_paragraph(state: &ArchiveState, art_id: i32, apara_id: i32) -> Result<()> {
  let para = state
    .paragraphs
    .get(apara_id)
    .ok_or_else(|| Error::ReferentialViolation(format!("paragraph {apara_id} does not exist")))?;
  if para.content.art_id != art_id {
    return Err(Error::ReferentialViolation(format!(
      "paragraph {apara_id} belongs to article {}, not {art_id}",
      para.content.art_id
    )));
  }
  Ok(())
}

fn require_source(state: &ArchiveState, kind: EntityKind, from: &RefFrom) -> Result<()> {
  if from.comment.trim().is_empty() {
    return Err(Error::InvalidContent(format!("{kind} needs a non-empty comment")));
  }
  require_article(state, from.art_id)?;
  match from.apara_id {
    Some(apara_id) => require_paragraph(state, from.art_id, apara_id),
    None => Ok(()),
  }
}

fn require_unclaimed(state: &ArchiveState, kind: EntityKind, field: &str, value: &str) -> Result<()> {
  if state.unique.contains(&(kind, value.to_owned())) {
    return Err(Error::UniquenessViolation(format!("{kind} {field} {value:?} is taken")));
  }
  Ok(())
}

fn first_of(ids: &[i32], kind: EntityKind) -> Option<String> {
  ids.first().map(|id| format!("{kind} {id}"))
}

impl Ledgered for Author {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.authors }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.authors }

  fn into_record(row: Chained<Self>) -> Record { Record::Author(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_unclaimed(state, Self::KIND, "name", &self.name)
  }

  fn index(&self, state: &mut ArchiveState) {
    state.unique.insert((Self::KIND, self.name.clone()));
    state.text.index(TextField::AuthorName, self.auth_id, &self.name);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.unique.remove(&(Self::KIND, self.name.clone()));
    state.text.unindex(TextField::AuthorName, self.auth_id, &self.name);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    let articles = state.articles_by_author.get(&self.auth_id)?;
    first_of(articles, EntityKind::Article)
  }
}

impl Ledgered for Article {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.articles }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.articles }

  fn into_record(row: Chained<Self>) -> Record { Record::Article(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    if !state.authors.contains(self.auth_id) {
      return Err(Error::ReferentialViolation(format!(
        "author {} does not exist",
        self.auth_id
      )));
    }
    require_unclaimed(state, Self::KIND, "title", &self.title)
  }

  fn index(&self, state: &mut ArchiveState) {
    state.articles_by_author.entry(self.auth_id).or_default().push(self.art_id);
    state.unique.insert((Self::KIND, self.title.clone()));
    state.text.index(TextField::ArticleTitle, self.art_id, &self.title);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    pop_id(&mut state.articles_by_author, self.auth_id, self.art_id);
    state.unique.remove(&(Self::KIND, self.title.clone()));
    state.text.unindex(TextField::ArticleTitle, self.art_id, &self.title);
    state.covers.remove(&self.art_id);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    let id = self.art_id;
    state
      .paras_by_article
      .get(&id)
      .and_then(|paras| first_of(paras, EntityKind::ArticlePara))
      .or_else(|| first_of(state.art_xref.from_article(id), EntityKind::ArticleRefArticle))
      .or_else(|| first_of(state.art_xref.inbound(id), EntityKind::ArticleRefArticle))
      .or_else(|| first_of(state.vid_xref.from_article(id), EntityKind::ArticleRefVideo))
      .or_else(|| first_of(state.img_xref.from_article(id), EntityKind::ArticleRefImage))
  }
}

impl Ledgered for ArticlePara {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.paragraphs }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.paragraphs }

  fn into_record(row: Chained<Self>) -> Record { Record::ArticlePara(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_article(state, self.art_id).map(|_| ())
  }

  fn index(&self, state: &mut ArchiveState) {
    state.paras_by_article.entry(self.art_id).or_default().push(self.apara_id);
    state.text.index(TextField::ParagraphText, self.apara_id, &self.md);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    pop_id(&mut state.paras_by_article, self.art_id, self.apara_id);
    state.text.unindex(TextField::ParagraphText, self.apara_id, &self.md);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    let (art_id, id) = (self.art_id, self.apara_id);
    let targeted = state
      .art_xref
      .inbound(art_id)
      .iter()
      .copied()
      .find(|&aref| {
        state
          .art_refs
          .get(aref)
          .is_some_and(|edge| edge.content.refs_para == Some(id))
      });

    first_of(state.art_xref.outbound(art_id, id), EntityKind::ArticleRefArticle)
      .or_else(|| targeted.map(|aref| format!("{} {aref}", EntityKind::ArticleRefArticle)))
      .or_else(|| first_of(state.vid_xref.outbound(art_id, id), EntityKind::ArticleRefVideo))
      .or_else(|| first_of(state.img_xref.outbound(art_id, id), EntityKind::ArticleRefImage))
      .or_else(|| state.topics.has_mentions(id).then(|| "topic mentions".to_owned()))
  }
}

impl Ledgered for Image {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.images }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.images }

  fn into_record(row: Chained<Self>) -> Record { Record::Image(row) }

  fn index(&self, state: &mut ArchiveState) {
    state.text.index(TextField::ImageAlt, self.img_id, &self.pair.alt);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.text.unindex(TextField::ImageAlt, self.img_id, &self.pair.alt);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    first_of(state.img_xref.inbound(self.img_id), EntityKind::ArticleRefImage)
  }
}

impl Ledgered for YoutubeChannel {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.channels }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.channels }

  fn into_record(row: Chained<Self>) -> Record { Record::YoutubeChannel(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_unclaimed(state, Self::KIND, "url", &self.url)
  }

  fn index(&self, state: &mut ArchiveState) {
    state.unique.insert((Self::KIND, self.url.clone()));
    state.text.index(TextField::ChannelName, self.chan_id, &self.name);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.unique.remove(&(Self::KIND, self.url.clone()));
    state.text.unindex(TextField::ChannelName, self.chan_id, &self.name);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    let videos = state.videos_by_channel.get(&self.chan_id)?;
    first_of(videos, EntityKind::YoutubeVideo)
  }
}

impl Ledgered for YoutubeVideo {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.videos }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.videos }

  fn into_record(row: Chained<Self>) -> Record { Record::YoutubeVideo(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    if !state.channels.contains(self.chan_id) {
      return Err(Error::ReferentialViolation(format!(
        "youtube_channel {} does not exist",
        self.chan_id
      )));
    }
    require_unclaimed(state, Self::KIND, "vid_pk", &self.vid_pk)
  }

  fn index(&self, state: &mut ArchiveState) {
    state.videos_by_channel.entry(self.chan_id).or_default().push(self.vid_id);
    state.videos_by_pk.insert(self.vid_pk.clone(), self.vid_id);
    state.unique.insert((Self::KIND, self.vid_pk.clone()));
    state.text.index(TextField::VideoTitle, self.vid_id, &self.title);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    pop_id(&mut state.videos_by_channel, self.chan_id, self.vid_id);
    state.videos_by_pk.remove(&self.vid_pk);
    state.unique.remove(&(Self::KIND, self.vid_pk.clone()));
    state.text.unindex(TextField::VideoTitle, self.vid_id, &self.title);
  }

  fn dependent(&self, state: &ArchiveState) -> Option<String> {
    first_of(state.vid_xref.inbound(self.vid_id), EntityKind::ArticleRefVideo)
  }
}

impl Ledgered for ArticleRefArticle {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.art_refs }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.art_refs }

  fn into_record(row: Chained<Self>) -> Record { Record::ArticleRefArticle(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_source(state, Self::KIND, &self.from)?;
    require_article(state, self.refs_art)?;
    match self.refs_para {
      Some(apara_id) => require_paragraph(state, self.refs_art, apara_id),
      None => Ok(()),
    }
  }

  fn index(&self, state: &mut ArchiveState) {
    state.art_xref.insert(self);
    state.text.index(TextField::ArticleRefComment, self.aref_id, &self.from.comment);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.art_xref.remove(self);
    state.text.unindex(TextField::ArticleRefComment, self.aref_id, &self.from.comment);
  }
}

impl Ledgered for ArticleRefVideo {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.vid_refs }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.vid_refs }

  fn into_record(row: Chained<Self>) -> Record { Record::ArticleRefVideo(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_source(state, Self::KIND, &self.from)?;
    match state.videos.get(self.vid_id) {
      Some(video) if video.content.vid_pk == self.vid_pk => Ok(()),
      Some(video) => Err(Error::ReferentialViolation(format!(
        "youtube_video {} has vid_pk {:?}, not {:?}",
        self.vid_id, video.content.vid_pk, self.vid_pk
      ))),
      None => Err(Error::ReferentialViolation(format!(
        "youtube_video {} does not exist",
        self.vid_id
      ))),
    }
  }

  fn index(&self, state: &mut ArchiveState) {
    state.vid_xref.insert(self);
    state.text.index(TextField::VideoRefComment, self.vref_id, &self.from.comment);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.vid_xref.remove(self);
    state.text.unindex(TextField::VideoRefComment, self.vref_id, &self.from.comment);
  }
}

impl Ledgered for ArticleRefImage {
  fn ledger(state: &ArchiveState) -> &Ledger<Self> { &state.img_refs }

  fn ledger_mut(state: &mut ArchiveState) -> &mut Ledger<Self> { &mut state.img_refs }

  fn into_record(row: Chained<Self>) -> Record { Record::ArticleRefImage(row) }

  fn check(&self, state: &ArchiveState) -> Result<()> {
    require_source(state, Self::KIND, &self.from)?;
    if !state.images.contains(self.img_id) {
      return Err(Error::ReferentialViolation(format!(
        "image {} does not exist",
        self.img_id
      )));
    }
    Ok(())
  }

  fn index(&self, state: &mut ArchiveState) {
    state.img_xref.insert(self);
    state.text.index(TextField::ImageRefComment, self.iref_id, &self.from.comment);
  }

  fn unindex(&self, state: &mut ArchiveState) {
    state.img_xref.remove(self);
    state.text.unindex(TextField::ImageRefComment, self.iref_id, &self.from.comment);
  }
}

// ─── Archive ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Archive {
  state: RwLock<ArchiveState>,
}

impl Archive {
  pub fn new() -> Self { Self::default() }

  pub fn with_tokenizer(tokenizer: Box<dyn Tokenizer>) -> Self {
    Self { state: RwLock::new(ArchiveState::with_tokenizer(tokenizer)) }
  }

  fn read_lock(&self) -> Result<RwLockReadGuard<'_, ArchiveState>> {
    self.state.read().map_err(|_| Error::LockPoisoned)
  }

  fn write_lock(&self) -> Result<RwLockWriteGuard<'_, ArchiveState>> {
    self.state.write().map_err(|_| Error::LockPoisoned)
  }

  /// Run `f` against one consistent snapshot.
  pub fn read<R>(&self, f: impl FnOnce(&ArchiveState) -> R) -> Result<R> {
    let state = self.read_lock()?;
    Ok(f(&state))
  }

  pub fn head<T: Ledgered>(&self) -> Result<ChainHead> {
    self.read(|state| T::ledger(state).head())
  }

  pub fn get<T: Ledgered>(&self, id: i32) -> Result<Option<Chained<T>>> {
    self.read(|state| T::ledger(state).get(id).cloned())
  }

  pub fn tail<T: Ledgered>(&self) -> Result<Option<Chained<T>>> {
    self.read(|state| T::ledger(state).tail().cloned())
  }

  /// Validate `req` without committing it.
  pub fn stage<T: Ledgered>(&self, req: AppendRequest<T>, check: Check) -> Result<Chained<T>> {
    self.read(|state| state.stage(req, check))?.inspect_err(|e| {
      warn!(kind = %T::KIND, error = %e, "append rejected");
    })
  }

  /// Commit a row returned by [`Archive::stage`].
  pub fn publish<T: Ledgered>(&self, row: Chained<T>) -> Result<()> {
    let (id, sha256) = (row.id(), row.new_sha256.clone());
    self.write_lock()?.publish(row)?;
    info!(kind = %T::KIND, id, %sha256, "row committed");
    Ok(())
  }

  /// Validate and commit `req` in one step.
  pub fn append<T: Ledgered>(
    &self,
    req: AppendRequest<T>,
    now: DateTime<Utc>,
  ) -> Result<Chained<T>> {
    let mut state = self.write_lock()?;
    let row = state.stage(req, Check::Append { now }).inspect_err(|e| {
      warn!(kind = %T::KIND, error = %e, "append rejected");
    })?;
    state.publish(row.clone())?;
    info!(kind = %T::KIND, id = row.id(), sha256 = %row.new_sha256, "row committed");
    Ok(row)
  }

  /// Build the next row of `T`'s chain from its id, seal it with the current
  /// time, and commit it.
  pub fn append_next<T: Ledgered>(&self, make: impl FnOnce(i32) -> T) -> Result<Chained<T>> {
    let mut state = self.write_lock()?;
    let head = T::ledger(&state).head();
    let req = AppendRequest::on_head(make(head.next_id), &head);
    let row = state.stage(req, Check::Append { now: Utc::now() }).inspect_err(|e| {
      warn!(kind = %T::KIND, error = %e, "append rejected");
    })?;
    state.publish(row.clone())?;
    info!(kind = %T::KIND, id = row.id(), sha256 = %row.new_sha256, "row committed");
    Ok(row)
  }

  /// Re-admit a persisted row. Any failure means the stored chain was
  /// altered and is reported as [`Error::ChainBroken`].
  pub fn replay<T: Ledgered>(&self, row: Chained<T>) -> Result<()> {
    let id = row.id();
    let mut state = self.write_lock()?;
    let broken = |e: Error| {
      error!(kind = %T::KIND, id, error = %e, "stored chain failed verification");
      Error::ChainBroken { kind: T::KIND, id, reason: e.to_string() }
    };
    // The envelope is rebuilt from the content, so the stored prior_id is
    // compared before it is dropped.
    let expected = (id > 0).then(|| id - 1);
    if row.prior_id != expected {
      let reason = format!("prior_id {:?}, expected {expected:?}", row.prior_id);
      error!(kind = %T::KIND, id, %reason, "stored chain failed verification");
      return Err(Error::ChainBroken { kind: T::KIND, id, reason });
    }
    let row = state.stage(AppendRequest::from(row), Check::Replay).map_err(broken)?;
    state.publish(row).map_err(broken)?;
    debug!(kind = %T::KIND, id, "row replayed");
    Ok(())
  }

  /// Fails unless `id` is the unreferenced tail of `T`'s chain.
  pub fn check_removal<T: Ledgered>(&self, id: i32) -> Result<()> {
    self.read(|state| state.check_removal::<T>(id))?
  }

  pub fn remove_tail<T: Ledgered>(&self, id: i32) -> Result<Chained<T>> {
    let row = self.write_lock()?.remove_tail::<T>(id).inspect_err(|e| {
      warn!(kind = %T::KIND, id, error = %e, "tail removal rejected");
    })?;
    warn!(kind = %T::KIND, id, sha256 = %row.new_sha256, "tail row removed");
    Ok(row)
  }

  pub fn check_mention(&self, mention: &TopicMention) -> Result<()> {
    self.read(|state| state.check_mention(mention))?
  }

  pub fn record_mention(&self, mention: &TopicMention) -> Result<Topic> {
    let mut state = self.write_lock()?;
    state.check_mention(mention)?;
    Ok(state.topics.insert(mention))
  }

  pub fn check_cover(&self, art_id: i32) -> Result<()> {
    self.read(|state| state.check_cover(art_id))?
  }

  /// Install `cover`, returning the one it replaces.
  pub fn set_cover(&self, cover: CoverImage) -> Result<Option<CoverImage>> {
    let mut state = self.write_lock()?;
    state.check_cover(cover.art_id)?;
    Ok(state.covers.insert(cover.art_id, cover))
  }

  pub fn verify(&self) -> Result<Vec<ChainReport>> { self.read(ArchiveState::verify) }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, NaiveDate};

  use super::*;
  use crate::entity::ImagePair;

  fn pair() -> ImagePair {
    ImagePair {
      src_full: "data:image/png;base64,AA".into(),
      src_thmb: "data:image/png;base64,AA".into(),
      alt:      "cover".into(),
      url:      None,
      archive:  None,
    }
  }

  fn author(archive: &Archive, name: &str) -> Chained<Author> {
    archive
      .append_next(|auth_id| Author { auth_id, name: name.into() })
      .unwrap()
  }

  fn article(archive: &Archive, auth_id: i32, title: &str) -> Chained<Article> {
    archive
      .append_next(|art_id| Article { art_id, auth_id, title: title.into() })
      .unwrap()
  }

  fn para(archive: &Archive, art_id: i32, md: &str) -> Chained<ArticlePara> {
    archive
      .append_next(|apara_id| ArticlePara { apara_id, art_id, md: md.into() })
      .unwrap()
  }

  fn see_also(art_id: i32, apara_id: Option<i32>) -> RefFrom {
    RefFrom { art_id, apara_id, comment: "see also".into() }
  }

  #[test]
  fn article_needs_an_existing_author() {
    let archive = Archive::new();
    let err = archive
      .append_next(|art_id| Article { art_id, auth_id: 3, title: "t".into() })
      .unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));
    assert_eq!(archive.head::<Article>().unwrap(), ChainHead::genesis());
  }

  #[test]
  fn unique_fields_reject_duplicates() {
    let archive = Archive::new();
    author(&archive, "Jane Roe");
    let err = archive
      .append_next(|auth_id| Author { auth_id, name: "Jane Roe".into() })
      .unwrap_err();
    assert!(matches!(err, Error::UniquenessViolation(_)));
    assert_eq!(archive.head::<Author>().unwrap().next_id, 1);
  }

  #[test]
  fn reference_anchor_must_belong_to_its_article() {
    let archive = Archive::new();
    author(&archive, "a");
    article(&archive, 0, "A");
    article(&archive, 0, "B");
    para(&archive, 1, "belongs to B");

    let err = archive
      .append_next(|aref_id| ArticleRefArticle {
        aref_id,
        from: see_also(0, Some(0)),
        refs_art: 1,
        refs_para: None,
      })
      .unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));

    let err = archive
      .append_next(|aref_id| ArticleRefArticle {
        aref_id,
        from: see_also(1, Some(0)),
        refs_art: 0,
        refs_para: Some(0),
      })
      .unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));
    assert!(archive.tail::<ArticleRefArticle>().unwrap().is_none());
  }

  #[test]
  fn stale_append_leaves_the_tail_unchanged() {
    let archive = Archive::new();
    let first = author(&archive, "a");
    let now = Utc::now();
    let req = AppendRequest::seal(
      Author { auth_id: 1, name: "b".into() },
      first.new_sha256.clone(),
      now - Duration::seconds(2),
    );
    let err = archive.append(req, now).unwrap_err();
    assert!(matches!(err, Error::FreshnessViolation { .. }));
    assert_eq!(archive.tail::<Author>().unwrap(), Some(first));
  }

  #[test]
  fn staged_row_cannot_publish_onto_a_moved_tail() {
    let archive = Archive::new();
    let head = archive.head::<Author>().unwrap();
    let req = AppendRequest::on_head(Author { auth_id: 0, name: "a".into() }, &head);
    let staged = archive.stage(req, Check::Append { now: Utc::now() }).unwrap();
    author(&archive, "b");
    let err = archive.publish(staged).unwrap_err();
    assert!(matches!(err, Error::SequenceViolation { .. }));
  }

  #[test]
  fn only_an_unreferenced_tail_can_be_removed() {
    let archive = Archive::new();
    author(&archive, "a");
    author(&archive, "b");
    article(&archive, 1, "by b");

    let err = archive.remove_tail::<Author>(0).unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));
    let err = archive.remove_tail::<Author>(1).unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));

    archive.remove_tail::<Article>(0).unwrap();
    archive.remove_tail::<Author>(1).unwrap();
    assert_eq!(archive.head::<Author>().unwrap().next_id, 1);

    // The name and its postings are free again.
    let found = archive
      .read(|s| s.text().search(TextField::AuthorName, "b"))
      .unwrap();
    assert!(found.is_empty());
    author(&archive, "b");
  }

  #[test]
  fn targeted_paragraph_is_not_removable() {
    let archive = Archive::new();
    author(&archive, "a");
    article(&archive, 0, "A");
    article(&archive, 0, "B");
    para(&archive, 1, "target");
    archive
      .append_next(|aref_id| ArticleRefArticle {
        aref_id,
        from: see_also(0, None),
        refs_art: 1,
        refs_para: Some(0),
      })
      .unwrap();

    let err = archive.remove_tail::<ArticlePara>(0).unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(msg) if msg.contains("article_ref_article 0")));
  }

  #[test]
  fn replay_of_a_forged_row_breaks_the_chain() {
    let archive = Archive::new();
    let mut row = AppendRequest::on_head(
      Author { auth_id: 0, name: "a".into() },
      &ChainHead::genesis(),
    )
    .into_chained();
    row.content.name = "forged".into();

    let err = archive.replay(row).unwrap_err();
    assert!(matches!(err, Error::ChainBroken { kind: EntityKind::Author, id: 0, .. }));
    assert!(archive.tail::<Author>().unwrap().is_none());
  }

  #[test]
  fn replay_rejects_a_rewritten_prior_id() {
    let archive = Archive::new();
    let first = AppendRequest::on_head(
      Author { auth_id: 0, name: "a".into() },
      &ChainHead::genesis(),
    )
    .into_chained();
    archive.replay(first.clone()).unwrap();

    let head = archive.head::<Author>().unwrap();
    let mut second =
      AppendRequest::on_head(Author { auth_id: 1, name: "b".into() }, &head).into_chained();
    second.prior_id = Some(42);

    let err = archive.replay(second).unwrap_err();
    assert!(matches!(err, Error::ChainBroken { kind: EntityKind::Author, id: 1, .. }));
    assert_eq!(archive.tail::<Author>().unwrap(), Some(first));
  }

  #[test]
  fn references_need_a_comment() {
    let archive = Archive::new();
    author(&archive, "a");
    article(&archive, 0, "A");
    archive.append_next(|img_id| Image { img_id, pair: pair() }).unwrap();
    archive
      .append_next(|chan_id| YoutubeChannel {
        chan_id,
        url: "c/council".into(),
        name: "Council".into(),
      })
      .unwrap();
    archive
      .append_next(|vid_id| YoutubeVideo {
        vid_id,
        chan_id: 0,
        vid_pk: "dQw4w9WgXcQ".into(),
        title: "Hearing".into(),
        date_uploaded: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
      })
      .unwrap();
    let blank = |comment: &str| RefFrom { art_id: 0, apara_id: None, comment: comment.into() };

    let err = archive
      .append_next(|aref_id| ArticleRefArticle {
        aref_id,
        from: blank(""),
        refs_art: 0,
        refs_para: None,
      })
      .unwrap_err();
    assert!(matches!(err, Error::InvalidContent(_)));

    let err = archive
      .append_next(|vref_id| ArticleRefVideo {
        vref_id,
        from: blank("   "),
        vid_id: 0,
        vid_pk: "dQw4w9WgXcQ".into(),
        sec_req: None,
      })
      .unwrap_err();
    assert!(matches!(err, Error::InvalidContent(_)));

    let err = archive
      .append_next(|iref_id| ArticleRefImage { iref_id, from: blank("\t\n"), img_id: 0 })
      .unwrap_err();
    assert!(matches!(err, Error::InvalidContent(_)));

    assert!(archive.tail::<ArticleRefArticle>().unwrap().is_none());
    assert!(archive.tail::<ArticleRefVideo>().unwrap().is_none());
    assert!(archive.tail::<ArticleRefImage>().unwrap().is_none());
  }

  #[test]
  fn video_reference_must_agree_with_the_video_pk() {
    let archive = Archive::new();
    author(&archive, "a");
    article(&archive, 0, "A");
    archive
      .append_next(|chan_id| YoutubeChannel {
        chan_id,
        url: "c/council".into(),
        name: "Council".into(),
      })
      .unwrap();
    archive
      .append_next(|vid_id| YoutubeVideo {
        vid_id,
        chan_id: 0,
        vid_pk: "dQw4w9WgXcQ".into(),
        title: "Hearing".into(),
        date_uploaded: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
      })
      .unwrap();
    assert_eq!(archive.read(|s| s.video_id("dQw4w9WgXcQ")).unwrap(), Some(0));

    let err = archive
      .append_next(|vref_id| ArticleRefVideo {
        vref_id,
        from: see_also(0, None),
        vid_id: 0,
        vid_pk: "xxxxxxxxxxx".into(),
        sec_req: None,
      })
      .unwrap_err();
    assert!(matches!(err, Error::ReferentialViolation(_)));

    archive
      .append_next(|vref_id| ArticleRefVideo {
        vref_id,
        from: see_also(0, None),
        vid_id: 0,
        vid_pk: "dQw4w9WgXcQ".into(),
        sec_req: Some(30),
      })
      .unwrap();
  }

  #[test]
  fn replay_accepts_old_rows() {
    let archive = Archive::new();
    let row = AppendRequest::seal(
      Author { auth_id: 0, name: "a".into() },
      crate::canonical::ZERO_SHA256,
      Utc::now() - Duration::days(30),
    )
    .into_chained();
    archive.replay(row.clone()).unwrap();
    assert_eq!(archive.get::<Author>(0).unwrap(), Some(row));
  }

  #[test]
  fn topic_mentions_need_a_paragraph_and_are_unique() {
    let archive = Archive::new();
    let mention = TopicMention { apara_id: 0, topic_key: "housing".into() };
    assert!(matches!(
      archive.record_mention(&mention).unwrap_err(),
      Error::ReferentialViolation(_)
    ));

    author(&archive, "a");
    article(&archive, 0, "A");
    para(&archive, 0, "p");
    assert_eq!(archive.record_mention(&mention).unwrap().mentions, 1);
    assert!(matches!(
      archive.record_mention(&mention).unwrap_err(),
      Error::UniquenessViolation(_)
    ));
  }

  #[test]
  fn covers_are_overwritable_but_need_an_article() {
    let archive = Archive::new();
    let pair = pair();
    assert!(matches!(
      archive.set_cover(CoverImage::new(0, pair.clone())).unwrap_err(),
      Error::ReferentialViolation(_)
    ));

    author(&archive, "a");
    article(&archive, 0, "A");
    assert!(archive.set_cover(CoverImage::new(0, pair.clone())).unwrap().is_none());
    assert!(archive.set_cover(CoverImage::new(0, pair)).unwrap().is_some());
  }

  #[test]
  fn verify_covers_every_chain() {
    let archive = Archive::new();
    author(&archive, "a");
    let reports = archive.verify().unwrap();
    assert_eq!(reports.len(), EntityKind::ALL.len());
    assert!(reports.iter().all(ChainReport::is_valid));
    assert_eq!(reports[0].rows, 1);
  }
}
