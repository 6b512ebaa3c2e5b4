//! The SQLite implementation of [`XtchdStore`].

use std::{path::Path, sync::Arc};

use chrono::{NaiveDate, Utc};
use rusqlite::OptionalExtension as _;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use xtchd_core::{
  Error as CoreError,
  archive::{Archive, Ledgered},
  chain::{AppendRequest, ChainHead, Chained},
  compose,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, EntityKind, Image, ImagePair, RefFrom, YoutubeChannel, YoutubeVideo,
  },
  ledger::{ChainReport, Check},
  sidecar::CoverImage,
  store::{SearchQuery, XtchdStore},
  topic::{Topic, TopicMention},
  views::{
    ArticleText, AuthorDetail, CombinedReferences, EnrichedArticle, EnrichedImage,
    EnrichedParagraph, EnrichedVideo, Headline, References, SearchHit, Suggestion,
  },
};

use crate::{
  Result,
  encode::{RawCover, encode_uuid},
  schema::SCHEMA,
  table::{Table, insert_record, select_all, table_of},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An xtchd archive journaled to a single SQLite file.
///
/// Every append runs under the writer gate of its kind: stage against the
/// in-memory archive, insert the row, then publish it. Appends to different
/// kinds proceed in parallel.
///
/// Clones share the connection, archive and gates.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  archive: Arc<Archive>,
  /// One writer gate per [`EntityKind`], indexed by [`EntityKind::index`].
  gates:   Arc<Vec<Mutex<()>>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, then replay and verify every chain.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::load(conn).await
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::load(conn).await
  }

  async fn load(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      archive: Arc::new(Archive::new()),
      gates: Arc::new(EntityKind::ALL.iter().map(|_| Mutex::new(())).collect()),
    };
    store.init_schema().await?;

    // Dependency order: every row's references are replayed before it.
    store.replay::<Author>().await?;
    store.replay::<Article>().await?;
    store.replay::<ArticlePara>().await?;
    store.replay::<Image>().await?;
    store.replay::<YoutubeChannel>().await?;
    store.replay::<YoutubeVideo>().await?;
    store.replay::<ArticleRefArticle>().await?;
    store.replay::<ArticleRefVideo>().await?;
    store.replay::<ArticleRefImage>().await?;
    store.load_covers().await?;
    store.load_mentions().await?;

    let rows = ensure_valid(&store.archive.verify()?)?;
    info!(rows, "archive opened");
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn replay<T: Table>(&self) -> Result<()> {
    let raws = self.conn.call(|conn| Ok(select_all::<T>(conn)?)).await?;
    let count = raws.len();
    for (content, envelope) in raws {
      self.archive.replay(envelope.into_chained(content)?)?;
    }
    debug!(kind = %T::KIND, rows = count, "chain replayed");
    Ok(())
  }

  async fn load_covers(&self) -> Result<()> {
    let raws: Vec<RawCover> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT art_id, cover_id, src_full, src_thmb, alt, url, archive
           FROM article_covers ORDER BY art_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawCover {
              art_id:   row.get(0)?,
              cover_id: row.get(1)?,
              src_full: row.get(2)?,
              src_thmb: row.get(3)?,
              alt:      row.get(4)?,
              url:      row.get(5)?,
              archive:  row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    for raw in raws {
      self.archive.set_cover(raw.into_cover()?)?;
    }
    Ok(())
  }

  async fn load_mentions(&self) -> Result<()> {
    let mentions: Vec<TopicMention> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT apara_id, topic_key FROM topic_mentions ORDER BY rowid")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(TopicMention { apara_id: row.get(0)?, topic_key: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    for mention in &mentions {
      self.archive.record_mention(mention)?;
    }
    Ok(())
  }

  fn gate(&self, kind: EntityKind) -> &Mutex<()> { &self.gates[kind.index()] }

  /// Every gate, always in [`EntityKind::ALL`] order.
  async fn lock_all(&self) -> Vec<MutexGuard<'_, ()>> {
    let mut guards = Vec::with_capacity(self.gates.len());
    for gate in self.gates.iter() {
      guards.push(gate.lock().await);
    }
    guards
  }

  /// Stage, persist, publish. The caller holds the gate of `T`.
  ///
  /// If publishing fails after the insert, the row is deleted again so the
  /// file and the archive agree. A future dropped while the insert is in
  /// flight leaves the row in the file but not in the archive; the file is
  /// authoritative and the row appears on the next open. Until then the
  /// next append of `T` collides on its primary key.
  async fn commit<T: Ledgered>(&self, req: AppendRequest<T>) -> Result<Chained<T>> {
    let row = self.archive.stage(req, Check::Append { now: Utc::now() })?;

    let record = T::into_record(row.clone());
    debug!(
      kind = %record.kind(),
      id = record.id(),
      sha256 = record.new_sha256(),
      "journaling row"
    );
    self
      .conn
      .call(move |conn| {
        insert_record(conn, &record)?;
        Ok(())
      })
      .await?;

    if let Err(err) = self.archive.publish(row.clone()) {
      warn!(kind = %T::KIND, id = row.id(), %err, "publish failed, unjournaling row");
      self.unjournal(T::KIND, row.id()).await?;
      return Err(err.into());
    }
    Ok(row)
  }

  async fn unjournal(&self, kind: EntityKind, id: i32) -> Result<()> {
    let (table, id_col) = table_of(kind);
    self
      .conn
      .call(move |conn| {
        conn.execute(&format!("DELETE FROM {table} WHERE {id_col} = ?1"), [id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Build the next row of `T` from its id and commit it.
  async fn append_next<T: Ledgered>(
    &self,
    make: impl FnOnce(i32) -> T + Send,
  ) -> Result<Chained<T>> {
    let _gate = self.gate(T::KIND).lock().await;
    let head = self.archive.head::<T>()?;
    let req = AppendRequest::on_head(make(head.next_id), &head);
    self.commit(req).await
  }

  /// The archive behind this store, for callers composing their own reads.
  pub fn archive(&self) -> &Archive { &self.archive }
}

/// Total rows, or the first violation any report carries.
pub(crate) fn ensure_valid(reports: &[ChainReport]) -> Result<usize> {
  for report in reports {
    if let Some(violation) = report.violations.first() {
      error!(kind = %report.kind, id = violation.id, "chain failed verification on open");
      return Err(
        CoreError::ChainBroken {
          kind:   report.kind,
          id:     violation.id,
          reason: violation.description.clone(),
        }
        .into(),
      );
    }
  }
  Ok(reports.iter().map(|r| r.rows).sum())
}

// ─── XtchdStore impl ─────────────────────────────────────────────────────────

impl XtchdStore for SqliteStore {
  type Error = crate::Error;

  // ── Chains ────────────────────────────────────────────────────────────────

  async fn head<T: Ledgered>(&self) -> Result<ChainHead> { Ok(self.archive.head::<T>()?) }

  async fn get<T: Ledgered>(&self, id: i32) -> Result<Option<Chained<T>>> {
    Ok(self.archive.get::<T>(id)?)
  }

  async fn tail<T: Ledgered>(&self) -> Result<Option<Chained<T>>> {
    Ok(self.archive.tail::<T>()?)
  }

  async fn append<T: Ledgered>(&self, req: AppendRequest<T>) -> Result<Chained<T>> {
    let _gate = self.gate(T::KIND).lock().await;
    self.commit(req).await
  }

  async fn remove_tail<T: Ledgered>(&self, id: i32) -> Result<Chained<T>> {
    let _gates = self.lock_all().await;
    self.archive.check_removal::<T>(id)?;

    let (table, id_col) = table_of(T::KIND);
    let is_article = T::KIND == EntityKind::Article;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {table} WHERE {id_col} = ?1"), [id])?;
        if is_article {
          tx.execute("DELETE FROM article_covers WHERE art_id = ?1", [id])?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(self.archive.remove_tail::<T>(id)?)
  }

  async fn verify(&self) -> Result<Vec<ChainReport>> { Ok(self.archive.verify()?) }

  // ── Convenience appends ───────────────────────────────────────────────────

  async fn add_author(&self, name: String) -> Result<Chained<Author>> {
    self.append_next(|auth_id| Author { auth_id, name }).await
  }

  async fn add_article(&self, auth_id: i32, title: String) -> Result<Chained<Article>> {
    self.append_next(|art_id| Article { art_id, auth_id, title }).await
  }

  async fn add_paragraph(&self, art_id: i32, md: String) -> Result<Chained<ArticlePara>> {
    self.append_next(|apara_id| ArticlePara { apara_id, art_id, md }).await
  }

  async fn add_image(&self, pair: ImagePair) -> Result<Chained<Image>> {
    self.append_next(|img_id| Image { img_id, pair }).await
  }

  async fn add_youtube_channel(
    &self,
    url: String,
    name: String,
  ) -> Result<Chained<YoutubeChannel>> {
    let url = url.to_lowercase();
    self.append_next(|chan_id| YoutubeChannel { chan_id, url, name }).await
  }

  async fn add_youtube_video(
    &self,
    chan_id: i32,
    vid_pk: String,
    title: String,
    date_uploaded: NaiveDate,
  ) -> Result<Chained<YoutubeVideo>> {
    self
      .append_next(|vid_id| YoutubeVideo { vid_id, chan_id, vid_pk, title, date_uploaded })
      .await
  }

  async fn add_article_ref_article(
    &self,
    from: RefFrom,
    refs_art: i32,
    refs_para: Option<i32>,
  ) -> Result<Chained<ArticleRefArticle>> {
    self
      .append_next(|aref_id| ArticleRefArticle { aref_id, from, refs_art, refs_para })
      .await
  }

  async fn add_article_ref_video(
    &self,
    from: RefFrom,
    vid_pk: String,
    sec_req: Option<i16>,
  ) -> Result<Chained<ArticleRefVideo>> {
    let Some(vid_id) = self.archive.read(|s| s.video_id(&vid_pk))? else {
      return Err(CoreError::ReferentialViolation(format!("no video {vid_pk}")).into());
    };
    self
      .append_next(|vref_id| ArticleRefVideo { vref_id, from, vid_id, vid_pk, sec_req })
      .await
  }

  async fn add_article_ref_image(
    &self,
    from: RefFrom,
    img_id: i32,
  ) -> Result<Chained<ArticleRefImage>> {
    self.append_next(|iref_id| ArticleRefImage { iref_id, from, img_id }).await
  }

  // ── Unchained tables ──────────────────────────────────────────────────────

  async fn set_article_cover(&self, art_id: i32, pair: ImagePair) -> Result<CoverImage> {
    // The article gate keeps the article from being removed underneath us.
    let _gate = self.gate(EntityKind::Article).lock().await;
    self.archive.check_cover(art_id)?;

    let cover = CoverImage::new(art_id, pair);
    let id_str = encode_uuid(cover.id);
    let pair = cover.pair.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO article_covers (art_id, cover_id, src_full, src_thmb, alt, url, archive)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (art_id) DO UPDATE SET
             cover_id = excluded.cover_id,
             src_full = excluded.src_full,
             src_thmb = excluded.src_thmb,
             alt      = excluded.alt,
             url      = excluded.url,
             archive  = excluded.archive",
          rusqlite::params![
            art_id,
            id_str,
            pair.src_full,
            pair.src_thmb,
            pair.alt,
            pair.url,
            pair.archive,
          ],
        )?;
        Ok(())
      })
      .await?;

    self.archive.set_cover(cover.clone())?;
    Ok(cover)
  }

  async fn article_cover(&self, art_id: i32) -> Result<Option<CoverImage>> {
    Ok(self.archive.read(|s| s.cover(art_id).cloned())?)
  }

  async fn record_topic_mention(&self, mention: TopicMention) -> Result<Topic> {
    let _gate = self.gate(EntityKind::ArticlePara).lock().await;
    self.archive.check_mention(&mention)?;

    let (apara_id, key) = (mention.apara_id, mention.topic_key.clone());
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let known = tx
          .query_row("SELECT 1 FROM topics WHERE topic_key = ?1", [&key], |_| Ok(()))
          .optional()?
          .is_some();
        if !known {
          tx.execute("INSERT INTO topics (topic_key) VALUES (?1)", [&key])?;
        }
        tx.execute(
          "INSERT INTO topic_mentions (apara_id, topic_key) VALUES (?1, ?2)",
          rusqlite::params![apara_id, key],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(self.archive.record_mention(&mention)?)
  }

  async fn topics(&self) -> Result<Vec<Topic>> {
    Ok(self.archive.read(|s| s.topics().ranked())?)
  }

  // ── Views ─────────────────────────────────────────────────────────────────

  async fn author_detail(&self, auth_id: i32) -> Result<Option<AuthorDetail>> {
    Ok(self.archive.read(|s| compose::author_detail(s, auth_id))?)
  }

  async fn article_text(&self, art_id: i32) -> Result<Option<ArticleText>> {
    Ok(self.archive.read(|s| compose::article_text(s, art_id))?)
  }

  async fn references(&self, art_id: i32, key: i32) -> Result<References> {
    Ok(self.archive.read(|s| compose::references(s, art_id, key))?)
  }

  async fn combined_references(&self, art_id: i32) -> Result<Option<CombinedReferences>> {
    Ok(self.archive.read(|s| compose::combined_references(s, art_id))?)
  }

  async fn enriched_paragraph(
    &self,
    art_id: i32,
    apara_id: i32,
  ) -> Result<Option<EnrichedParagraph>> {
    Ok(self.archive.read(|s| compose::enriched_paragraph(s, art_id, apara_id))?)
  }

  async fn enriched_article(&self, art_id: i32) -> Result<Option<EnrichedArticle>> {
    Ok(self.archive.read(|s| compose::enriched_article(s, art_id))?)
  }

  async fn enriched_image(&self, img_id: i32) -> Result<Option<EnrichedImage>> {
    Ok(self.archive.read(|s| compose::enriched_image(s, img_id))?)
  }

  async fn enriched_video(&self, vid_id: i32) -> Result<Option<EnrichedVideo>> {
    Ok(self.archive.read(|s| compose::enriched_video(s, vid_id))?)
  }

  async fn latest_headlines(&self, limit: usize) -> Result<Vec<Headline>> {
    Ok(self.archive.read(|s| compose::latest_headlines(s, limit))?)
  }

  async fn search<'a>(&'a self, query: &'a SearchQuery) -> Result<Vec<SearchHit>> {
    Ok(self.archive.read(|s| compose::search(s, query.field, &query.text, query.limit))?)
  }

  async fn autocomplete<'a>(&'a self, query: &'a SearchQuery) -> Result<Vec<Suggestion>> {
    Ok(
      self
        .archive
        .read(|s| compose::autocomplete(s, query.field, &query.text, query.limit))?,
    )
  }
}
