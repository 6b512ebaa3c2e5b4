//! Integration tests for `SqliteStore` against in-memory and temp-file
//! databases.

use std::path::PathBuf;

use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;
use xtchd_core::{
  Error as CoreError,
  chain::AppendRequest,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefVideo, Author, EntityKind, ImagePair,
    RefFrom,
  },
  fulltext::TextField,
  ledger::{ChainReport, Violation, ViolationKind},
  store::{SearchQuery, XtchdStore},
  topic::TopicMention,
  xref::WHOLE_ARTICLE,
};

use crate::{Error, SqliteStore, store::ensure_valid};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A fresh database path under the system temp dir.
fn temp_db() -> PathBuf {
  std::env::temp_dir().join(format!("xtchd-test-{}.sqlite", Uuid::new_v4()))
}

fn core_err(err: &Error) -> &CoreError { err.core().expect("core error") }

fn pair(alt: &str) -> ImagePair {
  ImagePair {
    src_full: "data:image/png;base64,iVBORw0KGgo=".into(),
    src_thmb: "data:image/png;base64,iVBO".into(),
    alt:      alt.into(),
    url:      Some("https://example.com/shot".into()),
    archive:  Some("AbC12".into()),
  }
}

fn see_also(art_id: i32, apara_id: Option<i32>) -> RefFrom {
  RefFrom { art_id, apara_id, comment: "see also".into() }
}

/// Author 0; articles A (0) and B (1); paragraph 0 of A refers to B.
async fn seeded(s: &SqliteStore) {
  s.add_author("Xtchd Admins".into()).await.unwrap();
  s.add_article(0, "A".into()).await.unwrap();
  s.add_article(0, "B".into()).await.unwrap();
  s.add_paragraph(0, "Opening paragraph of A.".into()).await.unwrap();
  s.add_article_ref_article(see_also(0, Some(0)), 1, None).await.unwrap();
}

// ─── Appends ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_row_links_to_the_zero_hash() {
  let s = store().await;
  let author = s.add_author("Jane Roe".into()).await.unwrap();

  assert_eq!(author.id(), 0);
  assert_eq!(author.prior_id, None);
  assert_eq!(author.prior_sha256, "0".repeat(64));
  assert!(author.verify_hash());
}

#[tokio::test]
async fn rows_chain_in_sequence() {
  let s = store().await;
  let a = s.add_author("a".into()).await.unwrap();
  let b = s.add_author("b".into()).await.unwrap();

  assert_eq!(b.prior_id, Some(0));
  assert_eq!(b.prior_sha256, a.new_sha256);
  assert_eq!(s.tail::<Author>().await.unwrap(), Some(b.clone()));
  assert_eq!(s.head::<Author>().await.unwrap().prior_sha256, b.new_sha256);
}

#[tokio::test]
async fn client_sealed_append_is_accepted() {
  let s = store().await;
  let head = s.head::<Author>().await.unwrap();
  let req = AppendRequest::on_head(Author { auth_id: head.next_id, name: "c".into() }, &head);
  let claimed = req.new_sha256.clone();

  let row = s.append(req).await.unwrap();
  assert_eq!(row.new_sha256, claimed);
  assert_eq!(s.get::<Author>(0).await.unwrap(), Some(row));
}

#[tokio::test]
async fn stale_timestamp_is_rejected_and_tail_unchanged() {
  let s = store().await;
  let first = s.add_author("a".into()).await.unwrap();

  let req = AppendRequest::seal(
    Author { auth_id: 1, name: "b".into() },
    first.new_sha256.clone(),
    Utc::now() - Duration::seconds(2),
  );
  let err = s.append(req).await.unwrap_err();

  assert!(matches!(core_err(&err), CoreError::FreshnessViolation { .. }));
  assert!(core_err(&err).is_retryable());
  assert_eq!(s.tail::<Author>().await.unwrap(), Some(first));
}

#[tokio::test]
async fn forged_hash_is_rejected() {
  let s = store().await;
  let head = s.head::<Author>().await.unwrap();
  let mut req = AppendRequest::on_head(Author { auth_id: 0, name: "a".into() }, &head);
  req.new_sha256 = "f".repeat(64);

  let err = s.append(req).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::IntegrityViolation { .. }));
  assert!(s.tail::<Author>().await.unwrap().is_none());
}

#[tokio::test]
async fn referential_and_uniqueness_rules_apply() {
  let s = store().await;
  let err = s.add_article(0, "orphan".into()).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::ReferentialViolation(_)));

  s.add_author("a".into()).await.unwrap();
  s.add_article(0, "Title".into()).await.unwrap();
  let err = s.add_article(0, "Title".into()).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::UniquenessViolation(_)));
  assert_eq!(s.head::<Article>().await.unwrap().next_id, 1);
}

#[tokio::test]
async fn blank_reference_comments_are_rejected() {
  let s = store().await;
  seeded(&s).await;
  let blank = RefFrom { art_id: 1, apara_id: None, comment: "  ".into() };
  let err = s.add_article_ref_article(blank, 0, None).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::InvalidContent(_)));
  assert_eq!(s.head::<ArticleRefArticle>().await.unwrap().next_id, 1);
}

#[tokio::test]
async fn channel_urls_are_lowercased() {
  let s = store().await;
  let chan = s
    .add_youtube_channel("c/NewsRoom".into(), "News Room".into())
    .await
    .unwrap();
  assert_eq!(chan.content.url, "c/newsroom");

  let err = s
    .add_youtube_channel("C/NEWSROOM".into(), "Copy".into())
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), CoreError::UniquenessViolation(_)));
}

#[tokio::test]
async fn parallel_appends_to_one_kind_stay_sequential() {
  let s = store().await;
  let mut tasks = Vec::new();
  for i in 0..8 {
    let s = s.clone();
    tasks.push(tokio::spawn(async move { s.add_author(format!("author {i}")).await }));
  }
  for task in tasks {
    task.await.unwrap().unwrap();
  }

  let reports = s.verify().await.unwrap();
  assert!(reports.iter().all(|r| r.is_valid()));
  assert_eq!(reports[EntityKind::Author.index()].rows, 8);
}

// ─── Views ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn see_also_is_visible_from_both_articles() {
  let s = store().await;
  seeded(&s).await;

  let a = s.enriched_article(0).await.unwrap().unwrap();
  assert_eq!(a.paragraphs[0].refs.articles[0].title, "B");
  assert!(a.inbound.is_empty());

  let b = s.enriched_article(1).await.unwrap().unwrap();
  assert_eq!(b.inbound.len(), 1);
  assert_eq!(b.inbound[0].from_art_id, 0);
  assert_eq!(b.inbound[0].from_apara_id, Some(0));
  assert_eq!(b.inbound[0].title, "A");
  assert_eq!(b.inbound[0].comment, "see also");
  assert!(b.paragraphs.is_empty());
  assert!(b.refs.is_empty());
}

#[tokio::test]
async fn whole_article_references_use_the_sentinel() {
  let s = store().await;
  seeded(&s).await;
  s.add_image(pair("evidence")).await.unwrap();
  s.add_article_ref_image(see_also(0, None), 0).await.unwrap();

  let whole = s.references(0, WHOLE_ARTICLE).await.unwrap();
  assert_eq!(whole.images.len(), 1);
  assert_eq!(whole.images[0].title, "evidence");
  assert!(whole.articles.is_empty());

  let combined = s.combined_references(0).await.unwrap().unwrap();
  assert_eq!(combined.keys().copied().collect::<Vec<_>>(), vec![WHOLE_ARTICLE, 0]);

  let image = s.enriched_image(0).await.unwrap().unwrap();
  assert_eq!(image.inbound[0].from_apara_id, None);
}

#[tokio::test]
async fn video_views_join_their_channel() {
  let s = store().await;
  seeded(&s).await;
  s.add_youtube_channel("c/council".into(), "Council".into()).await.unwrap();
  s.add_youtube_video(
    0,
    "dQw4w9WgXcQ".into(),
    "Budget hearing".into(),
    NaiveDate::from_ymd_opt(2023, 3, 14).unwrap(),
  )
  .await
  .unwrap();
  let err = s
    .add_article_ref_video(see_also(0, Some(0)), "missing".into(), None)
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), CoreError::ReferentialViolation(_)));
  let vref = s
    .add_article_ref_video(see_also(0, Some(0)), "dQw4w9WgXcQ".into(), Some(95))
    .await
    .unwrap();
  assert_eq!(vref.content.vid_id, 0);
  assert_eq!(s.tail::<ArticleRefVideo>().await.unwrap(), Some(vref));

  let video = s.enriched_video(0).await.unwrap().unwrap();
  assert_eq!(video.channel.content.name, "Council");
  assert_eq!(video.inbound[0].reference.content.sec_req, Some(95));

  let para = s.enriched_paragraph(0, 0).await.unwrap().unwrap();
  assert_eq!(para.refs.videos[0].title, "Budget hearing");
}

#[tokio::test]
async fn topics_and_covers() {
  let s = store().await;
  seeded(&s).await;

  let mention = TopicMention { apara_id: 0, topic_key: "zoning".into() };
  assert_eq!(s.record_topic_mention(mention.clone()).await.unwrap().mentions, 1);
  let err = s.record_topic_mention(mention).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::UniquenessViolation(_)));
  let err = s
    .record_topic_mention(TopicMention { apara_id: 9, topic_key: "zoning".into() })
    .await
    .unwrap_err();
  assert!(matches!(core_err(&err), CoreError::ReferentialViolation(_)));

  let first = s.set_article_cover(0, pair("first")).await.unwrap();
  let second = s.set_article_cover(0, pair("second")).await.unwrap();
  assert_ne!(first.id, second.id);
  assert_eq!(s.article_cover(0).await.unwrap(), Some(second));
  assert!(s.set_article_cover(7, pair("none")).await.is_err());

  let headlines = s.latest_headlines(12).await.unwrap();
  assert_eq!(headlines[0].art_id, 1);
  assert!(headlines[1].cover_thmb.is_some());
  assert_eq!(s.topics().await.unwrap()[0].key, "zoning");
}

#[tokio::test]
async fn search_finds_paragraph_text() {
  let s = store().await;
  seeded(&s).await;
  let query = SearchQuery {
    field: TextField::ParagraphText,
    text:  "opening".into(),
    limit: None,
  };
  let hits = s.search(&query).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, 0);
}

#[tokio::test]
async fn autocomplete_matches_the_last_word_as_a_prefix() {
  let s = store().await;
  seeded(&s).await;
  s.add_article(0, "Budget vote delayed".into()).await.unwrap();
  s.add_article(0, "Budget".into()).await.unwrap();

  let query = SearchQuery {
    field: TextField::ArticleTitle,
    text:  "BUD".into(),
    limit: None,
  };
  let labels: Vec<String> =
    s.autocomplete(&query).await.unwrap().into_iter().map(|h| h.label).collect();
  assert_eq!(labels, vec!["Budget", "Budget vote delayed"]);

  let query = SearchQuery { text: "budget v".into(), limit: Some(5), ..query };
  let hits = s.autocomplete(&query).await.unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].id, 2);
}

// ─── Tail removal ────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_unreferenced_tails_can_be_removed() {
  let s = store().await;
  seeded(&s).await;

  // Not the tail.
  let err = s.remove_tail::<Article>(0).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::ReferentialViolation(_)));
  // The tail, but referenced by the see-also edge.
  let err = s.remove_tail::<Article>(1).await.unwrap_err();
  assert!(matches!(core_err(&err), CoreError::ReferentialViolation(_)));

  s.add_paragraph(1, "retracted".into()).await.unwrap();
  let removed = s.remove_tail::<ArticlePara>(1).await.unwrap();
  assert_eq!(removed.content.md, "retracted");
  assert_eq!(s.head::<ArticlePara>().await.unwrap().next_id, 1);

  // The next append reuses the id and links to the surviving tail.
  let again = s.add_paragraph(1, "replacement".into()).await.unwrap();
  assert_eq!(again.id(), 1);
  assert!(s.verify().await.unwrap().iter().all(|r| r.is_valid()));
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn reopen_restores_identical_views() {
  let path = temp_db();
  let before = {
    let s = SqliteStore::open(&path).await.unwrap();
    seeded(&s).await;
    s.set_article_cover(1, pair("cover")).await.unwrap();
    s.record_topic_mention(TopicMention { apara_id: 0, topic_key: "budget".into() })
      .await
      .unwrap();
    (s.enriched_article(0).await.unwrap(), s.enriched_article(1).await.unwrap())
  };

  let s = SqliteStore::open(&path).await.unwrap();
  let after = (s.enriched_article(0).await.unwrap(), s.enriched_article(1).await.unwrap());
  assert_eq!(before, after);

  // Appends continue the restored chain.
  let next = s.add_author("late".into()).await.unwrap();
  assert_eq!(next.id(), 1);

  let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn tampered_row_refuses_to_open() {
  let path = temp_db();
  {
    let s = SqliteStore::open(&path).await.unwrap();
    seeded(&s).await;
  }

  let conn = rusqlite::Connection::open(&path).unwrap();
  conn
    .execute("UPDATE articles SET title = 'Rewritten' WHERE art_id = 1", [])
    .unwrap();
  drop(conn);

  let err = match SqliteStore::open(&path).await {
    Ok(_) => panic!("tampered archive opened"),
    Err(err) => err,
  };
  assert!(matches!(
    core_err(&err),
    CoreError::ChainBroken { kind: EntityKind::Article, id: 1, .. }
  ));

  let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn tampered_prior_id_refuses_to_open() {
  let path = temp_db();
  {
    let s = SqliteStore::open(&path).await.unwrap();
    seeded(&s).await;
  }

  let conn = rusqlite::Connection::open(&path).unwrap();
  conn
    .execute("UPDATE articles SET prior_id = 42 WHERE art_id = 1", [])
    .unwrap();
  drop(conn);

  let err = match SqliteStore::open(&path).await {
    Ok(_) => panic!("archive with a rewritten prior_id opened"),
    Err(err) => err,
  };
  assert!(matches!(
    core_err(&err),
    CoreError::ChainBroken { kind: EntityKind::Article, id: 1, .. }
  ));

  let _ = std::fs::remove_file(&path);
}

#[test]
fn any_violation_fails_the_open() {
  let clean = ChainReport { kind: EntityKind::Author, rows: 3, violations: vec![] };
  assert_eq!(ensure_valid(&[clean.clone()]).unwrap(), 3);

  let broken = ChainReport {
    kind:       EntityKind::Article,
    rows:       2,
    violations: vec![Violation {
      id:          1,
      kind:        ViolationKind::HashMismatch,
      description: "stored hash differs".into(),
    }],
  };
  let err = ensure_valid(&[clean, broken]).unwrap_err();
  assert!(matches!(
    core_err(&err),
    CoreError::ChainBroken { kind: EntityKind::Article, id: 1, .. }
  ));
}

#[tokio::test]
async fn rows_the_archive_never_saw_surface_on_reopen() {
  let path = temp_db();
  let writer = SqliteStore::open(&path).await.unwrap();
  writer.add_author("first".into()).await.unwrap();

  // A second handle whose archive misses the next row, as after a dropped
  // append.
  let stale = SqliteStore::open(&path).await.unwrap();
  writer.add_author("second".into()).await.unwrap();

  let err = stale.add_author("third".into()).await.unwrap_err();
  assert!(matches!(err, Error::Database(_)));
  assert_eq!(stale.head::<Author>().await.unwrap().next_id, 1);
  drop((writer, stale));

  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.tail::<Author>().await.unwrap().unwrap().content.name, "second");

  let _ = std::fs::remove_file(&path);
}
