//! Column mapping between each chained type and its table.

use chrono::NaiveDate;
use rusqlite::{Connection, Row, params_from_iter, types::Value};
use xtchd_core::{
  archive::Ledgered,
  chain::Chained,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, EntityKind, Image, ImagePair, RefFrom, YoutubeChannel, YoutubeVideo,
  },
  record::Record,
};

use crate::encode::{DATE_FORMAT, RawEnvelope, encode_date, encode_dt};

const ENVELOPE: [&str; 4] = ["prior_id", "prior_sha256", "write_timestamp", "new_sha256"];

pub trait Table: Ledgered {
  const TABLE: &'static str;
  /// Content columns, id first.
  const COLUMNS: &'static [&'static str];

  /// Values for [`Table::COLUMNS`], in order.
  fn values(&self) -> Vec<Value>;

  /// Read the content columns starting at index 0.
  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

// ─── Generic statements ──────────────────────────────────────────────────────

fn columns<T: Table>() -> String {
  T::COLUMNS.iter().chain(ENVELOPE.iter()).copied().collect::<Vec<_>>().join(", ")
}

pub fn insert<T: Table>(conn: &Connection, row: &Chained<T>) -> rusqlite::Result<()> {
  let count = T::COLUMNS.len() + ENVELOPE.len();
  let placeholders = (1..=count).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
  let sql = format!("INSERT INTO {} ({}) VALUES ({placeholders})", T::TABLE, columns::<T>());

  let mut values = row.content.values();
  values.extend([
    Value::from(row.prior_id),
    Value::from(row.prior_sha256.clone()),
    Value::from(encode_dt(row.write_timestamp)),
    Value::from(row.new_sha256.clone()),
  ]);
  conn.execute(&sql, params_from_iter(values))?;
  Ok(())
}

/// Every row of `T`'s table in id order, envelope still undecoded.
pub fn select_all<T: Table>(conn: &Connection) -> rusqlite::Result<Vec<(T, RawEnvelope)>> {
  let sql = format!(
    "SELECT {} FROM {} ORDER BY {}",
    columns::<T>(),
    T::TABLE,
    T::COLUMNS[0]
  );
  let n = T::COLUMNS.len();
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map([], |row| {
      Ok((T::from_row(row)?, RawEnvelope {
        prior_id:        row.get(n)?,
        prior_sha256:    row.get(n + 1)?,
        write_timestamp: row.get(n + 2)?,
        new_sha256:      row.get(n + 3)?,
      }))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

pub fn insert_record(conn: &Connection, record: &Record) -> rusqlite::Result<()> {
  match record {
    Record::Author(row) => insert(conn, row),
    Record::Article(row) => insert(conn, row),
    Record::ArticlePara(row) => insert(conn, row),
    Record::Image(row) => insert(conn, row),
    Record::YoutubeChannel(row) => insert(conn, row),
    Record::YoutubeVideo(row) => insert(conn, row),
    Record::ArticleRefArticle(row) => insert(conn, row),
    Record::ArticleRefVideo(row) => insert(conn, row),
    Record::ArticleRefImage(row) => insert(conn, row),
  }
}

/// `(table, id column)` for `kind`.
pub fn table_of(kind: EntityKind) -> (&'static str, &'static str) {
  fn of<T: Table>() -> (&'static str, &'static str) { (T::TABLE, T::COLUMNS[0]) }
  match kind {
    EntityKind::Author => of::<Author>(),
    EntityKind::Article => of::<Article>(),
    EntityKind::ArticlePara => of::<ArticlePara>(),
    EntityKind::Image => of::<Image>(),
    EntityKind::YoutubeChannel => of::<YoutubeChannel>(),
    EntityKind::YoutubeVideo => of::<YoutubeVideo>(),
    EntityKind::ArticleRefArticle => of::<ArticleRefArticle>(),
    EntityKind::ArticleRefVideo => of::<ArticleRefVideo>(),
    EntityKind::ArticleRefImage => of::<ArticleRefImage>(),
  }
}

// ─── Per-type mappings ───────────────────────────────────────────────────────

impl Table for Author {
  const TABLE: &'static str = "authors";
  const COLUMNS: &'static [&'static str] = &["auth_id", "name"];

  fn values(&self) -> Vec<Value> {
    vec![self.auth_id.into(), self.name.clone().into()]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { auth_id: row.get(0)?, name: row.get(1)? })
  }
}

impl Table for Article {
  const TABLE: &'static str = "articles";
  const COLUMNS: &'static [&'static str] = &["art_id", "auth_id", "title"];

  fn values(&self) -> Vec<Value> {
    vec![self.art_id.into(), self.auth_id.into(), self.title.clone().into()]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { art_id: row.get(0)?, auth_id: row.get(1)?, title: row.get(2)? })
  }
}

impl Table for ArticlePara {
  const TABLE: &'static str = "article_paras";
  const COLUMNS: &'static [&'static str] = &["apara_id", "art_id", "md"];

  fn values(&self) -> Vec<Value> {
    vec![self.apara_id.into(), self.art_id.into(), self.md.clone().into()]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { apara_id: row.get(0)?, art_id: row.get(1)?, md: row.get(2)? })
  }
}

impl Table for Image {
  const TABLE: &'static str = "images";
  const COLUMNS: &'static [&'static str] =
    &["img_id", "src_full", "src_thmb", "alt", "url", "archive"];

  fn values(&self) -> Vec<Value> {
    let pair = &self.pair;
    vec![
      self.img_id.into(),
      pair.src_full.clone().into(),
      pair.src_thmb.clone().into(),
      pair.alt.clone().into(),
      pair.url.clone().into(),
      pair.archive.clone().into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      img_id: row.get(0)?,
      pair:   ImagePair {
        src_full: row.get(1)?,
        src_thmb: row.get(2)?,
        alt:      row.get(3)?,
        url:      row.get(4)?,
        archive:  row.get(5)?,
      },
    })
  }
}

impl Table for YoutubeChannel {
  const TABLE: &'static str = "youtube_channels";
  const COLUMNS: &'static [&'static str] = &["chan_id", "url", "name"];

  fn values(&self) -> Vec<Value> {
    vec![self.chan_id.into(), self.url.clone().into(), self.name.clone().into()]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { chan_id: row.get(0)?, url: row.get(1)?, name: row.get(2)? })
  }
}

impl Table for YoutubeVideo {
  const TABLE: &'static str = "youtube_videos";
  const COLUMNS: &'static [&'static str] =
    &["vid_id", "chan_id", "vid_pk", "title", "date_uploaded"];

  fn values(&self) -> Vec<Value> {
    vec![
      self.vid_id.into(),
      self.chan_id.into(),
      self.vid_pk.clone().into(),
      self.title.clone().into(),
      encode_date(self.date_uploaded).into(),
    ]
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let date: String = row.get(4)?;
    let date_uploaded = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| {
      rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Self {
      vid_id: row.get(0)?,
      chan_id: row.get(1)?,
      vid_pk: row.get(2)?,
      title: row.get(3)?,
      date_uploaded,
    })
  }
}

fn ref_from_values(from: &RefFrom) -> [Value; 3] {
  [from.art_id.into(), from.apara_id.into(), from.comment.clone().into()]
}

/// Columns 1..=3 of every edge table: source article, anchor, comment.
fn ref_from_row(row: &Row<'_>) -> rusqlite::Result<RefFrom> {
  Ok(RefFrom { art_id: row.get(1)?, apara_id: row.get(2)?, comment: row.get(3)? })
}

impl Table for ArticleRefArticle {
  const TABLE: &'static str = "article_ref_articles";
  const COLUMNS: &'static [&'static str] =
    &["aref_id", "from_art", "from_para", "comment", "refs_art", "refs_para"];

  fn values(&self) -> Vec<Value> {
    let mut values = vec![self.aref_id.into()];
    values.extend(ref_from_values(&self.from));
    values.extend([self.refs_art.into(), self.refs_para.into()]);
    values
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      aref_id:   row.get(0)?,
      from: ref_from_row(row)?,
      refs_art:  row.get(4)?,
      refs_para: row.get(5)?,
    })
  }
}

impl Table for ArticleRefVideo {
  const TABLE: &'static str = "article_ref_videos";
  const COLUMNS: &'static [&'static str] =
    &["vref_id", "art_id", "apara_id", "comment", "vid_id", "vid_pk", "sec_req"];

  fn values(&self) -> Vec<Value> {
    let mut values = vec![self.vref_id.into()];
    values.extend(ref_from_values(&self.from));
    values.extend([self.vid_id.into(), self.vid_pk.clone().into(), self.sec_req.into()]);
    values
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vref_id: row.get(0)?,
      from: ref_from_row(row)?,
      vid_id:  row.get(4)?,
      vid_pk:  row.get(5)?,
      sec_req: row.get(6)?,
    })
  }
}

impl Table for ArticleRefImage {
  const TABLE: &'static str = "article_ref_images";
  const COLUMNS: &'static [&'static str] =
    &["iref_id", "art_id", "apara_id", "comment", "img_id"];

  fn values(&self) -> Vec<Value> {
    let mut values = vec![self.iref_id.into()];
    values.extend(ref_from_values(&self.from));
    values.push(self.img_id.into());
    values
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { iref_id: row.get(0)?, from: ref_from_row(row)?, img_id: row.get(4)? })
  }
}
