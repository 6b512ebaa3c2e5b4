//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Write timestamps are stored as RFC 3339 strings with full precision, upload
//! dates as `YYYY-MM-DD`, UUIDs as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;
use xtchd_core::{
  chain::Chained,
  entity::ImagePair,
  sidecar::CoverImage,
};

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

// ─── Row types ───────────────────────────────────────────────────────────────

/// The envelope columns shared by every chained table, as stored.
pub struct RawEnvelope {
  pub prior_id:        Option<i32>,
  pub prior_sha256:    String,
  pub write_timestamp: String,
  pub new_sha256:      String,
}

impl RawEnvelope {
  pub fn into_chained<T>(self, content: T) -> Result<Chained<T>> {
    Ok(Chained {
      prior_id: self.prior_id,
      content,
      prior_sha256: self.prior_sha256,
      write_timestamp: decode_dt(&self.write_timestamp)?,
      new_sha256: self.new_sha256,
    })
  }
}

/// Raw strings read directly from an `article_covers` row.
pub struct RawCover {
  pub art_id:   i32,
  pub cover_id: String,
  pub src_full: String,
  pub src_thmb: String,
  pub alt:      String,
  pub url:      Option<String>,
  pub archive:  Option<String>,
}

impl RawCover {
  pub fn into_cover(self) -> Result<CoverImage> {
    Ok(CoverImage {
      id:     decode_uuid(&self.cover_id)?,
      art_id: self.art_id,
      pair:   ImagePair {
        src_full: self.src_full,
        src_thmb: self.src_thmb,
        alt:      self.alt,
        url:      self.url,
        archive:  self.archive,
      },
    })
  }
}
