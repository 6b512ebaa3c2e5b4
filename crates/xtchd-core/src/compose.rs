//! View composition. Every function reads one [`ArchiveState`] snapshot and
//! holds no state of its own; obtain the snapshot through
//! [`crate::archive::Archive::read`].
//!
//! Joins are index lookups with empty defaults, so a missing paragraph list
//! or reference bucket comes back as `[]` rather than being absent.

use crate::{
  archive::{ArchiveState, Ledgered},
  entity::Edge,
  fulltext::TextField,
  ledger::Ledger,
  views::{
    ArticleText, AuthorDetail, CombinedReferences, EnrichedArticle, EnrichedImage,
    EnrichedParagraph, EnrichedVideo, Headline, InboundRef, NameId, OutboundRef,
    References, SearchHit, Suggestion,
  },
  xref::WHOLE_ARTICLE,
};

/// Headline count when the caller does not pick one.
pub const DEFAULT_HEADLINES: usize = 12;

/// Autocomplete candidates when the caller does not pick a limit.
pub const DEFAULT_SUGGESTIONS: usize = 10;

pub fn author_detail(state: &ArchiveState, auth_id: i32) -> Option<AuthorDetail> {
  let author = state.authors.get(auth_id)?.clone();
  let articles = state
    .articles_by_author
    .get(&auth_id)
    .into_iter()
    .flatten()
    .filter_map(|&art_id| state.articles.get(art_id))
    .map(|article| NameId { id: article.id(), name: article.content.title.clone() })
    .collect();
  Some(AuthorDetail { author, articles })
}

pub fn article_text(state: &ArchiveState, art_id: i32) -> Option<ArticleText> {
  let article = state.articles.get(art_id)?.clone();
  let author = state.authors.get(article.content.auth_id)?.clone();
  let paragraphs = paragraph_ids(state, art_id)
    .iter()
    .filter_map(|&id| state.paragraphs.get(id).cloned())
    .collect();
  Some(ArticleText { article, author, paragraphs })
}

fn paragraph_ids(state: &ArchiveState, art_id: i32) -> &[i32] {
  state.paras_by_article.get(&art_id).map(Vec::as_slice).unwrap_or(&[])
}

// ─── References ──────────────────────────────────────────────────────────────

fn outbound<E: Ledgered>(
  ledger: &Ledger<E>,
  ids: &[i32],
  title: impl Fn(&E) -> Option<String>,
) -> Vec<OutboundRef<E>> {
  ids
    .iter()
    .filter_map(|&id| ledger.get(id))
    .map(|edge| OutboundRef {
      title:     title(&edge.content).unwrap_or_default(),
      reference: edge.clone(),
    })
    .collect()
}

fn inbound<E: Ledgered + Edge>(
  state: &ArchiveState,
  ledger: &Ledger<E>,
  ids: &[i32],
) -> Vec<InboundRef<E>> {
  ids
    .iter()
    .filter_map(|&id| ledger.get(id))
    .filter_map(|edge| {
      let from = edge.content.source();
      let source = state.articles.get(from.art_id)?;
      Some(InboundRef {
        from_art_id:   from.art_id,
        from_apara_id: from.apara_id,
        title:         source.content.title.clone(),
        comment:       from.comment.clone(),
        reference:     edge.clone(),
      })
    })
    .collect()
}

/// Outbound references of `art_id` under `key`: a paragraph id, or
/// [`WHOLE_ARTICLE`] for references anchored to the article itself.
pub fn references(state: &ArchiveState, art_id: i32, key: i32) -> References {
  References {
    articles: outbound(&state.art_refs, state.art_xref.outbound(art_id, key), |e| {
      state.articles.get(e.refs_art).map(|a| a.content.title.clone())
    }),
    videos:   outbound(&state.vid_refs, state.vid_xref.outbound(art_id, key), |e| {
      state.videos.get(e.vid_id).map(|v| v.content.title.clone())
    }),
    images:   outbound(&state.img_refs, state.img_xref.outbound(art_id, key), |e| {
      state.images.get(e.img_id).map(|i| i.content.pair.alt.clone())
    }),
  }
}

/// References for every paragraph of `art_id` plus [`WHOLE_ARTICLE`].
pub fn combined_references(state: &ArchiveState, art_id: i32) -> Option<CombinedReferences> {
  state.articles.get(art_id)?;
  let keys = std::iter::once(WHOLE_ARTICLE).chain(paragraph_ids(state, art_id).iter().copied());
  Some(keys.map(|key| (key, references(state, art_id, key))).collect())
}

// ─── Enriched views ──────────────────────────────────────────────────────────

/// `None` unless `apara_id` exists and belongs to `art_id`.
pub fn enriched_paragraph(
  state: &ArchiveState,
  art_id: i32,
  apara_id: i32,
) -> Option<EnrichedParagraph> {
  let paragraph = state.paragraphs.get(apara_id)?;
  if paragraph.content.art_id != art_id {
    return None;
  }
  Some(EnrichedParagraph {
    paragraph: paragraph.clone(),
    refs:      references(state, art_id, apara_id),
    topics:    state.topics.for_paragraph(apara_id),
  })
}

pub fn enriched_article(state: &ArchiveState, art_id: i32) -> Option<EnrichedArticle> {
  let article = state.articles.get(art_id)?.clone();
  let author = state.authors.get(article.content.auth_id)?.clone();
  let paragraphs = paragraph_ids(state, art_id)
    .iter()
    .filter_map(|&apara_id| enriched_paragraph(state, art_id, apara_id))
    .collect();

  Some(EnrichedArticle {
    author,
    cover: state.covers.get(&art_id).cloned(),
    paragraphs,
    refs: references(state, art_id, WHOLE_ARTICLE),
    inbound: inbound(state, &state.art_refs, state.art_xref.inbound(art_id)),
    article,
  })
}

pub fn enriched_image(state: &ArchiveState, img_id: i32) -> Option<EnrichedImage> {
  Some(EnrichedImage {
    image:   state.images.get(img_id)?.clone(),
    inbound: inbound(state, &state.img_refs, state.img_xref.inbound(img_id)),
  })
}

pub fn enriched_video(state: &ArchiveState, vid_id: i32) -> Option<EnrichedVideo> {
  let video = state.videos.get(vid_id)?.clone();
  let channel = state.channels.get(video.content.chan_id)?.clone();
  Some(EnrichedVideo {
    channel,
    video,
    inbound: inbound(state, &state.vid_refs, state.vid_xref.inbound(vid_id)),
  })
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// The newest `limit` articles, newest first.
pub fn latest_headlines(state: &ArchiveState, limit: usize) -> Vec<Headline> {
  state
    .articles
    .iter()
    .rev()
    .filter_map(|article| {
      let author = state.authors.get(article.content.auth_id)?;
      Some(Headline {
        art_id:      article.id(),
        title:       article.content.title.clone(),
        auth_id:     author.id(),
        author_name: author.content.name.clone(),
        cover_thmb:  state.covers.get(&article.id()).map(|c| c.pair.src_thmb.clone()),
      })
    })
    .take(limit)
    .collect()
}

/// Ranked full-text hits on `field`. Hits whose row is gone are dropped.
pub fn search(
  state: &ArchiveState,
  field: TextField,
  query: &str,
  limit: Option<usize>,
) -> Vec<SearchHit> {
  state
    .text
    .search(field, query)
    .into_iter()
    .filter_map(|(id, score)| {
      label(state, field, id).map(|label| SearchHit { field, id, score, label })
    })
    .take(limit.unwrap_or(usize::MAX))
    .collect()
}

/// Completions of `query` on `field`, shortest label first, ties by id.
pub fn autocomplete(
  state: &ArchiveState,
  field: TextField,
  query: &str,
  limit: Option<usize>,
) -> Vec<Suggestion> {
  let mut suggestions: Vec<Suggestion> = state
    .text
    .complete(field, query)
    .into_iter()
    .filter_map(|id| label(state, field, id).map(|label| Suggestion { field, id, label }))
    .collect();
  suggestions.sort_by(|a, b| {
    a.label.chars().count().cmp(&b.label.chars().count()).then(a.id.cmp(&b.id))
  });
  suggestions.truncate(limit.unwrap_or(DEFAULT_SUGGESTIONS));
  suggestions
}

fn label(state: &ArchiveState, field: TextField, id: i32) -> Option<String> {
  match field {
    TextField::AuthorName => state.authors.get(id).map(|r| r.content.name.clone()),
    TextField::ArticleTitle => state.articles.get(id).map(|r| r.content.title.clone()),
    TextField::ParagraphText => state.paragraphs.get(id).map(|r| r.content.md.clone()),
    TextField::ImageAlt => state.images.get(id).map(|r| r.content.pair.alt.clone()),
    TextField::ChannelName => state.channels.get(id).map(|r| r.content.name.clone()),
    TextField::VideoTitle => state.videos.get(id).map(|r| r.content.title.clone()),
    TextField::ArticleRefComment => state.art_refs.get(id).map(|r| r.content.from.comment.clone()),
    TextField::VideoRefComment => state.vid_refs.get(id).map(|r| r.content.from.comment.clone()),
    TextField::ImageRefComment => state.img_refs.get(id).map(|r| r.content.from.comment.clone()),
  }
}
