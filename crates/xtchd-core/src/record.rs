//! A committed row of any kind, for code that handles every chain uniformly
//! (persistence, replay, audit output).

use serde::Serialize;

use crate::{
  chain::Chained,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, EntityKind, Image, YoutubeChannel, YoutubeVideo,
  },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dtype", content = "row", rename_all = "snake_case")]
pub enum Record {
  Author(Chained<Author>),
  Article(Chained<Article>),
  ArticlePara(Chained<ArticlePara>),
  Image(Chained<Image>),
  YoutubeChannel(Chained<YoutubeChannel>),
  YoutubeVideo(Chained<YoutubeVideo>),
  ArticleRefArticle(Chained<ArticleRefArticle>),
  ArticleRefVideo(Chained<ArticleRefVideo>),
  ArticleRefImage(Chained<ArticleRefImage>),
}

impl Record {
  pub fn kind(&self) -> EntityKind {
    match self {
      Self::Author(_) => EntityKind::Author,
      Self::Article(_) => EntityKind::Article,
      Self::ArticlePara(_) => EntityKind::ArticlePara,
      Self::Image(_) => EntityKind::Image,
      Self::YoutubeChannel(_) => EntityKind::YoutubeChannel,
      Self::YoutubeVideo(_) => EntityKind::YoutubeVideo,
      Self::ArticleRefArticle(_) => EntityKind::ArticleRefArticle,
      Self::ArticleRefVideo(_) => EntityKind::ArticleRefVideo,
      Self::ArticleRefImage(_) => EntityKind::ArticleRefImage,
    }
  }

  pub fn id(&self) -> i32 {
    match self {
      Self::Author(r) => r.id(),
      Self::Article(r) => r.id(),
      Self::ArticlePara(r) => r.id(),
      Self::Image(r) => r.id(),
      Self::YoutubeChannel(r) => r.id(),
      Self::YoutubeVideo(r) => r.id(),
      Self::ArticleRefArticle(r) => r.id(),
      Self::ArticleRefVideo(r) => r.id(),
      Self::ArticleRefImage(r) => r.id(),
    }
  }

  pub fn new_sha256(&self) -> &str {
    match self {
      Self::Author(r) => &r.new_sha256,
      Self::Article(r) => &r.new_sha256,
      Self::ArticlePara(r) => &r.new_sha256,
      Self::Image(r) => &r.new_sha256,
      Self::YoutubeChannel(r) => &r.new_sha256,
      Self::YoutubeVideo(r) => &r.new_sha256,
      Self::ArticleRefArticle(r) => &r.new_sha256,
      Self::ArticleRefVideo(r) => &r.new_sha256,
      Self::ArticleRefImage(r) => &r.new_sha256,
    }
  }
}
