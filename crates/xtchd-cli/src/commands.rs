//! Subcommands and their dispatch onto an [`XtchdStore`].

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use xtchd_core::{
  archive::Ledgered,
  compose::DEFAULT_HEADLINES,
  entity::{
    Article, ArticlePara, ArticleRefArticle, ArticleRefImage, ArticleRefVideo,
    Author, Image, ImagePair, RefFrom, YoutubeChannel, YoutubeVideo,
  },
  fulltext::TextField,
  store::{SearchQuery, XtchdStore},
  topic::TopicMention,
};

// ─── Arguments ────────────────────────────────────────────────────────────────

#[derive(Subcommand)]
pub enum Command {
  /// Re-verify every chain. Fails if any chain is broken.
  Verify,
  /// Show the next id and prior hash of one chain.
  Head { kind: Kind },
  /// Add an author.
  Author { name: String },
  /// Add an article.
  Article {
    #[arg(long)]
    author: i32,
    title:  String,
  },
  /// Add a paragraph to the end of an article.
  Paragraph {
    #[arg(long)]
    article: i32,
    /// Markdown text; read from `--file` when omitted.
    #[arg(required_unless_present = "file")]
    md:      Option<String>,
    #[arg(long, conflicts_with = "md")]
    file:    Option<PathBuf>,
  },
  /// Add an image from a full-size and a thumbnail file.
  Image(ImageArgs),
  /// Add a YouTube channel.
  Channel { url: String, name: String },
  /// Add a YouTube video to a channel.
  Video {
    #[arg(long)]
    channel:  i32,
    vid_pk:   String,
    title:    String,
    /// Upload date, `YYYY-MM-DD`.
    #[arg(long)]
    uploaded: NaiveDate,
  },
  /// Reference another article, optionally one of its paragraphs.
  RefArticle {
    #[command(flatten)]
    from:      FromArgs,
    refs_art:  i32,
    #[arg(long)]
    refs_para: Option<i32>,
  },
  /// Reference an archived video by its YouTube id, optionally at an offset
  /// in seconds.
  RefVideo {
    #[command(flatten)]
    from:   FromArgs,
    vid_pk: String,
    #[arg(long)]
    at:     Option<i16>,
  },
  /// Reference an image.
  RefImage {
    #[command(flatten)]
    from:   FromArgs,
    img_id: i32,
  },
  /// Set or replace the cover image of an article.
  Cover {
    art_id: i32,
    #[command(flatten)]
    image:  ImageArgs,
  },
  /// Record that a paragraph mentions a topic.
  Topic { apara_id: i32, key: String },
  /// List topics, most mentioned first.
  Topics,
  /// Print a composed view.
  Show {
    #[command(subcommand)]
    view: View,
  },
  /// Latest articles, newest first.
  Headlines {
    #[arg(long, default_value_t = DEFAULT_HEADLINES)]
    limit: usize,
  },
  /// Full-text search over one field. Every term must match.
  Search {
    field: TextField,
    #[arg(required = true, num_args = 1..)]
    terms: Vec<String>,
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Complete the last word of a partial query, shortest labels first.
  Complete {
    field: TextField,
    #[arg(required = true, num_args = 1..)]
    terms: Vec<String>,
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Remove the newest row of a chain if nothing references it.
  RemoveTail { kind: Kind, id: i32 },
}

#[derive(Subcommand)]
pub enum View {
  Author { id: i32 },
  /// Article with paragraphs, references, topics and inbound links.
  Article { id: i32 },
  /// Plain article text.
  Text { id: i32 },
  Paragraph { art_id: i32, apara_id: i32 },
  /// References keyed by paragraph id, `-1` for the whole article.
  Refs { id: i32 },
  Image { id: i32 },
  Video { id: i32 },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Kind {
  Author,
  Article,
  Paragraph,
  Image,
  Channel,
  Video,
  RefArticle,
  RefVideo,
  RefImage,
}

#[derive(Args)]
pub struct FromArgs {
  /// Referencing article.
  #[arg(long = "from")]
  art_id:   i32,
  /// Anchor paragraph; whole article when omitted.
  #[arg(long)]
  para:     Option<i32>,
  /// Why the reference exists. Must not be blank.
  #[arg(long)]
  comment:  String,
}

impl From<FromArgs> for RefFrom {
  fn from(args: FromArgs) -> Self {
    RefFrom { art_id: args.art_id, apara_id: args.para, comment: args.comment }
  }
}

#[derive(Args)]
pub struct ImageArgs {
  #[arg(long)]
  full:    PathBuf,
  #[arg(long)]
  thumb:   PathBuf,
  #[arg(long)]
  alt:     String,
  /// Page the image was taken from.
  #[arg(long)]
  url:     Option<String>,
  /// archive.is key of that page.
  #[arg(long)]
  archive: Option<String>,
}

impl ImageArgs {
  fn into_pair(self) -> anyhow::Result<ImagePair> {
    Ok(ImagePair {
      src_full: data_uri(&self.full)?,
      src_thmb: data_uri(&self.thumb)?,
      alt:      self.alt,
      url:      self.url,
      archive:  self.archive,
    })
  }
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

pub async fn run<S: XtchdStore>(store: &S, command: Command) -> anyhow::Result<()> {
  match command {
    Command::Verify => {
      let reports = store.verify().await?;
      print(&reports)?;
      let broken = reports.iter().filter(|r| !r.is_valid()).count();
      if broken > 0 {
        bail!("{broken} chain(s) failed verification");
      }
      Ok(())
    }
    Command::Head { kind } => print(&head(store, kind).await?),
    Command::Author { name } => print(&store.add_author(name).await?),
    Command::Article { author, title } => print(&store.add_article(author, title).await?),
    Command::Paragraph { article, md, file } => {
      let md = match (md, file) {
        (Some(md), _) => md,
        (None, Some(path)) => std::fs::read_to_string(&path)
          .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => bail!("either a paragraph or --file is required"),
      };
      print(&store.add_paragraph(article, md).await?)
    }
    Command::Image(args) => print(&store.add_image(args.into_pair()?).await?),
    Command::Channel { url, name } => print(&store.add_youtube_channel(url, name).await?),
    Command::Video { channel, vid_pk, title, uploaded } => {
      print(&store.add_youtube_video(channel, vid_pk, title, uploaded).await?)
    }
    Command::RefArticle { from, refs_art, refs_para } => {
      print(&store.add_article_ref_article(from.into(), refs_art, refs_para).await?)
    }
    Command::RefVideo { from, vid_pk, at } => {
      print(&store.add_article_ref_video(from.into(), vid_pk, at).await?)
    }
    Command::RefImage { from, img_id } => {
      print(&store.add_article_ref_image(from.into(), img_id).await?)
    }
    Command::Cover { art_id, image } => {
      print(&store.set_article_cover(art_id, image.into_pair()?).await?)
    }
    Command::Topic { apara_id, key } => {
      let mention = TopicMention { apara_id, topic_key: key };
      print(&store.record_topic_mention(mention).await?)
    }
    Command::Topics => print(&store.topics().await?),
    Command::Show { view } => show(store, view).await,
    Command::Headlines { limit } => print(&store.latest_headlines(limit).await?),
    Command::Search { field, terms, limit } => {
      let query = SearchQuery { field, text: terms.join(" "), limit };
      print(&store.search(&query).await?)
    }
    Command::Complete { field, terms, limit } => {
      let query = SearchQuery { field, text: terms.join(" "), limit };
      print(&store.autocomplete(&query).await?)
    }
    Command::RemoveTail { kind, id } => remove_tail(store, kind, id).await,
  }
}

async fn show<S: XtchdStore>(store: &S, view: View) -> anyhow::Result<()> {
  match view {
    View::Author { id } => print(&found(store.author_detail(id).await?, "author", id)?),
    View::Article { id } => print(&found(store.enriched_article(id).await?, "article", id)?),
    View::Text { id } => print(&found(store.article_text(id).await?, "article", id)?),
    View::Paragraph { art_id, apara_id } => {
      let para = store.enriched_paragraph(art_id, apara_id).await?;
      print(&found(para, "paragraph", apara_id)?)
    }
    View::Refs { id } => print(&found(store.combined_references(id).await?, "article", id)?),
    View::Image { id } => print(&found(store.enriched_image(id).await?, "image", id)?),
    View::Video { id } => print(&found(store.enriched_video(id).await?, "video", id)?),
  }
}

async fn head<S: XtchdStore>(
  store: &S,
  kind: Kind,
) -> anyhow::Result<xtchd_core::chain::ChainHead> {
  let head = match kind {
    Kind::Author => store.head::<Author>().await?,
    Kind::Article => store.head::<Article>().await?,
    Kind::Paragraph => store.head::<ArticlePara>().await?,
    Kind::Image => store.head::<Image>().await?,
    Kind::Channel => store.head::<YoutubeChannel>().await?,
    Kind::Video => store.head::<YoutubeVideo>().await?,
    Kind::RefArticle => store.head::<ArticleRefArticle>().await?,
    Kind::RefVideo => store.head::<ArticleRefVideo>().await?,
    Kind::RefImage => store.head::<ArticleRefImage>().await?,
  };
  Ok(head)
}

async fn remove_tail<S: XtchdStore>(store: &S, kind: Kind, id: i32) -> anyhow::Result<()> {
  async fn remove<S: XtchdStore, T: Ledgered + Serialize>(
    store: &S,
    id: i32,
  ) -> anyhow::Result<()> {
    print(&store.remove_tail::<T>(id).await?)
  }

  match kind {
    Kind::Author => remove::<S, Author>(store, id).await,
    Kind::Article => remove::<S, Article>(store, id).await,
    Kind::Paragraph => remove::<S, ArticlePara>(store, id).await,
    Kind::Image => remove::<S, Image>(store, id).await,
    Kind::Channel => remove::<S, YoutubeChannel>(store, id).await,
    Kind::Video => remove::<S, YoutubeVideo>(store, id).await,
    Kind::RefArticle => remove::<S, ArticleRefArticle>(store, id).await,
    Kind::RefVideo => remove::<S, ArticleRefVideo>(store, id).await,
    Kind::RefImage => remove::<S, ArticleRefImage>(store, id).await,
  }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn print<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn found<T>(value: Option<T>, what: &str, id: i32) -> anyhow::Result<T> {
  value.with_context(|| format!("no {what} with id {id}"))
}

/// Read `path` into a `data:` URI, guessing the MIME type from the extension.
fn data_uri(path: &Path) -> anyhow::Result<String> {
  let bytes =
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
  Ok(format!("data:{};base64,{}", mime_for(path), STANDARD.encode(bytes)))
}

fn mime_for(path: &Path) -> &'static str {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();
  match ext.as_str() {
    "png" => "image/png",
    "jpg" | "jpeg" => "image/jpeg",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "svg" => "image/svg+xml",
    "avif" => "image/avif",
    _ => "application/octet-stream",
  }
}
