//! Support for reading the source syndication feed into [`RawEntry`]s and for
//! writing the site's own Atom feed from a list of records.

use crate::record::PostRecord;
use atom_syndication::{Entry, Error as AtomError, Feed, Link, Text};
use chrono::{DateTime, FixedOffset, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One entry from the source feed, before any derivation.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry {
    pub title: String,
    pub published: DateTime<Utc>,

    /// The entry's markup. Entries without a body are skipped by the record
    /// builder.
    pub body: Option<String>,
}

/// Where the source feed comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FeedSource {
    Remote(String),
    Local(PathBuf),
}

impl FeedSource {
    /// Interprets `location` as a URL when it has an http(s) scheme, and as a
    /// path relative to `project_root` otherwise.
    pub fn from_location(location: &str, project_root: &Path) -> FeedSource {
        if location.starts_with("http://") || location.starts_with("https://") {
            FeedSource::Remote(location.to_owned())
        } else {
            FeedSource::Local(project_root.join(location))
        }
    }
}

/// Fetches and parses the source feed. Any failure here is fatal for the
/// build, so nothing is retried.
pub fn fetch_entries(source: &FeedSource) -> Result<Vec<RawEntry>> {
    let bytes = match source {
        FeedSource::Remote(url) => {
            info!(url = %url, "fetching feed");
            let client = reqwest::blocking::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()?;
            client.get(url).send()?.error_for_status()?.bytes()?.to_vec()
        }
        FeedSource::Local(path) => {
            info!(path = %path.display(), "reading feed");
            std::fs::read(path).map_err(|err| Error::Read {
                path: path.to_owned(),
                err,
            })?
        }
    };
    parse_entries(&bytes)
}

/// Parses an Atom or RSS 2.0 document into entries, in feed order. The
/// format is chosen by the root element; anything that isn't `<rss>` is read
/// as Atom.
pub fn parse_entries(xml: &[u8]) -> Result<Vec<RawEntry>> {
    let entries: Vec<RawEntry> = match root_element(xml).as_deref() {
        Some("rss") => parse_rss(xml)?,
        _ => Feed::read_from(xml)?
            .entries
            .into_iter()
            .map(raw_entry)
            .collect(),
    };
    debug!(count = entries.len(), "parsed feed entries");
    Ok(entries)
}

/// The local name of the document's first element, if it has one.
fn root_element(xml: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).to_string())
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// The fields of the `<item>` being read.
#[derive(Default)]
struct Item {
    title: String,
    pub_date: Option<String>,
    description: Option<String>,
    encoded: Option<String>,
}

impl Item {
    /// `content:encoded` wins over `description` for the body.
    fn into_entry(self) -> Result<RawEntry> {
        let published = match &self.pub_date {
            Some(date) => DateTime::parse_from_rfc2822(date.trim())
                .map_err(|err| Error::Rss(format!("item '{}' pubDate '{}': {}", self.title, date, err)))?,
            None => return Err(Error::Rss(format!("item '{}' has no pubDate", self.title))),
        };
        Ok(RawEntry {
            title: self.title,
            published: published.with_timezone(&Utc),
            body: self
                .encoded
                .or(self.description)
                .filter(|body| !body.trim().is_empty()),
        })
    }
}

/// Reads the `<item>`s of an RSS 2.0 channel.
fn parse_rss(xml: &[u8]) -> Result<Vec<RawEntry>> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut entries = Vec::new();
    let mut item: Option<Item> = None;
    let mut current_element: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "item" => item = Some(Item::default()),
                    "title" | "pubDate" | "description" | "encoded" if item.is_some() => {
                        current_element = Some(name);
                    }
                    _ => current_element = None,
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"item" {
                    if let Some(item) = item.take() {
                        entries.push(item.into_entry()?);
                    }
                }
                current_element = None;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| Error::Rss(e.to_string()))?;
                push_text(&mut item, &current_element, &text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).to_string();
                push_text(&mut item, &current_element, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Rss(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }
    Ok(entries)
}

fn push_text(item: &mut Option<Item>, element: &Option<String>, text: &str) {
    let (Some(item), Some(element)) = (item.as_mut(), element.as_deref()) else {
        return;
    };
    let field = match element {
        "title" => {
            item.title.push_str(text);
            return;
        }
        "pubDate" => &mut item.pub_date,
        "description" => &mut item.description,
        "encoded" => &mut item.encoded,
        _ => return,
    };
    field.get_or_insert_with(String::new).push_str(text);
}

fn raw_entry(entry: Entry) -> RawEntry {
    RawEntry {
        title: entry.title.value,
        published: entry.published.unwrap_or(entry.updated).with_timezone(&Utc),
        body: entry
            .content
            .and_then(|content| content.value)
            .filter(|body| !body.trim().is_empty()),
    }
}

/// Bundled configuration for writing the site's Atom feed.
pub struct AtomConfig<'a> {
    pub title: &'a str,
    pub home_page: &'a str,
    pub updated: DateTime<Utc>,
}

/// Writes an Atom feed of `records` (already truncated and ordered by the
/// caller) to `w`.
pub fn write_atom<W: Write>(config: &AtomConfig, records: &[&PostRecord], w: W) -> Result<()> {
    let mut feed = Feed::default();
    feed.set_title(Text::from(config.title.to_owned()));
    feed.set_id(config.home_page.to_owned());
    feed.set_updated(config.updated);
    feed.set_links(vec![alternate(config.home_page)]);
    feed.set_entries(
        records
            .iter()
            .map(|record| {
                let mut entry = Entry::default();
                entry.set_id(record.url.clone());
                entry.set_title(Text::from(record.title.clone()));
                entry.set_updated(record.last_modified_at);
                entry.set_published(Some(DateTime::<FixedOffset>::from(record.published_at)));
                entry.set_summary(Some(Text::from(record.description.clone())));
                entry.set_links(vec![alternate(&record.url)]);
                entry
            })
            .collect::<Vec<Entry>>(),
    );
    feed.write_to(w)?;
    Ok(())
}

fn alternate(href: &str) -> Link {
    let mut link = Link::default();
    link.set_href(href.to_owned());
    link.set_rel("alternate".to_owned());
    link
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading the source feed or writing the site feed.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the remote feed can't be fetched.
    #[error("fetching feed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Returned when a local feed file can't be read.
    #[error("reading feed '{}': {err}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned when the feed isn't valid Atom, or when writing fails.
    #[error("atom: {0}")]
    Atom(#[from] AtomError),

    /// Returned when an RSS feed is malformed or an item lacks a valid
    /// `pubDate`.
    #[error("rss: {0}")]
    Rss(String),
}
