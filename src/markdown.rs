//! Renders the hand-written static pages (`pages/{name}.md`) and provides the
//! HTML escaper used for text that ends up in templates.

use pulldown_cmark::{html, Options, Parser};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// A rendered static page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticPage {
    /// The page's file stem, which is also its URL path segment.
    pub name: String,
    pub title: String,
    pub html: String,
}

#[derive(Deserialize, Default)]
struct Frontmatter {
    #[serde(default)]
    title: Option<String>,
}

/// Escapes `text` for use in HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String can't fail.
    let _ = pulldown_cmark::escape::escape_html(&mut out, text);
    out
}

/// Converts markdown to HTML.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_SMART_PUNCTUATION);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let mut out = String::new();
    html::push_html(&mut out, Parser::new_ext(markdown, options));
    out
}

/// Splits `input` into its YAML front matter and its body. Input without a
/// leading `---` fence has no front matter.
fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Ok(("", input));
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => {
            let yaml_stop = FENCE.len() + offset;
            Ok((&input[FENCE.len()..yaml_stop], &input[yaml_stop + FENCE.len()..]))
        }
    }
}

/// Parses a static page from its markdown source. The title comes from the
/// front matter, falling back to the capitalized `name`.
pub fn parse_page(name: &str, input: &str) -> Result<StaticPage> {
    let (yaml, body) = split_frontmatter(input)?;
    let frontmatter: Frontmatter = match yaml.trim().is_empty() {
        true => Frontmatter::default(),
        false => serde_yaml::from_str(yaml)?,
    };
    Ok(StaticPage {
        name: name.to_owned(),
        title: frontmatter.title.unwrap_or_else(|| capitalize(name)),
        html: to_html(body),
    })
}

/// Reads `{directory}/{name}.md`. A missing file yields `Ok(None)` so the
/// caller can skip the page.
pub fn read_page(directory: &Path, name: &str) -> Result<Option<StaticPage>> {
    let path = directory.join(format!("{}.md", name));
    match std::fs::read_to_string(&path) {
        Ok(input) => parse_page(name, &input).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::Io(err)),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem reading a static page.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when a front matter block is opened but never closed.
    #[error("front matter is missing its closing `---`")]
    FrontmatterMissingEndFence,

    /// Returned when the front matter isn't valid YAML.
    #[error("parsing front matter: {0}")]
    DeserializeYaml(#[from] serde_yaml::Error),

    /// Returned for I/O errors other than a missing file.
    #[error("reading page: {0}")]
    Io(#[from] std::io::Error),
}
