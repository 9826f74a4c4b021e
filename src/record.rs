//! Defines [`PostRecord`], the canonical unit of content, and the
//! [`RecordBuilder`] that derives records from raw feed entries.

use crate::feed::RawEntry;
use crate::schema::{self, Rating, Subject};
use crate::thumbnail::Resolver;
use crate::url::{Route, Site};
use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{debug, warn};

const DESCRIPTION_CHARS: usize = 155;
const WORDS_PER_MINUTE: usize = 200;
const MAX_PROS_CONS: usize = 3;

static TAG_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

// Matched as substrings of the lowercased title, so stems cover plurals and
// compounds ("writ" matches "writer", "rewriting" and "copywriting").
const WRITING_KEYWORDS: &[&str] = &[
    "writ", "copy", "content", "blog", "essay", "grammar", "paraphras",
    "article", "text generat",
];
const IMAGE_KEYWORDS: &[&str] = &[
    "image", "artwork", "artist", "photo", "midjourney", "dall-e", "dalle",
    "picture", "illustrat", "logo", "avatar", "design",
];
const AUTOMATION_KEYWORDS: &[&str] = &[
    "automat", "workflow", "zapier", "agent", "bot", "schedul", "integrat",
];

const POSITIVE_KEYWORDS: &[&str] = &[
    "easy", "fast", "great", "excellent", "powerful", "intuitive",
    "affordable", "accurate", "helpful", "reliable", "best", "love", "free",
];
const NEGATIVE_KEYWORDS: &[&str] = &[
    "expensive", "slow", "limited", "difficult", "lack", "bug", "costly",
    "complicated", "confusing", "steep", "however", "downside",
];

/// The closed set of topic clusters. Every record belongs to exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "ai-writing-tools")]
    WritingTools,
    #[serde(rename = "ai-image-generators")]
    ImageGenerators,
    #[serde(rename = "automation-tools")]
    Automation,
}

impl Category {
    pub const ALL: [Category; 3] = [
        Category::WritingTools,
        Category::ImageGenerators,
        Category::Automation,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            Category::WritingTools => "ai-writing-tools",
            Category::ImageGenerators => "ai-image-generators",
            Category::Automation => "automation-tools",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::WritingTools => "AI Writing Tools",
            Category::ImageGenerators => "AI Image Generators",
            Category::Automation => "Automation Tools",
        }
    }

    /// Classifies a title. Keyword groups are checked in order (writing,
    /// image, automation) and the first group with a keyword anywhere in the
    /// title wins; titles with no match fall back to writing tools.
    pub fn classify(title: &str) -> Category {
        let title = title.to_lowercase();
        let groups = [
            (Category::WritingTools, WRITING_KEYWORDS),
            (Category::ImageGenerators, IMAGE_KEYWORDS),
            (Category::Automation, AUTOMATION_KEYWORDS),
        ];
        groups
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| title.contains(*k)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::WritingTools)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// A post derived from one feed entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub title: String,
    pub slug: String,
    pub url: String,

    /// The entry's markup. Rewritten once during enrichment when internal
    /// links are injected.
    pub body: String,

    /// The first 155 characters of the body's text. May end mid-word.
    pub description: String,
    pub category: Category,
    pub thumbnail: String,
    pub read_time_minutes: u32,
    pub published_at: DateTime<Utc>,

    /// The build time, not the content time.
    pub last_modified_at: DateTime<Utc>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub rating: Option<Rating>,

    /// FAQ questions found in the body, filled in during enrichment.
    #[serde(default)]
    pub faqs: Vec<String>,

    /// schema.org objects (Review, Product and, after enrichment, FAQPage).
    pub structured_data: Vec<serde_json::Value>,
}

impl PostRecord {
    /// The structured data as a JSON document for embedding in a page.
    pub fn structured_data_json(&self) -> String {
        serde_json::to_string(&self.structured_data).unwrap_or_else(|_| "[]".to_owned())
    }
}

/// Derives [`PostRecord`]s from [`RawEntry`]s.
pub struct RecordBuilder<'a> {
    site: &'a Site,

    /// Used as the author of reviews.
    site_title: &'a str,

    /// The build time; becomes every record's `last_modified_at`.
    now: DateTime<Utc>,

    /// Whether to attach randomly generated ratings to structured data.
    synthetic_ratings: bool,
}

impl<'a> RecordBuilder<'a> {
    pub fn new(
        site: &'a Site,
        site_title: &'a str,
        now: DateTime<Utc>,
        synthetic_ratings: bool,
    ) -> RecordBuilder<'a> {
        RecordBuilder {
            site,
            site_title,
            now,
            synthetic_ratings,
        }
    }

    /// Builds records for every entry that has a body, ordered by publish
    /// date (most recent first). Entries with equal dates keep feed order.
    /// Colliding slugs are disambiguated with numeric suffixes so no record
    /// overwrites another's output.
    pub fn build_all<R: Rng + ?Sized>(
        &self,
        entries: Vec<RawEntry>,
        thumbnails: &Resolver,
        rng: &mut R,
    ) -> Vec<PostRecord> {
        let mut entries: Vec<(RawEntry, String)> = entries
            .into_iter()
            .filter_map(|mut entry| match entry.body.take() {
                Some(body) if !body.trim().is_empty() => Some((entry, body)),
                _ => {
                    warn!(title = %entry.title, "skipping entry with no body");
                    None
                }
            })
            .collect();
        entries.sort_by(|(a, _), (b, _)| b.published.cmp(&a.published));

        let slugs = disambiguate(entries.iter().map(|(entry, _)| slugify(&entry.title)));
        entries
            .into_iter()
            .zip(slugs)
            .map(|((entry, body), slug)| {
                let thumbnail = thumbnails.resolve(&body, &slug, &entry.title);
                self.build(entry.title, entry.published, body, slug, thumbnail, rng)
            })
            .collect()
    }

    /// Builds a single record from already-resolved parts.
    pub fn build<R: Rng + ?Sized>(
        &self,
        title: String,
        published_at: DateTime<Utc>,
        body: String,
        slug: String,
        thumbnail: String,
        rng: &mut R,
    ) -> PostRecord {
        let text = plain_text(&body);
        let (pros, cons) = pros_and_cons(&text);
        let rating = match self.synthetic_ratings {
            true => Some(synthetic_rating(rng)),
            false => None,
        };
        let url = self.site.url(&Route::Post(&slug));
        let description = description(&text);

        let subject = Subject {
            name: &title,
            description: &description,
            url: &url,
            image: &thumbnail,
            author: self.site_title,
            pros: &pros,
            cons: &cons,
            rating,
        };
        let structured_data = vec![schema::review(&subject), schema::product(&subject)];
        debug!(slug = %slug, "built record");

        PostRecord {
            category: Category::classify(&title),
            read_time_minutes: read_time_minutes(&text),
            title,
            slug,
            url,
            body,
            description,
            thumbnail,
            published_at,
            last_modified_at: self.now,
            pros,
            cons,
            rating,
            faqs: Vec::new(),
            structured_data,
        }
    }
}

/// Lowercase ASCII alphanumerics separated by single hyphens. Titles with no
/// alphanumerics at all become `post`.
pub fn slugify(title: &str) -> String {
    let slug = slug::slugify(title);
    match slug.is_empty() {
        true => "post".to_owned(),
        false => slug,
    }
}

/// Appends `-2`, `-3`, ... to the second and later occurrences of a slug,
/// skipping suffixes that are already taken.
pub fn disambiguate(slugs: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();
    for slug in slugs {
        let mut candidate = slug.clone();
        if seen.contains(&candidate) {
            let n = suffixes.entry(slug.clone()).or_insert(1);
            while seen.contains(&candidate) {
                *n += 1;
                candidate = format!("{}-{}", slug, n);
            }
            warn!(slug = %slug, renamed = %candidate, "slug collision");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Strips markup, decodes entities and collapses whitespace.
pub fn plain_text(markup: &str) -> String {
    collapse(&TAG_PATTERN.replace_all(markup, " "))
}

/// Like [`plain_text`], but drops tags without leaving a gap, so inline
/// markup inside a heading doesn't split words from punctuation.
pub fn inline_text(markup: &str) -> String {
    collapse(&TAG_PATTERN.replace_all(markup, ""))
}

fn collapse(text: &str) -> String {
    decode_html_entities(text)
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

/// The first 155 characters of `text`.
pub fn description(text: &str) -> String {
    text.chars().take(DESCRIPTION_CHARS).collect()
}

/// `ceil(words / 200)`, at least 1.
pub fn read_time_minutes(text: &str) -> u32 {
    let words = text.split_whitespace().count();
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;
    minutes.max(1) as u32
}

/// Classifies sentences as pros and/or cons by keyword, keeping the first
/// three of each in source order.
pub fn pros_and_cons(text: &str) -> (Vec<String>, Vec<String>) {
    let mut pros = Vec::new();
    let mut cons = Vec::new();
    for sentence in text.split(|c| c == '.' || c == '!' || c == '?') {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        let lower = sentence.to_lowercase();
        if pros.len() < MAX_PROS_CONS && POSITIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            pros.push(sentence.to_owned());
        }
        if cons.len() < MAX_PROS_CONS && NEGATIVE_KEYWORDS.iter().any(|k| lower.contains(k)) {
            cons.push(sentence.to_owned());
        }
    }
    (pros, cons)
}

/// A rating in [4.0, 5.0) truncated to one decimal, with 10 to 49 reviews.
fn synthetic_rating<R: Rng + ?Sized>(rng: &mut R) -> Rating {
    let value: f64 = rng.random_range(4.0..5.0);
    Rating {
        value: (value * 10.0).floor() / 10.0,
        review_count: rng.random_range(10..50),
    }
}
