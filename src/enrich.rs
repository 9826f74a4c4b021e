//! Post-passes over the full record list: internal link injection, FAQ
//! extraction, and the per-record link sets shown in page widgets.
//!
//! The two mutating passes ([`inject_internal_links`] and [`attach_faqs`])
//! run once, in that order, before any generator reads the records. The
//! widget link sets are kept in a separate [`LinkGraph`] so records never
//! reference each other directly.

use crate::generate::Comparison;
use crate::record::{inline_text, PostRecord};
use crate::relevance::{rank_for_inline_linking, rank_related, RankWeights};
use crate::schema;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;
use tracing::debug;

/// How many recommendations a post shows.
pub const RELATED_COUNT: usize = 4;

/// How many "continue reading" links a post shows.
pub const CONTINUE_READING_COUNT: usize = 3;

const MAX_FAQS: usize = 4;
const PHRASE_WORDS: usize = 2;

static H2_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<h2\b[^>]*>(.*?)</h2>").unwrap());

/// Spans where a link must not be injected: markup tags themselves and the
/// contents of existing anchors.
static PROTECTED_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<a\b[^>]*>.*?</a>|<[^>]*>").unwrap());

/// Runs both mutating passes over the records.
pub fn enrich(records: &mut [PostRecord]) {
    inject_internal_links(records);
    attach_faqs(records);
}

/// For each record, links the first textual occurrence of each of its five
/// most similar records' key phrases to that record. A phrase that doesn't
/// occur contributes nothing.
pub fn inject_internal_links(records: &mut [PostRecord]) {
    let mut injected = 0;
    for i in 0..records.len() {
        for candidate in rank_for_inline_linking(records, i) {
            let phrase = key_phrase(&records[candidate].title);
            if phrase.is_empty() {
                continue;
            }
            let url = records[candidate].url.clone();
            if let Some(body) = inject_link(&records[i].body, &phrase, &url) {
                records[i].body = body;
                injected += 1;
            }
        }
    }
    debug!(links = injected, "injected internal links");
}

/// The first two words of a title.
pub fn key_phrase(title: &str) -> String {
    title
        .split_whitespace()
        .take(PHRASE_WORDS)
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Wraps the first case-insensitive whole-word occurrence of `phrase` in
/// `body` (outside of tags and existing anchors) in a link to `url`, keeping
/// the matched text. Returns `None` when there is no such occurrence.
pub fn inject_link(body: &str, phrase: &str, url: &str) -> Option<String> {
    let pattern = phrase_pattern(phrase)?;
    let protected: Vec<Range<usize>> = PROTECTED_PATTERN
        .find_iter(body)
        .map(|m| m.range())
        .collect();
    let found = pattern.find_iter(body).find(|m| {
        !protected
            .iter()
            .any(|r| r.start < m.end() && m.start() < r.end)
    })?;
    Some(format!(
        r#"{}<a href="{}">{}</a>{}"#,
        &body[..found.start()],
        url,
        found.as_str(),
        &body[found.end()..]
    ))
}

fn phrase_pattern(phrase: &str) -> Option<Regex> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let starts_word = phrase.chars().next().map_or(false, is_word);
    let ends_word = phrase.chars().last().map_or(false, is_word);
    let pattern = format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        regex::escape(phrase),
        if ends_word { r"\b" } else { "" },
    );
    Regex::new(&pattern).ok()
}

/// The text of the first four second-level headings that ask a question, in
/// document order.
pub fn extract_faqs(body: &str) -> Vec<String> {
    H2_PATTERN
        .captures_iter(body)
        .filter_map(|captures| captures.get(1))
        .map(|heading| inline_text(heading.as_str()))
        .filter(|heading| heading.contains('?'))
        .take(MAX_FAQS)
        .collect()
}

/// Records each post's FAQ questions and appends an FAQPage object to its
/// structured data when it has any.
pub fn attach_faqs(records: &mut [PostRecord]) {
    for record in records.iter_mut() {
        let faqs = extract_faqs(&record.body);
        if !faqs.is_empty() {
            record.structured_data.push(schema::faq(&faqs));
        }
        record.faqs = faqs;
    }
}

/// Per-record outgoing links for page widgets, by record index.
pub struct LinkGraph {
    /// Up to four recommendations ranked by [`rank_related`].
    pub related: Vec<Vec<usize>>,

    /// Exactly three links (given at least four other records) taken in list
    /// order.
    pub continue_reading: Vec<Vec<usize>>,

    /// Indices into the comparison list of comparisons involving the record.
    pub comparisons: Vec<Vec<usize>>,
}

impl LinkGraph {
    pub fn new(records: &[PostRecord], weights: &RankWeights, comparisons: &[Comparison]) -> LinkGraph {
        let related: Vec<Vec<usize>> = (0..records.len())
            .map(|i| {
                rank_related(records, i, weights)
                    .into_iter()
                    .take(RELATED_COUNT)
                    .map(|scored| scored.index)
                    .collect()
            })
            .collect();

        let continue_reading = related
            .iter()
            .enumerate()
            .map(|(i, related)| continue_reading(records.len(), i, related))
            .collect();

        let mut by_record: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
        for (c, comparison) in comparisons.iter().enumerate() {
            by_record[comparison.left].push(c);
            by_record[comparison.right].push(c);
        }

        LinkGraph {
            related,
            continue_reading,
            comparisons: by_record,
        }
    }
}

/// The first three records in list order other than `target` and its
/// recommendations. When fewer than three remain, falls back to the first
/// three other than `target`, which may repeat recommendations.
fn continue_reading(len: usize, target: usize, related: &[usize]) -> Vec<usize> {
    let fresh: Vec<usize> = (0..len)
        .filter(|i| *i != target && !related.contains(i))
        .take(CONTINUE_READING_COUNT)
        .collect();
    if fresh.len() == CONTINUE_READING_COUNT {
        return fresh;
    }
    (0..len)
        .filter(|i| *i != target)
        .take(CONTINUE_READING_COUNT)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::Category;
    use crate::relevance::test::record;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_key_phrase() {
        assert_eq!("Jasper AI", key_phrase("Jasper AI Writer Review"));
        assert_eq!("Jasper", key_phrase("Jasper"));
        assert_eq!("", key_phrase("  "));
    }

    #[test]
    fn test_inject_link_first_occurrence_preserves_case() {
        let body = "<p>We compared jasper ai with Jasper AI.</p>";
        assert_eq!(
            Some(r#"<p>We compared <a href="/j/">jasper ai</a> with Jasper AI.</p>"#.to_owned()),
            inject_link(body, "Jasper AI", "/j/")
        );
    }

    #[test]
    fn test_inject_link_whole_words_only() {
        assert_eq!(None, inject_link("<p>Jasperize everything</p>", "Jasper", "/j/"));
    }

    #[test]
    fn test_inject_link_skips_markup_and_anchors() {
        let body = r#"<img alt="Jasper AI"><a href="/x/">Jasper AI</a> then Jasper AI"#;
        assert_eq!(
            Some(r#"<img alt="Jasper AI"><a href="/x/">Jasper AI</a> then <a href="/j/">Jasper AI</a>"#.to_owned()),
            inject_link(body, "Jasper AI", "/j/")
        );
    }

    #[test]
    fn test_inject_internal_links() {
        let now = Utc::now();
        let mut records = vec![
            record("Jasper AI Writer Review", Category::WritingTools, now),
            record("Copy AI Writer Review", Category::WritingTools, now),
            record("Midjourney Review", Category::ImageGenerators, now),
        ];
        records[0].body = "<p>Compared to Copy AI and midjourney review sites.</p>".to_owned();
        records[1].body = "<p>Nothing to see.</p>".to_owned();
        inject_internal_links(&mut records);
        assert_eq!(
            concat!(
                r#"<p>Compared to <a href="https://example.org/posts/copy-ai-writer-review/">Copy AI</a> "#,
                r#"and <a href="https://example.org/posts/midjourney-review/">midjourney review</a> sites.</p>"#
            ),
            records[0].body
        );
        assert_eq!("<p>Nothing to see.</p>", records[1].body);
    }

    #[test]
    fn test_extract_faqs() {
        let body = "<h2>Intro</h2><h2 id=\"a\">Is it <em>free</em>?</h2><h3>Why?</h3>\
                    <h2>Q1?</h2><h2>Q2?</h2><h2>Q3?</h2><h2>Q4?</h2>";
        assert_eq!(vec!["Is it free?", "Q1?", "Q2?", "Q3?"], extract_faqs(body));
        assert_eq!(
            vec!["Is Jasper & Copy AI worth it?"],
            extract_faqs("<h2>Is <strong>Jasper</strong> &amp; Copy AI\n worth it?</h2>")
        );
        assert!(extract_faqs("<p>no headings</p>").is_empty());
    }

    #[test]
    fn test_attach_faqs() {
        let now = Utc::now();
        let mut records = vec![
            record("A", Category::WritingTools, now),
            record("B", Category::WritingTools, now),
        ];
        records[0].body = "<h2>How much does it cost?</h2>".to_owned();
        attach_faqs(&mut records);
        assert_eq!(vec!["How much does it cost?"], records[0].faqs);
        assert_eq!(1, records[0].structured_data.len());
        assert!(records[1].structured_data.is_empty());
    }

    fn weights() -> RankWeights {
        RankWeights::new(Utc.with_ymd_and_hms(2024, 1, 20, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_related_and_continue_reading() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let records: Vec<PostRecord> = (0..8)
            .map(|i| record(&format!("Post {}", i), Category::Automation, now))
            .collect();
        let graph = LinkGraph::new(&records, &weights(), &[]);
        assert_eq!(vec![1, 2, 3, 4], graph.related[0]);
        assert_eq!(vec![5, 6, 7], graph.continue_reading[0]);
        assert_eq!(vec![0, 1, 2, 4], graph.related[3]);
        assert_eq!(vec![5, 6, 7], graph.continue_reading[3]);
    }

    #[test]
    fn test_continue_reading_fallback() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let records: Vec<PostRecord> = (0..5)
            .map(|i| record(&format!("Post {}", i), Category::Automation, now))
            .collect();
        let graph = LinkGraph::new(&records, &weights(), &[]);
        for (i, links) in graph.continue_reading.iter().enumerate() {
            assert_eq!(3, links.len());
            assert!(!links.contains(&i));
            assert!(graph.related[i].len() <= 4);
            assert!(!graph.related[i].contains(&i));
        }
        assert_eq!(vec![1, 2, 3], graph.continue_reading[0]);
    }

    #[test]
    fn test_two_post_scenario() {
        let now = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        let records = vec![
            record("Jasper AI Writer Review", Category::WritingTools, now),
            record("Dream Image Studio", Category::ImageGenerators, now),
            record("Copy AI Writer Review", Category::WritingTools, now),
        ];
        let graph = LinkGraph::new(&records, &weights(), &[]);
        assert_eq!(vec![2, 1], graph.related[0]);
        assert_eq!(vec![0, 1], graph.related[2]);
    }

    #[test]
    fn test_comparison_references() {
        let now = Utc::now();
        let records: Vec<PostRecord> = (0..3)
            .map(|i| record(&format!("Post {}", i), Category::Automation, now))
            .collect();
        let comparisons = vec![
            Comparison { slug: "a".to_owned(), url: String::new(), left: 0, right: 1 },
            Comparison { slug: "b".to_owned(), url: String::new(), left: 0, right: 2 },
        ];
        let graph = LinkGraph::new(&records, &weights(), &comparisons);
        assert_eq!(vec![0, 1], graph.comparisons[0]);
        assert_eq!(vec![1], graph.comparisons[2]);
    }
}
