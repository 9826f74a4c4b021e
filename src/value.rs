//! Converts records and derived pages into template [`Value`]s. Every text
//! field is HTML-escaped here; post bodies, static page HTML and JSON-LD are
//! passed through raw.

use crate::generate::{Comparison, Hub};
use crate::markdown::{escape, StaticPage};
use crate::record::PostRecord;
use crate::taxonomy::Tag;
use gtmpl::Value;
use std::collections::HashMap;

/// Builds a [`Value::Object`] from field/value pairs.
pub fn object<const N: usize>(fields: [(&str, Value); N]) -> Value {
    let m: HashMap<String, Value> = fields
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value))
        .collect();
    Value::Object(m)
}

/// An HTML-escaped string.
pub fn text(s: &str) -> Value {
    Value::String(escape(s))
}

/// A string inserted into the page as-is.
pub fn raw(s: &str) -> Value {
    Value::String(s.to_owned())
}

pub fn optional_url(url: &Option<String>) -> Value {
    match url {
        Some(url) => text(url),
        None => Value::Nil,
    }
}

/// JSON for a `<script>` element. `</` is escaped so the document can't close
/// the element early.
pub fn script_json(json: &str) -> Value {
    Value::String(json.replace("</", "<\\/"))
}

fn texts(items: &[String]) -> Value {
    Value::Array(items.iter().map(|s| text(s)).collect())
}

impl From<&Tag> for Value {
    fn from(t: &Tag) -> Value {
        object([("name", text(&t.name)), ("url", text(&t.url))])
    }
}

/// The fields of a record shown wherever it is listed: title, url,
/// description, thumbnail, category, publish date and read time.
pub fn summarize(record: &PostRecord) -> Value {
    object([
        ("title", text(&record.title)),
        ("url", text(&record.url)),
        ("description", text(&record.description)),
        ("thumbnail", text(&record.thumbnail)),
        ("category", text(record.category.label())),
        ("published", raw(&record.published_at.format("%B %-d, %Y").to_string())),
        ("read_time", raw(&record.read_time_minutes.to_string())),
    ])
}

/// Summaries of `records[i]` for each `i` in `indices`.
pub fn summaries(records: &[PostRecord], indices: &[usize]) -> Value {
    Value::Array(indices.iter().map(|i| summarize(&records[*i])).collect())
}

/// A post's links to other pages.
pub struct PostLinks<'a> {
    pub tags: &'a [Tag],
    pub category_url: &'a str,
    pub related: &'a [usize],
    pub continue_reading: &'a [usize],
    pub comparisons: Vec<&'a Comparison>,
}

/// The full value for a post page.
pub fn post(records: &[PostRecord], index: usize, links: &PostLinks) -> Value {
    let record = &records[index];
    let rating = match record.rating {
        Some(rating) => object([
            ("value", raw(&format!("{:.1}", rating.value))),
            ("review_count", raw(&rating.review_count.to_string())),
        ]),
        None => Value::Nil,
    };
    object([
        ("summary", summarize(record)),
        ("body", raw(&record.body)),
        ("category_url", text(links.category_url)),
        ("rating", rating),
        ("pros", texts(&record.pros)),
        ("cons", texts(&record.cons)),
        ("faqs", texts(&record.faqs)),
        ("structured_data", script_json(&record.structured_data_json())),
        ("tags", Value::Array(links.tags.iter().map(Value::from).collect())),
        ("related", summaries(records, links.related)),
        ("continue_reading", summaries(records, links.continue_reading)),
        (
            "comparisons",
            Value::Array(
                links
                    .comparisons
                    .iter()
                    .map(|c| comparison_link(records, c))
                    .collect(),
            ),
        ),
    ])
}

fn comparison_title(records: &[PostRecord], comparison: &Comparison) -> String {
    format!(
        "{} vs {}",
        records[comparison.left].title, records[comparison.right].title
    )
}

fn comparison_link(records: &[PostRecord], comparison: &Comparison) -> Value {
    object([
        ("title", text(&comparison_title(records, comparison))),
        ("url", text(&comparison.url)),
    ])
}

/// One side of a comparison page.
fn contender(record: &PostRecord) -> Value {
    object([
        ("summary", summarize(record)),
        ("pros", texts(&record.pros)),
        ("cons", texts(&record.cons)),
        (
            "rating",
            match record.rating {
                Some(rating) => raw(&format!("{:.1}", rating.value)),
                None => Value::Nil,
            },
        ),
    ])
}

pub fn comparison(records: &[PostRecord], comparison: &Comparison) -> Value {
    object([
        ("title", text(&comparison_title(records, comparison))),
        ("url", text(&comparison.url)),
        ("left", contender(&records[comparison.left])),
        ("right", contender(&records[comparison.right])),
    ])
}

pub fn hub(records: &[PostRecord], hub: &Hub) -> Value {
    object([
        ("title", text(&hub.title)),
        ("url", text(&hub.url)),
        ("key", text(&hub.key)),
        ("records", summaries(records, &hub.members)),
    ])
}

pub fn static_page(page: &StaticPage, url: &str) -> Value {
    object([
        ("title", text(&page.title)),
        ("url", text(url)),
        ("body", raw(&page.html)),
    ])
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::record::Category;
    use crate::relevance::test::record;
    use chrono::{TimeZone, Utc};

    fn field<'a>(value: &'a Value, name: &str) -> &'a Value {
        match value {
            Value::Object(m) => &m[name],
            _ => panic!("not an object: {:?}", value),
        }
    }

    fn string<'a>(value: &'a Value, name: &str) -> &'a str {
        match field(value, name) {
            Value::String(s) => s,
            other => panic!("not a string: {:?}", other),
        }
    }

    #[test]
    fn test_summarize_escapes_text() {
        let published = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let record = record("Tools <&> Tricks", Category::Automation, published);
        let value = summarize(&record);
        assert_eq!("Tools &lt;&amp;&gt; Tricks", string(&value, "title"));
        assert_eq!("March 1, 2024", string(&value, "published"));
        assert_eq!("Automation Tools", string(&value, "category"));
    }

    #[test]
    fn test_post_body_is_raw() {
        let published = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut records = vec![
            record("Zapier", Category::Automation, published),
            record("Make", Category::Automation, published),
        ];
        records[0].body = "<p>Hello</p>".to_owned();
        let links = PostLinks {
            tags: &[],
            category_url: "https://example.org/category/automation-tools/",
            related: &[1],
            continue_reading: &[1],
            comparisons: Vec::new(),
        };
        let value = post(&records, 0, &links);
        assert_eq!("<p>Hello</p>", string(&value, "body"));
        assert!(matches!(field(&value, "rating"), Value::Nil));
        match field(&value, "related") {
            Value::Array(items) => assert_eq!(1, items.len()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_script_json() {
        match script_json(r#"["</script>"]"#) {
            Value::String(s) => assert_eq!(r#"["<\/script>"]"#, s),
            other => panic!("unexpected {:?}", other),
        }
    }
}
