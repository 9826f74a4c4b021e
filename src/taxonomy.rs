//! Defines the read-only indices that group records by category and by tag.
//! They are built once after enrichment so generators never rescan the
//! record list to find a record's neighbours.
//!
//! Tags are not assigned by authors. Every title word of five or more
//! characters is a tag, and a tag only gets a hub page when at least two
//! records share it.

use crate::record::{Category, PostRecord};
use crate::url::{Route, Site};
use std::collections::BTreeMap;

const MIN_TAG_CHARS: usize = 5;

/// Tags with fewer members than this get no hub page.
pub const MIN_TAG_MEMBERS: usize = 2;

/// A tag with a hub page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// The tag's name, slugified so it can be dropped into a URL.
    pub name: String,

    /// The URL of the tag's hub page.
    pub url: String,
}

/// The tags derived from a title, in title order without duplicates.
pub fn tags(title: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let words = title.split(|c: char| !(c.is_alphanumeric() || c == '_'));
    for word in words.filter(|w| w.chars().count() >= MIN_TAG_CHARS) {
        let tag = slug::slugify(word);
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Record indices grouped by category and by tag. Member lists keep record
/// list order.
pub struct Taxonomy {
    pub categories: BTreeMap<Category, Vec<usize>>,
    pub tags: BTreeMap<String, Vec<usize>>,

    /// Each record's tags, by record index.
    record_tags: Vec<Vec<String>>,
}

impl Taxonomy {
    pub fn new(records: &[PostRecord]) -> Taxonomy {
        let mut categories: BTreeMap<Category, Vec<usize>> =
            Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
        let mut tag_index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut record_tags = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            categories.entry(record.category).or_default().push(i);
            let record_tag_names = tags(&record.title);
            for tag in record_tag_names.iter() {
                tag_index.entry(tag.clone()).or_default().push(i);
            }
            record_tags.push(record_tag_names);
        }

        Taxonomy {
            categories,
            tags: tag_index,
            record_tags,
        }
    }

    /// The members of `category`, in list order.
    pub fn category(&self, category: Category) -> &[usize] {
        self.categories
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tags that have hub pages, alphabetically.
    pub fn hub_tags(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.tags
            .iter()
            .filter(|(_, members)| members.len() >= MIN_TAG_MEMBERS)
            .map(|(tag, members)| (tag.as_str(), members.as_slice()))
    }

    /// The tags of `records[index]` that have hub pages.
    pub fn record_hub_tags(&self, site: &Site, index: usize) -> Vec<Tag> {
        self.record_tags
            .get(index)
            .map(|names| {
                names
                    .iter()
                    .filter(|name| {
                        self.tags
                            .get(*name)
                            .map_or(false, |members| members.len() >= MIN_TAG_MEMBERS)
                    })
                    .map(|name| Tag {
                        name: name.clone(),
                        url: site.url(&Route::Tag(name)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::relevance::test::record;
    use chrono::Utc;

    #[test]
    fn test_tags() {
        assert_eq!(
            vec!["jasper", "writer", "review", "edition"],
            tags("Jasper AI Writer Review: writer edition")
        );
        assert_eq!(vec!["edition"], tags("a to be Edition"));
        assert!(tags("AI is fun").is_empty());
    }

    #[test]
    fn test_hub_tags_need_two_members() {
        let now = Utc::now();
        let records = vec![
            record("Jasper Writer", Category::WritingTools, now),
            record("Copy Writer", Category::WritingTools, now),
            record("Midjourney Image", Category::ImageGenerators, now),
        ];
        let taxonomy = Taxonomy::new(&records);
        let hubs: Vec<(&str, &[usize])> = taxonomy.hub_tags().collect();
        assert_eq!(vec![("writer", &[0usize, 1][..])], hubs);
        assert!(taxonomy.tags.contains_key("jasper"));

        let site = Site::parse("https://example.org").unwrap();
        assert_eq!(
            vec![Tag {
                name: "writer".to_owned(),
                url: "https://example.org/tags/writer/".to_owned(),
            }],
            taxonomy.record_hub_tags(&site, 0)
        );
        assert!(taxonomy.record_hub_tags(&site, 2).is_empty());
    }

    #[test]
    fn test_categories_partition_records() {
        let now = Utc::now();
        let records = vec![
            record("A", Category::Automation, now),
            record("B", Category::WritingTools, now),
            record("C", Category::Automation, now),
        ];
        let taxonomy = Taxonomy::new(&records);
        assert_eq!(vec![0, 2], taxonomy.category(Category::Automation).to_vec());
        assert_eq!(vec![1], taxonomy.category(Category::WritingTools).to_vec());
        assert!(taxonomy.category(Category::ImageGenerators).is_empty());
    }
}
