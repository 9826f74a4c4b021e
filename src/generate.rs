//! Derives the pages that don't correspond to a single feed entry:
//! comparisons, per-category top lists, tag hubs and category hubs. All of
//! them refer to records by index into the final record list.

use crate::record::{disambiguate, Category, PostRecord};
use crate::taxonomy::Taxonomy;
use crate::url::{Route, Site};

/// Each record is compared with this many records after it in list order.
pub const COMPARISONS_PER_RECORD: usize = 3;

/// The number of records on a top list.
pub const TOP_LIST_SIZE: usize = 10;

/// A page comparing two records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    /// `{left slug}-vs-{right slug}`.
    pub slug: String,
    pub url: String,
    pub left: usize,
    pub right: usize,
}

/// A page listing a group of records: a tag hub, a category hub or a top
/// list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hub {
    pub title: String,
    pub url: String,

    /// The path segment that identifies the hub (tag name or category slug).
    pub key: String,
    pub members: Vec<usize>,
}

/// Every derivative page of a build.
pub struct Derivatives {
    pub comparisons: Vec<Comparison>,
    pub top_lists: Vec<(Category, Hub)>,
    pub tag_hubs: Vec<Hub>,
    pub category_hubs: Vec<(Category, Hub)>,
}

impl Derivatives {
    pub fn new(site: &Site, records: &[PostRecord], taxonomy: &Taxonomy) -> Derivatives {
        Derivatives {
            comparisons: comparisons(site, records),
            top_lists: top_lists(site, taxonomy),
            tag_hubs: tag_hubs(site, taxonomy),
            category_hubs: category_hubs(site, taxonomy),
        }
    }
}

/// Pairs every record with each of the next three records in list order.
/// This yields a fixed O(n) sample of pairs rather than every pair. Slugs
/// that collide (titles that already contain "vs") get numeric suffixes.
pub fn comparisons(site: &Site, records: &[PostRecord]) -> Vec<Comparison> {
    let mut pairs = Vec::new();
    for left in 0..records.len() {
        let end = records.len().min(left + 1 + COMPARISONS_PER_RECORD);
        pairs.extend((left + 1..end).map(|right| (left, right)));
    }
    let slugs = disambiguate(
        pairs
            .iter()
            .map(|(left, right)| format!("{}-vs-{}", records[*left].slug, records[*right].slug)),
    );
    pairs
        .into_iter()
        .zip(slugs)
        .map(|((left, right), slug)| Comparison {
            url: site.url(&Route::Comparison(&slug)),
            slug,
            left,
            right,
        })
        .collect()
}

/// The first ten records of each category, in list order.
pub fn top_lists(site: &Site, taxonomy: &Taxonomy) -> Vec<(Category, Hub)> {
    Category::ALL
        .iter()
        .map(|category| {
            (
                *category,
                Hub {
                    title: format!("Top {} {}", TOP_LIST_SIZE, category.label()),
                    url: site.url(&Route::TopList(*category)),
                    key: category.slug().to_owned(),
                    members: taxonomy
                        .category(*category)
                        .iter()
                        .take(TOP_LIST_SIZE)
                        .copied()
                        .collect(),
                },
            )
        })
        .collect()
}

/// One hub per tag shared by at least two records.
pub fn tag_hubs(site: &Site, taxonomy: &Taxonomy) -> Vec<Hub> {
    taxonomy
        .hub_tags()
        .map(|(tag, members)| Hub {
            title: format!("Posts tagged \"{}\"", tag),
            url: site.url(&Route::Tag(tag)),
            key: tag.to_owned(),
            members: members.to_vec(),
        })
        .collect()
}

/// One hub per category, listing every member.
pub fn category_hubs(site: &Site, taxonomy: &Taxonomy) -> Vec<(Category, Hub)> {
    Category::ALL
        .iter()
        .map(|category| {
            (
                *category,
                Hub {
                    title: category.label().to_owned(),
                    url: site.url(&Route::Category(*category)),
                    key: category.slug().to_owned(),
                    members: taxonomy.category(*category).to_vec(),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::relevance::test::record;
    use chrono::Utc;
    use proptest::prelude::*;

    fn site() -> Site {
        Site::parse("https://example.org").unwrap()
    }

    fn records(n: usize) -> Vec<PostRecord> {
        let now = Utc::now();
        (0..n)
            .map(|i| {
                let category = Category::ALL[i % 3];
                record(&format!("Post {}", i), category, now)
            })
            .collect()
    }

    #[test]
    fn test_comparisons_pair_with_next_three() {
        let records = records(5);
        let comparisons = comparisons(&site(), &records);
        let pairs: Vec<(usize, usize)> = comparisons.iter().map(|c| (c.left, c.right)).collect();
        assert_eq!(
            vec![
                (0, 1), (0, 2), (0, 3),
                (1, 2), (1, 3), (1, 4),
                (2, 3), (2, 4),
                (3, 4),
            ],
            pairs
        );
        assert_eq!("post-0-vs-post-1", comparisons[0].slug);
        assert_eq!(
            "https://example.org/compare/post-0-vs-post-1/",
            comparisons[0].url
        );
    }

    #[test]
    fn test_comparisons_small_lists() {
        assert!(comparisons(&site(), &records(0)).is_empty());
        assert!(comparisons(&site(), &records(1)).is_empty());
        assert_eq!(1, comparisons(&site(), &records(2)).len());
    }

    #[test]
    fn test_comparison_slugs_never_collide() {
        let now = Utc::now();
        let records = vec![
            record("Jasper vs Copy AI", Category::WritingTools, now),
            record("Writesonic", Category::WritingTools, now),
            record("Jasper", Category::WritingTools, now),
            record("Copy AI vs Writesonic", Category::WritingTools, now),
        ];
        let slugs: Vec<String> = comparisons(&site(), &records)
            .into_iter()
            .map(|c| c.slug)
            .collect();
        assert_eq!(
            vec![
                "jasper-vs-copy-ai-vs-writesonic",
                "jasper-vs-copy-ai-vs-jasper",
                "jasper-vs-copy-ai-vs-copy-ai-vs-writesonic",
                "writesonic-vs-jasper",
                "writesonic-vs-copy-ai-vs-writesonic",
                "jasper-vs-copy-ai-vs-writesonic-2",
            ],
            slugs
        );
    }

    #[test]
    fn test_top_lists_take_first_ten_in_list_order() {
        let records = records(40);
        let taxonomy = Taxonomy::new(&records);
        let lists = top_lists(&site(), &taxonomy);
        assert_eq!(3, lists.len());
        let (category, writing) = &lists[0];
        assert_eq!(Category::WritingTools, *category);
        assert_eq!((0..10).map(|i| i * 3).collect::<Vec<_>>(), writing.members);
        assert_eq!("Top 10 AI Writing Tools", writing.title);
        assert_eq!("https://example.org/best/ai-writing-tools/", writing.url);
    }

    #[test]
    fn test_category_hubs_list_all_members() {
        let records = records(40);
        let taxonomy = Taxonomy::new(&records);
        let hubs = category_hubs(&site(), &taxonomy);
        let total: usize = hubs.iter().map(|(_, hub)| hub.members.len()).sum();
        assert_eq!(40, total);
        assert_eq!(14, hubs[0].1.members.len());
    }

    #[test]
    fn test_tag_hubs() {
        let now = Utc::now();
        let records = vec![
            record("Jasper Writer", Category::WritingTools, now),
            record("Copy Writer", Category::WritingTools, now),
            record("Lonely Title", Category::WritingTools, now),
        ];
        let hubs = tag_hubs(&site(), &Taxonomy::new(&records));
        assert_eq!(1, hubs.len());
        assert_eq!("writer", hubs[0].key);
        assert_eq!(vec![0, 1], hubs[0].members);
        assert_eq!("https://example.org/tags/writer/", hubs[0].url);
    }

    proptest! {
        #[test]
        fn prop_comparison_count(n in 0usize..40) {
            let expected: usize = (0..n).map(|i| COMPARISONS_PER_RECORD.min(n - 1 - i)).sum();
            prop_assert_eq!(expected, comparisons(&site(), &records(n)).len());
        }
    }
}
