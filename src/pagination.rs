//! Splits the record list into listing pages. Page 1 is the site root and
//! later pages live under `/page/{n}/`; each page links only to its
//! neighbours.

use crate::url::{Route, Site};
use std::ops::Range;

/// One listing page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingPage {
    /// 1-based.
    pub number: usize,
    pub url: String,

    /// The records on this page, as a range of the record list.
    pub records: Range<usize>,
    pub prev: Option<String>,
    pub next: Option<String>,
}

impl ListingPage {
    pub fn route(&self) -> Route<'static> {
        Route::Listing(self.number)
    }
}

/// `ceil(total / page_size)`.
pub fn page_count(total: usize, page_size: usize) -> usize {
    match total % page_size {
        0 => total / page_size,
        _ => total / page_size + 1,
    }
}

/// Paginates `total` records. An empty record list yields no pages.
pub fn paginate(site: &Site, total: usize, page_size: usize) -> Vec<ListingPage> {
    let page_size = page_size.max(1);
    let pages = page_count(total, page_size);
    (1..=pages)
        .map(|number| ListingPage {
            number,
            url: site.url(&Route::Listing(number)),
            records: (number - 1) * page_size..(number * page_size).min(total),
            prev: match number {
                1 => None,
                n => Some(site.url(&Route::Listing(n - 1))),
            },
            next: match number < pages {
                true => Some(site.url(&Route::Listing(number + 1))),
                false => None,
            },
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn site() -> Site {
        Site::parse("https://example.org").unwrap()
    }

    #[test]
    fn test_twenty_five_records() {
        let pages = paginate(&site(), 25, 10);
        assert_eq!(3, pages.len());
        assert_eq!(20..25, pages[2].records);
        assert_eq!(5, pages[2].records.len());

        assert_eq!("https://example.org/", pages[0].url);
        assert_eq!(None, pages[0].prev);
        assert_eq!(Some("https://example.org/page/2/".to_owned()), pages[0].next);

        assert_eq!(Some("https://example.org/".to_owned()), pages[1].prev);
        assert_eq!(Some("https://example.org/page/3/".to_owned()), pages[1].next);

        assert_eq!(Some("https://example.org/page/2/".to_owned()), pages[2].prev);
        assert_eq!(None, pages[2].next);
    }

    #[test]
    fn test_exact_multiple_and_empty() {
        assert_eq!(2, paginate(&site(), 20, 10).len());
        assert!(paginate(&site(), 0, 10).is_empty());
    }

    proptest! {
        #[test]
        fn prop_every_record_on_exactly_one_page(total in 0usize..200, size in 1usize..25) {
            let pages = paginate(&site(), total, size);
            prop_assert_eq!(page_count(total, size), pages.len());
            let mut seen = vec![0usize; total];
            for page in &pages {
                for i in page.records.clone() {
                    seen[i] += 1;
                }
            }
            prop_assert!(seen.iter().all(|n| *n == 1));
            let sum: usize = pages.iter().map(|p| p.records.len()).sum();
            prop_assert_eq!(total, sum);
        }
    }
}
