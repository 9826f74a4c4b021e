//! The library code for the `feedsmith` static site generator, which turns a
//! syndication feed into a cross-linked review site. A build is a single
//! linear pass:
//!
//! 1. Fetching the feed ([`crate::feed`]) and deriving one record per entry
//!    ([`crate::record`]), with a thumbnail for each ([`crate::thumbnail`])
//! 2. Enriching the full record list ([`crate::enrich`]): injecting internal
//!    links, extracting FAQ headings and choosing each post's recommendations
//!    with the scoring functions in [`crate::relevance`]
//! 3. Deriving the pages that aren't posts ([`crate::generate`]): comparisons,
//!    top lists and the tag and category hubs indexed by [`crate::taxonomy`]
//! 4. Rendering every page ([`crate::write`]) and emitting the site indices:
//!    sitemaps ([`crate::sitemap`]), feeds ([`crate::rss`], [`crate::feed`]),
//!    the search payload ([`crate::search`]) and the paginated listing
//!    ([`crate::pagination`])
//!
//! [`crate::build`] drives the pass and publishes the result atomically.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod enrich;
pub mod feed;
pub mod generate;
pub mod markdown;
pub mod pagination;
pub mod record;
pub mod relevance;
pub mod rss;
pub mod schema;
pub mod search;
pub mod sitemap;
pub mod taxonomy;
pub mod thumbnail;
pub mod url;
pub mod value;
pub mod write;
