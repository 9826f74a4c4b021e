//! Defines [`Site`] and [`Route`], which map every generated document to its
//! canonical URL and to its location under the output directory. The base URL
//! is carried in a [`Site`] value that is handed to each generator rather than
//! read from global state.

use crate::record::Category;
use std::path::{Path, PathBuf};
use url::{ParseError, Url};

/// The site's base URL. Stored without a trailing slash so that every route
/// can be appended as `{base}/{path}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Site {
    base: String,

    /// The base URL's path without a trailing slash; empty for a site served
    /// from the host root.
    path: String,
}

impl Site {
    /// Parses and normalizes a base URL (e.g., `https://example.org/` becomes
    /// `https://example.org`).
    pub fn parse(base: &str) -> Result<Site, ParseError> {
        let url = Url::parse(base)?;
        Ok(Site {
            base: url.as_str().trim_end_matches('/').to_owned(),
            path: url.path().trim_end_matches('/').to_owned(),
        })
    }

    /// The base URL without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The absolute URL for a route.
    pub fn url(&self, route: &Route) -> String {
        format!("{}/{}", self.base, route.path())
    }

    /// Resolves a site-relative path (`/static/x.png`) against the base URL.
    /// Absolute URLs are returned unchanged.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_owned();
        }
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    /// Host-relative path prefixes that crawlers are asked to skip:
    /// comparison pages and listing pages after the first.
    pub fn crawl_disallowed(&self) -> [String; 2] {
        [Route::Comparison(""), Route::Listing(2)].map(|route| {
            let path = route.path();
            let section = path.split('/').next().unwrap_or_default();
            format!("{}/{}/", self.path, section)
        })
    }
}

/// Every kind of document the site emits that has a page URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// The first listing page, i.e., the site root.
    Home,

    /// A listing page. Page numbers start at 1; page 1 is [`Route::Home`].
    Listing(usize),
    Post(&'a str),
    Comparison(&'a str),
    Tag(&'a str),
    Category(Category),
    TopList(Category),

    /// A static informational page rendered from markdown.
    Page(&'a str),
}

impl Route<'_> {
    /// The path relative to the site root. Every non-root path ends in a
    /// slash.
    pub fn path(&self) -> String {
        match self {
            Route::Home | Route::Listing(0) | Route::Listing(1) => String::new(),
            Route::Listing(n) => format!("page/{}/", n),
            Route::Post(slug) => format!("posts/{}/", slug),
            Route::Comparison(slug) => format!("compare/{}/", slug),
            Route::Tag(tag) => format!("tags/{}/", tag),
            Route::Category(category) => format!("category/{}/", category.slug()),
            Route::TopList(category) => format!("best/{}/", category.slug()),
            Route::Page(name) => format!("{}/", name),
        }
    }

    /// The HTML file for this route under `root`.
    pub fn file_path(&self, root: &Path) -> PathBuf {
        root.join(self.path()).join("index.html")
    }
}
