//! Writes the sitemap family (three partitioned sitemaps referenced by one
//! sitemap index) and `robots.txt`.

use crate::url::Site;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use thiserror::Error;

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// The file names of the partitioned sitemaps, in index order.
pub const POSTS_SITEMAP: &str = "sitemap-posts.xml";
pub const PAGES_SITEMAP: &str = "sitemap-pages.xml";
pub const CATEGORIES_SITEMAP: &str = "sitemap-categories.xml";
pub const SITEMAP_INDEX: &str = "sitemap.xml";

/// How often a URL is expected to change, with its crawl priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Yearly,
}

impl Frequency {
    fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Yearly => "yearly",
        }
    }
}

/// One `<url>` element.
#[derive(Clone, Debug, PartialEq)]
pub struct UrlEntry {
    pub loc: String,

    /// A date without a time, e.g. `2024-01-31`.
    pub lastmod: Option<String>,
    pub changefreq: Frequency,
    pub priority: f32,
}

impl UrlEntry {
    /// A post URL: weekly, priority 0.8.
    pub fn post(loc: String, lastmod: String) -> UrlEntry {
        UrlEntry {
            loc,
            lastmod: Some(lastmod),
            changefreq: Frequency::Weekly,
            priority: 0.8,
        }
    }

    /// A static page URL: yearly, priority 0.3.
    pub fn static_page(loc: String) -> UrlEntry {
        UrlEntry {
            loc,
            lastmod: None,
            changefreq: Frequency::Yearly,
            priority: 0.3,
        }
    }

    /// A hub URL (categories, top lists, tags): weekly, priority 0.6.
    pub fn hub(loc: String) -> UrlEntry {
        UrlEntry {
            loc,
            lastmod: None,
            changefreq: Frequency::Weekly,
            priority: 0.6,
        }
    }

    /// The site root: daily, priority 1.0.
    pub fn home(loc: String) -> UrlEntry {
        UrlEntry {
            loc,
            lastmod: None,
            changefreq: Frequency::Daily,
            priority: 1.0,
        }
    }
}

/// Writes a `<urlset>` document.
pub fn write_urlset<W: Write>(entries: &[UrlEntry], w: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(w, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("urlset").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;
    for entry in entries {
        writer.write_event(Event::Start(BytesStart::new("url")))?;
        text_element(&mut writer, "loc", &entry.loc)?;
        if let Some(lastmod) = &entry.lastmod {
            text_element(&mut writer, "lastmod", lastmod)?;
        }
        text_element(&mut writer, "changefreq", entry.changefreq.as_str())?;
        text_element(&mut writer, "priority", &format!("{:.1}", entry.priority))?;
        writer.write_event(Event::End(BytesEnd::new("url")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    Ok(())
}

/// Writes the `<sitemapindex>` referencing the partitioned sitemaps.
pub fn write_index<W: Write>(site: &Site, lastmod: &str, w: W) -> Result<()> {
    let mut writer = Writer::new_with_indent(w, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(
        BytesStart::new("sitemapindex").with_attributes([("xmlns", SITEMAP_NS)]),
    ))?;
    for file_name in [POSTS_SITEMAP, PAGES_SITEMAP, CATEGORIES_SITEMAP] {
        writer.write_event(Event::Start(BytesStart::new("sitemap")))?;
        text_element(&mut writer, "loc", &site.resolve(file_name))?;
        text_element(&mut writer, "lastmod", lastmod)?;
        writer.write_event(Event::End(BytesEnd::new("sitemap")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("sitemapindex")))?;
    Ok(())
}

/// Writes `<name>text</name>`, escaping `text`.
pub(crate) fn text_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Asks crawlers to skip comparison and pagination pages and to pace
/// themselves.
pub fn robots_txt(site: &Site, crawl_delay: u32) -> String {
    let mut out = String::from("User-agent: *\n");
    for path in site.crawl_disallowed().iter() {
        out.push_str(&format!("Disallow: {}\n", path));
    }
    out.push_str(&format!("Crawl-delay: {}\n", crawl_delay));
    out.push_str(&format!("\nSitemap: {}\n", site.resolve(SITEMAP_INDEX)));
    out
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing an XML document.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the underlying writer fails.
    #[error("writing xml: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when the XML writer rejects an event.
    #[error("writing xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    fn site() -> Site {
        Site::parse("https://example.org").unwrap()
    }

    #[test]
    fn test_urlset() -> Result<()> {
        let mut out = Vec::new();
        write_urlset(
            &[
                UrlEntry::post(
                    "https://example.org/posts/a&b/".to_owned(),
                    "2024-01-31".to_owned(),
                ),
                UrlEntry::static_page("https://example.org/about/".to_owned()),
            ],
            &mut out,
        )?;
        let xml = String::from_utf8(out).unwrap();
        assert!(xml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(xml.contains("<loc>https://example.org/posts/a&amp;b/</loc>"));
        assert!(xml.contains("<lastmod>2024-01-31</lastmod>"));
        assert!(xml.contains("<changefreq>weekly</changefreq>"));
        assert!(xml.contains("<priority>0.8</priority>"));
        assert!(xml.contains("<changefreq>yearly</changefreq>"));
        assert!(xml.contains("<priority>0.3</priority>"));
        assert_eq!(2, xml.matches("<url>").count());
        Ok(())
    }

    #[test]
    fn test_index_references_three_sitemaps() -> Result<()> {
        let mut out = Vec::new();
        write_index(&site(), "2024-01-31", &mut out)?;
        let xml = String::from_utf8(out).unwrap();
        assert_eq!(3, xml.matches("<sitemap>").count());
        assert!(xml.contains("<loc>https://example.org/sitemap-posts.xml</loc>"));
        assert!(xml.contains("<loc>https://example.org/sitemap-pages.xml</loc>"));
        assert!(xml.contains("<loc>https://example.org/sitemap-categories.xml</loc>"));
        Ok(())
    }

    #[test]
    fn test_robots() {
        assert_eq!(
            "User-agent: *\nDisallow: /compare/\nDisallow: /page/\nCrawl-delay: 10\n\nSitemap: https://example.org/sitemap.xml\n",
            robots_txt(&site(), 10)
        );
    }

    #[test]
    fn test_robots_under_base_path() -> std::result::Result<(), ::url::ParseError> {
        let site = Site::parse("https://host.example/blog")?;
        assert_eq!(
            "User-agent: *\nDisallow: /blog/compare/\nDisallow: /blog/page/\nCrawl-delay: 5\n\nSitemap: https://host.example/blog/sitemap.xml\n",
            robots_txt(&site, 5)
        );
        Ok(())
    }
}
