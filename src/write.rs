//! Responsible for templating and writing every HTML page of the site:
//! posts, listing pages, comparisons, hubs and static pages.

use crate::enrich::LinkGraph;
use crate::generate::{Derivatives, Hub};
use crate::markdown::StaticPage;
use crate::pagination::ListingPage;
use crate::record::{Category, PostRecord};
use crate::taxonomy::Taxonomy;
use crate::url::{Route, Site};
use crate::value::{self, object, optional_url, script_json, text, PostLinks};
use gtmpl::{Template, Value};
use std::path::Path;
use thiserror::Error;

/// One parsed template per page kind.
pub struct Templates {
    pub post: Template,
    pub index: Template,
    pub comparison: Template,
    pub tag: Template,
    pub category: Template,
    pub top_list: Template,
    pub page: Template,
}

/// Templates pages and writes them under `output_directory`.
pub struct Writer<'a> {
    pub templates: &'a Templates,
    pub site: &'a Site,

    /// Values every template can reach under `.site`: title, description,
    /// home page and feed URLs and the category navigation.
    pub site_value: Value,

    pub output_directory: &'a Path,
}

/// Builds the `.site` value shared by every page.
pub fn site_value(site: &Site, title: &str, description: &str) -> Value {
    let categories = Category::ALL
        .iter()
        .map(|category| {
            object([
                ("label", text(category.label())),
                ("url", text(&site.url(&Route::Category(*category)))),
                ("top_list_url", text(&site.url(&Route::TopList(*category)))),
            ])
        })
        .collect();
    object([
        ("title", text(title)),
        ("description", text(description)),
        ("home_page", text(&site.url(&Route::Home))),
        ("rss_url", text(&site.resolve("rss.xml"))),
        ("atom_url", text(&site.resolve("feed.atom"))),
        ("search_url", text(&site.resolve("search.json"))),
        ("static_url", text(&site.resolve("static"))),
        ("categories", Value::Array(categories)),
    ])
}

impl Writer<'_> {
    /// Templates a single page and writes it to the route's file.
    fn write_page(
        &self,
        route: &Route,
        template: &Template,
        item: Value,
        prev: &Option<String>,
        next: &Option<String>,
    ) -> Result<()> {
        let file_path = route.file_path(self.output_directory);
        if let Some(dir) = file_path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let value = object([
            ("site", self.site_value.clone()),
            ("url", text(&self.site.url(route))),
            ("item", item),
            ("prev", optional_url(prev)),
            ("next", optional_url(next)),
        ]);
        let context =
            gtmpl::Context::from(value).map_err(|e| Error::Template(e.to_string()))?;
        template
            .execute(&mut std::fs::File::create(&file_path)?, &context)
            .map_err(|e| Error::Template(e.to_string()))?;
        Ok(())
    }

    /// Writes one page per record. `prev` and `next` link to the neighbouring
    /// records in list order.
    pub fn write_posts(
        &self,
        records: &[PostRecord],
        taxonomy: &Taxonomy,
        derivatives: &Derivatives,
        links: &LinkGraph,
    ) -> Result<()> {
        for (i, record) in records.iter().enumerate() {
            let tags = taxonomy.record_hub_tags(self.site, i);
            let category_url = self.site.url(&Route::Category(record.category));
            let item = value::post(
                records,
                i,
                &PostLinks {
                    tags: &tags,
                    category_url: &category_url,
                    related: &links.related[i],
                    continue_reading: &links.continue_reading[i],
                    comparisons: links.comparisons[i]
                        .iter()
                        .map(|c| &derivatives.comparisons[*c])
                        .collect(),
                },
            );
            let prev = match i {
                0 => None,
                _ => Some(records[i - 1].url.clone()),
            };
            let next = records.get(i + 1).map(|r| r.url.clone());
            self.write_page(&Route::Post(&record.slug), &self.templates.post, item, &prev, &next)?;
        }
        Ok(())
    }

    /// Writes the paginated listing. Every page embeds the search payload.
    pub fn write_listings(
        &self,
        records: &[PostRecord],
        pages: &[ListingPage],
        search_json: &str,
    ) -> Result<()> {
        for page in pages {
            let indices: Vec<usize> = page.records.clone().collect();
            let item = object([
                ("number", text(&page.number.to_string())),
                ("records", value::summaries(records, &indices)),
                ("search", script_json(search_json)),
            ]);
            self.write_page(&page.route(), &self.templates.index, item, &page.prev, &page.next)?;
        }
        Ok(())
    }

    /// Writes comparison pages, top lists, tag hubs and category hubs.
    pub fn write_derivatives(&self, records: &[PostRecord], derivatives: &Derivatives) -> Result<()> {
        for comparison in derivatives.comparisons.iter() {
            self.write_page(
                &Route::Comparison(&comparison.slug),
                &self.templates.comparison,
                value::comparison(records, comparison),
                &None,
                &None,
            )?;
        }
        for (category, hub) in derivatives.top_lists.iter() {
            self.write_hub(&Route::TopList(*category), &self.templates.top_list, records, hub)?;
        }
        for hub in derivatives.tag_hubs.iter() {
            self.write_hub(&Route::Tag(&hub.key), &self.templates.tag, records, hub)?;
        }
        for (category, hub) in derivatives.category_hubs.iter() {
            self.write_hub(&Route::Category(*category), &self.templates.category, records, hub)?;
        }
        Ok(())
    }

    fn write_hub(
        &self,
        route: &Route,
        template: &Template,
        records: &[PostRecord],
        hub: &Hub,
    ) -> Result<()> {
        self.write_page(route, template, value::hub(records, hub), &None, &None)
    }

    pub fn write_static_page(&self, page: &StaticPage) -> Result<()> {
        let route = Route::Page(&page.name);
        let item = value::static_page(page, &self.site.url(&route));
        self.write_page(&route, &self.templates.page, item, &None, &None)
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, Error)]
pub enum Error {
    /// An error during templating.
    #[error("templating: {0}")]
    Template(String),

    /// An error writing the output files.
    #[error("writing page: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pagination::paginate;
    use crate::relevance::test::record;
    use crate::relevance::RankWeights;
    use chrono::Utc;

    fn template(source: &str) -> Template {
        let mut template = Template::default();
        template.parse(source).unwrap();
        template
    }

    fn templates() -> Templates {
        Templates {
            post: template("{{.item.summary.title}}|{{if .prev}}{{.prev}}{{end}}|{{range .item.related}}{{.url}} {{end}}"),
            index: template("{{.item.number}}:{{range .item.records}}{{.title}},{{end}}"),
            comparison: template("{{.item.title}}"),
            tag: template("{{.item.title}}"),
            category: template("{{.item.title}}"),
            top_list: template("{{.item.title}}"),
            page: template("{{.item.title}}|{{.item.body}}"),
        }
    }

    fn read(root: &Path, route: Route) -> std::io::Result<String> {
        std::fs::read_to_string(route.file_path(root))
    }

    #[test]
    fn test_write_site() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let site = Site::parse("https://example.org")?;
        let now = Utc::now();
        let records = vec![
            record("Jasper Writer", Category::WritingTools, now),
            record("Copy Writer", Category::WritingTools, now),
            record("Zapier <Bot>", Category::Automation, now),
        ];
        let taxonomy = Taxonomy::new(&records);
        let derivatives = Derivatives::new(&site, &records, &taxonomy);
        let links = LinkGraph::new(&records, &RankWeights::new(now), &derivatives.comparisons);
        let templates = templates();
        let writer = Writer {
            templates: &templates,
            site: &site,
            site_value: site_value(&site, "Example", "Reviews"),
            output_directory: dir.path(),
        };

        writer.write_posts(&records, &taxonomy, &derivatives, &links)?;
        writer.write_listings(&records, &paginate(&site, records.len(), 2), "[]")?;
        writer.write_derivatives(&records, &derivatives)?;

        let post = read(dir.path(), Route::Post("copy-writer"))?;
        assert!(post.starts_with("Copy Writer|https://example.org/posts/jasper-writer/|"));
        assert!(post.contains("https://example.org/posts/jasper-writer/ "));

        assert_eq!(
            "1:Jasper Writer,Copy Writer,",
            read(dir.path(), Route::Home)?
        );
        assert_eq!("2:Zapier &lt;Bot&gt;,", read(dir.path(), Route::Listing(2))?);
        assert_eq!(
            "Jasper Writer vs Copy Writer",
            read(dir.path(), Route::Comparison("jasper-writer-vs-copy-writer"))?
        );
        assert_eq!(
            "Posts tagged &quot;writer&quot;",
            read(dir.path(), Route::Tag("writer"))?
        );
        assert_eq!(
            "Top 10 AI Writing Tools",
            read(dir.path(), Route::TopList(Category::WritingTools))?
        );
        assert_eq!(
            "AI Image Generators",
            read(dir.path(), Route::Category(Category::ImageGenerators))?
        );
        Ok(())
    }

    #[test]
    fn test_write_static_page() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let site = Site::parse("https://example.org")?;
        let templates = templates();
        let writer = Writer {
            templates: &templates,
            site: &site,
            site_value: site_value(&site, "Example", "Reviews"),
            output_directory: dir.path(),
        };
        writer.write_static_page(&StaticPage {
            name: "about".to_owned(),
            title: "About".to_owned(),
            html: "<p>Hi</p>".to_owned(),
        })?;
        assert_eq!("About|<p>Hi</p>", read(dir.path(), Route::Page("about"))?);
        Ok(())
    }
}
