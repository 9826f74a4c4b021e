//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: fetching the feed
//! ([`crate::feed`]), deriving records ([`crate::record`]), enriching and
//! cross-linking them ([`crate::enrich`], [`crate::generate`]), rendering
//! every page ([`crate::write`]) and emitting the site indices
//! ([`crate::sitemap`], [`crate::rss`], [`crate::search`]).
//!
//! Output is written to a staging directory beside the output directory and
//! only replaces the previous output once everything has been written, so a
//! failed build leaves the last good site in place.

use crate::config::{Config, TemplateFiles};
use crate::enrich::{enrich, LinkGraph};
use crate::feed::{self, fetch_entries, write_atom, AtomConfig, RawEntry};
use crate::generate::Derivatives;
use crate::markdown;
use crate::pagination::paginate;
use crate::record::{PostRecord, RecordBuilder};
use crate::relevance::RankWeights;
use crate::rss::{most_recent, write_rss, Channel};
use crate::search;
use crate::sitemap::{self, UrlEntry};
use crate::taxonomy::Taxonomy;
use crate::thumbnail::{self, CommandRenderer, HttpProbe, Probe, Renderer, Resolver, Synthesis};
use crate::url::Route;
use crate::write::{self, site_value, Templates, Writer};
use chrono::{DateTime, Utc};
use gtmpl::Template;
use rand::Rng;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Counts reported at the end of a build.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub records: usize,
    pub comparisons: usize,
    pub tag_hubs: usize,
    pub listing_pages: usize,
    pub static_pages: usize,
}

/// Builds the site from a [`Config`], probing video thumbnails over HTTP and
/// synthesizing fallbacks with the configured renderer, if any.
pub fn build_site(config: &Config) -> Result<Summary> {
    let probe = HttpProbe::new()?;
    let staging = staging_directory(&config.output_directory)?;
    let renderer = config
        .thumbnail_renderer
        .as_ref()
        .map(|renderer| CommandRenderer {
            command: renderer.command.clone(),
            args: renderer.args.clone(),
            output_directory: staging.join("thumbnails"),
        });
    build_site_with(
        config,
        &probe,
        renderer.as_ref().map(|r| r as &dyn Renderer),
        Utc::now(),
        &mut rand::rng(),
    )
}

/// Builds the site with the given thumbnail collaborators, build time and
/// random source. Renderers should write into the staging directory's
/// `thumbnails` folder so their output is published with the site.
pub fn build_site_with<R: Rng + ?Sized>(
    config: &Config,
    probe: &dyn Probe,
    renderer: Option<&dyn Renderer>,
    now: DateTime<Utc>,
    rng: &mut R,
) -> Result<Summary> {
    // Nothing touches the filesystem until the feed and the templates have
    // loaded.
    let entries = fetch_entries(&config.feed)?;
    let templates = parse_templates(&config.templates)?;

    let staging = staging_directory(&config.output_directory)?;
    rmdir(&staging)?;
    std::fs::create_dir_all(&staging)?;

    let site = Staged {
        config,
        templates: &templates,
        root: &staging,
        now,
    };
    let summary = match site.render(entries, probe, renderer, rng) {
        Ok(summary) => summary,
        Err(err) => {
            if let Err(clean) = rmdir(&staging) {
                warn!(error = %clean, "failed to remove staging directory");
            }
            return Err(err);
        }
    };

    rmdir(&config.output_directory)?;
    std::fs::rename(&staging, &config.output_directory)?;
    info!(
        output = %config.output_directory.display(),
        records = summary.records,
        comparisons = summary.comparisons,
        tag_hubs = summary.tag_hubs,
        listing_pages = summary.listing_pages,
        static_pages = summary.static_pages,
        "built site"
    );
    Ok(summary)
}

/// `{parent}/.{name}.staging` for an output directory `{parent}/{name}`.
pub fn staging_directory(output_directory: &Path) -> Result<PathBuf> {
    match output_directory.file_name() {
        Some(name) => Ok(output_directory.with_file_name(format!(
            ".{}.staging",
            name.to_string_lossy()
        ))),
        None => Err(Error::InvalidOutputDirectory(output_directory.to_owned())),
    }
}

/// A build in progress, writing under `root`.
struct Staged<'a> {
    config: &'a Config,
    templates: &'a Templates,
    root: &'a Path,
    now: DateTime<Utc>,
}

impl Staged<'_> {
    fn render<R: Rng + ?Sized>(
        &self,
        entries: Vec<RawEntry>,
        probe: &dyn Probe,
        renderer: Option<&dyn Renderer>,
        rng: &mut R,
    ) -> Result<Summary> {
        let config = self.config;
        let site = &config.site;

        let resolver = Resolver::new(
            site,
            &config.default_thumbnail,
            probe,
            renderer.map(|renderer| Synthesis {
                renderer,
                url_prefix: site.resolve("thumbnails"),
                min_bytes: config.min_thumbnail_bytes,
            }),
        );
        let builder = RecordBuilder::new(site, &config.title, self.now, config.synthetic_ratings);
        let mut records = builder.build_all(entries, &resolver, rng);
        info!(records = records.len(), "built records");

        enrich(&mut records);
        let taxonomy = Taxonomy::new(&records);
        let derivatives = Derivatives::new(site, &records, &taxonomy);
        let links = LinkGraph::new(&records, &RankWeights::new(self.now), &derivatives.comparisons);
        info!(
            comparisons = derivatives.comparisons.len(),
            tag_hubs = derivatives.tag_hubs.len(),
            "derived pages"
        );

        serde_json::to_writer_pretty(self.create("posts.json")?, &records)?;

        let writer = Writer {
            templates: self.templates,
            site,
            site_value: site_value(site, &config.title, &config.description),
            output_directory: self.root,
        };
        writer.write_posts(&records, &taxonomy, &derivatives, &links)?;
        let pages = paginate(site, records.len(), config.index_page_size);
        let search_json = serde_json::to_string(&search::entries(&records))?;
        writer.write_listings(&records, &pages, &search_json)?;
        writer.write_derivatives(&records, &derivatives)?;
        let static_pages = self.write_static_pages(&writer)?;

        self.write_sitemaps(&records, &derivatives, &static_pages)?;
        self.write_feeds(&records)?;
        std::fs::write(
            self.root.join("robots.txt"),
            sitemap::robots_txt(site, config.crawl_delay),
        )?;
        search::write_index(&records, self.create("search.json")?)?;
        if config.static_directory.exists() {
            copy_dir(&config.static_directory, &self.root.join("static"))?;
        }

        Ok(Summary {
            records: records.len(),
            comparisons: derivatives.comparisons.len(),
            tag_hubs: derivatives.tag_hubs.len(),
            listing_pages: pages.len(),
            static_pages: static_pages.len(),
        })
    }

    fn create(&self, file_name: &str) -> Result<BufWriter<File>> {
        Ok(BufWriter::new(File::create(self.root.join(file_name))?))
    }

    /// Renders the configured static pages, skipping any without a source
    /// file. Returns the names of the pages written.
    fn write_static_pages(&self, writer: &Writer) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for name in self.config.static_pages.iter() {
            let page = markdown::read_page(&self.config.pages_directory, name).map_err(|err| {
                Error::StaticPage {
                    name: name.clone(),
                    err,
                }
            })?;
            match page {
                Some(page) => {
                    writer.write_static_page(&page)?;
                    written.push(page.name);
                }
                None => warn!(page = %name, "static page source is missing; skipping"),
            }
        }
        Ok(written)
    }

    fn write_sitemaps(
        &self,
        records: &[PostRecord],
        derivatives: &Derivatives,
        static_pages: &[String],
    ) -> Result<()> {
        let site = &self.config.site;

        let posts: Vec<UrlEntry> = records
            .iter()
            .map(|record| {
                UrlEntry::post(
                    record.url.clone(),
                    record.last_modified_at.format("%Y-%m-%d").to_string(),
                )
            })
            .collect();

        let mut pages = vec![UrlEntry::home(site.url(&Route::Home))];
        pages.extend(
            static_pages
                .iter()
                .map(|name| UrlEntry::static_page(site.url(&Route::Page(name)))),
        );

        let categories: Vec<UrlEntry> = derivatives
            .category_hubs
            .iter()
            .chain(derivatives.top_lists.iter())
            .map(|(_, hub)| hub)
            .chain(derivatives.tag_hubs.iter())
            .map(|hub| UrlEntry::hub(hub.url.clone()))
            .collect();

        sitemap::write_urlset(&posts, self.create(sitemap::POSTS_SITEMAP)?)?;
        sitemap::write_urlset(&pages, self.create(sitemap::PAGES_SITEMAP)?)?;
        sitemap::write_urlset(&categories, self.create(sitemap::CATEGORIES_SITEMAP)?)?;
        sitemap::write_index(
            site,
            &self.now.format("%Y-%m-%d").to_string(),
            self.create(sitemap::SITEMAP_INDEX)?,
        )?;
        Ok(())
    }

    /// Writes `rss.xml` and `feed.atom` with the most recent records.
    fn write_feeds(&self, records: &[PostRecord]) -> Result<()> {
        let config = self.config;
        let home_page = config.site.url(&Route::Home);
        let recent = most_recent(records, config.rss_items);
        write_rss(
            &Channel {
                title: &config.title,
                link: &home_page,
                description: &config.description,
            },
            &recent,
            self.create("rss.xml")?,
        )?;
        write_atom(
            &AtomConfig {
                title: &config.title,
                home_page: &home_page,
                updated: self.now,
            },
            &recent,
            self.create("feed.atom")?,
        )?;
        Ok(())
    }
}

fn parse_templates(files: &TemplateFiles) -> Result<Templates> {
    Ok(Templates {
        post: parse_template(files.post.iter())?,
        index: parse_template(files.index.iter())?,
        comparison: parse_template(files.comparison.iter())?,
        tag: parse_template(files.tag.iter())?,
        category: parse_template(files.category.iter())?,
        top_list: parse_template(files.top_list.iter())?,
        page: parse_template(files.page.iter())?,
    })
}

// Loads the template files, concatenates their contents and parses the
// result into a template.
fn parse_template<P: AsRef<Path>>(template_files: impl Iterator<Item = P>) -> Result<Template> {
    let mut contents = String::new();
    for template_file in template_files {
        let template_file = template_file.as_ref();
        let source =
            std::fs::read_to_string(template_file).map_err(|err| Error::OpenTemplateFile {
                path: template_file.to_owned(),
                err,
            })?;
        contents.push_str(&source);
        contents.push(' ');
    }

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|e| Error::ParseTemplate(e.to_string()))?;
    Ok(template)
}

/// Recursively copies `src` into `dst`.
fn copy_dir(src: &Path, dst: &Path) -> Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the feed can't be fetched or parsed, or when the site
    /// feed can't be written.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// Returned when the thumbnail probe's HTTP client can't be built.
    #[error(transparent)]
    Thumbnail(#[from] thumbnail::Error),

    /// Returned for errors templating or writing pages.
    #[error(transparent)]
    Write(#[from] write::Error),

    /// Returned for errors writing sitemaps or the RSS feed.
    #[error(transparent)]
    Xml(#[from] sitemap::Error),

    /// Returned when a static page source exists but can't be parsed.
    #[error("static page `{name}`: {err}")]
    StaticPage {
        name: String,
        #[source]
        err: markdown::Error,
    },

    /// Returned when the record snapshot or search index can't be
    /// serialized.
    #[error("writing json: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned for I/O problems while cleaning output directories.
    #[error("cleaning directory '{}': {err}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for I/O problems while opening template files.
    #[error("opening template file '{}': {err}", .path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors parsing template files.
    #[error("parsing template: {0}")]
    ParseTemplate(String),

    /// Returned when the output directory has no file name to stage beside
    /// (e.g., `/`).
    #[error("invalid output directory '{}'", .0.display())]
    InvalidOutputDirectory(PathBuf),

    /// Returned when the static directory can't be walked.
    #[error("copying static files: {0}")]
    Walk(#[from] walkdir::Error),

    /// Returned for other I/O errors.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::feed::FeedSource;
    use crate::thumbnail::test_support::Offline;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demo_config(output: &Path) -> anyhow::Result<Config> {
        let demo = Path::new(env!("CARGO_MANIFEST_DIR")).join("demo");
        Config::from_directory(&demo, Some(output))
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn build(config: &Config) -> Result<Summary> {
        build_site_with(config, &Offline, None, now(), &mut StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_build_demo() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site");
        let config = demo_config(&output)?;
        let summary = build(&config)?;

        assert_eq!(
            Summary {
                records: 6,
                comparisons: 12,
                tag_hubs: 5,
                listing_pages: 2,
                static_pages: 3,
            },
            summary
        );

        for file in [
            "index.html",
            "page/2/index.html",
            "posts/jasper-ai-writer-review/index.html",
            "compare/jasper-ai-writer-review-vs-copy-ai-writer-review/index.html",
            "tags/writer/index.html",
            "category/ai-image-generators/index.html",
            "best/automation-tools/index.html",
            "about/index.html",
            "sitemap.xml",
            "sitemap-posts.xml",
            "sitemap-pages.xml",
            "sitemap-categories.xml",
            "rss.xml",
            "feed.atom",
            "robots.txt",
            "search.json",
            "posts.json",
            "static/default-thumbnail.png",
        ] {
            assert!(output.join(file).is_file(), "missing {}", file);
        }
        assert!(!staging_directory(&output)?.exists());

        let snapshot: Vec<PostRecord> =
            serde_json::from_reader(File::open(output.join("posts.json"))?)?;
        assert_eq!(6, snapshot.len());
        assert_eq!("Jasper AI Writer Review", snapshot[0].title);
        assert_eq!(vec!["Is Jasper worth the price?"], snapshot[0].faqs);
        assert_eq!(3, snapshot[0].structured_data.len());
        assert!(snapshot.iter().all(|r| r.thumbnail == "https://example.org/static/default-thumbnail.png"));

        let posts_sitemap = std::fs::read_to_string(output.join("sitemap-posts.xml"))?;
        assert_eq!(6, posts_sitemap.matches("<url>").count());
        assert!(posts_sitemap.contains("<lastmod>2024-06-01</lastmod>"));

        let search: serde_json::Value =
            serde_json::from_reader(File::open(output.join("search.json"))?)?;
        assert_eq!(6, search.as_array().map(Vec::len).unwrap_or(0));
        Ok(())
    }

    #[test]
    fn test_failed_fetch_keeps_previous_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site");
        std::fs::create_dir_all(&output)?;
        std::fs::write(output.join("index.html"), "previous")?;

        let mut config = demo_config(&output)?;
        config.feed = FeedSource::Local(dir.path().join("missing.atom"));
        assert!(matches!(build(&config), Err(Error::Feed(_))));
        assert_eq!("previous", std::fs::read_to_string(output.join("index.html"))?);
        assert!(!staging_directory(&output)?.exists());
        Ok(())
    }

    #[test]
    fn test_rebuild_replaces_previous_output() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site");
        std::fs::create_dir_all(&output)?;
        std::fs::write(output.join("stale.html"), "stale")?;

        let config = demo_config(&output)?;
        build(&config)?;
        assert!(!output.join("stale.html").exists());
        assert!(output.join("index.html").is_file());
        Ok(())
    }

    #[test]
    fn test_missing_static_page_is_skipped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("site");
        let mut config = demo_config(&output)?;
        config.static_pages.push("careers".to_owned());
        let summary = build(&config)?;
        assert_eq!(3, summary.static_pages);
        assert!(!output.join("careers/index.html").exists());
        Ok(())
    }

    #[test]
    fn test_staging_directory() -> Result<()> {
        assert_eq!(
            PathBuf::from("/srv/.site.staging"),
            staging_directory(Path::new("/srv/site"))?
        );
        assert!(staging_directory(Path::new("/")).is_err());
        Ok(())
    }
}
