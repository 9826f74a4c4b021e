//! Loads the project file (`feedsmith.yaml`) and the theme file
//! (`theme/theme.yaml`) into a [`Config`].

use crate::feed::FeedSource;
use crate::url::Site;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const PROJECT_FILE: &str = "feedsmith.yaml";

#[derive(Deserialize)]
struct PageSize(usize);
impl Default for PageSize {
    fn default() -> Self {
        PageSize(10)
    }
}

fn default_thumbnail() -> String {
    "/static/default-thumbnail.png".to_owned()
}

fn default_min_thumbnail_bytes() -> u64 {
    5 * 1024
}

fn default_true() -> bool {
    true
}

fn default_static_pages() -> Vec<String> {
    vec!["about".to_owned(), "contact".to_owned(), "privacy".to_owned()]
}

fn default_rss_items() -> usize {
    20
}

fn default_crawl_delay() -> u32 {
    10
}

/// An external program that renders a thumbnail. It's invoked as
/// `command args... slug title output-path`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Deserialize)]
struct Project {
    site_url: String,
    title: String,
    #[serde(default)]
    description: String,
    feed: String,

    #[serde(default)]
    index_page_size: PageSize,

    #[serde(default = "default_thumbnail")]
    default_thumbnail: String,

    #[serde(default)]
    thumbnail_renderer: Option<RendererConfig>,

    #[serde(default = "default_min_thumbnail_bytes")]
    min_thumbnail_bytes: u64,

    #[serde(default = "default_true")]
    synthetic_ratings: bool,

    #[serde(default = "default_static_pages")]
    static_pages: Vec<String>,

    #[serde(default = "default_rss_items")]
    rss_items: usize,

    #[serde(default = "default_crawl_delay")]
    crawl_delay: u32,
}

#[derive(Deserialize)]
struct Theme {
    post: Vec<PathBuf>,
    index: Vec<PathBuf>,
    comparison: Vec<PathBuf>,
    tag: Vec<PathBuf>,
    category: Vec<PathBuf>,
    top_list: Vec<PathBuf>,
    page: Vec<PathBuf>,
}

/// The template files for each page kind. The files for a kind are
/// concatenated before parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateFiles {
    pub post: Vec<PathBuf>,
    pub index: Vec<PathBuf>,
    pub comparison: Vec<PathBuf>,
    pub tag: Vec<PathBuf>,
    pub category: Vec<PathBuf>,
    pub top_list: Vec<PathBuf>,
    pub page: Vec<PathBuf>,
}

pub struct Config {
    pub project_root: PathBuf,
    pub site: Site,
    pub title: String,
    pub description: String,
    pub feed: FeedSource,
    pub index_page_size: usize,
    pub default_thumbnail: String,
    pub thumbnail_renderer: Option<RendererConfig>,
    pub min_thumbnail_bytes: u64,
    pub synthetic_ratings: bool,
    pub static_pages: Vec<String>,
    pub rss_items: usize,
    pub crawl_delay: u32,
    pub templates: TemplateFiles,

    /// Markdown sources for the static pages.
    pub pages_directory: PathBuf,

    /// Copied verbatim to `{output_directory}/static`.
    pub static_directory: PathBuf,
    pub output_directory: PathBuf,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for the project file.
    /// The output directory defaults to `_output` under the project root.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path, output_directory)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent, output_directory),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path
            .parent()
            .ok_or_else(|| anyhow!("Can't get parent directory for project file `{}`", path.display()))?;

        let theme_dir = project_root.join("theme");
        let theme: Theme = serde_yaml::from_reader(open(&theme_dir.join("theme.yaml"), "theme")?)?;
        let join_all = |files: Vec<PathBuf>| -> Vec<PathBuf> {
            files.iter().map(|relpath| theme_dir.join(relpath)).collect()
        };

        if project.index_page_size.0 == 0 {
            return Err(anyhow!("`index_page_size` must be at least 1"));
        }
        let site = Site::parse(&project.site_url)
            .with_context(|| format!("Parsing `site_url` `{}`", project.site_url))?;

        Ok(Config {
            project_root: project_root.to_owned(),
            site,
            title: project.title,
            description: project.description,
            feed: FeedSource::from_location(&project.feed, project_root),
            index_page_size: project.index_page_size.0,
            default_thumbnail: project.default_thumbnail,
            thumbnail_renderer: project.thumbnail_renderer,
            min_thumbnail_bytes: project.min_thumbnail_bytes,
            synthetic_ratings: project.synthetic_ratings,
            static_pages: project.static_pages,
            rss_items: project.rss_items,
            crawl_delay: project.crawl_delay,
            templates: TemplateFiles {
                post: join_all(theme.post),
                index: join_all(theme.index),
                comparison: join_all(theme.comparison),
                tag: join_all(theme.tag),
                category: join_all(theme.category),
                top_list: join_all(theme.top_list),
                page: join_all(theme.page),
            },
            pages_directory: project_root.join("pages"),
            static_directory: project_root.join("static"),
            output_directory: match output_directory {
                Some(dir) => dir.to_owned(),
                None => project_root.join("_output"),
            },
        })
    }
}

fn open(path: &Path, kind: &str) -> Result<File> {
    File::open(path).with_context(|| format!("Opening {} file `{}`", kind, path.display()))
}
