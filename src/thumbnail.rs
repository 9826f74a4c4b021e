//! Resolves a representative image for each post. Resolution is a cascade of
//! steps tried in order, stopping at the first that yields an image:
//!
//! 1. Thumbnails of a video embedded in the post body, largest first, each
//!    checked with a [`Probe`].
//! 2. An image synthesized from the title by an external [`Renderer`].
//! 3. The site-wide default image.
//!
//! A post without any video reference goes straight to the default. No step
//! can fail the build.

use crate::url::Site;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Thumbnail sizes published for every video, largest first.
const VIDEO_THUMBNAIL_SIZES: [&str; 3] = ["maxresdefault", "hqdefault", "mqdefault"];

static VIDEO_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:youtube(?:-nocookie)?\.com/(?:watch\?(?:[^\s<>]*?&(?:amp;)?)?v=|embed/|shorts/|v/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

/// Checks whether an image exists at a URL.
pub trait Probe: Sync {
    fn exists(&self, url: &str) -> bool;
}

/// Synthesizes an image for a post from its title, writing a file keyed by
/// slug and returning its path.
pub trait Renderer {
    fn render(&self, slug: &str, title: &str) -> Result<PathBuf>;
}

/// Probes with HTTP HEAD requests. Any transport error counts as "missing".
pub struct HttpProbe {
    client: reqwest::blocking::Client,
}

impl HttpProbe {
    pub fn new() -> Result<HttpProbe> {
        Ok(HttpProbe {
            client: reqwest::blocking::Client::builder()
                .timeout(PROBE_TIMEOUT)
                .build()?,
        })
    }
}

impl Probe for HttpProbe {
    fn exists(&self, url: &str) -> bool {
        match self.client.head(url).send() {
            Ok(response) => response.status().is_success(),
            Err(err) => {
                debug!(url = %url, error = %err, "thumbnail probe failed");
                false
            }
        }
    }
}

/// Runs an external program as `{command} {args..} {slug} {title} {output}`
/// and expects it to write a PNG to `{output}`.
pub struct CommandRenderer {
    pub command: String,
    pub args: Vec<String>,

    /// The directory images are written to, keyed by slug.
    pub output_directory: PathBuf,
}

impl CommandRenderer {
    pub fn output_path(output_directory: &Path, slug: &str) -> PathBuf {
        output_directory.join(format!("{}.png", slug))
    }
}

impl Renderer for CommandRenderer {
    fn render(&self, slug: &str, title: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_directory)?;
        let output = Self::output_path(&self.output_directory, slug);
        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(slug)
            .arg(title)
            .arg(&output)
            .status()?;
        match status.success() {
            true => Ok(output),
            false => Err(Error::RendererFailed(status.code())),
        }
    }
}

/// Where synthesized images are published.
pub struct Synthesis<'a> {
    pub renderer: &'a dyn Renderer,

    /// The URL prefix under which rendered files are served, e.g.
    /// `https://example.org/thumbnails`.
    pub url_prefix: String,

    /// Files at or below this size are treated as failed renders.
    pub min_bytes: u64,
}

/// Resolves thumbnails. See the module documentation for the cascade.
pub struct Resolver<'a> {
    probe: &'a dyn Probe,
    synthesis: Option<Synthesis<'a>>,

    /// The absolute URL of the site-wide default image.
    default: String,
}

impl<'a> Resolver<'a> {
    pub fn new(
        site: &Site,
        default_thumbnail: &str,
        probe: &'a dyn Probe,
        synthesis: Option<Synthesis<'a>>,
    ) -> Resolver<'a> {
        Resolver {
            probe,
            synthesis,
            default: site.resolve(default_thumbnail),
        }
    }

    pub fn default_thumbnail(&self) -> &str {
        &self.default
    }

    pub fn resolve(&self, body: &str, slug: &str, title: &str) -> String {
        let video_id = match video_id(body) {
            Some(id) => id,
            None => return self.default.clone(),
        };

        let steps: [&dyn Fn() -> Option<String>; 2] = [
            &|| self.probe_video_thumbnails(video_id),
            &|| self.synthesize(slug, title),
        ];
        steps
            .iter()
            .find_map(|step| step())
            .unwrap_or_else(|| self.default.clone())
    }

    /// Probes every candidate concurrently and returns the largest that
    /// exists.
    fn probe_video_thumbnails(&self, video_id: &str) -> Option<String> {
        let candidates = video_thumbnail_candidates(video_id);
        let probe = self.probe;
        let found: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .iter()
                .map(|url| scope.spawn(move || probe.exists(url)))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or(false))
                .collect()
        });
        candidates
            .into_iter()
            .zip(found)
            .find(|(_, exists)| *exists)
            .map(|(url, _)| url)
    }

    fn synthesize(&self, slug: &str, title: &str) -> Option<String> {
        let synthesis = self.synthesis.as_ref()?;
        let path = match synthesis.renderer.render(slug, title) {
            Ok(path) => path,
            Err(err) => {
                warn!(slug = %slug, error = %err, "thumbnail synthesis failed");
                return None;
            }
        };
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size <= synthesis.min_bytes {
            warn!(slug = %slug, size, "synthesized thumbnail is too small");
            return None;
        }
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        Some(format!(
            "{}/{}",
            synthesis.url_prefix.trim_end_matches('/'),
            file_name
        ))
    }
}

/// The first video identifier referenced anywhere in `body`.
pub fn video_id(body: &str) -> Option<&str> {
    VIDEO_PATTERN
        .captures(body)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

fn video_thumbnail_candidates(video_id: &str) -> Vec<String> {
    VIDEO_THUMBNAIL_SIZES
        .iter()
        .map(|size| format!("https://img.youtube.com/vi/{}/{}.jpg", video_id, size))
        .collect()
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure inside a thumbnail collaborator. These never escape
/// [`Resolver::resolve`].
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the HTTP client can't be constructed.
    #[error("http client: {0}")]
    Http(#[from] reqwest::Error),

    /// Returned when the renderer can't be started or its output directory
    /// can't be created.
    #[error("running renderer: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when the renderer exits unsuccessfully.
    #[error("renderer exited with status {0:?}")]
    RendererFailed(Option<i32>),
}
