//! Site export: render every reachable document and write it to disk.
//!
//! A discovery worker pops pending documents off the [`HrefRegistry`] and
//! renders them; rendering links further documents, which refills the queue.
//! Rendered pages cross a bounded channel to the writer on the calling
//! thread. The run ends when the queue is drained and the channel is empty.

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crossbeam_channel::{Receiver, Sender};

use crate::error::{Error, RenderError};
use crate::href::HrefRegistry;
use crate::page::{GenPageInfo, PagePathInfo};

/// Rendered pages that may wait for the writer at once.
pub const PIPELINE_CAPACITY: usize = 8;

/// Idle buffers kept by a [`ContentPool`] by default.
const DEFAULT_IDLE_BUFFERS: usize = 16;

/// Produces the content of a document from its request path.
pub trait Renderer: Sync {
    /// Append the content served at `href_path` to `out`.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::NotFound` when nothing is served at the path,
    /// `RenderError::Status` for other failures, and `RenderError::Link`
    /// when a link emitted while rendering was rejected.
    fn render(&self, href_path: &str, out: &mut Vec<u8>) -> Result<(), RenderError>;

    /// Non-fatal diagnostics gathered while rendering.
    fn warnings(&self) -> Vec<String> {
        return Vec::new();
    }
}

/// Reusable content buffers shared by the discovery worker and the writer.
#[derive(Debug)]
pub struct ContentPool {
    /// Cleared buffers ready for reuse.
    buffers: Mutex<Vec<Vec<u8>>>,
    /// Upper bound on retained buffers.
    max_idle: usize,
}

impl ContentPool {
    /// A pool retaining at most `max_idle` buffers.
    pub fn new(max_idle: usize) -> Self {
        return Self { buffers: Mutex::new(Vec::new()), max_idle };
    }

    /// Return a buffer to the pool. Its contents are discarded.
    pub fn collect(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        if buffers.len() < self.max_idle {
            buffers.push(buffer);
        }
    }

    /// Number of buffers waiting for reuse.
    pub fn idle(&self) -> usize {
        return self.buffers.lock().unwrap_or_else(PoisonError::into_inner).len();
    }

    /// An empty buffer, reused when one is available.
    pub fn take(&self) -> Vec<u8> {
        return self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
    }
}

impl Default for ContentPool {
    fn default() -> Self {
        return Self::new(DEFAULT_IDLE_BUFFERS);
    }
}

/// How an export run treats its output.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Destination directory. `None` renders every page without writing.
    pub output_dir: Option<PathBuf>,
    /// Suppress the per-page progress log.
    pub silent: bool,
    /// Collect the renderer's warnings into the summary.
    pub surface_warnings: bool,
}

/// Totals of an export run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Bytes written.
    pub bytes: usize,
    /// Documents written.
    pub pages: usize,
    /// Renderer diagnostics collected after the run.
    pub warnings: Vec<String>,
}

/// A rendered document on its way to the writer.
struct RenderedPage {
    /// Rendered bytes, borrowed from the pool.
    content: Vec<u8>,
    /// Destination and request path.
    page: GenPageInfo,
}

/// Generate the site reachable from the overview page.
///
/// # Errors
///
/// Returns `Error::RenderFailed` when a document cannot be rendered,
/// `Error::WriteFailed` when it cannot be written, registry errors from
/// seeding the overview, and `Error::WorkerPanicked` if discovery panics.
pub fn export<R: Renderer>(
    registry: &HrefRegistry,
    renderer: &R,
    pool: &ContentPool,
    options: &ExportOptions,
) -> Result<ExportSummary, Error> {
    let overview = PagePathInfo::overview();
    registry.link(&overview, &overview, &[])?;

    let (tx, rx) = crossbeam_channel::bounded(PIPELINE_CAPACITY);
    let mut summary = std::thread::scope(|scope| {
        let discovery = scope.spawn(move || return discover_pages(registry, renderer, pool, &tx));
        let written = write_pages(rx, pool, options);
        let discovered = discovery
            .join()
            .map_err(|_| return Error::WorkerPanicked { stage: "discovery" })?;
        discovered?;
        return written;
    })?;

    if options.surface_warnings {
        summary.warnings = renderer.warnings();
    }
    return Ok(summary);
}

/// Render pending documents until the registry queue is drained.
///
/// # Errors
///
/// Returns `Error::RenderFailed` for the first document that fails.
fn discover_pages<R: Renderer>(
    registry: &HrefRegistry,
    renderer: &R,
    pool: &ContentPool,
    tx: &Sender<RenderedPage>,
) -> Result<(), Error> {
    while let Some(page) = registry.dequeue_next() {
        tracing::debug!(href = %page.href_path, pending = registry.pending_len(), "rendering");
        let mut content = pool.take();
        if let Err(source) = renderer.render(&page.href_path, &mut content) {
            pool.collect(content);
            return Err(Error::RenderFailed { href: page.href_path, source });
        }
        if tx.send(RenderedPage { content, page }).is_err() {
            // Writer stopped on an error it reports itself.
            return Ok(());
        }
    }
    return Ok(());
}

/// Write pages as they arrive. In dry mode pages are dropped uncounted.
///
/// # Errors
///
/// Returns `Error::WriteFailed` for the first page that cannot be written.
fn write_pages(
    rx: Receiver<RenderedPage>,
    pool: &ContentPool,
    options: &ExportOptions,
) -> Result<ExportSummary, Error> {
    let mut summary = ExportSummary::default();
    for rendered in rx {
        let RenderedPage { content, page } = rendered;
        if let Some(output_dir) = &options.output_dir {
            let result = write_page(output_dir, &page.file_path, &content);
            let size = content.len();
            pool.collect(content);
            result?;
            summary.pages = summary.pages.saturating_add(1);
            summary.bytes = summary.bytes.saturating_add(size);
            if !options.silent {
                tracing::info!("Generated {} (size: {size})", page.file_path);
            }
        } else {
            tracing::debug!(href = %page.href_path, "rendered without writing");
            pool.collect(content);
        }
    }
    return Ok(summary);
}

/// Write one document below `output_dir`, creating parent directories.
///
/// # Errors
///
/// Returns `Error::WriteFailed` naming the destination file.
fn write_page(output_dir: &Path, file_path: &str, content: &[u8]) -> Result<(), Error> {
    let path = file_path.split('/').fold(output_dir.to_path_buf(), |path, segment| {
        return path.join(segment);
    });
    let to_error = |source: std::io::Error| return Error::WriteFailed { path: path.clone(), source };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(to_error)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&path)
        .map_err(to_error)?;
    file.write_all(content).map_err(to_error)?;
    return Ok(());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;
    use crate::href::PageFeatures;
    use crate::page::ResourceType;

    /// Serves an overview linking three packages; each package links back.
    struct FakeSite<'a> {
        fail_on: Option<&'static str>,
        registry: &'a HrefRegistry,
    }

    impl Renderer for FakeSite<'_> {
        fn render(&self, href_path: &str, out: &mut Vec<u8>) -> Result<(), RenderError> {
            if Some(href_path) == self.fail_on {
                return Err(RenderError::Status { code: 500 });
            }
            let current = PagePathInfo::from_href(href_path).ok_or(RenderError::NotFound)?;
            let targets = if current == PagePathInfo::overview() {
                ["a", "b", "c"]
                    .into_iter()
                    .map(|name| PagePathInfo::new(ResourceType::Package, name))
                    .collect()
            } else {
                vec![PagePathInfo::overview()]
            };
            for target in targets {
                let href = self.registry.link(&current, &target, &[])?;
                out.extend_from_slice(href.as_bytes());
                out.push(b'\n');
            }
            Ok(())
        }

        fn warnings(&self) -> Vec<String> {
            vec!["one warning".to_owned()]
        }
    }

    fn registry() -> HrefRegistry {
        HrefRegistry::new(PageFeatures { implementation_pages: false, reference_pages: false }, "0.1.0")
    }

    #[test]
    fn writes_every_reachable_document_once() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let site = FakeSite { fail_on: None, registry: &registry };
        let options = ExportOptions {
            output_dir: Some(dir.path().to_path_buf()),
            silent: true,
            surface_warnings: true,
        };

        let summary = export(&registry, &site, &ContentPool::default(), &options).unwrap();

        assert_eq!(summary.pages, 4);
        assert_eq!(registry.registered(), 4);
        assert!(registry.dequeue_next().is_none());
        let index = std::fs::read_to_string(dir.path().join("index.html")).unwrap();
        assert_eq!(index, "pkg/a.html\npkg/b.html\npkg/c.html\n");
        let back = std::fs::read_to_string(dir.path().join("pkg").join("b.html")).unwrap();
        assert_eq!(back, "../index.html\n");

        let on_disk: usize = ["index.html", "pkg/a.html", "pkg/b.html", "pkg/c.html"]
            .iter()
            .map(|p| usize::try_from(std::fs::metadata(dir.path().join(p)).unwrap().len()).unwrap())
            .sum();
        assert_eq!(summary.bytes, on_disk);
        assert_eq!(summary.warnings, ["one warning"]);
    }

    #[test]
    fn dry_run_renders_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let site = FakeSite { fail_on: None, registry: &registry };
        let pool = ContentPool::default();

        let summary = export(&registry, &site, &pool, &ExportOptions::default()).unwrap();

        assert_eq!(summary.pages, 0);
        assert_eq!(summary.bytes, 0);
        assert!(summary.warnings.is_empty());
        assert_eq!(registry.registered(), 4);
        assert!(pool.idle() >= 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn render_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry();
        let site = FakeSite { fail_on: Some("/pkg:b"), registry: &registry };
        let options = ExportOptions {
            output_dir: Some(dir.path().to_path_buf()),
            silent: true,
            surface_warnings: false,
        };

        let err = export(&registry, &site, &ContentPool::default(), &options).unwrap_err();

        assert!(matches!(
            err,
            Error::RenderFailed { ref href, source: RenderError::Status { code: 500 } } if href == "/pkg:b"
        ));
    }

    #[test]
    fn write_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "not a directory").unwrap();
        let registry = registry();
        let site = FakeSite { fail_on: None, registry: &registry };
        let options = ExportOptions { output_dir: Some(blocker), silent: true, surface_warnings: false };

        let err = export(&registry, &site, &ContentPool::default(), &options).unwrap_err();

        assert!(matches!(err, Error::WriteFailed { .. }));
    }

    #[test]
    fn pool_reuses_and_caps_buffers() {
        let pool = ContentPool::new(1);
        let mut buffer = pool.take();
        buffer.extend_from_slice(b"abc");
        pool.collect(buffer);
        pool.collect(Vec::new());
        assert_eq!(pool.idle(), 1);
        let reused = pool.take();
        assert!(reused.is_empty());
        assert!(reused.capacity() >= 3);
        assert_eq!(pool.idle(), 0);
    }
}
