/// Crate-level error types for symdocs.
use std::path::PathBuf;

/// Every fatal condition of an analysis or export run. Each variant names the
/// file, href, or reason for failure so the CLI can report it without context.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A page whose resource type is switched off by configuration was linked.
    #[error("{res_type} page `{path}` should not be built with the current configuration")]
    DisabledPageType {
        /// Resource path of the linked page.
        path: String,
        /// Resource type prefix of the linked page.
        res_type: &'static str,
    },

    /// A page path outside the injective domain of the page path model.
    #[error("invalid page path: {res_type}:{path}")]
    InvalidPagePath {
        /// Offending resource path.
        path: String,
        /// Resource type prefix of the page.
        res_type: &'static str,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// Tree-sitter failed to parse a source file.
    #[error("parse failed: {}: {reason}", file.display())]
    ParseFailed {
        /// File that failed to parse.
        file: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The renderer could not produce a queued page.
    #[error("build {href}: {source}")]
    RenderFailed {
        /// Request path of the page.
        href: String,
        /// What the renderer reported.
        source: RenderError,
    },

    /// The directory to analyse does not exist.
    #[error("root not found: {}", path.display())]
    RootNotFound {
        /// Path given on the command line.
        path: PathBuf,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A pipeline worker thread panicked.
    #[error("{stage} worker panicked")]
    WorkerPanicked {
        /// Name of the pipeline stage.
        stage: &'static str,
    },

    /// A generated page could not be written to the output directory.
    #[error("write {}: {source}", path.display())]
    WriteFailed {
        /// Destination file.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },
}

/// Failure status returned by a page renderer.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A link emitted while rendering was rejected by the href registry.
    #[error("link: {0}")]
    Link(
        /// The registry's error.
        Box<Error>,
    ),

    /// No page is served at the requested href.
    #[error("page not found")]
    NotFound,

    /// The renderer answered with a non-success status.
    #[error("get non-ok status code: {code}")]
    Status {
        /// Status code in HTTP terms.
        code: u16,
    },
}

impl From<Error> for RenderError {
    fn from(e: Error) -> Self {
        return Self::Link(Box::new(e));
    }
}
