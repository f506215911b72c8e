//! CLI commands for symdocs: export, refs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::config::{Config, SourceReading};
use crate::content;
use crate::error;
use crate::export::{self, ContentPool, ExportOptions};
use crate::files;
use crate::frontend::Frontend as _;
use crate::golang::{GoFrontend, GoSymbol};
use crate::href::{HrefRegistry, PageFeatures};
use crate::references::ReferenceIndex;
use crate::site::SiteRenderer;
use crate::types::{Package, PackageId, SymbolReference};

/// An analysed codebase: packages with files and contents, and the
/// reference index built over them.
struct Workspace {
    /// Project configuration.
    config: Config,
    /// Declarations and identifier resolution.
    frontend: GoFrontend,
    /// Occurrences of every symbol.
    index: ReferenceIndex<GoSymbol>,
    /// Packages in import path order.
    packages: Vec<Package>,
}

/// Discover packages below `root`, load their files, and index them.
///
/// # Errors
///
/// Returns `Error::RootNotFound`, or config loading errors.
fn analyse(root: &Path) -> Result<Workspace, error::Error> {
    if !root.is_dir() {
        return Err(error::Error::RootNotFound { path: root.to_path_buf() });
    }
    let config = Config::load(root)?;
    let frontend = GoFrontend::load(root, &config)?;

    let mut packages: Vec<Package> = frontend
        .packages()
        .into_iter()
        .enumerate()
        .map(|(slot, source)| return Package::new(PackageId(slot), source))
        .collect();
    let discovered = files::collect_source_files(&mut packages);
    files::collect_examples(&mut packages);
    let loaded = content::cache_source_files(&mut packages);
    let index = ReferenceIndex::build(&packages, &frontend);
    if index.is_empty() {
        tracing::warn!(root = %root.display(), "no identifier resolved to a package-level symbol");
    }

    tracing::info!(
        packages = discovered.packages,
        files = discovered.files,
        generated = discovered.generated,
        loaded = loaded.loaded,
        unreadable = loaded.failed,
        symbols = index.len(),
        "analysis complete"
    );
    return Ok(Workspace { config, frontend, index, packages });
}

/// Analyse `root` and export its site into `output`. Without an output
/// directory every page is rendered and discarded.
///
/// # Errors
///
/// Returns analysis errors and any fatal render or write error.
pub fn export(root: &Path, output: Option<PathBuf>, silent: bool, version: &str) -> Result<ExitCode, error::Error> {
    let ws = analyse(root)?;
    let reading = ws.config.source_reading;
    let features = PageFeatures {
        implementation_pages: reading == SourceReading::Rich,
        reference_pages: ws.config.reference_pages,
    };
    let registry = HrefRegistry::new(features, version);
    let site = SiteRenderer::new(&ws.frontend, &ws.index, &ws.packages, reading, &registry, version);
    let options = ExportOptions {
        output_dir: output.clone(),
        silent,
        surface_warnings: reading == SourceReading::External,
    };

    let summary = export::export(&registry, &site, &ContentPool::default(), &options)?;

    for warning in &summary.warnings {
        eprintln!("warning: {warning}");
    }
    match output {
        None => println!("Rendered {} documents; nothing written.", registry.registered()),
        Some(dir) => {
            println!("Wrote {} files ({} bytes) to {}", summary.pages, summary.bytes, dir.display());
            println!();
            println!("View the result with a browser, e.g.:");
            println!("  open {}", dir.join("index.html").display());
        },
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print every occurrence of the symbols matching `query` as `file:line:col`.
///
/// # Errors
///
/// Returns analysis errors.
pub fn refs(query: &str, root: &Path) -> Result<ExitCode, error::Error> {
    let ws = analyse(root)?;
    let symbols = ws.frontend.find_symbols(query);
    if symbols.is_empty() {
        eprintln!("error: no package-level symbol named `{query}`");
        return Ok(ExitCode::FAILURE);
    }

    for symbol in &symbols {
        let occurrences = ws.index.references(symbol);
        println!("{symbol} ({}): {} occurrences", symbol.kind.as_str(), occurrences.len());
        for reference in occurrences {
            if let Some(location) = format_location(&ws.packages, root, reference) {
                println!("  {location}");
            }
        }
    }
    return Ok(ExitCode::SUCCESS);
}

/// `path:line:col` of an occurrence, with the path relative to `root`.
fn format_location(packages: &[Package], root: &Path, reference: &SymbolReference) -> Option<String> {
    let file = packages
        .get(reference.file.package.0)?
        .files()
        .get(reference.file.index)?;
    let path = file.original_file.as_deref().or(file.generated_file.as_deref())?;
    let shown = path.strip_prefix(root).unwrap_or(path);
    return Some(format!("{}:{}:{}", shown.display(), reference.position.line, reference.position.column));
}
