//! Source file discovery per package, including origin recovery for files
//! produced by a code generation step.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::bytes::Regex;
use walkdir::WalkDir;

use crate::frontend::CompiledFile;
use crate::golang;
use crate::types::{Package, PackageId, SourceFileInfo, bare_filename};

/// Number of leading lines searched for a line directive.
pub const MAX_DIRECTIVE_SCAN_LINES: usize = 8;

/// Go convention for machine-generated files.
static GENERATED_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^// Code generated .*DO NOT EDIT\.$").expect("valid regex");
});

/// `//line file:line[:col]` position directive, with or without the space.
static LINE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^// ?line (.+)$").expect("valid regex");
});

/// Counters reported after discovery.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Files recorded across all packages.
    pub files: usize,
    /// Compiled files that were generation products.
    pub generated: usize,
    /// Packages whose file list was populated by this pass.
    pub packages: usize,
}

/// What origin recovery learned about a compiled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// No generation marker: the file is not a known generation product.
    NotGenerated,
    /// The human-authored file the content was generated from.
    Recovered(String),
    /// Marked as generated, but no line directive within the scan window.
    Unknown,
}

/// Populate every package's file list: compiled files first, then the
/// package's other files. Packages that already have a file list are left alone.
pub fn collect_source_files(packages: &mut [Package]) -> DiscoveryStats {
    let mut stats = DiscoveryStats::default();

    for pkg in packages.iter_mut() {
        if let Some(first) = pkg.source.go_files.first()
            && let Some(dir) = first.parent()
        {
            let dir = dir.to_path_buf();
            pkg.set_directory_once(&dir);
        }

        if pkg.source_files.is_some() {
            continue;
        }

        let files = discover_package_files(pkg.id, &pkg.source.compiled_files, &pkg.source.other_files);
        stats.generated = stats
            .generated
            .saturating_add(files.iter().filter(|f| return f.generated_file.is_some()).count());
        stats.files = stats.files.saturating_add(files.len());
        stats.packages = stats.packages.saturating_add(1);

        if pkg.directory().is_none()
            && let Some(dir) = files
                .iter()
                .find_map(|f| return f.original_file.as_deref().and_then(Path::parent))
        {
            let dir = dir.to_path_buf();
            pkg.set_directory_once(&dir);
        }

        tracing::debug!(package = %pkg.import_path(), files = files.len(), "collected source files");
        pkg.source_files = Some(files);
    }

    return stats;
}

/// Build the ordered file list of one package.
fn discover_package_files(
    package: PackageId,
    compiled: &[CompiledFile],
    other: &[PathBuf],
) -> Vec<SourceFileInfo> {
    let mut files = Vec::with_capacity(compiled.len().saturating_add(other.len()));

    for file in compiled {
        if is_plain_source(&file.path) {
            files.push(SourceFileInfo::plain(package, &file.path, file.ast));
        } else {
            files.push(generated_file_info(package, &file.path, file.ast));
        }
    }

    for path in other {
        files.push(SourceFileInfo::plain(package, path, None));
    }

    return files;
}

/// Compiled files without the source suffix are generation products.
fn is_plain_source(path: &Path) -> bool {
    return path.extension().is_some_and(|ext| return ext == "go");
}

/// Describe a generated compiled file, recovering the file it came from.
/// An unreadable file is kept with empty content.
pub fn generated_file_info(
    package: PackageId,
    path: &Path,
    ast: Option<crate::types::AstId>,
) -> SourceFileInfo {
    let (content, origin) = match std::fs::read(path) {
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "cannot read generated file");
            (Vec::new(), Origin::NotGenerated)
        },
        Ok(bytes) => {
            let origin = recover_origin(&bytes);
            (bytes, origin)
        },
    };

    let original_file = match origin {
        Origin::NotGenerated => None,
        Origin::Recovered(file) => Some(PathBuf::from(file)),
        Origin::Unknown => {
            tracing::warn!(
                path = %path.display(),
                "file looks generated but its original file was not found"
            );
            None
        },
    };

    let bare = original_file.as_deref().map_or_else(|| return bare_filename(path), bare_filename);

    return SourceFileInfo {
        ast,
        bare_filename: bare,
        content: Some(content),
        generated_file: Some(path.to_path_buf()),
        original_file,
        package,
    };
}

/// Find the original file named by the first line directive of a generated file.
///
/// The content must carry the generation marker within the scan window. The
/// directive's trailing `:<line>` and optional `:<col>` fields are stripped.
/// Nested comments, `/*line */` directives and later directives are not
/// understood.
pub fn recover_origin(content: &[u8]) -> Origin {
    let window: Vec<&[u8]> = content
        .split(|b| return *b == b'\n')
        .take(MAX_DIRECTIVE_SCAN_LINES)
        .map(|line| return line.strip_suffix(b"\r").unwrap_or(line))
        .collect();

    if !window.iter().any(|line| return GENERATED_MARKER.is_match(line)) {
        return Origin::NotGenerated;
    }

    for line in &window {
        let Some(caps) = LINE_DIRECTIVE.captures(line) else {
            continue;
        };
        let Some(target) = caps.get(1) else {
            continue;
        };
        let target = String::from_utf8_lossy(target.as_bytes());
        if let Some(file) = strip_position_suffix(target.trim()) {
            return Origin::Recovered(file.to_owned());
        }
    }

    return Origin::Unknown;
}

/// Strip `:<line>` and an optional preceding `:<col>` from a directive target.
/// Returns `None` when there is no numeric line field.
fn strip_position_suffix(target: &str) -> Option<&str> {
    let (rest, line) = target.rsplit_once(':')?;
    if !is_number(line) {
        return None;
    }
    let file = match rest.rsplit_once(':') {
        Some((file, col)) if is_number(col) => file,
        _ => rest,
    };
    if file.is_empty() {
        return None;
    }
    return Some(file);
}

/// Non-empty and all ASCII digits.
fn is_number(s: &str) -> bool {
    return !s.is_empty() && s.bytes().all(|b| return b.is_ascii_digit());
}

/// Collect and parse `example_*_test.go` files directly inside each package
/// directory. A package's list is filled at most once; walk errors leave it
/// empty, and files that cannot be read or parsed are logged and skipped.
pub fn collect_examples(packages: &mut [Package]) {
    for pkg in packages.iter_mut() {
        if pkg.example_files.is_some() {
            continue;
        }
        let candidates = match pkg.directory() {
            None => Vec::new(),
            Some(dir) => example_files_in(dir, pkg.import_path()),
        };

        let mut parsed = Vec::with_capacity(candidates.len());
        let mut examples = Vec::new();
        for path in candidates {
            let source = match std::fs::read_to_string(&path) {
                Err(e) => {
                    tracing::warn!(package = %pkg.import_path(), path = %path.display(), error = %e, "cannot read example file");
                    continue;
                },
                Ok(source) => source,
            };
            match golang::parse_examples(&path, &source) {
                Err(e) => {
                    tracing::warn!(package = %pkg.import_path(), error = %e, "skipping example file");
                },
                Ok(found) => {
                    examples.extend(found);
                    parsed.push(path);
                },
            }
        }
        examples.sort_by(|a, b| return a.name.cmp(&b.name));
        pkg.example_files = Some(parsed);
        pkg.examples = examples;
    }
}

/// List example files of one directory, sorted by name.
fn example_files_in(dir: &Path, import_path: &str) -> Vec<PathBuf> {
    let mut examples = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Err(e) => {
                tracing::warn!(package = %import_path, dir = %dir.display(), error = %e, "walk package dir");
                return Vec::new();
            },
            Ok(entry) => entry,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if name.starts_with("example_") && name.ends_with("_test.go") {
            examples.push(entry.path().to_path_buf());
        }
    }
    examples.sort();
    return examples;
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;
    use crate::frontend::PackageSource;
    use crate::types::AstId;

    const CGO_HEADER: &str = "// Code generated by cmd/cgo; DO NOT EDIT.\n";

    #[test]
    fn recovers_origin_from_line_directive() {
        let content = format!("{CGO_HEADER}\n// line foo/bar.go:10:2\npackage foo\n");
        assert_eq!(recover_origin(content.as_bytes()), Origin::Recovered("foo/bar.go".to_owned()));
    }

    #[test]
    fn recovers_origin_without_column() {
        let content = format!("{CGO_HEADER}//line /src/pkg/a.go:1\r\npackage a\n");
        assert_eq!(recover_origin(content.as_bytes()), Origin::Recovered("/src/pkg/a.go".to_owned()));
    }

    #[test]
    fn directive_outside_window_is_unknown() {
        let mut content = CGO_HEADER.to_owned();
        for _ in 0..MAX_DIRECTIVE_SCAN_LINES {
            content.push('\n');
        }
        content.push_str("//line foo/bar.go:10:2\n");
        assert_eq!(recover_origin(content.as_bytes()), Origin::Unknown);
    }

    #[test]
    fn unmarked_content_is_not_generated() {
        let content = "package foo\n//line foo/bar.go:10:2\n";
        assert_eq!(recover_origin(content.as_bytes()), Origin::NotGenerated);
    }

    #[test]
    fn directive_without_line_number_is_skipped() {
        let content = format!("{CGO_HEADER}//line nonsense\n//line real.go:3\n");
        assert_eq!(recover_origin(content.as_bytes()), Origin::Recovered("real.go".to_owned()));
    }

    fn package_with(dir: &Path, compiled: &[&str], other: &[&str]) -> Package {
        let source = PackageSource {
            compiled_files: compiled
                .iter()
                .enumerate()
                .map(|(i, name)| CompiledFile { ast: Some(AstId(i)), path: dir.join(name) })
                .collect(),
            go_files: compiled
                .iter()
                .filter(|name| name.ends_with(".go"))
                .map(|name| dir.join(name))
                .collect(),
            import_path: "example.com/foo".to_owned(),
            name: "foo".to_owned(),
            other_files: other.iter().map(|name| dir.join(name)).collect(),
            ..PackageSource::default()
        };
        Package::new(PackageId(0), source)
    }

    #[test]
    fn generated_file_keeps_both_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package foo\n").unwrap();
        std::fs::write(
            dir.path().join("cgo-gen"),
            format!("{CGO_HEADER}//line foo/bar.go:10:2\npackage foo\n"),
        )
        .unwrap();
        std::fs::write(dir.path().join("x.c"), "int x;\n").unwrap();

        let mut packages = vec![package_with(dir.path(), &["a.go", "cgo-gen"], &["x.c"])];
        let stats = collect_source_files(&mut packages);

        assert_eq!(stats, DiscoveryStats { files: 3, generated: 1, packages: 1 });
        let files = packages[0].files();
        assert_eq!(files[0].bare_filename, "a.go");
        assert!(files[0].generated_file.is_none());
        assert_eq!(files[1].bare_filename, "bar.go");
        assert_eq!(files[1].original_file.as_deref(), Some(Path::new("foo/bar.go")));
        assert_eq!(files[1].generated_file.as_deref(), Some(dir.path().join("cgo-gen").as_path()));
        assert!(files[1].content.is_some());
        assert_eq!(files[1].ast_bare_filename(), "cgo-gen");
        assert_eq!(files[2].bare_filename, "x.c");
        assert!(files[2].ast.is_none());
        assert_eq!(packages[0].directory(), Some(dir.path()));
    }

    #[test]
    fn unreadable_generated_file_has_empty_content() {
        let dir = tempfile::tempdir().unwrap();
        let info = generated_file_info(PackageId(0), &dir.path().join("missing"), None);
        assert_eq!(info.content.as_deref(), Some(&[][..]));
        assert!(info.original_file.is_none());
        assert_eq!(info.bare_filename, "missing");
    }

    #[test]
    fn discovery_is_idempotent_and_directory_is_set_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package foo\n").unwrap();
        let mut packages = vec![package_with(dir.path(), &["a.go"], &[])];

        let first = collect_source_files(&mut packages);
        packages[0].source.go_files = vec![PathBuf::from("/elsewhere/b.go")];
        let second = collect_source_files(&mut packages);

        assert_eq!(first.packages, 1);
        assert_eq!(second.packages, 0);
        assert_eq!(packages[0].files().len(), 1);
        assert_eq!(packages[0].directory(), Some(dir.path()));
    }

    #[test]
    fn collects_example_files_without_recursing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package foo\n").unwrap();
        std::fs::write(dir.path().join("example_b_test.go"), "package foo_test\n").unwrap();
        std::fs::write(dir.path().join("example_a_test.go"), "package foo_test\n").unwrap();
        std::fs::write(dir.path().join("plain_test.go"), "package foo\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/example_c_test.go"), "package sub\n").unwrap();

        let mut packages = vec![package_with(dir.path(), &["a.go"], &[])];
        collect_source_files(&mut packages);
        collect_examples(&mut packages);

        let names: Vec<String> = packages[0]
            .example_files
            .as_deref()
            .unwrap()
            .iter()
            .map(|p| bare_filename(p))
            .collect();
        assert_eq!(names, ["example_a_test.go", "example_b_test.go"]);
    }

    #[test]
    fn parses_examples_and_skips_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.go"), "package foo\n").unwrap();
        std::fs::write(
            dir.path().join("example_ok_test.go"),
            "package foo_test\n\nfunc ExampleRun() {\n\t// Output: done\n}\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("example_binary_test.go"), [0xff_u8, 0xfe, 0x00]).unwrap();
        std::fs::write(dir.path().join("example_broken_test.go"), "package foo_test\n\nfunc Example( {\n").unwrap();

        let mut packages = vec![package_with(dir.path(), &["a.go"], &[])];
        collect_source_files(&mut packages);
        collect_examples(&mut packages);

        let files: Vec<String> = packages[0]
            .example_files
            .as_deref()
            .unwrap()
            .iter()
            .map(|p| bare_filename(p))
            .collect();
        assert_eq!(files, ["example_ok_test.go"]);
        assert_eq!(packages[0].examples.len(), 1);
        assert_eq!(packages[0].examples[0].name, "ExampleRun");
        assert_eq!(packages[0].examples[0].output.as_deref(), Some("done"));
    }
}
