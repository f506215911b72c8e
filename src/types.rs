/// Core domain types: packages, source files, and symbol occurrences.
use std::path::{Path, PathBuf};

use crate::frontend::PackageSource;

/// Opaque handle to a syntax tree owned by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstId(
    /// Front-end defined slot.
    pub usize,
);

/// A runnable `Example*` function from an example file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeExample {
    /// Declaring example file.
    pub file: PathBuf,
    /// One-based line of the function name.
    pub line: u32,
    /// Function name, e.g. `ExampleGreeter_Hello`.
    pub name: String,
    /// Expected output from a trailing `// Output:` comment.
    pub output: Option<String>,
}

/// Address of one source file: its package and its slot in that package's file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId {
    /// Slot in [`Package::source_files`].
    pub index: usize,
    /// Owning package.
    pub package: PackageId,
}

/// Index of a package in the workspace package list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(
    /// Slot in the package list.
    pub usize,
);

/// A compilation unit group discovered by the front-end.
/// Created once per package and mutated only as files and examples are attached.
#[derive(Debug)]
pub struct Package {
    /// Filesystem directory, set once from the first plain source file.
    directory: Option<PathBuf>,
    /// Example files (`example_*_test.go`) that parsed, collected at most once.
    pub example_files: Option<Vec<PathBuf>>,
    /// Example functions of those files, sorted by name.
    pub examples: Vec<CodeExample>,
    /// Position of this package in the package list.
    pub id: PackageId,
    /// What the front-end reported for this package.
    pub source: PackageSource,
    /// Source files, populated at most once by file discovery.
    pub source_files: Option<Vec<SourceFileInfo>>,
}

impl Package {
    /// Wrap a front-end package record.
    pub const fn new(id: PackageId, source: PackageSource) -> Self {
        return Self {
            directory: None,
            example_files: None,
            examples: Vec::new(),
            id,
            source,
            source_files: None,
        };
    }

    /// The package directory, once it has been inferred.
    pub fn directory(&self) -> Option<&Path> {
        return self.directory.as_deref();
    }

    /// Import path reported by the front-end.
    pub fn import_path(&self) -> &str {
        return &self.source.import_path;
    }

    /// Set the directory unless it is already known. Returns whether it was set.
    pub fn set_directory_once(&mut self, dir: &Path) -> bool {
        if self.directory.is_some() {
            return false;
        }
        self.directory = Some(dir.to_path_buf());
        return true;
    }

    /// Source files, or an empty slice before discovery ran.
    pub fn files(&self) -> &[SourceFileInfo] {
        return self.source_files.as_deref().unwrap_or(&[]);
    }
}

/// One-based source position of an identifier occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// One-based column, in bytes.
    pub column: u32,
    /// One-based line.
    pub line: u32,
}

/// One physical file belonging to a package.
///
/// At least one of `original_file` and `generated_file` is set. `content` is
/// the only field mutated after discovery.
#[derive(Debug, Clone)]
pub struct SourceFileInfo {
    /// Syntax tree handle for compiled files.
    pub ast: Option<AstId>,
    /// File name only, of the original file when known.
    pub bare_filename: String,
    /// Raw bytes, loaded lazily at most once.
    pub content: Option<Vec<u8>>,
    /// Path of the generation product; `None` for hand-written files.
    pub generated_file: Option<PathBuf>,
    /// Path of the human-authored file; `None` if it could not be recovered.
    pub original_file: Option<PathBuf>,
    /// Owning package (back-reference).
    pub package: PackageId,
}

impl SourceFileInfo {
    /// A hand-written file that is its own content source.
    pub fn plain(package: PackageId, path: &Path, ast: Option<AstId>) -> Self {
        return Self {
            ast,
            bare_filename: bare_filename(path),
            content: None,
            generated_file: None,
            original_file: Some(path.to_path_buf()),
            package,
        };
    }

    /// The file whose bytes back this entry: the generated file when present.
    pub fn content_path(&self) -> Option<&Path> {
        return self.generated_file.as_deref().or(self.original_file.as_deref());
    }

    /// File name the syntax tree was parsed from.
    pub fn ast_bare_filename(&self) -> String {
        return match &self.generated_file {
            Some(generated) => bare_filename(generated),
            None => self.bare_filename.clone(),
        };
    }
}

/// An occurrence of a symbol at a position in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolReference {
    /// File containing the occurrence.
    pub file: FileId,
    /// Where in the file.
    pub position: Position,
}

/// Final path component as a string, or empty.
pub fn bare_filename(path: &Path) -> String {
    return path
        .file_name()
        .map(|name| return name.to_string_lossy().into_owned())
        .unwrap_or_default();
}
