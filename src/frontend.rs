//! Seams to the language front-end: package listing and identifier resolution.
//!
//! The indexer never constructs symbols itself. It asks a [`Frontend`] what
//! packages exist and a [`SymbolResolver`] what each identifier denotes.

use std::hash::Hash;
use std::path::PathBuf;

use crate::types::{AstId, Position, SourceFileInfo};

/// A compiled file and the handle of its syntax tree, if it parsed.
#[derive(Debug, Clone)]
pub struct CompiledFile {
    /// Handle to the front-end's syntax tree.
    pub ast: Option<AstId>,
    /// Path of the file handed to the compiler.
    pub path: PathBuf,
}

/// Everything the front-end knows about one package before indexing.
#[derive(Debug, Clone, Default)]
pub struct PackageSource {
    /// Files compiled into the package, plain or generated.
    pub compiled_files: Vec<CompiledFile>,
    /// Import paths of packages this one depends on.
    pub deps: Vec<String>,
    /// Hand-written source files of the package.
    pub go_files: Vec<PathBuf>,
    /// Full import path.
    pub import_path: String,
    /// Package name from the package clause.
    pub name: String,
    /// Non-source files living in the package directory.
    pub other_files: Vec<PathBuf>,
}

/// Supplies the package list of an analysed codebase.
pub trait Frontend {
    /// Packages in a stable order.
    fn packages(&self) -> Vec<PackageSource>;
}

/// One identifier node of a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    /// Front-end defined slot, used to answer later resolution queries.
    pub node: usize,
    /// Where the identifier starts.
    pub position: Position,
}

/// Resolves identifier nodes to symbols, the way a type checker's
/// definition and use tables would.
pub trait SymbolResolver: Sync {
    /// Opaque symbol identity.
    type Symbol: Clone + Eq + Hash + Send;

    /// Identifier nodes of the file's syntax tree, in source order.
    fn identifiers(&self, file: &SourceFileInfo) -> Vec<Identifier>;

    /// Whether the symbol is a struct field declared by embedding a type.
    fn is_embedded_field(&self, symbol: &Self::Symbol) -> bool;

    /// The symbol the identifier defines or uses.
    fn object_of(&self, file: &SourceFileInfo, ident: &Identifier) -> Option<Self::Symbol>;

    /// The symbol the identifier uses, for identifiers that both define and use.
    fn used_object(&self, file: &SourceFileInfo, ident: &Identifier) -> Option<Self::Symbol>;
}
