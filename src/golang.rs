//! Go front-end over tree-sitter: package discovery, package-scope
//! declarations, and best-effort identifier resolution.
//!
//! Resolution runs in two passes. The first parses every file and collects
//! the declarations of each package; the second walks every tree again and
//! resolves identifier nodes against those declarations and the file's
//! imports. Local scopes are not modelled.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use tree_sitter::{Language, Node, Parser, Tree};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::frontend::{CompiledFile, Frontend, Identifier, PackageSource, SymbolResolver};
use crate::types::{AstId, CodeExample, Position, SourceFileInfo};

/// Extensions of non-Go files that belong to a package.
const OTHER_EXTENSIONS: &[&str] = &["c", "h", "s", "S", "syso"];

/// The blank identifier; it declares and denotes nothing.
const BLANK: &str = "_";

/// Name prefix of runnable example functions.
const EXAMPLE_PREFIX: &str = "Example";

/// Leading `Output:` line of an example's last comment group.
static OUTPUT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"(?i)^\s*(unordered )?output:").expect("valid regex");
});

/// Category of a package-scope declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    /// `const` specification.
    Const,
    /// Struct field declared by embedding a type.
    EmbeddedField,
    /// Named struct field.
    Field,
    /// Top-level function.
    Func,
    /// Method of a named type or interface.
    Method,
    /// Type declaration or alias.
    Type,
    /// `var` specification.
    Var,
}

impl SymbolKind {
    /// Short lowercase label.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Const => "const",
            Self::EmbeddedField => "embedded field",
            Self::Field => "field",
            Self::Func => "func",
            Self::Method => "method",
            Self::Type => "type",
            Self::Var => "var",
        };
    }

    /// Whether symbols of this kind are reached through a selector.
    const fn is_member(self) -> bool {
        return matches!(self, Self::EmbeddedField | Self::Field | Self::Method);
    }
}

/// Identity of a package-scope Go declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GoSymbol {
    /// Declaration category.
    pub kind: SymbolKind,
    /// Declared name.
    pub name: String,
    /// Receiver, struct, or interface type for members.
    pub owner: Option<String>,
    /// Import path of the declaring package.
    pub package: String,
}

impl GoSymbol {
    /// `Name` or `Owner.Name`.
    pub fn qualified_name(&self) -> String {
        return match &self.owner {
            None => self.name.clone(),
            Some(owner) => format!("{owner}.{}", self.name),
        };
    }

    /// `<import path>..<qualified name>`, the resource path of the symbol's pages.
    pub fn page_path(&self) -> String {
        return format!("{}..{}", self.package, self.qualified_name());
    }
}

impl fmt::Display for GoSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.page_path());
    }
}

/// Where a symbol is declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Source file holding the declaration.
    pub file: PathBuf,
    /// Position of the declared name.
    pub position: Position,
    /// The declared symbol.
    pub symbol: GoSymbol,
}

/// Resolution result of one identifier node.
#[derive(Debug, Clone)]
struct ResolvedIdent {
    /// Defined or used symbol.
    object: Option<GoSymbol>,
    /// Where the identifier starts.
    position: Position,
    /// Used symbol, for identifiers that also define one (embedded fields).
    used: Option<GoSymbol>,
}

/// A package directory found on disk.
#[derive(Debug)]
struct DiscoveredPackage {
    /// Hand-written Go files, sorted.
    go_files: Vec<PathBuf>,
    /// Import path derived from the module path and the directory.
    import_path: String,
    /// Non-Go files, sorted.
    other_files: Vec<PathBuf>,
}

/// One Go file after parsing.
struct ParsedFile {
    /// Index of the owning discovered package.
    package: usize,
    /// File on disk.
    path: PathBuf,
    /// File content; empty when unreadable.
    source: String,
    /// Syntax tree; `None` when reading or parsing failed.
    tree: Option<Tree>,
}

/// An `import` specification.
#[derive(Debug, Clone)]
struct Import {
    /// Explicit package name, if any.
    alias: Option<String>,
    /// Quoted path, unquoted.
    path: String,
}

/// What the first pass learns from one file.
#[derive(Debug, Default)]
struct FileFacts {
    /// Declarations keyed by the start byte of the declared name.
    declarations: Vec<(usize, Declaration)>,
    /// Import specifications.
    imports: Vec<Import>,
    /// Name from the package clause.
    package_name: Option<String>,
}

/// Names visible at package scope, plus members reachable through selectors.
#[derive(Debug, Default)]
struct PackageScope {
    /// Top-level funcs, types, vars, and consts.
    members: HashMap<String, GoSymbol>,
    /// Methods and fields by name.
    selectors: HashMap<String, Vec<GoSymbol>>,
}

/// Everything the second pass needs to resolve identifiers of one file.
struct FileScope<'a> {
    /// Declarations of this file keyed by name start byte.
    definitions: HashMap<usize, GoSymbol>,
    /// Import name to discovered package, `None` for external packages.
    imports: HashMap<String, Option<usize>>,
    /// Owning package.
    package: usize,
    /// Scopes of every package.
    scopes: &'a [PackageScope],
    /// File content.
    source: &'a str,
}

/// Analysed Go workspace.
#[derive(Debug)]
pub struct GoFrontend {
    /// Declarations per import path, in file order.
    declarations: HashMap<String, Vec<Declaration>>,
    /// Resolved identifiers per syntax tree, in source order.
    idents: Vec<Vec<ResolvedIdent>>,
    /// Package records, sorted by import path.
    packages: Vec<PackageSource>,
}

impl GoFrontend {
    /// Discover, parse and resolve the Go packages below `root`.
    ///
    /// # Errors
    ///
    /// Returns `Error::RootNotFound` if `root` is not a directory.
    pub fn load(root: &Path, config: &Config) -> Result<Self, Error> {
        if !root.is_dir() {
            return Err(Error::RootNotFound { path: root.to_path_buf() });
        }
        let module = config.module.clone().unwrap_or_else(|| return read_module_path(root));
        let discovered = discover_packages(root, config, &module);

        let pending: Vec<(usize, PathBuf)> = discovered
            .iter()
            .enumerate()
            .flat_map(|(index, pkg)| {
                return pkg.go_files.iter().map(move |path| return (index, path.clone()));
            })
            .collect();
        let parsed: Vec<ParsedFile> = pending
            .into_par_iter()
            .map(|(package, path)| return parse_file(package, path))
            .collect();

        let facts: Vec<FileFacts> = parsed
            .par_iter()
            .map(|file| {
                let import_path = discovered.get(file.package).map_or("", |p| return p.import_path.as_str());
                return file_facts(file, import_path);
            })
            .collect();

        let mut package_names: Vec<Option<String>> = vec![None; discovered.len()];
        let mut scopes: Vec<PackageScope> = discovered.iter().map(|_| return PackageScope::default()).collect();
        for (file, file_facts) in parsed.iter().zip(&facts) {
            if let Some(slot) = package_names.get_mut(file.package)
                && slot.is_none()
            {
                slot.clone_from(&file_facts.package_name);
            }
            if let Some(scope) = scopes.get_mut(file.package) {
                for (_, decl) in &file_facts.declarations {
                    scope.insert(&decl.symbol);
                }
            }
        }

        let by_import_path: HashMap<&str, usize> = discovered
            .iter()
            .enumerate()
            .map(|(index, pkg)| return (pkg.import_path.as_str(), index))
            .collect();
        let file_imports: Vec<HashMap<String, Option<usize>>> = facts
            .iter()
            .map(|f| return import_table(&f.imports, &by_import_path, &package_names))
            .collect();

        let idents: Vec<Vec<ResolvedIdent>> = parsed
            .par_iter()
            .zip(facts.par_iter())
            .zip(file_imports.par_iter())
            .map(|((file, file_facts), imports)| {
                let Some(tree) = &file.tree else {
                    return Vec::new();
                };
                let scope = FileScope {
                    definitions: file_facts
                        .declarations
                        .iter()
                        .map(|(start, decl)| return (*start, decl.symbol.clone()))
                        .collect(),
                    imports: imports.clone(),
                    package: file.package,
                    scopes: &scopes,
                    source: &file.source,
                };
                return scope.resolve_tree(tree.root_node());
            })
            .collect();

        let mut declarations: HashMap<String, Vec<Declaration>> = HashMap::new();
        for (file, file_facts) in parsed.iter().zip(facts) {
            if let Some(pkg) = discovered.get(file.package) {
                declarations
                    .entry(pkg.import_path.clone())
                    .or_default()
                    .extend(file_facts.declarations.into_iter().map(|(_, decl)| return decl));
            }
        }

        let packages = build_package_sources(&discovered, &parsed, &file_imports, package_names);
        tracing::info!(packages = packages.len(), files = parsed.len(), module = %module, "analysed Go sources");
        return Ok(Self { declarations, idents, packages });
    }

    /// Declarations of a package, in file order.
    pub fn declarations(&self, import_path: &str) -> &[Declaration] {
        return self.declarations.get(import_path).map(Vec::as_slice).unwrap_or_default();
    }

    /// Symbols matching `query`: `Name`, `Type.Member`, or either prefixed
    /// with `<import path>..`. Sorted.
    pub fn find_symbols(&self, query: &str) -> Vec<GoSymbol> {
        let (package, name) = match query.split_once("..") {
            None => (None, query),
            Some((package, name)) => (Some(package), name),
        };
        let mut found: Vec<GoSymbol> = self
            .declarations
            .iter()
            .filter(|(import_path, _)| return package.is_none_or(|p| return p == import_path.as_str()))
            .flat_map(|(_, decls)| return decls.iter())
            .filter(|decl| return decl.symbol.qualified_name() == name)
            .map(|decl| return decl.symbol.clone())
            .collect();
        found.sort();
        found.dedup();
        return found;
    }

    /// Methods declared with `owner` as their receiver type, in file order.
    pub fn methods_of(&self, owner: &GoSymbol) -> Vec<&Declaration> {
        return self
            .declarations(&owner.package)
            .iter()
            .filter(|decl| {
                return decl.symbol.kind == SymbolKind::Method
                    && decl.symbol.owner.as_deref() == Some(owner.name.as_str());
            })
            .collect();
    }
}

impl Frontend for GoFrontend {
    fn packages(&self) -> Vec<PackageSource> {
        return self.packages.clone();
    }
}

impl SymbolResolver for GoFrontend {
    type Symbol = GoSymbol;

    fn identifiers(&self, file: &SourceFileInfo) -> Vec<Identifier> {
        let Some(AstId(ast)) = file.ast else {
            return Vec::new();
        };
        return self
            .idents
            .get(ast)
            .map(|idents| {
                return idents
                    .iter()
                    .enumerate()
                    .map(|(node, ident)| return Identifier { node, position: ident.position })
                    .collect();
            })
            .unwrap_or_default();
    }

    fn is_embedded_field(&self, symbol: &GoSymbol) -> bool {
        return symbol.kind == SymbolKind::EmbeddedField;
    }

    fn object_of(&self, file: &SourceFileInfo, ident: &Identifier) -> Option<GoSymbol> {
        return self.resolved(file, ident)?.object.clone();
    }

    fn used_object(&self, file: &SourceFileInfo, ident: &Identifier) -> Option<GoSymbol> {
        return self.resolved(file, ident)?.used.clone();
    }
}

impl GoFrontend {
    /// Resolution record behind an identifier handle.
    fn resolved(&self, file: &SourceFileInfo, ident: &Identifier) -> Option<&ResolvedIdent> {
        let AstId(ast) = file.ast?;
        return self.idents.get(ast)?.get(ident.node);
    }
}

impl PackageScope {
    /// Record a declaration. The first declaration of a name wins.
    fn insert(&mut self, symbol: &GoSymbol) {
        if symbol.kind.is_member() {
            self.selectors.entry(symbol.name.clone()).or_default().push(symbol.clone());
        } else {
            self.members.entry(symbol.name.clone()).or_insert_with(|| return symbol.clone());
        }
    }
}

impl FileScope<'_> {
    /// Resolve every identifier node of a tree, in source order.
    fn resolve_tree(&self, root: Node<'_>) -> Vec<ResolvedIdent> {
        let mut resolved = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if matches!(node.kind(), "field_identifier" | "identifier" | "type_identifier") {
                resolved.push(self.resolve_ident(node));
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
        return resolved;
    }

    /// Resolve one identifier node: definitions first, then uses.
    fn resolve_ident(&self, node: Node<'_>) -> ResolvedIdent {
        let position = node_position(node);
        if let Some(defined) = self.definitions.get(&node.start_byte()) {
            let used = if defined.kind == SymbolKind::EmbeddedField {
                self.resolve_use(node)
            } else {
                None
            };
            return ResolvedIdent { object: Some(defined.clone()), position, used };
        }
        return ResolvedIdent { object: self.resolve_use(node), position, used: None };
    }

    /// The package-scope symbol an identifier node refers to.
    fn resolve_use(&self, node: Node<'_>) -> Option<GoSymbol> {
        let text = node_text(node, self.source)?;
        if text == BLANK {
            return None;
        }
        let parent = node.parent();
        return match node.kind() {
            "field_identifier" => {
                let parent = parent.filter(|p| return p.kind() == "selector_expression")?;
                let operand = parent.child_by_field_name("operand")?;
                if operand.kind() == "identifier"
                    && let Some(imported) = node_text(operand, self.source).and_then(|n| return self.imports.get(n))
                {
                    return self.member_of(*imported.as_ref()?, text, |_| return true);
                }
                self.unique_selector(text)
            },
            "identifier" => {
                if let Some(parent) = parent
                    && parent.kind() == "selector_expression"
                    && is_field_child(parent, "operand", node)
                    && self.imports.contains_key(text)
                {
                    return None;
                }
                self.member_of(self.package, text, |_| return true)
            },
            "type_identifier" => {
                let is_type = |kind: SymbolKind| return kind == SymbolKind::Type;
                if let Some(parent) = parent
                    && parent.kind() == "qualified_type"
                {
                    let package = parent.child_by_field_name("package")?;
                    let imported = self.imports.get(node_text(package, self.source)?)?;
                    return self.member_of(*imported.as_ref()?, text, is_type);
                }
                self.member_of(self.package, text, is_type)
            },
            _ => None,
        };
    }

    /// A top-level name of one package, if its kind is accepted.
    fn member_of(&self, package: usize, name: &str, accept: impl Fn(SymbolKind) -> bool) -> Option<GoSymbol> {
        let symbol = self.scopes.get(package)?.members.get(name)?;
        if !accept(symbol.kind) {
            return None;
        }
        return Some(symbol.clone());
    }

    /// The only method or field with this name in the file's package and
    /// the packages it imports.
    fn unique_selector(&self, name: &str) -> Option<GoSymbol> {
        let mut candidates: Vec<&GoSymbol> = Vec::new();
        let visible = std::iter::once(self.package).chain(self.imports.values().filter_map(|p| return *p));
        for package in visible {
            if let Some(symbols) = self.scopes.get(package).and_then(|s| return s.selectors.get(name)) {
                candidates.extend(symbols);
            }
        }
        candidates.sort();
        candidates.dedup();
        return match candidates.as_slice() {
            [only] => Some((*only).clone()),
            _ => None,
        };
    }
}

/// Module path from the `module` line of `go.mod`, or empty.
fn read_module_path(root: &Path) -> String {
    let go_mod = root.join("go.mod");
    let content = match std::fs::read_to_string(&go_mod) {
        Err(e) => {
            tracing::debug!(path = %go_mod.display(), error = %e, "no go.mod; using directory import paths");
            return String::new();
        },
        Ok(content) => content,
    };
    return content
        .lines()
        .find_map(|line| return line.trim().strip_prefix("module "))
        .map(|module| return module.trim().trim_matches('"').to_owned())
        .unwrap_or_default();
}

/// Walk `root` and group Go and other files by directory.
fn discover_packages(root: &Path, config: &Config, module: &str) -> Vec<DiscoveredPackage> {
    let mut by_dir: BTreeMap<String, DiscoveredPackage> = BTreeMap::new();
    let walker = WalkDir::new(root).sort_by_file_name().into_iter().filter_entry(|entry| {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        return config.should_scan(&relative_dir(root, entry.path()));
    });

    for entry in walker {
        let entry = match entry {
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            },
            Ok(entry) => entry,
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy();
        let is_go = name.ends_with(".go") && !name.ends_with("_test.go");
        let is_other = path
            .extension()
            .and_then(|ext| return ext.to_str())
            .is_some_and(|ext| return OTHER_EXTENSIONS.contains(&ext));
        if !is_go && !is_other {
            continue;
        }
        let Some(dir) = path.parent() else {
            continue;
        };
        let rel = relative_dir(root, dir);
        let pkg = by_dir.entry(rel.clone()).or_insert_with(|| {
            return DiscoveredPackage {
                go_files: Vec::new(),
                import_path: import_path_for(root, module, &rel),
                other_files: Vec::new(),
            };
        });
        if is_go {
            pkg.go_files.push(path.to_path_buf());
        } else {
            pkg.other_files.push(path.to_path_buf());
        }
    }

    let mut packages: Vec<DiscoveredPackage> = by_dir
        .into_values()
        .filter(|pkg| return !pkg.go_files.is_empty())
        .collect();
    packages.sort_by(|a, b| return a.import_path.cmp(&b.import_path));
    return packages;
}

/// Slash-separated path of `dir` relative to `root`; empty for the root itself.
fn relative_dir(root: &Path, dir: &Path) -> String {
    let rel = dir.strip_prefix(root).unwrap_or(dir);
    return rel
        .components()
        .map(|c| return c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
}

/// Import path of the package in `rel`.
fn import_path_for(root: &Path, module: &str, rel: &str) -> String {
    return match (module.is_empty(), rel.is_empty()) {
        (false, false) => format!("{module}/{rel}"),
        (false, true) => module.to_owned(),
        (true, false) => rel.to_owned(),
        (true, true) => root
            .canonicalize()
            .ok()
            .and_then(|p| return p.file_name().map(|n| return n.to_string_lossy().into_owned()))
            .unwrap_or_else(|| return "main".to_owned()),
    };
}

/// Read and parse one file. Failures are logged and leave the tree empty.
fn parse_file(package: usize, path: PathBuf) -> ParsedFile {
    let source = match std::fs::read_to_string(&path) {
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "cannot read Go file");
            return ParsedFile { package, path, source: String::new(), tree: None };
        },
        Ok(source) => source,
    };
    let tree = match parse_go(&path, &source) {
        Err(e) => {
            tracing::error!(error = %e, "keeping file without a syntax tree");
            None
        },
        Ok(tree) => {
            if tree.root_node().has_error() {
                tracing::debug!(path = %path.display(), "syntax errors; resolving what parsed");
            }
            Some(tree)
        },
    };
    return ParsedFile { package, path, source, tree };
}

/// Parse Go source into a tree-sitter tree.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the language cannot be set or parsing fails.
fn parse_go(file_path: &Path, source: &str) -> Result<Tree, Error> {
    let language: Language = tree_sitter_go::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language).map_err(|e| {
        return Error::ParseFailed { file: file_path.to_path_buf(), reason: e.to_string() };
    })?;
    return parser.parse(source, None).ok_or_else(|| {
        return Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "tree-sitter returned None".to_owned(),
        };
    });
}

/// Runnable example functions of one example file, sorted by name.
///
/// An example is a top-level `Example`, `ExampleName` or `ExampleType_Method`
/// function without parameters or results. Its expected output is the text
/// of the last comment group in its body when that group opens with
/// `Output:`.
///
/// # Errors
///
/// Returns `Error::ParseFailed` if the file does not parse cleanly.
pub fn parse_examples(file_path: &Path, source: &str) -> Result<Vec<CodeExample>, Error> {
    let tree = parse_go(file_path, source)?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(Error::ParseFailed {
            file: file_path.to_path_buf(),
            reason: "syntax errors".to_owned(),
        });
    }

    let mut examples = Vec::new();
    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        if node.kind() != "function_declaration" || node.child_by_field_name("result").is_some() {
            continue;
        }
        let takes_params = node
            .child_by_field_name("parameters")
            .is_some_and(|params| return params.named_child_count() > 0);
        let Some(name) = node.child_by_field_name("name") else {
            continue;
        };
        let Some(text) = node_text(name, source) else {
            continue;
        };
        if takes_params || !is_example_name(text) {
            continue;
        }
        examples.push(CodeExample {
            file: file_path.to_path_buf(),
            line: node_position(name).line,
            name: text.to_owned(),
            output: node.child_by_field_name("body").and_then(|body| return example_output(body, source)),
        });
    }
    examples.sort_by(|a, b| return a.name.cmp(&b.name));
    return Ok(examples);
}

/// `Example` alone, or followed by anything but a lowercase letter.
fn is_example_name(name: &str) -> bool {
    return name
        .strip_prefix(EXAMPLE_PREFIX)
        .is_some_and(|rest| return !rest.starts_with(|c: char| return c.is_lowercase()));
}

/// Expected output declared by the last comment group of an example body.
fn example_output(body: Node<'_>, source: &str) -> Option<String> {
    let mut comments = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "comment" {
            comments.push(node);
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }

    // Consecutive-line comments form one group.
    let mut group: Vec<&str> = Vec::new();
    let mut next_row = None;
    for comment in comments.iter().rev() {
        if let Some(row) = next_row
            && comment.end_position().row.saturating_add(1) != row
        {
            break;
        }
        next_row = Some(comment.start_position().row);
        group.push(comment_text(node_text(*comment, source)?));
    }
    group.reverse();

    let text = group.join("\n");
    let found = OUTPUT_PREFIX.find(&text)?;
    return Some(text.get(found.end()..)?.trim().to_owned());
}

/// A comment without its markers.
fn comment_text(comment: &str) -> &str {
    if let Some(line) = comment.strip_prefix("//") {
        return line.strip_prefix(' ').unwrap_or(line);
    }
    return comment
        .strip_prefix("/*")
        .and_then(|inner| return inner.strip_suffix("*/"))
        .unwrap_or(comment)
        .trim();
}

/// First pass over one file: package clause, imports, declarations.
fn file_facts(file: &ParsedFile, import_path: &str) -> FileFacts {
    let Some(tree) = &file.tree else {
        return FileFacts::default();
    };
    let root = tree.root_node();
    let source = file.source.as_str();
    let mut facts = FileFacts::default();
    let mut declare = |name: Node<'_>, kind: SymbolKind, owner: Option<&str>| {
        if let Some(text) = node_text(name, source)
            && text != BLANK
        {
            let symbol = GoSymbol {
                kind,
                name: text.to_owned(),
                owner: owner.map(str::to_owned),
                package: import_path.to_owned(),
            };
            let decl = Declaration { file: file.path.clone(), position: node_position(name), symbol };
            facts.declarations.push((name.start_byte(), decl));
        }
    };

    let mut cursor = root.walk();
    for node in root.named_children(&mut cursor) {
        match node.kind() {
            "const_declaration" | "var_declaration" => {
                let kind = if node.kind() == "const_declaration" { SymbolKind::Const } else { SymbolKind::Var };
                for spec in value_specs(node) {
                    let mut names = spec.walk();
                    for name in spec.children_by_field_name("name", &mut names) {
                        declare(name, kind, None);
                    }
                }
            },
            "function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    declare(name, SymbolKind::Func, None);
                }
            },
            "method_declaration" => {
                let owner = node
                    .child_by_field_name("receiver")
                    .and_then(|receiver| return receiver_type_name(receiver, source));
                if let Some(name) = node.child_by_field_name("name") {
                    declare(name, SymbolKind::Method, owner.as_deref());
                }
            },
            "type_declaration" => {
                let mut specs = node.walk();
                for spec in node.named_children(&mut specs) {
                    if !matches!(spec.kind(), "type_alias" | "type_spec") {
                        continue;
                    }
                    let Some(name) = spec.child_by_field_name("name") else {
                        continue;
                    };
                    declare(name, SymbolKind::Type, None);
                    if let (Some(owner), Some(ty)) = (node_text(name, source), spec.child_by_field_name("type")) {
                        collect_type_members(ty, owner, source, &mut declare);
                    }
                }
            },
            _ => {},
        }
    }
    facts.package_name = package_clause_name(root, source);
    facts.imports = collect_imports(root, source);
    return facts;
}

/// `const_spec` / `var_spec` nodes of a declaration, grouped or not.
fn value_specs(declaration: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    let mut cursor = declaration.walk();
    for child in declaration.named_children(&mut cursor) {
        match child.kind() {
            "const_spec" | "var_spec" => specs.push(child),
            "var_spec_list" => {
                let mut inner = child.walk();
                specs.extend(child.named_children(&mut inner).filter(|n| return n.kind() == "var_spec"));
            },
            _ => {},
        }
    }
    return specs;
}

/// Fields, embedded fields, and interface methods of a type literal.
fn collect_type_members<'tree>(
    ty: Node<'tree>,
    owner: &str,
    source: &str,
    declare: &mut impl FnMut(Node<'tree>, SymbolKind, Option<&str>),
) {
    let mut cursor = ty.walk();
    match ty.kind() {
        "interface_type" => {
            for elem in ty.named_children(&mut cursor) {
                if matches!(elem.kind(), "method_elem" | "method_spec")
                    && let Some(name) = elem.child_by_field_name("name")
                {
                    declare(name, SymbolKind::Method, Some(owner));
                }
            }
        },
        "struct_type" => {
            let Some(list) = ty.named_children(&mut cursor).find(|n| return n.kind() == "field_declaration_list")
            else {
                return;
            };
            let mut fields = list.walk();
            for field in list.named_children(&mut fields) {
                if field.kind() != "field_declaration" {
                    continue;
                }
                let mut names_cursor = field.walk();
                let names: Vec<Node<'tree>> = field.children_by_field_name("name", &mut names_cursor).collect();
                if !names.is_empty() {
                    for name in names {
                        declare(name, SymbolKind::Field, Some(owner));
                    }
                    continue;
                }
                if let Some(embedded) = field.child_by_field_name("type").and_then(type_name_node)
                    && node_text(embedded, source).is_some()
                {
                    declare(embedded, SymbolKind::EmbeddedField, Some(owner));
                }
            }
        },
        _ => {},
    }
}

/// The `type_identifier` naming a type expression, through pointers,
/// qualifications and instantiations.
fn type_name_node(ty: Node<'_>) -> Option<Node<'_>> {
    return match ty.kind() {
        "generic_type" => ty.child_by_field_name("type").and_then(type_name_node),
        "pointer_type" => {
            let mut cursor = ty.walk();
            let inner = ty.named_children(&mut cursor).next();
            inner.and_then(type_name_node)
        },
        "qualified_type" => ty.child_by_field_name("name"),
        "type_identifier" => Some(ty),
        _ => None,
    };
}

/// Name of the receiver's base type.
fn receiver_type_name(receiver: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = receiver.walk();
    let param = receiver
        .named_children(&mut cursor)
        .find(|n| return n.kind() == "parameter_declaration")?;
    let name = param.child_by_field_name("type").and_then(type_name_node)?;
    return node_text(name, source).map(str::to_owned);
}

/// Name in the file's package clause.
fn package_clause_name(root: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root.named_children(&mut cursor).find(|n| return n.kind() == "package_clause")?;
    let mut inner = clause.walk();
    let name = clause
        .named_children(&mut inner)
        .find(|n| return n.kind() == "package_identifier")?;
    return node_text(name, source).map(str::to_owned);
}

/// Every import specification of a file.
fn collect_imports(root: Node<'_>, source: &str) -> Vec<Import> {
    let mut imports = Vec::new();
    let mut cursor = root.walk();
    for decl in root.named_children(&mut cursor) {
        if decl.kind() != "import_declaration" {
            continue;
        }
        let mut specs = Vec::new();
        let mut inner = decl.walk();
        for child in decl.named_children(&mut inner) {
            match child.kind() {
                "import_spec" => specs.push(child),
                "import_spec_list" => {
                    let mut list = child.walk();
                    specs.extend(child.named_children(&mut list).filter(|n| return n.kind() == "import_spec"));
                },
                _ => {},
            }
        }
        for spec in specs {
            let Some(path) = spec.child_by_field_name("path").and_then(|p| return node_text(p, source)) else {
                continue;
            };
            let alias = spec
                .child_by_field_name("name")
                .and_then(|n| return node_text(n, source))
                .map(str::to_owned);
            imports.push(Import { alias, path: path.trim_matches(['"', '`']).to_owned() });
        }
    }
    return imports;
}

/// Map the names a file uses for its imports to discovered packages.
/// Dot and blank imports introduce no name.
fn import_table(
    imports: &[Import],
    by_import_path: &HashMap<&str, usize>,
    package_names: &[Option<String>],
) -> HashMap<String, Option<usize>> {
    let mut table = HashMap::new();
    for import in imports {
        let package = by_import_path.get(import.path.as_str()).copied();
        let name = match &import.alias {
            Some(alias) if alias == "." || alias == "_" => continue,
            Some(alias) => alias.clone(),
            None => package
                .and_then(|index| return package_names.get(index).cloned().flatten())
                .unwrap_or_else(|| return last_segment(&import.path).to_owned()),
        };
        table.insert(name, package);
    }
    return table;
}

/// Assemble the package records handed to the indexer.
fn build_package_sources(
    discovered: &[DiscoveredPackage],
    parsed: &[ParsedFile],
    file_imports: &[HashMap<String, Option<usize>>],
    package_names: Vec<Option<String>>,
) -> Vec<PackageSource> {
    let mut sources: Vec<PackageSource> = discovered
        .iter()
        .zip(package_names)
        .map(|(pkg, name)| {
            return PackageSource {
                compiled_files: Vec::new(),
                deps: Vec::new(),
                go_files: pkg.go_files.clone(),
                import_path: pkg.import_path.clone(),
                name: name.unwrap_or_else(|| return last_segment(&pkg.import_path).to_owned()),
                other_files: pkg.other_files.clone(),
            };
        })
        .collect();

    for (ast, (file, imports)) in parsed.iter().zip(file_imports).enumerate() {
        let Some(source) = sources.get_mut(file.package) else {
            continue;
        };
        source.compiled_files.push(CompiledFile {
            ast: file.tree.as_ref().map(|_| return AstId(ast)),
            path: file.path.clone(),
        });
        for dep in imports.values().filter_map(|p| return *p) {
            if dep != file.package
                && let Some(target) = discovered.get(dep)
            {
                source.deps.push(target.import_path.clone());
            }
        }
    }
    for source in &mut sources {
        source.deps.sort();
        source.deps.dedup();
    }
    return sources;
}

/// Last `/`-separated segment of an import path.
fn last_segment(path: &str) -> &str {
    return path.rsplit('/').next().unwrap_or(path);
}

/// Source text of a node.
fn node_text<'s>(node: Node<'_>, source: &'s str) -> Option<&'s str> {
    return source.get(node.start_byte()..node.end_byte());
}

/// One-based position of a node's first byte.
fn node_position(node: Node<'_>) -> Position {
    let point = node.start_position();
    return Position {
        column: u32::try_from(point.column.saturating_add(1)).unwrap_or(u32::MAX),
        line: u32::try_from(point.row.saturating_add(1)).unwrap_or(u32::MAX),
    };
}

/// Whether `child` is the node stored under `field` of `parent`.
fn is_field_child(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    return parent.child_by_field_name(field).is_some_and(|n| return n.id() == child.id());
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use std::fs;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", "module example.com/app\n\ngo 1.22\n");
        write(
            dir.path(),
            "shapes/shapes.go",
            "package shapes\n\ntype Base struct {\n\tID int\n}\n\ntype Circle struct {\n\tBase\n\tRadius float64\n}\n\nfunc (c Circle) Area() float64 {\n\treturn c.Radius * c.Radius * 3\n}\n\nconst Unit = 1\n",
        );
        write(dir.path(), "shapes/asm_amd64.s", "// asm\n");
        write(dir.path(), "shapes/shapes_test.go", "package shapes\n");
        write(
            dir.path(),
            "main.go",
            "package main\n\nimport (\n\t\"fmt\"\n\n\t\"example.com/app/shapes\"\n)\n\nvar Default = shapes.Circle{}\n\nfunc main() {\n\tfmt.Println(Default.Area(), shapes.Unit)\n}\n",
        );
        write(dir.path(), "vendor/x/x.go", "package x\n");
        dir
    }

    fn symbol(kind: SymbolKind, package: &str, owner: Option<&str>, name: &str) -> GoSymbol {
        GoSymbol {
            kind,
            name: name.to_owned(),
            owner: owner.map(str::to_owned),
            package: package.to_owned(),
        }
    }

    #[test]
    fn discovers_packages_with_module_paths() {
        let dir = workspace();
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();
        let packages = frontend.packages();

        let paths: Vec<&str> = packages.iter().map(|p| p.import_path.as_str()).collect();
        assert_eq!(paths, ["example.com/app", "example.com/app/shapes"]);

        let shapes = &packages[1];
        assert_eq!(shapes.name, "shapes");
        assert_eq!(shapes.go_files.len(), 1);
        assert_eq!(shapes.other_files.len(), 1);
        assert!(shapes.compiled_files[0].ast.is_some());
        assert_eq!(packages[0].deps, ["example.com/app/shapes"]);
        assert!(shapes.deps.is_empty());
    }

    #[test]
    fn module_override_and_exclude() {
        let dir = workspace();
        let config = Config::parse("module = \"corp/app\"\nexclude = [\"shapes\"]\n").unwrap();
        let frontend = GoFrontend::load(dir.path(), &config).unwrap();
        let paths: Vec<String> = frontend.packages().into_iter().map(|p| p.import_path).collect();
        assert_eq!(paths, ["corp/app"]);
    }

    #[test]
    fn collects_package_scope_declarations() {
        let dir = workspace();
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();
        let names: Vec<String> = frontend
            .declarations("example.com/app/shapes")
            .iter()
            .map(|d| format!("{} {}", d.symbol.kind.as_str(), d.symbol.qualified_name()))
            .collect();
        assert_eq!(
            names,
            [
                "type Base",
                "field Base.ID",
                "type Circle",
                "embedded field Circle.Base",
                "field Circle.Radius",
                "method Circle.Area",
                "const Unit",
            ]
        );
    }

    #[test]
    fn resolves_qualified_and_selector_uses() {
        let dir = workspace();
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();
        let packages = frontend.packages();
        let main_file = SourceFileInfo::plain(
            crate::types::PackageId(0),
            &packages[0].go_files[0],
            packages[0].compiled_files[0].ast,
        );

        let resolved: Vec<(u32, GoSymbol)> = frontend
            .identifiers(&main_file)
            .iter()
            .filter_map(|ident| Some((ident.position.line, frontend.object_of(&main_file, ident)?)))
            .collect();

        let shapes = "example.com/app/shapes";
        assert!(resolved.contains(&(9, symbol(SymbolKind::Type, shapes, None, "Circle"))));
        assert!(resolved.contains(&(12, symbol(SymbolKind::Method, shapes, Some("Circle"), "Area"))));
        assert!(resolved.contains(&(12, symbol(SymbolKind::Const, shapes, None, "Unit"))));
        assert!(resolved.contains(&(12, symbol(SymbolKind::Var, "example.com/app", None, "Default"))));
        // Imported package names and external packages resolve to nothing.
        assert!(!resolved.iter().any(|(_, s)| s.name == "shapes" || s.name == "fmt" || s.name == "Println"));
    }

    #[test]
    fn embedded_field_resolves_to_field_and_type() {
        let dir = workspace();
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();
        let packages = frontend.packages();
        let shapes = &packages[1];
        let file = SourceFileInfo::plain(crate::types::PackageId(1), &shapes.go_files[0], shapes.compiled_files[0].ast);

        let embedded = frontend
            .identifiers(&file)
            .into_iter()
            .find(|ident| ident.position.line == 8)
            .unwrap();
        let object = frontend.object_of(&file, &embedded).unwrap();
        assert!(frontend.is_embedded_field(&object));
        assert_eq!(object.qualified_name(), "Circle.Base");
        assert_eq!(
            frontend.used_object(&file, &embedded),
            Some(symbol(SymbolKind::Type, "example.com/app/shapes", None, "Base"))
        );
    }

    #[test]
    fn finds_symbols_by_query() {
        let dir = workspace();
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();
        assert_eq!(frontend.find_symbols("Circle.Area").len(), 1);
        assert_eq!(frontend.find_symbols("example.com/app/shapes..Unit").len(), 1);
        assert!(frontend.find_symbols("example.com/app..Unit").is_empty());

        let circle = frontend.find_symbols("Circle").remove(0);
        let methods: Vec<&str> = frontend.methods_of(&circle).iter().map(|d| d.symbol.name.as_str()).collect();
        assert_eq!(methods, ["Area"]);
        assert_eq!(circle.page_path(), "example.com/app/shapes..Circle");
    }

    #[test]
    fn blank_identifiers_are_never_indexed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "go.mod", "module example.com/b\n");
        write(
            dir.path(),
            "b.go",
            "package b\n\nvar _ = 1\n\ntype T struct {\n\t_ int\n}\n\nfunc Sum(xs []int) {\n\tfor _, x := range xs {\n\t\t_ = x\n\t}\n}\n",
        );
        let frontend = GoFrontend::load(dir.path(), &Config::default()).unwrap();

        let names: Vec<String> =
            frontend.declarations("example.com/b").iter().map(|d| d.symbol.qualified_name()).collect();
        assert_eq!(names, ["T", "Sum"]);

        let mut packages: Vec<crate::types::Package> = frontend
            .packages()
            .into_iter()
            .enumerate()
            .map(|(slot, source)| crate::types::Package::new(crate::types::PackageId(slot), source))
            .collect();
        crate::files::collect_source_files(&mut packages);
        let index = crate::references::ReferenceIndex::build(&packages, &frontend);
        assert!(frontend.find_symbols("_").is_empty());
        assert!(index.references(&symbol(SymbolKind::Var, "example.com/b", None, "_")).is_empty());
        assert_eq!(index.references(&symbol(SymbolKind::Func, "example.com/b", None, "Sum")).len(), 1);
    }

    #[test]
    fn parses_example_functions_and_output() {
        let source = "package foo_test\n\nimport \"fmt\"\n\nfunc ExampleT_Run() {\n\tfmt.Println(\"a\")\n\t// Output:\n\t// a\n\t// b\n}\n\nfunc Example() {\n\t// unordered output: x\n}\n\nfunc Examples() {}\n\nfunc ExampleHelper(t int) {}\n\nfunc ExampleNoOutput() {\n\t// just a note\n}\n";

        let examples = parse_examples(Path::new("example_t_test.go"), source).unwrap();

        let names: Vec<&str> = examples.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Example", "ExampleNoOutput", "ExampleT_Run"]);
        assert_eq!(examples[0].output.as_deref(), Some("x"));
        assert_eq!(examples[1].output, None);
        assert_eq!(examples[2].output.as_deref(), Some("a\nb"));
        assert_eq!(examples[2].line, 5);
    }

    #[test]
    fn example_with_syntax_errors_is_rejected() {
        let err = parse_examples(Path::new("example_bad_test.go"), "package foo_test\n\nfunc Example( {\n").unwrap_err();
        assert!(matches!(err, Error::ParseFailed { .. }));
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = GoFrontend::load(&dir.path().join("nope"), &Config::default()).unwrap_err();
        assert!(matches!(err, Error::RootNotFound { .. }));
    }
}
