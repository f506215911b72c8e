//! Built-in renderer: HTML pages, JSON summaries and the stylesheet of a
//! browsable site over an analysed workspace.
//!
//! Every link goes through the [`HrefRegistry`], so rendering a page is what
//! discovers the pages it points to.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::config::SourceReading;
use crate::error::RenderError;
use crate::export::Renderer;
use crate::golang::{GoFrontend, GoSymbol, SymbolKind};
use crate::href::HrefRegistry;
use crate::page::{PagePathInfo, ResourceType};
use crate::references::ReferenceIndex;
use crate::types::{Package, SourceFileInfo, SymbolReference, bare_filename};

/// Stylesheet served at `/css:default-<version>`.
const STYLESHEET: &str = "\
body { font-family: sans-serif; margin: 2em auto; max-width: 60em; }
code, pre { font-family: monospace; }
.line { white-space: pre; }
.line-number { color: #888; display: inline-block; text-align: right; width: 4em; user-select: none; }
.kind { color: #666; }
ul.symbols li { margin: 0.2em 0; }
";

/// Status reported when a JSON summary cannot be encoded.
const ENCODE_FAILED: u16 = 500;

/// JSON summary of one package.
#[derive(serde::Serialize)]
struct ApiPackage<'a> {
    /// Import paths of discovered dependencies.
    deps: &'a [String],
    /// Runnable examples.
    examples: Vec<ApiExample<'a>>,
    /// File names of the package.
    files: Vec<&'a str>,
    /// Full import path.
    import_path: &'a str,
    /// Package clause name.
    name: &'a str,
    /// Package-scope declarations.
    symbols: Vec<ApiSymbol>,
}

/// One runnable example in a JSON package summary.
#[derive(serde::Serialize)]
struct ApiExample<'a> {
    /// Example file name.
    file: String,
    /// Function name.
    name: &'a str,
    /// Expected output, if declared.
    output: Option<&'a str>,
}

/// One declaration in a JSON package summary.
#[derive(serde::Serialize)]
struct ApiSymbol {
    /// File name holding the declaration.
    file: String,
    /// Declaration category.
    kind: SymbolKind,
    /// One-based line of the declared name.
    line: u32,
    /// `Name` or `Owner.Name`.
    name: String,
    /// Number of recorded occurrences.
    uses: usize,
}

/// Renders the pages of one export run.
#[derive(Debug)]
pub struct SiteRenderer<'a> {
    /// Declarations and symbol lookup.
    frontend: &'a GoFrontend,
    /// Occurrences of every symbol.
    index: &'a ReferenceIndex<GoSymbol>,
    /// Package slot by import path.
    package_slots: HashMap<&'a str, usize>,
    /// Packages with their files and examples.
    packages: &'a [Package],
    /// Source reading style.
    reading: SourceReading,
    /// Link registry of this run.
    registry: &'a HrefRegistry,
    /// Tool version embedded in asset names.
    version: &'a str,
    /// Non-fatal problems met while rendering.
    warnings: Mutex<Vec<String>>,
}

impl Renderer for SiteRenderer<'_> {
    fn render(&self, href_path: &str, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let current = PagePathInfo::from_href(href_path).ok_or(RenderError::NotFound)?;
        return match current.res_type {
            ResourceType::Api => self.render_api(&current, out),
            ResourceType::Css if current.res_path == format!("default-{}", self.version) => {
                out.extend_from_slice(STYLESHEET.as_bytes());
                Ok(())
            },
            ResourceType::Implementation => self.render_implementations(&current, out),
            ResourceType::None if current.res_path.is_empty() => self.render_overview(&current, out),
            ResourceType::Package => self.render_package(&current, out),
            ResourceType::Reference => self.render_references(&current, out),
            ResourceType::Source => self.render_source(&current, out),
            _ => Err(RenderError::NotFound),
        };
    }

    fn warnings(&self) -> Vec<String> {
        return self.warnings.lock().unwrap_or_else(PoisonError::into_inner).clone();
    }
}

impl<'a> SiteRenderer<'a> {
    /// A renderer over analysed packages.
    pub fn new(
        frontend: &'a GoFrontend,
        index: &'a ReferenceIndex<GoSymbol>,
        packages: &'a [Package],
        reading: SourceReading,
        registry: &'a HrefRegistry,
        version: &'a str,
    ) -> Self {
        let package_slots = packages
            .iter()
            .enumerate()
            .map(|(slot, pkg)| return (pkg.import_path(), slot))
            .collect();
        return Self {
            frontend,
            index,
            package_slots,
            packages,
            reading,
            registry,
            version,
            warnings: Mutex::new(Vec::new()),
        };
    }

    /// Link through the registry.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Link` when the registry rejects the target.
    fn link(&self, current: &PagePathInfo, target: &PagePathInfo, fragments: &[&str]) -> Result<String, RenderError> {
        return Ok(self.registry.link(current, target, fragments)?);
    }

    /// Anchor to the line of a file's source page.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Link` when the registry rejects the target.
    fn line_anchor(
        &self,
        current: &PagePathInfo,
        import_path: &str,
        file_name: &str,
        line: u32,
        text: &str,
    ) -> Result<String, RenderError> {
        let target = PagePathInfo::new(ResourceType::Source, format!("{import_path}/{file_name}"));
        let line = line.to_string();
        let href = self.link(current, &target, &["line-", &line])?;
        return Ok(anchor(&href, text));
    }

    /// Package by import path.
    fn package(&self, import_path: &str) -> Option<&'a Package> {
        return self.package_slots.get(import_path).and_then(|slot| return self.packages.get(*slot));
    }

    /// Symbol named by a `<import path>..<name>` resource path.
    fn symbol(&self, res_path: &str) -> Option<GoSymbol> {
        return self.frontend.find_symbols(res_path).into_iter().next();
    }

    /// Record a non-fatal problem.
    fn warn(&self, message: String) {
        tracing::warn!("{message}");
        self.warnings.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }

    /// Page header, with the versioned stylesheet linked.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::Link` when the stylesheet cannot be linked.
    fn open_page(&self, current: &PagePathInfo, title: &str, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let css = PagePathInfo::new(ResourceType::Css, format!("default-{}", self.version));
        let css_href = self.link(current, &css, &[])?;
        let home = self.link(current, &PagePathInfo::overview(), &[])?;
        let head = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
             <link rel=\"stylesheet\" href=\"{css}\">\n</head>\n<body>\n<nav>{home}</nav>\n<h1>{title}</h1>\n",
            title = escape(title),
            css = escape(&css_href),
            home = anchor(&home, "Overview"),
        );
        out.extend_from_slice(head.as_bytes());
        return Ok(());
    }

    /// `/`: every package.
    fn render_overview(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        self.open_page(current, "Packages", out)?;
        out.extend_from_slice(b"<ul class=\"packages\">\n");
        for pkg in self.packages {
            let target = PagePathInfo::new(ResourceType::Package, pkg.import_path());
            let href = self.link(current, &target, &[])?;
            let item = format!("<li>{}</li>\n", anchor(&href, pkg.import_path()));
            out.extend_from_slice(item.as_bytes());
        }
        out.extend_from_slice(b"</ul>\n");
        close_page(out);
        return Ok(());
    }

    /// `/pkg:<import path>`: files, examples, dependencies and declarations.
    fn render_package(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let pkg = self.package(&current.res_path).ok_or(RenderError::NotFound)?;
        let import_path = pkg.import_path();
        self.open_page(current, &format!("package {}", pkg.source.name), out)?;

        let api = self.link(current, &PagePathInfo::new(ResourceType::Api, import_path), &[])?;
        let mut body = format!("<p><code>import \"{}\"</code> ({})</p>\n", escape(import_path), anchor(&api, "JSON"));

        body.push_str("<h2>Files</h2>\n<ul>\n");
        for file in pkg.files() {
            let target = PagePathInfo::new(ResourceType::Source, format!("{import_path}/{}", file.bare_filename));
            let href = self.link(current, &target, &[])?;
            body.push_str(&format!("<li>{}</li>\n", anchor(&href, &file.bare_filename)));
        }
        body.push_str("</ul>\n");

        if !pkg.examples.is_empty() {
            body.push_str("<h2>Examples</h2>\n<ul>\n");
            for example in &pkg.examples {
                body.push_str(&format!(
                    "<li><code>{}</code> ({}:{})",
                    escape(&example.name),
                    escape(&bare_filename(&example.file)),
                    example.line
                ));
                if let Some(output) = &example.output {
                    body.push_str(&format!("<pre>{}</pre>", escape(output)));
                }
                body.push_str("</li>\n");
            }
            body.push_str("</ul>\n");
        }

        if !pkg.source.deps.is_empty() {
            body.push_str("<h2>Imports</h2>\n<ul>\n");
            for dep in &pkg.source.deps {
                let item = if self.package(dep).is_some() {
                    let href = self.link(current, &PagePathInfo::new(ResourceType::Package, dep.as_str()), &[])?;
                    anchor(&href, dep)
                } else {
                    escape(dep)
                };
                body.push_str(&format!("<li>{item}</li>\n"));
            }
            body.push_str("</ul>\n");
        }

        body.push_str("<h2>Declarations</h2>\n<ul class=\"symbols\">\n");
        let features = self.registry.features();
        for decl in self.frontend.declarations(import_path) {
            let name = decl.symbol.qualified_name();
            let mut item = format!(
                "<li><span class=\"kind\">{}</span> {}",
                decl.symbol.kind.as_str(),
                self.line_anchor(current, import_path, &bare_filename(&decl.file), decl.position.line, &name)?
            );
            if features.allows(ResourceType::Reference) {
                let uses = self.index.references(&decl.symbol).len();
                let target = PagePathInfo::new(ResourceType::Reference, decl.symbol.page_path());
                let href = self.link(current, &target, &[])?;
                item.push_str(&format!(" ({})", anchor(&href, &format!("{uses} uses"))));
            }
            if self.reading == SourceReading::Rich
                && decl.symbol.kind == SymbolKind::Type
                && !self.frontend.methods_of(&decl.symbol).is_empty()
            {
                let target = PagePathInfo::new(ResourceType::Implementation, decl.symbol.page_path());
                let href = self.link(current, &target, &[])?;
                item.push_str(&format!(" ({})", anchor(&href, "methods")));
            }
            item.push_str("</li>\n");
            body.push_str(&item);
        }
        body.push_str("</ul>\n");

        out.extend_from_slice(body.as_bytes());
        close_page(out);
        return Ok(());
    }

    /// `/api:<import path>`: JSON package summary.
    fn render_api(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let pkg = self.package(&current.res_path).ok_or(RenderError::NotFound)?;
        let summary = ApiPackage {
            deps: &pkg.source.deps,
            examples: pkg
                .examples
                .iter()
                .map(|example| {
                    return ApiExample {
                        file: bare_filename(&example.file),
                        name: &example.name,
                        output: example.output.as_deref(),
                    };
                })
                .collect(),
            files: pkg.files().iter().map(|f| return f.bare_filename.as_str()).collect(),
            import_path: pkg.import_path(),
            name: &pkg.source.name,
            symbols: self
                .frontend
                .declarations(pkg.import_path())
                .iter()
                .map(|decl| {
                    return ApiSymbol {
                        file: bare_filename(&decl.file),
                        kind: decl.symbol.kind,
                        line: decl.position.line,
                        name: decl.symbol.qualified_name(),
                        uses: self.index.references(&decl.symbol).len(),
                    };
                })
                .collect(),
        };
        serde_json::to_writer_pretty(&mut *out, &summary).map_err(|e| {
            tracing::error!(package = %pkg.import_path(), error = %e, "encode package summary");
            return RenderError::Status { code: ENCODE_FAILED };
        })?;
        out.push(b'\n');
        return Ok(());
    }

    /// `/src:<import path>/<file>`: escaped source with `line-N` anchors.
    fn render_source(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let (import_path, file_name) = current.res_path.rsplit_once('/').ok_or(RenderError::NotFound)?;
        let pkg = self.package(import_path).ok_or(RenderError::NotFound)?;
        let file = pkg
            .files()
            .iter()
            .find(|f| return f.bare_filename == file_name)
            .ok_or(RenderError::NotFound)?;
        self.open_page(current, file_name, out)?;

        let back = self.link(current, &PagePathInfo::new(ResourceType::Package, import_path), &[])?;
        let header = format!("<p>{}{}</p>\n<pre>\n", anchor(&back, import_path), generated_note(file));
        out.extend_from_slice(header.as_bytes());

        match &file.content {
            None => {
                self.warn(format!("no content for {}", current.res_path));
                out.extend_from_slice(b"<em>content unavailable</em>\n");
            },
            Some(content) => {
                let text = String::from_utf8_lossy(content);
                for (number, line) in text.lines().enumerate() {
                    let number = number.saturating_add(1);
                    let row = format!(
                        "<div class=\"line\" id=\"line-{number}\"><span class=\"line-number\">{number}</span> {}</div>\n",
                        escape(line)
                    );
                    out.extend_from_slice(row.as_bytes());
                }
            },
        }
        out.extend_from_slice(b"</pre>\n");
        close_page(out);
        return Ok(());
    }

    /// `/use:<import path>..<name>`: every occurrence of a symbol.
    fn render_references(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let symbol = self.symbol(&current.res_path).ok_or(RenderError::NotFound)?;
        self.open_page(current, &format!("Uses of {}", symbol.qualified_name()), out)?;

        let refs = self.index.references(&symbol);
        let mut body = format!("<p>{} {} in {}</p>\n<ul>\n", refs.len(), symbol.kind.as_str(), escape(&symbol.package));
        for reference in refs {
            body.push_str(&format!("<li>{}</li>\n", self.reference_item(current, reference)?));
        }
        body.push_str("</ul>\n");
        out.extend_from_slice(body.as_bytes());
        close_page(out);
        return Ok(());
    }

    /// One occurrence as `file:line:column`, linked to the source line.
    fn reference_item(&self, current: &PagePathInfo, reference: &SymbolReference) -> Result<String, RenderError> {
        let pkg = self.packages.get(reference.file.package.0).ok_or(RenderError::NotFound)?;
        let file = pkg.files().get(reference.file.index).ok_or(RenderError::NotFound)?;
        let text = format!("{}:{}:{}", file.bare_filename, reference.position.line, reference.position.column);
        return self.line_anchor(current, pkg.import_path(), &file.bare_filename, reference.position.line, &text);
    }

    /// `/imp:<import path>..<type>`: methods declared on a type.
    fn render_implementations(&self, current: &PagePathInfo, out: &mut Vec<u8>) -> Result<(), RenderError> {
        let symbol = self
            .symbol(&current.res_path)
            .filter(|s| return s.kind == SymbolKind::Type)
            .ok_or(RenderError::NotFound)?;
        self.open_page(current, &format!("Methods of {}", symbol.name), out)?;

        let mut body = String::from("<ul class=\"symbols\">\n");
        for decl in self.frontend.methods_of(&symbol) {
            let file_name = bare_filename(&decl.file);
            let link = self.line_anchor(current, &symbol.package, &file_name, decl.position.line, &decl.symbol.name)?;
            body.push_str(&format!("<li>{link}</li>\n"));
        }
        body.push_str("</ul>\n");
        out.extend_from_slice(body.as_bytes());
        close_page(out);
        return Ok(());
    }
}

/// Close the document opened by `open_page`.
fn close_page(out: &mut Vec<u8>) {
    out.extend_from_slice(b"</body>\n</html>\n");
}

/// Note shown above generated files.
fn generated_note(file: &SourceFileInfo) -> String {
    return match &file.generated_file {
        None => String::new(),
        Some(_) => format!(" (generated as <code>{}</code>)", escape(&file.ast_bare_filename())),
    };
}

/// `<a href="..">text</a>` with both parts escaped.
fn anchor(href: &str, text: &str) -> String {
    return format!("<a href=\"{}\">{}</a>", escape(href), escape(text));
}

/// Escape text for HTML element content and attribute values.
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("&quot;"),
            '&' => escaped.push_str("&amp;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    return escaped;
}
