//! Canonical identity of generated documents and their on-disk paths.

use crate::error::Error;

/// Extension of every document type missing from [`ResourceType::extension`]'s table.
pub const MARKUP_EXTENSION: &str = ".html";

/// Closed set of document categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    /// Machine-readable package summaries.
    Api,
    /// Stylesheets.
    Css,
    /// Package dependency listings.
    Dependency,
    /// Method implementation listings.
    Implementation,
    /// Scripts.
    Js,
    /// Top-level pages, served from the site root.
    None,
    /// Package detail pages.
    Package,
    /// Raster images.
    Png,
    /// Symbol usage listings.
    Reference,
    /// Source file views.
    Source,
    /// Vector images.
    Svg,
}

impl ResourceType {
    /// Prefix used in hrefs and as the output subdirectory.
    pub const fn as_str(self) -> &'static str {
        return match self {
            Self::Api => "api",
            Self::Css => "css",
            Self::Dependency => "dep",
            Self::Implementation => "imp",
            Self::Js => "jvs",
            Self::None => "",
            Self::Package => "pkg",
            Self::Png => "png",
            Self::Reference => "use",
            Self::Source => "src",
            Self::Svg => "svg",
        };
    }

    /// File extension of documents of this type, dot included.
    pub const fn extension(self) -> &'static str {
        return match self {
            Self::Api => ".json",
            Self::Css => ".css",
            Self::Js => ".js",
            Self::Png => ".png",
            Self::Svg => ".svg",
            Self::Dependency
            | Self::Implementation
            | Self::None
            | Self::Package
            | Self::Reference
            | Self::Source => MARKUP_EXTENSION,
        };
    }

    /// Whether documents of this type are markup pages.
    pub fn is_markup(self) -> bool {
        return self.extension() == MARKUP_EXTENSION;
    }

    /// Parse an href prefix back into a resource type.
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        return [
            Self::Api,
            Self::Css,
            Self::Dependency,
            Self::Implementation,
            Self::Js,
            Self::Package,
            Self::Png,
            Self::Reference,
            Self::Source,
            Self::Svg,
        ]
        .into_iter()
        .find(|res_type| return res_type.as_str() == prefix);
    }
}

/// Identity of one document: its type and its slash-delimited logical path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PagePathInfo {
    /// Logical path within the type's namespace.
    pub res_path: String,
    /// Document category.
    pub res_type: ResourceType,
}

impl PagePathInfo {
    /// A document of the given type.
    pub fn new(res_type: ResourceType, res_path: impl Into<String>) -> Self {
        return Self { res_path: res_path.into(), res_type };
    }

    /// The site overview page.
    pub fn overview() -> Self {
        return Self::new(ResourceType::None, "");
    }

    /// Parse a request path (`/`, `/name`, `/type:path`) into a document identity.
    pub fn from_href(href: &str) -> Option<Self> {
        let rest = href.strip_prefix('/')?;
        return match rest.split_once(':') {
            Some((prefix, path)) => Some(Self::new(ResourceType::from_prefix(prefix)?, path)),
            None => Some(Self::new(ResourceType::None, rest)),
        };
    }

    /// Check the document lies in the domain where [`Self::file_path`] is injective.
    ///
    /// Top-level names are flat and never `index`; other paths are non-empty,
    /// relative, and free of empty, `.` and `..` segments.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPagePath` for documents outside that domain.
    pub fn validate(&self) -> Result<(), Error> {
        let valid = if self.res_type == ResourceType::None {
            self.res_path != "index" && !self.res_path.contains(['/', ':'])
        } else {
            !self.res_path.is_empty()
                && self
                    .res_path
                    .split('/')
                    .all(|segment| return !segment.is_empty() && segment != "." && segment != "..")
        };
        if valid {
            return Ok(());
        }
        return Err(Error::InvalidPagePath {
            path: self.res_path.clone(),
            res_type: self.res_type.as_str(),
        });
    }

    /// Canonical relative file path of the document; also its href in a generated site.
    pub fn file_path(&self) -> String {
        let ext = self.res_type.extension();
        if self.res_type == ResourceType::None {
            if self.res_path.is_empty() {
                return format!("index{ext}");
            }
            return format!("{}{ext}", self.res_path);
        }
        return format!("{}/{}{ext}", self.res_type.as_str(), self.res_path);
    }

    /// Request path used to ask the renderer for this document.
    pub fn href_path(&self) -> String {
        if self.res_type == ResourceType::None {
            return format!("/{}", self.res_path);
        }
        return format!("/{}:{}", self.res_type.as_str(), self.res_path);
    }
}

/// A document waiting to be rendered and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenPageInfo {
    /// Relative output path.
    pub file_path: String,
    /// Request path passed to the renderer.
    pub href_path: String,
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn top_level_pages_have_no_prefix() {
        assert_eq!(PagePathInfo::overview().file_path(), "index.html");
        assert_eq!(PagePathInfo::new(ResourceType::None, "about").file_path(), "about.html");
    }

    #[test]
    fn typed_pages_use_prefix_and_extension() {
        let page = PagePathInfo::new(ResourceType::Package, "example.com/foo");
        assert_eq!(page.file_path(), "pkg/example.com/foo.html");
        assert_eq!(page.href_path(), "/pkg:example.com/foo");
        assert_eq!(PagePathInfo::new(ResourceType::Css, "default-0.1.0").file_path(), "css/default-0.1.0.css");
        assert_eq!(PagePathInfo::new(ResourceType::Api, "foo").file_path(), "api/foo.json");
        assert_eq!(PagePathInfo::new(ResourceType::Js, "main").file_path(), "jvs/main.js");
    }

    #[test]
    fn href_round_trips() {
        for page in [
            PagePathInfo::overview(),
            PagePathInfo::new(ResourceType::None, "about"),
            PagePathInfo::new(ResourceType::Source, "example.com/foo/a.go"),
            PagePathInfo::new(ResourceType::Reference, "example.com/foo..T.M"),
        ] {
            assert_eq!(PagePathInfo::from_href(&page.href_path()), Some(page));
        }
        assert_eq!(PagePathInfo::from_href("/nope:x"), None);
        assert_eq!(PagePathInfo::from_href("relative"), None);
    }

    #[test]
    fn validation_rejects_colliding_shapes() {
        assert!(PagePathInfo::new(ResourceType::None, "index").validate().is_err());
        assert!(PagePathInfo::new(ResourceType::None, "pkg/foo").validate().is_err());
        assert!(PagePathInfo::new(ResourceType::Package, "").validate().is_err());
        assert!(PagePathInfo::new(ResourceType::Package, "a//b").validate().is_err());
        assert!(PagePathInfo::new(ResourceType::Source, "../etc").validate().is_err());
        assert!(PagePathInfo::overview().validate().is_ok());
        assert!(PagePathInfo::new(ResourceType::Package, "example.com/foo").validate().is_ok());
    }

    #[test]
    fn valid_paths_are_injective() {
        let types = [
            ResourceType::None,
            ResourceType::Api,
            ResourceType::Css,
            ResourceType::Dependency,
            ResourceType::Implementation,
            ResourceType::Js,
            ResourceType::Package,
            ResourceType::Png,
            ResourceType::Reference,
            ResourceType::Source,
            ResourceType::Svg,
        ];
        let paths = ["", "index", "a", "a.html", "pkg", "pkg/a", "api/a", "a/b", "css", "a..b"];

        let mut seen: HashMap<String, PagePathInfo> = HashMap::new();
        for res_type in types {
            for path in paths {
                let page = PagePathInfo::new(res_type, path);
                if page.validate().is_err() {
                    continue;
                }
                if let Some(previous) = seen.insert(page.file_path(), page.clone()) {
                    panic!("{previous:?} and {page:?} share {}", page.file_path());
                }
            }
        }
    }
}
