use std::path::Path;

use crate::error::Error;

/// Name of the optional project configuration file.
pub const CONFIG_FILE: &str = ".symdocs.toml";

/// Project configuration loaded from `.symdocs.toml`.
/// Exclude patterns are path prefixes applied to package directories.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root-relative directory prefixes skipped during package discovery.
    exclude: Vec<String>,
    /// Module path override; `None` falls back to `go.mod`.
    pub module: Option<String>,
    /// Whether symbol usage pages are generated.
    pub reference_pages: bool,
    /// How source files are presented and linked.
    pub source_reading: SourceReading,
}

/// Raw TOML structure for `.symdocs.toml`.
#[derive(serde::Deserialize)]
struct SymdocsTomlConfig {
    /// See [`Config::exclude`].
    #[serde(default)]
    exclude: Vec<String>,
    /// See [`Config::module`].
    #[serde(default)]
    module: Option<String>,
    /// See [`Config::reference_pages`].
    #[serde(default = "enabled")]
    reference_pages: bool,
    /// See [`Config::source_reading`].
    #[serde(default)]
    source_reading: SourceReading,
}

/// Source reading style of the generated site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceReading {
    /// Plain source pages; renderer warnings are reported after an export.
    External,
    /// Plain source pages without implementation listings.
    Plain,
    /// Source pages plus method implementation pages.
    #[default]
    Rich,
}

/// Serde default for boolean switches that are on unless disabled.
const fn enabled() -> bool {
    return true;
}

impl Default for Config {
    fn default() -> Self {
        return Self {
            exclude: Vec::new(),
            module: None,
            reference_pages: true,
            source_reading: SourceReading::Rich,
        };
    }
}

impl Config {
    /// Load config from `.symdocs.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist, and an error if the file
    /// exists but is malformed.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: SymdocsTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            exclude: raw.exclude,
            module: raw.module.filter(|m| return !m.is_empty()),
            reference_pages: raw.reference_pages,
            source_reading: raw.source_reading,
        });
    }

    /// Check whether a package directory should be scanned.
    ///
    /// Hidden directories, `vendor` and `testdata` are never scanned; the
    /// configured exclude prefixes are applied on top.
    pub fn should_scan(&self, relative_dir: &str) -> bool {
        let builtin_skip = relative_dir.split('/').any(|segment| {
            return segment == "vendor"
                || segment == "testdata"
                || (segment.starts_with('.') && segment != "." && segment != "..");
        });
        if builtin_skip {
            return false;
        }
        return !self.exclude.iter().any(|p| return relative_dir.starts_with(p.as_str()));
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert!(config.reference_pages);
        assert_eq!(config.source_reading, SourceReading::Rich);
        assert!(config.module.is_none());
    }

    #[test]
    fn parses_every_key() {
        let config = Config::parse(
            r#"
exclude = ["internal/gen"]
module = "example.com/app"
reference_pages = false
source_reading = "external"
"#,
        )
        .unwrap();
        assert!(!config.reference_pages);
        assert_eq!(config.source_reading, SourceReading::External);
        assert_eq!(config.module.as_deref(), Some("example.com/app"));
        assert!(!config.should_scan("internal/gen/proto"));
        assert!(config.should_scan("internal/app"));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Config::parse("source_reading = \"fancy\"").is_err());
    }

    #[test]
    fn skips_vendor_testdata_and_hidden_dirs() {
        let config = Config::default();
        assert!(!config.should_scan("vendor/github.com/x"));
        assert!(!config.should_scan("pkg/testdata"));
        assert!(!config.should_scan(".git"));
        assert!(config.should_scan(""));
        assert!(config.should_scan("cmd/tool"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.reference_pages);
    }
}
