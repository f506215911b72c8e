//! Lazy loading of raw source bytes on the rayon worker pool.

use rayon::prelude::*;

use crate::types::{Package, SourceFileInfo};

/// Outcome of one caching pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Files whose read failed; their content stays unset.
    pub failed: usize,
    /// Files read by this pass.
    pub loaded: usize,
}

/// Load the content of every file that has none yet.
///
/// Reads run on the global rayon pool, one worker per available processor.
/// The call returns once every read of the batch has finished.
pub fn cache_source_files(packages: &mut [Package]) -> LoadStats {
    let pending: Vec<&mut SourceFileInfo> = packages
        .iter_mut()
        .filter_map(|pkg| return pkg.source_files.as_mut())
        .flatten()
        .filter(|file| return file.content.is_none())
        .collect();

    let total = pending.len();
    let loaded = pending
        .into_par_iter()
        .map(ensure_loaded)
        .filter(|ok| return *ok)
        .count();

    return LoadStats {
        failed: total.saturating_sub(loaded),
        loaded,
    };
}

/// Read the file's bytes unless they are already present.
/// Returns whether content is available afterwards.
pub fn ensure_loaded(file: &mut SourceFileInfo) -> bool {
    if file.content.is_some() {
        return true;
    }
    let Some(path) = file.content_path() else {
        return false;
    };
    match std::fs::read(path) {
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "read source file");
            return false;
        },
        Ok(bytes) => {
            file.content = Some(bytes);
            return true;
        },
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, clippy::indexing_slicing, reason = "tests")]
mod tests {
    use super::*;
    use crate::frontend::PackageSource;
    use crate::types::PackageId;

    fn package_of(files: Vec<SourceFileInfo>) -> Package {
        let mut pkg = Package::new(PackageId(0), PackageSource::default());
        pkg.source_files = Some(files);
        pkg
    }

    #[test]
    fn loads_missing_content_and_skips_loaded_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.go");
        let b = dir.path().join("b.go");
        std::fs::write(&a, "package a\n").unwrap();
        std::fs::write(&b, "package b\n").unwrap();

        let mut preloaded = SourceFileInfo::plain(PackageId(0), &b, None);
        preloaded.content = Some(b"cached".to_vec());
        let mut packages = vec![package_of(vec![SourceFileInfo::plain(PackageId(0), &a, None), preloaded])];

        let stats = cache_source_files(&mut packages);

        assert_eq!(stats, LoadStats { failed: 0, loaded: 1 });
        let files = packages[0].files();
        assert_eq!(files[0].content.as_deref(), Some(&b"package a\n"[..]));
        assert_eq!(files[1].content.as_deref(), Some(&b"cached"[..]));
    }

    #[test]
    fn unreadable_file_stays_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut packages = vec![package_of(vec![SourceFileInfo::plain(
            PackageId(0),
            &dir.path().join("gone.go"),
            None,
        )])];

        let stats = cache_source_files(&mut packages);

        assert_eq!(stats, LoadStats { failed: 1, loaded: 0 });
        assert!(packages[0].files()[0].content.is_none());
    }

    #[test]
    fn generated_path_is_preferred_for_content() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("gen");
        std::fs::write(&generated, "generated").unwrap();
        let mut file = SourceFileInfo::plain(PackageId(0), &dir.path().join("orig.go"), None);
        file.generated_file = Some(generated);

        assert!(ensure_loaded(&mut file));
        assert_eq!(file.content.as_deref(), Some(&b"generated"[..]));
    }
}
