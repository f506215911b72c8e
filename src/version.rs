//! Previous-release file names for assets whose name embeds the tool version.
//!
//! Pages generated by an older release link to assets such as
//! `css/default-0.1.2.css`. Writing the current asset under the names of the
//! last few releases keeps those links working.

/// How many previous releases get a copy.
pub const MAX_FALLBACK_VERSIONS: usize = 5;

/// The release before `version`, assuming every component stays in `0..=9`.
///
/// A pre-release suffix is dropped first. A zero patch rolls the minor back
/// and resets the patch to `9`; a zero minor does the same to the major. A
/// leading non-digit prefix on the major (`v1.0.0`) is kept. Returns `None`
/// for unparseable input and when the major would drop to zero.
pub fn previous_version(version: &str) -> Option<String> {
    let mut parts = version.splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let patch = parts.next()?;
    let patch = patch.split_once('-').map_or(patch, |(core, _)| return core);

    let patch: u32 = patch.parse().ok()?;
    if let Some(previous) = patch.checked_sub(1) {
        return Some(format!("{major}.{minor}.{previous}"));
    }

    let minor: u32 = minor.parse().ok()?;
    if let Some(previous) = minor.checked_sub(1) {
        return Some(format!("{major}.{previous}.9"));
    }

    let digits_at = major
        .rfind(|c: char| return !c.is_ascii_digit())
        .map_or(0, |i| return i.saturating_add(1));
    let (prefix, major) = major.split_at(digits_at);
    let major: u32 = major.parse().ok()?;
    if major <= 1 {
        return None;
    }
    return Some(format!("{prefix}{}.9.9", major.saturating_sub(1)));
}

/// File paths where the last occurrence of `version` in the file name of
/// `file_path` is replaced by each of up to [`MAX_FALLBACK_VERSIONS`]
/// previous releases, newest first. Empty when the name does not embed it.
pub fn fallback_file_paths(file_path: &str, version: &str) -> Vec<String> {
    let (dir, file) = match file_path.rsplit_once('/') {
        None => ("", file_path),
        Some((dir, file)) => (dir, file),
    };
    if version.is_empty() {
        return Vec::new();
    }
    let Some(at) = file.rfind(version) else {
        return Vec::new();
    };
    let (head, tail) = file.split_at(at);
    let tail = tail.get(version.len()..).unwrap_or_default();

    let mut paths = Vec::with_capacity(MAX_FALLBACK_VERSIONS);
    let mut current = version.to_owned();
    for _ in 0..MAX_FALLBACK_VERSIONS {
        let Some(previous) = previous_version(&current) else {
            break;
        };
        if dir.is_empty() {
            paths.push(format!("{head}{previous}{tail}"));
        } else {
            paths.push(format!("{dir}/{head}{previous}{tail}"));
        }
        current = previous;
    }
    return paths;
}
