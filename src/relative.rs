//! Shortest relative link between two documents of a generated site.

/// Relative reference from the document at `from` to the document at `to`.
///
/// Both arguments are canonical file paths: slash-delimited, without a
/// leading slash. The result climbs out of the directories of `from` that
/// are not shared with `to`, then descends into the rest of `to`. Resolving
/// it against the directory of `from` yields exactly `to`. Linking a
/// document to itself yields its bare file name.
pub fn relative_path(from: &str, to: &str) -> String {
    let from_dirs = directory_segments(from);
    let to_segments: Vec<&str> = to.split('/').collect();
    let to_dirs = to_segments.len().saturating_sub(1);

    let common = from_dirs
        .iter()
        .zip(to_segments.iter().take(to_dirs))
        .take_while(|(a, b)| return a == b)
        .count();

    let climbs = from_dirs.len().saturating_sub(common);
    let descent = to_segments.get(common..).unwrap_or_default().join("/");
    return format!("{}{descent}", dot_dot_slashes(climbs));
}

/// `count` repetitions of `../`.
pub fn dot_dot_slashes(count: usize) -> String {
    return "../".repeat(count);
}

/// Directory segments of a file path (everything before the last `/`).
fn directory_segments(path: &str) -> Vec<&str> {
    return match path.rsplit_once('/') {
        None => Vec::new(),
        Some((dir, _)) => dir.split('/').collect(),
    };
}
