//! Source discovery -- expands configured entries into log file paths.
//!
//! Each entry is one of:
//!
//! - a plain file path, passed through unchanged (a missing file is
//!   reported later by its tailer)
//! - a directory, expanded to the `*.log` files directly inside it
//! - a pattern whose final component contains `*` or `?`, matched against
//!   the listing of its parent directory
//!
//! The result is sorted and de-duplicated.

use std::path::{Path, PathBuf};

use anyhow::Result;

/// Default pattern applied to directory entries.
const DIRECTORY_PATTERN: &str = "*.log";

/// Expand every entry and return the combined, sorted source list.
///
/// # Errors
///
/// Returns an error if no source remains after expansion.
pub async fn discover_sources(entries: &[String]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for entry in entries {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let expanded = expand_entry(Path::new(entry)).await;
        if expanded.is_empty() {
            tracing::warn!(entry = entry, "source entry matched no files");
        }
        sources.extend(expanded);
    }

    sources.sort();
    sources.dedup();

    if sources.is_empty() {
        return Err(anyhow::anyhow!(
            "no log sources found for entries: [{}]",
            entries.join(", ")
        ));
    }

    tracing::info!(count = sources.len(), "log sources discovered");
    Ok(sources)
}

async fn expand_entry(path: &Path) -> Vec<PathBuf> {
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();

    if has_wildcard(file_name) {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        return list_matching(dir, file_name).await;
    }

    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => list_matching(path, DIRECTORY_PATTERN).await,
        _ => vec![path.to_path_buf()],
    }
}

/// List regular files in `dir` whose name matches `pattern`.
async fn list_matching(dir: &Path, pattern: &str) -> Vec<PathBuf> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot read source directory");
            return Vec::new();
        }
    };

    let mut matched = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "directory listing interrupted");
                break;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !wildcard_match(pattern, name) {
            continue;
        }
        // 심볼릭 링크는 대상 기준으로 판단
        match tokio::fs::metadata(entry.path()).await {
            Ok(meta) if meta.is_file() => matched.push(entry.path()),
            _ => {}
        }
    }
    matched
}

fn has_wildcard(s: &str) -> bool {
    s.contains(['*', '?'])
}

/// Match `name` against a pattern where `*` is any run of characters and
/// `?` is exactly one character.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    // 마지막 '*' 위치와 그때의 name 위치 (백트래킹용)
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((star_pi, star_ni)) = star {
            pi = star_pi + 1;
            ni = star_ni + 1;
            star = Some((star_pi, star_ni + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
