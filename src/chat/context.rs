//! Project context mode: the files under a directory, rendered as one system prompt.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// The first paragraph of every project context.
pub const CONTEXT_HEADER: &str = "You are now in code context mode. Files listed below include \
their contents with line numbers. Refer to file paths and line numbers when answering.";

const SKIP_DIRS: &[&str] = &[".git", "bin", "vendor", "target"];

/// Extensions that are read, with the fence language used for each.
const EXTENSIONS: &[(&str, &str)] = &[
    (".blade.php", "html"),
    (".go", "go"),
    (".rs", "rust"),
    (".md", "markdown"),
    (".txt", ""),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".php", "php"),
    (".json", "json"),
    (".env", ""),
    (".toml", "toml"),
];

fn fence_language(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_str()?;
    EXTENSIONS
        .iter()
        .find(|(ext, _)| name.ends_with(ext))
        .map(|(_, lang)| *lang)
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// Eligible files under `root`, depth first and sorted by name.  Links are not followed and
/// entries that cannot be read are skipped.
fn collect(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped_dir(entry));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::io(
                    format!("failed to read {}", root.display()),
                    err.into(),
                ));
            }
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() && fence_language(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Render every eligible file under `root`.
///
/// Paths are shown relative to `root`.  Files that cannot be read as UTF-8 are skipped.
pub fn build_context(root: &Path) -> Result<String> {
    let files = collect(root)?;
    let mut out = String::new();
    for path in files {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            tracing::debug!(path = %path.display(), "skipping unreadable file");
            continue;
        };
        let shown = path.strip_prefix(root).unwrap_or(&path);
        let lang = fence_language(&path).unwrap_or_default();
        let lines: Vec<&str> = contents.split('\n').collect();
        let _ = writeln!(out, "File: {} ({} lines)", shown.display(), lines.len());
        let _ = writeln!(out, "```{lang}");
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(out, "{:4}: {line}", i + 1);
        }
        out.push_str("```\n\n");
    }
    Ok(out)
}

/// The system prompt for a context-mode session: the role (if any), the header, the listing.
pub fn context_system_prompt(role: Option<&str>, listing: &str) -> String {
    let body = format!("{CONTEXT_HEADER}\n\n{listing}");
    match role.filter(|r| !r.trim().is_empty()) {
        Some(role) => format!("{role}\n\n{body}"),
        None => body,
    }
}
