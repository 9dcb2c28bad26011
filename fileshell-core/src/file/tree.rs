use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{IoContext, Result};

/// Renders `root` as an indented listing. Each level lists its files before
/// its subdirectories, and every subdirectory is followed by its own
/// contents. Descent stops past `depth` (unbounded when `None`) and at any
/// directory in `exclude`.
pub fn render_tree(root: &Path, depth: Option<usize>, exclude: &[PathBuf]) -> Result<String> {
    let mut out = String::new();
    let entries = sorted_entries(root)?;
    render_level(&entries, 0, depth, exclude, &mut out);
    Ok(out)
}

fn render_directory(
    directory: &Path,
    level: usize,
    depth: Option<usize>,
    exclude: &[PathBuf],
    out: &mut String,
) {
    if depth.is_some_and(|d| level > d) || exclude.iter().any(|ex| ex == directory) {
        return;
    }

    match sorted_entries(directory) {
        Ok(entries) => render_level(&entries, level, depth, exclude, out),
        Err(e) => tracing::warn!(error = %e, "Error reading directory"),
    }
}

fn render_level(
    entries: &[(PathBuf, bool)],
    level: usize,
    depth: Option<usize>,
    exclude: &[PathBuf],
    out: &mut String,
) {
    for (path, _) in entries.iter().filter(|(_, is_dir)| !is_dir) {
        push_line(out, level, path);
    }
    for (path, _) in entries.iter().filter(|(_, is_dir)| *is_dir) {
        push_line(out, level, path);
        render_directory(path, level + 1, depth, exclude, out);
    }
}

fn push_line(out: &mut String, level: usize, path: &Path) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    out.push_str(&"  |".repeat(level));
    out.push_str("__ ");
    out.push_str(&name);
    out.push('\n');
}

fn sorted_entries(directory: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let read = fs::read_dir(directory)
        .io_context(|| format!("Failed to read directory: {}", directory.display()))?;

    let mut entries: Vec<(PathBuf, bool)> = read
        .flatten()
        .map(|entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            (entry.path(), is_dir)
        })
        .collect();
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("b_dir/inner")).unwrap();
        fs::create_dir_all(root.join("a_dir")).unwrap();
        fs::write(root.join("z.txt"), "").unwrap();
        fs::write(root.join("b_dir/one.rs"), "").unwrap();
        fs::write(root.join("b_dir/inner/two.rs"), "").unwrap();
        dir
    }

    #[test]
    fn test_files_before_directories() {
        let dir = sample();
        let tree = render_tree(dir.path(), None, &[]).unwrap();
        assert_eq!(
            tree,
            "__ z.txt\n\
             __ a_dir\n\
             __ b_dir\n\
             \x20\x20|__ one.rs\n\
             \x20\x20|__ inner\n\
             \x20\x20|\x20\x20|__ two.rs\n"
        );
    }

    #[test]
    fn test_depth_limit() {
        let dir = sample();
        let tree = render_tree(dir.path(), Some(0), &[]).unwrap();
        assert_eq!(tree, "__ z.txt\n__ a_dir\n__ b_dir\n");

        let tree = render_tree(dir.path(), Some(1), &[]).unwrap();
        assert!(tree.contains("one.rs"));
        assert!(!tree.contains("two.rs"));
    }

    #[test]
    fn test_excluded_directory_is_listed_but_not_expanded() {
        let dir = sample();
        let exclude = vec![dir.path().join("b_dir")];
        let tree = render_tree(dir.path(), None, &exclude).unwrap();
        assert!(tree.contains("__ b_dir\n"));
        assert!(!tree.contains("one.rs"));
    }

    #[test]
    fn test_missing_root() {
        let err = render_tree(Path::new("/definitely/missing/dir"), None, &[]).unwrap_err();
        assert!(err.is_not_found());
    }
}
