use std::path::{Component, Path, PathBuf};

use crate::error::{FileError, Result};

/// Resolves `path` against `base`. Absolute paths are normalized as-is,
/// relative paths are joined to `base` first. Normalization is purely
/// lexical so targets that do not exist yet (e.g. files about to be created)
/// still resolve.
pub fn resolve(base: &Path, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().as_encoded_bytes().contains(&0) {
        return Err(FileError::InvalidArgument(format!(
            "invalid path: {path:?} contains a NUL byte"
        )));
    }

    if path.is_absolute() {
        return Ok(normalize(path));
    }

    if !base.is_absolute() {
        return Err(FileError::InvalidArgument(format!(
            "invalid path: base directory {} is not absolute",
            base.display()
        )));
    }

    Ok(normalize(&base.join(path)))
}

/// Resolves every entry of `paths` against `base`, failing on the first bad one.
pub fn resolve_all<S: AsRef<Path>>(base: &Path, paths: &[S]) -> Result<Vec<PathBuf>> {
    paths.iter().map(|p| resolve(base, p)).collect()
}

/// Lexically removes `.` components and folds `..` into its parent. `..`
/// never climbs above the root of an absolute path.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component),
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::Prefix(_) | Component::RootDir) => {}
                _ => out.push(component),
            },
            Component::Normal(name) => out.push(name),
        }
    }

    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// The filesystem anchor of a path: drive or UNC prefix plus root on
/// Windows, `/` on Unix. Relative paths have no anchor.
pub fn anchor(path: &Path) -> Option<PathBuf> {
    let mut anchor = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => anchor.push(component),
            _ => break,
        }
    }
    if anchor.as_os_str().is_empty() {
        None
    } else {
        Some(anchor)
    }
}

/// Coarse sandbox check used by `chdir`: both paths must live on the same
/// volume. This does not keep a caller inside a subtree.
pub fn same_anchor(current: &Path, target: &Path) -> bool {
    anchor(current) == anchor(target)
}

/// Renders `path` relative to `base` when it lives below it, otherwise the
/// path unchanged.
pub fn relative_to(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
