use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use walkdir::WalkDir;

use crate::error::{FileError, Result};
use crate::file::handle::Match;
use crate::file::resolver::{relative_to, resolve, resolve_all};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrepOptions {
    pub recursive: bool,
    pub case_insensitive: bool,
}

impl Default for GrepOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            case_insensitive: true,
        }
    }
}

impl GrepOptions {
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Maximum directory nesting to descend into, 0 for unbounded.
    pub depth: usize,
    pub case_sensitive: bool,
    /// Roots to search, relative to the working directory. Empty means the
    /// working directory itself.
    pub include: Vec<String>,
    /// Directories to skip along with everything below them. `.git` is
    /// always excluded.
    pub exclude: Vec<String>,
}

/// Plain substring search over files, keyed by path relative to
/// `working_dir`.
pub fn grep(
    working_dir: &Path,
    word: &str,
    pattern: &str,
    options: GrepOptions,
) -> Result<BTreeMap<String, Vec<Match>>> {
    let escaped = regex::escape(word);
    let needle = if options.case_insensitive {
        Regex::new(&format!("(?i){escaped}"))?
    } else {
        Regex::new(&escaped)?
    };
    let mut results: BTreeMap<String, Vec<Match>> = BTreeMap::new();

    for path in paths_to_search(working_dir, pattern, options.recursive)? {
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if hidden || !path.is_file() {
            continue;
        }

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                tracing::debug!(path = %path.display(), "Skipping non-UTF-8 file");
                continue;
            }
            Err(e) => {
                return Err(FileError::io(
                    format!("Failed to read file: {}", path.display()),
                    e,
                ))
            }
        };

        for (index, line) in content.lines().enumerate() {
            // Offsets index the original line; lowercasing can change byte lengths.
            let Some(found) = needle.find(line) else {
                continue;
            };
            results
                .entry(relative_to(working_dir, &path))
                .or_default()
                .push(Match {
                    content: line.trim().to_string(),
                    matched: found.as_str().to_string(),
                    start: found.start(),
                    end: found.end(),
                    line_number: index + 1,
                });
        }
    }

    let total: usize = results.values().map(Vec::len).sum();
    tracing::debug!(word, pattern, total, "grep finished");
    Ok(results)
}

/// Regex search over relative path names, walking at most `options.depth`
/// directory levels below each include root.
pub fn find(working_dir: &Path, pattern: &str, options: &FindOptions) -> Result<Vec<String>> {
    let mut include = resolve_all(working_dir, &options.include)?;
    if include.is_empty() {
        include.push(working_dir.to_path_buf());
    }
    let mut exclude = resolve_all(working_dir, &options.exclude)?;
    exclude.push(resolve(working_dir, ".git")?);

    let regex = if options.case_sensitive {
        Regex::new(pattern)?
    } else {
        Regex::new(&format!("(?i){pattern}"))?
    };

    let finder = Finder {
        working_dir,
        depth: options.depth,
        exclude: &exclude,
        regex: &regex,
    };
    let mut matches = Vec::new();
    for root in &include {
        finder.walk(root, 0, &mut matches);
    }
    matches.sort();
    matches.dedup();
    Ok(matches)
}

struct Finder<'a> {
    working_dir: &'a Path,
    depth: usize,
    exclude: &'a [PathBuf],
    regex: &'a Regex,
}

impl Finder<'_> {
    fn walk(&self, directory: &Path, level: usize, matches: &mut Vec<String>) {
        if self.depth != 0 && level > self.depth {
            return;
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => return,
            Err(e) => {
                tracing::warn!(directory = %directory.display(), error = %e, "Error reading directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if self.excluded(&path) {
                continue;
            }

            let relative = relative_to(self.working_dir, &path);
            if self.regex.is_match(&relative) {
                matches.push(relative);
            }

            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                self.walk(&path, level + 1, matches);
            }
        }
    }

    fn excluded(&self, path: &Path) -> bool {
        self.exclude.iter().any(|ex| path.starts_with(ex))
    }
}

/// Expands a grep `pattern` into candidate paths. An empty pattern searches
/// the whole working directory.
fn paths_to_search(working_dir: &Path, pattern: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let target = if pattern.is_empty() {
        working_dir.to_path_buf()
    } else {
        resolve(working_dir, pattern)?
    };

    if target.is_dir() {
        return Ok(walk_files(&target, if recursive { None } else { Some(1) }));
    }
    if target.is_file() {
        return Ok(vec![target]);
    }
    if is_glob(pattern) {
        return expand_glob(&target, recursive);
    }
    Err(FileError::NotFound(target))
}

fn walk_files(root: &Path, max_depth: Option<usize>) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(root).min_depth(1).sort_by_file_name();
    if let Some(max_depth) = max_depth {
        walker = walker.max_depth(max_depth);
    }

    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Non-recursive globs match a single level per component; recursive globs
/// let wildcards cross directory separators and pull in everything below a
/// matching directory.
fn expand_glob(target: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let (base, remaining) = literal_base(target);
    let matcher = glob_matcher(target, !recursive)?;

    let mut walker = WalkDir::new(&base).min_depth(1).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(remaining);
    }

    let mut found = BTreeSet::new();
    for entry in walker.into_iter().flatten() {
        if !matcher.is_match(entry.path()) {
            continue;
        }
        if entry.file_type().is_dir() {
            if recursive {
                found.extend(walk_files(entry.path(), None));
            }
        } else {
            found.insert(entry.into_path());
        }
    }
    Ok(found.into_iter().collect())
}

fn glob_matcher(target: &Path, literal_separator: bool) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(&target.to_string_lossy())
        .literal_separator(literal_separator)
        .build()?;
    Ok(glob.compile_matcher())
}

/// Splits a glob path into its longest wildcard-free prefix and the number of
/// components after it.
fn literal_base(target: &Path) -> (PathBuf, usize) {
    let mut base = PathBuf::new();
    let mut components = target.components();
    for component in components.by_ref() {
        if let Component::Normal(name) = component {
            if is_glob(&name.to_string_lossy()) {
                return (base, components.count() + 1);
            }
        }
        base.push(component);
    }
    (base, 0)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("README.md"), "Needle in the readme\n").unwrap();
        fs::write(root.join("src/lib.rs"), "fn needle() {}\nfn other() {}\n").unwrap();
        fs::write(root.join("src/nested/deep.rs"), "  NEEDLE deep  \n").unwrap();
        fs::write(root.join("src/.hidden.rs"), "needle hidden\n").unwrap();
        fs::write(root.join(".git/config"), "[core]\n").unwrap();
        dir
    }

    #[rstest]
    #[case::case_insensitive(true, &["README.md", "src/lib.rs", "src/nested/deep.rs"])]
    #[case::exact_case(false, &["src/lib.rs"])]
    fn test_grep_case_folding(#[case] case_insensitive: bool, #[case] expected: &[&str]) {
        let dir = workspace();
        let options = GrepOptions::default().with_case_insensitive(case_insensitive);
        let results = grep(dir.path(), "needle", "", options).unwrap();
        let keys: Vec<&str> = results.keys().map(String::as_str).collect();
        assert_eq!(keys, expected);
        assert!(results.values().all(|m| m.len() == 1));
    }

    #[test]
    fn test_grep_match_details() {
        let dir = workspace();
        let results = grep(dir.path(), "needle", "src/nested", GrepOptions::default()).unwrap();
        let matches = &results["src/nested/deep.rs"];
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].content, "NEEDLE deep");
        assert_eq!(matches[0].line_number, 1);
        assert_eq!(matches[0].matched, "NEEDLE");
        assert_eq!((matches[0].start, matches[0].end), (2, 8));
    }

    #[rstest]
    #[case::dotted_i("İİ needle", "needle", 5)]
    #[case::sharp_s("Straße needle", "NEEDLE", 8)]
    #[case::regex_metacharacters("call f(x).y here", "f(x).Y", 5)]
    fn test_grep_offsets_index_original_line(
        #[case] line: &str,
        #[case] word: &str,
        #[case] start: usize,
    ) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("text.txt"), format!("{line}\n")).unwrap();
        let results = grep(dir.path(), word, "", GrepOptions::default()).unwrap();
        let found = &results["text.txt"][0];
        assert_eq!(found.start, start);
        assert_eq!(found.end, start + word.len());
        assert_eq!(&line[found.start..found.end], found.matched);
        assert!(found.matched.eq_ignore_ascii_case(word));
    }

    #[test]
    fn test_grep_non_recursive_directory() {
        let dir = workspace();
        let options = GrepOptions::default().with_recursive(false);
        let results = grep(dir.path(), "needle", "src", options).unwrap();
        assert_eq!(results.keys().collect::<Vec<_>>(), vec!["src/lib.rs"]);
    }

    #[test]
    fn test_grep_globs() {
        let dir = workspace();
        let flat = grep(
            dir.path(),
            "needle",
            "src/*.rs",
            GrepOptions::default().with_recursive(false),
        )
        .unwrap();
        assert_eq!(flat.keys().collect::<Vec<_>>(), vec!["src/lib.rs"]);

        let deep = grep(dir.path(), "needle", "src/*.rs", GrepOptions::default()).unwrap();
        assert_eq!(
            deep.keys().collect::<Vec<_>>(),
            vec!["src/lib.rs", "src/nested/deep.rs"]
        );
    }

    #[test]
    fn test_grep_single_file_and_missing_path() {
        let dir = workspace();
        let results = grep(dir.path(), "other", "src/lib.rs", GrepOptions::default()).unwrap();
        assert_eq!(results["src/lib.rs"][0].line_number, 2);

        let err = grep(dir.path(), "x", "nope", GrepOptions::default()).unwrap_err();
        assert!(matches!(err, FileError::NotFound(_)));
    }

    #[test]
    fn test_grep_skips_binary_files() {
        let dir = workspace();
        fs::write(dir.path().join("blob.bin"), [0xff, 0xfe, b'n', 0x00]).unwrap();
        let results = grep(dir.path(), "needle", "", GrepOptions::default()).unwrap();
        assert!(!results.contains_key("blob.bin"));
    }

    #[test]
    fn test_find_depth_bound() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a/b")).unwrap();
        fs::write(dir.path().join("a/b/file.txt"), "").unwrap();

        let shallow = FindOptions {
            depth: 1,
            ..Default::default()
        };
        assert!(find(dir.path(), "file", &shallow).unwrap().is_empty());

        let unbounded = FindOptions::default();
        assert_eq!(
            find(dir.path(), "file", &unbounded).unwrap(),
            vec!["a/b/file.txt"]
        );
    }

    #[test]
    fn test_find_matches_directories_and_sorts() {
        let dir = workspace();
        let found = find(dir.path(), "^src", &FindOptions::default()).unwrap();
        assert_eq!(
            found,
            vec![
                "src",
                "src/.hidden.rs",
                "src/lib.rs",
                "src/nested",
                "src/nested/deep.rs"
            ]
        );
    }

    #[test]
    fn test_find_case_sensitivity() {
        let dir = workspace();
        let insensitive = find(dir.path(), "readme", &FindOptions::default()).unwrap();
        assert_eq!(insensitive, vec!["README.md"]);

        let sensitive = FindOptions {
            case_sensitive: true,
            ..Default::default()
        };
        assert!(find(dir.path(), "readme", &sensitive).unwrap().is_empty());
    }

    #[test]
    fn test_find_excludes_git_and_listed_dirs() {
        let dir = workspace();
        let all = find(dir.path(), "", &FindOptions::default()).unwrap();
        assert!(all.iter().all(|p| !p.starts_with(".git")));

        let options = FindOptions {
            exclude: vec!["src/nested".to_string()],
            ..Default::default()
        };
        let found = find(dir.path(), "deep", &options).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_include_roots() {
        let dir = workspace();
        let options = FindOptions {
            include: vec!["src/nested".to_string()],
            ..Default::default()
        };
        let found = find(dir.path(), "rs$", &options).unwrap();
        assert_eq!(found, vec!["src/nested/deep.rs"]);
    }

    #[test]
    fn test_find_invalid_regex() {
        let dir = workspace();
        let err = find(dir.path(), "(unclosed", &FindOptions::default()).unwrap_err();
        assert!(matches!(err, FileError::InvalidPattern(_)));
    }

    #[test]
    fn test_literal_base() {
        let (base, rest) = literal_base(Path::new("/w/src/*.rs"));
        assert_eq!(base, Path::new("/w/src"));
        assert_eq!(rest, 1);

        let (base, rest) = literal_base(Path::new("/w/*/x/*.rs"));
        assert_eq!(base, Path::new("/w"));
        assert_eq!(rest, 3);
    }
}
