use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{FileError, IoContext, Result};
use crate::file::lint::Linter;

pub const DEFAULT_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    fn offset(self, lines: usize) -> i64 {
        let lines = lines as i64;
        match self {
            ScrollDirection::Up => -lines,
            ScrollDirection::Down => lines,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    File,
    #[default]
    Window,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub content: String,
    pub matched: String,
    pub start: usize,
    pub end: usize,
    /// 1-based
    pub line_number: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextReplacement {
    pub replaced_text: String,
    pub replaced_with: String,
}

/// An open file plus the line window the caller is currently looking at.
///
/// `start`/`end` are 0-based line offsets and may be moved past either end
/// of the file; reads simply come back empty there.
#[derive(Debug, Clone)]
pub struct FileHandle {
    path: PathBuf,
    start: i64,
    end: i64,
    window: usize,
}

impl FileHandle {
    pub fn new(path: PathBuf, window: usize) -> Self {
        let window = if window == 0 { DEFAULT_WINDOW } else { window };
        Self {
            path,
            start: 0,
            end: window as i64,
            window,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn scroll(&mut self, lines: usize, direction: ScrollDirection) {
        let offset = direction.offset(lines);
        self.start += offset;
        self.end += offset;
    }

    pub fn goto(&mut self, line: i64) {
        self.start = line;
        self.end = line + self.window as i64;
    }

    /// Lines inside the window keyed by their 1-based line number.
    pub fn read(&self) -> Result<BTreeMap<usize, String>> {
        let mut buffer = BTreeMap::new();
        for (cursor, line) in self.lines()?.into_iter().enumerate() {
            if self.in_window(cursor) {
                buffer.insert(cursor + 1, line);
            }
        }
        Ok(buffer)
    }

    pub fn total_lines(&self) -> Result<usize> {
        Ok(self.lines()?.len())
    }

    pub fn find(&self, pattern: &str, scope: Scope) -> Result<Vec<Match>> {
        let regex = Regex::new(pattern)?;
        let mut matches = Vec::new();
        for (cursor, line) in self.lines()?.iter().enumerate() {
            if scope == Scope::Window && !self.in_window(cursor) {
                continue;
            }
            for m in regex.find_iter(line) {
                matches.push(Match {
                    content: line.clone(),
                    matched: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    line_number: cursor + 1,
                });
            }
        }
        Ok(matches)
    }

    /// Replaces the whole file with `text`.
    pub fn write(&self, text: &str) -> Result<()> {
        fs::write(&self.path, text)
            .io_context(|| format!("Failed to write file: {}", self.path.display()))
    }

    /// Replaces every literal occurrence of `search`.
    pub fn replace(&self, search: &str, replacement: &str) -> Result<TextReplacement> {
        if search.is_empty() {
            return Err(FileError::InvalidArgument(
                "search text cannot be empty".to_string(),
            ));
        }

        let content = self.read_to_string()?;
        if !content.contains(search) {
            return Err(FileError::NotFoundInContent(search.to_string()));
        }

        self.write(&content.replace(search, replacement))?;
        Ok(TextReplacement {
            replaced_text: search.to_string(),
            replaced_with: replacement.to_string(),
        })
    }

    /// Replaces lines `start..=end` (1-based) with `text`, which is written as
    /// a single block followed by one newline. With [`Scope::Window`] the
    /// range is first narrowed to the current window. Files using `\r\n` keep
    /// it on every rewritten line.
    pub fn edit(&self, text: &str, start: i64, end: i64, scope: Scope) -> Result<TextReplacement> {
        let content = self.read_to_string()?;
        let lines = split_lines(&content);
        let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };

        let (start, end) = match scope {
            Scope::Window => (start.max(self.start), end.min(self.end)),
            Scope::File => (start, end),
        };
        let (start, end) = check_range(start, end, lines.len())?;

        let mut replaced = String::new();
        for line in &lines[start - 1..end] {
            replaced.push_str(line);
            replaced.push_str(newline);
        }

        let mut buffer = String::with_capacity(content.len() + text.len() + 1);
        for line in &lines[..start - 1] {
            buffer.push_str(line);
            buffer.push_str(newline);
        }
        buffer.push_str(text);
        buffer.push_str(newline);
        for line in &lines[end..] {
            buffer.push_str(line);
            buffer.push_str(newline);
        }

        self.write(&buffer)?;
        Ok(TextReplacement {
            replaced_text: replaced,
            replaced_with: text.to_string(),
        })
    }

    /// Window-scoped [`FileHandle::edit`] followed by `linter`. If either step
    /// fails the original bytes are written back before the error is returned.
    pub async fn write_and_run_lint(
        &self,
        text: &str,
        start: i64,
        end: i64,
        linter: &dyn Linter,
    ) -> Result<TextReplacement> {
        let original = fs::read(&self.path)
            .io_context(|| format!("Failed to read file: {}", self.path.display()))?;

        let outcome = match self.edit(text, start, end, Scope::Window) {
            Ok(replacement) => match linter.lint(&self.path).await {
                Ok(()) => Ok(replacement),
                Err(message) => Err(FileError::ValidationFailed(message)),
            },
            Err(e) => Err(e),
        };

        if outcome.is_err() {
            tracing::info!(path = %self.path.display(), "Rolling back edit");
            fs::write(&self.path, &original)
                .io_context(|| format!("Failed to restore file: {}", self.path.display()))?;
        }
        outcome
    }

    fn in_window(&self, cursor: usize) -> bool {
        let cursor = cursor as i64;
        cursor >= self.start && cursor < self.end
    }

    fn lines(&self) -> Result<Vec<String>> {
        let content = self.read_to_string()?;
        Ok(split_lines(&content)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    fn read_to_string(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| self.open_error(e))
    }

    fn open_error(&self, e: std::io::Error) -> FileError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FileError::NotFound(self.path.clone())
        } else {
            FileError::io(format!("Failed to read file: {}", self.path.display()), e)
        }
    }
}

/// Splits on `\n` and drops a `\r` ending each line; a trailing newline
/// terminates the last line rather than starting an empty one.
fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        return Vec::new();
    }
    content
        .strip_suffix('\n')
        .unwrap_or(content)
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn check_range(start: i64, end: i64, len: usize) -> Result<(usize, usize)> {
    if start < 1 || end > len as i64 || start > end + 1 {
        return Err(FileError::InvalidArgument(format!(
            "line range {start}..={end} is outside the file (1..={len})"
        )));
    }
    Ok((start as usize, end as usize))
}
