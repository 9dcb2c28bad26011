use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use fileshell_core::{
    CommandLinter, EntryKind, FileManager, FindOptions, GrepOptions, Linter, NoLint, Settings,
};

pub fn ls(manager: &FileManager) -> Result<()> {
    for entry in manager.ls()? {
        let kind = match entry.kind {
            EntryKind::Dir => "dir",
            EntryKind::File => "file",
        };
        println!("{kind}\t{}", entry.name);
    }
    Ok(())
}

pub fn tree(manager: &FileManager, depth: Option<usize>, exclude: &[String]) -> Result<()> {
    print!("{}", manager.tree(depth, exclude)?);
    Ok(())
}

pub fn find(
    manager: &FileManager,
    pattern: &str,
    depth: usize,
    case_sensitive: bool,
    include: Vec<String>,
    exclude: Vec<String>,
) -> Result<()> {
    let options = FindOptions {
        depth,
        case_sensitive,
        include,
        exclude,
    };
    for path in manager.find(pattern, &options)? {
        println!("{path}");
    }
    Ok(())
}

pub fn grep(
    manager: &FileManager,
    word: &str,
    pattern: &str,
    recursive: bool,
    case_insensitive: bool,
) -> Result<()> {
    let options = GrepOptions::default()
        .with_recursive(recursive)
        .with_case_insensitive(case_insensitive);
    for (path, matches) in manager.grep(word, pattern, options)? {
        for m in matches {
            println!("{path}:{}: {}", m.line_number, m.content);
        }
    }
    Ok(())
}

pub fn read(mut manager: FileManager, file: &str, line: Option<i64>) -> Result<()> {
    let handle = manager.open(file)?;
    if let Some(line) = line {
        handle.goto(line);
    }
    let total = handle.total_lines()?;
    for (number, text) in handle.read()? {
        println!("{number:>6}  {text}");
    }
    eprintln!(
        "[{} lines, showing {}..{}]",
        total,
        handle.start().max(0),
        handle.end().min(total as i64)
    );
    Ok(())
}

pub async fn edit(
    mut manager: FileManager,
    settings: &Settings,
    file: &str,
    start: i64,
    end: i64,
    text: Option<String>,
    no_lint: bool,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read replacement text from stdin")?;
            buffer.strip_suffix('\n').unwrap_or(&buffer).to_string()
        }
    };

    let linter: Arc<dyn Linter> = if no_lint {
        Arc::new(NoLint)
    } else {
        Arc::new(CommandLinter::from_settings(&settings.lint))
    };

    let handle = manager.open(file)?;
    let replacement = handle
        .write_and_run_lint(&text, start, end, linter.as_ref())
        .await
        .with_context(|| format!("No Update, found error in {file}"))?;

    print!("{}", replacement.replaced_text);
    Ok(())
}

pub fn replace(mut manager: FileManager, file: &str, search: &str, replacement: &str) -> Result<()> {
    let handle = manager.open(file)?;
    handle.replace(search, replacement)?;
    Ok(())
}

pub async fn exec(manager: &FileManager, command: &str) -> Result<()> {
    let output = manager.execute_command(command).await?;
    print!("{output}");
    Ok(())
}
