use std::time::Duration;

use fileshell_core::{
    active_manager_id, FileError, FileManager, FindOptions, GrepOptions, Scope, ScrollDirection,
};
use rstest::rstest;


use fixture::Fixture;

#[test]
fn test_notes_edit_scenario() {
    let mut fixture = Fixture::new();
    let handle = fixture.manager().open("notes.txt").unwrap().clone();

    let replacement = handle.edit("REPLACED", 2, 2, Scope::Window).unwrap();

    assert_eq!(replacement.replaced_text, "line2\n");
    assert_eq!(replacement.replaced_with, "REPLACED");
    assert_eq!(fixture.read("notes.txt"), "line1\nREPLACED\nline3\n");
    let window = handle.read().unwrap();
    assert_eq!(window.get(&2).map(String::as_str), Some("REPLACED"));
}

#[test]
fn test_replace_with_itself_keeps_content() {
    let mut fixture = Fixture::new();
    let before = fixture.read("notes.txt");
    let handle = fixture.manager().open("notes.txt").unwrap().clone();

    let replacement = handle.replace("line2", "line2").unwrap();

    assert_eq!(replacement.replaced_text, "line2");
    assert_eq!(fixture.read("notes.txt"), before);
}

#[test]
fn test_replace_absent_text_leaves_file_byte_identical() {
    let mut fixture = Fixture::new();
    fixture.write("crlf.txt", "one\r\ntwo\r\n");
    let handle = fixture.manager().open("crlf.txt").unwrap().clone();

    let err = handle.replace("three", "3").unwrap_err();

    assert!(matches!(err, FileError::NotFoundInContent(_)));
    assert_eq!(fixture.read("crlf.txt"), "one\r\ntwo\r\n");
}

#[test]
fn test_window_follows_scroll() {
    let mut fixture = Fixture::new();
    let body: String = (1..=250).map(|n| format!("row {n}\n")).collect();
    fixture.write("long.txt", &body);

    let handle = fixture.manager().open("long.txt").unwrap();
    assert_eq!(handle.read().unwrap().len(), 100);

    handle.scroll(200, ScrollDirection::Down);
    let window = handle.read().unwrap();
    assert_eq!(window.len(), 50);
    assert_eq!(window.keys().next(), Some(&201));
    assert_eq!(handle.total_lines().unwrap(), 250);
}

#[cfg(unix)]
#[test]
fn test_chdir_anywhere_on_the_same_root_is_allowed() {
    let mut fixture = Fixture::new();
    let other = tempfile::tempdir().unwrap();
    let other = other.path().canonicalize().unwrap();

    fixture.manager().chdir(&other).unwrap();

    assert_eq!(fixture.manager().working_dir(), other);
}

#[cfg(windows)]
#[test]
fn test_chdir_to_another_drive_is_denied() {
    let mut fixture = Fixture::new();
    let root = fixture.root();
    let other = if root.to_string_lossy().contains("Z:") { "Y:\\" } else { "Z:\\" };

    let err = fixture.manager().chdir(other).unwrap_err();

    assert!(matches!(err, FileError::AccessDenied(_)));
    assert_eq!(fixture.manager().working_dir(), root);
}

#[test]
fn test_chdir_then_relative_operations() {
    let mut fixture = Fixture::new();
    let root = fixture.root();
    let manager = fixture.manager();

    manager.chdir("src").unwrap();
    let handle = manager.open("lib.rs").unwrap();
    assert_eq!(handle.path(), root.join("src/lib.rs"));

    manager.chdir("../a/b").unwrap();
    assert_eq!(manager.working_dir(), root.join("a/b"));
    assert!(matches!(
        manager.chdir("missing").unwrap_err(),
        FileError::NotFound(_)
    ));
    assert_eq!(manager.working_dir(), root.join("a/b"));
}

#[rstest]
#[case::case_insensitive(true, &["README.md", "src/lib.rs", "src/nested/deep.rs"])]
#[case::exact_case(false, &["src/lib.rs", "src/nested/deep.rs"])]
fn test_grep_case(#[case] case_insensitive: bool, #[case] expected: &[&str]) {
    let mut fixture = Fixture::new();
    let options = GrepOptions::default().with_case_insensitive(case_insensitive);

    let results = fixture.manager().grep("hello", "", options).unwrap();

    let files: Vec<&str> = results.keys().map(String::as_str).collect();
    assert_eq!(files, expected);
}

#[rstest]
#[case::bounded(1, false)]
#[case::unbounded(0, true)]
fn test_find_depth(#[case] depth: usize, #[case] found: bool) {
    let mut fixture = Fixture::new();
    let options = FindOptions {
        depth,
        ..Default::default()
    };

    let results = fixture.manager().find(r"file\.txt$", &options).unwrap();

    assert_eq!(results.contains(&"a/b/file.txt".to_string()), found);
}

#[test]
fn test_tree_of_fixture() {
    let mut fixture = Fixture::new();
    let tree = fixture.manager().tree(Some(0), &[".git"]).unwrap();
    assert_eq!(tree, "__ README.md\n__ notes.txt\n__ .git\n__ a\n__ src\n");
}

#[tokio::test]
async fn test_command_timeout_budget() {
    let fixture = Fixture::new();
    let manager = FileManager::builder()
        .working_dir(fixture.root())
        .command_timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = manager.execute_command("sleep 10").await.unwrap_err();

    assert!(matches!(err, FileError::Timeout { .. }));
    assert!(err.to_string().starts_with("TIMEOUT: Command execution timed out"));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_default_command_timeout() {
    assert_eq!(
        fileshell_core::execution::DEFAULT_COMMAND_TIMEOUT,
        Duration::from_secs(120)
    );
}

#[test]
fn test_activation_binds_and_restores_process_directory() {
    let _lock = fixture::cwd_lock();
    let mut fixture = Fixture::new();
    let before = std::env::current_dir().unwrap();
    let id = fixture.manager_id.clone();

    {
        let _guard = fixture.manager().activate().unwrap();
        assert_eq!(std::env::current_dir().unwrap(), fixture.root());
        assert_eq!(active_manager_id(), Some(id));
    }

    assert_eq!(std::env::current_dir().unwrap(), before);
    assert_eq!(active_manager_id(), None);
}
