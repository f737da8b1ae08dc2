mod common;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bistro::fs::mock::MockFileSystem;
use bistro::fs::FileSystem;
use bistro::watch::{
    collect_matching_files, flatten_watched, MockWatchBackend, PatternMatcher, WatchBackend,
    WatchEvent, WatchedFiles,
};
use common::{with_timeout, TestResult};

#[test]
fn single_star_does_not_cross_directories() -> TestResult {
    let top = PatternMatcher::new("*.test")?;
    assert!(top.matches("index.test"));
    assert!(!top.matches("sub/index.test"));

    let deep = PatternMatcher::new("./styles/**/*.css")?;
    assert_eq!(deep.pattern(), "styles/**/*.css");
    assert!(deep.matches("styles/main.css"));
    assert!(deep.matches("styles/a/b/main.css"));
    assert!(!deep.matches("pages/main.css"));
    Ok(())
}

#[test]
fn invalid_and_empty_patterns_are_rejected() {
    assert!(PatternMatcher::new("src/[.rs").is_err());
    assert!(PatternMatcher::new("   ").is_err());
}

#[test]
fn literal_prefix_stops_at_glob_syntax() -> TestResult {
    assert_eq!(PatternMatcher::new("styles/**/*.css")?.literal_prefix(), PathBuf::from("styles"));
    assert_eq!(PatternMatcher::new("a/b/*.md")?.literal_prefix(), PathBuf::from("a/b"));
    assert_eq!(PatternMatcher::new("*.test")?.literal_prefix(), PathBuf::new());
    assert_eq!(PatternMatcher::new("docs/index.md")?.literal_prefix(), PathBuf::from("docs"));
    Ok(())
}

#[test]
fn flatten_watched_joins_directories_and_entries_in_order() {
    let mut listing = BTreeMap::new();
    listing.insert(PathBuf::from("/a"), vec!["x.js", "y.js"]);
    listing.insert(PathBuf::from("/b"), vec!["z.js"]);

    assert_eq!(
        flatten_watched(&listing),
        vec![
            PathBuf::from("/a/x.js"),
            PathBuf::from("/a/y.js"),
            PathBuf::from("/b/z.js"),
        ]
    );

    let empty: Vec<(PathBuf, Vec<String>)> = Vec::new();
    assert!(flatten_watched(empty).is_empty());
}

#[test]
fn watched_files_track_membership() {
    let mut files = WatchedFiles::new();
    assert!(files.insert(Path::new("/p/b.test")));
    assert!(files.insert(Path::new("/p/a.test")));
    assert!(!files.insert(Path::new("/p/a.test")));
    assert!(files.insert(Path::new("/p/sub/c.test")));

    assert_eq!(files.len(), 3);
    assert!(files.contains(Path::new("/p/sub/c.test")));
    assert_eq!(
        files.to_vec(),
        vec![
            PathBuf::from("/p/a.test"),
            PathBuf::from("/p/b.test"),
            PathBuf::from("/p/sub/c.test"),
        ]
    );

    assert!(files.remove(Path::new("/p/sub/c.test")));
    assert!(!files.remove(Path::new("/p/sub/c.test")));
    assert_eq!(files.len(), 2);
}

#[test]
fn mock_file_system_builds_directories() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/project/a/b.txt", "hello");

    assert!(fs.is_dir(Path::new("/project")));
    assert!(fs.is_dir(Path::new("/project/a")));
    assert!(fs.is_file(Path::new("/project/a/b.txt")));
    assert_eq!(fs.read_to_string(Path::new("/project/a/b.txt"))?, "hello");
    assert_eq!(
        fs.read_dir(Path::new("/project/a"))?,
        vec![PathBuf::from("/project/a/b.txt")]
    );

    assert!(fs.remove_file("/project/a/b.txt"));
    assert!(!fs.exists(Path::new("/project/a/b.txt")));
    assert!(fs.read_dir(Path::new("/project/a"))?.is_empty());
    assert!(fs.read_to_string(Path::new("/project/a/b.txt")).is_err());
    Ok(())
}

#[test]
fn collect_matching_files_walks_only_the_literal_prefix() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/project/styles/main.css", "");
    fs.add_file("/project/styles/nested/extra.css", "");
    fs.add_file("/project/other/skip.css", "");
    let root = Path::new("/project");

    let matcher = PatternMatcher::new("styles/**/*.css")?;
    assert_eq!(
        collect_matching_files(&fs, root, &matcher)?,
        vec![
            PathBuf::from("/project/styles/main.css"),
            PathBuf::from("/project/styles/nested/extra.css"),
        ]
    );

    let missing = PatternMatcher::new("nowhere/*.css")?;
    assert!(collect_matching_files(&fs, root, &missing)?.is_empty());
    Ok(())
}

#[tokio::test]
async fn mock_backend_reports_startup_files_then_ready() -> TestResult {
    let backend = MockWatchBackend::new();
    backend.add_file("/project/a.test");
    backend.add_file("/project/b.txt");

    let mut sub = backend.watch(Path::new("/project"), "*.test")?;
    assert_eq!(
        with_timeout(sub.events.recv()).await,
        Some(WatchEvent::Add(PathBuf::from("/project/a.test")))
    );
    assert_eq!(with_timeout(sub.events.recv()).await, Some(WatchEvent::Ready));
    assert_eq!(sub.handle.watched(), vec![PathBuf::from("/project/a.test")]);

    backend.add_file("/project/a.test");
    assert_eq!(
        with_timeout(sub.events.recv()).await,
        Some(WatchEvent::Change(PathBuf::from("/project/a.test")))
    );

    sub.handle.close();
    sub.handle.close();
    assert_eq!(backend.open_subscriptions(), 0);
    assert_eq!(with_timeout(sub.events.recv()).await, None);
    Ok(())
}

#[test]
fn mock_backend_can_fail_on_demand() {
    let backend = MockWatchBackend::new();
    backend.fail_on("*.bad");
    assert!(backend.watch(Path::new("/project"), "*.bad").is_err());
    assert!(backend.watch(Path::new("/project"), "*.good").is_ok());
    assert_eq!(backend.watched_patterns(), vec!["*.good"]);
}
