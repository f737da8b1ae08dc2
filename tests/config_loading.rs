mod common;

use std::fs;
use std::path::{Path, PathBuf};

use bistro::config::{default_config_path, load_and_validate, load_from_path};
use bistro::errors::BistroError;
use common::TestResult;
use tempfile::TempDir;

fn write_config(contents: &str) -> Result<(TempDir, PathBuf), std::io::Error> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("Bistro.toml");
    fs::write(&path, contents)?;
    Ok((dir, path))
}

#[test]
fn loads_tasks_in_file_order() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[config]
base_dir = "site"
verbose = true

[task.zeta]
pattern = "styles/*.css"
read = true
run = ["alpha"]
update = "echo update"
remove = "echo remove"

[task.alpha]
pattern = "pages/**/*.html"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.config.base_dir.as_deref(), Some(Path::new("site")));
    assert!(cfg.config.verbose);

    let names: Vec<_> = cfg.tasks().iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha"]);

    let (_, zeta) = &cfg.tasks()[0];
    assert_eq!(zeta.pattern, "styles/*.css");
    assert!(zeta.read);
    assert_eq!(zeta.run, vec!["alpha"]);
    assert_eq!(zeta.update.as_deref(), Some("echo update"));
    assert_eq!(zeta.remove.as_deref(), Some("echo remove"));

    let (_, alpha) = &cfg.tasks()[1];
    assert!(!alpha.read);
    assert!(alpha.run.is_empty());
    assert!(alpha.update.is_none());
    Ok(())
}

#[test]
fn task_set_keeps_order_and_run_lists() -> TestResult {
    let (dir, path) = write_config(
        r#"
[task.b]
pattern = "*.b"
run = ["a"]
update = "true"

[task.a]
pattern = "*.a"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    let tasks = cfg.task_set(dir.path());
    assert_eq!(tasks.names().collect::<Vec<_>>(), vec!["b", "a"]);
    assert_eq!(tasks.get("b").map(|t| t.run.clone()), Some(vec!["a".to_string()]));
    assert_eq!(tasks.get("a").map(|t| t.pattern.as_str()), Some("*.a"));
    Ok(())
}

#[test]
fn config_section_is_optional() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[task.only]
pattern = "*.txt"
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert!(cfg.config.base_dir.is_none());
    assert!(!cfg.config.verbose);
    Ok(())
}

#[test]
fn unknown_run_target_is_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[task.a]
pattern = "*.a"
run = ["ghost"]
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BistroError::ConfigError(ref m) if m.contains("ghost")), "got {err:?}");
    Ok(())
}

#[test]
fn cycles_are_rejected() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[task.a]
pattern = "*.a"
run = ["b"]

[task.b]
pattern = "*.b"
run = ["a"]
"#,
    )?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BistroError::DagCycle(_)), "got {err:?}");
    Ok(())
}

#[test]
fn config_without_tasks_is_rejected() -> TestResult {
    let (_dir, path) = write_config("[config]\nverbose = true\n")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BistroError::ConfigError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn task_without_pattern_is_rejected() -> TestResult {
    let (_dir, path) = write_config("[task.a]\nrun = []\n")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BistroError::ConfigError(ref m) if m.contains("'a'")), "got {err:?}");
    Ok(())
}

#[test]
fn invalid_glob_is_rejected() -> TestResult {
    let (_dir, path) = write_config("[task.a]\npattern = \"src/[.rs\"\n")?;

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, BistroError::ConfigError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let (_dir, path) = write_config("[task.a\npattern = ")?;

    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, BistroError::TomlError(_)), "got {err:?}");
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_from_path("/definitely/not/here/Bistro.toml").unwrap_err();
    assert!(matches!(err, BistroError::IoError(_)), "got {err:?}");
}

#[test]
fn default_config_path_is_bistro_toml() {
    assert_eq!(default_config_path(), PathBuf::from("Bistro.toml"));
}
