use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

/// Content root seeded with `a.txt`, `sub/b.txt` and `sub/c.wat`.
fn seeded_root() -> Result<(TempDir, PathBuf), Box<dyn Error>> {
    let dir = tempdir()?;
    let root = dir.path().join("content");
    fs::create_dir_all(root.join("sub"))?;
    fs::write(root.join("a.txt"), "a")?;
    fs::write(root.join("sub/b.txt"), "b")?;
    fs::write(root.join("sub/c.wat"), "(module)")?;
    Ok((dir, root))
}

fn cli(dir: &Path, root: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("wastudio-cli")?;
    cmd.current_dir(dir).arg("--root").arg(root);
    Ok(cmd)
}

#[test]
fn list_prints_every_file_depth_first() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .arg("list")
        .assert()
        .success()
        .stdout("a.txt\nsub/b.txt\nsub/c.wat\n");

    Ok(())
}

#[test]
fn glob_filters_with_braces() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .args(["glob", "**/*.{wat,md}"])
        .assert()
        .success()
        .stdout("sub/c.wat\n");

    cli(dir.path(), &root)?
        .args(["glob", "*.txt"])
        .assert()
        .success()
        .stdout("a.txt\n");

    Ok(())
}

#[test]
fn ls_marks_directories_and_rejects_files() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .arg("ls")
        .assert()
        .success()
        .stdout("a.txt\nsub/\n");

    cli(dir.path(), &root)?
        .args(["ls", "a.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));

    Ok(())
}

#[test]
fn new_file_reuses_or_renames_existing_names() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .args(["new-file", "sub/b.txt"])
        .assert()
        .success()
        .stdout("sub/b.txt\n");
    assert_eq!(fs::read_to_string(root.join("sub/b.txt"))?, "b");

    cli(dir.path(), &root)?
        .args(["new-file", "sub/b.txt", "--allow-rename"])
        .assert()
        .success()
        .stdout("sub/b.2.txt\n");
    assert!(root.join("sub/b.2.txt").is_file());

    Ok(())
}

#[test]
fn new_notebook_creates_parents_and_nbformat_document() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .args(["new-file", "notebooks/Analysis.ipynb", "--notebook"])
        .assert()
        .success()
        .stdout("notebooks/Analysis.ipynb\n");

    let text = fs::read_to_string(root.join("notebooks/Analysis.ipynb"))?;
    assert!(text.contains("nbformat"));
    Ok(())
}

#[test]
fn mkdir_rm_and_mv_edit_the_tree() -> Result<(), Box<dyn Error>> {
    let (dir, root) = seeded_root()?;

    cli(dir.path(), &root)?
        .args(["mkdir", "build/out"])
        .assert()
        .success()
        .stdout("build/out\n");
    assert!(root.join("build/out").is_dir());

    cli(dir.path(), &root)?
        .args(["mv", "sub/b.txt", "renamed.txt"])
        .assert()
        .success()
        .stdout("sub/renamed.txt\n");
    assert!(root.join("sub/renamed.txt").is_file());
    assert!(!root.join("sub/b.txt").exists());

    cli(dir.path(), &root)?
        .args(["mv", "sub/renamed.txt", "c.wat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    cli(dir.path(), &root)?
        .args(["rm", "sub"])
        .assert()
        .success();
    assert!(!root.join("sub").exists());

    cli(dir.path(), &root)?
        .args(["rm", "missing.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    Ok(())
}
