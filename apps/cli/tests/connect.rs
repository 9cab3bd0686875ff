use std::error::Error;
use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn connect_saves_server_address() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("settings/wastudio.json");

    Command::cargo_bin("wastudio-cli")?
        .current_dir(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["connect", "https://lab.example.com:8443/tree?token=abc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Server: https://lab.example.com:8443"))
        .stdout(predicate::str::contains("Websocket: wss://lab.example.com:8443"));

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config)?)?;
    assert_eq!(
        saved["server"],
        "https://lab.example.com:8443/tree?token=abc"
    );
    Ok(())
}

#[test]
fn connect_keeps_existing_root() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let config = dir.path().join("wastudio.json");
    fs::write(&config, r#"{ "root": "content" }"#)?;

    Command::cargo_bin("wastudio-cli")?
        .current_dir(dir.path())
        .args(["connect", "http://localhost:8888/"])
        .assert()
        .success();

    let saved: serde_json::Value = serde_json::from_str(&fs::read_to_string(&config)?)?;
    assert_eq!(saved["root"], "content");
    assert_eq!(saved["server"], "http://localhost:8888/");
    Ok(())
}

#[test]
fn connect_rejects_non_http_address() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    Command::cargo_bin("wastudio-cli")?
        .current_dir(dir.path())
        .args(["connect", "ftp://localhost:21"])
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("Error:"));

    assert!(!dir.path().join("wastudio.json").exists());
    Ok(())
}

#[test]
fn configured_root_is_used_without_flags() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::create_dir(dir.path().join("content"))?;
    fs::write(dir.path().join("content/main.wat"), "(module)")?;
    fs::write(
        dir.path().join("wastudio.json"),
        r#"{ "root": "content" }"#,
    )?;

    Command::cargo_bin("wastudio-cli")?
        .current_dir(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout("main.wat\n");
    Ok(())
}
