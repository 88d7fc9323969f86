//! Corruption recovery tests for petpal.
//!
//! These tests verify the system can handle:
//! - Corrupted WAL lines
//! - A torn final WAL line
//! - A pet snapshot that lags behind the WAL
//! - Unreadable snapshots (reported as operational failures)

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn cli(data_dir: &Path, config: &Path, now: &str) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("petpal"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .arg("--config")
        .arg(config)
        .arg("--now")
        .arg(now);
    cmd
}

struct Fixture {
    _temp_dir: TempDir,
    data_dir: PathBuf,
    config: PathBuf,
    couple_id: String,
}

impl Fixture {
    fn cli(&self, now: &str) -> Command {
        cli(&self.data_dir, &self.config, now)
    }

    fn act(&self, now: &str, action: &str) -> Value {
        let out = self
            .cli(now)
            .args([
                "action",
                "--couple-id",
                &self.couple_id,
                "--action-type",
                action,
                "--user-id",
                "1",
            ])
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stdout));
        serde_json::from_slice(&out.stdout).unwrap()
    }

    fn pet(&self, now: &str) -> Value {
        let out = self
            .cli(now)
            .args(["pet", "--couple-id", &self.couple_id])
            .output()
            .unwrap();
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stdout));
        serde_json::from_slice(&out.stdout).unwrap()
    }

    fn wal_path(&self) -> PathBuf {
        self.data_dir.join("actions.wal")
    }

    fn pet_path(&self) -> PathBuf {
        self.data_dir
            .join("pets")
            .join(format!("{}.json", self.couple_id))
    }
}

fn setup() -> Fixture {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = temp_dir.path().join("data");
    let config = temp_dir.path().join("config.toml");
    fs::write(&config, "").unwrap();

    let now = "2024-05-01T12:00:00Z";
    let out = cli(&data_dir, &config, now)
        .args(["create-couple", "--user1-id", "1", "--user2-id", "2"])
        .output()
        .unwrap();
    let couple: Value = serde_json::from_slice(&out.stdout).unwrap();
    let couple_id = couple["couple_id"].as_u64().unwrap().to_string();

    cli(&data_dir, &config, now)
        .args(["create-pet", "--couple-id", &couple_id, "--pet-type", "dog"])
        .assert()
        .success();

    Fixture {
        _temp_dir: temp_dir,
        data_dir,
        config,
        couple_id,
    }
}

#[test]
fn test_corrupted_wal_lines_are_skipped() {
    let fx = setup();
    fx.act("2024-05-01T12:00:00Z", "pet");

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(fx.wal_path())
        .unwrap();
    writeln!(file, "{{ invalid json }}").unwrap();
    writeln!(file, "not even close").unwrap();
    drop(file);

    let out = fx
        .cli("2024-05-01T12:05:00Z")
        .args(["history", "--couple-id", &fx.couple_id])
        .output()
        .unwrap();
    assert!(out.status.success());
    let history: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(history["actions"].as_array().unwrap().len(), 1);

    // New actions still append cleanly
    fx.act("2024-05-01T12:10:00Z", "play");
    let out = fx
        .cli("2024-05-01T12:11:00Z")
        .args(["history", "--couple-id", &fx.couple_id])
        .output()
        .unwrap();
    let history: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(history["actions"].as_array().unwrap().len(), 2);
}

#[test]
fn test_torn_wal_tail_does_not_swallow_next_record() {
    let fx = setup();
    fx.act("2024-05-01T12:00:00Z", "pet");

    // Simulate a crash mid-write: partial line with no newline
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(fx.wal_path())
        .unwrap();
    write!(file, "{{\"id\":\"0000").unwrap();
    drop(file);

    fx.act("2024-05-01T12:10:00Z", "play");

    let wal = fs::read_to_string(fx.wal_path()).unwrap();
    let valid = wal
        .lines()
        .filter(|line| serde_json::from_str::<Value>(line).is_ok())
        .count();
    assert_eq!(valid, 2);
}

#[test]
fn test_stale_snapshot_rolls_forward_from_wal() {
    let fx = setup();
    let stale = fs::read_to_string(fx.pet_path()).unwrap();

    let acted = fx.act("2024-05-01T12:05:00Z", "play");
    assert_eq!(acted["pet"]["experience"], 15);

    // Lose the snapshot write that followed the WAL append
    fs::write(fx.pet_path(), stale).unwrap();

    let pet = fx.pet("2024-05-01T12:05:00Z");
    assert_eq!(pet["experience"], 15);
    assert_eq!(pet["happiness"], acted["pet"]["happiness"]);
}

#[test]
fn test_unreadable_snapshot_is_operational_failure() {
    let fx = setup();
    fs::write(fx.pet_path(), "{ invalid json }}}}").unwrap();

    let out = fx
        .cli("2024-05-01T12:00:00Z")
        .args(["pet", "--couple-id", &fx.couple_id])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(2));
    let failure: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(failure["success"], false);
}
