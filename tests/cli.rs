use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn synapscribe() -> Command {
    let mut cmd = Command::cargo_bin("synapscribe").unwrap();
    cmd.env_remove("PORT").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    synapscribe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("transcribe-event"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn transcribe_rejects_non_gcs_location() {
    synapscribe()
        .args(["transcribe", "s3://bucket/audio.mp3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("gs://bucket/object"));
}

#[test]
fn transcribe_event_missing_file() {
    synapscribe()
        .args(["transcribe-event", "--file", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}

#[test]
fn transcribe_event_rejects_event_without_object() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"id":"1","type":"google.cloud.storage.object.v1.finalized","data":{{"bucket":"b"}}}}"#).unwrap();

    synapscribe()
        .args(["transcribe-event", "--file"])
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing bucket or object name"));
}

#[test]
fn config_show_masks_keys() {
    synapscribe()
        .args(["config", "--show"])
        .env("GEMINI_API_KEY", "secret-key-1234")
        .assert()
        .success()
        .stdout(predicate::str::contains("****1234"))
        .stdout(predicate::str::contains("secret-key").not());
}
