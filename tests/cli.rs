//! End-to-end runs of the `af` binary against a temporary database.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn af(db: &Path, user: &str) -> Command {
    let mut cmd = Command::cargo_bin("af").unwrap();
    cmd.arg("--db")
        .arg(db)
        .arg("--json")
        .env_remove("AF_TEST_DB")
        .env_remove("RUST_LOG")
        .env("AURAFIN_USER_ID", user)
        .env("AURAFIN_USER_EMAIL", format!("{user}@aurafin.com"));
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

#[test]
fn test_version_json() {
    let temp = TempDir::new().unwrap();
    let v = stdout_json(af(&temp.path().join("a.db"), "u1").arg("version"));
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(v["schema_version"], 1);
    assert!(v["database"].as_str().unwrap().ends_with("a.db"));
}

#[test]
fn test_records_are_scoped_to_the_signed_in_user() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("data").join("aurafin.db");

    af(&db, "u1")
        .args(["auth", "sign-in", "u1@aurafin.com", "--password", "pw"])
        .assert()
        .success();
    let created = stdout_json(af(&db, "u1").args([
        "insert",
        "transactions",
        r#"{"description": "Coffee", "amount": 4.5, "type": "expense", "date": "2024-05-02"}"#,
    ]));
    assert_eq!(created["user_id"], "u1");

    let listed = stdout_json(af(&db, "u1").args(["query", "tx", "--eq", "description=Coffee"]));
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["rows"][0]["id"], created["id"]);

    // A different identity signing in over the same file sees nothing.
    af(&db, "u2")
        .args(["auth", "sign-in", "u2@aurafin.com", "--password", "pw"])
        .assert()
        .success();
    let listed = stdout_json(af(&db, "u2").args(["query", "transactions"]));
    assert_eq!(listed["count"], 0);
}

#[test]
fn test_insert_while_signed_out_is_unauthorized() {
    let temp = TempDir::new().unwrap();
    let db = temp.path().join("aurafin.db");

    let output = af(&db, "u1")
        .args(["insert", "cards", r#"{"name": "Nubank"}"#])
        .assert()
        .code(3)
        .get_output()
        .stderr
        .clone();
    let err: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(err["error"]["code"], "UNAUTHORIZED");
}

#[test]
fn test_unknown_table_suggests_closest() {
    let temp = TempDir::new().unwrap();
    let output = af(&temp.path().join("aurafin.db"), "u1")
        .args(["query", "reciepts"])
        .assert()
        .code(4)
        .get_output()
        .stderr
        .clone();
    let err: Value = serde_json::from_slice(&output).unwrap();
    assert!(err["error"]["message"].as_str().unwrap().contains("receipts"));
}
