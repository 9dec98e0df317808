//! Integration tests for the sqldump-csv binary.

use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn sqldump_csv() -> Command {
    Command::new(env!("CARGO_BIN_EXE_sqldump-csv"))
}

const DUMP: &str = r#"-- MySQL dump 10.13
/*!40101 SET NAMES utf8 */;
DROP TABLE IF EXISTS `users`;
CREATE TABLE `users` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `name` varchar(255) NOT NULL,
  `active` tinyint(1) DEFAULT NULL,
  `created_at` datetime NOT NULL,
  PRIMARY KEY (`id`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;
LOCK TABLES `users` WRITE;
INSERT INTO `users` VALUES (1,'Nancy',1,'2025-01-01 12:00:00'),(2,'O\'Brien',NULL,'2025-01-02 08:30:00');
UNLOCK TABLES;
CREATE TABLE `sessions` (
  `id` varchar(64) NOT NULL
) ENGINE=InnoDB;
INSERT INTO `sessions` VALUES ('abc'),('def');
"#;

#[test]
fn test_convert_basic() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dump.sql");
    let out = temp_dir.path().join("out");
    fs::write(&input, DUMP).unwrap();

    let output = sqldump_csv()
        .args(["convert", input.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert_eq!(
        fs::read_to_string(out.join("users.schema")).unwrap(),
        "id\tINTEGER\nname\tSTRING\nactive\tINTEGER\ncreated_at\tTIMESTAMP\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("users.000.csv")).unwrap(),
        "1,\"Nancy\",1,\"2025-01-01 12:00:00\"\n2,\"O Brien\",,\"2025-01-02 08:30:00\"\n"
    );
    assert_eq!(
        fs::read_to_string(out.join("sessions.000.csv")).unwrap(),
        "\"abc\"\n\"def\"\n"
    );
}

#[test]
fn test_convert_deny_and_compress() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dump.sql");
    let out = temp_dir.path().join("out");
    fs::write(&input, DUMP).unwrap();

    let output = sqldump_csv()
        .args([
            "convert",
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--deny",
            "sessions",
            "-z",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(out.join("users.000.csv.gz").exists());
    assert!(!out.join("sessions.schema").exists());
    assert!(!out.join("sessions.000.csv.gz").exists());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["statistics"]["tables_skipped"], 1);
    assert_eq!(json["statistics"]["records"], 2);
}

#[test]
fn test_convert_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dump.sql");
    let config = temp_dir.path().join("convert.yaml");
    let out = temp_dir.path().join("out");
    fs::write(&input, DUMP).unwrap();
    fs::write(&config, "allow: users\n").unwrap();

    let output = sqldump_csv()
        .args([
            "convert",
            input.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "-c",
            config.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "Command failed: {:?}", output);

    assert!(out.join("users.000.csv").exists());
    assert!(!out.join("sessions.000.csv").exists());
}

#[test]
fn test_convert_stdin() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("out");

    let mut child = sqldump_csv()
        .args(["convert", "-o", out.to_str().unwrap()])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(DUMP.as_bytes())
        .unwrap();
    let status = child.wait().unwrap();
    assert!(status.success());

    assert!(out.join("users.schema").exists());
    assert!(out.join("sessions.000.csv").exists());
}

#[test]
fn test_convert_structural_error_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("bad.sql");
    let out = temp_dir.path().join("out");
    fs::write(&input, "INSERT INTO `t` VALUES (1,(2));\n").unwrap();

    let output = sqldump_csv()
        .args(["convert", input.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nested '('"), "stderr: {}", stderr);
}

#[test]
fn test_convert_keep_going_json() {
    let temp_dir = TempDir::new().unwrap();
    let bad = temp_dir.path().join("a_bad.sql");
    let good = temp_dir.path().join("b_good.sql");
    let out = temp_dir.path().join("out");
    fs::write(&bad, "INSERT INTO `x` VALUES (1));\n").unwrap();
    fs::write(&good, DUMP).unwrap();

    let pattern = temp_dir.path().join("*.sql");
    let output = sqldump_csv()
        .args([
            "convert",
            pattern.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
            "--keep-going",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total_inputs"], 2);
    assert_eq!(json["succeeded"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["results"][0]["status"], "failed");
    assert_eq!(json["statistics"]["records"], 4);
    assert!(out.join("users.000.csv").exists());
}

#[test]
fn test_status_reports_fresh_tables() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("dump.sql");
    let out = temp_dir.path().join("out");
    fs::write(&input, DUMP).unwrap();

    let output = sqldump_csv()
        .args(["convert", input.to_str().unwrap(), "-o", out.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    fs::remove_file(out.join("sessions.000.csv")).unwrap();

    let output = sqldump_csv()
        .args(["status", out.to_str().unwrap(), "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "Command failed: {:?}", output);

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tables = json.as_array().unwrap();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0]["table"], "sessions");
    assert_eq!(tables[0]["fresh"], false);
    assert_eq!(tables[1]["table"], "users");
    assert_eq!(tables[1]["columns"], 4);
    assert_eq!(tables[1]["chunks"], 1);
    assert_eq!(tables[1]["fresh"], true);
}
