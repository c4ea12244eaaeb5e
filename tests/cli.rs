//! CLI smoke tests for the `issue-maker` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::TempDir;

/// A command with a scrubbed environment, run from an empty directory so no
/// `.env` file is picked up.
fn issue_maker(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("issue-maker");
    cmd.env_clear().current_dir(dir.path());
    cmd
}

fn completion(content: &str) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}]
    })
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("generate"));
    }

    #[test]
    fn test_version() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir).arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_log_format_is_rejected() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir)
            .args(["--log-format", "xml", "generate"])
            .assert()
            .failure();
    }
}

mod serve {
    use super::*;

    #[test]
    fn test_serve_without_secrets_fails() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir)
            .arg("serve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("SECRET_KEY"))
            .stderr(predicate::str::contains("GITHUB_CLIENT_ID"))
            .stderr(predicate::str::contains("GITHUB_CLIENT_SECRET"))
            .stderr(predicate::str::contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_serve_reads_dotenv_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".env"), "SECRET_KEY=from-dotenv\n").unwrap();
        issue_maker(&dir)
            .arg("serve")
            .assert()
            .failure()
            .stderr(predicate::str::contains("GITHUB_CLIENT_ID"))
            .stderr(predicate::str::contains("SECRET_KEY,").not());
    }
}

mod generate {
    use super::*;

    #[test]
    fn test_generate_without_api_key_fails() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir)
            .arg("generate")
            .assert()
            .failure()
            .stderr(predicate::str::contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_generate_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        issue_maker(&dir)
            .env("OPENAI_API_KEY", "sk-test")
            .args(["generate", "does-not-exist.md"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("does-not-exist.md"));
    }

    #[test]
    fn test_generate_prints_validated_issues() {
        let server = MockServer::start();
        let reply = json!({"issues": [
            {"title": "  Set up CI  ", "body": "pipeline", "labels": ["infra", ""], "priority": 0},
            {"title": "", "body": "dropped"}
        ]})
        .to_string();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_includes("Checkout flow");
            then.status(200).json_body(completion(&reply));
        });

        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("requirements.md");
        fs::write(&doc, "# Shop\n\n- Checkout flow\n").unwrap();

        let output = issue_maker(&dir)
            .env("OPENAI_API_KEY", "sk-test")
            .env("OPENAI_API_BASE", format!("{}/v1", server.base_url()))
            .arg("generate")
            .arg(&doc)
            .output()
            .unwrap();
        assert!(output.status.success());
        mock.assert();

        let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
        let issues = printed["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0]["title"], "Set up CI");
        assert_eq!(issues[0]["labels"], json!(["infra"]));
        assert_eq!(issues[0]["priority"], 1);
        assert!(printed.get("fallback_reason").is_none());
    }

    #[test]
    fn test_generate_falls_back_when_llm_fails() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(503).body("overloaded");
        });

        let dir = TempDir::new().unwrap();
        let output = issue_maker(&dir)
            .env("OPENAI_API_KEY", "sk-test")
            .env("OPENAI_API_BASE", format!("{}/v1", server.base_url()))
            .env("ISSUE_PROFILE", "extended")
            .arg("generate")
            .output()
            .unwrap();
        assert!(output.status.success());

        let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(printed["fallback_reason"], "exception");
        assert_eq!(printed["issues"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn test_generate_keeps_logs_off_stdout() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(completion("not json at all"));
        });

        let dir = TempDir::new().unwrap();
        let output = issue_maker(&dir)
            .env("OPENAI_API_KEY", "sk-test")
            .env("OPENAI_API_BASE", format!("{}/v1", server.base_url()))
            .args(["--verbose", "generate"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(printed["fallback_reason"], "invalid json");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Generating issues from markdown"));
    }
}
