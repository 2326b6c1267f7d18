//! End-to-end tests for the `sitewatch` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// `sitewatch` rooted in `dir`, isolated from the caller's environment.
fn sitewatch(dir: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("sitewatch");
    cmd.current_dir(dir.path())
        .arg("--project-dir")
        .arg(dir.path())
        .env_remove("SITEWATCH_FEED_URL")
        .env_remove("SITEWATCH_API_URL")
        .env_remove("SITEWATCH_PROPERTY_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

mod cli_basics {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("watch"))
            .stdout(predicate::str::contains("logs"))
            .stdout(predicate::str::contains("domain-emails"));
    }

    #[test]
    fn test_version() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_unknown_ui_mode_is_rejected() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["watch", "--ui", "fancy"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid UI mode"));
    }
}

mod config_commands {
    use super::*;

    #[test]
    fn test_init_creates_file() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created sitewatch.toml"));

        let path = dir.path().join(".sitewatch/sitewatch.toml");
        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("[feed]"));
        assert!(content.contains("delay_ms = 5000"));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = create_temp_project();
        sitewatch(&dir).args(["config", "init"]).assert().success();
        sitewatch(&dir)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn test_show_without_file_uses_dev_fallback() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No sitewatch.toml found"))
            .stdout(predicate::str::contains("ws://localhost:9500/ws"))
            .stdout(predicate::str::contains("dev fallback"));
    }

    #[test]
    fn test_show_reports_cli_override_source() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["--feed-url", "wss://feed.example.com/ws", "config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wss://feed.example.com/ws"))
            .stdout(predicate::str::contains("command line"));
    }

    #[test]
    fn test_env_feed_url_is_used() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .env("SITEWATCH_FEED_URL", "wss://env.example.com/ws")
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("wss://env.example.com/ws"))
            .stdout(predicate::str::contains("environment"));
    }

    #[test]
    fn test_validate_reports_warnings() {
        let dir = create_temp_project();
        let config_dir = dir.path().join(".sitewatch");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("sitewatch.toml"),
            "[feed]\nurl = \"http://not-a-socket\"\nhistory = 0\n",
        )
        .unwrap();

        sitewatch(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings"));
    }

    #[test]
    fn test_validate_without_file_is_valid() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Using defaults (valid)"));
    }
}

mod endpoint_errors {
    use super::*;

    #[test]
    fn test_http_feed_url_is_rejected() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["--feed-url", "http://feed.example.com", "leads", "list", "--domain", "a.com"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Feed URL from command line is not usable"));
    }

    #[test]
    fn test_search_without_property_url_fails_fast() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["projects", "search", "lake"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Property search URL is not configured"));
    }

    #[test]
    fn test_invalid_lead_is_rejected_before_any_request() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["leads", "add", "--domain", "a.com", "--name", " ", "--mobile", "98000"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("name is required"));
    }

    #[test]
    fn test_delete_without_confirmation_is_cancelled() {
        let dir = create_temp_project();
        sitewatch(&dir)
            .args(["projects", "delete", "p1"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cancelled"));
    }
}
