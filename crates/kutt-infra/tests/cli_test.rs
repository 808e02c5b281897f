mod common;

use assert_cmd::Command;
use common::{TestProject, stack_file};
use predicates::prelude::*;

#[allow(deprecated)]
fn kutt_infra() -> Command {
    Command::cargo_bin("kutt-infra").unwrap()
}

/// Help lists every command
#[test]
fn test_cli_help() {
    kutt_infra()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Provision the kutt URL shortener"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("outputs"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_cli_version() {
    kutt_infra()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("kutt-infra"));
}

#[test]
fn test_up_help() {
    kutt_infra()
        .args(["up", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--yes"))
        .stdout(predicate::str::contains("--stack"));
}

#[test]
fn test_invalid_command() {
    kutt_infra().arg("invalid-command").assert().failure();
}

/// Without a stack file every command but `version` fails
#[test]
fn test_missing_stack_file() {
    let project = TestProject::new();
    project
        .cmd()
        .arg("preview")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Kutt.prod.yaml"));
}

/// `--stack` picks the matching stack file
#[test]
fn test_stack_flag_selects_file() {
    let project = TestProject::with_stack_file(&stack_file(false));
    project
        .cmd()
        .args(["validate", "--stack", "staging"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_stack_from_env() {
    let project = TestProject::new();
    project.write(".kutt-infra/Kutt.staging.yaml", &stack_file(false));
    project
        .cmd()
        .env("KUTT_INFRA_STACK", "staging")
        .arg("validate")
        .assert()
        // the staging stack references jaxxstorm/*/staging, which the file lacks
        .failure()
        .stderr(predicate::str::contains("jaxxstorm/vpc/staging"));
}

#[test]
fn test_validate() {
    let project = TestProject::with_stack_file(&stack_file(true));
    project
        .cmd()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Stack file is valid"))
        .stdout(predicate::str::contains("jaxxstorm/vpc/prod"))
        .stdout(predicate::str::contains("brig.gs"));
}

#[test]
fn test_validate_requires_admin_emails() {
    let content = stack_file(false).replace("  admin_emails: ops@brig.gs\n", "");
    let project = TestProject::with_stack_file(&content);
    project
        .cmd()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("admin_emails"));
}

#[test]
fn test_secret_env_override_is_used() {
    let content = stack_file(false).replace("  google_safe_browsing_api_key: safe-browsing-key\n", "");
    let project = TestProject::with_stack_file(&content);

    project
        .cmd()
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("google_safe_browsing_api_key"));

    project
        .cmd()
        .env("KUTT_INFRA_SECRET_GOOGLE_SAFE_BROWSING_API_KEY", "from-env")
        .arg("validate")
        .assert()
        .success();
}
