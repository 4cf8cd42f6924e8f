use assert_cmd::cargo::cargo_bin_cmd;

mod common;

use common::project_with_manifest;

#[cfg(unix)]
#[test]
fn successful_run_exits_zero() {
    let (_tmp, project) = project_with_manifest(
        "tx-exit-ok",
        r#"
[env.smoke]
isolated = false
commands = ["/bin/sh -c 'true'"]
"#,
    );
    cargo_bin_cmd!("tx")
        .current_dir(&project)
        .args(["run", "smoke"])
        .assert()
        .code(0);
}

#[cfg(unix)]
#[test]
fn run_exits_with_the_command_exit_code() {
    let (_tmp, project) = project_with_manifest(
        "tx-exit-code",
        r#"
[env.fail]
isolated = false
commands = ["/bin/sh -c 'exit 7'"]
"#,
    );
    cargo_bin_cmd!("tx")
        .current_dir(&project)
        .args(["run", "fail"])
        .assert()
        .code(7);
}

#[cfg(unix)]
#[test]
fn signalled_command_reports_shell_style_code() {
    // SIGKILL is 9; shell-style exit codes are 128 + signal.
    let (_tmp, project) = project_with_manifest(
        "tx-exit-signal",
        r#"
[env.doomed]
isolated = false
commands = ["/bin/sh -c 'kill -KILL $$'"]
"#,
    );
    cargo_bin_cmd!("tx")
        .current_dir(&project)
        .args(["run", "doomed"])
        .assert()
        .code(137);
}

#[test]
fn unknown_environment_is_a_user_error() {
    let (_tmp, project) = project_with_manifest(
        "tx-exit-unknown",
        "[env.tests]\nisolated = false\ncommands = [\"true\"]\n",
    );
    cargo_bin_cmd!("tx")
        .current_dir(&project)
        .args(["run", "nope"])
        .assert()
        .code(1);
}

#[test]
fn invalid_manifest_is_a_user_error() {
    let (_tmp, project) = project_with_manifest("tx-exit-invalid", "tx = [\n");
    cargo_bin_cmd!("tx")
        .current_dir(&project)
        .arg("list")
        .assert()
        .code(1);
}

#[test]
fn missing_manifest_is_a_user_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    cargo_bin_cmd!("tx")
        .current_dir(temp.path())
        .arg("list")
        .assert()
        .code(1);
}
