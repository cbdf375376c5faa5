// Smoke tests for the compiled binary's argument handling. None of these
// reach the TUI: they either print and exit, or fail before raw mode.

use assert_cmd::Command;

fn taboo() -> Command {
    Command::cargo_bin("taboo").unwrap()
}

#[test]
fn help_lists_game_options() {
    let output = taboo().arg("--help").output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--player", "--rounds", "--seconds", "--skips", "--word-command"] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
}

#[test]
fn version_prints_package_version() {
    let output = taboo().arg("--version").output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn bad_skips_value_is_rejected() {
    let output = taboo().args(["--skips", "lots"]).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unlimited"));
}

#[test]
fn non_tty_stdin_is_rejected() {
    let output = taboo().write_stdin("").output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("stdin must be a tty"));
}
