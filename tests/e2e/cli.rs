use serial_test::serial;

use crate::harness::{stderr, stdout, TestEnv};

#[test]
#[serial]
fn test_cli_help_lists_commands() {
    let env = TestEnv::new("help");

    let output = env.run_cli(&["--help"]);
    assert!(output.status.success());

    let text = stdout(&output);
    for cmd in ["generate", "config", "completions"] {
        assert!(text.contains(cmd), "help missing {}.\nOutput:\n{}", cmd, text);
    }
}

#[test]
#[serial]
fn test_cli_config_shows_defaults_when_absent() {
    let env = TestEnv::new("config_defaults");

    let output = env.run_cli(&["config"]);
    assert!(
        output.status.success(),
        "memo-run config failed: {}",
        stderr(&output)
    );

    let text = stdout(&output);
    assert!(text.contains("not present"), "Output:\n{}", text);
    assert!(text.contains("program = \"python\""), "Output:\n{}", text);
    assert!(text.contains("generation = 0.7"), "Output:\n{}", text);
}

#[test]
#[serial]
fn test_cli_config_init_writes_file_once() {
    let env = TestEnv::new("config_init");

    let first = env.run_cli(&["config", "--init"]);
    assert!(first.status.success(), "init failed: {}", stderr(&first));
    assert!(env.config_path().exists());

    let second = env.run_cli(&["config", "--init"]);
    assert!(!second.status.success(), "second init should refuse to overwrite");
    assert!(stderr(&second).contains("already exists"));
}

#[test]
#[serial]
fn test_cli_completions() {
    let env = TestEnv::new("completions");

    let output = env.run_cli(&["completions", "bash"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("memo-run"));
}
