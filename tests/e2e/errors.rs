use serial_test::serial;

use crate::harness::{stderr, stdout, TestEnv};

#[test]
#[serial]
fn test_generate_without_image_fails() {
    let env = TestEnv::new("missing_image");
    let audio = env.write_file("voice.wav", "riff");

    let output = env.run_cli(&["generate", "--audio", audio.to_str().unwrap()]);
    assert!(
        !output.status.success(),
        "generate should fail without an image"
    );
    assert!(
        stderr(&output).contains("missing input"),
        "expected missing input error.\nstderr: {}",
        stderr(&output)
    );
}

#[test]
#[serial]
fn test_generate_json_reports_failure() {
    let env = TestEnv::new("json_failure");
    env.write_generator_config("exit 1\n");
    let image = env.write_file("face.png", "png");
    let audio = env.write_file("voice.wav", "riff");

    let output = env.run_cli(&[
        "generate",
        "--image",
        image.to_str().unwrap(),
        "--audio",
        audio.to_str().unwrap(),
        "--allow-non-square",
        "--json",
    ]);
    assert!(!output.status.success());

    let report: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("stdout should be a JSON report");
    assert_eq!(report["status"], "failure");
    assert_eq!(report["error"], "generation");
    assert_eq!(report["reason"], "generation error");
}

#[test]
#[serial]
fn test_invalid_config_is_rejected() {
    let env = TestEnv::new("bad_config");
    std::fs::write(env.config_path(), "[stages]\ngeneration = 0.2\n").unwrap();
    let image = env.write_file("face.png", "png");
    let audio = env.write_file("voice.wav", "riff");

    let output = env.run_cli(&[
        "generate",
        "--image",
        image.to_str().unwrap(),
        "--audio",
        audio.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    assert!(
        stderr(&output).contains("sum to 1.0"),
        "stderr: {}",
        stderr(&output)
    );
}
