use serial_test::serial;

use crate::harness::{stderr, stdout, TestEnv};

const GENERATOR: &str = r#"
out=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output_dir) out="$2"; shift ;;
  esac
  shift
done
echo "loading model"
for p in 0 40 80 100; do printf '%s%%|####| %s/100\n' "$p" "$p" >&2; done
echo "video" > "$out/generated.mp4"
"#;

#[test]
#[serial]
fn test_generate_end_to_end() {
    let env = TestEnv::new("generate");
    env.write_generator_config(GENERATOR);
    let image = env.write_file("face.png", "png");
    let audio = env.write_file("voice.wav", "riff");

    let output = env.run_cli(&[
        "generate",
        "--image",
        image.to_str().unwrap(),
        "--audio",
        audio.to_str().unwrap(),
        "--allow-non-square",
    ]);
    assert!(
        output.status.success(),
        "generate failed: {}",
        stderr(&output)
    );

    let out = stdout(&output);
    assert!(out.contains("Generated video"), "stdout: {}", out);
    assert!(out.contains("generated.mp4"), "stdout: {}", out);

    let err = stderr(&output);
    assert!(err.contains("[PROGRESS]"), "stderr: {}", err);
    assert!(err.contains("100.0%"), "stderr: {}", err);
    assert!(image.exists(), "inputs are copied, not moved, by default");
    assert!(env.root().join("work").read_dir().unwrap().count() == 1);
}
