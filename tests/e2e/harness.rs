use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

pub struct TestEnv {
    _temp: tempfile::TempDir,
    root: PathBuf,
    config_path: PathBuf,
}

impl TestEnv {
    pub fn new(name: &str) -> Self {
        let temp = tempfile::Builder::new()
            .prefix(&format!("memo-e2e-{}-", name))
            .tempdir()
            .expect("create temp dir");
        let root = temp.path().to_path_buf();
        fs::create_dir_all(root.join("work")).expect("create work root");
        Self {
            config_path: root.join("config.toml"),
            root,
            _temp: temp,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write fixture");
        path
    }

    /// Config that runs `script` under `sh` as the generator.
    pub fn write_generator_config(&self, script: &str) {
        let script_path = self.write_file("generator.sh", script);
        let toml = format!(
            r#"
[generator]
program = "sh"
args = ["{}"]

[job]
work_root = "{}"
poll_interval_ms = 5
"#,
            script_path.display(),
            self.root.join("work").display()
        );
        fs::write(&self.config_path, toml).expect("write config");
    }

    pub fn run_cli(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_memo-run"))
            .args(args)
            .env("MEMO_RUNNER_CONFIG", &self.config_path)
            .env("RUST_LOG", "memo_runner=warn")
            .output()
            .expect("run memo-run")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
