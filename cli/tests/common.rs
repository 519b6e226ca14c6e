use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
};
use tempfile::TempDir;

/// Runs the `bp` binary against a throwaway configuration file.
pub struct TestCli {
    cli_path: PathBuf,
    config_dir: TempDir,
}

impl TestCli {
    pub fn new() -> Self {
        TestCli {
            cli_path: PathBuf::from(env!("CARGO_BIN_EXE_bp")),
            config_dir: tempfile::tempdir().expect("Could not create a temporary directory"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.json")
    }

    pub fn work_dir(&self) -> &Path {
        self.config_dir.path()
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.cli_path);
        command
            .env_remove("RUST_LOG")
            .env_remove("GOOGLE_CREDENTIALS_JSON")
            .arg("--config-file")
            .arg(self.config_path());
        command
    }

    pub fn run(&self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> String {
        self.output(self.command().args(args))
    }

    pub fn run_and_error(&self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> String {
        self.output_error(self.command().args(args))
    }

    pub fn output(&self, command: &mut Command) -> String {
        let output = command.output().unwrap();

        if !output.status.success() {
            panic!(
                "failed to run command:\n{}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        String::from_utf8(output.stdout).unwrap()
    }

    pub fn output_error(&self, command: &mut Command) -> String {
        let output = command.output().unwrap();

        if output.status.success() {
            panic!(
                "succeeded running command (expected failure):\n{}",
                String::from_utf8_lossy(&output.stdout)
            );
        }
        assert_eq!(output.status.code(), Some(1));

        String::from_utf8(output.stderr).unwrap()
    }
}
