//! Helpers for running the date-store binary in tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// CLI command builder bound to one store file
pub struct DsCommand {
    store_path: PathBuf,
    home: PathBuf,
    args: Vec<String>,
    log_filter: Option<String>,
}

impl DsCommand {
    /// Command against `{dir}/dates.json`, with HOME and XDG_CONFIG_HOME inside `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            store_path: dir.join("dates.json"),
            home: dir.to_path_buf(),
            args: Vec::new(),
            log_filter: None,
        }
    }

    /// Run with `RUST_LOG` set to `filter`
    pub fn log(&mut self, filter: &str) -> &mut Self {
        self.log_filter = Some(filter.to_string());
        self
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Run with `--path` pointing at the test store
    pub fn execute(&self) -> Result<CommandResult> {
        let mut args = vec!["--path".to_string(), self.store_path.display().to_string()];
        args.extend(self.args.iter().cloned());
        self.run(&args)
    }

    /// Run without `--path` so the store location is derived from the environment
    pub fn execute_unpinned(&self) -> Result<CommandResult> {
        self.run(&self.args)
    }

    fn run(&self, args: &[String]) -> Result<CommandResult> {
        let mut command = Command::new(env!("CARGO_BIN_EXE_date-store"));
        command
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_CONFIG_HOME", self.home.join(".config"));
        match &self.log_filter {
            Some(filter) => command.env("RUST_LOG", filter),
            None => command.env_remove("RUST_LOG"),
        };

        let output = command
            .output()
            .context("Failed to execute date-store")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Non-empty stdout lines
    pub fn lines(&self) -> Vec<&str> {
        self.stdout.lines().filter(|l| !l.trim().is_empty()).collect()
    }
}

/// Build a command in `dir` with the given arguments
///
/// ```ignore
/// ds!(dir, "set", "build").assert_success()?;
/// ```
#[macro_export]
macro_rules! ds {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::DsCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}
