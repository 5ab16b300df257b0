use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::ExecutorConfig;
use crate::error::{GridError, Result};

/// Captured outcome of one scheduler command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub exit_code: i32,
    pub std_out: Vec<String>,
    pub std_err: Vec<String>,
}

impl CommandResult {
    pub fn new<O, E>(exit_code: i32, std_out: O, std_err: E) -> Self
    where
        O: IntoIterator,
        O::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            exit_code,
            std_out: std_out.into_iter().map(Into::into).collect(),
            std_err: std_err.into_iter().map(Into::into).collect(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The `NonZeroExit` error describing this result.
    pub fn failure(&self, program: &str) -> GridError {
        GridError::NonZeroExit {
            program: program.to_string(),
            code: self.exit_code,
            stderr: self.std_err.join("\n"),
        }
    }

    /// Fails with `NonZeroExit` unless the command exited with 0.
    pub fn ensure_success(&self, program: &str) -> Result<&Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(self.failure(program))
        }
    }
}

/// Runs an argument vector as a process. Implemented by [`CommandExecutor`]
/// and by scripted executors in tests.
#[async_trait]
pub trait Execute: Send + Sync {
    async fn execute(&self, argv: &[String]) -> Result<CommandResult>;
}

/// Spawns scheduler binaries directly, without a shell.
///
/// Arguments reach the program exactly as the compiler produced them: no
/// globbing, no variable expansion, no re-quoting.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    config: ExecutorConfig,
}

impl CommandExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    fn program_path(&self, program: &str) -> PathBuf {
        match &self.config.program_dir {
            Some(dir) if !program.contains('/') => dir.join(program),
            _ => PathBuf::from(program),
        }
    }

    fn process_output(program: &str, output: std::process::Output) -> CommandResult {
        let exit_code = match output.status.code() {
            Some(code) => code,
            None => {
                tracing::warn!(program, status = %output.status, "Command terminated by signal");
                -1
            }
        };
        let result = CommandResult {
            exit_code,
            std_out: split_lines(&output.stdout),
            std_err: split_lines(&output.stderr),
        };

        tracing::info!(
            program,
            exit_code,
            stdout_lines = result.std_out.len(),
            stderr_lines = result.std_err.len(),
            "Command finished"
        );
        result
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Execute for CommandExecutor {
    async fn execute(&self, argv: &[String]) -> Result<CommandResult> {
        let Some((program, args)) = argv.split_first() else {
            return Err(GridError::ProcessStart {
                program: String::new(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
            });
        };
        let path = self.program_path(program);
        tracing::info!(program = %path.display(), args = ?args, "Executing command");

        let output = Command::new(&path)
            .args(args)
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| {
                tracing::error!(program = %path.display(), error = %source, "Command failed to start");
                GridError::ProcessStart {
                    program: program.clone(),
                    source,
                }
            })?;

        Ok(Self::process_output(program, output))
    }
}
