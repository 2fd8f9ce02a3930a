//! Generator that delegates to an external script.

use async_trait::async_trait;
use tokio::process::Command;

use super::{ConfigGenerator, GenerateError};

pub struct CommandGenerator {
    command: Vec<String>,
}

impl CommandGenerator {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    fn command_line(&self) -> String {
        self.command.join(" ")
    }
}

#[async_trait]
impl ConfigGenerator for CommandGenerator {
    async fn generate(&self) -> Result<(), GenerateError> {
        let (program, args) = self.command.split_first().ok_or(GenerateError::EmptyCommand)?;
        let command_line = self.command_line();

        tracing::info!(command = %command_line, "Running config generator");
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| GenerateError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!(command = %command_line, "{line}");
        }

        if !output.status.success() {
            return Err(GenerateError::CommandFailed {
                command: command_line,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> CommandGenerator {
        CommandGenerator::new(vec!["/bin/sh".into(), "-c".into(), script.into()])
    }

    #[tokio::test]
    async fn successful_command() {
        sh("echo generated").generate().await.unwrap();
    }

    #[tokio::test]
    async fn failing_command_carries_stderr() {
        let err = sh("echo 'missing key' >&2; exit 1").generate().await.unwrap_err();
        match err {
            GenerateError::CommandFailed { code, stderr, .. } => {
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "missing key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_and_missing_commands() {
        let err = CommandGenerator::new(Vec::new()).generate().await.unwrap_err();
        assert!(matches!(err, GenerateError::EmptyCommand));

        let err = CommandGenerator::new(vec!["/nonexistent/configure".into()])
            .generate()
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Spawn { .. }));
    }
}
