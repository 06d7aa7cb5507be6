//! Runs external programs on the host.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use chaos_core::{CommandError, CommandOutput, CommandRunner};

/// [`CommandRunner`] that spawns real processes and waits for them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        debug!(program, ?args, "Running command");
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CommandError::Spawn {
                program: program.to_string(),
                source,
            })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout_and_exit_code() {
        let out = SystemRunner
            .run("sh", &["-c".to_string(), "echo hello; echo oops >&2; exit 3".to_string()])
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let err = SystemRunner
            .run("definitely-not-a-real-binary-7f3a", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(err.to_string().contains("definitely-not-a-real-binary-7f3a"));
    }
}
