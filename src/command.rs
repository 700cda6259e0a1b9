//! External command execution
//!
//! Every OS utility and speedtest binary is invoked through [`CommandRunner`],
//! so the rest of the crate can be exercised with scripted output.

use crate::error::{AppError, Result};
use crate::logging::CommandLogger;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

/// Captured result of a finished child process
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the child was terminated by a signal
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Spawns external programs
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion and capture both streams.
    ///
    /// Fails only when the program cannot be started; a non-zero exit is
    /// reported through [`CommandOutput::exit_code`].
    async fn capture(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Trimmed stdout on success, `None` on a missing binary or non-zero exit
    async fn run(&self, program: &str, args: &[&str]) -> Option<String> {
        match self.capture(program, args).await {
            Ok(output) if output.success() => Some(output.stdout.trim().to_string()),
            _ => None,
        }
    }

    /// Like [`run`](Self::run) but keeps the failure reason
    async fn run_checked(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = self.capture(program, args).await?;
        if output.success() {
            Ok(output.stdout.trim().to_string())
        } else {
            Err(AppError::command(format!(
                "{} {} exited with {}: {}",
                program,
                args.join(" "),
                output.exit_code.map_or("signal".to_string(), |c| c.to_string()),
                output.stderr.trim()
            )))
        }
    }
}

/// Runs commands with `tokio::process`
pub struct SystemCommandRunner {
    logger: CommandLogger,
}

impl SystemCommandRunner {
    pub fn new(logger: CommandLogger) -> Self {
        Self { logger }
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn capture(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let owned: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.logger.log_invocation(program, &owned).await;

        // A cancelled run must not leave a speedtest running in the background.
        let output = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                self.logger.log_spawn_error(program, &e.to_string()).await;
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    AppError::tool_unavailable(format!("{} not found in PATH", program))
                } else {
                    AppError::command(format!("failed to start {}: {}", program, e))
                });
            }
        };

        let captured = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };

        if !captured.success() {
            self.logger.log_failure(program, captured.exit_code, &captured.stderr).await;
        }

        Ok(captured)
    }
}

/// Locate an executable on `PATH`; paths containing a separator are checked as-is
pub fn find_in_path(binary: &str) -> Option<PathBuf> {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        let candidate = PathBuf::from(binary);
        return is_executable(&candidate).then_some(candidate);
    }

    let path_var = std::env::var_os("PATH")?;
    for segment in std::env::split_paths(&path_var) {
        let candidate = segment.join(binary);
        if is_executable(&candidate) {
            return Some(candidate);
        }
    }

    None
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}


#[cfg(test)]
mod tests {
    use super::fake::FakeRunner;
    use super::*;
    use crate::logging::{LogLevel, Logger};

    fn system_runner() -> SystemCommandRunner {
        SystemCommandRunner::new(CommandLogger::new(Logger::new("TEST").with_level(LogLevel::Fatal)))
    }

    #[tokio::test]
    async fn test_run_returns_trimmed_stdout() {
        let runner = FakeRunner::new().reply("iw dev wlan0 link", "  Connected to aa:bb\n");
        assert_eq!(runner.run("iw", &["dev", "wlan0", "link"]).await.as_deref(), Some("Connected to aa:bb"));
    }

    #[tokio::test]
    async fn test_run_maps_failure_to_none() {
        let runner = FakeRunner::new().fail("nmcli connection up home", 4, "Error: no such connection");
        assert!(runner.run("nmcli", &["connection", "up", "home"]).await.is_none());
        assert!(runner.run("missing-binary", &[]).await.is_none());
    }

    #[tokio::test]
    async fn test_run_checked_keeps_stderr() {
        let runner = FakeRunner::new().fail("nmcli connection up home", 4, "Error: no such connection");
        let err = runner.run_checked("nmcli", &["connection", "up", "home"]).await.unwrap_err();
        assert!(matches!(err, AppError::Command(_)));
        assert!(err.to_string().contains("no such connection"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let output = system_runner().capture("sh", &["-c", "echo out; echo err >&2; exit 3"]).await.unwrap();
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[tokio::test]
    async fn test_system_runner_missing_binary() {
        let err = system_runner().capture("definitely-not-a-real-binary-wst", &[]).await.unwrap_err();
        assert!(matches!(err, AppError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_find_in_path() {
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-a-real-binary-wst").is_none());
    }
}
