//! Shell executor - runs an accepted command and captures its output

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Shell execution result
#[derive(Debug, Clone)]
pub struct ShellResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub command: String,
}

impl ShellResult {
    /// Stdout followed by stderr, as shown to the user and logged to history
    pub fn combined_output(&self) -> String {
        let mut output = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str(&self.stderr);
        }
        output
    }
}

/// Shell executor
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    timeout: Duration,
    shell: String,
}

impl Default for ShellExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl ShellExecutor {
    pub fn new(timeout: Duration) -> Self {
        let shell = if cfg!(windows) { "cmd" } else { "sh" };
        Self {
            timeout,
            shell: shell.to_string(),
        }
    }

    /// Strip the quoting models like to wrap commands in and expand `~/`
    pub fn prepare_command(raw: &str) -> String {
        let mut command = strip_code_fence(raw.trim());
        while let Some(inner) = strip_wrapping_quotes(command) {
            command = inner.trim();
        }

        match dirs::home_dir() {
            Some(home) if command.contains("~/") => {
                command.replace("~/", &format!("{}/", home.display()))
            }
            _ => command.to_string(),
        }
    }

    /// Execute a command through the system shell
    pub async fn execute(&self, raw: &str) -> Result<ShellResult, ShellError> {
        let command = Self::prepare_command(raw);
        if command.is_empty() {
            return Err(ShellError::Empty);
        }

        let mut cmd = Command::new(&self.shell);
        if cfg!(windows) {
            cmd.arg("/C");
        } else {
            cmd.arg("-c");
        }
        cmd.arg(&command);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ShellError::Timeout(self.timeout))?
            .map_err(|e| ShellError::ExecutionError(e.to_string()))?;

        let exit_code = output.status.code().unwrap_or(-1);

        Ok(ShellResult {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            command,
        })
    }
}

/// Drop a surrounding ```lang ... ``` block
fn strip_code_fence(text: &str) -> &str {
    let Some(body) = text.strip_prefix("```") else {
        return text;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Skip the language tag line, if any
    match body.split_once('\n') {
        Some((_, rest)) => rest.trim(),
        None => body.trim(),
    }
}

fn strip_wrapping_quotes(text: &str) -> Option<&str> {
    ['`', '\'', '"'].into_iter().find_map(|quote| {
        text.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

/// Shell executor errors
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("No command to execute")]
    Empty,
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_strips_quotes() {
        assert_eq!(ShellExecutor::prepare_command("`ls -la`"), "ls -la");
        assert_eq!(ShellExecutor::prepare_command("  \"pwd\"  "), "pwd");
        assert_eq!(ShellExecutor::prepare_command("echo 'hi'"), "echo 'hi'");
        assert_eq!(ShellExecutor::prepare_command("```bash\ndf -h\n```"), "df -h");
    }

    #[test]
    fn test_prepare_expands_home() {
        if let Some(home) = dirs::home_dir() {
            let prepared = ShellExecutor::prepare_command("ls ~/projects");
            assert_eq!(prepared, format!("ls {}/projects", home.display()));
        }
    }

    #[tokio::test]
    async fn test_empty_command() {
        let executor = ShellExecutor::default();
        assert!(matches!(executor.execute(" `` ").await, Err(ShellError::Empty)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_captures_output() {
        let executor = ShellExecutor::default();
        let result = executor.execute("echo hello; echo oops 1>&2").await.unwrap();
        assert!(result.success);
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.combined_output(), "hello\noops\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_reports_failure() {
        let executor = ShellExecutor::default();
        let result = executor.execute("exit 3").await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_execute_times_out() {
        let executor = ShellExecutor::new(Duration::from_millis(50));
        let err = executor.execute("sleep 5").await.unwrap_err();
        assert!(matches!(err, ShellError::Timeout(d) if d == Duration::from_millis(50)));
        assert_eq!(err.to_string(), "Command timed out after 50ms");
    }
}
