use tokio::process::Command;

use crate::error::ExecError;

/// Runs query and action commands as subprocesses through a shell, so that
/// an optional site-environment script can be sourced into the same process
/// before the command itself runs.
///
/// # Examples
///
/// ```
/// use policyd_executor::ActionRunner;
///
/// let runner = ActionRunner::new(None);
/// assert!(runner.environment_script().is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ActionRunner {
    environment_script: Option<String>,
}

impl ActionRunner {
    #[must_use]
    pub fn new(environment_script: Option<String>) -> Self {
        Self { environment_script }
    }

    #[must_use]
    pub fn environment_script(&self) -> Option<&str> {
        self.environment_script.as_deref()
    }

    /// Run a `queryCommand` and return its captured stdout.
    pub async fn run_query(&self, command: &str) -> Result<Vec<u8>, ExecError> {
        self.run(command).await
    }

    /// Run an `actionCommand`, discarding stdout — only success/failure matters.
    pub async fn run_action(&self, command: &str) -> Result<(), ExecError> {
        self.run(command).await.map(|_| ())
    }

    async fn run(&self, command: &str) -> Result<Vec<u8>, ExecError> {
        let shell_command = match &self.environment_script {
            Some(script) => format!("source {script} && {command}"),
            None => command.to_owned(),
        };

        tracing::debug!(command = %shell_command, "executing command");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&shell_command)
            .output()
            .await
            .map_err(ExecError::Spawn)?;

        if !output.status.success() {
            return Err(ExecError::NonZeroExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(output.stdout)
    }
}
