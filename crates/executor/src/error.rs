#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("failed to spawn command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("command exited with status {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },
}
