//! Errors shared across pipeline components.

use crate::sync::QueueError;

/// Conditions after which the process must restart.
///
/// Loops never reset the process themselves; they hand the condition to the
/// supervisor over a channel and park.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    /// The sampling loop could not enqueue a sample before its timeout.
    SamplePush(QueueError),
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FatalError::SamplePush(e) => write!(f, "Failed to put sample in queue: {e}"),
        }
    }
}

impl std::error::Error for FatalError {}

/// A component thread could not be created.
#[derive(Debug)]
pub struct SpawnError {
    pub thread: &'static str,
    pub source: std::io::Error,
}

impl std::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to create {} thread: {}", self.thread, self.source)
    }
}

impl std::error::Error for SpawnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Spawn a named component thread.
pub(crate) fn spawn_named<F>(
    name: &'static str,
    f: F,
) -> Result<std::thread::JoinHandle<()>, SpawnError>
where
    F: FnOnce() + Send + 'static,
{
    std::thread::Builder::new()
        .name(name.into())
        .spawn(f)
        .map_err(|source| SpawnError {
            thread: name,
            source,
        })
}
