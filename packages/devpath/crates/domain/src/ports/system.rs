use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Broadcast timed out after {0:?}")]
    TimedOut(Duration),
    #[error("Broadcast failed: {0}")]
    Failed(String),
}

pub trait PrivilegeProbe: Send + Sync {
    /// True when the process may write the machine environment.
    fn is_elevated(&self) -> bool;
}

/// Tells running programs that the environment changed.
pub trait ChangeNotifier: Send + Sync {
    fn broadcast(&self, timeout: Duration) -> Result<(), NotifyError>;
}
