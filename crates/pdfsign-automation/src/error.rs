use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SigningError {
    /// Missing or invalid input, detected before any browser work.
    #[error("{0}")]
    Configuration(String),

    /// Launch, navigation, selector-wait, click or evaluation failure.
    #[error("{0}")]
    Automation(String),

    #[error("Download timeout after {}ms", .0.as_millis())]
    DownloadTimeout(Duration),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SigningError {
    pub fn automation(context: &str, err: impl std::fmt::Display) -> Self {
        SigningError::Automation(format!("{}: {}", context, err))
    }

    /// Error for a bounded "wait until visible" that ran out of time.
    pub fn wait_timeout(selector: &str, timeout: Duration) -> Self {
        SigningError::Automation(format!(
            "Waiting for selector `{}` failed: timeout {}ms exceeded",
            selector,
            timeout.as_millis()
        ))
    }

    /// [`wait_timeout`](Self::wait_timeout) that also reports the last failed check.
    pub fn wait_timeout_after(
        selector: &str,
        timeout: Duration,
        last_error: &SigningError,
    ) -> Self {
        SigningError::Automation(format!(
            "Waiting for selector `{}` failed: timeout {}ms exceeded (last error: {})",
            selector,
            timeout.as_millis(),
            last_error
        ))
    }
}
