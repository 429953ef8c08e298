//! Response race for the signed document
//!
//! A [`PdfCapture`] owns a background listener that resolves with the bytes of
//! the first PDF response it sees. [`PdfCapture::race`] waits for that
//! listener or a deadline, whichever settles first. The listener task is
//! aborted when the capture is dropped, so the losing side never outlives
//! the race.

use std::future::Future;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::SigningError;

/// Background listener for a single PDF response
pub struct PdfCapture {
    rx: oneshot::Receiver<Result<Vec<u8>, SigningError>>,
    task: JoinHandle<()>,
}

impl PdfCapture {
    /// Run `listener` on a background task and capture its outcome
    ///
    /// Must be called before the action that triggers the download, so the
    /// response cannot arrive before anyone is listening.
    pub fn spawn<F>(listener: F) -> Self
    where
        F: Future<Output = Result<Vec<u8>, SigningError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            let _ = tx.send(listener.await);
        });
        Self { rx, task }
    }

    /// Wait for the captured PDF, failing once `timeout` elapses
    pub async fn race(mut self, timeout: Duration) -> Result<Vec<u8>, SigningError> {
        match tokio::time::timeout(timeout, &mut self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(SigningError::Automation(
                "Response listener stopped before a PDF arrived".to_string(),
            )),
            Err(_) => {
                debug!("Download race lost to {:?} timer", timeout);
                Err(SigningError::DownloadTimeout(timeout))
            }
        }
    }
}

impl Drop for PdfCapture {
    fn drop(&mut self) {
        self.task.abort();
    }
}
