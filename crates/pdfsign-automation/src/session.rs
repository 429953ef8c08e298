//! Browser session abstraction
//!
//! The signing script talks to the browser only through [`BrowserSession`].
//! [`crate::chrome::ChromeSession`] implements it over the Chrome DevTools
//! Protocol; tests substitute a scripted double.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::capture::PdfCapture;
use crate::config::SignaturePosition;
use crate::error::SigningError;

/// Starts a fresh, exclusively owned browser session
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session, SigningError>;
}

/// One page in one browser, driven step by step
#[async_trait]
pub trait BrowserSession: Send {
    /// Save browser-initiated downloads into `dir`
    async fn set_download_dir(&mut self, dir: &Path) -> Result<(), SigningError>;

    async fn navigate(&mut self, url: &str) -> Result<(), SigningError>;

    /// Wait until `selector` matches a rendered, visible element
    ///
    /// Fails with a timeout error once `timeout` elapses.
    async fn wait_for_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SigningError>;

    async fn click(&mut self, selector: &str) -> Result<(), SigningError>;

    /// Click `trigger` and answer the file chooser it opens with `file`
    async fn upload_file(&mut self, trigger: &str, file: &Path) -> Result<(), SigningError>;

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), SigningError>;

    /// Move every element matching one of `selectors` to `position`
    async fn set_element_position(
        &mut self,
        selectors: &[String],
        position: SignaturePosition,
    ) -> Result<(), SigningError>;

    /// Start listening for the first network response carrying a PDF
    async fn capture_pdf_response(&mut self) -> Result<PdfCapture, SigningError>;

    /// Tear the session down; the session is not used afterwards
    async fn close(&mut self) -> Result<(), SigningError>;
}
