//! The signing script
//!
//! [`PdfSigner::sign`] walks a single browser session through the signing
//! service's fixed sequence of screens:
//!
//! ```text
//! launch ─► download dir ─► navigate ─► upload ─► "only me" ─► signer name
//!        ─► apply ─► place signature ─► move to (x, y) ─► process
//!        ─► wait for download ─► capture PDF response ⇄ timeout ─► close
//! ```
//!
//! Every step is a bounded wait or a single command; nothing is retried. The
//! first failure ends the run, and the session is closed exactly once on
//! every path after a successful launch.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::config::{RequestDraft, SigningProfile, SigningRequest};
use crate::error::SigningError;
use crate::session::{BrowserSession, SessionLauncher};

/// Outcome of one signing run
///
/// Built only through [`succeeded`](Self::succeeded) and
/// [`failed`](Self::failed), so a path is present iff the run succeeded and
/// a message iff it failed. Results serialize but never deserialize:
///
/// ```compile_fail
/// let forged: pdfsign_automation::SigningResult =
///     serde_json::from_str(r#"{"success":true}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SigningResult {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl SigningResult {
    pub fn succeeded(output_path: PathBuf) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            error_message: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        let mut message = error.to_string();
        if message.is_empty() {
            message = "Unknown error occurred".to_string();
        }
        Self {
            success: false,
            output_path: None,
            error_message: Some(message),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Where the signed PDF was written; `Some` iff the run succeeded
    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }

    /// Why the run failed; `Some` iff the run failed
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

/// Drives a signing service through one signing run per call
pub struct PdfSigner<L> {
    launcher: L,
    profile: SigningProfile,
}

impl<L: SessionLauncher> PdfSigner<L> {
    pub fn new(launcher: L, profile: SigningProfile) -> Self {
        Self { launcher, profile }
    }

    pub fn profile(&self) -> &SigningProfile {
        &self.profile
    }

    /// Validate `draft`, then sign it
    ///
    /// An invalid draft fails without launching a browser.
    pub async fn sign_draft(&self, draft: RequestDraft) -> SigningResult {
        match draft.validate() {
            Ok(request) => self.sign(&request).await,
            Err(e) => {
                error!("Invalid signing request: {}", e);
                SigningResult::failed(e)
            }
        }
    }

    /// Sign `request`'s document, returning a result rather than an error
    #[instrument(skip(self, request), fields(document = %request.document_path().display()))]
    pub async fn sign(&self, request: &SigningRequest) -> SigningResult {
        info!("Starting browser session");
        let mut session = match self.launcher.launch().await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to start browser session: {}", e);
                return SigningResult::failed(e);
            }
        };

        let outcome = self.run(&mut session, request).await;

        info!("Closing browser session");
        if let Err(e) = session.close().await {
            warn!("Failed to close browser session: {}", e);
        }

        match outcome {
            Ok(path) => {
                info!("PDF signed successfully: {}", path.display());
                SigningResult::succeeded(path)
            }
            Err(e) => {
                error!("Failed to sign PDF: {}", e);
                SigningResult::failed(e)
            }
        }
    }

    async fn run(
        &self,
        session: &mut L::Session,
        request: &SigningRequest,
    ) -> Result<PathBuf, SigningError> {
        let selectors = &self.profile.selectors;
        let timeouts = &self.profile.timeouts;

        let downloads_dir = self.prepare_downloads_dir().await?;
        debug!("Downloads directory: {}", downloads_dir.display());
        session.set_download_dir(&downloads_dir).await?;

        info!("Navigating to service URL: {}", request.service_url());
        session.navigate(request.service_url()).await?;
        session
            .wait_for_visible(&selectors.upload, timeouts.page_ready)
            .await?;

        info!("Uploading PDF: {}", request.document_path().display());
        session
            .upload_file(&selectors.upload, request.document_path())
            .await?;

        info!("Selecting single signer mode");
        session
            .wait_for_visible(&selectors.single_signer, timeouts.upload)
            .await?;
        session.click(&selectors.single_signer).await?;

        info!("Entering signer name: {}", request.signer_name());
        session
            .wait_for_visible(&selectors.signer_name_input, timeouts.element)
            .await?;
        session
            .type_text(&selectors.signer_name_input, request.signer_name())
            .await?;

        info!("Applying signature settings");
        session.click(&selectors.apply).await?;

        info!("Adding signature to document");
        session
            .wait_for_visible(&selectors.signature_placeholder, timeouts.element)
            .await?;
        session.click(&selectors.signature_placeholder).await?;

        let position = request.signature_position();
        info!("Setting signature position: ({}, {})", position.x, position.y);
        session
            .set_element_position(&selectors.signature_containers, position)
            .await?;

        info!("Processing signature");
        session.click(&selectors.process).await?;

        info!("Waiting for processing to complete");
        session
            .wait_for_visible(&selectors.download, timeouts.processing)
            .await?;

        debug!("Installing PDF response listener");
        let capture = session.capture_pdf_response().await?;

        info!("Initiating download");
        session.click(&selectors.download).await?;

        info!("Waiting for download to complete");
        let bytes = capture.race(timeouts.download).await?;

        let path = downloads_dir.join(signed_file_name());
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| SigningError::Io {
                path: path.clone(),
                source,
            })?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());

        Ok(path)
    }

    /// Absolute downloads directory, created if missing
    async fn prepare_downloads_dir(&self) -> Result<PathBuf, SigningError> {
        let dir = &self.profile.downloads_dir;
        let dir = std::path::absolute(dir).map_err(|source| SigningError::Io {
            path: dir.clone(),
            source,
        })?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| SigningError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(dir)
    }
}

/// `signed_<unix millis>.pdf`
pub fn signed_file_name() -> String {
    format!("signed_{}.pdf", chrono::Utc::now().timestamp_millis())
}
