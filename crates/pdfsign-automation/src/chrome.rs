//! Chrome/Chromium session over the DevTools protocol
//!
//! [`ChromeLauncher`] starts a dedicated browser process (its own user data
//! directory, one page) and hands it out as a [`ChromeSession`]. All page
//! interaction goes through chromiumoxide; the few operations it has no
//! helper for (file chooser interception, download directory, response
//! bodies) are issued as raw CDP commands.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventLoadingFinished, EventResponseReceived,
    GetResponseBodyParams,
};
use chromiumoxide::cdp::browser_protocol::page::{
    EventFileChooserOpened, SetInterceptFileChooserDialogParams,
};
use chromiumoxide::Page;
use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::capture::PdfCapture;
use crate::config::SignaturePosition;
use crate::error::SigningError;
use crate::session::{BrowserSession, SessionLauncher};

/// How often `wait_for_visible` re-checks the page
const VISIBILITY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long a click on the upload trigger may take to open a file chooser
const FILE_CHOOSER_TIMEOUT: Duration = Duration::from_secs(10);

/// Launches a Chrome process per session
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    headless: bool,
    executable: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(headless: bool) -> Self {
        Self {
            headless,
            executable: None,
        }
    }

    /// Use a specific Chrome binary instead of auto-detection
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }
}

#[async_trait]
impl SessionLauncher for ChromeLauncher {
    type Session = ChromeSession;

    async fn launch(&self) -> Result<ChromeSession, SigningError> {
        let mut builder = BrowserConfig::builder().arg("--start-maximized");
        if !self.headless {
            builder = builder.with_head();
        }

        let executable = self.executable.clone().or_else(find_chrome_for_testing);
        if let Some(path) = executable {
            debug!("Using Chrome executable: {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let user_data_dir = unique_user_data_dir();
        builder = builder.user_data_dir(&user_data_dir);

        let config = builder
            .build()
            .map_err(|e| SigningError::automation("Failed to build browser config", e))?;

        info!(headless = self.headless, "Launching browser");
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| SigningError::automation("Failed to launch browser", e))?;

        // Spawn handler to process browser events
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                let _ = browser.wait().await;
                handler_task.abort();
                let _ = std::fs::remove_dir_all(&user_data_dir);
                return Err(SigningError::automation("Failed to open page", e));
            }
        };

        Ok(ChromeSession {
            browser,
            page,
            handler_task,
            user_data_dir,
            closed: false,
        })
    }
}

/// A live browser with the single page the signing script drives
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler_task: tokio::task::JoinHandle<()>,
    user_data_dir: PathBuf,
    closed: bool,
}

impl ChromeSession {
    /// The underlying page
    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, SigningError> {
        let script = visibility_script(selector)?;
        let result = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| SigningError::automation("Visibility check failed", e))?;
        result
            .into_value::<bool>()
            .map_err(|e| SigningError::automation("Visibility check returned no boolean", e))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    async fn set_download_dir(&mut self, dir: &Path) -> Result<(), SigningError> {
        let mut params = SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Allow);
        params.download_path = Some(dir.to_string_lossy().into_owned());
        self.browser
            .execute(params)
            .await
            .map_err(|e| SigningError::automation("Failed to set download behavior", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), SigningError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| SigningError::automation("Navigation failed", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn wait_for_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SigningError> {
        let deadline = Instant::now() + timeout;
        let mut last_error = None;
        loop {
            match tokio::time::timeout_at(deadline, self.is_visible(selector)).await {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => last_error = None,
                // The execution context goes away while the page navigates.
                Ok(Err(e)) => {
                    debug!("Visibility check for {} failed: {}", selector, e);
                    last_error = Some(e);
                }
                Err(_) => break,
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            tokio::time::sleep_until((now + VISIBILITY_POLL_INTERVAL).min(deadline)).await;
        }
        Err(match last_error {
            Some(e) => SigningError::wait_timeout_after(selector, timeout, &e),
            None => SigningError::wait_timeout(selector, timeout),
        })
    }

    #[instrument(skip(self))]
    async fn click(&mut self, selector: &str) -> Result<(), SigningError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| SigningError::automation(&format!("Element not found: {}", selector), e))?;
        element
            .click()
            .await
            .map_err(|e| SigningError::automation(&format!("Click failed: {}", selector), e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn upload_file(&mut self, trigger: &str, file: &Path) -> Result<(), SigningError> {
        let file = std::path::absolute(file).map_err(|source| SigningError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        self.page
            .execute(SetInterceptFileChooserDialogParams::new(true))
            .await
            .map_err(|e| SigningError::automation("Failed to intercept file chooser", e))?;
        let mut choosers = self
            .page
            .event_listener::<EventFileChooserOpened>()
            .await
            .map_err(|e| SigningError::automation("Failed to subscribe to file chooser", e))?;

        self.click(trigger).await?;

        let opened = tokio::time::timeout(FILE_CHOOSER_TIMEOUT, choosers.next())
            .await
            .map_err(|_| {
                SigningError::Automation(format!(
                    "Waiting for file chooser failed: timeout {}ms exceeded",
                    FILE_CHOOSER_TIMEOUT.as_millis()
                ))
            })?
            .ok_or_else(|| SigningError::Automation("File chooser stream closed".to_string()))?;
        let backend_node_id = opened.backend_node_id.clone().ok_or_else(|| {
            SigningError::Automation("File chooser did not report its input element".to_string())
        })?;

        let mut params = SetFileInputFilesParams::new(vec![file.to_string_lossy().into_owned()]);
        params.backend_node_id = Some(backend_node_id);
        self.page
            .execute(params)
            .await
            .map_err(|e| SigningError::automation("Failed to supply file to chooser", e))?;

        self.page
            .execute(SetInterceptFileChooserDialogParams::new(false))
            .await
            .map_err(|e| SigningError::automation("Failed to restore file chooser", e))?;
        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), SigningError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| SigningError::automation(&format!("Element not found: {}", selector), e))?;
        element
            .click()
            .await
            .map_err(|e| SigningError::automation("Focus failed", e))?;
        element
            .type_str(text)
            .await
            .map_err(|e| SigningError::automation("Type failed", e))?;
        Ok(())
    }

    async fn set_element_position(
        &mut self,
        selectors: &[String],
        position: SignaturePosition,
    ) -> Result<(), SigningError> {
        let script = position_script(selectors, position)?;
        let moved: u64 = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|e| SigningError::automation("Failed to position signature", e))?
            .into_value()
            .map_err(|e| SigningError::automation("Failed to position signature", e))?;
        if moved == 0 {
            warn!("No signature element matched {:?}", selectors);
        } else {
            debug!("Moved {} signature element(s)", moved);
        }
        Ok(())
    }

    async fn capture_pdf_response(&mut self) -> Result<PdfCapture, SigningError> {
        self.page
            .execute(NetworkEnableParams::default())
            .await
            .map_err(|e| SigningError::automation("Failed to enable network events", e))?;

        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| SigningError::automation("Failed to subscribe to responses", e))?;
        let mut finished = self
            .page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(|e| SigningError::automation("Failed to subscribe to responses", e))?;

        let page = self.page.clone();
        Ok(PdfCapture::spawn(async move {
            let mut request_id = None;
            while let Some(event) = responses.next().await {
                if is_pdf_mime(&event.response.mime_type) {
                    debug!("PDF response from {}", event.response.url);
                    request_id = Some(event.request_id.clone());
                    break;
                }
            }
            let request_id = request_id.ok_or_else(|| {
                SigningError::Automation("Page closed before a PDF response arrived".to_string())
            })?;

            wait_for_loading_finished(finished.map(|e| e.request_id.clone()), &request_id)
                .await?;

            let body = page
                .execute(GetResponseBodyParams::new(request_id))
                .await
                .map_err(|e| SigningError::automation("Download failed", e))?
                .result;
            decode_body(body.body, body.base64_encoded)
        }))
    }

    async fn close(&mut self) -> Result<(), SigningError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!("Waiting for browser exit failed: {}", e);
        }
        self.handler_task.abort();
        if let Err(e) = std::fs::remove_dir_all(&self.user_data_dir) {
            debug!("Could not remove {}: {}", self.user_data_dir.display(), e);
        }
        closed.map_err(|e| SigningError::automation("Failed to close browser", e))?;
        Ok(())
    }
}

fn is_pdf_mime(mime_type: &str) -> bool {
    mime_type.to_ascii_lowercase().contains("application/pdf")
}

/// Wait until `ids` yields `request_id`; fails if the stream ends first
async fn wait_for_loading_finished<T, S>(ids: S, request_id: &T) -> Result<(), SigningError>
where
    T: PartialEq,
    S: Stream<Item = T>,
{
    let mut ids = std::pin::pin!(ids);
    while let Some(id) = ids.next().await {
        if id == *request_id {
            return Ok(());
        }
    }
    Err(SigningError::Automation(
        "Page closed before the PDF finished loading".to_string(),
    ))
}

fn decode_body(body: String, base64_encoded: bool) -> Result<Vec<u8>, SigningError> {
    if base64_encoded {
        base64::engine::general_purpose::STANDARD
            .decode(body)
            .map_err(|e| SigningError::automation("Download failed", e))
    } else {
        Ok(body.into_bytes())
    }
}

/// JS expression: does `selector` match an element that is rendered and visible
fn visibility_script(selector: &str) -> Result<String, SigningError> {
    let selector = serde_json::to_string(selector)
        .map_err(|e| SigningError::automation("Invalid selector", e))?;
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            const style = window.getComputedStyle(el);
            if (style.visibility === 'hidden' || style.display === 'none') return false;
            const rect = el.getBoundingClientRect();
            return rect.width > 0 && rect.height > 0;
        }})()"#
    ))
}

/// JS expression: move each matching element to (x, y) px, returning how many moved
fn position_script(
    selectors: &[String],
    position: SignaturePosition,
) -> Result<String, SigningError> {
    let selectors = serde_json::to_string(selectors)
        .map_err(|e| SigningError::automation("Invalid selector", e))?;
    Ok(format!(
        r#"(() => {{
            let moved = 0;
            for (const selector of {selectors}) {{
                const el = document.querySelector(selector);
                if (el instanceof HTMLElement) {{
                    el.style.top = '{y}px';
                    el.style.left = '{x}px';
                    moved += 1;
                }}
            }}
            return moved;
        }})()"#,
        x = position.x,
        y = position.y,
    ))
}

/// Per-launch profile directory so concurrent or stale Chrome instances never collide
fn unique_user_data_dir() -> PathBuf {
    static LAUNCH_ID: AtomicU64 = AtomicU64::new(0);
    let launch_id = LAUNCH_ID.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!(
        "pdfsign-{}-{}-{}",
        std::process::id(),
        launch_id,
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ))
}

/// Find Chrome for Testing installed by Puppeteer
pub fn find_chrome_for_testing() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let puppeteer_cache = Path::new(&home).join(".cache/puppeteer/chrome");

    let mut versions: Vec<_> = std::fs::read_dir(&puppeteer_cache)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    versions.sort_by(|a, b| b.cmp(a));

    const CANDIDATES: [&str; 3] = [
        "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
        "chrome-linux64/chrome",
    ];
    versions
        .iter()
        .flat_map(|dir| CANDIDATES.iter().map(move |c| dir.join(c)))
        .find(|p| p.exists())
}
