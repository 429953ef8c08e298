//! Scripted browser double
//!
//! Records every command the signing script issues and fails on demand, so
//! flow tests can run without Chrome.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pdfsign_automation::config::SignaturePosition;
use pdfsign_automation::{BrowserSession, PdfCapture, SessionLauncher, SigningError};

/// What the fake page does when the script pokes at it
#[derive(Debug, Clone, Default)]
pub struct Script {
    pub launch_fails: bool,
    /// Selector that never becomes visible
    pub never_visible: Option<String>,
    /// Selector whose click fails
    pub click_fails: Option<String>,
    pub navigation_fails: bool,
    /// Step whose every call fails: one of [`STEPS`]
    pub fails_at: Option<&'static str>,
    /// Bytes of the PDF response; `None` means no PDF response ever arrives
    pub pdf: Option<Vec<u8>>,
}

/// Names of the session operations, as recorded in the call log
pub const STEPS: [&str; 8] = [
    "download_dir",
    "navigate",
    "wait",
    "upload",
    "click",
    "type",
    "position",
    "capture",
];

impl Script {
    pub fn happy_path(pdf: &[u8]) -> Self {
        Self {
            pdf: Some(pdf.to_vec()),
            ..Self::default()
        }
    }
}

/// Shared record of what happened across the launcher and its sessions
#[derive(Debug, Default)]
pub struct Recorder {
    calls: Mutex<Vec<String>>,
    launches: AtomicUsize,
    closes: AtomicUsize,
}

impl Recorder {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

pub struct FakeLauncher {
    script: Script,
    recorder: Arc<Recorder>,
}

impl FakeLauncher {
    pub fn new(script: Script) -> (Self, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Self {
                script,
                recorder: recorder.clone(),
            },
            recorder,
        )
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, SigningError> {
        self.recorder.launches.fetch_add(1, Ordering::SeqCst);
        if self.script.launch_fails {
            return Err(SigningError::Automation(
                "Failed to launch browser: Could not auto detect a chrome executable".to_string(),
            ));
        }
        Ok(FakeSession {
            script: self.script.clone(),
            recorder: self.recorder.clone(),
            closed: false,
        })
    }
}

pub struct FakeSession {
    script: Script,
    recorder: Arc<Recorder>,
    closed: bool,
}

impl FakeSession {
    fn check_open(&self) {
        assert!(!self.closed, "session used after teardown");
    }

    fn fail_if_scripted(&self, step: &str) -> Result<(), SigningError> {
        if self.script.fails_at == Some(step) {
            return Err(SigningError::automation(step, "scripted failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn set_download_dir(&mut self, dir: &Path) -> Result<(), SigningError> {
        self.check_open();
        assert!(dir.is_absolute(), "download dir must be absolute");
        assert!(dir.is_dir(), "download dir must exist");
        self.recorder.record(format!("download_dir {}", dir.display()));
        self.fail_if_scripted("download_dir")
    }

    async fn navigate(&mut self, url: &str) -> Result<(), SigningError> {
        self.check_open();
        self.recorder.record(format!("navigate {}", url));
        self.fail_if_scripted("navigate")?;
        if self.script.navigation_fails {
            return Err(SigningError::automation(
                "Navigation failed",
                "net::ERR_NAME_NOT_RESOLVED",
            ));
        }
        Ok(())
    }

    async fn wait_for_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), SigningError> {
        self.check_open();
        self.recorder.record(format!("wait {}", selector));
        self.fail_if_scripted("wait")?;
        if self.script.never_visible.as_deref() == Some(selector) {
            return Err(SigningError::wait_timeout(selector, timeout));
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), SigningError> {
        self.check_open();
        self.recorder.record(format!("click {}", selector));
        self.fail_if_scripted("click")?;
        if self.script.click_fails.as_deref() == Some(selector) {
            return Err(SigningError::automation(
                &format!("Click failed: {}", selector),
                "Node is detached from document",
            ));
        }
        Ok(())
    }

    async fn upload_file(&mut self, trigger: &str, file: &Path) -> Result<(), SigningError> {
        self.check_open();
        self.recorder
            .record(format!("upload {} {}", trigger, file.display()));
        self.fail_if_scripted("upload")
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> Result<(), SigningError> {
        self.check_open();
        self.recorder.record(format!("type {} {}", selector, text));
        self.fail_if_scripted("type")
    }

    async fn set_element_position(
        &mut self,
        selectors: &[String],
        position: SignaturePosition,
    ) -> Result<(), SigningError> {
        self.check_open();
        self.recorder.record(format!(
            "position {} ({}, {})",
            selectors.join(","),
            position.x,
            position.y
        ));
        self.fail_if_scripted("position")
    }

    async fn capture_pdf_response(&mut self) -> Result<PdfCapture, SigningError> {
        self.check_open();
        self.recorder.record("capture".to_string());
        self.fail_if_scripted("capture")?;
        Ok(match self.script.pdf.clone() {
            Some(bytes) => PdfCapture::spawn(async move { Ok(bytes) }),
            None => PdfCapture::spawn(futures::future::pending()),
        })
    }

    async fn close(&mut self) -> Result<(), SigningError> {
        self.check_open();
        self.closed = true;
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
        self.recorder.record("close".to_string());
        Ok(())
    }
}
