//! Browser automation helpers

use pdfsign_automation::{ChromeLauncher, ChromeSession, SessionLauncher};

/// Check if browser tests should be skipped (when Chrome isn't available)
pub fn should_skip() -> bool {
    std::env::var("SKIP_BROWSER_TESTS").is_ok()
}

/// Macro to skip test if Chrome isn't available
#[macro_export]
macro_rules! skip_if_no_chrome {
    () => {
        if browser::should_skip() {
            eprintln!("Skipping test: SKIP_BROWSER_TESTS is set");
            return;
        }
    };
}

/// Try to start a headless session, skip test if Chrome can't be launched
pub async fn require_session() -> Option<ChromeSession> {
    match ChromeLauncher::new(true).launch().await {
        Ok(session) => Some(session),
        Err(e) => {
            eprintln!("Skipping: Chrome not available ({})", e);
            None
        }
    }
}

/// `data:` URL serving `html`, so tests need no local server
pub fn html_page(html: &str) -> String {
    use base64::Engine;
    format!(
        "data:text/html;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(html)
    )
}
